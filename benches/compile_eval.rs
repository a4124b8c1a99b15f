use criterion::{criterion_group, criterion_main, Criterion};
use rustc_hash::FxHashMap;
use std::hint::black_box;

use symcall::{substitute_and_evaluate, sym, to_function, Expr, Func};

fn build_expr() -> Expr {
    let x = sym("x");
    let y = sym("y");
    let cos = Func::wrap1("f64::cos", f64::cos);
    let exp = Func::wrap1("f64::exp", f64::exp);

    // cos(x) * exp(-y) + (x + y)^2 - x * 3
    Expr::call(&cos, [x.to_expr()]) * Expr::call(&exp, [-y.to_expr()])
        + (x.to_expr() + y.to_expr()).pow(2.0)
        - x.to_expr() * 3.0
}

fn bench_tree_walk(c: &mut Criterion) {
    let expr = build_expr();
    let x = sym("x");
    let y = sym("y");

    c.bench_function("tree_walk_substitute_and_evaluate", |b| {
        b.iter(|| {
            let mut mapping: FxHashMap<Expr, Expr> = FxHashMap::default();
            mapping.insert(x.to_expr(), Expr::number(black_box(0.5)));
            mapping.insert(y.to_expr(), Expr::number(black_box(1.5)));
            substitute_and_evaluate(&expr, &mapping)
        })
    });
}

fn bench_compiled(c: &mut Criterion) {
    let expr = build_expr();
    let x = sym("x");
    let y = sym("y");
    let f = to_function(&expr, &[x, y], "f").expect("compile");
    let args: [Expr; 2] = [0.5.into(), 1.5.into()];

    c.bench_function("compiled_call", |b| {
        b.iter(|| f.call(black_box(&args)))
    });
}

criterion_group!(benches, bench_tree_walk, bench_compiled);
criterion_main!(benches);
