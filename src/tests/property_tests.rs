//! Property-based tests over randomly generated trees

use quickcheck::{quickcheck, Arbitrary, Gen};
use rustc_hash::FxHashMap;

use crate::{evaluate, inspect, substitute, substitute_and_evaluate, sym, to_function, Expr};

/// A randomly generated arithmetic tree over the leaves `x`, `y` and
/// small numeric constants
#[derive(Clone, Debug)]
struct Tree(Expr);

fn gen_expr(g: &mut Gen, depth: usize) -> Expr {
    let leaf_choices = ["x", "y", "num"];
    let node_choices = ["add", "sub", "mul", "div", "leaf"];

    if depth == 0 {
        match g.choose(&leaf_choices).copied() {
            Some("x") => Expr::symbol("x"),
            Some("y") => Expr::symbol("y"),
            _ => {
                let n = i8::arbitrary(g);
                Expr::number(f64::from(n))
            }
        }
    } else {
        let lhs = gen_expr(g, depth - 1);
        let rhs = gen_expr(g, depth - 1);
        match g.choose(&node_choices).copied() {
            Some("add") => lhs + rhs,
            Some("sub") => lhs - rhs,
            Some("mul") => lhs * rhs,
            Some("div") => lhs / rhs,
            _ => gen_expr(g, 0),
        }
    }
}

impl Arbitrary for Tree {
    fn arbitrary(g: &mut Gen) -> Self {
        Tree(gen_expr(g, 3))
    }
}

fn full_mapping() -> FxHashMap<Expr, Expr> {
    let mut table = FxHashMap::default();
    table.insert(Expr::symbol("x"), Expr::number(2.5));
    table.insert(Expr::symbol("y"), Expr::number(-1.25));
    table
}

quickcheck! {
    /// substitute-then-evaluate equals the fused single pass
    fn prop_fusion_equivalence(tree: Tree) -> bool {
        let mapping = full_mapping();
        let two_pass = evaluate(&substitute(&tree.0, &mapping));
        let fused = substitute_and_evaluate(&tree.0, &mapping);
        two_pass == fused
    }

    /// substituting with an empty table is the identity
    fn prop_empty_substitution_is_identity(tree: Tree) -> bool {
        let empty: FxHashMap<Expr, Expr> = FxHashMap::default();
        let out = substitute(&tree.0, &empty);
        out == tree.0 && format!("{}", out) == format!("{}", tree.0)
    }

    /// inspect visits exactly node_count positions
    fn prop_inspect_total_matches_node_count(tree: Tree) -> bool {
        let counts = inspect(&tree.0);
        counts.values().sum::<usize>() == tree.0.node_count()
    }

    /// operations never mutate their input
    fn prop_input_render_is_stable(tree: Tree) -> bool {
        let before = format!("{}", tree.0);
        let _ = substitute(&tree.0, &full_mapping());
        let _ = evaluate(&tree.0);
        let _ = inspect(&tree.0);
        format!("{}", tree.0) == before
    }

    /// the compiled function agrees with substitute_and_evaluate
    fn prop_compiled_matches_interpreted(tree: Tree) -> bool {
        let x = sym("x");
        let y = sym("y");
        let f = match to_function(&tree.0, &[x.clone(), y.clone()], "f") {
            Ok(f) => f,
            Err(_) => return false,
        };
        let compiled = f.call(&[2.5.into(), (-1.25).into()]);
        let interpreted = substitute_and_evaluate(&tree.0, &full_mapping());
        compiled == interpreted
    }
}
