//! Operator-syntax construction of expression trees
//!
//! Overloads the standard arithmetic and bitwise operators for [`Expr`],
//! [`Symbol`] and numeric mixes in both orderings, so that `x + 1.0` or
//! `2.0 * y` build call nodes instead of computing. Operators Rust cannot
//! overload get named builders: `pos` (unary `+`), `pow` (`**`),
//! `floor_div` (`//`), `get_item`/`set_item` (subscripts) and the six
//! relational builders `eq_sym`/`ne_sym`/`lt_sym`/`le_sym`/`gt_sym`/
//! `ge_sym` (Rust comparison operators must return `bool`, which stays
//! reserved for structural equality).
//!
//! Every operator node captures a shared native callable implementing the
//! operation over constants, so a fully substituted tree can be collapsed
//! by evaluation. The callables are process-wide singletons: two `x + 1`
//! trees built independently are structurally equal.

use std::ops::{Add, BitAnd, BitOr, BitXor, Div, Mul, Neg, Not, Rem, Shl, Shr, Sub};
use std::sync::LazyLock;

use crate::error::SymError;
use crate::expr::{
    CallForm, Expr, Func, KwArgs, Op, PREC_ADD, PREC_AND, PREC_CMP, PREC_MUL, PREC_OR, PREC_POW,
    PREC_SHIFT, PREC_UNARY, PREC_XOR,
};
use crate::symbol::Symbol;

// ===== Native operator callables =====

/// The shared callables captured by operator nodes
struct NativeOps {
    add: Func,
    sub: Func,
    mul: Func,
    div: Func,
    floordiv: Func,
    rem: Func,
    pow: Func,
    shl: Func,
    shr: Func,
    bitand: Func,
    bitxor: Func,
    bitor: Func,
    pos: Func,
    neg: Func,
    invert: Func,
    eq: Func,
    ne: Func,
    lt: Func,
    le: Func,
    gt: Func,
    ge: Func,
    getitem: Func,
    setitem: Func,
}

static OPS: LazyLock<NativeOps> = LazyLock::new(|| NativeOps {
    add: Func::new("ops.add", |args, _| match args {
        [Expr::Number(a), Expr::Number(b)] => Ok(Expr::Number(a + b)),
        [Expr::Text(a), Expr::Text(b)] => Ok(Expr::text(format!("{a}{b}"))),
        [a, b] if is_symbolic(a) || is_symbolic(b) => {
            Ok(Expr::add_expr(a.clone(), b.clone()))
        }
        other => Err(operand_error("ops.add", other)),
    }),
    sub: numeric2("ops.sub", |a, b| a - b, |a, b| Expr::sub_expr(a, b)),
    mul: numeric2("ops.mul", |a, b| a * b, |a, b| Expr::mul_expr(a, b)),
    div: numeric2("ops.div", |a, b| a / b, |a, b| Expr::div_expr(a, b)),
    floordiv: numeric2(
        "ops.floordiv",
        |a, b| (a / b).floor(),
        |a, b| Expr::floordiv_expr(a, b),
    ),
    rem: numeric2(
        "ops.rem",
        |a, b| a - b * (a / b).floor(),
        |a, b| Expr::rem_expr(a, b),
    ),
    pow: numeric2("ops.pow", f64::powf, |a, b| Expr::pow_expr(a, b)),
    shl: integer2(
        "ops.shl",
        |a, b| u32::try_from(b).ok().and_then(|s| a.checked_shl(s)),
        |a, b| Expr::shl_expr(a, b),
    ),
    shr: integer2(
        "ops.shr",
        |a, b| u32::try_from(b).ok().and_then(|s| a.checked_shr(s)),
        |a, b| Expr::shr_expr(a, b),
    ),
    bitand: integer2("ops.bitand", |a, b| Some(a & b), |a, b| {
        Expr::bitand_expr(a, b)
    }),
    bitxor: integer2("ops.bitxor", |a, b| Some(a ^ b), |a, b| {
        Expr::bitxor_expr(a, b)
    }),
    bitor: integer2("ops.bitor", |a, b| Some(a | b), |a, b| {
        Expr::bitor_expr(a, b)
    }),
    pos: Func::new("ops.pos", |args, _| match args {
        [Expr::Number(n)] => Ok(Expr::Number(*n)),
        [value] if is_symbolic(value) => Ok(value.clone().pos()),
        other => Err(operand_error("ops.pos", other)),
    }),
    neg: Func::new("ops.neg", |args, _| match args {
        [Expr::Number(n)] => Ok(Expr::Number(-n)),
        [value] if is_symbolic(value) => Ok(-value.clone()),
        other => Err(operand_error("ops.neg", other)),
    }),
    invert: Func::new("ops.invert", |args, _| match args {
        [value] if is_symbolic(value) => Ok(!value.clone()),
        [value] => match as_int(value) {
            Some(n) => Ok(Expr::Number(!n as f64)),
            None => Err(operand_error("ops.invert", args)),
        },
        other => Err(operand_error("ops.invert", other)),
    }),
    // Structural equality, the leaf contract: two independently built but
    // identical nodes compare equal.
    eq: Func::new("ops.eq", |args, _| match args {
        [a, b] => Ok(Expr::Bool(a == b)),
        other => Err(operand_error("ops.eq", other)),
    }),
    ne: Func::new("ops.ne", |args, _| match args {
        [a, b] => Ok(Expr::Bool(a != b)),
        other => Err(operand_error("ops.ne", other)),
    }),
    lt: ordering2("ops.lt", "<", |a, b| a < b, |a, b| a < b),
    le: ordering2("ops.le", "<=", |a, b| a <= b, |a, b| a <= b),
    gt: ordering2("ops.gt", ">", |a, b| a > b, |a, b| a > b),
    ge: ordering2("ops.ge", ">=", |a, b| a >= b, |a, b| a >= b),
    getitem: Func::new("ops.getitem", |args, _| match args {
        [base, index] if is_symbolic(base) || is_symbolic(index) => {
            Ok(base.clone().get_item(index.clone()))
        }
        [Expr::List(items), Expr::Number(i)] => match list_index(items.len(), *i) {
            Some(idx) => Ok(items[idx].clone()),
            None => Err(SymError::bad_operands(
                "ops.getitem",
                format_args!("index {i} out of range for a list of {}", items.len()),
            )),
        },
        [Expr::Map(m), Expr::Text(key)] => match m.get(key.as_ref()) {
            Some(v) => Ok(v.clone()),
            None => Err(SymError::bad_operands(
                "ops.getitem",
                format_args!("no entry for key `{key}`"),
            )),
        },
        other => Err(operand_error("ops.getitem", other)),
    }),
    setitem: Func::new("ops.setitem", |args, _| match args {
        [base, index, value] if is_symbolic(base) || is_symbolic(index) => {
            Ok(base.clone().set_item(index.clone(), value.clone()))
        }
        [Expr::List(items), Expr::Number(i), value] => match list_index(items.len(), *i) {
            Some(idx) => {
                let mut out = items.clone();
                out[idx] = value.clone();
                Ok(Expr::List(out))
            }
            None => Err(SymError::bad_operands(
                "ops.setitem",
                format_args!("index {i} out of range for a list of {}", items.len()),
            )),
        },
        [Expr::Map(m), Expr::Text(key), value] => {
            let mut out = m.clone();
            out.insert(key.clone(), value.clone());
            Ok(Expr::Map(out))
        }
        other => Err(operand_error("ops.setitem", other)),
    }),
});

fn operand_error(op: &str, args: &[Expr]) -> SymError {
    let rendered: Vec<String> = args.iter().map(|a| format!("`{a}`")).collect();
    SymError::bad_operands(op, rendered.join(", "))
}

/// A node that still holds meaning after evaluation: applying a native
/// operation to it rebuilds the operator node instead of computing.
fn is_symbolic(e: &Expr) -> bool {
    matches!(e, Expr::Symbol(_) | Expr::Call(_))
}

fn numeric2(name: &'static str, f: fn(f64, f64) -> f64, rebuild: fn(Expr, Expr) -> Expr) -> Func {
    Func::new(name, move |args: &[Expr], _: &KwArgs| match args {
        [Expr::Number(a), Expr::Number(b)] => Ok(Expr::Number(f(*a, *b))),
        [a, b] if is_symbolic(a) || is_symbolic(b) => Ok(rebuild(a.clone(), b.clone())),
        other => Err(operand_error(name, other)),
    })
}

fn integer2(
    name: &'static str,
    f: fn(i64, i64) -> Option<i64>,
    rebuild: fn(Expr, Expr) -> Expr,
) -> Func {
    Func::new(name, move |args: &[Expr], _: &KwArgs| match args {
        [a, b] if is_symbolic(a) || is_symbolic(b) => Ok(rebuild(a.clone(), b.clone())),
        [a, b] => match (as_int(a), as_int(b)) {
            (Some(a), Some(b)) => match f(a, b) {
                Some(out) => Ok(Expr::Number(out as f64)),
                None => Err(operand_error(name, args)),
            },
            _ => Err(operand_error(name, args)),
        },
        other => Err(operand_error(name, other)),
    })
}

fn ordering2(
    name: &'static str,
    token: &'static str,
    num: fn(f64, f64) -> bool,
    text: fn(&str, &str) -> bool,
) -> Func {
    Func::new(name, move |args: &[Expr], _: &KwArgs| match args {
        [Expr::Number(a), Expr::Number(b)] => Ok(Expr::Bool(num(*a, *b))),
        [Expr::Text(a), Expr::Text(b)] => Ok(Expr::Bool(text(a, b))),
        [a, b] if is_symbolic(a) || is_symbolic(b) => Ok(match token {
            "<" => a.clone().lt_sym(b.clone()),
            "<=" => a.clone().le_sym(b.clone()),
            ">" => a.clone().gt_sym(b.clone()),
            _ => a.clone().ge_sym(b.clone()),
        }),
        other => Err(operand_error(name, other)),
    })
}

/// Integral value of a numeric constant, if it has one.
///
/// Bitwise operations only make sense on integers; the 2^53 bound keeps
/// the f64 -> i64 conversion exact.
fn as_int(e: &Expr) -> Option<i64> {
    const MAX_EXACT: f64 = 9_007_199_254_740_992.0;
    e.as_number()
        .filter(|n| n.fract() == 0.0 && n.abs() <= MAX_EXACT)
        .map(|n| n as i64)
}

fn list_index(len: usize, i: f64) -> Option<usize> {
    let i = as_int(&Expr::Number(i))?;
    let idx = if i < 0 { i + len as i64 } else { i };
    usize::try_from(idx).ok().filter(|&idx| idx < len)
}

// ===== Node builders =====

fn binary_node(func: &Func, token: &'static str, precedence: i8, lhs: Expr, rhs: Expr) -> Expr {
    Expr::call_form(
        Expr::Func(func.clone()),
        vec![lhs, rhs],
        KwArgs::new(),
        CallForm::Binary(Op { token, precedence }),
    )
}

fn comparison_node(func: &Func, token: &'static str, lhs: Expr, rhs: Expr) -> Expr {
    Expr::call_form(
        Expr::Func(func.clone()),
        vec![lhs, rhs],
        KwArgs::new(),
        CallForm::Comparison(Op {
            token,
            precedence: PREC_CMP,
        }),
    )
}

fn unary_node(func: &Func, token: &'static str, operand: Expr) -> Expr {
    Expr::call_form(
        Expr::Func(func.clone()),
        vec![operand],
        KwArgs::new(),
        CallForm::Unary(Op {
            token,
            precedence: PREC_UNARY,
        }),
    )
}

impl Expr {
    pub fn add_expr(lhs: impl Into<Expr>, rhs: impl Into<Expr>) -> Expr {
        binary_node(&OPS.add, "+", PREC_ADD, lhs.into(), rhs.into())
    }

    pub fn sub_expr(lhs: impl Into<Expr>, rhs: impl Into<Expr>) -> Expr {
        binary_node(&OPS.sub, "-", PREC_ADD, lhs.into(), rhs.into())
    }

    pub fn mul_expr(lhs: impl Into<Expr>, rhs: impl Into<Expr>) -> Expr {
        binary_node(&OPS.mul, "*", PREC_MUL, lhs.into(), rhs.into())
    }

    pub fn div_expr(lhs: impl Into<Expr>, rhs: impl Into<Expr>) -> Expr {
        binary_node(&OPS.div, "/", PREC_MUL, lhs.into(), rhs.into())
    }

    pub fn floordiv_expr(lhs: impl Into<Expr>, rhs: impl Into<Expr>) -> Expr {
        binary_node(&OPS.floordiv, "//", PREC_MUL, lhs.into(), rhs.into())
    }

    pub fn rem_expr(lhs: impl Into<Expr>, rhs: impl Into<Expr>) -> Expr {
        binary_node(&OPS.rem, "%", PREC_MUL, lhs.into(), rhs.into())
    }

    pub fn pow_expr(base: impl Into<Expr>, exponent: impl Into<Expr>) -> Expr {
        binary_node(&OPS.pow, "**", PREC_POW, base.into(), exponent.into())
    }

    pub fn shl_expr(lhs: impl Into<Expr>, rhs: impl Into<Expr>) -> Expr {
        binary_node(&OPS.shl, "<<", PREC_SHIFT, lhs.into(), rhs.into())
    }

    pub fn shr_expr(lhs: impl Into<Expr>, rhs: impl Into<Expr>) -> Expr {
        binary_node(&OPS.shr, ">>", PREC_SHIFT, lhs.into(), rhs.into())
    }

    pub fn bitand_expr(lhs: impl Into<Expr>, rhs: impl Into<Expr>) -> Expr {
        binary_node(&OPS.bitand, "&", PREC_AND, lhs.into(), rhs.into())
    }

    pub fn bitxor_expr(lhs: impl Into<Expr>, rhs: impl Into<Expr>) -> Expr {
        binary_node(&OPS.bitxor, "^", PREC_XOR, lhs.into(), rhs.into())
    }

    pub fn bitor_expr(lhs: impl Into<Expr>, rhs: impl Into<Expr>) -> Expr {
        binary_node(&OPS.bitor, "|", PREC_OR, lhs.into(), rhs.into())
    }

    /// Unary plus (Rust has no overloadable `+x`)
    pub fn pos(self) -> Expr {
        unary_node(&OPS.pos, "+", self)
    }

    /// Exponentiation (`**`; Rust `^` is XOR)
    pub fn pow(self, exponent: impl Into<Expr>) -> Expr {
        Expr::pow_expr(self, exponent)
    }

    /// Floor division (`//`)
    pub fn floor_div(self, rhs: impl Into<Expr>) -> Expr {
        Expr::floordiv_expr(self, rhs)
    }

    /// Subscript read: `base[index]`
    pub fn get_item(self, index: impl Into<Expr>) -> Expr {
        Expr::call_form(
            Expr::Func(OPS.getitem.clone()),
            vec![self, index.into()],
            KwArgs::new(),
            CallForm::Index,
        )
    }

    /// Subscript write: a plain deferred call producing the updated
    /// collection on evaluation
    pub fn set_item(self, index: impl Into<Expr>, value: impl Into<Expr>) -> Expr {
        Expr::call(&OPS.setitem, [self, index.into(), value.into()])
    }

    // Relational builders. These construct comparison nodes; structural
    // equality stays on `==`/`PartialEq`.

    pub fn eq_sym(self, rhs: impl Into<Expr>) -> Expr {
        comparison_node(&OPS.eq, "==", self, rhs.into())
    }

    pub fn ne_sym(self, rhs: impl Into<Expr>) -> Expr {
        comparison_node(&OPS.ne, "!=", self, rhs.into())
    }

    pub fn lt_sym(self, rhs: impl Into<Expr>) -> Expr {
        comparison_node(&OPS.lt, "<", self, rhs.into())
    }

    pub fn le_sym(self, rhs: impl Into<Expr>) -> Expr {
        comparison_node(&OPS.le, "<=", self, rhs.into())
    }

    pub fn gt_sym(self, rhs: impl Into<Expr>) -> Expr {
        comparison_node(&OPS.gt, ">", self, rhs.into())
    }

    pub fn ge_sym(self, rhs: impl Into<Expr>) -> Expr {
        comparison_node(&OPS.ge, ">=", self, rhs.into())
    }
}

impl Symbol {
    /// Exponentiation, converting the symbol to an expression
    pub fn pow(&self, exponent: impl Into<Expr>) -> Expr {
        Expr::pow_expr(self.to_expr(), exponent)
    }
}

// ===== Operator trait impls =====
// One macro arm per (lhs, rhs) type pair; both orderings are covered for
// numeric mixes.

macro_rules! impl_binary_operator {
    ($trait:ident, $method:ident, $ctor:ident) => {
        impl_binary_operator!(@impl $trait, $method, $ctor, Expr, Expr);
        impl_binary_operator!(@impl $trait, $method, $ctor, Expr, Symbol);
        impl_binary_operator!(@impl $trait, $method, $ctor, Expr, f64);
        impl_binary_operator!(@impl $trait, $method, $ctor, Expr, i64);
        impl_binary_operator!(@impl $trait, $method, $ctor, Symbol, Expr);
        impl_binary_operator!(@impl $trait, $method, $ctor, Symbol, Symbol);
        impl_binary_operator!(@impl $trait, $method, $ctor, Symbol, f64);
        impl_binary_operator!(@impl $trait, $method, $ctor, Symbol, i64);
        impl_binary_operator!(@impl $trait, $method, $ctor, f64, Expr);
        impl_binary_operator!(@impl $trait, $method, $ctor, f64, Symbol);
        impl_binary_operator!(@impl $trait, $method, $ctor, i64, Expr);
        impl_binary_operator!(@impl $trait, $method, $ctor, i64, Symbol);
    };
    (@impl $trait:ident, $method:ident, $ctor:ident, $lhs:ty, $rhs:ty) => {
        impl $trait<$rhs> for $lhs {
            type Output = Expr;
            fn $method(self, rhs: $rhs) -> Expr {
                Expr::$ctor(Expr::from(self), Expr::from(rhs))
            }
        }
    };
}

impl_binary_operator!(Add, add, add_expr);
impl_binary_operator!(Sub, sub, sub_expr);
impl_binary_operator!(Mul, mul, mul_expr);
impl_binary_operator!(Div, div, div_expr);
impl_binary_operator!(Rem, rem, rem_expr);
impl_binary_operator!(Shl, shl, shl_expr);
impl_binary_operator!(Shr, shr, shr_expr);
impl_binary_operator!(BitAnd, bitand, bitand_expr);
impl_binary_operator!(BitXor, bitxor, bitxor_expr);
impl_binary_operator!(BitOr, bitor, bitor_expr);

impl Neg for Expr {
    type Output = Expr;
    fn neg(self) -> Expr {
        unary_node(&OPS.neg, "-", self)
    }
}

impl Neg for Symbol {
    type Output = Expr;
    fn neg(self) -> Expr {
        unary_node(&OPS.neg, "-", self.to_expr())
    }
}

impl Not for Expr {
    type Output = Expr;
    fn not(self) -> Expr {
        unary_node(&OPS.invert, "~", self)
    }
}

impl Not for Symbol {
    type Output = Expr;
    fn not(self) -> Expr {
        unary_node(&OPS.invert, "~", self.to_expr())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rewrite::evaluate;
    use crate::symbol::sym;

    #[test]
    fn test_operator_orderings() {
        let x = sym("x");
        assert_eq!(format!("{}", x.clone() + 1.0), "x + 1");
        assert_eq!(format!("{}", 1.0 + x.clone()), "1 + x");
        assert_eq!(format!("{}", 2i64 * x.clone()), "2 * x");
        assert_eq!(format!("{}", x.clone() - x.clone()), "x - x");
    }

    #[test]
    fn test_flattening_left_only() {
        let a = sym("a");
        let b = sym("b");
        let c = sym("c");

        let chain = a.clone() + b.clone() + c.clone();
        match &chain {
            Expr::Call(call) => assert_eq!(call.args.len(), 3),
            _ => panic!("expected a call node"),
        }

        let nested = a.clone() + (b + c);
        match &nested {
            Expr::Call(call) => assert_eq!(call.args.len(), 2),
            _ => panic!("expected a call node"),
        }
    }

    #[test]
    fn test_no_flattening_across_tokens() {
        let a = sym("a");
        let b = sym("b");
        let c = sym("c");

        // a - b + c: different token, stays 2-ary with a nested left child
        let expr = (a - b) + c;
        match &expr {
            Expr::Call(call) => assert_eq!(call.args.len(), 2),
            _ => panic!("expected a call node"),
        }
        assert_eq!(format!("{}", expr), "a - b + c");
    }

    #[test]
    fn test_structural_equality_of_built_trees() {
        let first = sym("x") + 1.0;
        let second = sym("x") + 1.0;
        // Shared native callables make independently built trees equal
        assert_eq!(first, second);
    }

    #[test]
    fn test_comparison_chain_flattens() {
        let x = sym("x");
        let chained = x.to_expr().lt_sym(2.0).lt_sym(3.0);
        match &chained {
            Expr::Call(call) => {
                assert_eq!(call.args.len(), 3);
                assert!(matches!(call.form, CallForm::Comparison(_)));
            }
            _ => panic!("expected a call node"),
        }
        assert_eq!(format!("{}", chained), "x < 2 < 3");
    }

    #[test]
    fn test_native_arithmetic() {
        let e = Expr::number(7.0) % 4.0;
        assert_eq!(evaluate(&e).unwrap(), Expr::number(3.0));

        let e = Expr::number(-7.0) % 4.0;
        // Sign follows the divisor, as the original operators did
        assert_eq!(evaluate(&e).unwrap(), Expr::number(1.0));

        let e = Expr::number(7.0).floor_div(2.0);
        assert_eq!(evaluate(&e).unwrap(), Expr::number(3.0));

        let e = Expr::number(2.0).pow(10.0);
        assert_eq!(evaluate(&e).unwrap(), Expr::number(1024.0));
    }

    #[test]
    fn test_native_bitwise() {
        let e = Expr::number(6.0) & 3i64;
        assert_eq!(evaluate(&e).unwrap(), Expr::number(2.0));

        let e = Expr::number(1.0) << 4i64;
        assert_eq!(evaluate(&e).unwrap(), Expr::number(16.0));

        let e = !Expr::number(0.0);
        assert_eq!(evaluate(&e).unwrap(), Expr::number(-1.0));

        // Bitwise on a fractional value has no meaning
        let e = Expr::number(1.5) & 1i64;
        assert!(matches!(evaluate(&e), Err(SymError::BadOperands(_))));
    }

    #[test]
    fn test_native_comparisons() {
        let e = Expr::number(1.0).lt_sym(2.0);
        assert_eq!(evaluate(&e).unwrap(), Expr::Bool(true));

        let e = Expr::text("a").lt_sym(Expr::text("b"));
        assert_eq!(evaluate(&e).unwrap(), Expr::Bool(true));

        let e = Expr::symbol("x").eq_sym(Expr::symbol("x"));
        assert_eq!(evaluate(&e).unwrap(), Expr::Bool(true));
    }

    #[test]
    fn test_native_items() {
        let list = Expr::List(vec![Expr::number(10.0), Expr::number(20.0)]);
        let e = list.clone().get_item(-1.0);
        assert_eq!(evaluate(&e).unwrap(), Expr::number(20.0));

        let e = list.set_item(0.0, 99.0);
        assert_eq!(
            evaluate(&e).unwrap(),
            Expr::List(vec![Expr::number(99.0), Expr::number(20.0)])
        );
    }

    #[test]
    fn test_pos_renders_and_evaluates() {
        let e = Expr::number(3.0).pos();
        assert_eq!(format!("{}", e), "+3");
        assert_eq!(evaluate(&e).unwrap(), Expr::number(3.0));
    }
}
