//! Canonical rendering for expression trees
//!
//! The rendered string is the single shared artifact used for display and
//! for the compiler's name bookkeeping, so it must be unambiguous: two
//! differently-meaning nodes must never render identically.
//!
//! Operator-form calls render with minimal parenthesization: a child is
//! wrapped in parentheses when it is itself operator-form and either has
//! strictly lower precedence than its parent or carries the same operator
//! token (same-token children only remain after the left-flattening of
//! associative chains, e.g. the right operand of `a - (b - c)`).

use std::fmt;

use crate::expr::{Call, CallForm, Expr, Op};

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Number(n) => fmt_number(f, *n),
            Expr::Text(s) => f.write_str(s),
            Expr::Bool(b) => write!(f, "{}", b),
            Expr::Symbol(s) => write!(f, "{}", s),
            Expr::Func(func) => f.write_str(func.name()),
            Expr::List(items) => {
                f.write_str("(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                // Trailing comma keeps a one-element list distinct from a
                // parenthesized expression.
                if items.len() == 1 {
                    f.write_str(",")?;
                }
                f.write_str(")")
            }
            Expr::Map(m) => {
                f.write_str("{")?;
                for (i, (k, v)) in m.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}={}", k, v)?;
                }
                f.write_str("}")
            }
            Expr::Call(c) => write!(f, "{}", c),
        }
    }
}

impl fmt::Display for Call {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.form {
            CallForm::Function => {
                write!(f, "{}(", self.func)?;
                for (i, arg) in self.args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                let mut sep = !self.args.is_empty();
                for (k, v) in &self.kwargs {
                    if sep {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}={}", k, v)?;
                    sep = true;
                }
                f.write_str(")")
            }
            CallForm::Unary(op) => {
                f.write_str(op.token)?;
                match self.args.first() {
                    Some(arg) => fmt_operand(f, op, arg),
                    None => Ok(()),
                }
            }
            CallForm::Binary(op) | CallForm::Comparison(op) => {
                for (i, arg) in self.args.iter().enumerate() {
                    if i > 0 {
                        write!(f, " {} ", op.token)?;
                    }
                    fmt_operand(f, op, arg)?;
                }
                Ok(())
            }
            CallForm::Index => {
                let op = Op {
                    token: "[]",
                    precedence: crate::expr::PREC_INDEX,
                };
                if let Some(base) = self.args.first() {
                    fmt_operand(f, op, base)?;
                }
                f.write_str("[")?;
                if let Some(index) = self.args.get(1) {
                    fmt_operand(f, op, index)?;
                }
                f.write_str("]")
            }
        }
    }
}

/// Render a child of an operator-form node, parenthesizing when required
fn fmt_operand(f: &mut fmt::Formatter<'_>, parent: Op, child: &Expr) -> fmt::Result {
    let needs_parens = child
        .as_call()
        .and_then(|c| c.form.op_info())
        .is_some_and(|op| op.precedence < parent.precedence || op.token == parent.token);
    if needs_parens {
        write!(f, "({})", child)
    } else {
        write!(f, "{}", child)
    }
}

fn fmt_number(f: &mut fmt::Formatter<'_>, n: f64) -> fmt::Result {
    if n.is_nan() {
        f.write_str("NaN")
    } else if n.is_infinite() {
        if n > 0.0 {
            f.write_str("Infinity")
        } else {
            f.write_str("-Infinity")
        }
    } else if n.fract() == 0.0 && n.abs() < 1e10 {
        // Display as integer if no fractional part
        write!(f, "{}", n as i64)
    } else {
        write!(f, "{}", n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::sym;

    #[test]
    fn test_display_number() {
        assert_eq!(format!("{}", Expr::number(3.0)), "3");
        assert_eq!(format!("{}", Expr::number(-2.0)), "-2");
        assert!(format!("{}", Expr::number(3.14)).starts_with("3.14"));
        assert_eq!(format!("{}", Expr::number(f64::NAN)), "NaN");
        assert_eq!(format!("{}", Expr::number(f64::INFINITY)), "Infinity");
    }

    #[test]
    fn test_display_leaves() {
        assert_eq!(format!("{}", Expr::symbol("x")), "x");
        assert_eq!(format!("{}", Expr::text("label")), "label");
        assert_eq!(format!("{}", Expr::Bool(true)), "true");
    }

    #[test]
    fn test_display_binary() {
        let x = sym("x");
        let expr = x.to_expr() + 1.0;
        assert_eq!(format!("{}", expr), "x + 1");
    }

    #[test]
    fn test_display_precedence() {
        let x = sym("x");

        // (x + 1) * 2 keeps the parens; the sum has lower precedence
        let expr = (x.to_expr() + 1.0) * 2.0;
        assert_eq!(format!("{}", expr), "(x + 1) * 2");

        // x + 1 + 2 flattens into one chain, no parens
        let expr = x.to_expr() + 1.0 + 2.0;
        assert_eq!(format!("{}", expr), "x + 1 + 2");

        // x * 2 + 1: higher-precedence child needs no parens
        let expr = x.to_expr() * 2.0 + 1.0;
        assert_eq!(format!("{}", expr), "x * 2 + 1");
    }

    #[test]
    fn test_display_same_token_right_child() {
        let a = sym("a");
        let b = sym("b");
        let c = sym("c");

        // Only the left operand splices, so a + (b + c) stays nested and
        // the same-token right child is parenthesized.
        let expr = a.to_expr() + (b.to_expr() + c.to_expr());
        assert_eq!(format!("{}", expr), "a + (b + c)");
    }

    #[test]
    fn test_display_unary() {
        let x = sym("x");
        assert_eq!(format!("{}", -x.to_expr()), "-x");
        // Lower-precedence child of a unary operator is parenthesized
        assert_eq!(format!("{}", -(x.to_expr() + 1.0)), "-(x + 1)");
    }

    #[test]
    fn test_display_function_call() {
        use crate::expr::Func;

        let cos = Func::wrap1("f64::cos", f64::cos);
        let x = sym("x");
        let expr = Expr::call(&cos, [x.into()]);
        assert_eq!(format!("{}", expr), "f64::cos(x)");
    }

    #[test]
    fn test_display_kwargs() {
        use crate::expr::{Func, KwArgs};

        let f = Func::new("integrate", |_args, _kw| Ok(Expr::number(0.0)));
        let mut kwargs = KwArgs::new();
        kwargs.insert("step".into(), Expr::number(0.5));
        let expr = Expr::call_with(&f, vec![Expr::symbol("x")], kwargs);
        assert_eq!(format!("{}", expr), "integrate(x, step=0.5)");
    }

    #[test]
    fn test_display_index() {
        let a = sym("a");
        let expr = a.to_expr().get_item(0.0);
        assert_eq!(format!("{}", expr), "a[0]");
    }

    #[test]
    fn test_display_comparison() {
        let x = sym("x");
        let expr = x.to_expr().lt_sym(2.0);
        assert_eq!(format!("{}", expr), "x < 2");
    }

    #[test]
    fn test_display_list_and_map() {
        use crate::expr::KwArgs;

        let list = Expr::List(vec![Expr::symbol("x"), Expr::number(1.0)]);
        assert_eq!(format!("{}", list), "(x, 1)");

        let single = Expr::List(vec![Expr::symbol("x")]);
        assert_eq!(format!("{}", single), "(x,)");

        let mut m = KwArgs::new();
        m.insert("k".into(), Expr::number(2.0));
        assert_eq!(format!("{}", Expr::Map(m)), "{k=2}");
    }
}
