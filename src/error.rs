use std::fmt;

use crate::expr::Expr;

/// Errors that can occur while evaluating or compiling expression trees
#[derive(Debug, Clone, PartialEq)]
pub enum SymError {
    /// More than one distinct value renders to the same name during
    /// compilation. Carries the offending name together with every value
    /// that claims it. Raised before any function artifact is built.
    NamingCollision {
        collisions: Vec<(String, Vec<Expr>)>,
    },

    /// An abstract contract was exercised without a concrete override,
    /// e.g. coercing an unevaluated comparison node to a boolean.
    /// This is a programming error, not a runtime condition.
    Unimplemented(&'static str),

    /// A call node was invoked but its callee position does not hold a
    /// callable. Carries the rendered form of the offending callee.
    NotCallable(String),

    /// A native callable was applied to operands it does not support.
    BadOperands(String),

    /// Compilation found a free symbol that is neither a declared
    /// parameter nor an assigned placeholder.
    UnboundSymbol(String),

    /// A compiled function was called with the wrong number of arguments,
    /// or with an unknown, duplicate or missing parameter name.
    BadArguments(String),
}

impl SymError {
    /// Create a BadOperands error for a named operation
    pub(crate) fn bad_operands(op: &str, detail: impl fmt::Display) -> Self {
        SymError::BadOperands(format!("{op}: {detail}"))
    }
}

impl fmt::Display for SymError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SymError::NamingCollision { collisions } => {
                write!(f, "more than one value renders to the same name:")?;
                for (name, values) in collisions {
                    write!(f, " `{}` ({} candidates)", name, values.len().max(2))?;
                }
                Ok(())
            }
            SymError::Unimplemented(what) => {
                write!(f, "not implemented: {what}")
            }
            SymError::NotCallable(callee) => {
                write!(f, "`{callee}` is not callable")
            }
            SymError::BadOperands(msg) => {
                write!(f, "unsupported operands: {msg}")
            }
            SymError::UnboundSymbol(name) => {
                write!(
                    f,
                    "symbol `{name}` is not a declared parameter of the compiled function"
                )
            }
            SymError::BadArguments(msg) => {
                write!(f, "bad call arguments: {msg}")
            }
        }
    }
}

impl std::error::Error for SymError {}
