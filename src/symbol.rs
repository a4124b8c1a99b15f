//! Leaf symbols for ergonomic expression building
//!
//! A [`Symbol`] is a terminal node carrying only a name. Equality and
//! hashing are based on that name, so two independently created symbols
//! with the same name are indistinguishable as substitution targets or
//! occurrence-counter keys.
//!
//! # Example
//! ```ignore
//! use symcall::sym;
//!
//! let x = sym("x");
//! let expr = x.clone() + 1.0;   // x + 1
//! ```

use std::fmt;
use std::sync::Arc;

use crate::expr::Expr;

/// A named leaf node
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(Arc<str>);

impl Symbol {
    /// Create a new symbol with the given name
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Symbol(name.into())
    }

    /// Get the name of the symbol
    pub fn name(&self) -> &str {
        &self.0
    }

    pub(crate) fn arc_name(&self) -> Arc<str> {
        Arc::clone(&self.0)
    }

    /// Convert to an [`Expr`] leaf
    pub fn to_expr(&self) -> Expr {
        Expr::Symbol(self.clone())
    }
}

impl AsRef<str> for Symbol {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<Symbol> for Expr {
    fn from(s: Symbol) -> Self {
        Expr::Symbol(s)
    }
}

impl From<&Symbol> for Expr {
    fn from(s: &Symbol) -> Self {
        Expr::Symbol(s.clone())
    }
}

/// Convenience function to create a [`Symbol`]
pub fn sym(name: &str) -> Symbol {
    Symbol::new(name)
}
