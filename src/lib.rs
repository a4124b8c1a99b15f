//! Deferred Symbolic Call Trees
//!
//! A small library for building symbolic expression trees with ordinary
//! operator syntax over opaque placeholder values and wrapped callables,
//! then manipulating those trees generically.
//!
//! # Features
//! - **Operator-syntax construction**: `x + 1.0`, `2.0 * y`, `x.pow(2.0)`
//!   build immutable call nodes instead of computing
//! - **Structural equality and hashing**, so trees and leaves work as
//!   dictionary keys for substitution and counting
//! - **Generic bottom-up traversal** over nodes and their structural
//!   containers, with a caller-supplied transform
//! - **Substitution, evaluation, inspection** built on the traversal
//! - **Compilation** of a tree into a conventionally-callable function
//!   for repeated fast evaluation without re-walking the tree
//!
//! # Usage
//! ```ignore
//! use symcall::{sym, to_function, substitute_and_evaluate, Expr, Func};
//!
//! let x = sym("x");
//! let cos = sym("cos");
//! let native_cos = Func::wrap1("f64::cos", f64::cos);
//! let y = Expr::call(&native_cos, [x.to_expr()]) + cos.to_expr();
//!
//! let f = to_function(&y, &[x, cos], "y")?;
//! f.call(&[1.0.into(), 0.0.into()])?;
//! f.call_named(&[("cos", 0.0.into()), ("x", 1.0.into())])?;
//! ```
//!
//! Trees are immutable: every operation returns new nodes and the
//! original is never changed. All core operations are synchronous and
//! single-threaded; nodes are `Send + Sync` so independent trees can be
//! walked from different threads without coordination.

mod builder;
mod compiler;
mod display;
mod error;
mod expr;
mod rewrite;
mod symbol;
mod traverse;

#[cfg(test)]
mod tests;

pub use compiler::{to_function, CompiledFn};
pub use error::SymError;
pub use expr::{Call, CallForm, Expr, Func, KwArgs, NativeFn, Op};
pub use rewrite::{
    evaluate, inspect, substitute, substitute_and_evaluate, substitute_and_evaluate_with,
    substitute_with,
};
pub use symbol::{sym, Symbol};
pub use traverse::{traverse, try_traverse};
