//! Substitution, evaluation and inspection
//!
//! The three generic tree operations, each a different transform supplied
//! to the traversal engine:
//!
//! - [`substitute`] / [`substitute_with`]: replace nodes by table lookup
//!   or by an arbitrary mapping function, in a single pass;
//! - [`evaluate`]: collapse every deferred call, innermost first;
//! - [`substitute_and_evaluate`] / [`substitute_and_evaluate_with`]: both
//!   in one walk;
//! - [`inspect`]: count occurrences of every visited position.
//!
//! # Single-pass substitution
//!
//! A value substituted in is NOT re-examined within the same call, even if
//! it structurally contains further keys of the mapping. Substituting
//! `{x: x + 1}` into `x` yields `x + 1`; only a second call turns that
//! into `x + 1 + 1`. Nested or self-referential substitution therefore
//! requires explicit repeated calls.

use std::collections::HashMap;
use std::hash::BuildHasher;

use rustc_hash::FxHashMap;

use crate::error::SymError;
use crate::expr::Expr;
use crate::traverse::{traverse, try_traverse};

/// Replace every node found in `table` with its mapped value.
///
/// Lookup uses structural equality: two independently constructed but
/// structurally identical nodes are indistinguishable as targets. Exactly
/// one traversal pass is performed (see the module docs).
pub fn substitute<S: BuildHasher>(expr: &Expr, table: &HashMap<Expr, Expr, S>) -> Expr {
    substitute_with(expr, |node| table.get(&node).cloned().unwrap_or(node))
}

/// Replace nodes according to an arbitrary mapping function.
///
/// The function is applied at every visited position and its result is
/// used in place of the node, without re-examination.
pub fn substitute_with(expr: &Expr, mut mapper: impl FnMut(Expr) -> Expr) -> Expr {
    traverse(expr, &mut mapper)
}

/// Collapse every deferred call to its computed value, innermost first.
///
/// Nodes that are not calls pass through unchanged, and native operator
/// callables rebuild their node when an operand is still symbolic, so
/// evaluation of a partially substituted tree is partial: numeric
/// subtrees collapse, symbolic ones survive.
pub fn evaluate(expr: &Expr) -> Result<Expr, SymError> {
    try_traverse(expr, &mut |node| match node {
        Expr::Call(call) => call.invoke(),
        other => Ok(other),
    })
}

/// Substitute by table lookup and evaluate in a single pass.
///
/// Behaviorally equivalent to `evaluate(&substitute(expr, table))` but
/// visits each position once instead of twice.
pub fn substitute_and_evaluate<S: BuildHasher>(
    expr: &Expr,
    table: &HashMap<Expr, Expr, S>,
) -> Result<Expr, SymError> {
    substitute_and_evaluate_with(expr, |node| table.get(&node).cloned().unwrap_or(node))
}

/// Substitute by mapping function and evaluate in a single pass
pub fn substitute_and_evaluate_with(
    expr: &Expr,
    mut mapper: impl FnMut(Expr) -> Expr,
) -> Result<Expr, SymError> {
    try_traverse(expr, &mut |node| match mapper(node) {
        Expr::Call(call) => call.invoke(),
        other => Ok(other),
    })
}

/// Count how often each node occurs, keyed by structural identity.
///
/// Counts include the intermediate containers (argument lists and keyword
/// mappings), not only semantic leaves and calls; the total equals
/// [`Expr::node_count`].
pub fn inspect(expr: &Expr) -> FxHashMap<Expr, usize> {
    let mut counts = FxHashMap::default();
    let _ = traverse(expr, &mut |node| {
        *counts.entry(node.clone()).or_insert(0) += 1;
        node
    });
    counts
}
