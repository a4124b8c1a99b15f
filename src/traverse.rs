//! Generic bottom-up traversal and rewrite engine
//!
//! [`traverse`] walks a tree and applies a caller-supplied transform at
//! every visited position, rebuilding composites from their transformed
//! children before the transform sees them. This is the single engine
//! behind substitution, evaluation, inspection and the compiler's
//! harvesting pass.
//!
//! # Visit contract
//!
//! The transform runs exactly once per visited structural position:
//!
//! - every leaf (`Number`, `Text`, `Bool`, `Symbol`, `Func`),
//! - every item of an argument list, then the rebuilt list itself,
//! - every value of a keyword mapping, then the rebuilt mapping itself,
//! - the callee subtree of a call, and finally the rebuilt call.
//!
//! Containers are real positions: a call over two leaves yields six
//! transform invocations (callee, two leaves, list, mapping, call), not
//! three. Callers that assume one visit per logical node will miscount.
//!
//! A transform may replace a container position with another container of
//! the same kind; any other replacement for a container position inside a
//! call is ignored and the rebuilt container is kept, since a call cannot
//! hold a non-list argument vector. Standalone containers (a `List` or
//! `Map` at the root) return whatever the transform produced.
//!
//! Rebuilding a binary or comparison call re-applies the associative
//! left-flattening of the constructors, so substituting `x -> a + b`
//! into `x + c` yields the single chain `a + b + c`.
//!
//! Inputs are never mutated; unchanged subtrees are not guaranteed to be
//! shared with the input.

use std::convert::Infallible;

use crate::expr::{Expr, KwArgs};

/// Rewrite a tree bottom-up with an infallible transform.
///
/// # Example
/// ```ignore
/// // Replace every occurrence of the leaf x with 2
/// let rewritten = traverse(&expr, &mut |node| {
///     if node == Expr::symbol("x") { Expr::number(2.0) } else { node }
/// });
/// ```
pub fn traverse<F>(expr: &Expr, transform: &mut F) -> Expr
where
    F: FnMut(Expr) -> Expr,
{
    let result = try_traverse(expr, &mut |node| Ok::<_, Infallible>(transform(node)));
    match result {
        Ok(out) => out,
        Err(never) => match never {},
    }
}

/// Rewrite a tree bottom-up with a fallible transform.
///
/// The first error aborts the walk and propagates to the caller; no
/// partial result is produced.
pub fn try_traverse<F, E>(expr: &Expr, transform: &mut F) -> Result<Expr, E>
where
    F: FnMut(Expr) -> Result<Expr, E>,
{
    match expr {
        Expr::List(items) => {
            let rebuilt = traverse_items(items, transform)?;
            transform(Expr::List(rebuilt))
        }
        Expr::Map(m) => {
            let rebuilt = traverse_kwargs(m, transform)?;
            transform(Expr::Map(rebuilt))
        }
        Expr::Call(c) => {
            let func = try_traverse(&c.func, transform)?;

            let rebuilt_args = traverse_items(&c.args, transform)?;
            let args = match transform(Expr::List(rebuilt_args.clone()))? {
                Expr::List(items) => items,
                _ => rebuilt_args,
            };

            let rebuilt_kwargs = traverse_kwargs(&c.kwargs, transform)?;
            let kwargs = match transform(Expr::Map(rebuilt_kwargs.clone()))? {
                Expr::Map(m) => m,
                _ => rebuilt_kwargs,
            };

            transform(Expr::call_form(func, args, kwargs, c.form))
        }
        leaf => transform(leaf.clone()),
    }
}

fn traverse_items<F, E>(items: &[Expr], transform: &mut F) -> Result<Vec<Expr>, E>
where
    F: FnMut(Expr) -> Result<Expr, E>,
{
    items
        .iter()
        .map(|item| try_traverse(item, transform))
        .collect()
}

fn traverse_kwargs<F, E>(kwargs: &KwArgs, transform: &mut F) -> Result<KwArgs, E>
where
    F: FnMut(Expr) -> Result<Expr, E>,
{
    kwargs
        .iter()
        .map(|(k, v)| Ok((k.clone(), try_traverse(v, transform)?)))
        .collect()
}
