//! Expression-to-function compiler
//!
//! [`to_function`] turns a tree plus a declared parameter order into a
//! [`CompiledFn`]: a conventionally-callable artifact that evaluates the
//! expression without re-walking the tree on each call.
//!
//! # Pipeline
//!
//! 1. **Harvest**: one traversal collects the distinct callables
//!    referenced by call nodes and, for every other visited position, a
//!    map from rendered string to the distinct values rendering to it.
//! 2. **Validate**: a rendered name claimed by more than one distinct
//!    value, or a duplicated parameter name, is a naming collision;
//!    compilation fails before anything is built.
//! 3. **Assign**: each distinct callable gets a fresh placeholder name
//!    (`f0`, `f1`, ...) disjoint from every rendered name.
//! 4. **Rewrite**: one substitution pass replaces each callable with its
//!    placeholder symbol.
//! 5. **Lower**: the rewritten tree becomes a flat post-order program
//!    over a constant pool, positional parameter loads and environment
//!    slots holding the original callables.
//!
//! Calling the artifact with any assignment of parameter values,
//! positional or named, is equivalent to `substitute_and_evaluate` with
//! the corresponding mapping. Declared-but-unused parameters are accepted
//! and ignored. The compiler keeps no state between invocations and the
//! artifact is immutable.

mod execution;
mod instruction;
mod lower;

use std::fmt;
use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::SymError;
use crate::expr::{Expr, Func};
use crate::rewrite::substitute;
use crate::symbol::Symbol;
use crate::traverse::traverse;

use instruction::Instr;
use lower::{assign_placeholders, Lowerer};

/// A compiled, immutable, repeatedly-callable expression.
///
/// Produced by [`to_function`]; call it with [`CompiledFn::call`]
/// (positional) or [`CompiledFn::call_named`] (by parameter name, any
/// order).
pub struct CompiledFn {
    name: String,
    params: Vec<Arc<str>>,
    instrs: Vec<Instr>,
    consts: Vec<Expr>,
    env: Vec<Func>,
    kw_pool: Vec<Vec<Arc<str>>>,
    max_stack: usize,
}

impl CompiledFn {
    /// Caller-supplied display name, for diagnostics
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared parameter names, in declared order
    pub fn params(&self) -> impl Iterator<Item = &str> + '_ {
        self.params.iter().map(|p| p.as_ref())
    }
}

impl fmt::Debug for CompiledFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CompiledFn({}({}); {} instructions, {} bound callables)",
            self.name,
            self.params.join(", "),
            self.instrs.len(),
            self.env.len()
        )
    }
}

/// Compile a tree into a conventionally-callable function.
///
/// `parameters` declares the call signature: the rendered names of the
/// given leaf symbols, in order. A free symbol that is not declared fails
/// with [`SymError::UnboundSymbol`]; naming collisions fail with
/// [`SymError::NamingCollision`] before any artifact exists.
///
/// # Example
/// ```ignore
/// let x = sym("x");
/// let cos = sym("cos");
/// let expr = cos.to_expr() + x.to_expr();
///
/// let f = to_function(&expr, &[x, cos], "y")?;
/// assert_eq!(f.call(&[1.0.into(), 0.0.into()])?, Expr::number(1.0));
/// assert_eq!(f.call_named(&[("cos", 0.0.into()), ("x", 1.0.into())])?, Expr::number(1.0));
/// ```
pub fn to_function(
    expr: &Expr,
    parameters: &[Symbol],
    name: impl Into<String>,
) -> Result<CompiledFn, SymError> {
    // Harvest: distinct callables in call position, rendered names of
    // every other visited position.
    let mut funcs: Vec<Func> = Vec::new();
    let mut seen_funcs: FxHashSet<Func> = FxHashSet::default();
    let mut names: FxHashMap<String, Vec<Expr>> = FxHashMap::default();

    traverse(expr, &mut |node| {
        match &node {
            Expr::Call(call) => {
                if let Expr::Func(f) = &*call.func {
                    if seen_funcs.insert(f.clone()) {
                        funcs.push(f.clone());
                    }
                }
            }
            // Callables are tracked by identity above; their display
            // names never bind anything.
            Expr::Func(_) => {}
            other => {
                let rendered = other.to_string();
                let entry = names.entry(rendered).or_default();
                if !entry.contains(other) {
                    entry.push(other.clone());
                }
            }
        }
        node
    });

    // Declared parameters join the name table so that a parameter
    // colliding with a differently-shaped leaf is caught too.
    let mut collisions: Vec<(String, Vec<Expr>)> = Vec::new();
    let mut seen_params: FxHashSet<&str> = FxHashSet::default();
    for param in parameters {
        let leaf = param.to_expr();
        let entry = names.entry(param.name().to_string()).or_default();
        if !entry.contains(&leaf) {
            entry.push(leaf.clone());
        }
        if !seen_params.insert(param.name()) {
            collisions.push((param.name().to_string(), vec![leaf]));
        }
    }

    collisions.extend(
        names
            .iter()
            .filter(|(_, values)| values.len() > 1)
            .map(|(name, values)| (name.clone(), values.clone())),
    );
    if !collisions.is_empty() {
        collisions.sort_by(|a, b| a.0.cmp(&b.0));
        return Err(SymError::NamingCollision { collisions });
    }

    // Fresh placeholder names, disjoint from every rendered name.
    let placeholders = assign_placeholders(funcs.len(), |candidate| names.contains_key(candidate));

    let mut table: FxHashMap<Expr, Expr> = FxHashMap::default();
    let mut env_slots: FxHashMap<Arc<str>, u32> = FxHashMap::default();
    for (slot, (func, placeholder)) in funcs.iter().zip(&placeholders).enumerate() {
        table.insert(
            Expr::Func(func.clone()),
            Expr::Symbol(Symbol::new(Arc::clone(placeholder))),
        );
        env_slots.insert(Arc::clone(placeholder), slot as u32);
    }
    let rewritten = substitute(expr, &table);

    // Lower the rewritten tree to a flat program.
    let param_names: Vec<Arc<str>> = parameters.iter().map(Symbol::arc_name).collect();
    let mut lowerer = Lowerer::new(&param_names, &env_slots);
    lowerer.lower_expr(&rewritten)?;
    let (instrs, consts, kw_pool, max_stack) = lowerer.into_parts();

    Ok(CompiledFn {
        name: name.into(),
        params: param_names,
        instrs,
        consts,
        env: funcs,
        kw_pool,
        max_stack,
    })
}
