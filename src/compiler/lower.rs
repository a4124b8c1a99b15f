//! Lowering of a rewritten tree to a flat instruction program
//!
//! Runs after callables have been substituted with placeholder symbols:
//! parameter symbols become positional loads, placeholder symbols in call
//! position become environment-slot calls, constants go to a deduplicated
//! pool. Operator calls with more than two flattened arguments lower to a
//! chain of binary applications, preserving left-to-right reduction
//! semantics.
//!
//! Stack depth is tracked during lowering so execution can pre-allocate
//! exactly the stack it needs.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::error::SymError;
use crate::expr::Expr;

use super::instruction::Instr;

pub(crate) struct Lowerer<'a> {
    params: &'a [Arc<str>],
    env_slots: &'a FxHashMap<Arc<str>, u32>,
    instrs: Vec<Instr>,
    consts: Vec<Expr>,
    const_ids: FxHashMap<Expr, u32>,
    kw_pool: Vec<Vec<Arc<str>>>,
    cur_stack: usize,
    max_stack: usize,
}

impl<'a> Lowerer<'a> {
    pub(crate) fn new(params: &'a [Arc<str>], env_slots: &'a FxHashMap<Arc<str>, u32>) -> Self {
        Lowerer {
            params,
            env_slots,
            instrs: Vec::with_capacity(16),
            consts: Vec::new(),
            const_ids: FxHashMap::default(),
            // Slot 0 is the shared empty keyword template
            kw_pool: vec![Vec::new()],
            cur_stack: 0,
            max_stack: 0,
        }
    }

    pub(crate) fn into_parts(self) -> (Vec<Instr>, Vec<Expr>, Vec<Vec<Arc<str>>>, usize) {
        (self.instrs, self.consts, self.kw_pool, self.max_stack)
    }

    fn emit(&mut self, instr: Instr) {
        self.instrs.push(instr);
    }

    fn push(&mut self) {
        self.cur_stack += 1;
        self.max_stack = self.max_stack.max(self.cur_stack);
    }

    /// Account for an instruction that pops `n` values and pushes one
    fn collapse(&mut self, n: usize) {
        self.cur_stack = self.cur_stack.saturating_sub(n);
        self.push();
    }

    fn add_const(&mut self, value: Expr) -> u32 {
        if let Some(&idx) = self.const_ids.get(&value) {
            return idx;
        }
        let idx = self.consts.len() as u32;
        self.const_ids.insert(value.clone(), idx);
        self.consts.push(value);
        idx
    }

    fn kw_slot(&mut self, names: Vec<Arc<str>>) -> u32 {
        if let Some(idx) = self.kw_pool.iter().position(|t| *t == names) {
            return idx as u32;
        }
        let idx = self.kw_pool.len() as u32;
        self.kw_pool.push(names);
        idx
    }

    pub(crate) fn lower_expr(&mut self, expr: &Expr) -> Result<(), SymError> {
        match expr {
            Expr::Symbol(s) => {
                if let Some(idx) = self.params.iter().position(|p| p.as_ref() == s.name()) {
                    self.emit(Instr::LoadParam(idx as u32));
                    self.push();
                } else if let Some(&slot) = self.env_slots.get(s.name()) {
                    self.emit(Instr::LoadEnv(slot));
                    self.push();
                } else {
                    return Err(SymError::UnboundSymbol(s.name().to_string()));
                }
                Ok(())
            }
            Expr::Number(_) | Expr::Text(_) | Expr::Bool(_) | Expr::Func(_) => {
                let idx = self.add_const(expr.clone());
                self.emit(Instr::LoadConst(idx));
                self.push();
                Ok(())
            }
            Expr::List(items) => {
                for item in items {
                    self.lower_expr(item)?;
                }
                self.emit(Instr::BuildList(items.len() as u32));
                self.collapse(items.len());
                Ok(())
            }
            Expr::Map(m) => {
                let names: Vec<Arc<str>> = m.keys().cloned().collect();
                for value in m.values() {
                    self.lower_expr(value)?;
                }
                let kw = self.kw_slot(names);
                self.emit(Instr::BuildMap(kw));
                self.collapse(m.len());
                Ok(())
            }
            Expr::Call(c) => self.lower_call(c),
        }
    }

    fn lower_call(&mut self, call: &crate::expr::Call) -> Result<(), SymError> {
        let static_slot = match &*call.func {
            Expr::Symbol(s) => self.env_slots.get(s.name()).copied(),
            _ => None,
        };

        // A flattened operator chain evaluates by left-to-right reduction
        // of its binary callable.
        if call.form.is_operator() && call.args.len() > 2 {
            self.lower_expr(&call.args[0])?;
            for arg in &call.args[1..] {
                self.lower_expr(arg)?;
                match static_slot {
                    Some(env) => self.emit(Instr::Call { env, argc: 2, kw: 0 }),
                    None => {
                        self.lower_expr(&call.func)?;
                        self.emit(Instr::CallDyn { argc: 2, kw: 0 });
                        self.cur_stack = self.cur_stack.saturating_sub(1);
                    }
                }
                self.collapse(2);
            }
            return Ok(());
        }

        for arg in &call.args {
            self.lower_expr(arg)?;
        }
        let kw_names: Vec<Arc<str>> = call.kwargs.keys().cloned().collect();
        for value in call.kwargs.values() {
            self.lower_expr(value)?;
        }
        let operands = call.args.len() + call.kwargs.len();
        let kw = self.kw_slot(kw_names);

        match static_slot {
            Some(env) => {
                self.emit(Instr::Call {
                    env,
                    argc: call.args.len() as u32,
                    kw,
                });
                self.collapse(operands);
            }
            None => {
                self.lower_expr(&call.func)?;
                self.emit(Instr::CallDyn {
                    argc: call.args.len() as u32,
                    kw,
                });
                self.collapse(operands + 1);
            }
        }
        Ok(())
    }
}

/// Assign each callable a fresh placeholder name disjoint from every name
/// already in use.
///
/// Candidates come from a monotonically increasing counter (`f0`, `f1`,
/// ...); any candidate already taken is skipped, so a tree that happens to
/// contain a leaf named `f0` never gets shadowed.
pub(crate) fn assign_placeholders(count: usize, taken: impl Fn(&str) -> bool) -> Vec<Arc<str>> {
    let mut names = Vec::with_capacity(count);
    let mut i = 0usize;
    while names.len() < count {
        let candidate = format!("f{i}");
        i += 1;
        if !taken(&candidate) {
            names.push(Arc::from(candidate));
        }
    }
    names
}
