//! Stack-machine execution of compiled expressions
//!
//! The program is a post-order instruction sequence; execution walks it
//! once per call, never revisiting the original tree. The stack is
//! pre-allocated to the exact depth computed during lowering.

use crate::error::SymError;
use crate::expr::{Expr, KwArgs};

use super::instruction::Instr;
use super::CompiledFn;

impl CompiledFn {
    /// Call with positional arguments, in declared parameter order.
    ///
    /// # Example
    /// ```ignore
    /// let f = to_function(&expr, &[x, y], "f")?;
    /// let result = f.call(&[1.0.into(), 2.0.into()])?;
    /// ```
    pub fn call(&self, args: &[Expr]) -> Result<Expr, SymError> {
        if args.len() != self.params.len() {
            return Err(SymError::BadArguments(format!(
                "{}() takes {} arguments ({} given)",
                self.name,
                self.params.len(),
                args.len()
            )));
        }
        self.execute(args)
    }

    /// Call with named arguments, in any order.
    ///
    /// Every declared parameter must be supplied exactly once; unknown and
    /// duplicate names are rejected.
    pub fn call_named(&self, args: &[(&str, Expr)]) -> Result<Expr, SymError> {
        let mut values: Vec<Option<Expr>> = vec![None; self.params.len()];
        for (name, value) in args {
            let idx = self
                .params
                .iter()
                .position(|p| p.as_ref() == *name)
                .ok_or_else(|| {
                    SymError::BadArguments(format!(
                        "{}() got an unexpected argument `{name}`",
                        self.name
                    ))
                })?;
            if values[idx].is_some() {
                return Err(SymError::BadArguments(format!(
                    "{}() got argument `{name}` more than once",
                    self.name
                )));
            }
            values[idx] = Some(value.clone());
        }
        let mut resolved = Vec::with_capacity(self.params.len());
        for (idx, value) in values.into_iter().enumerate() {
            match value {
                Some(v) => resolved.push(v),
                None => {
                    return Err(SymError::BadArguments(format!(
                        "{}() is missing argument `{}`",
                        self.name, self.params[idx]
                    )))
                }
            }
        }
        self.execute(&resolved)
    }

    fn execute(&self, params: &[Expr]) -> Result<Expr, SymError> {
        let mut stack: Vec<Expr> = Vec::with_capacity(self.max_stack);

        for instr in &self.instrs {
            match *instr {
                Instr::LoadConst(idx) => {
                    stack.push(self.consts[idx as usize].clone());
                }
                Instr::LoadParam(idx) => {
                    stack.push(params[idx as usize].clone());
                }
                Instr::LoadEnv(slot) => {
                    stack.push(Expr::Func(self.env[slot as usize].clone()));
                }
                Instr::Call { env, argc, kw } => {
                    let kwargs = self.pop_kwargs(&mut stack, kw)?;
                    let args = pop_n(&mut stack, argc as usize)?;
                    let result = self.env[env as usize].invoke(&args, &kwargs)?;
                    stack.push(result);
                }
                Instr::CallDyn { argc, kw } => {
                    let callee = pop_one(&mut stack)?;
                    let kwargs = self.pop_kwargs(&mut stack, kw)?;
                    let args = pop_n(&mut stack, argc as usize)?;
                    let result = match callee {
                        Expr::Func(f) => f.invoke(&args, &kwargs)?,
                        other => return Err(SymError::NotCallable(other.to_string())),
                    };
                    stack.push(result);
                }
                Instr::BuildList(n) => {
                    let items = pop_n(&mut stack, n as usize)?;
                    stack.push(Expr::List(items));
                }
                Instr::BuildMap(kw) => {
                    let kwargs = self.pop_kwargs(&mut stack, kw)?;
                    stack.push(Expr::Map(kwargs));
                }
            }
        }

        debug_assert_eq!(stack.len(), 1);
        pop_one(&mut stack)
    }

    fn pop_kwargs(&self, stack: &mut Vec<Expr>, kw: u32) -> Result<KwArgs, SymError> {
        let names = &self.kw_pool[kw as usize];
        let values = pop_n(stack, names.len())?;
        Ok(names.iter().cloned().zip(values).collect())
    }
}

fn pop_n(stack: &mut Vec<Expr>, n: usize) -> Result<Vec<Expr>, SymError> {
    if stack.len() < n {
        return Err(SymError::BadArguments(
            "internal: evaluation stack underflow".to_string(),
        ));
    }
    Ok(stack.split_off(stack.len() - n))
}

fn pop_one(stack: &mut Vec<Expr>) -> Result<Expr, SymError> {
    stack.pop().ok_or_else(|| {
        SymError::BadArguments("internal: evaluation stack underflow".to_string())
    })
}
