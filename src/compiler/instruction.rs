//! Flat program representation for compiled expressions
//!
//! A compiled expression is a post-order sequence of instructions executed
//! by a small stack machine. Operands are pushed left to right; every
//! call instruction pops its operands and pushes one result, so a
//! well-formed program leaves exactly one value on the stack.

/// One step of a compiled expression program
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Instr {
    /// Push a value from the constant pool
    LoadConst(u32),
    /// Push the caller-supplied value of the parameter at this position
    LoadParam(u32),
    /// Push the callable bound to an environment slot, as a value
    LoadEnv(u32),
    /// Invoke the callable in environment slot `env` on `argc` positional
    /// values plus the keyword values named by template `kw`
    Call { env: u32, argc: u32, kw: u32 },
    /// Invoke a callee taken from the top of the stack; below it sit the
    /// keyword values, below those the `argc` positional values
    CallDyn { argc: u32, kw: u32 },
    /// Pop `n` values and push them as one argument-list value
    BuildList(u32),
    /// Pop the values named by template `kw` and push them as one
    /// keyword-mapping value
    BuildMap(u32),
}
