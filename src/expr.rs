//! Expression tree node model
//!
//! Every node is an [`Expr`]. Leaves are opaque constants ([`Expr::Number`],
//! [`Expr::Text`], [`Expr::Bool`]), named placeholders ([`Expr::Symbol`]) or
//! captured callables ([`Expr::Func`]). Composites are deferred invocations
//! ([`Expr::Call`]) and the two structural containers that appear inside
//! them: the ordered argument list ([`Expr::List`]) and the keyword mapping
//! ([`Expr::Map`]). Containers are first-class nodes so that the traversal
//! engine visits them like any other position.
//!
//! Trees are immutable. Every transformation builds new nodes; `Arc`
//! children may be shared but are never mutated. Structural equality and
//! hashing are independent of where or when a node was constructed, which
//! is what makes dictionary-style substitution and occurrence counting
//! work.

use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::error::SymError;
use crate::symbol::Symbol;

/// Keyword-argument mapping attached to a call node.
///
/// A `BTreeMap` keeps keyword order deterministic, which makes equality,
/// hashing and rendering canonical.
pub type KwArgs = BTreeMap<Arc<str>, Expr>;

/// Signature of a captured native callable
pub type NativeFn = dyn Fn(&[Expr], &KwArgs) -> Result<Expr, SymError> + Send + Sync;

// Operator precedence levels, used only for rendering decisions.
pub(crate) const PREC_INDEX: i8 = 5;
pub(crate) const PREC_POW: i8 = 3;
pub(crate) const PREC_UNARY: i8 = 2;
pub(crate) const PREC_MUL: i8 = 1;
pub(crate) const PREC_ADD: i8 = 0;
pub(crate) const PREC_SHIFT: i8 = -1;
pub(crate) const PREC_AND: i8 = -2;
pub(crate) const PREC_XOR: i8 = -3;
pub(crate) const PREC_OR: i8 = -4;
pub(crate) const PREC_CMP: i8 = -5;

/// A captured callable with a qualified display name.
///
/// Equality and hashing use the identity of the underlying closure, not
/// the display name: wrapping the same native function twice produces two
/// distinct `Func` values, while clones of one `Func` are all equal. This
/// mirrors how substitution tables distinguish callables.
#[derive(Clone)]
pub struct Func {
    name: Arc<str>,
    call: Arc<NativeFn>,
}

impl Func {
    /// Wrap a native callable under a qualified display name
    pub fn new(
        name: impl Into<Arc<str>>,
        call: impl Fn(&[Expr], &KwArgs) -> Result<Expr, SymError> + Send + Sync + 'static,
    ) -> Self {
        Func {
            name: name.into(),
            call: Arc::new(call),
        }
    }

    /// Wrap a unary `f64 -> f64` function.
    ///
    /// The wrapper extracts a single numeric argument and rejects anything
    /// else with [`SymError::BadOperands`].
    ///
    /// # Example
    /// ```ignore
    /// let cos = Func::wrap1("f64::cos", f64::cos);
    /// ```
    pub fn wrap1(name: impl Into<Arc<str>>, f: impl Fn(f64) -> f64 + Send + Sync + 'static) -> Self {
        let name = name.into();
        let label = Arc::clone(&name);
        Func::new(name, move |args: &[Expr], _kwargs: &KwArgs| match args {
            [Expr::Number(x)] => Ok(Expr::Number(f(*x))),
            _ => Err(SymError::bad_operands(
                &label,
                format_args!("expected one numeric argument, got {}", args.len()),
            )),
        })
    }

    /// Wrap a binary `(f64, f64) -> f64` function
    pub fn wrap2(
        name: impl Into<Arc<str>>,
        f: impl Fn(f64, f64) -> f64 + Send + Sync + 'static,
    ) -> Self {
        let name = name.into();
        let label = Arc::clone(&name);
        Func::new(name, move |args: &[Expr], _kwargs: &KwArgs| match args {
            [Expr::Number(a), Expr::Number(b)] => Ok(Expr::Number(f(*a, *b))),
            _ => Err(SymError::bad_operands(
                &label,
                format_args!("expected two numeric arguments, got {}", args.len()),
            )),
        })
    }

    /// Qualified display name of the callable
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Apply the captured callable to already-evaluated arguments
    pub fn invoke(&self, args: &[Expr], kwargs: &KwArgs) -> Result<Expr, SymError> {
        (self.call)(args, kwargs)
    }

    fn addr(&self) -> usize {
        Arc::as_ptr(&self.call).cast::<()>() as usize
    }
}

impl PartialEq for Func {
    fn eq(&self, other: &Self) -> bool {
        self.addr() == other.addr()
    }
}

impl Eq for Func {}

impl Hash for Func {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.addr().hash(state);
    }
}

impl fmt::Debug for Func {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Func({} @ {:#x})", self.name, self.addr())
    }
}

/// Operator token and precedence for rendering.
///
/// Precedence decides minimal parenthesization only; it never affects
/// evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Op {
    pub token: &'static str,
    pub precedence: i8,
}

/// The concrete kind of a call node.
///
/// `Function` is a plain deferred call rendered as `name(arg, ...)`. The
/// operator forms add a token and precedence for infix/prefix rendering.
/// `Binary` nodes become n-ary through associative chain flattening;
/// `Comparison` is the relational refinement whose boolean coercion is an
/// unimplemented contract until the node is evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallForm {
    Function,
    Unary(Op),
    Binary(Op),
    Comparison(Op),
    Index,
}

impl CallForm {
    /// Token and precedence for operator-form nodes, `None` for plain calls
    pub fn op_info(&self) -> Option<Op> {
        match self {
            CallForm::Function => None,
            CallForm::Unary(op) | CallForm::Binary(op) | CallForm::Comparison(op) => Some(*op),
            CallForm::Index => Some(Op {
                token: "[]",
                precedence: PREC_INDEX,
            }),
        }
    }

    /// Whether this call renders in operator form
    pub fn is_operator(&self) -> bool {
        !matches!(self, CallForm::Function)
    }
}

/// A deferred invocation: callee, ordered arguments, keyword arguments
/// and the rendering form.
#[derive(Debug, Clone, PartialEq, Hash)]
pub struct Call {
    pub func: Arc<Expr>,
    pub args: Vec<Expr>,
    pub kwargs: KwArgs,
    pub form: CallForm,
}

impl Eq for Call {}

impl Call {
    /// Invoke the captured callable on the (already-evaluated) arguments.
    ///
    /// An operator-form call with more than two flattened arguments is
    /// invoked by left-to-right reduction of its binary function over the
    /// argument list.
    pub fn invoke(&self) -> Result<Expr, SymError> {
        let func = match &*self.func {
            Expr::Func(f) => f,
            other => return Err(SymError::NotCallable(other.to_string())),
        };
        if self.form.is_operator() && self.args.len() > 2 {
            let mut acc = self.args[0].clone();
            let empty = KwArgs::new();
            for arg in &self.args[1..] {
                acc = func.invoke(&[acc, arg.clone()], &empty)?;
            }
            Ok(acc)
        } else {
            func.invoke(&self.args, &self.kwargs)
        }
    }
}

/// An expression tree node
#[derive(Debug, Clone)]
pub enum Expr {
    /// Opaque numeric constant
    Number(f64),
    /// Opaque string constant
    Text(Arc<str>),
    /// Boolean value, produced by evaluating comparison calls
    Bool(bool),
    /// Named leaf
    Symbol(Symbol),
    /// Captured callable
    Func(Func),
    /// Ordered argument list (structural container)
    List(Vec<Expr>),
    /// Keyword-argument mapping (structural container)
    Map(KwArgs),
    /// Deferred invocation
    Call(Call),
}

impl Expr {
    /// Create a numeric constant
    pub fn number(n: f64) -> Self {
        Expr::Number(n)
    }

    /// Create a string constant
    pub fn text(s: impl Into<Arc<str>>) -> Self {
        Expr::Text(s.into())
    }

    /// Create a named leaf
    pub fn symbol(name: impl Into<Arc<str>>) -> Self {
        Expr::Symbol(Symbol::new(name))
    }

    /// Create a plain deferred call with positional arguments.
    ///
    /// # Example
    /// ```ignore
    /// let cos = Func::wrap1("f64::cos", f64::cos);
    /// let x = sym("x");
    ///
    /// Expr::call(&cos, [x.into()]);          // f64::cos(x)
    /// ```
    pub fn call<const N: usize>(func: &Func, args: [Expr; N]) -> Self {
        Expr::call_with(func, args.into(), KwArgs::new())
    }

    /// Create a plain deferred call with positional and keyword arguments
    pub fn call_with(func: &Func, args: Vec<Expr>, kwargs: KwArgs) -> Self {
        Expr::Call(Call {
            func: Arc::new(Expr::Func(func.clone())),
            args,
            kwargs,
            form: CallForm::Function,
        })
    }

    /// Create a deferred call whose callee is itself an expression.
    ///
    /// This is how a symbol can stand in for a function that is only bound
    /// at evaluation or compiled-call time.
    pub fn apply(callee: impl Into<Expr>, args: Vec<Expr>) -> Self {
        Expr::Call(Call {
            func: Arc::new(callee.into()),
            args,
            kwargs: KwArgs::new(),
            form: CallForm::Function,
        })
    }

    /// Build a call node, re-applying associative chain flattening.
    ///
    /// If the form is `Binary` or `Comparison`, the argument list has
    /// exactly two entries and the left one is a call of the identical
    /// form, the left argument list is spliced in place: `a + b + c`
    /// becomes one 3-ary node. Only the left operand is inspected, so
    /// `a + (b + c)` stays nested.
    pub(crate) fn call_form(func: Expr, args: Vec<Expr>, kwargs: KwArgs, form: CallForm) -> Self {
        let args = match form {
            CallForm::Binary(_) | CallForm::Comparison(_) => flatten_left(args, form),
            _ => args,
        };
        Expr::Call(Call {
            func: Arc::new(func),
            args,
            kwargs,
            form,
        })
    }

    /// Check if this is a numeric constant and return its value
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Expr::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Borrow the call node, if this is one
    pub fn as_call(&self) -> Option<&Call> {
        match self {
            Expr::Call(c) => Some(c),
            _ => None,
        }
    }

    /// Whether this node is a deferred call
    pub fn is_call(&self) -> bool {
        matches!(self, Expr::Call(_))
    }

    /// Coerce to a boolean.
    ///
    /// Only an evaluated [`Expr::Bool`] has a truth value. Forcing an
    /// unevaluated node, a comparison in particular, is the unimplemented
    /// contract of the abstract node type.
    pub fn truth(&self) -> Result<bool, SymError> {
        match self {
            Expr::Bool(b) => Ok(*b),
            _ => Err(SymError::Unimplemented(
                "boolean coercion of an unevaluated expression",
            )),
        }
    }

    /// Count the positions the traversal engine would visit in this tree.
    ///
    /// Each leaf counts once; a call contributes itself, its callee
    /// subtree, its argument-list container and its keyword container.
    pub fn node_count(&self) -> usize {
        match self {
            Expr::Number(_) | Expr::Text(_) | Expr::Bool(_) | Expr::Symbol(_) | Expr::Func(_) => 1,
            Expr::List(items) => 1 + items.iter().map(Expr::node_count).sum::<usize>(),
            Expr::Map(m) => 1 + m.values().map(Expr::node_count).sum::<usize>(),
            Expr::Call(c) => {
                let args = 1 + c.args.iter().map(Expr::node_count).sum::<usize>();
                let kwargs = 1 + c.kwargs.values().map(Expr::node_count).sum::<usize>();
                1 + c.func.node_count() + args + kwargs
            }
        }
    }
}

fn flatten_left(args: Vec<Expr>, form: CallForm) -> Vec<Expr> {
    match <[Expr; 2]>::try_from(args) {
        Ok([Expr::Call(left), right]) if left.form == form => {
            let mut spliced = left.args;
            spliced.push(right);
            spliced
        }
        Ok(pair) => pair.into(),
        Err(args) => args,
    }
}

// Structural equality. Numbers compare by bit pattern so that equality
// stays consistent with hashing even for NaN.
impl PartialEq for Expr {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Expr::Number(a), Expr::Number(b)) => a.to_bits() == b.to_bits(),
            (Expr::Text(a), Expr::Text(b)) => a == b,
            (Expr::Bool(a), Expr::Bool(b)) => a == b,
            (Expr::Symbol(a), Expr::Symbol(b)) => a == b,
            (Expr::Func(a), Expr::Func(b)) => a == b,
            (Expr::List(a), Expr::List(b)) => a == b,
            (Expr::Map(a), Expr::Map(b)) => a == b,
            (Expr::Call(a), Expr::Call(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Expr {}

impl Hash for Expr {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Expr::Number(n) => n.to_bits().hash(state),
            Expr::Text(s) => s.hash(state),
            Expr::Bool(b) => b.hash(state),
            Expr::Symbol(s) => s.hash(state),
            Expr::Func(f) => f.hash(state),
            Expr::List(items) => items.hash(state),
            Expr::Map(m) => m.hash(state),
            Expr::Call(c) => c.hash(state),
        }
    }
}

impl From<f64> for Expr {
    fn from(n: f64) -> Self {
        Expr::Number(n)
    }
}

impl From<i64> for Expr {
    fn from(n: i64) -> Self {
        Expr::Number(n as f64)
    }
}

impl From<i32> for Expr {
    fn from(n: i32) -> Self {
        Expr::Number(f64::from(n))
    }
}

impl From<bool> for Expr {
    fn from(b: bool) -> Self {
        Expr::Bool(b)
    }
}

impl From<&str> for Expr {
    fn from(s: &str) -> Self {
        Expr::text(s)
    }
}

impl From<Func> for Expr {
    fn from(f: Func) -> Self {
        Expr::Func(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::sym;

    #[test]
    fn test_structural_equality() {
        let a = Expr::symbol("x");
        let b = Expr::symbol("x");
        assert_eq!(a, b);

        assert_eq!(Expr::number(2.0), Expr::number(2.0));
        assert_ne!(Expr::number(2.0), Expr::number(3.0));
        assert_ne!(Expr::number(2.0), Expr::text("2"));
    }

    #[test]
    fn test_func_identity() {
        let cos = Func::wrap1("f64::cos", f64::cos);
        let also_cos = cos.clone();
        let other = Func::wrap1("f64::cos", f64::cos);

        assert_eq!(cos, also_cos);
        // Same name, separately wrapped: distinct callables
        assert_ne!(cos, other);
    }

    #[test]
    fn test_expr_as_map_key() {
        use std::collections::HashMap;

        let mut table = HashMap::new();
        let x = sym("x");
        table.insert(x.to_expr(), Expr::number(1.0));
        // A second construction of the same symbol finds the entry
        assert_eq!(table.get(&Expr::symbol("x")), Some(&Expr::number(1.0)));
    }

    #[test]
    fn test_call_invoke() {
        let add = Func::wrap2("add", |a, b| a + b);
        let call = Expr::call(&add, [Expr::number(1.0), Expr::number(2.0)]);
        match call {
            Expr::Call(c) => assert_eq!(c.invoke().unwrap(), Expr::number(3.0)),
            _ => panic!("expected a call node"),
        }
    }

    #[test]
    fn test_invoke_reduces_flattened_chains() {
        let add = Func::wrap2("add", |a, b| a + b);
        let call = Call {
            func: Arc::new(Expr::Func(add)),
            args: vec![Expr::number(1.0), Expr::number(2.0), Expr::number(4.0)],
            kwargs: KwArgs::new(),
            form: CallForm::Binary(Op {
                token: "+",
                precedence: PREC_ADD,
            }),
        };
        assert_eq!(call.invoke().unwrap(), Expr::number(7.0));
    }

    #[test]
    fn test_invoke_non_callable() {
        let call = Expr::apply(sym("f"), vec![Expr::number(1.0)]);
        match call {
            Expr::Call(c) => assert!(matches!(c.invoke(), Err(SymError::NotCallable(_)))),
            _ => panic!("expected a call node"),
        }
    }

    #[test]
    fn test_truth() {
        assert_eq!(Expr::Bool(true).truth().unwrap(), true);
        assert!(matches!(
            Expr::symbol("x").truth(),
            Err(SymError::Unimplemented(_))
        ));
    }

    #[test]
    fn test_node_count() {
        let x = Expr::symbol("x");
        assert_eq!(x.node_count(), 1);

        // x + 1: call + func + list + (x, 1) + empty map
        let expr = x + Expr::number(1.0);
        assert_eq!(expr.node_count(), 6);
    }
}
