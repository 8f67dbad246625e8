//! Expression tree representation and the tree-walking evaluator.
//!
//! The compiled form of an expression is a tree of [`Expr`] nodes: constants,
//! variable references and n-ary calls. A call node exclusively owns its
//! children, the tree is acyclic, and destruction is structural: dropping the
//! root frees everything.
//!
//! Evaluation is a single bottom-up traversal. When a gradient buffer is
//! supplied, the partial derivative of the result with respect to every
//! variable is accumulated in the same pass by forward-mode automatic
//! differentiation: each callable reports its analytic local gradient and the
//! chain rule combines it with the gradients of its children. No error channel
//! exists at evaluation time; invalid numeric domains propagate as IEEE
//! NaN/Infinity values.

use crate::builtins::{self, Operator};
use crate::types::{NativeFunction, MAX_ARITY};
use itertools::Itertools;
use std::sync::Arc;

/// A reference to a variable in an expression.
///
/// Carries the variable's name (for display) and its dense slot in the
/// value-input and gradient-output buffers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VarRef {
    pub name: String,
    pub slot: usize,
}

/// An n-ary call node: a resolved operator, builtin or caller function
/// applied to its owned argument subtrees.
///
/// The arity is `args.len()`, fixed by the resolved binding at parse time.
/// `pure` is the binding's purity flag, also fixed at construction; it gates
/// constant folding.
#[derive(Clone)]
pub struct Call {
    pub name: String,
    pub callable: NativeFunction,
    pub pure: bool,
    pub args: Vec<Expr>,
}

impl std::fmt::Debug for Call {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Call")
            .field("name", &self.name)
            .field("pure", &self.pure)
            .field("args", &self.args)
            .finish()
    }
}

/// An expression tree node.
#[derive(Debug, Clone)]
pub enum Expr {
    /// A constant floating point value
    Const(f64),
    /// A reference to a variable slot
    Var(VarRef),
    /// A call to a native function with owned argument subtrees
    Call(Call),
}

impl Expr {
    /// Builds a binary infix operation node.
    pub(crate) fn binary(op: Operator, lhs: Expr, rhs: Expr) -> Expr {
        Expr::Call(Call {
            name: op.symbol().to_string(),
            callable: op.callable(),
            pure: true,
            args: vec![lhs, rhs],
        })
    }

    /// Builds a comma node: both operands evaluate, the right one is the value.
    pub(crate) fn comma(lhs: Expr, rhs: Expr) -> Expr {
        Expr::Call(Call {
            name: ",".to_string(),
            callable: Arc::new(builtins::comma),
            pure: true,
            args: vec![lhs, rhs],
        })
    }

    /// Wraps an expression in a unary negation node.
    pub(crate) fn negate(arg: Expr) -> Expr {
        Expr::Call(Call {
            name: "negate".to_string(),
            callable: Arc::new(builtins::negate),
            pure: true,
            args: vec![arg],
        })
    }

    /// Evaluates the tree against the given variable values, without
    /// gradient tracking.
    ///
    /// Callables still receive a scratch local-gradient buffer (their
    /// signature requires one); its contents are discarded.
    pub fn eval(&self, values: &[f64]) -> f64 {
        match self {
            Expr::Const(v) => *v,
            Expr::Var(var) => values[var.slot],
            Expr::Call(call) => {
                let m = call.args.len();
                let mut args = [0.0; MAX_ARITY];
                for (slot, child) in args.iter_mut().zip(&call.args) {
                    *slot = child.eval(values);
                }
                let mut local = [0.0; MAX_ARITY];
                (call.callable)(&args[..m], &mut local[..m])
            }
        }
    }

    /// Evaluates the tree and accumulates the gradient with respect to every
    /// variable into `grad`, whose length is the variable count.
    ///
    /// Forward-mode accumulation: children are evaluated first, each yielding
    /// its value and its own gradient vector; the callable's local gradient
    /// then weights those child gradients into this node's result.
    pub(crate) fn eval_grad(&self, values: &[f64], grad: &mut [f64]) -> f64 {
        match self {
            Expr::Const(v) => {
                grad.fill(0.0);
                *v
            }
            Expr::Var(var) => {
                grad.fill(0.0);
                grad[var.slot] = 1.0;
                values[var.slot]
            }
            Expr::Call(call) => {
                let m = call.args.len();
                let nvars = grad.len();
                let mut args = [0.0; MAX_ARITY];
                let mut child_grads = vec![0.0; m * nvars];
                for (i, child) in call.args.iter().enumerate() {
                    args[i] = child.eval_grad(values, &mut child_grads[i * nvars..(i + 1) * nvars]);
                }

                let mut local = [0.0; MAX_ARITY];
                let value = (call.callable)(&args[..m], &mut local[..m]);

                grad.fill(0.0);
                for i in 0..m {
                    let weight = local[i];
                    if weight != 0.0 {
                        let child = &child_grads[i * nvars..(i + 1) * nvars];
                        for (g, c) in grad.iter_mut().zip(child) {
                            *g += weight * c;
                        }
                    }
                }
                value
            }
        }
    }
}

/// Formats expressions in standard mathematical notation.
///
/// Binary operations are parenthesized, functions use call notation, and
/// negation uses a `-` prefix. Useful as a lightweight tree dump.
impl std::fmt::Display for Expr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Expr::Const(v) => write!(f, "{v}"),
            Expr::Var(var) => write!(f, "{}", var.name),
            Expr::Call(call) => match (call.name.as_str(), call.args.as_slice()) {
                ("negate", [a]) => write!(f, "-({a})"),
                (",", [a, b]) => write!(f, "({a}, {b})"),
                (op @ ("+" | "-" | "*" | "/" | "^" | "%"), [a, b]) => {
                    write!(f, "({a} {op} {b})")
                }
                (name, args) => {
                    write!(f, "{name}({})", args.iter().format(", "))
                }
            },
        }
    }
}
