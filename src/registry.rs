//! Name resolution for variables and functions.
//!
//! The caller declares its surface as an ordered list of [`Binding`]s at
//! compile time: free variables and/or custom functions. The tokenizer
//! resolves every identifier through a [`Registry`] built from that list:
//! caller bindings are scanned linearly first (first matching name wins, which
//! lets callers shadow builtins), then the builtin table is searched.
//!
//! Variable bindings are assigned dense, 0-based slots in declaration order.
//! The slot count defines the width of the value-input and gradient-output
//! buffers used at evaluation time; bindings of function kind occupy no slot.

use crate::builtins::find_builtin;
use crate::types::{NativeFunction, MAX_ARITY};
use std::sync::Arc;

/// What a binding names: a free variable or a callable function.
#[derive(Clone)]
pub enum BindingKind {
    /// A free variable, read from the value-input buffer at evaluation time
    Variable,
    /// A native function of fixed arity
    Function {
        /// Number of arguments, 0..=7
        arity: usize,
        /// The bound callable (value + local gradient)
        callable: NativeFunction,
    },
}

impl std::fmt::Debug for BindingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BindingKind::Variable => write!(f, "Variable"),
            BindingKind::Function { arity, .. } => write!(f, "Function {{ arity: {arity} }}"),
        }
    }
}

/// A caller-supplied name made visible to the compiler.
///
/// Names must be lowercase ASCII identifiers (`[a-z][a-z0-9_]*`) to be
/// reachable from source text; anything else simply never matches.
///
/// Functions default to pure, meaning the optimizer may fold a call whose
/// arguments are all constants. A function whose output is not fully
/// determined by its arguments (non-deterministic, or reading captured
/// mutable state) must be marked [`impure`](Binding::impure) or it will be
/// silently constant-folded.
///
/// # Example
/// ```
/// use gradexpr::{Binding, Expression};
///
/// let bindings = vec![
///     Binding::variable("x"),
///     Binding::function("double", 1, |x, g| {
///         g[0] = 2.0;
///         2.0 * x[0]
///     }),
/// ];
/// let expr = Expression::compile("double(x) + 1", &bindings).unwrap();
/// assert_eq!(expr.eval(&[3.0]), 7.0);
/// ```
#[derive(Debug, Clone)]
pub struct Binding {
    name: String,
    kind: BindingKind,
    pure: bool,
}

impl Binding {
    /// Declares a free variable. Its slot is its position among the
    /// variable-kind entries of the binding list.
    pub fn variable(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: BindingKind::Variable,
            pure: true,
        }
    }

    /// Declares a native function of the given arity.
    ///
    /// The callable receives the argument values and a zeroed local-gradient
    /// buffer of the same length to fill in; see
    /// [`NativeFunction`](crate::types::NativeFunction).
    ///
    /// # Panics
    /// Panics if `arity` exceeds [`MAX_ARITY`].
    pub fn function<F>(name: impl Into<String>, arity: usize, callable: F) -> Self
    where
        F: Fn(&[f64], &mut [f64]) -> f64 + Send + Sync + 'static,
    {
        assert!(
            arity <= MAX_ARITY,
            "function arity {arity} exceeds the maximum of {MAX_ARITY}"
        );
        Self {
            name: name.into(),
            kind: BindingKind::Function {
                arity,
                callable: Arc::new(callable),
            },
            pure: true,
        }
    }

    /// Marks the binding as impure, exempting calls to it from constant
    /// folding. Has no effect on variable bindings.
    pub fn impure(mut self) -> Self {
        self.pure = false;
        self
    }

    /// The bound name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The binding's kind.
    pub fn kind(&self) -> &BindingKind {
        &self.kind
    }

    /// Whether calls to this binding may be constant-folded.
    pub fn is_pure(&self) -> bool {
        self.pure
    }

    /// Whether this is a variable-kind binding.
    pub fn is_variable(&self) -> bool {
        matches!(self.kind, BindingKind::Variable)
    }
}

/// Result of resolving an identifier.
pub(crate) enum Resolved {
    Variable {
        name: String,
        slot: usize,
    },
    Function {
        name: String,
        arity: usize,
        callable: NativeFunction,
        pure: bool,
    },
}

/// Compile-time name resolver over the caller's binding list plus the builtin
/// table. Slots for variable bindings are precomputed at construction.
pub(crate) struct Registry<'a> {
    bindings: &'a [Binding],
    slots: Vec<usize>,
    variable_count: usize,
}

impl<'a> Registry<'a> {
    pub(crate) fn new(bindings: &'a [Binding]) -> Self {
        let mut slots = Vec::with_capacity(bindings.len());
        let mut variable_count = 0;
        for binding in bindings {
            slots.push(variable_count);
            if binding.is_variable() {
                variable_count += 1;
            }
        }
        Self {
            bindings,
            slots,
            variable_count,
        }
    }

    /// Number of distinct variable-kind bindings; sizes the value and
    /// gradient buffers.
    pub(crate) fn variable_count(&self) -> usize {
        self.variable_count
    }

    /// Resolves an identifier, caller bindings first, builtins second.
    pub(crate) fn resolve(&self, name: &str) -> Option<Resolved> {
        for (binding, &slot) in self.bindings.iter().zip(&self.slots) {
            if binding.name == name {
                return Some(match &binding.kind {
                    BindingKind::Variable => Resolved::Variable {
                        name: binding.name.clone(),
                        slot,
                    },
                    BindingKind::Function { arity, callable } => Resolved::Function {
                        name: binding.name.clone(),
                        arity: *arity,
                        callable: Arc::clone(callable),
                        pure: binding.pure,
                    },
                });
            }
        }

        find_builtin(name).map(|builtin| Resolved::Function {
            name: builtin.name.to_string(),
            arity: builtin.arity,
            callable: Arc::clone(&builtin.callable),
            pure: builtin.pure,
        })
    }
}
