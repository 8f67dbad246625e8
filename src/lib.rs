//! Compiled mathematical expression evaluator with automatic differentiation.
//!
//! This crate compiles textual mathematical expressions into an owned tree
//! that can be evaluated repeatedly against caller-supplied variable values.
//! Forward-mode automatic differentiation computes the gradient with respect
//! to every variable in a single evaluation pass.
//!
//! # Features
//!
//! - One-pass recursive-descent compilation with byte-accurate error offsets
//! - Forward-mode automatic differentiation
//! - Caller-supplied variables and native functions (arity 0..=7), shadowing
//!   builtins
//! - Compile-time constant folding, gated on callable purity
//! - No runtime error channel: numeric domain errors propagate as IEEE
//!   NaN/Infinity
//!
//! # Example
//!
//! ```rust
//! use gradexpr::{Binding, Expression};
//!
//! // Declare the variables and compile the expression
//! let bindings = vec![Binding::variable("x"), Binding::variable("y")];
//! let expr = Expression::compile("2*x + y^2", &bindings).unwrap();
//!
//! // Evaluate at point (x=1, y=2)
//! let result = expr.eval(&[1.0, 2.0]); // Returns 6.0
//!
//! // Compute gradient [d/dx, d/dy]
//! let gradient: Vec<f64> = expr.gradient(&vec![1.0, 2.0]); // Returns [2.0, 4.0]
//! ```

pub use errors::{CompileError, CompileErrorKind};
pub use expression::{interp, Expression};
pub use registry::{Binding, BindingKind};

pub mod prelude {
    pub use crate::errors::{CompileError, CompileErrorKind};
    pub use crate::expr::Expr;
    pub use crate::expression::{interp, Expression};
    pub use crate::registry::{Binding, BindingKind};
    pub use crate::vector::Vector;
}

/// Error types for the compilation failure modes
pub mod errors;
/// Expression tree representation and the tree-walking evaluator
pub mod expr;
/// High-level expression handling
pub mod expression;
/// Caller-supplied bindings and name resolution
pub mod registry;
/// Shared callable types
pub mod types;
/// Vector abstraction over evaluation inputs and gradient outputs
pub mod vector;

pub(crate) mod builtins;
pub(crate) mod lexer;
pub(crate) mod opt;
pub(crate) mod parser;
