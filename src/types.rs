use std::sync::Arc;

/// Type alias for a native callable bound into an expression tree.
///
/// This represents a function that:
/// - Takes a slice of argument values (length = arity, at most [`MAX_ARITY`])
/// - Writes its local gradient into the second buffer of the same length: the
///   partial derivative of the result with respect to each argument, evaluated
///   at the given argument values. The evaluator zeroes the buffer beforehand,
///   so entries with no dependence may be left untouched
/// - Returns a single f64 result
/// - Is both Send and Sync for thread safety
///
/// Closures capture whatever external state they need, so the same callable is
/// invoked the same way regardless of arity and no separate context argument
/// is threaded through.
pub type NativeFunction = Arc<dyn Fn(&[f64], &mut [f64]) -> f64 + Send + Sync>;

/// Maximum number of arguments a bound function may declare.
pub const MAX_ARITY: usize = 7;
