//! Expression compilation, evaluation and differentiation.
//!
//! This module provides the core `Expression` type which represents a
//! mathematical expression compiled from source text. The expression is
//! parsed once into an owned tree and can then be evaluated any number of
//! times against different variable values.
//!
//! # Features
//!
//! - One-pass compilation with byte-accurate error offsets
//! - Forward-mode automatic differentiation: the full gradient in one
//!   evaluation pass
//! - Caller-supplied variables and native functions, shadowing builtins
//! - Constant subtrees folded at compile time (pure callables only)
//! - Parallel batch evaluation across input sets
//!
//! # Example
//!
//! ```
//! use gradexpr::{Binding, Expression};
//!
//! let bindings = vec![Binding::variable("x"), Binding::variable("y")];
//! let expr = Expression::compile("2*x + y^2", &bindings).unwrap();
//! let result = expr.eval(&[1.0, 2.0]); // Evaluates to 6.0
//! let gradient: Vec<f64> = expr.gradient(&vec![1.0, 2.0]); // Computes [2.0, 4.0]
//! ```
//!
//! # Variable Handling
//!
//! Variables are declared explicitly through [`Binding`]s and are assigned
//! dense slots in declaration order. Input arrays must match that ordering.

use colored::Colorize;
use rayon::prelude::*;

use crate::errors::CompileError;
use crate::expr::Expr;
use crate::opt::fold_constants;
use crate::parser::Parser;
use crate::registry::{Binding, Registry};
use crate::vector::Vector;

/// Represents a compiled mathematical expression that can be evaluated and
/// differentiated.
///
/// This struct holds the original source text, the compiled expression tree
/// and the ordered list of variable names. Compilation resolves every
/// identifier up front, so evaluation never fails: numeric domain errors
/// propagate as IEEE NaN/Infinity values instead.
///
/// Evaluation input arrays must have exactly one value per declared variable,
/// in declaration order.
pub struct Expression {
    source: String,
    root: Expr,
    variables: Vec<String>,
}

impl std::fmt::Debug for Expression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{{")?;
        writeln!(f, "    {}: {}", "Expression".cyan(), self.source)?;
        writeln!(f, "    {}: {:?}", "Variables".cyan(), self.variables)?;
        writeln!(f, "    {}: {}", "Tree".cyan(), self.root)?;
        writeln!(f, "}}")
    }
}

impl std::fmt::Display for Expression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.source)
    }
}

impl Expression {
    /// Compiles an expression from source text against a list of bindings.
    ///
    /// The bindings declare every variable and custom function the source may
    /// reference; builtin functions and constants are always available unless
    /// shadowed by a binding of the same name. After parsing, constant
    /// subtrees are folded.
    ///
    /// # Arguments
    /// * `source` - The expression as text (e.g. "2*x + y^2")
    /// * `bindings` - Ordered variable and function declarations
    ///
    /// # Returns
    /// * `Result<Self, CompileError>` - The compiled expression, or the first
    ///   error with its 1-based byte offset
    ///
    /// # Example
    /// ```
    /// # use gradexpr::{Binding, Expression};
    /// let bindings = vec![Binding::variable("x")];
    /// let expr = Expression::compile("sqrt(x) + 1", &bindings).unwrap();
    /// assert_eq!(expr.eval(&[9.0]), 4.0);
    ///
    /// let err = Expression::compile("sqrt(x", &bindings).unwrap_err();
    /// assert_eq!(err.offset, 6);
    /// ```
    pub fn compile(source: &str, bindings: &[Binding]) -> Result<Self, CompileError> {
        let mut root = Parser::new(source, Registry::new(bindings)).parse()?;
        fold_constants(&mut root);

        let variables = bindings
            .iter()
            .filter(|binding| binding.is_variable())
            .map(|binding| binding.name().to_string())
            .collect();

        Ok(Self {
            source: source.to_string(),
            root,
            variables,
        })
    }

    /// Evaluates the expression at the given variable values.
    ///
    /// # Arguments
    /// * `values` - One value per declared variable, in declaration order
    ///
    /// # Panics
    /// Panics if `values` does not have exactly one entry per variable.
    ///
    /// # Example
    /// ```
    /// # use gradexpr::{Binding, Expression};
    /// let bindings = vec![Binding::variable("x"), Binding::variable("y")];
    /// let expr = Expression::compile("x*y + 1", &bindings).unwrap();
    /// assert_eq!(expr.eval(&[3.0, 4.0]), 13.0);
    /// ```
    pub fn eval<V: Vector>(&self, values: &V) -> f64 {
        assert_eq!(
            values.len(),
            self.variables.len(),
            "expected {} variable values, got {}",
            self.variables.len(),
            values.len()
        );
        self.root.eval(values.as_slice())
    }

    /// Evaluates the expression and its gradient in a single pass.
    ///
    /// The gradient holds the partial derivative of the result with respect
    /// to each declared variable, in declaration order, computed by
    /// forward-mode automatic differentiation. It comes back in the same
    /// container type the values were supplied in.
    ///
    /// # Arguments
    /// * `values` - One value per declared variable, in declaration order
    ///
    /// # Returns
    /// The expression's value and its gradient vector
    ///
    /// # Panics
    /// Panics if `values` does not have exactly one entry per variable.
    ///
    /// # Example
    /// ```
    /// # use gradexpr::{Binding, Expression};
    /// let bindings = vec![Binding::variable("x"), Binding::variable("y")];
    /// let expr = Expression::compile("x*y^3", &bindings).unwrap();
    ///
    /// let (value, grad) = expr.eval_with_gradient(&vec![2.0, 3.0]);
    /// assert_eq!(value, 54.0);
    /// assert_eq!(grad, vec![27.0, 54.0]);
    /// ```
    pub fn eval_with_gradient<V: Vector>(&self, values: &V) -> (f64, V) {
        assert_eq!(
            values.len(),
            self.variables.len(),
            "expected {} variable values, got {}",
            self.variables.len(),
            values.len()
        );
        let mut gradient = V::zeros(self.variables.len());
        let value = self
            .root
            .eval_grad(values.as_slice(), gradient.as_mut_slice());
        (value, gradient)
    }

    /// Computes the gradient of the expression at the given variable values.
    ///
    /// Equivalent to [`eval_with_gradient`](Expression::eval_with_gradient)
    /// with the value discarded.
    ///
    /// # Example
    /// ```
    /// # use gradexpr::{Binding, Expression};
    /// let bindings = vec![Binding::variable("x"), Binding::variable("y")];
    /// let expr = Expression::compile("2*x + y^2", &bindings).unwrap();
    /// let gradient: Vec<f64> = expr.gradient(&vec![1.0, 2.0]);
    /// assert_eq!(gradient, vec![2.0, 4.0]);
    /// ```
    pub fn gradient<V: Vector>(&self, values: &V) -> V {
        self.eval_with_gradient(values).1
    }

    /// Evaluates the expression for multiple input sets in parallel.
    ///
    /// Splits the input sets into chunks sized to the available parallelism
    /// and evaluates the chunks across the rayon thread pool. Results come
    /// back in input order.
    ///
    /// # Arguments
    /// * `input_sets` - Slice of input vectors, each must match the number of
    ///   variables
    ///
    /// # Returns
    /// Vector of results, one for each input set
    ///
    /// # Example
    /// ```
    /// # use gradexpr::{Binding, Expression};
    /// let bindings = vec![Binding::variable("x")];
    /// let expr = Expression::compile("x^2", &bindings).unwrap();
    ///
    /// let input_sets = vec![vec![1.0], vec![2.0], vec![3.0]];
    /// assert_eq!(expr.eval_batch(&input_sets), vec![1.0, 4.0, 9.0]);
    /// ```
    pub fn eval_batch(&self, input_sets: &[Vec<f64>]) -> Vec<f64> {
        let num_threads = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(8);
        let chunk_size = (input_sets.len() / (num_threads * 4)).max(1);

        input_sets
            .par_chunks(chunk_size)
            .map(|chunk| chunk.iter().map(|inputs| self.eval(inputs)).collect::<Vec<_>>())
            .flatten()
            .collect()
    }

    /// Returns the original source text.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Returns the compiled expression tree.
    pub fn root(&self) -> &Expr {
        &self.root
    }

    /// Returns the declared variable names, in slot order.
    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    /// Returns the number of declared variables.
    pub fn variable_count(&self) -> usize {
        self.variables.len()
    }
}

/// Compiles and evaluates a variable-free expression in one step.
///
/// # Example
/// ```
/// use gradexpr::interp;
///
/// assert_eq!(interp("3 + 4*2").unwrap(), 11.0);
/// assert!(interp("3 + *").is_err());
/// ```
pub fn interp(source: &str) -> Result<f64, CompileError> {
    Expression::compile(source, &[]).map(|expr| expr.eval(&[]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::CompileErrorKind;
    use std::f64::consts::{E, PI};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    fn vars(names: &[&str]) -> Vec<Binding> {
        names.iter().map(|name| Binding::variable(*name)).collect()
    }

    #[test]
    fn test_basic_arithmetic() {
        assert_eq!(interp("1").unwrap(), 1.0);
        assert_eq!(interp("(1)").unwrap(), 1.0);
        assert_eq!(interp("2+1").unwrap(), 3.0);
        assert_eq!(interp("(((2+(1))))").unwrap(), 3.0);
        assert_eq!(interp("3+2*4").unwrap(), 11.0);
        assert_eq!(interp("(3+2)*4").unwrap(), 20.0);
        assert_eq!(interp("3/2").unwrap(), 1.5);
        assert_eq!(interp("5%2").unwrap(), 1.0);
        assert_eq!(interp("2^3").unwrap(), 8.0);
    }

    #[test]
    fn test_left_associativity() {
        assert_eq!(interp("3-2-4").unwrap(), -3.0);
        assert_eq!(interp("3/2/4").unwrap(), 0.375);
        assert_eq!(interp("3*2*4").unwrap(), 24.0);
    }

    #[test]
    fn test_unary_signs() {
        assert_eq!(interp("-5").unwrap(), -5.0);
        assert_eq!(interp("+5").unwrap(), 5.0);
        assert_eq!(interp("--5").unwrap(), 5.0);
        assert_eq!(interp("-+-5").unwrap(), 5.0);
        assert_eq!(interp("2--3").unwrap(), 5.0);
    }

    #[test]
    fn test_constants_and_functions() {
        assert!(close(interp("pi").unwrap(), PI));
        assert!(close(interp("e").unwrap(), E));
        assert!(close(interp("atan(1)*4 - pi").unwrap(), 0.0));
        assert!(close(interp("sin(pi/2)").unwrap(), 1.0));
        assert!(close(interp("pow(2,10)").unwrap(), 1024.0));
        assert!(close(interp("atan2(1,1)").unwrap(), PI / 4.0));
    }

    #[test]
    fn test_function1_juxtaposition() {
        // unary functions take a signed operand without parentheses
        assert!(close(interp("asin sin .5").unwrap(), 0.5));
        assert!(close(interp("sin cos 0").unwrap(), 1.0_f64.sin()));
    }

    #[test]
    fn test_comma_evaluates_left_returns_right() {
        assert_eq!(interp("1,2,3").unwrap(), 3.0);

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let bindings = vec![Binding::function("tick", 0, move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst) as f64
        })
        .impure()];
        let expr = Expression::compile("tick(), 7", &bindings).unwrap();
        assert_eq!(expr.eval(&[]), 7.0);
        // the discarded left side still ran
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[cfg(not(feature = "pow-right"))]
    #[test]
    fn test_pow_is_left_associative_by_default() {
        assert_eq!(interp("2^3^2").unwrap(), 64.0);
        assert_eq!(interp("2^3^4").unwrap(), 4096.0);
        assert_eq!(interp("-2^2").unwrap(), 4.0);
        assert_eq!(interp("2^-1").unwrap(), 0.5);
    }

    #[cfg(feature = "pow-right")]
    #[test]
    fn test_pow_is_right_associative() {
        assert_eq!(interp("2^3^2").unwrap(), 512.0);
        assert_eq!(interp("-2^2").unwrap(), -4.0);
        assert_eq!(interp("2^-1").unwrap(), 0.5);
    }

    #[test]
    fn test_nan_and_infinity_propagate() {
        assert!(interp("0/0").unwrap().is_nan());
        assert!(interp("1/0").unwrap().is_infinite());
        assert!(interp("sqrt(-1)").unwrap().is_nan());
        // abs is pure and gets folded, NaN must survive the fold
        assert!(interp("abs(0/0)").unwrap().is_nan());
        assert_eq!(interp("abs(-0.0)").unwrap(), 0.0);
        assert!(interp("1%0").unwrap().is_nan());
        assert!(interp("fac(-1)").unwrap().is_nan());
        assert!(interp("fac(21)").unwrap().is_infinite());
        assert!(interp("ncr(2,4)").unwrap().is_nan());
    }

    #[test]
    fn test_combinatorics() {
        assert_eq!(interp("fac(5)").unwrap(), 120.0);
        assert_eq!(interp("ncr(6,2)").unwrap(), 15.0);
        assert_eq!(interp("npr(6,2)").unwrap(), 30.0);
    }

    #[test]
    fn test_compile_errors() {
        assert_eq!(interp("").unwrap_err().offset, 1);
        assert_eq!(interp("1+").unwrap_err().offset, 2);
        assert_eq!(interp("(1").unwrap_err().offset, 2);
        assert_eq!(interp("a+5").unwrap_err().offset, 1);
        assert_eq!(
            interp("a+5").unwrap_err().kind,
            CompileErrorKind::UnknownIdentifier
        );
        // the error message carries the offset
        assert!(interp("1+").unwrap_err().to_string().contains("offset 2"));
    }

    #[test]
    fn test_variables_in_declaration_order() {
        let expr = Expression::compile("x*y^3", &vars(&["x", "y"])).unwrap();
        assert_eq!(expr.variable_count(), 2);
        assert_eq!(expr.variables(), ["x", "y"]);
        assert_eq!(expr.eval(&[2.0, 3.0]), 54.0);
    }

    #[test]
    fn test_gradient() {
        let expr = Expression::compile("x*y^3", &vars(&["x", "y"])).unwrap();
        let (value, gradient) = expr.eval_with_gradient(&vec![2.0, 3.0]);
        assert_eq!(value, 54.0);
        assert_eq!(gradient, vec![27.0, 54.0]);
        assert_eq!(expr.gradient(&vec![2.0, 3.0]), vec![27.0, 54.0]);
    }

    #[test]
    fn test_gradient_of_unreferenced_variable_is_zero() {
        let expr = Expression::compile("x+1", &vars(&["x", "y"])).unwrap();
        assert_eq!(expr.gradient(&vec![1.0, 99.0]), vec![1.0, 0.0]);
    }

    #[test]
    fn test_gradient_with_transcendentals() {
        let expr = Expression::compile("sin(x) + exp(y)", &vars(&["x", "y"])).unwrap();
        let gradient = expr.gradient(&vec![0.5, 1.5]);
        assert!(close(gradient[0], 0.5_f64.cos()));
        assert!(close(gradient[1], 1.5_f64.exp()));
    }

    #[test]
    fn test_gradient_comes_back_in_the_input_container() {
        let expr = Expression::compile("x^2", &vars(&["x"])).unwrap();
        let (_, gradient) = expr.eval_with_gradient(&[3.0]);
        let expected: [f64; 1] = [6.0];
        assert_eq!(gradient, expected);
    }

    #[test]
    fn test_caller_function_with_captured_state() {
        let scale = 3.0;
        let bindings = vec![
            Binding::variable("x"),
            Binding::function("scale", 1, move |args, grad| {
                grad[0] = scale;
                scale * args[0]
            }),
        ];
        let expr = Expression::compile("scale(x) + 1", &bindings).unwrap();
        assert_eq!(expr.eval(&[2.0]), 7.0);
        assert_eq!(expr.gradient(&vec![2.0]), vec![3.0]);
    }

    #[test]
    fn test_bindings_shadow_builtins() {
        let expr = Expression::compile("sin", &vars(&["sin"])).unwrap();
        assert_eq!(expr.eval(&[4.0]), 4.0);
    }

    #[test]
    fn test_constant_folding_reduces_the_tree() {
        let expr = Expression::compile("5+5", &[]).unwrap();
        assert!(matches!(expr.root(), Expr::Const(v) if *v == 10.0));
        // the source text is preserved verbatim
        assert_eq!(expr.source(), "5+5");
    }

    #[test]
    fn test_random_stays_dynamic() {
        let expr = Expression::compile("random()", &[]).unwrap();
        assert!(matches!(expr.root(), Expr::Call(_)));
        for _ in 0..100 {
            let v = expr.eval(&[]);
            assert!((0.0..1.0).contains(&v));
        }
    }

    #[test]
    fn test_repeated_evaluation_is_deterministic() {
        let expr = Expression::compile("sin(x) * exp(x) / (x^2 + 1)", &vars(&["x"])).unwrap();
        let first = expr.eval(&[1.3]);
        for _ in 0..10 {
            assert_eq!(expr.eval(&[1.3]), first);
        }
    }

    #[test]
    fn test_eval_batch_preserves_order() {
        let expr = Expression::compile("x^2 + y", &vars(&["x", "y"])).unwrap();
        let input_sets: Vec<Vec<f64>> = (0..100).map(|i| vec![i as f64, 1.0]).collect();
        let results = expr.eval_batch(&input_sets);
        assert_eq!(results.len(), 100);
        for (i, result) in results.iter().enumerate() {
            assert_eq!(*result, (i * i) as f64 + 1.0);
        }
    }

    #[test]
    #[should_panic(expected = "expected 2 variable values")]
    fn test_eval_with_wrong_buffer_length_panics() {
        let expr = Expression::compile("x+y", &vars(&["x", "y"])).unwrap();
        expr.eval(&[1.0]);
    }

    #[test]
    fn test_display_and_debug() {
        let expr = Expression::compile("x + 1", &vars(&["x"])).unwrap();
        assert_eq!(expr.to_string(), "x + 1");
        let debug = format!("{expr:?}");
        assert!(debug.contains("x + 1"));
    }
}
