//! The fixed table of builtin operations.
//!
//! Every entry pairs a value computation with its analytic local gradient: the
//! callable returns the result and writes the partial derivative of that
//! result with respect to each of its own arguments into the gradient buffer.
//! The buffer is zeroed by the caller, so step functions (`ceil`, `floor`,
//! `sign`, `round`) and the combinatoric functions simply leave it untouched.
//!
//! The table is sorted alphabetically by name and looked up via binary search;
//! caller-supplied bindings are resolved before it and therefore shadow it.
//! `random` is the single impure entry. It owns an explicit PRNG instance
//! behind a mutex rather than leaning on hidden global state, and its impurity
//! exempts it from constant folding.

use std::sync::{Arc, Mutex};

use lazy_static::lazy_static;
use rand::{rngs::SmallRng, Rng, SeedableRng};

use crate::types::NativeFunction;

/// A single-character infix operator recognized by the tokenizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Operator {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
}

impl Operator {
    /// The operator's source form, used for display.
    pub(crate) fn symbol(self) -> &'static str {
        match self {
            Operator::Add => "+",
            Operator::Sub => "-",
            Operator::Mul => "*",
            Operator::Div => "/",
            Operator::Mod => "%",
            Operator::Pow => "^",
        }
    }

    /// The native callable implementing the operator. All operators are pure.
    pub(crate) fn callable(self) -> NativeFunction {
        match self {
            Operator::Add => Arc::new(add),
            Operator::Sub => Arc::new(sub),
            Operator::Mul => Arc::new(mul),
            Operator::Div => Arc::new(div),
            Operator::Mod => Arc::new(fmod),
            Operator::Pow => Arc::new(pow),
        }
    }
}

fn add(x: &[f64], g: &mut [f64]) -> f64 {
    g[0] = 1.0;
    g[1] = 1.0;
    x[0] + x[1]
}

fn sub(x: &[f64], g: &mut [f64]) -> f64 {
    g[0] = 1.0;
    g[1] = -1.0;
    x[0] - x[1]
}

fn mul(x: &[f64], g: &mut [f64]) -> f64 {
    g[0] = x[1];
    g[1] = x[0];
    x[0] * x[1]
}

fn div(x: &[f64], g: &mut [f64]) -> f64 {
    let r = 1.0 / x[1];
    g[0] = r;
    g[1] = -x[0] * r * r;
    x[0] * r
}

fn pow(x: &[f64], g: &mut [f64]) -> f64 {
    let r = x[0].powf(x[1]);
    g[0] = x[1] * x[0].powf(x[1] - 1.0);
    g[1] = r * x[0].ln();
    r
}

fn fmod(x: &[f64], g: &mut [f64]) -> f64 {
    g[0] = 1.0;
    g[1] = -(x[0] / x[1]).trunc();
    x[0] % x[1]
}

/// Unary negation, inserted by the parser for an odd count of leading `-`.
pub(crate) fn negate(x: &[f64], g: &mut [f64]) -> f64 {
    g[0] = -1.0;
    -x[0]
}

/// The comma operator: evaluates both operands, yields the right one.
pub(crate) fn comma(x: &[f64], g: &mut [f64]) -> f64 {
    g[0] = 0.0;
    g[1] = 1.0;
    x[1]
}

/// Factorial over the non-negative integers.
///
/// Returns NaN for negative input and +∞ once the running product leaves the
/// representable integer range.
pub(crate) fn factorial(n: f64) -> f64 {
    if n < 0.0 {
        return f64::NAN;
    }
    if n > u32::MAX as f64 {
        return f64::INFINITY;
    }
    let n = n as u64;
    let mut result: u64 = 1;
    for i in 1..=n {
        match result.checked_mul(i) {
            Some(r) => result = r,
            None => return f64::INFINITY,
        }
    }
    result as f64
}

/// Binomial coefficient "n choose r", exact while it fits in a u64.
///
/// NaN if `n < 0`, `r < 0` or `n < r`; +∞ on overflow. Uses the symmetric
/// `min(r, n-r)` incremental product/division so intermediate values stay as
/// small as possible.
pub(crate) fn combinations(n: f64, r: f64) -> f64 {
    if n < 0.0 || r < 0.0 || n < r {
        return f64::NAN;
    }
    if n > u32::MAX as f64 || r > u32::MAX as f64 {
        return f64::INFINITY;
    }
    let n = n as u64;
    let mut r = r as u64;
    if r > n / 2 {
        r = n - r;
    }
    let mut result: u64 = 1;
    for i in 1..=r {
        match result.checked_mul(n - r + i) {
            Some(v) => result = v / i,
            None => return f64::INFINITY,
        }
    }
    result as f64
}

/// Number of r-permutations of n elements: `ncr(n, r) * r!`.
pub(crate) fn permutations(n: f64, r: f64) -> f64 {
    combinations(n, r) * factorial(r)
}

fn abs_fn(x: &[f64], g: &mut [f64]) -> f64 {
    if x[0] < 0.0 {
        g[0] = -1.0;
        -x[0]
    } else if x[0] > 0.0 {
        g[0] = 1.0;
        x[0]
    } else {
        // zero and NaN pass through unchanged, gradient stays zero
        x[0]
    }
}

fn acos_fn(x: &[f64], g: &mut [f64]) -> f64 {
    g[0] = -1.0 / (1.0 - x[0] * x[0]).sqrt();
    x[0].acos()
}

fn asin_fn(x: &[f64], g: &mut [f64]) -> f64 {
    g[0] = 1.0 / (1.0 - x[0] * x[0]).sqrt();
    x[0].asin()
}

fn atan_fn(x: &[f64], g: &mut [f64]) -> f64 {
    g[0] = 1.0 / (1.0 + x[0] * x[0]);
    x[0].atan()
}

fn atan2_fn(x: &[f64], g: &mut [f64]) -> f64 {
    // ∂/∂y atan2(y, x) = x/(x²+y²), ∂/∂x atan2(y, x) = -y/(x²+y²)
    let d = 1.0 / (x[0] * x[0] + x[1] * x[1]);
    g[0] = x[1] * d;
    g[1] = -x[0] * d;
    x[0].atan2(x[1])
}

fn ceil_fn(x: &[f64], _g: &mut [f64]) -> f64 {
    x[0].ceil()
}

fn cos_fn(x: &[f64], g: &mut [f64]) -> f64 {
    g[0] = -x[0].sin();
    x[0].cos()
}

fn cosh_fn(x: &[f64], g: &mut [f64]) -> f64 {
    g[0] = x[0].sinh();
    x[0].cosh()
}

fn e_fn(_x: &[f64], _g: &mut [f64]) -> f64 {
    std::f64::consts::E
}

fn exp_fn(x: &[f64], g: &mut [f64]) -> f64 {
    let e = x[0].exp();
    g[0] = e;
    e
}

fn fac_fn(x: &[f64], _g: &mut [f64]) -> f64 {
    factorial(x[0])
}

fn floor_fn(x: &[f64], _g: &mut [f64]) -> f64 {
    x[0].floor()
}

fn ln_fn(x: &[f64], g: &mut [f64]) -> f64 {
    g[0] = 1.0 / x[0];
    x[0].ln()
}

fn log10_fn(x: &[f64], g: &mut [f64]) -> f64 {
    g[0] = 1.0 / (std::f64::consts::LN_10 * x[0]);
    x[0].log10()
}

fn ncr_fn(x: &[f64], _g: &mut [f64]) -> f64 {
    combinations(x[0], x[1])
}

fn npr_fn(x: &[f64], _g: &mut [f64]) -> f64 {
    permutations(x[0], x[1])
}

fn pi_fn(_x: &[f64], _g: &mut [f64]) -> f64 {
    std::f64::consts::PI
}

fn round_fn(x: &[f64], _g: &mut [f64]) -> f64 {
    (x[0] + 0.5).floor()
}

fn sign_fn(x: &[f64], _g: &mut [f64]) -> f64 {
    if x[0] == 0.0 {
        0.0
    } else if x[0] > 0.0 {
        1.0
    } else {
        -1.0
    }
}

fn sin_fn(x: &[f64], g: &mut [f64]) -> f64 {
    g[0] = x[0].cos();
    x[0].sin()
}

fn sinh_fn(x: &[f64], g: &mut [f64]) -> f64 {
    g[0] = x[0].cosh();
    x[0].sinh()
}

fn sqrt_fn(x: &[f64], g: &mut [f64]) -> f64 {
    let r = x[0].sqrt();
    g[0] = 0.5 / r;
    r
}

fn tan_fn(x: &[f64], g: &mut [f64]) -> f64 {
    let c = x[0].cos();
    g[0] = 1.0 / (c * c);
    x[0].tan()
}

fn tanh_fn(x: &[f64], g: &mut [f64]) -> f64 {
    let c = x[0].cosh();
    g[0] = 1.0 / (c * c);
    x[0].tanh()
}

/// A builtin operation: name, declared arity, purity and its callable.
pub(crate) struct Builtin {
    pub name: &'static str,
    pub arity: usize,
    pub pure: bool,
    pub callable: NativeFunction,
}

fn pure_builtin(name: &'static str, arity: usize, f: fn(&[f64], &mut [f64]) -> f64) -> Builtin {
    Builtin {
        name,
        arity,
        pure: true,
        callable: Arc::new(f),
    }
}

lazy_static! {
    /// The builtin table, sorted alphabetically by name for binary search.
    static ref BUILTINS: Vec<Builtin> = {
        let rng = Mutex::new(SmallRng::from_entropy());
        let random: NativeFunction =
            Arc::new(move |_: &[f64], _: &mut [f64]| rng.lock().unwrap().gen::<f64>());

        let log_fn: fn(&[f64], &mut [f64]) -> f64 = if cfg!(feature = "natural-log") {
            ln_fn
        } else {
            log10_fn
        };

        vec![
            pure_builtin("abs", 1, abs_fn),
            pure_builtin("acos", 1, acos_fn),
            pure_builtin("asin", 1, asin_fn),
            pure_builtin("atan", 1, atan_fn),
            pure_builtin("atan2", 2, atan2_fn),
            pure_builtin("ceil", 1, ceil_fn),
            pure_builtin("cos", 1, cos_fn),
            pure_builtin("cosh", 1, cosh_fn),
            pure_builtin("e", 0, e_fn),
            pure_builtin("exp", 1, exp_fn),
            pure_builtin("fac", 1, fac_fn),
            pure_builtin("floor", 1, floor_fn),
            pure_builtin("ln", 1, ln_fn),
            pure_builtin("log", 1, log_fn),
            pure_builtin("log10", 1, log10_fn),
            pure_builtin("ncr", 2, ncr_fn),
            pure_builtin("npr", 2, npr_fn),
            pure_builtin("pi", 0, pi_fn),
            pure_builtin("pow", 2, pow),
            Builtin {
                name: "random",
                arity: 0,
                pure: false,
                callable: random,
            },
            pure_builtin("round", 1, round_fn),
            pure_builtin("sign", 1, sign_fn),
            pure_builtin("sin", 1, sin_fn),
            pure_builtin("sinh", 1, sinh_fn),
            pure_builtin("sqrt", 1, sqrt_fn),
            pure_builtin("tan", 1, tan_fn),
            pure_builtin("tanh", 1, tanh_fn),
        ]
    };
}

/// Looks up a builtin by exact name. Binary search over the sorted table.
pub(crate) fn find_builtin(name: &str) -> Option<&'static Builtin> {
    BUILTINS
        .binary_search_by(|b| b.name.cmp(name))
        .ok()
        .map(|i| &BUILTINS[i])
}
