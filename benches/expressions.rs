//! # Expression Compilation and Evaluation Benchmark
//!
//! Measures the three phases of the crate's pipeline separately:
//!
//! 1. **Compilation**: parsing plus constant folding, per source string
//! 2. **Evaluation**: repeated tree-walking evaluation of a compiled tree
//! 3. **Gradient**: value plus full forward-mode gradient in one pass
//!
//! A hand-coded Rust closure of the same formula is included as the
//! performance ceiling for the evaluation benchmarks, and the batch
//! benchmark exercises the rayon-parallel path against its sequential
//! equivalent.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use gradexpr::{Binding, Expression};

const FORMULA: &str = "sin(x) * exp(y) / (x^2 + y^2 + 1) + cos(x*y)";

fn bindings() -> Vec<Binding> {
    vec![Binding::variable("x"), Binding::variable("y")]
}

/// Hand-coded equivalent of `FORMULA`, the theoretical performance ceiling.
#[inline(always)]
fn direct(x: f64, y: f64) -> f64 {
    x.sin() * y.exp() / (x * x + y * y + 1.0) + (x * y).cos()
}

fn benchmark_compilation(c: &mut Criterion) {
    let bindings = bindings();
    let mut group = c.benchmark_group("Compilation");

    group.bench_function("Short Constant", |b| {
        b.iter(|| Expression::compile(black_box("3 + 4*2"), &[]).unwrap())
    });
    group.bench_function("Two Variables", |b| {
        b.iter(|| Expression::compile(black_box(FORMULA), &bindings).unwrap())
    });

    group.finish();
}

fn benchmark_evaluation(c: &mut Criterion) {
    let expr = Expression::compile(FORMULA, &bindings()).unwrap();
    let mut group = c.benchmark_group("Evaluation");

    group.bench_function("Direct Implementation", |b| {
        b.iter(|| direct(black_box(0.7), black_box(1.3)))
    });
    group.bench_function("Compiled Tree", |b| {
        b.iter(|| expr.eval(black_box(&[0.7, 1.3])))
    });
    group.bench_function("Value With Gradient", |b| {
        b.iter(|| expr.eval_with_gradient(black_box(&[0.7, 1.3])))
    });

    group.finish();
}

fn benchmark_batch(c: &mut Criterion) {
    let expr = Expression::compile(FORMULA, &bindings()).unwrap();
    let input_sets: Vec<Vec<f64>> = (0..10_000)
        .map(|i| vec![i as f64 * 0.001, 1.0 - i as f64 * 0.0001])
        .collect();

    let mut group = c.benchmark_group("Batch Evaluation");

    group.bench_function("Sequential", |b| {
        b.iter(|| {
            input_sets
                .iter()
                .map(|inputs| expr.eval(black_box(inputs)))
                .collect::<Vec<_>>()
        })
    });
    group.bench_function("Parallel", |b| {
        b.iter(|| expr.eval_batch(black_box(&input_sets)))
    });

    group.finish();
}

criterion_group!(
    benches,
    benchmark_compilation,
    benchmark_evaluation,
    benchmark_batch
);
criterion_main!(benches);
