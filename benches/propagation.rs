//! Propagation Benchmark
//!
//! Symbolic stages (parse, differentiate, combine) on expressions with many
//! mixed terms, and the numeric pass over batches of measurements.

use criterion::{Criterion, criterion_group, criterion_main};
use std::fmt::Write;
use std::hint::black_box;

use errprop::{Measurement, MeasurementSet, Propagator, Request};

// =============================================================================
// Expression Generator
// =============================================================================

/// Generates a mixed expression in `x`, `y` and `z` with N terms
fn generate_mixed(n: usize) -> String {
    let mut s = String::with_capacity(n * 40);
    for i in 1..=n {
        if i > 1 {
            s.push_str(if i % 3 == 1 { " - " } else { " + " });
        }
        match i % 5 {
            0 => write!(s, "{}*x^{}*y", i, i % 4 + 1),
            1 => write!(s, "sin({}*x)*cos(z)", i),
            2 => write!(s, "(exp(y/{}) + ln(x + {}))", i, i),
            3 => write!(s, "(x^2 + {})/(z + {})", i, i),
            _ => write!(s, "sqrt(y^2 + {})*z", i),
        }
        .unwrap();
    }
    s
}

fn measurements() -> MeasurementSet {
    [
        ("x".to_string(), Measurement::new(1.3, 0.02)),
        ("y".to_string(), Measurement::new(0.7, 0.01)),
        ("z".to_string(), Measurement::new(2.1, 0.05)),
    ]
    .into_iter()
    .collect()
}

// =============================================================================
// Benchmarks
// =============================================================================

fn bench_symbolic(c: &mut Criterion) {
    let mut group = c.benchmark_group("symbolic");
    let propagator = Propagator::new();

    group.bench_function("ohms_law", |b| {
        b.iter(|| propagator.compile(black_box("I*R"), "I, R", ""))
    });

    for n in [10, 50] {
        let function = generate_mixed(n);
        group.bench_function(format!("mixed_{}", n), |b| {
            b.iter(|| propagator.compile(black_box(&function), "x, y, z", ""))
        });
    }
    group.finish();
}

fn bench_numeric(c: &mut Criterion) {
    let mut group = c.benchmark_group("numeric");
    let propagator = Propagator::new();
    let compiled = propagator
        .compile(&generate_mixed(50), "x, y, z", "")
        .unwrap();
    let set = measurements();

    group.bench_function("evaluate_mixed_50", |b| {
        b.iter(|| propagator.evaluate(black_box(&compiled), black_box(&set)))
    });

    let request = Request::new("I*R", "I, R")
        .measure("I", "2", "0.1")
        .measure("R", "3", "0.2");
    group.bench_function("full_request", |b| {
        b.iter(|| propagator.propagate(black_box(&request)))
    });
    group.finish();
}

criterion_group!(benches, bench_symbolic, bench_numeric);

criterion_main!(benches);
