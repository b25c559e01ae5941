//! Parallel batch evaluation using Rayon
//!
//! The symbolic part of a request (parsing, differentiation, the quadrature
//! sum) is done once; every measurement set is then substituted and validated
//! on its own, in parallel.
//!
//! Enable with the `parallel` feature:
//! ```toml
//! errprop = { version = "0.1", features = ["parallel"] }
//! ```

use rayon::prelude::*;

use crate::engine::{Compiled, Estimate, MeasurementInput, Propagator};
use crate::input::MeasurementSet;
use crate::PropagationError;

/// Evaluate a compiled error formula for every measurement set
///
/// Results come back in the order of `sets`; a failing set does not affect
/// the others.
///
/// # Example
/// ```
/// use errprop::{Measurement, MeasurementSet, Propagator};
/// use errprop::parallel::propagate_batch;
///
/// let propagator = Propagator::new();
/// let compiled = propagator.compile("x^2", "x", "").unwrap();
/// let sets: Vec<MeasurementSet> = [1.0, 2.0, 3.0]
///     .iter()
///     .map(|&x| [("x".to_string(), Measurement::new(x, 0.1))].into_iter().collect())
///     .collect();
///
/// let results = propagate_batch(&propagator, &compiled, &sets);
/// assert_eq!(results.len(), 3);
/// ```
pub fn propagate_batch(
    propagator: &Propagator,
    compiled: &Compiled,
    sets: &[MeasurementSet],
) -> Vec<Result<Estimate, PropagationError>> {
    log::debug!(
        "evaluating {} measurement set(s) for {}",
        sets.len(),
        compiled.formula.function
    );
    sets.par_iter()
        .map(|set| propagator.evaluate(compiled, set))
        .collect()
}

/// Like [`propagate_batch`], for measurement sets still in textual form
pub fn propagate_batch_str(
    propagator: &Propagator,
    compiled: &Compiled,
    inputs: &[Vec<MeasurementInput>],
) -> Vec<Result<Estimate, PropagationError>> {
    inputs
        .par_iter()
        .map(|row| {
            let set = propagator.read_measurements(row, &compiled.symbols)?;
            propagator.evaluate(compiled, &set)
        })
        .collect()
}
