//! Symbolic error propagation
//!
//! Given a function `f(x₁, …, xₙ)`, the names of its measured variables and
//! a value with uncertainty for each of them, computes the symbolic
//! uncertainty formula
//!
//! ```text
//! Δf = sqrt( Σ (∂f/∂xᵢ · Δxᵢ)² )
//! ```
//!
//! and its domain-checked numeric value.
//!
//! # Usage Examples
//!
//! ## String API
//! ```
//! let formula = errprop::error_formula("x + y", "x, y").unwrap();
//! assert_eq!(formula, "sqrt(Δx^2 + Δy^2)");
//! ```
//!
//! ## Full pipeline
//! ```
//! use errprop::{Propagator, Request};
//!
//! let request = Request::new("I*R", "I R")
//!     .measure("I", "2", "0.1")
//!     .measure("R", "3", "0.2");
//! let result = Propagator::new().propagate(&request).unwrap();
//! assert_eq!(result.formula.error.to_string(), "sqrt((R*ΔI)^2 + (I*ΔR)^2)");
//! ```

mod ast;
pub mod config;
mod differentiation;
mod display;
pub mod engine;
mod error;
pub mod evaluator;
pub mod format;
pub(crate) mod functions;
pub mod input;
pub mod parser;
mod simplification;
mod symbol;
pub(crate) mod traits;
mod uncertainty;

#[cfg(feature = "parallel")]
pub mod parallel;

#[cfg(test)]
mod tests;

// Re-export key types for easier usage
pub use ast::{Expr, ExprKind};
pub use config::{Config, ConfigLoader};
pub use display::LatexFormatter;
pub use engine::{Compiled, Estimate, Propagation, Propagator, Request, State};
pub use error::{DomainCheck, ParseError, PropagationError, Span, Stage};
pub use evaluator::NumericValue;
pub use format::{OutputFormat, Precision, Report};
pub use input::{Measurement, MeasurementSet};
pub use simplification::simplify;
pub use symbol::{CollisionPolicy, SymbolKind, SymbolTable};
pub use uncertainty::{
    ErrorFormula, relative_uncertainty, uncertainty_propagation, uncertainty_symbol,
};

/// Default maximum AST depth
pub const DEFAULT_MAX_DEPTH: usize = 100;
/// Default maximum AST node count
pub const DEFAULT_MAX_NODES: usize = 10_000;

/// Symbolic uncertainty of `function` with respect to `variables`
///
/// # Arguments
/// * `function` - Function of the measured variables (e.g., "I*R")
/// * `variables` - Variable list separated by commas or spaces (e.g., "I, R")
///
/// # Returns
/// `Δf` as a string, or an error if parsing or differentiation fails
pub fn error_formula(function: &str, variables: &str) -> Result<String, PropagationError> {
    let compiled = Propagator::new().compile(function, variables, "")?;
    Ok(compiled.formula.error.to_string())
}

/// Run one request with the default engine settings
///
/// For other settings (collision policy, tolerance, ...) use [`Propagator`].
pub fn propagate(request: &Request) -> Result<Propagation, PropagationError> {
    Propagator::new().propagate(request)
}
