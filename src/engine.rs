//! Error-propagation pipeline
//!
//! One request runs, in order: input parsing, function parsing,
//! differentiation, the quadrature sum, numeric substitution, domain
//! validation and finalization. Any failure ends the request; nothing is
//! retried and nothing is kept between requests.
//!
//! ```text
//! Idle → Parsed → Differentiated → Combined → Substituted → Validated → Finalized
//!   └──────────────┴──────────────┴─────────┴────────────┴───────────┴→ Failed
//! ```

use std::fmt;

use num_complex::Complex64;
use rustc_hash::FxHashMap;

use crate::config::EngineConfig;
use crate::error::{DomainCheck, Stage};
use crate::evaluator::{NumericValue, evaluate, is_real};
use crate::input::{self, MeasurementSet};
use crate::symbol::{CollisionPolicy, SymbolTable};
use crate::uncertainty::{ErrorFormula, partial_derivatives};
use crate::{PropagationError, parser};

/// Progress of one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Idle,
    Parsed,
    Differentiated,
    Combined,
    Substituted,
    Validated,
    Finalized,
    Failed(Stage),
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            State::Idle => write!(f, "idle"),
            State::Parsed => write!(f, "parsed"),
            State::Differentiated => write!(f, "differentiated"),
            State::Combined => write!(f, "combined"),
            State::Substituted => write!(f, "substituted"),
            State::Validated => write!(f, "validated"),
            State::Finalized => write!(f, "finalized"),
            State::Failed(stage) => write!(f, "failed during {}", stage),
        }
    }
}

/// Logs every transition of one request
struct Tracker {
    state: State,
}

impl Tracker {
    fn new() -> Self {
        Tracker { state: State::Idle }
    }

    fn advance(&mut self, next: State) {
        log::debug!("request: {} -> {}", self.state, next);
        self.state = next;
    }

    fn fail(&mut self, err: PropagationError) -> PropagationError {
        let next = State::Failed(err.stage());
        log::debug!("request: {} -> {}: {}", self.state, next, err);
        self.state = next;
        err
    }
}

/// Value and uncertainty text of one variable, as typed by the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeasurementInput {
    pub name: String,
    pub value: String,
    pub uncertainty: String,
}

/// One calculation request in textual form
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Request {
    /// Function expression, e.g. `I*R`
    pub function: String,
    /// Variable list, e.g. `I, R`
    pub variables: String,
    /// Constant list, e.g. `c = 3e8, G = 6.67e-11`
    pub constants: String,
    pub measurements: Vec<MeasurementInput>,
}

impl Request {
    pub fn new(function: impl Into<String>, variables: impl Into<String>) -> Self {
        Request {
            function: function.into(),
            variables: variables.into(),
            ..Request::default()
        }
    }

    pub fn constants(mut self, constants: impl Into<String>) -> Self {
        self.constants = constants.into();
        self
    }

    /// Add the measured value and uncertainty of `name`
    pub fn measure(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
        uncertainty: impl Into<String>,
    ) -> Self {
        self.measurements.push(MeasurementInput {
            name: name.into(),
            value: value.into(),
            uncertainty: uncertainty.into(),
        });
        self
    }
}

/// Error formula of a function together with the symbols it was built from
#[derive(Debug, Clone)]
pub struct Compiled {
    pub formula: ErrorFormula,
    pub symbols: SymbolTable,
    /// Constants that were kept, in declaration order
    pub constants: Vec<(String, f64)>,
}

/// Numeric outcome for one set of measurements
#[derive(Debug, Clone, PartialEq)]
pub struct Estimate {
    pub value: NumericValue,
    pub uncertainty: NumericValue,
    /// Δf / |f|, when both are real and `f ≠ 0`
    pub relative: Option<f64>,
}

/// Successful result of a request
#[derive(Debug, Clone)]
pub struct Propagation {
    pub formula: ErrorFormula,
    pub constants: Vec<(String, f64)>,
    pub measurements: MeasurementSet,
    pub value: NumericValue,
    pub uncertainty: NumericValue,
    pub relative: Option<f64>,
}

/// Check the substituted quadrature sum before its square root is taken
///
/// Returns the variance as a real number; values within `tol` of zero count
/// as zero.
pub fn validate_variance(variance: Complex64, tol: f64) -> Result<f64, PropagationError> {
    if !is_real(variance, tol) || variance.re < -tol {
        return Err(PropagationError::Domain {
            check: DomainCheck::Variance,
            value: variance,
        });
    }
    Ok(variance.re.max(0.0))
}

/// Error-propagation engine
///
/// # Example
/// ```
/// use errprop::{Propagator, Request};
///
/// let request = Request::new("I*R", "I, R")
///     .measure("I", "2", "0.1")
///     .measure("R", "3", "0.2");
///
/// let result = Propagator::new().propagate(&request).unwrap();
/// assert_eq!(result.value.as_real(), Some(6.0));
/// assert!((result.uncertainty.as_real().unwrap() - 0.5).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Propagator {
    config: EngineConfig,
}

impl Propagator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Propagator { config }
    }

    pub fn collision_policy(mut self, policy: CollisionPolicy) -> Self {
        self.config.collision_policy = policy;
        self
    }

    pub fn simplify(mut self, simplify: bool) -> Self {
        self.config.simplify = simplify;
        self
    }

    pub fn imag_tolerance(mut self, tol: f64) -> Self {
        self.config.imag_tolerance = tol;
        self
    }

    pub fn implicit_multiplication(mut self, enabled: bool) -> Self {
        self.config.implicit_multiplication = enabled;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run one request through the whole pipeline
    ///
    /// # Errors
    /// The first failing stage ends the request; see [`PropagationError`].
    pub fn propagate(&self, request: &Request) -> Result<Propagation, PropagationError> {
        let mut tracker = Tracker::new();

        let (symbols, variables, constants) = self
            .declare(&request.variables, &request.constants)
            .map_err(|e| tracker.fail(e))?;

        let measurements = self
            .read_measurements(&request.measurements, &symbols)
            .map_err(|e| tracker.fail(e))?;

        let formula = self
            .build(&request.function, &symbols, variables, &mut tracker)
            .map_err(|e| tracker.fail(e))?;

        let compiled = Compiled {
            formula,
            symbols,
            constants,
        };

        let estimate = self
            .evaluate_tracked(&compiled, &measurements, &mut tracker)
            .map_err(|e| tracker.fail(e))?;

        Ok(Propagation {
            formula: compiled.formula,
            constants: compiled.constants,
            measurements,
            value: estimate.value,
            uncertainty: estimate.uncertainty,
            relative: estimate.relative,
        })
    }

    /// Build the error formula once, for evaluation over many measurement sets
    pub fn compile(
        &self,
        function: &str,
        variables: &str,
        constants: &str,
    ) -> Result<Compiled, PropagationError> {
        let mut tracker = Tracker::new();
        let (symbols, variables, constants) = self
            .declare(variables, constants)
            .map_err(|e| tracker.fail(e))?;
        let formula = self
            .build(function, &symbols, variables, &mut tracker)
            .map_err(|e| tracker.fail(e))?;
        Ok(Compiled {
            formula,
            symbols,
            constants,
        })
    }

    /// Numeric pass of a compiled formula
    pub fn evaluate(
        &self,
        compiled: &Compiled,
        measurements: &MeasurementSet,
    ) -> Result<Estimate, PropagationError> {
        let mut tracker = Tracker::new();
        tracker.state = State::Combined;
        self.evaluate_tracked(compiled, measurements, &mut tracker)
            .map_err(|e| tracker.fail(e))
    }

    /// Read measurement literals against the symbols of a compiled formula
    pub fn read_measurements(
        &self,
        inputs: &[MeasurementInput],
        symbols: &SymbolTable,
    ) -> Result<MeasurementSet, PropagationError> {
        let options = self.config.parse_options();
        let mut set = MeasurementSet::new();
        for m in inputs {
            if set.get(&m.name).is_some() {
                return Err(PropagationError::syntax(
                    "measurement",
                    format!("'{}' is measured more than once", m.name),
                ));
            }
            let measurement =
                input::parse_measurement(&m.name, &m.value, &m.uncertainty, symbols, &options)?;
            set.insert(m.name.clone(), measurement);
        }
        Ok(set)
    }

    fn declare(
        &self,
        variables: &str,
        constants: &str,
    ) -> Result<(SymbolTable, Vec<String>, Vec<(String, f64)>), PropagationError> {
        let mut symbols = SymbolTable::new();
        let variables = input::parse_variables(variables, &mut symbols)?;
        let constants = input::parse_constants(
            constants,
            &mut symbols,
            self.config.collision_policy,
            &self.config.parse_options(),
        )?;
        Ok((symbols, variables, constants))
    }

    fn build(
        &self,
        function: &str,
        symbols: &SymbolTable,
        variables: Vec<String>,
        tracker: &mut Tracker,
    ) -> Result<ErrorFormula, PropagationError> {
        let expr = parser::parse(function, symbols, &self.config.parse_options())?;
        tracker.advance(State::Parsed);

        let partials = partial_derivatives(&expr, &variables, self.config.simplify)?;
        tracker.advance(State::Differentiated);

        let formula = ErrorFormula::from_partials(expr, variables, partials, self.config.simplify);
        log::trace!("Δf = {}", formula.error);
        tracker.advance(State::Combined);

        Ok(formula)
    }

    fn evaluate_tracked(
        &self,
        compiled: &Compiled,
        measurements: &MeasurementSet,
        tracker: &mut Tracker,
    ) -> Result<Estimate, PropagationError> {
        let tol = self.config.imag_tolerance;
        let formula = &compiled.formula;

        let mut bindings: FxHashMap<String, f64> = compiled.symbols.constant_bindings();
        bindings.extend(measurements.bindings(&formula.variables)?);

        let value = evaluate(&formula.function, &bindings)?;
        let variance = evaluate(&formula.variance, &bindings)?;
        tracker.advance(State::Substituted);

        let variance = validate_variance(variance, tol)?;
        if !is_real(value, tol) {
            return Err(PropagationError::Domain {
                check: DomainCheck::FunctionValue,
                value,
            });
        }
        tracker.advance(State::Validated);

        // Second substitution, into the final symbolic error
        let uncertainty = NumericValue::coerce(&formula.error, &bindings, tol);
        if let NumericValue::Real(u) = uncertainty {
            let direct = variance.sqrt();
            if (u - direct).abs() > 1e-9 * direct.max(1.0) {
                log::warn!(
                    "error formula gives {} but the quadrature sum gives {}",
                    u,
                    direct
                );
            }
        }

        let relative = match uncertainty.as_real() {
            Some(u) if value.re != 0.0 => Some(u / value.re.abs()),
            _ => None,
        };
        tracker.advance(State::Finalized);

        Ok(Estimate {
            value: NumericValue::Real(value.re),
            uncertainty,
            relative,
        })
    }
}
