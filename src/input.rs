//! Parsing of the request fields other than the function itself
//!
//! - variable list: `I, R` (commas or whitespace)
//! - constant list: `c = 3e8, G = 6.67e-11`
//! - measurement literals: a value and an uncertainty, each a number or a
//!   closed expression such as `6.022*10**23` or `2*pi`

use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::evaluator::{evaluate, is_real};
use crate::parser::{ParseOptions, parse_value};
use crate::symbol::{CollisionPolicy, SymbolTable};
use crate::PropagationError;

/// Measured value of one variable and its uncertainty
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Measurement {
    pub value: f64,
    pub uncertainty: f64,
}

impl Measurement {
    pub fn new(value: f64, uncertainty: f64) -> Self {
        Measurement { value, uncertainty }
    }
}

/// Measurements of one request, keyed by variable name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeasurementSet {
    entries: FxHashMap<String, Measurement>,
}

impl MeasurementSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the measurement of `name`
    pub fn insert(&mut self, name: impl Into<String>, measurement: Measurement) {
        self.entries.insert(name.into(), measurement);
    }

    pub fn get(&self, name: &str) -> Option<&Measurement> {
        self.entries.get(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Bindings for the numeric pass: `x ↦ value`, `Δx ↦ uncertainty`
    ///
    /// # Errors
    /// A variable with no measurement is a substitution error.
    pub fn bindings(
        &self,
        variables: &[String],
    ) -> Result<FxHashMap<String, f64>, PropagationError> {
        let mut bindings = FxHashMap::default();
        for var in variables {
            let m = self.get(var).ok_or_else(|| {
                PropagationError::substitution(format!(
                    "no measurement was given for variable '{}'",
                    var
                ))
            })?;
            bindings.insert(var.clone(), m.value);
            bindings.insert(crate::uncertainty::uncertainty_symbol(var), m.uncertainty);
        }
        Ok(bindings)
    }
}

impl FromIterator<(String, Measurement)> for MeasurementSet {
    fn from_iter<T: IntoIterator<Item = (String, Measurement)>>(iter: T) -> Self {
        MeasurementSet {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Declare every name of a variable list in `table`, in order
///
/// # Errors
/// An empty list, an invalid identifier or a duplicate is a syntax error.
pub fn parse_variables(
    text: &str,
    table: &mut SymbolTable,
) -> Result<Vec<String>, PropagationError> {
    let names: Vec<&str> = text
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .collect();

    if names.is_empty() {
        return Err(PropagationError::syntax(
            "variable list",
            "at least one variable is required",
        ));
    }

    for name in &names {
        table.declare_variable(name)?;
    }

    log::debug!("declared variables: {}", names.join(", "));
    Ok(names.into_iter().map(String::from).collect())
}

/// Declare every `name = value` pair of a constant list in `table`
///
/// Returns the constants that were kept; under
/// [`CollisionPolicy::VariableWins`] a constant named like a variable is
/// dropped.
pub fn parse_constants(
    text: &str,
    table: &mut SymbolTable,
    policy: CollisionPolicy,
    options: &ParseOptions,
) -> Result<Vec<(String, f64)>, PropagationError> {
    let mut kept = Vec::new();

    for item in text.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let Some((name, value)) = item.split_once('=') else {
            return Err(PropagationError::syntax(
                "constant list",
                format!("expected 'name = value', got '{}'", item),
            ));
        };
        let name = name.trim();
        let value = parse_number(&format!("value of constant '{}'", name), value, table, options)?;

        if table.declare_constant(name, value, policy)? {
            kept.push((name.to_string(), value));
        }
    }

    if !kept.is_empty() {
        log::debug!("declared {} constant(s)", kept.len());
    }
    Ok(kept)
}

/// Read a numeric literal or closed expression as a real number
///
/// Names bound in `table` (constants and built-ins) may appear; variables may
/// not.
pub fn parse_number(
    field: &str,
    text: &str,
    table: &SymbolTable,
    options: &ParseOptions,
) -> Result<f64, PropagationError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(PropagationError::syntax(field, "a value is required"));
    }

    // Plain literals; `inf` and `nan` fall through and are rejected as symbols
    if let Ok(v) = text.parse::<f64>()
        && v.is_finite()
    {
        return Ok(v);
    }

    let expr = parse_value(text, table, options)
        .map_err(|e| PropagationError::syntax(field, e.to_string()))?;
    let z = evaluate(&expr, &table.constant_bindings())
        .map_err(|e| PropagationError::syntax(field, e.to_string()))?;

    if !is_real(z, crate::evaluator::DEFAULT_IMAG_TOLERANCE) {
        return Err(PropagationError::syntax(
            field,
            format!("'{}' is not a real number", text),
        ));
    }
    Ok(z.re)
}

/// Read the value and uncertainty of variable `name`
pub fn parse_measurement(
    name: &str,
    value: &str,
    uncertainty: &str,
    table: &SymbolTable,
    options: &ParseOptions,
) -> Result<Measurement, PropagationError> {
    if !table.is_variable(name) {
        return Err(PropagationError::syntax(
            "measurement",
            format!("'{}' is not a declared variable", name),
        ));
    }

    let value = parse_number(&format!("value of '{}'", name), value, table, options)?;
    let uncertainty = parse_number(
        &format!("uncertainty of '{}'", name),
        uncertainty,
        table,
        options,
    )?;

    if uncertainty < 0.0 {
        log::warn!(
            "uncertainty of '{}' is negative ({}); only its square is used",
            name,
            uncertainty
        );
    }

    Ok(Measurement::new(value, uncertainty))
}

/// Split a `NAME=VALUE:UNCERTAINTY` literal into its three parts
pub fn split_measurement_literal(literal: &str) -> Result<(&str, &str, &str), PropagationError> {
    let bad = || {
        PropagationError::syntax(
            "measurement",
            format!("expected NAME=VALUE:UNCERTAINTY, got '{}'", literal),
        )
    };

    let (name, rest) = literal.split_once('=').ok_or_else(bad)?;
    let (value, uncertainty) = rest.rsplit_once(':').ok_or_else(bad)?;

    let name = name.trim();
    if name.is_empty() {
        return Err(bad());
    }
    Ok((name, value.trim(), uncertainty.trim()))
}
