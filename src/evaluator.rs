//! Numeric evaluation of expression trees over the complex plane
//!
//! Values are `Complex64` so that leaving a function's real domain (`sqrt(-1)`,
//! `ln(-2)`) gives an imaginary part the domain validator can report, instead
//! of a NaN that hides where things went wrong.

use std::fmt;

use num_complex::Complex64;
use num_traits::{One, Zero};
use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::functions::registry::Registry;
use crate::traits::as_small_integer;
use crate::{Expr, ExprKind, PropagationError};

/// Default tolerance for deciding that a complex value is real
pub const DEFAULT_IMAG_TOLERANCE: f64 = 1e-12;

/// Error during numeric evaluation
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("division by zero in {0}")]
    DivisionByZero(String),

    #[error("no value was given for '{0}'")]
    Unbound(String),

    #[error("{0} is not a finite number")]
    NonFinite(String),

    #[error("unknown function '{0}'")]
    UnknownFunction(String),
}

impl From<EvalError> for PropagationError {
    fn from(err: EvalError) -> Self {
        PropagationError::substitution(err.to_string())
    }
}

/// `|Im| <= tol * max(1, |Re|)`
pub fn is_real(z: Complex64, tol: f64) -> bool {
    z.im.abs() <= tol * z.re.abs().max(1.0)
}

/// Evaluate `expr` with every symbol bound in `bindings`
pub fn evaluate(expr: &Expr, bindings: &FxHashMap<String, f64>) -> Result<Complex64, EvalError> {
    let value = match &expr.kind {
        ExprKind::Number(n) => Complex64::new(*n, 0.0),

        ExprKind::Symbol(name) => match bindings.get(name) {
            Some(v) => Complex64::new(*v, 0.0),
            None => return Err(EvalError::Unbound(name.clone())),
        },

        ExprKind::FunctionCall { name, args } => {
            let def = Registry::get(name).ok_or_else(|| EvalError::UnknownFunction(name.clone()))?;
            let [arg] = args.as_slice() else {
                return Err(EvalError::UnknownFunction(format!("{}/{}", name, args.len())));
            };
            (def.eval)(evaluate(arg, bindings)?)
        }

        ExprKind::Add(u, v) => evaluate(u, bindings)? + evaluate(v, bindings)?,
        ExprKind::Sub(u, v) => evaluate(u, bindings)? - evaluate(v, bindings)?,
        ExprKind::Mul(u, v) => evaluate(u, bindings)? * evaluate(v, bindings)?,

        ExprKind::Div(u, v) => {
            let num = evaluate(u, bindings)?;
            let den = evaluate(v, bindings)?;
            if den.is_zero() {
                return Err(EvalError::DivisionByZero(expr.to_string()));
            }
            num / den
        }

        ExprKind::Pow(u, v) => power(evaluate(u, bindings)?, evaluate(v, bindings)?, expr)?,
    };

    if !value.re.is_finite() || !value.im.is_finite() {
        return Err(EvalError::NonFinite(expr.to_string()));
    }
    Ok(value)
}

fn power(base: Complex64, exp: Complex64, expr: &Expr) -> Result<Complex64, EvalError> {
    if base.is_zero() {
        return if exp.is_zero() {
            Ok(Complex64::one())
        } else if exp.re > 0.0 {
            Ok(Complex64::zero())
        } else {
            Err(EvalError::DivisionByZero(expr.to_string()))
        };
    }

    if exp.im == 0.0 {
        // Integer powers stay exact and real for real bases: (-2)^2 = 4
        if let Some(n) = as_small_integer(exp.re) {
            return Ok(base.powi(n));
        }
        if base.im == 0.0 && base.re > 0.0 {
            return Ok(Complex64::new(base.re.powf(exp.re), 0.0));
        }
    }

    // Principal branch: (-1)^0.5 = i
    Ok(base.powc(exp))
}

/// A number, or the expression that could not be reduced to one
#[derive(Debug, Clone, PartialEq)]
pub enum NumericValue {
    Real(f64),
    Unevaluated(Expr),
}

impl NumericValue {
    /// Evaluate `expr`, falling back to the substituted symbolic form when
    /// evaluation fails or the value is not real
    pub fn coerce(expr: &Expr, bindings: &FxHashMap<String, f64>, tol: f64) -> Self {
        match evaluate(expr, bindings) {
            Ok(z) if is_real(z, tol) => NumericValue::Real(z.re),
            Ok(z) => {
                log::debug!("{} evaluates to the complex value {}", expr, z);
                NumericValue::Unevaluated(expr.substitute_all(bindings).simplified())
            }
            Err(err) => {
                log::debug!("cannot evaluate {}: {}", expr, err);
                NumericValue::Unevaluated(expr.substitute_all(bindings).simplified())
            }
        }
    }

    pub fn as_real(&self) -> Option<f64> {
        match self {
            NumericValue::Real(v) => Some(*v),
            NumericValue::Unevaluated(_) => None,
        }
    }
}

impl fmt::Display for NumericValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NumericValue::Real(v) => write!(f, "{}", v),
            NumericValue::Unevaluated(expr) => write!(f, "{}", expr),
        }
    }
}
