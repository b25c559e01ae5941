//! Numeric precision and the final report of a propagation

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::DisplayConfig;
use crate::engine::Propagation;
use crate::evaluator::NumericValue;

/// How many digits numeric results are shown with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Precision {
    /// Significant digits, `%g` style
    Significant(usize),
    /// Fixed digits after the decimal point
    Decimals(usize),
}

impl Default for Precision {
    fn default() -> Self {
        Precision::Significant(6)
    }
}

impl Precision {
    pub fn format(&self, value: f64) -> String {
        match *self {
            Precision::Significant(digits) => format_significant(value, digits),
            Precision::Decimals(digits) => {
                if value.is_finite() {
                    format!("{:.*}", digits, value)
                } else {
                    format_significant(value, 1)
                }
            }
        }
    }
}

impl FromStr for Precision {
    type Err = String;

    /// `sig:6`, `dec:4`, or a bare `6` for significant digits
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (kind, digits) = s.split_once(':').unwrap_or(("sig", s));
        let digits: usize = digits
            .trim()
            .parse()
            .map_err(|_| format!("invalid digit count in precision '{}'", s))?;
        match kind.trim().to_ascii_lowercase().as_str() {
            "sig" | "significant" => Ok(Precision::Significant(digits.max(1))),
            "dec" | "decimals" => Ok(Precision::Decimals(digits)),
            other => Err(format!(
                "unknown precision kind '{}' (expected 'sig' or 'dec')",
                other
            )),
        }
    }
}

impl TryFrom<String> for Precision {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Precision> for String {
    fn from(p: Precision) -> Self {
        p.to_string()
    }
}

impl fmt::Display for Precision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Precision::Significant(n) => write!(f, "sig:{}", n),
            Precision::Decimals(n) => write!(f, "dec:{}", n),
        }
    }
}

/// Format like C's `%.{digits}g`: shortest of fixed and scientific
/// notation, trailing zeros removed
pub fn format_significant(value: f64, digits: usize) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        let s = if value > 0.0 { "inf" } else { "-inf" };
        return s.to_string();
    }
    if value == 0.0 {
        return "0".to_string();
    }

    let digits = digits.max(1);

    // Round to `digits` significant figures first; the exponent after
    // rounding decides the notation (9.9999995 -> 10 with 6 digits)
    let sci = format!("{:.*e}", digits - 1, value);
    let Some((mantissa, exp)) = sci.split_once('e') else {
        return sci;
    };
    let exp: i32 = exp.parse().unwrap_or(0);

    if exp < -4 || exp >= digits as i32 {
        let mantissa = strip_trailing_zeros(mantissa);
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", mantissa, sign, exp.abs())
    } else {
        let decimals = (digits as i32 - 1 - exp).max(0) as usize;
        strip_trailing_zeros(&format!("{:.*}", decimals, value)).to_string()
    }
}

fn strip_trailing_zeros(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

/// Output format of the command-line tool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!("unknown format '{}' (expected 'text' or 'json')", other)),
        }
    }
}

fn format_numeric(value: &NumericValue, precision: Precision) -> String {
    match value {
        NumericValue::Real(v) => precision.format(*v),
        NumericValue::Unevaluated(expr) => expr.to_string(),
    }
}

/// Everything shown to the user for one successful request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    /// `f(I, R) = I*R`
    pub function: String,
    /// `Δf = sqrt((R*ΔI)^2 + (I*ΔR)^2)`
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_latex: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_latex: Option<String>,
    /// Formatted function value
    pub value: String,
    /// Formatted uncertainty, `±` included
    pub uncertainty: String,
    /// Relative uncertainty in percent, when `f ≠ 0`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relative: Option<String>,
    /// Unrounded numbers, absent when a value stayed symbolic
    pub raw_value: Option<f64>,
    pub raw_uncertainty: Option<f64>,
}

impl Report {
    pub fn new(propagation: &Propagation, display: &DisplayConfig) -> Self {
        let formula = &propagation.formula;
        let precision = display.precision;
        let head = format!("f({})", formula.variables.join(", "));

        let (function_latex, error_latex) = if display.latex {
            let args = formula.variables.join(", ");
            (
                Some(format!("f({}) = {}", args, formula.function.latex())),
                Some(format!(r"\Delta f = {}", formula.error.latex())),
            )
        } else {
            (None, None)
        };

        Report {
            function: format!("{} = {}", head, formula.function),
            error: format!("Δf = {}", formula.error),
            function_latex,
            error_latex,
            value: format_numeric(&propagation.value, precision),
            uncertainty: format!("±{}", format_numeric(&propagation.uncertainty, precision)),
            relative: propagation
                .relative
                .map(|r| format!("{}%", precision.format(r * 100.0))),
            raw_value: propagation.value.as_real(),
            raw_uncertainty: propagation.uncertainty.as_real(),
        }
    }

    /// Render in the requested output format
    pub fn render(&self, format: OutputFormat) -> Result<String, serde_json::Error> {
        match format {
            OutputFormat::Text => Ok(self.to_string()),
            OutputFormat::Json => serde_json::to_string_pretty(self),
        }
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.function)?;
        writeln!(f, "{}", self.error)?;
        if let (Some(fl), Some(el)) = (&self.function_latex, &self.error_latex) {
            writeln!(f, "LaTeX: {}", fl)?;
            writeln!(f, "LaTeX: {}", el)?;
        }
        writeln!(f, "value       = {}", self.value)?;
        write!(f, "uncertainty = {}", self.uncertainty)?;
        if let Some(rel) = &self.relative {
            write!(f, "\nrelative    = {}", rel)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_significant_matches_printf_g() {
        assert_eq!(format_significant(6.0, 6), "6");
        assert_eq!(format_significant(0.5, 6), "0.5");
        assert_eq!(format_significant(0.1 + 0.2, 6), "0.3");
        assert_eq!(format_significant(1234567.0, 6), "1.23457e+06");
        assert_eq!(format_significant(123456.0, 6), "123456");
        assert_eq!(format_significant(0.0001, 6), "0.0001");
        assert_eq!(format_significant(0.00001234, 6), "1.234e-05");
        assert_eq!(format_significant(-2.5e-19, 6), "-2.5e-19");
        assert_eq!(format_significant(9.9999995, 6), "10");
        assert_eq!(format_significant(std::f64::consts::PI, 3), "3.14");
        assert_eq!(format_significant(f64::INFINITY, 6), "inf");
    }

    #[test]
    fn test_decimals() {
        assert_eq!(Precision::Decimals(2).format(3.14159), "3.14");
        assert_eq!(Precision::Decimals(0).format(2.5e3), "2500");
    }

    #[test]
    fn test_precision_from_str() {
        assert_eq!("sig:4".parse(), Ok(Precision::Significant(4)));
        assert_eq!("dec:2".parse(), Ok(Precision::Decimals(2)));
        assert_eq!("8".parse(), Ok(Precision::Significant(8)));
        assert!("hex:2".parse::<Precision>().is_err());
        assert!("sig:x".parse::<Precision>().is_err());
        assert_eq!(Precision::default().to_string(), "sig:6");
    }

    #[test]
    fn test_unevaluated_values_show_expression() {
        let value = NumericValue::Unevaluated(crate::Expr::func(
            "sqrt",
            crate::Expr::number(-1.0),
        ));
        assert_eq!(format_numeric(&value, Precision::default()), "sqrt(-1)");
    }

    #[test]
    fn test_output_format() {
        assert_eq!("JSON".parse(), Ok(OutputFormat::Json));
        assert!("yaml".parse::<OutputFormat>().is_err());
    }
}
