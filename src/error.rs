use num_complex::Complex64;
use std::fmt;
use thiserror::Error;

/// Source location span for error reporting
/// Represents a range of characters in the input string
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    /// Start position (0-indexed byte offset)
    pub start: usize,
    /// End position (exclusive, 0-indexed byte offset)
    pub end: usize,
}

impl Span {
    /// Create a new span
    pub fn new(start: usize, end: usize) -> Self {
        Span { start, end }
    }

    /// Create a span for a single position
    pub fn at(pos: usize) -> Self {
        Span {
            start: pos,
            end: pos + 1,
        }
    }

    /// Check if this span has valid location info
    pub fn is_valid(&self) -> bool {
        self.end > self.start
    }

    /// Format the span for display (1-indexed for users)
    pub fn display(&self) -> String {
        if !self.is_valid() {
            String::new()
        } else if self.end - self.start == 1 {
            format!(" at position {}", self.start + 1)
        } else {
            format!(" at positions {}-{}", self.start + 1, self.end)
        }
    }
}

fn at(span: &Option<Span>) -> String {
    span.map_or(String::new(), |s| s.display())
}

/// Errors produced while turning the function text into an expression tree
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("Formula cannot be empty")]
    EmptyFormula,

    #[error("Invalid syntax: {msg}{}", at(.span))]
    InvalidSyntax { msg: String, span: Option<Span> },

    #[error("Invalid number format: '{value}'{}", at(.span))]
    InvalidNumber { value: String, span: Option<Span> },

    #[error("Invalid token: '{token}'{}", at(.span))]
    InvalidToken { token: String, span: Option<Span> },

    #[error("Expected '{expected}', but got '{got}'{}", at(.span))]
    UnexpectedToken {
        expected: String,
        got: String,
        span: Option<Span>,
    },

    #[error("Unexpected end of input")]
    UnexpectedEndOfInput,

    #[error("Unknown function '{name}'{}", at(.span))]
    UnknownFunction { name: String, span: Option<Span> },

    /// The expression mentions names that were neither declared as variables
    /// nor as constants
    #[error("Undeclared symbol(s): {}; declare them as variables or constants", .names.join(", "))]
    UndeclaredSymbols { names: Vec<String> },

    #[error("Expression nesting depth exceeds maximum limit")]
    MaxDepthExceeded,

    #[error("Expression size exceeds maximum node count limit")]
    MaxNodesExceeded,
}

impl ParseError {
    pub fn invalid_syntax_at(msg: impl Into<String>, span: Span) -> Self {
        ParseError::InvalidSyntax {
            msg: msg.into(),
            span: Some(span),
        }
    }

    pub fn unexpected(expected: impl Into<String>, got: impl Into<String>, span: Span) -> Self {
        ParseError::UnexpectedToken {
            expected: expected.into(),
            got: got.into(),
            span: Some(span),
        }
    }
}

/// Pipeline step that was being attempted when a request failed
///
/// Building the quadrature sum and the final formatting cannot fail, so they
/// have no stage here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Variable list, constants and measurement literals
    Input,
    /// Function expression
    Parse,
    Differentiate,
    Substitute,
    Validate,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Input => "input",
            Stage::Parse => "parsing",
            Stage::Differentiate => "differentiation",
            Stage::Substitute => "substitution",
            Stage::Validate => "domain validation",
        };
        f.write_str(name)
    }
}

/// Which intermediate value failed a domain check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomainCheck {
    /// The quadrature sum under the square root
    Variance,
    /// The substituted function value
    FunctionValue,
}

impl fmt::Display for DomainCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DomainCheck::Variance => f.write_str("value inside the square root"),
            DomainCheck::FunctionValue => f.write_str("function value"),
        }
    }
}

fn complex_str(z: &Complex64) -> String {
    if z.im == 0.0 {
        format!("{}", z.re)
    } else if z.im < 0.0 {
        format!("{} - {}i", z.re, -z.im)
    } else {
        format!("{} + {}i", z.re, z.im)
    }
}

/// Failure of one error-propagation request
///
/// Every variant maps onto exactly one pipeline [`Stage`]; the message names
/// the stage and, where there is one, the offending value.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PropagationError {
    /// Malformed variable list, constant list or measurement literal
    #[error("[input] invalid {field}: {msg}")]
    Syntax { field: String, msg: String },

    #[error("[parsing] invalid function: {0}")]
    Parse(#[from] ParseError),

    #[error("[differentiation] cannot differentiate with respect to '{var}': {msg}")]
    Differentiation { var: String, msg: String },

    #[error("[substitution] {msg}")]
    Substitution { msg: String },

    #[error(
        "[domain validation] the {check} is complex or negative: {}. \
         Probable cause: a measured value lies outside the domain of the function",
        complex_str(.value)
    )]
    Domain { check: DomainCheck, value: Complex64 },
}

impl PropagationError {
    pub fn syntax(field: impl Into<String>, msg: impl Into<String>) -> Self {
        PropagationError::Syntax {
            field: field.into(),
            msg: msg.into(),
        }
    }

    pub fn substitution(msg: impl Into<String>) -> Self {
        PropagationError::Substitution { msg: msg.into() }
    }

    /// The pipeline step that rejected the request
    pub fn stage(&self) -> Stage {
        match self {
            PropagationError::Syntax { .. } => Stage::Input,
            PropagationError::Parse(_) => Stage::Parse,
            PropagationError::Differentiation { .. } => Stage::Differentiate,
            PropagationError::Substitution { .. } => Stage::Substitute,
            PropagationError::Domain { .. } => Stage::Validate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_display() {
        assert_eq!(Span::at(3).display(), " at position 4");
        assert_eq!(Span::new(2, 5).display(), " at positions 3-5");
        assert_eq!(Span::default().display(), "");
    }

    #[test]
    fn test_messages_name_the_stage() {
        let err = PropagationError::syntax("variable list", "at least one variable is required");
        assert_eq!(err.stage(), Stage::Input);
        assert!(err.to_string().starts_with("[input]"));

        let err: PropagationError = ParseError::UndeclaredSymbols {
            names: vec!["k".into(), "q".into()],
        }
        .into();
        assert_eq!(err.stage(), Stage::Parse);
        assert!(err.to_string().contains("k, q"));
    }

    #[test]
    fn test_message_prefix_is_stage_name() {
        let errors = [
            PropagationError::syntax("constants", "missing '='"),
            ParseError::EmptyFormula.into(),
            PropagationError::Differentiation {
                var: "x".into(),
                msg: "unknown function".into(),
            },
            PropagationError::substitution("division by zero"),
            PropagationError::Domain {
                check: DomainCheck::FunctionValue,
                value: Complex64::new(0.0, 1.0),
            },
        ];
        let stages: Vec<Stage> = errors.iter().map(PropagationError::stage).collect();
        assert_eq!(
            stages,
            [
                Stage::Input,
                Stage::Parse,
                Stage::Differentiate,
                Stage::Substitute,
                Stage::Validate
            ]
        );
        for (err, stage) in errors.iter().zip(stages) {
            assert!(err.to_string().starts_with(&format!("[{}]", stage)));
        }
    }

    #[test]
    fn test_domain_error_carries_value() {
        let err = PropagationError::Domain {
            check: DomainCheck::Variance,
            value: Complex64::new(-0.0025, 0.0),
        };
        let msg = err.to_string();
        assert!(msg.contains("domain validation"));
        assert!(msg.contains("-0.0025"));
    }
}
