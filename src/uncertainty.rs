//! Uncertainty propagation for symbolic expressions
//!
//! For uncorrelated measurements the propagated uncertainty is the quadrature
//! sum of the partial derivatives weighted by each uncertainty:
//!
//! Δf = sqrt( Σᵢ (∂f/∂xᵢ · Δxᵢ)² )
//!
//! The uncertainty of variable `x` is the symbol `Δx`. Identifiers produced by
//! the parser are ASCII, so these names never collide with user symbols.
//!
//! # Reference
//!
//! JCGM 100:2008 "Evaluation of measurement data — Guide to the expression
//! of uncertainty in measurement" (GUM), Section 5.1.2
//! <https://www.bipm.org/documents/20126/2071204/JCGM_100_2008_E.pdf>

use crate::{Expr, PropagationError};

/// Name of the symbol standing for the uncertainty of `var`
pub fn uncertainty_symbol(var: &str) -> String {
    format!("Δ{}", var)
}

/// Σ (partial · σ)² over `(partial, σ)` pairs
///
/// Pairs whose partial derivative is identically zero contribute nothing and
/// are skipped; with no remaining terms the sum is the number 0.
pub fn quadrature_sum(terms: &[(Expr, Expr)]) -> Expr {
    Expr::sum(
        terms
            .iter()
            .filter(|(partial, _)| !partial.is_zero_num())
            .map(|(partial, sigma)| {
                let weighted = if partial.is_one_num() {
                    sigma.clone()
                } else {
                    Expr::mul_expr(partial.clone(), sigma.clone())
                };
                Expr::square(weighted)
            }),
    )
}

/// ∂f/∂x for every variable, in the order given
///
/// # Errors
/// Fails on the first variable whose derivative cannot be formed.
pub fn partial_derivatives(
    function: &Expr,
    variables: &[String],
    simplify: bool,
) -> Result<Vec<Expr>, PropagationError> {
    variables
        .iter()
        .map(|var| {
            let partial = function.derive(var)?;
            let partial = if simplify { partial.simplified() } else { partial };
            log::trace!("∂f/∂{} = {}", var, partial);
            Ok(partial)
        })
        .collect()
}

/// Symbolic error formula of one function
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorFormula {
    pub function: Expr,
    /// Variables in declaration order
    pub variables: Vec<String>,
    /// ∂f/∂xᵢ, aligned with `variables`
    pub partials: Vec<Expr>,
    /// Σ (∂f/∂xᵢ · Δxᵢ)²
    pub variance: Expr,
    /// sqrt(variance)
    pub error: Expr,
}

impl ErrorFormula {
    /// Combine already computed partial derivatives into the error formula
    pub fn from_partials(
        function: Expr,
        variables: Vec<String>,
        partials: Vec<Expr>,
        simplify: bool,
    ) -> Self {
        let terms: Vec<(Expr, Expr)> = partials
            .iter()
            .zip(&variables)
            .map(|(partial, var)| (partial.clone(), Expr::symbol(uncertainty_symbol(var))))
            .collect();

        let variance = quadrature_sum(&terms);
        let variance = if simplify { variance.simplified() } else { variance };
        let error = Expr::func("sqrt", variance.clone());

        ErrorFormula {
            function,
            variables,
            partials,
            variance,
            error,
        }
    }

    /// Differentiate `function` by every variable and build the formula
    pub fn build(
        function: &Expr,
        variables: &[String],
        simplify: bool,
    ) -> Result<Self, PropagationError> {
        let partials = partial_derivatives(function, variables, simplify)?;
        Ok(Self::from_partials(
            function.clone(),
            variables.to_vec(),
            partials,
            simplify,
        ))
    }

    /// Δf / |f|
    pub fn relative(&self) -> Expr {
        relative_uncertainty(&self.error, &self.function)
    }
}

/// Compute the uncertainty propagation expression
///
/// Returns Δf = sqrt(Σᵢ (∂f/∂xᵢ · Δxᵢ)²), simplified.
///
/// # Example
/// ```
/// use errprop::{Expr, uncertainty_propagation};
///
/// let f = Expr::symbol("x") + Expr::symbol("y");
/// let df = uncertainty_propagation(&f, &["x", "y"]).unwrap();
/// assert_eq!(df.to_string(), "sqrt(Δx^2 + Δy^2)");
/// ```
pub fn uncertainty_propagation(expr: &Expr, variables: &[&str]) -> Result<Expr, PropagationError> {
    let variables: Vec<String> = variables.iter().map(|v| v.to_string()).collect();
    Ok(ErrorFormula::build(expr, &variables, true)?.error)
}

/// Compute relative uncertainty expression: Δf / |f|
pub fn relative_uncertainty(error: &Expr, function: &Expr) -> Expr {
    Expr::div_expr(error.clone(), Expr::func("abs", function.clone()))
}
