//! Simplification framework - reduces expressions
//!
//! Used to keep partial derivatives and the error formula readable. The
//! numeric result never depends on it: an unsimplified tree evaluates to the
//! same value.
pub(crate) mod engine;
mod rules;

use crate::functions::registry::Registry;
use crate::{Expr, ExprKind};
use num_complex::Complex64;

/// Simplify an expression with the built-in rule set
pub fn simplify(expr: Expr) -> Expr {
    let current = engine::Simplifier::new().simplify(expr);

    // Evaluate numeric functions like sqrt(4) -> 2 once the algebra is done
    evaluate_numeric_functions(current)
}

/// Evaluate function calls on numbers when the result is a clean integer,
/// e.g. sqrt(4) -> 2, cos(0) -> 1, ln(1) -> 0. Calls like ln(2) stay symbolic.
fn evaluate_numeric_functions(expr: Expr) -> Expr {
    match expr.kind {
        ExprKind::Add(u, v) => Expr::add_expr(
            evaluate_numeric_functions(u.as_ref().clone()),
            evaluate_numeric_functions(v.as_ref().clone()),
        ),
        ExprKind::Sub(u, v) => Expr::sub_expr(
            evaluate_numeric_functions(u.as_ref().clone()),
            evaluate_numeric_functions(v.as_ref().clone()),
        ),
        ExprKind::Mul(u, v) => {
            let u = evaluate_numeric_functions(u.as_ref().clone());
            let v = evaluate_numeric_functions(v.as_ref().clone());

            // Canonical form: 0.5 * expr -> expr / 2
            if let ExprKind::Number(n) = &u.kind
                && *n == 0.5
            {
                return Expr::div_expr(v, Expr::number(2.0));
            }

            Expr::mul_expr(u, v)
        }
        ExprKind::Div(u, v) => Expr::div_expr(
            evaluate_numeric_functions(u.as_ref().clone()),
            evaluate_numeric_functions(v.as_ref().clone()),
        ),
        ExprKind::Pow(u, v) => Expr::pow(
            evaluate_numeric_functions(u.as_ref().clone()),
            evaluate_numeric_functions(v.as_ref().clone()),
        ),
        ExprKind::FunctionCall { name, args } => {
            let args: Vec<Expr> = args.into_iter().map(evaluate_numeric_functions).collect();

            if let [arg] = args.as_slice()
                && let Some(n) = arg.as_number()
                && let Some(def) = Registry::get(&name)
            {
                let z = (def.eval)(Complex64::new(n, 0.0));
                if z.im == 0.0 && z.re.is_finite() && z.re.fract() == 0.0 {
                    return Expr::number(z.re);
                }
            }

            Expr::func_multi(name, args)
        }
        _ => Expr::new(expr.kind),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn x() -> Expr {
        Expr::symbol("x")
    }

    #[test]
    fn test_clean_function_values_fold() {
        assert_eq!(simplify(Expr::func("sqrt", Expr::number(4.0))), Expr::number(2.0));
        assert_eq!(simplify(Expr::func("cos", Expr::number(0.0))), Expr::number(1.0));
        assert_eq!(simplify(Expr::func("ln", Expr::number(1.0))), Expr::number(0.0));
    }

    #[test]
    fn test_small_function_values_are_not_rounded_away() {
        let tiny = Expr::func("sin", Expr::number(1e-12));
        assert_eq!(simplify(tiny.clone()), tiny);
    }

    #[test]
    fn test_irrational_values_stay_symbolic() {
        let ln2 = Expr::func("ln", Expr::number(2.0));
        assert_eq!(simplify(ln2.clone()), ln2);
        let sqrt_neg = Expr::func("sqrt", Expr::number(-1.0));
        assert_eq!(simplify(sqrt_neg.clone()), sqrt_neg);
    }

    #[test]
    fn test_double_negation() {
        // -1 * (-1 * x) = x
        let expr = Expr::neg(Expr::neg(x()));
        assert_eq!(simplify(expr), x());
    }

    #[test]
    fn test_coefficients_combine() {
        // 2 * (3 * x) = 6 * x
        let expr = Expr::number(2.0) * (Expr::number(3.0) * x());
        assert_eq!(simplify(expr), Expr::number(6.0) * x());
    }

    #[test]
    fn test_cancellation() {
        assert_eq!(simplify(x() - x()), Expr::number(0.0));
        assert_eq!(simplify(x() / x()), Expr::number(1.0));
        assert_eq!(simplify(x() * x()), Expr::square(x()));
    }

    #[test]
    fn test_square_of_negation() {
        let expr = Expr::square(Expr::neg(x() * Expr::symbol("y")));
        assert_eq!(simplify(expr), Expr::square(x() * Expr::symbol("y")));
    }
}
