// Differentiation engine - applies calculus rules
//
// Inline optimizations: this module folds trivial cases (0 + x -> x, 1 * x -> x)
// while it builds derivatives, so that the partials of nested functions stay small
// before the simplifier runs. The simplification module handles what is left.

use crate::functions::registry::Registry;
use crate::{Expr, ExprKind, PropagationError};

/// `a * b` without the trivial factors 0 and 1
fn product(a: &Expr, b: &Expr) -> Expr {
    if a.is_zero_num() || b.is_zero_num() {
        Expr::number(0.0)
    } else if a.is_one_num() {
        b.clone()
    } else if b.is_one_num() {
        a.clone()
    } else {
        Expr::mul_expr(a.clone(), b.clone())
    }
}

/// `a + b` without zero terms
fn sum(a: Expr, b: Expr) -> Expr {
    if a.is_zero_num() {
        b
    } else if b.is_zero_num() {
        a
    } else {
        Expr::add_expr(a, b)
    }
}

impl Expr {
    /// Differentiate this expression with respect to a variable
    ///
    /// Every symbol other than `var` (other variables, constants, built-in
    /// constants and uncertainty symbols) is held fixed.
    ///
    /// # Errors
    /// Returns [`PropagationError::Differentiation`] if the expression calls a
    /// function with no derivative rule.
    pub fn derive(&self, var: &str) -> Result<Expr, PropagationError> {
        Ok(match &self.kind {
            // Base cases
            ExprKind::Number(_) => Expr::number(0.0),

            ExprKind::Symbol(name) => {
                if name == var {
                    Expr::number(1.0)
                } else {
                    Expr::number(0.0)
                }
            }

            // Chain rule through the function registry
            ExprKind::FunctionCall { name, args } => {
                let def = Registry::get(name).ok_or_else(|| PropagationError::Differentiation {
                    var: var.to_string(),
                    msg: format!("no derivative rule is known for '{}'", name),
                })?;

                let [inner] = args.as_slice() else {
                    return Err(PropagationError::Differentiation {
                        var: var.to_string(),
                        msg: format!(
                            "'{}' expects one argument but was given {}",
                            name,
                            args.len()
                        ),
                    });
                };

                let inner_prime = inner.derive(var)?;
                if inner_prime.is_zero_num() {
                    Expr::number(0.0)
                } else {
                    (def.derivative)(inner, inner_prime)
                }
            }

            // Sum rule: (u + v)' = u' + v'
            ExprKind::Add(u, v) => sum(u.derive(var)?, v.derive(var)?),

            // Subtraction rule: (u - v)' = u' - v'
            ExprKind::Sub(u, v) => {
                let u_prime = u.derive(var)?;
                let v_prime = v.derive(var)?;
                if v_prime.is_zero_num() {
                    u_prime
                } else if u_prime.is_zero_num() {
                    Expr::neg(v_prime)
                } else {
                    Expr::sub_expr(u_prime, v_prime)
                }
            }

            // Product rule: (u * v)' = u' * v + u * v'
            ExprKind::Mul(u, v) => {
                let u_prime = u.derive(var)?;
                let v_prime = v.derive(var)?;
                sum(product(&u_prime, v), product(u, &v_prime))
            }

            // Quotient rule: (u / v)' = (u' * v - u * v') / v^2
            ExprKind::Div(u, v) => {
                let u_prime = u.derive(var)?;
                let v_prime = v.derive(var)?;

                if v_prime.is_zero_num() {
                    // Constant denominator: u' / v
                    if u_prime.is_zero_num() {
                        Expr::number(0.0)
                    } else if v.is_one_num() {
                        u_prime
                    } else {
                        Expr::div_expr(u_prime, (**v).clone())
                    }
                } else {
                    let term1 = product(&u_prime, v);
                    let term2 = product(u, &v_prime);
                    let numerator = if term1.is_zero_num() {
                        Expr::neg(term2)
                    } else {
                        Expr::sub_expr(term1, term2)
                    };
                    Expr::div_expr(numerator, Expr::square((**v).clone()))
                }
            }

            // Power rule with logarithmic differentiation for variable exponents
            ExprKind::Pow(u, v) => {
                let u_prime = u.derive(var)?;

                if !v.contains_var(var) {
                    // (u^n)' = n * u^(n-1) * u'
                    if u_prime.is_zero_num() {
                        return Ok(Expr::number(0.0));
                    }
                    match v.as_number() {
                        Some(n) if n == 0.0 => Expr::number(0.0),
                        Some(n) if n == 1.0 => u_prime,
                        Some(n) => {
                            let lowered = if n == 2.0 {
                                (**u).clone()
                            } else {
                                Expr::pow((**u).clone(), Expr::number(n - 1.0))
                            };
                            product(&Expr::number(n), &product(&lowered, &u_prime))
                        }
                        None => {
                            let lowered = Expr::pow(
                                (**u).clone(),
                                Expr::sub_expr((**v).clone(), Expr::number(1.0)),
                            );
                            product(v, &product(&lowered, &u_prime))
                        }
                    }
                } else {
                    // d/dx[u^v] = u^v * (v' * ln(u) + v * u'/u)
                    let v_prime = v.derive(var)?;

                    let ln_u = if u.is_one_num() {
                        Expr::number(0.0)
                    } else {
                        Expr::func("ln", (**u).clone())
                    };
                    let term1 = product(&v_prime, &ln_u);

                    let term2 = if u_prime.is_zero_num() {
                        Expr::number(0.0)
                    } else {
                        product(v, &Expr::div_expr(u_prime, (**u).clone()))
                    };

                    let inner = sum(term1, term2);
                    product(&Expr::pow((**u).clone(), (**v).clone()), &inner)
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn x() -> Expr {
        Expr::symbol("x")
    }

    #[test]
    fn test_derive_constants_and_symbols() {
        assert_eq!(Expr::number(5.0).derive("x").unwrap(), Expr::number(0.0));
        assert_eq!(x().derive("x").unwrap(), Expr::number(1.0));
        assert_eq!(Expr::symbol("y").derive("x").unwrap(), Expr::number(0.0));
    }

    #[test]
    fn test_derive_product_holds_other_variables_fixed() {
        // d/dI (I * R) = R
        let f = Expr::symbol("I") * Expr::symbol("R");
        assert_eq!(f.derive("I").unwrap(), Expr::symbol("R"));
        assert_eq!(f.derive("R").unwrap(), Expr::symbol("I"));
    }

    #[test]
    fn test_derive_square() {
        // d/dx x^2 = 2 * x
        let f = Expr::square(x());
        assert_eq!(f.derive("x").unwrap(), Expr::number(2.0) * x());
    }

    #[test]
    fn test_derive_sin_chain_rule() {
        // d/dx sin(x) = cos(x)
        let f = Expr::func("sin", x());
        assert_eq!(f.derive("x").unwrap(), Expr::func("cos", x()));
    }

    #[test]
    fn test_derive_quotient_with_constant_denominator() {
        // d/dx (x / 2) = 1 / 2
        let f = x() / 2.0;
        assert_eq!(f.derive("x").unwrap(), Expr::number(1.0) / 2.0);
    }

    #[test]
    fn test_derive_variable_exponent() {
        // d/dx 2^x contains ln(2)
        let f = Expr::pow(Expr::number(2.0), x());
        let d = f.derive("x").unwrap();
        assert!(d.to_string().contains("ln(2)"));
    }

    #[test]
    fn test_unknown_function_fails() {
        let f = Expr::func("besselj", x());
        let err = f.derive("x").unwrap_err();
        assert!(matches!(err, PropagationError::Differentiation { ref var, .. } if var == "x"));
    }
}
