//! Mathematical function definitions for the function registry
//!
//! Contains evaluation and symbolic differentiation rules for all supported
//! functions. Evaluation uses the principal branch of the complex function so
//! that leaving the real domain shows up as an imaginary part rather than NaN.

use super::registry::FunctionDefinition;
use super::{div_opt, mul_opt, neg};
use crate::Expr;
use num_complex::Complex64;

fn one_minus_square(u: &Expr) -> Expr {
    Expr::sub_expr(Expr::number(1.0), Expr::square(u.clone()))
}

/// Return all function definitions for populating the registry
pub(crate) fn all_definitions() -> Vec<FunctionDefinition> {
    vec![
        // Trigonometric
        FunctionDefinition {
            name: "sin",
            aliases: &[],
            eval: |z| z.sin(),
            // d/dx sin(u) = cos(u) * u'
            derivative: |u, u_prime| mul_opt(Expr::func("cos", u.clone()), u_prime),
        },
        FunctionDefinition {
            name: "cos",
            aliases: &[],
            eval: |z| z.cos(),
            // d/dx cos(u) = -sin(u) * u'
            derivative: |u, u_prime| mul_opt(neg(Expr::func("sin", u.clone())), u_prime),
        },
        FunctionDefinition {
            name: "tan",
            aliases: &[],
            eval: |z| z.tan(),
            // d/dx tan(u) = u' / cos(u)^2
            derivative: |u, u_prime| div_opt(u_prime, Expr::square(Expr::func("cos", u.clone()))),
        },
        // Inverse trigonometric
        FunctionDefinition {
            name: "asin",
            aliases: &["arcsin"],
            eval: |z| z.asin(),
            // d/dx asin(u) = u' / sqrt(1 - u^2)
            derivative: |u, u_prime| div_opt(u_prime, Expr::func("sqrt", one_minus_square(u))),
        },
        FunctionDefinition {
            name: "acos",
            aliases: &["arccos"],
            eval: |z| z.acos(),
            // d/dx acos(u) = -u' / sqrt(1 - u^2)
            derivative: |u, u_prime| {
                neg(div_opt(u_prime, Expr::func("sqrt", one_minus_square(u))))
            },
        },
        FunctionDefinition {
            name: "atan",
            aliases: &["arctan"],
            eval: |z| z.atan(),
            // d/dx atan(u) = u' / (1 + u^2)
            derivative: |u, u_prime| {
                div_opt(
                    u_prime,
                    Expr::add_expr(Expr::number(1.0), Expr::square(u.clone())),
                )
            },
        },
        // Hyperbolic
        FunctionDefinition {
            name: "sinh",
            aliases: &[],
            eval: |z| z.sinh(),
            derivative: |u, u_prime| mul_opt(Expr::func("cosh", u.clone()), u_prime),
        },
        FunctionDefinition {
            name: "cosh",
            aliases: &[],
            eval: |z| z.cosh(),
            derivative: |u, u_prime| mul_opt(Expr::func("sinh", u.clone()), u_prime),
        },
        FunctionDefinition {
            name: "tanh",
            aliases: &[],
            eval: |z| z.tanh(),
            // d/dx tanh(u) = u' / cosh(u)^2
            derivative: |u, u_prime| {
                div_opt(u_prime, Expr::square(Expr::func("cosh", u.clone())))
            },
        },
        FunctionDefinition {
            name: "asinh",
            aliases: &["arcsinh"],
            eval: |z| z.asinh(),
            // d/dx asinh(u) = u' / sqrt(u^2 + 1)
            derivative: |u, u_prime| {
                div_opt(
                    u_prime,
                    Expr::func(
                        "sqrt",
                        Expr::add_expr(Expr::square(u.clone()), Expr::number(1.0)),
                    ),
                )
            },
        },
        FunctionDefinition {
            name: "acosh",
            aliases: &["arccosh"],
            eval: |z| z.acosh(),
            // d/dx acosh(u) = u' / sqrt(u^2 - 1)
            derivative: |u, u_prime| {
                div_opt(
                    u_prime,
                    Expr::func(
                        "sqrt",
                        Expr::sub_expr(Expr::square(u.clone()), Expr::number(1.0)),
                    ),
                )
            },
        },
        FunctionDefinition {
            name: "atanh",
            aliases: &["arctanh"],
            eval: |z| z.atanh(),
            // d/dx atanh(u) = u' / (1 - u^2)
            derivative: |u, u_prime| div_opt(u_prime, one_minus_square(u)),
        },
        // Exponential and logarithms
        FunctionDefinition {
            name: "exp",
            aliases: &[],
            eval: |z| z.exp(),
            derivative: |u, u_prime| mul_opt(Expr::func("exp", u.clone()), u_prime),
        },
        FunctionDefinition {
            // `log` is the natural logarithm, as in most CAS front-ends
            name: "ln",
            aliases: &["log"],
            eval: |z| z.ln(),
            // d/dx ln(u) = u' / u
            derivative: |u, u_prime| div_opt(u_prime, u.clone()),
        },
        FunctionDefinition {
            name: "log10",
            aliases: &[],
            eval: |z| z.log10(),
            // d/dx log10(u) = u' / (u * ln(10))
            derivative: |u, u_prime| {
                div_opt(
                    u_prime,
                    Expr::mul_expr(u.clone(), Expr::func("ln", Expr::number(10.0))),
                )
            },
        },
        // Roots and absolute value
        FunctionDefinition {
            name: "sqrt",
            aliases: &[],
            eval: |z| z.sqrt(),
            // d/dx sqrt(u) = u' / (2 * sqrt(u))
            derivative: |u, u_prime| {
                div_opt(
                    u_prime,
                    Expr::mul_expr(Expr::number(2.0), Expr::func("sqrt", u.clone())),
                )
            },
        },
        FunctionDefinition {
            name: "abs",
            aliases: &[],
            eval: |z| Complex64::new(z.norm(), 0.0),
            // d/dx |u| = u * u' / |u|
            derivative: |u, u_prime| {
                div_opt(
                    mul_opt(u.clone(), u_prime),
                    Expr::func("abs", u.clone()),
                )
            },
        },
    ]
}
