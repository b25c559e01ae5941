//! Centralized mathematical function registry
//!
//! This module is the single source of truth for the functions the parser
//! accepts, how they evaluate, and how they differentiate.

use crate::{Expr, ExprKind};

pub(crate) mod definitions;
pub(crate) mod registry;

// ===== Helper functions for building derivative expressions =====

/// Multiply, optimizing for common cases (0 and 1)
pub(crate) fn mul_opt(a: Expr, b: Expr) -> Expr {
    match (&a.kind, &b.kind) {
        (ExprKind::Number(x), _) if *x == 0.0 => Expr::number(0.0),
        (_, ExprKind::Number(x)) if *x == 0.0 => Expr::number(0.0),
        (ExprKind::Number(x), _) if *x == 1.0 => b,
        (_, ExprKind::Number(x)) if *x == 1.0 => a,
        _ => Expr::mul_expr(a, b),
    }
}

/// `u' / d`, collapsing a unit numerator
pub(crate) fn div_opt(u_prime: Expr, d: Expr) -> Expr {
    if u_prime.is_zero_num() {
        Expr::number(0.0)
    } else {
        Expr::div_expr(u_prime, d)
    }
}

/// Negate an expression
pub(crate) fn neg(e: Expr) -> Expr {
    Expr::neg(e)
}
