//! Rewrite rules applied by the simplification engine
//!
//! Priority ranges:
//! - 100-199: numeric identities and constant folding
//! - 50-99: cancellation and sign normalization
//! - 1-49: presentation (coefficient order, `x*x -> x^2`)

use crate::traits::as_small_integer;
use crate::{Expr, ExprKind};
use std::sync::OnceLock;

/// Expression kind for fast rule filtering
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub(crate) enum NodeKind {
    Number,
    Symbol,
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    Function,
}

impl NodeKind {
    #[inline]
    pub(crate) fn of(expr: &Expr) -> Self {
        match &expr.kind {
            ExprKind::Number(_) => NodeKind::Number,
            ExprKind::Symbol(_) => NodeKind::Symbol,
            ExprKind::Add(_, _) => NodeKind::Add,
            ExprKind::Sub(_, _) => NodeKind::Sub,
            ExprKind::Mul(_, _) => NodeKind::Mul,
            ExprKind::Div(_, _) => NodeKind::Div,
            ExprKind::Pow(_, _) => NodeKind::Pow,
            ExprKind::FunctionCall { .. } => NodeKind::Function,
        }
    }
}

/// Core trait for all simplification rules
pub(crate) trait Rule: Send + Sync {
    fn name(&self) -> &'static str;
    fn priority(&self) -> i32;

    /// Rules are only tried on nodes of these kinds
    fn applies_to(&self) -> &'static [NodeKind];

    fn apply(&self, expr: &Expr) -> Option<Expr>;
}

/// All rules, highest priority first
pub(crate) fn all_rules() -> &'static [Box<dyn Rule>] {
    static RULES: OnceLock<Vec<Box<dyn Rule>>> = OnceLock::new();
    RULES.get_or_init(|| {
        let mut rules: Vec<Box<dyn Rule>> = vec![
            Box::new(AddZeroRule),
            Box::new(SubZeroRule),
            Box::new(MulZeroRule),
            Box::new(MulOneRule),
            Box::new(DivOneRule),
            Box::new(PowZeroOneRule),
            Box::new(ConstantFoldRule),
            Box::new(SubSelfRule),
            Box::new(DivSelfRule),
            Box::new(NestedCoefficientRule),
            Box::new(EvenPowerOfNegationRule),
            Box::new(AddNegativeRule),
            Box::new(SubNegativeRule),
            Box::new(DivByReciprocalRule),
            Box::new(CoefficientFirstRule),
            Box::new(MulSelfRule),
        ];
        rules.sort_by_key(|r| std::cmp::Reverse(r.priority()));
        rules
    })
}

/// `n * x` with `n` a number
fn split_coefficient(expr: &Expr) -> Option<(f64, &Expr)> {
    if let ExprKind::Mul(a, b) = &expr.kind
        && let Some(n) = a.as_number()
    {
        return Some((n, b));
    }
    None
}

fn scaled(n: f64, expr: &Expr) -> Expr {
    if n == 1.0 {
        expr.clone()
    } else {
        Expr::mul_expr(Expr::number(n), expr.clone())
    }
}

// ===== Numeric identities =====

/// x + 0 = x, 0 + x = x
struct AddZeroRule;

impl Rule for AddZeroRule {
    fn name(&self) -> &'static str {
        "add_zero"
    }

    fn priority(&self) -> i32 {
        190
    }

    fn applies_to(&self) -> &'static [NodeKind] {
        &[NodeKind::Add]
    }

    fn apply(&self, expr: &Expr) -> Option<Expr> {
        if let ExprKind::Add(u, v) = &expr.kind {
            if u.is_zero_num() {
                return Some((**v).clone());
            }
            if v.is_zero_num() {
                return Some((**u).clone());
            }
        }
        None
    }
}

/// x - 0 = x, 0 - x = -x
struct SubZeroRule;

impl Rule for SubZeroRule {
    fn name(&self) -> &'static str {
        "sub_zero"
    }

    fn priority(&self) -> i32 {
        190
    }

    fn applies_to(&self) -> &'static [NodeKind] {
        &[NodeKind::Sub]
    }

    fn apply(&self, expr: &Expr) -> Option<Expr> {
        if let ExprKind::Sub(u, v) = &expr.kind {
            if v.is_zero_num() {
                return Some((**u).clone());
            }
            if u.is_zero_num() {
                return Some(Expr::neg((**v).clone()));
            }
        }
        None
    }
}

/// 0 * x = 0, x * 0 = 0, 0 / x = 0
struct MulZeroRule;

impl Rule for MulZeroRule {
    fn name(&self) -> &'static str {
        "mul_zero"
    }

    fn priority(&self) -> i32 {
        180
    }

    fn applies_to(&self) -> &'static [NodeKind] {
        &[NodeKind::Mul, NodeKind::Div]
    }

    fn apply(&self, expr: &Expr) -> Option<Expr> {
        match &expr.kind {
            ExprKind::Mul(u, v) if u.is_zero_num() || v.is_zero_num() => Some(Expr::number(0.0)),
            // 0/0 is left for the evaluator to report
            ExprKind::Div(u, v) if u.is_zero_num() && !v.is_zero_num() => Some(Expr::number(0.0)),
            _ => None,
        }
    }
}

/// 1 * x = x, x * 1 = x
struct MulOneRule;

impl Rule for MulOneRule {
    fn name(&self) -> &'static str {
        "mul_one"
    }

    fn priority(&self) -> i32 {
        180
    }

    fn applies_to(&self) -> &'static [NodeKind] {
        &[NodeKind::Mul]
    }

    fn apply(&self, expr: &Expr) -> Option<Expr> {
        if let ExprKind::Mul(u, v) = &expr.kind {
            if u.is_one_num() {
                return Some((**v).clone());
            }
            if v.is_one_num() {
                return Some((**u).clone());
            }
        }
        None
    }
}

/// x / 1 = x
struct DivOneRule;

impl Rule for DivOneRule {
    fn name(&self) -> &'static str {
        "div_one"
    }

    fn priority(&self) -> i32 {
        180
    }

    fn applies_to(&self) -> &'static [NodeKind] {
        &[NodeKind::Div]
    }

    fn apply(&self, expr: &Expr) -> Option<Expr> {
        if let ExprKind::Div(u, v) = &expr.kind
            && v.is_one_num()
        {
            return Some((**u).clone());
        }
        None
    }
}

/// x^0 = 1, x^1 = x, 1^x = 1
struct PowZeroOneRule;

impl Rule for PowZeroOneRule {
    fn name(&self) -> &'static str {
        "pow_zero_one"
    }

    fn priority(&self) -> i32 {
        170
    }

    fn applies_to(&self) -> &'static [NodeKind] {
        &[NodeKind::Pow]
    }

    fn apply(&self, expr: &Expr) -> Option<Expr> {
        if let ExprKind::Pow(base, exp) = &expr.kind {
            if exp.is_zero_num() || base.is_one_num() {
                return Some(Expr::number(1.0));
            }
            if exp.is_one_num() {
                return Some((**base).clone());
            }
        }
        None
    }
}

/// Fold arithmetic on two numbers when the result is a finite real
struct ConstantFoldRule;

impl Rule for ConstantFoldRule {
    fn name(&self) -> &'static str {
        "constant_fold"
    }

    fn priority(&self) -> i32 {
        160
    }

    fn applies_to(&self) -> &'static [NodeKind] {
        &[
            NodeKind::Add,
            NodeKind::Sub,
            NodeKind::Mul,
            NodeKind::Div,
            NodeKind::Pow,
        ]
    }

    fn apply(&self, expr: &Expr) -> Option<Expr> {
        let result = match &expr.kind {
            ExprKind::Add(u, v) => u.as_number()? + v.as_number()?,
            ExprKind::Sub(u, v) => u.as_number()? - v.as_number()?,
            ExprKind::Mul(u, v) => u.as_number()? * v.as_number()?,
            ExprKind::Div(u, v) => {
                let (a, b) = (u.as_number()?, v.as_number()?);
                // Keep exact fractions like 1/2 and 1/3 symbolic
                let q = a / b;
                if b == 0.0 || q.fract() != 0.0 {
                    return None;
                }
                q
            }
            ExprKind::Pow(u, v) => {
                let (base, exp) = (u.as_number()?, v.as_number()?);
                match as_small_integer(exp) {
                    Some(n) if n >= 0 => base.powi(n),
                    _ if base > 0.0 => {
                        let r = base.powf(exp);
                        // Irrational powers such as 2^0.5 stay symbolic
                        if r.fract() != 0.0 {
                            return None;
                        }
                        r
                    }
                    _ => return None,
                }
            }
            _ => return None,
        };
        result.is_finite().then(|| Expr::number(result))
    }
}

// ===== Cancellation and signs =====

/// x - x = 0
struct SubSelfRule;

impl Rule for SubSelfRule {
    fn name(&self) -> &'static str {
        "sub_self"
    }

    fn priority(&self) -> i32 {
        90
    }

    fn applies_to(&self) -> &'static [NodeKind] {
        &[NodeKind::Sub]
    }

    fn apply(&self, expr: &Expr) -> Option<Expr> {
        if let ExprKind::Sub(u, v) = &expr.kind
            && u == v
        {
            return Some(Expr::number(0.0));
        }
        None
    }
}

/// x / x = 1
struct DivSelfRule;

impl Rule for DivSelfRule {
    fn name(&self) -> &'static str {
        "div_self"
    }

    fn priority(&self) -> i32 {
        90
    }

    fn applies_to(&self) -> &'static [NodeKind] {
        &[NodeKind::Div]
    }

    fn apply(&self, expr: &Expr) -> Option<Expr> {
        if let ExprKind::Div(u, v) = &expr.kind
            && u == v
            && !u.is_zero_num()
        {
            return Some(Expr::number(1.0));
        }
        None
    }
}

/// a * (b * x) = (a*b) * x for numbers a, b
struct NestedCoefficientRule;

impl Rule for NestedCoefficientRule {
    fn name(&self) -> &'static str {
        "nested_coefficient"
    }

    fn priority(&self) -> i32 {
        80
    }

    fn applies_to(&self) -> &'static [NodeKind] {
        &[NodeKind::Mul]
    }

    fn apply(&self, expr: &Expr) -> Option<Expr> {
        if let ExprKind::Mul(a, rest) = &expr.kind
            && let Some(a) = a.as_number()
            && let Some((b, x)) = split_coefficient(rest)
        {
            return Some(scaled(a * b, x));
        }
        None
    }
}

/// (-x)^n = x^n for even n
struct EvenPowerOfNegationRule;

impl Rule for EvenPowerOfNegationRule {
    fn name(&self) -> &'static str {
        "even_power_of_negation"
    }

    fn priority(&self) -> i32 {
        75
    }

    fn applies_to(&self) -> &'static [NodeKind] {
        &[NodeKind::Pow]
    }

    fn apply(&self, expr: &Expr) -> Option<Expr> {
        if let ExprKind::Pow(base, exp) = &expr.kind
            && let Some(n) = exp.as_number().and_then(as_small_integer)
            && n % 2 == 0
            && let Some((c, x)) = split_coefficient(base)
            && c < 0.0
        {
            return Some(Expr::pow(scaled(-c, x), (**exp).clone()));
        }
        None
    }
}

/// a + (-n)*b = a - n*b
struct AddNegativeRule;

impl Rule for AddNegativeRule {
    fn name(&self) -> &'static str {
        "add_negative"
    }

    fn priority(&self) -> i32 {
        60
    }

    fn applies_to(&self) -> &'static [NodeKind] {
        &[NodeKind::Add]
    }

    fn apply(&self, expr: &Expr) -> Option<Expr> {
        if let ExprKind::Add(a, b) = &expr.kind {
            if let Some((c, x)) = split_coefficient(b)
                && c < 0.0
            {
                return Some(Expr::sub_expr((**a).clone(), scaled(-c, x)));
            }
            if let Some(n) = b.as_number()
                && n < 0.0
            {
                return Some(Expr::sub_expr((**a).clone(), Expr::number(-n)));
            }
        }
        None
    }
}

/// a - (-n)*b = a + n*b
struct SubNegativeRule;

impl Rule for SubNegativeRule {
    fn name(&self) -> &'static str {
        "sub_negative"
    }

    fn priority(&self) -> i32 {
        60
    }

    fn applies_to(&self) -> &'static [NodeKind] {
        &[NodeKind::Sub]
    }

    fn apply(&self, expr: &Expr) -> Option<Expr> {
        if let ExprKind::Sub(a, b) = &expr.kind
            && let Some((c, x)) = split_coefficient(b)
            && c < 0.0
        {
            return Some(Expr::add_expr((**a).clone(), scaled(-c, x)));
        }
        None
    }
}

/// a * (1/b) = a/b, (1/b) * a = a/b
struct DivByReciprocalRule;

impl Rule for DivByReciprocalRule {
    fn name(&self) -> &'static str {
        "div_by_reciprocal"
    }

    fn priority(&self) -> i32 {
        55
    }

    fn applies_to(&self) -> &'static [NodeKind] {
        &[NodeKind::Mul]
    }

    fn apply(&self, expr: &Expr) -> Option<Expr> {
        if let ExprKind::Mul(a, b) = &expr.kind {
            if let ExprKind::Div(num, den) = &b.kind
                && num.is_one_num()
            {
                return Some(Expr::div_expr((**a).clone(), (**den).clone()));
            }
            if let ExprKind::Div(num, den) = &a.kind
                && num.is_one_num()
            {
                return Some(Expr::div_expr((**b).clone(), (**den).clone()));
            }
        }
        None
    }
}

// ===== Presentation =====

/// x * n = n * x, and x * (n * y) = n * (x * y)
struct CoefficientFirstRule;

impl Rule for CoefficientFirstRule {
    fn name(&self) -> &'static str {
        "coefficient_first"
    }

    fn priority(&self) -> i32 {
        30
    }

    fn applies_to(&self) -> &'static [NodeKind] {
        &[NodeKind::Mul]
    }

    fn apply(&self, expr: &Expr) -> Option<Expr> {
        if let ExprKind::Mul(a, b) = &expr.kind
            && a.as_number().is_none()
        {
            if let Some(n) = b.as_number() {
                return Some(Expr::mul_expr(Expr::number(n), (**a).clone()));
            }
            if let Some((n, y)) = split_coefficient(b) {
                return Some(Expr::mul_expr(
                    Expr::number(n),
                    Expr::mul_expr((**a).clone(), y.clone()),
                ));
            }
        }
        None
    }
}

/// x * x = x^2
struct MulSelfRule;

impl Rule for MulSelfRule {
    fn name(&self) -> &'static str {
        "mul_self"
    }

    fn priority(&self) -> i32 {
        20
    }

    fn applies_to(&self) -> &'static [NodeKind] {
        &[NodeKind::Mul]
    }

    fn apply(&self, expr: &Expr) -> Option<Expr> {
        if let ExprKind::Mul(a, b) = &expr.kind
            && a == b
            && a.as_number().is_none()
        {
            return Some(Expr::square((**a).clone()));
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn x() -> Expr {
        Expr::symbol("x")
    }

    #[test]
    fn test_rules_are_ordered_by_priority() {
        let priorities: Vec<i32> = all_rules().iter().map(|r| r.priority()).collect();
        assert!(priorities.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn test_constant_fold_keeps_fractions() {
        let rule = ConstantFoldRule;
        assert_eq!(rule.apply(&(Expr::number(6.0) / 3.0)), Some(Expr::number(2.0)));
        assert_eq!(rule.apply(&(Expr::number(1.0) / 3.0)), None);
        assert_eq!(rule.apply(&(Expr::number(1.0) / 0.0)), None);
        assert_eq!(
            rule.apply(&Expr::pow(Expr::number(2.0), Expr::number(0.5))),
            None
        );
        assert_eq!(
            rule.apply(&Expr::pow(Expr::number(4.0), Expr::number(0.5))),
            Some(Expr::number(2.0))
        );
    }

    #[test]
    fn test_tiny_coefficients_are_not_pruned() {
        let tiny = Expr::number(6.67e-11);
        assert_eq!(MulZeroRule.apply(&(tiny.clone() * x())), None);
        assert_eq!(AddZeroRule.apply(&(tiny.clone() + x())), None);
        assert_eq!(MulOneRule.apply(&(Expr::number(1.0 + 1e-12) * x())), None);

        // Folding a tiny quotient keeps it instead of rounding to zero
        let rule = ConstantFoldRule;
        assert_eq!(rule.apply(&(Expr::number(1e-12) / 3.0)), None);
        assert_eq!(
            rule.apply(&(Expr::number(3e-12) / 1.5)),
            None,
            "non-integral quotients stay symbolic"
        );
        assert_eq!(
            rule.apply(&Expr::pow(Expr::number(1e-20), Expr::number(0.5))),
            None
        );
    }

    #[test]
    fn test_even_power_drops_sign() {
        let expr = Expr::square(Expr::neg(x()));
        assert_eq!(EvenPowerOfNegationRule.apply(&expr), Some(Expr::square(x())));
    }

    #[test]
    fn test_add_negative() {
        let expr = Expr::symbol("a") + Expr::neg(x());
        assert_eq!(AddNegativeRule.apply(&expr), Some(Expr::symbol("a") - x()));
    }

    #[test]
    fn test_coefficient_first() {
        let expr = x() * 2.0;
        assert_eq!(CoefficientFirstRule.apply(&expr), Some(Expr::number(2.0) * x()));
    }
}
