//! Core simplification engine with rule-based architecture
//!
//! Implements bottom-up tree traversal and repeated rule application until the
//! expression stops changing or a limit is hit.

use super::rules::{NodeKind, all_rules};
use crate::{Expr, ExprKind};

/// Rewrites tried on a single node before moving up the tree
const MAX_REWRITES_PER_NODE: usize = 64;

/// Main simplification engine
pub(crate) struct Simplifier {
    max_iterations: usize,
    max_depth: usize,
}

impl Simplifier {
    pub fn new() -> Self {
        Self {
            max_iterations: 100,
            max_depth: crate::DEFAULT_MAX_DEPTH * 2,
        }
    }

    #[cfg(test)]
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Main simplification entry point
    pub fn simplify(&self, expr: Expr) -> Expr {
        let mut current = expr;

        for iteration in 0..self.max_iterations {
            let next = self.apply_rules_bottom_up(&current, 0);
            if next == current {
                log::trace!("simplification converged after {} passes", iteration + 1);
                return next;
            }
            current = next;
        }

        log::warn!(
            "simplification stopped after {} passes without converging",
            self.max_iterations
        );
        current
    }

    /// Apply rules bottom-up through the expression tree
    fn apply_rules_bottom_up(&self, expr: &Expr, depth: usize) -> Expr {
        if depth > self.max_depth {
            return expr.clone();
        }

        let rebuilt = match &expr.kind {
            ExprKind::Number(_) | ExprKind::Symbol(_) => expr.clone(),
            ExprKind::FunctionCall { name, args } => Expr::func_multi(
                name.clone(),
                args.iter()
                    .map(|a| self.apply_rules_bottom_up(a, depth + 1))
                    .collect(),
            ),
            ExprKind::Add(u, v) => Expr::add_expr(
                self.apply_rules_bottom_up(u, depth + 1),
                self.apply_rules_bottom_up(v, depth + 1),
            ),
            ExprKind::Sub(u, v) => Expr::sub_expr(
                self.apply_rules_bottom_up(u, depth + 1),
                self.apply_rules_bottom_up(v, depth + 1),
            ),
            ExprKind::Mul(u, v) => Expr::mul_expr(
                self.apply_rules_bottom_up(u, depth + 1),
                self.apply_rules_bottom_up(v, depth + 1),
            ),
            ExprKind::Div(u, v) => Expr::div_expr(
                self.apply_rules_bottom_up(u, depth + 1),
                self.apply_rules_bottom_up(v, depth + 1),
            ),
            ExprKind::Pow(u, v) => Expr::pow(
                self.apply_rules_bottom_up(u, depth + 1),
                self.apply_rules_bottom_up(v, depth + 1),
            ),
        };

        self.apply_rules_to_node(rebuilt)
    }

    /// Apply the first matching rule, repeatedly, to one node
    fn apply_rules_to_node(&self, mut expr: Expr) -> Expr {
        for _ in 0..MAX_REWRITES_PER_NODE {
            let kind = NodeKind::of(&expr);
            let rewrite = all_rules()
                .iter()
                .filter(|rule| rule.applies_to().contains(&kind))
                .find_map(|rule| rule.apply(&expr).map(|new| (rule.name(), new)));

            match rewrite {
                Some((name, new)) => {
                    log::trace!("rule {}: {} => {}", name, expr, new);
                    expr = new;
                }
                None => break,
            }
        }
        expr
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identities_collapse() {
        // (0 + x) * 1 - 0
        let expr = (Expr::number(0.0) + Expr::symbol("x")) * 1.0 - 0.0;
        assert_eq!(Simplifier::new().simplify(expr), Expr::symbol("x"));
    }

    #[test]
    fn test_iteration_limit_is_respected() {
        let expr = Expr::number(1.0) + 2.0;
        let result = Simplifier::new().with_max_iterations(0).simplify(expr.clone());
        assert_eq!(result, expr);
    }
}
