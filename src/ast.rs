//! Abstract Syntax Tree for mathematical expressions

use std::ops::Deref;
use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};

/// Immutable symbolic expression
///
/// Subtrees are shared through `Arc`, so cloning is cheap and every
/// transformation (differentiation, substitution, simplification) builds a new
/// tree instead of mutating an existing one.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
}

impl Deref for Expr {
    type Target = ExprKind;

    fn deref(&self) -> &Self::Target {
        &self.kind
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// Constant number (e.g., 3.14, 1e10)
    Number(f64),

    /// Variable, constant or uncertainty symbol (e.g., "x", "G", "Δx")
    Symbol(String),

    /// Built-in function call (e.g., sqrt(x))
    FunctionCall { name: String, args: Vec<Expr> },

    // Binary operations
    Add(Arc<Expr>, Arc<Expr>),
    Sub(Arc<Expr>, Arc<Expr>),
    Mul(Arc<Expr>, Arc<Expr>),
    Div(Arc<Expr>, Arc<Expr>),
    Pow(Arc<Expr>, Arc<Expr>),
}

impl Expr {
    pub fn new(kind: ExprKind) -> Self {
        Expr { kind }
    }

    // Accessor methods

    /// Check if expression is a constant number and return its value
    pub fn as_number(&self) -> Option<f64> {
        match &self.kind {
            ExprKind::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Symbol name, if this is a bare symbol
    pub fn as_symbol(&self) -> Option<&str> {
        match &self.kind {
            ExprKind::Symbol(s) => Some(s),
            _ => None,
        }
    }

    /// Check if this expression is exactly the number zero
    ///
    /// Comparisons are exact: a coefficient such as `6.67e-11` is a real
    /// factor and must never be pruned as zero.
    #[inline]
    pub fn is_zero_num(&self) -> bool {
        self.as_number() == Some(0.0)
    }

    /// Check if this expression is exactly the number one
    #[inline]
    pub fn is_one_num(&self) -> bool {
        self.as_number() == Some(1.0)
    }

    /// Check if this expression is exactly the number negative one
    #[inline]
    pub fn is_neg_one_num(&self) -> bool {
        self.as_number() == Some(-1.0)
    }

    // Convenience constructors

    pub fn number(n: f64) -> Self {
        Expr::new(ExprKind::Number(n))
    }

    pub fn symbol(s: impl Into<String>) -> Self {
        Expr::new(ExprKind::Symbol(s.into()))
    }

    pub fn add_expr(left: Expr, right: Expr) -> Self {
        Expr::new(ExprKind::Add(Arc::new(left), Arc::new(right)))
    }

    pub fn sub_expr(left: Expr, right: Expr) -> Self {
        Expr::new(ExprKind::Sub(Arc::new(left), Arc::new(right)))
    }

    pub fn mul_expr(left: Expr, right: Expr) -> Self {
        Expr::new(ExprKind::Mul(Arc::new(left), Arc::new(right)))
    }

    pub fn div_expr(left: Expr, right: Expr) -> Self {
        Expr::new(ExprKind::Div(Arc::new(left), Arc::new(right)))
    }

    pub fn pow(base: Expr, exponent: Expr) -> Self {
        Expr::new(ExprKind::Pow(Arc::new(base), Arc::new(exponent)))
    }

    /// `-e`, represented as `-1 * e`
    pub fn neg(e: Expr) -> Self {
        Expr::mul_expr(Expr::number(-1.0), e)
    }

    /// `e^2`
    pub fn square(e: Expr) -> Self {
        Expr::pow(e, Expr::number(2.0))
    }

    /// Create a single-argument function call expression
    pub fn func(name: impl Into<String>, content: Expr) -> Self {
        Expr::new(ExprKind::FunctionCall {
            name: name.into(),
            args: vec![content],
        })
    }

    /// Create a function call expression from already parsed arguments
    pub fn func_multi(name: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::new(ExprKind::FunctionCall {
            name: name.into(),
            args,
        })
    }

    /// Sum a list of terms left to right; an empty list sums to 0
    pub fn sum(terms: impl IntoIterator<Item = Expr>) -> Self {
        terms
            .into_iter()
            .reduce(Expr::add_expr)
            .unwrap_or_else(|| Expr::number(0.0))
    }

    // Analysis methods

    /// Count the total number of nodes in the AST
    pub fn node_count(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            count += 1;
            stack.extend(node.children());
        }
        count
    }

    /// Get the maximum nesting depth of the AST
    ///
    /// Walks the tree with an explicit stack, so long operator chains such as
    /// `x + x + ... + x` are measured without deep recursion.
    pub fn max_depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack = vec![(self, 1)];
        while let Some((node, depth)) = stack.pop() {
            deepest = deepest.max(depth);
            stack.extend(node.children().into_iter().map(|child| (child, depth + 1)));
        }
        deepest
    }

    /// Direct subexpressions, left to right
    fn children(&self) -> Vec<&Expr> {
        match &self.kind {
            ExprKind::Number(_) | ExprKind::Symbol(_) => Vec::new(),
            ExprKind::FunctionCall { args, .. } => args.iter().collect(),
            ExprKind::Add(l, r)
            | ExprKind::Sub(l, r)
            | ExprKind::Mul(l, r)
            | ExprKind::Div(l, r)
            | ExprKind::Pow(l, r) => vec![&**l, &**r],
        }
    }

    /// Check if the expression contains a specific symbol
    pub fn contains_var(&self, var: &str) -> bool {
        match &self.kind {
            ExprKind::Number(_) => false,
            ExprKind::Symbol(s) => s == var,
            ExprKind::FunctionCall { args, .. } => args.iter().any(|a| a.contains_var(var)),
            ExprKind::Add(l, r)
            | ExprKind::Sub(l, r)
            | ExprKind::Mul(l, r)
            | ExprKind::Div(l, r)
            | ExprKind::Pow(l, r) => l.contains_var(var) || r.contains_var(var),
        }
    }

    /// Collect all symbol names in the expression
    pub fn symbols(&self) -> FxHashSet<String> {
        let mut vars = FxHashSet::default();
        self.collect_symbols(&mut vars);
        vars
    }

    fn collect_symbols(&self, vars: &mut FxHashSet<String>) {
        match &self.kind {
            ExprKind::Symbol(s) => {
                vars.insert(s.clone());
            }
            ExprKind::FunctionCall { args, .. } => {
                for arg in args {
                    arg.collect_symbols(vars);
                }
            }
            ExprKind::Add(l, r)
            | ExprKind::Sub(l, r)
            | ExprKind::Mul(l, r)
            | ExprKind::Div(l, r)
            | ExprKind::Pow(l, r) => {
                l.collect_symbols(vars);
                r.collect_symbols(vars);
            }
            ExprKind::Number(_) => {}
        }
    }

    /// Substitute every symbol found in `bindings` by its number
    ///
    /// Symbols without a binding are left in place, so the result may still
    /// be symbolic.
    pub fn substitute_all(&self, bindings: &FxHashMap<String, f64>) -> Expr {
        match &self.kind {
            ExprKind::Symbol(s) => match bindings.get(s) {
                Some(value) => Expr::number(*value),
                None => self.clone(),
            },
            ExprKind::Number(_) => self.clone(),
            ExprKind::FunctionCall { name, args } => Expr::func_multi(
                name.clone(),
                args.iter().map(|a| a.substitute_all(bindings)).collect(),
            ),
            ExprKind::Add(a, b) => {
                Expr::add_expr(a.substitute_all(bindings), b.substitute_all(bindings))
            }
            ExprKind::Sub(a, b) => {
                Expr::sub_expr(a.substitute_all(bindings), b.substitute_all(bindings))
            }
            ExprKind::Mul(a, b) => {
                Expr::mul_expr(a.substitute_all(bindings), b.substitute_all(bindings))
            }
            ExprKind::Div(a, b) => {
                Expr::div_expr(a.substitute_all(bindings), b.substitute_all(bindings))
            }
            ExprKind::Pow(a, b) => {
                Expr::pow(a.substitute_all(bindings), b.substitute_all(bindings))
            }
        }
    }

    /// Simplify this expression (convenience wrapper)
    pub fn simplified(&self) -> Expr {
        crate::simplification::simplify(self.clone())
    }
}

// Operator overloading for building expressions in code and tests

impl From<f64> for Expr {
    fn from(n: f64) -> Self {
        Expr::number(n)
    }
}

impl From<&str> for Expr {
    fn from(s: &str) -> Self {
        Expr::symbol(s)
    }
}

macro_rules! impl_binary_op {
    ($trait:ident, $method:ident, $ctor:ident) => {
        impl<R: Into<Expr>> std::ops::$trait<R> for Expr {
            type Output = Expr;

            fn $method(self, rhs: R) -> Expr {
                Expr::$ctor(self, rhs.into())
            }
        }
    };
}

impl_binary_op!(Add, add, add_expr);
impl_binary_op!(Sub, sub, sub_expr);
impl_binary_op!(Mul, mul, mul_expr);
impl_binary_op!(Div, div, div_expr);

impl std::ops::Neg for Expr {
    type Output = Expr;

    fn neg(self) -> Expr {
        Expr::neg(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors() {
        let val = 314.0 / 100.0;
        let num = Expr::number(val);
        match &num.kind {
            ExprKind::Number(n) => assert_eq!(*n, val),
            _ => panic!("Expected Number variant"),
        }

        let sym = Expr::symbol("x");
        assert_eq!(sym.as_symbol(), Some("x"));

        let add = Expr::add_expr(Expr::number(1.0), Expr::number(2.0));
        assert!(matches!(add.kind, ExprKind::Add(_, _)));
    }

    #[test]
    fn test_node_count() {
        let x_plus_1 = Expr::symbol("x") + 1.0;
        assert_eq!(x_plus_1.node_count(), 3);

        let complex = (Expr::symbol("x") + 1.0) * Expr::symbol("y");
        assert_eq!(complex.node_count(), 5);
    }

    #[test]
    fn test_max_depth() {
        let nested = Expr::symbol("x") * Expr::symbol("y") + 1.0;
        assert_eq!(nested.max_depth(), 3);
    }

    #[test]
    fn test_symbols_and_contains() {
        let expr = Expr::func("sin", Expr::symbol("x")) * Expr::symbol("y") + 1.0;
        assert!(expr.contains_var("x"));
        assert!(!expr.contains_var("z"));

        let symbols = expr.symbols();
        assert_eq!(symbols.len(), 2);
        assert!(symbols.contains("y"));
    }

    #[test]
    fn test_substitute_all() {
        let expr = Expr::symbol("x") * Expr::symbol("y");
        let mut bindings = FxHashMap::default();
        bindings.insert("y".to_string(), 2.0);
        let partial = expr.substitute_all(&bindings);
        assert_eq!(partial, Expr::symbol("x") * 2.0);
    }

    #[test]
    fn test_sum_of_nothing_is_zero() {
        assert_eq!(Expr::sum(Vec::new()), Expr::number(0.0));
        assert_eq!(
            Expr::sum(vec![Expr::symbol("a"), Expr::symbol("b")]),
            Expr::symbol("a") + Expr::symbol("b")
        );
    }
}
