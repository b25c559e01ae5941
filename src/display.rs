// Display formatting for AST
//
// Plain text (`Display`) and LaTeX share one recursive formatter. Parentheses
// are inserted from operator precedence, so `(C*R)^2` keeps its parentheses and
// `a*b + c` gets none.
use crate::{Expr, ExprKind};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FormatMode {
    Standard,
    Latex,
}

/// Binding strength of the operator at the top of `expr`
fn precedence(expr: &Expr) -> u8 {
    match &expr.kind {
        ExprKind::Add(_, _) | ExprKind::Sub(_, _) => 1,
        ExprKind::Mul(_, _) | ExprKind::Div(_, _) => 2,
        ExprKind::Number(n) if *n < 0.0 => 2,
        ExprKind::Pow(_, _) => 3,
        ExprKind::Number(_) | ExprKind::Symbol(_) | ExprKind::FunctionCall { .. } => 4,
    }
}

/// `-1 * x` → `x`
fn negated(expr: &Expr) -> Option<&Expr> {
    if let ExprKind::Mul(a, b) = &expr.kind
        && a.is_neg_one_num()
    {
        return Some(b);
    }
    None
}

fn is_negative(expr: &Expr) -> bool {
    negated(expr).is_some() || expr.as_number().is_some_and(|n| n < 0.0)
}

fn format_number(f: &mut fmt::Formatter<'_>, n: f64, mode: FormatMode) -> fmt::Result {
    if n.is_nan() {
        return write!(f, "NaN");
    }
    if n.is_infinite() {
        return match (mode, n > 0.0) {
            (FormatMode::Standard, true) => write!(f, "Infinity"),
            (FormatMode::Standard, false) => write!(f, "-Infinity"),
            (FormatMode::Latex, true) => write!(f, r"\infty"),
            (FormatMode::Latex, false) => write!(f, r"-\infty"),
        };
    }

    let abs = n.abs();
    if n.fract() == 0.0 && abs < 1e16 {
        // Display as integer if no fractional part
        return write!(f, "{}", n as i64);
    }
    if abs >= 1e16 || abs < 1e-5 {
        let sci = format!("{:e}", n);
        return match (mode, sci.split_once('e')) {
            (FormatMode::Latex, Some((mantissa, exp))) => {
                write!(f, r"{} \cdot 10^{{{}}}", mantissa, exp)
            }
            _ => write!(f, "{}", sci),
        };
    }
    write!(f, "{}", n)
}

fn format_symbol(f: &mut fmt::Formatter<'_>, name: &str, mode: FormatMode) -> fmt::Result {
    if mode == FormatMode::Standard {
        return write!(f, "{}", name);
    }

    // Uncertainty symbols: Δx → \Delta x
    if let Some(var) = name.strip_prefix('Δ') {
        write!(f, r"\Delta ")?;
        return format_symbol(f, var, mode);
    }

    let (base, subscript) = match name.split_once('_') {
        Some((base, sub)) if !base.is_empty() && !sub.is_empty() => (base, Some(sub)),
        _ => (name, None),
    };

    match greek_to_latex(base) {
        Some(greek) => write!(f, "{}", greek)?,
        None => write!(f, "{}", base)?,
    }
    if let Some(sub) = subscript {
        write!(f, "_{{{}}}", sub)?;
    }
    Ok(())
}

fn greek_to_latex(name: &str) -> Option<&'static str> {
    Some(match name {
        "alpha" => r"\alpha",
        "beta" => r"\beta",
        "gamma" => r"\gamma",
        "delta" => r"\delta",
        "epsilon" => r"\epsilon",
        "theta" => r"\theta",
        "lambda" => r"\lambda",
        "mu" => r"\mu",
        "nu" => r"\nu",
        "pi" => r"\pi",
        "rho" => r"\rho",
        "sigma" => r"\sigma",
        "tau" => r"\tau",
        "phi" => r"\phi",
        "omega" => r"\omega",
        "Gamma" => r"\Gamma",
        "Delta" => r"\Delta",
        "Theta" => r"\Theta",
        "Lambda" => r"\Lambda",
        "Phi" => r"\Phi",
        "Omega" => r"\Omega",
        _ => return None,
    })
}

fn format_wrapped(
    f: &mut fmt::Formatter<'_>,
    expr: &Expr,
    mode: FormatMode,
    wrap: bool,
) -> fmt::Result {
    if wrap {
        let (open, close) = match mode {
            FormatMode::Standard => ("(", ")"),
            FormatMode::Latex => (r"\left(", r"\right)"),
        };
        write!(f, "{}", open)?;
        format_recursive(f, expr, mode)?;
        write!(f, "{}", close)
    } else {
        format_recursive(f, expr, mode)
    }
}

/// Right operand of `-`: print `u - w` for `u + (-w)` and `u - (-w)` stays
/// parenthesized
fn format_subtrahend(f: &mut fmt::Formatter<'_>, expr: &Expr, mode: FormatMode) -> fmt::Result {
    format_wrapped(f, expr, mode, precedence(expr) <= 1 || is_negative(expr))
}

fn format_function(
    f: &mut fmt::Formatter<'_>,
    name: &str,
    args: &[Expr],
    mode: FormatMode,
) -> fmt::Result {
    if mode == FormatMode::Standard {
        write!(f, "{}(", name)?;
        for (i, arg) in args.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            format_recursive(f, arg, mode)?;
        }
        return write!(f, ")");
    }

    if let [arg] = args {
        match name {
            "sqrt" => {
                write!(f, r"\sqrt{{")?;
                format_recursive(f, arg, mode)?;
                return write!(f, "}}");
            }
            "abs" => {
                write!(f, r"\left|")?;
                format_recursive(f, arg, mode)?;
                return write!(f, r"\right|");
            }
            "exp" => {
                write!(f, "e^{{")?;
                format_recursive(f, arg, mode)?;
                return write!(f, "}}");
            }
            _ => {}
        }
    }

    let command = match name {
        "sin" | "cos" | "tan" | "sinh" | "cosh" | "tanh" | "ln" => format!(r"\{}", name),
        "asin" => r"\arcsin".to_string(),
        "acos" => r"\arccos".to_string(),
        "atan" => r"\arctan".to_string(),
        "log10" => r"\log_{10}".to_string(),
        other => format!(r"\operatorname{{{}}}", other),
    };
    write!(f, r"{}\left(", command)?;
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        format_recursive(f, arg, mode)?;
    }
    write!(f, r"\right)")
}

fn format_recursive(f: &mut fmt::Formatter<'_>, expr: &Expr, mode: FormatMode) -> fmt::Result {
    match &expr.kind {
        ExprKind::Number(n) => format_number(f, *n, mode),

        ExprKind::Symbol(s) => format_symbol(f, s, mode),

        ExprKind::FunctionCall { name, args } => format_function(f, name, args, mode),

        ExprKind::Add(u, v) => {
            format_recursive(f, u, mode)?;
            if let Some(w) = negated(v) {
                write!(f, " - ")?;
                format_subtrahend(f, w, mode)
            } else if let Some(n) = v.as_number()
                && n < 0.0
            {
                write!(f, " - ")?;
                format_number(f, -n, mode)
            } else {
                write!(f, " + ")?;
                format_recursive(f, v, mode)
            }
        }

        ExprKind::Sub(u, v) => {
            format_recursive(f, u, mode)?;
            write!(f, " - ")?;
            format_subtrahend(f, v, mode)
        }

        ExprKind::Mul(u, v) => {
            if u.is_neg_one_num() {
                write!(f, "-")?;
                return format_wrapped(f, v, mode, precedence(v) <= 1 || is_negative(v));
            }
            let sep = match mode {
                FormatMode::Standard => "*",
                FormatMode::Latex => r" \cdot ",
            };
            format_wrapped(f, u, mode, precedence(u) <= 1)?;
            write!(f, "{}", sep)?;
            format_wrapped(f, v, mode, precedence(v) <= 1 || is_negative(v))
        }

        ExprKind::Div(u, v) => match mode {
            FormatMode::Standard => {
                format_wrapped(f, u, mode, precedence(u) <= 1)?;
                write!(f, "/")?;
                // Denominator products need parentheses: 1/(2*x)
                format_wrapped(f, v, mode, precedence(v) <= 2)
            }
            FormatMode::Latex => {
                write!(f, r"\frac{{")?;
                format_recursive(f, u, mode)?;
                write!(f, "}}{{")?;
                format_recursive(f, v, mode)?;
                write!(f, "}}")
            }
        },

        ExprKind::Pow(u, v) => {
            // (C*R)^2 must not display as C*R^2
            format_wrapped(f, u, mode, precedence(u) <= 3)?;
            match mode {
                FormatMode::Standard => {
                    write!(f, "^")?;
                    format_wrapped(f, v, mode, precedence(v) <= 3)
                }
                FormatMode::Latex => {
                    write!(f, "^{{")?;
                    format_recursive(f, v, mode)?;
                    write!(f, "}}")
                }
            }
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        format_recursive(f, self, FormatMode::Standard)
    }
}

/// Wrapper whose `Display` renders an expression as LaTeX
pub struct LatexFormatter<'a> {
    expr: &'a Expr,
}

impl fmt::Display for LatexFormatter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        format_recursive(f, self.expr, FormatMode::Latex)
    }
}

impl Expr {
    /// Convert the expression to LaTeX format
    pub fn to_latex(&self) -> String {
        LatexFormatter { expr: self }.to_string()
    }

    /// LaTeX view usable directly in `format!`
    pub fn latex(&self) -> LatexFormatter<'_> {
        LatexFormatter { expr: self }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn x() -> Expr {
        Expr::symbol("x")
    }

    #[test]
    fn test_display_number() {
        assert_eq!(format!("{}", Expr::number(3.0)), "3");
        assert!(format!("{}", Expr::number(3.141)).starts_with("3.141"));
        assert_eq!(format!("{}", Expr::number(6.022e23)), "6.022e23");
        assert_eq!(format!("{}", Expr::number(1.6e-19)), "1.6e-19");
    }

    #[test]
    fn test_display_product() {
        let expr = Expr::symbol("I") * Expr::symbol("R");
        assert_eq!(expr.to_string(), "I*R");
    }

    #[test]
    fn test_display_negative_term() {
        assert_eq!(Expr::neg(x()).to_string(), "-x");
        assert_eq!(Expr::neg(Expr::func("sin", x())).to_string(), "-sin(x)");
        assert_eq!((Expr::symbol("a") + Expr::neg(x())).to_string(), "a - x");
        assert_eq!(Expr::neg(x() + 1.0).to_string(), "-(x + 1)");
    }

    #[test]
    fn test_display_power_parens() {
        let expr = Expr::square(Expr::symbol("C") * Expr::symbol("R"));
        assert_eq!(expr.to_string(), "(C*R)^2");
        let expr = Expr::pow(Expr::number(-2.0), x());
        assert_eq!(expr.to_string(), "(-2)^x");
        let expr = Expr::pow(x(), Expr::number(-1.0));
        assert_eq!(expr.to_string(), "x^(-1)");
        let expr = Expr::pow(x(), Expr::number(2.0) * Expr::symbol("y"));
        assert_eq!(expr.to_string(), "x^(2*y)");
    }

    #[test]
    fn test_display_fraction_parens() {
        assert_eq!((Expr::number(1.0) / x()).to_string(), "1/x");
        assert_eq!((Expr::number(1.0) / Expr::square(x())).to_string(), "1/x^2");
        assert_eq!(
            (Expr::number(1.0) / (Expr::number(2.0) * x())).to_string(),
            "1/(2*x)"
        );
        assert_eq!(((x() + 1.0) / x()).to_string(), "(x + 1)/x");
    }

    #[test]
    fn test_display_subtraction_grouping() {
        let expr = Expr::symbol("a") - (Expr::symbol("b") + Expr::symbol("c"));
        assert_eq!(expr.to_string(), "a - (b + c)");
    }

    #[test]
    fn test_display_error_formula() {
        let variance = Expr::square(Expr::symbol("R") * Expr::symbol("ΔI"))
            + Expr::square(Expr::symbol("I") * Expr::symbol("ΔR"));
        let error = Expr::func("sqrt", variance);
        assert_eq!(error.to_string(), "sqrt((R*ΔI)^2 + (I*ΔR)^2)");
    }

    #[test]
    fn test_latex() {
        let expr = Expr::func("sqrt", Expr::square(Expr::symbol("ΔI")));
        assert_eq!(expr.to_latex(), r"\sqrt{\Delta I^{2}}");

        let expr = Expr::symbol("m_1") / Expr::func("sin", Expr::symbol("theta"));
        assert_eq!(expr.to_latex(), r"\frac{m_{1}}{\sin\left(\theta\right)}");

        let expr = Expr::number(2.0) * Expr::symbol("pi");
        assert_eq!(expr.to_latex(), r"2 \cdot \pi");
    }
}
