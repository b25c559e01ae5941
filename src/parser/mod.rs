//! Parser module - converts strings to AST
mod implicit_mul;
mod lexer;
mod pratt;
mod tokens;

use crate::functions::registry::Registry;
use crate::symbol::SymbolTable;
use crate::{DEFAULT_MAX_DEPTH, DEFAULT_MAX_NODES, Expr, ParseError};
use tokens::{Spanned, Token};

/// Knobs that change how text is turned into an expression
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    /// Insert `*` between adjacent operands (`2x`, `(a)(b)`)
    pub implicit_multiplication: bool,
    pub max_depth: usize,
    pub max_nodes: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        ParseOptions {
            implicit_multiplication: true,
            max_depth: DEFAULT_MAX_DEPTH,
            max_nodes: DEFAULT_MAX_NODES,
        }
    }
}

/// Parse a formula string into an expression AST
///
/// Every symbol in the result is declared in `symbols` (as a variable, a
/// constant or a built-in constant); anything else is reported as
/// [`ParseError::UndeclaredSymbols`].
///
/// # Example
/// ```
/// use errprop::parser::{parse, ParseOptions};
/// use errprop::SymbolTable;
///
/// let mut symbols = SymbolTable::new();
/// symbols.declare_variable("x").unwrap();
///
/// let expr = parse("x^2 + sin(x)", &symbols, &ParseOptions::default()).unwrap();
/// println!("Parsed: {}", expr);
/// ```
///
/// # Errors
/// Returns `ParseError` if:
/// - The input is empty
/// - The input contains invalid syntax
/// - Parentheses are unbalanced
/// - The tree is nested deeper than `max_depth` or has more than `max_nodes` nodes
/// - A symbol was not declared
pub fn parse(
    input: &str,
    symbols: &SymbolTable,
    options: &ParseOptions,
) -> Result<Expr, ParseError> {
    // Pipeline: validate -> lex -> check calls -> implicit_mul -> parse -> check symbols

    if input.trim().is_empty() {
        return Err(ParseError::EmptyFormula);
    }

    let tokens = lex_checked(input, symbols)?;

    let tokens = if options.implicit_multiplication {
        implicit_mul::insert_implicit_multiplication(tokens)
    } else {
        tokens
    };

    let expr = pratt::parse_expression(&tokens, options.max_depth)?;

    // Operator chains are built in a loop, so the parser's recursion guard
    // does not see them; the tree itself must respect the limit too.
    if expr.max_depth() > options.max_depth {
        return Err(ParseError::MaxDepthExceeded);
    }

    if expr.node_count() > options.max_nodes {
        return Err(ParseError::MaxNodesExceeded);
    }

    let mut undeclared: Vec<String> = expr
        .symbols()
        .into_iter()
        .filter(|name| !symbols.is_declared(name))
        .collect();

    if !undeclared.is_empty() {
        undeclared.sort_unstable();
        return Err(ParseError::UndeclaredSymbols { names: undeclared });
    }

    log::trace!("parsed '{}' as {}", input, expr);
    Ok(expr)
}

/// Parse a closed numeric expression such as `6.022*10**23` or `2*pi`
///
/// Only names bound to numbers in `symbols` (constants and built-ins) may
/// appear.
pub fn parse_value(
    input: &str,
    symbols: &SymbolTable,
    options: &ParseOptions,
) -> Result<Expr, ParseError> {
    let expr = parse(input, symbols, options)?;

    let mut variables: Vec<String> = expr
        .symbols()
        .into_iter()
        .filter(|name| symbols.is_variable(name))
        .collect();

    if !variables.is_empty() {
        variables.sort_unstable();
        return Err(ParseError::InvalidSyntax {
            msg: format!(
                "a value cannot depend on the variable(s) {}",
                variables.join(", ")
            ),
            span: None,
        });
    }

    Ok(expr)
}

/// Lex, then reject `name(` where `name` is neither a built-in function nor a
/// declared symbol, so `foo(x)` reads as an unknown function rather than as
/// an undeclared `foo` times `x`.
fn lex_checked(input: &str, symbols: &SymbolTable) -> Result<Vec<Spanned>, ParseError> {
    let tokens = lexer::lex(input)?;

    for pair in tokens.windows(2) {
        if let Token::Identifier(name) = &pair[0].token
            && pair[1].token == Token::LeftParen
            && !Registry::contains(name)
            && !symbols.is_declared(name)
        {
            return Err(ParseError::UnknownFunction {
                name: name.clone(),
                span: Some(pair[0].span),
            });
        }
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ExprKind, Span};

    fn table(vars: &[&str]) -> SymbolTable {
        let mut table = SymbolTable::new();
        for v in vars {
            table.declare_variable(v).unwrap();
        }
        table
    }

    fn parse_default(input: &str, vars: &[&str]) -> Result<Expr, ParseError> {
        parse(input, &table(vars), &ParseOptions::default())
    }

    #[test]
    fn test_parse_simple() {
        let result = parse_default("x", &["x"]).unwrap();
        assert_eq!(result, Expr::symbol("x"));
    }

    #[test]
    fn test_parse_empty() {
        assert_eq!(parse_default("   ", &["x"]), Err(ParseError::EmptyFormula));
    }

    #[test]
    fn test_implicit_multiplication() {
        let explicit = parse_default("2*x*(x+1)", &["x"]).unwrap();
        let implicit = parse_default("2x(x+1)", &["x"]).unwrap();
        assert_eq!(explicit, implicit);
    }

    #[test]
    fn test_implicit_multiplication_disabled() {
        let options = ParseOptions {
            implicit_multiplication: false,
            ..ParseOptions::default()
        };
        let result = parse("2x", &table(&["x"]), &options);
        assert!(matches!(result, Err(ParseError::UnexpectedToken { .. })));
    }

    #[test]
    fn test_double_star_power() {
        let result = parse_default("I**2 * R", &["I", "R"]).unwrap();
        assert!(matches!(result.kind, ExprKind::Mul(_, _)));
    }

    #[test]
    fn test_undeclared_symbols_are_listed() {
        let err = parse_default("k*x + q", &["x"]).unwrap_err();
        assert_eq!(
            err,
            ParseError::UndeclaredSymbols {
                names: vec!["k".into(), "q".into()]
            }
        );
    }

    #[test]
    fn test_builtin_constants_are_declared() {
        let result = parse_default("2*pi*r + e", &["r"]);
        assert!(result.is_ok());
    }

    #[test]
    fn test_unknown_function() {
        let err = parse_default("foo(x)", &["x"]).unwrap_err();
        assert_eq!(
            err,
            ParseError::UnknownFunction {
                name: "foo".into(),
                span: Some(Span::new(0, 3))
            }
        );
    }

    #[test]
    fn test_unbalanced_parentheses() {
        assert!(parse_default("(x + 1", &["x"]).is_err());
        assert!(parse_default("x + 1)", &["x"]).is_err());
    }

    #[test]
    fn test_node_limit() {
        let options = ParseOptions {
            max_nodes: 5,
            ..ParseOptions::default()
        };
        let result = parse("x + x + x + x", &table(&["x"]), &options);
        assert_eq!(result, Err(ParseError::MaxNodesExceeded));
    }

    #[test]
    fn test_long_operator_chain_hits_depth_limit() {
        let chain = vec!["x"; 3000].join(" + ");
        assert_eq!(parse_default(&chain, &["x"]), Err(ParseError::MaxDepthExceeded));

        let options = ParseOptions {
            max_depth: 3,
            ..ParseOptions::default()
        };
        assert!(parse("x * x * x", &table(&["x"]), &options).is_ok());
        assert_eq!(
            parse("x * x * x * x", &table(&["x"]), &options),
            Err(ParseError::MaxDepthExceeded)
        );
    }

    #[test]
    fn test_value_rejects_variables() {
        let symbols = table(&["x"]);
        let options = ParseOptions::default();
        assert!(parse_value("6.022*10**23", &symbols, &options).is_ok());
        assert!(parse_value("2*pi", &symbols, &options).is_ok());
        assert!(parse_value("2*x", &symbols, &options).is_err());
    }
}
