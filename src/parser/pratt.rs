use super::tokens::{Operator, Spanned, Token};
use crate::functions::registry::Registry;
use crate::{Expr, ParseError, Span};

/// Precedence of unary minus/plus: between Mul (20) and Pow (30)
/// so that -x^2 parses as -(x^2), not (-x)^2
const UNARY_PRECEDENCE: u8 = 25;

/// Parse tokens into an AST using Pratt parsing algorithm
pub(crate) fn parse_expression(tokens: &[Spanned], max_depth: usize) -> Result<Expr, ParseError> {
    if tokens.is_empty() {
        return Err(ParseError::UnexpectedEndOfInput);
    }

    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
        max_depth,
    };

    let expr = parser.parse_expr(0)?;

    if let Some(extra) = parser.current() {
        return Err(ParseError::unexpected(
            "end of input",
            extra.token.to_user_string(),
            extra.span,
        ));
    }

    Ok(expr)
}

struct Parser<'a> {
    tokens: &'a [Spanned],
    pos: usize,
    depth: usize,
    max_depth: usize,
}

impl<'a> Parser<'a> {
    fn current(&self) -> Option<&'a Spanned> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    fn end_span(&self) -> Span {
        self.tokens
            .last()
            .map_or(Span::default(), |t| Span::at(t.span.end))
    }

    fn expect_right_paren(&mut self) -> Result<(), ParseError> {
        match self.current() {
            Some(Spanned {
                token: Token::RightParen,
                ..
            }) => {
                self.advance();
                Ok(())
            }
            Some(other) => Err(ParseError::unexpected(
                ")",
                other.token.to_user_string(),
                other.span,
            )),
            None => Err(ParseError::unexpected(")", "end of input", self.end_span())),
        }
    }

    fn parse_expr(&mut self, min_precedence: u8) -> Result<Expr, ParseError> {
        self.depth += 1;
        if self.depth > self.max_depth {
            return Err(ParseError::MaxDepthExceeded);
        }

        // Parse left side (prefix)
        let mut left = self.parse_prefix()?;

        // Parse operators and right side (infix)
        while let Some(spanned) = self.current() {
            let op = match spanned.token {
                Token::Operator(op) => op,
                _ => break,
            };

            let precedence = op.precedence();
            if precedence < min_precedence {
                break;
            }

            self.advance();

            // Right associative for power, left for others
            let next_precedence = if op == Operator::Pow {
                precedence
            } else {
                precedence + 1
            };

            let right = self.parse_expr(next_precedence)?;

            left = match op {
                Operator::Add => Expr::add_expr(left, right),
                Operator::Sub => Expr::sub_expr(left, right),
                Operator::Mul => Expr::mul_expr(left, right),
                Operator::Div => Expr::div_expr(left, right),
                Operator::Pow => Expr::pow(left, right),
            };
        }

        self.depth -= 1;
        Ok(left)
    }

    fn parse_arguments(&mut self) -> Result<Vec<Expr>, ParseError> {
        let mut args = Vec::new();

        if let Some(Spanned {
            token: Token::RightParen,
            ..
        }) = self.current()
        {
            return Ok(args);
        }

        loop {
            args.push(self.parse_expr(0)?);

            match self.current() {
                Some(Spanned {
                    token: Token::Comma,
                    ..
                }) => self.advance(),
                Some(Spanned {
                    token: Token::RightParen,
                    ..
                }) => break,
                Some(other) => {
                    return Err(ParseError::unexpected(
                        ", or )",
                        other.token.to_user_string(),
                        other.span,
                    ));
                }
                None => {
                    return Err(ParseError::unexpected(")", "end of input", self.end_span()));
                }
            }
        }

        Ok(args)
    }

    fn parse_prefix(&mut self) -> Result<Expr, ParseError> {
        let spanned = self.current().ok_or(ParseError::UnexpectedEndOfInput)?;

        match &spanned.token {
            Token::Number(n) => {
                self.advance();
                Ok(Expr::number(*n))
            }

            Token::Identifier(name) => {
                self.advance();

                let Some(canonical) = Registry::canonical(name) else {
                    return Ok(Expr::symbol(name.clone()));
                };

                // Function must be followed by (
                match self.current() {
                    Some(Spanned {
                        token: Token::LeftParen,
                        ..
                    }) => self.advance(),
                    Some(other) => {
                        return Err(ParseError::unexpected(
                            "(",
                            other.token.to_user_string(),
                            other.span,
                        ));
                    }
                    None => {
                        return Err(ParseError::unexpected("(", "end of input", self.end_span()));
                    }
                }

                let args = self.parse_arguments()?;
                self.expect_right_paren()?;

                if args.len() != 1 {
                    return Err(ParseError::invalid_syntax_at(
                        format!(
                            "function '{}' takes exactly one argument, got {}",
                            canonical,
                            args.len()
                        ),
                        spanned.span,
                    ));
                }

                Ok(Expr::func_multi(canonical, args))
            }

            Token::Operator(Operator::Sub) => {
                self.advance();
                let expr = self.parse_expr(UNARY_PRECEDENCE)?;
                Ok(Expr::neg(expr))
            }

            Token::Operator(Operator::Add) => {
                self.advance();
                self.parse_expr(UNARY_PRECEDENCE)
            }

            Token::LeftParen => {
                self.advance();
                let expr = self.parse_expr(0)?;
                self.expect_right_paren()?;
                Ok(expr)
            }

            other => Err(ParseError::InvalidToken {
                token: other.to_user_string(),
                span: Some(spanned.span),
            }),
        }
    }
}
