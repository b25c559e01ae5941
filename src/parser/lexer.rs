//! Lexer: function text to a flat token stream
//!
//! Accepts both `^` and `**` for powers, and numbers with optional fraction
//! and exponent (`6.022e23`, `.5`, `3.`).

use super::tokens::{Operator, Spanned, Token};
use crate::{ParseError, Span};

pub(crate) fn lex(input: &str) -> Result<Vec<Spanned>, ParseError> {
    let bytes = input.as_bytes();
    let mut tokens = Vec::with_capacity(input.len() / 2 + 1);
    let mut pos = 0;

    while pos < bytes.len() {
        let c = bytes[pos];

        if c.is_ascii_whitespace() {
            pos += 1;
            continue;
        }

        if c.is_ascii_digit() || (c == b'.' && bytes.get(pos + 1).is_some_and(u8::is_ascii_digit)) {
            let end = scan_number(bytes, pos);
            let text = &input[pos..end];
            let value: f64 = text.parse().map_err(|_| ParseError::InvalidNumber {
                value: text.to_string(),
                span: Some(Span::new(pos, end)),
            })?;
            tokens.push(Spanned::new(Token::Number(value), Span::new(pos, end)));
            pos = end;
            continue;
        }

        if c.is_ascii_alphabetic() || c == b'_' {
            let start = pos;
            while pos < bytes.len() && (bytes[pos].is_ascii_alphanumeric() || bytes[pos] == b'_') {
                pos += 1;
            }
            tokens.push(Spanned::new(
                Token::Identifier(input[start..pos].to_string()),
                Span::new(start, pos),
            ));
            continue;
        }

        let (token, len) = match c {
            b'+' => (Token::Operator(Operator::Add), 1),
            b'-' => (Token::Operator(Operator::Sub), 1),
            b'*' if bytes.get(pos + 1) == Some(&b'*') => (Token::Operator(Operator::Pow), 2),
            b'*' => (Token::Operator(Operator::Mul), 1),
            b'/' => (Token::Operator(Operator::Div), 1),
            b'^' => (Token::Operator(Operator::Pow), 1),
            b'(' => (Token::LeftParen, 1),
            b')' => (Token::RightParen, 1),
            b',' => (Token::Comma, 1),
            _ => {
                let ch = input[pos..].chars().next().unwrap_or('?');
                return Err(ParseError::InvalidToken {
                    token: ch.to_string(),
                    span: Some(Span::new(pos, pos + ch.len_utf8())),
                });
            }
        };
        tokens.push(Spanned::new(token, Span::new(pos, pos + len)));
        pos += len;
    }

    Ok(tokens)
}

/// Find the end of the numeric literal starting at `start`
fn scan_number(bytes: &[u8], start: usize) -> usize {
    let mut pos = start;
    while pos < bytes.len() && bytes[pos].is_ascii_digit() {
        pos += 1;
    }
    if pos < bytes.len() && bytes[pos] == b'.' {
        pos += 1;
        while pos < bytes.len() && bytes[pos].is_ascii_digit() {
            pos += 1;
        }
    }
    // Exponent only when digits follow, so `2e` stays `2 * e`
    if pos < bytes.len() && (bytes[pos] == b'e' || bytes[pos] == b'E') {
        let mut exp = pos + 1;
        if exp < bytes.len() && (bytes[exp] == b'+' || bytes[exp] == b'-') {
            exp += 1;
        }
        if exp < bytes.len() && bytes[exp].is_ascii_digit() {
            while exp < bytes.len() && bytes[exp].is_ascii_digit() {
                exp += 1;
            }
            pos = exp;
        }
    }
    pos
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<Token> {
        lex(input).unwrap().into_iter().map(|s| s.token).collect()
    }

    #[test]
    fn test_scientific_notation() {
        assert_eq!(kinds("3.14e-15"), vec![Token::Number(3.14e-15)]);
        assert_eq!(kinds("6E+23"), vec![Token::Number(6e23)]);
        assert_eq!(kinds(".5"), vec![Token::Number(0.5)]);
    }

    #[test]
    fn test_trailing_e_is_identifier() {
        assert_eq!(
            kinds("2e"),
            vec![Token::Number(2.0), Token::Identifier("e".into())]
        );
    }

    #[test]
    fn test_double_star_is_power() {
        assert_eq!(
            kinds("x**2"),
            vec![
                Token::Identifier("x".into()),
                Token::Operator(Operator::Pow),
                Token::Number(2.0)
            ]
        );
        assert_eq!(kinds("x^2"), kinds("x ** 2"));
    }

    #[test]
    fn test_spans() {
        let tokens = lex("ab + 10").unwrap();
        assert_eq!(tokens[0].span, Span::new(0, 2));
        assert_eq!(tokens[1].span, Span::new(3, 4));
        assert_eq!(tokens[2].span, Span::new(5, 7));
    }

    #[test]
    fn test_invalid_character() {
        let err = lex("x $ y").unwrap_err();
        assert_eq!(
            err,
            ParseError::InvalidToken {
                token: "$".into(),
                span: Some(Span::at(2))
            }
        );
    }
}
