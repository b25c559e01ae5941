//! Implicit multiplication insertion for natural notation
//!
//! Inserts `*` operators between tokens where multiplication is implied, e.g. `2x` → `2 * x`.

use super::tokens::{Operator, Spanned, Token};
use crate::Span;
use crate::functions::registry::Registry;

fn is_function(token: &Token) -> bool {
    matches!(token, Token::Identifier(name) if Registry::contains(name))
}

/// Check if implicit multiplication should be inserted between two tokens
fn should_insert_mul(current: &Token, next: &Token) -> bool {
    match (current, next) {
        // A function name is followed by its argument list, never multiplied
        (cur, _) if is_function(cur) => false,

        // Number * Function: 4 sin(x) → 4 * sin(x)
        // Identifier * Function: x sin(y)
        // ) * Function: (a) sin(x)
        (Token::Number(_) | Token::Identifier(_) | Token::RightParen, next)
            if is_function(next) =>
        {
            true
        }

        // Number * Identifier: 2x
        // Identifier * Identifier: a b
        // ) * Identifier: (a)x
        // Number * (: 2(x)
        // Identifier * (: x(y + 1), identifier is a symbol, not a function
        // ) * (: (a)(b)
        // Identifier * Number / ) * Number: x 2, (a) 2
        (Token::Number(_) | Token::Identifier(_) | Token::RightParen, Token::Identifier(_))
        | (Token::Number(_) | Token::Identifier(_) | Token::RightParen, Token::LeftParen)
        | (Token::Identifier(_) | Token::RightParen, Token::Number(_)) => true,

        _ => false,
    }
}

/// Insert implicit multiplication operators between appropriate tokens
///
/// The inserted operator gets an empty span at the start of the next token.
pub(crate) fn insert_implicit_multiplication(tokens: Vec<Spanned>) -> Vec<Spanned> {
    let needs_insertion = tokens
        .windows(2)
        .any(|w| should_insert_mul(&w[0].token, &w[1].token));

    if !needs_insertion {
        return tokens;
    }

    let mut result = Vec::with_capacity(tokens.len() * 3 / 2);
    let mut it = tokens.into_iter().peekable();

    while let Some(current) = it.next() {
        let next_start = it
            .peek()
            .filter(|next| should_insert_mul(&current.token, &next.token))
            .map(|next| next.span.start);

        result.push(current);
        if let Some(start) = next_start {
            result.push(Spanned::new(
                Token::Operator(Operator::Mul),
                Span::new(start, start),
            ));
        }
    }

    result
}
