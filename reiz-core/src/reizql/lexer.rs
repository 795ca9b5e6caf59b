//! Tokenizer for ReizQL patterns.
//!
//! A single-pass `chumsky` char lexer, in the shape of `prql-compiler`'s
//! `parser::lexer` — a flat token stream with spans, whitespace dropped
//! before the grammar ever sees it.

use std::ops::Range;

use chumsky::prelude::*;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Ident(String),
    String(String),
    Integer(i64),
    None,
    Ctrl(char),
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Ident(s) => write!(f, "`{s}`"),
            Token::String(s) => write!(f, "{s:?}"),
            Token::Integer(n) => write!(f, "{n}"),
            Token::None => write!(f, "None"),
            Token::Ctrl(c) => write!(f, "`{c}`"),
        }
    }
}

pub fn lexer() -> impl Parser<char, Vec<(Token, Range<usize>)>, Error = Simple<char>> {
    let ident = filter(|c: &char| c.is_ascii_alphabetic() || *c == '_')
        .map(Some)
        .chain::<char, Vec<_>, _>(
            filter(|c: &char| c.is_ascii_alphanumeric() || *c == '_').repeated(),
        )
        .collect::<String>()
        .map(|name| {
            if name == "None" {
                Token::None
            } else {
                Token::Ident(name)
            }
        });

    let integer = just('-')
        .or_not()
        .chain::<char, _, _>(text::digits(10))
        .collect::<String>()
        .try_map(|s, span| {
            s.parse::<i64>()
                .map(Token::Integer)
                .map_err(|_| Simple::custom(span, "invalid integer literal"))
        });

    let escape = just('\\').ignore_then(
        just('\\')
            .or(just('"'))
            .or(just('n').to('\n'))
            .or(just('t').to('\t')),
    );

    let string = just('"')
        .ignore_then(filter(|c| *c != '\\' && *c != '"').or(escape).repeated())
        .then_ignore(just('"'))
        .collect::<String>()
        .map(Token::String);

    let ctrl = one_of("(),=|&![]*").map(Token::Ctrl);

    let token = string.or(integer).or(ident).or(ctrl);

    token
        .map_with_span(|tok, span| (tok, span))
        .padded_by(filter(|c: &char| c.is_whitespace()).repeated())
        .repeated()
        .then_ignore(end())
}
