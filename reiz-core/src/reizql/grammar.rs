//! Recursive-descent grammar over the token stream, implementing the
//! informal grammar in `spec.md` §4.2 with `chumsky`, in the style of
//! `prql-compiler::parser::expr`'s `binary_op_parser` precedence ladder.
//!
//! This stage only builds an untyped tree ([`RawMatch`]/[`RawValue`]);
//! schema validation happens in [`super::lower_match`].

use chumsky::prelude::*;

use super::LogicalOp;
use super::lexer::Token;
use crate::error::{Error, Reason, Span};

#[derive(Debug, Clone)]
pub struct RawMatch {
    pub name: String,
    pub args: Vec<RawArg>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum RawArg {
    Keyword(String, RawValue, Span),
    Positional(RawValue, Span),
}

#[derive(Debug, Clone)]
pub enum RawValue {
    Match(RawMatch),
    Str(String),
    Int(i64),
    NoneLit,
    Enum(String),
    List(Vec<RawValue>, Span),
    Logical(LogicalOp, Box<RawValue>, Box<RawValue>),
    Negation(Box<RawValue>),
    Wildcard,
}

fn span_of(range: std::ops::Range<usize>) -> Span {
    Span {
        start: range.start,
        end: range.end,
    }
}

fn ctrl(c: char) -> impl Parser<Token, (), Error = Simple<Token>> + Clone {
    just(Token::Ctrl(c)).ignored()
}

fn ident() -> impl Parser<Token, String, Error = Simple<Token>> + Clone {
    select! { Token::Ident(name) => name }
}

/// Builds the recursive `value` grammar (literal | enum | list | logical |
/// negation | wildcard | nested match), with `&` binding tighter than `|`
/// and `!` binding tighter than both, per `spec.md` §4.2.
fn value_parser() -> impl Parser<Token, RawValue, Error = Simple<Token>> + Clone {
    recursive(|value| {
        let match_expr = ident()
            .then_ignore(ctrl('('))
            .then(
                arg(value.clone())
                    .separated_by(ctrl(','))
                    .allow_trailing(),
            )
            .then_ignore(ctrl(')'))
            .map_with_span(|(name, args), span| RawMatch {
                name,
                args,
                span: span_of(span),
            });

        let literal = select! {
            Token::String(s) => RawValue::Str(s),
            Token::Integer(n) => RawValue::Int(n),
            Token::None => RawValue::NoneLit,
        };

        let enum_lit = ident().map(RawValue::Enum);

        let list = value
            .clone()
            .separated_by(ctrl(','))
            .allow_trailing()
            .delimited_by(just(Token::Ctrl('[')), just(Token::Ctrl(']')))
            .map_with_span(|items, span| RawValue::List(items, span_of(span)));

        let wildcard = ctrl('*').to(RawValue::Wildcard);

        let atom = choice((
            match_expr.map(RawValue::Match),
            literal,
            list,
            wildcard,
            enum_lit,
        ))
        .boxed();

        let unary = recursive(move |unary| {
            ctrl('!')
                .ignore_then(unary)
                .map(|inner| RawValue::Negation(Box::new(inner)))
                .or(atom.clone())
        });

        let and_expr = unary
            .clone()
            .then(ctrl('&').ignore_then(unary).repeated())
            .foldl(|left, right| {
                RawValue::Logical(LogicalOp::And, Box::new(left), Box::new(right))
            });

        and_expr
            .clone()
            .then(ctrl('|').ignore_then(and_expr).repeated())
            .foldl(|left, right| RawValue::Logical(LogicalOp::Or, Box::new(left), Box::new(right)))
    })
}

/// The top-level entry point: one `match` expression, per `spec.md` §4.2's
/// `query := match` rule.
pub fn match_parser() -> impl Parser<Token, RawMatch, Error = Simple<Token>> {
    let value = value_parser();
    ident()
        .then_ignore(ctrl('('))
        .then(
            arg(value)
                .separated_by(ctrl(','))
                .allow_trailing(),
        )
        .then_ignore(ctrl(')'))
        .then_ignore(end())
        .map_with_span(|(name, args), span| RawMatch {
            name,
            args,
            span: span_of(span),
        })
}

fn arg(
    value: impl Parser<Token, RawValue, Error = Simple<Token>> + Clone,
) -> impl Parser<Token, RawArg, Error = Simple<Token>> + Clone {
    let keyword = ident()
        .then_ignore(ctrl('='))
        .then(value.clone())
        .map_with_span(|(key, val), span| RawArg::Keyword(key, val, span_of(span)));

    let positional = value
        .clone()
        .map_with_span(|val, span| RawArg::Positional(val, span_of(span)));

    keyword.or(positional)
}

pub fn simple_error_to_error<T: std::fmt::Display>(err: Simple<T>) -> Error {
    let span = span_of(err.span());
    let found = err
        .found()
        .map(|f| f.to_string())
        .unwrap_or_else(|| "end of input".to_string());
    let expected: Vec<String> = err
        .expected()
        .filter_map(|e| e.as_ref().map(|t| t.to_string()))
        .collect();
    let expected = if expected.is_empty() {
        "a valid token".to_string()
    } else {
        expected.join(" or ")
    };
    Error::new(Reason::UnexpectedToken { found, expected }).with_span(Some(span))
}
