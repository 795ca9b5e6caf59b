//! ReizQL Front-End (RFE): tokenizer + parser for the pattern DSL.
//!
//! Produces a typed [`Match`] pattern tree, validating structure and
//! schema membership (node kind exists, filter keys are real fields,
//! list elements are homogeneous, positional args are allowed) — deeper
//! compile-time semantics (result-shape decoration, `arg()`'s `annotation`
//! requirement) are the compiler's job, not this front-end's
//! (`spec.md` §4.2, §4.3.1).

mod grammar;
mod lexer;

use chumsky::Parser;
use indexmap::IndexMap;

use crate::error::{Error, Reason};
use crate::schema::Kind;

/// One variant of a filter value in a ReizQL pattern.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchValue {
    Atom(Literal),
    Enum(String),
    Ref(Box<Match>),
    List(Vec<MatchValue>),
    Logical {
        op: LogicalOp,
        left: Box<MatchValue>,
        right: Box<MatchValue>,
    },
    Negation(Box<MatchValue>),
    Wildcard,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Str(String),
    Integer(i64),
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

/// A structural matcher against one node kind.
#[derive(Debug, Clone, PartialEq)]
pub struct Match {
    pub name: String,
    pub filters: IndexMap<String, MatchValue>,
    pub positional: bool,
}

/// Parses a ReizQL source string into a typed, schema-validated pattern
/// tree (`spec.md` §4.2).
pub fn parse(source: &str) -> Result<Match, Error> {
    let (tokens, lex_errors) = lexer::lexer().parse_recovery(source);
    if let Some(err) = lex_errors.into_iter().next() {
        return Err(grammar::simple_error_to_error(err));
    }
    let tokens = tokens.ok_or_else(|| Error::new(Reason::Simple("empty input".into())))?;

    let len = source.chars().count();
    let stream = chumsky::Stream::from_iter(len..len + 1, tokens.into_iter());

    let (raw, parse_errors) = grammar::match_parser().parse_recovery(stream);
    if let Some(err) = parse_errors.into_iter().next() {
        return Err(grammar::simple_error_to_error(err));
    }
    let raw = raw.ok_or_else(|| Error::new(Reason::Simple("failed to parse pattern".into())))?;

    lower_match(raw)
}

fn lower_match(raw: grammar::RawMatch) -> Result<Match, Error> {
    let kind = Kind::from_name(&raw.name).ok_or_else(|| {
        Error::new(Reason::UnknownNodeKind {
            name: raw.name.clone(),
        })
        .with_span(Some(raw.span))
    })?;

    let mut filters = IndexMap::new();
    for arg in raw.args {
        match arg {
            grammar::RawArg::Keyword(key, value, span) => {
                if !kind.has_field(&key) {
                    return Err(Error::new(Reason::UnknownField {
                        kind: kind.name().to_string(),
                        field: key,
                    })
                    .with_span(Some(span)));
                }
                filters.insert(key, lower_value(value)?);
            }
            grammar::RawArg::Positional(value, span) => {
                let field = kind.positional_field().ok_or_else(|| {
                    Error::new(Reason::PositionalNotAllowed {
                        kind: kind.name().to_string(),
                    })
                    .with_span(Some(span))
                })?;
                filters.insert(field.to_string(), lower_value(value)?);
            }
        }
    }

    Ok(Match {
        name: kind.name().to_string(),
        filters,
        positional: kind.is_positional(),
    })
}

fn lower_value(raw: grammar::RawValue) -> Result<MatchValue, Error> {
    Ok(match raw {
        grammar::RawValue::Match(m) => MatchValue::Ref(Box::new(lower_match(m)?)),
        grammar::RawValue::Str(s) => MatchValue::Atom(Literal::Str(s)),
        grammar::RawValue::Int(n) => MatchValue::Atom(Literal::Integer(n)),
        grammar::RawValue::NoneLit => MatchValue::Atom(Literal::None),
        grammar::RawValue::Enum(name) => MatchValue::Enum(name),
        grammar::RawValue::List(items, span) => {
            let lowered: Vec<MatchValue> = items
                .into_iter()
                .map(lower_value)
                .collect::<Result<_, _>>()?;
            if !is_homogeneous(&lowered) {
                return Err(Error::new(Reason::HomogeneityViolation).with_span(Some(span)));
            }
            MatchValue::List(lowered)
        }
        grammar::RawValue::Logical(op, left, right) => MatchValue::Logical {
            op,
            left: Box::new(lower_value(*left)?),
            right: Box::new(lower_value(*right)?),
        },
        grammar::RawValue::Negation(inner) => MatchValue::Negation(Box::new(lower_value(*inner)?)),
        grammar::RawValue::Wildcard => MatchValue::Wildcard,
    })
}

fn family(value: &MatchValue) -> u8 {
    match value {
        MatchValue::Atom(_) => 0,
        MatchValue::Enum(_) => 1,
        MatchValue::Ref(_) => 2,
        MatchValue::List(_) => 3,
        MatchValue::Logical { .. } => 4,
        MatchValue::Negation(_) => 5,
        MatchValue::Wildcard => 6,
    }
}

fn is_homogeneous(values: &[MatchValue]) -> bool {
    match values.split_first() {
        None => true,
        Some((first, rest)) => rest.iter().all(|v| family(v) == family(first)),
    }
}
