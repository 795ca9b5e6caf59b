//! Typed errors for the ReizQL front-end, the compiler and the serializer.
//!
//! Mirrors the shape of a source-mapped compiler error: a [`Reason`] carries
//! the semantic detail, an optional [`Span`] carries where it happened, and
//! [`Error`] bundles the two together with an optional hint. `anyhow` is used
//! internally for `?`-propagation across module boundaries; callers that want
//! the typed error back can `downcast` it.

use std::fmt::{self, Debug, Display, Formatter};
use std::ops::Range;

use ariadne::{Config, Label, Report, ReportKind, Source};
use serde::Serialize;

/// Byte-offset span into the original ReizQL source.
#[derive(Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl From<Span> for Range<usize> {
    fn from(s: Span) -> Self {
        s.start..s.end
    }
}

impl Debug for Span {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// Line/column location, 0-based, computed from a [`Span`] on demand.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone)]
pub enum Reason {
    /// A token was found where it cannot appear.
    UnexpectedToken { found: String, expected: String },
    /// A `Match` names a node kind the schema does not know.
    UnknownNodeKind { name: String },
    /// A filter key is not a field of the matched node kind.
    UnknownField { kind: String, field: String },
    /// A schema entity named in a query does not exist in the backing store.
    UnknownReference { name: String },
    /// A `List` mixed element kinds from different `MatchValue` families.
    HomogeneityViolation,
    /// A positional argument was used against a node kind with no locations.
    PositionalNotAllowed { kind: String },
    /// A compiler precondition was not met (e.g. `arg()` without `annotation`).
    MatchingConstraintViolated(String),
    /// Decoration could not determine how to shape results for the root kind.
    UnexpectedRoot { kind: String },
    /// The backing store rejected or failed to run a rendered query.
    Execution(String),
    Simple(String),
}

impl Reason {
    fn message(&self) -> String {
        match self {
            Reason::UnexpectedToken { found, expected } => {
                format!("unexpected {found}, expected {expected}")
            }
            Reason::UnknownNodeKind { name } => format!("unknown node kind `{name}`"),
            Reason::UnknownField { kind, field } => {
                format!("`{kind}` has no field `{field}`")
            }
            Reason::UnknownReference { name } => format!("unknown reference `{name}`"),
            Reason::HomogeneityViolation => {
                "list elements must all be of the same kind".to_string()
            }
            Reason::PositionalNotAllowed { kind } => {
                format!("`{kind}` does not carry source locations, positional args are not allowed")
            }
            Reason::MatchingConstraintViolated(msg) => msg.clone(),
            Reason::UnexpectedRoot { kind } => format!("unexpected root matcher: {kind}"),
            Reason::Execution(msg) => msg.clone(),
            Reason::Simple(msg) => msg.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Error {
    pub span: Option<Span>,
    pub reason: Reason,
    pub help: Option<String>,
}

impl Error {
    pub fn new(reason: Reason) -> Self {
        Error {
            span: None,
            reason,
            help: None,
        }
    }

    pub fn with_span(mut self, span: Option<Span>) -> Self {
        self.span = span;
        self
    }

    pub fn with_help<S: Into<String>>(mut self, help: S) -> Self {
        self.help = Some(help.into());
        self
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.reason.message())
    }
}

impl std::error::Error for Error {}

pub trait WithErrorInfo {
    fn with_help<S: Into<String>>(self, help: S) -> Self;
    fn with_span(self, span: Option<Span>) -> Self;
}

impl<T> WithErrorInfo for Result<T, Error> {
    fn with_help<S: Into<String>>(self, help: S) -> Self {
        self.map_err(|e| e.with_help(help))
    }

    fn with_span(self, span: Option<Span>) -> Self {
        self.map_err(|e| e.with_span(span))
    }
}

/// A typed syntax/compile error, in the shape the web layer expects to
/// forward unchanged (`spec.md` §7 and §6 producer surface).
#[derive(Debug, Clone, Serialize)]
pub struct ReizQLSyntaxError {
    pub message: String,
    pub position: Option<Position>,
}

impl Display for ReizQLSyntaxError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ReizQLSyntaxError {}

/// Converts an internal `anyhow::Error` wrapping an [`Error`] into the
/// public [`ReizQLSyntaxError`], computing line/column from `source` when a
/// span is present. Unrecognised errors degrade to a bare message, same as
/// `prql_compiler::error::downcast`'s fallback arm.
pub fn downcast(error: anyhow::Error, source: &str) -> ReizQLSyntaxError {
    match error.downcast::<Error>() {
        Ok(error) => {
            let position = error.span.and_then(|span| position_of(source, span));
            ReizQLSyntaxError {
                message: error.reason.message(),
                position,
            }
        }
        Err(error) => ReizQLSyntaxError {
            message: format!("{error:#}"),
            position: None,
        },
    }
}

fn position_of(source: &str, span: Span) -> Option<Position> {
    let mut line = 0;
    let mut col = 0;
    for (offset, ch) in source.char_indices() {
        if offset >= span.start {
            break;
        }
        if ch == '\n' {
            line += 1;
            col = 0;
        } else {
            col += 1;
        }
    }
    Some(Position { line, column: col })
}

/// Renders a pretty, annotated report for a syntax error. Useful for the
/// `reizc` CLI and for diagnostics; never part of the producer-facing API
/// surface (`spec.md` keeps that contract to plain `{message, position}`).
pub fn report(source_id: &str, source: &str, error: &Error) -> Option<String> {
    let span = error.span?;
    let config = Config::default();
    let mut builder = Report::build(ReportKind::Error, source_id, span.start)
        .with_config(config)
        .with_label(Label::new((source_id, Range::from(span))).with_message(error.reason.message()));
    if let Some(help) = &error.help {
        builder.set_help(help);
    }
    let mut out = Vec::new();
    builder
        .finish()
        .write((source_id, Source::from(source)), &mut out)
        .ok()?;
    String::from_utf8(out).ok()
}
