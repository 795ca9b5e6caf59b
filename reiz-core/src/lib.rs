//! Compiler for the ReizQL pattern language, and the syntax-tree
//! serializer that populates the backing graph database. Targets a
//! graph-query language (GQA) and exposes a pattern AST and a node-kind
//! schema.
//!
//! Three components, ordered leaves-first:
//! ```ascii
//!           ReizQL
//!
//!   (parse) │ ▲
//! reizql::parse │ │
//!           │ │
//!           ▼ │
//!        Match tree
//!           │
//! (compile) │          GQA (gqa::{Select, Insert, Update, ...})
//! compiler::compile │ ─────────► rendered via `as_edgeql`
//!           ▼
//!         Select
//!
//!   syntax tree ──(serializer::ingest_file)──► sequence of Insert
//! ```
//!
//! `run_query`, `get_stats`, `ingest_file` and `as_edgeql` are the producer
//! surface exposed to the web layer (out of scope here, see crate docs in
//! `SPEC_FULL.md` §1).

pub mod compiler;
pub mod error;
pub mod gqa;
pub mod iface;
pub mod reizql;
pub mod schema;
pub mod serializer;
pub mod stats;

use std::collections::HashMap;

use gqa::Render;
use iface::Connection;

pub use error::ReizQLSyntaxError;
pub use gqa::as_edgeql;

/// The node kinds `get_stats` reports on when the caller doesn't narrow the
/// request, mirroring `original_source/reiz/fetch.py`'s `DEFAULT_NODES`.
pub const DEFAULT_NODE_KINDS: &[&str] = &["Module", "AST", "stmt", "expr"];

/// A source location recovered from a positional matcher's row, used by
/// the caller to slice the original file (`spec.md` §4.3.3 step 5).
#[derive(Debug, Clone, Copy)]
pub struct Location {
    pub lineno: i64,
    pub col_offset: i64,
    pub end_lineno: i64,
    pub end_col_offset: i64,
}

/// One row of a non-stats `run_query` result.
#[derive(Debug, Clone)]
pub struct QueryResult {
    pub source: Option<String>,
    pub filename: String,
}

/// The outcome of `run_query`, shaped by whether `stats` was requested
/// (`spec.md` §6, §4.3.1 "Result-shape decoration").
#[derive(Debug, Clone)]
pub enum QueryOutcome {
    Stats(i64),
    Results(Vec<QueryResult>),
}

/// Runs a ReizQL pattern against the backing store
/// (`spec.md` §4.3.3 "Query execution protocol").
///
/// Source-file reading and location slicing stay an external concern
/// (`spec.md` §1) — the caller supplies `fetch_source`, invoked once per
/// positional result row with the row's filename and, when available, its
/// location; a `None` return degrades the row's `source` to `null` rather
/// than failing the whole query (`spec.md` §7 "Slice failure").
pub fn run_query(
    connection: &mut dyn Connection,
    reiz_ql: &str,
    stats: bool,
    limit: i64,
    mut fetch_source: impl FnMut(&str, Option<Location>) -> Option<String>,
) -> Result<QueryOutcome, ReizQLSyntaxError> {
    run_query_inner(connection, reiz_ql, stats, limit, &mut fetch_source)
        .map_err(|e| error::downcast(e.into(), reiz_ql))
}

fn run_query_inner(
    connection: &mut dyn Connection,
    reiz_ql: &str,
    stats: bool,
    limit: i64,
    fetch_source: &mut dyn FnMut(&str, Option<Location>) -> Option<String>,
) -> anyhow::Result<QueryOutcome> {
    let tree = reizql::parse(reiz_ql)?;
    log::info!("ReizQL tree: {tree:?}");

    let select = compiler::compile(&tree)?;

    if stats {
        let value = compiler::wrap_for_stats(select);
        let query = format!("SELECT {}", value.rendered());
        log::info!("EdgeQL query: {query:?}");
        let row = connection.query_one(&query, &[])?;
        let count = match row.get("count") {
            Some(iface::RowValue::Int(n)) => n,
            _ => anyhow::bail!("stats query did not return an integer"),
        };
        return Ok(QueryOutcome::Stats(count));
    }

    let mut select = select;
    compiler::decorate_for_results(&mut select, &tree, limit)?;

    let query = gqa::as_edgeql(&select);
    log::info!("EdgeQL query: {query:?}");

    // The back-pointer to `_module.filename` is reached through the
    // `annotation` field for an `arg` root (compiler.rs:135), straight off
    // the root for everything else.
    let filename_path = if tree.name == "Arg" || tree.name == "arg" {
        "annotation._module.filename"
    } else {
        "_module.filename"
    };

    let rows = connection.query(&query, &[])?;
    let mut results = Vec::with_capacity(rows.len());
    for row in rows {
        let filename = match row.get(filename_path).or_else(|| row.get("filename")) {
            Some(iface::RowValue::Str(f)) => f,
            _ => continue,
        };

        let location = if tree.positional {
            match (
                row.get("lineno"),
                row.get("col_offset"),
                row.get("end_lineno"),
                row.get("end_col_offset"),
            ) {
                (
                    Some(iface::RowValue::Int(lineno)),
                    Some(iface::RowValue::Int(col_offset)),
                    Some(iface::RowValue::Int(end_lineno)),
                    Some(iface::RowValue::Int(end_col_offset)),
                ) => Some(Location {
                    lineno,
                    col_offset,
                    end_lineno,
                    end_col_offset,
                }),
                _ => None,
            }
        } else {
            None
        };

        let source = fetch_source(&filename, location);
        results.push(QueryResult { source, filename });
    }

    Ok(QueryOutcome::Results(results))
}

/// Returns the row count for each requested node kind
/// (`spec.md` §6 "Producer side"), optionally served from `cache`.
pub fn get_stats(
    connection: &mut dyn Connection,
    node_kinds: &[String],
    cache: Option<&mut stats::StatsCache>,
) -> anyhow::Result<HashMap<String, i64>> {
    let node_kinds: Vec<String> = if node_kinds.is_empty() {
        DEFAULT_NODE_KINDS.iter().map(|s| s.to_string()).collect()
    } else {
        node_kinds.to_vec()
    };

    let mut cache = cache;
    if let Some(cache) = cache.as_deref_mut() {
        if let Some(hit) = cache.get(&node_kinds) {
            return Ok(hit);
        }
    }

    let mut counts = HashMap::new();
    for kind in &node_kinds {
        let select = gqa::Select::new(kind.clone());
        let value = compiler::wrap_for_stats(select);
        let query = format!("SELECT {}", value.rendered());
        let row = connection.query_one(&query, &[])?;
        let count = match row.get("count") {
            Some(iface::RowValue::Int(n)) => n,
            _ => 0,
        };
        counts.insert(kind.clone(), count);
    }

    if let Some(cache) = cache.as_deref_mut() {
        cache.put(&node_kinds, counts.clone());
    }

    Ok(counts)
}

/// Ingests a parsed source file under a single transaction
/// (`spec.md` §6 "Producer side"). `tree` comes from the upstream parser,
/// never read or tokenized here (`spec.md` §1).
pub fn ingest_file(
    connection: &mut dyn Connection,
    tree: &dyn iface::SyntaxNode,
    filename: &str,
    project_ref: Option<gqa::Value>,
) -> bool {
    serializer::ingest_file(connection, tree, filename, project_ref)
}
