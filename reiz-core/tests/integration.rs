//! Black-box coverage of the end-to-end scenarios and ingestion scenarios
//! from `SPEC_FULL.md` §8, driven entirely through the public producer
//! surface (`run_query`, `get_stats`, `ingest_file`) against fake
//! `Connection`/`SyntaxNode` doubles — no real database.

use std::cell::RefCell;
use std::collections::HashMap;

use reiz_core::iface::{
    AtomicValue, Connection, FieldValue, Row, RowValue, SyntaxNode, Transaction, VarValue,
};
use reiz_core::{get_stats, ingest_file, run_query, stats::StatsCache, QueryOutcome};
use uuid::Uuid;

struct FakeRow {
    id: Uuid,
    fields: HashMap<String, RowValue>,
}

impl Row for FakeRow {
    fn get(&self, path: &str) -> Option<RowValue> {
        self.fields.get(path).cloned()
    }
    fn id(&self) -> Uuid {
        self.id
    }
}

struct FakeTransaction;
impl Transaction for FakeTransaction {
    fn commit(self: Box<Self>) -> anyhow::Result<()> {
        Ok(())
    }
    fn rollback(self: Box<Self>) -> anyhow::Result<()> {
        Ok(())
    }
}

/// A connection whose responses are scripted entirely by the test: a
/// fixed row set for `query`/`query_one`, optionally failing whenever a
/// rendered query contains `fail_on`.
struct FakeConnection {
    rows: Vec<HashMap<String, RowValue>>,
    count: i64,
    fail_on: Option<&'static str>,
    queries: RefCell<Vec<String>>,
}

impl FakeConnection {
    fn with_count(count: i64) -> Self {
        FakeConnection {
            rows: Vec::new(),
            count,
            fail_on: None,
            queries: RefCell::new(Vec::new()),
        }
    }

    fn with_rows(rows: Vec<HashMap<String, RowValue>>) -> Self {
        FakeConnection {
            rows,
            count: 0,
            fail_on: None,
            queries: RefCell::new(Vec::new()),
        }
    }
}

impl Connection for FakeConnection {
    fn query(&mut self, text: &str, _vars: &[(&str, VarValue)]) -> anyhow::Result<Vec<Box<dyn Row>>> {
        self.queries.borrow_mut().push(text.to_string());
        if let Some(marker) = self.fail_on {
            if text.contains(marker) {
                anyhow::bail!("simulated failure");
            }
        }
        Ok(self
            .rows
            .iter()
            .map(|fields| {
                Box::new(FakeRow {
                    id: Uuid::new_v4(),
                    fields: fields.clone(),
                }) as Box<dyn Row>
            })
            .collect())
    }

    fn query_one(&mut self, text: &str, _vars: &[(&str, VarValue)]) -> anyhow::Result<Box<dyn Row>> {
        self.queries.borrow_mut().push(text.to_string());
        if let Some(marker) = self.fail_on {
            if text.contains(marker) {
                anyhow::bail!("simulated failure");
            }
        }
        let mut fields = HashMap::new();
        fields.insert("count".to_string(), RowValue::Int(self.count));
        Ok(Box::new(FakeRow {
            id: Uuid::new_v4(),
            fields,
        }))
    }

    fn transaction(&mut self) -> anyhow::Result<Box<dyn Transaction + '_>> {
        Ok(Box::new(FakeTransaction))
    }
}

fn row_with_location(filename: &str) -> HashMap<String, RowValue> {
    let mut fields = HashMap::new();
    fields.insert("_module.filename".to_string(), RowValue::Str(filename.to_string()));
    fields.insert("lineno".to_string(), RowValue::Int(3));
    fields.insert("col_offset".to_string(), RowValue::Int(0));
    fields.insert("end_lineno".to_string(), RowValue::Int(3));
    fields.insert("end_col_offset".to_string(), RowValue::Int(7));
    fields
}

#[test]
fn scenario_1_results_carry_source_and_filename() {
    let mut conn = FakeConnection::with_rows(vec![row_with_location("a.py")]);
    let outcome = run_query(&mut conn, "Name()", false, 10, |filename, location| {
        assert_eq!(filename, "a.py");
        assert!(location.is_some());
        Some("name_here".to_string())
    })
    .unwrap();

    match outcome {
        QueryOutcome::Results(rows) => {
            assert_eq!(rows.len(), 1);
            assert_eq!(rows[0].filename, "a.py");
            assert_eq!(rows[0].source.as_deref(), Some("name_here"));
        }
        QueryOutcome::Stats(_) => panic!("expected results"),
    }
}

#[test]
fn scenario_2_stats_mode_returns_single_integer() {
    let mut conn = FakeConnection::with_count(42);
    let outcome = run_query(&mut conn, "Name(id=\"foo\")", true, 10, |_, _| None).unwrap();
    assert!(matches!(outcome, QueryOutcome::Stats(42)));
}

#[test]
fn scenario_3_module_root_has_no_locations() {
    let mut fields = HashMap::new();
    fields.insert("filename".to_string(), RowValue::Str("pkg/__init__.py".to_string()));
    let mut conn = FakeConnection::with_rows(vec![fields]);

    let outcome = run_query(&mut conn, "Module()", false, 10, |filename, location| {
        assert_eq!(filename, "pkg/__init__.py");
        assert!(location.is_none());
        None
    })
    .unwrap();

    match outcome {
        QueryOutcome::Results(rows) => assert_eq!(rows.len(), 1),
        QueryOutcome::Stats(_) => panic!("expected results"),
    }
}

#[test]
fn scenario_4_arg_filename_is_read_through_the_annotation_back_pointer() {
    let mut fields = HashMap::new();
    fields.insert(
        "annotation._module.filename".to_string(),
        RowValue::Str("pkg/handler.py".to_string()),
    );
    fields.insert("lineno".to_string(), RowValue::Int(12));
    fields.insert("col_offset".to_string(), RowValue::Int(4));
    fields.insert("end_lineno".to_string(), RowValue::Int(12));
    fields.insert("end_col_offset".to_string(), RowValue::Int(20));
    let mut conn = FakeConnection::with_rows(vec![fields]);

    let outcome = run_query(
        &mut conn,
        "Arg(annotation=Name())",
        false,
        10,
        |filename, location| {
            assert_eq!(filename, "pkg/handler.py");
            assert!(location.is_some());
            None
        },
    )
    .unwrap();

    match outcome {
        QueryOutcome::Results(rows) => {
            assert_eq!(rows.len(), 1);
            assert_eq!(rows[0].filename, "pkg/handler.py");
        }
        QueryOutcome::Stats(_) => panic!("expected results"),
    }
}

#[test]
fn scenario_5_arg_without_annotation_fails_with_constraint_violation() {
    let mut conn = FakeConnection::with_rows(vec![]);
    let err = run_query(&mut conn, "Arg()", false, 10, |_, _| None).unwrap_err();
    assert!(err.message.contains("annotation"));
}

#[test]
fn scenario_6_unknown_node_kind_fails() {
    let mut conn = FakeConnection::with_rows(vec![]);
    let err = run_query(&mut conn, "Foo()", false, 10, |_, _| None).unwrap_err();
    assert!(err.message.contains("unknown node kind"));
}

#[test]
fn scenario_7_logical_or_matches_either_branch() {
    let mut conn = FakeConnection::with_rows(vec![row_with_location("b.py")]);
    let outcome = run_query(
        &mut conn,
        "Call(func=Name() | Attribute())",
        false,
        10,
        |_, _| None,
    )
    .unwrap();
    assert!(matches!(outcome, QueryOutcome::Results(rows) if rows.len() == 1));
}

#[test]
fn slice_failure_degrades_to_null_source_without_failing_the_query() {
    let mut conn = FakeConnection::with_rows(vec![row_with_location("missing.py")]);
    let outcome = run_query(&mut conn, "Name()", false, 10, |_, _| None).unwrap();
    match outcome {
        QueryOutcome::Results(rows) => {
            assert_eq!(rows.len(), 1);
            assert!(rows[0].source.is_none());
        }
        QueryOutcome::Stats(_) => panic!("expected results"),
    }
}

#[test]
fn get_stats_reports_every_requested_kind_and_populates_the_cache() {
    let mut conn = FakeConnection::with_count(7);
    let mut cache = StatsCache::new();
    let kinds = vec!["Name".to_string(), "Call".to_string()];

    let counts = get_stats(&mut conn, &kinds, Some(&mut cache)).unwrap();
    assert_eq!(counts.get("Name"), Some(&7));
    assert_eq!(counts.get("Call"), Some(&7));
    assert_eq!(conn.queries.borrow().len(), 2);

    // Second call hits the cache: no further queries issued.
    let counts_again = get_stats(&mut conn, &kinds, Some(&mut cache)).unwrap();
    assert_eq!(counts_again, counts);
    assert_eq!(conn.queries.borrow().len(), 2);
}

#[test]
fn get_stats_defaults_node_kinds_when_none_given() {
    let mut conn = FakeConnection::with_count(1);
    let counts = get_stats(&mut conn, &[], None).unwrap();
    assert_eq!(counts.len(), reiz_core::DEFAULT_NODE_KINDS.len());
}

struct IngestNode {
    kind: &'static str,
    fields: Vec<(&'static str, IngestField)>,
}

enum IngestField {
    Str(String),
    None,
    Child(Box<IngestNode>),
}

impl SyntaxNode for IngestNode {
    fn kind_name(&self) -> &str {
        self.kind
    }
    fn fields(&self) -> Vec<(&str, FieldValue<'_>)> {
        self.fields
            .iter()
            .map(|(name, field)| {
                let value = match field {
                    IngestField::Str(s) => FieldValue::Atomic(AtomicValue::Str(s.clone())),
                    IngestField::None => FieldValue::None,
                    IngestField::Child(child) => FieldValue::Node(child.as_ref()),
                };
                (*name, value)
            })
            .collect()
    }
    fn locations(&self) -> Vec<(&str, i64)> {
        Vec::new()
    }
}

#[test]
fn ingestion_scenario_empty_file_inserts_one_module_row() {
    let mut conn = FakeConnection::with_rows(vec![]);
    let tree = IngestNode {
        kind: "Module",
        fields: vec![("body", IngestField::None), ("filename", IngestField::None)],
    };
    let ok = ingest_file(&mut conn, &tree, "empty.py", None);
    assert!(ok);
    let queries = conn.queries.borrow();
    assert!(queries.iter().any(|q| q.contains("INSERT AST::Module")));
}

#[test]
fn ingestion_scenario_failed_insert_leaves_no_trace() {
    let mut conn = FakeConnection::with_rows(vec![]);
    conn.fail_on = Some("INSERT AST::Module");
    let tree = IngestNode {
        kind: "Module",
        fields: vec![("body", IngestField::None), ("filename", IngestField::None)],
    };
    let ok = ingest_file(&mut conn, &tree, "broken.py", None);
    assert!(!ok);
    // No post-insert update ever ran, since the root insert never succeeded.
    assert!(conn
        .queries
        .borrow()
        .iter()
        .all(|q| !q.starts_with("UPDATE")));
}
