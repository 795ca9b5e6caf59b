//! Serialize pass: lowers a concrete syntax tree into a sequence of
//! `Insert` statements that reconstruct it as linked database rows
//! (`spec.md` §4.3.2). Grounded 1:1 on
//! `original_source/reiz/serialization/serializer.py`.

use indexmap::IndexMap;
use uuid::Uuid;

use crate::error::{Error, Reason};
use crate::gqa::{self, Insert, Render, Select, Selector, Value};
use crate::iface::{AtomicValue, Connection, FieldValue, Row, SyntaxNode, VarValue};
use crate::schema::{self, Kind};

/// Mutable per-ingestion state threaded through serialization
/// (`spec.md` §3.4). Scoped to one `ingest_file` call.
#[derive(Debug, Default)]
pub struct QLState {
    /// Fields pre-populated by the caller (e.g. a project reference) that
    /// override whatever `serialize` would otherwise compute for the root.
    pub fields: IndexMap<String, Value>,
    /// The node kind currently being serialized, for error messages.
    pub from_parent: Option<String>,
    /// Row ids of every node inserted this ingestion, in insertion order.
    pub reference_pool: Vec<Uuid>,
}

impl QLState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fields(fields: IndexMap<String, Value>) -> Self {
        QLState {
            fields,
            ..Self::default()
        }
    }
}

/// Serializes one syntax-tree node into a `Value` referencing the row
/// `insert` creates for it, recording the new id in the reference pool
/// (`spec.md` §4.3.2 "Tree node").
pub fn serialize_node(
    node: &dyn SyntaxNode,
    state: &mut QLState,
    connection: &mut dyn Connection,
) -> Result<Value, Error> {
    let kind = Kind::from_name(node.kind_name()).ok_or_else(|| {
        Error::new(Reason::UnknownNodeKind {
            name: node.kind_name().to_string(),
        })
    })?;

    let row = insert(node, kind, state, connection)?;
    state.reference_pool.push(row.id());

    Ok(Value::Select(Box::new(Select {
        name: kind.base().name().to_string(),
        selections: Vec::new(),
        filters: Some(crate::gqa::FilterExpr::item(
            "id",
            Value::Ref(row.id()),
            crate::gqa::CompareOp::Eq,
        )),
        limit: Some(1),
    })))
}

/// Serializes one field value, polymorphic over its shape
/// (`spec.md` §4.3.2).
fn serialize_field(
    value: &FieldValue<'_>,
    state: &mut QLState,
    connection: &mut dyn Connection,
) -> Result<Value, Error> {
    match value {
        FieldValue::Atomic(AtomicValue::Int(n)) => Ok(Value::Literal(gqa::Literal::Int(*n))),
        FieldValue::Atomic(AtomicValue::Str(s)) => Ok(Value::Literal(gqa::Literal::Str(s.clone()))),
        FieldValue::Atomic(AtomicValue::Bool(b)) => {
            // The schema has no boolean GQA literal; booleans are cast the
            // same way enumerators are, tagging them with their atomic type.
            Ok(Value::Cast {
                ty: "bool".to_string(),
                value: Box::new(Value::Literal(gqa::Literal::Bool(*b))),
            })
        }
        FieldValue::None => serialize_sentinel(state, connection),
        FieldValue::Enum(variant) => {
            let base = schema::enum_base_of(variant).ok_or_else(|| {
                Error::new(Reason::UnknownField {
                    kind: "enum".to_string(),
                    field: (*variant).to_string(),
                })
            })?;
            Ok(Value::Cast {
                ty: base.name().to_string(),
                value: Box::new(Value::Literal(gqa::Literal::Str((*variant).to_string()))),
            })
        }
        FieldValue::Node(child) => serialize_node(*child, state, connection),
        FieldValue::List(items) => {
            let mut lowered = Vec::with_capacity(items.len());
            let mut all_atomic = true;
            for item in items {
                if !matches!(item, FieldValue::Atomic(_) | FieldValue::Enum(_)) {
                    all_atomic = false;
                }
                lowered.push(serialize_field(item, state, connection)?);
            }
            if all_atomic {
                Ok(Value::Set(lowered))
            } else {
                Ok(Value::CustomList(lowered))
            }
        }
    }
}

fn serialize_sentinel(
    state: &mut QLState,
    connection: &mut dyn Connection,
) -> Result<Value, Error> {
    struct SentinelNode;
    impl SyntaxNode for SentinelNode {
        fn kind_name(&self) -> &str {
            "Sentinel"
        }
        fn fields(&self) -> Vec<(&str, FieldValue<'_>)> {
            Vec::new()
        }
        fn locations(&self) -> Vec<(&str, i64)> {
            Vec::new()
        }
    }
    serialize_node(&SentinelNode, state, connection)
}

/// Inserts one row for `node`, honoring any pre-populated
/// `QLState::fields` overrides (`spec.md` §4.3.2 "Tree node").
fn insert(
    node: &dyn SyntaxNode,
    kind: Kind,
    state: &mut QLState,
    connection: &mut dyn Connection,
) -> Result<Box<dyn Row>, Error> {
    state.from_parent = Some(kind.name().to_string());

    let mut fields = IndexMap::new();
    for (name, value) in node.fields() {
        if let Some(overridden) = state.fields.get(name) {
            fields.insert(name.to_string(), overridden.clone());
            continue;
        }
        if matches!(value, FieldValue::None) {
            // An absent, non-overridden field is simply omitted from the
            // `Insert`, same as `if value is None: continue` in the source
            // `insert()`. The `Sentinel` substitution only fires for a
            // `None` reached while serializing a list element, via
            // `serialize_field`'s list arm.
            continue;
        }
        fields.insert(name.to_string(), serialize_field(&value, state, connection)?);
    }
    for (name, lineno) in node.locations() {
        fields.insert(name.to_string(), Value::Literal(gqa::Literal::Int(lineno)));
    }

    let query = Insert::new(kind.name(), fields).rendered();
    log::trace!("running query: {query:?}");
    connection
        .query_one(&query, &[])
        .map_err(|e| Error::new(Reason::Execution(e.to_string())))
}

/// Ingests one parsed source file under a single transaction, then stamps
/// `_module` back-pointers on every inserted row whose kind is
/// module-annotated (`spec.md` §4.3.2 "Module ingestion protocol").
/// Guarded: any failure aborts the transaction and returns `false`, never
/// panics or leaks partial state (`spec.md` §6, §7 "Ingestion failure").
pub fn ingest_file(
    connection: &mut dyn Connection,
    tree: &dyn SyntaxNode,
    filename: &str,
    project_ref: Option<Value>,
) -> bool {
    match ingest_file_inner(connection, tree, filename, project_ref) {
        Ok(()) => true,
        Err(err) => {
            log::warn!("ingestion of {filename:?} failed: {err}");
            false
        }
    }
}

fn ingest_file_inner(
    connection: &mut dyn Connection,
    tree: &dyn SyntaxNode,
    filename: &str,
    project_ref: Option<Value>,
) -> Result<(), Error> {
    let mut fields = IndexMap::new();
    fields.insert(
        "filename".to_string(),
        Value::Literal(gqa::Literal::Str(filename.to_string())),
    );
    if let Some(project_ref) = project_ref {
        fields.insert("project".to_string(), project_ref);
    }

    let mut state = QLState::with_fields(fields);

    let txn = connection
        .transaction()
        .map_err(|e| Error::new(Reason::Execution(e.to_string())))?;

    let module = match serialize_node(tree, &mut state, connection) {
        Ok(module) => module,
        Err(err) => {
            let _ = txn.rollback();
            return Err(err);
        }
    };

    if let Err(err) = stamp_module_back_pointers(connection, &state, module) {
        let _ = txn.rollback();
        return Err(err);
    }

    txn.commit()
        .map_err(|e| Error::new(Reason::Execution(e.to_string())))
}

fn stamp_module_back_pointers(
    connection: &mut dyn Connection,
    state: &QLState,
    module_select: Value,
) -> Result<(), Error> {
    let ids = state.reference_pool.clone();
    for base in schema::module_annotated_bases() {
        let mut assigns = IndexMap::new();
        assigns.insert("_module".to_string(), module_select.clone());

        let filters = crate::gqa::FilterExpr::item(
            "id",
            Value::Call {
                func: "array_unpack".to_string(),
                args: vec![Value::Cast {
                    ty: "array<uuid>".to_string(),
                    value: Box::new(Value::Variable("ids".to_string())),
                }],
            },
            crate::gqa::CompareOp::Contains,
        );

        let update = crate::gqa::Update {
            name: base.name().to_string(),
            filters,
            assigns,
        }
        .rendered();

        log::trace!("running post-insert query: {update:?}");
        connection
            .query(&update, &[("ids", VarValue::Uuids(ids.clone()))])
            .map_err(|e| Error::new(Reason::Execution(e.to_string())))?;
    }
    Ok(())
}
