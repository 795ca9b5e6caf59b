//! External interfaces the core consumes: a database connection and a
//! parsed source syntax tree (`spec.md` §6, "Consumer side"). Neither
//! trait is implemented here — the HTTP surface, DB driver and upstream
//! parser are all out of scope (`spec.md` §1) and provide their own
//! implementations.

use anyhow::Result;
use uuid::Uuid;

/// An atomic field value as the upstream parser hands it over, before the
/// serializer turns it into a GQA literal (`spec.md` §3, `ATOMIC_TYPES`).
#[derive(Debug, Clone, PartialEq)]
pub enum AtomicValue {
    Int(i64),
    Str(String),
    Bool(bool),
}

/// A value bound into a rendered query via a `$name` [`crate::gqa::Value::Variable`].
#[derive(Debug, Clone)]
pub enum VarValue {
    Str(String),
    Int(i64),
    Uuids(Vec<Uuid>),
}

/// A value read back out of a [`Row`].
#[derive(Debug, Clone, PartialEq)]
pub enum RowValue {
    Str(String),
    Int(i64),
    Bool(bool),
    Uuid(Uuid),
    None,
}

/// One row of a query result. Field access is by name, including the
/// dotted paths produced by nested `Selector`s (e.g. `"_module.filename"`,
/// `spec.md` §6).
pub trait Row {
    fn get(&self, path: &str) -> Option<RowValue>;
    fn id(&self) -> Uuid;
}

/// A handle scoping a set of writes. Committing or rolling back consumes
/// it, matching the backing store's transaction lifetime
/// (`spec.md` §4.3.2, §5 "ordering").
pub trait Transaction {
    fn commit(self: Box<Self>) -> Result<()>;
    fn rollback(self: Box<Self>) -> Result<()>;
}

/// A database connection capable of executing a rendered graph-query
/// string and returning structured rows (`spec.md` §6). Deliberately
/// synchronous/blocking — `reiz-core` has no internal concurrency
/// (`spec.md` §5) and never depends on an async runtime; the caller picks
/// how connections get scheduled.
pub trait Connection {
    fn query(&mut self, text: &str, vars: &[(&str, VarValue)]) -> Result<Vec<Box<dyn Row>>>;
    fn query_one(&mut self, text: &str, vars: &[(&str, VarValue)]) -> Result<Box<dyn Row>>;
    fn transaction(&mut self) -> Result<Box<dyn Transaction + '_>>;
}

/// A single value of a [`SyntaxNode`] field.
pub enum FieldValue<'a> {
    Atomic(AtomicValue),
    Node(&'a dyn SyntaxNode),
    /// An enumerator: the concrete variant name (e.g. `"Add"`), tagged
    /// separately from a node so the serializer can `Cast` it without
    /// recursing into `insert` (`spec.md` §3, `ENUM_TYPES`).
    Enum(&'a str),
    List(Vec<FieldValue<'a>>),
    None,
}

/// One node of the upstream parser's syntax tree. `reiz-core` never reads
/// source files itself (`spec.md` §1) — this trait is the entire surface
/// it needs from whatever produced the tree.
pub trait SyntaxNode {
    /// The node-kind name, matched against [`crate::schema::Kind`].
    fn kind_name(&self) -> &str;
    /// Declared children, in schema field order.
    fn fields(&self) -> Vec<(&str, FieldValue<'_>)>;
    /// Location attributes present on this node (`lineno`, `col_offset`,
    /// `end_lineno`, `end_col_offset`), empty for non-positional kinds.
    fn locations(&self) -> Vec<(&str, i64)>;
}
