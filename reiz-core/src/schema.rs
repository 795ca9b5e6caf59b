//! The node-kind schema: a closed classification of the source syntax tree
//! the serializer populates and the compiler matches against.
//!
//! Grounded on `original_source/reiz/db/schema.py` (as referenced from
//! `edgeql.py` and `serializer.py`) — `ATOMIC_TYPES`, `ENUM_TYPES`,
//! `MODULE_ANNOTATED_TYPES` and `protected_name` all name real constructs
//! from that module; this is a bounded, hand-authored Rust rendition of a
//! Python-AST-shaped schema rather than the full CPython grammar (see
//! `SPEC_FULL.md` §3.3).

use std::collections::HashSet;

use once_cell::sync::Lazy;
use strum::AsRefStr;

/// The abstract bases used for upcasting a concrete node during selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Base {
    Ast,
    Mod,
    Stmt,
    Expr,
}

impl Base {
    pub fn name(self) -> &'static str {
        match self {
            Base::Ast => "AST",
            Base::Mod => "mod",
            Base::Stmt => "stmt",
            Base::Expr => "expr",
        }
    }
}

/// Whether a field holds a single child or a sequence of children; the
/// compiler uses this to decide between `EQ` and `CONTAINS` when comparing
/// a nested matcher against a field (`spec.md` §4.3.1 step 3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    Scalar,
    Collection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub cardinality: Cardinality,
}

const fn scalar(name: &'static str) -> FieldSpec {
    FieldSpec {
        name,
        cardinality: Cardinality::Scalar,
    }
}

const fn many(name: &'static str) -> FieldSpec {
    FieldSpec {
        name,
        cardinality: Cardinality::Collection,
    }
}

/// Every concrete node kind the serializer and the ReizQL front-end know
/// about, plus [`Kind::Sentinel`], the stand-in for an absent optional
/// child (`spec.md` §4.3.2, §GLOSSARY).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr)]
pub enum Kind {
    Module,
    FunctionDef,
    ClassDef,
    Assign,
    Return,
    If,
    For,
    While,
    ExprStmt,
    Name,
    Call,
    Attribute,
    BinOp,
    Compare,
    Constant,
    Arg,
    Sentinel,
}

pub const ALL_KINDS: &[Kind] = &[
    Kind::Module,
    Kind::FunctionDef,
    Kind::ClassDef,
    Kind::Assign,
    Kind::Return,
    Kind::If,
    Kind::For,
    Kind::While,
    Kind::ExprStmt,
    Kind::Name,
    Kind::Call,
    Kind::Attribute,
    Kind::BinOp,
    Kind::Compare,
    Kind::Constant,
    Kind::Arg,
    Kind::Sentinel,
];

impl Kind {
    /// The textual node-kind name, as used both in ReizQL matches and as the
    /// `Insert`/`Select` name rendered into the graph query.
    pub fn name(self) -> &'static str {
        self.as_ref()
    }

    pub fn from_name(name: &str) -> Option<Kind> {
        ALL_KINDS.iter().copied().find(|k| k.name() == name)
    }

    pub fn base(self) -> Base {
        match self {
            Kind::Module => Base::Mod,
            Kind::FunctionDef
            | Kind::ClassDef
            | Kind::Assign
            | Kind::Return
            | Kind::If
            | Kind::For
            | Kind::While
            | Kind::ExprStmt => Base::Stmt,
            Kind::Name | Kind::Call | Kind::Attribute | Kind::BinOp | Kind::Compare
            | Kind::Constant | Kind::Arg => Base::Expr,
            Kind::Sentinel => Base::Ast,
        }
    }

    /// True iff this node kind carries `lineno`/`col_offset`/`end_lineno`/
    /// `end_col_offset`, i.e. is a valid positional matcher root
    /// (`spec.md` §3, "positional").
    pub fn is_positional(self) -> bool {
        !matches!(self, Kind::Module | Kind::Sentinel)
    }

    pub fn fields(self) -> &'static [FieldSpec] {
        match self {
            Kind::Module => &[many("body")],
            Kind::FunctionDef => &[scalar("name"), many("args"), many("body")],
            Kind::ClassDef => &[scalar("name"), many("bases"), many("body")],
            Kind::Assign => &[many("targets"), scalar("value")],
            Kind::Return => &[scalar("value")],
            Kind::If => &[scalar("test"), many("body"), many("orelse")],
            Kind::For => &[scalar("target"), scalar("iter"), many("body")],
            Kind::While => &[scalar("test"), many("body")],
            Kind::ExprStmt => &[scalar("value")],
            Kind::Name => &[scalar("id"), scalar("ctx")],
            Kind::Call => &[scalar("func"), many("args")],
            Kind::Attribute => &[scalar("value"), scalar("attr"), scalar("ctx")],
            Kind::BinOp => &[scalar("left"), scalar("op"), scalar("right")],
            Kind::Compare => &[scalar("left"), many("ops"), many("comparators")],
            Kind::Constant => &[scalar("value")],
            Kind::Arg => &[scalar("arg"), scalar("annotation")],
            Kind::Sentinel => &[],
        }
    }

    pub fn has_field(self, field: &str) -> bool {
        self.fields().iter().any(|f| f.name == field)
    }

    /// The field a bare (unnamed) argument fills in, e.g. `Name("x")` short
    /// for `Name(id="x")`. The schema's first declared field, by
    /// convention; node kinds with no fields (`Module`, `Sentinel`) accept
    /// no positional argument at all.
    pub fn positional_field(self) -> Option<&'static str> {
        self.fields().first().map(|f| f.name)
    }

    pub fn field_cardinality(self, field: &str) -> Option<Cardinality> {
        self.fields()
            .iter()
            .find(|f| f.name == field)
            .map(|f| f.cardinality)
    }
}

/// The leaf Rust types atomic fields serialize as literals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr)]
pub enum AtomicType {
    Int,
    Str,
    Bool,
}

/// The schema's tagged enumerators, each serialized via a `Cast` to its base
/// type (`spec.md` §4.3.1 step 5, §4.3.2 "Enumerator").
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr)]
pub enum EnumBase {
    Operator,
    CmpOp,
    BoolOp,
    ExprContext,
}

impl EnumBase {
    pub fn name(self) -> &'static str {
        self.as_ref()
    }

    pub fn variants(self) -> &'static [&'static str] {
        match self {
            EnumBase::Operator => &["Add", "Sub", "Mult", "Div", "Mod"],
            EnumBase::CmpOp => &["Eq", "NotEq", "Lt", "LtE", "Gt", "GtE"],
            EnumBase::BoolOp => &["And", "Or"],
            EnumBase::ExprContext => &["Load", "Store", "Del"],
        }
    }
}

pub const ALL_ENUM_BASES: &[EnumBase] = &[
    EnumBase::Operator,
    EnumBase::CmpOp,
    EnumBase::BoolOp,
    EnumBase::ExprContext,
];

/// Finds the enum base a bare variant name belongs to, e.g. `"Add"` →
/// `Operator`. Used to tag an enumerator with its base type when lowering
/// (`spec.md` §4.3.1 step 5, §4.3.2 "Enumerator").
pub fn enum_base_of(variant: &str) -> Option<EnumBase> {
    ALL_ENUM_BASES
        .iter()
        .copied()
        .find(|base| base.variants().contains(&variant))
}

/// The concrete node kinds whose rows receive a `_module` back-pointer
/// stamped by the post-insert `Update`s (`spec.md` §4.3.2 step 3,
/// `MODULE_ANNOTATED_TYPES`).
pub fn module_annotated_bases() -> impl Iterator<Item = Base> {
    [Base::Stmt, Base::Expr].into_iter()
}

/// Reserved words of the backing graph-query language; identifiers that
/// collide with one of these are escaped by [`protected_name`].
pub static RESERVED_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "select", "insert", "update", "delete", "filter", "limit", "set", "for", "in", "with",
        "module", "type", "function",
    ]
    .into_iter()
    .collect()
});

/// Escapes `name` if it collides with a reserved word, and prefixes it with
/// the schema namespace marker when `prefix` is set (referring to a node
/// kind or enum base type rather than a plain field name) — grounded in
/// `protected_name` from `original_source/reiz/ql/edgeql.py`'s imports.
pub fn protected_name(name: &str, prefix: bool) -> String {
    let escaped = if RESERVED_WORDS.contains(name) {
        format!("@{name}")
    } else {
        name.to_string()
    };
    if prefix {
        format!("AST::{escaped}")
    } else {
        escaped
    }
}
