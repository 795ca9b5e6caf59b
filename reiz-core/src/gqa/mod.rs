//! Graph-query algebra (GQA): an algebraic representation of the backing
//! store's query language, with a single total rendering entry point
//! (`spec.md` §3, §4.1).
//!
//! Grounded on `original_source/reiz/ql/edgeql.py` (`Select`, `Insert`,
//! `Update`, `Filter`, `FilterItem`, `Call`, `CastOf`, `Variable`,
//! `ListOf`/`EdgeQLReizCustomList`) and, for the rendering-trait shape, on
//! `prql-compiler`'s `codegen::WriteSource` — simplified here because GQA
//! never needs line-width-aware wrapping, every impl just appends to a
//! buffer.

mod value;

pub use value::{Literal, Value};

use indexmap::IndexMap;

use crate::schema::protected_name;

/// Total rendering to the backing store's textual query language.
///
/// Every public constructor produces a tree that renders to a non-empty
/// string (testable property 1, `spec.md` §8); there is no fallible path
/// through `render`.
pub trait Render {
    fn render(&self, out: &mut String);

    fn rendered(&self) -> String {
        let mut out = String::new();
        self.render(&mut out);
        out
    }
}

/// Top-level entry point named in `spec.md` §6 ("`as_edgeql(node)`").
pub fn as_edgeql<T: Render>(node: &T) -> String {
    node.rendered()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
    In,
}

impl LogicalOp {
    fn keyword(self) -> &'static str {
        match self {
            LogicalOp::And => "AND",
            LogicalOp::Or => "OR",
            LogicalOp::In => "IN",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Contains,
}

impl CompareOp {
    fn symbol(self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Contains => "in",
        }
    }
}

/// A filter expression over the currently selected node.
#[derive(Debug, Clone)]
pub enum FilterExpr {
    Item {
        key: String,
        value: Value,
        op: CompareOp,
    },
    Tree {
        left: Box<FilterExpr>,
        right: Box<FilterExpr>,
        op: LogicalOp,
    },
    /// Negation of an inner filter. Not a distinct variant in the source
    /// `Filter`/`FilterItem` classes (see `original_source/reiz/ql/edgeql.py`);
    /// added here to resolve the open question in `spec.md` §9 on negated
    /// `CONTAINS` ("no element equals"), applied uniformly to negated `EQ`
    /// too so there is exactly one rendering rule for `!`.
    Not(Box<FilterExpr>),
}

impl FilterExpr {
    pub fn item(key: impl Into<String>, value: Value, op: CompareOp) -> Self {
        FilterExpr::Item {
            key: key.into(),
            value,
            op,
        }
    }

    pub fn and(self, other: FilterExpr) -> Self {
        FilterExpr::Tree {
            left: Box::new(self),
            right: Box::new(other),
            op: LogicalOp::And,
        }
    }

    pub fn or(self, other: FilterExpr) -> Self {
        FilterExpr::Tree {
            left: Box::new(self),
            right: Box::new(other),
            op: LogicalOp::Or,
        }
    }

    pub fn negate(self) -> Self {
        FilterExpr::Not(Box::new(self))
    }
}

impl Render for FilterExpr {
    fn render(&self, out: &mut String) {
        match self {
            FilterExpr::Item { key, value, op } => {
                out.push('.');
                out.push_str(&protected_name(key, false));
                out.push(' ');
                out.push_str(op.symbol());
                out.push(' ');
                value.render(out);
            }
            FilterExpr::Tree { left, right, op } => {
                out.push('(');
                left.render(out);
                out.push(')');
                out.push(' ');
                out.push_str(op.keyword());
                out.push(' ');
                out.push('(');
                right.render(out);
                out.push(')');
            }
            FilterExpr::Not(inner) => {
                out.push_str("NOT (");
                inner.render(out);
                out.push(')');
            }
        }
    }
}

/// Folds `arguments` into a left-associative `AND`-tree of `Item`s, in the
/// map's iteration order (`spec.md` §4.1, design note on `make_filter`
/// order — callers must supply a deterministic iteration, which
/// `IndexMap` gives by construction).
pub fn make_filter(arguments: IndexMap<String, Value>) -> Option<FilterExpr> {
    let mut iter = arguments.into_iter();
    let (first_key, first_value) = iter.next()?;
    let mut tree = FilterExpr::item(first_key, first_value, CompareOp::Eq);
    for (key, value) in iter {
        tree = tree.and(FilterExpr::item(key, value, CompareOp::Eq));
    }
    Some(tree)
}

/// A projection clause inside a `Select`, optionally nested.
#[derive(Debug, Clone)]
pub struct Selector {
    pub key: String,
    pub subselections: Vec<Selector>,
}

impl Selector {
    pub fn new(key: impl Into<String>) -> Self {
        Selector {
            key: key.into(),
            subselections: Vec::new(),
        }
    }

    pub fn nested(key: impl Into<String>, subselections: Vec<Selector>) -> Self {
        Selector {
            key: key.into(),
            subselections,
        }
    }
}

impl Render for Selector {
    fn render(&self, out: &mut String) {
        out.push_str(&protected_name(&self.key, false));
        if !self.subselections.is_empty() {
            out.push_str(" { ");
            for (i, sub) in self.subselections.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                sub.render(out);
            }
            out.push_str(" }");
        }
    }
}

#[derive(Debug, Clone)]
pub struct Select {
    pub name: String,
    pub selections: Vec<Selector>,
    pub filters: Option<FilterExpr>,
    pub limit: Option<i64>,
}

impl Select {
    pub fn new(name: impl Into<String>) -> Self {
        Select {
            name: name.into(),
            selections: Vec::new(),
            filters: None,
            limit: None,
        }
    }

    pub fn with_filters(mut self, filters: FilterExpr) -> Self {
        self.filters = Some(filters);
        self
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }
}

impl Render for Select {
    fn render(&self, out: &mut String) {
        out.push_str("SELECT ");
        out.push_str(&protected_name(&self.name, true));
        if !self.selections.is_empty() {
            out.push_str(" { ");
            for (i, sel) in self.selections.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                sel.render(out);
            }
            out.push_str(" }");
        }
        if let Some(filters) = &self.filters {
            out.push_str(" FILTER ");
            filters.render(out);
        }
        if let Some(limit) = self.limit {
            out.push_str(&format!(" LIMIT {limit}"));
        }
    }
}

#[derive(Debug, Clone)]
pub struct Insert {
    pub name: String,
    pub fields: IndexMap<String, Value>,
}

impl Insert {
    pub fn new(name: impl Into<String>, fields: IndexMap<String, Value>) -> Self {
        Insert {
            name: name.into(),
            fields,
        }
    }
}

impl Render for Insert {
    fn render(&self, out: &mut String) {
        out.push_str("INSERT ");
        out.push_str(&protected_name(&self.name, true));
        if !self.fields.is_empty() {
            out.push_str(" { ");
            for (i, (key, value)) in self.fields.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                out.push_str(&protected_name(key, false));
                out.push_str(" := ");
                value.render(out);
            }
            out.push_str(" }");
        }
    }
}

#[derive(Debug, Clone)]
pub struct Update {
    pub name: String,
    pub filters: FilterExpr,
    pub assigns: IndexMap<String, Value>,
}

impl Render for Update {
    fn render(&self, out: &mut String) {
        out.push_str("UPDATE ");
        out.push_str(&protected_name(&self.name, true));
        out.push_str(" FILTER ");
        self.filters.render(out);
        out.push_str(" SET { ");
        for (i, (key, value)) in self.assigns.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            out.push_str(&protected_name(key, false));
            out.push_str(" := ");
            value.render(out);
        }
        out.push_str(" }");
    }
}
