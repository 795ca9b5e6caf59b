//! The value side of GQA: literals, references, casts, sets and the nested
//! query values a `Select`/`Insert` can itself hold.
//!
//! Grounded on `original_source/reiz/ql/edgeql.py`'s `CastOf`, `ListOf`
//! (rendered as `EdgeQLReizCustomList`), `Variable` and the bare literal
//! handling inside `FilterItem.construct`/`Insert.construct`.

use uuid::Uuid;

use super::{Insert, Render, Select};
use crate::schema::protected_name;

/// A scalar literal, rendered the way the backing query language spells it.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i64),
    Str(String),
    Bool(bool),
    /// The sentinel for an absent optional field (`Kind::Sentinel`
    /// serializes to this at the value level too).
    None,
}

impl Render for Literal {
    fn render(&self, out: &mut String) {
        match self {
            Literal::Int(n) => out.push_str(&n.to_string()),
            Literal::Str(s) => {
                out.push('"');
                for ch in s.chars() {
                    match ch {
                        '"' => out.push_str("\\\""),
                        '\\' => out.push_str("\\\\"),
                        '\n' => out.push_str("\\n"),
                        _ => out.push(ch),
                    }
                }
                out.push('"');
            }
            Literal::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
            Literal::None => out.push_str("{}"),
        }
    }
}

/// Any value a `Filter`/`Insert`/`Update` field can hold.
#[derive(Debug, Clone)]
pub enum Value {
    Literal(Literal),
    /// `<type>value`, used to tag an enumerator with its base type
    /// (`spec.md` §4.3.1 step 5).
    Cast { ty: String, value: Box<Value> },
    /// `<uuid>"<id>"`, a reference into the reference pool
    /// (`spec.md` §3.4 `QLState.reference_pool`).
    Ref(Uuid),
    /// `{a, b, c}`, an unordered set literal.
    Set(Vec<Value>),
    /// `func(args...)`.
    Call { func: String, args: Vec<Value> },
    /// A set wrapped for positional use against a `CONTAINS` filter
    /// (`EdgeQLReizCustomList` in the source implementation).
    CustomList(Vec<Value>),
    /// `$name`, a bound query parameter.
    Variable(String),
    /// A nested `SELECT`, used when a filter matches against a sub-query
    /// instead of a literal (e.g. `arg(annotation=...)`).
    Select(Box<Select>),
    /// A nested `INSERT`, used when a field's value is itself freshly
    /// inserted rather than referenced (`spec.md` §4.3.2, ingestion).
    Insert(Box<Insert>),
}

impl Render for Value {
    fn render(&self, out: &mut String) {
        match self {
            Value::Literal(lit) => lit.render(out),
            Value::Cast { ty, value } => {
                out.push('<');
                out.push_str(&protected_name(ty, false));
                out.push('>');
                value.render(out);
            }
            Value::Ref(id) => {
                out.push_str("<uuid>\"");
                out.push_str(&id.to_string());
                out.push('"');
            }
            Value::Set(items) => render_braced(items, out),
            Value::Call { func, args } => {
                out.push_str(func);
                out.push('(');
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    arg.render(out);
                }
                out.push(')');
            }
            Value::CustomList(items) => render_braced(items, out),
            Value::Variable(name) => {
                out.push('$');
                out.push_str(name);
            }
            Value::Select(select) => select.render(out),
            Value::Insert(insert) => insert.render(out),
        }
    }
}

fn render_braced(items: &[Value], out: &mut String) {
    out.push('{');
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        item.render(out);
    }
    out.push('}');
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_literal_escapes_quotes() {
        let value = Value::Literal(Literal::Str("a\"b".to_string()));
        assert_eq!(value.rendered(), "\"a\\\"b\"");
    }

    #[test]
    fn cast_wraps_value_in_angle_brackets() {
        let value = Value::Cast {
            ty: "Operator".to_string(),
            value: Box::new(Value::Literal(Literal::Str("Add".to_string()))),
        };
        assert_eq!(value.rendered(), "<Operator>\"Add\"");
    }

    #[test]
    fn reference_renders_as_uuid_cast() {
        let id = Uuid::nil();
        let value = Value::Ref(id);
        assert_eq!(value.rendered(), format!("<uuid>\"{id}\""));
    }

    #[test]
    fn set_and_custom_list_share_brace_rendering() {
        let items = vec![Value::Literal(Literal::Int(1)), Value::Literal(Literal::Int(2))];
        assert_eq!(Value::Set(items.clone()).rendered(), "{1, 2}");
        assert_eq!(Value::CustomList(items).rendered(), "{1, 2}");
    }

    #[test]
    fn variable_renders_with_dollar_sigil() {
        assert_eq!(Value::Variable("name".to_string()).rendered(), "$name");
    }
}
