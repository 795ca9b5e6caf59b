//! Compile pass: lowers a ReizQL pattern tree into a GQA `Select`, and
//! decorates the top-level `Select` for the query-execution protocol
//! (`spec.md` §4.3.1, §4.3.3). Grounded on `original_source/reiz/fetch.py`'s
//! `run_query` and `get_stats`.

use crate::error::{Error, Reason};
use crate::gqa::{self, CompareOp, FilterExpr, Select, Selector, Value};
use crate::reizql::{Literal, LogicalOp as MatchLogicalOp, Match, MatchValue};
use crate::schema::{Cardinality, Kind};

/// Lowers a validated pattern tree into a `Select` with constructed
/// `Filter` trees (`spec.md` §4.3.1 steps 1-5).
pub fn compile(tree: &Match) -> Result<Select, Error> {
    let kind = Kind::from_name(&tree.name).ok_or_else(|| {
        Error::new(Reason::UnknownNodeKind {
            name: tree.name.clone(),
        })
    })?;

    let mut filters: Option<FilterExpr> = None;
    for (key, value) in &tree.filters {
        if let Some(item) = lower_filter(kind, key, value)? {
            filters = Some(match filters {
                None => item,
                Some(tree) => tree.and(item),
            });
        }
    }

    Ok(Select {
        name: kind.name().to_string(),
        selections: Vec::new(),
        filters,
        limit: None,
    })
}

fn lower_filter(kind: Kind, key: &str, value: &MatchValue) -> Result<Option<FilterExpr>, Error> {
    match value {
        MatchValue::Wildcard => Ok(None),
        MatchValue::Negation(inner) => Ok(lower_filter(kind, key, inner)?.map(FilterExpr::negate)),
        MatchValue::Logical { op, left, right } => {
            let left = lower_filter(kind, key, left)?;
            let right = lower_filter(kind, key, right)?;
            Ok(match (left, right) {
                (Some(left), Some(right)) => Some(match op {
                    MatchLogicalOp::And => left.and(right),
                    MatchLogicalOp::Or => left.or(right),
                }),
                (Some(single), None) | (None, Some(single)) => Some(single),
                (None, None) => None,
            })
        }
        _ => {
            let rendered = lower_value(value)?;
            let op = match kind.field_cardinality(key) {
                Some(Cardinality::Collection) => CompareOp::Contains,
                _ => CompareOp::Eq,
            };
            Ok(Some(FilterExpr::item(key, rendered, op)))
        }
    }
}

/// Lowers a leaf `MatchValue` (atom, enumerator, nested matcher or
/// homogeneous list) into a GQA `Value`. Logical/negation/wildcard
/// combinators never reach this function — they are resolved to a
/// `FilterExpr` shape one level up, in [`lower_filter`].
fn lower_value(value: &MatchValue) -> Result<Value, Error> {
    match value {
        MatchValue::Atom(Literal::Str(s)) => Ok(Value::Literal(gqa::Literal::Str(s.clone()))),
        MatchValue::Atom(Literal::Integer(n)) => Ok(Value::Literal(gqa::Literal::Int(*n))),
        MatchValue::Atom(Literal::None) => Ok(Value::Literal(gqa::Literal::None)),
        MatchValue::Enum(name) => {
            let base = crate::schema::enum_base_of(name).ok_or_else(|| {
                Error::new(Reason::UnknownField {
                    kind: "enum".to_string(),
                    field: name.clone(),
                })
            })?;
            Ok(Value::Cast {
                ty: base.name().to_string(),
                value: Box::new(Value::Literal(gqa::Literal::Str(name.clone()))),
            })
        }
        MatchValue::Ref(inner) => Ok(Value::Select(Box::new(compile(inner)?))),
        MatchValue::List(items) => {
            let lowered: Vec<Value> = items.iter().map(lower_value).collect::<Result<_, _>>()?;
            if items.iter().all(is_atomic_or_enum) {
                Ok(Value::Set(lowered))
            } else {
                Ok(Value::CustomList(lowered))
            }
        }
        MatchValue::Logical { .. } | MatchValue::Negation(_) | MatchValue::Wildcard => {
            Err(Error::new(Reason::MatchingConstraintViolated(
                "logical, negation and wildcard matchers cannot appear inside a list".to_string(),
            )))
        }
    }
}

fn is_atomic_or_enum(value: &MatchValue) -> bool {
    matches!(value, MatchValue::Atom(_) | MatchValue::Enum(_))
}

/// Wraps a compiled `Select` for stats mode: `SELECT count(<inner>)`
/// (`spec.md` §4.3.1 "stats mode"). Rendered directly rather than forced
/// through `Select::name`, since the target is `count(...)`, not a node
/// kind.
pub fn wrap_for_stats(inner: Select) -> Value {
    Value::Call {
        func: "count".to_string(),
        args: vec![Value::Select(Box::new(inner))],
    }
}

/// Augments a compiled `Select` for the results path: sets `limit`, and
/// appends the selectors the query-execution protocol needs to recover
/// source locations (`spec.md` §4.3.1 "Result-shape decoration",
/// §4.3.3 step 3).
pub fn decorate_for_results(select: &mut Select, tree: &Match, limit: i64) -> Result<(), Error> {
    select.limit = Some(limit);

    if tree.positional {
        select.selections.extend([
            Selector::new("lineno"),
            Selector::new("col_offset"),
            Selector::new("end_lineno"),
            Selector::new("end_col_offset"),
        ]);

        let module_selector = Selector::nested("_module", vec![Selector::new("filename")]);

        if tree.name == "Arg" || tree.name == "arg" {
            if !tree.filters.contains_key("annotation") {
                return Err(Error::new(Reason::MatchingConstraintViolated(
                    "matching arg() without a valid annotation is not possible".to_string(),
                )));
            }
            select
                .selections
                .push(Selector::nested("annotation", vec![module_selector]));
        } else {
            select.selections.push(module_selector);
        }
    } else if tree.name == "Module" {
        select.selections.push(Selector::new("filename"));
    } else {
        return Err(Error::new(Reason::UnexpectedRoot {
            kind: tree.name.clone(),
        }));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gqa::Render;
    use crate::reizql;
    use indexmap::IndexMap;

    fn match_of(name: &str, filters: Vec<(&str, MatchValue)>, positional: bool) -> Match {
        let mut map = IndexMap::new();
        for (k, v) in filters {
            map.insert(k.to_string(), v);
        }
        Match {
            name: name.to_string(),
            filters: map,
            positional,
        }
    }

    #[test]
    fn compile_is_deterministic() {
        let tree = reizql::parse("Name(id=\"foo\")").unwrap();
        let a = compile(&tree).unwrap().rendered();
        let b = compile(&tree).unwrap().rendered();
        assert_eq!(a, b);
    }

    #[test]
    fn scenario_1_results_decoration() {
        let tree = reizql::parse("Name()").unwrap();
        let mut select = compile(&tree).unwrap();
        decorate_for_results(&mut select, &tree, 10).unwrap();
        let rendered = select.rendered();
        assert!(rendered.starts_with("SELECT AST::Name {"));
        assert!(rendered.contains("lineno"));
        assert!(rendered.contains("_module { filename }"));
        assert!(rendered.ends_with("LIMIT 10"));
    }

    #[test]
    fn scenario_2_stats_decoration() {
        let tree = reizql::parse("Name(id=\"foo\")").unwrap();
        let select = compile(&tree).unwrap();
        let stats = wrap_for_stats(select);
        assert_eq!(
            format!("SELECT {}", stats.rendered()),
            "SELECT count(SELECT AST::Name FILTER .id = \"foo\")"
        );
    }

    #[test]
    fn scenario_3_module_root_has_no_locations() {
        let tree = reizql::parse("Module()").unwrap();
        let mut select = compile(&tree).unwrap();
        decorate_for_results(&mut select, &tree, 10).unwrap();
        let rendered = select.rendered();
        assert!(rendered.contains("filename"));
        assert!(!rendered.contains("lineno"));
    }

    #[test]
    fn scenario_4_arg_back_pointer_goes_through_annotation() {
        let tree = reizql::parse("Arg(annotation=Name())").unwrap();
        let mut select = compile(&tree).unwrap();
        decorate_for_results(&mut select, &tree, 10).unwrap();
        let rendered = select.rendered();
        assert!(rendered.contains("annotation { _module { filename } }"));
        assert!(!rendered.contains("} _module"));
    }

    #[test]
    fn scenario_5_arg_without_annotation_fails() {
        let tree = match_of("Arg", vec![], true);
        let mut select = compile(&tree).unwrap();
        let err = decorate_for_results(&mut select, &tree, 10).unwrap_err();
        assert!(matches!(err.reason, Reason::MatchingConstraintViolated(_)));
    }

    #[test]
    fn scenario_7_logical_or_over_nested_matches() {
        let tree = reizql::parse("Call(func=Name() | Attribute())").unwrap();
        let select = compile(&tree).unwrap();
        let rendered = select.rendered();
        assert!(rendered.contains("FILTER (.func = SELECT AST::Name) OR (.func = SELECT AST::Attribute)"));
    }
}
