//! The one-shot parse step for the loose criteria grammar.
//!
//! Shape inspection happens here and nowhere else. Malformed elements are
//! skipped and recorded, never fatal: a partial filter is preferred over a
//! failed compile for plausible-but-wrong input.

use crate::{
    criteria::{Criteria, CriteriaNode, GroupKind},
    obs::{self, CompileEvent, SkipReason},
    value::Value,
};
use serde_json::Value as Json;

impl Criteria {
    /// Parse the loose JSON criteria grammar into typed nodes.
    ///
    /// Grammar, per sequence element:
    /// - object → one `Equality` per key/value pair
    /// - array with head `"and"`/`"or"`/`"not"` and an array body → `Group`
    /// - array `[field, operator]` / `[field, operator, value]` with a
    ///   string head → `Clause` (missing value reads as null)
    /// - array `[field, value]` with a non-string second element →
    ///   implicit `Equality`
    ///
    /// A non-array top level is treated as a one-element sequence.
    #[must_use]
    pub fn parse(input: &Json) -> Self {
        match input {
            Json::Array(items) => Self(parse_sequence(items)),
            other => {
                let mut nodes = Vec::new();
                parse_element(other, &mut nodes);
                Self(nodes)
            }
        }
    }
}

fn parse_sequence(items: &[Json]) -> Vec<CriteriaNode> {
    let mut nodes = Vec::new();
    for item in items {
        parse_element(item, &mut nodes);
    }

    nodes
}

fn parse_element(item: &Json, out: &mut Vec<CriteriaNode>) {
    match item {
        Json::Object(map) => {
            for (field, value) in map {
                match scalar_value(value) {
                    Some(value) => out.push(CriteriaNode::Equality {
                        field: field.clone(),
                        value,
                    }),
                    None => skip(SkipReason::ValueShape),
                }
            }
        }
        Json::Array(parts) => parse_positional(parts, out),
        _ => skip(SkipReason::UnkeyedScalar),
    }
}

fn parse_positional(parts: &[Json], out: &mut Vec<CriteriaNode>) {
    let Some(Json::String(head)) = parts.first() else {
        skip(SkipReason::ShortClause);
        return;
    };

    if let Some(kind) = GroupKind::from_marker(head) {
        match parts.get(1) {
            Some(Json::Array(children)) => out.push(CriteriaNode::Group {
                kind,
                children: parse_sequence(children),
            }),
            _ => skip(SkipReason::GroupBody),
        }
        return;
    }

    match (parts.get(1), parts.len()) {
        (None, _) => skip(SkipReason::ShortClause),

        // `[field, operator]` and `[field, operator, value]`; a missing
        // value slot reads as null, which only the null-family operators
        // care about anyway.
        (Some(Json::String(operator)), _) => {
            let value = match parts.get(2) {
                None => Value::Null,
                Some(raw) => match scalar_value(raw) {
                    Some(value) => value,
                    None => {
                        skip(SkipReason::ValueShape);
                        return;
                    }
                },
            };
            out.push(CriteriaNode::Clause {
                field: head.clone(),
                operator: operator.clone(),
                value,
            });
        }

        // `[field, value]` with a non-string second element is the
        // positional spelling of the named equality form.
        (Some(value), 2) => match scalar_value(value) {
            Some(value) => out.push(CriteriaNode::Equality {
                field: head.clone(),
                value,
            }),
            None => skip(SkipReason::ValueShape),
        },

        // Three or more parts with a non-string operator slot.
        (Some(_), _) => skip(SkipReason::OperatorName),
    }
}

/// Value conversion that rejects JSON objects; the grammar has no object
/// values.
fn scalar_value(value: &Json) -> Option<Value> {
    match value {
        Json::Object(_) => None,
        other => Some(Value::from(other)),
    }
}

fn skip(reason: SkipReason) {
    obs::emit(CompileEvent::NodeSkipped { reason });
}
