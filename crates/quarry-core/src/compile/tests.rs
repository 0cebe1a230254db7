use super::*;
use crate::predicate::CmpOp;
use proptest::prelude::*;
use serde_json::json;
use std::collections::BTreeSet;

fn run(input: &serde_json::Value) -> Compiled {
    let registry = OperatorRegistry::with_builtins();

    compile(&registry, "u", &Criteria::parse(input))
}

fn rendered(input: &serde_json::Value) -> String {
    run(input)
        .predicate
        .map(|expr| expr.to_string())
        .unwrap_or_default()
}

/// Collect every parameter name referenced by the expression tree.
fn param_names(expr: &Expr, out: &mut Vec<String>) {
    match expr {
        Expr::True | Expr::False | Expr::Null { .. } => {}
        Expr::Cmp { param, .. } => out.push(param.clone()),
        Expr::InList { params, .. } => out.extend(params.iter().cloned()),
        Expr::And(children) | Expr::Or(children) => {
            for child in children {
                param_names(child, out);
            }
        }
        Expr::Not(inner) => param_names(inner, out),
    }
}

#[test]
fn empty_criteria_compiles_to_nothing() {
    let compiled = run(&json!([]));

    assert_eq!(compiled.predicate, None);
    assert!(compiled.joins.is_empty());
    assert!(compiled.bindings.is_empty());
}

#[test]
fn single_element_is_unwrapped() {
    assert_eq!(rendered(&json!([{"status": "active"}])), "u.status = :p0");
}

#[test]
fn top_level_elements_are_anded() {
    assert_eq!(
        rendered(&json!([{"status": "active"}, ["age", ">", 18]])),
        "(u.status = :p0 AND u.age > :p1)"
    );
}

#[test]
fn null_compiles_to_is_null_with_zero_bindings() {
    let compiled = run(&json!([{"deletedAt": null}]));

    assert_eq!(
        compiled.predicate,
        Some(Expr::Null {
            field: FieldRef::new("u", "deletedAt"),
            negated: false,
        })
    );
    assert!(compiled.bindings.is_empty());
}

#[test]
fn boolean_false_is_a_bound_equality_not_is_null() {
    let compiled = run(&json!([{"deletedAt": false}]));

    assert_eq!(
        compiled.predicate,
        Some(Expr::Cmp {
            field: FieldRef::new("u", "deletedAt"),
            op: CmpOp::Eq,
            param: "p0".to_string(),
        })
    );
    assert_eq!(
        compiled.bindings,
        vec![("p0".to_string(), Value::Bool(false))]
    );
}

#[test]
fn list_equality_compiles_to_in() {
    let compiled = run(&json!([{"role": ["admin", "editor"]}]));

    assert_eq!(
        compiled.predicate,
        Some(Expr::InList {
            field: FieldRef::new("u", "role"),
            params: vec!["p0".to_string(), "p1".to_string()],
            negated: false,
        })
    );
    assert_eq!(compiled.bindings.len(), 2);
}

#[test]
fn empty_in_list_is_always_false() {
    let compiled = run(&json!([["role", "in", []]]));

    assert_eq!(compiled.predicate, Some(Expr::False));
    assert!(compiled.bindings.is_empty());
}

#[test]
fn empty_not_in_list_is_always_true() {
    let compiled = run(&json!([["role", "not_in", []]]));

    assert_eq!(compiled.predicate, Some(Expr::True));
    assert!(compiled.bindings.is_empty());
}

#[test]
fn between_is_two_bound_comparisons() {
    let compiled = run(&json!([["age", "between", [18, 65]]]));

    assert_eq!(
        compiled.predicate.map(|e| e.to_string()),
        Some("(u.age >= :p0 AND u.age <= :p1)".to_string())
    );
    assert_eq!(
        compiled.bindings,
        vec![
            ("p0".to_string(), Value::Int(18)),
            ("p1".to_string(), Value::Int(65)),
        ]
    );
}

#[test]
fn nesting_round_trip_matches_structure() {
    let compiled = run(&json!([
        ["or", [
            {"status": "active"},
            ["and", [
                {"verified": true},
                ["credits", ">", 100],
            ]],
        ]],
    ]));

    let Some(Expr::Or(children)) = &compiled.predicate else {
        panic!("expected top-level Or, got {:?}", compiled.predicate);
    };
    assert_eq!(children.len(), 2);
    assert!(matches!(children[0], Expr::Cmp { .. }));
    let Expr::And(leaves) = &children[1] else {
        panic!("expected And branch, got {:?}", children[1]);
    };
    assert_eq!(leaves.len(), 2);

    let text = compiled.predicate.as_ref().map(ToString::to_string);
    assert_eq!(
        text.as_deref(),
        Some("(u.status = :p0 OR (u.verified = :p1 AND u.credits > :p2))")
    );
}

#[test]
fn not_group_wraps_the_anded_children() {
    assert_eq!(
        rendered(&json!([["not", [{"a": 1}, {"b": 2}]]])),
        "NOT ((u.a = :p0 AND u.b = :p1))"
    );
}

#[test]
fn unknown_operator_falls_back_to_equality() {
    let compiled = run(&json!([["field", "not_a_real_operator", "x"]]));

    assert_eq!(
        compiled.predicate,
        Some(Expr::Cmp {
            field: FieldRef::new("u", "field"),
            op: CmpOp::Eq,
            param: "p0".to_string(),
        })
    );
    assert_eq!(
        compiled.bindings,
        vec![("p0".to_string(), Value::Text("x".to_string()))]
    );
}

#[test]
fn dotted_paths_join_once_across_branches() {
    let compiled = run(&json!([
        {"profile.city": "berlin"},
        ["or", [
            ["profile.city", "!=", "munich"],
            ["profile.address.zip", "starts_with", "10"],
        ]],
        ["profile.address.zip", "is_not_null"],
    ]));

    assert_eq!(
        compiled.joins,
        vec![
            JoinSpec::left("u.profile", "profile_1"),
            JoinSpec::left("profile_1.address", "address_2"),
        ]
    );
}

#[test]
fn malformed_operator_arity_skips_only_that_node() {
    let compiled = run(&json!([
        ["age", "between", [18]],
        {"status": "active"},
    ]));

    assert_eq!(
        compiled.predicate.map(|e| e.to_string()),
        Some("u.status = :p0".to_string())
    );
}

#[test]
fn group_of_skipped_children_contributes_nothing() {
    let compiled = run(&json!([
        ["or", [["age", "between", [1]], ["age", "between", []]]],
        {"status": "active"},
    ]));

    assert_eq!(
        compiled.predicate.map(|e| e.to_string()),
        Some("u.status = :p0".to_string())
    );
}

#[test]
fn caller_joins_seed_before_auto_detection() {
    let registry = OperatorRegistry::with_builtins();
    let mut compiler = Compiler::new(&registry, "u");
    compiler.join(JoinSpec::inner("u.profile", "profile_1"));

    let criteria = Criteria::parse(&json!([["profile.city", "=", "berlin"]]));
    let predicate = compiler.compile(&criteria);
    let (joins, bindings) = compiler.finish();

    assert!(predicate.is_some());
    assert_eq!(joins, vec![JoinSpec::inner("u.profile", "profile_1")]);
    assert_eq!(bindings.len(), 1);
}

#[test]
fn parameter_order_follows_traversal_order() {
    let compiled = run(&json!([
        {"a": 1},
        ["b", ">", 2],
        ["or", [{"c": 3}, {"d": 4}]],
    ]));

    let names: Vec<&str> = compiled
        .bindings
        .iter()
        .map(|(name, _)| name.as_str())
        .collect();
    assert_eq!(names, vec!["p0", "p1", "p2", "p3"]);

    let values: Vec<&Value> = compiled.bindings.iter().map(|(_, value)| value).collect();
    assert_eq!(
        values,
        vec![
            &Value::Int(1),
            &Value::Int(2),
            &Value::Int(3),
            &Value::Int(4),
        ]
    );
}

///
/// PROPERTIES
///

fn arb_path() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("name".to_string()),
        Just("profile.city".to_string()),
        Just("profile.address.zip".to_string()),
        Just("orders.total".to_string()),
    ]
}

fn arb_leaf() -> impl Strategy<Value = serde_json::Value> {
    (arb_path(), any::<i64>()).prop_map(|(path, n)| json!([path, ">", n]))
}

proptest! {
    #[test]
    fn join_emission_is_idempotent(leaves in prop::collection::vec(arb_leaf(), 1..24)) {
        let compiled = run(&serde_json::Value::Array(leaves));

        let mut pairs = BTreeSet::new();
        for join in &compiled.joins {
            prop_assert!(
                pairs.insert((join.relation_path.clone(), join.alias.clone())),
                "duplicate join: {join:?}",
            );
        }
    }

    #[test]
    fn parameter_names_are_unique_and_used_exactly_once(
        leaves in prop::collection::vec(arb_leaf(), 0..24),
    ) {
        let compiled = run(&serde_json::Value::Array(leaves));

        let bound: Vec<&str> = compiled.bindings.iter().map(|(n, _)| n.as_str()).collect();
        let distinct: BTreeSet<&str> = bound.iter().copied().collect();
        prop_assert_eq!(bound.len(), distinct.len());

        let mut used = Vec::new();
        if let Some(expr) = &compiled.predicate {
            param_names(expr, &mut used);
        }
        used.sort_unstable();
        let mut expected: Vec<String> = bound.iter().map(ToString::to_string).collect();
        expected.sort_unstable();
        prop_assert_eq!(used, expected);
    }
}
