use crate::{
    operator::OperatorRender,
    predicate::{Binder, CmpOp, Expr, FieldRef},
    value::Value,
};

///
/// Builtin
///
/// The built-in comparison strategies, one exhaustive enum so the whole
/// set is statically checkable. Each variant may be registered under
/// several spellings (`=`/`eq`, `>=`/`gte`, ...).
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Builtin {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
    NotLike,
    Contains,
    StartsWith,
    EndsWith,
    In,
    NotIn,
    Between,
    NotBetween,
    IsNull,
    IsNotNull,
}

impl Builtin {
    /// Every registered spelling of every builtin.
    pub const ALL: [(&'static str, Self); 23] = [
        ("=", Self::Eq),
        ("eq", Self::Eq),
        ("!=", Self::Ne),
        ("neq", Self::Ne),
        (">", Self::Gt),
        ("gt", Self::Gt),
        (">=", Self::Gte),
        ("gte", Self::Gte),
        ("<", Self::Lt),
        ("lt", Self::Lt),
        ("<=", Self::Lte),
        ("lte", Self::Lte),
        ("like", Self::Like),
        ("not_like", Self::NotLike),
        ("contains", Self::Contains),
        ("starts_with", Self::StartsWith),
        ("ends_with", Self::EndsWith),
        ("in", Self::In),
        ("not_in", Self::NotIn),
        ("between", Self::Between),
        ("not_between", Self::NotBetween),
        ("is_null", Self::IsNull),
        ("is_not_null", Self::IsNotNull),
    ];
}

impl OperatorRender for Builtin {
    fn render(&self, field: &FieldRef, value: &Value, binder: &mut Binder) -> Option<Expr> {
        match self {
            // Equality mirrors the named form: null → IS NULL, list → IN.
            Self::Eq => Some(match value {
                Value::Null => is_null(field, false),
                Value::List(items) => in_list(field, items, false, binder),
                scalar => compare(field, CmpOp::Eq, scalar.clone(), binder),
            }),
            Self::Ne => Some(match value {
                Value::Null => is_null(field, true),
                Value::List(items) => in_list(field, items, true, binder),
                scalar => compare(field, CmpOp::Ne, scalar.clone(), binder),
            }),

            Self::Gt => Some(compare(field, CmpOp::Gt, value.clone(), binder)),
            Self::Gte => Some(compare(field, CmpOp::Gte, value.clone(), binder)),
            Self::Lt => Some(compare(field, CmpOp::Lt, value.clone(), binder)),
            Self::Lte => Some(compare(field, CmpOp::Lte, value.clone(), binder)),

            // The caller supplies wildcards for plain like; the wrapped
            // variants compose them.
            Self::Like => Some(compare(field, CmpOp::Like, value.clone(), binder)),
            Self::NotLike => Some(compare(field, CmpOp::NotLike, value.clone(), binder)),
            Self::Contains => Some(like_wrapped(field, value, "%", "%", binder)),
            Self::StartsWith => Some(like_wrapped(field, value, "", "%", binder)),
            Self::EndsWith => Some(like_wrapped(field, value, "%", "", binder)),

            Self::In => Some(in_list(field, &as_list(value), false, binder)),
            Self::NotIn => Some(in_list(field, &as_list(value), true, binder)),

            Self::Between => between(field, value, binder),
            Self::NotBetween => between(field, value, binder).map(Expr::not),

            // Null checks ignore the value argument entirely.
            Self::IsNull => Some(is_null(field, false)),
            Self::IsNotNull => Some(is_null(field, true)),
        }
    }
}

fn compare(field: &FieldRef, op: CmpOp, value: Value, binder: &mut Binder) -> Expr {
    Expr::Cmp {
        field: field.clone(),
        op,
        param: binder.bind(value),
    }
}

fn is_null(field: &FieldRef, negated: bool) -> Expr {
    Expr::Null {
        field: field.clone(),
        negated,
    }
}

/// Membership test. The empty list is a required edge case, not a crash:
/// `IN ()` can match nothing and `NOT IN ()` excludes nothing.
fn in_list(field: &FieldRef, items: &[Value], negated: bool, binder: &mut Binder) -> Expr {
    if items.is_empty() {
        return if negated { Expr::True } else { Expr::False };
    }

    let params = items.iter().map(|item| binder.bind(item.clone())).collect();

    Expr::InList {
        field: field.clone(),
        params,
        negated,
    }
}

/// A non-list value for `in`/`not_in` reads as a one-element list.
fn as_list(value: &Value) -> Vec<Value> {
    match value {
        Value::List(items) => items.clone(),
        scalar => vec![scalar.clone()],
    }
}

fn like_wrapped(
    field: &FieldRef,
    value: &Value,
    prefix: &str,
    suffix: &str,
    binder: &mut Binder,
) -> Expr {
    let pattern = format!("{prefix}{}{suffix}", value.as_like_text());

    compare(field, CmpOp::Like, Value::Text(pattern), binder)
}

/// `between` needs exactly an ordered pair, and compiles to two ANDed
/// comparisons rather than a single range node. Any other arity skips
/// the clause.
fn between(field: &FieldRef, value: &Value, binder: &mut Binder) -> Option<Expr> {
    match value.as_list().map(Vec::as_slice) {
        Some([lo, hi]) => {
            let lower = compare(field, CmpOp::Gte, lo.clone(), binder);
            let upper = compare(field, CmpOp::Lte, hi.clone(), binder);

            Some(lower.and(upper))
        }
        _ => None,
    }
}
