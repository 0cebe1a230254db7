use crate::{
    criteria::{Criteria, CriteriaNode, GroupKind},
    value::{FieldValue, Value},
};

///
/// CriteriaBuilder
///
/// Criteria-only accumulator. This is the builder handed to group
/// callbacks: a fresh, empty one per callback, folded back into the
/// parent as a nested logical group. The full query builder delegates
/// its where-family to this type so both spell criteria identically.
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct CriteriaBuilder {
    criteria: Criteria,
}

impl CriteriaBuilder {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            criteria: Criteria::new(),
        }
    }

    /// Append an already-built node.
    #[must_use]
    pub fn push(mut self, node: CriteriaNode) -> Self {
        self.criteria.0.push(node);
        self
    }

    #[must_use]
    pub fn where_eq(self, field: impl Into<String>, value: impl FieldValue) -> Self {
        self.push(CriteriaNode::eq(field, value))
    }

    #[must_use]
    pub fn where_cmp(
        self,
        field: impl Into<String>,
        operator: impl Into<String>,
        value: impl FieldValue,
    ) -> Self {
        self.push(CriteriaNode::clause(field, operator, value))
    }

    #[must_use]
    pub fn or_where_eq(self, field: impl Into<String>, value: impl FieldValue) -> Self {
        self.or_fold(CriteriaNode::eq(field, value))
    }

    #[must_use]
    pub fn or_where_cmp(
        self,
        field: impl Into<String>,
        operator: impl Into<String>,
        value: impl FieldValue,
    ) -> Self {
        self.or_fold(CriteriaNode::clause(field, operator, value))
    }

    #[must_use]
    pub fn where_in<V: FieldValue>(
        self,
        field: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        self.push(CriteriaNode::clause(field, "in", list_of(values)))
    }

    #[must_use]
    pub fn where_not_in<V: FieldValue>(
        self,
        field: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        self.push(CriteriaNode::clause(field, "not_in", list_of(values)))
    }

    #[must_use]
    pub fn where_between(
        self,
        field: impl Into<String>,
        lo: impl FieldValue,
        hi: impl FieldValue,
    ) -> Self {
        self.push(CriteriaNode::clause(
            field,
            "between",
            Value::List(vec![lo.to_value(), hi.to_value()]),
        ))
    }

    #[must_use]
    pub fn where_null(self, field: impl Into<String>) -> Self {
        self.push(CriteriaNode::clause(field, "is_null", Value::Null))
    }

    #[must_use]
    pub fn where_not_null(self, field: impl Into<String>) -> Self {
        self.push(CriteriaNode::clause(field, "is_not_null", Value::Null))
    }

    #[must_use]
    pub fn where_like(self, field: impl Into<String>, pattern: impl FieldValue) -> Self {
        self.push(CriteriaNode::clause(field, "like", pattern))
    }

    #[must_use]
    pub fn where_contains(self, field: impl Into<String>, needle: impl FieldValue) -> Self {
        self.push(CriteriaNode::clause(field, "contains", needle))
    }

    /// AND-fold a sub-group built by `f` on a fresh builder. An empty
    /// sub-group folds to nothing.
    #[must_use]
    pub fn where_group(self, f: impl FnOnce(Self) -> Self) -> Self {
        match group_node(f) {
            Some(node) => self.push(node),
            None => self,
        }
    }

    /// OR-fold a sub-group built by `f` on a fresh builder.
    #[must_use]
    pub fn or_where_group(self, f: impl FnOnce(Self) -> Self) -> Self {
        match group_node(f) {
            Some(node) => self.or_fold(node),
            None => self,
        }
    }

    #[must_use]
    pub fn build(self) -> Criteria {
        self.criteria
    }

    /// `a AND b OR c` reads as `(a AND b) OR c`: the whole accumulated
    /// sequence folds into one OR with the new node. Consecutive or-folds
    /// extend the same OR group instead of nesting.
    fn or_fold(mut self, node: CriteriaNode) -> Self {
        let existing = std::mem::take(&mut self.criteria.0);
        self.criteria.0 = or_combine(existing, node);
        self
    }
}

impl From<Criteria> for CriteriaBuilder {
    fn from(criteria: Criteria) -> Self {
        Self { criteria }
    }
}

fn list_of<V: FieldValue>(values: impl IntoIterator<Item = V>) -> Value {
    Value::List(values.into_iter().map(FieldValue::to_value).collect())
}

fn group_node(f: impl FnOnce(CriteriaBuilder) -> CriteriaBuilder) -> Option<CriteriaNode> {
    let children = f(CriteriaBuilder::new()).build().0;

    if children.is_empty() {
        None
    } else {
        Some(CriteriaNode::group(GroupKind::And, children))
    }
}

pub(crate) fn or_combine(
    mut existing: Vec<CriteriaNode>,
    node: CriteriaNode,
) -> Vec<CriteriaNode> {
    let folded = match existing.len() {
        0 => node,
        1 => match existing.pop() {
            Some(CriteriaNode::Group {
                kind: GroupKind::Or,
                mut children,
            }) => {
                children.push(node);
                CriteriaNode::group(GroupKind::Or, children)
            }
            Some(single) => CriteriaNode::group(GroupKind::Or, vec![single, node]),
            None => node,
        },
        _ => CriteriaNode::group(
            GroupKind::Or,
            vec![CriteriaNode::group(GroupKind::And, existing), node],
        ),
    };

    vec![folded]
}
