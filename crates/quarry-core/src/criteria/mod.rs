mod parse;


use crate::value::{FieldValue, Value};
use derive_more::{Deref, DerefMut, IntoIterator};

///
/// GroupKind
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum GroupKind {
    And,
    Or,
    Not,
}

impl GroupKind {
    /// The literal grammar marker for this kind.
    #[must_use]
    pub const fn marker(self) -> &'static str {
        match self {
            Self::And => "and",
            Self::Or => "or",
            Self::Not => "not",
        }
    }

    pub(crate) fn from_marker(marker: &str) -> Option<Self> {
        match marker {
            "and" => Some(Self::And),
            "or" => Some(Self::Or),
            "not" => Some(Self::Not),
            _ => None,
        }
    }
}

///
/// CriteriaNode
///
/// One typed element of the criteria grammar. Produced exactly once, at
/// the sequence boundary (see `parse`); the compiler never re-inspects
/// raw input shapes.
///

#[derive(Clone, Debug, PartialEq)]
pub enum CriteriaNode {
    /// Named form: implicit `=`, `IS NULL`, or `IN` depending on the
    /// value shape.
    Equality { field: String, value: Value },

    /// Positional form: `[field, operator, value]`.
    Clause {
        field: String,
        operator: String,
        value: Value,
    },

    /// Logical combination of a child sequence.
    Group {
        kind: GroupKind,
        children: Vec<CriteriaNode>,
    },
}

impl CriteriaNode {
    pub fn eq(field: impl Into<String>, value: impl FieldValue) -> Self {
        Self::Equality {
            field: field.into(),
            value: value.to_value(),
        }
    }

    pub fn clause(
        field: impl Into<String>,
        operator: impl Into<String>,
        value: impl FieldValue,
    ) -> Self {
        Self::Clause {
            field: field.into(),
            operator: operator.into(),
            value: value.to_value(),
        }
    }

    #[must_use]
    pub fn group(kind: GroupKind, children: Vec<Self>) -> Self {
        Self::Group { kind, children }
    }
}

///
/// Criteria
///
/// An ordered sequence of criteria nodes, implicitly AND-ed at the top
/// level. Traversal order is input order; it fixes parameter-name and
/// join-emission order.
///

#[derive(Clone, Debug, Default, Deref, DerefMut, IntoIterator, PartialEq)]
#[into_iterator(owned, ref)]
pub struct Criteria(pub Vec<CriteriaNode>);

impl Criteria {
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<CriteriaNode>> for Criteria {
    fn from(nodes: Vec<CriteriaNode>) -> Self {
        Self(nodes)
    }
}

impl FromIterator<CriteriaNode> for Criteria {
    fn from_iter<I: IntoIterator<Item = CriteriaNode>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
