use crate::{criteria::Criteria, engine::CacheDirective, engine::OrderDirection, join::JoinSpec};
use std::collections::BTreeSet;

///
/// QueryState
///
/// The accumulated, pre-compilation state of one fluent query. Owned by
/// one builder; mutated only by the builder's own chain methods and by
/// scopes, which receive it by `&mut`. Never shared across builders —
/// group callbacks get a fresh criteria accumulator instead.
///

#[derive(Clone, Debug, Default)]
pub struct QueryState {
    pub root: String,
    pub criteria: Criteria,
    pub joins: Vec<JoinSpec>,
    pub order: Vec<(String, OrderDirection)>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    pub cache: Option<CacheDirective>,
    pub skip_scopes: BTreeSet<String>,
    pub skip_all_scopes: bool,
}

impl QueryState {
    #[must_use]
    pub fn new(root: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    /// Clear all accumulation, keeping the root.
    pub fn reset(&mut self) {
        let root = std::mem::take(&mut self.root);
        *self = Self::new(root);
    }
}
