use crate::{
    error::InternalError,
    join::JoinSpec,
    predicate::{Expr, FieldRef},
    value::Value,
};
use std::time::Duration;

///
/// OrderDirection
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum OrderDirection {
    #[default]
    Asc,
    Desc,
}

///
/// Aggregate
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Aggregate {
    Count,
    Sum,
    Avg,
    Max,
    Min,
}

///
/// CacheDirective
///
/// Accumulated by the builder and handed to the engine at
/// materialization. The caching store itself is the engine's concern.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CacheDirective {
    pub ttl: Duration,
    pub key: Option<String>,
}

impl CacheDirective {
    #[must_use]
    pub const fn new(ttl: Duration) -> Self {
        Self { ttl, key: None }
    }

    #[must_use]
    pub fn keyed(ttl: Duration, key: impl Into<String>) -> Self {
        Self {
            ttl,
            key: Some(key.into()),
        }
    }
}

///
/// QueryEngine
///
/// Driver-side query state for one execution: the external collaborator
/// that consumes compiled output. Implementations interpret joins,
/// predicates, and bindings for their backend; semantic validation
/// (unknown relations, type mismatches) happens here, at execution time,
/// and errors must propagate unchanged.
///

pub trait QueryEngine {
    type Row;

    fn add_join(&mut self, join: &JoinSpec);
    fn add_where(&mut self, predicate: &Expr);
    fn bind(&mut self, name: &str, value: &Value);
    fn set_order(&mut self, field: &FieldRef, direction: OrderDirection);

    /// Later calls overwrite earlier ones.
    fn set_limit(&mut self, limit: u64);
    fn set_offset(&mut self, offset: u64);

    fn set_cache(&mut self, _directive: &CacheDirective) {}

    fn execute(&mut self) -> Result<Vec<Self::Row>, InternalError>;

    fn execute_scalar(
        &mut self,
        aggregate: Aggregate,
        field: Option<&FieldRef>,
    ) -> Result<Value, InternalError>;
}

///
/// QuerySource
///
/// Hands out fresh engine-side query state. Every builder
/// materialization begins a new engine, so state from one terminal call
/// can never leak into another (paginate relies on this for its
/// independent count and fetch passes).
///

pub trait QuerySource {
    type Engine: QueryEngine;

    fn begin(&self, root: &str) -> Self::Engine;
}

///
/// Page
///
/// One page of results plus the arithmetic the caller would otherwise
/// redo by hand.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
    pub last_page: u64,
}

impl<T> Page<T> {
    #[must_use]
    pub fn new(items: Vec<T>, total: u64, page: u64, per_page: u64) -> Self {
        let last_page = if per_page == 0 {
            1
        } else {
            total.div_ceil(per_page).max(1)
        };

        Self {
            items,
            total,
            page,
            per_page,
            last_page,
        }
    }

    #[must_use]
    pub const fn has_more(&self) -> bool {
        self.page < self.last_page
    }
}

///
/// TESTS
///
