//! Shared test-only engine doubles for builder and terminal tests.

use crate::{
    engine::{Aggregate, CacheDirective, OrderDirection, QueryEngine, QuerySource},
    error::InternalError,
    join::JoinSpec,
    predicate::{Expr, FieldRef},
    value::Value,
};
use std::{cell::RefCell, rc::Rc};

///
/// EngineTrace
///
/// Everything one engine instance was told, in call order. `limits` and
/// `offsets` keep every call so overwrite behavior stays visible.
///

#[derive(Clone, Debug, Default)]
pub(crate) struct EngineTrace {
    pub root: String,
    pub joins: Vec<JoinSpec>,
    pub predicates: Vec<String>,
    pub bindings: Vec<(String, Value)>,
    pub order: Vec<(String, OrderDirection)>,
    pub limits: Vec<u64>,
    pub offsets: Vec<u64>,
    pub cache: Option<CacheDirective>,
    pub scalars: Vec<(Aggregate, Option<String>)>,
    pub executed: bool,
}

///
/// TraceSource
///
/// Hands out recording engines over a canned row set. Each `begin` opens
/// a new trace, so tests can assert how many engines a terminal used and
/// what each one saw.
///

pub(crate) struct TraceSource {
    rows: Vec<u64>,
    count: u64,
    traces: Rc<RefCell<Vec<EngineTrace>>>,
}

impl TraceSource {
    pub fn new(rows: Vec<u64>) -> Self {
        let count = rows.len() as u64;

        Self {
            rows,
            count,
            traces: Rc::new(RefCell::new(Vec::new())),
        }
    }

    pub fn with_count(mut self, count: u64) -> Self {
        self.count = count;
        self
    }

    pub fn trace(&self, index: usize) -> EngineTrace {
        self.traces.borrow()[index].clone()
    }

    pub fn trace_count(&self) -> usize {
        self.traces.borrow().len()
    }
}

impl QuerySource for TraceSource {
    type Engine = TraceEngine;

    fn begin(&self, root: &str) -> TraceEngine {
        let mut traces = self.traces.borrow_mut();
        traces.push(EngineTrace {
            root: root.to_string(),
            ..EngineTrace::default()
        });

        TraceEngine {
            rows: self.rows.clone(),
            count: self.count,
            traces: Rc::clone(&self.traces),
            index: traces.len() - 1,
        }
    }
}

///
/// TraceEngine
///

pub(crate) struct TraceEngine {
    rows: Vec<u64>,
    count: u64,
    traces: Rc<RefCell<Vec<EngineTrace>>>,
    index: usize,
}

impl TraceEngine {
    fn with(&self, f: impl FnOnce(&mut EngineTrace)) {
        f(&mut self.traces.borrow_mut()[self.index]);
    }
}

impl QueryEngine for TraceEngine {
    type Row = u64;

    fn add_join(&mut self, join: &JoinSpec) {
        self.with(|t| t.joins.push(join.clone()));
    }

    fn add_where(&mut self, predicate: &Expr) {
        self.with(|t| t.predicates.push(predicate.to_string()));
    }

    fn bind(&mut self, name: &str, value: &Value) {
        self.with(|t| t.bindings.push((name.to_string(), value.clone())));
    }

    fn set_order(&mut self, field: &FieldRef, direction: OrderDirection) {
        self.with(|t| t.order.push((field.to_string(), direction)));
    }

    fn set_limit(&mut self, limit: u64) {
        self.with(|t| t.limits.push(limit));
    }

    fn set_offset(&mut self, offset: u64) {
        self.with(|t| t.offsets.push(offset));
    }

    fn set_cache(&mut self, directive: &CacheDirective) {
        self.with(|t| t.cache = Some(directive.clone()));
    }

    fn execute(&mut self) -> Result<Vec<u64>, InternalError> {
        let (offset, limit) = {
            let traces = self.traces.borrow();
            let trace = &traces[self.index];
            (
                trace.offsets.last().copied().unwrap_or(0),
                trace.limits.last().copied(),
            )
        };
        self.with(|t| t.executed = true);

        let rows = self
            .rows
            .iter()
            .copied()
            .skip(usize::try_from(offset).unwrap_or(usize::MAX));
        Ok(match limit {
            Some(limit) => rows.take(usize::try_from(limit).unwrap_or(usize::MAX)).collect(),
            None => rows.collect(),
        })
    }

    fn execute_scalar(
        &mut self,
        aggregate: Aggregate,
        field: Option<&FieldRef>,
    ) -> Result<Value, InternalError> {
        let field = field.map(ToString::to_string);
        self.with(|t| t.scalars.push((aggregate, field)));

        Ok(Value::Uint(self.count))
    }
}
