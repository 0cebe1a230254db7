use crate::{
    builder::{criteria::CriteriaBuilder, state::QueryState},
    compile::{Compiled, Compiler},
    engine::{Aggregate, CacheDirective, OrderDirection, Page, QueryEngine, QuerySource},
    error::InternalError,
    join::JoinSpec,
    operator::{OperatorRegistry, OperatorRender},
    predicate::FieldRef,
    scope::ScopeRegistry,
    value::{FieldValue, Value},
};
use std::time::Duration;

type RowOf<S> = <<S as QuerySource>::Engine as QueryEngine>::Row;

///
/// QueryBuilder
///
/// Mutable, chainable accumulator for one logical query. Chain methods
/// consume and return the same builder value; terminals compile the
/// accumulated state exactly once per call and delegate to a freshly
/// begun engine. The builder stays usable after a terminal call — each
/// terminal re-compiles from the same accumulated criteria.
///

pub struct QueryBuilder<'s, S: QuerySource> {
    source: &'s S,
    operators: OperatorRegistry,
    scopes: ScopeRegistry,
    state: QueryState,
}

impl<'s, S: QuerySource> QueryBuilder<'s, S> {
    #[must_use]
    pub fn new(source: &'s S, root: impl Into<String>) -> Self {
        Self {
            source,
            operators: OperatorRegistry::with_builtins(),
            scopes: ScopeRegistry::new(),
            state: QueryState::new(root),
        }
    }

    // ------------------------------------------------------------------
    // Run configuration
    // ------------------------------------------------------------------

    #[must_use]
    pub fn with_scopes(mut self, scopes: &ScopeRegistry) -> Self {
        self.scopes = scopes.clone();
        self
    }

    #[must_use]
    pub fn with_operators(mut self, operators: OperatorRegistry) -> Self {
        self.operators = operators;
        self
    }

    #[must_use]
    pub fn register_operator(
        mut self,
        name: impl Into<String>,
        op: impl OperatorRender + 'static,
    ) -> Self {
        self.operators.register(name, op);
        self
    }

    #[must_use]
    pub const fn state(&self) -> &QueryState {
        &self.state
    }

    /// Clear accumulation, keeping root, source, operators, and scopes.
    #[must_use]
    pub fn reset(mut self) -> Self {
        self.state.reset();
        self
    }

    // ------------------------------------------------------------------
    // Criteria accumulation
    // ------------------------------------------------------------------

    #[must_use]
    pub fn where_eq(self, field: impl Into<String>, value: impl FieldValue) -> Self {
        self.map_criteria(|c| c.where_eq(field, value))
    }

    #[must_use]
    pub fn where_cmp(
        self,
        field: impl Into<String>,
        operator: impl Into<String>,
        value: impl FieldValue,
    ) -> Self {
        self.map_criteria(|c| c.where_cmp(field, operator, value))
    }

    #[must_use]
    pub fn or_where_eq(self, field: impl Into<String>, value: impl FieldValue) -> Self {
        self.map_criteria(|c| c.or_where_eq(field, value))
    }

    #[must_use]
    pub fn or_where_cmp(
        self,
        field: impl Into<String>,
        operator: impl Into<String>,
        value: impl FieldValue,
    ) -> Self {
        self.map_criteria(|c| c.or_where_cmp(field, operator, value))
    }

    #[must_use]
    pub fn where_in<V: FieldValue>(
        self,
        field: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        self.map_criteria(|c| c.where_in(field, values))
    }

    #[must_use]
    pub fn where_not_in<V: FieldValue>(
        self,
        field: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        self.map_criteria(|c| c.where_not_in(field, values))
    }

    #[must_use]
    pub fn where_between(
        self,
        field: impl Into<String>,
        lo: impl FieldValue,
        hi: impl FieldValue,
    ) -> Self {
        self.map_criteria(|c| c.where_between(field, lo, hi))
    }

    #[must_use]
    pub fn where_null(self, field: impl Into<String>) -> Self {
        self.map_criteria(|c| c.where_null(field))
    }

    #[must_use]
    pub fn where_not_null(self, field: impl Into<String>) -> Self {
        self.map_criteria(|c| c.where_not_null(field))
    }

    #[must_use]
    pub fn where_like(self, field: impl Into<String>, pattern: impl FieldValue) -> Self {
        self.map_criteria(|c| c.where_like(field, pattern))
    }

    #[must_use]
    pub fn where_contains(self, field: impl Into<String>, needle: impl FieldValue) -> Self {
        self.map_criteria(|c| c.where_contains(field, needle))
    }

    /// AND-fold a sub-group built on a fresh criteria builder. This is
    /// how a linear chain expresses arbitrary nesting depth.
    #[must_use]
    pub fn where_group(self, f: impl FnOnce(CriteriaBuilder) -> CriteriaBuilder) -> Self {
        self.map_criteria(|c| c.where_group(f))
    }

    /// OR-fold a sub-group built on a fresh criteria builder.
    #[must_use]
    pub fn or_where_group(self, f: impl FnOnce(CriteriaBuilder) -> CriteriaBuilder) -> Self {
        self.map_criteria(|c| c.or_where_group(f))
    }

    // ------------------------------------------------------------------
    // Joins, ordering, paging, cache, scopes
    // ------------------------------------------------------------------

    /// Configure a join ahead of auto-detection. Same dedup rule as
    /// auto-detected joins; a manual alias colliding with an auto-derived
    /// one is the caller's responsibility.
    #[must_use]
    pub fn join(mut self, join: JoinSpec) -> Self {
        self.state.joins.push(join);
        self
    }

    #[must_use]
    pub fn order_by(mut self, field: impl Into<String>) -> Self {
        self.state.order.push((field.into(), OrderDirection::Asc));
        self
    }

    #[must_use]
    pub fn order_by_desc(mut self, field: impl Into<String>) -> Self {
        self.state.order.push((field.into(), OrderDirection::Desc));
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: u64) -> Self {
        self.state.limit = Some(limit);
        self
    }

    #[must_use]
    pub fn offset(mut self, offset: u64) -> Self {
        self.state.offset = Some(offset);
        self
    }

    #[must_use]
    pub fn cache(mut self, ttl: Duration) -> Self {
        self.state.cache = Some(CacheDirective::new(ttl));
        self
    }

    #[must_use]
    pub fn cache_keyed(mut self, ttl: Duration, key: impl Into<String>) -> Self {
        self.state.cache = Some(CacheDirective::keyed(ttl, key));
        self
    }

    #[must_use]
    pub fn without_scope(mut self, name: impl Into<String>) -> Self {
        self.state.skip_scopes.insert(name.into());
        self
    }

    #[must_use]
    pub fn without_global_scopes(mut self) -> Self {
        self.state.skip_all_scopes = true;
        self
    }

    /// Apply a named macro immediately. Unknown names are a recorded
    /// no-op.
    #[must_use]
    pub fn apply_macro(mut self, name: &str) -> Self {
        self.scopes.apply_macro(name, &mut self.state);
        self
    }

    // ------------------------------------------------------------------
    // Materialization
    // ------------------------------------------------------------------

    /// Compile the accumulated state (scopes applied) without touching
    /// the engine. Ordering fields resolve through the same join state as
    /// criteria fields, so ordering by a relation path joins it.
    #[must_use]
    pub fn compiled(&self) -> Compiled {
        let (_, compiled, _, _) = self.compile_state(None);

        compiled
    }

    fn compile_state(
        &self,
        aggregate_field: Option<&str>,
    ) -> (
        QueryState,
        Compiled,
        Vec<(FieldRef, OrderDirection)>,
        Option<FieldRef>,
    ) {
        let mut state = self.state.clone();
        self.scopes.apply_globals(&mut state);

        let mut compiler = Compiler::new(&self.operators, &*state.root);
        for join in &state.joins {
            compiler.join(join.clone());
        }

        let predicate = compiler.compile(&state.criteria);
        let order = state
            .order
            .iter()
            .map(|(path, direction)| (compiler.resolve_field(path), *direction))
            .collect();
        let aggregate = aggregate_field.map(|path| compiler.resolve_field(path));
        let (joins, bindings) = compiler.finish();

        (
            state,
            Compiled {
                predicate,
                joins,
                bindings,
            },
            order,
            aggregate,
        )
    }

    fn prepare(
        &self,
        apply_paging: bool,
        aggregate_field: Option<&str>,
    ) -> (S::Engine, Option<FieldRef>) {
        let (state, compiled, order, aggregate) = self.compile_state(aggregate_field);

        let mut engine = self.source.begin(&state.root);
        for join in &compiled.joins {
            engine.add_join(join);
        }
        if let Some(predicate) = &compiled.predicate {
            engine.add_where(predicate);
        }
        for (name, value) in &compiled.bindings {
            engine.bind(name, value);
        }
        for (field, direction) in &order {
            engine.set_order(field, *direction);
        }
        if apply_paging {
            if let Some(limit) = state.limit {
                engine.set_limit(limit);
            }
            if let Some(offset) = state.offset {
                engine.set_offset(offset);
            }
        }
        if let Some(cache) = &state.cache {
            engine.set_cache(cache);
        }

        (engine, aggregate)
    }

    // ------------------------------------------------------------------
    // Terminals
    // ------------------------------------------------------------------

    pub fn get(&self) -> Result<Vec<RowOf<S>>, InternalError> {
        let (mut engine, _) = self.prepare(true, None);

        engine.execute()
    }

    pub fn first(&self) -> Result<Option<RowOf<S>>, InternalError> {
        let (mut engine, _) = self.prepare(true, None);
        engine.set_limit(1);

        Ok(engine.execute()?.into_iter().next())
    }

    /// Row count for the accumulated criteria. Never sees limit/offset.
    pub fn count(&self) -> Result<u64, InternalError> {
        let (mut engine, _) = self.prepare(false, None);

        scalar_count(engine.execute_scalar(Aggregate::Count, None)?)
    }

    pub fn sum(&self, field: &str) -> Result<Value, InternalError> {
        self.scalar(Aggregate::Sum, field)
    }

    pub fn avg(&self, field: &str) -> Result<Value, InternalError> {
        self.scalar(Aggregate::Avg, field)
    }

    pub fn max(&self, field: &str) -> Result<Value, InternalError> {
        self.scalar(Aggregate::Max, field)
    }

    pub fn min(&self, field: &str) -> Result<Value, InternalError> {
        self.scalar(Aggregate::Min, field)
    }

    pub fn exists(&self) -> Result<bool, InternalError> {
        Ok(self.count()? > 0)
    }

    /// Two materializations against independently fresh engines: a count
    /// pass that never sees paging, then a limited/offset fetch pass.
    pub fn paginate(&self, page: u64, per_page: u64) -> Result<Page<RowOf<S>>, InternalError> {
        let page = page.max(1);
        let total = self.count()?;

        let (mut engine, _) = self.prepare(false, None);
        engine.set_limit(per_page);
        engine.set_offset((page - 1).saturating_mul(per_page));
        let items = engine.execute()?;

        Ok(Page::new(items, total, page, per_page))
    }

    fn scalar(&self, aggregate: Aggregate, field: &str) -> Result<Value, InternalError> {
        let (mut engine, target) = self.prepare(false, Some(field));

        engine.execute_scalar(aggregate, target.as_ref())
    }

    fn map_criteria(mut self, f: impl FnOnce(CriteriaBuilder) -> CriteriaBuilder) -> Self {
        let builder = CriteriaBuilder::from(std::mem::take(&mut self.state.criteria));
        self.state.criteria = f(builder).build();
        self
    }
}

fn scalar_count(value: Value) -> Result<u64, InternalError> {
    match value {
        Value::Uint(n) => Ok(n),
        Value::Int(n) => u64::try_from(n)
            .map_err(|_| InternalError::builder_unsupported("count scalar is negative")),
        other => Err(InternalError::builder_unsupported(format!(
            "count scalar must be numeric, got {other:?}"
        ))),
    }
}
