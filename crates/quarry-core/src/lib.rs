//! Core runtime for Quarry: the criteria grammar, join resolution, the
//! operator registry, the criteria compiler, and the fluent query builder
//! that materializes against an external execution engine.
#![warn(unreachable_pub)]

// public exports are one module level down
pub mod builder;
pub mod compile;
pub mod criteria;
pub mod engine;
pub mod error;
pub mod join;
pub mod obs;
pub mod operator;
pub mod predicate;
pub mod scope;
pub mod value;

// test
#[cfg(test)]
pub(crate) mod test_support;

///
/// Prelude
///
/// Prelude contains only domain vocabulary.
/// Engine implementations and observability stay behind their modules.
///

pub mod prelude {
    pub use crate::{
        builder::{CriteriaBuilder, QueryBuilder},
        compile::{Compiled, Compiler},
        criteria::{Criteria, CriteriaNode, GroupKind},
        engine::{Aggregate, CacheDirective, OrderDirection, Page, QueryEngine, QuerySource},
        error::InternalError,
        join::{ConditionKind, JoinKind, JoinSpec},
        operator::{OperatorRegistry, OperatorRender},
        predicate::{Binder, CmpOp, Expr, FieldRef},
        scope::ScopeRegistry,
        value::{FieldValue, Value},
    };
}
