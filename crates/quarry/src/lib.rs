//! Quarry — a criteria-to-query compiler for relational backends.
//!
//! ## Crate layout
//! - `core`: the whole compiler runtime — values, criteria grammar,
//!   predicate AST, join resolution, operator registry, fluent builder,
//!   scope composition, engine traits, and observability.
//!
//! The `prelude` module mirrors the surface a typical caller needs:
//! build criteria (literally or fluently), compile them, hand the result
//! to an execution engine.

pub use quarry_core as core;

// re-exports for the common path
pub use quarry_core::error::InternalError as Error;

//
// Consts
//

/// Workspace version re-export for downstream tooling/tests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

///
/// Prelude
///

pub mod prelude {
    pub use quarry_core::prelude::*;
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use crate::prelude::*;
    use serde_json::json;

    #[test]
    fn facade_compiles_criteria_end_to_end() {
        let registry = OperatorRegistry::with_builtins();
        let criteria = Criteria::parse(&json!([
            {"status": "active"},
            ["profile.city", "=", "berlin"],
        ]));

        let compiled = quarry_core::compile::compile(&registry, "u", &criteria);

        assert_eq!(
            compiled.predicate.map(|e| e.to_string()).as_deref(),
            Some("(u.status = :p0 AND profile_1.city = :p1)")
        );
        assert_eq!(
            compiled.joins,
            vec![JoinSpec::left("u.profile", "profile_1")]
        );
        assert_eq!(compiled.bindings.len(), 2);
    }

    #[test]
    fn version_is_exported() {
        assert!(!crate::VERSION.is_empty());
    }
}
