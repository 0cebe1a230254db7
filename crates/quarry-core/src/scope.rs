use crate::{
    builder::QueryState,
    obs::{self, CompileEvent, SkipReason},
};
use std::{collections::HashMap, fmt, sync::Arc};

/// A named, reusable fragment: a plain function over the accumulated
/// query state. No shared mutable capture; the state is handed in.
pub type ScopeFn = Arc<dyn Fn(&mut QueryState) + Send + Sync>;

///
/// ScopeRegistry
///
/// Global scopes run at every materialization, in registration order,
/// unless excluded by name or wholesale. Macros run on demand via
/// `apply_macro`. Both are composed by simple sequential application.
///

#[derive(Clone, Default)]
pub struct ScopeRegistry {
    global: Vec<(String, ScopeFn)>,
    macros: HashMap<String, ScopeFn>,
}

impl ScopeRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a global scope. Re-registering a name replaces the scope
    /// in place, keeping its original position in the application order.
    pub fn register_global(
        &mut self,
        name: impl Into<String>,
        scope: impl Fn(&mut QueryState) + Send + Sync + 'static,
    ) {
        let name = name.into();
        let scope: ScopeFn = Arc::new(scope);

        match self.global.iter_mut().find(|(existing, _)| *existing == name) {
            Some(entry) => entry.1 = scope,
            None => self.global.push((name, scope)),
        }
    }

    /// Register a named macro. Last write wins.
    pub fn register_macro(
        &mut self,
        name: impl Into<String>,
        scope: impl Fn(&mut QueryState) + Send + Sync + 'static,
    ) {
        self.macros.insert(name.into(), Arc::new(scope));
    }

    #[must_use]
    pub fn has_macro(&self, name: &str) -> bool {
        self.macros.contains_key(name)
    }

    pub(crate) fn apply_globals(&self, state: &mut QueryState) {
        if state.skip_all_scopes {
            return;
        }

        for (name, scope) in &self.global {
            if !state.skip_scopes.contains(name) {
                scope(state);
            }
        }
    }

    /// Unknown macro names are a recorded no-op, consistent with the
    /// compiler's leniency toward plausible-but-wrong input.
    pub(crate) fn apply_macro(&self, name: &str, state: &mut QueryState) {
        match self.macros.get(name) {
            Some(scope) => scope(state),
            None => obs::emit(CompileEvent::NodeSkipped {
                reason: SkipReason::MacroMissing,
            }),
        }
    }
}

impl fmt::Debug for ScopeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let globals: Vec<&str> = self.global.iter().map(|(name, _)| name.as_str()).collect();
        let mut macros: Vec<&str> = self.macros.keys().map(String::as_str).collect();
        macros.sort_unstable();

        f.debug_struct("ScopeRegistry")
            .field("global", &globals)
            .field("macros", &macros)
            .finish()
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::criteria::CriteriaNode;

    fn state() -> QueryState {
        QueryState::new("u")
    }

    #[test]
    fn globals_apply_in_registration_order() {
        let mut registry = ScopeRegistry::new();
        registry.register_global("active", |state| {
            state.criteria.push(CriteriaNode::eq("active", true));
        });
        registry.register_global("tenant", |state| {
            state.criteria.push(CriteriaNode::eq("tenant_id", 7i64));
        });

        let mut state = state();
        registry.apply_globals(&mut state);

        assert_eq!(
            state.criteria.0,
            vec![
                CriteriaNode::eq("active", true),
                CriteriaNode::eq("tenant_id", 7i64),
            ]
        );
    }

    #[test]
    fn re_registration_replaces_in_place() {
        let mut registry = ScopeRegistry::new();
        registry.register_global("active", |state| {
            state.criteria.push(CriteriaNode::eq("active", true));
        });
        registry.register_global("tenant", |state| {
            state.criteria.push(CriteriaNode::eq("tenant_id", 7i64));
        });
        registry.register_global("active", |state| {
            state.criteria.push(CriteriaNode::eq("active", false));
        });

        let mut state = state();
        registry.apply_globals(&mut state);

        assert_eq!(
            state.criteria.0,
            vec![
                CriteriaNode::eq("active", false),
                CriteriaNode::eq("tenant_id", 7i64),
            ]
        );
    }

    #[test]
    fn exclusion_by_name_and_wholesale() {
        let mut registry = ScopeRegistry::new();
        registry.register_global("active", |state| {
            state.criteria.push(CriteriaNode::eq("active", true));
        });
        registry.register_global("tenant", |state| {
            state.criteria.push(CriteriaNode::eq("tenant_id", 7i64));
        });

        let mut state = state();
        state.skip_scopes.insert("active".to_string());
        registry.apply_globals(&mut state);
        assert_eq!(state.criteria.0, vec![CriteriaNode::eq("tenant_id", 7i64)]);

        let mut state = QueryState::new("u");
        state.skip_all_scopes = true;
        registry.apply_globals(&mut state);
        assert!(state.criteria.is_empty());
    }

    #[test]
    fn unknown_macro_is_a_recorded_no_op() {
        obs::metrics_reset_all();

        let registry = ScopeRegistry::new();
        let mut state = state();
        registry.apply_macro("missing", &mut state);

        assert!(state.criteria.is_empty());
        assert_eq!(obs::metrics_report().nodes_skipped, 1);
    }

    #[test]
    fn macro_registration_is_last_write_wins() {
        let mut registry = ScopeRegistry::new();
        registry.register_macro("recent", |state| {
            state.criteria.push(CriteriaNode::clause("age", "<", 30i64));
        });
        registry.register_macro("recent", |state| {
            state.criteria.push(CriteriaNode::clause("age", "<", 7i64));
        });

        let mut state = state();
        registry.apply_macro("recent", &mut state);

        assert_eq!(
            state.criteria.0,
            vec![CriteriaNode::clause("age", "<", 7i64)]
        );
    }
}
