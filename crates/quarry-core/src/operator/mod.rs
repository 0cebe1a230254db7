mod builtin;


pub use builtin::Builtin;

use crate::{
    obs::{self, CompileEvent},
    predicate::{Binder, Expr, FieldRef},
    value::Value,
};
use std::{collections::HashMap, fmt, sync::Arc};

///
/// OperatorRender
///
/// One calling convention shared by built-in and user-registered
/// operators: given a resolved field reference, a value, and the run's
/// binder, produce one leaf predicate. `None` means the value shape is
/// malformed for this operator and the node is skipped.
///

pub trait OperatorRender: Send + Sync {
    fn render(&self, field: &FieldRef, value: &Value, binder: &mut Binder) -> Option<Expr>;
}

///
/// OperatorRegistry
///
/// Name → strategy lookup. Registration is last-write-wins; lookup is by
/// exact name. An unknown name falls back to equality — a documented
/// leniency policy inherited from the source design, surfaced through the
/// `OperatorFallback` metric rather than an error.
///
/// Registration is expected to happen during setup; the registry makes no
/// ordering guarantee for mutation concurrent with compilation.
///

#[derive(Clone)]
pub struct OperatorRegistry {
    ops: HashMap<String, Arc<dyn OperatorRender>>,
}

impl Default for OperatorRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl OperatorRegistry {
    /// An empty registry. Every clause routed through it falls back to
    /// equality; useful only as a base for fully custom operator sets.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            ops: HashMap::new(),
        }
    }

    /// The built-in operator set under all of its spellings.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        for (name, builtin) in Builtin::ALL {
            registry.register(name, builtin);
        }

        registry
    }

    pub fn register(&mut self, name: impl Into<String>, op: impl OperatorRender + 'static) {
        self.ops.insert(name.into(), Arc::new(op));
    }

    pub fn register_shared(&mut self, name: impl Into<String>, op: Arc<dyn OperatorRender>) {
        self.ops.insert(name.into(), op);
    }

    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.ops.contains_key(name)
    }

    /// Render `field <name> value`, falling back to an equality
    /// comparison when `name` is not registered.
    pub fn apply(
        &self,
        name: &str,
        field: &FieldRef,
        value: &Value,
        binder: &mut Binder,
    ) -> Option<Expr> {
        match self.ops.get(name) {
            Some(op) => op.render(field, value, binder),
            None => {
                obs::emit(CompileEvent::OperatorFallback);
                Builtin::Eq.render(field, value, binder)
            }
        }
    }
}

impl fmt::Debug for OperatorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.ops.keys().map(String::as_str).collect();
        names.sort_unstable();

        f.debug_struct("OperatorRegistry")
            .field("ops", &names)
            .finish()
    }
}
