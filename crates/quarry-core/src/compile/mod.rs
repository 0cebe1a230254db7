#[cfg(test)]
mod tests;

use crate::{
    criteria::{Criteria, CriteriaNode, GroupKind},
    join::{JoinResolver, JoinSpec},
    obs::{self, CompileEvent, SkipReason},
    operator::{Builtin, OperatorRegistry, OperatorRender},
    predicate::{Binder, Expr, FieldRef},
    value::Value,
};

///
/// Compiled
///
/// The full output of one compile run, ready for the execution engine.
/// Immutable once returned; safe to hand to the engine from any thread.
///

#[derive(Clone, Debug, PartialEq)]
pub struct Compiled {
    pub predicate: Option<Expr>,
    pub joins: Vec<JoinSpec>,
    pub bindings: Vec<(String, Value)>,
}

///
/// Compiler
///
/// One value per compile run. The join resolver and binder are owned here
/// and shared across every branch of the walk, so joins dedup across
/// sibling branches and parameter names never collide within a run.
///

pub struct Compiler<'r> {
    registry: &'r OperatorRegistry,
    resolver: JoinResolver,
    binder: Binder,
}

impl<'r> Compiler<'r> {
    #[must_use]
    pub fn new(registry: &'r OperatorRegistry, root: impl Into<String>) -> Self {
        Self {
            registry,
            resolver: JoinResolver::new(root),
            binder: Binder::new(),
        }
    }

    /// Seed a caller-configured join ahead of auto-detection.
    pub fn join(&mut self, join: JoinSpec) {
        self.resolver.seed(join);
    }

    /// Resolve a field path through this run's join state. Exposed so
    /// callers (the fluent builder's ordering fields, aggregate targets)
    /// share the criteria pass's dedup set.
    pub fn resolve_field(&mut self, path: &str) -> FieldRef {
        self.resolver.resolve(path)
    }

    /// Walk the criteria sequence into one boolean expression.
    /// Empty input means "no filtering", not an error.
    pub fn compile(&mut self, criteria: &Criteria) -> Option<Expr> {
        let exprs = self.compile_sequence(criteria);

        Expr::conjoin(exprs)
    }

    /// Close the run, yielding the ordered joins and bindings.
    #[must_use]
    pub fn finish(self) -> (Vec<JoinSpec>, Vec<(String, Value)>) {
        (self.resolver.into_joins(), self.binder.into_bindings())
    }

    fn compile_sequence(&mut self, nodes: &[CriteriaNode]) -> Vec<Expr> {
        nodes
            .iter()
            .filter_map(|node| self.compile_node(node))
            .collect()
    }

    fn compile_node(&mut self, node: &CriteriaNode) -> Option<Expr> {
        match node {
            CriteriaNode::Equality { field, value } => {
                let field = self.resolver.resolve(field);

                // Named equality has fixed semantics (null → IS NULL,
                // list → IN); it does not consult the registry.
                Builtin::Eq.render(&field, value, &mut self.binder)
            }
            CriteriaNode::Clause {
                field,
                operator,
                value,
            } => {
                let field = self.resolver.resolve(field);
                let expr = self
                    .registry
                    .apply(operator, &field, value, &mut self.binder);

                if expr.is_none() {
                    obs::emit(CompileEvent::NodeSkipped {
                        reason: SkipReason::OperatorArity,
                    });
                }

                expr
            }
            CriteriaNode::Group { kind, children } => {
                let exprs = self.compile_sequence(children);

                match kind {
                    GroupKind::And => Expr::conjoin(exprs),
                    GroupKind::Or => Expr::disjoin(exprs),
                    GroupKind::Not => Expr::conjoin(exprs).map(Expr::not),
                }
            }
        }
    }
}

/// One-shot convenience: compile `criteria` against `root` in a fresh run.
#[must_use]
pub fn compile(registry: &OperatorRegistry, root: &str, criteria: &Criteria) -> Compiled {
    let mut compiler = Compiler::new(registry, root);
    let predicate = compiler.compile(criteria);
    let (joins, bindings) = compiler.finish();

    Compiled {
        predicate,
        joins,
        bindings,
    }
}
