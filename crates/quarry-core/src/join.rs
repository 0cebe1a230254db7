use crate::{
    obs::{self, CompileEvent},
    predicate::FieldRef,
};
use convert_case::{Case, Casing};
use serde::Serialize;
use std::collections::BTreeSet;

/// Separator between relation segments in a dotted field path.
pub const PATH_SEPARATOR: char = '.';

///
/// JoinKind
///

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub enum JoinKind {
    Left,
    Inner,
    Right,
}

///
/// ConditionKind
///
/// How an explicit join condition combines with the relation's own
/// association condition.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub enum ConditionKind {
    On,
    With,
}

///
/// JoinSpec
///
/// One relation traversal. `(relation_path, alias)` is the identity used
/// for per-run deduplication; the condition is opaque to the compiler and
/// interpreted by the execution engine.
///

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct JoinSpec {
    pub kind: JoinKind,
    pub relation_path: String,
    pub alias: String,
    pub condition: Option<(ConditionKind, String)>,
}

impl JoinSpec {
    pub fn new(kind: JoinKind, relation_path: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            kind,
            relation_path: relation_path.into(),
            alias: alias.into(),
            condition: None,
        }
    }

    pub fn left(relation_path: impl Into<String>, alias: impl Into<String>) -> Self {
        Self::new(JoinKind::Left, relation_path, alias)
    }

    pub fn inner(relation_path: impl Into<String>, alias: impl Into<String>) -> Self {
        Self::new(JoinKind::Inner, relation_path, alias)
    }

    pub fn right(relation_path: impl Into<String>, alias: impl Into<String>) -> Self {
        Self::new(JoinKind::Right, relation_path, alias)
    }

    #[must_use]
    pub fn with_condition(mut self, kind: ConditionKind, expression: impl Into<String>) -> Self {
        self.condition = Some((kind, expression.into()));
        self
    }

    fn dedup_key(&self) -> (String, String) {
        (self.relation_path.clone(), self.alias.clone())
    }
}

///
/// JoinResolver
///
/// Owns join state for one compile pass: the known-alias scope, the
/// emitted-join set, and the ordered join list. Shared across every
/// branch of a compile so sibling criteria never duplicate a join.
///
/// This component manipulates strings and aliases only; whether a
/// relation segment actually exists is the execution engine's problem.
///

#[derive(Debug)]
pub struct JoinResolver {
    root: String,
    known: BTreeSet<String>,
    seen: BTreeSet<(String, String)>,
    joins: Vec<JoinSpec>,
}

impl JoinResolver {
    #[must_use]
    pub fn new(root: impl Into<String>) -> Self {
        let root = root.into();
        let mut known = BTreeSet::new();
        known.insert(root.clone());

        Self {
            root,
            known,
            seen: BTreeSet::new(),
            joins: Vec::new(),
        }
    }

    #[must_use]
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Seed a caller-configured join ahead of auto-detection.
    /// Same idempotent-by-`(relation_path, alias)` rule as emitted joins.
    pub fn seed(&mut self, join: JoinSpec) {
        if self.seen.insert(join.dedup_key()) {
            self.known.insert(join.alias.clone());
            self.joins.push(join);
            obs::emit(CompileEvent::JoinEmitted);
        } else {
            obs::emit(CompileEvent::JoinDeduplicated);
        }
    }

    /// Resolve a (possibly dotted) field path to an alias-qualified
    /// reference, emitting the minimal chain of left joins needed to
    /// reach it. Resolving the same path twice is a no-op on the join
    /// list.
    pub fn resolve(&mut self, path: &str) -> FieldRef {
        let segments: Vec<&str> = path.split(PATH_SEPARATOR).collect();

        let (first, rest) = match segments.split_first() {
            Some((first, rest)) if !rest.is_empty() => (*first, rest),
            _ => return FieldRef::new(self.root.clone(), path),
        };

        // Pre-aliased paths pass through untouched: callers may mix
        // explicit aliases with relation-path auto-joins.
        if self.known.contains(first) {
            return FieldRef::new(first, rest.join("."));
        }

        let mut current = self.root.clone();
        let last = segments.len() - 1;
        for (index, segment) in segments[..last].iter().enumerate() {
            let alias = derive_alias(segment, index + 1);
            let relation_path = format!("{current}{PATH_SEPARATOR}{segment}");

            if self.seen.insert((relation_path.clone(), alias.clone())) {
                self.known.insert(alias.clone());
                self.joins.push(JoinSpec::left(relation_path, alias.clone()));
                obs::emit(CompileEvent::JoinEmitted);
            } else {
                obs::emit(CompileEvent::JoinDeduplicated);
            }

            current = alias;
        }

        FieldRef::new(current, segments[last])
    }

    #[must_use]
    pub fn joins(&self) -> &[JoinSpec] {
        &self.joins
    }

    #[must_use]
    pub fn into_joins(self) -> Vec<JoinSpec> {
        self.joins
    }
}

/// Deterministic alias for an intermediate relation segment: snake-cased
/// segment plus its 1-based depth, so sibling relations with the same
/// name at different depths cannot collide.
fn derive_alias(segment: &str, depth: usize) -> String {
    format!("{}_{depth}", segment.to_case(Case::Snake))
}

///
/// TESTS
///
