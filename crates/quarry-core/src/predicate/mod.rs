
use crate::{
    obs::{self, CompileEvent},
    value::Value,
};
use serde::Serialize;
use std::fmt;

///
/// FieldRef
///
/// A fully resolved field reference: alias-qualified, join-free.
/// Produced by the join resolver; the compiler never sees dotted paths
/// past this point.
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct FieldRef {
    pub qualifier: String,
    pub name: String,
}

impl FieldRef {
    pub fn new(qualifier: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            qualifier: qualifier.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.qualifier, self.name)
    }
}

///
/// CmpOp
///

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
    Like,
    NotLike,
}

impl CmpOp {
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Like => "LIKE",
            Self::NotLike => "NOT LIKE",
        }
    }
}

impl fmt::Display for CmpOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

///
/// Expr
///
/// Backend-agnostic boolean expression tree handed to the execution
/// engine. Immutable once returned from a compile run; parameters are
/// referenced by name and live in the run's bindings list.
///

#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum Expr {
    True,
    False,
    Cmp {
        field: FieldRef,
        op: CmpOp,
        param: String,
    },
    InList {
        field: FieldRef,
        params: Vec<String>,
        negated: bool,
    },
    Null {
        field: FieldRef,
        negated: bool,
    },
    And(Vec<Expr>),
    Or(Vec<Expr>),
    Not(Box<Expr>),
}

impl Expr {
    /// Combine two expressions into an `And`, flattening nested `And`s so
    /// `(a AND b) AND c` becomes `AND[a, b, c]`.
    #[must_use]
    pub fn and(self, other: Self) -> Self {
        match (self, other) {
            (Self::And(mut a), Self::And(mut b)) => {
                a.append(&mut b);
                Self::And(a)
            }
            (Self::And(mut a), b) => {
                a.push(b);
                Self::And(a)
            }
            (a, Self::And(mut b)) => {
                let mut list = vec![a];
                list.append(&mut b);
                Self::And(list)
            }
            (a, b) => Self::And(vec![a, b]),
        }
    }

    /// Combine two expressions into an `Or`, flattening like [`Expr::and`].
    #[must_use]
    pub fn or(self, other: Self) -> Self {
        match (self, other) {
            (Self::Or(mut a), Self::Or(mut b)) => {
                a.append(&mut b);
                Self::Or(a)
            }
            (Self::Or(mut a), b) => {
                a.push(b);
                Self::Or(a)
            }
            (a, Self::Or(mut b)) => {
                let mut list = vec![a];
                list.append(&mut b);
                Self::Or(list)
            }
            (a, b) => Self::Or(vec![a, b]),
        }
    }

    /// Negate this expression.
    #[must_use]
    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        Self::Not(Box::new(self))
    }

    /// AND-combine a compiled sequence: absent for zero elements, a single
    /// element unwrapped (no redundant grouping), `And` otherwise.
    #[must_use]
    pub fn conjoin(mut exprs: Vec<Self>) -> Option<Self> {
        match exprs.len() {
            0 => None,
            1 => exprs.pop(),
            _ => Some(Self::And(exprs)),
        }
    }

    /// OR-combine a compiled sequence with the same unwrap rule.
    #[must_use]
    pub fn disjoin(mut exprs: Vec<Self>) -> Option<Self> {
        match exprs.len() {
            0 => None,
            1 => exprs.pop(),
            _ => Some(Self::Or(exprs)),
        }
    }

    /// Simplify the expression recursively:
    /// - eliminate double negation, `NOT TRUE`/`NOT FALSE`
    /// - apply De Morgan's laws to pushed-down negations
    /// - flatten nested `And`/`Or`
    /// - drop neutral elements and short-circuit on constants
    ///
    /// Never applied implicitly during compilation; compiled structure
    /// mirrors input structure.
    #[must_use]
    pub fn simplify(self) -> Self {
        match self {
            Self::Not(inner) => match *inner {
                Self::True => Self::False,
                Self::False => Self::True,
                Self::Not(inner2) => (*inner2).simplify(),
                Self::And(children) => {
                    Self::Or(children.into_iter().map(|c| c.not().simplify()).collect())
                }
                Self::Or(children) => {
                    Self::And(children.into_iter().map(|c| c.not().simplify()).collect())
                }
                leaf => Self::Not(Box::new(leaf.simplify())),
            },

            Self::And(children) => {
                let flat = Self::simplify_children(children, |e| matches!(e, Self::And(_)));

                if flat.iter().any(|e| matches!(e, Self::False)) {
                    Self::False
                } else {
                    let filtered: Vec<_> = flat
                        .into_iter()
                        .filter(|e| !matches!(e, Self::True))
                        .collect();

                    match filtered.len() {
                        0 => Self::True,
                        _ => Self::conjoin(filtered).unwrap_or(Self::True),
                    }
                }
            }

            Self::Or(children) => {
                let flat = Self::simplify_children(children, |e| matches!(e, Self::Or(_)));

                if flat.iter().any(|e| matches!(e, Self::True)) {
                    Self::True
                } else {
                    let filtered: Vec<_> = flat
                        .into_iter()
                        .filter(|e| !matches!(e, Self::False))
                        .collect();

                    match filtered.len() {
                        0 => Self::False,
                        _ => Self::disjoin(filtered).unwrap_or(Self::False),
                    }
                }
            }

            leaf => leaf,
        }
    }

    fn simplify_children(children: Vec<Self>, flatten_if: fn(&Self) -> bool) -> Vec<Self> {
        let mut flat = Vec::with_capacity(children.len());

        for child in children {
            let simplified = child.simplify();
            if flatten_if(&simplified) {
                if let Self::And(nested) | Self::Or(nested) = simplified {
                    flat.extend(nested);
                }
            } else {
                flat.push(simplified);
            }
        }

        flat
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::True => write!(f, "TRUE"),
            Self::False => write!(f, "FALSE"),
            Self::Cmp { field, op, param } => write!(f, "{field} {op} :{param}"),
            Self::InList {
                field,
                params,
                negated,
            } => {
                let keyword = if *negated { "NOT IN" } else { "IN" };
                write!(f, "{field} {keyword} (")?;
                for (i, param) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, ":{param}")?;
                }
                write!(f, ")")
            }
            Self::Null { field, negated } => {
                let keyword = if *negated { "IS NOT NULL" } else { "IS NULL" };
                write!(f, "{field} {keyword}")
            }
            Self::And(children) => fmt_group(f, children, " AND "),
            Self::Or(children) => fmt_group(f, children, " OR "),
            Self::Not(inner) => write!(f, "NOT ({inner})"),
        }
    }
}

fn fmt_group(f: &mut fmt::Formatter<'_>, children: &[Expr], sep: &str) -> fmt::Result {
    write!(f, "(")?;
    for (i, child) in children.iter().enumerate() {
        if i > 0 {
            write!(f, "{sep}")?;
        }
        write!(f, "{child}")?;
    }
    write!(f, ")")
}

///
/// Binder
///
/// Parameter-name source and ordered binding sink for one compile run.
/// The counter is seeded at construction, so names are unique per run and
/// assigned strictly in traversal order.
///

#[derive(Debug, Default)]
pub struct Binder {
    next: u32,
    bindings: Vec<(String, Value)>,
}

impl Binder {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            next: 0,
            bindings: Vec::new(),
        }
    }

    /// Reserve a fresh parameter name for `value` and record the binding.
    pub fn bind(&mut self, value: Value) -> String {
        let name = format!("p{}", self.next);
        self.next += 1;
        self.bindings.push((name.clone(), value));
        obs::emit(CompileEvent::ParamBound);

        name
    }

    #[must_use]
    pub fn bindings(&self) -> &[(String, Value)] {
        &self.bindings
    }

    #[must_use]
    pub fn into_bindings(self) -> Vec<(String, Value)> {
        self.bindings
    }
}
