use crate::compile::literal::Value;
use derive_more::{Deref, IntoIterator};
use serde::Serialize;
use std::fmt;

///
/// CompareOp
///

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "<>",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }

    #[must_use]
    pub const fn is_ordering(self) -> bool {
        !matches!(self, Self::Eq | Self::Ne)
    }
}

///
/// CompiledPredicate
///
/// Backend-neutral predicate tree. Literal operands are referenced by the
/// name of their [`Binding`].
///

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompiledPredicate {
    Compare {
        column: String,
        op: CompareOp,
        param: String,
    },
    CompareColumns {
        left: String,
        op: CompareOp,
        right: String,
    },
    Like {
        column: String,
        param: String,
        negated: bool,
    },
    Between {
        column: String,
        low: String,
        high: String,
    },
    InList {
        column: String,
        param: String,
        negated: bool,
    },
    IsNull {
        column: String,
        negated: bool,
    },
    /// Restrict the root alias to a set of concrete classes.
    TypeIn {
        alias: String,
        param: String,
    },
    And(Vec<Self>),
    Or(Vec<Self>),
    Not(Box<Self>),
}

impl CompiledPredicate {
    /// Conjunction, collapsing a single child.
    #[must_use]
    pub fn and(mut children: Vec<Self>) -> Self {
        if children.len() == 1 {
            children.remove(0)
        } else {
            Self::And(children)
        }
    }

    /// Disjunction, collapsing a single child.
    #[must_use]
    pub fn or(mut children: Vec<Self>) -> Self {
        if children.len() == 1 {
            children.remove(0)
        } else {
            Self::Or(children)
        }
    }

    #[must_use]
    pub fn not(inner: Self) -> Self {
        Self::Not(Box::new(inner))
    }

    /// Number of leaf predicates in the tree.
    #[must_use]
    pub fn leaf_count(&self) -> usize {
        match self {
            Self::And(children) | Self::Or(children) => children.iter().map(Self::leaf_count).sum(),
            Self::Not(inner) => inner.leaf_count(),
            _ => 1,
        }
    }
}

impl fmt::Display for CompiledPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Compare { column, op, param } => write!(f, "{column} {} :{param}", op.symbol()),
            Self::CompareColumns { left, op, right } => {
                write!(f, "{left} {} {right}", op.symbol())
            }
            Self::Like {
                column,
                param,
                negated,
            } => {
                let not = if *negated { "NOT " } else { "" };
                write!(f, "{column} {not}LIKE :{param}")
            }
            Self::Between { column, low, high } => {
                write!(f, "{column} BETWEEN :{low} AND :{high}")
            }
            Self::InList {
                column,
                param,
                negated,
            } => {
                let not = if *negated { "NOT " } else { "" };
                write!(f, "{column} {not}IN (:{param})")
            }
            Self::IsNull { column, negated } => {
                let not = if *negated { "NOT " } else { "" };
                write!(f, "{column} IS {not}NULL")
            }
            Self::TypeIn { alias, param } => write!(f, "TYPE({alias}) IN (:{param})"),
            Self::And(children) => write_joined(f, children, " AND "),
            Self::Or(children) => write_joined(f, children, " OR "),
            Self::Not(inner) => match inner.as_ref() {
                Self::And(_) | Self::Or(_) => write!(f, "NOT {inner}"),
                _ => write!(f, "NOT ({inner})"),
            },
        }
    }
}

fn write_joined(
    f: &mut fmt::Formatter<'_>,
    children: &[CompiledPredicate],
    separator: &str,
) -> fmt::Result {
    f.write_str("(")?;
    for (i, child) in children.iter().enumerate() {
        if i > 0 {
            f.write_str(separator)?;
        }
        write!(f, "{child}")?;
    }
    f.write_str(")")
}

///
/// Binding
///

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Binding {
    pub name: String,
    pub value: Value,
}

impl fmt::Display for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, ":{} = {}", self.name, self.value)
    }
}

///
/// Bindings
///
/// Parameter values in allocation order.
///

#[derive(Clone, Debug, Default, Deref, IntoIterator, PartialEq, Serialize)]
#[into_iterator(owned, ref)]
pub struct Bindings(Vec<Binding>);

impl Bindings {
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    pub(crate) fn push(&mut self, name: String, value: Value) {
        self.0.push(Binding { name, value });
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0
            .iter()
            .find(|binding| binding.name == name)
            .map(|binding| &binding.value)
    }
}
