use crate::query::{
    QueryError,
    function::{Arity, FunctionKind},
};
use serde::Serialize;

///
/// Filter AST
///
/// Pure, schema-agnostic representation of a request's constraints.
/// Nothing here knows about entity metadata; typing and path resolution
/// happen in the compiler.
///

///
/// Operand
///
/// Operand shape of a constraint; always agrees with the function's arity.
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operand {
    None,
    Value(String),
    Range(String, String),
    List(Vec<String>),
}

impl Operand {
    const fn arity(&self) -> Arity {
        match self {
            Self::None => Arity::Nullary,
            Self::Value(_) => Arity::Unary,
            Self::Range(..) => Arity::Binary,
            Self::List(_) => Arity::List,
        }
    }
}

///
/// Constraint
///
/// [`Constraint::new`] and the list builders validate their input. The
/// single-value builders (`eq`, `range`, `is_null`, ...) are infallible and
/// leave the field name unchecked; an empty field is rejected later, by the
/// flat encoder, the printer, or the path resolver.
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Constraint {
    field: String,
    function: FunctionKind,
    operand: Operand,
}

impl Constraint {
    /// Build a constraint, rejecting operands that do not fit the function.
    pub fn new(
        field: impl Into<String>,
        function: FunctionKind,
        operand: Operand,
    ) -> Result<Self, QueryError> {
        let field = field.into();
        if field.is_empty() {
            return Err(QueryError::EmptyField);
        }
        if operand.arity() != function.arity() {
            return Err(QueryError::OperandMismatch {
                field,
                function,
                expected: function.arity(),
            });
        }
        if matches!(&operand, Operand::List(values) if values.is_empty()) {
            return Err(QueryError::EmptyList { field });
        }

        Ok(Self {
            field,
            function,
            operand,
        })
    }

    // Shape is guaranteed by the caller's choice of operand.
    fn unchecked(field: impl Into<String>, function: FunctionKind, operand: Operand) -> Self {
        Self {
            field: field.into(),
            function,
            operand,
        }
    }

    #[must_use]
    pub fn eq(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::unchecked(field, FunctionKind::Eq, Operand::Value(value.into()))
    }

    #[must_use]
    pub fn neq(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::unchecked(field, FunctionKind::Neq, Operand::Value(value.into()))
    }

    #[must_use]
    pub fn lt(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::unchecked(field, FunctionKind::Lt, Operand::Value(value.into()))
    }

    #[must_use]
    pub fn le(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::unchecked(field, FunctionKind::Le, Operand::Value(value.into()))
    }

    #[must_use]
    pub fn gt(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::unchecked(field, FunctionKind::Gt, Operand::Value(value.into()))
    }

    #[must_use]
    pub fn ge(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::unchecked(field, FunctionKind::Ge, Operand::Value(value.into()))
    }

    #[must_use]
    pub fn contains(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::unchecked(field, FunctionKind::Contains, Operand::Value(value.into()))
    }

    #[must_use]
    pub fn starts_with(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::unchecked(field, FunctionKind::StartsWith, Operand::Value(value.into()))
    }

    #[must_use]
    pub fn range(
        field: impl Into<String>,
        low: impl Into<String>,
        high: impl Into<String>,
    ) -> Self {
        Self::unchecked(
            field,
            FunctionKind::Range,
            Operand::Range(low.into(), high.into()),
        )
    }

    #[must_use]
    pub fn is_null(field: impl Into<String>) -> Self {
        Self::unchecked(field, FunctionKind::IsNull, Operand::None)
    }

    #[must_use]
    pub fn is_not_null(field: impl Into<String>) -> Self {
        Self::unchecked(field, FunctionKind::NotNull, Operand::None)
    }

    pub fn in_list<I, S>(field: impl Into<String>, values: I) -> Result<Self, QueryError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values = values.into_iter().map(Into::into).collect();

        Self::new(field, FunctionKind::In, Operand::List(values))
    }

    pub fn not_in<I, S>(field: impl Into<String>, values: I) -> Result<Self, QueryError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values = values.into_iter().map(Into::into).collect();

        Self::new(field, FunctionKind::NotIn, Operand::List(values))
    }

    /// Compare `field` against another field path using a ref function.
    pub fn field_ref(
        field: impl Into<String>,
        function: FunctionKind,
        other: impl Into<String>,
    ) -> Result<Self, QueryError> {
        let field = field.into();
        if !function.is_field_ref() {
            return Err(QueryError::NotAFieldRef { field, function });
        }

        Self::new(field, function, Operand::Value(other.into()))
    }

    #[must_use]
    pub fn eq_ref(field: impl Into<String>, other: impl Into<String>) -> Self {
        Self::unchecked(field, FunctionKind::EqRef, Operand::Value(other.into()))
    }

    #[must_use]
    pub fn neq_ref(field: impl Into<String>, other: impl Into<String>) -> Self {
        Self::unchecked(field, FunctionKind::NeqRef, Operand::Value(other.into()))
    }

    #[must_use]
    pub fn lt_ref(field: impl Into<String>, other: impl Into<String>) -> Self {
        Self::unchecked(field, FunctionKind::LtRef, Operand::Value(other.into()))
    }

    #[must_use]
    pub fn le_ref(field: impl Into<String>, other: impl Into<String>) -> Self {
        Self::unchecked(field, FunctionKind::LeRef, Operand::Value(other.into()))
    }

    #[must_use]
    pub fn gt_ref(field: impl Into<String>, other: impl Into<String>) -> Self {
        Self::unchecked(field, FunctionKind::GtRef, Operand::Value(other.into()))
    }

    #[must_use]
    pub fn ge_ref(field: impl Into<String>, other: impl Into<String>) -> Self {
        Self::unchecked(field, FunctionKind::GeRef, Operand::Value(other.into()))
    }

    #[must_use]
    pub fn field(&self) -> &str {
        &self.field
    }

    #[must_use]
    pub const fn function(&self) -> FunctionKind {
        self.function
    }

    #[must_use]
    pub const fn operand(&self) -> &Operand {
        &self.operand
    }

    /// First operand (unary value or range lower bound).
    #[must_use]
    pub fn value(&self) -> Option<&str> {
        match &self.operand {
            Operand::Value(v) | Operand::Range(v, _) => Some(v),
            Operand::None | Operand::List(_) => None,
        }
    }

    /// Second operand (range upper bound).
    #[must_use]
    pub fn value2(&self) -> Option<&str> {
        match &self.operand {
            Operand::Range(_, v) => Some(v),
            _ => None,
        }
    }

    /// Literal list of a membership constraint.
    #[must_use]
    pub fn values(&self) -> &[String] {
        match &self.operand {
            Operand::List(values) => values,
            _ => &[],
        }
    }

    /// The inverted constraint, when the function has an inverse.
    #[must_use]
    pub fn inverted(&self) -> Option<Self> {
        let function = self.function.inverse()?;

        Some(Self {
            field: self.field.clone(),
            function,
            operand: self.operand.clone(),
        })
    }
}

///
/// GroupOp
///

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupOp {
    And,
    Or,
    /// None of the children hold (negated disjunction).
    None,
}

impl GroupOp {
    #[must_use]
    pub const fn keyword(self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or | Self::None => "OR",
        }
    }
}

///
/// Group
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Group {
    op: GroupOp,
    children: Vec<Line>,
}

impl Group {
    #[must_use]
    pub const fn new(op: GroupOp) -> Self {
        Self {
            op,
            children: Vec::new(),
        }
    }

    #[must_use]
    pub const fn and() -> Self {
        Self::new(GroupOp::And)
    }

    #[must_use]
    pub const fn or() -> Self {
        Self::new(GroupOp::Or)
    }

    #[must_use]
    pub const fn with_children(op: GroupOp, children: Vec<Line>) -> Self {
        Self { op, children }
    }

    /// Append a child and return the group (builder style).
    #[must_use]
    pub fn with(mut self, line: impl Into<Line>) -> Self {
        self.children.push(line.into());
        self
    }

    pub fn push(&mut self, line: impl Into<Line>) {
        self.children.push(line.into());
    }

    pub(crate) fn clear(&mut self) {
        self.children.clear();
    }

    /// OR together one EQ constraint per value; a single value yields the bare
    /// constraint.
    #[must_use]
    pub fn eq_any<I, S>(field: &str, values: I) -> Line
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut children: Vec<Line> = values
            .into_iter()
            .map(|value| Constraint::eq(field, value).into())
            .collect();

        if children.len() == 1 {
            children.remove(0)
        } else {
            Self::with_children(GroupOp::Or, children).into()
        }
    }

    #[must_use]
    pub const fn op(&self) -> GroupOp {
        self.op
    }

    #[must_use]
    pub fn children(&self) -> &[Line] {
        &self.children
    }

    #[must_use]
    pub fn into_children(self) -> Vec<Line> {
        self.children
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.children.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Negate a group as written inside `NOT ( ... )`.
    ///
    /// An OR group (or any group with at most one child) becomes NONE over
    /// the same children; an AND group becomes OR over the negated children.
    #[must_use]
    pub fn negate_parsed(self) -> Self {
        match self.op {
            GroupOp::And if self.children.len() > 1 => Self::with_children(
                GroupOp::Or,
                self.children.into_iter().map(Line::negate).collect(),
            ),
            GroupOp::None => Self::with_children(GroupOp::Or, self.children),
            _ => Self::with_children(GroupOp::None, self.children),
        }
    }

    /// Unwrap a single-child AND/OR group into its child.
    /// NONE groups always stay wrapped.
    #[must_use]
    pub fn collapse(mut self) -> Line {
        if self.children.len() == 1 && self.op != GroupOp::None {
            self.children.remove(0)
        } else {
            Line::Group(self)
        }
    }
}

///
/// Line
///
/// One entry in a group: a constraint or a nested group.
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Line {
    Constraint(Constraint),
    Group(Group),
}

impl Line {
    /// Logical negation by De Morgan.
    #[must_use]
    pub fn negate(self) -> Self {
        match self {
            Self::Constraint(constraint) => match constraint.inverted() {
                Some(inverted) => Self::Constraint(inverted),
                None => Self::Group(Group::with_children(
                    GroupOp::None,
                    vec![Self::Constraint(constraint)],
                )),
            },
            Self::Group(group) => match group.op {
                GroupOp::And => Self::Group(Group::with_children(
                    GroupOp::Or,
                    group.children.into_iter().map(Self::negate).collect(),
                )),
                GroupOp::Or => Self::Group(Group::with_children(GroupOp::None, group.children)),
                GroupOp::None => Group::with_children(GroupOp::Or, group.children).collapse(),
            },
        }
    }

    #[must_use]
    pub const fn as_constraint(&self) -> Option<&Constraint> {
        match self {
            Self::Constraint(constraint) => Some(constraint),
            Self::Group(_) => None,
        }
    }

    #[must_use]
    pub const fn as_group(&self) -> Option<&Group> {
        match self {
            Self::Group(group) => Some(group),
            Self::Constraint(_) => None,
        }
    }
}

impl From<Constraint> for Line {
    fn from(constraint: Constraint) -> Self {
        Self::Constraint(constraint)
    }
}

impl From<Group> for Line {
    fn from(group: Group) -> Self {
        Self::Group(group)
    }
}
