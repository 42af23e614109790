use serde::Serialize;
use std::fmt;

///
/// Arity
///
/// Operand shape a function expects.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Arity {
    Nullary,
    Unary,
    Binary,
    List,
}

///
/// FunctionKind
///
/// The fixed set of comparison, membership, and string functions a
/// constraint may apply to a field.
///

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum FunctionKind {
    Eq = 0x01,
    Neq = 0x02,
    IsNull = 0x03,
    NotNull = 0x04,
    Contains = 0x05,
    NotContains = 0x06,
    StartsWith = 0x07,
    NotStartsWith = 0x08,
    Range = 0x09,
    Ge = 0x0a,
    Gt = 0x0b,
    Le = 0x0c,
    Lt = 0x0d,
    EqRef = 0x0e,
    NeqRef = 0x0f,
    LeRef = 0x10,
    LtRef = 0x11,
    GeRef = 0x12,
    GtRef = 0x13,
    In = 0x14,
    NotIn = 0x15,
}

impl FunctionKind {
    pub const ALL: [Self; 21] = [
        Self::Eq,
        Self::Neq,
        Self::IsNull,
        Self::NotNull,
        Self::Contains,
        Self::NotContains,
        Self::StartsWith,
        Self::NotStartsWith,
        Self::Range,
        Self::Ge,
        Self::Gt,
        Self::Le,
        Self::Lt,
        Self::EqRef,
        Self::NeqRef,
        Self::LeRef,
        Self::LtRef,
        Self::GeRef,
        Self::GtRef,
        Self::In,
        Self::NotIn,
    ];

    /// Flat-codec value marking an IS NULL constraint.
    pub const NULL_SENTINEL: &'static str = "_null";

    /// Flat-codec value marking an IS NOT NULL constraint.
    pub const NOT_NULL_SENTINEL: &'static str = "_notnull";

    /// Every encoded function prefix starts with this marker.
    pub const PREFIX_MARKER: &'static str = "_f_";

    /// Separator between the two operands of a binary function in the flat codec.
    pub const RANGE_SEPARATOR: &'static str = "..";

    #[must_use]
    pub const fn tag(self) -> u8 {
        self as u8
    }

    #[must_use]
    pub const fn arity(self) -> Arity {
        match self {
            Self::IsNull | Self::NotNull => Arity::Nullary,
            Self::Range => Arity::Binary,
            Self::In | Self::NotIn => Arity::List,
            _ => Arity::Unary,
        }
    }

    /// The logical negation of this function, when one exists.
    #[must_use]
    pub const fn inverse(self) -> Option<Self> {
        let inverse = match self {
            Self::Eq => Self::Neq,
            Self::Neq => Self::Eq,
            Self::IsNull => Self::NotNull,
            Self::NotNull => Self::IsNull,
            Self::Contains => Self::NotContains,
            Self::NotContains => Self::Contains,
            Self::StartsWith => Self::NotStartsWith,
            Self::NotStartsWith => Self::StartsWith,
            Self::Ge => Self::Lt,
            Self::Lt => Self::Ge,
            Self::Gt => Self::Le,
            Self::Le => Self::Gt,
            Self::EqRef => Self::NeqRef,
            Self::NeqRef => Self::EqRef,
            Self::GeRef => Self::LtRef,
            Self::LtRef => Self::GeRef,
            Self::GtRef => Self::LeRef,
            Self::LeRef => Self::GtRef,
            Self::In => Self::NotIn,
            Self::NotIn => Self::In,
            Self::Range => return None,
        };

        Some(inverse)
    }

    /// Whether the operand names another field rather than a literal.
    #[must_use]
    pub const fn is_field_ref(self) -> bool {
        matches!(
            self,
            Self::EqRef | Self::NeqRef | Self::LeRef | Self::LtRef | Self::GeRef | Self::GtRef
        )
    }

    /// Whether the function compares values by ordering.
    #[must_use]
    pub const fn is_ordering(self) -> bool {
        matches!(
            self,
            Self::Range
                | Self::Ge
                | Self::Gt
                | Self::Le
                | Self::Lt
                | Self::LeRef
                | Self::LtRef
                | Self::GeRef
                | Self::GtRef
        )
    }

    /// Wire-format prefix used by the flat codec.
    ///
    /// The null tests use whole-value sentinels instead; membership
    /// functions have no flat form.
    #[must_use]
    pub const fn flat_prefix(self) -> Option<&'static str> {
        let prefix = match self {
            Self::Eq => "_f_eq_",
            Self::Neq => "_f_neq_",
            Self::Contains => "_f_contains_",
            Self::NotContains => "_f_ncontains_",
            Self::StartsWith => "_f_starts_",
            Self::NotStartsWith => "_f_nstarts_",
            Self::Range => "_f_range_",
            Self::Ge => "_f_ge_",
            Self::Gt => "_f_gt_",
            Self::Le => "_f_le_",
            Self::Lt => "_f_lt_",
            Self::EqRef => "_f_eqref_",
            Self::NeqRef => "_f_neqref_",
            Self::LeRef => "_f_leref_",
            Self::LtRef => "_f_ltref_",
            Self::GeRef => "_f_geref_",
            Self::GtRef => "_f_gtref_",
            Self::IsNull | Self::NotNull | Self::In | Self::NotIn => return None,
        };

        Some(prefix)
    }

    /// Find the function whose prefix opens `value` (case-insensitive,
    /// longest match), returning it with the remaining operand text.
    #[must_use]
    pub fn match_flat_prefix(value: &str) -> Option<(Self, &str)> {
        Self::ALL
            .iter()
            .filter_map(|kind| {
                let prefix = kind.flat_prefix()?;
                let head = value.get(..prefix.len())?;

                head.eq_ignore_ascii_case(prefix)
                    .then(|| (*kind, &value[prefix.len()..]))
            })
            .max_by_key(|(kind, _)| kind.flat_prefix().map_or(0, str::len))
    }

    /// Canonical operator spelling used by the text printer.
    #[must_use]
    pub const fn keyword(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Neq => "!=",
            Self::IsNull => "IS NULL",
            Self::NotNull => "IS NOT NULL",
            Self::Contains => "CONTAINS",
            Self::NotContains => "NOT CONTAINS",
            Self::StartsWith => "STARTS",
            Self::NotStartsWith => "NOT STARTS",
            Self::Range => "BETWEEN",
            Self::Ge => ">=",
            Self::Gt => ">",
            Self::Le => "<=",
            Self::Lt => "<",
            Self::EqRef => "EQREF",
            Self::NeqRef => "NEQREF",
            Self::LeRef => "LEREF",
            Self::LtRef => "LTREF",
            Self::GeRef => "GEREF",
            Self::GtRef => "GTREF",
            Self::In => "IN",
            Self::NotIn => "NOT IN",
        }
    }

    /// Resolve a single-token operator spelling (symbolic or word form).
    ///
    /// Multi-word forms (`IS NULL`, `BETWEEN`, `IN`) are handled by the parser.
    #[must_use]
    pub fn from_operator(token: &str) -> Option<Self> {
        let kind = match token.to_ascii_lowercase().as_str() {
            "=" | "eq" => Self::Eq,
            "!=" | "ne" | "neq" => Self::Neq,
            ">=" | "ge" => Self::Ge,
            "<=" | "=<" | "le" => Self::Le,
            ">" | "gt" => Self::Gt,
            "<" | "lt" => Self::Lt,
            "~=" | "contains" => Self::Contains,
            "starts" => Self::StartsWith,
            "eqref" => Self::EqRef,
            "neqref" => Self::NeqRef,
            "leref" => Self::LeRef,
            "ltref" => Self::LtRef,
            "geref" => Self::GeRef,
            "gtref" => Self::GtRef,
            _ => return None,
        };

        Some(kind)
    }
}

impl fmt::Display for FunctionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}
