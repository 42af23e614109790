use crate::query::{
    ast::{Constraint, Group, GroupOp, Line, Operand},
    function::FunctionKind,
    intent::{OrderDirection, Ordering, Projection, QueryError, ensure_unique_order},
    lexer::{LexError, Token, TokenKind, tokenize},
};
use std::fmt;
use thiserror::Error as ThisError;

///
/// SyntaxError
///
/// Failure to turn query text into an AST.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum SyntaxError {
    #[error(transparent)]
    Lex(#[from] LexError),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

///
/// ParseError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
#[error("error parsing query «{query}»\n{location}: {kind}")]
pub struct ParseError {
    pub query: String,
    pub location: TokenLocation,
    pub kind: ParseErrorKind,
}

///
/// TokenLocation
///
/// Where in the token stream the parser stopped.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TokenLocation {
    AtEof,
    At { index: usize, token: String },
    Near {
        index: usize,
        previous: String,
        next: String,
    },
}

impl fmt::Display for TokenLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AtEof => f.write_str("At EOF"),
            Self::At { index, token } => write!(f, "At token {index} «{token}»"),
            Self::Near {
                index,
                previous,
                next,
            } => write!(f, "Near token {index} «{previous} {next}»"),
        }
    }
}

///
/// ParseErrorKind
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum ParseErrorKind {
    #[error("expected {expected}, found {found}")]
    Unexpected { expected: &'static str, found: String },

    #[error("expected {expected}, found end of input")]
    UnexpectedEof { expected: &'static str },

    #[error(
        "mismatch: all boolean operators in a group must be the same; group started with {first}, found {found}"
    )]
    OperatorMismatch { first: &'static str, found: String },

    #[error("missing boolean operator between expressions")]
    MissingOperator,

    #[error("boolean operator {operator} has no expression on its left")]
    LeadingOperator { operator: String },

    #[error("boolean operator {operator} is not followed by an expression")]
    DanglingOperator { operator: &'static str },

    #[error("empty brackets")]
    EmptyGroup,

    #[error("unmatched closing bracket")]
    UnmatchedClose,

    #[error("unknown operator '{operator}' for field '{field}'")]
    UnknownOperator { field: String, operator: String },

    #[error("NOT cannot precede operator '{operator}'")]
    IllegalNot { operator: String },

    #[error("IN list for '{field}' must not be empty")]
    EmptyInList { field: String },

    #[error("{clause} is only allowed at the top level, not inside brackets")]
    ClauseInBrackets { clause: &'static str },

    #[error("{clause} clause given more than once")]
    DuplicateClause { clause: &'static str },

    #[error("unexpected {found} after {clause} list")]
    AfterClause { clause: &'static str, found: String },

    #[error("SELECT expects exactly one of entity, id, count; got {found}")]
    Projection { found: String },

    #[error(transparent)]
    Query(#[from] QueryError),
}

///
/// ParsedQuery
///
/// Everything a text query can carry.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ParsedQuery {
    pub constraints: Group,
    pub select: Option<Projection>,
    pub expand: Option<Vec<String>>,
    pub orderings: Vec<Ordering>,
}

/// Parse query text into constraints and clauses.
pub fn parse(query: &str) -> Result<ParsedQuery, SyntaxError> {
    let tokens = tokenize(query)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        parsed: ParsedQuery {
            constraints: Group::or(),
            select: None,
            expand: None,
            orderings: Vec::new(),
        },
    };

    match parser.group(0) {
        Ok(group) => {
            let mut parsed = parser.parsed;
            parsed.constraints = group;
            Ok(parsed)
        }
        Err(kind) => Err(ParseError {
            query: query.to_string(),
            location: parser.location(),
            kind,
        }
        .into()),
    }
}

// ----------------------------------------------------------------------
// Parser
// ----------------------------------------------------------------------

const CLAUSES: [&str; 4] = ["SELECT", "EXPAND", "WHERE", "ORDER"];

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    parsed: ParsedQuery,
}

impl Parser {
    fn location(&self) -> TokenLocation {
        match (self.pos.checked_sub(1), self.tokens.get(self.pos)) {
            (_, None) => TokenLocation::AtEof,
            (Some(prev), Some(next)) => TokenLocation::Near {
                index: self.pos,
                previous: self.tokens[prev].to_string(),
                next: next.to_string(),
            },
            (None, Some(token)) => TokenLocation::At {
                index: self.pos,
                token: token.to_string(),
            },
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_at(&self, ahead: usize) -> Option<&Token> {
        self.tokens.get(self.pos + ahead)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }

        token
    }

    fn expect(&mut self, expected: &'static str) -> Result<Token, ParseErrorKind> {
        self.advance()
            .ok_or(ParseErrorKind::UnexpectedEof { expected })
    }

    fn expect_kind(
        &mut self,
        kind: TokenKind,
        expected: &'static str,
    ) -> Result<Token, ParseErrorKind> {
        let token = self.expect(expected)?;
        if token.kind == kind {
            Ok(token)
        } else {
            Err(ParseErrorKind::Unexpected {
                expected,
                found: token.to_string(),
            })
        }
    }

    fn expect_keyword(&mut self, keyword: &'static str) -> Result<(), ParseErrorKind> {
        let token = self.expect(keyword)?;
        if token.is_keyword(keyword) {
            Ok(())
        } else {
            Err(ParseErrorKind::Unexpected {
                expected: keyword,
                found: token.to_string(),
            })
        }
    }

    fn literal(&mut self, expected: &'static str) -> Result<String, ParseErrorKind> {
        let token = self.expect(expected)?;
        if token.is_literal() {
            Ok(token.text)
        } else {
            Err(ParseErrorKind::Unexpected {
                expected,
                found: token.to_string(),
            })
        }
    }

    fn clause_keyword(token: &Token) -> Option<&'static str> {
        CLAUSES.into_iter().find(|clause| token.is_keyword(clause))
    }

    // ------------------------------------------------------------------
    // Groups
    // ------------------------------------------------------------------

    fn group(&mut self, depth: usize) -> Result<Group, ParseErrorKind> {
        let mut op: Option<GroupOp> = None;
        let mut children: Vec<Line> = Vec::new();
        let mut pending: Option<&'static str> = None;

        while let Some(token) = self.peek() {
            match token.kind {
                TokenKind::Word
                    if (children.is_empty() || pending.is_some())
                        && self.names_field(depth == 0 && pending.is_none()) =>
                {
                    let constraint = self.field_expression()?;
                    Self::push_child(&mut children, &mut pending, Line::Constraint(constraint));
                }
                TokenKind::RParen => {
                    if depth == 0 {
                        self.pos += 1;
                        return Err(ParseErrorKind::UnmatchedClose);
                    }
                    break;
                }
                TokenKind::LParen => {
                    Self::expect_operand(&children, pending)?;
                    self.pos += 1;
                    let inner = self.bracketed(depth)?;
                    Self::push_child(&mut children, &mut pending, inner.collapse());
                }
                TokenKind::Word if token.is_keyword("NOT") && self.next_is_lparen() => {
                    Self::expect_operand(&children, pending)?;
                    self.pos += 2;
                    let inner = self.bracketed(depth)?.negate_parsed();
                    Self::push_child(&mut children, &mut pending, inner.collapse());
                }
                TokenKind::Word if token.is_keyword("NOT") => {
                    let found = self
                        .peek_at(1)
                        .map_or_else(|| "end of input".to_string(), ToString::to_string);
                    self.pos += 1;
                    return Err(ParseErrorKind::Unexpected {
                        expected: "'(' after NOT",
                        found,
                    });
                }
                TokenKind::Word if token.is_keyword("AND") || token.is_keyword("OR") => {
                    let found = token.text.clone();
                    let this = if token.is_keyword("AND") {
                        GroupOp::And
                    } else {
                        GroupOp::Or
                    };
                    self.pos += 1;

                    if children.is_empty() || pending.is_some() {
                        return Err(ParseErrorKind::LeadingOperator { operator: found });
                    }
                    match op {
                        Some(first) if first != this => {
                            return Err(ParseErrorKind::OperatorMismatch {
                                first: first.keyword(),
                                found,
                            });
                        }
                        _ => op = Some(this),
                    }
                    pending = Some(this.keyword());
                }
                TokenKind::Word if Self::clause_keyword(token).is_some() => {
                    let clause = Self::clause_keyword(token).unwrap_or_default();
                    self.pos += 1;

                    if depth > 0 {
                        return Err(ParseErrorKind::ClauseInBrackets { clause });
                    }
                    if let Some(operator) = pending {
                        return Err(ParseErrorKind::DanglingOperator { operator });
                    }
                    self.clause(clause)?;
                }
                _ => {
                    Self::expect_operand(&children, pending)?;
                    let constraint = self.field_expression()?;
                    Self::push_child(&mut children, &mut pending, Line::Constraint(constraint));
                }
            }
        }

        if let Some(operator) = pending {
            return Err(ParseErrorKind::DanglingOperator { operator });
        }
        if depth > 0 && children.is_empty() {
            return Err(ParseErrorKind::EmptyGroup);
        }

        Ok(Group::with_children(op.unwrap_or(GroupOp::Or), children))
    }

    // A word followed by a comparison (optionally NOT-prefixed) starts a field
    // expression, even when the word is reserved. Where a clause may begin, a
    // clause keyword followed by NOT stays a clause.
    fn names_field(&self, clause_allowed: bool) -> bool {
        let Some(token) = self.peek() else {
            return false;
        };
        let negated = self.peek_at(1).is_some_and(|next| next.is_keyword("NOT"));
        if negated && clause_allowed && Self::clause_keyword(token).is_some() {
            return false;
        }

        let comparison_at = |ahead: usize| self.peek_at(ahead).is_some_and(is_comparison);
        let skip = usize::from(negated);

        comparison_at(1 + skip) && !comparison_at(2 + skip)
    }

    fn next_is_lparen(&self) -> bool {
        self.peek_at(1)
            .is_some_and(|token| token.kind == TokenKind::LParen)
    }

    // Parse a group whose `(` has been consumed, through its `)`.
    fn bracketed(&mut self, depth: usize) -> Result<Group, ParseErrorKind> {
        let inner = self.group(depth + 1)?;
        self.expect_kind(TokenKind::RParen, "')'")?;

        Ok(inner)
    }

    // Checked before an item is consumed so errors point at the item.
    fn expect_operand(
        children: &[Line],
        pending: Option<&'static str>,
    ) -> Result<(), ParseErrorKind> {
        if !children.is_empty() && pending.is_none() {
            return Err(ParseErrorKind::MissingOperator);
        }

        Ok(())
    }

    fn push_child(children: &mut Vec<Line>, pending: &mut Option<&'static str>, line: Line) {
        children.push(line);
        *pending = None;
    }

    // ------------------------------------------------------------------
    // Clauses
    // ------------------------------------------------------------------

    fn clause(&mut self, clause: &'static str) -> Result<(), ParseErrorKind> {
        match clause {
            "SELECT" => {
                if self.parsed.select.is_some() {
                    return Err(ParseErrorKind::DuplicateClause { clause });
                }
                let fields = self.field_list("projection")?;
                let [only] = fields.as_slice() else {
                    return Err(ParseErrorKind::Projection {
                        found: fields.join(", "),
                    });
                };
                let projection = only.parse().map_err(|_| ParseErrorKind::Projection {
                    found: only.clone(),
                })?;
                self.parsed.select = Some(projection);
                self.ensure_clause_end(clause)
            }
            "EXPAND" => {
                if self.parsed.expand.is_some() {
                    return Err(ParseErrorKind::DuplicateClause { clause });
                }
                let relations = self
                    .field_list("relation")?
                    .into_iter()
                    .map(|relation| match strip_prefix_ignore_case(&relation, "not:") {
                        Some(rest) => format!("-{rest}"),
                        None => relation,
                    })
                    .collect();
                self.parsed.expand = Some(relations);
                self.ensure_clause_end(clause)
            }
            "ORDER" => {
                self.expect_keyword("BY")?;
                self.order_list()
            }
            // WHERE only marks where the constraints begin
            _ => Ok(()),
        }
    }

    fn field_list(&mut self, expected: &'static str) -> Result<Vec<String>, ParseErrorKind> {
        let mut fields = vec![self.literal(expected)?];
        while self
            .peek()
            .is_some_and(|token| token.kind == TokenKind::Comma)
        {
            self.pos += 1;
            fields.push(self.literal(expected)?);
        }

        Ok(fields)
    }

    fn ensure_clause_end(&self, clause: &'static str) -> Result<(), ParseErrorKind> {
        match self.peek() {
            None => Ok(()),
            Some(token)
                if Self::clause_keyword(token).is_some() && !self.names_field(true) =>
            {
                Ok(())
            }
            Some(token) => Err(ParseErrorKind::AfterClause {
                clause,
                found: token.to_string(),
            }),
        }
    }

    fn order_list(&mut self) -> Result<(), ParseErrorKind> {
        loop {
            let field = self.literal("order field")?;
            let direction = match self.peek() {
                Some(token) if token.is_keyword("ASC") => {
                    self.pos += 1;
                    OrderDirection::Asc
                }
                Some(token) if token.is_keyword("DESC") => {
                    self.pos += 1;
                    OrderDirection::Desc
                }
                _ => OrderDirection::Asc,
            };

            ensure_unique_order(&self.parsed.orderings, &field)?;
            self.parsed.orderings.push(Ordering::new(field, direction));

            if self
                .peek()
                .is_some_and(|token| token.kind == TokenKind::Comma)
            {
                self.pos += 1;
            } else {
                return Ok(());
            }
        }
    }

    // ------------------------------------------------------------------
    // Field expressions
    // ------------------------------------------------------------------

    fn field_expression(&mut self) -> Result<Constraint, ParseErrorKind> {
        let field_token = self.expect("field name")?;
        let starts_like_field = field_token
            .text
            .chars()
            .next()
            .is_some_and(|ch| ch.is_alphabetic() || ch == '_');
        if field_token.kind != TokenKind::Word || !starts_like_field {
            return Err(ParseErrorKind::Unexpected {
                expected: "field name",
                found: field_token.to_string(),
            });
        }
        let field = field_token.text;

        let negated = self.peek().is_some_and(|token| token.is_keyword("NOT"));
        if negated {
            self.pos += 1;
        }

        let op_token = self.expect("operator")?;
        if !matches!(op_token.kind, TokenKind::Word | TokenKind::Operator) {
            return Err(ParseErrorKind::Unexpected {
                expected: "operator",
                found: op_token.to_string(),
            });
        }

        let constraint = if op_token.is_keyword("IS") {
            if negated {
                return Err(ParseErrorKind::IllegalNot {
                    operator: op_token.text,
                });
            }
            let function = if self.peek().is_some_and(|token| token.is_keyword("NOT")) {
                self.pos += 1;
                FunctionKind::NotNull
            } else {
                FunctionKind::IsNull
            };
            self.expect_keyword("NULL")?;
            Constraint::new(field, function, Operand::None)?
        } else if op_token.is_keyword("BETWEEN") {
            if negated {
                return Err(ParseErrorKind::IllegalNot {
                    operator: op_token.text,
                });
            }
            let low = self.literal("range lower bound")?;
            self.expect_keyword("AND")?;
            let high = self.literal("range upper bound")?;
            Constraint::new(field, FunctionKind::Range, Operand::Range(low, high))?
        } else if op_token.is_keyword("IN") {
            let values = self.in_list(&field)?;
            let function = if negated {
                FunctionKind::NotIn
            } else {
                FunctionKind::In
            };
            Constraint::new(field, function, Operand::List(values))?
        } else {
            let Some(mut function) = FunctionKind::from_operator(&op_token.text) else {
                return Err(ParseErrorKind::UnknownOperator {
                    field,
                    operator: op_token.text,
                });
            };
            if negated {
                function = match function {
                    FunctionKind::StartsWith
                    | FunctionKind::Contains
                    | FunctionKind::EqRef
                    | FunctionKind::NeqRef => function.inverse().unwrap_or(function),
                    _ => {
                        return Err(ParseErrorKind::IllegalNot {
                            operator: op_token.text,
                        });
                    }
                };
            }
            let value = self.literal("literal value")?;
            Constraint::new(field, function, Operand::Value(value))?
        };

        Ok(constraint)
    }

    fn in_list(&mut self, field: &str) -> Result<Vec<String>, ParseErrorKind> {
        self.expect_kind(TokenKind::LParen, "'(' to open the IN list")?;
        if self
            .peek()
            .is_some_and(|token| token.kind == TokenKind::RParen)
        {
            self.pos += 1;
            return Err(ParseErrorKind::EmptyInList {
                field: field.to_string(),
            });
        }

        let mut values = Vec::new();
        loop {
            values.push(self.literal("IN list value")?);

            let token = self.expect("',' or ')'")?;
            match token.kind {
                TokenKind::Comma => {}
                TokenKind::RParen => return Ok(values),
                _ => {
                    return Err(ParseErrorKind::Unexpected {
                        expected: "',' or ')'",
                        found: token.to_string(),
                    });
                }
            }
        }
    }
}

// Symbolic operators and the word forms a field expression may use.
fn is_comparison(token: &Token) -> bool {
    match token.kind {
        TokenKind::Operator => true,
        TokenKind::Word => is_comparison_word(&token.text),
        _ => false,
    }
}

/// Whether a bare word opens one of the top-level clauses.
pub(crate) fn is_clause_word(word: &str) -> bool {
    CLAUSES
        .into_iter()
        .any(|clause| word.eq_ignore_ascii_case(clause))
}

/// Whether a bare word would be read as a comparison operator.
pub(crate) fn is_comparison_word(word: &str) -> bool {
    ["IS", "IN", "BETWEEN"]
        .into_iter()
        .any(|keyword| word.eq_ignore_ascii_case(keyword))
        || FunctionKind::from_operator(word).is_some()
}

fn strip_prefix_ignore_case<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    let head = text.get(..prefix.len())?;

    head.eq_ignore_ascii_case(prefix)
        .then(|| &text[prefix.len()..])
}
