//! Filter-language front end: tokens, AST, parser, printer, and the flat
//! query-string codec. Nothing in here consults entity metadata.

mod ast;
mod codec;
mod function;
mod intent;
mod lexer;
mod parser;
mod print;

#[cfg(test)]
mod tests;

pub use ast::{Constraint, Group, GroupOp, Line, Operand};
pub use codec::{
    CONTROL_KEYS, DecodeError, EncodeError, FlatCodec, FlatMap, TEXT_KEY, decode_value,
};
pub use function::{Arity, FunctionKind};
pub use intent::{OrderDirection, Ordering, Projection, Query, QueryError};
pub use lexer::{LexError, LexErrorKind, Token, TokenKind, tokenize};
pub use parser::{ParseError, ParseErrorKind, ParsedQuery, SyntaxError, TokenLocation, parse};
pub use print::{print_constraint, print_line, print_top_level, quote_value};
