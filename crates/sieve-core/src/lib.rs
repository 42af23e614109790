//! Core of Sieve: the filter-language front end (lexer, parser, AST, printer,
//! flat query-string codec) and the schema-aware compiler that turns a
//! request into a backend-neutral predicate tree with bound parameters.
#![warn(unreachable_pub)]

// public exports are one module level down
pub mod compile;
pub mod config;
pub mod error;
pub mod model;
pub mod query;
pub mod resolve;

// test
#[cfg(test)]
pub(crate) mod test_support;

///
/// CONSTANTS
///

/// Default page size applied when a request does not carry one.
pub const DEFAULT_LIMIT: u32 = 200;

/// Sentinel limit: materialize zero rows, but still honour size computation.
pub const LIMIT_RETURN_ZERO: i32 = -1;

///
/// Prelude
///
/// Prelude contains only request and schema vocabulary.
/// No errors, caches, or codecs are re-exported here.
///

pub mod prelude {
    pub use crate::{
        model::{Cardinality, EntityModel, ValueType},
        query::{
            Constraint, FunctionKind, Group, GroupOp, Line, OrderDirection, Projection, Query,
        },
    };
}
