//! ## Crate layout
//! - `core`: lexer, parser, AST, printer, flat codec, resolver, and compiler.
//! - `engine`: a configured compiler plus codec behind one error type.
//!
//! The `prelude` module carries the request vocabulary most callers need.

pub use sieve_core as core;

mod engine;

pub use engine::Engine;

//
// Consts
//

/// Workspace version re-export for downstream tooling/tests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//
// Re-exports
//

pub use crate::core::{
    compile::{CompiledQuery, Compiler},
    config::Config,
    error::{Error, ErrorClass, ErrorOrigin},
    model::{MetadataProvider, ModelCache, SchemaDef},
    query::{FlatMap, Query},
};

///
/// Prelude
/// request vocabulary plus the engine entry point
///

pub mod prelude {
    pub use crate::{
        Engine,
        core::{
            compile::{CompiledPredicate, CompiledQuery, Value},
            prelude::*,
            query::FlatMap,
        },
    };
}
