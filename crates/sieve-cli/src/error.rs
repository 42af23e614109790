use thiserror::Error as ThisError;

///
/// CliError
///

#[derive(Debug, ThisError)]
pub enum CliError {
    #[error(transparent)]
    Sieve(#[from] sieve::Error),

    #[error("`{command}` needs an entity schema; pass --schema or set SIEVE_SCHEMA")]
    MissingSchema { command: &'static str },

    #[error("unknown entity '{0}'")]
    UnknownEntity(String),

    #[error("expected KEY=VALUE, got '{0}'")]
    InvalidPair(String),

    #[error("nothing to compile; pass query text or --flat fields")]
    EmptyRequest,

    #[error("failed to render JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("line editor failed: {0}")]
    Readline(#[from] rustyline::error::ReadlineError),
}

pub type CliResult<T> = Result<T, CliError>;
