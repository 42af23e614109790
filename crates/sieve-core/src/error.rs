use crate::{
    compile::CompileError,
    config::ConfigError,
    model::SchemaError,
    query::{DecodeError, EncodeError, QueryError, SyntaxError},
    resolve::ResolveError,
};
use std::fmt;
use thiserror::Error as ThisError;

///
/// Error
///
/// Structured error returned at the crate boundary.
/// Every stage keeps its own error enum; this wrapper classifies it and
/// keeps the original as `detail` so callers can match on it.
///

#[derive(Debug, ThisError)]
#[error("{message}")]
pub struct Error {
    pub class: ErrorClass,
    pub origin: ErrorOrigin,
    pub message: String,

    /// Optional structured error detail.
    /// The variant (if present) must correspond to `origin`.
    pub detail: Option<ErrorDetail>,
}

impl Error {
    pub fn new(class: ErrorClass, origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self {
            class,
            origin,
            message: message.into(),
            detail: None,
        }
    }

    #[must_use]
    pub const fn is_syntax(&self) -> bool {
        matches!(self.class, ErrorClass::Syntax)
    }

    #[must_use]
    pub const fn is_resolution(&self) -> bool {
        matches!(self.class, ErrorClass::Resolution)
    }

    #[must_use]
    pub fn display_with_class(&self) -> String {
        format!("{}:{}: {}", self.origin, self.class, self.message)
    }

    fn with_detail(
        class: ErrorClass,
        origin: ErrorOrigin,
        message: String,
        detail: ErrorDetail,
    ) -> Self {
        Self {
            class,
            origin,
            message,
            detail: Some(detail),
        }
    }
}

///
/// ErrorDetail
///
/// Structured, origin-specific error detail carried by [`Error`].
///

#[derive(Debug, ThisError)]
pub enum ErrorDetail {
    #[error("{0}")]
    Syntax(SyntaxError),

    #[error("{0}")]
    Query(QueryError),

    #[error("{0}")]
    Decode(DecodeError),

    #[error("{0}")]
    Encode(EncodeError),

    #[error("{0}")]
    Resolve(ResolveError),

    #[error("{0}")]
    Compile(CompileError),

    #[error("{0}")]
    Config(ConfigError),

    #[error("{0}")]
    Schema(SchemaError),
}

impl From<SyntaxError> for Error {
    fn from(err: SyntaxError) -> Self {
        let origin = match err {
            SyntaxError::Lex(_) => ErrorOrigin::Lexer,
            SyntaxError::Parse(_) => ErrorOrigin::Parser,
        };

        Self::with_detail(
            ErrorClass::Syntax,
            origin,
            err.to_string(),
            ErrorDetail::Syntax(err),
        )
    }
}

impl From<QueryError> for Error {
    fn from(err: QueryError) -> Self {
        Self::with_detail(
            ErrorClass::InvalidRequest,
            ErrorOrigin::Intent,
            err.to_string(),
            ErrorDetail::Query(err),
        )
    }
}

impl From<DecodeError> for Error {
    fn from(err: DecodeError) -> Self {
        match err {
            DecodeError::Syntax(inner) => inner.into(),
            DecodeError::Query(inner) => inner.into(),
            err => Self::with_detail(
                ErrorClass::Decoding,
                ErrorOrigin::Codec,
                err.to_string(),
                ErrorDetail::Decode(err),
            ),
        }
    }
}

impl From<EncodeError> for Error {
    fn from(err: EncodeError) -> Self {
        Self::with_detail(
            ErrorClass::Encoding,
            ErrorOrigin::Codec,
            err.to_string(),
            ErrorDetail::Encode(err),
        )
    }
}

impl From<ResolveError> for Error {
    fn from(err: ResolveError) -> Self {
        Self::with_detail(
            ErrorClass::Resolution,
            ErrorOrigin::Resolver,
            err.to_string(),
            ErrorDetail::Resolve(err),
        )
    }
}

impl From<CompileError> for Error {
    fn from(err: CompileError) -> Self {
        match err {
            CompileError::Resolve(inner) => inner.into(),
            CompileError::Syntax(inner) => inner.into(),
            err => Self::with_detail(
                if err.is_unsupported() {
                    ErrorClass::Unsupported
                } else {
                    ErrorClass::InvalidRequest
                },
                ErrorOrigin::Compiler,
                err.to_string(),
                ErrorDetail::Compile(err),
            ),
        }
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Self::with_detail(
            ErrorClass::Config,
            ErrorOrigin::Config,
            err.to_string(),
            ErrorDetail::Config(err),
        )
    }
}

impl From<SchemaError> for Error {
    fn from(err: SchemaError) -> Self {
        Self::with_detail(
            ErrorClass::Config,
            ErrorOrigin::Schema,
            err.to_string(),
            ErrorDetail::Schema(err),
        )
    }
}

///
/// ErrorClass
/// Error taxonomy for caller-facing classification.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorClass {
    Syntax,
    InvalidRequest,
    Resolution,
    Encoding,
    Decoding,
    Unsupported,
    Config,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Syntax => "syntax",
            Self::InvalidRequest => "invalid_request",
            Self::Resolution => "resolution",
            Self::Encoding => "encoding",
            Self::Decoding => "decoding",
            Self::Unsupported => "unsupported",
            Self::Config => "config",
        };
        write!(f, "{label}")
    }
}

///
/// ErrorOrigin
/// Pipeline stage that raised the error.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorOrigin {
    Lexer,
    Parser,
    Intent,
    Codec,
    Resolver,
    Compiler,
    Config,
    Schema,
}

impl fmt::Display for ErrorOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Lexer => "lexer",
            Self::Parser => "parser",
            Self::Intent => "intent",
            Self::Codec => "codec",
            Self::Resolver => "resolver",
            Self::Compiler => "compiler",
            Self::Config => "config",
            Self::Schema => "schema",
        };
        write!(f, "{label}")
    }
}
