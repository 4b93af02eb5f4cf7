//! Specbridge Error Handling
//!
//! Every failure that can abort a spec-file run is an [`AdapterError`]. Match
//! failures are *not* errors: they travel as data inside
//! [`ExpectationResult`](crate::capture::ExpectationResult) and end up in the
//! reporter's result tree.
//!
//! ## Taxonomy
//!
//! - **Initialization**: the engine or its coordination object is missing after
//!   bootstrap. Fatal, no partial result.
//! - **Usage**: a matcher was used the wrong way (wrong target, disallowed
//!   arguments). Raised synchronously from inside the matcher.
//! - **InvalidTarget**: the value handed to the call accessor is not trackable.
//!   Matchers turn this into `Usage` with their own wording.
//! - Everything else (module loading, engine execution, snapshot I/O) is
//!   propagated unchanged to the caller of the run.

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T, E = AdapterError> = std::result::Result<T, E>;

#[derive(Debug, Error, Diagnostic)]
pub enum AdapterError {
    #[error("{engine} could not be initialized")]
    #[diagnostic(
        code(specbridge::init),
        help("the bootstrap script must define the engine and its environment")
    )]
    Initialization { engine: String },

    #[error("{message}")]
    #[diagnostic(code(specbridge::usage))]
    Usage { message: String },

    #[error("expected a spy or a mock function, got {type_name}")]
    #[diagnostic(code(specbridge::invalid_target))]
    InvalidTarget { type_name: String },

    #[error("failed to load module '{}': {message}", path.display())]
    #[diagnostic(code(specbridge::module))]
    Module { path: PathBuf, message: String },

    #[error("engine failure: {message}")]
    #[diagnostic(code(specbridge::engine))]
    Engine { message: String },

    #[error("reporter did not produce results: {message}")]
    #[diagnostic(code(specbridge::reporter))]
    Reporter { message: String },

    #[error("snapshot file '{}' could not be accessed", path.display())]
    #[diagnostic(code(specbridge::snapshot::io))]
    Snapshot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("snapshot file is malformed")]
    #[diagnostic(code(specbridge::snapshot::format))]
    SnapshotFormat(#[from] serde_json::Error),

    #[error("invalid run configuration")]
    #[diagnostic(code(specbridge::config))]
    Config(#[from] serde_yaml::Error),
}

impl AdapterError {
    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage {
            message: message.into(),
        }
    }

    pub fn engine(message: impl Into<String>) -> Self {
        Self::Engine {
            message: message.into(),
        }
    }

    pub fn module(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Module {
            path: path.into(),
            message: message.into(),
        }
    }

    /// True for errors caused by misuse of a matcher in test code.
    pub fn is_usage(&self) -> bool {
        matches!(self, Self::Usage { .. })
    }
}
