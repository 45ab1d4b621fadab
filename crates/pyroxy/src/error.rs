//! Error types for wrapper generation
//!
//! The core pipeline reports failures through [`GenerateError`]. Orchestration
//! and the binary wrap these in `anyhow` with context, the same way the rest
//! of the crate handles configuration and I/O failures.

use std::path::PathBuf;

/// Result alias used by the generation pipeline
pub type Result<T, E = GenerateError> = std::result::Result<T, E>;

/// Failures raised while generating wrappers
#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    /// A default value has no R literal form
    #[error("unsupported default for parameter `{parameter}` of `{symbol}`: {description}")]
    UnsupportedDefaultType {
        /// Fully-qualified name of the function
        symbol: String,
        /// Parameter carrying the default
        parameter: String,
        /// Source text or description of the offending value
        description: String,
    },

    /// An absent default appeared inside a list or dict literal
    #[error("an absent default cannot appear inside a collection literal")]
    AbsentInCollection,

    /// The module (or one of its children) cannot be located, read or parsed
    #[error("cannot load module `{module}`: {reason}")]
    ModuleResolution {
        /// Module that failed to load
        module: String,
        /// Why it failed
        reason: String,
    },

    /// The R toolchain exited unsuccessfully
    #[error("R toolchain step `{step}` failed: {message}")]
    Toolchain {
        /// Which call failed
        step: &'static str,
        /// Captured diagnostics
        message: String,
    },

    /// File-system failure while writing the output tree
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        /// Path being read or written
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },
}

impl GenerateError {
    /// Build a [`GenerateError::ModuleResolution`] from anything displayable
    pub fn module_resolution(module: &str, reason: impl std::fmt::Display) -> Self {
        Self::ModuleResolution {
            module: module.to_owned(),
            reason: reason.to_string(),
        }
    }

    /// Build a [`GenerateError::Io`] for the given path
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error only concerns a single symbol
    pub fn is_symbol_scoped(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedDefaultType { .. } | Self::AbsentInCollection
        )
    }
}

/// A file that was left untouched because it exists and overwrite is disabled
///
/// This is not fatal: the materializer records it and moves on.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{} already exists and overwrite is disabled", path.display())]
pub struct OutputConflict {
    /// The existing file
    pub path: PathBuf,
}
