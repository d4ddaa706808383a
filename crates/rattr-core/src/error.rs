//! The top-level error type for conditions that abort a run.
//!
//! Diagnostics (see [`crate::diagnostics`]) are data the analyser keeps
//! producing after raising them; `RattrError` is reserved for conditions
//! the driver cannot recover from: a fatal diagnostic, the badness
//! threshold being exceeded, or an I/O/deserialization failure reading the
//! input tree or a cache record.

use std::path::PathBuf;

use thiserror::Error;

use crate::diagnostics::Diagnostic;

/// Stable exit-code classes, mirrored onto the process exit code by the
/// binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitClass {
    /// Badness threshold exceeded at end of file.
    ThresholdExceeded = 1,
    /// Invalid CLI arguments or configuration.
    InvalidArguments = 2,
    /// Could not read or parse the input (source tree, cache file).
    InputError = 3,
    /// A fatal diagnostic was raised during analysis.
    Fatal = 4,
    /// A bug in the analyser itself.
    Internal = 10,
}

impl ExitClass {
    pub fn code(self) -> u8 {
        self as u8
    }
}

#[derive(Debug, Error)]
pub enum RattrError {
    #[error("invalid arguments: {message}")]
    InvalidArguments { message: String },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse serialized syntax tree at {path}: {source}")]
    MalformedAst {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to parse cache record at {path}: {source}")]
    MalformedCache {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("fatal: {0}")]
    Fatal(Diagnostic),

    #[error("badness {badness} exceeds threshold {threshold} analysing {path}")]
    ThresholdExceeded {
        path: PathBuf,
        badness: u32,
        threshold: u32,
    },

    #[error("internal error: {message}")]
    Internal { message: String },
}

impl RattrError {
    pub fn exit_class(&self) -> ExitClass {
        match self {
            RattrError::InvalidArguments { .. } => ExitClass::InvalidArguments,
            RattrError::Io { .. }
            | RattrError::MalformedAst { .. }
            | RattrError::MalformedCache { .. } => ExitClass::InputError,
            RattrError::Fatal(_) => ExitClass::Fatal,
            RattrError::ThresholdExceeded { .. } => ExitClass::ThresholdExceeded,
            RattrError::Internal { .. } => ExitClass::Internal,
        }
    }

    pub fn invalid_arguments(message: impl Into<String>) -> Self {
        RattrError::InvalidArguments {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        RattrError::Internal {
            message: message.into(),
        }
    }
}
