//! SDK error types

use qwave_core::Stage;
use std::time::Duration;
use thiserror::Error;

/// SDK error type
#[derive(Error, Debug)]
pub enum SdkError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Compiler error outside a compilation, e.g. invalid options
    #[error("Compiler error: {0}")]
    CompileError(#[from] qwave_compiler::CompileError),

    /// Compilation finished with errors
    #[error("Compilation failed in {stage} stage with {errors} error(s): {first}")]
    CompilationFailed {
        stage: Stage,
        errors: usize,
        first: String,
    },

    /// Compilation did not finish in time and was discarded
    #[error("Compilation timed out after {0:?}")]
    Timeout(Duration),

    /// Background compilation task panicked or was cancelled
    #[error("Compilation task failed: {0}")]
    TaskFailed(String),

    /// Backend rejected an artifact
    #[error("Emit error: {0}")]
    EmitError(String),

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Result type for SDK operations
pub type Result<T> = std::result::Result<T, SdkError>;
