//! qwave SDK
//!
//! High-level API for compiling qwave programs: a one-call [`compile`]
//! facade, configuration files, the backend emitter boundary and an async
//! compile service.

pub mod builder;
pub mod config;
pub mod emitter;
pub mod error;
pub mod service;

// Re-export main types
pub use builder::CompilerBuilder;
pub use config::{CompilerConfig, EmitConfig, ServiceConfig};
pub use emitter::{Artifact, ArtifactStep, Backend, Emitter, JsonEmitter, MemoryBackend};
pub use error::{Result, SdkError};
pub use service::{BatchItem, CompileRequest, CompileService};

// Re-export commonly used types from dependencies
pub use qwave_compiler::{CompileOptions, CompileResult, Compiler, Schedule};
pub use qwave_core::{Diagnostic, DiagnosticKind, Diagnostics, ErrorCorrection, Severity, Stage};

/// Compile `source` with `options`
///
/// Never fails: problems are reported as diagnostics in the result.
pub fn compile(source: &str, options: CompileOptions) -> CompileResult {
    Compiler::with_options(options).compile(source)
}

/// Compile `source` and turn a failed compilation into an error
pub fn compile_checked(source: &str, options: CompileOptions) -> Result<CompileResult> {
    let result = compile(source, options);
    if result.success {
        Ok(result)
    } else {
        Err(failure(&result))
    }
}

/// Parse only, returning the diagnostics of the parse stage
pub fn check(source: &str) -> Diagnostics {
    let mut diagnostics = Diagnostics::new();
    let _ = qwave_parser::parse(source, &mut diagnostics);
    diagnostics
}

/// Error describing the first fatal diagnostic of a failed result
pub(crate) fn failure(result: &CompileResult) -> SdkError {
    match result.diagnostics.iter().find(|d| d.is_error()) {
        Some(first) => SdkError::CompilationFailed {
            stage: first.stage,
            errors: result.error_count(),
            first: first.to_string(),
        },
        None => SdkError::CompilationFailed {
            stage: Stage::Emit,
            errors: 0,
            first: "compilation produced no schedule".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_facade() {
        let result = compile(
            "input a: wave[2]; output y: wave[2]; y = fourier(a);",
            CompileOptions::default(),
        );
        assert!(result.success);
        assert_eq!(result.schedule.map(|s| s.len()), Some(2));
    }

    #[test]
    fn test_compile_checked_reports_first_error() {
        let err = compile_checked(
            "input a: wave[2]; output y: wave[2]; y = fourier(q);",
            CompileOptions::default(),
        )
        .unwrap_err();
        match err {
            SdkError::CompilationFailed { stage, errors, .. } => {
                assert_eq!(stage, Stage::Parse);
                assert_eq!(errors, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_check_only_parses() {
        assert!(check("input a: wave[2];").is_empty());
        assert!(check("input a: wave[2]").has_errors());
    }
}
