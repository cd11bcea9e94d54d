//! Common test utilities for SDK integration tests

use qwave_sdk::{CompileResult, CompilerConfig, DiagnosticKind, Stage};
use std::path::PathBuf;

/// Programs shared by several tests
pub mod programs {
    pub const SINGLE: &str = r#"
input a: wave[4];
input b: wave[4];
output y: wave[4];
y = interfere(a, b);
"#;

    pub const PROTECTED: &str = r#"
input a: wave[4];
input b: wave[4];
output y: wave[4];
t = fourier(a, correction: "basic");
y = interfere(t, b);
"#;

    pub const UNDECLARED: &str = r#"
input a: wave[4];
output y: wave[4];
y = interfere(a, c);
"#;
}

/// Configuration file written to the temp directory, removed on drop
pub struct TempConfig {
    path: PathBuf,
}

impl TempConfig {
    pub fn write(extension: &str, content: &str) -> Self {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        let unique_id = COUNTER.fetch_add(1, Ordering::SeqCst);
        let path = std::env::temp_dir().join(format!(
            "qwave_config_{}_{}.{}",
            std::process::id(),
            unique_id,
            extension
        ));
        std::fs::write(&path, content).expect("Failed to write temp config");
        Self { path }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    pub fn load(&self) -> CompilerConfig {
        CompilerConfig::from_file(&self.path).expect("Failed to load config")
    }
}

impl Drop for TempConfig {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

/// Assertion helpers for CompileResult
pub trait ResultAssertions {
    fn assert_success(&self);
    fn assert_failed_at(&self, stage: Stage);
    fn assert_kind_count(&self, kind: DiagnosticKind, expected: usize);
}

impl ResultAssertions for CompileResult {
    fn assert_success(&self) {
        assert!(
            self.success,
            "Expected success, got diagnostics: {:?}",
            self.diagnostics
        );
        assert!(self.schedule.is_some(), "Successful result without schedule");
    }

    fn assert_failed_at(&self, stage: Stage) {
        assert!(!self.success, "Expected failure in {stage} stage");
        assert!(self.schedule.is_none());
        let first = self
            .diagnostics
            .iter()
            .find(|d| d.is_error())
            .expect("Failed result without errors");
        assert_eq!(first.stage, stage, "First error: {first}");
    }

    fn assert_kind_count(&self, kind: DiagnosticKind, expected: usize) {
        let actual = self.diagnostics.of_kind(kind).count();
        assert_eq!(
            actual, expected,
            "Expected {expected} {kind} diagnostic(s), got {actual}: {:?}",
            self.diagnostics
        );
    }
}
