//! Integration tests for the SDK
//!
//! Tests configuration loading, the async compile service and the backend
//! boundary through the public `qwave_sdk` API.

mod common;

use async_trait::async_trait;
use common::programs::{PROTECTED, SINGLE, UNDECLARED};
use common::{ResultAssertions, TempConfig};
use qwave_sdk::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

// ============================================================================
// Facade
// ============================================================================

#[test]
fn test_compile_with_default_options() {
    let result = compile(SINGLE, CompileOptions::default());
    result.assert_success();
    assert!(result.diagnostics.is_empty());
    assert_eq!(result.schedule.unwrap().len(), 3);
}

#[test]
fn test_failed_compilation_keeps_diagnostics() {
    let result = compile(UNDECLARED, CompileOptions::default());
    result.assert_failed_at(Stage::Parse);
    result.assert_kind_count(DiagnosticKind::ReferenceError, 1);
    assert!(result.graph.is_none());
}

#[test]
fn test_invalid_options_are_configure_errors() {
    let options = CompileOptions::default().with_passes(["coherence", "inline"]);
    let result = compile(SINGLE, options);
    result.assert_failed_at(Stage::Configure);
    result.assert_kind_count(DiagnosticKind::UnknownPass, 1);
}

#[test]
fn test_check_reports_syntax_errors() {
    let diagnostics = check("input a: wave[4]\noutput y: wave[4];");
    assert!(diagnostics.has_errors());
    assert!(diagnostics.iter().all(|d| d.stage == Stage::Parse));
}

// ============================================================================
// Configuration
// ============================================================================

#[test]
fn test_yaml_config_file() -> anyhow::Result<()> {
    let file = TempConfig::write(
        "yaml",
        r#"
compiler:
  pass_list: [thermal, performance]
  thermal_ceiling: 1.5
service:
  timeout_ms: 10000
  max_concurrency: 2
"#,
    );
    let config = file.load();
    assert_eq!(config.compiler.pass_list, vec!["thermal", "performance"]);
    assert_eq!(config.service.max_concurrency, 2);

    let compiler = CompilerBuilder::from_file(file.path())?.build()?;
    let result = compiler.compile(PROTECTED);
    result.assert_success();

    // fourier(a) carries load 4.0 and is split under the 1.5 ceiling
    let graph = result.graph.unwrap();
    assert!(graph.node_count() > 5);
    Ok(())
}

#[test]
fn test_json_config_file() {
    let file = TempConfig::write(
        "json",
        r#"{"compiler": {"pass_list": []}, "emit": {"pretty": true}}"#,
    );
    let config = file.load();
    assert!(config.compiler.pass_list.is_empty());
    assert!(config.emit.pretty);
}

#[test]
fn test_config_with_invalid_values() {
    let file = TempConfig::write("yaml", "service:\n  timeout_ms: 0\n");
    let err = CompilerConfig::from_file(file.path()).unwrap_err();
    assert!(matches!(err, SdkError::ConfigError(_)));
}

#[test]
fn test_missing_config_file() {
    let err = CompilerConfig::from_file("/nonexistent/qwave.yaml").unwrap_err();
    assert!(matches!(err, SdkError::IoError(_)));
}

// ============================================================================
// Compile Service
// ============================================================================

#[tokio::test]
async fn test_service_compiles_request() -> anyhow::Result<()> {
    let service = CompilerBuilder::new()
        .timeout(Duration::from_secs(30))
        .build_service()?;
    assert_eq!(service.timeout(), Some(Duration::from_secs(30)));

    let result = service
        .compile(CompileRequest::new("single", SINGLE))
        .await?;
    result.assert_success();
    Ok(())
}

#[tokio::test]
async fn test_service_matches_direct_compilation() -> anyhow::Result<()> {
    let options = CompileOptions::default().with_thermal_ceiling(1.5);
    let service = CompilerBuilder::new().with_options(options.clone()).build_service()?;

    let served = service
        .compile(CompileRequest::new("protected", PROTECTED))
        .await?;
    let direct = compile(PROTECTED, options);
    assert_eq!(served.schedule, direct.schedule);
    assert_eq!(served.graph, direct.graph);
    Ok(())
}

#[tokio::test]
async fn test_batch_runs_every_request() -> anyhow::Result<()> {
    let service = CompilerBuilder::new().max_concurrency(2).build_service()?;
    let requests: Vec<CompileRequest> = (0..6)
        .map(|i| {
            let source = if i % 3 == 2 { UNDECLARED } else { SINGLE };
            CompileRequest::new(format!("program-{i}"), source)
        })
        .collect();

    let items = service.compile_batch(requests).await;
    assert_eq!(items.len(), 6);
    for (i, item) in items.iter().enumerate() {
        assert_eq!(item.name, format!("program-{i}"));
        let result = item.outcome.as_ref().expect("no timeout configured");
        assert_eq!(result.success, i % 3 != 2);
    }
    Ok(())
}

#[tokio::test]
async fn test_empty_batch() -> anyhow::Result<()> {
    let service = CompilerBuilder::new().build_service()?;
    assert!(service.compile_batch(Vec::new()).await.is_empty());
    Ok(())
}

// ============================================================================
// Backend Boundary
// ============================================================================

/// Backend that counts submissions and rejects programs named `reject`
#[derive(Default)]
struct CountingBackend {
    accepted: AtomicUsize,
}

#[async_trait]
impl Backend for CountingBackend {
    async fn submit(&self, artifact: Artifact) -> qwave_sdk::Result<()> {
        if artifact.program == "reject" {
            return Err(SdkError::EmitError("rejected".to_string()));
        }
        self.accepted.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[tokio::test]
async fn test_submit_to_memory_backend() -> anyhow::Result<()> {
    let service = CompilerBuilder::new().build_service()?;
    let backend = MemoryBackend::new();

    let artifact = service
        .compile_and_submit(CompileRequest::new("single", SINGLE), &backend)
        .await?;
    assert_eq!(artifact.program, "single");
    assert_eq!(artifact.steps.last().map(|s| s.op.as_str()), Some("interfere"));
    assert_eq!(backend.artifacts(), vec![artifact]);
    Ok(())
}

#[tokio::test]
async fn test_failed_compilation_is_never_submitted() -> anyhow::Result<()> {
    let service = CompilerBuilder::new().build_service()?;
    let backend = MemoryBackend::new();

    let err = service
        .compile_and_submit(CompileRequest::new("broken", UNDECLARED), &backend)
        .await
        .unwrap_err();
    match err {
        SdkError::CompilationFailed { stage, errors, .. } => {
            assert_eq!(stage, Stage::Parse);
            assert_eq!(errors, 1);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(backend.artifacts().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_backend_rejection_is_reported() -> anyhow::Result<()> {
    let service = CompilerBuilder::new().build_service()?;
    let backend = CountingBackend::default();

    service
        .compile_and_submit(CompileRequest::new("accept", SINGLE), &backend)
        .await?;
    let err = service
        .compile_and_submit(CompileRequest::new("reject", SINGLE), &backend)
        .await
        .unwrap_err();
    assert!(matches!(err, SdkError::EmitError(_)));
    assert_eq!(backend.accepted.load(Ordering::SeqCst), 1);
    Ok(())
}

#[test]
fn test_artifact_json_round_trip() -> anyhow::Result<()> {
    let options = CompileOptions::default().with_thermal_ceiling(1.5);
    let result = compile(PROTECTED, options);
    let artifact = Artifact::from_result("protected", &result)?;

    let text = JsonEmitter::pretty().emit(&artifact)?;
    let parsed: Artifact = serde_json::from_str(&text)?;
    assert_eq!(parsed, artifact);
    assert_eq!(parsed.outputs.len(), 1);
    assert!(parsed.steps.iter().any(|s| s.op == "join"));
    Ok(())
}
