//! Batch Service Example
//!
//! Runs several programs through the async compile service and submits the
//! successful ones to an in-memory backend.
//!
//! Key concepts:
//! - Compilations run concurrently, bounded by `max_concurrency`
//! - A failed compilation carries its diagnostics and is never submitted
//! - Results come back in request order

use qwave_sdk::{
    Artifact, Backend, CompileRequest, CompilerBuilder, ErrorCorrection, MemoryBackend,
};
use std::time::Duration;

fn requests() -> Vec<CompileRequest> {
    vec![
        CompileRequest::new(
            "interference",
            "input a: wave[4]; input b: wave[4]; output y: wave[4]; y = interfere(a, b);",
        ),
        CompileRequest::new(
            "spectrum",
            "input a: wave[8]; output y: wave[8]; s = split(a); y = fourier(s, thermal: 6);",
        ),
        CompileRequest::new(
            "typo",
            "input a: wave[4]; output y: wave[4]; y = fourier(b);",
        ),
        CompileRequest::new(
            "readout",
            "input a: wave[4]; output m: wave[4]; m = measure(a, correction: \"basic\");",
        ),
    ]
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    println!("=== Batch Compile Service Example ===\n");

    let service = CompilerBuilder::new()
        .thermal_ceiling(2.0)
        .default_error_correction(ErrorCorrection::None)
        .timeout(Duration::from_secs(10))
        .max_concurrency(2)
        .build_service()?;
    let backend = MemoryBackend::new();

    let items = service.compile_batch(requests()).await;
    for item in items {
        let result = match item.outcome {
            Ok(result) => result,
            Err(err) => {
                println!("✗ {}: {}", item.name, err);
                continue;
            }
        };
        if !result.success {
            println!("✗ {}: {} error(s)", item.name, result.error_count());
            for diagnostic in result.diagnostics.iter() {
                println!("    {}", diagnostic);
            }
            continue;
        }

        let artifact = Artifact::from_result(item.name.clone(), &result)?;
        println!(
            "✓ {}: {} steps, {} parallel group(s), {} warning(s)",
            item.name,
            artifact.steps.len(),
            artifact.groups.len(),
            artifact.warnings.len()
        );
        backend.submit(artifact).await?;
    }

    let submitted: Vec<String> = backend
        .artifacts()
        .into_iter()
        .map(|artifact| artifact.program)
        .collect();
    println!("\nSubmitted to backend: {:?}", submitted);
    Ok(())
}
