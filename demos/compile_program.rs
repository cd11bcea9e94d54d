//! Compile Program Example
//!
//! Compiles one qwave program and prints its diagnostics, schedule and JSON
//! artifact.
//!
//! Usage:
//!   cargo run --example compile_program [program.qw] [config.yaml]
//!
//! Without arguments a built-in program is compiled with a thermal ceiling
//! of 1.5, so the thermal and error-correction passes have work to do.

use qwave_sdk::{Artifact, CompileOptions, CompilerBuilder, Emitter, JsonEmitter};

const PROGRAM: &str = r#"
input a: wave[4];
input b: wave[4];
output y: wave[4];
output m: wave[4];

maintain_coherence(coherence: 8) {
    s = split(a);
    f = fourier(s, correction: "fault_tolerant", level: 2);
}
y = interfere(f, b);
m = measure(y);
"#;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let (name, source) = match args.next() {
        Some(path) => (path.clone(), std::fs::read_to_string(&path)?),
        None => ("builtin".to_string(), PROGRAM.to_string()),
    };
    let builder = match args.next() {
        Some(config) => CompilerBuilder::from_file(config)?,
        None => CompilerBuilder::new().with_options(CompileOptions::default().with_thermal_ceiling(1.5)),
    };
    let pretty = builder.config().emit.pretty;
    let compiler = builder.build()?;

    println!("=== Compiling '{}' ===", name);
    println!("Passes: {:?}\n", compiler.options().pass_list);

    let result = compiler.compile(&source);

    if !result.diagnostics.is_empty() {
        println!("Diagnostics:");
        for diagnostic in result.diagnostics.iter() {
            println!("  {}", diagnostic);
        }
        println!();
    }

    if !result.success {
        println!("✗ Compilation failed with {} error(s)", result.error_count());
        std::process::exit(1);
    }

    if let Some(summary) = &result.graph_summary {
        println!(
            "Graph: {} nodes, {} edges ({} operations)",
            summary.nodes, summary.edges, summary.operations
        );
    }

    let artifact = Artifact::from_result(name, &result)?;
    println!("\nSchedule:");
    for (position, step) in artifact.steps.iter().enumerate() {
        let group = step
            .group
            .map(|g| format!(" [group {}]", g))
            .unwrap_or_default();
        println!("  {:>3}. {} = {}{}", position, step.node, step.op, group);
    }

    let emitter = JsonEmitter { pretty };
    println!("\nArtifact ({}):", emitter.format());
    println!("{}", emitter.emit(&artifact)?);

    println!("\n✓ Compiled successfully");
    Ok(())
}
