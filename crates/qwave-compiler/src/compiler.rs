//! Main compiler
//!
//! Runs the whole pipeline for one source text:
//! configure -> parse -> build -> annotate -> optimize -> schedule.
//! A stage that reports an error stops the pipeline; every diagnostic
//! collected up to that point is returned with the result.

use crate::annotator::Annotator;
use crate::builder::IrBuilder;
use crate::error::{CompileError, Result};
use crate::optimizer::{Optimizer, PassId, DEFAULT_MAX_ITERATIONS};
use crate::scheduler::{self, Schedule};
use qwave_core::ir::{Budget, ErrorCorrection, GraphSummary};
use qwave_core::{Diagnostics, IrGraph, OperationRegistry, Program, Stage, StageFailed};
use qwave_parser::ProgramParser;
use serde::{Deserialize, Serialize};

/// Compiler options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileOptions {
    /// Passes to run, in order
    pub pass_list: Vec<String>,
    /// Per-node thermal limit; `None` disables thermal splitting
    pub thermal_ceiling: Option<f64>,
    /// Requirement of nodes that state none
    pub default_error_correction: ErrorCorrection,
    /// Coherence budget of nodes that state none
    pub default_coherence_budget: Budget,
    /// Repeat the pass list until nothing changes
    pub iterate_to_fixed_point: bool,
    pub max_iterations: usize,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            pass_list: PassId::all().iter().map(|p| p.name().to_string()).collect(),
            thermal_ceiling: None,
            default_error_correction: ErrorCorrection::None,
            default_coherence_budget: Budget::Unbounded,
            iterate_to_fixed_point: false,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

impl CompileOptions {
    pub fn with_passes<S: Into<String>>(mut self, passes: impl IntoIterator<Item = S>) -> Self {
        self.pass_list = passes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_thermal_ceiling(mut self, ceiling: f64) -> Self {
        self.thermal_ceiling = Some(ceiling);
        self
    }

    pub fn with_default_error_correction(mut self, correction: ErrorCorrection) -> Self {
        self.default_error_correction = correction;
        self
    }

    pub fn with_fixed_point(mut self, enabled: bool) -> Self {
        self.iterate_to_fixed_point = enabled;
        self
    }

    /// Reject values the pipeline cannot work with
    pub fn validate(&self) -> Result<()> {
        let invalid = |option: &str, message: String| CompileError::InvalidOption {
            option: option.to_string(),
            message,
        };
        if let Some(ceiling) = self.thermal_ceiling {
            if !ceiling.is_finite() || ceiling <= 0.0 {
                return Err(invalid(
                    "thermal_ceiling",
                    format!("must be a finite number > 0, got {ceiling}"),
                ));
            }
        }
        if let Budget::Bounded(amount) = self.default_coherence_budget {
            if !amount.is_finite() || amount < 0.0 {
                return Err(invalid(
                    "default_coherence_budget",
                    format!("must be a finite number >= 0, got {amount}"),
                ));
            }
        }
        if self.max_iterations == 0 {
            return Err(invalid("max_iterations", "must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// Outcome of one compilation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompileResult {
    pub success: bool,
    /// Every diagnostic of the attempt, in report order
    pub diagnostics: Diagnostics,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<Schedule>,
    /// Counts of the last graph that passed its stage
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graph_summary: Option<GraphSummary>,
    /// Final graph; only present on success
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graph: Option<IrGraph>,
}

impl CompileResult {
    fn failed(diagnostics: Diagnostics, graph_summary: Option<GraphSummary>) -> Self {
        Self {
            success: false,
            diagnostics,
            schedule: None,
            graph_summary,
            graph: None,
        }
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics.error_count()
    }
}

/// The qwave compiler
pub struct Compiler {
    registry: OperationRegistry,
    options: CompileOptions,
}

impl Compiler {
    /// Compiler with default options and the built-in operations
    pub fn new() -> Self {
        Self::with_options(CompileOptions::default())
    }

    pub fn with_options(options: CompileOptions) -> Self {
        Self {
            registry: OperationRegistry::default(),
            options,
        }
    }

    /// Use a custom operation registry
    pub fn with_registry(mut self, registry: OperationRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    pub fn registry(&self) -> &OperationRegistry {
        &self.registry
    }

    /// Compile source text into a schedule
    pub fn compile(&self, source: &str) -> CompileResult {
        let mut diagnostics = Diagnostics::new();
        tracing::debug!("Compiling {} bytes", source.len());

        let optimizer = match self.configure(&mut diagnostics) {
            Ok(optimizer) => optimizer,
            Err(_) => return CompileResult::failed(diagnostics, None),
        };
        let program = match self.parse(source, &mut diagnostics) {
            Ok(program) => program,
            Err(_) => return CompileResult::failed(diagnostics, None),
        };
        let mut graph = match self.build(&program, &mut diagnostics) {
            Ok(graph) => graph,
            Err(_) => return CompileResult::failed(diagnostics, None),
        };
        if self.annotate(&mut graph, &mut diagnostics).is_err() {
            return CompileResult::failed(diagnostics, Some(graph.summary()));
        }
        let built = graph.summary();
        let graph = match optimizer.optimize(graph, &self.registry, &mut diagnostics) {
            Ok(graph) => graph,
            Err(_) => return CompileResult::failed(diagnostics, Some(built)),
        };
        let schedule = match self.schedule(&graph, &mut diagnostics) {
            Ok(schedule) => schedule,
            Err(_) => return CompileResult::failed(diagnostics, Some(graph.summary())),
        };

        tracing::info!(
            "Compiled '{}': {} nodes, {} steps, {} diagnostics",
            graph.name,
            graph.node_count(),
            schedule.len(),
            diagnostics.len()
        );
        CompileResult {
            success: true,
            diagnostics,
            schedule: Some(schedule),
            graph_summary: Some(graph.summary()),
            graph: Some(graph),
        }
    }

    /// Validate options and assemble the pass pipeline
    pub fn configure(&self, diagnostics: &mut Diagnostics) -> std::result::Result<Optimizer, StageFailed> {
        let configured = self.options.validate().and_then(|_| {
            Optimizer::from_names(&self.options.pass_list).map(|optimizer| {
                optimizer
                    .with_fixed_point(self.options.iterate_to_fixed_point, self.options.max_iterations)
                    .with_thermal_ceiling(self.options.thermal_ceiling)
            })
        });
        match configured {
            Ok(optimizer) => {
                tracing::debug!("Pass pipeline: {:?}", optimizer.pass_names());
                Ok(optimizer)
            }
            Err(err) => {
                diagnostics.push(err.to_diagnostic(Stage::Configure));
                Err(StageFailed {
                    stage: Stage::Configure,
                    errors: 1,
                })
            }
        }
    }

    pub fn parse(&self, source: &str, diagnostics: &mut Diagnostics) -> std::result::Result<Program, StageFailed> {
        ProgramParser::new(&self.registry).parse(source, diagnostics)
    }

    pub fn build(&self, program: &Program, diagnostics: &mut Diagnostics) -> std::result::Result<IrGraph, StageFailed> {
        IrBuilder::new(&self.registry).build(program, diagnostics)
    }

    pub fn annotate(&self, graph: &mut IrGraph, diagnostics: &mut Diagnostics) -> std::result::Result<(), StageFailed> {
        Annotator::new(&self.registry, &self.options).annotate(graph, diagnostics)
    }

    /// Order the graph and check the order before handing it out
    pub fn schedule(&self, graph: &IrGraph, diagnostics: &mut Diagnostics) -> std::result::Result<Schedule, StageFailed> {
        let scheduled = scheduler::schedule(graph).and_then(|schedule| {
            schedule.verify(graph)?;
            Ok(schedule)
        });
        match scheduled {
            Ok(schedule) => Ok(schedule),
            Err(err) => {
                diagnostics.push(err.to_diagnostic(Stage::Schedule));
                Err(StageFailed {
                    stage: Stage::Schedule,
                    errors: 1,
                })
            }
        }
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}
