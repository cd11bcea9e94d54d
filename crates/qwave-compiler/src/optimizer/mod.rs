//! Optimization pipeline
//!
//! Passes run in the configured order. Each pass declares which graph edits
//! it is allowed to make; after every pass the graph is checked against a
//! snapshot taken before it ran (see [`invariants`]).

pub mod coherence;
pub mod error_correction;
pub mod invariants;
pub mod performance;
pub mod thermal;

pub use coherence::CoherencePass;
pub use error_correction::ErrorCorrectionPass;
pub use invariants::GraphSnapshot;
pub use performance::PerformancePass;
pub use thermal::ThermalPass;

use crate::error::{CompileError, Result};
use qwave_core::{Diagnostic, Diagnostics, IrGraph, OperationRegistry, Stage, StageFailed};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Iteration bound when passes run to a fixed point
pub const DEFAULT_MAX_ITERATIONS: usize = 16;

/// Built-in passes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PassId {
    Coherence,
    Thermal,
    ErrorCorrection,
    Performance,
}

impl PassId {
    /// Default pipeline order
    pub fn all() -> [PassId; 4] {
        [
            PassId::Coherence,
            PassId::Thermal,
            PassId::ErrorCorrection,
            PassId::Performance,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            PassId::Coherence => "coherence",
            PassId::Thermal => "thermal",
            PassId::ErrorCorrection => "error_correction",
            PassId::Performance => "performance",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::all().into_iter().find(|id| id.name() == name)
    }

    fn instantiate(&self) -> Box<dyn Pass> {
        match self {
            PassId::Coherence => Box::new(CoherencePass),
            PassId::Thermal => Box::new(ThermalPass),
            PassId::ErrorCorrection => Box::new(ErrorCorrectionPass),
            PassId::Performance => Box::new(PerformancePass),
        }
    }
}

impl fmt::Display for PassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Graph edits a pass may perform
///
/// Inspecting nodes is always allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    /// Add nodes or change a node's kind
    pub insert: bool,
    /// Remove nodes
    pub remove: bool,
    /// Change the inputs of existing nodes
    pub rewire: bool,
    /// Change attributes, parameters and hints
    pub attributes: bool,
}

impl Capabilities {
    pub fn attributes_only() -> Self {
        Self {
            attributes: true,
            ..Self::default()
        }
    }

    pub fn with_insert(mut self) -> Self {
        self.insert = true;
        self
    }

    pub fn with_remove(mut self) -> Self {
        self.remove = true;
        self
    }

    pub fn with_rewire(mut self) -> Self {
        self.rewire = true;
        self
    }
}

/// State shared by every pass of one optimization run
pub struct PassContext<'a> {
    pub registry: &'a OperationRegistry,
    /// Per-node thermal limit the thermal pass splits against
    pub thermal_ceiling: Option<f64>,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> PassContext<'a> {
    pub fn new(registry: &'a OperationRegistry) -> Self {
        Self {
            registry,
            thermal_ceiling: None,
            diagnostics: Vec::new(),
        }
    }

    pub fn with_thermal_ceiling(mut self, ceiling: Option<f64>) -> Self {
        self.thermal_ceiling = ceiling;
        self
    }

    /// Report a warning or note; errors are returned from [`Pass::run`]
    pub fn report(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn reported(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    fn drain_into(&mut self, diagnostics: &mut Diagnostics) {
        diagnostics.extend(self.diagnostics.drain(..));
    }
}

/// A graph rewrite
pub trait Pass: Send + Sync {
    fn name(&self) -> &'static str;

    fn capabilities(&self) -> Capabilities;

    /// Rewrite `graph` in place; returns whether anything changed
    fn run(&self, graph: &mut IrGraph, ctx: &mut PassContext<'_>) -> Result<bool>;
}

/// Configured pass pipeline
pub struct Optimizer {
    passes: Vec<Box<dyn Pass>>,
    iterate_to_fixed_point: bool,
    max_iterations: usize,
    thermal_ceiling: Option<f64>,
}

impl Optimizer {
    /// Pipeline from pass names; unknown names are rejected
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self> {
        let passes = names
            .iter()
            .map(|name| {
                PassId::from_name(name.as_ref())
                    .map(|id| id.instantiate())
                    .ok_or_else(|| CompileError::UnknownPass(name.as_ref().to_string()))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::with_passes(passes))
    }

    pub fn with_passes(passes: Vec<Box<dyn Pass>>) -> Self {
        Self {
            passes,
            iterate_to_fixed_point: false,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            thermal_ceiling: None,
        }
    }

    pub fn with_fixed_point(mut self, enabled: bool, max_iterations: usize) -> Self {
        self.iterate_to_fixed_point = enabled;
        self.max_iterations = max_iterations.max(1);
        self
    }

    pub fn with_thermal_ceiling(mut self, ceiling: Option<f64>) -> Self {
        self.thermal_ceiling = ceiling;
        self
    }

    pub fn pass_names(&self) -> Vec<&'static str> {
        self.passes.iter().map(|p| p.name()).collect()
    }

    /// Run the pipeline
    ///
    /// The first failing pass or invariant violation stops the run.
    pub fn optimize(
        &self,
        mut graph: IrGraph,
        registry: &OperationRegistry,
        diagnostics: &mut Diagnostics,
    ) -> std::result::Result<IrGraph, StageFailed> {
        let mut ctx = PassContext::new(registry).with_thermal_ceiling(self.thermal_ceiling);
        let rounds = if self.iterate_to_fixed_point {
            self.max_iterations
        } else {
            1
        };

        let mut converged = false;
        for round in 1..=rounds {
            let mut changed = false;
            for pass in &self.passes {
                match self.run_pass(pass.as_ref(), &mut graph, &mut ctx) {
                    Ok(pass_changed) => changed |= pass_changed,
                    Err(err) => {
                        ctx.drain_into(diagnostics);
                        diagnostics.push(err.to_diagnostic(Stage::Optimize));
                        return Err(StageFailed {
                            stage: Stage::Optimize,
                            errors: 1,
                        });
                    }
                }
            }
            tracing::debug!("Optimization round {} changed={}", round, changed);
            if !changed {
                converged = true;
                break;
            }
        }

        if self.iterate_to_fixed_point && !converged {
            ctx.report(Diagnostic::warning(
                Stage::Optimize,
                qwave_core::DiagnosticKind::BudgetExceeded,
                format!(
                    "optimization did not reach a fixed point within {} iterations",
                    self.max_iterations
                ),
            ));
        }

        ctx.drain_into(diagnostics);
        diagnostics.check(Stage::Optimize)?;
        Ok(graph)
    }

    fn run_pass(
        &self,
        pass: &dyn Pass,
        graph: &mut IrGraph,
        ctx: &mut PassContext<'_>,
    ) -> Result<bool> {
        let snapshot = GraphSnapshot::capture(graph);
        let changed = pass.run(graph, ctx)?;
        snapshot.verify(graph, pass.name(), pass.capabilities())?;
        if changed {
            tracing::debug!(
                "Pass '{}' changed the graph ({} nodes)",
                pass.name(),
                graph.node_count()
            );
        }
        Ok(changed)
    }
}

impl Default for Optimizer {
    fn default() -> Self {
        Self::with_passes(PassId::all().iter().map(|id| id.instantiate()).collect())
    }
}
