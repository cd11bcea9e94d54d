//! Backend boundary
//!
//! A successful compilation is turned into an [`Artifact`]: the schedule with
//! each step's operation, inputs and attributes resolved, plus the output
//! designations. Emitters serialize artifacts; backends receive them.

use crate::error::{Result, SdkError};
use async_trait::async_trait;
use qwave_compiler::CompileResult;
use qwave_core::ir::{GroupId, NodeAttributes, OutputPort, ParallelGroup};
use qwave_core::{Diagnostic, NodeId, ValueType};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// One executable step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactStep {
    pub node: NodeId,
    /// `input`, `const(..)` or the operation label
    pub op: String,
    pub inputs: Vec<NodeId>,
    pub ty: ValueType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<GroupId>,
    pub attrs: NodeAttributes,
}

/// What a backend receives for one program
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    pub program: String,
    pub steps: Vec<ArtifactStep>,
    pub outputs: Vec<OutputPort>,
    #[serde(default)]
    pub groups: Vec<ParallelGroup>,
    /// Non-fatal diagnostics of the compilation
    #[serde(default)]
    pub warnings: Vec<Diagnostic>,
}

impl Artifact {
    /// Build the artifact of a successful compilation
    pub fn from_result(program: impl Into<String>, result: &CompileResult) -> Result<Self> {
        let (Some(graph), Some(schedule)) = (&result.graph, &result.schedule) else {
            return Err(crate::failure(result));
        };

        let mut steps = Vec::with_capacity(schedule.len());
        for step in &schedule.steps {
            let node = graph.node(step.node).ok_or_else(|| {
                SdkError::EmitError(format!("scheduled node {} is not in the graph", step.node))
            })?;
            steps.push(ArtifactStep {
                node: node.id,
                op: node.kind.label(),
                inputs: node.inputs.clone(),
                ty: node.ty.clone(),
                group: step.group,
                attrs: node.attrs.clone(),
            });
        }

        Ok(Self {
            program: program.into(),
            steps,
            outputs: graph.outputs().to_vec(),
            groups: schedule.groups.clone(),
            warnings: result.diagnostics.warnings().cloned().collect(),
        })
    }
}

/// Serializes artifacts for a backend
pub trait Emitter: Send + Sync {
    fn format(&self) -> &'static str;

    fn emit(&self, artifact: &Artifact) -> Result<String>;
}

/// JSON artifact emitter
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonEmitter {
    pub pretty: bool,
}

impl JsonEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pretty() -> Self {
        Self { pretty: true }
    }
}

impl Emitter for JsonEmitter {
    fn format(&self) -> &'static str {
        "json"
    }

    fn emit(&self, artifact: &Artifact) -> Result<String> {
        let text = if self.pretty {
            serde_json::to_string_pretty(artifact)?
        } else {
            serde_json::to_string(artifact)?
        };
        Ok(text)
    }
}

/// Execution backend that accepts compiled programs
#[async_trait]
pub trait Backend: Send + Sync {
    async fn submit(&self, artifact: Artifact) -> Result<()>;
}

/// Backend that keeps every artifact in memory
#[derive(Debug, Default)]
pub struct MemoryBackend {
    artifacts: Mutex<Vec<Artifact>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Artifacts received so far, in submission order
    ///
    /// Artifacts stored before a panic in another holder of the lock are
    /// still returned.
    pub fn artifacts(&self) -> Vec<Artifact> {
        match self.artifacts.lock() {
            Ok(artifacts) => artifacts.clone(),
            Err(poisoned) => {
                tracing::warn!("Backend store poisoned, reading stored artifacts");
                poisoned.into_inner().clone()
            }
        }
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn submit(&self, artifact: Artifact) -> Result<()> {
        tracing::debug!(
            "Backend received '{}' with {} steps",
            artifact.program,
            artifact.steps.len()
        );
        self.artifacts
            .lock()
            .map_err(|_| SdkError::EmitError("backend store poisoned".to_string()))?
            .push(artifact);
        Ok(())
    }
}
