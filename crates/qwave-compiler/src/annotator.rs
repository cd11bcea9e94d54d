//! Constraint annotator
//!
//! Sets the coherence budget, thermal budget and error-correction requirement
//! of every node. Later sources override earlier ones:
//! 1. global defaults from [`CompileOptions`]
//! 2. defaults of the operation kind from the registry
//! 3. explicit parameters of the call (including enclosing block parameters)
//!
//! A node without an explicit `correction` parameter inherits the strongest
//! fault-tolerant requirement among its inputs. Afterwards requirements must
//! not weaken along any edge leaving a fault-tolerant node; an explicit
//! weaker requirement there is a constraint conflict.
//!
//! The annotator never adds, removes or rewires nodes.

use crate::compiler::CompileOptions;
use crate::error::CompileError;
use qwave_core::ir::{Budget, ErrorCorrection, IrNode, NodeKind};
use qwave_core::{Diagnostics, IrGraph, Literal, OperationRegistry, Stage, StageFailed};

pub struct Annotator<'a> {
    registry: &'a OperationRegistry,
    options: &'a CompileOptions,
}

impl<'a> Annotator<'a> {
    pub fn new(registry: &'a OperationRegistry, options: &'a CompileOptions) -> Self {
        Self { registry, options }
    }

    pub fn annotate(
        &self,
        graph: &mut IrGraph,
        diagnostics: &mut Diagnostics,
    ) -> Result<(), StageFailed> {
        let mut errors = Vec::new();
        for node in graph.nodes_mut() {
            if let Err(err) = self.annotate_node(node) {
                errors.push(err);
            }
        }
        if errors.is_empty() {
            inherit_fault_tolerance(graph);
            errors.extend(check_monotonicity(graph));
        }

        diagnostics.extend(errors.iter().map(|e| e.to_diagnostic(Stage::Annotate)));
        diagnostics.check(Stage::Annotate)?;
        tracing::debug!("Annotated {} nodes", graph.node_count());
        Ok(())
    }

    fn annotate_node(&self, node: &mut IrNode) -> Result<(), CompileError> {
        // Global defaults
        node.attrs.coherence = self.options.default_coherence_budget;
        node.attrs.thermal = Budget::Unbounded;
        node.attrs.correction = self.options.default_error_correction.clone();

        // Kind defaults
        match &node.kind {
            NodeKind::Input => {}
            NodeKind::Constant { .. } => {
                node.attrs.thermal = Budget::Bounded(0.0);
                node.attrs.correction = ErrorCorrection::None;
            }
            NodeKind::Operation(op) => {
                if let Some(spec) = self.registry.spec_of(op) {
                    node.attrs.thermal = Budget::Bounded(spec.thermal_load);
                    if let Some(correction) = &spec.default_correction {
                        node.attrs.correction = correction.clone();
                    }
                }
            }
        }

        // Explicit parameters
        let id = node.id;
        let conflict = |message: String| CompileError::ConstraintConflict { node: id, message };
        if let Some(amount) = node.params.get("coherence").and_then(Literal::as_number) {
            node.attrs.coherence = Budget::bounded(amount).map_err(|e| conflict(e.to_string()))?;
        }
        if let Some(amount) = node.params.get("thermal").and_then(Literal::as_number) {
            node.attrs.thermal = Budget::bounded(amount).map_err(|e| conflict(e.to_string()))?;
        }
        let level = node.params.get("level").and_then(Literal::as_positive_integer);
        let code = node.params.get("code").and_then(Literal::as_text);
        let correction = match node.params.get("correction").and_then(Literal::as_text) {
            Some(name) => Some(
                ErrorCorrection::from_parts(name, level, code).map_err(|e| conflict(e.to_string()))?,
            ),
            None => refine(&node.attrs.correction, level, code),
        };
        if let Some(correction) = correction {
            node.attrs.correction = correction;
        }
        Ok(())
    }
}

/// Apply a bare `level` or `code` parameter to the current requirement
///
/// `level` makes the requirement fault-tolerant at that level; `code` swaps
/// the code family and leaves `none` alone.
fn refine(current: &ErrorCorrection, level: Option<u32>, code: Option<&str>) -> Option<ErrorCorrection> {
    if level.is_none() && code.is_none() {
        return None;
    }
    let mut refined = match (level, current) {
        (Some(level), ErrorCorrection::FaultTolerant { code, .. }) => ErrorCorrection::FaultTolerant {
            level,
            code: code.clone(),
        },
        (Some(level), _) => ErrorCorrection::fault_tolerant(level),
        (None, current) => current.clone(),
    };
    if let Some(code) = code {
        refined = refined.with_code(code);
    }
    Some(refined)
}

/// Raise implicit requirements to the strongest fault-tolerant input
fn inherit_fault_tolerance(graph: &mut IrGraph) {
    let Ok(order) = graph.topo_order() else {
        return;
    };
    for id in order {
        let Some(node) = graph.node(id) else { continue };
        if node.params.contains_key("correction") {
            continue;
        }
        let strongest = node
            .inputs
            .iter()
            .filter_map(|input| graph.node(*input))
            .map(|input| &input.attrs.correction)
            .filter(|c| c.is_fault_tolerant())
            .max_by_key(|c| c.strength())
            .cloned();
        if let Some(required) = strongest {
            if required.strength() > node.attrs.correction.strength() {
                if let Some(node) = graph.node_mut(id) {
                    tracing::trace!("{} inherits {}", id, required);
                    node.attrs.correction = required;
                }
            }
        }
    }
}

/// Every edge `u -> v` with `u` fault-tolerant and `v` weaker than `u`
pub fn check_monotonicity(graph: &IrGraph) -> Vec<CompileError> {
    let mut conflicts = Vec::new();
    for node in graph.nodes() {
        for input in node.inputs.iter().filter_map(|id| graph.node(*id)) {
            let upstream = &input.attrs.correction;
            if upstream.is_fault_tolerant() && node.attrs.correction.strength() < upstream.strength() {
                conflicts.push(CompileError::ConstraintConflict {
                    node: node.id,
                    message: format!(
                        "requires {} but depends on {} which requires {}",
                        node.attrs.correction, input.id, upstream
                    ),
                });
            }
        }
    }
    conflicts
}

#[cfg(test)]
mod tests {
    use super::*;
    use qwave_core::{NodeId, OpKind, ValueType};

    fn annotate(graph: &mut IrGraph, options: &CompileOptions) -> Diagnostics {
        let registry = OperationRegistry::default();
        let mut diagnostics = Diagnostics::new();
        let _ = Annotator::new(&registry, options).annotate(graph, &mut diagnostics);
        diagnostics
    }

    fn pair() -> (IrGraph, NodeId, NodeId) {
        let mut graph = IrGraph::new("pair");
        let a = graph.add_input("a", ValueType::wave(2));
        let first = graph
            .add_operation(OpKind::Split, vec![a], ValueType::wave(2))
            .unwrap();
        let second = graph
            .add_operation(OpKind::Fourier, vec![first], ValueType::wave(2))
            .unwrap();
        graph.designate_output("y", second).unwrap();
        (graph, first, second)
    }

    #[test]
    fn test_precedence() {
        let (mut graph, first, second) = pair();
        graph
            .node_mut(second)
            .unwrap()
            .params
            .insert("thermal".to_string(), Literal::Number(7.0));
        let options = CompileOptions {
            default_coherence_budget: Budget::Bounded(10.0),
            default_error_correction: ErrorCorrection::basic(),
            ..CompileOptions::default()
        };
        let diagnostics = annotate(&mut graph, &options);
        assert!(diagnostics.is_empty());

        let first = graph.node(first).unwrap();
        assert_eq!(first.attrs.coherence, Budget::Bounded(10.0));
        assert_eq!(first.attrs.thermal, Budget::Bounded(1.0));
        assert_eq!(first.attrs.correction, ErrorCorrection::basic());
        assert_eq!(graph.node(second).unwrap().attrs.thermal, Budget::Bounded(7.0));
    }

    #[test]
    fn test_kind_default_correction() {
        let mut graph = IrGraph::new("g");
        let a = graph.add_input("a", ValueType::wave(2));
        let c = graph
            .add_operation(OpKind::Correct, vec![a], ValueType::wave(2))
            .unwrap();
        graph.designate_output("y", c).unwrap();
        annotate(&mut graph, &CompileOptions::default());

        assert_eq!(
            graph.node(c).unwrap().attrs.correction,
            ErrorCorrection::fault_tolerant(1)
        );
        assert!(graph.node(a).unwrap().attrs.correction.is_none());
    }

    #[test]
    fn test_fault_tolerance_is_inherited() {
        let (mut graph, first, second) = pair();
        let node = graph.node_mut(first).unwrap();
        node.params
            .insert("correction".to_string(), Literal::Text("fault_tolerant".into()));
        node.params.insert("level".to_string(), Literal::Number(2.0));

        let diagnostics = annotate(&mut graph, &CompileOptions::default());
        assert!(!diagnostics.has_errors());
        assert_eq!(
            graph.node(second).unwrap().attrs.correction,
            ErrorCorrection::fault_tolerant(2)
        );
        assert!(check_monotonicity(&graph).is_empty());
    }

    #[test]
    fn test_explicit_weaker_requirement_conflicts() {
        let (mut graph, first, second) = pair();
        graph
            .node_mut(first)
            .unwrap()
            .params
            .insert("correction".to_string(), Literal::Text("fault_tolerant".into()));
        graph
            .node_mut(second)
            .unwrap()
            .params
            .insert("correction".to_string(), Literal::Text("basic".into()));

        let diagnostics = annotate(&mut graph, &CompileOptions::default());
        let conflicts: Vec<_> = diagnostics
            .of_kind(qwave_core::DiagnosticKind::ConstraintConflict)
            .collect();
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].node, Some(second));
    }

    #[test]
    fn test_refine_level_and_code() {
        assert_eq!(refine(&ErrorCorrection::None, None, None), None);
        assert_eq!(
            refine(&ErrorCorrection::None, Some(3), None),
            Some(ErrorCorrection::fault_tolerant(3))
        );
        assert_eq!(
            refine(&ErrorCorrection::basic(), None, Some("shor")),
            Some(ErrorCorrection::Basic {
                code: "shor".into()
            })
        );
        assert_eq!(
            refine(&ErrorCorrection::None, None, Some("shor")),
            Some(ErrorCorrection::None)
        );
    }

    #[test]
    fn test_annotation_never_changes_structure() {
        let (mut graph, _, _) = pair();
        let before = graph.summary();
        annotate(&mut graph, &CompileOptions::default());
        assert_eq!(graph.summary(), before);
        assert_eq!(graph.node_ids(), vec![NodeId(0), NodeId(1), NodeId(2)]);
    }
}
