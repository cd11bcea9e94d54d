//! Graph invariants checked around every pass
//!
//! After a pass the graph must still be acyclic with no dangling edges, keep
//! the same inputs and outputs (name and designated node), keep the type of
//! every surviving node,
//! and differ from the pre-pass graph only in ways the pass's
//! [`Capabilities`] allow.

use super::Capabilities;
use crate::error::{CompileError, Result};
use qwave_core::ir::OutputPort;
use qwave_core::{IrGraph, IrNode, NodeId};
use std::collections::BTreeMap;

/// Pre-pass state of a graph
pub struct GraphSnapshot {
    nodes: BTreeMap<NodeId, IrNode>,
    inputs: Vec<NodeId>,
    outputs: Vec<OutputPort>,
    hints: qwave_core::ir::ParallelHints,
}

impl GraphSnapshot {
    pub fn capture(graph: &IrGraph) -> Self {
        Self {
            nodes: graph.nodes().map(|n| (n.id, n.clone())).collect(),
            inputs: graph.inputs().to_vec(),
            outputs: graph.outputs().to_vec(),
            hints: graph.hints().clone(),
        }
    }

    /// Check `graph` as left by `pass`
    pub fn verify(&self, graph: &IrGraph, pass: &str, capabilities: Capabilities) -> Result<()> {
        let violation = |node: Option<NodeId>, message: String| CompileError::InvariantViolation {
            pass: pass.to_string(),
            node,
            message,
        };

        check_structure(graph).map_err(|(node, message)| violation(node, message))?;

        if graph.inputs() != self.inputs.as_slice() {
            return Err(violation(None, "declared inputs changed".to_string()));
        }
        if graph.outputs().len() != self.outputs.len() {
            return Err(violation(None, "designated outputs changed".to_string()));
        }
        for (after, before) in graph.outputs().iter().zip(&self.outputs) {
            if after != before {
                return Err(violation(
                    Some(after.node),
                    format!(
                        "output '{}' moved from {} to {}",
                        before.name, before.node, after.node
                    ),
                ));
            }
        }

        for (id, before) in &self.nodes {
            let Some(after) = graph.node(*id) else {
                if !capabilities.remove {
                    return Err(violation(Some(*id), "node removed".to_string()));
                }
                continue;
            };
            if after.ty != before.ty {
                return Err(violation(
                    Some(*id),
                    format!("type changed from {} to {}", before.ty, after.ty),
                ));
            }
            if after.kind != before.kind && !(capabilities.insert && capabilities.rewire) {
                return Err(violation(Some(*id), "node kind changed".to_string()));
            }
            if after.inputs != before.inputs && !capabilities.rewire {
                return Err(violation(Some(*id), "inputs rewired".to_string()));
            }
            let rewritten = after.attrs != before.attrs
                || after.params != before.params
                || after.name != before.name;
            if rewritten && !capabilities.attributes {
                return Err(violation(Some(*id), "attributes rewritten".to_string()));
            }
        }

        if !capabilities.insert {
            if let Some(added) = graph.nodes().find(|n| !self.nodes.contains_key(&n.id)) {
                return Err(violation(Some(added.id), "node inserted".to_string()));
            }
        }
        if graph.hints() != &self.hints && !capabilities.attributes {
            return Err(violation(None, "parallel hints rewritten".to_string()));
        }
        Ok(())
    }
}

/// Structural checks that hold for any graph the pipeline accepts
pub fn check_structure(graph: &IrGraph) -> std::result::Result<(), (Option<NodeId>, String)> {
    if let Some((consumer, missing)) = graph.dangling_edges().first() {
        return Err((
            Some(*consumer),
            format!("edge from missing node {missing}"),
        ));
    }
    if let Some(port) = graph.outputs().iter().find(|o| !graph.contains(o.node)) {
        return Err((
            Some(port.node),
            format!("output '{}' points at a missing node", port.name),
        ));
    }
    if let Err(stuck) = graph.topo_order() {
        return Err((stuck.first().copied(), "graph has a cycle".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use qwave_core::ir::AttrValue;
    use qwave_core::{OpKind, ValueType};

    fn graph() -> (IrGraph, NodeId, NodeId) {
        let mut graph = IrGraph::new("g");
        let a = graph.add_input("a", ValueType::wave(2));
        let s = graph
            .add_operation(OpKind::Split, vec![a], ValueType::wave(2))
            .unwrap();
        let f = graph
            .add_operation(OpKind::Fourier, vec![s], ValueType::wave(2))
            .unwrap();
        graph.designate_output("y", f).unwrap();
        (graph, s, f)
    }

    #[test]
    fn test_unchanged_graph_passes() {
        let (graph, _, _) = graph();
        let snapshot = GraphSnapshot::capture(&graph);
        assert!(snapshot
            .verify(&graph, "noop", Capabilities::default())
            .is_ok());
    }

    #[test]
    fn test_redirected_output_is_reported() {
        let (mut graph, s, _) = graph();
        let snapshot = GraphSnapshot::capture(&graph);
        graph.designate_output("y", s).unwrap();

        let err = snapshot
            .verify(&graph, "redirect", Capabilities::attributes_only())
            .unwrap_err();
        assert!(matches!(
            err,
            CompileError::InvariantViolation { node: Some(n), .. } if n == s
        ));
        assert!(err.to_string().contains("output 'y' moved"));
    }

    #[test]
    fn test_cycle_is_reported() {
        let (mut graph, s, f) = graph();
        let snapshot = GraphSnapshot::capture(&graph);
        graph.set_inputs(s, vec![f]).unwrap();

        let caps = Capabilities::attributes_only().with_rewire();
        let err = snapshot.verify(&graph, "bad", caps).unwrap_err();
        assert!(err.to_string().contains("cycle"));
    }

    #[test]
    fn test_attribute_change_needs_capability() {
        let (mut graph, s, _) = graph();
        let snapshot = GraphSnapshot::capture(&graph);
        graph
            .node_mut(s)
            .unwrap()
            .attrs
            .mark("seen", AttrValue::Flag(true));

        assert!(snapshot
            .verify(&graph, "p", Capabilities::default())
            .is_err());
        assert!(snapshot
            .verify(&graph, "p", Capabilities::attributes_only())
            .is_ok());
    }

    #[test]
    fn test_type_change_is_rejected() {
        let (mut graph, s, _) = graph();
        let snapshot = GraphSnapshot::capture(&graph);
        graph.node_mut(s).unwrap().ty = ValueType::scalar();

        let caps = Capabilities::attributes_only().with_insert().with_rewire();
        let err = snapshot.verify(&graph, "p", caps).unwrap_err();
        assert_eq!(err.node(), Some(s));
    }
}
