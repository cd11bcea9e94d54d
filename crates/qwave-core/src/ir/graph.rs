//! IR graph
//!
//! Owns every node of one compilation. Nodes are kept sorted by id, and ids
//! are allocated monotonically, so iteration order is insertion order.
//!
//! The editing methods here are the whole capability set optimization passes
//! work with: inspect a node, rewrite its attributes, insert a node, remove a
//! dead node, rewire an edge.

use super::hints::ParallelHints;
use super::node::{IrNode, NodeId, NodeKind};
use super::op::OpKind;
use crate::error::{CoreError, Result};
use crate::types::ValueType;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt;

/// A designated program output
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutputPort {
    pub name: String,
    pub node: NodeId,
}

/// Node and edge counts of a graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GraphSummary {
    pub nodes: usize,
    pub edges: usize,
    pub inputs: usize,
    pub outputs: usize,
    pub constants: usize,
    pub operations: usize,
}

/// Typed dataflow DAG
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct IrGraph {
    pub name: String,
    nodes: Vec<IrNode>,
    inputs: Vec<NodeId>,
    outputs: Vec<OutputPort>,
    #[serde(default)]
    hints: ParallelHints,
    next_id: u32,
}

impl IrGraph {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    // ----- construction -----

    /// Add a declared input
    pub fn add_input(&mut self, name: impl Into<String>, ty: ValueType) -> NodeId {
        let id = self.allocate();
        let mut node = IrNode::new(id, NodeKind::Input, Vec::new(), ty);
        node.name = Some(name.into());
        self.nodes.push(node);
        self.inputs.push(id);
        id
    }

    /// Add a constant node
    pub fn add_constant(&mut self, value: f64, ty: ValueType) -> NodeId {
        let id = self.allocate();
        self.nodes
            .push(IrNode::new(id, NodeKind::Constant { value }, Vec::new(), ty));
        id
    }

    /// Add an operation; every input must already be present
    pub fn add_operation(
        &mut self,
        op: OpKind,
        inputs: Vec<NodeId>,
        ty: ValueType,
    ) -> Result<NodeId> {
        self.check_present(&inputs)?;
        let id = self.allocate();
        self.nodes
            .push(IrNode::new(id, NodeKind::Operation(op), inputs, ty));
        Ok(id)
    }

    /// Insert a copy of `template` under a fresh id, keeping its payload
    pub fn insert_like(&mut self, template: &IrNode, inputs: Vec<NodeId>) -> Result<NodeId> {
        if matches!(template.kind, NodeKind::Input) {
            return Err(CoreError::InvalidOperation(
                "inputs cannot be inserted by copy".to_string(),
            ));
        }
        self.check_present(&inputs)?;
        let id = self.allocate();
        let mut node = template.clone();
        node.id = id;
        node.inputs = inputs;
        self.nodes.push(node);
        Ok(id)
    }

    fn allocate(&mut self) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        id
    }

    fn check_present(&self, ids: &[NodeId]) -> Result<()> {
        match ids.iter().find(|id| !self.contains(**id)) {
            Some(missing) => Err(CoreError::UnknownNode(missing.to_string())),
            None => Ok(()),
        }
    }

    // ----- inspection -----

    fn position(&self, id: NodeId) -> Option<usize> {
        self.nodes.binary_search_by_key(&id, |n| n.id).ok()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.position(id).is_some()
    }

    pub fn node(&self, id: NodeId) -> Option<&IrNode> {
        self.position(id).map(|i| &self.nodes[i])
    }

    /// Mutable access for attribute and parameter rewrites
    ///
    /// Use [`IrGraph::set_inputs`] to change edges so presence is checked.
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut IrNode> {
        self.position(id).map(move |i| &mut self.nodes[i])
    }

    pub fn nodes(&self) -> impl Iterator<Item = &IrNode> {
        self.nodes.iter()
    }

    pub fn nodes_mut(&mut self) -> impl Iterator<Item = &mut IrNode> {
        self.nodes.iter_mut()
    }

    pub fn node_ids(&self) -> Vec<NodeId> {
        self.nodes.iter().map(|n| n.id).collect()
    }

    pub fn inputs(&self) -> &[NodeId] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[OutputPort] {
        &self.outputs
    }

    pub fn output(&self, name: &str) -> Option<NodeId> {
        self.outputs.iter().find(|o| o.name == name).map(|o| o.node)
    }

    pub fn is_output(&self, id: NodeId) -> bool {
        self.outputs.iter().any(|o| o.node == id)
    }

    /// Find a node by its binding name
    pub fn find(&self, name: &str) -> Option<&IrNode> {
        self.nodes.iter().find(|n| n.name.as_deref() == Some(name))
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.nodes.iter().map(|n| n.inputs.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn summary(&self) -> GraphSummary {
        GraphSummary {
            nodes: self.node_count(),
            edges: self.edge_count(),
            inputs: self.inputs.len(),
            outputs: self.outputs.len(),
            constants: self.nodes.iter().filter(|n| n.is_constant()).count(),
            operations: self.nodes.iter().filter(|n| n.is_operation()).count(),
        }
    }

    /// Nodes that take `id` as an input, in id order
    pub fn consumers(&self, id: NodeId) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|n| n.inputs.contains(&id))
            .map(|n| n.id)
            .collect()
    }

    pub fn hints(&self) -> &ParallelHints {
        &self.hints
    }

    pub fn set_hints(&mut self, hints: ParallelHints) {
        self.hints = hints;
    }

    // ----- rewriting -----

    /// Designate (or re-designate) a named output
    pub fn designate_output(&mut self, name: impl Into<String>, node: NodeId) -> Result<()> {
        if !self.contains(node) {
            return Err(CoreError::UnknownNode(node.to_string()));
        }
        let name = name.into();
        match self.outputs.iter_mut().find(|o| o.name == name) {
            Some(port) => port.node = node,
            None => self.outputs.push(OutputPort { name, node }),
        }
        Ok(())
    }

    /// Replace the input edges of a node
    pub fn set_inputs(&mut self, id: NodeId, inputs: Vec<NodeId>) -> Result<()> {
        self.check_present(&inputs)?;
        let node = self
            .node_mut(id)
            .ok_or_else(|| CoreError::UnknownNode(id.to_string()))?;
        if node.is_input() && !inputs.is_empty() {
            return Err(CoreError::InvalidOperation(format!(
                "input {id} cannot take input edges"
            )));
        }
        node.inputs = inputs;
        Ok(())
    }

    /// Point every edge `old -> c` at `new` instead, skipping consumer `except`
    ///
    /// Returns the number of rewired edges.
    pub fn replace_uses(&mut self, old: NodeId, new: NodeId, except: Option<NodeId>) -> Result<usize> {
        self.check_present(&[new])?;
        let mut rewired = 0;
        for node in self.nodes.iter_mut() {
            if Some(node.id) == except {
                continue;
            }
            for input in node.inputs.iter_mut() {
                if *input == old {
                    *input = new;
                    rewired += 1;
                }
            }
        }
        Ok(rewired)
    }

    /// Remove a node nothing depends on
    pub fn remove_node(&mut self, id: NodeId) -> Result<IrNode> {
        let pos = self
            .position(id)
            .ok_or_else(|| CoreError::UnknownNode(id.to_string()))?;
        if self.inputs.contains(&id) {
            return Err(CoreError::InvalidOperation(format!(
                "{id} is a declared input"
            )));
        }
        if self.is_output(id) {
            return Err(CoreError::InvalidOperation(format!(
                "{id} is a designated output"
            )));
        }
        if let Some(consumer) = self.consumers(id).first() {
            return Err(CoreError::InvalidOperation(format!(
                "{id} is still consumed by {consumer}"
            )));
        }
        Ok(self.nodes.remove(pos))
    }

    // ----- analysis -----

    /// Edges whose source node is missing, as (consumer, missing input)
    pub fn dangling_edges(&self) -> Vec<(NodeId, NodeId)> {
        let mut dangling = Vec::new();
        for node in &self.nodes {
            for input in &node.inputs {
                if !self.contains(*input) {
                    dangling.push((node.id, *input));
                }
            }
        }
        dangling
    }

    /// Topological order, smallest id first among ready nodes
    ///
    /// On a cycle returns the nodes that could not be ordered. Edges to
    /// missing nodes are ignored.
    pub fn topo_order(&self) -> std::result::Result<Vec<NodeId>, Vec<NodeId>> {
        let mut indegree: BTreeMap<NodeId, usize> = BTreeMap::new();
        let mut consumers: BTreeMap<NodeId, Vec<NodeId>> = BTreeMap::new();
        for node in &self.nodes {
            let present: Vec<NodeId> = node
                .inputs
                .iter()
                .copied()
                .filter(|i| self.contains(*i))
                .collect();
            indegree.insert(node.id, present.len());
            for input in present {
                consumers.entry(input).or_default().push(node.id);
            }
        }

        let mut ready: BTreeSet<NodeId> = indegree
            .iter()
            .filter(|(_, d)| **d == 0)
            .map(|(id, _)| *id)
            .collect();
        let mut order = Vec::with_capacity(self.nodes.len());

        while let Some(id) = ready.pop_first() {
            order.push(id);
            for consumer in consumers.get(&id).into_iter().flatten() {
                if let Some(d) = indegree.get_mut(consumer) {
                    *d -= 1;
                    if *d == 0 {
                        ready.insert(*consumer);
                    }
                }
            }
        }

        if order.len() == self.nodes.len() {
            Ok(order)
        } else {
            let ordered: BTreeSet<NodeId> = order.into_iter().collect();
            Err(self
                .nodes
                .iter()
                .map(|n| n.id)
                .filter(|id| !ordered.contains(id))
                .collect())
        }
    }

    pub fn is_acyclic(&self) -> bool {
        self.topo_order().is_ok()
    }

    /// Longest-path depth of every node from the sources
    pub fn depths(&self) -> Result<BTreeMap<NodeId, usize>> {
        let order = self.topo_order().map_err(|stuck| {
            CoreError::InvalidOperation(format!("graph has a cycle through {}", stuck[0]))
        })?;
        let mut depth = BTreeMap::new();
        for id in order {
            let Some(node) = self.node(id) else { continue };
            let d = node
                .inputs
                .iter()
                .filter_map(|i| depth.get(i).copied())
                .map(|d: usize| d + 1)
                .max()
                .unwrap_or(0);
            depth.insert(id, d);
        }
        Ok(depth)
    }

    /// Every node `id` transitively depends on, excluding itself
    pub fn ancestors(&self, id: NodeId) -> BTreeSet<NodeId> {
        let mut seen = BTreeSet::new();
        let mut queue: VecDeque<NodeId> = VecDeque::new();
        if let Some(node) = self.node(id) {
            queue.extend(node.inputs.iter().copied());
        }
        while let Some(next) = queue.pop_front() {
            if !seen.insert(next) {
                continue;
            }
            if let Some(node) = self.node(next) {
                queue.extend(node.inputs.iter().copied());
            }
        }
        seen
    }

    /// Whether a path `from -> ... -> to` exists
    pub fn reaches(&self, from: NodeId, to: NodeId) -> bool {
        from != to && self.ancestors(to).contains(&from)
    }

    /// Whether `id` depends on at least one declared input
    pub fn depends_on_input(&self, id: NodeId) -> bool {
        if self.inputs.contains(&id) {
            return true;
        }
        let ancestors = self.ancestors(id);
        self.inputs.iter().any(|i| ancestors.contains(i))
    }

    /// Human-readable listing of the graph
    pub fn dump(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for IrGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "graph {} {{", self.name)?;
        for node in &self.nodes {
            let inputs: Vec<String> = node.inputs.iter().map(|i| i.to_string()).collect();
            write!(
                f,
                "  {} = {}({}) : {}",
                node.id,
                node.kind.label(),
                inputs.join(", "),
                node.ty
            )?;
            if let Some(name) = &node.name {
                write!(f, "  // {name}")?;
            }
            writeln!(f)?;
        }
        for port in &self.outputs {
            writeln!(f, "  output {} <- {}", port.name, port.node)?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diamond() -> (IrGraph, [NodeId; 4]) {
        let mut graph = IrGraph::new("diamond");
        let a = graph.add_input("a", ValueType::wave(4));
        let l = graph
            .add_operation(OpKind::Split, vec![a], ValueType::wave(4))
            .unwrap();
        let r = graph
            .add_operation(OpKind::Fourier, vec![a], ValueType::wave(4))
            .unwrap();
        let j = graph
            .add_operation(OpKind::Interfere, vec![l, r], ValueType::wave(4))
            .unwrap();
        graph.designate_output("y", j).unwrap();
        (graph, [a, l, r, j])
    }

    #[test]
    fn test_ids_are_insertion_ordered() {
        let (graph, ids) = diamond();
        assert_eq!(graph.node_ids(), ids.to_vec());
        assert_eq!(graph.summary().nodes, 4);
        assert_eq!(graph.summary().edges, 4);
        assert_eq!(graph.summary().operations, 3);
    }

    #[test]
    fn test_forward_reference_rejected() {
        let mut graph = IrGraph::new("g");
        let err = graph
            .add_operation(OpKind::Split, vec![NodeId(7)], ValueType::scalar())
            .unwrap_err();
        assert!(matches!(err, CoreError::UnknownNode(_)));
    }

    #[test]
    fn test_topo_order_and_depths() {
        let (graph, [a, l, r, j]) = diamond();
        assert_eq!(graph.topo_order().unwrap(), vec![a, l, r, j]);

        let depths = graph.depths().unwrap();
        assert_eq!(depths[&a], 0);
        assert_eq!(depths[&l], 1);
        assert_eq!(depths[&r], 1);
        assert_eq!(depths[&j], 2);
    }

    #[test]
    fn test_cycle_detected() {
        let (mut graph, [_, l, r, _]) = diamond();
        graph.set_inputs(l, vec![r]).unwrap();
        graph.set_inputs(r, vec![l]).unwrap();

        let stuck = graph.topo_order().unwrap_err();
        assert!(stuck.contains(&l));
        assert!(stuck.contains(&r));
        assert!(!graph.is_acyclic());
    }

    #[test]
    fn test_reachability() {
        let (graph, [a, l, r, j]) = diamond();
        assert!(graph.reaches(a, j));
        assert!(!graph.reaches(l, r));
        assert!(!graph.reaches(j, a));
        assert!(graph.depends_on_input(j));
    }

    #[test]
    fn test_remove_node_requires_dead_node() {
        let (mut graph, [a, l, _, j]) = diamond();
        assert!(graph.remove_node(l).is_err());
        assert!(graph.remove_node(j).is_err());
        assert!(graph.remove_node(a).is_err());

        let extra = graph
            .add_operation(OpKind::Measure, vec![a], ValueType::wave(4))
            .unwrap();
        let removed = graph.remove_node(extra).unwrap();
        assert_eq!(removed.id, extra);
        assert!(!graph.contains(extra));
    }

    #[test]
    fn test_replace_uses_skips_exception() {
        let (mut graph, [a, l, r, j]) = diamond();
        let rewired = graph.replace_uses(r, l, None).unwrap();
        assert_eq!(rewired, 1);
        assert_eq!(graph.node(j).unwrap().inputs, vec![l, l]);
        assert_eq!(graph.consumers(r), Vec::<NodeId>::new());
        assert_eq!(graph.consumers(a), vec![l, r]);
    }

    #[test]
    fn test_designate_output_replaces_by_name() {
        let (mut graph, [_, l, _, j]) = diamond();
        graph.designate_output("y", l).unwrap();
        assert_eq!(graph.outputs().len(), 1);
        assert_eq!(graph.output("y"), Some(l));
        assert!(!graph.is_output(j));
    }

    #[test]
    fn test_graph_serde_roundtrip() {
        let (graph, _) = diamond();
        let json = serde_json::to_string(&graph).unwrap();
        let back: IrGraph = serde_json::from_str(&json).unwrap();
        assert_eq!(back, graph);
    }
}
