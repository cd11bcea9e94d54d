//! Performance pass
//!
//! Groups operations at the same dependency depth into parallel hints. Two
//! nodes at equal depth can never reach each other, so every group is an
//! antichain. Hints are rebuilt from scratch on each run.

use super::{Capabilities, Pass, PassContext};
use crate::error::Result;
use qwave_core::ir::ParallelHints;
use qwave_core::{IrGraph, NodeId};
use std::collections::BTreeMap;

pub struct PerformancePass;

impl Pass for PerformancePass {
    fn name(&self) -> &'static str {
        "performance"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::attributes_only()
    }

    fn run(&self, graph: &mut IrGraph, _ctx: &mut PassContext<'_>) -> Result<bool> {
        let hints = parallel_levels(graph)?;
        if &hints == graph.hints() {
            return Ok(false);
        }
        tracing::debug!("Found {} parallel groups", hints.len());
        graph.set_hints(hints);
        Ok(true)
    }
}

/// Operations grouped by depth; levels with a single operation are skipped
pub fn parallel_levels(graph: &IrGraph) -> Result<ParallelHints> {
    let depths = graph.depths()?;
    let mut levels: BTreeMap<usize, Vec<NodeId>> = BTreeMap::new();
    for node in graph.nodes().filter(|n| n.is_operation()) {
        if let Some(depth) = depths.get(&node.id) {
            levels.entry(*depth).or_default().push(node.id);
        }
    }

    let mut hints = ParallelHints::new();
    for members in levels.into_values() {
        hints.add_group(members);
    }
    Ok(hints)
}

#[cfg(test)]
mod tests {
    use super::*;
    use qwave_core::{OpKind, OperationRegistry, ValueType};

    #[test]
    fn test_independent_operations_share_a_group() {
        let registry = OperationRegistry::default();
        let mut graph = IrGraph::new("wide");
        let a = graph.add_input("a", ValueType::wave(2));
        let b = graph.add_input("b", ValueType::wave(2));
        let sa = graph
            .add_operation(OpKind::Split, vec![a], ValueType::wave(2))
            .unwrap();
        let sb = graph
            .add_operation(OpKind::Split, vec![b], ValueType::wave(2))
            .unwrap();
        let m = graph
            .add_operation(OpKind::Merge, vec![sa, sb], ValueType::wave(2))
            .unwrap();
        graph.designate_output("y", m).unwrap();

        let mut ctx = PassContext::new(&registry);
        assert!(PerformancePass.run(&mut graph, &mut ctx).unwrap());
        assert_eq!(graph.hints().len(), 1);
        assert_eq!(graph.hints().groups()[0].members, vec![sa, sb]);
        assert!(!graph.reaches(sa, sb) && !graph.reaches(sb, sa));

        assert!(!PerformancePass.run(&mut graph, &mut ctx).unwrap());
    }
}
