//! Execution scheduler
//!
//! Turns the optimized graph into a linear order that respects every
//! dependency. Among ready nodes the tightest coherence budget goes first,
//! ties broken by node id, so equal graphs always give equal schedules.
//! Parallel hints are honored when possible: a group whose members are all
//! ready is emitted as one contiguous run.

use crate::error::{CompileError, Result};
use qwave_core::ir::{Budget, GroupId, ParallelGroup, ParallelHints};
use qwave_core::{IrGraph, NodeId};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

/// One scheduled node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleStep {
    pub node: NodeId,
    /// Parallel group the node was emitted with
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<GroupId>,
}

/// Linear execution order
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Schedule {
    pub steps: Vec<ScheduleStep>,
    /// Groups that were emitted intact
    #[serde(default)]
    pub groups: Vec<ParallelGroup>,
}

impl Schedule {
    /// Node ids in execution order
    pub fn order(&self) -> Vec<NodeId> {
        self.steps.iter().map(|s| s.node).collect()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn position(&self, node: NodeId) -> Option<usize> {
        self.steps.iter().position(|s| s.node == node)
    }

    /// Check the schedule against the graph it was made for
    ///
    /// Every node appears exactly once, every input comes before its
    /// consumer, and every emitted group is contiguous.
    pub fn verify(&self, graph: &IrGraph) -> Result<()> {
        let mut positions: BTreeMap<NodeId, usize> = BTreeMap::new();
        for (index, step) in self.steps.iter().enumerate() {
            if !graph.contains(step.node) {
                return Err(CompileError::InvalidSchedule(format!(
                    "{} is not in the graph",
                    step.node
                )));
            }
            if positions.insert(step.node, index).is_some() {
                return Err(CompileError::InvalidSchedule(format!(
                    "{} is scheduled twice",
                    step.node
                )));
            }
        }
        if let Some(missing) = graph.nodes().find(|n| !positions.contains_key(&n.id)) {
            return Err(CompileError::InvalidSchedule(format!(
                "{} is never scheduled",
                missing.id
            )));
        }

        for node in graph.nodes() {
            for input in &node.inputs {
                if positions.get(input) >= positions.get(&node.id) {
                    return Err(CompileError::InvalidSchedule(format!(
                        "{} runs before its input {}",
                        node.id, input
                    )));
                }
            }
        }

        for group in &self.groups {
            let mut indices: Vec<usize> = group
                .members
                .iter()
                .filter_map(|m| positions.get(m).copied())
                .collect();
            indices.sort_unstable();
            let contiguous = indices.windows(2).all(|w| w[1] == w[0] + 1);
            if indices.len() != group.members.len() || !contiguous {
                return Err(CompileError::InvalidSchedule(format!(
                    "group {} is not contiguous",
                    group.id
                )));
            }
        }
        Ok(())
    }
}

/// Schedule every node of `graph`
pub fn schedule(graph: &IrGraph) -> Result<Schedule> {
    let mut pending_groups = sanitize_hints(graph, graph.hints());
    let coherence: BTreeMap<NodeId, Budget> = graph
        .nodes()
        .map(|n| (n.id, n.attrs.coherence))
        .collect();
    let by_priority = |a: &NodeId, b: &NodeId| -> Ordering {
        coherence[a].compare(&coherence[b]).then(a.cmp(b))
    };

    // Kahn's algorithm; multi-edges count once per occurrence
    let mut indegree: BTreeMap<NodeId, usize> = BTreeMap::new();
    let mut consumers: BTreeMap<NodeId, Vec<NodeId>> = BTreeMap::new();
    for node in graph.nodes() {
        indegree.insert(node.id, node.inputs.len());
        for input in &node.inputs {
            consumers.entry(*input).or_default().push(node.id);
        }
    }
    let mut ready: BTreeSet<NodeId> = indegree
        .iter()
        .filter(|(_, d)| **d == 0)
        .map(|(id, _)| *id)
        .collect();

    let mut steps = Vec::with_capacity(graph.node_count());
    let mut emitted_groups = Vec::new();
    let mut emit = |id: NodeId,
                    group: Option<GroupId>,
                    ready: &mut BTreeSet<NodeId>,
                    steps: &mut Vec<ScheduleStep>| {
        ready.remove(&id);
        steps.push(ScheduleStep { node: id, group });
        for consumer in consumers.get(&id).into_iter().flatten() {
            if let Some(d) = indegree.get_mut(consumer) {
                *d -= 1;
                if *d == 0 {
                    ready.insert(*consumer);
                }
            }
        }
    };

    while !ready.is_empty() {
        // A group is emitted once all its members are ready at the same time
        let full_group = pending_groups
            .iter()
            .enumerate()
            .filter(|(_, g)| g.members.iter().all(|m| ready.contains(m)))
            .min_by(|(_, x), (_, y)| {
                let key = |g: &ParallelGroup| g.members.iter().copied().min_by(by_priority);
                match (key(x), key(y)) {
                    (Some(a), Some(b)) => by_priority(&a, &b),
                    _ => Ordering::Equal,
                }
            })
            .map(|(index, _)| index);

        if let Some(index) = full_group {
            let group = pending_groups.remove(index);
            let mut members = group.members.clone();
            members.sort_by(by_priority);
            for member in members {
                emit(member, Some(group.id), &mut ready, &mut steps);
            }
            emitted_groups.push(group);
            continue;
        }

        // Otherwise the best ready node outside any pending group
        let grouped: BTreeSet<NodeId> = pending_groups
            .iter()
            .flat_map(|g| g.members.iter().copied())
            .collect();
        let single = ready
            .iter()
            .copied()
            .filter(|id| !grouped.contains(id))
            .min_by(by_priority);
        if let Some(id) = single {
            emit(id, None, &mut ready, &mut steps);
            continue;
        }

        // Only partially-ready groups are left; give up the one holding the best node
        let Some(id) = ready.iter().copied().min_by(by_priority) else {
            break;
        };
        pending_groups.retain(|g| !g.members.contains(&id));
        tracing::trace!("Dissolved parallel group holding {}", id);
        emit(id, None, &mut ready, &mut steps);
    }

    if steps.len() < graph.node_count() {
        let scheduled: BTreeSet<NodeId> = steps.iter().map(|s| s.node).collect();
        return Err(CompileError::CyclicDependency {
            nodes: graph
                .node_ids()
                .into_iter()
                .filter(|id| !scheduled.contains(id))
                .collect(),
        });
    }

    tracing::debug!(
        "Scheduled {} nodes in {} parallel groups",
        steps.len(),
        emitted_groups.len()
    );
    Ok(Schedule {
        steps,
        groups: emitted_groups,
    })
}

/// Hints the scheduler can honor
///
/// Drops groups naming missing nodes, groups with a path between two
/// members, and groups overlapping an earlier group.
fn sanitize_hints(graph: &IrGraph, hints: &ParallelHints) -> Vec<ParallelGroup> {
    let mut claimed: BTreeSet<NodeId> = BTreeSet::new();
    let mut groups = Vec::new();
    for group in hints.groups() {
        let present = group.members.iter().all(|m| graph.contains(*m));
        let antichain = present
            && group.members.iter().all(|a| {
                let ancestors = graph.ancestors(*a);
                group.members.iter().all(|b| !ancestors.contains(b))
            });
        let disjoint = group.members.iter().all(|m| !claimed.contains(m));
        if present && antichain && disjoint {
            claimed.extend(group.members.iter().copied());
            groups.push(group.clone());
        } else {
            tracing::trace!("Ignoring parallel group {}", group.id);
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use qwave_core::{OpKind, ValueType};

    fn wide() -> (IrGraph, [NodeId; 5]) {
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
        (graph, [a, b, sa, sb, m])
    }

    #[test]
    fn test_schedule_respects_edges() {
        let (graph, [a, b, sa, sb, m]) = wide();
        let schedule = schedule(&graph).unwrap();
        assert_eq!(schedule.order(), vec![a, b, sa, sb, m]);
        schedule.verify(&graph).unwrap();
    }

    #[test]
    fn test_tighter_coherence_goes_first() {
        let (mut graph, [a, b, sa, sb, m]) = wide();
        graph.node_mut(sb).unwrap().attrs.coherence = Budget::Bounded(1.0);
        graph.node_mut(b).unwrap().attrs.coherence = Budget::Bounded(1.0);

        let schedule = schedule(&graph).unwrap();
        assert_eq!(schedule.order(), vec![b, sb, a, sa, m]);
    }

    #[test]
    fn test_group_is_emitted_contiguously() {
        let (mut graph, [_, _, sa, sb, _]) = wide();
        let mut hints = ParallelHints::new();
        hints.add_group(vec![sa, sb]);
        graph.set_hints(hints);

        let schedule = schedule(&graph).unwrap();
        schedule.verify(&graph).unwrap();
        assert_eq!(schedule.groups.len(), 1);
        let index = schedule.position(sa).unwrap();
        assert_eq!(schedule.steps[index + 1].node, sb);
        assert_eq!(schedule.steps[index].group, Some(GroupId(0)));
    }

    #[test]
    fn test_invalid_group_is_ignored() {
        let (mut graph, [a, _, sa, _, m]) = wide();
        let mut hints = ParallelHints::new();
        hints.add_group(vec![sa, m]);
        hints.add_group(vec![a, NodeId(99)]);
        graph.set_hints(hints);

        let schedule = schedule(&graph).unwrap();
        assert!(schedule.groups.is_empty());
        schedule.verify(&graph).unwrap();
    }

    #[test]
    fn test_cycle_is_reported() {
        let (mut graph, [_, _, sa, _, m]) = wide();
        graph.set_inputs(sa, vec![m]).unwrap();
        let err = schedule(&graph).unwrap_err();
        assert!(matches!(err, CompileError::CyclicDependency { .. }));
    }

    #[test]
    fn test_verify_rejects_reordered_schedule() {
        let (graph, _) = wide();
        let mut schedule = schedule(&graph).unwrap();
        schedule.steps.reverse();
        assert!(schedule.verify(&graph).is_err());
    }
}
