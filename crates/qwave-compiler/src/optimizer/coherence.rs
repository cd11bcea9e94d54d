//! Coherence pass
//!
//! Merges duplicate computations (thermal parts are duplicates on purpose
//! and are left alone), then records for every node the coherence
//! consumed along its longest input path (`coherence.path`). A node whose
//! path goes over its bounded coherence budget gets a warning.
//!
//! The pass never reorders nodes. Ordering by coherence is left to the
//! scheduler, which breaks ties between ready nodes tighter budget first.

use super::thermal::PART_ATTR;
use super::{Capabilities, Pass, PassContext};
use crate::error::Result;
use qwave_core::ir::AttrValue;
use qwave_core::{Diagnostic, DiagnosticKind, IrGraph, IrNode, NodeId, Stage};
use std::collections::BTreeMap;

pub const PATH_ATTR: &str = "coherence.path";

pub struct CoherencePass;

impl Pass for CoherencePass {
    fn name(&self) -> &'static str {
        "coherence"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::attributes_only().with_remove().with_rewire()
    }

    fn run(&self, graph: &mut IrGraph, ctx: &mut PassContext<'_>) -> Result<bool> {
        let merged = merge_duplicates(graph, ctx)?;
        let updated = accumulate_paths(graph, ctx);
        Ok(merged > 0 || updated)
    }
}

/// Two operation nodes compute the same value
fn is_duplicate(keep: &IrNode, other: &IrNode) -> bool {
    keep.kind == other.kind
        && keep.inputs == other.inputs
        && keep.params == other.params
        && keep.ty == other.ty
        && keep.attrs == other.attrs
}

fn merge_duplicates(graph: &mut IrGraph, ctx: &PassContext<'_>) -> Result<usize> {
    let candidates: Vec<NodeId> = graph
        .nodes()
        .filter(|n| !n.inputs.is_empty() && !n.attrs.has_flag(PART_ATTR))
        .filter(|n| {
            n.op()
                .and_then(|op| ctx.registry.spec_of(op))
                .is_some_and(|spec| !spec.side_effecting)
        })
        .map(|n| n.id)
        .collect();

    let mut kept: Vec<NodeId> = Vec::new();
    let mut merged = 0;
    for id in candidates {
        if graph.is_output(id) {
            kept.push(id);
            continue;
        }
        let Some(node) = graph.node(id) else { continue };
        let original = kept
            .iter()
            .copied()
            .find(|k| graph.node(*k).is_some_and(|keep| is_duplicate(keep, node)));
        match original {
            Some(original) => {
                graph.replace_uses(id, original, None)?;
                graph.remove_node(id)?;
                tracing::trace!("Merged {} into {}", id, original);
                merged += 1;
            }
            None => kept.push(id),
        }
    }
    Ok(merged)
}

fn accumulate_paths(graph: &mut IrGraph, ctx: &mut PassContext<'_>) -> bool {
    let Ok(order) = graph.topo_order() else {
        return false;
    };
    let mut paths: BTreeMap<NodeId, f64> = BTreeMap::new();
    let mut changed = false;

    for id in order {
        let Some(node) = graph.node(id) else { continue };
        let cost = node
            .op()
            .and_then(|op| ctx.registry.spec_of(op))
            .map(|spec| spec.coherence_cost)
            .unwrap_or(0.0);
        let upstream = node
            .inputs
            .iter()
            .filter_map(|input| paths.get(input))
            .fold(0.0_f64, |acc, p| acc.max(*p));
        let path = upstream + cost;
        paths.insert(id, path);

        let previous = match node.attrs.get(PATH_ATTR) {
            Some(AttrValue::Number(p)) => Some(*p),
            _ => None,
        };
        if previous == Some(path) {
            continue;
        }
        changed = true;
        if node.attrs.coherence.is_exceeded_by(path) {
            ctx.report(
                Diagnostic::warning(
                    Stage::Optimize,
                    DiagnosticKind::BudgetExceeded,
                    format!(
                        "{} needs coherence {} but its budget is {}",
                        node.display_name(),
                        path,
                        node.attrs.coherence
                    ),
                )
                .with_node(id),
            );
        }
        if let Some(node) = graph.node_mut(id) {
            node.attrs.mark(PATH_ATTR, AttrValue::Number(path));
        }
    }
    changed
}
