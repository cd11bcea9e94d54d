//! Thermal pass
//!
//! Splits operations whose thermal load is above the ceiling into parts that
//! each stay under it, joined back into the original node. Atomic operations
//! and loads that would need more than [`MAX_THERMAL_PARTS`] parts are not
//! split and only get a warning.

use super::{Capabilities, Pass, PassContext};
use crate::error::Result;
use qwave_core::ir::{AttrValue, Budget};
use qwave_core::{Diagnostic, DiagnosticKind, IrGraph, NodeId, NodeKind, OpKind, Stage};

pub const PART_ATTR: &str = "thermal.part";
pub const DECOMPOSED_ATTR: &str = "thermal.decomposed";
pub const WARNED_ATTR: &str = "thermal.warned";

/// Most parts one node is split into; hotter nodes are left whole with a warning
pub const MAX_THERMAL_PARTS: usize = 64;

pub struct ThermalPass;

impl Pass for ThermalPass {
    fn name(&self) -> &'static str {
        "thermal"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::attributes_only().with_insert().with_rewire()
    }

    fn run(&self, graph: &mut IrGraph, ctx: &mut PassContext<'_>) -> Result<bool> {
        let Some(ceiling) = ctx.thermal_ceiling else {
            return Ok(false);
        };

        let registry = ctx.registry;
        let mut changed = false;
        for id in graph.node_ids() {
            let Some(node) = graph.node(id) else { continue };
            let Some(spec) = node.op().and_then(|op| registry.spec_of(op)) else {
                continue;
            };
            let Some(load) = node.attrs.thermal.amount() else {
                continue;
            };
            if load <= ceiling
                || node.attrs.has_flag(PART_ATTR)
                || node.attrs.get(DECOMPOSED_ATTR).is_some()
            {
                continue;
            }

            let ratio = (load / ceiling).ceil();
            let splittable = !spec.atomic && ratio <= MAX_THERMAL_PARTS as f64;
            if splittable {
                decompose(graph, id, ratio as usize, ctx)?;
            } else {
                if node.attrs.has_flag(WARNED_ATTR) {
                    continue;
                }
                let subject = if spec.atomic {
                    format!("atomic {}", node.display_name())
                } else {
                    format!("{} (over {} parts)", node.display_name(), MAX_THERMAL_PARTS)
                };
                ctx.report(
                    Diagnostic::warning(
                        Stage::Optimize,
                        DiagnosticKind::BudgetExceeded,
                        format!(
                            "{} has thermal load {} above the ceiling {}",
                            subject,
                            load,
                            ceiling
                        ),
                    )
                    .with_node(id),
                );
                if let Some(node) = graph.node_mut(id) {
                    node.attrs.mark(WARNED_ATTR, AttrValue::Flag(true));
                }
            }
            changed = true;
        }
        Ok(changed)
    }
}

/// Replace `id` by `parts` copies each carrying an equal share of the load
fn decompose(graph: &mut IrGraph, id: NodeId, parts: usize, ctx: &PassContext<'_>) -> Result<()> {
    let Some(original) = graph.node(id).cloned() else {
        return Ok(());
    };
    let load = original.attrs.thermal.amount().unwrap_or(0.0);

    let mut template = original.clone();
    template.name = None;
    template.attrs.thermal = Budget::Bounded(load / parts as f64);
    template.attrs.mark(PART_ATTR, AttrValue::Flag(true));

    let mut part_ids = Vec::with_capacity(parts);
    for _ in 0..parts {
        part_ids.push(graph.insert_like(&template, original.inputs.clone())?);
    }

    let join_load = ctx
        .registry
        .spec_of(&OpKind::Join)
        .map(|spec| spec.thermal_load)
        .unwrap_or(0.0);
    graph.set_inputs(id, part_ids)?;
    if let Some(node) = graph.node_mut(id) {
        node.kind = NodeKind::Operation(OpKind::Join);
        node.params.clear();
        node.attrs.thermal = Budget::Bounded(join_load);
        node.attrs.mark(DECOMPOSED_ATTR, AttrValue::Number(parts as f64));
    }
    tracing::debug!("Split {} into {} parts under ceiling", id, parts);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use qwave_core::{OperationRegistry, ValueType};

    fn graph_with_load(op: OpKind, load: f64) -> (IrGraph, NodeId) {
        let mut graph = IrGraph::new("hot");
        let a = graph.add_input("a", ValueType::wave(4));
        let n = graph.add_operation(op, vec![a], ValueType::wave(4)).unwrap();
        graph.node_mut(n).unwrap().attrs.thermal = Budget::Bounded(load);
        graph.designate_output("y", n).unwrap();
        (graph, n)
    }

    #[test]
    fn test_no_ceiling_is_noop() {
        let registry = OperationRegistry::default();
        let (mut graph, _) = graph_with_load(OpKind::Fourier, 4.0);
        let before = graph.clone();
        let mut ctx = PassContext::new(&registry);
        assert!(!ThermalPass.run(&mut graph, &mut ctx).unwrap());
        assert_eq!(graph, before);
    }

    #[test]
    fn test_hot_node_is_split() {
        let registry = OperationRegistry::default();
        let (mut graph, n) = graph_with_load(OpKind::Fourier, 4.0);
        let mut ctx = PassContext::new(&registry).with_thermal_ceiling(Some(1.5));
        assert!(ThermalPass.run(&mut graph, &mut ctx).unwrap());

        let join = graph.node(n).unwrap();
        assert_eq!(join.op(), Some(&OpKind::Join));
        assert_eq!(join.inputs.len(), 3);
        assert_eq!(join.attrs.get(DECOMPOSED_ATTR), Some(&AttrValue::Number(3.0)));
        for part in &join.inputs {
            let part = graph.node(*part).unwrap();
            assert_eq!(part.op(), Some(&OpKind::Fourier));
            assert!(part.attrs.thermal.amount().unwrap() <= 1.5);
        }
        assert_eq!(graph.output("y"), Some(n));

        // Already decomposed
        assert!(!ThermalPass.run(&mut graph, &mut ctx).unwrap());
    }

    #[test]
    fn test_atomic_node_warns_once() {
        let registry = OperationRegistry::default();
        let (mut graph, n) = graph_with_load(OpKind::Measure, 3.0);
        let mut ctx = PassContext::new(&registry).with_thermal_ceiling(Some(1.0));

        assert!(ThermalPass.run(&mut graph, &mut ctx).unwrap());
        assert!(!ThermalPass.run(&mut graph, &mut ctx).unwrap());
        assert_eq!(ctx.reported().len(), 1);
        assert_eq!(graph.node(n).unwrap().op(), Some(&OpKind::Measure));
    }

    #[test]
    fn test_overload_beyond_part_limit_is_left_whole() {
        let registry = OperationRegistry::default();
        let (mut graph, n) = graph_with_load(OpKind::Split, 1e30);
        let before = graph.node_count();
        let mut ctx = PassContext::new(&registry).with_thermal_ceiling(Some(1.0));

        assert!(ThermalPass.run(&mut graph, &mut ctx).unwrap());
        assert!(!ThermalPass.run(&mut graph, &mut ctx).unwrap());
        assert_eq!(graph.node_count(), before);
        assert_eq!(graph.node(n).unwrap().op(), Some(&OpKind::Split));
        assert_eq!(ctx.reported().len(), 1);
        assert_eq!(ctx.reported()[0].kind, DiagnosticKind::BudgetExceeded);
    }

    #[test]
    fn test_split_at_part_limit() {
        let registry = OperationRegistry::default();
        let (mut graph, n) = graph_with_load(OpKind::Split, MAX_THERMAL_PARTS as f64);
        let mut ctx = PassContext::new(&registry).with_thermal_ceiling(Some(1.0));

        assert!(ThermalPass.run(&mut graph, &mut ctx).unwrap());
        assert_eq!(graph.node(n).unwrap().inputs.len(), MAX_THERMAL_PARTS);
        assert!(ctx.reported().is_empty());
    }
}
