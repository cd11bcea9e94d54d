//! Error-correction pass
//!
//! Wraps every operation that carries a correction requirement between an
//! encode and a decode of the required code family:
//!
//! ```text
//!   before:  x, y -> op
//!   after:   x, y -> encode -> op' -> decode
//! ```
//!
//! The decode takes over the original node id, so consumers and output
//! designations keep pointing at the same node. Wrapped nodes are marked
//! `ec.wrapped` and never wrapped twice.

use super::{Capabilities, Pass, PassContext};
use crate::error::{CompileError, Result};
use qwave_core::ir::{AttrValue, Budget};
use qwave_core::{IrGraph, NodeId, NodeKind, OpKind, OperationRegistry};

pub const WRAPPED_ATTR: &str = "ec.wrapped";

/// Code families the pass can build encoders for
pub const SUPPORTED_CODES: [&str; 5] = ["repetition", "surface", "steane", "shor", "color"];

pub struct ErrorCorrectionPass;

impl Pass for ErrorCorrectionPass {
    fn name(&self) -> &'static str {
        "error_correction"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::attributes_only().with_insert().with_rewire()
    }

    fn run(&self, graph: &mut IrGraph, ctx: &mut PassContext<'_>) -> Result<bool> {
        let targets: Vec<NodeId> = graph
            .nodes()
            .filter(|n| !n.attrs.correction.is_none() && !n.attrs.has_flag(WRAPPED_ATTR))
            .filter(|n| {
                n.op()
                    .and_then(|op| ctx.registry.spec_of(op))
                    .is_some_and(|spec| !spec.internal)
            })
            .map(|n| n.id)
            .collect();

        for id in &targets {
            wrap(graph, *id, ctx.registry)?;
        }
        Ok(!targets.is_empty())
    }
}

fn wrap(graph: &mut IrGraph, id: NodeId, registry: &OperationRegistry) -> Result<()> {
    let Some(original) = graph.node(id).cloned() else {
        return Ok(());
    };
    let correction = original.attrs.correction.clone();
    let (Some(code), Some(distance)) = (correction.code(), correction.distance()) else {
        return Ok(());
    };
    if !SUPPORTED_CODES.contains(&code) {
        return Err(CompileError::UnsupportedCode {
            node: id,
            code: code.to_string(),
        });
    }

    let thermal_of = |kind: &OpKind| {
        registry
            .spec_of(kind)
            .map(|spec| Budget::Bounded(spec.thermal_load))
            .unwrap_or_default()
    };
    let encode_kind = OpKind::Encode {
        code: code.to_string(),
        distance,
    };
    let decode_kind = OpKind::Decode {
        code: code.to_string(),
        distance,
    };

    let operand_types: Vec<_> = original
        .inputs
        .iter()
        .filter_map(|input| graph.node(*input).map(|n| n.ty.clone()))
        .collect();
    let encode_ty = registry
        .spec_of(&encode_kind)
        .and_then(|spec| spec.result_type(&operand_types).ok())
        .unwrap_or_else(|| original.ty.clone());
    let encode_thermal = thermal_of(&encode_kind);
    let encode = graph.add_operation(encode_kind, original.inputs.clone(), encode_ty)?;
    if let Some(node) = graph.node_mut(encode) {
        node.attrs = original.attrs.clone();
        node.attrs.thermal = encode_thermal;
        node.attrs.mark(WRAPPED_ATTR, AttrValue::Flag(true));
    }

    let mut core = original.clone();
    core.name = None;
    core.attrs.mark(WRAPPED_ATTR, AttrValue::Flag(true));
    let core = graph.insert_like(&core, vec![encode])?;

    let decode_thermal = thermal_of(&decode_kind);
    graph.set_inputs(id, vec![core])?;
    if let Some(node) = graph.node_mut(id) {
        node.kind = NodeKind::Operation(decode_kind);
        node.params.clear();
        node.attrs.thermal = decode_thermal;
        node.attrs.mark(WRAPPED_ATTR, AttrValue::Flag(true));
    }
    tracing::trace!("Wrapped {} in {}-{} code", id, code, distance);
    Ok(())
}
