//! IR nodes

use super::attributes::NodeAttributes;
use super::op::OpKind;
use crate::types::{Literal, ValueType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Stable unique identifier of a node; never reused within a graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// What a node is
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// Declared program input
    Input,
    /// Hoisted numeric literal
    Constant { value: f64 },
    /// Operation call
    Operation(OpKind),
}

impl NodeKind {
    pub fn op(&self) -> Option<&OpKind> {
        match self {
            NodeKind::Operation(op) => Some(op),
            _ => None,
        }
    }

    pub fn label(&self) -> String {
        match self {
            NodeKind::Input => "input".to_string(),
            NodeKind::Constant { value } => format!("const({value})"),
            NodeKind::Operation(op) => op.to_string(),
        }
    }
}

/// A node of the IR graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IrNode {
    pub id: NodeId,

    /// Source binding name, if the node's value was bound to one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    pub kind: NodeKind,

    /// Ordered input edges
    #[serde(default)]
    pub inputs: Vec<NodeId>,

    /// Result type
    pub ty: ValueType,

    /// Literal attribute parameters from the call site
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, Literal>,

    /// Resource attributes
    #[serde(default)]
    pub attrs: NodeAttributes,
}

impl IrNode {
    pub fn new(id: NodeId, kind: NodeKind, inputs: Vec<NodeId>, ty: ValueType) -> Self {
        Self {
            id,
            name: None,
            kind,
            inputs,
            ty,
            params: BTreeMap::new(),
            attrs: NodeAttributes::default(),
        }
    }

    pub fn op(&self) -> Option<&OpKind> {
        self.kind.op()
    }

    pub fn is_input(&self) -> bool {
        matches!(self.kind, NodeKind::Input)
    }

    pub fn is_constant(&self) -> bool {
        matches!(self.kind, NodeKind::Constant { .. })
    }

    pub fn is_operation(&self) -> bool {
        matches!(self.kind, NodeKind::Operation(_))
    }

    /// Display name: binding name if any, else the id
    pub fn display_name(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => self.id.to_string(),
        }
    }
}
