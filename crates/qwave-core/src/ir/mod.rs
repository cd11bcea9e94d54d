//! Intermediate Representation (IR) for qwave
//!
//! The IR is a typed dataflow DAG. It is built from the AST, annotated with
//! resource constraints, rewritten by optimization passes and finally frozen
//! for scheduling.

pub mod attributes;
pub mod graph;
pub mod hints;
pub mod node;
pub mod op;

pub use attributes::{AttrValue, Budget, ErrorCorrection, NodeAttributes};
pub use graph::{GraphSummary, IrGraph, OutputPort};
pub use hints::{GroupId, ParallelGroup, ParallelHints};
pub use node::{IrNode, NodeId, NodeKind};
pub use op::OpKind;
