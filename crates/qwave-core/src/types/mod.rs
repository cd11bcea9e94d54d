//! Type system for qwave
//!
//! - Literal values
//! - Result type descriptors (element kind + shape)

pub mod shape;
pub mod value;

pub use shape::{ElementKind, ValueType};
pub use value::Literal;
