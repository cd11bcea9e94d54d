//! Result type descriptors: element kind plus shape

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Element kind of a value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    /// Plain number, no shape
    Scalar,
    /// One-dimensional wave register
    Wave,
    /// Two-dimensional field
    Field,
}

impl ElementKind {
    /// Number of shape dimensions this kind requires
    pub fn arity(&self) -> usize {
        match self {
            ElementKind::Scalar => 0,
            ElementKind::Wave => 1,
            ElementKind::Field => 2,
        }
    }

    /// Look up an element kind by its source name
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "scalar" => Some(ElementKind::Scalar),
            "wave" => Some(ElementKind::Wave),
            "field" => Some(ElementKind::Field),
            _ => None,
        }
    }

    /// Source name of the kind
    pub fn name(&self) -> &'static str {
        match self {
            ElementKind::Scalar => "scalar",
            ElementKind::Wave => "wave",
            ElementKind::Field => "field",
        }
    }
}

/// Type of a value flowing along a graph edge
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ValueType {
    pub element: ElementKind,
    #[serde(default)]
    pub shape: Vec<u64>,
}

impl ValueType {
    /// Create a type, checking that the shape matches the element kind's arity
    pub fn new(element: ElementKind, shape: Vec<u64>) -> Result<Self> {
        if shape.len() != element.arity() {
            return Err(CoreError::TypeArity {
                kind: element.name().to_string(),
                expected: element.arity(),
                actual: shape.len(),
            });
        }
        if let Some(pos) = shape.iter().position(|d| *d == 0) {
            return Err(CoreError::InvalidValue(format!(
                "dimension {} of {} must be greater than zero",
                pos,
                element.name()
            )));
        }
        Ok(Self { element, shape })
    }

    /// The scalar type
    pub fn scalar() -> Self {
        Self {
            element: ElementKind::Scalar,
            shape: Vec::new(),
        }
    }

    /// A one-dimensional wave of the given width
    pub fn wave(width: u64) -> Self {
        Self {
            element: ElementKind::Wave,
            shape: vec![width],
        }
    }

    /// A two-dimensional field
    pub fn field(rows: u64, cols: u64) -> Self {
        Self {
            element: ElementKind::Field,
            shape: vec![rows, cols],
        }
    }

    pub fn is_scalar(&self) -> bool {
        self.element == ElementKind::Scalar
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.shape.is_empty() {
            return write!(f, "{}", self.element.name());
        }
        let dims: Vec<String> = self.shape.iter().map(|d| d.to_string()).collect();
        write!(f, "{}[{}]", self.element.name(), dims.join(", "))
    }
}
