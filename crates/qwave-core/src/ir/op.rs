//! Operation kinds
//!
//! A closed set of known kinds plus `Custom` for operations added to the
//! registry at runtime.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of an operation node
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpKind {
    /// Combine two or more waves by interference
    Interfere,
    /// Merge several values into one
    Merge,
    /// Split one value into a derived value
    Split,
    /// Shift the phase of a value by an operand
    PhaseShift,
    /// Fourier transform
    Fourier,
    /// Measurement; never decomposed
    Measure,
    /// Explicit error-correction application
    Correct,
    /// Encode operands into a protected code block
    Encode { code: String, distance: u32 },
    /// Decode a protected code block
    Decode { code: String, distance: u32 },
    /// Accumulate the parts of a decomposed node
    Join,
    /// Operation registered at runtime
    Custom(String),
}

impl OpKind {
    /// Registry name of the kind
    pub fn name(&self) -> &str {
        match self {
            OpKind::Interfere => "interfere",
            OpKind::Merge => "merge",
            OpKind::Split => "split",
            OpKind::PhaseShift => "phase_shift",
            OpKind::Fourier => "fourier",
            OpKind::Measure => "measure",
            OpKind::Correct => "correct",
            OpKind::Encode { .. } => "encode",
            OpKind::Decode { .. } => "decode",
            OpKind::Join => "join",
            OpKind::Custom(name) => name,
        }
    }

    /// Parameterless built-in kind for a name
    pub fn builtin(name: &str) -> Option<Self> {
        match name {
            "interfere" => Some(OpKind::Interfere),
            "merge" => Some(OpKind::Merge),
            "split" => Some(OpKind::Split),
            "phase_shift" => Some(OpKind::PhaseShift),
            "fourier" => Some(OpKind::Fourier),
            "measure" => Some(OpKind::Measure),
            "correct" => Some(OpKind::Correct),
            "join" => Some(OpKind::Join),
            _ => None,
        }
    }

    /// Error-correction machinery rather than payload computation
    pub fn is_error_correction(&self) -> bool {
        matches!(
            self,
            OpKind::Correct | OpKind::Encode { .. } | OpKind::Decode { .. }
        )
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpKind::Encode { code, distance } => write!(f, "encode({code}, d={distance})"),
            OpKind::Decode { code, distance } => write!(f, "decode({code}, d={distance})"),
            other => f.write_str(other.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_names_roundtrip() {
        for name in [
            "interfere",
            "merge",
            "split",
            "phase_shift",
            "fourier",
            "measure",
            "correct",
            "join",
        ] {
            let kind = OpKind::builtin(name).unwrap();
            assert_eq!(kind.name(), name);
        }
        assert!(OpKind::builtin("encode").is_none());
        assert!(OpKind::builtin("teleport").is_none());
    }

    #[test]
    fn test_custom_and_display() {
        assert_eq!(OpKind::Custom("teleport".into()).name(), "teleport");
        let encode = OpKind::Encode {
            code: "surface".into(),
            distance: 5,
        };
        assert_eq!(encode.to_string(), "encode(surface, d=5)");
        assert!(encode.is_error_correction());
        assert!(!OpKind::Fourier.is_error_correction());
    }
}
