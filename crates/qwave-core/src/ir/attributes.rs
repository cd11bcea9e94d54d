//! Per-node resource attributes
//!
//! Coherence and thermal budgets plus the error-correction requirement are
//! abstract metadata. Passes respect them; nothing here models physics.

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

/// Code family used for basic requirements when none is named
pub const DEFAULT_BASIC_CODE: &str = "repetition";

/// Code family used for fault-tolerant requirements when none is named
pub const DEFAULT_FAULT_TOLERANT_CODE: &str = "surface";

/// A non-negative amount or no limit at all
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Budget {
    Bounded(f64),
    #[default]
    Unbounded,
}

impl Budget {
    /// Bounded budget; rejects negative and non-finite amounts
    pub fn bounded(amount: f64) -> Result<Self> {
        if !amount.is_finite() || amount < 0.0 {
            return Err(CoreError::InvalidValue(format!(
                "budget must be a finite number >= 0, got {amount}"
            )));
        }
        Ok(Budget::Bounded(amount))
    }

    pub fn amount(&self) -> Option<f64> {
        match self {
            Budget::Bounded(amount) => Some(*amount),
            Budget::Unbounded => None,
        }
    }

    pub fn is_unbounded(&self) -> bool {
        matches!(self, Budget::Unbounded)
    }

    /// Whether `usage` goes over this budget
    pub fn is_exceeded_by(&self, usage: f64) -> bool {
        match self {
            Budget::Bounded(amount) => usage > *amount,
            Budget::Unbounded => false,
        }
    }

    /// Total order: tighter budgets first, unbounded last
    pub fn compare(&self, other: &Budget) -> Ordering {
        match (self, other) {
            (Budget::Bounded(a), Budget::Bounded(b)) => a.total_cmp(b),
            (Budget::Bounded(_), Budget::Unbounded) => Ordering::Less,
            (Budget::Unbounded, Budget::Bounded(_)) => Ordering::Greater,
            (Budget::Unbounded, Budget::Unbounded) => Ordering::Equal,
        }
    }
}

impl fmt::Display for Budget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Budget::Bounded(amount) => write!(f, "{amount}"),
            Budget::Unbounded => f.write_str("unbounded"),
        }
    }
}

/// Error-correction requirement of a node
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCorrection {
    #[default]
    None,
    Basic {
        code: String,
    },
    FaultTolerant {
        level: u32,
        code: String,
    },
}

impl ErrorCorrection {
    /// Basic requirement with the default code family
    pub fn basic() -> Self {
        ErrorCorrection::Basic {
            code: DEFAULT_BASIC_CODE.to_string(),
        }
    }

    /// Fault-tolerant requirement of `level` with the default code family
    pub fn fault_tolerant(level: u32) -> Self {
        ErrorCorrection::FaultTolerant {
            level: level.max(1),
            code: DEFAULT_FAULT_TOLERANT_CODE.to_string(),
        }
    }

    /// Build a requirement from its source spelling
    ///
    /// `name` is one of `none`, `basic`, `fault_tolerant`. `level` only applies
    /// to fault-tolerant requirements and defaults to 1.
    pub fn from_parts(name: &str, level: Option<u32>, code: Option<&str>) -> Result<Self> {
        let requirement = match name {
            "none" => {
                if code.is_some() || level.is_some() {
                    return Err(CoreError::InvalidValue(
                        "correction \"none\" takes no code or level".to_string(),
                    ));
                }
                return Ok(ErrorCorrection::None);
            }
            "basic" => {
                if level.is_some() {
                    return Err(CoreError::InvalidValue(
                        "correction \"basic\" takes no level".to_string(),
                    ));
                }
                ErrorCorrection::basic()
            }
            "fault_tolerant" => ErrorCorrection::fault_tolerant(level.unwrap_or(1)),
            other => {
                return Err(CoreError::InvalidValue(format!(
                    "unknown correction '{other}', expected none, basic or fault_tolerant"
                )))
            }
        };
        Ok(match code {
            Some(code) => requirement.with_code(code),
            None => requirement,
        })
    }

    /// Replace the code family; no effect on `None`
    pub fn with_code(self, code: &str) -> Self {
        match self {
            ErrorCorrection::None => ErrorCorrection::None,
            ErrorCorrection::Basic { .. } => ErrorCorrection::Basic {
                code: code.to_string(),
            },
            ErrorCorrection::FaultTolerant { level, .. } => ErrorCorrection::FaultTolerant {
                level,
                code: code.to_string(),
            },
        }
    }

    /// Monotone strength: none = 0, basic = 1, fault-tolerant level N = 1 + N
    pub fn strength(&self) -> u32 {
        match self {
            ErrorCorrection::None => 0,
            ErrorCorrection::Basic { .. } => 1,
            ErrorCorrection::FaultTolerant { level, .. } => 1 + level,
        }
    }

    pub fn code(&self) -> Option<&str> {
        match self {
            ErrorCorrection::None => None,
            ErrorCorrection::Basic { code } | ErrorCorrection::FaultTolerant { code, .. } => {
                Some(code)
            }
        }
    }

    /// Code distance: basic = 3, fault-tolerant level N = 2N + 1
    pub fn distance(&self) -> Option<u32> {
        match self {
            ErrorCorrection::None => None,
            ErrorCorrection::Basic { .. } => Some(3),
            ErrorCorrection::FaultTolerant { level, .. } => Some(2 * level + 1),
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, ErrorCorrection::None)
    }

    pub fn is_fault_tolerant(&self) -> bool {
        matches!(self, ErrorCorrection::FaultTolerant { .. })
    }
}

impl fmt::Display for ErrorCorrection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCorrection::None => f.write_str("none"),
            ErrorCorrection::Basic { code } => write!(f, "basic({code})"),
            ErrorCorrection::FaultTolerant { level, code } => {
                write!(f, "fault_tolerant-{level}({code})")
            }
        }
    }
}

/// Free-form attribute value written by passes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Flag(bool),
    Number(f64),
    Text(String),
}

/// Mutable attribute map of a node
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NodeAttributes {
    #[serde(default)]
    pub coherence: Budget,
    #[serde(default)]
    pub thermal: Budget,
    #[serde(default)]
    pub correction: ErrorCorrection,
    /// Pass provenance markers (`thermal.part`, `ec.wrapped`, ...)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, AttrValue>,
}

impl NodeAttributes {
    pub fn mark(&mut self, key: impl Into<String>, value: AttrValue) {
        self.extra.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&AttrValue> {
        self.extra.get(key)
    }

    pub fn has_flag(&self, key: &str) -> bool {
        matches!(self.extra.get(key), Some(AttrValue::Flag(true)))
    }
}
