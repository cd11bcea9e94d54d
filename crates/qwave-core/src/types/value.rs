//! Literal values appearing in qwave source programs
//!
//! Only two literal shapes exist in the language: numbers (plain decimal or
//! scientific notation) and double-quoted text used for code family and
//! correction names.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A literal argument value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    /// Numeric literal (`3`, `0.25`, `1e-3`)
    Number(f64),
    /// Text literal (`"surface"`)
    Text(String),
}

impl Literal {
    /// Returns the numeric value, if this is a number
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Literal::Number(n) => Some(*n),
            Literal::Text(_) => None,
        }
    }

    /// Returns the text value, if this is a text literal
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Literal::Text(s) => Some(s),
            Literal::Number(_) => None,
        }
    }

    /// Returns the value as a positive integer, if it is a whole number >= 1
    pub fn as_positive_integer(&self) -> Option<u32> {
        let n = self.as_number()?;
        if n >= 1.0 && n.fract() == 0.0 && n <= u32::MAX as f64 {
            Some(n as u32)
        } else {
            None
        }
    }

    /// Short description of the literal's kind, used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Literal::Number(_) => "number",
            Literal::Text(_) => "text",
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Number(n) => write!(f, "{n}"),
            Literal::Text(s) => write!(f, "\"{s}\""),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_number() {
        let lit = Literal::Number(42.0);
        assert_eq!(lit.as_number(), Some(42.0));
        assert_eq!(lit.as_text(), None);
        assert_eq!(lit.type_name(), "number");
    }

    #[test]
    fn test_literal_text() {
        let lit = Literal::Text("surface".to_string());
        assert_eq!(lit.as_text(), Some("surface"));
        assert_eq!(lit.as_number(), None);
        assert_eq!(lit.to_string(), "\"surface\"");
    }

    #[test]
    fn test_positive_integer() {
        assert_eq!(Literal::Number(3.0).as_positive_integer(), Some(3));
        assert_eq!(Literal::Number(0.0).as_positive_integer(), None);
        assert_eq!(Literal::Number(2.5).as_positive_integer(), None);
        assert_eq!(Literal::Number(-1.0).as_positive_integer(), None);
        assert_eq!(Literal::Text("1".into()).as_positive_integer(), None);
    }

    #[test]
    fn test_literal_serde_json() {
        let values = vec![Literal::Number(1e-3), Literal::Text("steane".to_string())];
        let json = serde_json::to_string(&values).unwrap();
        assert_eq!(json, r#"[0.001,"steane"]"#);

        let back: Vec<Literal> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, values);
    }
}
