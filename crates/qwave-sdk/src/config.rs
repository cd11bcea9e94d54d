//! Configuration types for the compile service
//!
//! A configuration file holds the compile options plus service settings:
//!
//! ```yaml
//! compiler:
//!   pass_list: [coherence, thermal, error_correction, performance]
//!   thermal_ceiling: 2.0
//!   default_error_correction: none
//! service:
//!   timeout_ms: 5000
//!   max_concurrency: 4
//! emit:
//!   pretty: true
//! ```

use crate::error::{Result, SdkError};
use qwave_compiler::CompileOptions;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Main configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Options for every compilation
    pub compiler: CompileOptions,

    /// Compile service settings
    pub service: ServiceConfig,

    /// Artifact emission settings
    pub emit: EmitConfig,
}

impl CompilerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a YAML document
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a JSON document
    pub fn from_json_str(content: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a `.yaml`, `.yml` or `.json` file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml_str(&content),
            Some("json") => Self::from_json_str(&content),
            _ => Err(SdkError::ConfigError(format!(
                "unsupported configuration file: {}",
                path.display()
            ))),
        }
    }

    /// Set compile options
    pub fn with_compiler(mut self, options: CompileOptions) -> Self {
        self.compiler = options;
        self
    }

    /// Set service configuration
    pub fn with_service(mut self, service: ServiceConfig) -> Self {
        self.service = service;
        self
    }

    /// Check compile options and service settings
    pub fn validate(&self) -> Result<()> {
        self.compiler.validate()?;
        if self.service.timeout_ms == Some(0) {
            return Err(SdkError::ConfigError(
                "service.timeout_ms must be positive".to_string(),
            ));
        }
        if self.service.max_concurrency == 0 {
            return Err(SdkError::ConfigError(
                "service.max_concurrency must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Compile service configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Per-compilation timeout; a late result is discarded
    pub timeout_ms: Option<u64>,

    /// Compilations allowed to run at the same time in a batch
    pub max_concurrency: usize,
}

impl ServiceConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            timeout_ms: None,
            max_concurrency: 4,
        }
    }
}

/// Artifact emission configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmitConfig {
    /// Pretty-print JSON artifacts
    pub pretty: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use qwave_core::ErrorCorrection;

    #[test]
    fn test_default_config() {
        let config = CompilerConfig::default();
        assert_eq!(config.compiler, CompileOptions::default());
        assert_eq!(config.service.timeout(), None);
        assert_eq!(config.service.max_concurrency, 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_yaml_config() {
        let yaml = r#"
compiler:
  pass_list: [coherence, performance]
  thermal_ceiling: 2.0
  default_error_correction: none
service:
  timeout_ms: 1500
"#;
        let config = CompilerConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.compiler.pass_list, vec!["coherence", "performance"]);
        assert_eq!(config.compiler.thermal_ceiling, Some(2.0));
        assert_eq!(config.compiler.default_error_correction, ErrorCorrection::None);
        assert_eq!(config.service.timeout(), Some(Duration::from_millis(1500)));
        assert_eq!(config.service.max_concurrency, 4);
    }

    #[test]
    fn test_json_config() {
        let json = r#"{
            "compiler": {
                "iterate_to_fixed_point": true,
                "default_error_correction": {"basic": {"code": "steane"}}
            },
            "emit": {"pretty": true}
        }"#;
        let config = CompilerConfig::from_json_str(json).unwrap();
        assert!(config.compiler.iterate_to_fixed_point);
        assert_eq!(
            config.compiler.default_error_correction,
            ErrorCorrection::Basic {
                code: "steane".to_string()
            }
        );
        assert!(config.emit.pretty);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let yaml = "compiler:\n  thermal_ceiling: -1.0\n";
        assert!(matches!(
            CompilerConfig::from_yaml_str(yaml),
            Err(SdkError::CompileError(_))
        ));

        let yaml = "service:\n  max_concurrency: 0\n";
        assert!(matches!(
            CompilerConfig::from_yaml_str(yaml),
            Err(SdkError::ConfigError(_))
        ));
    }

    #[test]
    fn test_unknown_extension() {
        let err = CompilerConfig::from_file("qwave.toml").unwrap_err();
        assert!(matches!(err, SdkError::IoError(_) | SdkError::ConfigError(_)));
    }
}
