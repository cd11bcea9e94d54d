//! Builder pattern for compilers and compile services

use crate::config::{CompilerConfig, ServiceConfig};
use crate::error::Result;
use crate::service::CompileService;
use qwave_compiler::{CompileOptions, Compiler};
use qwave_core::{ErrorCorrection, OpSpec, OperationRegistry};
use std::path::Path;
use std::time::Duration;

/// Builder for [`Compiler`] and [`CompileService`]
///
/// # Example
///
/// ```rust,ignore
/// use qwave_sdk::CompilerBuilder;
///
/// let service = CompilerBuilder::new()
///     .with_passes(["coherence", "performance"])
///     .thermal_ceiling(2.0)
///     .timeout(std::time::Duration::from_secs(5))
///     .build_service()?;
///
/// let result = service.compile(request).await?;
/// ```
pub struct CompilerBuilder {
    config: CompilerConfig,
    custom_operations: Vec<OpSpec>,
}

impl CompilerBuilder {
    /// Create a new builder with default options
    pub fn new() -> Self {
        Self {
            config: CompilerConfig::default(),
            custom_operations: Vec::new(),
        }
    }

    /// Start from a loaded configuration
    pub fn from_config(config: CompilerConfig) -> Self {
        Self {
            config,
            custom_operations: Vec::new(),
        }
    }

    /// Start from a configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::from_config(CompilerConfig::from_file(path)?))
    }

    // ========== Compile Options ==========

    /// Replace all compile options
    pub fn with_options(mut self, options: CompileOptions) -> Self {
        self.config.compiler = options;
        self
    }

    /// Set the pass list
    pub fn with_passes<S: Into<String>>(mut self, passes: impl IntoIterator<Item = S>) -> Self {
        self.config.compiler.pass_list = passes.into_iter().map(Into::into).collect();
        self
    }

    /// Set the thermal ceiling
    pub fn thermal_ceiling(mut self, ceiling: f64) -> Self {
        self.config.compiler.thermal_ceiling = Some(ceiling);
        self
    }

    /// Set the default error-correction requirement
    pub fn default_error_correction(mut self, correction: ErrorCorrection) -> Self {
        self.config.compiler.default_error_correction = correction;
        self
    }

    /// Repeat the pass list until nothing changes
    pub fn iterate_to_fixed_point(mut self, enable: bool) -> Self {
        self.config.compiler.iterate_to_fixed_point = enable;
        self
    }

    /// Register an extra operation next to the built-in ones
    pub fn with_operation(mut self, spec: OpSpec) -> Self {
        self.custom_operations.push(spec);
        self
    }

    // ========== Service ==========

    /// Set service configuration
    pub fn with_service(mut self, service: ServiceConfig) -> Self {
        self.config.service = service;
        self
    }

    /// Set the per-compilation timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.service.timeout_ms = Some(timeout.as_millis().max(1) as u64);
        self
    }

    /// Set batch concurrency
    pub fn max_concurrency(mut self, max: usize) -> Self {
        self.config.service.max_concurrency = max;
        self
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    // ========== Build ==========

    /// Build a compiler; options are validated first
    pub fn build(self) -> Result<Compiler> {
        self.config.validate()?;
        let mut registry = OperationRegistry::default();
        for spec in self.custom_operations {
            registry.register(spec).map_err(qwave_compiler::CompileError::from)?;
        }
        tracing::debug!(
            "Building compiler with {} operations and passes {:?}",
            registry.len(),
            self.config.compiler.pass_list
        );
        Ok(Compiler::with_options(self.config.compiler).with_registry(registry))
    }

    /// Build a compile service
    pub fn build_service(self) -> Result<CompileService> {
        let service = self.config.service.clone();
        let compiler = self.build()?;
        Ok(CompileService::with_service_config(compiler, service))
    }
}

impl Default for CompilerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SdkError;
    use qwave_core::OpKind;

    #[test]
    fn test_builder_sets_options() {
        let builder = CompilerBuilder::new()
            .with_passes(["performance"])
            .thermal_ceiling(3.0)
            .iterate_to_fixed_point(true)
            .timeout(Duration::from_millis(200))
            .max_concurrency(8);

        let config = builder.config();
        assert_eq!(config.compiler.pass_list, vec!["performance"]);
        assert_eq!(config.compiler.thermal_ceiling, Some(3.0));
        assert!(config.compiler.iterate_to_fixed_point);
        assert_eq!(config.service.timeout_ms, Some(200));
        assert_eq!(config.service.max_concurrency, 8);
    }

    #[test]
    fn test_invalid_options_fail_build() {
        let err = CompilerBuilder::new()
            .thermal_ceiling(-2.0)
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, SdkError::CompileError(_)));
    }

    #[test]
    fn test_custom_operation() {
        let compiler = CompilerBuilder::new()
            .with_operation(OpSpec::new(OpKind::Custom("amplify".to_string())).with_costs(1.0, 0.5))
            .build()
            .unwrap();
        assert!(compiler.registry().contains("amplify"));

        let result = compiler.compile("input a: wave[2]; output y: wave[2]; y = amplify(a);");
        assert!(result.success, "{:?}", result.diagnostics);
    }

    #[test]
    fn test_duplicate_operation_fails_build() {
        let result = CompilerBuilder::new()
            .with_operation(OpSpec::new(OpKind::Split))
            .build();
        assert!(result.is_err());
    }
}
