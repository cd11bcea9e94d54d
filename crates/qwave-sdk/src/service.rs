//! Async compile service
//!
//! Compilation is CPU-bound and synchronous, so the service runs each
//! request on tokio's blocking pool. Requests share the compiler but nothing
//! mutable. A request that outlives its timeout is abandoned and reported as
//! [`SdkError::Timeout`]; its result is never returned.

use crate::config::{CompilerConfig, ServiceConfig};
use crate::emitter::{Artifact, Backend};
use crate::error::{Result, SdkError};
use qwave_compiler::{CompileResult, Compiler};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// A named source text to compile
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileRequest {
    pub name: String,
    pub source: String,
}

impl CompileRequest {
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
        }
    }
}

/// Outcome of one request in a batch
#[derive(Debug)]
pub struct BatchItem {
    pub name: String,
    pub outcome: Result<CompileResult>,
}

pub struct CompileService {
    compiler: Arc<Compiler>,
    service: ServiceConfig,
}

impl CompileService {
    pub fn new(compiler: Compiler) -> Self {
        Self::with_service_config(compiler, ServiceConfig::default())
    }

    pub fn with_service_config(compiler: Compiler, service: ServiceConfig) -> Self {
        Self {
            compiler: Arc::new(compiler),
            service,
        }
    }

    /// Service configured from a validated configuration
    pub fn from_config(config: &CompilerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::with_service_config(
            Compiler::with_options(config.compiler.clone()),
            config.service.clone(),
        ))
    }

    pub fn compiler(&self) -> &Compiler {
        &self.compiler
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.service.timeout()
    }

    /// Compile one source text
    ///
    /// Diagnostics of a failed compilation are part of the returned result;
    /// only timeouts and task failures are errors.
    pub async fn compile(&self, request: CompileRequest) -> Result<CompileResult> {
        run(self.compiler.clone(), request, self.timeout()).await
    }

    /// Compile and hand the artifact to a backend
    pub async fn compile_and_submit(
        &self,
        request: CompileRequest,
        backend: &dyn Backend,
    ) -> Result<Artifact> {
        let name = request.name.clone();
        let result = self.compile(request).await?;
        let artifact = Artifact::from_result(name, &result)?;
        backend.submit(artifact.clone()).await?;
        Ok(artifact)
    }

    /// Compile independent requests concurrently
    ///
    /// At most `max_concurrency` compilations run at once. Items come back
    /// in request order.
    pub async fn compile_batch(&self, requests: Vec<CompileRequest>) -> Vec<BatchItem> {
        let permits = Arc::new(Semaphore::new(self.service.max_concurrency.max(1)));
        let timeout = self.timeout();
        let names: Vec<String> = requests.iter().map(|r| r.name.clone()).collect();

        let mut tasks = JoinSet::new();
        for (index, request) in requests.into_iter().enumerate() {
            let compiler = self.compiler.clone();
            let permits = permits.clone();
            tasks.spawn(async move {
                let outcome = match permits.acquire_owned().await {
                    Ok(_permit) => run(compiler, request, timeout).await,
                    Err(err) => Err(SdkError::TaskFailed(err.to_string())),
                };
                (index, outcome)
            });
        }

        let mut outcomes: Vec<Option<Result<CompileResult>>> = names.iter().map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, outcome)) => outcomes[index] = Some(outcome),
                Err(err) => tracing::warn!("Batch task failed: {}", err),
            }
        }

        tracing::info!("Compiled batch of {} programs", names.len());
        names
            .into_iter()
            .zip(outcomes)
            .map(|(name, outcome)| BatchItem {
                name,
                outcome: outcome
                    .unwrap_or_else(|| Err(SdkError::TaskFailed("task did not complete".to_string()))),
            })
            .collect()
    }
}

async fn run(
    compiler: Arc<Compiler>,
    request: CompileRequest,
    timeout: Option<Duration>,
) -> Result<CompileResult> {
    let name = request.name;
    let source = request.source;
    tracing::debug!("Compiling '{}'", name);
    let task = tokio::task::spawn_blocking(move || compiler.compile(&source));

    let joined = match timeout {
        Some(limit) => match tokio::time::timeout(limit, task).await {
            Ok(joined) => joined,
            Err(_) => {
                tracing::warn!("Compilation of '{}' timed out after {:?}", name, limit);
                return Err(SdkError::Timeout(limit));
            }
        },
        None => task.await,
    };

    let result = joined.map_err(|e| SdkError::TaskFailed(e.to_string()))?;
    if result.success {
        tracing::debug!("Compiled '{}'", name);
    } else {
        tracing::debug!(
            "Compilation of '{}' failed with {} error(s)",
            name,
            result.error_count()
        );
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = "input a: wave[2]; output y: wave[2]; y = split(a);";

    #[tokio::test]
    async fn test_compile_request() {
        let service = CompileService::new(Compiler::new());
        let result = service
            .compile(CompileRequest::new("split", SOURCE))
            .await
            .unwrap();
        assert!(result.success);
    }

    #[tokio::test]
    async fn test_failed_compilation_is_not_an_error() {
        let service = CompileService::new(Compiler::new());
        let result = service
            .compile(CompileRequest::new("broken", "output y: wave[2];"))
            .await
            .unwrap();
        assert!(!result.success);
        assert!(result.diagnostics.has_errors());
    }

    #[tokio::test]
    async fn test_batch_keeps_request_order() {
        let service = CompileService::with_service_config(
            Compiler::new(),
            ServiceConfig {
                timeout_ms: None,
                max_concurrency: 2,
            },
        );
        let requests = vec![
            CompileRequest::new("first", SOURCE),
            CompileRequest::new("second", "output y: wave[2];"),
            CompileRequest::new("third", SOURCE),
        ];
        let items = service.compile_batch(requests).await;

        let names: Vec<&str> = items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["first", "second", "third"]);
        let successes: Vec<bool> = items
            .iter()
            .map(|i| i.outcome.as_ref().map(|r| r.success).unwrap_or(false))
            .collect();
        assert_eq!(successes, vec![true, false, true]);
    }
}
