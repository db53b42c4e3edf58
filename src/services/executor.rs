use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_lambda::error::DisplayErrorContext;
use aws_sdk_lambda::primitives::Blob;
use aws_sdk_lambda::types::InvocationType;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::config::{ExecutorBackend, Settings};
use crate::db::types::Visibility;

/// Self-contained grading job handed to the external executor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct GradingJob {
    pub(crate) submission_id: i64,
    pub(crate) language: String,
    pub(crate) code: String,
    pub(crate) test_cases: Vec<TestCasePayload>,
    pub(crate) total_score: i32,
    pub(crate) callback_url: String,
    pub(crate) api_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct TestCasePayload {
    pub(crate) input: String,
    pub(crate) expected_output: String,
    pub(crate) visibility: Visibility,
    pub(crate) score: i32,
}

#[derive(Debug, Error)]
pub(crate) enum DispatchError {
    #[error("executor is not configured: {0}")]
    NotConfigured(&'static str),
    #[error("failed to encode grading job: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("executor request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("executor rejected the job with HTTP {0}")]
    Rejected(u16),
    #[error("lambda invocation failed: {0}")]
    Lambda(String),
}

/// One-way, at-most-once hand-off of a grading job. Implementations return as
/// soon as the executor has accepted the job; results arrive via callback.
#[async_trait]
pub(crate) trait Executor: Send + Sync {
    async fn dispatch(&self, job: &GradingJob) -> Result<(), DispatchError>;

    fn backend(&self) -> &'static str;
}

pub(crate) async fn from_settings(settings: &Settings) -> anyhow::Result<Arc<dyn Executor>> {
    let execution = settings.execution();
    let timeout = Duration::from_secs(execution.dispatch_timeout_seconds);

    let executor: Arc<dyn Executor> = match execution.backend {
        ExecutorBackend::Http if !execution.api_url.is_empty() => {
            Arc::new(HttpExecutor::new(execution.api_url.clone(), timeout)?)
        }
        ExecutorBackend::Lambda if !execution.lambda_name.is_empty() => Arc::new(
            LambdaExecutor::new(execution.lambda_name.clone(), execution.aws_region.clone()).await,
        ),
        ExecutorBackend::Http | ExecutorBackend::Lambda | ExecutorBackend::Disabled => {
            tracing::warn!(
                backend = execution.backend.as_str(),
                "Executor endpoint not configured; submissions will end in error"
            );
            Arc::new(DisabledExecutor)
        }
    };

    tracing::info!(backend = executor.backend(), "Grading executor ready");
    Ok(executor)
}

#[derive(Debug, Clone)]
pub(crate) struct HttpExecutor {
    client: Client,
    url: String,
}

impl HttpExecutor {
    pub(crate) fn new(url: String, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()
            .context("Failed to build executor HTTP client")?;

        Ok(Self { client, url })
    }
}

#[async_trait]
impl Executor for HttpExecutor {
    async fn dispatch(&self, job: &GradingJob) -> Result<(), DispatchError> {
        let response = self.client.post(&self.url).json(job).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DispatchError::Rejected(status.as_u16()));
        }
        Ok(())
    }

    fn backend(&self) -> &'static str {
        ExecutorBackend::Http.as_str()
    }
}

/// Asynchronous (`Event`) Lambda invocation; the function calls back itself.
#[derive(Debug, Clone)]
pub(crate) struct LambdaExecutor {
    client: aws_sdk_lambda::Client,
    function_name: String,
}

impl LambdaExecutor {
    pub(crate) async fn new(function_name: String, region: String) -> Self {
        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(aws_config::Region::new(region))
            .load()
            .await;

        Self { client: aws_sdk_lambda::Client::new(&config), function_name }
    }
}

#[async_trait]
impl Executor for LambdaExecutor {
    async fn dispatch(&self, job: &GradingJob) -> Result<(), DispatchError> {
        let payload = serde_json::to_vec(job)?;

        let output = self
            .client
            .invoke()
            .function_name(&self.function_name)
            .invocation_type(InvocationType::Event)
            .payload(Blob::new(payload))
            .send()
            .await
            .map_err(|e| DispatchError::Lambda(DisplayErrorContext(e).to_string()))?;

        if let Some(function_error) = output.function_error() {
            return Err(DispatchError::Lambda(function_error.to_string()));
        }
        Ok(())
    }

    fn backend(&self) -> &'static str {
        ExecutorBackend::Lambda.as_str()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct DisabledExecutor;

#[async_trait]
impl Executor for DisabledExecutor {
    async fn dispatch(&self, _job: &GradingJob) -> Result<(), DispatchError> {
        Err(DispatchError::NotConfigured("set EXECUTION_API_URL or EXECUTION_LAMBDA_NAME"))
    }

    fn backend(&self) -> &'static str {
        ExecutorBackend::Disabled.as_str()
    }
}
