use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::{header, Client, StatusCode};
use serde::Serialize;
use shared::{
    domain::{AuditInfo, DiagnosisResult, FormSnapshot, ResultLimits, SessionId},
    error::ErrorKind,
    protocol::{first_content, DiagnosisRequest, FollowupAnswer, FollowupRequest, WebhookItem},
};
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

pub mod config;

pub use config::{load_settings, Deployment, Endpoints, Settings};

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_millis(90_000);

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request timed out after {}ms", .0.as_millis())]
    Timeout(Duration),
    #[error("network failure: {0}")]
    Network(String),
    #[error("server error: HTTP {0}")]
    Server(u16),
    #[error("unexpected HTTP status {0}")]
    Status(u16),
    #[error("malformed response body: {0}")]
    Decode(String),
    #[error("failed to build request: {0}")]
    Request(String),
}

impl ClientError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClientError::Timeout(_) => ErrorKind::Timeout,
            ClientError::Network(_) => ErrorKind::Network,
            ClientError::Server(_) => ErrorKind::Server,
            ClientError::Status(_) | ClientError::Decode(_) | ClientError::Request(_) => {
                ErrorKind::Unknown
            }
        }
    }

    fn from_transport(error: reqwest::Error, timeout: Duration) -> Self {
        if error.is_timeout() {
            ClientError::Timeout(timeout)
        } else if error.is_builder() {
            ClientError::Request(error.to_string())
        } else {
            ClientError::Network(error.to_string())
        }
    }

    fn from_status(status: StatusCode) -> Self {
        if status.is_server_error() {
            ClientError::Server(status.as_u16())
        } else {
            ClientError::Status(status.as_u16())
        }
    }
}

/// Fixed-delay retry for transient failures. Only `NETWORK` and `SERVER`
/// failures are retried; a timeout already spent the whole request budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub retry_delay: Duration,
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            retry_delay: Duration::ZERO,
        }
    }

    pub fn should_retry(&self, retries_done: u32, error: &ClientError) -> bool {
        retries_done < self.max_retries
            && matches!(error.kind(), ErrorKind::Network | ErrorKind::Server)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay: Duration::from_millis(1000),
        }
    }
}

/// The remote diagnostic collaborator.
#[async_trait]
pub trait RemoteClient: Send + Sync {
    async fn submit_diagnosis(
        &self,
        form: &FormSnapshot,
        session_id: SessionId,
    ) -> Result<DiagnosisResult, ClientError>;

    async fn submit_followup(
        &self,
        session_id: SessionId,
        answers: &[FollowupAnswer],
    ) -> Result<DiagnosisResult, ClientError>;
}

pub struct DiagnosisClient {
    http: Client,
    endpoints: Endpoints,
    timeout: Duration,
    retry: RetryPolicy,
    limits: ResultLimits,
    app_version: String,
}

impl DiagnosisClient {
    pub fn new(endpoints: Endpoints) -> Self {
        Self {
            http: Client::new(),
            endpoints,
            timeout: DEFAULT_REQUEST_TIMEOUT,
            retry: RetryPolicy::default(),
            limits: ResultLimits::default(),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let endpoints = settings
            .endpoints()
            .context("failed to resolve webhook endpoints")?;
        Ok(Self::new(endpoints)
            .with_timeout(settings.request_timeout())
            .with_retry_policy(settings.retry_policy())
            .with_app_version(settings.app_version.clone()))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_app_version(mut self, app_version: impl Into<String>) -> Self {
        self.app_version = app_version.into();
        self
    }

    async fn post_with_retry<T: Serialize + Sync>(
        &self,
        url: &Url,
        payload: &T,
        session_id: SessionId,
    ) -> Result<DiagnosisResult, ClientError> {
        let started = Instant::now();
        let mut retries_done = 0;

        loop {
            match self.post_once(url, payload).await {
                Ok(result) => {
                    let response_time = started.elapsed();
                    info!(
                        %session_id,
                        response_ms = response_time.as_millis() as u64,
                        top_choices = result.top_choices.len(),
                        "diagnosis webhook answered"
                    );
                    return Ok(self.with_audit(result, session_id, response_time));
                }
                Err(error) if self.retry.should_retry(retries_done, &error) => {
                    retries_done += 1;
                    warn!(
                        %session_id,
                        %error,
                        attempt = retries_done,
                        max_retries = self.retry.max_retries,
                        "webhook request failed; retrying"
                    );
                    tokio::time::sleep(self.retry.retry_delay).await;
                }
                Err(error) => {
                    warn!(%session_id, %error, kind = error.kind().code(), "webhook request failed");
                    return Err(error);
                }
            }
        }
    }

    async fn post_once<T: Serialize + Sync>(
        &self,
        url: &Url,
        payload: &T,
    ) -> Result<DiagnosisResult, ClientError> {
        let exchange = async {
            let response = self
                .http
                .post(url.clone())
                .header(header::ACCEPT, "application/json")
                .json(payload)
                .send()
                .await
                .map_err(|error| ClientError::from_transport(error, self.timeout))?;

            let status = response.status();
            if !status.is_success() {
                return Err(ClientError::from_status(status));
            }

            let body = response
                .bytes()
                .await
                .map_err(|error| ClientError::from_transport(error, self.timeout))?;
            Ok::<_, ClientError>(body)
        };

        let body = tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| ClientError::Timeout(self.timeout))??;

        let items: Vec<WebhookItem> =
            serde_json::from_slice(&body).map_err(|error| ClientError::Decode(error.to_string()))?;
        let result = first_content(items)
            .ok_or_else(|| ClientError::Decode("empty response array".to_string()))?;
        debug!(bytes = body.len(), "decoded webhook response");
        Ok(result.normalized(self.limits))
    }

    fn with_audit(
        &self,
        mut result: DiagnosisResult,
        session_id: SessionId,
        response_time: Duration,
    ) -> DiagnosisResult {
        let reference_count = u32::try_from(result.citation_count()).unwrap_or(u32::MAX);
        result.audit_info = Some(AuditInfo {
            response_time_ms: u64::try_from(response_time.as_millis()).unwrap_or(u64::MAX),
            timestamp: Utc::now(),
            session_id,
            reference_count: Some(reference_count),
        });
        result
    }
}

#[async_trait]
impl RemoteClient for DiagnosisClient {
    async fn submit_diagnosis(
        &self,
        form: &FormSnapshot,
        session_id: SessionId,
    ) -> Result<DiagnosisResult, ClientError> {
        let payload = DiagnosisRequest::from_snapshot(form, session_id, self.app_version.clone());
        self.post_with_retry(&self.endpoints.diagnosis, &payload, session_id)
            .await
    }

    async fn submit_followup(
        &self,
        session_id: SessionId,
        answers: &[FollowupAnswer],
    ) -> Result<DiagnosisResult, ClientError> {
        let payload = FollowupRequest {
            session_id,
            answers: answers.to_vec(),
        };
        self.post_with_retry(&self.endpoints.followup, &payload, session_id)
            .await
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
