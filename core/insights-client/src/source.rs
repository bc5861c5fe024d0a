//! FILENAME: core/insights-client/src/source.rs
//! Where dataset payloads come from.
//!
//! Loaders talk to a `DataSource` only, so the same table code runs against
//! the live API, canned data, or the live API with canned data behind it.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde_json::Value;

use crate::config::ClientConfig;
use crate::envelope::ApiEnvelope;
use crate::error::{ClientError, Result};
use crate::query::{QueryParam, QueryParams};

#[async_trait]
pub trait DataSource: Send + Sync {
    /// GETs `path` with `params` and returns the decoded envelope.
    async fn fetch(&self, path: &str, params: &QueryParams) -> Result<ApiEnvelope>;
}

// ============================================================================
// HTTP
// ============================================================================

pub struct HttpDataSource {
    http: Client,
    base_url: Url,
}

impl HttpDataSource {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let mut base = config.base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base).map_err(|_| ClientError::InvalidUrl(config.base_url.clone()))?;

        let mut builder = Client::builder().timeout(Duration::from_secs(config.timeout_secs));
        if let Some(agent) = &config.user_agent {
            builder = builder.user_agent(agent.as_str());
        }

        Ok(HttpDataSource {
            http: builder.build()?,
            base_url,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolves a dataset path against the base URL.
    pub fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|_| ClientError::InvalidUrl(format!("{}{}", self.base_url, path)))
    }
}

#[async_trait]
impl DataSource for HttpDataSource {
    async fn fetch(&self, path: &str, params: &QueryParams) -> Result<ApiEnvelope> {
        let url = self.endpoint(path)?;
        log::debug!("GET {} {:?}", url, params.pairs());

        let response = self
            .http
            .get(url)
            .header("Accept", "application/json")
            .query(&params.pairs())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Api(format!(
                "{} returned {}: {}",
                path,
                status,
                body.chars().take(200).collect::<String>()
            )));
        }

        let body: Value = response.json().await?;
        ApiEnvelope::from_value(body)
    }
}

// ============================================================================
// STATIC
// ============================================================================

#[derive(Debug, Clone)]
enum Canned {
    Payload(Value),
    Failure(String),
}

#[derive(Debug, Clone)]
struct CannedEntry {
    path: String,
    conditions: Vec<(QueryParam, String)>,
    response: Canned,
}

impl CannedEntry {
    fn matches(&self, path: &str, params: &QueryParams) -> bool {
        self.path == path.trim_start_matches('/')
            && self
                .conditions
                .iter()
                .all(|(param, value)| params.get(*param) == Some(value.as_str()))
    }
}

/// Canned payloads keyed by path, optionally narrowed by parameter values.
///
/// The most specific matching entry wins. Every request is recorded so tests
/// can assert on what was fetched.
#[derive(Debug, Default)]
pub struct StaticDataSource {
    entries: Vec<CannedEntry>,
    requests: Mutex<Vec<(String, QueryParams)>>,
}

impl StaticDataSource {
    pub fn new() -> Self {
        StaticDataSource::default()
    }

    pub fn with_dataset(self, path: impl Into<String>, payload: Value) -> Self {
        self.with_entry(path.into(), Vec::new(), Canned::Payload(payload))
    }

    /// Payload served only when `param` equals `value`.
    pub fn with_dataset_where(
        self,
        path: impl Into<String>,
        param: QueryParam,
        value: impl Into<String>,
        payload: Value,
    ) -> Self {
        self.with_entry(path.into(), vec![(param, value.into())], Canned::Payload(payload))
    }

    /// Requests to `path` fail with an API error.
    pub fn with_failure(self, path: impl Into<String>, message: impl Into<String>) -> Self {
        self.with_entry(path.into(), Vec::new(), Canned::Failure(message.into()))
    }

    fn with_entry(mut self, path: String, conditions: Vec<(QueryParam, String)>, response: Canned) -> Self {
        self.entries.push(CannedEntry {
            path: path.trim_start_matches('/').to_string(),
            conditions,
            response,
        });
        self
    }

    pub fn requests(&self) -> Vec<(String, QueryParams)> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn request_count(&self, path: &str) -> usize {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(p, _)| p == path.trim_start_matches('/'))
            .count()
    }
}

#[async_trait]
impl DataSource for StaticDataSource {
    async fn fetch(&self, path: &str, params: &QueryParams) -> Result<ApiEnvelope> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((path.trim_start_matches('/').to_string(), params.clone()));

        let entry = self
            .entries
            .iter()
            .filter(|e| e.matches(path, params))
            .max_by_key(|e| e.conditions.len())
            .ok_or_else(|| ClientError::NotFound(path.to_string()))?;

        match &entry.response {
            Canned::Payload(payload) => ApiEnvelope::from_value(payload.clone()),
            Canned::Failure(message) => Err(ClientError::Api(message.clone())),
        }
    }
}

// ============================================================================
// FALLBACK
// ============================================================================

/// Tries `primary` and serves from `fallback` when it fails.
pub struct FallbackDataSource<P, F> {
    primary: P,
    fallback: F,
}

impl<P: DataSource, F: DataSource> FallbackDataSource<P, F> {
    pub fn new(primary: P, fallback: F) -> Self {
        FallbackDataSource { primary, fallback }
    }
}

#[async_trait]
impl<P: DataSource, F: DataSource> DataSource for FallbackDataSource<P, F> {
    async fn fetch(&self, path: &str, params: &QueryParams) -> Result<ApiEnvelope> {
        match self.primary.fetch(path, params).await {
            Ok(envelope) if envelope.success => Ok(envelope),
            Ok(envelope) => {
                log::warn!(
                    "{} reported failure ({}); serving fallback data",
                    path,
                    envelope.message.as_deref().unwrap_or("no message")
                );
                self.fallback.fetch(path, params).await
            }
            Err(err) => {
                log::warn!("{} failed ({}); serving fallback data", path, err);
                self.fallback.fetch(path, params).await
            }
        }
    }
}
