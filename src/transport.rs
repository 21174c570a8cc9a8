use serde_json::{Value, json};
use thiserror::Error;
use tracing::{debug, warn};

use crate::endpoint::ApiBase;
use crate::models::ApplicationStatus;
use crate::query::{
    ADMIN_CLASSIFY_RUN_PATH, ADMIN_CRAWL_RUN_PATH, ADMIN_RUNS_PATH, APPLICATIONS_PATH, ApiQuery,
    BOOKMARKS_PATH, JOBS_PATH,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    /// The request never completed (connection refused, DNS, TLS, reset).
    #[error("network error: {0}")]
    Network(String),

    #[error("{status} {status_text} ({})", body_or_placeholder(.body))]
    Http {
        status: u16,
        status_text: String,
        body: String,
    },

    #[error("invalid JSON response: {0}")]
    Decode(String),
}

fn body_or_placeholder(body: &str) -> &str {
    if body.is_empty() { "no body" } else { body }
}

/// Sends one request to the API and returns the parsed JSON body.
///
/// Non-2xx/3xx responses become `TransportError::Http` with the raw body
/// captured. No retries, no caching.
pub trait Transport: Send + Sync {
    fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, TransportError>;
}

pub struct HttpTransport {
    base: ApiBase,
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    pub fn new(base: ApiBase) -> Self {
        Self::with_client(base, reqwest::blocking::Client::new())
    }

    pub fn with_client(base: ApiBase, client: reqwest::blocking::Client) -> Self {
        Self { base, client }
    }
}

impl Transport for HttpTransport {
    fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, TransportError> {
        let url = self.base.join(path);
        debug!(?method, %url, "sending request");

        let mut builder = match method {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url),
            Method::Put => self.client.put(&url),
            Method::Delete => self.client.delete(&url),
        };
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = builder.send().map_err(|e| {
            warn!(?method, %url, error = %e, "request failed to complete");
            TransportError::Network(e.to_string())
        })?;

        let status = response.status();
        if !(status.is_success() || status.is_redirection()) {
            let status_text = status.canonical_reason().unwrap_or_default().to_string();
            let body = response.text().unwrap_or_default();
            warn!(?method, %url, status = status.as_u16(), "request rejected");
            return Err(TransportError::Http {
                status: status.as_u16(),
                status_text,
                body,
            });
        }

        let text = response.text().map_err(|e| TransportError::Network(e.to_string()))?;
        debug!(?method, %url, status = status.as_u16(), bytes = text.len(), "request finished");
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| TransportError::Decode(e.to_string()))
    }
}

/// The API declares integer job ids; ids that look numeric are sent as numbers.
pub fn job_id_value(job_id: &str) -> Value {
    match job_id.parse::<i64>() {
        Ok(n) => json!(n),
        Err(_) => json!(job_id),
    }
}

pub fn create_bookmark(
    transport: &dyn Transport,
    job_id: &str,
    memo: &str,
) -> Result<Value, TransportError> {
    let body = json!({ "job_id": job_id_value(job_id), "memo": memo });
    transport.request(Method::Post, BOOKMARKS_PATH, Some(&body))
}

pub fn delete_bookmark(transport: &dyn Transport, job_id: &str) -> Result<Value, TransportError> {
    let path = format!("{}/{}", BOOKMARKS_PATH, urlencoding::encode(job_id));
    transport.request(Method::Delete, &path, None)
}

pub fn upsert_application(
    transport: &dyn Transport,
    job_id: &str,
    status: ApplicationStatus,
) -> Result<Value, TransportError> {
    let path = format!("{}/{}", APPLICATIONS_PATH, urlencoding::encode(job_id));
    let body = json!({ "status": status.as_str() });
    transport.request(Method::Put, &path, Some(&body))
}

pub fn job_detail(transport: &dyn Transport, job_id: &str) -> Result<Value, TransportError> {
    let path = format!("{}/{}", JOBS_PATH, urlencoding::encode(job_id));
    transport.request(Method::Get, &path, None)
}

/// Triggers a crawl of one source. Returns the run summary.
pub fn run_crawl(transport: &dyn Transport, source_code: &str) -> Result<Value, TransportError> {
    let query = ApiQuery {
        path: ADMIN_CRAWL_RUN_PATH,
        params: vec![("source_code", source_code.to_string())],
    };
    transport.request(Method::Post, &query.to_path_and_query(), None)
}

/// Classifies up to `limit` jobs. Without a rule version the server uses its
/// configured one.
pub fn run_classification(
    transport: &dyn Transport,
    rule_version: Option<&str>,
    limit: u32,
) -> Result<Value, TransportError> {
    let mut params = Vec::new();
    if let Some(version) = rule_version.map(str::trim).filter(|v| !v.is_empty()) {
        params.push(("rule_version", version.to_string()));
    }
    params.push(("limit", limit.to_string()));
    let query = ApiQuery {
        path: ADMIN_CLASSIFY_RUN_PATH,
        params,
    };
    transport.request(Method::Post, &query.to_path_and_query(), None)
}

/// Most recent crawl runs, newest first.
pub fn crawl_runs(transport: &dyn Transport, limit: u32) -> Result<Value, TransportError> {
    let query = ApiQuery {
        path: ADMIN_RUNS_PATH,
        params: vec![("limit", limit.to_string())],
    };
    transport.request(Method::Get, &query.to_path_and_query(), None)
}
