//! Listing of previously generated diagrams from the remote registry.

use std::sync::Arc;

use async_trait::async_trait;
use flowman_core::DiagramDocument;
use reqwest::StatusCode;
use serde_json::Value;
use url::Url;

/// One previously generated diagram as the registry reports it. Entries
/// without markup are listed but cannot be loaded into the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryEntry {
    pub id: String,
    pub document: Option<DiagramDocument>,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum FetchError {
    /// The response body was not a JSON array.
    #[error("unexpected format")]
    UnexpectedFormat,
    #[error("registry request failed: {message}")]
    Request { message: String },
}

/// The GET beneath [`RegistryClient`], returning the raw response JSON.
#[async_trait]
pub trait RegistryTransport: Send + Sync {
    async fn fetch(&self) -> Result<Value, FetchError>;
}

pub struct RegistryClient {
    transport: Arc<dyn RegistryTransport>,
}

impl RegistryClient {
    pub fn new(transport: Arc<dyn RegistryTransport>) -> Self {
        Self { transport }
    }

    /// Fetches the full listing. The body must be an array; remote order is
    /// preserved for display and carries no semantic meaning.
    pub async fn list(&self) -> Result<Vec<RegistryEntry>, FetchError> {
        let body = self.transport.fetch().await?;
        let Some(items) = body.as_array() else {
            return Err(FetchError::UnexpectedFormat);
        };
        Ok(items
            .iter()
            .enumerate()
            .map(|(index, value)| entry_from_value(index, value))
            .collect())
    }
}

fn entry_from_value(index: usize, value: &Value) -> RegistryEntry {
    // Identifiers are opaque: numbers are stringified, and an entry without
    // one falls back to its position in the listing.
    let id = match value.get("id") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => index.to_string(),
    };
    let document = value
        .get("extractedXml")
        .and_then(Value::as_str)
        .map(DiagramDocument::new);
    RegistryEntry { id, document }
}

/// Plain GET against the registry endpoint.
pub struct HttpRegistryTransport {
    http: reqwest::Client,
    endpoint: Url,
}

impl HttpRegistryTransport {
    pub fn new(http: reqwest::Client, endpoint: Url) -> Self {
        Self { http, endpoint }
    }
}

#[async_trait]
impl RegistryTransport for HttpRegistryTransport {
    async fn fetch(&self) -> Result<Value, FetchError> {
        let response = self
            .http
            .get(self.endpoint.clone())
            .send()
            .await
            .map_err(|err| FetchError::Request {
                message: err.to_string(),
            })?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(FetchError::Request {
                message: format!("registry returned HTTP {status}"),
            });
        }

        // A non-JSON body is just another unexpected shape.
        response
            .json::<Value>()
            .await
            .map_err(|_| FetchError::UnexpectedFormat)
    }
}
