//! Submission of a generation request to the remote diagram service.
//!
//! Fire-and-forget: a 200 response only acknowledges the request. The
//! generated diagram arrives later through the registry listing, never in
//! the submission response body.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::StatusCode;
use url::Url;

/// Binary file attached to a generation request (typically a PDF whose
/// contents describe the process to diagram).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub file_name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl Attachment {
    pub fn pdf(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            mime: "application/pdf".to_string(),
            bytes,
        }
    }
}

/// A user-submitted prompt/attachment/contact bundle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationRequest {
    /// May be empty when an attachment carries the process description.
    pub prompt: String,
    /// Address the generated diagram is delivered to. Required.
    pub contact: String,
    pub attachment: Option<Attachment>,
}

impl GenerationRequest {
    /// Client-side preconditions, checked before any network call:
    /// prompt/attachment first, contact address second.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.prompt.trim().is_empty() && self.attachment.is_none() {
            return Err(ValidationError::EmptyPrompt);
        }
        if self.contact.trim().is_empty() {
            return Err(ValidationError::MissingContact);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("write a prompt or attach a PDF before requesting a diagram")]
    EmptyPrompt,
    #[error("a contact address is required so the generated diagram can be delivered")]
    MissingContact,
}

/// The remote call failed: non-200 status, transport failure, or an
/// unusable request part.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct SubmissionError {
    message: String,
}

impl SubmissionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Prefers the remote-provided `message` JSON field, then the raw body
    /// text, then a generic fallback.
    fn from_response(status: StatusCode, body: &str) -> Self {
        if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
            if let Some(message) = value.get("message").and_then(|m| m.as_str()) {
                return Self::new(message);
            }
        }
        let body = body.trim();
        if !body.is_empty() {
            return Self::new(body);
        }
        Self::new(format!("diagram generation request failed (HTTP {status})"))
    }

    fn from_transport(err: reqwest::Error) -> Self {
        Self::new(err.to_string())
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum SubmitError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Submission(#[from] SubmissionError),
}

/// The single multipart POST beneath [`GenerationClient`]. Production uses
/// [`HttpGenerationTransport`]; tests count and script calls here.
#[async_trait]
pub trait GenerationTransport: Send + Sync {
    async fn post(&self, request: &GenerationRequest) -> Result<(), SubmissionError>;
}

/// Validates, then performs exactly one transport call per submission.
pub struct GenerationClient {
    transport: Arc<dyn GenerationTransport>,
}

impl GenerationClient {
    pub fn new(transport: Arc<dyn GenerationTransport>) -> Self {
        Self { transport }
    }

    pub async fn submit(&self, request: &GenerationRequest) -> Result<(), SubmitError> {
        request.validate()?;
        self.transport.post(request).await?;
        Ok(())
    }
}

/// Multipart POST to the generation endpoint: fields `prompt`, `email`, and
/// an optional `file` part. Success is exactly HTTP 200.
pub struct HttpGenerationTransport {
    http: reqwest::Client,
    endpoint: Url,
}

impl HttpGenerationTransport {
    pub fn new(http: reqwest::Client, endpoint: Url) -> Self {
        Self { http, endpoint }
    }
}

#[async_trait]
impl GenerationTransport for HttpGenerationTransport {
    async fn post(&self, request: &GenerationRequest) -> Result<(), SubmissionError> {
        let mut form = reqwest::multipart::Form::new()
            .text("prompt", request.prompt.trim().to_string())
            .text("email", request.contact.trim().to_string());
        if let Some(attachment) = &request.attachment {
            let part = reqwest::multipart::Part::bytes(attachment.bytes.clone())
                .file_name(attachment.file_name.clone())
                .mime_str(&attachment.mime)
                .map_err(|_| {
                    SubmissionError::new(format!(
                        "attachment has an invalid content type: {}",
                        attachment.mime
                    ))
                })?;
            form = form.part("file", part);
        }

        let response = self
            .http
            .post(self.endpoint.clone())
            .multipart(form)
            .send()
            .await
            .map_err(SubmissionError::from_transport)?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(SubmissionError::from_response(status, &body));
        }
        Ok(())
    }
}
