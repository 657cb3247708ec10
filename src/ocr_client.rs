use reqwest::header::ACCEPT;
use reqwest::multipart::{Form, Part};
use reqwest::{Response, Url};

use crate::config::ApiToken;
use crate::documents::{DocumentFile, DocumentStatus, DocumentText, UploadReceipt};
use crate::error::ApiError;

/// HTTP client for the Handwriting OCR v3 API.
#[derive(Clone)]
pub struct HandwritingOcrClient {
    base_url: String,
    token: ApiToken,
    client: reqwest::Client,
}

impl HandwritingOcrClient {
    pub fn new(base_url: impl Into<String>, token: ApiToken) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            token,
            client: reqwest::Client::new(),
        }
    }

    fn documents_url(&self) -> String {
        format!("{}/documents", self.base_url)
    }

    /// `{base}/documents/{id}{suffix}` with the id escaped as one path segment.
    fn document_url(&self, id: &str, suffix: &str) -> Result<Url, ApiError> {
        let invalid = |detail: String| ApiError::InvalidUrl(format!("{}: {}", self.base_url, detail));

        let mut url = Url::parse(&self.documents_url()).map_err(|e| invalid(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| invalid("cannot be a base".to_string()))?
            .push(&format!("{}{}", id, suffix));
        Ok(url)
    }

    /// Create a document with `action=transcribe`.
    pub async fn upload_document(
        &self,
        file: DocumentFile,
        delete_after: Option<u64>,
    ) -> Result<UploadReceipt, ApiError> {
        log::info!(
            "Uploading {} ({} bytes) for transcription",
            file.name,
            file.bytes.len()
        );

        let mime = file.mime_type();
        let part = Part::bytes(file.bytes)
            .file_name(file.name)
            .mime_str(mime.as_ref())?;

        let mut form = Form::new()
            .part("file", part)
            .text("action", "transcribe");

        if let Some(seconds) = delete_after {
            form = form.text("delete_after", seconds.to_string());
        }

        let response = self.client
            .post(self.documents_url())
            .bearer_auth(self.token.expose())
            .header(ACCEPT, "application/json")
            .multipart(form)
            .send()
            .await?;

        let body = Self::success_body(response).await?;
        let receipt = UploadReceipt::from_body(&body)?;

        log::info!(
            "Document {} created ({})",
            receipt.0.id(),
            receipt.0.state().map(|s| s.to_string()).unwrap_or_default()
        );
        Ok(receipt)
    }

    /// Fetch the processing status of a document.
    pub async fn document_status(&self, id: &str) -> Result<DocumentStatus, ApiError> {
        log::debug!("Fetching status of document {}", id);

        let response = self.client
            .get(self.document_url(id, "")?)
            .bearer_auth(self.token.expose())
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        let body = Self::success_body(response).await?;
        Ok(DocumentStatus::from_body(&body)?)
    }

    /// Fetch the plain-text export of a document. The body is not parsed.
    pub async fn document_text(&self, id: &str) -> Result<DocumentText, ApiError> {
        log::debug!("Fetching text of document {}", id);

        let response = self.client
            .get(self.document_url(id, ".txt")?)
            .bearer_auth(self.token.expose())
            .header(ACCEPT, "text/plain")
            .send()
            .await?;

        let text = Self::success_body(response).await?;
        log::info!("Document {}: received {} characters of text", id, text.len());

        Ok(DocumentText {
            id: id.to_string(),
            text,
        })
    }

    async fn success_body(response: Response) -> Result<String, ApiError> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(ApiError::Status {
                status,
                message: error_message(status, &body),
            });
        }

        Ok(body)
    }
}

/// Pull the remote error text out of an error body.
///
/// Prefers a JSON `message` or `error` field, then the raw body, then the
/// status reason.
fn error_message(status: reqwest::StatusCode, body: &str) -> String {
    if let Ok(json) = serde_json::from_str::<serde_json::Value>(body) {
        let field = json["message"]
            .as_str()
            .or_else(|| json["error"].as_str())
            .or_else(|| json["error"]["message"].as_str());
        if let Some(message) = field {
            return message.to_string();
        }
    }

    let body = body.trim();
    if body.is_empty() {
        status.canonical_reason().unwrap_or("no response body").to_string()
    } else {
        body.to_string()
    }
}
