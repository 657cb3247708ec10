use mime_guess::Mime;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::ToolError;

/// Where the bytes of an upload come from.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum FileSource {
    /// Local path readable by the server process
    Path(PathBuf),
    /// Attachment data sent with the call
    Inline { data: InlineData, name: String },
}

/// Inline attachment payload.
///
/// Accepts a byte array, a string (its UTF-8 bytes), or a serialized
/// `{"type": "Buffer", "data": [...]}` object.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum InlineData {
    Bytes(Vec<u8>),
    Text(String),
    Buffer { data: Vec<u8> },
}

impl InlineData {
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            InlineData::Bytes(bytes) | InlineData::Buffer { data: bytes } => bytes,
            InlineData::Text(text) => text.into_bytes(),
        }
    }
}

/// A file ready to be sent: raw bytes plus the name reported to the API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl DocumentFile {
    /// Content type for the multipart part, inferred from the file extension.
    pub fn mime_type(&self) -> Mime {
        mime_guess::from_path(&self.name).first_or_octet_stream()
    }
}

impl FileSource {
    /// Read the bytes and derive the display name.
    pub async fn resolve(self) -> Result<DocumentFile, ToolError> {
        match self {
            FileSource::Path(path) => {
                let bytes = tokio::fs::read(&path).await.map_err(|e| {
                    ToolError::argument(format!("Failed to read file {}: {}", path.display(), e))
                })?;
                Ok(DocumentFile {
                    name: file_name_of(&path),
                    bytes,
                })
            }
            FileSource::Inline { data, name } => Ok(DocumentFile {
                name,
                bytes: data.into_bytes(),
            }),
        }
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "document".to_string())
}

/// Arguments of an upload after validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub source: FileSource,
    /// Seconds until the remote copy is deleted; always positive when set
    pub delete_after: Option<u64>,
}

/// Processing state reported by the API.
///
/// Unknown states are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentState {
    New,
    Processing,
    Processed,
    Failed,
    Other(String),
}

impl DocumentState {
    pub fn as_str(&self) -> &str {
        match self {
            DocumentState::New => "new",
            DocumentState::Processing => "processing",
            DocumentState::Processed => "processed",
            DocumentState::Failed => "failed",
            DocumentState::Other(s) => s.as_str(),
        }
    }

    /// No further transitions will happen.
    pub fn is_terminal(&self) -> bool {
        matches!(self, DocumentState::Processed | DocumentState::Failed)
    }
}

impl From<String> for DocumentState {
    fn from(s: String) -> Self {
        match s.as_str() {
            "new" => DocumentState::New,
            "processing" => DocumentState::Processing,
            "processed" => DocumentState::Processed,
            "failed" => DocumentState::Failed,
            _ => DocumentState::Other(s),
        }
    }
}

impl fmt::Display for DocumentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Keys of an API response object, re-emitted exactly as received.
///
/// A key missing from the response stays missing; a present key keeps its
/// JSON value, `null` included.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RemoteFields(Map<String, Value>);

impl RemoteFields {
    fn pick(body: &str, keys: &[&str]) -> Result<Self, serde_json::Error> {
        let mut object: Map<String, Value> = serde_json::from_str(body)?;
        Ok(Self(
            keys.iter()
                .filter_map(|key| object.remove(*key).map(|value| (key.to_string(), value)))
                .collect(),
        ))
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Document id for log lines.
    pub fn id(&self) -> String {
        match self.get("id") {
            Some(Value::String(id)) => id.clone(),
            Some(other) => other.to_string(),
            None => "<unknown>".to_string(),
        }
    }

    /// Processing state, when the response reports one as a string.
    pub fn state(&self) -> Option<DocumentState> {
        self.get("status")
            .and_then(Value::as_str)
            .map(|s| DocumentState::from(s.to_string()))
    }
}

/// `{id, status}` from the create-document response.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct UploadReceipt(pub RemoteFields);

impl UploadReceipt {
    pub const FIELDS: [&'static str; 2] = ["id", "status"];

    pub fn from_body(body: &str) -> Result<Self, serde_json::Error> {
        RemoteFields::pick(body, &Self::FIELDS).map(Self)
    }
}

/// Status fields of a document as reported by the API.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct DocumentStatus(pub RemoteFields);

impl DocumentStatus {
    pub const FIELDS: [&'static str; 7] = [
        "id",
        "file_name",
        "action",
        "page_count",
        "status",
        "created_at",
        "updated_at",
    ];

    pub fn from_body(body: &str) -> Result<Self, serde_json::Error> {
        RemoteFields::pick(body, &Self::FIELDS).map(Self)
    }
}

/// Transcription text, exactly as exported by the API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentText {
    pub id: String,
    pub text: String,
}
