use serde_json::Value;

use super::Tool;
use crate::documents::{FileSource, UploadReceipt, UploadRequest};
use crate::error::ToolError;
use crate::ocr_client::HandwritingOcrClient;
use crate::protocol::ToolDefinition;

/// Uploads a document for transcription.
pub struct UploadDocument {
    client: HandwritingOcrClient,
}

impl UploadDocument {
    pub fn new(client: HandwritingOcrClient) -> Self {
        Self { client }
    }

    fn parse_delete_after(arguments: &Value) -> Result<Option<u64>, ToolError> {
        match arguments.get("delete_after") {
            None | Some(Value::Null) => Ok(None),
            Some(value) => {
                let seconds = value.as_u64().ok_or_else(|| {
                    ToolError::argument("delete_after must be a non-negative integer number of seconds")
                })?;
                // Zero means "not set"
                Ok(Some(seconds).filter(|s| *s > 0))
            }
        }
    }
}

#[async_trait::async_trait]
impl Tool for UploadDocument {
    type Input = UploadRequest;
    type Output = UploadReceipt;

    const NAME: &'static str = "upload_document";

    fn parse_input(arguments: &Value) -> Result<UploadRequest, ToolError> {
        let file = match arguments.get("file") {
            None | Some(Value::Null) => return Err(ToolError::argument("File is required")),
            Some(Value::String(path)) if path.is_empty() => {
                return Err(ToolError::argument("File is required"))
            }
            Some(file) => file,
        };

        let source: FileSource = serde_json::from_value(file.clone()).map_err(|_| {
            ToolError::argument("file must be a path or an object with data and name")
        })?;

        // Accepted for compatibility, never sent to the API
        for ignored in ["extractor_id", "prompt_id"] {
            if let Some(value) = arguments.get(ignored).filter(|v| !v.is_null()) {
                log::debug!("upload_document: ignoring {}={}", ignored, value);
            }
        }

        Ok(UploadRequest {
            source,
            delete_after: Self::parse_delete_after(arguments)?,
        })
    }

    fn definition() -> ToolDefinition {
        ToolDefinition {
            name: Self::NAME.to_string(),
            description: "Upload a document to Handwriting OCR API for transcription".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "file": {
                        "description": "Path to the document (PDF, JPG, PNG, etc.), or an attachment object with data and name",
                        "oneOf": [
                            { "type": "string" },
                            {
                                "type": "object",
                                "properties": {
                                    "data": { "description": "Raw file bytes" },
                                    "name": { "type": "string", "description": "File name" }
                                },
                                "required": ["data", "name"]
                            }
                        ]
                    },
                    "delete_after": {
                        "type": "integer",
                        "description": "Seconds until auto-deletion (optional)"
                    },
                    "extractor_id": {
                        "type": "string",
                        "description": "Extractor ID (required if action is extractor, will be ignored)"
                    },
                    "prompt_id": {
                        "type": "string",
                        "description": "Prompt ID (requires Enterprise subscription, will be ignored)"
                    }
                },
                "required": ["file"]
            }),
        }
    }

    async fn run(&self, input: UploadRequest) -> Result<UploadReceipt, ToolError> {
        let file = input.source.resolve().await?;
        let receipt = self.client.upload_document(file, input.delete_after).await?;
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::documents::InlineData;
    use serde_json::json;
    use std::path::PathBuf;

    #[test]
    fn test_missing_file() {
        for args in [json!({}), json!(null), json!({"file": null}), json!({"file": ""})] {
            let err = UploadDocument::parse_input(&args).unwrap_err();
            assert_eq!(err.to_string(), "File is required");
        }
    }

    #[test]
    fn test_path_and_delete_after() {
        let args = json!({"file": "/tmp/a.pdf", "delete_after": 600});
        let request = UploadDocument::parse_input(&args).unwrap();
        assert_eq!(request.source, FileSource::Path(PathBuf::from("/tmp/a.pdf")));
        assert_eq!(request.delete_after, Some(600));
    }

    #[test]
    fn test_zero_delete_after_is_omitted() {
        let args = json!({"file": "/tmp/a.pdf", "delete_after": 0});
        let request = UploadDocument::parse_input(&args).unwrap();
        assert_eq!(request.delete_after, None);
    }

    #[test]
    fn test_invalid_delete_after() {
        for bad in [json!(-5), json!(1.5), json!("soon")] {
            let args = json!({"file": "/tmp/a.pdf", "delete_after": bad});
            let err = UploadDocument::parse_input(&args).unwrap_err();
            assert!(matches!(err, ToolError::Argument(_)));
        }
    }

    #[test]
    fn test_inline_file_and_ignored_ids() {
        let args = json!({
            "file": {"data": [1, 2, 3], "name": "x.png"},
            "extractor_id": "ext-1",
            "prompt_id": "p-1"
        });
        let request = UploadDocument::parse_input(&args).unwrap();
        assert_eq!(
            request.source,
            FileSource::Inline {
                data: InlineData::Bytes(vec![1, 2, 3]),
                name: "x.png".to_string()
            }
        );
        assert_eq!(request.delete_after, None);
    }

    #[test]
    fn test_malformed_file_object() {
        let err = UploadDocument::parse_input(&json!({"file": {"name": "x.png"}})).unwrap_err();
        assert!(matches!(err, ToolError::Argument(_)));
    }
}
