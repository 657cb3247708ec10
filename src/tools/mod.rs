pub mod check_status;
pub mod get_text;
pub mod upload_document;

pub use check_status::CheckStatus;
pub use get_text::GetText;
pub use upload_document::UploadDocument;

use serde_json::Value;

use crate::error::ToolError;
use crate::protocol::ToolDefinition;

/// Tool trait for protocol-invoked operations.
///
/// Not object-safe (associated types).
/// The dispatcher calls tools by concrete type, not `dyn Tool`.
#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    const NAME: &'static str;

    type Input: Send;
    type Output: Send;

    fn definition() -> ToolDefinition;

    /// Validate the raw argument bag. Runs before any network call.
    fn parse_input(arguments: &Value) -> Result<Self::Input, ToolError>;

    async fn run(&self, input: Self::Input) -> Result<Self::Output, ToolError>;
}

/// Extract the `id` argument shared by the read-only tools.
///
/// Numbers are accepted and rendered in decimal.
pub(crate) fn document_id(arguments: &Value) -> Result<String, ToolError> {
    match arguments.get("id") {
        Some(Value::String(id)) if !id.trim().is_empty() => Ok(id.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        _ => Err(ToolError::argument("Document ID is required")),
    }
}

pub(crate) fn id_schema() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "id": {
                "type": "string",
                "description": "Document ID"
            }
        },
        "required": ["id"]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_document_id_accepts_strings_and_numbers() {
        assert_eq!(document_id(&json!({"id": "abc"})).unwrap(), "abc");
        assert_eq!(document_id(&json!({"id": 42})).unwrap(), "42");
    }

    #[test]
    fn test_document_id_missing_or_blank() {
        for args in [json!({}), json!(null), json!({"id": ""}), json!({"id": "  "}), json!({"id": null})] {
            let err = document_id(&args).unwrap_err();
            assert_eq!(err.to_string(), "Document ID is required");
        }
    }
}
