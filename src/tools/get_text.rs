use serde_json::Value;

use super::{document_id, id_schema, Tool};
use crate::documents::DocumentText;
use crate::error::ToolError;
use crate::ocr_client::HandwritingOcrClient;
use crate::protocol::ToolDefinition;

/// Retrieves the transcribed text of a document.
pub struct GetText {
    client: HandwritingOcrClient,
}

impl GetText {
    pub fn new(client: HandwritingOcrClient) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl Tool for GetText {
    type Input = String;
    type Output = DocumentText;

    const NAME: &'static str = "get_text";

    fn parse_input(arguments: &Value) -> Result<String, ToolError> {
        document_id(arguments)
    }

    fn definition() -> ToolDefinition {
        ToolDefinition {
            name: Self::NAME.to_string(),
            description: "Retrieve the transcribed text from a document".to_string(),
            input_schema: id_schema(),
        }
    }

    async fn run(&self, id: String) -> Result<DocumentText, ToolError> {
        Ok(self.client.document_text(&id).await?)
    }
}
