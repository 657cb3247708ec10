use serde_json::Value;

use super::{document_id, id_schema, Tool};
use crate::documents::DocumentStatus;
use crate::error::ToolError;
use crate::ocr_client::HandwritingOcrClient;
use crate::protocol::ToolDefinition;

/// Reports the processing status of a document.
pub struct CheckStatus {
    client: HandwritingOcrClient,
}

impl CheckStatus {
    pub fn new(client: HandwritingOcrClient) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl Tool for CheckStatus {
    type Input = String;
    type Output = DocumentStatus;

    const NAME: &'static str = "check_status";

    fn parse_input(arguments: &Value) -> Result<String, ToolError> {
        document_id(arguments)
    }

    fn definition() -> ToolDefinition {
        ToolDefinition {
            name: Self::NAME.to_string(),
            description: "Check the status of a document".to_string(),
            input_schema: id_schema(),
        }
    }

    async fn run(&self, id: String) -> Result<DocumentStatus, ToolError> {
        let status = self.client.document_status(&id).await?;
        match status.0.state() {
            Some(state) if state.is_terminal() => {
                log::info!("CheckStatus: document {} finished ({})", id, state)
            }
            Some(state) => log::info!("CheckStatus: document {} is {}", id, state),
            None => log::warn!("CheckStatus: document {} reported no status", id),
        }
        Ok(status)
    }
}
