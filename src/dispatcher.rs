use serde::Serialize;
use serde_json::Value;

use crate::config::Config;
use crate::error::ToolError;
use crate::ocr_client::HandwritingOcrClient;
use crate::protocol::ToolDefinition;
use crate::tools::{CheckStatus, GetText, Tool, UploadDocument};

/// Tools served by the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolName {
    UploadDocument,
    CheckStatus,
    GetText,
}

impl ToolName {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "upload_document" => Some(ToolName::UploadDocument),
            "check_status" => Some(ToolName::CheckStatus),
            "get_text" => Some(ToolName::GetText),
            _ => None,
        }
    }
}

/// Schemas of every served tool, in listing order.
pub fn definitions() -> Vec<ToolDefinition> {
    vec![
        UploadDocument::definition(),
        CheckStatus::definition(),
        GetText::definition(),
    ]
}

struct Toolbox {
    upload_document: UploadDocument,
    check_status: CheckStatus,
    get_text: GetText,
}

impl Toolbox {
    fn new(client: HandwritingOcrClient) -> Self {
        Self {
            upload_document: UploadDocument::new(client.clone()),
            check_status: CheckStatus::new(client.clone()),
            get_text: GetText::new(client),
        }
    }
}

/// Routes tool calls to the Handwriting OCR API.
///
/// Built once from an immutable [`Config`]. Without a token every known tool
/// fails with [`ToolError::Configuration`] before touching the network.
pub struct Dispatcher {
    toolbox: Option<Toolbox>,
}

impl Dispatcher {
    pub fn new(config: &Config) -> Self {
        if !config.has_token() {
            log::warn!("API_TOKEN is not set; tool calls will fail until it is configured");
        }

        let toolbox = config
            .api
            .token
            .clone()
            .map(|token| Toolbox::new(HandwritingOcrClient::new(&config.api.base_url, token)));

        Self { toolbox }
    }

    /// Invoke a tool and return the text content of its result.
    ///
    /// Single exit edge for tool failures: upstream errors are logged here
    /// and surface with the `Handwriting OCR API error:` prefix.
    pub async fn call(&self, name: &str, arguments: Value) -> Result<String, ToolError> {
        log::info!("Tool call: {}", name);

        let result = self.dispatch(name, arguments).await;
        match &result {
            Ok(_) => log::info!("Tool {} completed", name),
            Err(ToolError::Upstream(e)) => log::error!("[API Error] {}: {}", name, e),
            Err(e) => log::warn!("Tool {} rejected: {}", name, e),
        }
        result
    }

    async fn dispatch(&self, name: &str, arguments: Value) -> Result<String, ToolError> {
        let tool = ToolName::from_name(name)
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;
        let toolbox = self.toolbox.as_ref().ok_or(ToolError::Configuration)?;

        match tool {
            ToolName::UploadDocument => {
                let input = UploadDocument::parse_input(&arguments)?;
                let receipt = toolbox.upload_document.run(input).await?;
                to_json(&receipt)
            }
            ToolName::CheckStatus => {
                let id = CheckStatus::parse_input(&arguments)?;
                let status = toolbox.check_status.run(id).await?;
                to_json(&status)
            }
            ToolName::GetText => {
                let id = GetText::parse_input(&arguments)?;
                let document = toolbox.get_text.run(id).await?;
                log::debug!("get_text: document {} has {} bytes of text", document.id, document.text.len());
                Ok(document.text)
            }
        }
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<String, ToolError> {
    serde_json::to_string(value).map_err(ToolError::Encode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ApiToken;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer, token: Option<&str>) -> Config {
        let mut config = Config::default().with_base_url(format!("{}/api/v3", server.uri()));
        config.api.token = token.and_then(ApiToken::new);
        config
    }

    #[test]
    fn test_definitions_match_tool_names() {
        let defs = definitions();
        let names: Vec<&str> = defs.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["upload_document", "check_status", "get_text"]);
        for name in names {
            assert!(ToolName::from_name(name).is_some());
        }
        assert_eq!(defs[0].input_schema["required"], json!(["file"]));
        assert_eq!(defs[1].input_schema["required"], json!(["id"]));
    }

    #[tokio::test]
    async fn test_missing_token_fails_before_network() {
        let server = MockServer::start().await;
        let dispatcher = Dispatcher::new(&config_for(&server, None));

        let calls = [
            ("upload_document", json!({"file": "/tmp/whatever.pdf"})),
            ("check_status", json!({"id": "doc-1"})),
            ("get_text", json!({"id": "doc-1"})),
        ];
        for (name, args) in calls {
            let err = dispatcher.call(name, args).await.unwrap_err();
            assert!(matches!(err, ToolError::Configuration), "{}: {:?}", name, err);
        }

        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_arguments_fail_before_network() {
        let server = MockServer::start().await;
        let dispatcher = Dispatcher::new(&config_for(&server, Some("tok")));

        for name in ["upload_document", "check_status", "get_text"] {
            let err = dispatcher.call(name, json!({})).await.unwrap_err();
            assert!(matches!(err, ToolError::Argument(_)), "{}: {:?}", name, err);
        }

        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_tool_regardless_of_token() {
        let server = MockServer::start().await;
        for token in [None, Some("tok")] {
            let dispatcher = Dispatcher::new(&config_for(&server, token));
            let err = dispatcher.call("delete_document", json!({})).await.unwrap_err();
            assert_eq!(err.to_string(), "Unknown tool: delete_document");
        }
    }

    #[tokio::test]
    async fn test_unknown_id_surfaces_remote_text() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v3/documents/nope"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "message": "No query results for model [App\\Models\\Document]."
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v3/documents/nope.txt"))
            .respond_with(ResponseTemplate::new(404).set_body_string("Document not found"))
            .mount(&server)
            .await;

        let dispatcher = Dispatcher::new(&config_for(&server, Some("tok")));

        let err = dispatcher.call("check_status", json!({"id": "nope"})).await.unwrap_err();
        let message = err.to_string();
        assert!(message.starts_with("Handwriting OCR API error: "));
        assert!(message.contains("No query results"));

        let err = dispatcher.call("get_text", json!({"id": "nope"})).await.unwrap_err();
        assert!(matches!(err, ToolError::Upstream(_)));
        assert!(err.to_string().contains("Document not found"));
    }

    #[tokio::test]
    async fn test_upload_poll_and_fetch_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v3/documents"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "id": "k3j4",
                "status": "processing",
                "file_name": "sample.jpg"
            })))
            .expect(1)
            .mount(&server)
            .await;
        // First poll still processing, later polls finished
        Mock::given(method("GET"))
            .and(path("/api/v3/documents/k3j4"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "k3j4",
                "file_name": "sample.jpg",
                "action": "transcribe",
                "page_count": 1,
                "status": "processing",
                "created_at": "2024-05-01T10:00:00.000000Z",
                "updated_at": "2024-05-01T10:00:00.000000Z"
            })))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v3/documents/k3j4"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "k3j4",
                "file_name": "sample.jpg",
                "action": "transcribe",
                "page_count": 1,
                "status": "processed",
                "created_at": "2024-05-01T10:00:00.000000Z",
                "updated_at": "2024-05-01T10:00:07.000000Z"
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v3/documents/k3j4.txt"))
            .respond_with(ResponseTemplate::new(200).set_body_string("Shopping list\n- eggs\n- milk"))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("sample.jpg");
        std::fs::write(&file, [0xff, 0xd8, 0xff, 0xe0]).unwrap();

        let dispatcher = Dispatcher::new(&config_for(&server, Some("tok")));

        let uploaded = dispatcher
            .call("upload_document", json!({"file": file.to_str().unwrap()}))
            .await
            .unwrap();
        let uploaded: Value = serde_json::from_str(&uploaded).unwrap();
        assert_eq!(uploaded, json!({"id": "k3j4", "status": "processing"}));

        let mut polls = 0;
        loop {
            polls += 1;
            let status = dispatcher.call("check_status", json!({"id": "k3j4"})).await.unwrap();
            let status: Value = serde_json::from_str(&status).unwrap();
            assert_eq!(status["page_count"], 1);
            if status["status"] == "processed" || status["status"] == "failed" {
                assert_eq!(status["status"], "processed");
                assert_eq!(status["updated_at"], "2024-05-01T10:00:07.000000Z");
                break;
            }
            assert!(polls < 5, "document never reached a terminal status");
        }
        assert_eq!(polls, 2);

        let text = dispatcher.call("get_text", json!({"id": "k3j4"})).await.unwrap();
        assert_eq!(text, "Shopping list\n- eggs\n- milk");
    }
}
