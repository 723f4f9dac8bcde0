//! Client for a Gemini-compatible `generateContent` endpoint

use crate::error::{Error, Result};
use crate::model::{
    BoxFuture, GenerateRequest, GenerateResponse, GenerativeModel, Message, Part, Role,
};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// Connection settings for the hosted model
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// e.g. `https://generativelanguage.googleapis.com/v1beta`
    pub base_url: String,
    /// e.g. `gemini-1.5-flash`
    pub model: String,
    pub api_key: String,
    pub timeout: Duration,
}

/// Hosted generative model over HTTP
pub struct GeminiClient {
    client: Client,
    config: GeminiConfig,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }

    async fn call(&self, request: &GenerateRequest) -> Result<GenerateResponse> {
        let body = WireRequest::from_request(request);
        debug!(
            model = %self.config.model,
            messages = request.messages.len(),
            tools = request.tools.len(),
            "calling model"
        );

        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", self.config.api_key.as_str())])
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "model call failed");
            return Err(Error::Provider {
                status: status.as_u16(),
                body,
            });
        }

        let wire: WireResponse = response.json().await?;
        wire.into_response()
    }
}

impl GenerativeModel for GeminiClient {
    fn generate<'a>(&'a self, request: &'a GenerateRequest) -> BoxFuture<'a, Result<GenerateResponse>> {
        Box::pin(self.call(request))
    }
}

// Wire format

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireRequest {
    contents: Vec<WireContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<WireContent>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireTools>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<WireGenerationConfig>,
}

#[derive(Debug, Serialize, Deserialize, Default)]
struct WireContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<WirePart>,
}

#[derive(Debug, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct WirePart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    function_call: Option<WireFunctionCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    function_response: Option<WireFunctionResponse>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireFunctionCall {
    name: String,
    #[serde(default)]
    args: Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireFunctionResponse {
    name: String,
    response: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireTools {
    function_declarations: Vec<WireFunctionDeclaration>,
}

#[derive(Debug, Serialize)]
struct WireFunctionDeclaration {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    #[serde(default)]
    candidates: Vec<WireCandidate>,
}

#[derive(Debug, Deserialize)]
struct WireCandidate {
    #[serde(default)]
    content: WireContent,
}

impl WireRequest {
    fn from_request(request: &GenerateRequest) -> Self {
        let contents = request.messages.iter().map(WireContent::from_message).collect();

        let system_instruction = request.system.as_ref().map(|s| WireContent {
            role: None,
            parts: vec![WirePart {
                text: Some(s.clone()),
                ..Default::default()
            }],
        });

        let tools = if request.tools.is_empty() {
            Vec::new()
        } else {
            vec![WireTools {
                function_declarations: request
                    .tools
                    .iter()
                    .map(|t| WireFunctionDeclaration {
                        name: t.name.clone(),
                        description: t.description.clone(),
                        parameters: t.parameters.clone(),
                    })
                    .collect(),
            }]
        };

        let generation_config =
            if request.temperature.is_some() || request.response_schema.is_some() {
                Some(WireGenerationConfig {
                    temperature: request.temperature,
                    response_mime_type: request
                        .response_schema
                        .as_ref()
                        .map(|_| "application/json".to_string()),
                    response_schema: request.response_schema.clone(),
                })
            } else {
                None
            };

        Self {
            contents,
            system_instruction,
            tools,
            generation_config,
        }
    }
}

impl WireContent {
    fn from_message(message: &Message) -> Self {
        let role = match message.role {
            Role::User => "user",
            Role::Model => "model",
        };
        let parts = message
            .parts
            .iter()
            .map(|part| match part {
                Part::Text(text) => WirePart {
                    text: Some(text.clone()),
                    ..Default::default()
                },
                Part::FunctionCall { name, args } => WirePart {
                    function_call: Some(WireFunctionCall {
                        name: name.clone(),
                        args: args.clone(),
                    }),
                    ..Default::default()
                },
                Part::FunctionResponse { name, response } => WirePart {
                    function_response: Some(WireFunctionResponse {
                        name: name.clone(),
                        response: response.clone(),
                    }),
                    ..Default::default()
                },
            })
            .collect();
        Self {
            role: Some(role.to_string()),
            parts,
        }
    }
}

impl WireResponse {
    fn into_response(self) -> Result<GenerateResponse> {
        let candidate = self
            .candidates
            .into_iter()
            .next()
            .ok_or(Error::EmptyResponse)?;

        let parts: Vec<Part> = candidate
            .content
            .parts
            .into_iter()
            .filter_map(|p| {
                if let Some(call) = p.function_call {
                    Some(Part::FunctionCall {
                        name: call.name,
                        args: call.args,
                    })
                } else {
                    p.text.map(Part::Text)
                }
            })
            .collect();

        if parts.is_empty() {
            return Err(Error::EmptyResponse);
        }
        Ok(GenerateResponse { parts })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ToolDeclaration;
    use serde_json::json;

    #[test]
    fn test_request_wire_shape() {
        let request = GenerateRequest {
            system: Some("You are a clinic assistant.".to_string()),
            messages: vec![
                Message::user("Hi"),
                Message::function_response("notify_human", json!({"status": "notified"})),
            ],
            tools: vec![ToolDeclaration {
                name: "notify_human".to_string(),
                description: "Escalate".to_string(),
                parameters: json!({"type": "object"}),
            }],
            response_schema: None,
            temperature: Some(0.2),
        };

        let wire = serde_json::to_value(WireRequest::from_request(&request)).unwrap();
        assert_eq!(wire["systemInstruction"]["parts"][0]["text"], "You are a clinic assistant.");
        assert_eq!(wire["contents"][0]["role"], "user");
        assert_eq!(wire["contents"][0]["parts"][0]["text"], "Hi");
        assert_eq!(
            wire["contents"][1]["parts"][0]["functionResponse"]["name"],
            "notify_human"
        );
        assert_eq!(
            wire["tools"][0]["functionDeclarations"][0]["name"],
            "notify_human"
        );
        assert!(wire["generationConfig"].get("responseMimeType").is_none());
    }

    #[test]
    fn test_schema_requests_json_output() {
        let request = GenerateRequest {
            messages: vec![Message::user("plan")],
            response_schema: Some(json!({"type": "object"})),
            ..Default::default()
        };
        let wire = serde_json::to_value(WireRequest::from_request(&request)).unwrap();
        assert_eq!(wire["generationConfig"]["responseMimeType"], "application/json");
        assert!(wire.get("tools").is_none());
    }

    #[test]
    fn test_response_parsing() {
        let wire: WireResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [
                        {"text": "One moment."},
                        {"functionCall": {"name": "notify_human", "args": {"reason": "bleeding"}}}
                    ]
                },
                "finishReason": "STOP"
            }]
        }))
        .unwrap();
        let response = wire.into_response().unwrap();
        assert_eq!(response.joined_text(), "One moment.");
        assert_eq!(response.calls()[0].0, "notify_human");
    }

    #[test]
    fn test_empty_candidates() {
        let wire: WireResponse = serde_json::from_value(json!({"candidates": []})).unwrap();
        assert!(matches!(wire.into_response(), Err(Error::EmptyResponse)));
    }
}
