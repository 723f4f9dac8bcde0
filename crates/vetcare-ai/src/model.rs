//! Provider-neutral request/response types and the model seam.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;

/// Boxed future returned by [`GenerativeModel`] implementations.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Model,
}

/// One piece of a message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Part {
    Text(String),
    FunctionCall { name: String, args: Value },
    FunctionResponse { name: String, response: Value },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub parts: Vec<Part>,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            parts: vec![Part::Text(text.into())],
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            parts: vec![Part::Text(text.into())],
        }
    }

    /// Result of a tool call, sent back on the user side of the conversation
    pub fn function_response(name: impl Into<String>, response: Value) -> Self {
        Self::function_responses([(name.into(), response)])
    }

    /// Results for every call of one model turn, in call order
    pub fn function_responses(results: impl IntoIterator<Item = (String, Value)>) -> Self {
        Self {
            role: Role::User,
            parts: results
                .into_iter()
                .map(|(name, response)| Part::FunctionResponse { name, response })
                .collect(),
        }
    }
}

/// A callable the model may invoke
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDeclaration {
    pub name: String,
    pub description: String,
    /// JSON schema of the arguments
    pub parameters: Value,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerateRequest {
    pub system: Option<String>,
    pub messages: Vec<Message>,
    pub tools: Vec<ToolDeclaration>,
    /// When set, the model must answer with JSON matching this schema
    pub response_schema: Option<Value>,
    pub temperature: Option<f32>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerateResponse {
    pub parts: Vec<Part>,
}

impl GenerateResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            parts: vec![Part::Text(text.into())],
        }
    }

    pub fn function_call(name: impl Into<String>, args: Value) -> Self {
        Self {
            parts: vec![Part::FunctionCall {
                name: name.into(),
                args,
            }],
        }
    }

    /// All text parts joined together
    pub fn joined_text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                Part::Text(t) => Some(t.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("")
    }

    /// Function calls in the order the model made them
    pub fn calls(&self) -> Vec<(&str, &Value)> {
        self.parts
            .iter()
            .filter_map(|p| match p {
                Part::FunctionCall { name, args } => Some((name.as_str(), args)),
                _ => None,
            })
            .collect()
    }

    /// Parse the text as JSON, tolerating a surrounding code fence
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        let text = self.joined_text();
        let trimmed = strip_fence(text.trim());
        if trimmed.is_empty() {
            return Err(Error::EmptyResponse);
        }
        serde_json::from_str(trimmed).map_err(|e| Error::MalformedOutput(e.to_string()))
    }
}

fn strip_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// A hosted generative model
pub trait GenerativeModel: Send + Sync {
    fn generate<'a>(&'a self, request: &'a GenerateRequest) -> BoxFuture<'a, Result<GenerateResponse>>;
}

/// Plays back canned responses in order and records every request.
///
/// Used for offline runs and tests.
#[derive(Default)]
pub struct ScriptedModel {
    responses: Mutex<VecDeque<GenerateResponse>>,
    requests: Mutex<Vec<GenerateRequest>>,
}

impl ScriptedModel {
    pub fn new(responses: impl IntoIterator<Item = GenerateResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<GenerateRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

impl GenerativeModel for ScriptedModel {
    fn generate<'a>(&'a self, request: &'a GenerateRequest) -> BoxFuture<'a, Result<GenerateResponse>> {
        Box::pin(async move {
            if let Ok(mut requests) = self.requests.lock() {
                requests.push(request.clone());
            }
            self.responses
                .lock()
                .ok()
                .and_then(|mut r| r.pop_front())
                .ok_or(Error::EmptyResponse)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_strips_code_fence() {
        let response = GenerateResponse::text("```json\n{\"a\": 1}\n```");
        let value: Value = response.json().unwrap();
        assert_eq!(value, json!({"a": 1}));
    }

    #[test]
    fn test_json_reports_malformed_output() {
        let response = GenerateResponse::text("sure! here you go");
        assert!(matches!(
            response.json::<Value>(),
            Err(Error::MalformedOutput(_))
        ));
        assert!(matches!(
            GenerateResponse::default().json::<Value>(),
            Err(Error::EmptyResponse)
        ));
    }

    #[test]
    fn test_calls_in_order() {
        let response = GenerateResponse {
            parts: vec![
                Part::Text("Let me get someone.".to_string()),
                Part::FunctionCall {
                    name: "notify_human".to_string(),
                    args: json!({"reason": "x"}),
                },
                Part::FunctionCall {
                    name: "lookup".to_string(),
                    args: json!({}),
                },
            ],
        };
        let calls = response.calls();
        assert_eq!(calls.len(), 2);
        let (name, args) = calls[0];
        assert_eq!(name, "notify_human");
        assert_eq!(args["reason"], "x");
        assert_eq!(calls[1].0, "lookup");
        assert_eq!(response.joined_text(), "Let me get someone.");
    }

    #[tokio::test]
    async fn test_scripted_model_plays_in_order() {
        let model = ScriptedModel::new([
            GenerateResponse::text("one"),
            GenerateResponse::text("two"),
        ]);
        let request = GenerateRequest::default();
        assert_eq!(model.generate(&request).await.unwrap().joined_text(), "one");
        assert_eq!(model.generate(&request).await.unwrap().joined_text(), "two");
        assert!(model.generate(&request).await.is_err());
        assert_eq!(model.requests().len(), 3);
    }
}
