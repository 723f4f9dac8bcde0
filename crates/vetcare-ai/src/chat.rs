//! Chat concierge with a single escalation tool.

use crate::error::{Error, Result};
use crate::model::{GenerateRequest, GenerativeModel, Message, Role, ToolDeclaration};
use crate::prompts::CONCIERGE_SYSTEM;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};
use vetcare_core::{new_id, Handoff, Urgency};
use vetcare_db::Store;

pub const NOTIFY_HUMAN: &str = "notify_human";

/// Upper bound on model calls for one user turn
const MAX_MODEL_CALLS: usize = 4;
/// Turns copied into a handoff's transcript excerpt
const EXCERPT_TURNS: usize = 6;
const EXCERPT_CHARS: usize = 1_000;

const FALLBACK_REPLY: &str =
    "Thanks for your patience. A member of our team will get back to you shortly.";

/// One turn of a conversation as the portal sends it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    pub text: String,
    pub handoff_id: Option<String>,
}

pub struct ChatConcierge {
    model: Arc<dyn GenerativeModel>,
    store: Arc<Store>,
}

impl ChatConcierge {
    pub fn new(model: Arc<dyn GenerativeModel>, store: Arc<Store>) -> Self {
        Self { model, store }
    }

    /// Answer the last user turn of `history`.
    ///
    /// The model may call `notify_human` once per turn. Every call in a model
    /// response is answered, then the model is asked again for the text shown
    /// to the user.
    pub async fn reply(&self, history: &[ChatTurn], uid: Option<&str>) -> Result<ChatReply> {
        match history.last() {
            Some(turn) if turn.role == Role::User && !turn.text.trim().is_empty() => {}
            _ => {
                return Err(Error::InvalidRequest(
                    "conversation must end with a user message".to_string(),
                ))
            }
        }

        let mut messages: Vec<Message> = history
            .iter()
            .map(|turn| Message {
                role: turn.role,
                parts: vec![crate::model::Part::Text(turn.text.clone())],
            })
            .collect();
        let mut handoff_id: Option<String> = None;

        for call in 0..MAX_MODEL_CALLS {
            let request = GenerateRequest {
                system: Some(CONCIERGE_SYSTEM.to_string()),
                messages: messages.clone(),
                tools: vec![notify_human_declaration()],
                response_schema: None,
                temperature: Some(0.4),
            };
            let response = self.model.generate(&request).await?;

            let calls = response.calls();
            if calls.is_empty() {
                let text = response.joined_text();
                if text.trim().is_empty() {
                    return Err(Error::EmptyResponse);
                }
                return Ok(ChatReply { text, handoff_id });
            }

            // Every call gets a response; only the first notify_human runs
            let mut results = Vec::with_capacity(calls.len());
            for (name, args) in calls {
                let result = if name == NOTIFY_HUMAN && handoff_id.is_none() {
                    let handoff = self.notify_human(args, uid, history)?;
                    let id = handoff.id.clone();
                    handoff_id = Some(id.clone());
                    json!({ "status": "notified", "handoff_id": id })
                } else {
                    warn!(tool = name, call, "tool call refused");
                    json!({ "error": "tool not available for this turn" })
                };
                results.push((name.to_string(), result));
            }

            messages.push(Message {
                role: Role::Model,
                parts: response.parts.clone(),
            });
            messages.push(Message::function_responses(results));
        }

        warn!(calls = MAX_MODEL_CALLS, "concierge gave up waiting for text");
        Ok(ChatReply {
            text: FALLBACK_REPLY.to_string(),
            handoff_id,
        })
    }

    fn notify_human(&self, args: &Value, uid: Option<&str>, history: &[ChatTurn]) -> Result<Handoff> {
        let reason = args
            .get("reason")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or("Customer asked to talk to a person")
            .to_string();
        let urgency = args
            .get("urgency")
            .and_then(Value::as_str)
            .map(Urgency::parse)
            .unwrap_or_default();
        let contact = args
            .get("contact")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string);

        let handoff = Handoff {
            id: new_id(),
            uid: uid.map(str::to_string),
            reason,
            urgency,
            contact,
            transcript_excerpt: excerpt(history),
            resolved: false,
            created_at: Utc::now(),
        };
        self.store.insert(&handoff)?;
        info!(
            handoff = %handoff.id,
            urgency = ?handoff.urgency,
            reason = %handoff.reason,
            "conversation handed off to staff"
        );
        Ok(handoff)
    }
}

fn notify_human_declaration() -> ToolDeclaration {
    ToolDeclaration {
        name: NOTIFY_HUMAN.to_string(),
        description: "Ask a member of the clinic staff to take over this conversation."
            .to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "reason": { "type": "string", "description": "Why a human is needed" },
                "urgency": { "type": "string", "enum": ["low", "normal", "high"] },
                "contact": { "type": "string", "description": "Phone or email the user gave" }
            },
            "required": ["reason", "urgency"]
        }),
    }
}

fn excerpt(history: &[ChatTurn]) -> String {
    let start = history.len().saturating_sub(EXCERPT_TURNS);
    let text = history[start..]
        .iter()
        .map(|turn| {
            let who = match turn.role {
                Role::User => "user",
                Role::Model => "assistant",
            };
            format!("{who}: {}", turn.text.trim())
        })
        .collect::<Vec<_>>()
        .join("\n");
    debug!(chars = text.len(), "building transcript excerpt");
    text.chars().take(EXCERPT_CHARS).collect()
}
