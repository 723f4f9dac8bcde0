use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Low,
    #[default]
    Normal,
    High,
}

impl Urgency {
    /// Lenient parse for model-provided values
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Urgency::Low,
            "high" | "urgent" | "emergency" => Urgency::High,
            _ => Urgency::Normal,
        }
    }
}

/// A request, raised by the chat concierge, for a human to take over
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Handoff {
    pub id: String,
    pub uid: Option<String>,
    pub reason: String,
    pub urgency: Urgency,
    pub contact: Option<String>,
    pub transcript_excerpt: String,
    pub resolved: bool,
    pub created_at: DateTime<Utc>,
}
