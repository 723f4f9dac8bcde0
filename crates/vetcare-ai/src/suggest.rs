//! Appointment-time suggestions.
//!
//! The model proposes candidate start times; this module only discards the
//! ones that cannot be booked.

use crate::error::{Error, Result};
use crate::model::{GenerateRequest, GenerativeModel, Message};
use crate::prompts::{suggest_prompt, SUGGEST_SYSTEM};
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info};

pub const MAX_SUGGESTIONS: usize = 10;

/// An interval that is already taken
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookedSlot {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestRequest {
    pub reason: String,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    #[serde(default = "default_duration")]
    pub duration_minutes: u32,
    #[serde(default = "default_count")]
    pub count: usize,
    #[serde(default)]
    pub booked: Vec<BookedSlot>,
}

fn default_duration() -> u32 {
    30
}

fn default_count() -> usize {
    3
}

pub struct TimeSuggester {
    model: Arc<dyn GenerativeModel>,
}

impl TimeSuggester {
    pub fn new(model: Arc<dyn GenerativeModel>) -> Self {
        Self { model }
    }

    /// Ask the model for start times and keep the bookable ones, sorted.
    pub async fn suggest_times(
        &self,
        request: &SuggestRequest,
        now: DateTime<Utc>,
    ) -> Result<Vec<DateTime<Utc>>> {
        if request.window_end <= request.window_start {
            return Err(Error::InvalidRequest(
                "window_end must be after window_start".to_string(),
            ));
        }
        if request.duration_minutes == 0 {
            return Err(Error::InvalidRequest("duration_minutes must be positive".to_string()));
        }
        let count = request.count.clamp(1, MAX_SUGGESTIONS);

        let booked: Vec<(String, String)> = request
            .booked
            .iter()
            .map(|slot| (rfc3339(slot.start), rfc3339(slot.end)))
            .collect();
        let prompt = suggest_prompt(
            &request.reason,
            (rfc3339(request.window_start), rfc3339(request.window_end)),
            request.duration_minutes,
            count,
            &booked,
        );

        let generate = GenerateRequest {
            system: Some(SUGGEST_SYSTEM.to_string()),
            messages: vec![Message::user(prompt)],
            tools: Vec::new(),
            response_schema: Some(schema()),
            temperature: Some(0.2),
        };
        let response = self.model.generate(&generate).await?;
        let output: Value = response.json()?;

        let candidates = candidates(&output)?;
        let proposed = candidates.len();
        let times = filter_candidates(candidates, request, now, count);
        info!(proposed, kept = times.len(), "appointment times suggested");
        Ok(times)
    }
}

/// Accepts `{"times": [...]}` or a bare array.
fn candidates(output: &Value) -> Result<Vec<String>> {
    let list = match output {
        Value::Array(items) => items,
        Value::Object(map) => match map.get("times") {
            Some(Value::Array(items)) => items,
            _ => return Err(Error::MalformedOutput("missing `times` array".to_string())),
        },
        _ => return Err(Error::MalformedOutput("expected a list of times".to_string())),
    };
    Ok(list
        .iter()
        .filter_map(|v| v.as_str().map(str::to_string))
        .collect())
}

fn filter_candidates(
    candidates: Vec<String>,
    request: &SuggestRequest,
    now: DateTime<Utc>,
    count: usize,
) -> Vec<DateTime<Utc>> {
    let duration = Duration::minutes(i64::from(request.duration_minutes));
    let mut times: Vec<DateTime<Utc>> = candidates
        .iter()
        .filter_map(|raw| match DateTime::parse_from_rfc3339(raw.trim()) {
            Ok(t) => Some(t.with_timezone(&Utc)),
            Err(e) => {
                debug!(candidate = %raw, error = %e, "dropping unparseable time");
                None
            }
        })
        .filter(|start| *start > now)
        .filter(|start| *start >= request.window_start && *start + duration <= request.window_end)
        .filter(|start| {
            let end = *start + duration;
            !request
                .booked
                .iter()
                .any(|slot| *start < slot.end && slot.start < end)
        })
        .collect();
    times.sort();
    times.dedup();
    times.truncate(count);
    times
}

fn rfc3339(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "times": { "type": "array", "items": { "type": "string" } }
        },
        "required": ["times"]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{GenerateResponse, ScriptedModel};
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 3, h, m, 0).unwrap()
    }

    fn request() -> SuggestRequest {
        SuggestRequest {
            reason: "annual checkup".to_string(),
            window_start: at(9, 0),
            window_end: at(17, 0),
            duration_minutes: 30,
            count: 3,
            booked: vec![BookedSlot {
                start: at(10, 0),
                end: at(11, 0),
            }],
        }
    }

    #[test]
    fn test_filters_candidates() {
        let now = at(9, 30);
        let candidates = vec![
            "not a time".to_string(),
            "2024-06-03T09:00:00Z".to_string(), // past
            "2024-06-03T10:30:00Z".to_string(), // booked
            "2024-06-03T09:45:00Z".to_string(), // runs into booked slot
            "2024-06-03T16:45:00Z".to_string(), // past window end
            "2024-06-03T14:00:00Z".to_string(),
            "2024-06-03T16:00:00+02:00".to_string(), // 14:00Z duplicate
            "2024-06-03T11:00:00Z".to_string(),
        ];
        let times = filter_candidates(candidates, &request(), now, 3);
        assert_eq!(times, vec![at(11, 0), at(14, 0)]);
    }

    #[test]
    fn test_truncates_to_count() {
        let candidates: Vec<String> = (12..17)
            .map(|h| format!("2024-06-03T{h}:00:00Z"))
            .collect();
        let times = filter_candidates(candidates, &request(), at(8, 0), 2);
        assert_eq!(times, vec![at(12, 0), at(13, 0)]);
    }

    #[test]
    fn test_candidates_shapes() {
        assert_eq!(candidates(&json!(["a", 1, "b"])).unwrap(), vec!["a", "b"]);
        assert_eq!(candidates(&json!({"times": ["x"]})).unwrap(), vec!["x"]);
        assert!(matches!(
            candidates(&json!({"slots": []})),
            Err(Error::MalformedOutput(_))
        ));
    }

    #[tokio::test]
    async fn test_suggest_times_end_to_end() {
        let model = Arc::new(ScriptedModel::new([GenerateResponse::text(
            r#"{"times": ["2024-06-03T15:00:00Z", "2024-06-03T10:15:00Z", "2024-06-03T09:00:00Z"]}"#,
        )]));
        let suggester = TimeSuggester::new(model.clone());

        let times = suggester.suggest_times(&request(), at(8, 0)).await.unwrap();
        assert_eq!(times, vec![at(9, 0), at(15, 0)]);

        let prompt = model.requests()[0].messages[0].clone();
        let crate::model::Part::Text(text) = &prompt.parts[0] else {
            panic!("expected text prompt");
        };
        assert!(text.contains("2024-06-03T10:00:00Z to 2024-06-03T11:00:00Z"));
    }

    #[tokio::test]
    async fn test_rejects_inverted_window() {
        let model = Arc::new(ScriptedModel::default());
        let suggester = TimeSuggester::new(model);
        let mut req = request();
        req.window_end = req.window_start;
        assert!(matches!(
            suggester.suggest_times(&req, at(8, 0)).await,
            Err(Error::InvalidRequest(_))
        ));
    }
}
