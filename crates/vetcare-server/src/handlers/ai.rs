//! Generative endpoints: concierge chat, care plans and time suggestions

use super::Call;
use crate::auth::Role;
use crate::error::ApiError;
use crate::http::ApiResponse;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use vetcare_ai::{BookedSlot, ChatTurn, SuggestRequest};
use vetcare_core::Pet;

type Response = Result<ApiResponse, ApiError>;

#[derive(Deserialize)]
struct ChatForm {
    messages: Vec<ChatTurn>,
}

pub async fn chat(call: &Call<'_>) -> Response {
    let identity = call.identity()?;
    let form: ChatForm = call.req.json()?;
    let reply = call
        .state
        .concierge
        .reply(&form.messages, Some(identity.uid.as_str()))
        .await?;
    ApiResponse::ok(&reply)
}

#[derive(Deserialize)]
struct CarePlanForm {
    pet_id: String,
    concern: String,
}

/// Tutors may only ask about their own pets
pub async fn care_plan(call: &Call<'_>) -> Response {
    let identity = call.identity()?;
    let form: CarePlanForm = call.req.json()?;
    let pet: Pet = call.state.store.fetch(&form.pet_id)?;

    if identity.role == Role::Tutor {
        let owns = call
            .state
            .store
            .tutor_by_uid(&identity.uid)?
            .is_some_and(|tutor| tutor.id == pet.tutor_id);
        if !owns {
            return Err(ApiError::Forbidden);
        }
    }

    let plan = call
        .state
        .planner
        .generate_care_plan(&pet, &form.concern, Utc::now().date_naive())
        .await?;
    ApiResponse::ok(&plan)
}

#[derive(Deserialize)]
struct SuggestForm {
    reason: String,
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
    #[serde(default)]
    duration_minutes: Option<u32>,
    #[serde(default)]
    count: Option<usize>,
    /// Only avoid this staff member's bookings
    #[serde(default)]
    staff_id: Option<String>,
}

pub async fn suggest_times(call: &Call<'_>) -> Response {
    let form: SuggestForm = call.req.json()?;
    if form.window_end <= form.window_start {
        return Err(ApiError::BadRequest(
            "window_end must be after window_start".to_string(),
        ));
    }

    let booked = call
        .state
        .store
        .open_appointments_between(form.window_start, form.window_end)?
        .into_iter()
        .filter(|a| match &form.staff_id {
            Some(staff_id) => a.staff_id.as_ref() == Some(staff_id),
            None => true,
        })
        .map(|a| BookedSlot {
            start: a.starts_at,
            end: a.ends_at(),
        })
        .collect();

    let request = SuggestRequest {
        reason: form.reason,
        window_start: form.window_start,
        window_end: form.window_end,
        duration_minutes: form.duration_minutes.unwrap_or(30),
        count: form.count.unwrap_or(3),
        booked,
    };
    let times = call
        .state
        .suggester
        .suggest_times(&request, Utc::now())
        .await?;
    ApiResponse::ok(&json!({ "times": times }))
}
