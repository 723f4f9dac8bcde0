//! Endpoint handlers

pub mod ai;
pub mod client;
pub mod professional;

use crate::auth::Identity;
use crate::error::ApiError;
use crate::http::ApiRequest;
use crate::state::AppState;
use serde::de::DeserializeOwned;
use serde_json::Value;
use vetcare_core::{Appointment, StaffMember};

/// Everything a handler needs about one request
pub struct Call<'a> {
    pub state: &'a AppState,
    pub req: &'a ApiRequest,
    pub params: &'a [String],
    pub identity: Option<&'a Identity>,
}

impl<'a> Call<'a> {
    /// Path capture `index`
    pub fn param(&self, index: usize) -> Result<&'a str, ApiError> {
        self.params
            .get(index)
            .map(String::as_str)
            .ok_or_else(|| ApiError::BadRequest("missing path parameter".to_string()))
    }

    pub fn identity(&self) -> Result<&'a Identity, ApiError> {
        self.identity.ok_or(ApiError::Unauthenticated)
    }
}

/// Parse a snake_case enum value such as `paid` or `no_show`
pub(crate) fn parse_enum<T: DeserializeOwned>(field: &str, value: &str) -> Result<T, ApiError> {
    serde_json::from_value(Value::String(value.to_string()))
        .map_err(|_| ApiError::BadRequest(format!("invalid {field}: {value}")))
}

/// Reject an appointment that overlaps an open appointment of the same staff member
pub(crate) fn ensure_slot_free(state: &AppState, appointment: &Appointment) -> Result<(), ApiError> {
    let Some(staff_id) = appointment.staff_id.as_deref() else {
        return Ok(());
    };
    let clash = state
        .store
        .appointments_by_staff(staff_id)?
        .into_iter()
        .find(|other| {
            other.id != appointment.id
                && other.status.is_open()
                && other.overlaps(appointment.starts_at, appointment.ends_at())
        });
    match clash {
        Some(other) => Err(ApiError::Conflict(format!(
            "staff member {staff_id} is already booked at {}",
            other.starts_at.to_rfc3339()
        ))),
        None => Ok(()),
    }
}

/// Reject a staff reference to an unknown or inactive member
pub(crate) fn ensure_staff_available(state: &AppState, staff_id: Option<&str>) -> Result<(), ApiError> {
    let Some(staff_id) = staff_id else {
        return Ok(());
    };
    let member: StaffMember = state.store.fetch(staff_id)?;
    if !member.active {
        return Err(ApiError::Conflict(format!(
            "staff member {staff_id} is inactive"
        )));
    }
    Ok(())
}
