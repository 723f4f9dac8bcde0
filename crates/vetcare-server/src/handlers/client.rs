//! Client portal: a tutor managing their own profile, pets, visits and bills

use super::{ensure_slot_free, ensure_staff_available, Call};
use crate::error::ApiError;
use crate::http::ApiResponse;
use chrono::Utc;
use tracing::info;
use vetcare_core::{
    new_id, Appointment, AppointmentDraft, AppointmentStatus, FieldError, Pet, PetDraft, Tutor,
    TutorDraft, Validate,
};

type Response = Result<ApiResponse, ApiError>;

fn own_tutor(call: &Call<'_>) -> Result<Tutor, ApiError> {
    let identity = call.identity()?;
    call.state
        .store
        .tutor_by_uid(&identity.uid)?
        .ok_or_else(|| ApiError::NotFound("tutor profile".to_string()))
}

fn own_pet(call: &Call<'_>, tutor: &Tutor, id: &str) -> Result<Pet, ApiError> {
    let pet: Pet = call.state.store.fetch(id)?;
    if pet.tutor_id != tutor.id {
        return Err(ApiError::Forbidden);
    }
    Ok(pet)
}

pub fn me(call: &Call<'_>) -> Response {
    ApiResponse::ok(&own_tutor(call)?)
}

/// Create the caller's profile on first use, update it afterwards
pub fn put_me(call: &Call<'_>) -> Response {
    let identity = call.identity()?;
    let draft: TutorDraft = call.req.json()?;
    draft.validate()?;

    match call.state.store.tutor_by_uid(&identity.uid)? {
        Some(mut tutor) => {
            draft.apply_to(&mut tutor);
            call.state.store.update(&tutor)?;
            ApiResponse::ok(&tutor)
        }
        None => {
            let tutor = draft.into_tutor(new_id(), identity.uid.clone(), Utc::now());
            call.state.store.insert(&tutor)?;
            info!(tutor = %tutor.id, "tutor registered");
            ApiResponse::created(&tutor)
        }
    }
}

pub fn pets(call: &Call<'_>) -> Response {
    let tutor = own_tutor(call)?;
    let mut pets = call.state.store.pets_by_tutor(&tutor.id)?;
    pets.sort_by(|a, b| a.name.cmp(&b.name));
    ApiResponse::ok(&pets)
}

pub fn create_pet(call: &Call<'_>) -> Response {
    let tutor = own_tutor(call)?;
    let draft: PetDraft = call.req.json()?;
    draft.validate()?;
    let pet = draft.into_pet(new_id(), tutor.id, Utc::now());
    call.state.store.insert(&pet)?;
    ApiResponse::created(&pet)
}

pub fn pet(call: &Call<'_>) -> Response {
    let tutor = own_tutor(call)?;
    ApiResponse::ok(&own_pet(call, &tutor, call.param(0)?)?)
}

pub fn update_pet(call: &Call<'_>) -> Response {
    let tutor = own_tutor(call)?;
    let id = call.param(0)?;
    own_pet(call, &tutor, id)?;
    let draft: PetDraft = call.req.json()?;
    draft.validate()?;
    let pet = call.state.store.modify::<Pet, _>(id, |pet| {
        draft.apply_to(pet);
        Ok(())
    })?;
    ApiResponse::ok(&pet)
}

pub fn delete_pet(call: &Call<'_>) -> Response {
    let tutor = own_tutor(call)?;
    let id = call.param(0)?;
    own_pet(call, &tutor, id)?;
    call.state.store.delete::<Pet>(id)?;
    Ok(ApiResponse::no_content())
}

pub fn pet_history(call: &Call<'_>) -> Response {
    let tutor = own_tutor(call)?;
    let pet = own_pet(call, &tutor, call.param(0)?)?;
    ApiResponse::ok(&pet.history_newest_first())
}

pub fn appointments(call: &Call<'_>) -> Response {
    let tutor = own_tutor(call)?;
    ApiResponse::ok(&call.state.store.appointments_by_tutor(&tutor.id)?)
}

pub fn book(call: &Call<'_>) -> Response {
    let tutor = own_tutor(call)?;
    let draft: AppointmentDraft = call.req.json()?;
    draft.validate()?;
    let now = Utc::now();
    if draft.starts_at <= now {
        return Err(ApiError::Validation(vec![FieldError::new(
            "starts_at",
            "must be in the future",
        )]));
    }
    own_pet(call, &tutor, &draft.pet_id)?;
    ensure_staff_available(call.state, draft.staff_id.as_deref())?;

    let appointment = draft.into_appointment(new_id(), tutor.id, now);
    ensure_slot_free(call.state, &appointment)?;
    call.state.store.insert(&appointment)?;
    info!(
        appointment = %appointment.id,
        starts_at = %appointment.starts_at,
        "appointment booked"
    );
    ApiResponse::created(&appointment)
}

pub fn cancel(call: &Call<'_>) -> Response {
    let tutor = own_tutor(call)?;
    let id = call.param(0)?;
    let appointment: Appointment = call.state.store.fetch(id)?;
    if appointment.tutor_id != tutor.id {
        return Err(ApiError::Forbidden);
    }
    let appointment = call.state.store.modify::<Appointment, _>(id, |a| {
        if !a.status.can_transition_to(AppointmentStatus::Cancelled) {
            return Err(vetcare_core::Error::Conflict(format!(
                "appointment is already {}",
                a.status.as_str()
            )));
        }
        a.status = AppointmentStatus::Cancelled;
        Ok(())
    })?;
    info!(appointment = %appointment.id, "appointment cancelled by tutor");
    ApiResponse::ok(&appointment)
}

pub fn invoices(call: &Call<'_>) -> Response {
    let tutor = own_tutor(call)?;
    ApiResponse::ok(&call.state.store.invoices_by_tutor(&tutor.id)?)
}
