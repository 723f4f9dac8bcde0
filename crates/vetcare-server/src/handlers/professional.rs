//! Professional portal: patients, agenda, stock, billing, staff and reports

use super::{ensure_slot_free, ensure_staff_available, parse_enum, Call};
use crate::error::ApiError;
use crate::http::ApiResponse;
use crate::reports::summarize;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Deserialize;
use tracing::{debug, info};
use vetcare_core::validation::Checker;
use vetcare_core::{
    new_id, Appointment, AppointmentDraft, AppointmentStatus, Handoff, HistoryEntry, HistoryKind,
    InventoryDraft, InventoryItem, Invoice, InvoiceDraft, InvoiceStatus, Pet, StaffDraft,
    StaffMember, Tutor, TutorDraft, Validate,
};

type Response = Result<ApiResponse, ApiError>;

/// Default report range when `from` is omitted
const DEFAULT_REPORT_DAYS: i64 = 30;

fn parse_date(field: &str, value: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| ApiError::BadRequest(format!("{field} must be YYYY-MM-DD")))
}

// Patients

pub fn patients(call: &Call<'_>) -> Response {
    let mut pets = match call.req.query("tutor") {
        Some(tutor_id) => call.state.store.pets_by_tutor(tutor_id)?,
        None => call.state.store.all::<Pet>()?,
    };
    pets.sort_by(|a, b| a.name.cmp(&b.name));
    ApiResponse::ok(&pets)
}

pub fn patient(call: &Call<'_>) -> Response {
    let pet: Pet = call.state.store.fetch(call.param(0)?)?;
    ApiResponse::ok(&pet)
}

#[derive(Deserialize)]
struct HistoryForm {
    #[serde(default)]
    date: Option<NaiveDate>,
    kind: HistoryKind,
    description: String,
    #[serde(default)]
    next_due: Option<NaiveDate>,
}

/// Append a history entry; vaccinations and exams update the pet's care dates
pub fn add_history(call: &Call<'_>) -> Response {
    let id = call.param(0)?;
    let form: HistoryForm = call.req.json()?;
    let today = Utc::now().date_naive();

    let mut c = Checker::new();
    c.check(!form.description.trim().is_empty(), "description", "is required");
    c.not_future("date", form.date);
    if let (Some(next), Some(date)) = (form.next_due, form.date) {
        c.check(next > date, "next_due", "must be after the entry date");
    }
    c.finish()?;

    let identity = call.identity()?;
    let staff_id = call
        .state
        .store
        .staff_by_uid(&identity.uid)?
        .map(|member| member.id);
    let entry = HistoryEntry {
        date: form.date.unwrap_or(today),
        kind: form.kind,
        description: form.description.trim().to_string(),
        staff_id,
        next_due: form.next_due.filter(|_| form.kind == HistoryKind::Vaccination),
    };

    let pet = call.state.store.modify::<Pet, _>(id, |pet| {
        pet.record_history(entry);
        Ok(())
    })?;
    info!(pet = %pet.id, kind = ?form.kind, "history entry recorded");
    ApiResponse::created(&pet)
}

// Tutors

pub fn tutors(call: &Call<'_>) -> Response {
    let mut tutors = call.state.store.all::<Tutor>()?;
    tutors.sort_by(|a, b| a.name.cmp(&b.name));
    ApiResponse::ok(&tutors)
}

#[derive(Deserialize)]
struct NewTutor {
    /// Portal login to link, if the client already has one
    #[serde(default)]
    uid: Option<String>,
    #[serde(flatten)]
    draft: TutorDraft,
}

pub fn create_tutor(call: &Call<'_>) -> Response {
    let form: NewTutor = call.req.json()?;
    form.draft.validate()?;
    let uid = form.uid.unwrap_or_default();
    if !uid.is_empty() && call.state.store.tutor_by_uid(&uid)?.is_some() {
        return Err(ApiError::Conflict(format!("a tutor is already linked to {uid}")));
    }
    let tutor = form.draft.into_tutor(new_id(), uid, Utc::now());
    call.state.store.insert(&tutor)?;
    ApiResponse::created(&tutor)
}

pub fn tutor(call: &Call<'_>) -> Response {
    let tutor: Tutor = call.state.store.fetch(call.param(0)?)?;
    ApiResponse::ok(&tutor)
}

// Agenda

pub fn agenda(call: &Call<'_>) -> Response {
    let day = match call.req.query("date") {
        Some(value) => parse_date("date", value)?,
        None => Utc::now().date_naive(),
    };
    let appointments = call
        .state
        .store
        .appointments_on(day, call.req.query("staff"))?;
    ApiResponse::ok(&appointments)
}

pub fn create_appointment(call: &Call<'_>) -> Response {
    let draft: AppointmentDraft = call.req.json()?;
    draft.validate()?;
    let pet: Pet = call.state.store.fetch(&draft.pet_id)?;
    ensure_staff_available(call.state, draft.staff_id.as_deref())?;

    let appointment = draft.into_appointment(new_id(), pet.tutor_id, Utc::now());
    ensure_slot_free(call.state, &appointment)?;
    call.state.store.insert(&appointment)?;
    info!(appointment = %appointment.id, "appointment created");
    ApiResponse::created(&appointment)
}

/// Reschedule or reassign
pub fn update_appointment(call: &Call<'_>) -> Response {
    let id = call.param(0)?;
    let draft: AppointmentDraft = call.req.json()?;
    draft.validate()?;

    let mut appointment: Appointment = call.state.store.fetch(id)?;
    if !appointment.status.is_open() {
        return Err(ApiError::Conflict(format!(
            "appointment is already {}",
            appointment.status.as_str()
        )));
    }
    let pet: Pet = call.state.store.fetch(&draft.pet_id)?;
    ensure_staff_available(call.state, draft.staff_id.as_deref())?;

    draft.apply_to(&mut appointment);
    appointment.tutor_id = pet.tutor_id;
    ensure_slot_free(call.state, &appointment)?;
    call.state.store.update(&appointment)?;
    ApiResponse::ok(&appointment)
}

#[derive(Deserialize)]
struct StatusForm {
    status: String,
}

pub fn set_appointment_status(call: &Call<'_>) -> Response {
    let id = call.param(0)?;
    let form: StatusForm = call.req.json()?;
    let next: AppointmentStatus = parse_enum("status", &form.status)?;
    let appointment = call.state.store.modify::<Appointment, _>(id, |a| {
        if !a.status.can_transition_to(next) {
            return Err(vetcare_core::Error::Conflict(format!(
                "appointment cannot move from {} to {}",
                a.status.as_str(),
                next.as_str()
            )));
        }
        a.status = next;
        Ok(())
    })?;
    info!(appointment = %appointment.id, status = next.as_str(), "appointment status changed");
    ApiResponse::ok(&appointment)
}

// Inventory

/// Every item, or only those past their expiry date with `?expired=true`
pub fn inventory(call: &Call<'_>) -> Response {
    let mut items = call.state.store.all::<InventoryItem>()?;
    if call.req.query("expired") == Some("true") {
        let today = Utc::now().date_naive();
        items.retain(|item| item.is_expired(today));
    }
    items.sort_by(|a, b| a.name.cmp(&b.name));
    ApiResponse::ok(&items)
}

fn ensure_sku_free(call: &Call<'_>, sku: &str, except: Option<&str>) -> Result<(), ApiError> {
    let sku = sku.trim().to_uppercase();
    let taken = call
        .state
        .store
        .all::<InventoryItem>()?
        .into_iter()
        .any(|item| item.sku == sku && Some(item.id.as_str()) != except);
    if taken {
        return Err(ApiError::Conflict(format!("sku {sku} already exists")));
    }
    Ok(())
}

pub fn create_item(call: &Call<'_>) -> Response {
    let draft: InventoryDraft = call.req.json()?;
    draft.validate()?;
    ensure_sku_free(call, &draft.sku, None)?;
    let item = draft.into_item(new_id(), Utc::now());
    call.state.store.insert(&item)?;
    ApiResponse::created(&item)
}

pub fn update_item(call: &Call<'_>) -> Response {
    let id = call.param(0)?;
    let draft: InventoryDraft = call.req.json()?;
    draft.validate()?;
    ensure_sku_free(call, &draft.sku, Some(id))?;
    let item = call.state.store.modify::<InventoryItem, _>(id, |item| {
        draft.apply_to(item);
        Ok(())
    })?;
    ApiResponse::ok(&item)
}

pub fn delete_item(call: &Call<'_>) -> Response {
    call.state.store.delete::<InventoryItem>(call.param(0)?)?;
    Ok(ApiResponse::no_content())
}

pub fn low_stock(call: &Call<'_>) -> Response {
    ApiResponse::ok(&call.state.store.low_stock()?)
}

#[derive(Deserialize)]
struct DeductLine {
    item_id: String,
    quantity: u32,
}

#[derive(Deserialize)]
struct DeductForm {
    items: Vec<DeductLine>,
}

/// Take stock out for several items at once; all or nothing
pub fn deduct(call: &Call<'_>) -> Response {
    let form: DeductForm = call.req.json()?;
    let mut c = Checker::new();
    c.check(!form.items.is_empty(), "items", "needs at least one item");
    for (i, line) in form.items.iter().enumerate() {
        if line.quantity == 0 {
            c.fail(&format!("items[{i}].quantity"), "must be greater than zero");
        }
    }
    c.finish()?;

    let usage: Vec<(String, u32)> = form
        .items
        .into_iter()
        .map(|line| (line.item_id, line.quantity))
        .collect();
    let items = call.state.store.deduct_stock(&usage)?;
    ApiResponse::ok(&items)
}

// Billing

pub fn invoices(call: &Call<'_>) -> Response {
    let status: Option<InvoiceStatus> = call
        .req
        .query("status")
        .map(|s| parse_enum("status", s))
        .transpose()?;

    let mut invoices = match (call.req.query("tutor"), status) {
        (Some(tutor_id), _) => call.state.store.invoices_by_tutor(tutor_id)?,
        (None, Some(status)) => call.state.store.invoices_by_status(status)?,
        (None, None) => call.state.store.all::<Invoice>()?,
    };
    if let Some(status) = status {
        invoices.retain(|i| i.status == status);
    }
    invoices.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    ApiResponse::ok(&invoices)
}

pub fn create_invoice(call: &Call<'_>) -> Response {
    let draft: InvoiceDraft = call.req.json()?;
    draft.validate()?;
    let _: Tutor = call.state.store.fetch(&draft.tutor_id)?;
    if let Some(appointment_id) = &draft.appointment_id {
        let _: Appointment = call.state.store.fetch(appointment_id)?;
    }
    for line in &draft.lines {
        if let Some(item_id) = &line.inventory_item_id {
            let _: InventoryItem = call.state.store.fetch(item_id)?;
        }
    }

    let invoice = draft.into_invoice(new_id(), Utc::now());
    call.state.store.insert(&invoice)?;
    info!(invoice = %invoice.id, total_cents = invoice.total_cents(), "invoice drafted");
    ApiResponse::created(&invoice)
}

pub fn invoice(call: &Call<'_>) -> Response {
    let invoice: Invoice = call.state.store.fetch(call.param(0)?)?;
    ApiResponse::ok(&invoice)
}

/// Issuing deducts stock; paying stamps `paid_at`
pub fn set_invoice_status(call: &Call<'_>) -> Response {
    let id = call.param(0)?;
    let form: StatusForm = call.req.json()?;
    let next: InvoiceStatus = parse_enum("status", &form.status)?;
    let invoice = call.state.store.transition_invoice(id, next, Utc::now())?;
    ApiResponse::ok(&invoice)
}

// Staff

pub fn staff(call: &Call<'_>) -> Response {
    let mut members = call.state.store.all::<StaffMember>()?;
    members.sort_by(|a, b| a.name.cmp(&b.name));
    ApiResponse::ok(&members)
}

fn ensure_uid_free(call: &Call<'_>, uid: Option<&str>, except: Option<&str>) -> Result<(), ApiError> {
    let Some(uid) = uid.filter(|u| !u.is_empty()) else {
        return Ok(());
    };
    match call.state.store.staff_by_uid(uid)? {
        Some(member) if Some(member.id.as_str()) != except => Err(ApiError::Conflict(format!(
            "a staff member is already linked to {uid}"
        ))),
        _ => Ok(()),
    }
}

pub fn create_staff(call: &Call<'_>) -> Response {
    let draft: StaffDraft = call.req.json()?;
    draft.validate()?;
    ensure_uid_free(call, draft.uid.as_deref(), None)?;
    let member = draft.into_member(new_id(), Utc::now());
    call.state.store.insert(&member)?;
    ApiResponse::created(&member)
}

pub fn update_staff(call: &Call<'_>) -> Response {
    let id = call.param(0)?;
    let draft: StaffDraft = call.req.json()?;
    draft.validate()?;
    ensure_uid_free(call, draft.uid.as_deref(), Some(id))?;
    let member = call.state.store.modify::<StaffMember, _>(id, |member| {
        draft.apply_to(member);
        Ok(())
    })?;
    ApiResponse::ok(&member)
}

/// Active staff with a shift covering `at` (default: now)
pub fn on_duty(call: &Call<'_>) -> Response {
    let at = match call.req.query("at") {
        Some(value) => DateTime::parse_from_rfc3339(value)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|_| ApiError::BadRequest("at must be an RFC 3339 timestamp".to_string()))?,
        None => Utc::now(),
    };
    let mut members: Vec<StaffMember> = call
        .state
        .store
        .all::<StaffMember>()?
        .into_iter()
        .filter(|m| m.on_duty_at(at))
        .collect();
    members.sort_by(|a, b| a.name.cmp(&b.name));
    ApiResponse::ok(&members)
}

// Reports

pub async fn report_summary(call: &Call<'_>) -> Response {
    let to = match call.req.query("to") {
        Some(value) => parse_date("to", value)?,
        None => Utc::now().date_naive(),
    };
    let from = match call.req.query("from") {
        Some(value) => parse_date("from", value)?,
        None => to - Duration::days(DEFAULT_REPORT_DAYS),
    };
    if from > to {
        return Err(ApiError::BadRequest("from must not be after to".to_string()));
    }

    if let Some(cached) = call.state.reports.get(from, to).await {
        debug!(%from, %to, "report served from cache");
        return ApiResponse::ok(cached.as_ref());
    }
    let summary = summarize(&call.state.store, from, to)?;
    let summary = call.state.reports.insert(summary).await;
    ApiResponse::ok(summary.as_ref())
}

// Handoffs

/// Open handoffs, or every handoff with `?all=true`
pub fn handoffs(call: &Call<'_>) -> Response {
    let handoffs = if call.req.query("all") == Some("true") {
        let mut all = call.state.store.all::<Handoff>()?;
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        all
    } else {
        call.state.store.open_handoffs()?
    };
    ApiResponse::ok(&handoffs)
}

pub fn resolve_handoff(call: &Call<'_>) -> Response {
    let handoff = call.state.store.modify::<Handoff, _>(call.param(0)?, |h| {
        h.resolved = true;
        Ok(())
    })?;
    info!(handoff = %handoff.id, "handoff resolved");
    ApiResponse::ok(&handoff)
}
