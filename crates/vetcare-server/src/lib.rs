//! VetCare+ Server - JSON API for the client and professional portals
//!
//! Requests flow through one pipeline:
//! - route lookup in a regex table
//! - bearer-token authentication and role checks
//! - per-caller rate limiting on the generative routes
//! - the endpoint handler, whose errors map to HTTP statuses in [`ApiError`]

pub mod auth;
pub mod cache;
pub mod config;
pub mod error;
pub mod handlers;
pub mod http;
pub mod rate_limit;
pub mod reports;
pub mod router;
pub mod state;

pub use auth::{authorize, AuthProvider, Identity, Role, TokenAuthProvider, TokenEntry};
pub use cache::{CacheConfig, ReportCache};
pub use config::{Config, ConfigError};
pub use error::ApiError;
pub use http::{ApiRequest, ApiResponse};
pub use rate_limit::{RateLimitConfig, RateLimitResult, RateLimiter};
pub use reports::{summarize, ReportSummary};
pub use router::{Access, Endpoint, RouteError, RouteMatch, Router};
pub use state::AppState;

use handlers::{ai, client, professional, Call};
use hyper::Method;
use serde_json::json;
use tracing::debug;

/// Run one request through routing, auth, rate limiting and its handler
pub async fn dispatch(state: &AppState, req: ApiRequest) -> ApiResponse {
    match handle(state, &req).await {
        Ok(response) => response,
        Err(e) => {
            debug!(method = %req.method, path = %req.path, status = e.status().as_u16(), "request rejected");
            e.into_response()
        }
    }
}

async fn handle(state: &AppState, req: &ApiRequest) -> Result<ApiResponse, ApiError> {
    let matched = state
        .router
        .route(&req.method, &req.path)
        .map_err(|e| match e {
            RouteError::NotFound => ApiError::NotFound(format!("route {}", req.path)),
            RouteError::MethodNotAllowed => ApiError::MethodNotAllowed,
        })?;

    let identity = req
        .bearer
        .as_deref()
        .and_then(|token| state.auth.authenticate(token));
    let identity = authorize(matched.access, identity)?;

    if matched.endpoint.is_ai() {
        if let Some(identity) = &identity {
            if let RateLimitResult::Limited { retry_after, .. } =
                state.limiter.check(&identity.uid).await
            {
                return Err(ApiError::RateLimited { retry_after });
            }
        }
    }

    let call = Call {
        state,
        req,
        params: &matched.params,
        identity: identity.as_ref(),
    };

    // Any successful portal write may change a report total
    let writes = req.method != Method::GET && !matched.endpoint.is_ai();

    use Endpoint as E;
    let response = match matched.endpoint {
        E::Health => ApiResponse::ok(&json!({ "status": "ok" })),

        E::Me => client::me(&call),
        E::PutMe => client::put_me(&call),
        E::MyPets => client::pets(&call),
        E::CreateMyPet => client::create_pet(&call),
        E::MyPet => client::pet(&call),
        E::UpdateMyPet => client::update_pet(&call),
        E::DeleteMyPet => client::delete_pet(&call),
        E::MyPetHistory => client::pet_history(&call),
        E::MyAppointments => client::appointments(&call),
        E::BookAppointment => client::book(&call),
        E::CancelAppointment => client::cancel(&call),
        E::MyInvoices => client::invoices(&call),

        E::Patients => professional::patients(&call),
        E::Patient => professional::patient(&call),
        E::AddHistory => professional::add_history(&call),
        E::Tutors => professional::tutors(&call),
        E::CreateTutor => professional::create_tutor(&call),
        E::TutorById => professional::tutor(&call),
        E::Agenda => professional::agenda(&call),
        E::CreateAppointment => professional::create_appointment(&call),
        E::UpdateAppointment => professional::update_appointment(&call),
        E::SetAppointmentStatus => professional::set_appointment_status(&call),
        E::Inventory => professional::inventory(&call),
        E::CreateInventoryItem => professional::create_item(&call),
        E::UpdateInventoryItem => professional::update_item(&call),
        E::DeleteInventoryItem => professional::delete_item(&call),
        E::LowStock => professional::low_stock(&call),
        E::DeductStock => professional::deduct(&call),
        E::Invoices => professional::invoices(&call),
        E::CreateInvoice => professional::create_invoice(&call),
        E::InvoiceById => professional::invoice(&call),
        E::SetInvoiceStatus => professional::set_invoice_status(&call),
        E::Staff => professional::staff(&call),
        E::CreateStaff => professional::create_staff(&call),
        E::UpdateStaff => professional::update_staff(&call),
        E::OnDuty => professional::on_duty(&call),
        E::ReportSummary => professional::report_summary(&call).await,
        E::Handoffs => professional::handoffs(&call),
        E::ResolveHandoff => professional::resolve_handoff(&call),

        E::Chat => ai::chat(&call).await,
        E::CarePlan => ai::care_plan(&call).await,
        E::SuggestTimes => ai::suggest_times(&call).await,
    }?;

    if writes {
        state.reports.clear();
    }
    Ok(response)
}
