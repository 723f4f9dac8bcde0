//! Regex route table

use hyper::Method;
use regex::Regex;

/// Who may call a route
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Public,
    Tutor,
    Professional,
    /// Any authenticated caller
    Any,
}

/// Every operation the API exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Health,

    // Client portal
    Me,
    PutMe,
    MyPets,
    CreateMyPet,
    MyPet,
    UpdateMyPet,
    DeleteMyPet,
    MyPetHistory,
    MyAppointments,
    BookAppointment,
    CancelAppointment,
    MyInvoices,

    // Professional portal
    Patients,
    Patient,
    AddHistory,
    Tutors,
    CreateTutor,
    TutorById,
    Agenda,
    CreateAppointment,
    UpdateAppointment,
    SetAppointmentStatus,
    Inventory,
    CreateInventoryItem,
    UpdateInventoryItem,
    DeleteInventoryItem,
    LowStock,
    DeductStock,
    Invoices,
    CreateInvoice,
    InvoiceById,
    SetInvoiceStatus,
    Staff,
    CreateStaff,
    UpdateStaff,
    OnDuty,
    ReportSummary,
    Handoffs,
    ResolveHandoff,

    // Generative flows
    Chat,
    CarePlan,
    SuggestTimes,
}

impl Endpoint {
    /// Routes that call the generative model
    pub fn is_ai(&self) -> bool {
        matches!(
            self,
            Endpoint::Chat | Endpoint::CarePlan | Endpoint::SuggestTimes
        )
    }
}

/// Result of routing a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch {
    pub endpoint: Endpoint,
    pub access: Access,
    /// Capture groups from the path pattern
    pub params: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    NotFound,
    /// The path exists under another method
    MethodNotAllowed,
}

struct Route {
    method: Method,
    pattern: Regex,
    endpoint: Endpoint,
    access: Access,
}

const ID: &str = "([^/]+)";

/// Route table, matched in declaration order
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    pub fn new() -> Result<Self, regex::Error> {
        use Access::*;
        use Endpoint::*;

        let table: &[(Method, &str, Endpoint, Access)] = &[
            (Method::GET, "/health", Health, Public),
            // Client portal
            (Method::GET, "/api/me", Me, Tutor),
            (Method::PUT, "/api/me", PutMe, Tutor),
            (Method::GET, "/api/me/pets", MyPets, Tutor),
            (Method::POST, "/api/me/pets", CreateMyPet, Tutor),
            (Method::GET, "/api/me/pets/{id}", MyPet, Tutor),
            (Method::PUT, "/api/me/pets/{id}", UpdateMyPet, Tutor),
            (Method::DELETE, "/api/me/pets/{id}", DeleteMyPet, Tutor),
            (Method::GET, "/api/me/pets/{id}/history", MyPetHistory, Tutor),
            (Method::GET, "/api/me/appointments", MyAppointments, Tutor),
            (Method::POST, "/api/me/appointments", BookAppointment, Tutor),
            (Method::POST, "/api/me/appointments/{id}/cancel", CancelAppointment, Tutor),
            (Method::GET, "/api/me/invoices", MyInvoices, Tutor),
            // Professional portal
            (Method::GET, "/api/pro/patients", Patients, Professional),
            (Method::GET, "/api/pro/patients/{id}", Patient, Professional),
            (Method::POST, "/api/pro/patients/{id}/history", AddHistory, Professional),
            (Method::GET, "/api/pro/tutors", Tutors, Professional),
            (Method::POST, "/api/pro/tutors", CreateTutor, Professional),
            (Method::GET, "/api/pro/tutors/{id}", TutorById, Professional),
            (Method::GET, "/api/pro/agenda", Agenda, Professional),
            (Method::POST, "/api/pro/appointments", CreateAppointment, Professional),
            (Method::PUT, "/api/pro/appointments/{id}", UpdateAppointment, Professional),
            (Method::POST, "/api/pro/appointments/{id}/status", SetAppointmentStatus, Professional),
            (Method::GET, "/api/pro/inventory", Inventory, Professional),
            (Method::POST, "/api/pro/inventory", CreateInventoryItem, Professional),
            (Method::GET, "/api/pro/inventory/low-stock", LowStock, Professional),
            (Method::POST, "/api/pro/inventory/deduct", DeductStock, Professional),
            (Method::PUT, "/api/pro/inventory/{id}", UpdateInventoryItem, Professional),
            (Method::DELETE, "/api/pro/inventory/{id}", DeleteInventoryItem, Professional),
            (Method::GET, "/api/pro/invoices", Invoices, Professional),
            (Method::POST, "/api/pro/invoices", CreateInvoice, Professional),
            (Method::GET, "/api/pro/invoices/{id}", InvoiceById, Professional),
            (Method::POST, "/api/pro/invoices/{id}/status", SetInvoiceStatus, Professional),
            (Method::GET, "/api/pro/staff", Staff, Professional),
            (Method::POST, "/api/pro/staff", CreateStaff, Professional),
            (Method::GET, "/api/pro/staff/on-duty", OnDuty, Professional),
            (Method::PUT, "/api/pro/staff/{id}", UpdateStaff, Professional),
            (Method::GET, "/api/pro/reports/summary", ReportSummary, Professional),
            (Method::GET, "/api/pro/handoffs", Handoffs, Professional),
            (Method::POST, "/api/pro/handoffs/{id}/resolve", ResolveHandoff, Professional),
            // Generative flows
            (Method::POST, "/api/ai/chat", Chat, Any),
            (Method::POST, "/api/ai/care-plan", CarePlan, Any),
            (Method::POST, "/api/ai/suggest-times", SuggestTimes, Any),
        ];

        let mut routes = Vec::with_capacity(table.len());
        for (method, path, endpoint, access) in table {
            let pattern = format!("^{}$", path.replace("{id}", ID));
            routes.push(Route {
                method: method.clone(),
                pattern: Regex::new(&pattern)?,
                endpoint: *endpoint,
                access: *access,
            });
        }
        Ok(Self { routes })
    }

    /// Match a request to a route
    pub fn route(&self, method: &Method, path: &str) -> Result<RouteMatch, RouteError> {
        let path = match path.strip_suffix('/') {
            Some(trimmed) if !trimmed.is_empty() => trimmed,
            _ => path,
        };

        let mut path_exists = false;
        for route in &self.routes {
            let Some(captures) = route.pattern.captures(path) else {
                continue;
            };
            if route.method != *method {
                path_exists = true;
                continue;
            }
            let params = captures
                .iter()
                .skip(1) // Skip the full match
                .map(|m| m.map(|m| m.as_str().to_string()).unwrap_or_default())
                .collect();
            return Ok(RouteMatch {
                endpoint: route.endpoint,
                access: route.access,
                params,
            });
        }

        if path_exists {
            Err(RouteError::MethodNotAllowed)
        } else {
            Err(RouteError::NotFound)
        }
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn router() -> Router {
        Router::new().unwrap()
    }

    #[test]
    fn test_static_and_param_routes() {
        let r = router();
        let m = r.route(&Method::GET, "/api/me/pets").unwrap();
        assert_eq!(m.endpoint, Endpoint::MyPets);
        assert_eq!(m.access, Access::Tutor);
        assert!(m.params.is_empty());

        let m = r.route(&Method::GET, "/api/me/pets/abc-123/history").unwrap();
        assert_eq!(m.endpoint, Endpoint::MyPetHistory);
        assert_eq!(m.params, vec!["abc-123"]);

        let m = r.route(&Method::DELETE, "/api/me/pets/abc-123/").unwrap();
        assert_eq!(m.endpoint, Endpoint::DeleteMyPet);
    }

    #[test]
    fn test_fixed_segments_win_over_ids() {
        let r = router();
        assert_eq!(
            r.route(&Method::GET, "/api/pro/inventory/low-stock").unwrap().endpoint,
            Endpoint::LowStock
        );
        assert_eq!(
            r.route(&Method::POST, "/api/pro/inventory/deduct").unwrap().endpoint,
            Endpoint::DeductStock
        );
        assert_eq!(
            r.route(&Method::PUT, "/api/pro/inventory/item-1").unwrap().endpoint,
            Endpoint::UpdateInventoryItem
        );
        assert_eq!(
            r.route(&Method::GET, "/api/pro/staff/on-duty").unwrap().endpoint,
            Endpoint::OnDuty
        );
    }

    #[test]
    fn test_unknown_and_wrong_method() {
        let r = router();
        assert_eq!(r.route(&Method::GET, "/nope"), Err(RouteError::NotFound));
        assert_eq!(
            r.route(&Method::GET, "/api/me/pets/a/b/c"),
            Err(RouteError::NotFound)
        );
        assert_eq!(
            r.route(&Method::PATCH, "/api/me"),
            Err(RouteError::MethodNotAllowed)
        );
        assert_eq!(
            r.route(&Method::GET, "/api/ai/chat"),
            Err(RouteError::MethodNotAllowed)
        );
    }

    #[test]
    fn test_ai_routes() {
        let r = router();
        for path in ["/api/ai/chat", "/api/ai/care-plan", "/api/ai/suggest-times"] {
            let m = r.route(&Method::POST, path).unwrap();
            assert!(m.endpoint.is_ai());
            assert_eq!(m.access, Access::Any);
        }
        assert!(!Endpoint::Health.is_ai());
    }
}
