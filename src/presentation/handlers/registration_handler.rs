use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    domain::{
        models::registration::{ExhibitorPackage, ProfessionalCategory, TicketType},
        repositories::{
            catalog_repository::CatalogRepository, payment_repository::PaymentRepository,
            registration_repository::RegistrationRepository,
        },
    },
    presentation::handlers::error_response,
    usecase::register_usecase::{
        AddOnSelection, AttendeeInput, ExhibitorInput, RegisterUsecase, RegistrationDetails,
        RegistrationSummary,
    },
};

// Request

/// json for attendee registration request
#[derive(Serialize, Deserialize)]
pub struct AttendeeRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub organization: Option<String>,
    pub country: Option<String>,
    pub category: Option<String>,
    pub ticket_type: String,
    #[serde(default)]
    pub addons: Vec<AddOnSelection>,
    pub promo_code: Option<String>,
}

/// json for exhibitor registration request
#[derive(Serialize, Deserialize)]
pub struct ExhibitorRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub company_name: String,
    pub country: Option<String>,
    pub package_type: String,
    #[serde(default)]
    pub addons: Vec<AddOnSelection>,
    pub promo_code: Option<String>,
}

// Response

/// json for a freshly created registration
#[derive(Serialize, Deserialize)]
pub struct RegistrationResponse {
    pub reference: String,
    pub confirmation_code: String,
    pub status: String,
    pub payment_reference: String,
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub total_due: Decimal,
    pub currency: String,
}

impl From<RegistrationSummary> for RegistrationResponse {
    fn from(summary: RegistrationSummary) -> Self {
        Self {
            reference: summary.reference,
            confirmation_code: summary.confirmation_code,
            status: summary.status.as_str().to_string(),
            payment_reference: summary.payment_reference,
            subtotal: summary.subtotal,
            discount: summary.discount,
            total_due: summary.total_due,
            currency: summary.currency,
        }
    }
}

/// json for the registration lookup endpoint
#[derive(Serialize, Deserialize)]
pub struct RegistrationDetailsResponse {
    pub reference: String,
    pub kind: String,
    pub status: String,
    pub full_name: String,
    pub email: String,
    pub selection: String,
    pub category: Option<String>,
    pub total_due: Decimal,
    pub currency: String,
    pub payment_status: Option<String>,
    pub confirmed_at: Option<String>,
}

impl From<RegistrationDetails> for RegistrationDetailsResponse {
    fn from(details: RegistrationDetails) -> Self {
        let registration = details.registration;
        Self {
            reference: registration.reference().as_str().to_string(),
            kind: registration.kind().as_str().to_string(),
            status: registration.status().as_str().to_string(),
            full_name: registration.contact().full_name(),
            email: registration.contact().email().to_string(),
            selection: crate::usecase::register_usecase::selection_label(
                registration.selection(),
            ),
            category: registration.category().map(|c| c.as_str().to_string()),
            total_due: registration.total_due(),
            currency: registration.currency().to_string(),
            payment_status: details
                .payment
                .map(|p| p.status().as_str().to_string()),
            confirmed_at: registration.confirmed_at().map(|at| at.to_rfc3339()),
        }
    }
}

/* Router Function and Handler Function */

// Registration Router

/// function return Router object
/// Suppose to be nested by main router

pub fn create_registration_router<
    R: RegistrationRepository + Send + Sync + 'static + Clone,
    P: PaymentRepository + Send + Sync + 'static + Clone,
    C: CatalogRepository + Send + Sync + 'static + Clone,
>(
    register_service: RegisterUsecase<R, P, C>,
) -> Router {
    let state = AppState {
        register_service: Arc::new(register_service),
    };

    Router::new()
        .route("/registrations/attendee", post(register_attendee::<R, P, C>))
        .route(
            "/registrations/exhibitor",
            post(register_exhibitor::<R, P, C>),
        )
        .route("/registrations/{reference}", get(lookup::<R, P, C>))
        .with_state(state)
}

#[derive(Clone)]
pub struct AppState<R: RegistrationRepository, P: PaymentRepository, C: CatalogRepository> {
    pub register_service: Arc<RegisterUsecase<R, P, C>>,
}

// handler function

/// handler function for attendee registration
async fn register_attendee<
    R: RegistrationRepository + Send + Sync,
    P: PaymentRepository + Send + Sync,
    C: CatalogRepository + Send + Sync,
>(
    State(state): State<AppState<R, P, C>>,
    Json(payload): Json<AttendeeRequest>,
) -> impl IntoResponse {
    let ticket_type = match TicketType::parse(&payload.ticket_type) {
        Ok(ticket_type) => ticket_type,
        Err(e) => return error_response(e),
    };
    let category = match payload
        .category
        .as_deref()
        .map(ProfessionalCategory::parse)
        .transpose()
    {
        Ok(category) => category,
        Err(e) => return error_response(e),
    };

    let input = AttendeeInput {
        first_name: payload.first_name,
        last_name: payload.last_name,
        email: payload.email,
        phone: payload.phone,
        organization: payload.organization,
        country: payload.country,
        category,
        ticket_type,
        addons: payload.addons,
        promo_code: payload.promo_code,
    };

    match state.register_service.register_attendee(input).await {
        Ok(summary) => {
            let response: RegistrationResponse = summary.into();
            (StatusCode::CREATED, Json(response)).into_response()
        }
        Err(e) => error_response(e),
    }
}

/// handler function for exhibitor registration
async fn register_exhibitor<
    R: RegistrationRepository + Send + Sync,
    P: PaymentRepository + Send + Sync,
    C: CatalogRepository + Send + Sync,
>(
    State(state): State<AppState<R, P, C>>,
    Json(payload): Json<ExhibitorRequest>,
) -> impl IntoResponse {
    let package_type = match ExhibitorPackage::parse(&payload.package_type) {
        Ok(package_type) => package_type,
        Err(e) => return error_response(e),
    };

    let input = ExhibitorInput {
        first_name: payload.first_name,
        last_name: payload.last_name,
        email: payload.email,
        phone: payload.phone,
        company_name: payload.company_name,
        country: payload.country,
        package_type,
        addons: payload.addons,
        promo_code: payload.promo_code,
    };

    match state.register_service.register_exhibitor(input).await {
        Ok(summary) => {
            let response: RegistrationResponse = summary.into();
            (StatusCode::CREATED, Json(response)).into_response()
        }
        Err(e) => error_response(e),
    }
}

/// handler function for looking a registration up by its reference
async fn lookup<
    R: RegistrationRepository + Send + Sync,
    P: PaymentRepository + Send + Sync,
    C: CatalogRepository + Send + Sync,
>(
    State(state): State<AppState<R, P, C>>,
    Path(reference): Path<String>,
) -> impl IntoResponse {
    match state.register_service.lookup(&reference).await {
        Ok(details) => {
            let response: RegistrationDetailsResponse = details.into();
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => error_response(e),
    }
}
