use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{
    domain::{
        error::DomainError,
        repositories::{
            payment_repository::PaymentRepository,
            registration_repository::RegistrationRepository,
        },
        services::payment_gateway::{PaymentGateway, PaymentMethodPreference},
    },
    infrastructure::dpo_gateway::parse_notification,
    presentation::handlers::error_response,
    usecase::{
        checkout_usecase::{CheckoutSession, CheckoutUsecase, PaymentStatusView},
        verify_payment_usecase::{VerifyOutcome, VerifyPaymentUsecase},
    },
};

// Request

/// json for the checkout request; the body is optional and only carries the
/// payment method pre-selection for the hosted page
#[derive(Serialize, Deserialize, Default)]
pub struct CheckoutRequest {
    pub method: Option<PaymentMethodPreference>,
}

/// query string the gateway appends on the browser redirect
#[derive(Deserialize)]
pub struct CallbackQuery {
    #[serde(rename = "TransID")]
    pub trans_id: Option<String>,
    #[serde(rename = "TransactionToken")]
    pub transaction_token: Option<String>,
}

// Response

/// json for the checkout response
#[derive(Serialize, Deserialize)]
pub struct CheckoutResponse {
    pub payment_reference: String,
    pub transaction_token: String,
    pub payment_url: String,
}

impl From<CheckoutSession> for CheckoutResponse {
    fn from(session: CheckoutSession) -> Self {
        Self {
            payment_reference: session.payment_reference,
            transaction_token: session.transaction_token,
            payment_url: session.payment_url,
        }
    }
}

/// json reporting the outcome of a verification pass
#[derive(Serialize, Deserialize)]
pub struct VerifyResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registration_reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

impl From<VerifyOutcome> for VerifyResponse {
    fn from(outcome: VerifyOutcome) -> Self {
        match outcome {
            VerifyOutcome::Approved {
                registration_reference,
            } => Self {
                status: "approved".to_string(),
                registration_reference: Some(registration_reference),
                explanation: None,
            },
            VerifyOutcome::AlreadyConfirmed {
                registration_reference,
            } => Self {
                status: "already_confirmed".to_string(),
                registration_reference: Some(registration_reference),
                explanation: None,
            },
            VerifyOutcome::Pending { explanation } => Self {
                status: "pending".to_string(),
                registration_reference: None,
                explanation: Some(explanation),
            },
            VerifyOutcome::Declined { explanation } => Self {
                status: "declined".to_string(),
                registration_reference: None,
                explanation: Some(explanation),
            },
            VerifyOutcome::Expired { explanation } => Self {
                status: "expired".to_string(),
                registration_reference: None,
                explanation: Some(explanation),
            },
            VerifyOutcome::Cancelled => Self {
                status: "cancelled".to_string(),
                registration_reference: None,
                explanation: None,
            },
        }
    }
}

/// json for the payment status endpoint
#[derive(Serialize, Deserialize)]
pub struct PaymentStatusResponse {
    pub payment_reference: String,
    pub status: String,
    pub total: Decimal,
    pub currency: String,
    pub completed_at: Option<String>,
    pub failure_reason: Option<String>,
}

impl From<PaymentStatusView> for PaymentStatusResponse {
    fn from(view: PaymentStatusView) -> Self {
        Self {
            payment_reference: view.payment_reference,
            status: view.status.as_str().to_string(),
            total: view.total,
            currency: view.currency,
            completed_at: view.completed_at.map(|at| at.to_rfc3339()),
            failure_reason: view.failure_reason,
        }
    }
}

/* Router Function and Handler Function */

// Payment Router

/// function return Router object
/// Suppose to be nested by main router

pub fn create_payment_router<
    R: RegistrationRepository + Send + Sync + 'static + Clone,
    P: PaymentRepository + Send + Sync + 'static + Clone,
    G: PaymentGateway + Send + Sync + 'static + Clone,
>(
    checkout_service: CheckoutUsecase<R, P, G>,
    verify_service: VerifyPaymentUsecase<R, P, G>,
) -> Router {
    let state = AppState {
        checkout_service: Arc::new(checkout_service),
        verify_service: Arc::new(verify_service),
    };

    Router::new()
        .route("/payments/callback", get(callback::<R, P, G>))
        .route("/payments/webhook", post(webhook::<R, P, G>))
        .route("/payments/{reference}/checkout", post(checkout::<R, P, G>))
        .route("/payments/{reference}/cancel", post(cancel::<R, P, G>))
        .route("/payments/{reference}", get(status::<R, P, G>))
        .with_state(state)
}

#[derive(Clone)]
pub struct AppState<R: RegistrationRepository, P: PaymentRepository, G: PaymentGateway> {
    pub checkout_service: Arc<CheckoutUsecase<R, P, G>>,
    pub verify_service: Arc<VerifyPaymentUsecase<R, P, G>>,
}

// handler function

/// handler function for initiating payment on a registration
async fn checkout<
    R: RegistrationRepository + Send + Sync,
    P: PaymentRepository + Send + Sync,
    G: PaymentGateway + Send + Sync,
>(
    State(state): State<AppState<R, P, G>>,
    Path(reference): Path<String>,
    payload: Option<Json<CheckoutRequest>>,
) -> impl IntoResponse {
    let Json(payload) = payload.unwrap_or_default();
    match state
        .checkout_service
        .checkout(&reference, payload.method)
        .await
    {
        Ok(session) => {
            let response: CheckoutResponse = session.into();
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => error_response(e),
    }
}

/// handler function for the gateway's browser redirect; the token is only a
/// hint and the gateway is re-queried before anything changes
async fn callback<
    R: RegistrationRepository + Send + Sync,
    P: PaymentRepository + Send + Sync,
    G: PaymentGateway + Send + Sync,
>(
    State(state): State<AppState<R, P, G>>,
    Query(query): Query<CallbackQuery>,
) -> impl IntoResponse {
    let Some(token) = query.trans_id.or(query.transaction_token) else {
        return error_response(DomainError::Validation(
            "missing transaction token".to_string(),
        ));
    };

    match state.verify_service.verify_by_token(&token).await {
        Ok(outcome) => {
            let response: VerifyResponse = outcome.into();
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => error_response(e),
    }
}

/// handler function for the gateway's server-to-server push notification;
/// carries raw xml and, like the redirect, only triggers a verification
async fn webhook<
    R: RegistrationRepository + Send + Sync,
    P: PaymentRepository + Send + Sync,
    G: PaymentGateway + Send + Sync,
>(
    State(state): State<AppState<R, P, G>>,
    body: String,
) -> impl IntoResponse {
    let notification = match parse_notification(&body) {
        Ok(notification) => notification,
        Err(e) => {
            warn!(error = %e, "unparseable push notification");
            return (StatusCode::BAD_REQUEST, "ERROR").into_response();
        }
    };
    let Some(token) = notification.transaction_token else {
        return (StatusCode::BAD_REQUEST, "ERROR").into_response();
    };

    // The gateway retries until it sees OK, so every handled outcome
    // acknowledges even when the payment is not (yet) approved.
    match state.verify_service.verify_by_token(&token).await {
        Ok(_) => (StatusCode::OK, "OK").into_response(),
        Err(DomainError::PaymentNotFound) => (StatusCode::NOT_FOUND, "ERROR").into_response(),
        Err(e) => {
            warn!(error = %e, "push notification verification failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "ERROR").into_response()
        }
    }
}

/// handler function for cancelling an unpaid registration
async fn cancel<
    R: RegistrationRepository + Send + Sync,
    P: PaymentRepository + Send + Sync,
    G: PaymentGateway + Send + Sync,
>(
    State(state): State<AppState<R, P, G>>,
    Path(reference): Path<String>,
) -> impl IntoResponse {
    match state.checkout_service.cancel(&reference).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(e),
    }
}

/// handler function for the payment status of a registration
async fn status<
    R: RegistrationRepository + Send + Sync,
    P: PaymentRepository + Send + Sync,
    G: PaymentGateway + Send + Sync,
>(
    State(state): State<AppState<R, P, G>>,
    Path(reference): Path<String>,
) -> impl IntoResponse {
    match state.checkout_service.status(&reference).await {
        Ok(view) => {
            let response: PaymentStatusResponse = view.into();
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => error_response(e),
    }
}
