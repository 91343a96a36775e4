pub mod payment_handler;
pub mod registration_handler;

use axum::{Json, http::StatusCode, response::IntoResponse, response::Response};
use serde::{Deserialize, Serialize};

use crate::domain::error::{DomainError, RepositoryError};

/// json error body shared by all handlers
#[derive(Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub(crate) fn error_response(err: DomainError) -> Response {
    let status = match &err {
        DomainError::Validation(_)
        | DomainError::InvalidPromoCode
        | DomainError::TicketUnavailable
        | DomainError::PackageUnavailable => StatusCode::BAD_REQUEST,
        DomainError::RegistrationNotFound
        | DomainError::PaymentNotFound
        | DomainError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        DomainError::AlreadyPaid
        | DomainError::Repository(RepositoryError::Duplicate(_)) => StatusCode::CONFLICT,
        DomainError::Gateway(_) => StatusCode::BAD_GATEWAY,
        DomainError::Repository(RepositoryError::DatabaseError(_)) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
        .into_response()
}
