use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Registration not found")]
    RegistrationNotFound,

    #[error("Payment not found")]
    PaymentNotFound,

    #[error("Registration is already paid")]
    AlreadyPaid,

    #[error("Ticket type is not available")]
    TicketUnavailable,

    #[error("Exhibitor package is not available")]
    PackageUnavailable,

    #[error("Promo code is not valid")]
    InvalidPromoCode,
}

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Not found")]
    NotFound,

    #[error("Duplicate key: {0}")]
    Duplicate(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

/// Errors raised by the payment gateway client. Transport failures and
/// malformed payloads are kept apart from rejections the gateway itself
/// reports, so callers can tell "could not reach the gateway" from
/// "the gateway said no".
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Gateway not configured: {0}")]
    NotConfigured(String),

    #[error("Gateway transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Failed to encode gateway request: {0}")]
    Encode(String),

    #[error("Malformed gateway response: {0}")]
    MalformedResponse(String),

    #[error("Gateway rejected request ({code}): {explanation}")]
    Rejected { code: String, explanation: String },
}
