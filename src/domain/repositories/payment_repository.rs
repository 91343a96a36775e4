use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{
    error::RepositoryError,
    models::payment::{Payment, PaymentReference},
};

#[async_trait]
pub trait PaymentRepository: Send + Sync {
    /// Insert a new payment row. The payment reference carries a unique
    /// index; a collision surfaces as `RepositoryError::Duplicate`.
    async fn insert(&self, payment: &Payment) -> Result<(), RepositoryError>;

    async fn find_by_reference(
        &self,
        reference: &PaymentReference,
    ) -> Result<Option<Payment>, RepositoryError>;

    async fn find_by_token(&self, token: &str) -> Result<Option<Payment>, RepositoryError>;

    async fn latest_for_registration(
        &self,
        registration_id: uuid::Uuid,
    ) -> Result<Option<Payment>, RepositoryError>;

    async fn attach_token(
        &self,
        reference: &PaymentReference,
        token: &str,
        gateway_reference: Option<&str>,
    ) -> Result<(), RepositoryError>;

    /// Mark approved with a conditional write that skips rows already
    /// approved. Returns false when nothing was updated.
    async fn mark_approved(
        &self,
        reference: &PaymentReference,
        at: DateTime<Utc>,
    ) -> Result<bool, RepositoryError>;

    async fn mark_declined(
        &self,
        reference: &PaymentReference,
        reason: &str,
    ) -> Result<(), RepositoryError>;

    async fn mark_cancelled(&self, reference: &PaymentReference) -> Result<(), RepositoryError>;
}
