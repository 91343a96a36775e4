use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{
    error::RepositoryError,
    models::registration::{Registration, ReferenceNumber, RegistrationStatus},
    services::pricing::AddOnLine,
};

#[async_trait]
pub trait RegistrationRepository: Send + Sync {
    /// Persist a new registration together with its add-on purchase lines.
    async fn insert(
        &self,
        registration: &Registration,
        addons: &[AddOnLine],
    ) -> Result<(), RepositoryError>;

    async fn find_by_reference(
        &self,
        reference: &ReferenceNumber,
    ) -> Result<Option<Registration>, RepositoryError>;

    async fn find_by_id(&self, id: uuid::Uuid) -> Result<Option<Registration>, RepositoryError>;

    async fn update_status(
        &self,
        reference: &ReferenceNumber,
        status: RegistrationStatus,
    ) -> Result<(), RepositoryError>;

    /// Set the registration confirmed with a conditional write. Returns
    /// false when it was already confirmed, so concurrent verification
    /// deliveries resolve to exactly one confirmation.
    async fn confirm(
        &self,
        reference: &ReferenceNumber,
        at: DateTime<Utc>,
    ) -> Result<bool, RepositoryError>;
}
