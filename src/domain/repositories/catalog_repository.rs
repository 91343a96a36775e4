use async_trait::async_trait;

use crate::domain::{
    error::RepositoryError,
    models::{
        catalog::{AddOnItem, PackagePrice, PromoCode, TicketPrice},
        registration::{ExhibitorPackage, TicketType},
    },
};

#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn ticket_price(
        &self,
        ticket_type: TicketType,
    ) -> Result<Option<TicketPrice>, RepositoryError>;

    async fn package_price(
        &self,
        package_type: ExhibitorPackage,
    ) -> Result<Option<PackagePrice>, RepositoryError>;

    async fn addons_by_ids(&self, ids: &[i32]) -> Result<Vec<AddOnItem>, RepositoryError>;

    /// Lookup by normalized (upper-cased, trimmed) code.
    async fn promo_code(&self, code: &str) -> Result<Option<PromoCode>, RepositoryError>;

    /// Count a use against the code's quota with a conditional increment.
    /// Returns false when the quota was already exhausted.
    async fn consume_promo_code(&self, code: &str) -> Result<bool, RepositoryError>;
}
