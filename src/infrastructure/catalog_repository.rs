use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter, sea_query::Expr,
};

use crate::{
    domain::{
        error::RepositoryError,
        models::{
            catalog::{AddOnItem, DiscountKind, PackagePrice, PromoCode, TicketPrice},
            registration::{ExhibitorPackage, TicketType},
        },
        repositories::catalog_repository::CatalogRepository,
    },
    infrastructure::entity::{addon_items, package_prices, promo_codes, ticket_prices},
};

#[derive(Clone)]
pub struct PostgresCatalogRepository {
    db: DatabaseConnection,
}

impl PostgresCatalogRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn promo_to_domain(model: promo_codes::Model) -> Result<PromoCode, RepositoryError> {
    let kind = match model.discount_type.as_str() {
        "percentage" => DiscountKind::Percentage,
        "fixed" => DiscountKind::Fixed,
        other => {
            return Err(RepositoryError::DatabaseError(format!(
                "unknown discount type: {other}"
            )));
        }
    };
    Ok(PromoCode {
        code: model.code,
        kind,
        value: model.discount_value,
        max_discount: model.max_discount,
        min_purchase: model.min_purchase,
        valid_from: model.valid_from.with_timezone(&Utc),
        valid_until: model.valid_until.with_timezone(&Utc),
        max_uses: model.max_uses,
        current_uses: model.current_uses,
        is_active: model.is_active,
    })
}

#[async_trait]
impl CatalogRepository for PostgresCatalogRepository {
    async fn ticket_price(
        &self,
        ticket_type: TicketType,
    ) -> Result<Option<TicketPrice>, RepositoryError> {
        let model = ticket_prices::Entity::find()
            .filter(ticket_prices::Column::TicketType.eq(ticket_type.as_str()))
            .one(&self.db)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        Ok(model.map(|m| TicketPrice {
            ticket_type,
            name: m.name,
            price: m.price,
            currency: m.currency,
            early_bird_price: m.early_bird_price,
            early_bird_deadline: m.early_bird_deadline.map(|at| at.with_timezone(&Utc)),
            is_active: m.is_active,
        }))
    }

    async fn package_price(
        &self,
        package_type: ExhibitorPackage,
    ) -> Result<Option<PackagePrice>, RepositoryError> {
        let model = package_prices::Entity::find()
            .filter(package_prices::Column::PackageType.eq(package_type.as_str()))
            .one(&self.db)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        Ok(model.map(|m| PackagePrice {
            package_type,
            name: m.name,
            price: m.price,
            currency: m.currency,
            included_passes: m.included_passes,
            is_active: m.is_active,
        }))
    }

    async fn addons_by_ids(&self, ids: &[i32]) -> Result<Vec<AddOnItem>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let models = addon_items::Entity::find()
            .filter(addon_items::Column::Id.is_in(ids.to_vec()))
            .all(&self.db)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        Ok(models
            .into_iter()
            .map(|m| AddOnItem {
                id: m.id,
                name: m.name,
                price: m.price,
                currency: m.currency,
                for_attendees: m.for_attendees,
                for_exhibitors: m.for_exhibitors,
                is_active: m.is_active,
            })
            .collect())
    }

    async fn promo_code(&self, code: &str) -> Result<Option<PromoCode>, RepositoryError> {
        let model = promo_codes::Entity::find()
            .filter(promo_codes::Column::Code.eq(PromoCode::normalize(code)))
            .one(&self.db)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;
        model.map(promo_to_domain).transpose()
    }

    async fn consume_promo_code(&self, code: &str) -> Result<bool, RepositoryError> {
        // Atomic increment guarded by the quota, so two concurrent
        // registrations cannot both take the last use.
        let result = promo_codes::Entity::update_many()
            .col_expr(
                promo_codes::Column::CurrentUses,
                Expr::col(promo_codes::Column::CurrentUses).add(1),
            )
            .filter(promo_codes::Column::Code.eq(PromoCode::normalize(code)))
            .filter(promo_codes::Column::IsActive.eq(true))
            .filter(
                Condition::any()
                    .add(promo_codes::Column::MaxUses.is_null())
                    .add(
                        Expr::col(promo_codes::Column::CurrentUses)
                            .lt(Expr::col(promo_codes::Column::MaxUses)),
                    ),
            )
            .exec(&self.db)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        Ok(result.rows_affected > 0)
    }
}
