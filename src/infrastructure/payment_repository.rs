use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    SqlErr, sea_query::Expr,
};
use uuid::Uuid;

use crate::{
    domain::{
        error::RepositoryError,
        models::payment::{Payment, PaymentReference, PaymentStatus},
        repositories::payment_repository::PaymentRepository,
    },
    infrastructure::entity::payments,
};

#[derive(Clone)]
pub struct PostgresPaymentRepository {
    db: DatabaseConnection,
}

impl PostgresPaymentRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn to_domain(model: payments::Model) -> Result<Payment, RepositoryError> {
    let map_err = |e: crate::domain::error::DomainError| RepositoryError::DatabaseError(e.to_string());

    Ok(Payment::reconstruct(
        model.id,
        model.registration_id,
        PaymentReference::new(model.payment_reference).map_err(map_err)?,
        model.subtotal,
        model.discount_amount,
        model.tax_amount,
        model.total_amount,
        model.currency,
        PaymentStatus::parse(&model.status).map_err(map_err)?,
        model.transaction_token,
        model.gateway_reference,
        model.failure_reason,
        model.initiated_at.with_timezone(&Utc),
        model.completed_at.map(|at| at.with_timezone(&Utc)),
    ))
}

#[async_trait]
impl PaymentRepository for PostgresPaymentRepository {
    async fn insert(&self, payment: &Payment) -> Result<(), RepositoryError> {
        let now = Utc::now().fixed_offset();
        let model = payments::ActiveModel {
            id: Set(payment.id()),
            registration_id: Set(payment.registration_id()),
            payment_reference: Set(payment.reference().as_str().to_string()),
            subtotal: Set(payment.subtotal()),
            discount_amount: Set(payment.discount()),
            tax_amount: Set(payment.tax()),
            total_amount: Set(payment.total()),
            currency: Set(payment.currency().to_string()),
            status: Set(payment.status().as_str().to_string()),
            transaction_token: Set(payment.transaction_token().map(str::to_string)),
            gateway_reference: Set(payment.gateway_reference().map(str::to_string)),
            failure_reason: Set(None),
            initiated_at: Set(payment.initiated_at().fixed_offset()),
            completed_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };

        payments::Entity::insert(model)
            .exec(&self.db)
            .await
            .map_err(|e| match e.sql_err() {
                Some(SqlErr::UniqueConstraintViolation(msg)) => RepositoryError::Duplicate(msg),
                _ => RepositoryError::DatabaseError(e.to_string()),
            })?;
        Ok(())
    }

    async fn find_by_reference(
        &self,
        reference: &PaymentReference,
    ) -> Result<Option<Payment>, RepositoryError> {
        let model = payments::Entity::find()
            .filter(payments::Column::PaymentReference.eq(reference.as_str()))
            .one(&self.db)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;
        model.map(to_domain).transpose()
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<Payment>, RepositoryError> {
        let model = payments::Entity::find()
            .filter(payments::Column::TransactionToken.eq(token))
            .one(&self.db)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;
        model.map(to_domain).transpose()
    }

    async fn latest_for_registration(
        &self,
        registration_id: Uuid,
    ) -> Result<Option<Payment>, RepositoryError> {
        let model = payments::Entity::find()
            .filter(payments::Column::RegistrationId.eq(registration_id))
            .order_by_desc(payments::Column::InitiatedAt)
            .one(&self.db)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;
        model.map(to_domain).transpose()
    }

    async fn attach_token(
        &self,
        reference: &PaymentReference,
        token: &str,
        gateway_reference: Option<&str>,
    ) -> Result<(), RepositoryError> {
        payments::Entity::update_many()
            .col_expr(payments::Column::TransactionToken, Expr::value(token))
            .col_expr(
                payments::Column::GatewayReference,
                Expr::value(gateway_reference),
            )
            .col_expr(
                payments::Column::Status,
                Expr::value(PaymentStatus::Processing.as_str()),
            )
            .col_expr(
                payments::Column::UpdatedAt,
                Expr::value(Utc::now().fixed_offset()),
            )
            .filter(payments::Column::PaymentReference.eq(reference.as_str()))
            .filter(payments::Column::Status.is_in([
                PaymentStatus::Pending.as_str(),
                PaymentStatus::Processing.as_str(),
            ]))
            .exec(&self.db)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;
        Ok(())
    }

    async fn mark_approved(
        &self,
        reference: &PaymentReference,
        at: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        // Skips rows already approved so a duplicate verification delivery
        // cannot overwrite completed_at or re-trigger side effects.
        let result = payments::Entity::update_many()
            .col_expr(
                payments::Column::Status,
                Expr::value(PaymentStatus::Approved.as_str()),
            )
            .col_expr(payments::Column::CompletedAt, Expr::value(at.fixed_offset()))
            .col_expr(
                payments::Column::FailureReason,
                Expr::value(Option::<String>::None),
            )
            .col_expr(
                payments::Column::UpdatedAt,
                Expr::value(Utc::now().fixed_offset()),
            )
            .filter(payments::Column::PaymentReference.eq(reference.as_str()))
            .filter(payments::Column::Status.ne(PaymentStatus::Approved.as_str()))
            .exec(&self.db)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        Ok(result.rows_affected > 0)
    }

    async fn mark_declined(
        &self,
        reference: &PaymentReference,
        reason: &str,
    ) -> Result<(), RepositoryError> {
        payments::Entity::update_many()
            .col_expr(
                payments::Column::Status,
                Expr::value(PaymentStatus::Declined.as_str()),
            )
            .col_expr(payments::Column::FailureReason, Expr::value(reason))
            .col_expr(
                payments::Column::UpdatedAt,
                Expr::value(Utc::now().fixed_offset()),
            )
            .filter(payments::Column::PaymentReference.eq(reference.as_str()))
            .filter(payments::Column::Status.ne(PaymentStatus::Approved.as_str()))
            .exec(&self.db)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;
        Ok(())
    }

    async fn mark_cancelled(&self, reference: &PaymentReference) -> Result<(), RepositoryError> {
        payments::Entity::update_many()
            .col_expr(
                payments::Column::Status,
                Expr::value(PaymentStatus::Cancelled.as_str()),
            )
            .col_expr(
                payments::Column::UpdatedAt,
                Expr::value(Utc::now().fixed_offset()),
            )
            .filter(payments::Column::PaymentReference.eq(reference.as_str()))
            .filter(payments::Column::Status.is_in([
                PaymentStatus::Pending.as_str(),
                PaymentStatus::Processing.as_str(),
            ]))
            .exec(&self.db)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;
        Ok(())
    }
}
