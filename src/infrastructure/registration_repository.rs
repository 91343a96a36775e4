use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, SqlErr,
    sea_query::Expr,
};
use uuid::Uuid;

use crate::{
    domain::{
        error::RepositoryError,
        models::registration::{
            Contact, ExhibitorPackage, ProfessionalCategory, Registration, ReferenceNumber,
            RegistrationKind, RegistrationStatus, Selection, TicketType,
        },
        repositories::registration_repository::RegistrationRepository,
        services::pricing::AddOnLine,
    },
    infrastructure::entity::{addon_purchases, registrations},
};

#[derive(Clone)]
pub struct PostgresRegistrationRepository {
    db: DatabaseConnection,
}

impl PostgresRegistrationRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn to_domain(model: registrations::Model) -> Result<Registration, RepositoryError> {
    let map_err = |e: crate::domain::error::DomainError| RepositoryError::DatabaseError(e.to_string());

    let reference = ReferenceNumber::new(model.reference_number).map_err(map_err)?;
    let kind = RegistrationKind::parse(&model.kind).map_err(map_err)?;
    let status = RegistrationStatus::parse(&model.status).map_err(map_err)?;
    let contact = Contact::new(model.first_name, model.last_name, model.email, model.phone)
        .map_err(map_err)?;

    let selection = match kind {
        RegistrationKind::Attendee => {
            let ticket = model
                .ticket_type
                .ok_or_else(|| RepositoryError::DatabaseError("missing ticket type".to_string()))?;
            Selection::Ticket(TicketType::parse(&ticket).map_err(map_err)?)
        }
        RegistrationKind::Exhibitor => {
            let package = model.package_type.ok_or_else(|| {
                RepositoryError::DatabaseError("missing package type".to_string())
            })?;
            Selection::Package(ExhibitorPackage::parse(&package).map_err(map_err)?)
        }
    };

    let category = model
        .category
        .as_deref()
        .map(ProfessionalCategory::parse)
        .transpose()
        .map_err(map_err)?;

    Ok(Registration::reconstruct(
        model.id,
        reference,
        model.confirmation_code,
        kind,
        status,
        contact,
        model.organization,
        model.country,
        category,
        selection,
        model.company_name,
        model.total_due,
        model.currency,
        model.confirmed_at.map(|at| at.with_timezone(&Utc)),
        model.created_at.with_timezone(&Utc),
    ))
}

#[async_trait]
impl RegistrationRepository for PostgresRegistrationRepository {
    async fn insert(
        &self,
        registration: &Registration,
        addons: &[AddOnLine],
    ) -> Result<(), RepositoryError> {
        let now = Utc::now().fixed_offset();
        let (ticket_type, package_type) = match registration.selection() {
            Selection::Ticket(ticket) => (Some(ticket.as_str().to_string()), None),
            Selection::Package(package) => (None, Some(package.as_str().to_string())),
        };

        let model = registrations::ActiveModel {
            id: Set(registration.id()),
            reference_number: Set(registration.reference().as_str().to_string()),
            confirmation_code: Set(registration.confirmation_code().to_string()),
            kind: Set(registration.kind().as_str().to_string()),
            status: Set(registration.status().as_str().to_string()),
            first_name: Set(registration.contact().first_name().to_string()),
            last_name: Set(registration.contact().last_name().to_string()),
            email: Set(registration.contact().email().to_string()),
            phone: Set(registration.contact().phone().map(str::to_string)),
            organization: Set(registration.organization().map(str::to_string)),
            country: Set(registration.country().map(str::to_string)),
            category: Set(registration
                .category()
                .map(|c| c.as_str().to_string())),
            ticket_type: Set(ticket_type),
            package_type: Set(package_type),
            company_name: Set(registration.company_name().map(str::to_string)),
            total_due: Set(registration.total_due()),
            currency: Set(registration.currency().to_string()),
            confirmed_at: Set(None),
            created_at: Set(registration.created_at().fixed_offset()),
            updated_at: Set(now),
        };

        registrations::Entity::insert(model)
            .exec(&self.db)
            .await
            .map_err(|e| match e.sql_err() {
                Some(SqlErr::UniqueConstraintViolation(msg)) => RepositoryError::Duplicate(msg),
                _ => RepositoryError::DatabaseError(e.to_string()),
            })?;

        if !addons.is_empty() {
            let rows = addons.iter().map(|line| addon_purchases::ActiveModel {
                id: Set(Uuid::new_v4()),
                registration_id: Set(registration.id()),
                addon_id: Set(line.addon_id),
                name: Set(line.name.clone()),
                quantity: Set(line.quantity),
                unit_price: Set(line.unit_price),
                total_price: Set(line.line_total),
                currency: Set(registration.currency().to_string()),
                created_at: Set(now),
            });
            addon_purchases::Entity::insert_many(rows)
                .exec(&self.db)
                .await
                .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;
        }

        Ok(())
    }

    async fn find_by_reference(
        &self,
        reference: &ReferenceNumber,
    ) -> Result<Option<Registration>, RepositoryError> {
        let model = registrations::Entity::find()
            .filter(registrations::Column::ReferenceNumber.eq(reference.as_str()))
            .one(&self.db)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        model.map(to_domain).transpose()
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Registration>, RepositoryError> {
        let model = registrations::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;
        model.map(to_domain).transpose()
    }

    async fn update_status(
        &self,
        reference: &ReferenceNumber,
        status: RegistrationStatus,
    ) -> Result<(), RepositoryError> {
        registrations::Entity::update_many()
            .col_expr(registrations::Column::Status, Expr::value(status.as_str()))
            .col_expr(
                registrations::Column::UpdatedAt,
                Expr::value(Utc::now().fixed_offset()),
            )
            .filter(registrations::Column::ReferenceNumber.eq(reference.as_str()))
            .exec(&self.db)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;
        Ok(())
    }

    async fn confirm(
        &self,
        reference: &ReferenceNumber,
        at: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        // Conditional write so the redirect and webhook paths cannot both
        // "win": only the first transition out of an unconfirmed state
        // reports rows_affected > 0.
        let result = registrations::Entity::update_many()
            .col_expr(
                registrations::Column::Status,
                Expr::value(RegistrationStatus::Confirmed.as_str()),
            )
            .col_expr(
                registrations::Column::ConfirmedAt,
                Expr::value(at.fixed_offset()),
            )
            .col_expr(
                registrations::Column::UpdatedAt,
                Expr::value(Utc::now().fixed_offset()),
            )
            .filter(registrations::Column::ReferenceNumber.eq(reference.as_str()))
            .filter(registrations::Column::ConfirmedAt.is_null())
            .exec(&self.db)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        Ok(result.rows_affected > 0)
    }
}
