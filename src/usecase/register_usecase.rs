use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domain::{
    error::DomainError,
    models::{
        payment::Payment,
        registration::{
            Contact, ExhibitorPackage, ProfessionalCategory, Registration, ReferenceNumber,
            RegistrationKind, RegistrationStatus, Selection, TicketType,
        },
    },
    repositories::{
        catalog_repository::CatalogRepository, payment_repository::PaymentRepository,
        registration_repository::RegistrationRepository,
    },
    services::pricing::{self, AddOnLine},
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddOnSelection {
    pub addon_id: i32,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
}

fn default_quantity() -> i32 {
    1
}

#[derive(Debug, Clone)]
pub struct AttendeeInput {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub organization: Option<String>,
    pub country: Option<String>,
    pub category: Option<ProfessionalCategory>,
    pub ticket_type: TicketType,
    pub addons: Vec<AddOnSelection>,
    pub promo_code: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ExhibitorInput {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub company_name: String,
    pub country: Option<String>,
    pub package_type: ExhibitorPackage,
    pub addons: Vec<AddOnSelection>,
    pub promo_code: Option<String>,
}

/// What the caller gets back after registering: the references needed for
/// checkout plus the computed amounts.
#[derive(Debug, Clone)]
pub struct RegistrationSummary {
    pub reference: String,
    pub confirmation_code: String,
    pub status: RegistrationStatus,
    pub payment_reference: String,
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub total_due: Decimal,
    pub currency: String,
}

#[derive(Debug, Clone)]
pub struct RegistrationDetails {
    pub registration: Registration,
    pub payment: Option<Payment>,
}

pub struct RegisterUsecase<R, P, C> {
    registrations: R,
    payments: P,
    catalog: C,
}

impl<R, P, C> RegisterUsecase<R, P, C>
where
    R: RegistrationRepository,
    P: PaymentRepository,
    C: CatalogRepository,
{
    pub fn new(registrations: R, payments: P, catalog: C) -> Self {
        Self {
            registrations,
            payments,
            catalog,
        }
    }

    pub async fn register_attendee(
        &self,
        input: AttendeeInput,
    ) -> Result<RegistrationSummary, DomainError> {
        let contact = Contact::new(input.first_name, input.last_name, input.email, input.phone)?;

        let ticket = self
            .catalog
            .ticket_price(input.ticket_type)
            .await?
            .filter(|t| t.is_active)
            .ok_or(DomainError::TicketUnavailable)?;
        let base_price = ticket.current_price(Utc::now());

        let addon_lines = self
            .addon_lines(&input.addons, RegistrationKind::Attendee)
            .await?;
        let quote = self
            .quoted(base_price, addon_lines, input.promo_code.as_deref())
            .await?;

        let registration = Registration::attendee(
            contact,
            input.ticket_type,
            input.organization,
            input.country,
            input.category,
            quote.total,
            ticket.currency.clone(),
        );
        self.persist(registration, quote).await
    }

    pub async fn register_exhibitor(
        &self,
        input: ExhibitorInput,
    ) -> Result<RegistrationSummary, DomainError> {
        let contact = Contact::new(input.first_name, input.last_name, input.email, input.phone)?;

        let package = self
            .catalog
            .package_price(input.package_type)
            .await?
            .filter(|p| p.is_active)
            .ok_or(DomainError::PackageUnavailable)?;

        let addon_lines = self
            .addon_lines(&input.addons, RegistrationKind::Exhibitor)
            .await?;
        let quote = self
            .quoted(package.price, addon_lines, input.promo_code.as_deref())
            .await?;

        let registration = Registration::exhibitor(
            contact,
            input.package_type,
            input.company_name,
            input.country,
            quote.total,
            package.currency.clone(),
        )?;
        self.persist(registration, quote).await
    }

    pub async fn lookup(&self, reference: &str) -> Result<RegistrationDetails, DomainError> {
        let reference = ReferenceNumber::new(reference.to_string())?;
        let registration = self
            .registrations
            .find_by_reference(&reference)
            .await?
            .ok_or(DomainError::RegistrationNotFound)?;
        let payment = self
            .payments
            .latest_for_registration(registration.id())
            .await?;
        Ok(RegistrationDetails {
            registration,
            payment,
        })
    }

    async fn addon_lines(
        &self,
        selections: &[AddOnSelection],
        kind: RegistrationKind,
    ) -> Result<Vec<AddOnLine>, DomainError> {
        if selections.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<i32> = selections.iter().map(|s| s.addon_id).collect();
        let items = self.catalog.addons_by_ids(&ids).await?;

        let mut lines = Vec::with_capacity(selections.len());
        for selection in selections {
            if selection.quantity < 1 {
                return Err(DomainError::Validation(format!(
                    "add-on quantity must be at least 1, got {}",
                    selection.quantity
                )));
            }
            let item = items
                .iter()
                .find(|item| item.id == selection.addon_id)
                .ok_or_else(|| {
                    DomainError::Validation(format!("unknown add-on: {}", selection.addon_id))
                })?;
            let applicable = match kind {
                RegistrationKind::Attendee => item.for_attendees,
                RegistrationKind::Exhibitor => item.for_exhibitors,
            };
            if !item.is_active || !applicable {
                return Err(DomainError::Validation(format!(
                    "add-on not available: {}",
                    item.name
                )));
            }
            lines.push(AddOnLine::new(item, selection.quantity));
        }
        Ok(lines)
    }

    async fn quoted(
        &self,
        base_price: Decimal,
        addon_lines: Vec<AddOnLine>,
        promo_code: Option<&str>,
    ) -> Result<pricing::Quote, DomainError> {
        let promo = match promo_code {
            Some(code) => {
                let promo = self
                    .catalog
                    .promo_code(code)
                    .await?
                    .filter(|p| p.is_valid_at(Utc::now()))
                    .ok_or(DomainError::InvalidPromoCode)?;
                // Claim a use before persisting; the conditional increment
                // is what enforces the quota under concurrency.
                if !self.catalog.consume_promo_code(code).await? {
                    return Err(DomainError::InvalidPromoCode);
                }
                Some(promo)
            }
            None => None,
        };
        Ok(pricing::quote(base_price, addon_lines, promo.as_ref()))
    }

    async fn persist(
        &self,
        registration: Registration,
        quote: pricing::Quote,
    ) -> Result<RegistrationSummary, DomainError> {
        let payment = Payment::new(
            registration.id(),
            quote.subtotal,
            quote.discount,
            quote.tax,
            registration.currency().to_string(),
        )?;

        self.registrations
            .insert(&registration, &quote.addon_lines)
            .await?;
        self.payments.insert(&payment).await?;

        info!(
            reference = registration.reference().as_str(),
            kind = registration.kind().as_str(),
            total = %payment.total(),
            currency = registration.currency(),
            "registration created"
        );

        Ok(RegistrationSummary {
            reference: registration.reference().as_str().to_string(),
            confirmation_code: registration.confirmation_code().to_string(),
            status: registration.status(),
            payment_reference: payment.reference().as_str().to_string(),
            subtotal: payment.subtotal(),
            discount: payment.discount(),
            total_due: payment.total(),
            currency: registration.currency().to_string(),
        })
    }
}

pub fn selection_label(selection: &Selection) -> String {
    match selection {
        Selection::Ticket(ticket) => format!("{} ticket", ticket.as_str()),
        Selection::Package(package) => format!("{} exhibitor package", package.as_str()),
    }
}
