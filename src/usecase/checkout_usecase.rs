use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::{
    domain::{
        error::DomainError,
        models::{
            payment::{Payment, PaymentStatus},
            registration::{ReferenceNumber, Registration, RegistrationStatus},
        },
        repositories::{
            payment_repository::PaymentRepository,
            registration_repository::RegistrationRepository,
        },
        services::payment_gateway::{
            CustomerInfo, PaymentGateway, PaymentMethodPreference, TokenRequest,
        },
    },
    usecase::register_usecase::selection_label,
};

/// The event the service sells registrations for; used in the gateway's
/// service description and date fields.
#[derive(Debug, Clone)]
pub struct EventInfo {
    pub name: String,
    pub starts_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CheckoutSession {
    pub payment_reference: String,
    pub transaction_token: String,
    pub payment_url: String,
}

#[derive(Debug, Clone)]
pub struct PaymentStatusView {
    pub payment_reference: String,
    pub status: PaymentStatus,
    pub total: Decimal,
    pub currency: String,
    pub completed_at: Option<DateTime<Utc>>,
    pub failure_reason: Option<String>,
}

pub struct CheckoutUsecase<R, P, G> {
    registrations: R,
    payments: P,
    gateway: G,
    event: EventInfo,
}

impl<R, P, G> CheckoutUsecase<R, P, G>
where
    R: RegistrationRepository,
    P: PaymentRepository,
    G: PaymentGateway,
{
    pub fn new(registrations: R, payments: P, gateway: G, event: EventInfo) -> Self {
        Self {
            registrations,
            payments,
            gateway,
            event,
        }
    }

    /// Initiate payment: create a gateway token for the outstanding amount
    /// and hand back the hosted payment page URL.
    pub async fn checkout(
        &self,
        reference: &str,
        method_preference: Option<PaymentMethodPreference>,
    ) -> Result<CheckoutSession, DomainError> {
        let (registration, payment) = self.load(reference).await?;

        if registration.status() == RegistrationStatus::Confirmed || payment.is_approved() {
            return Err(DomainError::AlreadyPaid);
        }
        if payment.total() <= Decimal::ZERO {
            return Err(DomainError::Validation(
                "registration has nothing to pay".to_string(),
            ));
        }

        // A declined or cancelled attempt is closed for good. Each retry gets
        // a fresh row with a fresh reference, since the gateway rejects a
        // reused CompanyRef.
        let payment = if payment.status().is_terminal() {
            let retry = Payment::new(
                registration.id(),
                payment.subtotal(),
                payment.discount(),
                payment.tax(),
                payment.currency().to_string(),
            )?;
            self.payments.insert(&retry).await?;
            retry
        } else {
            payment
        };

        let request = TokenRequest {
            amount: payment.total(),
            currency: payment.currency().to_string(),
            company_ref: payment.reference().as_str().to_string(),
            customer: CustomerInfo {
                first_name: registration.contact().first_name().to_string(),
                last_name: registration.contact().last_name().to_string(),
                email: registration.contact().email().to_string(),
                phone: registration.contact().phone().map(str::to_string),
            },
            service_description: format!(
                "{} - {}",
                selection_label(registration.selection()),
                self.event.name
            ),
            service_date: self.event.starts_at,
            method_preference,
        };

        let created = self.gateway.create_token(&request).await?;

        self.payments
            .attach_token(
                payment.reference(),
                &created.token,
                created.gateway_ref.as_deref(),
            )
            .await?;
        self.registrations
            .update_status(registration.reference(), RegistrationStatus::PaymentPending)
            .await?;

        info!(
            reference = registration.reference().as_str(),
            payment_reference = payment.reference().as_str(),
            "checkout session created"
        );

        Ok(CheckoutSession {
            payment_reference: payment.reference().as_str().to_string(),
            transaction_token: created.token,
            payment_url: created.payment_url,
        })
    }

    /// Abandon an initiated payment. Gateway-side cancellation is best
    /// effort; the local record is cancelled either way.
    pub async fn cancel(&self, reference: &str) -> Result<(), DomainError> {
        let (registration, payment) = self.load(reference).await?;

        if registration.status() == RegistrationStatus::Confirmed || payment.is_approved() {
            return Err(DomainError::AlreadyPaid);
        }

        if let Some(token) = payment.transaction_token() {
            if let Err(e) = self.gateway.cancel_token(token).await {
                warn!(
                    payment_reference = payment.reference().as_str(),
                    error = %e,
                    "gateway token cancellation failed"
                );
            }
        }

        self.payments.mark_cancelled(payment.reference()).await?;
        self.registrations
            .update_status(registration.reference(), RegistrationStatus::Cancelled)
            .await?;
        Ok(())
    }

    pub async fn status(&self, reference: &str) -> Result<PaymentStatusView, DomainError> {
        let (_, payment) = self.load(reference).await?;
        Ok(PaymentStatusView {
            payment_reference: payment.reference().as_str().to_string(),
            status: payment.status(),
            total: payment.total(),
            currency: payment.currency().to_string(),
            completed_at: payment.completed_at(),
            failure_reason: payment.failure_reason().map(str::to_string),
        })
    }

    async fn load(&self, reference: &str) -> Result<(Registration, Payment), DomainError> {
        let reference = ReferenceNumber::new(reference.to_string())?;
        let registration = self
            .registrations
            .find_by_reference(&reference)
            .await?
            .ok_or(DomainError::RegistrationNotFound)?;
        let payment = self
            .payments
            .latest_for_registration(registration.id())
            .await?
            .ok_or(DomainError::PaymentNotFound)?;
        Ok((registration, payment))
    }
}
