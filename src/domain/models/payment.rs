use chrono::{DateTime, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::error::DomainError;

/// Unique merchant reference sent to the gateway as `CompanyRef`. The
/// gateway enforces uniqueness on its side (`CompanyRefUnique`), so this is
/// the idempotency key correlating our payment row with its transaction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PaymentReference(String);

impl PaymentReference {
    pub fn generate() -> Self {
        const ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
        let mut rng = rand::thread_rng();
        let suffix: String = (0..6)
            .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
            .collect();
        Self(format!("PAY{}{}", Utc::now().format("%Y%m%d%H%M"), suffix))
    }

    pub fn new(value: String) -> Result<Self, DomainError> {
        if value.is_empty() || value.len() > 100 {
            return Err(DomainError::Validation(
                "invalid payment reference".to_string(),
            ));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Payment lifecycle. Terminal once `Approved`, `Declined`, or `Cancelled`;
/// status only moves forward on gateway verification responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Processing,
    Approved,
    Declined,
    Cancelled,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Approved => "approved",
            Self::Declined => "declined",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Result<Self, DomainError> {
        match value {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "approved" => Ok(Self::Approved),
            "declined" => Ok(Self::Declined),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(DomainError::Validation(format!(
                "unknown payment status: {other}"
            ))),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Approved | Self::Declined | Self::Cancelled)
    }
}

#[derive(Debug, Clone)]
pub struct Payment {
    id: Uuid,
    registration_id: Uuid,
    reference: PaymentReference,
    subtotal: Decimal,
    discount: Decimal,
    tax: Decimal,
    total: Decimal,
    currency: String,
    status: PaymentStatus,
    transaction_token: Option<String>,
    gateway_reference: Option<String>,
    failure_reason: Option<String>,
    initiated_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl Payment {
    /// Tax is carried in the model but nothing computes it today, matching
    /// the current billing rules. `total = subtotal - discount + tax`.
    pub fn new(
        registration_id: Uuid,
        subtotal: Decimal,
        discount: Decimal,
        tax: Decimal,
        currency: String,
    ) -> Result<Self, DomainError> {
        if subtotal < Decimal::ZERO || discount < Decimal::ZERO || tax < Decimal::ZERO {
            return Err(DomainError::Validation(
                "payment amounts cannot be negative".to_string(),
            ));
        }
        let total = subtotal - discount + tax;
        if total < Decimal::ZERO {
            return Err(DomainError::Validation(
                "discount cannot exceed subtotal".to_string(),
            ));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            registration_id,
            reference: PaymentReference::generate(),
            subtotal,
            discount,
            tax,
            total,
            currency,
            status: PaymentStatus::Pending,
            transaction_token: None,
            gateway_reference: None,
            failure_reason: None,
            initiated_at: Utc::now(),
            completed_at: None,
        })
    }

    #[allow(clippy::too_many_arguments)]
    pub fn reconstruct(
        id: Uuid,
        registration_id: Uuid,
        reference: PaymentReference,
        subtotal: Decimal,
        discount: Decimal,
        tax: Decimal,
        total: Decimal,
        currency: String,
        status: PaymentStatus,
        transaction_token: Option<String>,
        gateway_reference: Option<String>,
        failure_reason: Option<String>,
        initiated_at: DateTime<Utc>,
        completed_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id,
            registration_id,
            reference,
            subtotal,
            discount,
            tax,
            total,
            currency,
            status,
            transaction_token,
            gateway_reference,
            failure_reason,
            initiated_at,
            completed_at,
        }
    }

    /// Record the gateway token after `createToken` and move to `Processing`.
    /// A resolved payment stays resolved; retries go through a fresh payment.
    pub fn attach_token(&mut self, token: String, gateway_reference: Option<String>) {
        if self.status.is_terminal() {
            return;
        }
        self.transaction_token = Some(token);
        self.gateway_reference = gateway_reference;
        self.status = PaymentStatus::Processing;
    }

    /// Resolve as approved. Returns false when already approved, so the
    /// redirect and webhook paths cannot double-apply side effects.
    pub fn mark_approved(&mut self, at: DateTime<Utc>) -> bool {
        if self.status == PaymentStatus::Approved {
            return false;
        }
        self.status = PaymentStatus::Approved;
        self.completed_at = Some(at);
        self.failure_reason = None;
        true
    }

    pub fn mark_declined(&mut self, reason: String) {
        if self.status != PaymentStatus::Approved {
            self.status = PaymentStatus::Declined;
            self.failure_reason = Some(reason);
        }
    }

    pub fn mark_cancelled(&mut self) {
        if !self.status.is_terminal() {
            self.status = PaymentStatus::Cancelled;
        }
    }

    pub fn is_approved(&self) -> bool {
        self.status == PaymentStatus::Approved
    }

    pub fn id(&self) -> Uuid {
        self.id
    }
    pub fn registration_id(&self) -> Uuid {
        self.registration_id
    }
    pub fn reference(&self) -> &PaymentReference {
        &self.reference
    }
    pub fn subtotal(&self) -> Decimal {
        self.subtotal
    }
    pub fn discount(&self) -> Decimal {
        self.discount
    }
    pub fn tax(&self) -> Decimal {
        self.tax
    }
    pub fn total(&self) -> Decimal {
        self.total
    }
    pub fn currency(&self) -> &str {
        &self.currency
    }
    pub fn status(&self) -> PaymentStatus {
        self.status
    }
    pub fn transaction_token(&self) -> Option<&str> {
        self.transaction_token.as_deref()
    }
    pub fn gateway_reference(&self) -> Option<&str> {
        self.gateway_reference.as_deref()
    }
    pub fn failure_reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }
    pub fn initiated_at(&self) -> DateTime<Utc> {
        self.initiated_at
    }
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn total_is_subtotal_minus_discount_plus_tax() {
        let payment = Payment::new(
            Uuid::new_v4(),
            dec!(300.00),
            dec!(30.00),
            Decimal::ZERO,
            "USD".to_string(),
        )
        .unwrap();
        assert_eq!(payment.total(), dec!(270.00));
        assert_eq!(payment.tax(), Decimal::ZERO);
    }

    #[test]
    fn rejects_discount_larger_than_subtotal() {
        let result = Payment::new(
            Uuid::new_v4(),
            dec!(100.00),
            dec!(150.00),
            Decimal::ZERO,
            "USD".to_string(),
        );
        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[test]
    fn mark_approved_only_applies_once() {
        let mut payment = Payment::new(
            Uuid::new_v4(),
            dec!(270.00),
            Decimal::ZERO,
            Decimal::ZERO,
            "USD".to_string(),
        )
        .unwrap();
        let first = Utc::now();
        assert!(payment.mark_approved(first));
        assert!(!payment.mark_approved(Utc::now()));
        assert_eq!(payment.completed_at(), Some(first));
    }

    #[test]
    fn decline_after_approval_is_ignored() {
        let mut payment = Payment::new(
            Uuid::new_v4(),
            dec!(50.00),
            Decimal::ZERO,
            Decimal::ZERO,
            "USD".to_string(),
        )
        .unwrap();
        payment.mark_approved(Utc::now());
        payment.mark_declined("late webhook".to_string());
        assert_eq!(payment.status(), PaymentStatus::Approved);
        assert!(payment.failure_reason().is_none());
    }

    #[test]
    fn attach_token_does_not_reopen_a_resolved_payment() {
        let mut payment = Payment::new(
            Uuid::new_v4(),
            dec!(100.00),
            Decimal::ZERO,
            Decimal::ZERO,
            "USD".to_string(),
        )
        .unwrap();
        payment.attach_token("TOK-1".to_string(), None);
        payment.mark_declined("declined".to_string());

        payment.attach_token("TOK-2".to_string(), None);
        assert_eq!(payment.status(), PaymentStatus::Declined);
        assert_eq!(payment.transaction_token(), Some("TOK-1"));
    }

    #[test]
    fn payment_references_are_distinct() {
        let a = PaymentReference::generate();
        let b = PaymentReference::generate();
        assert!(a.as_str().starts_with("PAY"));
        assert_ne!(a, b);
    }
}
