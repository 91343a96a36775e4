use chrono::{DateTime, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::error::DomainError;

const REFERENCE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

fn random_suffix(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| REFERENCE_ALPHABET[rng.gen_range(0..REFERENCE_ALPHABET.len())] as char)
        .collect()
}

/// Value object for the public registration reference (e.g. `BEE20250825X7K2QD`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceNumber(String);

impl ReferenceNumber {
    pub fn generate() -> Self {
        let stamp = Utc::now().format("%Y%m%d");
        Self(format!("BEE{stamp}{}", random_suffix(6)))
    }

    pub fn new(value: String) -> Result<Self, DomainError> {
        if value.is_empty() || value.len() > 50 {
            return Err(DomainError::Validation(
                "invalid reference number".to_string(),
            ));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

pub fn generate_confirmation_code() -> String {
    random_suffix(8)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationKind {
    Attendee,
    Exhibitor,
}

impl RegistrationKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Attendee => "attendee",
            Self::Exhibitor => "exhibitor",
        }
    }

    pub fn parse(value: &str) -> Result<Self, DomainError> {
        match value {
            "attendee" => Ok(Self::Attendee),
            "exhibitor" => Ok(Self::Exhibitor),
            other => Err(DomainError::Validation(format!(
                "unknown registration kind: {other}"
            ))),
        }
    }
}

/// Registration lifecycle. `Confirmed` and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStatus {
    Pending,
    PaymentPending,
    Confirmed,
    Cancelled,
}

impl RegistrationStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "pending",
            Self::PaymentPending => "payment_pending",
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Result<Self, DomainError> {
        match value {
            "pending" => Ok(Self::Pending),
            "payment_pending" => Ok(Self::PaymentPending),
            "confirmed" => Ok(Self::Confirmed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(DomainError::Validation(format!(
                "unknown registration status: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketType {
    Free,
    Standard,
    Vip,
    Student,
    EarlyBird,
}

impl TicketType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Free => "free",
            Self::Standard => "standard",
            Self::Vip => "vip",
            Self::Student => "student",
            Self::EarlyBird => "early_bird",
        }
    }

    pub fn parse(value: &str) -> Result<Self, DomainError> {
        match value {
            "free" => Ok(Self::Free),
            "standard" => Ok(Self::Standard),
            "vip" => Ok(Self::Vip),
            "student" => Ok(Self::Student),
            "early_bird" => Ok(Self::EarlyBird),
            other => Err(DomainError::Validation(format!(
                "unknown ticket type: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExhibitorPackage {
    Bronze,
    Silver,
    Gold,
    Platinum,
}

impl ExhibitorPackage {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Bronze => "bronze",
            Self::Silver => "silver",
            Self::Gold => "gold",
            Self::Platinum => "platinum",
        }
    }

    pub fn parse(value: &str) -> Result<Self, DomainError> {
        match value {
            "bronze" => Ok(Self::Bronze),
            "silver" => Ok(Self::Silver),
            "gold" => Ok(Self::Gold),
            "platinum" => Ok(Self::Platinum),
            other => Err(DomainError::Validation(format!(
                "unknown exhibitor package: {other}"
            ))),
        }
    }
}

/// Self-declared professional category for attendee badges and reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfessionalCategory {
    Business,
    Government,
    Academia,
    Ngo,
    Media,
    Other,
}

impl ProfessionalCategory {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Business => "business",
            Self::Government => "government",
            Self::Academia => "academia",
            Self::Ngo => "ngo",
            Self::Media => "media",
            Self::Other => "other",
        }
    }

    pub fn parse(value: &str) -> Result<Self, DomainError> {
        match value {
            "business" => Ok(Self::Business),
            "government" => Ok(Self::Government),
            "academia" => Ok(Self::Academia),
            "ngo" => Ok(Self::Ngo),
            "media" => Ok(Self::Media),
            "other" => Ok(Self::Other),
            other => Err(DomainError::Validation(format!(
                "unknown professional category: {other}"
            ))),
        }
    }
}

/// Contact identity shared by attendee and exhibitor registrations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    first_name: String,
    last_name: String,
    email: String,
    phone: Option<String>,
}

impl Contact {
    pub fn new(
        first_name: String,
        last_name: String,
        email: String,
        phone: Option<String>,
    ) -> Result<Self, DomainError> {
        let first_name = first_name.trim().to_string();
        let last_name = last_name.trim().to_string();
        if first_name.len() < 2 || last_name.len() < 2 {
            return Err(DomainError::Validation(
                "first and last name must be at least 2 characters".to_string(),
            ));
        }

        let email = email.trim().to_lowercase();
        let valid_email = email
            .split_once('@')
            .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
        if !valid_email {
            return Err(DomainError::Validation("invalid email format".to_string()));
        }

        let phone = phone
            .map(|p| {
                p.chars()
                    .filter(|c| c.is_ascii_digit() || *c == '+' || *c == '-' || *c == ' ')
                    .collect::<String>()
                    .trim()
                    .to_string()
            })
            .filter(|p| !p.is_empty());

        Ok(Self {
            first_name,
            last_name,
            email,
            phone,
        })
    }

    pub fn first_name(&self) -> &str {
        &self.first_name
    }
    pub fn last_name(&self) -> &str {
        &self.last_name
    }
    pub fn email(&self) -> &str {
        &self.email
    }
    pub fn phone(&self) -> Option<&str> {
        self.phone.as_deref()
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// What the registrant selected from the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Ticket(TicketType),
    Package(ExhibitorPackage),
}

#[derive(Debug, Clone)]
pub struct Registration {
    id: Uuid,
    reference: ReferenceNumber,
    confirmation_code: String,
    kind: RegistrationKind,
    status: RegistrationStatus,
    contact: Contact,
    organization: Option<String>,
    country: Option<String>,
    category: Option<ProfessionalCategory>,
    selection: Selection,
    company_name: Option<String>,
    total_due: Decimal,
    currency: String,
    confirmed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl Registration {
    pub fn attendee(
        contact: Contact,
        ticket: TicketType,
        organization: Option<String>,
        country: Option<String>,
        category: Option<ProfessionalCategory>,
        total_due: Decimal,
        currency: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            reference: ReferenceNumber::generate(),
            confirmation_code: generate_confirmation_code(),
            kind: RegistrationKind::Attendee,
            status: RegistrationStatus::Pending,
            contact,
            organization,
            country,
            category,
            selection: Selection::Ticket(ticket),
            company_name: None,
            total_due,
            currency,
            confirmed_at: None,
            created_at: Utc::now(),
        }
    }

    pub fn exhibitor(
        contact: Contact,
        package: ExhibitorPackage,
        company_name: String,
        country: Option<String>,
        total_due: Decimal,
        currency: String,
    ) -> Result<Self, DomainError> {
        let company_name = company_name.trim().to_string();
        if company_name.is_empty() {
            return Err(DomainError::Validation(
                "company name is required for exhibitors".to_string(),
            ));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            reference: ReferenceNumber::generate(),
            confirmation_code: generate_confirmation_code(),
            kind: RegistrationKind::Exhibitor,
            status: RegistrationStatus::Pending,
            contact,
            organization: None,
            country,
            category: None,
            selection: Selection::Package(package),
            company_name: Some(company_name),
            total_due,
            currency,
            confirmed_at: None,
            created_at: Utc::now(),
        })
    }

    #[allow(clippy::too_many_arguments)]
    pub fn reconstruct(
        id: Uuid,
        reference: ReferenceNumber,
        confirmation_code: String,
        kind: RegistrationKind,
        status: RegistrationStatus,
        contact: Contact,
        organization: Option<String>,
        country: Option<String>,
        category: Option<ProfessionalCategory>,
        selection: Selection,
        company_name: Option<String>,
        total_due: Decimal,
        currency: String,
        confirmed_at: Option<DateTime<Utc>>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            reference,
            confirmation_code,
            kind,
            status,
            contact,
            organization,
            country,
            category,
            selection,
            company_name,
            total_due,
            currency,
            confirmed_at,
            created_at,
        }
    }

    /// Move to `Confirmed` once payment is verified. Returns false when the
    /// registration was already confirmed, so duplicate verification
    /// deliveries do not produce duplicate side effects.
    pub fn confirm(&mut self, at: DateTime<Utc>) -> bool {
        if self.status == RegistrationStatus::Confirmed {
            return false;
        }
        self.status = RegistrationStatus::Confirmed;
        self.confirmed_at = Some(at);
        true
    }

    pub fn mark_payment_pending(&mut self) {
        if self.status == RegistrationStatus::Pending {
            self.status = RegistrationStatus::PaymentPending;
        }
    }

    pub fn cancel(&mut self) {
        if self.status != RegistrationStatus::Confirmed {
            self.status = RegistrationStatus::Cancelled;
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }
    pub fn reference(&self) -> &ReferenceNumber {
        &self.reference
    }
    pub fn confirmation_code(&self) -> &str {
        &self.confirmation_code
    }
    pub fn kind(&self) -> RegistrationKind {
        self.kind
    }
    pub fn status(&self) -> RegistrationStatus {
        self.status
    }
    pub fn contact(&self) -> &Contact {
        &self.contact
    }
    pub fn organization(&self) -> Option<&str> {
        self.organization.as_deref()
    }
    pub fn country(&self) -> Option<&str> {
        self.country.as_deref()
    }
    pub fn category(&self) -> Option<ProfessionalCategory> {
        self.category
    }
    pub fn selection(&self) -> &Selection {
        &self.selection
    }
    pub fn company_name(&self) -> Option<&str> {
        self.company_name.as_deref()
    }
    pub fn total_due(&self) -> Decimal {
        self.total_due
    }
    pub fn currency(&self) -> &str {
        &self.currency
    }
    pub fn confirmed_at(&self) -> Option<DateTime<Utc>> {
        self.confirmed_at
    }
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    fn contact() -> Contact {
        Contact::new(
            "Amina".to_string(),
            "Hassan".to_string(),
            "Amina.Hassan@Example.com".to_string(),
            Some("+255 712 345 678".to_string()),
        )
        .unwrap()
    }

    #[test]
    fn reference_numbers_are_prefixed_and_distinct() {
        let a = ReferenceNumber::generate();
        let b = ReferenceNumber::generate();
        assert!(a.as_str().starts_with("BEE"));
        assert_eq!(a.as_str().len(), 3 + 8 + 6);
        assert_ne!(a, b);
    }

    #[test]
    fn contact_normalizes_email() {
        assert_eq!(contact().email(), "amina.hassan@example.com");
    }

    #[test]
    fn contact_rejects_bad_email() {
        let result = Contact::new(
            "Amina".to_string(),
            "Hassan".to_string(),
            "not-an-email".to_string(),
            None,
        );
        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[test]
    fn confirm_is_idempotent() {
        let mut reg = Registration::attendee(
            contact(),
            TicketType::Vip,
            None,
            None,
            None,
            dec!(300.00),
            "USD".to_string(),
        );
        let first = Utc::now();
        assert!(reg.confirm(first));
        assert!(!reg.confirm(Utc::now()));
        assert_eq!(reg.confirmed_at(), Some(first));
        assert_eq!(reg.status(), RegistrationStatus::Confirmed);
    }

    #[test]
    fn cancel_does_not_undo_confirmation() {
        let mut reg = Registration::attendee(
            contact(),
            TicketType::Standard,
            None,
            None,
            None,
            dec!(100.00),
            "USD".to_string(),
        );
        reg.confirm(Utc::now());
        reg.cancel();
        assert_eq!(reg.status(), RegistrationStatus::Confirmed);
    }

    #[test]
    fn exhibitor_requires_company_name() {
        let result = Registration::exhibitor(
            contact(),
            ExhibitorPackage::Gold,
            "  ".to_string(),
            None,
            dec!(2500.00),
            "USD".to_string(),
        );
        assert!(matches!(result, Err(DomainError::Validation(_))));
    }
}
