use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::error::GatewayError;

/// Gateway result codes, classified instead of collapsed to one boolean.
/// `000` is the only paid state; several non-paid codes still mean the
/// transaction may complete (bank confirmation outstanding), and those must
/// not be reported to the registrant as a decline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultCode {
    /// 000 - transaction paid.
    Paid,
    /// 001 / 003 / 005 - authorized or queued, waiting on bank confirmation.
    PendingConfirmation,
    /// 900 - token created but customer has not paid yet.
    NotPaid,
    /// 901 / 902 - declined by the issuer or data mismatch.
    Declined,
    /// 903 - payment time limit passed.
    Expired,
    /// 904 - transaction cancelled.
    Cancelled,
    /// 801-804 / 950 - request or credential error on our side.
    RequestError,
    Unknown(String),
}

impl ResultCode {
    pub fn classify(code: &str) -> Self {
        match code {
            "000" => Self::Paid,
            "001" | "003" | "005" => Self::PendingConfirmation,
            "900" => Self::NotPaid,
            "901" | "902" => Self::Declined,
            "903" => Self::Expired,
            "904" => Self::Cancelled,
            "801" | "802" | "803" | "804" | "950" => Self::RequestError,
            other => Self::Unknown(other.to_string()),
        }
    }
}

/// Optional pre-selection of the payment instrument on the gateway's hosted
/// page, mapped to the gateway's mobile-network operator fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethodPreference {
    Mpesa,
    TigoPesa,
    AirtelMoney,
    Card,
}

#[derive(Debug, Clone)]
pub struct CustomerInfo {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
}

/// Everything `createToken` needs. `company_ref` is the unique payment
/// reference; the gateway rejects a duplicate.
#[derive(Debug, Clone)]
pub struct TokenRequest {
    pub amount: Decimal,
    pub currency: String,
    pub company_ref: String,
    pub customer: CustomerInfo,
    pub service_description: String,
    pub service_date: DateTime<Utc>,
    pub method_preference: Option<PaymentMethodPreference>,
}

#[derive(Debug, Clone)]
pub struct TokenCreated {
    pub token: String,
    pub gateway_ref: Option<String>,
    pub payment_url: String,
}

/// Authoritative transaction state as reported by `verifyToken`.
#[derive(Debug, Clone)]
pub struct Verification {
    pub outcome: ResultCode,
    pub explanation: String,
    pub amount: Option<Decimal>,
    pub currency: Option<String>,
    pub gateway_ref: Option<String>,
    pub payment_method: Option<String>,
}

/// Client for the external payment processor. `verify_token` is the sole
/// source of truth for marking a payment complete; redirect and webhook
/// deliveries are hints that trigger a verification, never a state change
/// on their own.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_token(&self, request: &TokenRequest) -> Result<TokenCreated, GatewayError>;

    async fn verify_token(&self, token: &str) -> Result<Verification, GatewayError>;

    /// Best-effort cleanup of an abandoned transaction.
    async fn cancel_token(&self, token: &str) -> Result<(), GatewayError>;
}
