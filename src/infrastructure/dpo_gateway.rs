use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    config::GatewayConfig,
    domain::{
        error::GatewayError,
        services::payment_gateway::{
            PaymentGateway, PaymentMethodPreference, ResultCode, TokenCreated, TokenRequest,
            Verification,
        },
    },
};

const XML_DECLARATION: &str = "<?xml version=\"1.0\" encoding=\"utf-8\"?>";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for the DPO `API3G` XML protocol: `createToken`, `verifyToken`,
/// and `cancelToken` POSTed as XML envelopes to a single endpoint.
#[derive(Clone)]
pub struct DpoGateway {
    config: GatewayConfig,
    client: reqwest::Client,
}

impl DpoGateway {
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { config, client })
    }

    async fn post_envelope(&self, xml: String) -> Result<ApiResponse, GatewayError> {
        let response = self
            .client
            .post(self.config.api_url())
            .header(CONTENT_TYPE, "application/xml")
            .body(format!("{XML_DECLARATION}{xml}"))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            // The gateway answers 403 with an API3G envelope explaining the
            // credential problem; surface that text when present.
            let explanation = quick_xml::de::from_str::<ApiResponse>(&body)
                .ok()
                .and_then(|r| r.result_explanation)
                .unwrap_or_else(|| format!("gateway returned HTTP {status}"));
            return Err(GatewayError::Rejected {
                code: status.as_u16().to_string(),
                explanation,
            });
        }

        quick_xml::de::from_str(&body).map_err(|e| GatewayError::MalformedResponse(e.to_string()))
    }
}

#[async_trait]
impl PaymentGateway for DpoGateway {
    async fn create_token(&self, request: &TokenRequest) -> Result<TokenCreated, GatewayError> {
        self.config.ensure_configured()?;

        info!(
            company_ref = %request.company_ref,
            amount = %request.amount,
            currency = %request.currency,
            token = %self.config.masked_token(),
            test_mode = self.config.test_mode,
            "creating gateway token"
        );

        let envelope = CreateTokenEnvelope::build(&self.config, request);
        let xml = quick_xml::se::to_string(&envelope)
            .map_err(|e| GatewayError::Encode(e.to_string()))?;
        let response = self.post_envelope(xml).await?;

        match ResultCode::classify(&response.result) {
            ResultCode::Paid => {
                let token = response.trans_token.ok_or_else(|| {
                    GatewayError::MalformedResponse("missing TransToken".to_string())
                })?;
                let payment_url = self.config.payment_page_url(&token);
                info!(%token, "gateway token created");
                Ok(TokenCreated {
                    token,
                    gateway_ref: response.trans_ref,
                    payment_url,
                })
            }
            _ => Err(GatewayError::Rejected {
                code: response.result,
                explanation: response
                    .result_explanation
                    .unwrap_or_else(|| "unknown error".to_string()),
            }),
        }
    }

    async fn verify_token(&self, token: &str) -> Result<Verification, GatewayError> {
        self.config.ensure_configured()?;

        info!(%token, "verifying gateway token");
        let envelope = TokenActionEnvelope {
            company_token: &self.config.company_token,
            request: "verifyToken",
            transaction_token: token,
        };
        let xml = quick_xml::se::to_string(&envelope)
            .map_err(|e| GatewayError::Encode(e.to_string()))?;
        let response = self.post_envelope(xml).await?;

        let outcome = ResultCode::classify(&response.result);
        if outcome != ResultCode::Paid {
            warn!(
                code = %response.result,
                explanation = response.result_explanation.as_deref().unwrap_or(""),
                "verification did not report a paid transaction"
            );
        }

        let amount = response
            .transaction_amount
            .as_deref()
            .and_then(|v| v.parse().ok());
        Ok(Verification {
            outcome,
            explanation: response.result_explanation.unwrap_or_default(),
            amount,
            currency: response.transaction_currency,
            gateway_ref: response.transaction_ref,
            payment_method: response.acc_ref,
        })
    }

    async fn cancel_token(&self, token: &str) -> Result<(), GatewayError> {
        self.config.ensure_configured()?;

        info!(%token, "cancelling gateway token");
        let envelope = TokenActionEnvelope {
            company_token: &self.config.company_token,
            request: "cancelToken",
            transaction_token: token,
        };
        let xml = quick_xml::se::to_string(&envelope)
            .map_err(|e| GatewayError::Encode(e.to_string()))?;
        let response = self.post_envelope(xml).await?;

        match ResultCode::classify(&response.result) {
            ResultCode::Paid => Ok(()),
            _ => Err(GatewayError::Rejected {
                code: response.result,
                explanation: response.result_explanation.unwrap_or_default(),
            }),
        }
    }
}

// Wire types. Field names follow the gateway's tag names exactly.

#[derive(Debug, Serialize)]
#[serde(rename = "API3G")]
struct CreateTokenEnvelope<'a> {
    #[serde(rename = "CompanyToken")]
    company_token: &'a str,
    #[serde(rename = "Request")]
    request: &'a str,
    #[serde(rename = "Transaction")]
    transaction: TransactionBody<'a>,
    #[serde(rename = "Services")]
    services: Services<'a>,
}

#[derive(Debug, Serialize)]
struct TransactionBody<'a> {
    #[serde(rename = "PaymentAmount")]
    payment_amount: String,
    #[serde(rename = "PaymentCurrency")]
    payment_currency: &'a str,
    #[serde(rename = "CompanyRef")]
    company_ref: &'a str,
    #[serde(rename = "RedirectURL")]
    redirect_url: &'a str,
    #[serde(rename = "BackURL")]
    back_url: &'a str,
    #[serde(rename = "CompanyRefUnique")]
    company_ref_unique: u8,
    #[serde(rename = "PTL")]
    ptl: u32,
    #[serde(rename = "customerFirstName")]
    customer_first_name: &'a str,
    #[serde(rename = "customerLastName")]
    customer_last_name: &'a str,
    #[serde(rename = "customerEmail")]
    customer_email: &'a str,
    #[serde(rename = "customerPhone", skip_serializing_if = "Option::is_none")]
    customer_phone: Option<&'a str>,
    #[serde(rename = "DefaultPayment", skip_serializing_if = "Option::is_none")]
    default_payment: Option<&'static str>,
    #[serde(
        rename = "DefaultPaymentCountry",
        skip_serializing_if = "Option::is_none"
    )]
    default_payment_country: Option<&'static str>,
    #[serde(rename = "DefaultPaymentMNO", skip_serializing_if = "Option::is_none")]
    default_payment_mno: Option<&'static str>,
}

#[derive(Debug, Serialize)]
struct Services<'a> {
    #[serde(rename = "Service")]
    service: Service<'a>,
}

#[derive(Debug, Serialize)]
struct Service<'a> {
    #[serde(rename = "ServiceType")]
    service_type: &'a str,
    #[serde(rename = "ServiceDescription")]
    service_description: &'a str,
    #[serde(rename = "ServiceDate")]
    service_date: String,
}

impl<'a> CreateTokenEnvelope<'a> {
    fn build(config: &'a GatewayConfig, request: &'a TokenRequest) -> Self {
        let (default_payment, default_payment_country, default_payment_mno) =
            match request.method_preference {
                Some(PaymentMethodPreference::Mpesa) => {
                    (Some("MO"), Some("Tanzania"), Some("Vodacom"))
                }
                Some(PaymentMethodPreference::TigoPesa) => {
                    (Some("MO"), Some("Tanzania"), Some("Tigo"))
                }
                Some(PaymentMethodPreference::AirtelMoney) => {
                    (Some("MO"), Some("Tanzania"), Some("Airtel"))
                }
                Some(PaymentMethodPreference::Card) => (Some("CC"), None, None),
                None => (None, None, None),
            };

        Self {
            company_token: &config.company_token,
            request: "createToken",
            transaction: TransactionBody {
                payment_amount: request.amount.round_dp(2).to_string(),
                payment_currency: &request.currency,
                company_ref: &request.company_ref,
                redirect_url: &config.redirect_url,
                back_url: &config.back_url,
                company_ref_unique: 1,
                ptl: config.token_lifetime_minutes,
                customer_first_name: &request.customer.first_name,
                customer_last_name: &request.customer.last_name,
                customer_email: &request.customer.email,
                customer_phone: request.customer.phone.as_deref(),
                default_payment,
                default_payment_country,
                default_payment_mno,
            },
            services: Services {
                service: Service {
                    service_type: &config.service_type,
                    service_description: &request.service_description,
                    // The gateway requires "YYYY/MM/DD HH:MM".
                    service_date: request.service_date.format("%Y/%m/%d %H:%M").to_string(),
                },
            },
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename = "API3G")]
struct TokenActionEnvelope<'a> {
    #[serde(rename = "CompanyToken")]
    company_token: &'a str,
    #[serde(rename = "Request")]
    request: &'a str,
    #[serde(rename = "TransactionToken")]
    transaction_token: &'a str,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(rename = "Result")]
    result: String,
    #[serde(rename = "ResultExplanation")]
    result_explanation: Option<String>,
    #[serde(rename = "TransToken")]
    trans_token: Option<String>,
    #[serde(rename = "TransRef")]
    trans_ref: Option<String>,
    #[serde(rename = "TransactionAmount")]
    transaction_amount: Option<String>,
    #[serde(rename = "TransactionCurrency")]
    transaction_currency: Option<String>,
    #[serde(rename = "TransactionRef")]
    transaction_ref: Option<String>,
    #[serde(rename = "AccRef")]
    acc_ref: Option<String>,
}

/// Server-to-server push notification body. The gateway POSTs the same
/// envelope shape it uses for responses; only the token is trusted, and
/// only as a hint to re-verify.
#[derive(Debug, Deserialize)]
#[serde(rename = "API3G")]
pub struct PushNotification {
    #[serde(rename = "TransactionToken")]
    pub transaction_token: Option<String>,
    #[serde(rename = "CompanyRef")]
    pub company_ref: Option<String>,
}

pub fn parse_notification(xml: &str) -> Result<PushNotification, GatewayError> {
    quick_xml::de::from_str(xml).map_err(|e| GatewayError::MalformedResponse(e.to_string()))
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{body_string_contains, method, path},
    };

    use crate::domain::services::payment_gateway::CustomerInfo;

    use super::*;

    fn config(base_url: String) -> GatewayConfig {
        GatewayConfig {
            company_token: "57466282-EBD7-4ED5-B699-8659330A6996".to_string(),
            service_type: "3854".to_string(),
            currency: "USD".to_string(),
            base_url,
            redirect_url: "https://example.com/api/payments/callback".to_string(),
            back_url: "https://example.com/checkout".to_string(),
            token_lifetime_minutes: 5,
            test_mode: true,
        }
    }

    fn token_request() -> TokenRequest {
        TokenRequest {
            amount: dec!(270.00),
            currency: "USD".to_string(),
            company_ref: "PAY202508251200ABCDEF".to_string(),
            customer: CustomerInfo {
                first_name: "Amina".to_string(),
                last_name: "Hassan".to_string(),
                email: "amina@example.com".to_string(),
                phone: Some("+255712345678".to_string()),
            },
            service_description: "vip ticket - Trade Expo".to_string(),
            service_date: Utc::now(),
            method_preference: Some(PaymentMethodPreference::Mpesa),
        }
    }

    #[tokio::test]
    async fn create_token_returns_token_and_payment_url() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/API/v6/"))
            .and(body_string_contains("createToken"))
            .and(body_string_contains("PAY202508251200ABCDEF"))
            .and(body_string_contains("<CompanyRefUnique>1</CompanyRefUnique>"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "<API3G><Result>000</Result><ResultExplanation>Transaction created</ResultExplanation>\
                 <TransToken>72983CAC-5DB1-4C7F-BD88-352066B71592</TransToken>\
                 <TransRef>49FKEOA</TransRef></API3G>",
            ))
            .mount(&server)
            .await;

        let gateway = DpoGateway::new(config(server.uri())).unwrap();
        let created = gateway.create_token(&token_request()).await.unwrap();

        assert_eq!(created.token, "72983CAC-5DB1-4C7F-BD88-352066B71592");
        assert_eq!(created.gateway_ref.as_deref(), Some("49FKEOA"));
        assert!(
            created
                .payment_url
                .ends_with("/payv3.php?ID=72983CAC-5DB1-4C7F-BD88-352066B71592")
        );
    }

    #[tokio::test]
    async fn create_token_surfaces_gateway_rejection() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/API/v6/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "<API3G><Result>902</Result>\
                 <ResultExplanation>Request data mismatch: duplicate CompanyRef</ResultExplanation></API3G>",
            ))
            .mount(&server)
            .await;

        let gateway = DpoGateway::new(config(server.uri())).unwrap();
        let err = gateway.create_token(&token_request()).await.unwrap_err();

        match err {
            GatewayError::Rejected { code, explanation } => {
                assert_eq!(code, "902");
                assert!(explanation.contains("duplicate CompanyRef"));
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn verify_token_classifies_paid_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/API/v6/"))
            .and(body_string_contains("verifyToken"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "<API3G><Result>000</Result><ResultExplanation>Transaction Paid</ResultExplanation>\
                 <TransactionAmount>270.00</TransactionAmount>\
                 <TransactionCurrency>USD</TransactionCurrency>\
                 <TransactionRef>49FKEOA</TransactionRef>\
                 <AccRef>M-Pesa</AccRef></API3G>",
            ))
            .mount(&server)
            .await;

        let gateway = DpoGateway::new(config(server.uri())).unwrap();
        let verification = gateway.verify_token("TOKEN-1").await.unwrap();

        assert_eq!(verification.outcome, ResultCode::Paid);
        assert_eq!(verification.amount, Some(dec!(270.00)));
        assert_eq!(verification.currency.as_deref(), Some("USD"));
        assert_eq!(verification.payment_method.as_deref(), Some("M-Pesa"));
    }

    #[tokio::test]
    async fn verify_token_reports_declines_without_erroring() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/API/v6/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "<API3G><Result>901</Result>\
                 <ResultExplanation>Transaction declined</ResultExplanation></API3G>",
            ))
            .mount(&server)
            .await;

        let gateway = DpoGateway::new(config(server.uri())).unwrap();
        let verification = gateway.verify_token("TOKEN-1").await.unwrap();

        assert_eq!(verification.outcome, ResultCode::Declined);
        assert_eq!(verification.explanation, "Transaction declined");
    }

    #[tokio::test]
    async fn malformed_response_is_a_distinct_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/API/v6/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not xml at all"))
            .mount(&server)
            .await;

        let gateway = DpoGateway::new(config(server.uri())).unwrap();
        let err = gateway.verify_token("TOKEN-1").await.unwrap_err();
        assert!(matches!(err, GatewayError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn forbidden_response_carries_gateway_explanation() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/API/v6/"))
            .respond_with(ResponseTemplate::new(403).set_body_string(
                "<API3G><Result>802</Result>\
                 <ResultExplanation>Company token does not exist</ResultExplanation></API3G>",
            ))
            .mount(&server)
            .await;

        let gateway = DpoGateway::new(config(server.uri())).unwrap();
        let err = gateway.verify_token("TOKEN-1").await.unwrap_err();

        match err {
            GatewayError::Rejected { code, explanation } => {
                assert_eq!(code, "403");
                assert_eq!(explanation, "Company token does not exist");
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[test]
    fn notification_parse_extracts_token() {
        let body = "<API3G><TransactionToken>TOK-9</TransactionToken>\
                    <CompanyRef>PAY202508250001ABC</CompanyRef></API3G>";
        let note = parse_notification(body).unwrap();
        assert_eq!(note.transaction_token.as_deref(), Some("TOK-9"));
        assert_eq!(note.company_ref.as_deref(), Some("PAY202508250001ABC"));
    }

    #[test]
    fn notification_parse_rejects_garbage() {
        assert!(parse_notification("<<<").is_err());
    }
}
