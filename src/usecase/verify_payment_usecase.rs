use chrono::Utc;
use tracing::{info, warn};

use crate::domain::{
    error::{DomainError, GatewayError},
    repositories::{
        payment_repository::PaymentRepository, registration_repository::RegistrationRepository,
    },
    services::payment_gateway::{PaymentGateway, ResultCode},
};

/// Outcome of a verification pass, as reported to the caller. `Approved`
/// fires exactly once per payment; any later delivery of the same token
/// resolves to `AlreadyConfirmed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyOutcome {
    Approved {
        registration_reference: String,
    },
    AlreadyConfirmed {
        registration_reference: String,
    },
    /// Gateway still waits on bank confirmation or customer action; nothing
    /// is recorded and the payment stays in processing.
    Pending {
        explanation: String,
    },
    Declined {
        explanation: String,
    },
    Expired {
        explanation: String,
    },
    Cancelled,
}

/// The sole path by which a payment becomes approved. Both the browser
/// redirect and the webhook funnel into `verify_by_token`; neither is
/// trusted without the gateway's `verifyToken` answer.
pub struct VerifyPaymentUsecase<R, P, G> {
    registrations: R,
    payments: P,
    gateway: G,
}

impl<R, P, G> VerifyPaymentUsecase<R, P, G>
where
    R: RegistrationRepository,
    P: PaymentRepository,
    G: PaymentGateway,
{
    pub fn new(registrations: R, payments: P, gateway: G) -> Self {
        Self {
            registrations,
            payments,
            gateway,
        }
    }

    pub async fn verify_by_token(&self, token: &str) -> Result<VerifyOutcome, DomainError> {
        let payment = self
            .payments
            .find_by_token(token)
            .await?
            .ok_or(DomainError::PaymentNotFound)?;
        let registration = self
            .registrations
            .find_by_id(payment.registration_id())
            .await?
            .ok_or(DomainError::RegistrationNotFound)?;
        let registration_reference = registration.reference().as_str().to_string();

        if payment.is_approved() {
            return Ok(VerifyOutcome::AlreadyConfirmed {
                registration_reference,
            });
        }

        let verification = self.gateway.verify_token(token).await?;

        match verification.outcome {
            ResultCode::Paid => {
                if let Some(amount) = verification.amount {
                    if amount != payment.total() {
                        // Verification stays authoritative for status, but an
                        // amount drift is worth an operator's attention.
                        warn!(
                            payment_reference = payment.reference().as_str(),
                            expected = %payment.total(),
                            reported = %amount,
                            "gateway amount differs from recorded total"
                        );
                    }
                }

                let newly_approved = self
                    .payments
                    .mark_approved(payment.reference(), Utc::now())
                    .await?;
                if !newly_approved {
                    return Ok(VerifyOutcome::AlreadyConfirmed {
                        registration_reference,
                    });
                }

                let confirmed = self
                    .registrations
                    .confirm(registration.reference(), Utc::now())
                    .await?;
                info!(
                    reference = %registration_reference,
                    payment_reference = payment.reference().as_str(),
                    newly_confirmed = confirmed,
                    "payment verified and approved"
                );
                Ok(VerifyOutcome::Approved {
                    registration_reference,
                })
            }
            ResultCode::PendingConfirmation | ResultCode::NotPaid => Ok(VerifyOutcome::Pending {
                explanation: verification.explanation,
            }),
            ResultCode::Declined => {
                self.payments
                    .mark_declined(payment.reference(), &verification.explanation)
                    .await?;
                Ok(VerifyOutcome::Declined {
                    explanation: verification.explanation,
                })
            }
            ResultCode::Expired => {
                self.payments
                    .mark_declined(payment.reference(), &verification.explanation)
                    .await?;
                Ok(VerifyOutcome::Expired {
                    explanation: verification.explanation,
                })
            }
            ResultCode::Cancelled => {
                self.payments.mark_cancelled(payment.reference()).await?;
                Ok(VerifyOutcome::Cancelled)
            }
            ResultCode::RequestError | ResultCode::Unknown(_) => {
                Err(DomainError::Gateway(GatewayError::Rejected {
                    code: match verification.outcome {
                        ResultCode::Unknown(code) => code,
                        _ => "request_error".to_string(),
                    },
                    explanation: verification.explanation,
                }))
            }
        }
    }
}
