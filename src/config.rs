use std::net::SocketAddr;

use crate::domain::error::GatewayError;

const SANDBOX_API_URL: &str = "https://secure1.sandbox.directpay.online";
const LIVE_API_URL: &str = "https://secure.3gdirectpay.com";

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub database_url: String,
    pub gateway: GatewayConfig,
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub company_token: String,
    pub service_type: String,
    pub currency: String,
    pub base_url: String,
    pub redirect_url: String,
    pub back_url: String,
    /// Payment token lifetime in minutes (the gateway's PTL field).
    pub token_lifetime_minutes: u32,
    pub test_mode: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let bind_addr = dotenvy::var("BIND_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:8080".to_string())
            .parse::<SocketAddr>()?;
        let database_url = dotenvy::var("DATABASE_URL")?;

        let test_mode = dotenvy::var("DPO_TEST_MODE")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true);
        let base_url = dotenvy::var("DPO_API_URL").unwrap_or_else(|_| {
            if test_mode {
                SANDBOX_API_URL.to_string()
            } else {
                LIVE_API_URL.to_string()
            }
        });

        let gateway = GatewayConfig {
            company_token: dotenvy::var("DPO_COMPANY_TOKEN").unwrap_or_default(),
            service_type: dotenvy::var("DPO_SERVICE_TYPE").unwrap_or_default(),
            currency: dotenvy::var("DPO_CURRENCY").unwrap_or_else(|_| "TZS".to_string()),
            base_url,
            redirect_url: dotenvy::var("DPO_REDIRECT_URL").unwrap_or_default(),
            back_url: dotenvy::var("DPO_BACK_URL").unwrap_or_default(),
            token_lifetime_minutes: dotenvy::var("DPO_PAYMENT_TOKEN_LIFETIME")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5),
            test_mode,
        };

        Ok(Self {
            bind_addr,
            database_url,
            gateway,
        })
    }
}

impl GatewayConfig {
    pub fn api_url(&self) -> String {
        format!("{}/API/v6/", self.base_url)
    }

    pub fn payment_page_url(&self, token: &str) -> String {
        format!("{}/payv3.php?ID={token}", self.base_url)
    }

    pub fn ensure_configured(&self) -> Result<(), GatewayError> {
        if self.company_token.is_empty() {
            return Err(GatewayError::NotConfigured(
                "DPO_COMPANY_TOKEN is not set".to_string(),
            ));
        }
        if self.service_type.is_empty() {
            return Err(GatewayError::NotConfigured(
                "DPO_SERVICE_TYPE is not set".to_string(),
            ));
        }
        if self.redirect_url.is_empty() || self.back_url.is_empty() {
            return Err(GatewayError::NotConfigured(
                "DPO_REDIRECT_URL / DPO_BACK_URL are not set".to_string(),
            ));
        }
        Ok(())
    }

    /// Company token suitable for log lines. Counts characters rather than
    /// bytes so an unusual token from the environment cannot split a
    /// multi-byte character.
    pub fn masked_token(&self) -> String {
        let token = &self.company_token;
        let count = token.chars().count();
        if count > 12 {
            let head: String = token.chars().take(8).collect();
            let tail: String = token.chars().skip(count - 4).collect();
            format!("{head}...{tail}")
        } else {
            "NOT_SET".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gateway() -> GatewayConfig {
        GatewayConfig {
            company_token: "9F416C11-127B-4DE2-AC7F-D5710E4C5E0A".to_string(),
            service_type: "3854".to_string(),
            currency: "TZS".to_string(),
            base_url: SANDBOX_API_URL.to_string(),
            redirect_url: "https://example.com/api/payments/callback".to_string(),
            back_url: "https://example.com/checkout".to_string(),
            token_lifetime_minutes: 5,
            test_mode: true,
        }
    }

    #[test]
    fn api_url_appends_version_path() {
        assert_eq!(
            gateway().api_url(),
            "https://secure1.sandbox.directpay.online/API/v6/"
        );
    }

    #[test]
    fn payment_page_url_carries_token() {
        assert_eq!(
            gateway().payment_page_url("TOK123"),
            "https://secure1.sandbox.directpay.online/payv3.php?ID=TOK123"
        );
    }

    #[test]
    fn masked_token_hides_middle() {
        let masked = gateway().masked_token();
        assert!(masked.starts_with("9F416C11"));
        assert!(masked.ends_with("5E0A"));
        assert!(masked.contains("..."));
    }

    #[test]
    fn masked_token_handles_multibyte_characters() {
        let mut config = gateway();
        config.company_token = "ABCDEFGé-1234-5678-çàé".to_string();
        let masked = config.masked_token();
        assert!(masked.starts_with("ABCDEFGé"));
        assert!(masked.ends_with("-çàé"));
    }

    #[test]
    fn missing_credentials_fail_configuration_check() {
        let mut config = gateway();
        config.company_token.clear();
        assert!(matches!(
            config.ensure_configured(),
            Err(GatewayError::NotConfigured(_))
        ));
    }
}
