use anyhow::Result;
use async_trait::async_trait;
use log::{debug, warn};
use rust_decimal::Decimal;
use serde_json::Value;

use super::provider::{Charge, ChargeRequest, PaymentProvider, ProviderError, Refund};
use crate::config::settings::PaymentSettings;
use crate::database::money::to_cents;
use crate::http::RateLimitedClient;

/// Stripe-compatible REST client (payment intents + refunds).
pub struct StripeClient {
    client: RateLimitedClient,
    api_key: String,
    base_url: String,
}

impl StripeClient {
    pub fn new(settings: &PaymentSettings, api_key: String, user_agent: &str) -> Result<Self> {
        let client = RateLimitedClient::new(user_agent, settings.timeout_secs, settings.rate_limit_ms)?;
        Ok(Self {
            client,
            api_key,
            base_url: settings.api_base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Builds a client only when an API key is configured.
    pub fn from_settings(settings: &PaymentSettings, user_agent: &str) -> Result<Option<Self>> {
        match &settings.api_key {
            Some(key) => Ok(Some(Self::new(settings, key.clone(), user_agent)?)),
            None => Ok(None),
        }
    }

    async fn post(&self, path: &str, form: &[(String, String)]) -> Result<Value, ProviderError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self.client.post_form(&url, &self.api_key, form).await?;
        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|e| ProviderError::Malformed(e.to_string()))?;

        if !status.is_success() {
            let message = error_message(&body);
            warn!("Payment provider returned {} for {}: {}", status, path, message);
            return Err(ProviderError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        debug!("Payment provider call {} succeeded", path);
        Ok(body)
    }
}

#[async_trait]
impl PaymentProvider for StripeClient {
    async fn create_charge(&self, request: &ChargeRequest) -> Result<Charge, ProviderError> {
        let body = self.post("/v1/payment_intents", &charge_form(request)?).await?;
        parse_charge(&body)
    }

    async fn create_refund(&self, payment_id: &str, amount: Decimal) -> Result<Refund, ProviderError> {
        let form = vec![
            ("payment_intent".to_string(), payment_id.to_string()),
            ("amount".to_string(), to_cents(amount)?.to_string()),
        ];
        let body = self.post("/v1/refunds", &form).await?;
        let refund_id = string_field(&body, "id")?;
        Ok(Refund { refund_id })
    }
}

fn charge_form(request: &ChargeRequest) -> Result<Vec<(String, String)>, ProviderError> {
    let mut form = vec![
        ("amount".to_string(), to_cents(request.amount)?.to_string()),
        ("currency".to_string(), request.currency.clone()),
        ("automatic_payment_methods[enabled]".to_string(), "true".to_string()),
    ];
    for (key, value) in &request.metadata {
        form.push((format!("metadata[{}]", key), value.clone()));
    }
    Ok(form)
}

fn parse_charge(body: &Value) -> Result<Charge, ProviderError> {
    Ok(Charge {
        payment_id: string_field(body, "id")?,
        client_secret: body.get("client_secret").and_then(Value::as_str).map(str::to_string),
        checkout_url: body
            .get("next_action")
            .and_then(|a| a.get("redirect_to_url"))
            .and_then(|r| r.get("url"))
            .and_then(Value::as_str)
            .map(str::to_string),
    })
}

fn string_field(body: &Value, field: &str) -> Result<String, ProviderError> {
    body.get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| ProviderError::Malformed(format!("missing '{}' in response", field)))
}

fn error_message(body: &Value) -> String {
    body.get("error")
        .and_then(|e| e.get("message"))
        .and_then(Value::as_str)
        .unwrap_or("no error message")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;
    use std::collections::BTreeMap;

    #[test]
    fn test_charge_form_uses_minor_units_and_metadata() {
        let request = ChargeRequest {
            amount: dec!(37.50),
            currency: "eur".to_string(),
            metadata: BTreeMap::from([("booking_id".to_string(), "42".to_string())]),
        };

        let form = charge_form(&request).unwrap();

        assert!(form.contains(&("amount".to_string(), "3750".to_string())));
        assert!(form.contains(&("currency".to_string(), "eur".to_string())));
        assert!(form.contains(&("metadata[booking_id]".to_string(), "42".to_string())));
    }

    #[test]
    fn test_parse_charge_reads_id_and_secret() {
        let body = json!({ "id": "pi_123", "client_secret": "pi_123_secret_abc", "status": "requires_payment_method" });

        let charge = parse_charge(&body).unwrap();

        assert_eq!(charge.payment_id, "pi_123");
        assert_eq!(charge.client_secret.as_deref(), Some("pi_123_secret_abc"));
        assert_eq!(charge.checkout_url, None);
    }

    #[test]
    fn test_parse_charge_without_id_is_malformed() {
        let body = json!({ "client_secret": "secret" });
        assert!(matches!(parse_charge(&body), Err(ProviderError::Malformed(_))));
    }

    #[test]
    fn test_error_message_falls_back() {
        assert_eq!(error_message(&json!({ "error": { "message": "card declined" } })), "card declined");
        assert_eq!(error_message(&json!({})), "no error message");
    }
}
