use std::collections::BTreeMap;

use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("payment provider request failed: {0:#}")]
    Request(#[from] anyhow::Error),

    #[error("payment provider rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("unexpected payment provider response: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone)]
pub struct ChargeRequest {
    pub amount: Decimal,
    pub currency: String,
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Charge {
    pub payment_id: String,
    pub client_secret: Option<String>,
    pub checkout_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Refund {
    pub refund_id: String,
}

/// Outbound side of the card payment provider.
///
/// Both calls happen after the booking transaction has committed; their failure
/// never rolls anything back.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    async fn create_charge(&self, request: &ChargeRequest) -> Result<Charge, ProviderError>;

    async fn create_refund(&self, payment_id: &str, amount: Decimal) -> Result<Refund, ProviderError>;
}
