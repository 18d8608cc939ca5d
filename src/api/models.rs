use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::booking::RefundTarget;
use crate::database::WalletTransaction;

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CancelRequest {
    pub reason: Option<String>,
    #[serde(default)]
    pub refund_to: RefundTarget,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayWithWalletRequest {
    pub user_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopUpRequest {
    pub user_id: String,
    pub venue_id: i64,
    pub amount: Decimal,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletResponse {
    pub user_id: String,
    pub venue_id: i64,
    pub balance: Decimal,
    pub transactions: Vec<WalletTransaction>,
}

#[derive(Deserialize)]
pub struct AvailabilityParams {
    pub date: NaiveDate,
    pub start: NaiveTime,
    pub end: NaiveTime,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityResponse {
    pub court_id: i64,
    pub date: NaiveDate,
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub available: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepResponse {
    pub processed_count: usize,
}
