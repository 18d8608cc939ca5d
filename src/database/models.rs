use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Implements TEXT column mapping for a status enum via its `as_str`/`parse`.
macro_rules! text_column {
    ($ty:ty) => {
        impl ToSql for $ty {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.as_str()))
            }
        }

        impl FromSql for $ty {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                let raw = value.as_str()?;
                <$ty>::parse(raw).ok_or_else(|| FromSqlError::Other(format!("unknown value '{}'", raw).into()))
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CourtStatus {
    Active,
    Maintenance,
}

impl CourtStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CourtStatus::Active => "active",
            CourtStatus::Maintenance => "maintenance",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "active" => Some(CourtStatus::Active),
            "maintenance" => Some(CourtStatus::Maintenance),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Confirmed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "confirmed" => Some(BookingStatus::Confirmed),
            "cancelled" => Some(BookingStatus::Cancelled),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "pending" => Some(PaymentStatus::Pending),
            "paid" => Some(PaymentStatus::Paid),
            "failed" => Some(PaymentStatus::Failed),
            "refunded" => Some(PaymentStatus::Refunded),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Charged through the external payment provider.
    #[default]
    Provider,
    /// Debited from the requester's venue wallet.
    Wallet,
    /// Marked paid without money movement.
    Instant,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Provider => "provider",
            PaymentMethod::Wallet => "wallet",
            PaymentMethod::Instant => "instant",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "provider" => Some(PaymentMethod::Provider),
            "wallet" => Some(PaymentMethod::Wallet),
            "instant" => Some(PaymentMethod::Instant),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefundStatus {
    Credited,
    Requested,
    Processed,
    Failed,
}

impl RefundStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RefundStatus::Credited => "credited",
            RefundStatus::Requested => "requested",
            RefundStatus::Processed => "processed",
            RefundStatus::Failed => "failed",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "credited" => Some(RefundStatus::Credited),
            "requested" => Some(RefundStatus::Requested),
            "processed" => Some(RefundStatus::Processed),
            "failed" => Some(RefundStatus::Failed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerCategory {
    Booking,
    Refund,
    /// Reverses the revenue of a booking cancelled before it was paid.
    Cancellation,
}

impl LedgerCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerCategory::Booking => "booking",
            LedgerCategory::Refund => "refund",
            LedgerCategory::Cancellation => "cancellation",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "booking" => Some(LedgerCategory::Booking),
            "refund" => Some(LedgerCategory::Refund),
            "cancellation" => Some(LedgerCategory::Cancellation),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WalletTransactionKind {
    TopUp,
    Debit,
    Credit,
}

impl WalletTransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            WalletTransactionKind::TopUp => "top_up",
            WalletTransactionKind::Debit => "debit",
            WalletTransactionKind::Credit => "credit",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "top_up" => Some(WalletTransactionKind::TopUp),
            "debit" => Some(WalletTransactionKind::Debit),
            "credit" => Some(WalletTransactionKind::Credit),
            _ => None,
        }
    }
}

text_column!(CourtStatus);
text_column!(BookingStatus);
text_column!(PaymentStatus);
text_column!(PaymentMethod);
text_column!(RefundStatus);
text_column!(LedgerCategory);
text_column!(WalletTransactionKind);

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Venue {
    pub id: i64,
    pub name: String,
    pub city: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Court {
    pub id: i64,
    pub venue_id: i64,
    pub name: String,
    pub hourly_rate: Decimal,
    pub capacity: i32,
    pub status: CourtStatus,
    pub outdoor: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: i64,
    pub court_id: i64,
    pub venue_id: i64,
    pub requester_id: String,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub total_price: Decimal,
    pub attendee_count: i32,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: PaymentMethod,
    pub provider_payment_id: Option<String>,
    pub cancellation_reason: Option<String>,
    pub refund_status: Option<RefundStatus>,
    pub created_at: NaiveDateTime,
    pub cancelled_at: Option<NaiveDateTime>,
    pub weather_checked_at: Option<NaiveDateTime>,
    pub weather_snapshot: Option<serde_json::Value>,
}

impl Booking {
    /// The slot is held for as long as no cancellation has been stamped.
    pub fn is_active(&self) -> bool {
        self.cancelled_at.is_none()
    }

    pub fn starts_at(&self) -> NaiveDateTime {
        self.date.and_time(self.start_time)
    }
}

#[derive(Debug, Clone)]
pub struct NewBookingRow<'a> {
    pub court_id: i64,
    pub venue_id: i64,
    pub requester_id: &'a str,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub total_price: Decimal,
    pub attendee_count: i32,
    pub payment_status: PaymentStatus,
    pub payment_method: PaymentMethod,
    pub created_at: NaiveDateTime,
}

/// Weather sweep candidate joined with the venue city.
#[derive(Debug, Clone)]
pub struct SweepCandidate {
    pub booking: Booking,
    pub city: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingShare {
    pub id: i64,
    pub booking_id: i64,
    pub share_index: i32,
    pub share_amount: Decimal,
    pub service_fee: Decimal,
    pub total_owed: Decimal,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    pub id: i64,
    pub venue_id: i64,
    pub booking_id: Option<i64>,
    pub description: String,
    pub debit: Decimal,
    pub credit: Decimal,
    pub transaction_date: NaiveDateTime,
    pub category: LedgerCategory,
    pub status: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Wallet {
    pub user_id: String,
    pub venue_id: i64,
    pub balance: Decimal,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletTransaction {
    pub id: i64,
    pub user_id: String,
    pub venue_id: i64,
    pub kind: WalletTransactionKind,
    pub amount: Decimal,
    pub booking_id: Option<i64>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenMatch {
    pub id: i64,
    pub booking_id: i64,
    pub host_id: String,
    pub max_players: i32,
    pub status: String,
    pub created_at: NaiveDateTime,
}

/// Games won by each team in one set. Missing scores count as zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SetScore {
    pub team1: Option<u32>,
    pub team2: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    pub booking_id: i64,
    pub team1: [String; 2],
    pub team2: [String; 2],
    pub sets: Vec<SetScore>,
    pub winner: i32,
    pub submitted_by: String,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DbPlayerRating {
    pub user_id: String,
    pub rating: f64,
    pub matches_played: i32,
    pub updated_at: NaiveDateTime,
}
