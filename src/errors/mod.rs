use rust_decimal::Decimal;
use thiserror::Error;

/// Failures of booking, wallet and refund operations.
///
/// Variants that threaten slot allocation or money are fatal to the request;
/// side-effect failures never reach this type, they are logged where they happen.
#[derive(Debug, Error)]
pub enum BookingError {
    #[error("{0}")]
    Validation(String),

    #[error("slot no longer available")]
    Conflict,

    #[error("insufficient wallet balance: requested {requested}, available {available}")]
    InsufficientFunds {
        requested: Decimal,
        available: Decimal,
    },

    #[error("court {0} not found")]
    CourtNotFound(i64),

    #[error("booking {0} not found")]
    BookingNotFound(i64),

    #[error(transparent)]
    Store(#[from] rusqlite::Error),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl BookingError {
    pub fn validation(message: impl Into<String>) -> Self {
        BookingError::Validation(message.into())
    }
}

impl From<r2d2::Error> for BookingError {
    fn from(err: r2d2::Error) -> Self {
        BookingError::Internal(anyhow::Error::new(err).context("Failed to get database connection from pool"))
    }
}

pub type BookingResult<T> = Result<T, BookingError>;

