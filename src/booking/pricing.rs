use chrono::NaiveTime;
use rust_decimal::{Decimal, RoundingStrategy};

use super::conflict::minute_of_day;
use crate::errors::{BookingError, BookingResult};

const MINUTES_PER_HOUR: i64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShareQuote {
    pub share_amount: Decimal,
    pub service_fee: Decimal,
    pub total_owed: Decimal,
}

/// Hourly rate times the fractional-hour duration, rounded to cents.
pub fn price(hourly_rate: Decimal, start: NaiveTime, end: NaiveTime) -> BookingResult<Decimal> {
    let minutes = i64::from(minute_of_day(end)) - i64::from(minute_of_day(start));
    if minutes <= 0 {
        return Err(BookingError::validation("booking duration must be positive"));
    }
    if hourly_rate.is_sign_negative() {
        return Err(BookingError::validation("hourly rate cannot be negative"));
    }

    let total = hourly_rate * Decimal::from(minutes) / Decimal::from(MINUTES_PER_HOUR);
    Ok(round_cents(total))
}

/// Splits `total_price` evenly across `attendees`, each share carrying `fee` on top.
///
/// Divides by the configured attendee count: shares exist before anyone else joins.
pub fn split_shares(total_price: Decimal, attendees: i32, fee: Decimal) -> BookingResult<Vec<ShareQuote>> {
    if attendees < 1 {
        return Err(BookingError::validation("attendee count must be at least 1"));
    }

    let share_amount = round_cents(total_price / Decimal::from(attendees));
    let quote = ShareQuote {
        share_amount,
        service_fee: fee,
        total_owed: share_amount + fee,
    };

    Ok(vec![quote; attendees as usize])
}

fn round_cents(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_price_for_ninety_minutes() {
        assert_eq!(price(dec!(25.00), t(10, 0), t(11, 30)).unwrap(), dec!(37.50));
    }

    #[test]
    fn test_price_rejects_non_positive_duration() {
        assert!(matches!(price(dec!(25.00), t(11, 0), t(11, 0)), Err(BookingError::Validation(_))));
        assert!(matches!(price(dec!(25.00), t(12, 0), t(11, 0)), Err(BookingError::Validation(_))));
    }

    #[test]
    fn test_split_shares_add_fee_per_share() {
        let shares = split_shares(dec!(40.00), 4, dec!(0.25)).unwrap();

        assert_eq!(shares.len(), 4);
        assert!(shares.iter().all(|s| s.total_owed == dec!(10.25)));
        let sum: Decimal = shares.iter().map(|s| s.total_owed).sum();
        assert_eq!(sum, dec!(41.00));
    }

    #[test]
    fn test_split_shares_rounds_uneven_division() {
        let shares = split_shares(dec!(40.00), 3, dec!(0.25)).unwrap();
        assert_eq!(shares[0].share_amount, dec!(13.33));
        assert_eq!(shares[0].total_owed, dec!(13.58));
    }

    #[test]
    fn test_split_shares_requires_an_attendee() {
        assert!(matches!(split_shares(dec!(40.00), 0, dec!(0.25)), Err(BookingError::Validation(_))));
    }
}
