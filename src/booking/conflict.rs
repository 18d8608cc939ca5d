use chrono::{NaiveDate, NaiveTime, Timelike};
use rusqlite::Connection;

use crate::database::bookings;
use crate::errors::{BookingError, BookingResult};

/// Half-open `[start, end)` interval in minutes since midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotInterval {
    pub start: u32,
    pub end: u32,
}

impl SlotInterval {
    pub fn new(start: NaiveTime, end: NaiveTime) -> BookingResult<Self> {
        let interval = Self {
            start: minute_of_day(start),
            end: minute_of_day(end),
        };
        if interval.end <= interval.start {
            return Err(BookingError::validation(format!(
                "end time {} must be after start time {}",
                end.format("%H:%M"),
                start.format("%H:%M")
            )));
        }
        Ok(interval)
    }

    /// Touching intervals (one ends exactly when the other starts) do not overlap.
    pub fn overlaps(&self, other: &SlotInterval) -> bool {
        self.start < other.end && self.end > other.start
    }
}

pub fn minute_of_day(time: NaiveTime) -> u32 {
    time.hour() * 60 + time.minute()
}

/// Whether any booking still holding a slot on `(court, date)` overlaps the candidate.
///
/// Callers that go on to insert must run this inside the same immediate
/// transaction as the insert.
pub fn has_conflict(
    conn: &Connection,
    court_id: i64,
    date: NaiveDate,
    start: NaiveTime,
    end: NaiveTime,
    exclude_booking_id: Option<i64>,
) -> BookingResult<bool> {
    let candidate = SlotInterval::new(start, end)?;
    let existing = bookings::list_active_for_court_date(conn, court_id, date)?;

    let conflict = existing
        .iter()
        .filter(|b| Some(b.id) != exclude_booking_id)
        .filter_map(|b| SlotInterval::new(b.start_time, b.end_time).ok())
        .any(|held| candidate.overlaps(&held));

    Ok(conflict)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn slot(start: NaiveTime, end: NaiveTime) -> SlotInterval {
        SlotInterval::new(start, end).unwrap()
    }

    #[test]
    fn test_back_to_back_slots_do_not_conflict() {
        let first = slot(t(10, 0), t(11, 0));
        let second = slot(t(11, 0), t(12, 0));
        assert!(!first.overlaps(&second));
        assert!(!second.overlaps(&first));
    }

    #[test]
    fn test_partial_overlap_conflicts() {
        let first = slot(t(10, 0), t(11, 0));
        let second = slot(t(10, 30), t(11, 30));
        assert!(first.overlaps(&second));
        assert!(second.overlaps(&first));
    }

    #[test]
    fn test_containment_conflicts() {
        let outer = slot(t(9, 0), t(13, 0));
        let inner = slot(t(10, 0), t(11, 0));
        assert!(outer.overlaps(&inner));
        assert!(inner.overlaps(&outer));
    }

    #[test]
    fn test_inverted_or_empty_interval_is_rejected() {
        assert!(matches!(
            SlotInterval::new(t(11, 0), t(10, 0)),
            Err(BookingError::Validation(_))
        ));
        assert!(matches!(
            SlotInterval::new(t(10, 0), t(10, 0)),
            Err(BookingError::Validation(_))
        ));
    }
}
