use std::sync::{Arc, Barrier};
use std::thread;

use chrono::{NaiveDate, NaiveTime, Utc};
use court_booking::booking::orchestrator::commit_booking;
use court_booking::booking::BookingRequest;
use court_booking::config::settings::BookingSettings;
use court_booking::database::{self, bookings, courts, setup, wallets, PaymentMethod};
use court_booking::errors::BookingError;
use court_booking::services::wallet::WalletService;
use rust_decimal_macros::dec;

const CONTENDERS: usize = 8;

fn file_pool(dir: &tempfile::TempDir) -> (database::DbPool, i64, i64) {
    let path = dir.path().join("bookings.db");
    let pool = database::create_pool(path.to_str().unwrap()).unwrap();
    let conn = pool.get().unwrap();
    setup::initialize_database(&conn).unwrap();
    let venue = courts::insert_venue(&conn, "Padel Club", "Warsaw").unwrap();
    let court = courts::insert_court(&conn, venue.id, "Court 1", dec!(20.00), 4, true).unwrap();
    (pool, court.id, venue.id)
}

fn request(court_id: i64, requester: String, method: PaymentMethod) -> BookingRequest {
    BookingRequest {
        court_id,
        requester_id: requester,
        date: NaiveDate::from_ymd_opt(2030, 6, 1).unwrap(),
        start_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
        end_time: NaiveTime::from_hms_opt(11, 0, 0).unwrap(),
        attendee_count: 4,
        split_payment: true,
        public_match: false,
        payment_method: method,
    }
}

#[test]
fn test_concurrent_requests_for_one_slot_admit_exactly_one() {
    let dir = tempfile::tempdir().unwrap();
    let (pool, court_id, _) = file_pool(&dir);
    let barrier = Arc::new(Barrier::new(CONTENDERS));

    let handles: Vec<_> = (0..CONTENDERS)
        .map(|i| {
            let pool = pool.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                let mut conn = pool.get().unwrap();
                let req = request(court_id, format!("player-{}", i), PaymentMethod::Provider);
                barrier.wait();
                commit_booking(&mut conn, &req, &BookingSettings::default(), Utc::now().naive_utc())
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let won = results.iter().filter(|r| r.is_ok()).count();
    let conflicts = results.iter().filter(|r| matches!(r, Err(BookingError::Conflict))).count();

    assert_eq!(won, 1);
    assert_eq!(conflicts, CONTENDERS - 1);

    let conn = pool.get().unwrap();
    let date = NaiveDate::from_ymd_opt(2030, 6, 1).unwrap();
    let held = bookings::list_active_for_court_date(&conn, court_id, date).unwrap();
    assert_eq!(held.len(), 1);
}

#[test]
fn test_losing_wallet_bookings_are_not_charged() {
    let dir = tempfile::tempdir().unwrap();
    let (pool, court_id, venue_id) = file_pool(&dir);
    let wallet_service = WalletService::new(pool.clone());
    for i in 0..CONTENDERS {
        wallet_service.top_up(&format!("player-{}", i), venue_id, dec!(50.00)).unwrap();
    }
    let barrier = Arc::new(Barrier::new(CONTENDERS));

    let handles: Vec<_> = (0..CONTENDERS)
        .map(|i| {
            let pool = pool.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                let mut conn = pool.get().unwrap();
                let req = request(court_id, format!("player-{}", i), PaymentMethod::Wallet);
                barrier.wait();
                commit_booking(&mut conn, &req, &BookingSettings::default(), Utc::now().naive_utc())
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let winner = results
        .iter()
        .find_map(|r| r.as_ref().ok())
        .map(|c| c.booking.requester_id.clone())
        .unwrap();

    let conn = pool.get().unwrap();
    for i in 0..CONTENDERS {
        let user = format!("player-{}", i);
        let balance = wallets::find_wallet(&conn, &user, venue_id).unwrap().unwrap().balance;
        let expected = if user == winner { dec!(30.00) } else { dec!(50.00) };
        assert_eq!(balance, expected, "balance of {}", user);
    }
}
