use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::api::handlers::{admin, bookings, matches, notifications, payments, wallets, AppState};

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/bookings", post(bookings::create_booking))
        .route("/api/bookings/:id", get(bookings::get_booking))
        .route("/api/bookings/:id/shares", get(bookings::list_shares))
        .route("/api/bookings/:id/cancel", post(bookings::cancel_booking))
        .route("/api/bookings/:id/pay-with-wallet", post(bookings::pay_with_wallet))
        .route("/api/bookings/:id/result", post(matches::submit_result))
        .route("/api/courts/:id/availability", get(bookings::court_availability))
        .route("/api/wallets/top-up", post(wallets::top_up))
        .route("/api/wallets/:user_id/:venue_id", get(wallets::get_wallet))
        .route("/api/players/:id/rating", get(matches::get_player_rating))
        .route("/api/webhooks/payments", post(payments::payment_webhook))
        .route("/api/cron/weather-sweep", post(admin::cron_weather_sweep))
        .route("/api/notifications/:user_id", get(notifications::subscribe))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::database::{self, courts, setup};
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use rust_decimal_macros::dec;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn app_with(config: AppConfig) -> (Router, i64, i64) {
        let pool = database::create_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        setup::initialize_database(&conn).unwrap();
        let venue = courts::insert_venue(&conn, "Padel Club", "Warsaw").unwrap();
        let court = courts::insert_court(&conn, venue.id, "Court 1", dec!(25.00), 4, true).unwrap();
        drop(conn);

        let state = Arc::new(AppState::new(pool, config, None, None));
        (create_router(state), court.id, venue.id)
    }

    fn app() -> (Router, i64, i64) {
        app_with(AppConfig::default())
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    fn booking_body(court_id: i64, start: &str, end: &str) -> Value {
        json!({
            "courtId": court_id,
            "requesterId": "alice",
            "date": "2030-06-01",
            "startTime": start,
            "endTime": end,
            "attendeeCount": 4,
            "splitPayment": true
        })
    }

    #[tokio::test]
    async fn test_create_and_fetch_booking() {
        let (app, court_id, _) = app();

        let (status, created) = send(&app, "POST", "/api/bookings", Some(booking_body(court_id, "10:00:00", "11:30:00"))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["booking"]["paymentStatus"], "pending");
        assert_eq!(created["payment"]["state"], "not_configured");
        assert_eq!(created["shares"].as_array().unwrap().len(), 4);

        let id = created["booking"]["id"].as_i64().unwrap();
        let (status, fetched) = send(&app, "GET", &format!("/api/bookings/{}", id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched["totalPrice"], "37.50");

        let (status, shares) = send(&app, "GET", &format!("/api/bookings/{}/shares", id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(shares[0]["totalOwed"], "9.63");
    }

    #[tokio::test]
    async fn test_conflict_maps_to_409() {
        let (app, court_id, _) = app();

        send(&app, "POST", "/api/bookings", Some(booking_body(court_id, "10:00:00", "11:00:00"))).await;
        let (status, body) = send(&app, "POST", "/api/bookings", Some(booking_body(court_id, "10:30:00", "11:30:00"))).await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "slot no longer available");

        let (_, availability) = send(
            &app,
            "GET",
            &format!("/api/courts/{}/availability?date=2030-06-01&start=11:00:00&end=12:00:00", court_id),
            None,
        )
        .await;
        assert_eq!(availability["available"], true);
    }

    #[tokio::test]
    async fn test_error_statuses() {
        let (app, court_id, _) = app();

        let (status, _) = send(&app, "GET", "/api/bookings/404", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app, "POST", "/api/bookings", Some(booking_body(court_id, "12:00:00", "11:00:00"))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_wallet_flow_and_insufficient_funds() {
        let (app, court_id, venue_id) = app();
        let (_, created) = send(&app, "POST", "/api/bookings", Some(booking_body(court_id, "10:00:00", "11:00:00"))).await;
        let id = created["booking"]["id"].as_i64().unwrap();
        let pay_uri = format!("/api/bookings/{}/pay-with-wallet", id);

        let (status, _) = send(&app, "POST", &pay_uri, Some(json!({ "userId": "alice" }))).await;
        assert_eq!(status, StatusCode::PAYMENT_REQUIRED);

        let (status, _) = send(
            &app,
            "POST",
            "/api/wallets/top-up",
            Some(json!({ "userId": "alice", "venueId": venue_id, "amount": "30.00" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, paid) = send(&app, "POST", &pay_uri, Some(json!({ "userId": "alice" }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(paid["paymentStatus"], "paid");

        let (_, wallet) = send(&app, "GET", &format!("/api/wallets/alice/{}", venue_id), None).await;
        assert_eq!(wallet["balance"], "5.00");
        assert_eq!(wallet["transactions"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_sub_cent_top_up_is_rejected() {
        let (app, _, venue_id) = app();

        let (status, _) = send(
            &app,
            "POST",
            "/api/wallets/top-up",
            Some(json!({ "userId": "alice", "venueId": venue_id, "amount": "0.001" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_cancel_twice_is_rejected() {
        let (app, court_id, _) = app();
        let (_, created) = send(&app, "POST", "/api/bookings", Some(booking_body(court_id, "10:00:00", "11:00:00"))).await;
        let uri = format!("/api/bookings/{}/cancel", created["booking"]["id"]);

        let (status, cancelled) = send(&app, "POST", &uri, Some(json!({ "reason": "sick" }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(cancelled["booking"]["status"], "cancelled");

        let (status, _) = send(&app, "POST", &uri, None).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_webhook_for_unknown_payment_is_accepted() {
        let (app, _, _) = app();

        let (status, body) = send(
            &app,
            "POST",
            "/api/webhooks/payments",
            Some(json!({ "eventType": "payment_intent.succeeded", "paymentId": "pi_unknown", "status": "succeeded" })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["outcome"], "unknown_payment");
    }

    #[tokio::test]
    async fn test_result_submission_updates_rating() {
        let (app, court_id, _) = app();
        let (_, created) = send(&app, "POST", "/api/bookings", Some(booking_body(court_id, "10:00:00", "11:00:00"))).await;
        let uri = format!("/api/bookings/{}/result", created["booking"]["id"]);

        let (status, result) = send(
            &app,
            "POST",
            &uri,
            Some(json!({
                "submittedBy": "alice",
                "team1": ["alice", "bob"],
                "team2": ["carol", "dave"],
                "sets": [{ "team1": 6, "team2": 1 }, { "team1": 6, "team2": 2 }]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(result["winner"], 1);

        let (_, rating) = send(&app, "GET", "/api/players/alice/rating", None).await;
        assert!(rating["rating"].as_f64().unwrap() > 1500.0);
        assert_eq!(rating["matchesPlayed"], 1);
    }

    #[tokio::test]
    async fn test_cron_requires_secret() {
        let mut config = AppConfig::default();
        config.server.cron_secret = Some("s3cret".to_string());
        let (app, _, _) = app_with(config);

        let (status, _) = send(&app, "POST", "/api/cron/weather-sweep", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let request = Request::builder()
            .method("POST")
            .uri("/api/cron/weather-sweep")
            .header(header::AUTHORIZATION, "Bearer s3cret")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
