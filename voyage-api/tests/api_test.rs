use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use voyage_api::middleware::issue_token;
use voyage_api::state::{AuthConfig, RateLimit};
use voyage_api::{app, AppState};
use voyage_booking::AdminOutcome;
use voyage_shared::pii::Masked;
use voyage_store::Repositories;

struct TestApp {
    router: Router,
    admin_token: String,
}

async fn setup() -> TestApp {
    let state = AppState::new(
        Repositories::in_memory(),
        None,
        AuthConfig {
            secret: "test-secret".to_string(),
            expiration: 3600,
        },
        RateLimit {
            requests_per_window: 100,
            window_seconds: 60,
        },
        4,
    );
    let admin = match state
        .accounts
        .ensure_admin("admin", "admin@example.com", Masked("admin-password".to_string()))
        .await
        .unwrap()
    {
        AdminOutcome::Created(user) => user,
        AdminOutcome::AlreadyExists(user) => user,
    };
    let admin_token = issue_token(&state.auth, &admin).unwrap();
    TestApp {
        router: app(state),
        admin_token,
    }
}

impl TestApp {
    async fn send(&self, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn admin(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        self.send(method, uri, Some(&self.admin_token), body).await
    }

    /// Registers a customer and returns their token.
    async fn customer(&self, username: &str) -> String {
        let (status, body) = self
            .send(
                "POST",
                "/v1/auth/register",
                None,
                Some(json!({
                    "username": username,
                    "email": format!("{}@example.com", username),
                    "password": "correct-horse",
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body["token"].as_str().unwrap().to_string()
    }

    /// Berlin -> Munich train on 2024-06-01 with three economy seats at 100.
    async fn seed_train(&self) -> (i64, i64) {
        let (_, berlin) = self
            .admin(
                "POST",
                "/v1/admin/stations",
                Some(json!({"code": "BER", "name": "Berlin Hbf", "city": "Berlin", "country": "DE"})),
            )
            .await;
        let (_, munich) = self
            .admin(
                "POST",
                "/v1/admin/stations",
                Some(json!({"code": "MUC", "name": "Muenchen Hbf", "city": "Munich", "country": "DE"})),
            )
            .await;
        let (status, train) = self
            .admin(
                "POST",
                "/v1/admin/trains",
                Some(json!({
                    "number": "ICE 1001",
                    "name": "Sprinter",
                    "capacity": {"economy": 3, "business": 2, "first": 0},
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", train);

        let (status, schedule) = self
            .admin(
                "POST",
                "/v1/admin/schedules/train",
                Some(json!({
                    "vehicle_id": train["id"],
                    "departure_location_id": berlin["id"],
                    "arrival_location_id": munich["id"],
                    "departure_time": "2024-06-01T08:00:00Z",
                    "arrival_time": "2024-06-01T12:00:00Z",
                    "fares": {"economy": 100, "business": 250, "first": 0},
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", schedule);
        assert_eq!(schedule["available_seats"]["economy"], 3);
        (train["id"].as_i64().unwrap(), schedule["id"].as_i64().unwrap())
    }
}

fn booking_body(schedule_id: i64, passengers: usize) -> Value {
    let travellers: Vec<Value> = (0..passengers)
        .map(|i| json!({"first_name": "Traveller", "last_name": format!("No{}", i), "age": 30, "gender": "female"}))
        .collect();
    json!({
        "schedule_id": schedule_id,
        "booking_kind": "train",
        "travel_class": "economy",
        "passenger_count": passengers,
        "passengers": travellers,
    })
}

#[tokio::test]
async fn test_health() {
    let app = setup().await;
    let (status, body) = app.send("GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_register_login_and_profile() {
    let app = setup().await;
    app.customer("kim").await;

    let (status, body) = app
        .send(
            "POST",
            "/v1/auth/login",
            None,
            Some(json!({"email": "KIM@example.com", "password": "correct-horse"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().unwrap().to_string();

    let (status, wrong_password) = app
        .send(
            "POST",
            "/v1/auth/login",
            None,
            Some(json!({"email": "kim@example.com", "password": "wrong-horse"})),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (_, unknown_email) = app
        .send(
            "POST",
            "/v1/auth/login",
            None,
            Some(json!({"email": "nobody@example.com", "password": "correct-horse"})),
        )
        .await;
    assert_eq!(wrong_password["error"], unknown_email["error"]);

    let (status, me) = app.send("GET", "/v1/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["username"], "kim");
    assert_eq!(me["is_admin"], false);
    assert!(me.get("password_hash").is_none());
}

#[tokio::test]
async fn test_duplicate_registration_conflicts() {
    let app = setup().await;
    app.customer("kim").await;
    let (status, _) = app
        .send(
            "POST",
            "/v1/auth/register",
            None,
            Some(json!({"username": "kim", "email": "kim@example.com", "password": "correct-horse"})),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_route_guards() {
    let app = setup().await;
    let customer = app.customer("kim").await;

    let (status, body) = app.send("POST", "/v1/bookings", None, Some(booking_body(1, 1))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());

    let (status, _) = app.send("GET", "/v1/bookings", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.send("GET", "/v1/admin/stations", Some(&customer), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.send("GET", "/v1/admin/dashboard", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.admin("GET", "/v1/admin/stations", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_search_validation_and_misses() {
    let app = setup().await;
    app.seed_train().await;

    let (status, body) = app
        .send(
            "GET",
            "/v1/search?booking_kind=train&source=Berlin&destination=Munich&date=06/01/2024",
            None,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("date"));

    let (status, body) = app
        .send(
            "GET",
            "/v1/search?booking_kind=train&source=Paris&destination=London&date=2024-06-01",
            None,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));

    let (status, _) = app
        .send(
            "GET",
            "/v1/search?booking_kind=bus&source=Berlin&destination=Munich&date=2024-06-01",
            None,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_malformed_input_is_json_400() {
    let app = setup().await;
    let (_, schedule_id) = app.seed_train().await;
    let customer = app.customer("carol").await;

    let mut no_age = booking_body(schedule_id, 1);
    no_age["passengers"][0].as_object_mut().unwrap().remove("age");
    let (status, body) = app.send("POST", "/v1/bookings", Some(&customer), Some(no_age)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("age"), "{}", body);

    let mut bad_gender = booking_body(schedule_id, 1);
    bad_gender["passengers"][0]["gender"] = json!("x");
    let (status, body) = app.send("POST", "/v1/bookings", Some(&customer), Some(bad_gender)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, body) = app
        .send("GET", "/v1/search?booking_kind=train&destination=Munich&date=2024-06-01", None, None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("source"), "{}", body);

    let (status, body) = app
        .send(
            "GET",
            "/v1/search?booking_kind=train&source=Berlin&destination=Munich&date=2024-06-01&passengers=two",
            None,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, body) = app.send("GET", "/v1/bookings/abc", Some(&customer), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    // Nothing was reserved
    let quote_uri = format!("/v1/schedules/train/{}/quote?travel_class=economy&passengers=1", schedule_id);
    let (status, quote) = app.send("GET", &quote_uri, Some(&customer), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(quote["available_seats"], 3);
    let (_, history) = app.send("GET", "/v1/bookings", Some(&customer), None).await;
    assert_eq!(history, json!([]));
}

#[tokio::test]
async fn test_book_until_sold_out_then_cancel() {
    let app = setup().await;
    let (_, schedule_id) = app.seed_train().await;
    let alice = app.customer("alice").await;
    let bob = app.customer("bob").await;

    // Anonymous search sees the trip
    let (status, results) = app
        .send(
            "GET",
            "/v1/search?booking_kind=train&source=ber&destination=munich&date=2024-06-01&passengers=2",
            None,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(results.as_array().unwrap().len(), 1);
    assert_eq!(results[0]["fare"]["total_price"], 200);

    // Book two of three
    let (status, booking) = app
        .send("POST", "/v1/bookings", Some(&alice), Some(booking_body(schedule_id, 2)))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", booking);
    assert_eq!(booking["total_amount"], 200);
    assert_eq!(booking["status"], "confirmed");
    assert_eq!(booking["passengers"].as_array().unwrap().len(), 2);
    let booking_id = booking["id"].as_i64().unwrap();

    // Two more do not fit
    let (status, body) = app
        .send("POST", "/v1/bookings", Some(&bob), Some(booking_body(schedule_id, 2)))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("seats"));

    let quote_uri = format!("/v1/schedules/train/{}/quote?travel_class=economy&passengers=1", schedule_id);
    let (status, quote) = app.send("GET", &quote_uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(quote["available_seats"], 1);

    // Someone else's booking is off limits
    let cancel_uri = format!("/v1/bookings/{}/cancel", booking_id);
    let (status, _) = app.send("POST", &cancel_uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app
        .send("GET", &format!("/v1/bookings/{}", booking_id), Some(&bob), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Admin cancels twice; seats come back once
    let (status, cancelled) = app.admin("POST", &cancel_uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["status"], "cancelled");
    let (status, _) = app.admin("POST", &cancel_uri, None).await;
    assert_eq!(status, StatusCode::OK);

    let (_, quote) = app.send("GET", &quote_uri, Some(&bob), None).await;
    assert_eq!(quote["available_seats"], 3);

    // History keeps the cancelled booking with its trip
    let (status, history) = app.send("GET", "/v1/bookings", Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history.as_array().unwrap().len(), 1);
    assert_eq!(history[0]["status"], "cancelled");
    assert_eq!(history[0]["schedule"]["id"], schedule_id);
}

#[tokio::test]
async fn test_catalog_delete_guards() {
    let app = setup().await;
    let (train_id, schedule_id) = app.seed_train().await;
    let customer = app.customer("kim").await;

    let (status, _) = app
        .send("POST", "/v1/bookings", Some(&customer), Some(booking_body(schedule_id, 1)))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    // A train with a schedule stays
    let (status, _) = app.admin("DELETE", &format!("/v1/admin/trains/{}", train_id), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    // A schedule with a confirmed booking stays
    let schedule_uri = format!("/v1/admin/schedules/train/{}", schedule_id);
    let (status, _) = app.admin("DELETE", &schedule_uri, None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    // An unused train goes
    let (status, spare) = app
        .admin(
            "POST",
            "/v1/admin/trains",
            Some(json!({"number": "RE 7", "name": "Regional", "capacity": {"economy": 50, "business": 0, "first": 0}})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let spare_uri = format!("/v1/admin/trains/{}", spare["id"]);
    let (status, _) = app.admin("DELETE", &spare_uri, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app.admin("GET", &spare_uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_admin_validation_errors() {
    let app = setup().await;

    let (status, _) = app
        .admin(
            "POST",
            "/v1/admin/airports",
            Some(json!({"code": "LHRX", "name": "Heathrow", "city": "London", "country": "GB"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.admin("GET", "/v1/admin/schedules/boat", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .admin(
            "POST",
            "/v1/admin/schedules/flight",
            Some(json!({
                "vehicle_id": 99,
                "departure_location_id": 1,
                "arrival_location_id": 2,
                "departure_time": "2024-06-01T08:00:00Z",
                "arrival_time": "2024-06-01T10:00:00Z",
                "fares": {"economy": 100, "business": 200, "first": 300},
            })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_dashboard_and_reports() {
    let app = setup().await;
    let (_, schedule_id) = app.seed_train().await;
    let customer = app.customer("kim").await;

    for _ in 0..2 {
        let (status, _) = app
            .send("POST", "/v1/bookings", Some(&customer), Some(booking_body(schedule_id, 1)))
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }
    let (_, history) = app.send("GET", "/v1/bookings", Some(&customer), None).await;
    let first_id = history[1]["id"].as_i64().unwrap();
    app.send("POST", &format!("/v1/bookings/{}/cancel", first_id), Some(&customer), None)
        .await;

    let (status, dashboard) = app.admin("GET", "/v1/admin/dashboard", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(dashboard["total_users"], 2);
    assert_eq!(dashboard["total_bookings"], 2);
    assert_eq!(dashboard["confirmed_bookings"], 1);
    assert_eq!(dashboard["cancelled_bookings"], 1);
    assert_eq!(dashboard["train_bookings"], 2);
    assert_eq!(dashboard["flight_bookings"], 0);
    assert_eq!(dashboard["recent_bookings"].as_array().unwrap().len(), 2);

    let (status, report) = app.admin("GET", "/v1/admin/reports", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["by_status"]["cancelled"], 1);
    assert_eq!(report["by_kind"]["train"], 2);
    assert_eq!(report["by_class"]["economy"], 2);
}
