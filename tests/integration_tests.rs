use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use tower::ServiceExt;

use esthi_booking::config::AppConfig;
use esthi_booking::db;
use esthi_booking::handlers;
use esthi_booking::services::email::Notifier;
use esthi_booking::state::AppState;

// ── Mock Notifiers ──

type Outbox = Arc<Mutex<Vec<(String, String, String)>>>;

struct MockNotifier {
    sent: Outbox,
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> anyhow::Result<()> {
        self.sent
            .lock()
            .unwrap()
            .push((to.to_string(), subject.to_string(), html_body.to_string()));
        Ok(())
    }
}

struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
    async fn send(&self, _to: &str, _subject: &str, _html_body: &str) -> anyhow::Result<()> {
        anyhow::bail!("smtp relay unreachable")
    }
}

// ── Helpers ──

const ADMIN_USER: &str = "owner";
const ADMIN_PASS: &str = "correct horse";

fn test_config() -> AppConfig {
    AppConfig {
        port: 3000,
        database_url: ":memory:".to_string(),
        admin_username: ADMIN_USER.to_string(),
        admin_password: ADMIN_PASS.to_string(),
        password_hash_iterations: 1_000,
        smtp_server: String::new(),
        smtp_port: 587,
        smtp_username: String::new(),
        smtp_password: String::new(),
        email_from: "studio@example.com".to_string(),
        email_from_name: "Appointments".to_string(),
        consent_form_url: "http://localhost:5173/booking/consentForm".to_string(),
    }
}

fn state_with(notifier: Box<dyn Notifier>) -> Arc<AppState> {
    let conn = db::init_db(":memory:").unwrap();
    Arc::new(AppState {
        db: Arc::new(Mutex::new(conn)),
        config: test_config(),
        notifier,
    })
}

fn test_state() -> (Arc<AppState>, Outbox) {
    let sent: Outbox = Arc::new(Mutex::new(vec![]));
    let state = state_with(Box::new(MockNotifier {
        sent: Arc::clone(&sent),
    }));
    (state, sent)
}

fn test_app(state: Arc<AppState>) -> Router {
    handlers::router(state)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn bearer_request(method: &str, uri: &str, token: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(state: &Arc<AppState>, req: Request<Body>) -> (StatusCode, serde_json::Value) {
    let res = test_app(state.clone()).oneshot(req).await.unwrap();
    let status = res.status();
    let body = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if body.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, json)
}

async fn login(state: &Arc<AppState>) -> String {
    let (status, json) = send(
        state,
        json_request(
            "POST",
            "/admin/",
            serde_json::json!({"username": ADMIN_USER, "password": ADMIN_PASS}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    json["token"].as_str().unwrap().to_string()
}

async fn create_slots(state: &Arc<AppState>, token: &str, times: &[&str]) -> Vec<String> {
    let body: Vec<_> = times
        .iter()
        .map(|t| serde_json::json!({"dateTime": t}))
        .collect();
    let (status, json) = send(
        state,
        json_request(
            "POST",
            &format!("/admin/{token}/appointments"),
            serde_json::Value::Array(body),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{json}");
    json.as_array()
        .unwrap()
        .iter()
        .map(|a| a["id"].as_str().unwrap().to_string())
        .collect()
}

fn booking_body(appointment_id: &str, name: &str, email: &str) -> serde_json::Value {
    serde_json::json!({
        "appointmentId": appointment_id,
        "scheduledAppointment": {
            "serviceName": "Hydrating Facial",
            "skinConcerns": "dry patches",
            "client": {
                "preferredName": name,
                "email": email,
                "phoneNumber": "555-0100"
            }
        }
    })
}

// ── Health ──

#[tokio::test]
async fn test_health() {
    let (state, _) = test_state();
    let (status, json) = send(&state, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
}

// ── Admin Gate ──

#[tokio::test]
async fn test_admin_routes_reject_unknown_token() {
    let (state, _) = test_state();

    let res = test_app(state.clone())
        .oneshot(get("/admin/not-a-token/appointments"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(res.headers()[header::WWW_AUTHENTICATE], "Bearer");

    let (status, _) = send(
        &state,
        json_request(
            "POST",
            "/admin/not-a-token/appointments",
            serde_json::json!([{"dateTime": "2099-06-01T10:00"}]),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_wrong_credentials_never_create_admin() {
    let (state, _) = test_state();

    for _ in 0..2 {
        let (status, json) = send(
            &state,
            json_request(
                "POST",
                "/admin/",
                serde_json::json!({"username": ADMIN_USER, "password": "wrong"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].is_string());
    }

    let db = state.db.lock().unwrap();
    let admins: i64 = db
        .query_row("SELECT COUNT(*) FROM admin_users", [], |r| r.get(0))
        .unwrap();
    assert_eq!(admins, 0);
}

#[tokio::test]
async fn test_login_accepts_capitalized_fields_and_rotates_token() {
    let (state, _) = test_state();

    let first = login(&state).await;
    let (status, json) = send(
        &state,
        json_request(
            "POST",
            "/admin",
            serde_json::json!({"Username": ADMIN_USER, "Password": ADMIN_PASS}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let second = json["token"].as_str().unwrap().to_string();
    assert_ne!(first, second);

    let (status, _) = send(&state, get(&format!("/admin/{first}/appointments"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = send(&state, get(&format!("/admin/{second}/appointments"))).await;
    assert_eq!(status, StatusCode::OK);
}

// ── Slots ──

#[tokio::test]
async fn test_duplicate_slot_rejected_whole_batch() {
    let (state, _) = test_state();
    let token = login(&state).await;
    create_slots(&state, &token, &["2099-06-01T10:00"]).await;

    let (status, json) = send(
        &state,
        json_request(
            "POST",
            &format!("/admin/{token}/appointments"),
            serde_json::json!([
                {"dateTime": "2099-06-01T11:00"},
                {"dateTime": "2099-06-01T10:00"}
            ]),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let conflicts = json["conflicts"].as_array().unwrap();
    assert_eq!(conflicts.len(), 1);
    assert!(conflicts[0].as_str().unwrap().contains("2099-06-01 10:00"));

    let (status, json) = send(&state, get("/appointments/2099-06-01")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_invalid_date_parameter() {
    let (state, _) = test_state();
    let (status, _) = send(&state, get("/appointments/next-tuesday")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ── Booking ──

#[tokio::test]
async fn test_booking_round_trip_and_confirmation_email() {
    let (state, sent) = test_state();
    let token = login(&state).await;
    let ids = create_slots(&state, &token, &["2099-06-01T10:00"]).await;

    let (status, json) = send(
        &state,
        json_request("POST", "/appointment", booking_body(&ids[0], "Jo", "Jo@Example.com")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["appointmentId"], ids[0].as_str());
    let client_id = json["clientId"].as_str().unwrap().to_string();

    let (status, json) = send(&state, get(&format!("/appointment/{}", ids[0]))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["date"], "2099-06-01");
    assert_eq!(json["time"], "2099-06-01T10:00:00");

    let sent = sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "jo@example.com");
    assert_eq!(sent[0].1, "Appointment Request Confirmation");
    assert!(sent[0].2.contains(&format!("appointmentId={}", ids[0])));
    assert!(sent[0].2.contains(&format!("clientId={client_id}")));
}

#[tokio::test]
async fn test_double_booking_rejected() {
    let (state, sent) = test_state();
    let token = login(&state).await;
    let ids = create_slots(&state, &token, &["2099-06-01T10:00"]).await;

    let (status, _) = send(
        &state,
        json_request("POST", "/appointment", booking_body(&ids[0], "Jo", "jo@example.com")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = send(
        &state,
        json_request("POST", "/appointment", booking_body(&ids[0], "Sam", "sam@example.com")),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "appointment is already booked");
    assert_eq!(sent.lock().unwrap().len(), 1);

    let (_, json) = send(&state, get(&format!("/admin/{token}/appointments?booked"))).await;
    let booked = json.as_array().unwrap();
    assert_eq!(booked.len(), 1);
    assert_eq!(
        booked[0]["scheduledAppointment"]["client"]["preferredName"],
        "Jo"
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_racing_bookings_yield_one_booking() {
    let (state, _) = test_state();
    let token = login(&state).await;
    let ids = create_slots(&state, &token, &["2099-06-01T10:00"]).await;

    let ((first, _), (second, _)) = tokio::join!(
        send(
            &state,
            json_request("POST", "/appointment", booking_body(&ids[0], "Jo", "jo@example.com")),
        ),
        send(
            &state,
            json_request("POST", "/appointment", booking_body(&ids[0], "Sam", "sam@example.com")),
        ),
    );
    let mut statuses = vec![first.as_u16(), second.as_u16()];
    statuses.sort();
    assert_eq!(statuses, vec![200, 400]);

    let db = state.db.lock().unwrap();
    let rows: i64 = db
        .query_row(
            "SELECT COUNT(*) FROM scheduled_appointments WHERE appointment_id = ?1",
            [&ids[0]],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(rows, 1);
}

#[tokio::test]
async fn test_booking_unknown_slot_is_not_found() {
    let (state, _) = test_state();
    let (status, _) = send(
        &state,
        json_request(
            "POST",
            "/appointment",
            booking_body("6f1c2b9e-0d4e-4c55-9a53-1d2b3c4d5e6f", "Jo", "jo@example.com"),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_same_email_reuses_client() {
    let (state, _) = test_state();
    let token = login(&state).await;
    let ids = create_slots(&state, &token, &["2099-06-01T10:00", "2099-06-02T10:00"]).await;

    let (_, first) = send(
        &state,
        json_request("POST", "/appointment", booking_body(&ids[0], "Jo", "jo@example.com")),
    )
    .await;
    let (_, second) = send(
        &state,
        json_request("POST", "/appointment", booking_body(&ids[1], "Jo", " JO@example.com ")),
    )
    .await;
    assert_eq!(first["clientId"], second["clientId"]);

    let db = state.db.lock().unwrap();
    let clients: i64 = db
        .query_row("SELECT COUNT(*) FROM clients", [], |r| r.get(0))
        .unwrap();
    assert_eq!(clients, 1);
}

#[tokio::test]
async fn test_notifier_failure_keeps_booking() {
    let state = state_with(Box::new(FailingNotifier));
    let token = login(&state).await;
    let ids = create_slots(&state, &token, &["2099-06-01T10:00"]).await;

    let (status, _) = send(
        &state,
        json_request("POST", "/appointment", booking_body(&ids[0], "Jo", "jo@example.com")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, json) = send(&state, get("/appointments/2099-06-01")).await;
    assert_eq!(json[0]["status"], "Booked");
}

#[tokio::test]
async fn test_status_flips_when_last_slot_booked() {
    let (state, _) = test_state();
    let token = login(&state).await;
    let ids = create_slots(&state, &token, &["2099-06-01T10:00"]).await;

    let (status, json) = send(&state, get("/appointments/status")).await;
    assert_eq!(status, StatusCode::OK);
    let day = json
        .as_array()
        .unwrap()
        .iter()
        .find(|d| d["dateTime"].as_str().unwrap().starts_with("2099-06-01"))
        .cloned()
        .unwrap();
    assert_eq!(day["hasAvailable"], true);

    send(
        &state,
        json_request("POST", "/appointment", booking_body(&ids[0], "Jo", "jo@example.com")),
    )
    .await;

    let (_, json) = send(&state, get("/appointments/status")).await;
    let day = json
        .as_array()
        .unwrap()
        .iter()
        .find(|d| d["dateTime"].as_str().unwrap().starts_with("2099-06-01"))
        .cloned()
        .unwrap();
    assert_eq!(day["hasAvailable"], false);
}

// ── Promotions ──

#[tokio::test]
async fn test_promotion_by_name_then_id_shares_row() {
    let (state, _) = test_state();
    let token = login(&state).await;
    let ids = create_slots(&state, &token, &["2099-06-01T10:00", "2099-06-01T11:00"]).await;

    let mut first = booking_body(&ids[0], "Jo", "jo@example.com");
    first["promotion"] = serde_json::json!({"name": "Summer Glow"});
    let (status, _) = send(&state, json_request("POST", "/appointment", first)).await;
    assert_eq!(status, StatusCode::OK);

    let (_, promos) = send(&state, get("/promotions")).await;
    let promos = promos.as_array().unwrap();
    assert_eq!(promos.len(), 1);
    let promo_id = promos[0]["id"].as_str().unwrap().to_string();

    let mut second = booking_body(&ids[1], "Sam", "sam@example.com");
    second["promotion"] = serde_json::json!({"id": promo_id});
    let (status, _) = send(&state, json_request("POST", "/appointment", second)).await;
    assert_eq!(status, StatusCode::OK);

    let (_, promos) = send(&state, get("/promotions")).await;
    assert_eq!(promos.as_array().unwrap().len(), 1);

    let (_, listed) = send(
        &state,
        get(&format!("/admin/{token}/appointments?promotion=Summer%20Glow")),
    )
    .await;
    assert_eq!(listed.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_create_promotion_rejects_duplicate_name() {
    let (state, _) = test_state();
    let body = serde_json::json!({"name": "Flash Sale"});

    let (status, json) = send(&state, json_request("POST", "/promotion", body.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["name"], "Flash Sale");

    let (status, json) = send(&state, json_request("POST", "/promotion", body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Promotion already exists!");
}

#[tokio::test]
async fn test_promotional_slots_are_scoped() {
    let (state, _) = test_state();
    let token = login(&state).await;
    create_slots(&state, &token, &["2099-06-01T09:00"]).await;

    let (status, _) = send(
        &state,
        json_request(
            "POST",
            &format!("/admin/{token}/appointments/promotion"),
            serde_json::json!([
                {"dateTime": "2099-06-01T12:00", "promotion": {"name": "Flash Sale"}}
            ]),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &state,
        json_request(
            "POST",
            &format!("/admin/{token}/appointments/promotion"),
            serde_json::json!([{"dateTime": "2099-06-01T13:00"}]),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, regular) = send(&state, get("/appointments/2099-06-01")).await;
    assert_eq!(regular.as_array().unwrap().len(), 1);

    let (_, promo) = send(&state, get("/appointments/2099-06-01/promotion/Flash%20Sale")).await;
    let promo = promo.as_array().unwrap();
    assert_eq!(promo.len(), 1);
    assert_eq!(promo[0]["dateTime"], "2099-06-01T12:00:00");

    let (_, status) = send(&state, get("/appointments/promotion/status/Flash%20Sale")).await;
    assert_eq!(status.as_array().unwrap().len(), 1);
    assert_eq!(status[0]["hasAvailable"], true);
}

// ── Consent Forms ──

#[tokio::test]
async fn test_consent_form_for_unknown_client() {
    let (state, _) = test_state();
    let (status, _) = send(
        &state,
        json_request(
            "POST",
            "/consentForm",
            serde_json::json!({
                "clientId": "6f1c2b9e-0d4e-4c55-9a53-1d2b3c4d5e6f",
                "printedName": "Jo Doe",
                "initialedStatements": ["I consent"],
                "initials": "JD",
                "signature": "Jo Doe"
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_consent_form_attaches_once() {
    let (state, _) = test_state();
    let token = login(&state).await;
    let ids = create_slots(&state, &token, &["2099-06-01T10:00"]).await;
    let (_, booked) = send(
        &state,
        json_request("POST", "/appointment", booking_body(&ids[0], "Jo", "jo@example.com")),
    )
    .await;
    let client_id = booked["clientId"].as_str().unwrap().to_string();

    let form = serde_json::json!({
        "clientId": client_id,
        "appointmentId": ids[0],
        "printedName": "Jo Doe",
        "initialedStatements": ["I consent"],
        "initials": "JD",
        "signature": "Jo Doe"
    });
    let (status, json) = send(&state, json_request("POST", "/consentForm", form.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["clientId"], client_id.as_str());

    let (status, _) = send(&state, json_request("POST", "/consentForm", form)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_statement_mutations_require_bearer() {
    let (state, _) = test_state();
    let token = login(&state).await;

    let (status, _) = send(
        &state,
        json_request(
            "POST",
            "/consentForm/statements",
            serde_json::json!({"statement": "I consent"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, created) = send(
        &state,
        bearer_request(
            "POST",
            "/consentForm/statements",
            &token,
            serde_json::json!([
                {"statement": "I consent to the treatment"},
                {"statement": "I understand aftercare"}
            ]),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let id = created[1]["id"].as_i64().unwrap();

    let (status, updated) = send(
        &state,
        bearer_request(
            "PUT",
            &format!("/consentForm/statements/{id}"),
            &token,
            serde_json::json!({"statement": "I will follow aftercare"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["statement"], "I will follow aftercare");

    let (status, _) = send(
        &state,
        bearer_request(
            "DELETE",
            &format!("/consentForm/statements/{id}"),
            &token,
            serde_json::Value::Null,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, active) = send(&state, get("/consentForm/statements")).await;
    assert_eq!(active.as_array().unwrap().len(), 1);

    let (status, _) = send(&state, get("/consentForm/statements?includeInactive=true")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (_, retired) = send(&state, get(&format!("/consentForm/statements/{id}"))).await;
    assert_eq!(retired["isActive"], false);
}

// ── Services Catalog ──

#[tokio::test]
async fn test_services_catalog() {
    let (state, _) = test_state();
    let catalog = serde_json::json!([
        {
            "serviceName": "Classic Facial",
            "serviceType": "Facial",
            "cardTitle": "Classic Facial",
            "cardContent": "Deep clean and glow",
            "cardImgSrc": "/img/classic.jpg",
            "price": "$85"
        },
        {
            "serviceName": "Dermaplaning",
            "serviceType": "AddOn",
            "cardTitle": "Dermaplaning",
            "cardContent": "Smooth finish",
            "cardImgSrc": "/img/derma.jpg"
        }
    ]);

    let (status, _) = send(&state, json_request("POST", "/services", catalog.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let token = login(&state).await;
    let (status, _) = send(&state, bearer_request("POST", "/services", &token, catalog)).await;
    assert_eq!(status, StatusCode::OK);

    let (_, all) = send(&state, get("/services")).await;
    assert_eq!(all.as_array().unwrap().len(), 2);

    let (status, addons) = send(&state, get("/services/search?serviceType=AddOn")).await;
    assert_eq!(status, StatusCode::OK);
    let addons = addons.as_array().unwrap();
    assert_eq!(addons.len(), 1);
    assert_eq!(addons[0]["serviceName"], "Dermaplaning");
}

// ── Test Email ──

#[tokio::test]
async fn test_test_email_reports_delivery() {
    let (state, sent) = test_state();
    let token = login(&state).await;
    let (status, json) = send(
        &state,
        json_request(
            "POST",
            &format!("/admin/{token}/test-email"),
            serde_json::json!({"email": "owner@example.com"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["ok"], true);
    assert_eq!(sent.lock().unwrap()[0].0, "owner@example.com");

    let failing = state_with(Box::new(FailingNotifier));
    let token = login(&failing).await;
    let (status, _) = send(
        &failing,
        json_request(
            "POST",
            &format!("/admin/{token}/test-email"),
            serde_json::json!({"email": "owner@example.com"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
}
