// End-to-end through the hyper transport against a mock server.
use clinicdesk::api;
use clinicdesk::client::{HttpsApiClient, LogOnlyRedirect};
use clinicdesk::config::Config;
use clinicdesk::context::TestContext;
use clinicdesk::error::ClientError;
use clinicdesk::model::{AppointmentStatus, LoginInput, ServiceInput};
use clinicdesk::session::SessionStore;
use clinicdesk::storage::MemoryStore;
use mockito::{Matcher, Server};
use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

fn client(url: &str, store: &MemoryStore) -> HttpsApiClient {
    HttpsApiClient::new(
        &Config::new(url),
        SessionStore::new(Arc::new(store.clone())),
        Arc::new(LogOnlyRedirect),
    )
    .unwrap()
}

fn signed_in(access: &str, refresh: &str) -> MemoryStore {
    MemoryStore::with_entries([
        ("authToken", access),
        ("refreshToken", refresh),
        ("userData", r#"{"id":"u1","email":"dr.lee@example.com"}"#),
        ("isLoggedIn", "true"),
    ])
}

#[tokio::test]
async fn expired_token_is_refreshed_and_request_replayed() {
    let mut server = Server::new_async().await;

    let expired = server
        .mock("GET", "/clinics/my/clinics")
        .match_header("authorization", "Bearer T1")
        .with_status(401)
        .with_body(r#"{"message":"jwt expired"}"#)
        .expect(1)
        .create_async()
        .await;
    let refresh = server
        .mock("POST", "/auth/refresh-token")
        .match_header("authorization", Matcher::Missing)
        .match_header("user-agent", Matcher::Regex(r"^clinicdesk/".to_string()))
        .match_body(Matcher::Json(json!({"refreshToken": "R1"})))
        .with_status(200)
        .with_body(r#"{"data":{"accessToken":"T2","refreshToken":"R2"},"message":"ok"}"#)
        .expect(1)
        .create_async()
        .await;
    let replay = server
        .mock("GET", "/clinics/my/clinics")
        .match_header("authorization", "Bearer T2")
        .with_status(200)
        .with_body(r#"{"data":[{"_id":"c1","name":"North Clinic"}]}"#)
        .expect(1)
        .create_async()
        .await;

    let store = signed_in("T1", "R1");
    let clinics = api::clinics::my_clinics(&client(&server.url(), &store))
        .await
        .unwrap();

    assert_eq!(clinics[0].id, "c1");
    expired.assert_async().await;
    refresh.assert_async().await;
    replay.assert_async().await;
    assert_eq!(store.snapshot()["authToken"], "T2");
    assert_eq!(store.snapshot()["refreshToken"], "R2");
}

#[tokio::test]
async fn rejected_refresh_purges_session_and_redirects() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/services/my-services")
        .with_status(401)
        .create_async()
        .await;
    let refresh = server
        .mock("POST", "/auth/refresh-token")
        .with_status(401)
        .with_body(r#"{"message":"refresh token revoked"}"#)
        .expect(1)
        .create_async()
        .await;

    let redirects = Arc::new(AtomicUsize::new(0));
    let counter = redirects.clone();
    let store = signed_in("T1", "R1");
    let client = HttpsApiClient::new(
        &Config::new(server.url()),
        SessionStore::new(Arc::new(store.clone())),
        Arc::new(move |_reason: &ClientError| {
            counter.fetch_add(1, Ordering::SeqCst);
        }),
    )
    .unwrap();

    let result = api::services::my_services(&client).await;

    assert!(matches!(result, Err(ClientError::RefreshExchange(_))));
    refresh.assert_async().await;
    assert!(store.snapshot().is_empty());
    assert_eq!(redirects.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn requests_carry_bearer_and_client_headers() {
    let mut server = Server::new_async().await;
    let me = server
        .mock("GET", "/users/me")
        .match_header("authorization", "Bearer T1")
        .match_header("accept", "application/json")
        .match_header("user-agent", Matcher::Regex(r"^clinicdesk/".to_string()))
        .with_status(200)
        .with_body(r#"{"data":{"id":"u1","email":"dr.lee@example.com","firstName":"Jo","lastName":"Lee"}}"#)
        .create_async()
        .await;

    let store = signed_in("T1", "R1");
    let user = api::auth::current_user(&client(&server.url(), &store))
        .await
        .unwrap();

    me.assert_async().await;
    assert_eq!(user.display_name(), "Jo Lee");
    // The cached profile is replaced by the fresh one.
    assert!(store.snapshot()["userData"].contains("\"firstName\":\"Jo\""));
}

#[tokio::test]
async fn error_statuses_carry_backend_message() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/appointments/a404")
        .with_status(404)
        .with_body(r#"{"message":"Appointment not found","statusCode":404}"#)
        .create_async()
        .await;

    let store = signed_in("T1", "R1");
    let result = api::appointments::get(&client(&server.url(), &store), "a404").await;

    assert_eq!(
        result,
        Err(ClientError::Status {
            status: 404,
            message: "Appointment not found".to_string()
        })
    );
    // Not an auth failure: the session is untouched.
    assert_eq!(store.snapshot().len(), 4);
}

#[tokio::test]
async fn login_stores_the_full_session() {
    let mut server = Server::new_async().await;
    let login = server
        .mock("POST", "/auth/login")
        .match_header("authorization", Matcher::Missing)
        .match_body(Matcher::Json(json!({"email": "dr.lee@example.com", "password": "s3cret"})))
        .with_status(201)
        .with_body(
            r#"{"data":{"accessToken":"T1","refreshToken":"R1","user":{"_id":"u1","email":"dr.lee@example.com","role":"DOCTOR"}}}"#,
        )
        .create_async()
        .await;

    let store = MemoryStore::new();
    let user = api::auth::login(
        &client(&server.url(), &store),
        &LoginInput {
            email: "dr.lee@example.com".into(),
            password: "s3cret".into(),
        },
    )
    .await
    .unwrap();

    login.assert_async().await;
    assert!(user.is_doctor());
    let stored = store.snapshot();
    assert_eq!(stored["authToken"], "T1");
    assert_eq!(stored["refreshToken"], "R1");
    assert_eq!(stored["isLoggedIn"], "true");
    assert!(stored["userData"].contains("dr.lee@example.com"));
}

#[tokio::test]
async fn logout_clears_session_even_when_backend_fails() {
    let mut server = Server::new_async().await;
    let logout = server
        .mock("POST", "/auth/logout")
        .match_header("authorization", "Bearer T1")
        .with_status(500)
        .create_async()
        .await;

    let store = signed_in("T1", "R1");
    api::auth::logout(&client(&server.url(), &store)).await.unwrap();

    logout.assert_async().await;
    assert!(store.snapshot().is_empty());
}

#[tokio::test]
async fn writes_send_json_bodies() {
    let mut server = Server::new_async().await;
    let status = server
        .mock("PATCH", "/appointments/a1/status")
        .match_header("content-type", "application/json")
        .match_body(Matcher::Json(json!({"status": "COMPLETED"})))
        .with_status(200)
        .with_body(r#"{"data":{"id":"a1","status":"COMPLETED","scheduledAt":"2026-03-02T09:30:00Z"}}"#)
        .create_async()
        .await;
    let create = server
        .mock("POST", "/services")
        .match_body(Matcher::Json(json!({"name": "Check-up", "price": 35.5, "durationMinutes": 20})))
        .with_status(201)
        .with_body(r#"{"data":{"id":"s9","name":"Check-up","price":35.5,"durationMinutes":20}}"#)
        .create_async()
        .await;
    let delete = server
        .mock("DELETE", "/services/s9")
        .with_status(204)
        .create_async()
        .await;

    let store = signed_in("T1", "R1");
    let client = client(&server.url(), &store);

    let updated = api::appointments::update_status(&client, "a1", AppointmentStatus::Completed)
        .await
        .unwrap();
    assert!(updated.status.is_final());

    let service = api::services::create(
        &client,
        &ServiceInput {
            name: "Check-up".into(),
            description: None,
            price: 35.5,
            duration_minutes: Some(20),
            clinic_id: None,
        },
    )
    .await
    .unwrap();
    api::services::delete(&client, &service.id).await.unwrap();

    status.assert_async().await;
    create.assert_async().await;
    delete.assert_async().await;
}

#[tokio::test]
async fn invalid_ids_are_rejected_before_sending() {
    let server = Server::new_async().await;
    let store = signed_in("T1", "R1");
    let result = api::clinics::get(&client(&server.url(), &store), "../admin").await;
    assert!(matches!(result, Err(ClientError::InvalidRequest(_))));
}

#[tokio::test]
async fn unreachable_backend_is_a_transport_error() {
    let store = signed_in("T1", "R1");
    // Nothing listens on port 9 of the loopback.
    let result = api::clinics::my_clinics(&client("http://127.0.0.1:9", &store)).await;
    assert!(matches!(result, Err(ClientError::Transport(_))));
    assert_eq!(store.snapshot().len(), 4);
}

#[tokio::test]
async fn session_persists_in_file_store() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/auth/login")
        .with_status(200)
        .with_body(
            r#"{"data":{"accessToken":"T1","refreshToken":"R1","user":{"id":"u1","email":"a@b.c"}}}"#,
        )
        .create_async()
        .await;

    let ctx = TestContext::new();
    let session = SessionStore::for_context(&ctx).unwrap();
    let client = HttpsApiClient::new(
        &Config::new(server.url()),
        session,
        Arc::new(LogOnlyRedirect),
    )
    .unwrap();
    api::auth::login(
        &client,
        &LoginInput {
            email: "a@b.c".into(),
            password: "pw".into(),
        },
    )
    .await
    .unwrap();

    // A new process reads the same file.
    let reopened = SessionStore::for_context(&ctx).unwrap();
    assert_eq!(reopened.access_token().await.unwrap().as_deref(), Some("T1"));
    assert_eq!(reopened.refresh_token().await.unwrap().as_deref(), Some("R1"));
    assert!(reopened.is_logged_in().await.unwrap());

    reopened.purge().await.unwrap();
    assert!(!client.session().is_logged_in().await.unwrap());
}
