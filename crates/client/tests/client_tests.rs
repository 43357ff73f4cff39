//! Integration tests for the backend client against a mock backend

use portico_client::{ApiRequest, BackendClient, ClientError, FilePart, RetryPolicy};
use portico_core::SharedSecret;
use portico_session::{
    AuthStatus, RefreshCredential, Role, SessionBridge, SessionError, TokenVerifier,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{
    body_json, body_string, body_string_contains, header, header_regex, method, path, query_param,
};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn backend_token(secret: &str, subject: &str, ttl: u64) -> String {
    TokenVerifier::new(&SharedSecret::new(secret).unwrap())
        .mint(subject, Some(&Role::Admin), None, Duration::from_secs(ttl))
        .unwrap()
        .as_str()
        .to_string()
}

fn dashboard(secret: &str) -> Arc<SessionBridge> {
    Arc::new(
        SessionBridge::new(TokenVerifier::new(&SharedSecret::new(secret).unwrap()))
            .with_allowed_roles([Role::Admin, Role::BackOffice]),
    )
}

fn client(server: &MockServer, session: Arc<SessionBridge>) -> BackendClient {
    BackendClient::builder()
        .base_url(server.uri())
        .session(session)
        .timeout(Duration::from_millis(200))
        .retry(RetryPolicy::new(3, Duration::from_millis(10), Duration::from_millis(40)))
        .build()
        .unwrap()
}

fn signed_in(secret: &str) -> (Arc<SessionBridge>, String) {
    let session = dashboard(secret);
    let raw = backend_token(secret, "admin-1", 3600);
    session.adopt(&raw, Some(RefreshCredential::new("r-1"))).unwrap();
    (session, raw)
}

#[tokio::test]
async fn test_client_builder_requires_base_url() {
    let result = BackendClient::builder().session(dashboard("s1")).build();
    assert!(matches!(result, Err(ClientError::Configuration(_))));
}

#[tokio::test]
async fn test_login_then_call_with_shared_secret() {
    let mock_server = MockServer::start().await;
    let access = backend_token("s1", "admin-1", 3600);

    Mock::given(method("POST"))
        .and(path("/auth/login-admin"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string_contains("password=hunter2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": access,
            "refresh_token": "r-1",
            "token_type": "bearer"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/admin/dashboard-stats"))
        .and(header("authorization", format!("Bearer {access}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"total_orders": 12})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let session = dashboard("s1");
    let client = client(&mock_server, Arc::clone(&session));

    let token = client.login("admin@example.com", "hunter2").await.unwrap();
    assert_eq!(token.subject(), "admin-1");
    assert!(session.refresh_credential().is_some());

    let response = client
        .call(&ApiRequest::get("/admin/dashboard-stats"))
        .await
        .unwrap();
    assert_eq!(response.body["total_orders"], 12);
}

#[tokio::test]
async fn test_mismatched_secret_blocks_protected_calls() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/login-admin"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": backend_token("s1", "admin-1", 3600)
        })))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/admin/dashboard-stats"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let session = dashboard("s2");
    let client = client(&mock_server, Arc::clone(&session));

    let result = client.login("admin@example.com", "hunter2").await;
    assert!(matches!(
        result,
        Err(ClientError::Session(SessionError::InvalidSignature))
    ));

    let result = client.call(&ApiRequest::get("/admin/dashboard-stats")).await;
    assert!(matches!(result, Err(ClientError::Unauthenticated)));
    assert_eq!(session.status(), AuthStatus::Unauthenticated);
}

#[tokio::test]
async fn test_unauthenticated_call_sends_nothing() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let (session, _) = signed_in("s1");
    session.clear_current();
    let client = client(&mock_server, session);

    let result = client.call(&ApiRequest::get("/admin/products")).await;
    assert!(matches!(result, Err(ClientError::Unauthenticated)));
}

#[tokio::test]
async fn test_auth_rejection_clears_session() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/admin/users"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"detail": "Token has been revoked"})),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let (session, _) = signed_in("s1");
    let client = client(&mock_server, Arc::clone(&session));

    match client.call(&ApiRequest::get("/admin/users")).await {
        Err(ClientError::AuthRejected { status, message }) => {
            assert_eq!(status, 401);
            assert_eq!(message, "Token has been revoked");
        }
        other => panic!("expected auth rejection, got {other:?}"),
    }
    assert_eq!(session.status(), AuthStatus::Unauthenticated);
    // The refresh credential survives so the session can be re-established
    assert!(session.refresh_credential().is_some());
}

#[tokio::test]
async fn test_forbidden_is_auth_rejection() {
    let mock_server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/admin/users/9"))
        .respond_with(ResponseTemplate::new(403).set_body_string("Forbidden"))
        .mount(&mock_server)
        .await;

    let (session, _) = signed_in("s1");
    let client = client(&mock_server, Arc::clone(&session));

    let result = client.call(&ApiRequest::delete("/admin/users/9")).await;
    assert!(matches!(result, Err(ClientError::AuthRejected { status: 403, .. })));
    assert!(!session.is_authenticated());
}

#[tokio::test]
async fn test_backend_error_passthrough() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/admin/products"))
        .and(body_json(json!({"sku": "TEA-01"})))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "detail": "SKU already exists",
            "code": "duplicate_sku"
        })))
        .mount(&mock_server)
        .await;

    let (session, _) = signed_in("s1");
    let client = client(&mock_server, Arc::clone(&session));

    let request = ApiRequest::post("/admin/products").json(json!({"sku": "TEA-01"}));
    match client.call(&request).await {
        Err(ClientError::BackendError {
            status,
            code,
            message,
        }) => {
            assert_eq!(status, 409);
            assert_eq!(code.as_deref(), Some("duplicate_sku"));
            assert_eq!(message, "SKU already exists");
        }
        other => panic!("expected backend error, got {other:?}"),
    }
    assert!(session.is_authenticated());
}

#[tokio::test]
async fn test_query_string_is_forwarded() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/admin/orders"))
        .and(query_param("status", "pending"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (session, _) = signed_in("s1");
    let client = client(&mock_server, session);

    let response = client
        .call(&ApiRequest::get("/admin/orders").query("status=pending"))
        .await
        .unwrap();
    assert_eq!(response.body, json!([]));
}

#[tokio::test]
async fn test_idempotent_call_retries_on_timeout() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/admin/products"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(1000)))
        .expect(3)
        .mount(&mock_server)
        .await;

    let (session, _) = signed_in("s1");
    let client = client(&mock_server, session);

    match client.call(&ApiRequest::get("/admin/products")).await {
        Err(ClientError::TransportError { timed_out, .. }) => assert!(timed_out),
        other => panic!("expected transport error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_write_is_never_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/admin/products"))
        .respond_with(ResponseTemplate::new(201).set_delay(Duration::from_millis(1000)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (session, _) = signed_in("s1");
    let client = client(&mock_server, session);

    let request = ApiRequest::post("/admin/products").json(json!({"name": "Masala chai"}));
    let result = client.call(&request).await;
    assert!(matches!(result, Err(ClientError::TransportError { .. })));
}

#[tokio::test]
async fn test_retry_recovers_after_transient_timeout() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/admin/categories"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(1000)))
        .up_to_n_times(1)
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/admin/categories"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 1}])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (session, _) = signed_in("s1");
    let client = client(&mock_server, session);

    let response = client
        .call(&ApiRequest::get("/admin/categories"))
        .await
        .unwrap();
    assert_eq!(response.body[0]["id"], 1);
}

#[tokio::test]
async fn test_unreachable_backend_is_transport_error() {
    let session = signed_in("s1").0;
    let client = BackendClient::builder()
        .base_url("http://127.0.0.1:1")
        .session(session)
        .retry(RetryPolicy::none())
        .build()
        .unwrap();

    let err = client
        .call(&ApiRequest::get("/admin/products"))
        .await
        .unwrap_err();
    assert!(err.is_retryable());
    assert!(matches!(err, ClientError::TransportError { timed_out: false, .. }));
}

#[tokio::test]
async fn test_reauthenticating_call_replays_reads() {
    let mock_server = MockServer::start().await;
    let (session, stale) = signed_in("s1");
    let fresh = backend_token("s1", "admin-1", 7200);

    Mock::given(method("GET"))
        .and(path("/admin/products"))
        .and(header("authorization", format!("Bearer {stale}").as_str()))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/auth/refresh-token"))
        .and(body_json(json!({"refresh_token": "r-1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": fresh,
            "refresh_token": "r-2"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/admin/products"))
        .and(header("authorization", format!("Bearer {fresh}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 7}])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client(&mock_server, Arc::clone(&session));
    let response = client
        .call_reauthenticating(&ApiRequest::get("/admin/products"))
        .await
        .unwrap();

    assert_eq!(response.body[0]["id"], 7);
    assert_eq!(session.current().unwrap().as_str(), fresh);
    assert_eq!(session.refresh_credential().unwrap().expose(), "r-2");
}

#[tokio::test]
async fn test_reauthenticating_call_does_not_replay_writes() {
    let mock_server = MockServer::start().await;
    let (session, stale) = signed_in("s1");
    let fresh = backend_token("s1", "admin-1", 7200);

    Mock::given(method("POST"))
        .and(path("/admin/products"))
        .and(header("authorization", format!("Bearer {stale}").as_str()))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/auth/refresh-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": fresh})))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/admin/products"))
        .and(header("authorization", format!("Bearer {fresh}").as_str()))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&mock_server)
        .await;

    let client = client(&mock_server, Arc::clone(&session));
    let request = ApiRequest::post("/admin/products").json(json!({"name": "Ginger tea"}));
    let result = client.call_reauthenticating(&request).await;

    assert!(matches!(result, Err(ClientError::AuthRejected { .. })));
    assert_eq!(session.current().unwrap().as_str(), fresh);
    assert_eq!(session.refresh_credential().unwrap().expose(), "r-1");
}

#[tokio::test]
async fn test_rejected_refresh_drops_credential() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/refresh-token"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"detail": "expired"})))
        .mount(&mock_server)
        .await;

    let (session, _) = signed_in("s1");
    let client = client(&mock_server, Arc::clone(&session));

    let result = client.refresh_session().await;
    assert!(matches!(result, Err(ClientError::AuthRejected { .. })));
    assert!(session.refresh_credential().is_none());
}

#[tokio::test]
async fn test_otp_flow_uses_email_or_phone() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/request-otp"))
        .and(body_json(json!({"phone": "9000000000"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "OTP sent"})))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/auth/verify-otp"))
        .and(body_json(json!({"phone": "9000000000", "otp": "424242"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": backend_token("s1", "ops-2", 3600)
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let session = dashboard("s1");
    let client = client(&mock_server, Arc::clone(&session));

    let sent = client.request_otp("9000000000").await.unwrap();
    assert_eq!(sent["message"], "OTP sent");

    let token = client.verify_otp("9000000000", "424242").await.unwrap();
    assert_eq!(token.subject(), "ops-2");
    assert!(session.is_authenticated());
}

#[tokio::test]
async fn test_wrong_password_leaves_bridge_untouched() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/login-admin"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"detail": "Invalid credentials"})),
        )
        .mount(&mock_server)
        .await;

    let session = dashboard("s1");
    let client = client(&mock_server, Arc::clone(&session));

    match client.login("admin@example.com", "wrong").await {
        Err(ClientError::AuthRejected { message, .. }) => {
            assert_eq!(message, "Invalid credentials");
        }
        other => panic!("expected auth rejection, got {other:?}"),
    }
    assert!(!session.is_authenticated());
}

#[tokio::test]
async fn test_password_reset_endpoints() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/request-password-reset"))
        .and(body_json(json!({"email_or_phone": "ops@example.com"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "sent"})))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/auth/reset-password"))
        .and(body_json(json!({
            "email_or_phone": "ops@example.com",
            "otp": "111111",
            "new_password": "n3w-pass"
        })))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({"detail": "Invalid OTP"})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client(&mock_server, dashboard("s1"));

    client.request_password_reset("ops@example.com").await.unwrap();
    let result = client
        .reset_password("ops@example.com", "111111", "n3w-pass")
        .await;
    assert!(matches!(
        result,
        Err(ClientError::BackendError { status: 400, ref message, .. }) if message == "Invalid OTP"
    ));
}

#[tokio::test]
async fn test_upload_image_sends_multipart_with_bearer() {
    let mock_server = MockServer::start().await;
    let (session, raw) = signed_in("s1");

    Mock::given(method("POST"))
        .and(path("/admin/upload/products"))
        .and(header("authorization", format!("Bearer {raw}").as_str()))
        .and(header_regex("content-type", "^multipart/form-data; boundary="))
        .and(body_string_contains("name=\"file\"; filename=\"tea.png\""))
        .and(body_string_contains("fake-png-bytes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "url": "https://cdn.example.com/products/tea.png"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client(&mock_server, session);
    let url = client
        .upload_image("products", FilePart::new("tea.png", "image/png", &b"fake-png-bytes"[..]))
        .await
        .unwrap();
    assert_eq!(url.as_deref(), Some("https://cdn.example.com/products/tea.png"));
}

#[tokio::test]
async fn test_upload_requires_session() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let client = client(&mock_server, dashboard("s1"));
    let result = client
        .upload_image("products", FilePart::new("tea.png", "image/png", &b"png"[..]))
        .await;
    assert!(matches!(result, Err(ClientError::Unauthenticated)));
}

#[tokio::test]
async fn test_raw_payload_is_sent_unchanged() {
    let mock_server = MockServer::start().await;
    let (session, _) = signed_in("s1");
    let body = "--XyZ\r\nContent-Disposition: form-data; name=\"file\"; filename=\"a.png\"\r\n\r\npng\r\n--XyZ--\r\n";

    Mock::given(method("POST"))
        .and(path("/admin/upload/banners"))
        .and(header("content-type", "multipart/form-data; boundary=XyZ"))
        .and(body_string(body))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"url": "u"})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client(&mock_server, session);
    let request = ApiRequest::post("/admin/upload/banners")
        .raw("multipart/form-data; boundary=XyZ", body.as_bytes().to_vec());
    let response = client.call(&request).await.unwrap();
    assert_eq!(response.body["url"], "u");
}
