//! Integration tests for the session guard
//!
//! Requests go through the full route tree with real JWTs; logouts go through
//! `POST /internal/logout`, the channel source and the background ingestor.

use std::time::Duration;

use serde_json::Value;
use tokio::time::{sleep, timeout};
use warp::http::StatusCode;
use warp::test::request;

use crate::config::AppConfig;
use crate::infrastructure::http::server::HttpServer;
use crate::tests::common::sign_token;
use crate::tests::{config, TestResult};

/// Server under test plus its running background tasks
struct TestServer {
    server: HttpServer,
    tasks: Vec<tokio::task::JoinHandle<()>>,
}

impl TestServer {
    fn start(config: AppConfig) -> TestResult<Self> {
        config::init();
        let server = HttpServer::new(config)?;
        let tasks = server.spawn_background();
        Ok(Self { server, tasks })
    }

    fn token(&self, user_id: u64, session_id: &str) -> String {
        sign_token(&self.server.config().auth.token, user_id, session_id, 300)
    }

    /// Wait until the ingestor has published at least `sequence`
    async fn wait_for_sequence(&self, sequence: u64) {
        let log = self.server.authenticator().log().clone();
        timeout(Duration::from_secs(2), async move {
            while log.last_sequence().await < sequence {
                sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("logout was not ingested in time");
    }

    async fn wait_for_watchers(&self, count: i64) {
        let metrics = self.server.metrics().clone();
        timeout(Duration::from_secs(2), async move {
            while metrics.active_watchers() < count {
                sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("watcher did not start in time");
    }

    async fn stop(self) {
        self.server.shutdown_token().cancel();
        for task in self.tasks {
            let _ = task.await;
        }
    }
}

fn json_body(body: &[u8]) -> Value {
    serde_json::from_slice(body).expect("JSON body")
}

fn bearer(token: &str) -> String {
    format!("Bearer {}", token)
}

#[tokio::test]
async fn test_health_endpoint() -> TestResult<()> {
    let server = TestServer::start(config::test_config())?;
    let routes = server.server.routes();

    let response = request().method("GET").path("/health").reply(&routes).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response.body())["status"], "healthy");

    server.stop().await;
    Ok(())
}

#[tokio::test]
async fn test_request_without_credential_is_public() -> TestResult<()> {
    let server = TestServer::start(config::test_config())?;
    let routes = server.server.routes();

    let response = request().method("GET").path("/whoami").reply(&routes).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response.body())["user_id"], 0);

    server.stop().await;
    Ok(())
}

#[tokio::test]
async fn test_valid_token_is_authenticated() -> TestResult<()> {
    let server = TestServer::start(config::test_config())?;
    let routes = server.server.routes();
    let token = server.token(42, "s1");

    let response = request()
        .method("GET")
        .path("/whoami")
        .header("Authentication", bearer(&token))
        .reply(&routes)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response.body())["user_id"], 42);

    server.stop().await;
    Ok(())
}

#[tokio::test]
async fn test_expired_token_is_distinguishable() -> TestResult<()> {
    let server = TestServer::start(config::test_config())?;
    let routes = server.server.routes();
    let token = sign_token(&server.server.config().auth.token, 42, "s1", -120);

    let response = request()
        .method("GET")
        .path("/whoami")
        .header("Authentication", bearer(&token))
        .reply(&routes)
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response.body())["error"]["code"], "token_expired");

    server.stop().await;
    Ok(())
}

#[tokio::test]
async fn test_forged_token_is_rejected() -> TestResult<()> {
    let server = TestServer::start(config::test_config())?;
    let routes = server.server.routes();

    let mut other = server.server.config().auth.token.clone();
    other.secret_key = "some-other-secret".to_string();
    let token = sign_token(&other, 42, "s1", 300);

    let response = request()
        .method("GET")
        .path("/whoami")
        .header("Authentication", bearer(&token))
        .reply(&routes)
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response.body())["error"]["code"], "invalid_credential");

    server.stop().await;
    Ok(())
}

#[tokio::test]
async fn test_logged_out_session_is_rejected_at_authentication() -> TestResult<()> {
    let server = TestServer::start(config::test_config())?;
    let routes = server.server.routes();

    let response = request()
        .method("POST")
        .path("/internal/logout")
        .json(&serde_json::json!({ "session_ids": ["s1"] }))
        .reply(&routes)
        .await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert_eq!(json_body(response.body())["accepted"], 1);
    server.wait_for_sequence(2).await;

    let revoked = request()
        .method("GET")
        .path("/whoami")
        .header("Authentication", bearer(&server.token(42, "s1")))
        .reply(&routes)
        .await;
    assert_eq!(revoked.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(revoked.body())["error"]["code"], "invalid_session");

    // Same user, different session
    let other = request()
        .method("GET")
        .path("/whoami")
        .header("Authentication", bearer(&server.token(42, "s2")))
        .reply(&routes)
        .await;
    assert_eq!(other.status(), StatusCode::OK);

    server.stop().await;
    Ok(())
}

#[tokio::test]
async fn test_logout_aborts_in_flight_request() -> TestResult<()> {
    let server = TestServer::start(config::test_config())?;
    let routes = server.server.routes();
    let token = server.token(42, "s1");

    let watch = request()
        .method("GET")
        .path("/watch?seconds=60")
        .header("Authentication", bearer(&token))
        .reply(&routes);

    let logout = async {
        server.wait_for_watchers(1).await;
        request()
            .method("POST")
            .path("/internal/logout")
            .json(&serde_json::json!({ "session_ids": ["s1"] }))
            .reply(&routes)
            .await
    };

    let (watched, logged_out) = timeout(Duration::from_secs(5), async move { tokio::join!(watch, logout) })
        .await
        .expect("watch request was not aborted");

    assert_eq!(logged_out.status(), StatusCode::ACCEPTED);
    assert_eq!(watched.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(watched.body())["error"]["code"], "invalid_session");
    assert_eq!(server.server.metrics().sessions_revoked(), 1);

    server.stop().await;
    Ok(())
}

#[tokio::test]
async fn test_watch_completes_without_logout() -> TestResult<()> {
    let server = TestServer::start(config::test_config())?;
    let routes = server.server.routes();

    let response = request()
        .method("GET")
        .path("/watch?seconds=0")
        .header("Authentication", bearer(&server.token(42, "s1")))
        .reply(&routes)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response.body());
    assert_eq!(body["user_id"], 42);
    assert_eq!(body["completed"], true);

    server.stop().await;
    Ok(())
}

#[tokio::test]
async fn test_public_access_ignores_revocations() -> TestResult<()> {
    let server = TestServer::start(config::test_config())?;
    let routes = server.server.routes();

    request()
        .method("POST")
        .path("/internal/logout")
        .json(&serde_json::json!({ "session_ids": ["", "s1", "s2"] }))
        .reply(&routes)
        .await;
    server.wait_for_sequence(4).await;

    let response = request().method("GET").path("/whoami").reply(&routes).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response.body())["user_id"], 0);

    // A token for user 0 is public access too
    let anonymous = request()
        .method("GET")
        .path("/whoami")
        .header("Authentication", bearer(&server.token(0, "")))
        .reply(&routes)
        .await;
    assert_eq!(anonymous.status(), StatusCode::OK);
    assert_eq!(json_body(anonymous.body())["user_id"], 0);

    server.stop().await;
    Ok(())
}

#[tokio::test]
async fn test_fake_mode_authenticates_everyone_as_fake_user() -> TestResult<()> {
    let server = TestServer::start(config::fake_config())?;
    assert!(server.tasks.is_empty());
    let routes = server.server.routes();

    let anonymous = request().method("GET").path("/whoami").reply(&routes).await;
    assert_eq!(json_body(anonymous.body())["user_id"], 1);

    let garbage = request()
        .method("GET")
        .path("/whoami")
        .header("Authentication", "Bearer not-a-jwt")
        .reply(&routes)
        .await;
    assert_eq!(garbage.status(), StatusCode::OK);
    assert_eq!(json_body(garbage.body())["user_id"], 1);

    server.stop().await;
    Ok(())
}

#[tokio::test]
async fn test_malformed_logout_body_is_rejected() -> TestResult<()> {
    let server = TestServer::start(config::test_config())?;
    let routes = server.server.routes();

    let response = request()
        .method("POST")
        .path("/internal/logout")
        .header("Content-Type", "application/json")
        .body(r#"{"sessions": "s1"}"#)
        .reply(&routes)
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response.body())["error"]["code"], "validation_error");

    server.stop().await;
    Ok(())
}

#[tokio::test]
async fn test_unknown_route_is_json_not_found() -> TestResult<()> {
    let server = TestServer::start(config::test_config())?;
    let routes = server.server.routes();

    let response = request().method("GET").path("/nope").reply(&routes).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(response.body())["error"]["code"], "not_found");

    server.stop().await;
    Ok(())
}

#[tokio::test]
async fn test_metrics_endpoint_reports_revocations() -> TestResult<()> {
    let server = TestServer::start(config::test_config())?;
    let routes = server.server.routes();

    request()
        .method("POST")
        .path("/internal/logout")
        .json(&serde_json::json!({ "session_ids": ["s1", "s2"] }))
        .reply(&routes)
        .await;
    server.wait_for_sequence(3).await;

    let response = request().method("GET").path("/metrics").reply(&routes).await;
    assert_eq!(response.status(), StatusCode::OK);
    let text = String::from_utf8(response.body().to_vec())?;
    assert!(text.contains("revocations_published_total 2"));
    assert!(text.contains("active_session_watchers 0"));

    server.stop().await;
    Ok(())
}

#[tokio::test]
async fn test_long_lived_token_cannot_outlast_pruned_revocation() -> TestResult<()> {
    let server = TestServer::start(config::test_config())?;
    let routes = server.server.routes();
    let month = 30 * 24 * 3600;
    let token = sign_token(&server.server.config().auth.token, 42, "s1", month);

    request()
        .method("POST")
        .path("/internal/logout")
        .json(&serde_json::json!({ "session_ids": ["s1"] }))
        .reply(&routes)
        .await;
    server.wait_for_sequence(2).await;

    // Retention window elapsed: the logout is forgotten
    let log = server.server.authenticator().log();
    log.prune(tokio::time::Instant::now() + Duration::from_secs(1)).await;
    assert!(log.is_empty().await);

    let response = request()
        .method("GET")
        .path("/whoami")
        .header("Authentication", bearer(&token))
        .reply(&routes)
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response.body())["error"]["code"], "invalid_credential");

    server.stop().await;
    Ok(())
}
