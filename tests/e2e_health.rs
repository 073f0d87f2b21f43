//! E2E tests for health check and basic server functionality

mod common;

use common::{TestServer, location};

#[tokio::test]
async fn test_health_check() {
    let server = TestServer::new().await;
    let mut browser = server.browser();

    let response = browser.get("/health").await;

    assert_eq!(response.status(), 200);
    let body = response.text().await.unwrap();
    assert_eq!(body, "OK");
}

#[tokio::test]
async fn test_404_for_unknown_routes() {
    let server = TestServer::new().await;
    let mut browser = server.browser();

    let response = browser.get("/unknown/route").await;

    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn test_metrics_requires_login() {
    let server = TestServer::new().await;
    let mut browser = server.browser();

    let response = browser.get("/metrics").await;

    assert!(response.status().is_redirection());
    assert_eq!(location(&response), "/login");
}

#[tokio::test]
async fn test_metrics_after_sign_in() {
    let server = TestServer::new().await;
    let mut browser = server.browser();
    browser.sign_in().await;

    let response = browser.get("/metrics").await;

    assert_eq!(response.status(), 200);
    let body = response.text().await.unwrap();
    assert!(body.contains("hubgate_logins_total"));
    assert!(body.contains("hubgate_gate_redirects_total"));
}

#[tokio::test]
async fn test_metrics_record_logout_method() {
    let server = TestServer::new().await;
    let mut browser = server.browser();
    browser.sign_in().await;
    browser.post("/logout").await;
    browser.sign_in().await;

    let body = browser.get("/metrics").await.text().await.unwrap();

    assert!(body.lines().any(|line| {
        line.starts_with("hubgate_http_requests_total")
            && line.contains("endpoint=\"/logout\"")
            && line.contains("method=\"POST\"")
    }));
}
