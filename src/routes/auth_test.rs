use super::*;
use crate::clock::Clock;
use crate::routes::test_client::TestBrowser;
use crate::services::session::SESSION_COOKIE_NAME;
use crate::state::test_helpers::test_app_state;
use serde_json::json;

const TARO: &str = "taro@example.com";
const TARO_UID: &str = "dev-taro-example-com";

async fn registered(state: &AppState) -> TestBrowser {
    let mut browser = TestBrowser::new(state.clone());
    let res = browser.post("/api/auth/google/register", json!({ "credential": TARO })).await;
    assert_eq!(res.status, StatusCode::OK);
    browser
}

// =============================================================================
// register / login
// =============================================================================

#[tokio::test]
async fn register_returns_profile_and_sets_cookies() {
    let (state, _) = test_app_state();
    let mut browser = TestBrowser::new(state.clone());

    let res = browser.post("/api/auth/google/register", json!({ "credential": TARO })).await;
    assert_eq!(res.status, StatusCode::OK);
    let profile = res.json();
    assert_eq!(profile["uid"], TARO_UID);
    assert_eq!(profile["gmail"], TARO);
    assert_eq!(profile["year"], 2025);
    assert_eq!(profile["isAdmin"], false);

    let provider_cookie = res.set_cookie(PROVIDER_COOKIE_NAME).unwrap();
    assert!(provider_cookie.contains("HttpOnly"));
    assert!(provider_cookie.contains("SameSite=Lax"));
    let session_cookie = res.set_cookie(SESSION_COOKIE_NAME).unwrap();
    assert!(!session_cookie.contains("HttpOnly"));
    assert!(session_cookie.contains("Max-Age=1800"));
    assert!(session_cookie.contains("%22uid%22"));
    assert_eq!(state.providers.session_count().await, 1);
}

#[tokio::test]
async fn state_reflects_signed_in_browser() {
    let (state, _) = test_app_state();
    let mut browser = registered(&state).await;

    let body = browser.get("/api/auth/state").await.json();
    assert_eq!(body["identity"]["uid"], TARO_UID);
    assert_eq!(body["profile"]["gmail"], TARO);
    assert_eq!(body["loading"], false);
    assert_eq!(body["sessionExpired"], false);
}

#[tokio::test]
async fn state_for_new_browser_is_signed_out() {
    let (state, _) = test_app_state();
    let mut browser = TestBrowser::new(state.clone());

    let body = browser.get("/api/auth/state").await.json();
    assert!(body["identity"].is_null());
    assert!(body["profile"].is_null());
    assert_eq!(body["loading"], false);
    assert_eq!(state.providers.session_count().await, 0);
}

#[tokio::test]
async fn login_after_logout_signs_back_in() {
    let (state, _) = test_app_state();
    let mut browser = registered(&state).await;
    assert_eq!(browser.post("/api/auth/logout", json!({})).await.status, StatusCode::NO_CONTENT);

    let res = browser.post("/api/auth/google/login", json!({ "credential": TARO })).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.json()["uid"], TARO_UID);
    assert_eq!(browser.get("/api/auth/state").await.json()["identity"]["uid"], TARO_UID);
}

#[tokio::test]
async fn login_unregistered_is_404_and_signed_out() {
    let (state, _) = test_app_state();
    let mut browser = TestBrowser::new(state.clone());

    let res = browser.post("/api/auth/google/login", json!({ "credential": "new@example.com" })).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert!(res.json()["error"].as_str().unwrap().contains("新規登録タブ"));

    let body = browser.get("/api/auth/state").await.json();
    assert!(body["identity"].is_null());
    assert!(!browser.has_cookie(SESSION_COOKIE_NAME));
}

#[tokio::test]
async fn register_existing_account_is_409() {
    let (state, _) = test_app_state();
    registered(&state).await;

    let mut other = TestBrowser::new(state.clone());
    let res = other.post("/api/auth/google/register", json!({ "credential": TARO })).await;
    assert_eq!(res.status, StatusCode::CONFLICT);
    assert!(res.json()["error"].as_str().unwrap().contains("ログインタブ"));
    assert!(other.get("/api/auth/state").await.json()["identity"].is_null());
}

#[tokio::test]
async fn bad_credentials_are_401() {
    let (state, _) = test_app_state();
    let mut browser = TestBrowser::new(state);

    let res = browser.post("/api/auth/google/login", json!({ "credential": "not-an-email" })).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert!(res.json()["error"].as_str().unwrap().starts_with("ログインに失敗"));

    let res = browser.post("/api/auth/google/register", json!({})).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert!(res.json()["error"].as_str().unwrap().starts_with("新規登録に失敗"));
}

#[tokio::test]
async fn failed_anonymous_sign_ins_leave_no_provider_sessions() {
    let (state, _) = test_app_state();
    for _ in 0..10 {
        let mut browser = TestBrowser::new(state.clone());
        let res = browser.post("/api/auth/google/login", json!({ "credential": "garbage" })).await;
        assert_eq!(res.status, StatusCode::UNAUTHORIZED);
        assert!(!browser.has_cookie(PROVIDER_COOKIE_NAME));
    }
    let mut browser = TestBrowser::new(state.clone());
    let res = browser.post("/api/auth/google/login", json!({ "credential": "new@example.com" })).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(state.providers.session_count().await, 0);
}

#[tokio::test]
async fn failed_sign_in_keeps_existing_provider_session() {
    let (state, _) = test_app_state();
    let mut browser = registered(&state).await;

    let res = browser.post("/api/auth/google/login", json!({ "credential": "garbage" })).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert!(browser.has_cookie(PROVIDER_COOKIE_NAME));
    assert_eq!(state.providers.session_count().await, 1);
    assert_eq!(browser.get("/api/auth/state").await.json()["identity"]["uid"], TARO_UID);
}

#[tokio::test]
async fn failed_sign_in_clears_leftover_session_cookie() {
    let (state, clock) = test_app_state();
    let mut browser = TestBrowser::new(state);
    let now = clock.now_millis();
    browser.set_cookie(SESSION_COOKIE_NAME, &format!(r#"{{"uid":"someone-else","timestamp":{now}}}"#));

    let res = browser.post("/api/auth/google/login", json!({ "credential": "new@example.com" })).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert!(res.set_cookie(SESSION_COOKIE_NAME).unwrap().contains("Max-Age=0"));
    assert!(!browser.has_cookie(SESSION_COOKIE_NAME));
}

// =============================================================================
// logout
// =============================================================================

#[tokio::test]
async fn logout_clears_cookies_and_provider_session() {
    let (state, _) = test_app_state();
    let mut browser = registered(&state).await;

    let res = browser.post("/api/auth/logout", json!({})).await;
    assert_eq!(res.status, StatusCode::NO_CONTENT);
    assert!(res.set_cookie(SESSION_COOKIE_NAME).unwrap().contains("Max-Age=0"));
    assert!(!browser.has_cookie(SESSION_COOKIE_NAME));
    assert!(!browser.has_cookie(PROVIDER_COOKIE_NAME));
    assert_eq!(state.providers.session_count().await, 0);

    assert!(browser.get("/api/auth/state").await.json()["identity"].is_null());
}

#[tokio::test]
async fn logout_without_session_is_harmless() {
    let (state, _) = test_app_state();
    let mut browser = TestBrowser::new(state);
    assert_eq!(browser.post("/api/auth/logout", json!({})).await.status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn unknown_provider_token_is_dropped() {
    let (state, _) = test_app_state();
    let mut browser = TestBrowser::new(state);
    browser.set_cookie(PROVIDER_COOKIE_NAME, "stale-token");

    let body = browser.get("/api/auth/state").await.json();
    assert!(body["identity"].is_null());
    assert!(!browser.has_cookie(PROVIDER_COOKIE_NAME));
}

// =============================================================================
// session status
// =============================================================================

#[tokio::test]
async fn session_status_without_session_is_204() {
    let (state, _) = test_app_state();
    let mut browser = TestBrowser::new(state);
    assert_eq!(browser.get("/api/auth/session").await.status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn session_status_counts_down() {
    let (state, clock) = test_app_state();
    let mut browser = registered(&state).await;

    let body = browser.get("/api/auth/session").await.json();
    assert_eq!(body["remainingMs"], 30 * 60 * 1000);
    assert_eq!(body["formatted"], "0:30:00");
    assert_eq!(body["expiringSoon"], false);

    clock.advance(time::Duration::minutes(27));
    let body = browser.get("/api/auth/session").await.json();
    assert_eq!(body["formatted"], "0:03:00");
    assert_eq!(body["expiringSoon"], true);
}

#[tokio::test]
async fn session_status_after_expiry_is_204_and_clears_cookie() {
    let (state, clock) = test_app_state();
    let mut browser = registered(&state).await;

    clock.advance(time::Duration::minutes(31));
    let res = browser.get("/api/auth/session").await;
    assert_eq!(res.status, StatusCode::NO_CONTENT);
    assert!(!browser.has_cookie(SESSION_COOKIE_NAME));
}
