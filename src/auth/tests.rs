//! Tests for the auth module

use super::*;
use crate::config::{Endpoints, GwtConfig};
use crate::error::Error;
use crate::http::{HttpClient, HttpClientConfig, HttpResponse};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use test_case::test_case;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LOGIN_PAGE: &str = r#"<html><body>
<form action="/login" method="post">
  <input type="hidden" name="anticsrf" value="csrf123">
  <input type="email" name="username">
</form>
</body></html>"#;

const VERSION_FAULT: &str = "//EX[2,1,[\"com.google.gwt.user.client.rpc.IncompatibleRemoteServiceException/3936916533\",\"This application is out of date, please click the refresh button on your browser.\"],0,7]";

fn authenticator(server: &MockServer) -> Authenticator {
    let transport = HttpClient::with_config(HttpClientConfig::builder().no_rate_limit().build())
        .unwrap();
    Authenticator::new(
        Arc::new(transport),
        Endpoints::new(server.uri()),
        GwtConfig::resolve_with(Some("PERM"), Some("HEAD"), |_| None),
    )
}

fn session() -> Session {
    let mut cookies = CookieJar::new();
    cookies.set("JSESSIONID", "abc");
    cookies.set(NONCE_COOKIE, "nonce456");
    Session::new(cookies, "csrf123".into(), 12345, "nonce456".into())
}

async fn mount_login_page(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/login/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(LOGIN_PAGE)
                .insert_header("set-cookie", "JSESSIONID=abc; Path=/; HttpOnly"),
        )
        .mount(server)
        .await;
}

async fn mount_credentials_accepted(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/login"))
        .and(body_string_contains("anticsrf=csrf123"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"success": true}))
                .insert_header("set-cookie", "sesnonce=nonce456; Path=/"),
        )
        .mount(server)
        .await;
}

async fn mount_authenticate(server: &MockServer, response: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(path("/cronometer/app"))
        .and(body_string_contains("|authenticate|"))
        .respond_with(response)
        .mount(server)
        .await;
}

// ============================================================================
// CSRF Extraction
// ============================================================================

#[test_case(r#"<input type="hidden" name="anticsrf" value="tok1">"# ; "double quotes")]
#[test_case(r#"<input type='hidden' name='anticsrf' value='tok1'>"# ; "single quotes")]
#[test_case(r#"<input value="tok1" type="hidden" name="anticsrf"/>"# ; "value before name")]
#[test_case(r#"<INPUT NAME=anticsrf VALUE=tok1>"# ; "unquoted uppercase")]
#[test_case("<input\n  name=\"anticsrf\"\n  value=\"tok1\"\n>" ; "multi line tag")]
fn test_extract_csrf_token(html: &str) {
    assert_eq!(extract_csrf_token(html), Some("tok1".to_string()));
}

#[test]
fn test_extract_csrf_token_ignores_other_inputs() {
    let html = r#"<input name="other" value="nope"><input name="anticsrf" value="yes">"#;
    assert_eq!(extract_csrf_token(html), Some("yes".to_string()));
}

#[test_case("<html>no form here</html>" ; "missing input")]
#[test_case(r#"<input name="anticsrf" value="">"# ; "empty value")]
#[test_case(r#"<input name="anticsrf2" value="tok">"# ; "similar name")]
fn test_extract_csrf_token_none(html: &str) {
    assert_eq!(extract_csrf_token(html), None);
}

// ============================================================================
// Cookies and Session
// ============================================================================

#[test]
fn test_cookie_jar_merge_replaces_values() {
    let mut jar = CookieJar::new();
    jar.set("a", "1");
    let response = HttpResponse::new(200, "")
        .with_header("Set-Cookie", "a=2; Path=/")
        .with_header("Set-Cookie", "b=3");
    jar.merge(&response);

    assert_eq!(jar.get("a"), Some("2"));
    assert_eq!(jar.get("b"), Some("3"));
    assert_eq!(jar.len(), 2);
}

#[test]
fn test_cookie_jar_merge_drops_deleted_cookies() {
    let mut jar = CookieJar::new();
    jar.set(NONCE_COOKIE, "n1");
    jar.set("JSESSIONID", "j1");
    jar.set("remember", "r1");
    let response = HttpResponse::new(200, "")
        .with_header("Set-Cookie", "sesnonce=; Max-Age=0; Path=/")
        .with_header("Set-Cookie", "remember=; Expires=Thu, 01 Jan 1970 00:00:00 GMT")
        .with_header("Set-Cookie", "gone=; Max-Age=0");
    jar.merge(&response);

    assert_eq!(jar.get(NONCE_COOKIE), None);
    assert_eq!(jar.get("remember"), None);
    assert_eq!(jar.get("gone"), None);
    let names: Vec<&str> = jar.iter().map(|(name, _)| name).collect();
    assert_eq!(names, vec!["JSESSIONID"]);
}

#[test]
fn test_session_debug_hides_secrets() {
    let debug = format!("{:?}", session());
    assert!(debug.contains("12345"));
    assert!(debug.contains("JSESSIONID"));
    assert!(!debug.contains("nonce456"));
    assert!(!debug.contains("csrf123"));
}

#[test]
fn test_session_invalidate() {
    let mut session = session();
    assert!(session.is_authenticated());

    session.invalidate();
    assert!(!session.is_authenticated());
    assert!(session.cookies().is_empty());
    assert_eq!(session.nonce(), "");
}

// ============================================================================
// Login
// ============================================================================

#[tokio::test]
async fn test_login_success() {
    let server = MockServer::start().await;
    mount_login_page(&server).await;

    Mock::given(method("POST"))
        .and(path("/login"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(header("cookie", "JSESSIONID=abc"))
        .and(body_string_contains("username=user%40example.com"))
        .and(body_string_contains("password=secret"))
        .and(body_string_contains("anticsrf=csrf123"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"success": true}))
                .insert_header("set-cookie", "sesnonce=nonce456; Path=/"),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/cronometer/app"))
        .and(header("x-gwt-permutation", "PERM"))
        .and(header("cookie", "JSESSIONID=abc; sesnonce=nonce456"))
        .and(body_string_contains("|HEAD|"))
        .respond_with(ResponseTemplate::new(200).set_body_string("//OK[12345,2,1,[\"x\"],0,7]"))
        .expect(1)
        .mount(&server)
        .await;

    let session = authenticator(&server)
        .login("user@example.com", "secret")
        .await
        .unwrap();

    assert!(session.is_authenticated());
    assert_eq!(session.user_id(), 12345);
    assert_eq!(session.nonce(), "nonce456");
    assert_eq!(session.csrf_token(), "csrf123");
    assert_eq!(session.cookies().get("JSESSIONID"), Some("abc"));
}

#[tokio::test]
async fn test_login_wrong_credentials() {
    let server = MockServer::start().await;
    mount_login_page(&server).await;

    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            serde_json::json!({"success": false, "error": "Invalid email or password"}),
        ))
        .mount(&server)
        .await;

    let err = authenticator(&server)
        .login("user@example.com", "wrong")
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Auth { .. }));
    assert!(err.to_string().contains("Login failed: Invalid email or password"));
}

#[tokio::test]
async fn test_login_rejected_status_is_auth_error() {
    let server = MockServer::start().await;
    mount_login_page(&server).await;

    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let err = authenticator(&server)
        .login("user@example.com", "wrong")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Auth { .. }));
}

#[tokio::test]
async fn test_login_missing_csrf_token() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/login/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let err = authenticator(&server)
        .login("user@example.com", "secret")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Protocol { .. }));
}

#[tokio::test]
async fn test_login_non_json_response_is_auth_error() {
    let server = MockServer::start().await;
    mount_login_page(&server).await;

    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let err = authenticator(&server)
        .login("user@example.com", "secret")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Auth { .. }));
    assert!(err.to_string().contains("not JSON"));
}

#[tokio::test]
async fn test_login_page_server_error_is_auth_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/login/"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = authenticator(&server)
        .login("user@example.com", "secret")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Auth { .. }));
    assert!(err.to_string().contains("status 503"));
}

#[tokio::test]
async fn test_login_credentials_server_error_is_auth_error() {
    let server = MockServer::start().await;
    mount_login_page(&server).await;

    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let err = authenticator(&server)
        .login("user@example.com", "secret")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Auth { .. }));
    assert!(err.to_string().contains("status 500: boom"));
}

#[tokio::test]
async fn test_login_without_nonce_cookie() {
    let server = MockServer::start().await;
    mount_login_page(&server).await;

    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"success": true})))
        .mount(&server)
        .await;

    let err = authenticator(&server)
        .login("user@example.com", "secret")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Auth { .. }));
}

#[tokio::test]
async fn test_login_with_outdated_gwt_values() {
    let server = MockServer::start().await;
    mount_login_page(&server).await;
    mount_credentials_accepted(&server).await;
    mount_authenticate(&server, ResponseTemplate::new(500).set_body_string(VERSION_FAULT)).await;

    let err = authenticator(&server)
        .login("user@example.com", "secret")
        .await
        .unwrap_err();

    assert!(matches!(err, Error::GwtVersion { .. }));
    assert!(!err.is_auth());
}

#[tokio::test]
async fn test_login_ok_without_user_id() {
    let server = MockServer::start().await;
    mount_login_page(&server).await;
    mount_credentials_accepted(&server).await;
    mount_authenticate(&server, ResponseTemplate::new(200).set_body_string("//OK[\"odd\"]")).await;

    let err = authenticator(&server)
        .login("user@example.com", "secret")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::GwtVersion { .. }));
}

#[tokio::test]
async fn test_login_other_fault_is_protocol_error() {
    let server = MockServer::start().await;
    mount_login_page(&server).await;
    mount_credentials_accepted(&server).await;
    mount_authenticate(
        &server,
        ResponseTemplate::new(500)
            .set_body_string("//EX[2,1,[\"com.cronometer.shared.rpc.SomethingBroke/1\",\"x\"],0,7]"),
    )
    .await;

    let err = authenticator(&server)
        .login("user@example.com", "secret")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Protocol { .. }));
}

#[tokio::test]
async fn test_login_authenticate_error_page_is_auth_error() {
    let server = MockServer::start().await;
    mount_login_page(&server).await;
    mount_credentials_accepted(&server).await;
    mount_authenticate(
        &server,
        ResponseTemplate::new(500).set_body_string("<html>error</html>"),
    )
    .await;

    let err = authenticator(&server)
        .login("user@example.com", "secret")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Auth { .. }));
    assert!(err.to_string().contains("authenticate failed with status 500"));
}

#[tokio::test]
async fn test_login_authenticate_non_gwt_body_is_auth_error() {
    let server = MockServer::start().await;
    mount_login_page(&server).await;
    mount_credentials_accepted(&server).await;
    mount_authenticate(&server, ResponseTemplate::new(200).set_body_string("<html></html>")).await;

    let err = authenticator(&server)
        .login("user@example.com", "secret")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Auth { .. }));
}

#[tokio::test]
async fn test_login_authenticate_redirect_is_auth_error() {
    let server = MockServer::start().await;
    mount_login_page(&server).await;
    mount_credentials_accepted(&server).await;
    mount_authenticate(
        &server,
        ResponseTemplate::new(302).insert_header("location", "/login/"),
    )
    .await;

    let err = authenticator(&server)
        .login("user@example.com", "secret")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Auth { .. }));
}

// ============================================================================
// Export Token / Logout
// ============================================================================

#[tokio::test]
async fn test_export_token() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/cronometer/app"))
        .and(body_string_contains("|generateAuthorizationToken|"))
        .and(body_string_contains("|nonce456|"))
        .and(body_string_contains("|12345|3600|"))
        .respond_with(ResponseTemplate::new(200).set_body_string("//OK[\"tok-789\"]"))
        .expect(1)
        .mount(&server)
        .await;

    let token = authenticator(&server)
        .export_token(&session())
        .await
        .unwrap();
    assert_eq!(token, "tok-789");
}

#[tokio::test]
async fn test_export_token_on_expired_session() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/cronometer/app"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = authenticator(&server)
        .export_token(&session())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::SessionExpired { .. }));
}

#[tokio::test]
async fn test_export_token_redirect_to_login_is_session_expired() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/cronometer/app"))
        .respond_with(
            ResponseTemplate::new(302).insert_header("location", "https://cronometer.com/login/"),
        )
        .mount(&server)
        .await;

    let err = authenticator(&server)
        .export_token(&session())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::SessionExpired { .. }));
    assert!(err.to_string().contains("redirected to https://cronometer.com/login/"));
}

#[tokio::test]
async fn test_export_token_error_page_is_protocol_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/cronometer/app"))
        .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
        .mount(&server)
        .await;

    let err = authenticator(&server)
        .export_token(&session())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Protocol { .. }));
    assert!(err.to_string().contains("status 502: Bad Gateway"));
}

#[tokio::test]
async fn test_export_token_requires_login() {
    let server = MockServer::start().await;
    let mut session = session();
    session.invalidate();

    let err = authenticator(&server)
        .export_token(&session)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Auth { .. }));
}

#[tokio::test]
async fn test_logout() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/cronometer/app"))
        .and(body_string_contains("|logout|"))
        .respond_with(ResponseTemplate::new(200).set_body_string("//OK[0,[],0,7]"))
        .expect(1)
        .mount(&server)
        .await;

    authenticator(&server).logout(&session()).await.unwrap();
}
