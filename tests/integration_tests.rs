//! Integration tests using mock HTTP server
//!
//! Tests the full end-to-end flow: login handshake → windowed export → typed records

use async_trait::async_trait;
use chrono::NaiveDate;
use cronometer_export::http::{HttpClientConfig, HttpRequest, HttpResponse, Transport};
use cronometer_export::{
    ClientConfig, CronometerClient, Error, ExportKind, GwtConfig, Note, Record, Result,
};
use pretty_assertions::assert_eq;
use std::sync::{Arc, Mutex};
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LOGIN_PAGE: &str = r#"<form><input type="hidden" name="anticsrf" value="csrf-abc"></form>"#;

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn client_for(server: &MockServer, max_span_days: Option<u32>) -> CronometerClient {
    let config = ClientConfig::builder()
        .base_url(server.uri())
        .gwt(GwtConfig::resolve_with(Some("PERM"), Some("HEAD"), |_| None))
        .max_span_days(max_span_days)
        .http(HttpClientConfig::builder().no_rate_limit().build())
        .build();
    CronometerClient::with_config(config).unwrap()
}

async fn mount_login(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/login/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(LOGIN_PAGE)
                .insert_header("set-cookie", "JSESSIONID=j1; Path=/"),
        )
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"{"success":true}"#)
                .insert_header("set-cookie", "sesnonce=n1; Path=/"),
        )
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/cronometer/app"))
        .and(body_string_contains("|authenticate|"))
        .respond_with(ResponseTemplate::new(200).set_body_string("//OK[777,2,1,[\"x\"],0,7]"))
        .mount(server)
        .await;
}

async fn mount_token(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/cronometer/app"))
        .and(body_string_contains("|generateAuthorizationToken|"))
        .respond_with(ResponseTemplate::new(200).set_body_string("//OK[\"export-token\"]"))
        .mount(server)
        .await;
}

// ============================================================================
// End-to-end Flow
// ============================================================================

#[tokio::test]
async fn test_login_and_fetch_windowed_servings() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    mount_token(&server).await;

    Mock::given(method("GET"))
        .and(path("/export"))
        .and(query_param("nonce", "export-token"))
        .and(query_param("generate", "servings"))
        .and(query_param("start", "2024-01-01"))
        .and(query_param("end", "2024-01-31"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "Day,Time,Food Name,Amount,Energy (kcal)\n\
             2024-01-15,08:30,Oatmeal,1 cup,150\n\
             2024-01-15,12:45,Brown Rice,1 cup,216\n",
        ))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/export"))
        .and(query_param("start", "2024-02-01"))
        .and(query_param("end", "2024-03-02"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "Day,Time,Food Name,Amount,Energy (kcal)\n\
             2024-02-10,19:10,Salmon,6 oz,354\n",
        ))
        .expect(1)
        .mount(&server)
        .await;

    let mut client = client_for(&server, Some(31));
    assert!(!client.is_authenticated());

    client.login("user@example.com", "secret").await.unwrap();
    assert!(client.is_authenticated());
    assert_eq!(client.session().unwrap().user_id(), 777);

    let servings = client
        .get_servings(day(2024, 1, 1), day(2024, 3, 2))
        .await
        .unwrap();

    let names: Vec<&str> = servings.iter().map(|s| s.food_name.as_str()).collect();
    assert_eq!(names, vec!["Oatmeal", "Brown Rice", "Salmon"]);
    assert_eq!(servings[2].calories, 354.0);
    assert_eq!(servings[2].serving_size, "6 oz");
}

#[tokio::test]
async fn test_export_raw_and_generic_export() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    mount_token(&server).await;

    let body = "Day,Time,Note\n2024-01-15,08:00,\"BM: Type 4\"\n";
    Mock::given(method("GET"))
        .and(path("/export"))
        .and(query_param("generate", "notes"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&server)
        .await;

    let mut client = client_for(&server, None);
    client.login("user@example.com", "secret").await.unwrap();

    let raw = client
        .get_notes_raw(day(2024, 1, 15), day(2024, 1, 15))
        .await
        .unwrap();
    assert_eq!(raw, body);

    let notes: Vec<Note> = client
        .export(day(2024, 1, 15), day(2024, 1, 15))
        .await
        .unwrap();
    assert_eq!(notes[0].content, "BM: Type 4");

    let records = cronometer_export::parse(&raw, ExportKind::Notes).unwrap();
    assert!(matches!(&records[0], Record::Note(note) if note.content == "BM: Type 4"));
}

// ============================================================================
// Session Handling
// ============================================================================

#[tokio::test]
async fn test_export_before_login_is_auth_error() {
    let server = MockServer::start().await;
    let mut client = client_for(&server, None);

    let err = client
        .get_biometrics(day(2024, 1, 1), day(2024, 1, 7))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Auth { .. }));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_invalid_range_is_rejected_before_any_request() {
    let server = MockServer::start().await;
    let mut client = client_for(&server, None);

    let err = client
        .get_exercises_raw(day(2024, 2, 1), day(2024, 1, 1))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::InvalidDateRange { .. }));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_expired_session_is_invalidated() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    mount_token(&server).await;

    Mock::given(method("GET"))
        .and(path("/export"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", "https://cronometer.com/login/"))
        .mount(&server)
        .await;

    let mut client = client_for(&server, None);
    client.login("user@example.com", "secret").await.unwrap();

    let err = client
        .get_daily_nutrition(day(2024, 1, 1), day(2024, 1, 7))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::SessionExpired { .. }));
    assert!(err.is_auth());
    assert!(!client.is_authenticated());

    let err = client
        .get_daily_nutrition(day(2024, 1, 1), day(2024, 1, 7))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Auth { .. }));
}

/// First login answers with `first`, every later one with `second`
async fn mount_two_logins(server: &MockServer, first: (&str, i64), second: (&str, i64)) {
    Mock::given(method("GET"))
        .and(path("/login/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(LOGIN_PAGE)
                .insert_header("set-cookie", "JSESSIONID=j1; Path=/"),
        )
        .mount(server)
        .await;

    for (nonce, user_id, times) in [(first.0, first.1, Some(1)), (second.0, second.1, None)] {
        let credentials = Mock::given(method("POST")).and(path("/login")).respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"{"success":true}"#)
                .insert_header("set-cookie", format!("sesnonce={nonce}; Path=/").as_str()),
        );
        let authenticate = Mock::given(method("POST"))
            .and(path("/cronometer/app"))
            .and(body_string_contains("|authenticate|"))
            .and(header("cookie", format!("JSESSIONID=j1; sesnonce={nonce}").as_str()))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(format!("//OK[{user_id},0,7]")),
            );
        match times {
            Some(n) => {
                credentials.up_to_n_times(n).mount(server).await;
                authenticate.up_to_n_times(n).mount(server).await;
            }
            None => {
                credentials.mount(server).await;
                authenticate.mount(server).await;
            }
        }
    }
}

#[tokio::test]
async fn test_login_again_replaces_session() {
    let server = MockServer::start().await;
    mount_two_logins(&server, ("n1", 777), ("n2", 888)).await;

    let mut client = client_for(&server, None);
    client.login("first@example.com", "secret").await.unwrap();
    assert_eq!(client.session().unwrap().user_id(), 777);
    assert_eq!(client.session().unwrap().nonce(), "n1");

    client.login("second@example.com", "secret").await.unwrap();
    let session = client.session().unwrap();
    assert!(session.is_authenticated());
    assert_eq!(session.user_id(), 888);
    assert_eq!(session.nonce(), "n2");
    assert_eq!(session.cookies().get("sesnonce"), Some("n2"));
}

#[tokio::test]
async fn test_failed_login_again_leaves_client_logged_out() {
    let server = MockServer::start().await;
    mount_login(&server).await;

    let mut client = client_for(&server, None);
    client.login("user@example.com", "secret").await.unwrap();
    assert!(client.is_authenticated());

    server.reset().await;
    Mock::given(method("GET"))
        .and(path("/login/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(LOGIN_PAGE))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"{"success":false,"error":"Invalid email or password"}"#),
        )
        .mount(&server)
        .await;

    let err = client.login("user@example.com", "wrong").await.unwrap_err();
    assert!(matches!(err, Error::Auth { .. }));
    assert!(!client.is_authenticated());
    assert!(client.session().is_none());

    let err = client
        .get_notes(day(2024, 1, 1), day(2024, 1, 7))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Auth { .. }));
}

#[tokio::test]
async fn test_token_redirect_to_login_invalidates_session() {
    let server = MockServer::start().await;
    mount_login(&server).await;

    Mock::given(method("POST"))
        .and(path("/cronometer/app"))
        .and(body_string_contains("|generateAuthorizationToken|"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", "/login/"))
        .mount(&server)
        .await;

    let mut client = client_for(&server, None);
    client.login("user@example.com", "secret").await.unwrap();

    let err = client
        .get_servings(day(2024, 1, 1), day(2024, 1, 7))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::SessionExpired { .. }));
    assert!(!client.is_authenticated());
}

#[tokio::test]
async fn test_rate_limited_export_names_kind_and_range() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    mount_token(&server).await;

    Mock::given(method("GET"))
        .and(path("/export"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let mut client = client_for(&server, None);
    client.login("user@example.com", "secret").await.unwrap();

    let err = client
        .get_servings(day(2024, 1, 1), day(2024, 1, 31))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        Error::Export {
            kind: ExportKind::Servings,
            range: Some(_),
            ..
        }
    ));
    assert!(err
        .to_string()
        .contains("servings for 2024-01-01 to 2024-01-31"));
    assert!(client.is_authenticated());
}

#[tokio::test]
async fn test_outdated_gwt_values_fail_login() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/login/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(LOGIN_PAGE))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"{"success":true}"#)
                .insert_header("set-cookie", "sesnonce=n1"),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/cronometer/app"))
        .respond_with(ResponseTemplate::new(500).set_body_string(
            "//EX[2,1,[\"com.google.gwt.user.client.rpc.IncompatibleRemoteServiceException/3936916533\",\"This application is out of date\"],0,7]",
        ))
        .mount(&server)
        .await;

    let mut client = client_for(&server, None);
    let err = client.login("user@example.com", "secret").await.unwrap_err();

    assert!(matches!(err, Error::GwtVersion { .. }));
    assert!(!client.is_authenticated());
}

#[tokio::test]
async fn test_logout_drops_session_even_when_rpc_fails() {
    let server = MockServer::start().await;
    mount_login(&server).await;

    Mock::given(method("POST"))
        .and(path("/cronometer/app"))
        .and(body_string_contains("|logout|"))
        .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
        .mount(&server)
        .await;

    let mut client = client_for(&server, None);
    client.login("user@example.com", "secret").await.unwrap();

    let result = client.logout().await;
    assert!(result.is_err());
    assert!(!client.is_authenticated());
    assert!(client.session().is_none());

    // nothing left to log out
    client.logout().await.unwrap();
}

// ============================================================================
// Custom Transport
// ============================================================================

/// Answers from a fixed table and records every request
#[derive(Default)]
struct ScriptedTransport {
    requests: Mutex<Vec<HttpRequest>>,
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let response = if request.url.ends_with("/login/") {
            HttpResponse::new(200, LOGIN_PAGE)
        } else if request.url.ends_with("/login") {
            HttpResponse::new(200, r#"{"success":true}"#).with_header("Set-Cookie", "sesnonce=n1")
        } else if request.url.ends_with("/cronometer/app") {
            let body = request.body.clone().unwrap_or_default();
            if body.contains("|authenticate|") {
                HttpResponse::new(200, "//OK[42,0,7]")
            } else {
                HttpResponse::new(200, "//OK[\"tok\"]")
            }
        } else {
            HttpResponse::new(200, "Day,Metric,Unit,Amount\n2024-01-15,Weight,lb,175.5\n")
        };

        self.requests.lock().unwrap().push(request);
        Ok(response)
    }
}

#[tokio::test]
async fn test_client_over_custom_transport() {
    let transport = Arc::new(ScriptedTransport::default());
    let config = ClientConfig::builder()
        .base_url("https://cronometer.test")
        .gwt(GwtConfig::resolve_with(None, None, |_| None))
        .build();
    let mut client = CronometerClient::with_transport(config, transport.clone()).unwrap();

    client.login("user@example.com", "secret").await.unwrap();
    let entries = client
        .get_biometrics(day(2024, 1, 15), day(2024, 1, 15))
        .await
        .unwrap();

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].metric, "Weight");
    assert_eq!(entries[0].value, 175.5);

    let requests = transport.requests.lock().unwrap();
    let urls: Vec<&str> = requests.iter().map(|r| r.url.as_str()).collect();
    assert_eq!(
        urls,
        vec![
            "https://cronometer.test/login/",
            "https://cronometer.test/login",
            "https://cronometer.test/cronometer/app",
            "https://cronometer.test/cronometer/app",
            "https://cronometer.test/export",
        ]
    );

    let export = &requests[4];
    assert!(export
        .query
        .contains(&("generate".to_string(), "biometrics".to_string())));
    assert!(export
        .cookies
        .contains(&("sesnonce".to_string(), "n1".to_string())));
}
