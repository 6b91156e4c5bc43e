#![allow(clippy::unwrap_used)]
// Integration tests for `PlatformClient` using wiremock.

use secrecy::SecretString;
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_json, body_string, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use alarmist_api::{
    AlarmQuery, AlarmSeverity, AlarmStatus, AuthStrategy, Credentials, Error, LoginOption,
    LoginOptionType, PlatformClient, SessionCookie, SessionCookies, select_login_option,
};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, PlatformClient) {
    let server = MockServer::start().await;
    let base_url = Url::parse(&format!("{}/", server.uri())).unwrap();
    let client = PlatformClient::with_client(reqwest::Client::new(), base_url);
    (server, client)
}

fn credentials(server: &MockServer) -> Credentials {
    Credentials::new("jane", server.uri(), SecretString::from("s3cret"))
}

fn oauth_option(server: &MockServer) -> LoginOption {
    LoginOption {
        option_type: LoginOptionType::OAuth2Internal,
        init_request: Some(format!("{}/tenant/oauth?tenant_id=t100", server.uri())),
        user_management_source: Some("INTERNAL".into()),
        visible_on_login_page: true,
        id: Some("oauth2-internal".into()),
    }
}

fn alarm_json(id: &str, severity: &str) -> serde_json::Value {
    json!({
        "id": id,
        "type": "c8y_TestAlarm",
        "text": format!("alarm {id}"),
        "severity": severity,
        "status": "ACTIVE",
        "time": "2024-06-15T10:30:00.000Z",
        "source": { "id": "42", "name": "Pump 7" }
    })
}

// ── Login option tests ──────────────────────────────────────────────

#[tokio::test]
async fn test_login_options_keep_internal_only() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/tenant/loginOptions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "loginOptions": [
                {
                    "type": "OAUTH2",
                    "userManagementSource": "REMOTE",
                    "visibleOnLoginPage": true,
                    "initRequest": "https://sso.example.com/authorize"
                },
                {
                    "type": "OAUTH2_INTERNAL",
                    "userManagementSource": "INTERNAL",
                    "visibleOnLoginPage": true,
                    "initRequest": "https://t100.example.com/tenant/oauth?tenant_id=t100"
                },
                {
                    "type": "BASIC",
                    "userManagementSource": "INTERNAL",
                    "visibleOnLoginPage": false
                }
            ]
        })))
        .mount(&server)
        .await;

    let options = client.login_options().await.unwrap();

    assert_eq!(options.len(), 2);
    assert!(options.iter().all(LoginOption::is_internal));
    let chosen = select_login_option(&options).unwrap();
    assert_eq!(chosen.option_type, LoginOptionType::OAuth2Internal);
}

// ── Credentials exchange tests ──────────────────────────────────────

#[tokio::test]
async fn test_oauth_login_reads_session_cookies() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/tenant/oauth"))
        .and(query_param("tenant_id", "t100"))
        .and(header(
            "content-type",
            "application/x-www-form-urlencoded;charset=UTF-8",
        ))
        .and(header("usexbasic", "true"))
        .and(body_string(
            "grant_type=PASSWORD&username=jane&password=s3cret",
        ))
        .respond_with(
            ResponseTemplate::new(200)
                .append_header(
                    "set-cookie",
                    "authorization=eyJhbGciOi.token; Path=/; Max-Age=3600; HttpOnly",
                )
                .append_header("set-cookie", "XSRF-TOKEN=xsrf-123; Path=/")
                .append_header("set-cookie", "unrelated=1; Path=/"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let session = client
        .oauth_login(&credentials(&server), &oauth_option(&server))
        .await
        .unwrap();

    assert_eq!(session.authorization.value, "eyJhbGciOi.token");
    assert!(session.authorization.expires.is_some());
    assert_eq!(session.xsrf_token.value, "xsrf-123");
    assert!(session.xsrf_token.expires.is_none());
}

#[tokio::test]
async fn test_oauth_login_sends_tfa_code() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/tenant/oauth"))
        .and(body_string(
            "grant_type=PASSWORD&username=jane&password=s3cret&tfa_code=424242",
        ))
        .respond_with(
            ResponseTemplate::new(200)
                .append_header("set-cookie", "authorization=a; Path=/")
                .append_header("set-cookie", "XSRF-TOKEN=x; Path=/"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let creds = credentials(&server).with_otp(SecretString::from("424242"));
    client
        .oauth_login(&creds, &oauth_option(&server))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_oauth_login_missing_xsrf_cookie_fails() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/tenant/oauth"))
        .respond_with(
            ResponseTemplate::new(200).append_header("set-cookie", "authorization=a; Path=/"),
        )
        .mount(&server)
        .await;

    let result = client
        .oauth_login(&credentials(&server), &oauth_option(&server))
        .await;

    match result {
        Err(Error::LoginFailed { ref message }) => {
            assert!(message.contains("XSRF-TOKEN"), "got: {message}");
        }
        other => panic!("expected LoginFailed, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_oauth_login_rejected_credentials() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/tenant/oauth"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": "security/Unauthorized",
            "message": "Invalid credentials!"
        })))
        .mount(&server)
        .await;

    let result = client
        .oauth_login(&credentials(&server), &oauth_option(&server))
        .await;

    assert!(
        matches!(result, Err(Error::LoginFailed { .. })),
        "expected LoginFailed, got: {result:?}"
    );
    assert!(result.unwrap_err().is_login_failure());
}

// ── Decoration tests ────────────────────────────────────────────────

#[tokio::test]
async fn test_basic_decoration_on_current_user() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/user/currentUser"))
        .and(header("authorization", "Basic amFuZTpzM2NyZXQ="))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "jane",
            "userName": "jane",
            "email": "jane@example.com"
        })))
        .expect(1)
        .mount(&server)
        .await;

    client
        .apply_auth(AuthStrategy::Basic, &credentials(&server))
        .unwrap();
    let user = client.current_user().await.unwrap();

    assert_eq!(user.id, "jane");
    assert_eq!(client.auth_strategy(), Some(AuthStrategy::Basic));
}

#[tokio::test]
async fn test_cookie_decoration_on_requests() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/alarm/alarms/7"))
        .and(header("cookie", "authorization=tok-a; XSRF-TOKEN=tok-x"))
        .and(header("x-xsrf-token", "tok-x"))
        .and(header("usexbasic", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(alarm_json("7", "MAJOR")))
        .expect(1)
        .mount(&server)
        .await;

    let mut creds = credentials(&server);
    creds.session = Some(SessionCookies {
        authorization: SessionCookie::new("authorization", "tok-a"),
        xsrf_token: SessionCookie::new("XSRF-TOKEN", "tok-x"),
    });
    client
        .apply_auth(AuthStrategy::OAuthInternal, &creds)
        .unwrap();

    let alarm = client.get_alarm("7").await.unwrap();
    assert_eq!(alarm.severity, AlarmSeverity::Major);
}

#[tokio::test]
async fn test_cleared_decoration_sends_no_credentials() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/user/currentUser"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    client
        .apply_auth(AuthStrategy::Basic, &credentials(&server))
        .unwrap();
    client.clear_auth();

    let result = client.current_user().await;
    assert!(matches!(result, Err(Error::Unauthorized)));
    assert_eq!(client.auth_strategy(), None);

    let requests = server.received_requests().await.unwrap();
    assert!(requests[0].headers.get("authorization").is_none());
}

// ── Alarm tests ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_list_alarms_sends_paging_and_filters() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/alarm/alarms"))
        .and(query_param("currentPage", "2"))
        .and(query_param("pageSize", "50"))
        .and(query_param("withTotalPages", "true"))
        .and(query_param("withTotalElements", "true"))
        .and(query_param("severity", "CRITICAL,MAJOR"))
        .and(query_param("status", "ACTIVE"))
        .and(query_param("source", "42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "alarms": [alarm_json("1", "CRITICAL"), alarm_json("2", "MAJOR")],
            "statistics": {
                "currentPage": 2,
                "pageSize": 50,
                "totalPages": 3,
                "totalElements": 102
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let query = AlarmQuery {
        source: Some("42".into()),
        severities: vec![AlarmSeverity::Critical, AlarmSeverity::Major],
        statuses: vec![AlarmStatus::Active],
        ..AlarmQuery::default()
    };
    let page = client.list_alarms(&query, 2, 50).await.unwrap();

    assert_eq!(page.alarms.len(), 2);
    assert_eq!(page.alarms[1].id, "2");
    let stats = page.statistics.unwrap();
    assert_eq!(stats.current_page, Some(2));
    assert_eq!(stats.total_pages, Some(3));
    assert_eq!(stats.total_elements, Some(102));
}

#[tokio::test]
async fn test_count_alarms() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/alarm/alarms/count"))
        .and(query_param("severity", "WARNING"))
        .and(query_param("status", "ACTIVE"))
        .respond_with(ResponseTemplate::new(200).set_body_string("17"))
        .mount(&server)
        .await;

    let query = AlarmQuery {
        severities: vec![AlarmSeverity::Warning],
        statuses: vec![AlarmStatus::Active],
        ..AlarmQuery::default()
    };
    assert_eq!(client.count_alarms(&query).await.unwrap(), 17);
}

#[tokio::test]
async fn test_update_alarm_status() {
    let (server, client) = setup().await;

    let mut updated = alarm_json("9", "MINOR");
    updated["status"] = json!("ACKNOWLEDGED");

    Mock::given(method("PUT"))
        .and(path("/alarm/alarms/9"))
        .and(body_json(json!({ "status": "ACKNOWLEDGED" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(updated))
        .expect(1)
        .mount(&server)
        .await;

    let alarm = client
        .update_alarm_status("9", AlarmStatus::Acknowledged)
        .await
        .unwrap();
    assert_eq!(alarm.status, AlarmStatus::Acknowledged);
}

// ── Inventory tests ─────────────────────────────────────────────────

#[tokio::test]
async fn test_find_device_by_name() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/inventory/managedObjects"))
        .and(query_param("query", "$filter=(name eq 'Pump 7')"))
        .and(query_param("pageSize", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "managedObjects": [{ "id": "42", "name": "Pump 7", "type": "c8y_Device" }]
        })))
        .mount(&server)
        .await;

    let device = client.find_device_by_name("Pump 7").await.unwrap().unwrap();
    assert_eq!(device.id, "42");
}

#[tokio::test]
async fn test_find_device_by_name_no_match() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/inventory/managedObjects"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "managedObjects": [] })))
        .mount(&server)
        .await;

    assert!(client.find_device_by_name("ghost").await.unwrap().is_none());
}

#[tokio::test]
async fn test_resolve_external_id() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/identity/externalIds/c8y_Serial/SN-0042"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "externalId": "SN-0042",
            "type": "c8y_Serial",
            "managedObject": { "id": "42" }
        })))
        .mount(&server)
        .await;

    let id = client
        .resolve_external_id("c8y_Serial", "SN-0042")
        .await
        .unwrap();
    assert_eq!(id, "42");
}

// ── Error tests ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_api_error_body_is_parsed() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/alarm/alarms/404"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": "alarm/Not Found",
            "message": "Finding alarm from database failed : No alarm for gid '404'!"
        })))
        .mount(&server)
        .await;

    let err = client.get_alarm("404").await.unwrap_err();

    assert!(err.is_not_found());
    assert_eq!(err.api_error_code(), Some("alarm/Not Found"));
    match err {
        Error::Api {
            status, message, ..
        } => {
            assert_eq!(status, 404);
            assert!(message.starts_with("Finding alarm"));
        }
        other => panic!("expected Api error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_server_error_is_transient() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/alarm/alarms/1"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream unavailable"))
        .mount(&server)
        .await;

    let err = client.get_alarm("1").await.unwrap_err();
    assert!(err.is_transient());
    assert!(err.to_string().contains("upstream unavailable"));
}

#[tokio::test]
async fn test_malformed_body_is_deserialization_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/alarm/alarms/1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let err = client.get_alarm("1").await.unwrap_err();
    match err {
        Error::Deserialization { body, .. } => assert!(body.contains("maintenance")),
        other => panic!("expected Deserialization error, got: {other:?}"),
    }
}

#[test]
fn test_invalid_tenant_fails_before_io() {
    let result = PlatformClient::new("https://", &alarmist_api::TransportConfig::default());
    assert!(matches!(result, Err(Error::InvalidTenantUrl(_))));
}
