// tests/session_tests.rs
mod support;

use nxsence::auth::{register, Account, NsoClient, NsoSession, RefreshWindows};
use nxsence::logging::ExchangeLog;
use nxsence::presence::PresenceState;
use nxsence::Error;
use serde_json::json;
use support::{friend, session, LogCapture, MockUpstream};

#[tokio::test]
async fn login_runs_bootstrap_in_order() {
    let mock = MockUpstream::start();
    let mut session = session(&mock, None);

    session.login(1_000).await.unwrap();

    assert_eq!(mock.hits(), vec!["/token", "/me", "/f", "/lookup", "/login"]);

    let account = session.account();
    assert_eq!(account.access_token, "access-1");
    assert_eq!(account.id_token, "id-1");
    assert_eq!(account.birthday, "1990-01-01");
    assert_eq!(account.attestation.f, "signed");
    assert_eq!(account.attestation.request_id, "req-1");
    assert_eq!(account.attestation.timestamp, 1_700_000_000_000);
    assert_eq!(account.name, "Alice");
    assert_eq!(account.image_uri, "alice.png");
    assert_eq!(account.token_refreshed_at, 1_000);
    assert_eq!(account.web_api_refreshed_at, 1_000);
    assert_eq!(session.web_api_credential(), "web-1");
    assert_eq!(
        account.status.as_ref().map(|s| s.presence.state),
        Some(PresenceState::Offline)
    );
}

#[tokio::test]
async fn pinned_product_version_skips_lookup() {
    let mock = MockUpstream::start();
    let mut session = session(&mock, Some("2.9.0"));

    session.login(1_000).await.unwrap();

    assert_eq!(mock.hit_count("/lookup"), 0);
}

#[tokio::test]
async fn product_version_is_looked_up_once() {
    let mock = MockUpstream::start();
    let mut session = session(&mock, None);

    session.login(1_000).await.unwrap();
    session.own_status(1_030).await.unwrap();
    session.own_status(1_060).await.unwrap();

    assert_eq!(mock.hit_count("/lookup"), 1);
    assert_eq!(mock.hit_count("/login"), 3);
}

#[tokio::test]
async fn missing_key_is_a_malformed_response() {
    let mock = MockUpstream::start();
    mock.route_with_status(
        "/token",
        400,
        json!({ "error": "invalid_grant", "error_description": "The provided grant is invalid." }),
    );
    let mut session = session(&mock, None);

    match session.login(1_000).await {
        Err(Error::MalformedResponse { endpoint, key }) => {
            assert_eq!(endpoint, "token");
            assert_eq!(key, "/access_token");
        }
        other => panic!("expected malformed response, got {:?}", other),
    }
    // The bootstrap stops at the failing step
    assert_eq!(mock.hits(), vec!["/token"]);
}

#[tokio::test]
async fn missing_web_api_credential_is_a_malformed_response() {
    let mock = MockUpstream::start();
    mock.route("/login", json!({ "status": 9403, "errorMessage": "Invalid token." }));
    let mut session = session(&mock, Some("2.9.0"));

    assert!(matches!(
        session.login(1_000).await,
        Err(Error::MalformedResponse { endpoint: "login", .. })
    ));
}

#[tokio::test]
async fn unreachable_host_is_reported_as_network_failure() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let mock = MockUpstream::start();
    let mut endpoints = mock.endpoints();
    endpoints.token_url = format!("http://127.0.0.1:{}/token", port);

    let client = NsoClient::new(endpoints, None, ExchangeLog::disabled()).unwrap();
    let mut session = NsoSession::new(client, Account::new("seed"), RefreshWindows::default());

    match session.login(1_000).await {
        Err(Error::NetworkUnreachable { url }) => assert!(url.ends_with("/token")),
        other => panic!("expected network failure, got {:?}", other),
    }
}

#[tokio::test]
async fn refresh_waits_for_each_window_to_lapse() {
    let mock = MockUpstream::start();
    let mut session = session(&mock, Some("2.9.0"));
    session.login(1_000).await.unwrap();
    mock.clear_hits();

    // Exactly at the token window: nothing to do
    session.refresh_if_due(1_800).await.unwrap();
    assert!(mock.hits().is_empty());

    // Token window lapsed, web-API window still fresh
    session.refresh_if_due(1_801).await.unwrap();
    assert_eq!(mock.hits(), vec!["/token", "/f"]);
    assert_eq!(session.account().token_refreshed_at, 1_801);
    assert_eq!(session.account().web_api_refreshed_at, 1_000);
    mock.clear_hits();

    // Exactly at the web-API window
    session.refresh_if_due(6_400).await.unwrap();
    assert_eq!(mock.hit_count("/login"), 0);

    session.refresh_if_due(6_401).await.unwrap();
    assert_eq!(mock.hit_count("/login"), 1);
    assert_eq!(session.account().web_api_refreshed_at, 6_401);
}

#[tokio::test]
async fn friends_renews_stale_web_api_credential_first() {
    let mock = MockUpstream::start();
    mock.set_friends(json!([friend("Bob", "ONLINE", Some(("Zelda", "z.png")))]));
    let mut session = session(&mock, Some("2.9.0"));
    session.login(1_000).await.unwrap();
    mock.clear_hits();

    let friends = session.friends(2_000).await.unwrap();
    assert_eq!(friends.len(), 1);
    assert_eq!(friends[0].name, "Bob");
    assert_eq!(mock.hits(), vec!["/friends"]);
    mock.clear_hits();

    session.friends(6_401).await.unwrap();
    assert_eq!(mock.hits(), vec!["/token", "/f", "/login", "/friends"]);
}

#[tokio::test]
async fn malformed_friends_list_is_rejected() {
    let mock = MockUpstream::start();
    mock.route("/friends", json!({ "status": 9404, "errorMessage": "Token expired." }));
    let mut session = session(&mock, Some("2.9.0"));
    session.login(1_000).await.unwrap();

    assert!(matches!(
        session.friends(1_030).await,
        Err(Error::MalformedResponse { endpoint: "friends", .. })
    ));
}

#[tokio::test]
async fn pasted_link_is_exchanged_for_session_token() {
    let mock = MockUpstream::start();
    let client = NsoClient::new(mock.endpoints(), None, ExchangeLog::disabled()).unwrap();
    let request = register::create_authorization_request(client.endpoints()).unwrap();

    let link = format!(
        "npf71b963c1b7b6d119://auth#session_state=s&session_token_code=code-1&state={}",
        request.state
    );
    let token = register::exchange_link(&client, &link, &request).await.unwrap();

    assert_eq!(token, "seed-token");
    assert_eq!(mock.hits(), vec!["/session_token"]);
}

#[tokio::test]
async fn rejected_session_token_code_is_an_invalid_link() {
    let mock = MockUpstream::start();
    mock.route_with_status("/session_token", 400, json!({ "error": "invalid_request" }));
    let client = NsoClient::new(mock.endpoints(), None, ExchangeLog::disabled()).unwrap();
    let request = register::create_authorization_request(client.endpoints()).unwrap();

    let link = format!(
        "npf71b963c1b7b6d119://auth#session_token_code=stale&state={}",
        request.state
    );
    assert!(matches!(
        register::exchange_link(&client, &link, &request).await,
        Err(Error::InvalidRegisterLink)
    ));
}

#[tokio::test]
async fn link_from_another_registration_is_refused_without_exchange() {
    let mock = MockUpstream::start();
    let client = NsoClient::new(mock.endpoints(), None, ExchangeLog::disabled()).unwrap();
    let request = register::create_authorization_request(client.endpoints()).unwrap();
    let other = register::create_authorization_request(client.endpoints()).unwrap();

    for link in [
        format!(
            "npf71b963c1b7b6d119://auth#session_token_code=code-1&state={}",
            other.state
        ),
        "npf71b963c1b7b6d119://auth#session_token_code=code-1".to_string(),
    ] {
        assert!(
            matches!(
                register::exchange_link(&client, &link, &request).await,
                Err(Error::InvalidRegisterLink)
            ),
            "{link}"
        );
    }
    assert_eq!(mock.hit_count("/session_token"), 0);
}

#[tokio::test]
async fn friends_request_body_is_recorded() {
    let mock = MockUpstream::start();
    let logs = LogCapture::default();
    let _guard = logs.install();
    let mut session = session(&mock, Some("2.9.0"));
    session.login(1_000).await.unwrap();

    session.friends(1_030).await.unwrap();

    let line = logs
        .lines()
        .into_iter()
        .find(|line| line.contains("POST") && line.contains("/friends"))
        .expect("friends request was not recorded");
    assert!(line.contains("with body {}"), "{line}");
}
