// tests/support/mod.rs
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use async_trait::async_trait;
use nxsence::auth::{Account, NsoClient, NsoSession, RefreshWindows};
use nxsence::logging::ExchangeLog;
use nxsence::presence::{DisplayPayload, DisplaySink};
use nxsence::settings::Endpoints;
use nxsence::{Error, Result};
use serde_json::{json, Value};
use tiny_http::{Header, Response, Server};

type Routes = Arc<Mutex<HashMap<String, (u16, Value)>>>;

/// In-process stand-in for every upstream endpoint
pub struct MockUpstream {
    server: Arc<Server>,
    base: String,
    routes: Routes,
    hits: Arc<Mutex<Vec<String>>>,
    delays: Arc<Mutex<HashMap<String, Duration>>>,
    handle: Option<JoinHandle<()>>,
}

impl MockUpstream {
    pub fn start() -> Self {
        let server = Arc::new(Server::http("127.0.0.1:0").unwrap());
        let port = server.server_addr().to_ip().unwrap().port();
        let routes: Routes = Arc::new(Mutex::new(HashMap::new()));
        let hits = Arc::new(Mutex::new(Vec::new()));
        let delays: Arc<Mutex<HashMap<String, Duration>>> = Arc::new(Mutex::new(HashMap::new()));

        let handle = {
            let server = Arc::clone(&server);
            let routes = Arc::clone(&routes);
            let hits = Arc::clone(&hits);
            let delays = Arc::clone(&delays);
            std::thread::spawn(move || {
                for request in server.incoming_requests() {
                    let path = request.url().split('?').next().unwrap_or("").to_string();
                    hits.lock().unwrap().push(path.clone());

                    let (status, body) = routes
                        .lock()
                        .unwrap()
                        .get(&path)
                        .cloned()
                        .unwrap_or((404, json!({ "error": "not found" })));

                    let delay = delays.lock().unwrap().get(&path).copied();
                    if let Some(delay) = delay {
                        std::thread::sleep(delay);
                    }

                    let response = Response::from_string(body.to_string())
                        .with_status_code(status)
                        .with_header(
                            Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..])
                                .unwrap(),
                        );
                    request.respond(response).ok();
                }
            })
        };

        let mock = Self {
            server,
            base: format!("http://127.0.0.1:{}", port),
            routes,
            hits,
            delays,
            handle: Some(handle),
        };
        mock.install_defaults();
        mock
    }

    fn install_defaults(&self) {
        self.route(
            "/token",
            json!({ "access_token": "access-1", "id_token": "id-1", "expires_in": 900 }),
        );
        self.route("/me", json!({ "birthday": "1990-01-01", "country": "US" }));
        self.route(
            "/f",
            json!({ "f": "signed", "request_id": "req-1", "timestamp": 1_700_000_000_000i64 }),
        );
        self.route("/lookup", json!({ "results": [{ "version": "2.10.1" }] }));
        self.set_own_status(json!({ "state": "OFFLINE", "game": {} }));
        self.set_friends(json!([]));
        self.route("/session_token", json!({ "session_token": "seed-token" }));
    }

    pub fn endpoints(&self) -> Endpoints {
        Endpoints {
            authorize_url: format!("{}/authorize", self.base),
            session_token_url: format!("{}/session_token", self.base),
            token_url: format!("{}/token", self.base),
            user_info_url: format!("{}/me", self.base),
            attestation_url: format!("{}/f", self.base),
            login_url: format!("{}/login", self.base),
            friends_url: format!("{}/friends", self.base),
            app_lookup_url: format!("{}/lookup?id=1234806557&country=us", self.base),
        }
    }

    pub fn route(&self, path: &str, body: Value) {
        self.route_with_status(path, 200, body);
    }

    pub fn route_with_status(&self, path: &str, status: u16, body: Value) {
        self.routes
            .lock()
            .unwrap()
            .insert(path.to_string(), (status, body));
    }

    /// Holds every response on `path` back by `delay`
    pub fn delay(&self, path: &str, delay: Duration) {
        self.delays.lock().unwrap().insert(path.to_string(), delay);
    }

    pub fn set_own_status(&self, presence: Value) {
        self.route(
            "/login",
            json!({
                "status": 0,
                "result": {
                    "user": { "id": 1, "name": "Alice", "imageUri": "alice.png", "presence": presence },
                    "webApiServerCredential": { "accessToken": "web-1", "expiresIn": 7200 },
                    "firebaseCredential": { "accessToken": "", "expiresIn": 3600 }
                }
            }),
        );
    }

    pub fn set_friends(&self, friends: Value) {
        self.route("/friends", json!({ "status": 0, "result": { "friends": friends } }));
    }

    pub fn hits(&self) -> Vec<String> {
        self.hits.lock().unwrap().clone()
    }

    pub fn hit_count(&self, path: &str) -> usize {
        self.hits().iter().filter(|p| *p == path).count()
    }

    pub fn clear_hits(&self) {
        self.hits.lock().unwrap().clear();
    }
}

impl Drop for MockUpstream {
    fn drop(&mut self) {
        self.server.unblock();
        if let Some(handle) = self.handle.take() {
            handle.join().ok();
        }
    }
}

pub fn friend(name: &str, state: &str, game: Option<(&str, &str)>) -> Value {
    let game = match game {
        Some((title, image)) => json!({ "name": title, "imageUri": image }),
        None => json!({}),
    };
    json!({
        "id": 0,
        "nsaId": format!("nsa-{}", name),
        "imageUri": format!("{}.png", name.to_lowercase()),
        "name": name,
        "isFriend": true,
        "presence": { "state": state, "updatedAt": 0, "logoutAt": 0, "game": game }
    })
}

pub fn session(mock: &MockUpstream, product_version: Option<&str>) -> NsoSession {
    let client = NsoClient::new(
        mock.endpoints(),
        product_version.map(str::to_string),
        ExchangeLog::new(true),
    )
    .unwrap();
    NsoSession::new(client, Account::new("seed-token"), RefreshWindows::default())
}

/// Remembers every payload; optionally behaves like a vanished Discord client
#[derive(Default)]
pub struct RecordingSink {
    pub payloads: Vec<DisplayPayload>,
    pub lost: bool,
}

#[async_trait]
impl DisplaySink for RecordingSink {
    fn name(&self) -> &'static str {
        "Recording"
    }

    async fn update(&mut self, payload: &DisplayPayload) -> Result<()> {
        if self.lost {
            return Err(Error::ChatClientSessionInvalid("pipe closed".to_string()));
        }
        self.payloads.push(payload.clone());
        Ok(())
    }
}

/// Collects formatted tracing output for the current thread
#[derive(Clone, Default)]
pub struct LogCapture {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl LogCapture {
    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        let writer = self.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .with_writer(move || writer.clone())
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    pub fn lines(&self) -> Vec<String> {
        String::from_utf8_lossy(&self.buffer.lock().unwrap())
            .lines()
            .map(str::to_string)
            .collect()
    }
}

impl std::io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buffer.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
