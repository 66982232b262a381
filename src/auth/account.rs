use serde::{Deserialize, Serialize};

use crate::presence::StatusRecord;

/// Bumped whenever the stored record layout changes
pub const ACCOUNT_VERSION: &str = "1.0";

/// Signed attestation value plus the request id and timestamp it was issued for
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attestation {
    pub f: String,
    pub request_id: String,
    pub timestamp: i64,
}

/// A registered platform account and every credential derived from it.
///
/// The session token is the long-lived seed; everything else is renewed by
/// [`crate::auth::NsoSession`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub version: String,
    pub session_token: String,
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub id_token: String,
    #[serde(default)]
    pub birthday: String,
    #[serde(default)]
    pub attestation: Attestation,
    #[serde(default)]
    pub web_api_credential: String,
    #[serde(default)]
    pub token_refreshed_at: i64,
    #[serde(default)]
    pub web_api_refreshed_at: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub image_uri: String,
    #[serde(default)]
    pub status: Option<StatusRecord>,
}

impl Account {
    pub fn new(session_token: impl Into<String>) -> Self {
        Self {
            version: ACCOUNT_VERSION.to_string(),
            session_token: session_token.into(),
            access_token: String::new(),
            id_token: String::new(),
            birthday: String::new(),
            attestation: Attestation::default(),
            web_api_credential: String::new(),
            token_refreshed_at: 0,
            web_api_refreshed_at: 0,
            name: String::new(),
            image_uri: String::new(),
            status: None,
        }
    }

    pub fn tokens_due(&self, now: i64, window: i64) -> bool {
        window_elapsed(self.token_refreshed_at, now, window)
    }

    pub fn web_api_credential_due(&self, now: i64, window: i64) -> bool {
        window_elapsed(self.web_api_refreshed_at, now, window)
    }
}

fn window_elapsed(last: i64, now: i64, window: i64) -> bool {
    now - last > window
}
