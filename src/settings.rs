use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Result;

const SETTINGS_FILE: &str = "settings.json";
const APP_DIR: &str = "nxsence";

/// Discord application registered for the Switch presence assets
const DISCORD_APP_ID: i64 = 1117366813257383966;

/// Upstream URLs. Overridable so a mirror or a local mock can stand in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub authorize_url: String,
    pub session_token_url: String,
    pub token_url: String,
    pub user_info_url: String,
    pub attestation_url: String,
    pub login_url: String,
    pub friends_url: String,
    pub app_lookup_url: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            authorize_url: "https://accounts.nintendo.com/connect/1.0.0/authorize".to_string(),
            session_token_url: "https://accounts.nintendo.com/connect/1.0.0/api/session_token"
                .to_string(),
            token_url: "https://accounts.nintendo.com/connect/1.0.0/api/token".to_string(),
            user_info_url: "https://api.accounts.nintendo.com/2.0.0/users/me".to_string(),
            attestation_url: "https://api.imink.app/f".to_string(),
            login_url: "https://api-lp1.znc.srv.nintendo.net/v3/Account/Login".to_string(),
            friends_url: "https://api-lp1.znc.srv.nintendo.net/v3/Friend/List".to_string(),
            app_lookup_url: "https://itunes.apple.com/lookup?id=1234806557&country=us"
                .to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub users_dir: PathBuf,
    pub logs_dir: PathBuf,
    pub log_retention_days: u64,
    pub discord_app_id: i64,
    pub poll_interval_secs: u64,
    pub token_refresh_secs: i64,
    pub web_api_refresh_secs: i64,
    pub connect_retry_secs: u64,
    /// Pins the companion app version instead of looking it up
    pub product_version: Option<String>,
    pub endpoints: Endpoints,
}

impl Default for Settings {
    fn default() -> Self {
        let app_dir = app_data_dir();
        Self {
            users_dir: app_dir.join("users"),
            logs_dir: app_dir.join("logs"),
            log_retention_days: 7,
            discord_app_id: DISCORD_APP_ID,
            poll_interval_secs: 30,
            token_refresh_secs: 800,
            web_api_refresh_secs: 5400,
            connect_retry_secs: 5,
            product_version: None,
            endpoints: Endpoints::default(),
        }
    }
}

impl Settings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn connect_retry(&self) -> Duration {
        Duration::from_secs(self.connect_retry_secs)
    }
}

fn app_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

pub fn settings_path() -> PathBuf {
    app_data_dir().join(SETTINGS_FILE)
}

pub fn load_settings() -> Result<Settings> {
    load_settings_from(&settings_path())
}

pub fn load_settings_from(path: &Path) -> Result<Settings> {
    tracing::debug!("Loading settings from {}", path.display());

    if !path.exists() {
        return Ok(Settings::default());
    }

    let contents = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}
