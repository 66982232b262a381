//! Status records and the merged self + friends fetch

use serde::{Deserialize, Deserializer, Serialize};

use crate::auth::NsoSession;
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusRecord {
    pub name: String,
    pub image_uri: String,
    pub presence: Presence,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Presence {
    pub state: PresenceState,
    /// Upstream sends `{}` when nothing is being played
    #[serde(default, deserialize_with = "empty_object_as_none")]
    pub game: Option<Game>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PresenceState {
    Online,
    Inactive,
    Offline,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Game {
    pub name: String,
    pub image_uri: String,
}

fn empty_object_as_none<'de, D>(deserializer: D) -> std::result::Result<Option<Game>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    match value {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::Object(map)) if map.is_empty() => Ok(None),
        Some(value) => serde_json::from_value(value)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

/// First record whose name matches exactly. Duplicate names are not told apart.
pub fn find_status<'a>(statuses: &'a [StatusRecord], name: &str) -> Option<&'a StatusRecord> {
    statuses.iter().find(|s| s.name == name)
}

/// Friends list followed by the account's own status, in that order.
///
/// The own status comes from a fresh presence login. Upstream tends to report
/// it as offline even while the account is active.
pub async fn fetch_all_statuses(session: &mut NsoSession, now: i64) -> Result<Vec<StatusRecord>> {
    let mut statuses = session.friends(now).await?;
    let own = session.own_status(now).await?;
    statuses.push(own);
    Ok(statuses)
}
