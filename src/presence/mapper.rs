//! Turns a status record into what the display should show

use super::status::{PresenceState, StatusRecord};
use super::traits::{ActiveGameSession, DisplayPayload};

/// Asset key of the console image shown while on the home screen
pub const HOME_SCREEN_IMAGE: &str = "switch";
pub const HOME_SCREEN_TEXT: &str = "Home Screen";

/// Tracks which game is on display so its start time survives between polls
#[derive(Debug, Default)]
pub struct PresenceMapper {
    session: Option<ActiveGameSession>,
}

impl PresenceMapper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session(&self) -> Option<&ActiveGameSession> {
        self.session.as_ref()
    }

    /// Decides what (if anything) to push for `record` at time `now`.
    ///
    /// `None` means the display should be left as it is.
    pub fn map(&mut self, record: &StatusRecord, now: i64) -> Option<DisplayPayload> {
        match (record.presence.state, &record.presence.game) {
            (PresenceState::Online, Some(game)) => {
                let already_shown = self
                    .session
                    .as_ref()
                    .is_some_and(|session| session.title == game.name);
                if already_shown {
                    return None;
                }

                tracing::debug!("{} started playing {}", record.name, game.name);
                self.session = Some(ActiveGameSession {
                    title: game.name.clone(),
                    started_at: now,
                });

                Some(DisplayPayload {
                    large_image: game.image_uri.clone(),
                    large_text: game.name.clone(),
                    small_image: record.image_uri.clone(),
                    small_text: record.name.clone(),
                    status: format!("Playing {}", game.name),
                    start: Some(now),
                })
            }
            (PresenceState::Inactive, _) => {
                self.session = None;

                Some(DisplayPayload {
                    large_image: HOME_SCREEN_IMAGE.to_string(),
                    large_text: HOME_SCREEN_TEXT.to_string(),
                    small_image: record.image_uri.clone(),
                    small_text: record.name.clone(),
                    status: "Online".to_string(),
                    start: None,
                })
            }
            _ => None,
        }
    }
}
