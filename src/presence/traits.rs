use async_trait::async_trait;

use crate::error::Result;

/// The game currently being broadcast and when it was first seen (epoch seconds)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveGameSession {
    pub title: String,
    pub started_at: i64,
}

/// The fields pushed to the chat client's rich presence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayPayload {
    pub large_image: String,
    pub large_text: String,
    pub small_image: String,
    pub small_text: String,
    pub status: String,
    /// Elapsed time counts up from here when set
    pub start: Option<i64>,
}

/// Somewhere presence gets shown (Discord, or a recorder in tests)
#[async_trait]
pub trait DisplaySink: Send {
    /// Returns the name of this sink (for logging)
    fn name(&self) -> &'static str;

    /// Push a payload to the display
    async fn update(&mut self, payload: &DisplayPayload) -> Result<()>;
}
