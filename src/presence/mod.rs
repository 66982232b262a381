mod manager;
mod mapper;
mod status;
mod traits;

pub use manager::{PollLoop, STATUS_UPDATE_INTERVAL};
pub use mapper::{PresenceMapper, HOME_SCREEN_IMAGE, HOME_SCREEN_TEXT};
pub use status::{fetch_all_statuses, find_status, Game, Presence, PresenceState, StatusRecord};
pub use traits::{ActiveGameSession, DisplayPayload, DisplaySink};
