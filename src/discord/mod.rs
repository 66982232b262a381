mod presence;

pub use presence::DiscordSink;
