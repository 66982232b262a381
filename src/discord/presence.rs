//! Discord Rich Presence sink using discord-sdk

use std::time::Duration;

use async_trait::async_trait;
use discord_sdk::{
    activity::{ActivityBuilder, Assets},
    user::User,
    wheel::{UserState, Wheel},
    Discord, Subscriptions,
};

use crate::error::{Error, Result};
use crate::logging::ExchangeLog;
use crate::presence::{DisplayPayload, DisplaySink};

/// Timeout for waiting for Discord handshake
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

enum Connection {
    Disconnected,
    Connected {
        discord: Discord,
        // Receives connection events for as long as `discord` lives
        _wheel: Wheel,
    },
}

/// Discord's local RPC connection, either not yet established or live
pub struct DiscordSink {
    app_id: i64,
    connection: Connection,
    exchange: ExchangeLog,
}

impl DiscordSink {
    pub fn new(app_id: i64, exchange: ExchangeLog) -> Self {
        Self {
            app_id,
            connection: Connection::Disconnected,
            exchange,
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self.connection, Connection::Connected { .. })
    }

    /// Keeps trying until a local Discord client accepts the connection.
    ///
    /// There is no timeout; stopping the process is the only way out.
    pub async fn connect(&mut self, retry_delay: Duration) {
        tracing::info!("Attempting to establish connection to Discord.");

        loop {
            match Self::handshake(self.app_id).await {
                Ok((discord, wheel, user)) => {
                    tracing::info!(
                        "Connection to Discord established as {}#{}",
                        user.username,
                        user.discriminator.unwrap_or(0)
                    );
                    self.connection = Connection::Connected {
                        discord,
                        _wheel: wheel,
                    };
                    return;
                }
                Err(e) => {
                    tracing::warn!(
                        "{} Retrying in {} seconds...",
                        Error::ChatClientUnreachable,
                        retry_delay.as_secs()
                    );
                    tracing::debug!("Discord handshake failed: {}", e);
                    tokio::time::sleep(retry_delay).await;
                }
            }
        }
    }

    async fn handshake(app_id: i64) -> std::result::Result<(Discord, Wheel, User), String> {
        let (wheel, handler) = Wheel::new(Box::new(|err| {
            tracing::debug!("Discord error: {:?}", err);
        }));

        let mut user_spoke = wheel.user();

        let discord = Discord::new(app_id, Subscriptions::ACTIVITY, Box::new(handler))
            .map_err(|e| format!("Discord not available: {:?}", e))?;

        let handshake = tokio::time::timeout(HANDSHAKE_TIMEOUT, async {
            if user_spoke.0.changed().await.is_err() {
                Err("Discord connection closed".to_string())
            } else {
                match &*user_spoke.0.borrow() {
                    UserState::Connected(user) => Ok(user.clone()),
                    UserState::Disconnected(err) => Err(format!("Discord disconnected: {:?}", err)),
                }
            }
        })
        .await;

        match handshake {
            Ok(Ok(user)) => Ok((discord, wheel, user)),
            Ok(Err(e)) => {
                discord.disconnect().await;
                Err(e)
            }
            Err(_) => {
                discord.disconnect().await;
                Err("Discord handshake timed out".to_string())
            }
        }
    }

    pub async fn disconnect(&mut self) {
        if let Connection::Connected { discord, .. } =
            std::mem::replace(&mut self.connection, Connection::Disconnected)
        {
            discord.disconnect().await;
            tracing::info!("Discord Rich Presence disconnected");
        }
    }
}

fn activity(payload: &DisplayPayload) -> ActivityBuilder {
    let assets = Assets::default()
        .large(payload.large_image.clone(), Some(payload.large_text.clone()))
        .small(payload.small_image.clone(), Some(payload.small_text.clone()));

    let activity = ActivityBuilder::new()
        .details(payload.status.clone())
        .assets(assets);

    match payload.start {
        Some(start) => activity.start_timestamp(start),
        None => activity,
    }
}

#[async_trait]
impl DisplaySink for DiscordSink {
    fn name(&self) -> &'static str {
        "Discord"
    }

    async fn update(&mut self, payload: &DisplayPayload) -> Result<()> {
        let Connection::Connected { discord, .. } = &self.connection else {
            return Err(Error::ChatClientUnreachable);
        };

        match discord.update_activity(activity(payload)).await {
            Ok(_) => {
                self.exchange.display_update(&payload.status);
                tracing::info!("Status: {}", payload.status);
                Ok(())
            }
            Err(e) => {
                tracing::error!("Couldn't find active Discord instance.");
                self.connection = Connection::Disconnected;
                Err(Error::ChatClientSessionInvalid(format!("{:?}", e)))
            }
        }
    }
}
