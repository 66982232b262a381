//! Drives credential refresh, presence fetch and display updates on a fixed cadence

use std::future::Future;
use std::time::Duration;

use tokio::sync::oneshot;

use super::mapper::PresenceMapper;
use super::status::{fetch_all_statuses, find_status};
use super::traits::{DisplayPayload, DisplaySink};
use crate::auth::NsoSession;
use crate::error::{Error, Result};

pub const STATUS_UPDATE_INTERVAL: Duration = Duration::from_secs(30);

pub struct PollLoop<S> {
    session: NsoSession,
    mapper: PresenceMapper,
    sink: S,
    displayed: String,
    interval: Duration,
}

impl<S: DisplaySink> PollLoop<S> {
    pub fn new(session: NsoSession, sink: S, displayed: impl Into<String>) -> Self {
        Self {
            session,
            mapper: PresenceMapper::new(),
            sink,
            displayed: displayed.into(),
            interval: STATUS_UPDATE_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn mapper(&self) -> &PresenceMapper {
        &self.mapper
    }

    pub fn session(&self) -> &NsoSession {
        &self.session
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// One poll: refresh what is due, fetch, map, push.
    ///
    /// Returns the payload that was pushed, if any.
    pub async fn tick(&mut self, now: i64) -> Result<Option<DisplayPayload>> {
        self.session.refresh_if_due(now).await?;

        tracing::info!("Fetching user status...");
        let statuses = fetch_all_statuses(&mut self.session, now).await?;

        let record = find_status(&statuses, &self.displayed).ok_or_else(|| {
            tracing::error!("Failed to find the user {}", self.displayed);
            Error::DisplayTargetNotFound {
                name: self.displayed.clone(),
            }
        })?;

        let payload = self.mapper.map(record, now);
        if let Some(payload) = &payload {
            tracing::debug!("Pushing presence to {}", self.sink.name());
            self.sink.update(payload).await?;
        }

        Ok(payload)
    }

    /// Polls until Ctrl-C or the first error
    pub async fn run(&mut self) -> Result<()> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!("Failed to listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Polls until `shutdown` resolves or the first error.
    ///
    /// `shutdown` is watched for the whole run, so a request that arrives
    /// mid-tick is honoured before the next tick starts. A tick in flight is
    /// never cut short.
    pub async fn run_until<F>(&mut self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let (stop_tx, mut stop) = oneshot::channel();
        let watcher = tokio::spawn(async move {
            shutdown.await;
            let _ = stop_tx.send(());
        });

        let result = loop {
            if stop.try_recv().is_ok() {
                break Ok(());
            }

            if let Err(e) = self.tick(chrono::Utc::now().timestamp()).await {
                break Err(e);
            }

            tokio::select! {
                biased;
                _ = &mut stop => break Ok(()),
                _ = tokio::time::sleep(self.interval) => {}
            }
        };

        watcher.abort();
        if result.is_ok() {
            tracing::info!("Interrupted, stopping presence updates");
        }
        result
    }
}
