use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::settings::Settings;

const LOG_FILE_PREFIX: &str = "log_";
const DEFAULT_DIRECTIVES: &str = "info,hyper=warn,reqwest=warn";

/// Target used for the upstream request/response records
pub const EXCHANGE_TARGET: &str = "nxsence::exchange";

/// Sets up console output, plus a log file when `to_file` is set.
///
/// The returned guard flushes the file writer on drop and must live as long
/// as the process.
pub fn init_logging(settings: &Settings, to_file: bool) -> Option<WorkerGuard> {
    let console_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("{DEFAULT_DIRECTIVES},{EXCHANGE_TARGET}=off"))
    });

    let console_layer = fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_filter(console_filter);

    let (file_layer, guard) = if to_file {
        let log_dir = &settings.logs_dir;
        if let Err(e) = std::fs::create_dir_all(log_dir) {
            eprintln!("Warning: Failed to create log directory: {}", e);
        }

        let file_name = format!("{}{}.txt", LOG_FILE_PREFIX, chrono::Utc::now().timestamp());
        let file_appender = tracing_appender::rolling::never(log_dir, file_name);
        let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

        let layer = fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .with_ansi(false)
            .with_writer(file_writer)
            .with_filter(EnvFilter::new(DEFAULT_DIRECTIVES));

        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .init();

    if to_file {
        tracing::info!("Logging to {}", settings.logs_dir.display());
        tracing::info!("nxsence version: {}", env!("CARGO_PKG_VERSION"));
        cleanup_old_logs(&settings.logs_dir, settings.log_retention_days);
    }

    guard
}

fn cleanup_old_logs(log_dir: &Path, keep_days: u64) {
    let cutoff =
        std::time::SystemTime::now() - std::time::Duration::from_secs(keep_days * 24 * 60 * 60);

    let entries = match std::fs::read_dir(log_dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!("Failed to read log directory for cleanup: {}", e);
            return;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();

        match path.file_name().and_then(|n| n.to_str()) {
            Some(name) if name.starts_with(LOG_FILE_PREFIX) => {}
            _ => continue,
        }

        let modified = match entry.metadata().and_then(|m| m.modified()) {
            Ok(m) => m,
            Err(_) => continue,
        };

        if modified < cutoff {
            if let Err(e) = std::fs::remove_file(&path) {
                tracing::warn!("Failed to remove old log file {:?}: {}", path, e);
            } else {
                tracing::debug!("Removed old log file: {:?}", path);
            }
        }
    }
}

/// Records upstream traffic when enabled.
///
/// Handed to each component that talks to the outside world instead of
/// consulting a global switch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExchangeLog {
    enabled: bool,
}

impl ExchangeLog {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn request(&self, method: &str, url: &str, body: Option<&serde_json::Value>) {
        if !self.enabled {
            return;
        }
        match body {
            Some(body) => tracing::info!(target: EXCHANGE_TARGET, "{} {} with body {}", method, url, body),
            None => tracing::info!(target: EXCHANGE_TARGET, "{} {}", method, url),
        }
    }

    pub fn response(&self, url: &str, status: u16, body: &serde_json::Value) {
        if self.enabled {
            tracing::info!(target: EXCHANGE_TARGET, "Received {} from {}: {}", status, url, body);
        }
    }

    pub fn failure(&self, url: &str, error: &dyn std::fmt::Display) {
        if self.enabled {
            tracing::error!(target: EXCHANGE_TARGET, "Connection to {} failed: {}", url, error);
        }
    }

    pub fn display_update(&self, status: &str) {
        if self.enabled {
            tracing::info!(target: EXCHANGE_TARGET, "Status: {}", status);
        }
    }
}
