use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Failed to make connection to {url}. Please make sure that you are connected to the internet.")]
    NetworkUnreachable { url: String },

    #[error("Invalid response received from {endpoint}: missing `{key}`. Refer to the log for details (if toggled).")]
    MalformedResponse { endpoint: &'static str, key: String },

    #[error("User {name} is on an older version. Please try registering this user again.")]
    OutdatedAccount { name: String },

    #[error("User {name} does not exist. Try registering this user.")]
    UnknownAccount { name: String },

    #[error("{name} is not a valid account. Please make sure you are typing in the name of the account you wish to display accurately.")]
    DisplayTargetNotFound { name: String },

    #[error("The link you have inserted is invalid. Please try again.")]
    InvalidRegisterLink,

    #[error("No active Discord instance found. Please make sure Discord is open.")]
    ChatClientUnreachable,

    #[error("Lost the active Discord instance: {0}")]
    ChatClientSessionInvalid(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Account storage error: {0}")]
    Storage(String),
}

pub type Result<T> = std::result::Result<T, Error>;
