pub mod auth;
pub mod cli;
pub mod discord;
pub mod error;
pub mod logging;
pub mod presence;
pub mod settings;

pub use error::{Error, Result};
