mod account;
mod client;
mod envelope;
pub mod register;
mod session;
mod storage;

pub use account::{Account, Attestation, ACCOUNT_VERSION};
pub use client::{LoginParameters, LoginResult, NsoClient, CLIENT_ID};
pub use session::{NsoSession, RefreshWindows};
pub use storage::AccountStorage;
