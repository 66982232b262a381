use std::fs;
use std::path::{Path, PathBuf};

use super::account::{Account, ACCOUNT_VERSION};
use super::envelope::Envelope;
use crate::error::{Error, Result};

const RECORD_EXTENSION: &str = "dat";

/// Registered accounts, one encrypted record per display name
pub struct AccountStorage {
    dir: PathBuf,
    envelope: Envelope,
}

impl AccountStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            envelope: Envelope::for_accounts(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        let file_stem: String = url::form_urlencoded::byte_serialize(name.as_bytes()).collect();
        self.dir.join(format!("{}.{}", file_stem, RECORD_EXTENSION))
    }

    pub fn exists(&self, name: &str) -> bool {
        self.path_for(name).exists()
    }

    pub fn save(&self, account: &Account) -> Result<()> {
        fs::create_dir_all(&self.dir)?;

        let json = serde_json::to_vec(account)?;
        let sealed = self.envelope.seal(&json)?;
        fs::write(self.path_for(&account.name), &sealed)?;

        tracing::debug!("Stored account {}", account.name);
        Ok(())
    }

    /// Loads the record for `name`, refusing records written by another schema version
    pub fn load(&self, name: &str) -> Result<Account> {
        let path = self.path_for(name);
        if !path.exists() {
            return Err(Error::UnknownAccount {
                name: name.to_string(),
            });
        }

        let raw = self.read_raw(&path)?;
        if raw.get("version").and_then(|v| v.as_str()) != Some(ACCOUNT_VERSION) {
            tracing::warn!("Account {} was stored by an older version", name);
            return Err(Error::OutdatedAccount {
                name: name.to_string(),
            });
        }

        Ok(serde_json::from_value(raw)?)
    }

    /// Names of every stored account, sorted
    pub fn list(&self) -> Result<Vec<String>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in fs::read_dir(&self.dir)?.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(RECORD_EXTENSION) {
                continue;
            }

            match self.read_raw(&path) {
                Ok(raw) => {
                    if let Some(name) = raw.get("name").and_then(|n| n.as_str()) {
                        names.push(name.to_string());
                    }
                }
                Err(e) => tracing::warn!("Skipping unreadable account record {:?}: {}", path, e),
            }
        }

        names.sort();
        Ok(names)
    }

    fn read_raw(&self, path: &Path) -> Result<serde_json::Value> {
        let sealed = fs::read(path)?;
        let json = self.envelope.open(&sealed)?;
        Ok(serde_json::from_slice(&json)?)
    }
}
