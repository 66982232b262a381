//! Sealed account records: `NXA1 | nonce | AES-256-GCM ciphertext`.
//!
//! The header is bound as associated data, so a record with a rewritten
//! header fails to open just like one with a flipped ciphertext bit.

use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes256Gcm, Key, Nonce,
};
use rand::RngCore;

use crate::error::{Error, Result};

const MAGIC: &[u8; 4] = b"NXA1";
const NONCE_SIZE: usize = 12;
const KEY_SEED: &[u8] = b"nxsence/account-record";

pub struct Envelope {
    cipher: Aes256Gcm,
}

impl Envelope {
    /// Envelope keyed for records in the account directory
    pub fn for_accounts() -> Self {
        let mut key = [0u8; 32];
        for (slot, byte) in key.iter_mut().zip(KEY_SEED.iter().cycle()) {
            *slot = *byte;
        }
        Self::with_key(key)
    }

    pub fn with_key(key: [u8; 32]) -> Self {
        Self {
            cipher: Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key)),
        }
    }

    pub fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let mut nonce = [0u8; NONCE_SIZE];
        rand::thread_rng().fill_bytes(&mut nonce);

        let ciphertext = self
            .cipher
            .encrypt(
                Nonce::from_slice(&nonce),
                Payload {
                    msg: plaintext,
                    aad: MAGIC,
                },
            )
            .map_err(|e| Error::Storage(format!("Failed to seal account record: {}", e)))?;

        let mut sealed = Vec::with_capacity(MAGIC.len() + NONCE_SIZE + ciphertext.len());
        sealed.extend_from_slice(MAGIC);
        sealed.extend_from_slice(&nonce);
        sealed.extend(ciphertext);
        Ok(sealed)
    }

    pub fn open(&self, sealed: &[u8]) -> Result<Vec<u8>> {
        let body = sealed
            .strip_prefix(MAGIC.as_slice())
            .ok_or_else(|| Error::Storage("Not an account record".to_string()))?;
        if body.len() < NONCE_SIZE {
            return Err(Error::Storage("Account record is truncated".to_string()));
        }
        let (nonce, ciphertext) = body.split_at(NONCE_SIZE);

        self.cipher
            .decrypt(
                Nonce::from_slice(nonce),
                Payload {
                    msg: ciphertext,
                    aad: MAGIC,
                },
            )
            .map_err(|e| Error::Storage(format!("Failed to open account record: {}", e)))
    }
}
