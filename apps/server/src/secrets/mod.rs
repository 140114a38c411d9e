//! Credential plumbing of the server: a token file shared by all brokers and a
//! login command per broker.

mod command;

pub use command::CommandAuthenticator;

use std::{collections::BTreeMap, fs, path::PathBuf, sync::Arc, sync::Mutex};

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Key, Nonce,
};
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use brokerbridge_market_data::{GatewayError, TokenStore};

const FILE_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum TokenFileError {
    #[error("Token file I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("Token file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{0}")]
    Crypto(String),
    #[error("Token file lock poisoned")]
    Poisoned,
}

#[derive(Serialize, Deserialize, Default)]
struct TokenMap {
    #[serde(default)]
    version: u32,
    #[serde(default)]
    tokens: BTreeMap<String, String>,
}

#[derive(Serialize, Deserialize)]
struct SealedTokenMap {
    version: u32,
    nonce: String,
    ciphertext: String,
}

/// JSON file holding one access token per broker, optionally sealed with
/// ChaCha20-Poly1305. All brokers share one file and one lock.
#[derive(Debug)]
pub struct TokenFile {
    path: PathBuf,
    key: Option<[u8; 32]>,
    lock: Mutex<()>,
}

impl TokenFile {
    pub fn open(path: PathBuf, key: Option<&str>) -> Result<Arc<Self>, TokenFileError> {
        let key = key
            .filter(|value| !value.trim().is_empty())
            .map(parse_key)
            .transpose()?;
        Ok(Arc::new(Self {
            path,
            key,
            lock: Mutex::new(()),
        }))
    }

    pub fn get(&self, broker: &str) -> Result<Option<String>, TokenFileError> {
        let _guard = self.lock()?;
        Ok(self.read_locked()?.tokens.remove(broker))
    }

    pub fn set(&self, broker: &str, token: &str) -> Result<(), TokenFileError> {
        let _guard = self.lock()?;
        let mut map = self.read_locked()?;
        map.tokens.insert(broker.to_string(), token.to_string());
        self.write_locked(&map)
    }

    /// Token store view of one broker's entry.
    pub fn store_for(self: &Arc<Self>, broker: &'static str) -> FileTokenStore {
        FileTokenStore {
            broker,
            file: Arc::clone(self),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, ()>, TokenFileError> {
        self.lock.lock().map_err(|_| TokenFileError::Poisoned)
    }

    fn read_locked(&self) -> Result<TokenMap, TokenFileError> {
        if !self.path.exists() {
            return Ok(TokenMap::default());
        }
        let raw = fs::read(&self.path)?;
        if raw.is_empty() {
            return Ok(TokenMap::default());
        }

        let value: serde_json::Value = serde_json::from_slice(&raw)?;
        if value.get("ciphertext").is_none() {
            return Ok(serde_json::from_value(value)?);
        }

        let key = self.key.ok_or_else(|| {
            TokenFileError::Crypto("BB_TOKEN_KEY must be set to read the sealed token file".into())
        })?;
        let sealed: SealedTokenMap = serde_json::from_value(value)?;
        let nonce = decode(&sealed.nonce, "nonce")?;
        let ciphertext = decode(&sealed.ciphertext, "ciphertext")?;
        if nonce.len() != 12 {
            return Err(TokenFileError::Crypto("Token file nonce is malformed".into()));
        }

        let plaintext = ChaCha20Poly1305::new(Key::from_slice(&key))
            .decrypt(Nonce::from_slice(&nonce), ciphertext.as_slice())
            .map_err(|_| TokenFileError::Crypto("Failed to decrypt token file".into()))?;
        Ok(serde_json::from_slice(&plaintext)?)
    }

    fn write_locked(&self, map: &TokenMap) -> Result<(), TokenFileError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let map = TokenMap {
            version: FILE_VERSION,
            tokens: map.tokens.clone(),
        };

        let json = match self.key {
            None => serde_json::to_string_pretty(&map)?,
            Some(key) => {
                let mut nonce = [0u8; 12];
                OsRng.fill_bytes(&mut nonce);
                let ciphertext = ChaCha20Poly1305::new(Key::from_slice(&key))
                    .encrypt(Nonce::from_slice(&nonce), serde_json::to_vec(&map)?.as_slice())
                    .map_err(|_| TokenFileError::Crypto("Failed to encrypt token file".into()))?;
                serde_json::to_string_pretty(&SealedTokenMap {
                    version: FILE_VERSION,
                    nonce: BASE64.encode(nonce),
                    ciphertext: BASE64.encode(ciphertext),
                })?
            }
        };
        fs::write(&self.path, json)?;
        Ok(())
    }
}

fn decode(value: &str, what: &str) -> Result<Vec<u8>, TokenFileError> {
    BASE64
        .decode(value)
        .map_err(|e| TokenFileError::Crypto(format!("Failed to decode {what}: {e}")))
}

fn parse_key(raw: &str) -> Result<[u8; 32], TokenFileError> {
    let trimmed = raw.trim();
    let bytes = match BASE64.decode(trimmed) {
        Ok(bytes) => bytes,
        Err(_) if trimmed.len() == 32 => trimmed.as_bytes().to_vec(),
        Err(_) => {
            return Err(TokenFileError::Crypto(
                "BB_TOKEN_KEY must be base64 or a 32-byte ascii value".into(),
            ))
        }
    };
    bytes
        .try_into()
        .map_err(|_| TokenFileError::Crypto("BB_TOKEN_KEY must decode to exactly 32 bytes".into()))
}

/// [`TokenStore`] backed by one broker's entry in a [`TokenFile`].
pub struct FileTokenStore {
    broker: &'static str,
    file: Arc<TokenFile>,
}

#[async_trait]
impl TokenStore for FileTokenStore {
    async fn get_current_token(&self) -> Result<Option<String>, GatewayError> {
        self.file
            .get(self.broker)
            .map_err(|e| GatewayError::auth(self.broker, e.to_string()))
    }

    async fn store_token(&self, token: &str) -> Result<bool, GatewayError> {
        if !self.is_token_valid(token) {
            return Ok(false);
        }
        self.file
            .set(self.broker, token.trim())
            .map_err(|e| GatewayError::auth(self.broker, e.to_string()))?;
        Ok(true)
    }
}
