/*
[INPUT]:  Wallet names and key storage directory
[OUTPUT]: Persistent Ed25519 signer instances for local wallets
[POS]:    Auth layer - on-disk key material for the local wallet provider
[UPDATE]: When key storage format or file naming conventions change
*/

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tracing::info;

use crate::auth::Ed25519Signer;
use crate::auth::token_store::write_private_file;
use crate::http::{AuthError, Result};

const KEY_FILE_SUFFIX: &str = "_ed25519.key";

/// Manages persistence of local wallet keys, one file per wallet name
#[derive(Debug, Clone)]
pub struct PersistentKeyManager {
    key_dir: PathBuf,
}

impl PersistentKeyManager {
    pub fn new(key_dir: impl AsRef<Path>) -> Self {
        Self {
            key_dir: key_dir.as_ref().to_path_buf(),
        }
    }

    pub fn key_dir(&self) -> &Path {
        &self.key_dir
    }

    /// Load the named wallet key, generating and saving a new one if absent
    pub fn get_or_create_signer(&self, wallet_name: &str) -> Result<Ed25519Signer> {
        if let Some(signer) = self.load_signer(wallet_name)? {
            return Ok(signer);
        }

        let signer = Ed25519Signer::generate();
        self.save_signer(wallet_name, &signer)?;
        info!(wallet = wallet_name, address = %signer.address(), "generated new local wallet key");
        Ok(signer)
    }

    /// Load a signer; `Ok(None)` when the key file does not exist
    pub fn load_signer(&self, wallet_name: &str) -> Result<Option<Ed25519Signer>> {
        let path = self.key_file_path(wallet_name)?;
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(AuthError::Storage(e)),
        };

        let bytes = STANDARD.decode(content.trim()).map_err(|e| {
            AuthError::Config(format!("key file {} is not valid base64: {e}", path.display()))
        })?;
        let key_bytes: [u8; 32] = bytes.as_slice().try_into().map_err(|_| {
            AuthError::Config(format!(
                "key file {} holds {} bytes, expected 32",
                path.display(),
                bytes.len()
            ))
        })?;

        Ok(Some(Ed25519Signer::from_secret_key(&key_bytes)))
    }

    pub fn save_signer(&self, wallet_name: &str, signer: &Ed25519Signer) -> Result<()> {
        let path = self.key_file_path(wallet_name)?;
        let encoded = STANDARD.encode(signer.secret_key_bytes());
        write_private_file(&path, encoded.as_bytes())?;
        Ok(())
    }

    /// List all wallet names that have stored keys
    pub fn list_wallets(&self) -> Vec<String> {
        let mut wallets: Vec<String> = fs::read_dir(&self.key_dir)
            .into_iter()
            .flatten()
            .flatten()
            .filter_map(|entry| {
                let name = entry.file_name().to_str()?.to_string();
                name.strip_suffix(KEY_FILE_SUFFIX).map(str::to_string)
            })
            .collect();
        wallets.sort();
        wallets
    }

    pub fn key_file_path(&self, wallet_name: &str) -> Result<PathBuf> {
        let valid = !wallet_name.is_empty()
            && wallet_name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(AuthError::Config(format!(
                "invalid wallet name '{wallet_name}': use letters, digits, '-' or '_'"
            )));
        }
        Ok(self.key_dir.join(format!("{wallet_name}{KEY_FILE_SUFFIX}")))
    }
}
