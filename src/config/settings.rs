//! User settings for the command-line front-end

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::crypto::{self, HashAlgorithm, DEFAULT_KEY_SIZE, DEFAULT_PBKDF2_ITERATIONS};
use crate::error::{HybridError, Result};

const APP_DIR: &str = "hybridcrypt";
const SETTINGS_FILE: &str = "settings.json";

/// Defaults the CLI falls back to when a flag is not given
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Modulus size for `newkey`
    pub key_size: usize,
    /// Base name of generated key files (`pub.<name>.pem`, ...)
    pub key_name: String,
    /// Where generated key files go; the current directory when unset
    pub output_dir: Option<PathBuf>,
    /// Hash used by `sign` and `verify`
    pub hash_algorithm: HashAlgorithm,
    /// PBKDF2 iterations for password-protected private keys
    pub pbkdf2_iterations: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            key_size: DEFAULT_KEY_SIZE,
            key_name: "key".to_string(),
            output_dir: None,
            hash_algorithm: HashAlgorithm::default(),
            pbkdf2_iterations: DEFAULT_PBKDF2_ITERATIONS,
        }
    }
}

impl Settings {
    /// `<config dir>/hybridcrypt/settings.json`, if the platform has a config dir
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join(SETTINGS_FILE))
    }

    /// Load from `path`, or from [`Self::default_path`] when `None`
    ///
    /// A missing file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path.map(Path::to_path_buf).or_else(Self::default_path) {
            Some(path) => path,
            None => return Ok(Self::default()),
        };

        let settings: Settings = match fs::read(&path) {
            Ok(data) => serde_json::from_slice(&data)?,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(HybridError::Io(e)),
        };

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        crypto::validate_key_size(self.key_size)
            .map_err(|e| HybridError::InvalidConfig(format!("key_size: {}", e)))?;

        if self.key_name.trim().is_empty() {
            return Err(HybridError::InvalidConfig("key_name must not be empty".into()));
        }
        if self.pbkdf2_iterations == 0 {
            return Err(HybridError::InvalidConfig(
                "pbkdf2_iterations must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Directory for generated key files
    pub fn output_dir(&self) -> PathBuf {
        self.output_dir.clone().unwrap_or_else(|| PathBuf::from("."))
    }
}
