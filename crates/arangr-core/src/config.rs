//! AI assistant configuration
//!
//! The config is a small JSON file holding the OpenAI credential and the
//! completion defaults:
//!
//! ```json
//! {
//!   "api_key": "sk-...",
//!   "model": "gpt-3.5-turbo",
//!   "max_tokens": 1000,
//!   "temperature": 0.7
//! }
//! ```
//!
//! Persistence goes through [`ConfigStore`] so the service never touches
//! the file system directly.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::{AssistantError, AssistantResult};

/// Every accepted credential starts with this
pub const CREDENTIAL_PREFIX: &str = "sk-";

/// Environment variable overriding the config file location
pub const CONFIG_PATH_ENV: &str = "ARANGR_AI_CONFIG";

/// Config file name, also used relative to the working directory when no
/// platform config dir exists
pub const CONFIG_FILE_NAME: &str = "ai_config.json";

pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_MAX_TOKENS: u32 = 1000;
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub api_key: Option<String>,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    /// OpenAI-compatible endpoint root; unset means the public API
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            base_url: None,
        }
    }
}

impl Config {
    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    /// Credential if one is set and non-blank
    pub fn credential(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }
}

/// Whether a credential has the provider's expected shape
pub fn is_valid_credential(credential: &str) -> bool {
    credential.starts_with(CREDENTIAL_PREFIX) && credential.len() > CREDENTIAL_PREFIX.len()
}

/// Read/write access to wherever the config lives
pub trait ConfigStore: Send + Sync {
    /// `Ok(None)` when nothing has been saved yet
    fn load(&self) -> AssistantResult<Option<Config>>;

    fn save(&self, config: &Config) -> AssistantResult<()>;
}

/// Stores the config as pretty-printed JSON at a fixed path
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at `$ARANGR_AI_CONFIG`, falling back to the platform config dir
    /// and then to `./ai_config.json`
    pub fn default_location() -> Self {
        Self::resolved_or_local(default_config_path())
    }

    fn resolved_or_local(resolved: AssistantResult<PathBuf>) -> Self {
        match resolved {
            Ok(path) => Self::new(path),
            Err(e) => {
                warn!(error = %e, file = CONFIG_FILE_NAME, "Using AI config in working directory");
                Self::new(CONFIG_FILE_NAME)
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigStore for JsonFileStore {
    fn load(&self) -> AssistantResult<Option<Config>> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "No AI config file yet");
            return Ok(None);
        }

        let content = fs::read_to_string(&self.path).map_err(|e| {
            AssistantError::ConfigLoad(format!("{}: {e}", self.path.display()))
        })?;
        let config: Config = serde_json::from_str(&content).map_err(|e| {
            AssistantError::ConfigLoad(format!("{}: {e}", self.path.display()))
        })?;

        info!(
            path = %self.path.display(),
            model = %config.model,
            has_key = config.credential().is_some(),
            "AI config loaded"
        );
        Ok(Some(config))
    }

    fn save(&self, config: &Config) -> AssistantResult<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|e| AssistantError::ConfigSave(format!("{}: {e}", parent.display())))?;
            }
        }

        let content = serde_json::to_string_pretty(config)
            .map_err(|e| AssistantError::ConfigSave(e.to_string()))?;
        fs::write(&self.path, content)
            .map_err(|e| AssistantError::ConfigSave(format!("{}: {e}", self.path.display())))?;

        info!(path = %self.path.display(), "AI config saved");
        Ok(())
    }
}

/// `$ARANGR_AI_CONFIG` if set, else `<config dir>/arangr/ai_config.json`
pub fn default_config_path() -> AssistantResult<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        if !path.trim().is_empty() {
            return Ok(PathBuf::from(path));
        }
    }

    let config_dir = dirs::config_dir().ok_or_else(|| {
        AssistantError::ConfigLoad("Could not determine config directory".to_string())
    })?;

    Ok(config_dir.join("arangr").join(CONFIG_FILE_NAME))
}
