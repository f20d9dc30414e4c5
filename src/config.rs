use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::session::SessionLayout;

pub const DEFAULT_BASE_URL: &str = "http://localhost:5017/api/v1";

/// A validation error in the configuration
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]: {}", self.field, self.message)
    }
}

/// Which of the two known backend contracts to speak.
///
/// `Flag`: mutations answer `{success, message}`, updates go to `PUT /Product`
/// with the id in the body, the raw token is sent as `Authorization`, and the
/// session is stored under `user` and `token`.
///
/// `Entity`: mutations answer with the product itself, updates go to
/// `PUT /Product/{id}`, the token is sent as `Bearer`, and the session is
/// stored under `user` only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[default]
    Flag,
    Entity,
}

impl Dialect {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "flag" | "success-flag" | "a" => Some(Self::Flag),
            "entity" | "rest" | "b" => Some(Self::Entity),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Flag => "flag",
            Self::Entity => "entity",
        }
    }

    pub fn session_layout(&self) -> SessionLayout {
        match self {
            Self::Flag => SessionLayout::Split,
            Self::Entity => SessionLayout::Combined,
        }
    }

    /// Value of the `Authorization` header for `token`.
    pub fn authorization(&self, token: &str) -> String {
        match self {
            Self::Flag => token.to_string(),
            Self::Entity => format!("Bearer {}", token),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub dialect: Dialect,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            dialect: Dialect::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct StorageConfig {
    /// Storage file; `~/.stockroom/storage.json` when unset
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl StorageConfig {
    pub fn resolve_path(&self) -> PathBuf {
        if let Some(path) = &self.path {
            return path.clone();
        }
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".stockroom")
            .join("storage.json")
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DisplayConfig {
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_currency() -> String {
    "BRL".to_string()
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            currency: default_currency(),
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub display: DisplayConfig,
}

/// A config file as written on disk: every field optional so a file only
/// overrides what it mentions.
#[derive(Debug, Clone, Deserialize, Default)]
struct PartialConfig {
    #[serde(default)]
    api: PartialApi,
    #[serde(default)]
    storage: StorageConfig,
    #[serde(default)]
    display: PartialDisplay,
}

#[derive(Debug, Clone, Deserialize, Default)]
struct PartialApi {
    base_url: Option<String>,
    dialect: Option<Dialect>,
}

#[derive(Debug, Clone, Deserialize, Default)]
struct PartialDisplay {
    currency: Option<String>,
}

impl Config {
    /// Load configuration from default paths
    /// Priority: local (.stockroom/config.local.toml) > project (.stockroom/config.toml)
    /// > user (~/.stockroom/config.toml) > built-in defaults
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".stockroom").join("config.toml");
            if user_config.exists() {
                config.merge_file(&user_config)?;
            }
        }

        let project_dir = Path::new(".stockroom");
        for name in ["config.toml", "config.local.toml"] {
            let path = project_dir.join(name);
            if path.exists() {
                config.merge_file(&path)?;
            }
        }

        Ok(config)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = Self::default();
        config.merge_file(path)?;
        Ok(config)
    }

    fn merge_file(&mut self, path: &Path) -> Result<()> {
        let content = std::fs::read_to_string(path)?;
        let other: PartialConfig = toml::from_str(&content)?;
        tracing::debug!(path = %path.display(), "loaded config file");
        self.merge(other);
        Ok(())
    }

    /// Merge another config into this one (other takes priority where set)
    fn merge(&mut self, other: PartialConfig) {
        if let Some(base_url) = other.api.base_url {
            self.api.base_url = base_url;
        }
        if let Some(dialect) = other.api.dialect {
            self.api.dialect = dialect;
        }
        if other.storage.path.is_some() {
            self.storage.path = other.storage.path;
        }
        if let Some(currency) = other.display.currency {
            self.display.currency = currency;
        }
    }

    /// Validate configuration and return any errors found
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        let url = self.api.base_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            errors.push(ValidationError {
                field: "api.base_url".to_string(),
                message: format!("Expected an http(s) URL, got '{}'", self.api.base_url),
            });
        }

        if self.display.currency.trim().is_empty() {
            errors.push(ValidationError {
                field: "display.currency".to_string(),
                message: "Currency code must not be empty".to_string(),
            });
        }

        if let Some(path) = &self.storage.path {
            if path.as_os_str().is_empty() {
                errors.push(ValidationError {
                    field: "storage.path".to_string(),
                    message: "Path must not be empty".to_string(),
                });
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
