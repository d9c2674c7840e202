//! Application configuration for seocontext.
//!
//! User config lives at `~/.seocontext/seocontext.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SeoContextError};
use crate::types::SourceId;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "seocontext.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".seocontext";

// ---------------------------------------------------------------------------
// Config structs (matching seocontext.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Configured data sources, in collection order.
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Where `batch` writes one context file per product.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Per-source fetch timeout.
    #[serde(default = "default_source_timeout")]
    pub source_timeout_secs: u64,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            source_timeout_secs: default_source_timeout(),
        }
    }
}

fn default_output_dir() -> String {
    "./var/contexts".into()
}
fn default_source_timeout() -> u64 {
    30
}

/// How a source payload is obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectorKind {
    /// Recorded JSON payloads on disk.
    File,
    /// A JSON endpoint queried per product.
    Http,
}

/// `[[sources]]` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub id: SourceId,
    pub kind: ConnectorKind,

    /// Payload directory for `file` sources.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// Endpoint for `http` sources.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,

    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

impl AppConfig {
    /// Sources with `enabled = true`, in declaration order.
    pub fn enabled_sources(&self) -> impl Iterator<Item = &SourceConfig> {
        self.sources.iter().filter(|s| s.enabled)
    }

    /// A starter config: every source reading recorded payloads from one directory.
    pub fn with_file_sources(dir: &str) -> Self {
        Self {
            defaults: DefaultsConfig::default(),
            sources: SourceId::ALL
                .into_iter()
                .map(|id| SourceConfig {
                    id,
                    kind: ConnectorKind::File,
                    path: Some(dir.to_string()),
                    url: None,
                    api_key_env: None,
                    enabled: true,
                })
                .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.seocontext/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| SeoContextError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.seocontext/seocontext.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| SeoContextError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        SeoContextError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a starter config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| SeoContextError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::with_file_sources("./fixtures/json/sources");
    let content =
        toml::to_string_pretty(&config).map_err(|e| SeoContextError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| SeoContextError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Check that at least one source is enabled and every enabled source is
/// complete enough to build a connector for.
///
/// An empty source list is the one configuration problem that stops a run
/// before collection starts.
pub fn validate_sources(config: &AppConfig) -> Result<()> {
    let enabled: Vec<&SourceConfig> = config.enabled_sources().collect();
    if enabled.is_empty() {
        return Err(SeoContextError::fatal(
            "no data sources configured. Add [[sources]] entries or run `seocontext config init`",
        ));
    }

    for (i, source) in enabled.iter().enumerate() {
        if enabled[..i].iter().any(|s| s.id == source.id) {
            return Err(SeoContextError::config(format!(
                "source '{}' is configured more than once",
                source.id
            )));
        }
        match source.kind {
            ConnectorKind::File if source.path.is_none() => {
                return Err(SeoContextError::config(format!(
                    "file source '{}' needs a path",
                    source.id
                )));
            }
            ConnectorKind::Http if source.url.is_none() => {
                return Err(SeoContextError::config(format!(
                    "http source '{}' needs a url",
                    source.id
                )));
            }
            _ => {}
        }
    }

    Ok(())
}

/// Read the API key named by `api_key_env`, if the source declares one.
///
/// A declared but unset variable is reported against the source alone.
pub fn resolve_api_key(source: &SourceConfig) -> Result<Option<String>> {
    let Some(var_name) = source.api_key_env.as_deref() else {
        return Ok(None);
    };
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(Some(val)),
        _ => Err(SeoContextError::source_unavailable(
            source.id.as_str(),
            format!("credential not found. Set the {var_name} environment variable"),
        )),
    }
}
