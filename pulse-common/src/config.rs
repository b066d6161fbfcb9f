//! Bootstrap configuration: root folder resolution and TOML file handling
//!
//! Runtime settings (model name, worker count, throttle) live in the service
//! database; this module only covers what must be known before the database
//! can be opened.
//!
//! Root folder priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (`PULSE_ROOT_FOLDER`, then `PULSE_ROOT`)
//! 3. TOML config file (`~/.config/pulse/<module>.toml`)
//! 4. OS-dependent compiled default (fallback)

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variables consulted during root folder resolution
const ENV_ROOT_FOLDER: &str = "PULSE_ROOT_FOLDER";
const ENV_ROOT: &str = "PULSE_ROOT";

/// Database file name inside the root folder
const DATABASE_FILE: &str = "pulse.db";

/// Compiled platform defaults used when nothing else is configured
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub root_folder: PathBuf,
    pub log_level: String,
    pub log_file: Option<PathBuf>,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        let root_folder = if cfg!(target_os = "linux") {
            dirs::data_local_dir()
                .map(|d| d.join("pulse"))
                .unwrap_or_else(|| PathBuf::from("/var/lib/pulse"))
        } else if cfg!(target_os = "macos") {
            dirs::data_dir()
                .map(|d| d.join("pulse"))
                .unwrap_or_else(|| PathBuf::from("/Library/Application Support/pulse"))
        } else if cfg!(target_os = "windows") {
            dirs::data_local_dir()
                .map(|d| d.join("pulse"))
                .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\pulse"))
        } else {
            PathBuf::from("./pulse_data")
        };

        Self {
            root_folder,
            log_level: "info".to_string(),
            log_file: None,
        }
    }
}

/// Logging configuration from the TOML file
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default)]
    pub level: Option<String>,

    /// Log file path (stderr when absent)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

/// Bootstrap configuration loaded from the per-module TOML file
///
/// Minimal by design: only what must be known before the database opens.
/// Everything here has a working default, so a missing file never prevents
/// startup.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TomlConfig {
    /// Root folder holding the SQLite database
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Inference endpoint base URL (runtime settings table takes priority)
    #[serde(default)]
    pub ollama_base_url: Option<String>,

    /// Inference model name (runtime settings table takes priority)
    #[serde(default)]
    pub ollama_model: Option<String>,
}

/// Path of the per-module TOML config file, e.g. `~/.config/pulse/pulse-ai.toml`
pub fn toml_config_path(module_name: &str) -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("pulse").join(format!("{}.toml", module_name)))
}

/// Load the per-module TOML config, returning defaults when the file is
/// missing or unreadable (missing configuration must not prevent startup).
pub fn load_toml_config(module_name: &str) -> TomlConfig {
    let Some(path) = toml_config_path(module_name) else {
        return TomlConfig::default();
    };
    if !path.exists() {
        return TomlConfig::default();
    }
    match std::fs::read_to_string(&path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Failed to parse TOML config, using defaults"
                );
                TomlConfig::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "Failed to read TOML config, using defaults"
            );
            TomlConfig::default()
        }
    }
}

/// Atomically write a TOML config file (temp file + rename)
///
/// On Unix the file is restricted to owner read/write since it may hold
/// endpoint URLs for internal infrastructure.
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let tmp_path = path.with_extension("toml.tmp");
    std::fs::write(&tmp_path, content)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(&tmp_path, perms)?;
    }

    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Resolves the root folder for a module following the priority order above
pub struct RootFolderResolver {
    module_name: String,
    cli_override: Option<PathBuf>,
}

impl RootFolderResolver {
    pub fn new(module_name: &str) -> Self {
        Self {
            module_name: module_name.to_string(),
            cli_override: None,
        }
    }

    /// Supply a command-line override (highest priority)
    pub fn with_cli_override(mut self, path: Option<PathBuf>) -> Self {
        self.cli_override = path;
        self
    }

    /// Resolve the root folder; always succeeds by falling through to the
    /// compiled default.
    pub fn resolve(&self) -> PathBuf {
        if let Some(path) = &self.cli_override {
            return path.clone();
        }

        if let Ok(path) = std::env::var(ENV_ROOT_FOLDER) {
            if !path.trim().is_empty() {
                return PathBuf::from(path);
            }
        }
        if let Ok(path) = std::env::var(ENV_ROOT) {
            if !path.trim().is_empty() {
                return PathBuf::from(path);
            }
        }

        if let Some(root_folder) = load_toml_config(&self.module_name).root_folder {
            return root_folder;
        }

        CompiledDefaults::for_current_platform().root_folder
    }
}

/// Prepares a resolved root folder for use
pub struct RootFolderInitializer {
    root_folder: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root_folder: PathBuf) -> Self {
        Self { root_folder }
    }

    /// Create the root folder directory if missing
    pub fn ensure_directory_exists(&self) -> Result<()> {
        if !self.root_folder.exists() {
            std::fs::create_dir_all(&self.root_folder)?;
            tracing::info!(path = %self.root_folder.display(), "Created root folder");
        }
        Ok(())
    }

    /// Path of the SQLite database inside the root folder
    pub fn database_path(&self) -> PathBuf {
        self.root_folder.join(DATABASE_FILE)
    }

    pub fn root_folder(&self) -> &Path {
        &self.root_folder
    }
}
