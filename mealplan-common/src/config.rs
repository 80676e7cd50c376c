//! Configuration loading and root folder resolution
//!
//! The root folder holds the SQLite database (`mealplan.db`) and the uploaded
//! meal images (`uploads/`). It is resolved in priority order:
//! 1. Command-line argument (highest priority)
//! 2. `MEALPLAN_ROOT_FOLDER` environment variable
//! 3. `root_folder` in the TOML config file
//! 4. OS-dependent compiled default (fallback)
//!
//! A missing or unreadable config file is never fatal: it logs a warning and
//! defaults apply.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::{Error, Result};

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "MEALPLAN_ROOT_FOLDER";

/// Environment variable overriding the config file location
pub const CONFIG_FILE_ENV: &str = "MEALPLAN_CONFIG";

/// Database file name inside the root folder
pub const DATABASE_FILE_NAME: &str = "mealplan.db";

/// Upload directory name inside the root folder
pub const UPLOADS_DIR_NAME: &str = "uploads";

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 5780;

/// Default maximum upload size in megabytes
pub const DEFAULT_MAX_UPLOAD_MB: u64 = 5;

/// Compiled defaults for the current platform
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub root_folder: PathBuf,
    pub host: String,
    pub port: u16,
    pub max_upload_mb: u64,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        Self {
            root_folder: default_root_folder(),
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            max_upload_mb: DEFAULT_MAX_UPLOAD_MB,
        }
    }
}

/// Contents of `config.toml`; every field is optional
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    pub root_folder: Option<PathBuf>,
    pub host: Option<String>,
    pub port: Option<u16>,
    /// Mark the session cookie `Secure` (serve behind HTTPS)
    pub secure_cookies: Option<bool>,
    pub max_upload_mb: Option<u64>,
    /// Fixed session signing secret; overrides the one stored in the database
    pub session_secret: Option<i64>,
}

impl TomlConfig {
    /// Parse TOML text
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
    }

    /// Load a config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
        Self::parse(&content)
    }

    /// Load the default config file, or defaults when there is none
    pub fn load_or_default() -> Self {
        match default_config_path() {
            Some(path) => match Self::load(&path) {
                Ok(config) => {
                    debug!("Loaded config file {}", path.display());
                    config
                }
                Err(e) => {
                    warn!("{} (using defaults)", e);
                    Self::default()
                }
            },
            None => Self::default(),
        }
    }
}

/// Locate the config file
///
/// `MEALPLAN_CONFIG` first; on Linux `~/.config/mealplan/config.toml` then
/// `/etc/mealplan/config.toml`; elsewhere the platform config dir.
pub fn default_config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_FILE_ENV) {
        return Some(PathBuf::from(path));
    }

    let user_config = dirs::config_dir().map(|d| d.join("mealplan").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/mealplan/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Get OS-dependent default root folder path
fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/mealplan (or /var/lib/mealplan for system-wide)
        dirs::data_local_dir()
            .map(|d| d.join("mealplan"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/mealplan"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("mealplan"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/mealplan"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("mealplan"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\mealplan"))
    } else {
        PathBuf::from("./mealplan_data")
    }
}

/// Resolves the root folder by priority order
#[derive(Debug, Clone)]
pub struct RootFolderResolver {
    cli_arg: Option<PathBuf>,
    toml: TomlConfig,
}

impl RootFolderResolver {
    pub fn new(cli_arg: Option<PathBuf>, toml: TomlConfig) -> Self {
        Self { cli_arg, toml }
    }

    pub fn resolve(&self) -> PathBuf {
        // Priority 1: Command-line argument
        if let Some(path) = &self.cli_arg {
            return path.clone();
        }

        // Priority 2: Environment variable
        if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
            if !path.trim().is_empty() {
                return PathBuf::from(path);
            }
        }

        // Priority 3: TOML config file
        if let Some(path) = &self.toml.root_folder {
            return path.clone();
        }

        // Priority 4: OS-dependent compiled default
        default_root_folder()
    }
}

/// Prepares the root folder layout
#[derive(Debug, Clone)]
pub struct RootFolderInitializer {
    root_folder: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root_folder: PathBuf) -> Self {
        Self { root_folder }
    }

    pub fn root_folder(&self) -> &Path {
        &self.root_folder
    }

    /// Create the root folder and the uploads directory if missing
    pub fn ensure_directory_exists(&self) -> Result<()> {
        std::fs::create_dir_all(&self.root_folder)?;
        std::fs::create_dir_all(self.uploads_path())?;
        Ok(())
    }

    pub fn database_path(&self) -> PathBuf {
        self.root_folder.join(DATABASE_FILE_NAME)
    }

    pub fn uploads_path(&self) -> PathBuf {
        self.root_folder.join(UPLOADS_DIR_NAME)
    }
}

/// Effective service settings after merging the TOML file over the defaults
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,
    pub secure_cookies: bool,
    pub max_upload_bytes: usize,
    pub session_secret: Option<i64>,
}

impl ServiceConfig {
    pub fn from_toml(toml: &TomlConfig) -> Self {
        let defaults = CompiledDefaults::for_current_platform();
        let max_upload_mb = toml.max_upload_mb.unwrap_or(defaults.max_upload_mb);

        Self {
            host: toml.host.clone().unwrap_or(defaults.host),
            port: toml.port.unwrap_or(defaults.port),
            secure_cookies: toml.secure_cookies.unwrap_or(false),
            max_upload_bytes: (max_upload_mb as usize).saturating_mul(1024 * 1024),
            session_secret: toml.session_secret.filter(|secret| *secret != 0),
        }
    }
}
