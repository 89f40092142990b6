//! Configuration loading and root folder resolution
//!
//! Root folder resolution priority order:
//! 1. Command-line argument (highest priority)
//! 2. `GEARPOLL_ROOT_FOLDER` environment variable
//! 3. TOML config file (`root_folder` key)
//! 4. OS-dependent compiled default (fallback)

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const ROOT_FOLDER_ENV: &str = "GEARPOLL_ROOT_FOLDER";

/// Default catalog truncation: the gear catalog carries 27 items
pub const DEFAULT_MAX_CATALOG_ITEMS: usize = 27;

/// Default linear downscale applied to catalog images for display
pub const DEFAULT_IMAGE_SCALE: f32 = 0.3;

const DEFAULT_PORT: u16 = 5730;
const DEFAULT_DB_MAX_LOCK_WAIT_MS: u64 = 5000;

/// Optional fields as they appear in the TOML config file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    pub root_folder: Option<PathBuf>,
    pub port: Option<u16>,
    pub catalog_path: Option<PathBuf>,
    pub image_folder: Option<PathBuf>,
    pub max_catalog_items: Option<usize>,
    pub image_scale: Option<f32>,
    pub db_max_lock_wait_ms: Option<u64>,
}

/// Fully resolved service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub root_folder: PathBuf,
    pub port: u16,
    pub catalog_path: PathBuf,
    pub image_folder: PathBuf,
    pub max_catalog_items: usize,
    pub image_scale: f32,
    pub db_max_lock_wait_ms: u64,
}

impl ServiceConfig {
    /// Resolve configuration from CLI overrides, environment, TOML, defaults.
    ///
    /// `cli_root` and `cli_port` come from command-line arguments and win over
    /// every other source. `config_path` overrides the default config file
    /// location.
    pub fn resolve(
        cli_root: Option<&Path>,
        cli_port: Option<u16>,
        config_path: Option<&Path>,
    ) -> Result<Self> {
        let toml = load_toml_config(config_path)?;

        let root_folder = cli_root
            .map(Path::to_path_buf)
            .or_else(|| std::env::var(ROOT_FOLDER_ENV).ok().map(PathBuf::from))
            .or_else(|| toml.root_folder.clone())
            .unwrap_or_else(default_root_folder);

        let catalog_path = toml
            .catalog_path
            .clone()
            .unwrap_or_else(|| root_folder.join("assets").join("descriptions.csv"));
        let image_folder = toml
            .image_folder
            .clone()
            .unwrap_or_else(|| root_folder.join("assets").join("images"));

        let image_scale = toml.image_scale.unwrap_or(DEFAULT_IMAGE_SCALE);
        if !(image_scale > 0.0 && image_scale <= 1.0) {
            return Err(Error::Config(format!(
                "image_scale must be in (0, 1], got {}",
                image_scale
            )));
        }

        let max_catalog_items = toml.max_catalog_items.unwrap_or(DEFAULT_MAX_CATALOG_ITEMS);
        if max_catalog_items == 0 {
            return Err(Error::Config(
                "max_catalog_items must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            root_folder,
            port: cli_port.or(toml.port).unwrap_or(DEFAULT_PORT),
            catalog_path,
            image_folder,
            max_catalog_items,
            image_scale,
            db_max_lock_wait_ms: toml
                .db_max_lock_wait_ms
                .unwrap_or(DEFAULT_DB_MAX_LOCK_WAIT_MS),
        })
    }

    /// Path of the SQLite database inside the root folder
    pub fn database_path(&self) -> PathBuf {
        self.root_folder.join("gearpoll.db")
    }

    /// Create the root folder if it does not exist yet
    pub fn ensure_root_folder(&self) -> Result<()> {
        std::fs::create_dir_all(&self.root_folder)?;
        Ok(())
    }
}

/// Read the TOML config file if one exists.
///
/// With no explicit path, looks for `gearpoll/config.toml` under the
/// platform config directory. A missing file is not an error; a malformed
/// one is.
fn load_toml_config(config_path: Option<&Path>) -> Result<TomlConfig> {
    let path = match config_path {
        Some(path) => path.to_path_buf(),
        None => match dirs::config_dir() {
            Some(dir) => dir.join("gearpoll").join("config.toml"),
            None => return Ok(TomlConfig::default()),
        },
    };

    if !path.exists() {
        if config_path.is_some() {
            return Err(Error::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(&path)?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))
}

/// OS-dependent default root folder path
fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("gearpoll"))
        .unwrap_or_else(|| PathBuf::from("./gearpoll_data"))
}
