use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, bail};
use serde::de::DeserializeOwned;
use tracing::{debug, trace};

use crate::history::DEFAULT_WINDOW;
use crate::templates::{Language, TemplateTable};

/// Durable state configuration
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StorageConfig {
    /// Keep nothing across restarts
    #[serde(rename = "none")]
    None,

    /// JSON files in a state directory (default)
    Files {
        #[serde(default = "default_state_dir")]
        dir: PathBuf,
    },
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig::Files {
            dir: default_state_dir(),
        }
    }
}

fn default_state_dir() -> PathBuf {
    crate::util::get_state_dir()
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(default)]
pub struct Config {
    /// Samples kept per series channel
    pub window_length: usize,

    /// Seconds between periodic history saves
    pub save_interval_secs: u64,

    pub language: Language,
    pub investor_mode: bool,
    pub achievements_enabled: bool,
    pub problems_enabled: bool,

    /// Write every composed report to the archive
    pub archive_reports: bool,

    /// Seed for opening-line selection; entropy when unset
    pub rng_seed: Option<u64>,

    pub storage: StorageConfig,

    /// Custom templates layered over the built-in ones
    pub templates: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            window_length: DEFAULT_WINDOW,
            save_interval_secs: default_save_interval_secs(),
            language: Language::default(),
            investor_mode: false,
            achievements_enabled: true,
            problems_enabled: true,
            archive_reports: false,
            rng_seed: None,
            storage: StorageConfig::default(),
            templates: None,
        }
    }
}

fn default_save_interval_secs() -> u64 {
    5 * 60
}

impl Config {
    pub fn save_interval(&self) -> Duration {
        Duration::from_secs(self.save_interval_secs)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.window_length == 0 {
            bail!("window_length must be at least 1");
        }
        Ok(())
    }

    /// The built-in templates, with the configured template file on top
    pub fn load_templates(&self) -> anyhow::Result<TemplateTable> {
        let builtin = TemplateTable::builtin();
        match &self.templates {
            Some(path) => Ok(builtin.overlay(read_templates_file(path)?)),
            None => Ok(builtin),
        }
    }
}

/// Parse `path` as TOML when it has a `.toml` extension, as JSON otherwise
fn read_file<T: DeserializeOwned>(path: &Path, what: &str) -> anyhow::Result<T> {
    let file_content = std::fs::read_to_string(path)
        .with_context(|| format!("could not read {what} file {}", path.display()))?;

    let value = match path.extension().and_then(|ext| ext.to_str()) {
        Some("toml") => toml::from_str(&file_content)
            .with_context(|| format!("invalid TOML {what} in {}", path.display()))?,
        _ => serde_json::from_str(&file_content)
            .with_context(|| format!("invalid JSON {what} in {}", path.display()))?,
    };
    Ok(value)
}

/// Load a config file. `.toml` files are parsed as TOML, everything else as JSON.
pub fn read_config_file(path: impl AsRef<Path>) -> anyhow::Result<Config> {
    let config: Config = read_file(path.as_ref(), "config")?;

    config.validate()?;
    trace!("loaded config: {config:?}");
    Ok(config)
}

/// Load a template file (language code -> partial pack)
pub fn read_templates_file(path: impl AsRef<Path>) -> anyhow::Result<TemplateTable> {
    let path = path.as_ref();
    let table: TemplateTable = read_file(path, "templates")?;
    debug!(
        "loaded templates for {:?} from {}",
        table.languages().collect::<Vec<_>>(),
        path.display()
    );
    Ok(table)
}
