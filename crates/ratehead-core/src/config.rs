//! Configuration loader and path helpers.
//!
//! Uses Figment to merge built-in defaults + `config.toml` +
//! `config.<env>.toml` + `APP_*` env vars (nested keys split on `__`).
//! Provides helpers to expand `~` and `${VAR}` and to resolve relative paths
//! against a known base directory.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::types::EmbeddingConfig;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub embedding: EmbeddingConfig,
    pub dataset: DatasetSettings,
    pub training: TrainingSettings,
    pub export: ExportSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DatasetSettings {
    pub csv: Option<String>,
    pub text_column: String,
    pub label_column: String,
    /// Row cap applied after cleaning; 0 keeps every row.
    pub limit: usize,
}

impl Default for DatasetSettings {
    fn default() -> Self {
        Self { csv: None, text_column: "description".into(), label_column: "rating".into(), limit: 50 }
    }
}

impl DatasetSettings {
    pub fn row_cap(&self) -> Option<usize> { (self.limit > 0).then_some(self.limit) }
}

/// Which optimizer steps the head.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Adam,
    Gd,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TrainingSettings {
    pub val_frac: f64,
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    pub seed: u64,
    pub backend: BackendKind,
}

impl Default for TrainingSettings {
    fn default() -> Self {
        Self { val_frac: 0.2, epochs: 20, batch_size: 64, learning_rate: 0.001, seed: 42, backend: BackendKind::Adam }
    }
}

impl TrainingSettings {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..1.0).contains(&self.val_frac) {
            return Err(Error::InvalidConfig(format!("training.val_frac must be in [0, 1), got {}", self.val_frac)));
        }
        if self.batch_size == 0 {
            return Err(Error::InvalidConfig("training.batch_size must be positive".into()));
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(Error::InvalidConfig(format!("training.learning_rate must be positive, got {}", self.learning_rate)));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExportSettings {
    pub output: String,
}

impl Default for ExportSettings {
    fn default() -> Self { Self { output: "rating-head.json".into() } }
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        self.embedding.validate()?;
        self.training.validate()
    }
}

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
        Ok(Self::for_env(&env_name))
    }

    pub fn for_env(env_name: &str) -> Self {
        let mut figment = Figment::from(Serialized::defaults(Settings::default())).merge(Toml::file("config.toml"));
        match env_name {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));
        Self { figment }
    }

    pub fn get<T>(&self, key: &str) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| Error::InvalidConfig(format!("Failed to get '{key}': {e}")))
    }

    /// Extract and validate the full typed settings.
    pub fn settings(&self) -> Result<Settings> {
        let settings: Settings = self
            .figment
            .extract()
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}
