//! `typeck.toml`: settings for the checker and its logging.

use std::path::Path;
use std::sync::Once;

use nova_types::DEFAULT_INFERENCE_STEP_LIMIT;
use schemars::schema::RootSchema;
use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// First Java release with `var` (JEP 286).
const VAR_RELEASE: u16 = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct TypeckConfig {
    /// Java release the checked sources target (`--release`).
    #[serde(default = "TypeckConfig::default_release", alias = "language_level")]
    #[schemars(range(min = 8))]
    pub release: u16,

    /// Infer the type of `var` locals. When disabled, or when `release` predates `var`, every
    /// `var` declaration is reported.
    #[serde(default = "TypeckConfig::default_var_inference")]
    pub var_inference: bool,

    /// Maximum number of constraint reduction steps per inference session.
    #[serde(default = "TypeckConfig::default_inference_step_limit")]
    #[schemars(range(min = 1))]
    pub inference_step_limit: usize,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl TypeckConfig {
    fn default_release() -> u16 {
        21
    }

    fn default_var_inference() -> bool {
        true
    }

    fn default_inference_step_limit() -> usize {
        DEFAULT_INFERENCE_STEP_LIMIT
    }

    pub fn load_from_str(text: &str) -> Result<Self, ConfigError> {
        let config: TypeckConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::load_from_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.release < 8 {
            return Err(ConfigError::Invalid(format!(
                "release {} is not supported (minimum is 8)",
                self.release
            )));
        }
        if self.inference_step_limit == 0 {
            return Err(ConfigError::Invalid(
                "inference_step_limit must be at least 1".to_owned(),
            ));
        }
        Ok(())
    }

    /// Whether `var` declarations get an inferred type.
    pub fn var_enabled(&self) -> bool {
        self.var_inference && self.release >= VAR_RELEASE
    }
}

impl Default for TypeckConfig {
    fn default() -> Self {
        Self {
            release: Self::default_release(),
            var_inference: Self::default_var_inference(),
            inference_step_limit: Self::default_inference_step_limit(),
            logging: LoggingConfig::default(),
        }
    }
}

/// JSON schema for `typeck.toml`.
#[must_use]
pub fn json_schema() -> RootSchema {
    schema_for!(TypeckConfig)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// A level (`info`, `debug`, ...) or a full `EnvFilter` directive string.
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,

    /// Emit logs as JSON lines.
    #[serde(default)]
    pub json: bool,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_owned()
    }

    pub(crate) fn normalize_level_directives(input: &str) -> String {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Self::default_level();
        }

        match trimmed.to_ascii_lowercase().as_str() {
            "trace" => "trace".to_owned(),
            "debug" => "debug".to_owned(),
            "info" => "info".to_owned(),
            "warn" | "warning" => "warn".to_owned(),
            "error" => "error".to_owned(),
            _ => trimmed.to_owned(),
        }
    }

    fn config_env_filter(&self) -> tracing_subscriber::EnvFilter {
        let directives = Self::normalize_level_directives(&self.level);
        tracing_subscriber::EnvFilter::try_new(directives).unwrap_or_else(|_| {
            tracing_subscriber::EnvFilter::default()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into())
        })
    }

    /// The effective filter: the configured level, with `RUST_LOG` merged in when set.
    pub fn env_filter(&self) -> tracing_subscriber::EnvFilter {
        let env_directives = std::env::var("RUST_LOG")
            .ok()
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty());

        let config_directives = Self::normalize_level_directives(&self.level);

        match env_directives {
            Some(env_directives) => {
                let combined = format!("{config_directives},{env_directives}");
                tracing_subscriber::EnvFilter::try_new(combined)
                    .or_else(|_| tracing_subscriber::EnvFilter::try_new(env_directives))
                    .unwrap_or_else(|_| self.config_env_filter())
            }
            None => self.config_env_filter(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
            json: false,
        }
    }
}

static TRACING_INIT: Once = Once::new();

/// Installs the global `tracing` subscriber (stderr, optionally JSON). Later calls are no-ops, as
/// is installing over a subscriber set up by the host application.
pub fn init_tracing(config: &LoggingConfig) {
    TRACING_INIT.call_once(|| {
        let builder = tracing_subscriber::fmt()
            .with_env_filter(config.env_filter())
            .with_writer(std::io::stderr);
        let result = if config.json {
            builder.json().try_init()
        } else {
            builder.try_init()
        };
        if let Err(err) = result {
            tracing::debug!(target: "nova.typeck", %err, "tracing subscriber already installed");
        }
    });
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse toml config: {0}")]
    Toml(String),
    #[error("invalid config: {0}")]
    Invalid(String),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::Toml(err.message().to_owned())
    }
}
