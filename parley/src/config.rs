//! Runtime configuration, loaded from environment variables at startup.
//!
//! Command-line flags are applied on top in `main`.

use parley_core::prompt::DEFAULT_HISTORY_WINDOW;
use parley_core::{SessionConfig, Variant};
use thiserror::Error;

/// Configuration errors. All of them abort startup.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error(
        "GEMINI_API_KEY environment variable not set.\n\
         Please set it in a .env file or with: export GEMINI_API_KEY=your_key_here"
    )]
    MissingApiKey,

    #[error("{key}='{value}' is not a valid value ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: &'static str,
    },
}

/// Runtime configuration for the front-end.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Gemini credential (`GEMINI_API_KEY`, falling back to `GOOGLE_API_KEY`).
    pub api_key: Option<String>,

    /// Model override (`PARLEY_MODEL`). When unset each variant uses its own default.
    pub model: Option<String>,

    /// Transcript messages sent to the echo persona as context (`PARLEY_HISTORY_WINDOW`).
    pub history_window: usize,

    pub temperature: Option<f32>,

    pub max_output_tokens: Option<usize>,

    /// `tracing` filter string, e.g. `"info"` or `"parley_core=debug"`.
    pub log_level: String,

    /// Log file used while the TUI owns the terminal (`PARLEY_LOG_FILE`).
    pub log_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            model: None,
            history_window: DEFAULT_HISTORY_WINDOW,
            temperature: None,
            max_output_tokens: None,
            log_level: "info".to_string(),
            log_file: "parley.log".to_string(),
        }
    }
}

impl Config {
    /// Build [`Config`] from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build [`Config`] from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let history_window = parse_var(&var, "PARLEY_HISTORY_WINDOW")?
            .unwrap_or(defaults.history_window);
        if history_window == 0 {
            return Err(ConfigError::Invalid {
                key: "PARLEY_HISTORY_WINDOW",
                value: "0".to_string(),
                reason: "must be at least 1",
            });
        }

        let temperature: Option<f32> = parse_var(&var, "PARLEY_TEMPERATURE")?;
        if let Some(t) = temperature {
            if !(0.0..=2.0).contains(&t) {
                return Err(ConfigError::Invalid {
                    key: "PARLEY_TEMPERATURE",
                    value: t.to_string(),
                    reason: "must be between 0.0 and 2.0",
                });
            }
        }

        Ok(Self {
            api_key: gemini::API_KEY_VARS.iter().find_map(|key| var(*key)),
            model: var("PARLEY_MODEL"),
            history_window,
            temperature,
            max_output_tokens: parse_var(&var, "PARLEY_MAX_TOKENS")?,
            log_level: var("PARLEY_LOG").unwrap_or(defaults.log_level),
            log_file: var("PARLEY_LOG_FILE").unwrap_or(defaults.log_file),
        })
    }

    /// The credential, or [`ConfigError::MissingApiKey`].
    pub fn api_key(&self) -> Result<&str, ConfigError> {
        self.api_key.as_deref().ok_or(ConfigError::MissingApiKey)
    }

    /// Model for `variant`: the configured override, else the variant's default.
    pub fn model_for(&self, variant: Variant) -> String {
        self.model
            .clone()
            .unwrap_or_else(|| variant.default_model().to_string())
    }

    /// Session settings for `variant`.
    pub fn session_config(&self, variant: Variant) -> SessionConfig {
        let mut config = SessionConfig::new(variant)
            .with_history_window(self.history_window)
            .with_model(self.model_for(variant));
        if let Some(t) = self.temperature {
            config = config.with_temperature(t);
        }
        if let Some(tokens) = self.max_output_tokens {
            config = config.with_max_output_tokens(tokens);
        }
        config
    }
}

// ── private helpers ──────────────────────────────────────────────────────────

fn parse_var<T, F>(var: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid {
                key,
                value,
                reason: "expected a number",
            }),
    }
}
