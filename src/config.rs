use anyhow::{Context, Result};
use config::{Config, ConfigError, Environment, File as ConfigFile};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::env;
use std::fmt;
use std::str::FromStr;

use crate::error::AnalysisError;

pub type Number = f64;

pub const EPSILON: Number = 1e-9;

/// Tokens must be strictly longer than this many characters to be counted.
pub const MIN_TOKEN_CHARS: usize = 2;

pub const DEFAULT_THRESHOLD: Number = 0.7;
pub const DEFAULT_EXACT_THRESHOLD: Number = 0.99;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
    Markdown,
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            "markdown" | "md" => Ok(Self::Markdown),
            other => anyhow::bail!("Unknown output format: {}", other),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Text => "text",
            Self::Json => "json",
            Self::Markdown => "markdown",
        };
        f.write_str(name)
    }
}

#[derive(Deserialize, Default)]
pub struct QuizdupConfig {
    pub threshold: Option<Number>,
    pub exact_threshold: Option<Number>,
    pub parallel: Option<bool>,
    pub format: Option<String>,
}

/// Missing keys are `None`; a present key with a bad value is an error.
fn optional<T: DeserializeOwned>(config: &Config, key: &str) -> Result<Option<T>, ConfigError> {
    match config.get(key) {
        Ok(value) => Ok(Some(value)),
        Err(ConfigError::NotFound(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

impl QuizdupConfig {
    pub fn try_from(config: &Config) -> Result<Self, ConfigError> {
        Ok(QuizdupConfig {
            threshold: optional(config, "threshold")?,
            exact_threshold: optional(config, "exact_threshold")?,
            parallel: optional(config, "parallel")?,
            format: optional(config, "format")?,
        })
    }
}

/// Values given on the command line.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub threshold: Option<Number>,
    pub exact_threshold: Option<Number>,
    pub format: Option<OutputFormat>,
    pub parallel: bool,
}

/// Resolved settings for one analysis run.
#[derive(Debug, Clone)]
pub struct Settings {
    pub threshold: Number,
    pub exact_threshold: Number,
    pub parallel: bool,
    pub format: OutputFormat,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            exact_threshold: DEFAULT_EXACT_THRESHOLD,
            parallel: false,
            format: OutputFormat::Text,
        }
    }
}

impl Settings {
    /// Layers `quizdup_config.*` in the working directory under `QUIZDUP_*`
    /// environment variables, falling back to defaults. Thresholds are not
    /// range-checked here so that command-line overrides can still replace them.
    pub fn load() -> Result<Self> {
        let config = Config::builder()
            .add_source(ConfigFile::with_name("quizdup_config").required(false))
            .add_source(Environment::with_prefix("QUIZDUP"))
            .build()
            .context("Failed to read quizdup configuration")?;

        let file_config = QuizdupConfig::try_from(&config)?;
        Self::from_config(file_config)
    }

    pub fn from_config(file_config: QuizdupConfig) -> Result<Self> {
        let defaults = Self::default();

        let format = match file_config.format {
            Some(name) => name.parse()?,
            None => defaults.format,
        };

        Ok(Self {
            threshold: file_config.threshold.unwrap_or(defaults.threshold),
            exact_threshold: file_config
                .exact_threshold
                .unwrap_or(defaults.exact_threshold),
            parallel: file_config.parallel.unwrap_or(defaults.parallel),
            format,
        })
    }

    /// Applies command-line values on top of file and environment settings,
    /// then checks the thresholds that end up in effect.
    pub fn merge(mut self, overrides: Overrides) -> Result<Self, AnalysisError> {
        if let Some(threshold) = overrides.threshold {
            self.threshold = threshold;
        }
        if let Some(exact_threshold) = overrides.exact_threshold {
            self.exact_threshold = exact_threshold;
        }
        if let Some(format) = overrides.format {
            self.format = format;
        }
        self.parallel |= overrides.parallel;
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), AnalysisError> {
        validate_threshold(self.threshold)?;
        validate_threshold(self.exact_threshold)
    }

    pub fn print_config(&self) {
        println!("threshold={}", self.threshold);
        println!("exact_threshold={}", self.exact_threshold);
        println!("parallel={}", self.parallel);
        println!("format={}", self.format);
    }
}

/// Thresholds live in `[0.0, 1.0]`; NaN is rejected.
pub fn validate_threshold(threshold: Number) -> Result<(), AnalysisError> {
    if (0.0..=1.0).contains(&threshold) {
        Ok(())
    } else {
        Err(AnalysisError::InvalidThreshold(threshold))
    }
}

pub fn verbose_from_env() -> bool {
    env::var("QUIZDUP_VERBOSE").unwrap_or_else(|_| "false".to_string()) == "true"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_original_tool() {
        let settings = Settings::from_config(QuizdupConfig::default()).unwrap();
        assert_eq!(settings.threshold, 0.7);
        assert_eq!(settings.exact_threshold, 0.99);
        assert!(!settings.parallel);
        assert_eq!(settings.format, OutputFormat::Text);
    }

    #[test]
    fn file_values_override_defaults() {
        let settings = Settings::from_config(QuizdupConfig {
            threshold: Some(0.5),
            exact_threshold: None,
            parallel: Some(true),
            format: Some("MD".to_string()),
        })
        .unwrap();
        assert_eq!(settings.threshold, 0.5);
        assert!(settings.parallel);
        assert_eq!(settings.format, OutputFormat::Markdown);
    }

    #[test]
    fn rejects_out_of_range_thresholds() {
        assert!(validate_threshold(0.0).is_ok());
        assert!(validate_threshold(1.0).is_ok());
        assert!(validate_threshold(-0.01).is_err());
        assert!(validate_threshold(1.01).is_err());
        assert!(validate_threshold(Number::NAN).is_err());

        let bad = Settings::from_config(QuizdupConfig {
            exact_threshold: Some(2.0),
            ..Default::default()
        })
        .unwrap();
        assert!(bad.validate().is_err());
        assert!(bad.merge(Overrides::default()).is_err());
    }

    #[test]
    fn command_line_overrides_out_of_range_file_values() {
        let from_file = Settings::from_config(QuizdupConfig {
            threshold: Some(7.0),
            ..Default::default()
        })
        .unwrap();
        let merged = from_file
            .merge(Overrides {
                threshold: Some(0.5),
                format: Some(OutputFormat::Json),
                parallel: true,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(merged.threshold, 0.5);
        assert_eq!(merged.format, OutputFormat::Json);
        assert!(merged.parallel);
    }

    #[test]
    fn merged_override_is_validated() {
        let settings = Settings::default().merge(Overrides {
            threshold: Some(1.5),
            ..Default::default()
        });
        assert!(matches!(settings, Err(AnalysisError::InvalidThreshold(t)) if t == 1.5));
    }

    #[test]
    fn malformed_config_value_is_an_error() {
        let config = Config::builder()
            .set_override("threshold", "not-a-number")
            .unwrap()
            .build()
            .unwrap();
        assert!(QuizdupConfig::try_from(&config).is_err());

        let config = Config::builder()
            .set_override("parallel", "sometimes")
            .unwrap()
            .build()
            .unwrap();
        assert!(QuizdupConfig::try_from(&config).is_err());
    }

    #[test]
    fn absent_config_values_are_none() {
        let config = Config::builder()
            .set_override("threshold", "0.8")
            .unwrap()
            .build()
            .unwrap();
        let file_config = QuizdupConfig::try_from(&config).unwrap();
        assert_eq!(file_config.threshold, Some(0.8));
        assert_eq!(file_config.exact_threshold, None);
        assert_eq!(file_config.parallel, None);
        assert_eq!(file_config.format, None);
    }

    #[test]
    fn unknown_format_is_an_error() {
        assert!("yaml".parse::<OutputFormat>().is_err());
        assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
    }
}
