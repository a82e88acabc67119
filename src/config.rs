use serde::Deserialize;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::Error;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub environment: Environment,
    pub model: ModelConfig,
    pub dataset: DatasetConfig,
    pub text: TextLimits,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    pub model_path: PathBuf,
    pub max_features: usize,
    pub test_size: f64,
    pub random_state: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatasetConfig {
    pub path: PathBuf,
    pub text_column: String,
    pub sentiment_column: String,
}

/// Accepted comment/analysis text length, counted in characters after trimming.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct TextLimits {
    pub min_length: usize,
    pub max_length: usize,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
pub enum Environment {
    Development,
    Production,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("data/sentiment_model.bin"),
            max_features: 5000,
            test_size: 0.2,
            random_state: 42,
        }
    }
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/datasets/twitter_dataset.csv"),
            text_column: "text".into(),
            sentiment_column: "sentiment".into(),
        }
    }
}

impl Default for TextLimits {
    fn default() -> Self {
        Self {
            min_length: 3,
            max_length: 5000,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite://data/sentiment_analysis.db".into(),
            host: "0.0.0.0".into(),
            port: 5000,
            environment: Environment::Development,
            model: ModelConfig::default(),
            dataset: DatasetConfig::default(),
            text: TextLimits::default(),
        }
    }
}

impl Config {
    /// Builds the configuration from the process environment, falling back to
    /// defaults for anything unset.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        let config = Config {
            database_url: lookup("DATABASE_URL").unwrap_or(defaults.database_url),
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parse_var(&lookup, "PORT", defaults.port)?,
            environment: match lookup("ENVIRONMENT")
                .unwrap_or_else(|| "development".to_string())
                .to_lowercase()
                .as_str()
            {
                "production" => Environment::Production,
                _ => Environment::Development,
            },
            model: ModelConfig {
                model_path: lookup("MODEL_PATH")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.model.model_path),
                max_features: parse_var(&lookup, "MAX_FEATURES", defaults.model.max_features)?,
                test_size: parse_var(&lookup, "TEST_SIZE", defaults.model.test_size)?,
                random_state: parse_var(&lookup, "RANDOM_STATE", defaults.model.random_state)?,
            },
            dataset: DatasetConfig {
                path: lookup("DATASET_PATH")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.dataset.path),
                text_column: lookup("DATASET_TEXT_COLUMN").unwrap_or(defaults.dataset.text_column),
                sentiment_column: lookup("DATASET_SENTIMENT_COLUMN")
                    .unwrap_or(defaults.dataset.sentiment_column),
            },
            text: TextLimits {
                min_length: parse_var(&lookup, "MIN_TEXT_LENGTH", defaults.text.min_length)?,
                max_length: parse_var(&lookup, "MAX_TEXT_LENGTH", defaults.text.max_length)?,
            },
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), Error> {
        if !(self.model.test_size > 0.0 && self.model.test_size < 1.0) {
            return Err(Error::Config(format!(
                "TEST_SIZE must be between 0 and 1, got {}",
                self.model.test_size
            )));
        }
        if self.model.max_features == 0 {
            return Err(Error::Config("MAX_FEATURES must be positive".into()));
        }
        if self.text.min_length > self.text.max_length {
            return Err(Error::Config(
                "MIN_TEXT_LENGTH cannot exceed MAX_TEXT_LENGTH".into(),
            ));
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_var<F, T>(lookup: &F, key: &str, default: T) -> Result<T, Error>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| Error::Config(format!("{key} has an invalid value: {raw}"))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = Config::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.port, 5000);
        assert_eq!(config.model.max_features, 5000);
        assert_eq!(config.model.random_state, 42);
        assert_eq!(config.text.min_length, 3);
        assert_eq!(config.text.max_length, 5000);
        assert_eq!(config.environment, Environment::Development);
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("PORT", "8080"),
            ("ENVIRONMENT", "Production"),
            ("MAX_FEATURES", "100"),
            ("MODEL_PATH", "/tmp/model.bin"),
        ]))
        .unwrap();
        assert_eq!(config.bind_address(), "0.0.0.0:8080");
        assert_eq!(config.environment, Environment::Production);
        assert_eq!(config.model.max_features, 100);
        assert_eq!(config.model.model_path, PathBuf::from("/tmp/model.bin"));
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(matches!(
            Config::from_lookup(lookup_from(&[("PORT", "not-a-port")])),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            Config::from_lookup(lookup_from(&[("TEST_SIZE", "1.5")])),
            Err(Error::Config(_))
        ));
    }
}
