use std::env;
use std::fmt;

pub const DEFAULT_DB_URL: &str = "sqlite:quiz.sqlite3";

/// Deployment flavour; selects the log format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    #[must_use]
    pub fn is_development(self) -> bool {
        matches!(self, Self::Development)
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Some(Self::Development),
            "production" | "prod" => Some(Self::Production),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidEnvironment { raw: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidEnvironment { raw } => write!(
                f,
                "invalid QUIZ_ENV value: {raw} (expected development or production)"
            ),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Settings read from the process environment; command-line flags override them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub db_url: String,
    pub user_id: Option<String>,
    pub environment: Environment,
}

impl AppConfig {
    /// Read `QUIZ_DB_URL`, `QUIZ_USER_ID` and `QUIZ_ENV`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvironment` for an unrecognised `QUIZ_ENV`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let non_blank = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let environment = match non_blank("QUIZ_ENV") {
            Some(raw) => Environment::parse(&raw).ok_or(ConfigError::InvalidEnvironment { raw })?,
            None => Environment::default(),
        };

        Ok(Self {
            db_url: non_blank("QUIZ_DB_URL").unwrap_or_else(|| DEFAULT_DB_URL.to_string()),
            user_id: non_blank("QUIZ_USER_ID"),
            environment,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.db_url, DEFAULT_DB_URL);
        assert_eq!(config.user_id, None);
        assert_eq!(config.environment, Environment::Development);
    }

    #[test]
    fn reads_all_variables() {
        let config = AppConfig::from_lookup(lookup(&[
            ("QUIZ_DB_URL", "sqlite:/tmp/q.sqlite3"),
            ("QUIZ_USER_ID", "learner-7"),
            ("QUIZ_ENV", "Production"),
        ]))
        .unwrap();
        assert_eq!(config.db_url, "sqlite:/tmp/q.sqlite3");
        assert_eq!(config.user_id.as_deref(), Some("learner-7"));
        assert_eq!(config.environment, Environment::Production);
    }

    #[test]
    fn blank_values_count_as_unset() {
        let config = AppConfig::from_lookup(lookup(&[("QUIZ_USER_ID", "  ")])).unwrap();
        assert_eq!(config.user_id, None);
    }

    #[test]
    fn unknown_environment_is_rejected() {
        let err = AppConfig::from_lookup(lookup(&[("QUIZ_ENV", "staging")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvironment { raw } if raw == "staging"));
    }
}
