//! Service configuration, read once from the environment at start-up.

use std::path::PathBuf;

use thiserror::Error;

pub const DEFAULT_LLM_MODEL: &str = "openai/gpt-4o";
pub const DEFAULT_DATABASE_URL: &str = "sqlite://suhail.db?mode=rwc";
pub const DEFAULT_HISTORICAL_DATA_PATH: &str = "data/test_historical.xlsx";
pub const DEFAULT_STT_MODEL: &str = "whisper-1";
pub const DEFAULT_PASSWORD_ITERATIONS: u32 = 100_000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub openrouter_api_key: String,
    pub llm_model: String,
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_ttl_hours: i64,
    pub password_iterations: u32,
    /// Seeds an `admin` account at start-up when set.
    pub admin_password: Option<String>,
    pub historical_data_path: PathBuf,
    pub upload_dir: PathBuf,
    /// Speech-to-text is disabled without a key.
    pub openai_api_key: Option<String>,
    pub stt_model: String,
    /// Company research is disabled unless both are set.
    pub google_api_key: Option<String>,
    pub google_cse_id: Option<String>,
    pub host: String,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from any key lookup; empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required =
            |key: &str| get(key).ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()));

        Ok(Self {
            openrouter_api_key: required("OPENROUTER_API_KEY")?,
            llm_model: get("LLM_MODEL").unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string()),
            database_url: get("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            jwt_secret: required("JWT_SECRET")?,
            jwt_ttl_hours: parse_or(get("JWT_TTL_HOURS"), "JWT_TTL_HOURS", 24)?,
            password_iterations: parse_or(
                get("PASSWORD_ITERATIONS"),
                "PASSWORD_ITERATIONS",
                DEFAULT_PASSWORD_ITERATIONS,
            )?,
            admin_password: get("ADMIN_PASSWORD"),
            historical_data_path: get("HISTORICAL_DATA_PATH")
                .unwrap_or_else(|| DEFAULT_HISTORICAL_DATA_PATH.to_string())
                .into(),
            upload_dir: get("UPLOAD_DIR").unwrap_or_else(|| "uploads".to_string()).into(),
            openai_api_key: get("OPENAI_API_KEY"),
            stt_model: get("STT_MODEL").unwrap_or_else(|| DEFAULT_STT_MODEL.to_string()),
            google_api_key: get("GOOGLE_API_KEY"),
            google_cse_id: get("GOOGLE_CSE_ID"),
            host: get("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(get("PORT"), "PORT", 5000)?,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T>(value: Option<String>, key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidValue(key.to_string(), e.to_string())),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn applies_defaults() {
        let config =
            Config::from_lookup(lookup(&[("OPENROUTER_API_KEY", "or-key"), ("JWT_SECRET", "s3cret")]))
                .unwrap();

        assert_eq!(config.llm_model, DEFAULT_LLM_MODEL);
        assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(config.jwt_ttl_hours, 24);
        assert_eq!(config.stt_model, "whisper-1");
        assert_eq!(config.bind_address(), "0.0.0.0:5000");
        assert!(config.openai_api_key.is_none());
        assert!(config.google_cse_id.is_none());
    }

    #[test]
    fn requires_api_key_and_secret() {
        let err = Config::from_lookup(lookup(&[("JWT_SECRET", "s3cret")])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref k) if k == "OPENROUTER_API_KEY"));

        let err = Config::from_lookup(lookup(&[("OPENROUTER_API_KEY", "k"), ("JWT_SECRET", "  ")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref k) if k == "JWT_SECRET"));
    }

    #[test]
    fn rejects_bad_port() {
        let err = Config::from_lookup(lookup(&[
            ("OPENROUTER_API_KEY", "k"),
            ("JWT_SECRET", "s"),
            ("PORT", "eighty"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(ref k, _) if k == "PORT"));
    }
}
