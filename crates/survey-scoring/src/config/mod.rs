use crate::survey::scoring::{ScoreOptions, ScoringMethod};
use std::env;
use std::fmt;
use std::path::PathBuf;

/// Top-level configuration for key building and scoring runs.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub keys: KeyStoreConfig,
    pub scoring: ScoringConfig,
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let keys_dir = env::var("SURVEY_KEYS_DIR").unwrap_or_else(|_| "keys".to_string());

        let method = env::var("SURVEY_SCORE_METHOD")
            .unwrap_or_else(|_| "average".to_string())
            .parse::<ScoringMethod>()
            .map_err(|_| ConfigError::InvalidMethod)?;

        let reverse_score = match env::var("SURVEY_REVERSE_SCORE") {
            Ok(raw) => parse_flag(&raw).ok_or(ConfigError::InvalidReverseScore)?,
            Err(_) => true,
        };

        let log_level = env::var("SURVEY_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            keys: KeyStoreConfig {
                dir: PathBuf::from(keys_dir),
            },
            scoring: ScoringConfig {
                method,
                reverse_score,
            },
            telemetry: TelemetryConfig { log_level },
        })
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

/// Where scale keys are read from and written to.
#[derive(Debug, Clone)]
pub struct KeyStoreConfig {
    pub dir: PathBuf,
}

/// Defaults applied to scoring runs unless overridden per call.
#[derive(Debug, Clone, Copy)]
pub struct ScoringConfig {
    pub method: ScoringMethod,
    pub reverse_score: bool,
}

impl ScoringConfig {
    pub fn options(&self) -> ScoreOptions {
        ScoreOptions::default()
            .with_method(self.method)
            .with_reverse_score(self.reverse_score)
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidMethod,
    InvalidReverseScore,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidMethod => {
                write!(f, "SURVEY_SCORE_METHOD must be 'average' or 'sum'")
            }
            ConfigError::InvalidReverseScore => {
                write!(f, "SURVEY_REVERSE_SCORE must be true or false")
            }
        }
    }
}

impl std::error::Error for ConfigError {}
