use crate::config::ConfigError;
use crate::survey::key::KeyError;
use crate::survey::scoring::ScoringError;
use crate::survey::table::TableError;
use crate::survey::ErrorKind;
use crate::telemetry::TelemetryError;
use std::fmt;

/// Top-level error for binaries built on the library.
#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Key(KeyError),
    Table(TableError),
    Scoring(ScoringError),
}

impl AppError {
    /// Failure class for library errors; `None` for process-level ones.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            AppError::Key(err) => Some(err.kind()),
            AppError::Table(err) => Some(err.kind()),
            AppError::Scoring(err) => Some(err.kind()),
            AppError::Config(_) => Some(ErrorKind::Configuration),
            AppError::Io(_) => Some(ErrorKind::Io),
            AppError::Telemetry(_) => None,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Key(err) => write!(f, "key error: {}", err),
            AppError::Table(err) => write!(f, "data error: {}", err),
            AppError::Scoring(err) => write!(f, "scoring error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Key(err) => Some(err),
            AppError::Table(err) => Some(err),
            AppError::Scoring(err) => Some(err),
        }
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<KeyError> for AppError {
    fn from(value: KeyError) -> Self {
        Self::Key(value)
    }
}

impl From<TableError> for AppError {
    fn from(value: TableError) -> Self {
        Self::Table(value)
    }
}

impl From<ScoringError> for AppError {
    fn from(value: ScoringError) -> Self {
        Self::Scoring(value)
    }
}
