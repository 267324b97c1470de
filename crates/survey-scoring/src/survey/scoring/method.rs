use super::ScoringError;
use std::fmt;
use std::str::FromStr;

/// How item values collapse into one subscale score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScoringMethod {
    #[default]
    Average,
    Sum,
}

impl ScoringMethod {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Average => "average",
            Self::Sum => "sum",
        }
    }

    /// An empty selection has no mean; its sum is zero.
    pub fn reduce(self, values: &[f64]) -> Option<f64> {
        let total: f64 = values.iter().sum();
        match self {
            Self::Sum => Some(total),
            Self::Average if values.is_empty() => None,
            Self::Average => Some(total / values.len() as f64),
        }
    }
}

impl FromStr for ScoringMethod {
    type Err = ScoringError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "average" | "mean" => Ok(Self::Average),
            "sum" => Ok(Self::Sum),
            _ => Err(ScoringError::UnknownMethod(value.to_string())),
        }
    }
}

impl fmt::Display for ScoringMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
