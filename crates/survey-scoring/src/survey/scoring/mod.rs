mod method;
mod plan;

pub use method::ScoringMethod;

use super::key::{KeyError, KeyStore, ResponseBounds};
use super::table::{ResponseTable, TableError};
use super::ErrorKind;
use plan::ScalePlan;
use std::fmt;
use tracing::info;

/// Applies the bounded-scale reversal `(max + min) - value`.
pub fn reverse(value: f64, bounds: ResponseBounds) -> f64 {
    bounds.reverse(value)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreOptions {
    pub method: ScoringMethod,
    /// Set to `false` when reverse-coded items are already reversed in the data.
    pub reverse_score: bool,
    /// Bounds for keys persisted without them (legacy table-only keys).
    pub fallback_bounds: Option<ResponseBounds>,
}

impl Default for ScoreOptions {
    fn default() -> Self {
        Self {
            method: ScoringMethod::Average,
            reverse_score: true,
            fallback_bounds: None,
        }
    }
}

impl ScoreOptions {
    pub fn with_method(mut self, method: ScoringMethod) -> Self {
        self.method = method;
        self
    }

    pub fn with_reverse_score(mut self, reverse_score: bool) -> Self {
        self.reverse_score = reverse_score;
        self
    }

    pub fn with_fallback_bounds(mut self, bounds: ResponseBounds) -> Self {
        self.fallback_bounds = Some(bounds);
        self
    }
}

/// Key and data disagreed on a scale's item columns; the key was realigned
/// to the data and scoring carried on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaMismatch {
    pub scale: String,
    pub key_columns: usize,
    pub data_columns: usize,
    /// Key columns the data lacks; they no longer count toward any subscale.
    pub missing_from_data: Vec<String>,
    /// Data columns the key never mentions; they count toward nothing.
    pub unkeyed_in_data: Vec<String>,
}

impl fmt::Display for SchemaMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "scale '{}': key has {} columns, data has {}",
            self.scale, self.key_columns, self.data_columns
        )?;
        if !self.missing_from_data.is_empty() {
            write!(f, "; missing from data: {}", self.missing_from_data.join(", "))?;
        }
        if !self.unkeyed_in_data.is_empty() {
            write!(f, "; not in key: {}", self.unkeyed_in_data.join(", "))?;
        }
        Ok(())
    }
}

/// Copy of the input table with one column per scored subscale, plus any
/// realignments made along the way.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredSurveys {
    pub table: ResponseTable,
    pub mismatches: Vec<SchemaMismatch>,
}

impl ScoredSurveys {
    pub fn into_table(self) -> ResponseTable {
        self.table
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ScoringError {
    #[error("unknown scoring method '{0}'; expected 'average' or 'sum'")]
    UnknownMethod(String),
    #[error("scale '{scale}' has reverse-coded items but no response bounds; supply min and max")]
    MissingBounds { scale: String },
    #[error("column '{column}' row {row} holds non-numeric response '{value}'")]
    NonNumericResponse {
        column: String,
        row: usize,
        value: String,
    },
    #[error(transparent)]
    Key(#[from] KeyError),
    #[error(transparent)]
    Table(#[from] TableError),
}

impl ScoringError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ScoringError::UnknownMethod(_) | ScoringError::MissingBounds { .. } => {
                ErrorKind::Configuration
            }
            ScoringError::NonNumericResponse { .. } => ErrorKind::Data,
            ScoringError::Key(err) => err.kind(),
            ScoringError::Table(err) => err.kind(),
        }
    }
}

/// Scores `scales` in order against `data` using keys from `store`.
///
/// Every scale is loaded and checked before any score is computed, so an
/// error leaves nothing half-written. Scores are computed from the original
/// columns only; a subscale column that already exists is overwritten.
pub fn score_surveys<S>(
    store: &KeyStore,
    data: &ResponseTable,
    scales: &[S],
    options: &ScoreOptions,
) -> Result<ScoredSurveys, ScoringError>
where
    S: AsRef<str>,
{
    let mut plans = Vec::with_capacity(scales.len());
    let mut mismatches = Vec::new();
    for scale in scales {
        let (plan, mismatch) = ScalePlan::prepare(store, data, scale.as_ref(), options)?;
        mismatches.extend(mismatch);
        plans.push(plan);
    }

    let mut table = data.clone();
    for plan in &plans {
        for subscale in plan.key.subscales() {
            let scores = plan.score(data, subscale, options);
            table.set_column(&subscale.name, scores)?;
        }
        info!(
            scale = plan.key.scale(),
            subscales = plan.key.subscales().len(),
            respondents = data.len(),
            method = %options.method,
            reverse_score = options.reverse_score,
            "scale scored"
        );
    }

    Ok(ScoredSurveys { table, mismatches })
}
