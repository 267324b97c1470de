use super::{SchemaMismatch, ScoreOptions, ScoringError};
use crate::survey::key::{KeyStore, Polarity, ResponseBounds, ScaleKey, SubscaleRow};
use crate::survey::table::{Cell, ResponseTable};
use std::collections::{BTreeSet, HashSet};
use tracing::warn;

/// A scale's key aligned to the response table, ready to score.
#[derive(Debug)]
pub(crate) struct ScalePlan {
    pub(crate) key: ScaleKey,
    /// Table column index for each key column.
    data_indices: Vec<usize>,
    /// Bounds to reverse with, or `None` when reversal is switched off.
    reversal: Option<ResponseBounds>,
}

impl ScalePlan {
    /// Validates one scale against `data` without producing any scores.
    pub(crate) fn prepare(
        store: &KeyStore,
        data: &ResponseTable,
        scale: &str,
        options: &ScoreOptions,
    ) -> Result<(Self, Option<SchemaMismatch>), ScoringError> {
        let key = store.load(scale)?;

        let prefix = format!("{scale}_");
        let (data_indices, data_columns): (Vec<usize>, Vec<&str>) = data
            .columns()
            .iter()
            .enumerate()
            .filter(|(_, column)| column.starts_with(&prefix))
            .map(|(index, column)| (index, column.as_str()))
            .unzip();

        let mismatch = if key.matches_columns(&data_columns) {
            None
        } else {
            let mismatch = SchemaMismatch::between(&key, &data_columns);
            warn!(
                scale,
                key_columns = mismatch.key_columns,
                data_columns = mismatch.data_columns,
                missing_from_data = ?mismatch.missing_from_data,
                unkeyed_in_data = ?mismatch.unkeyed_in_data,
                "key and data columns differ; realigning key to data"
            );
            Some(mismatch)
        };
        let key = key.realigned_to(&data_columns);

        let reversal = if options.reverse_score {
            let bounds = key.bounds().or(options.fallback_bounds);
            if bounds.is_none() && key.has_reversed_items() {
                return Err(ScoringError::MissingBounds {
                    scale: scale.to_string(),
                });
            }
            bounds
        } else {
            None
        };

        let plan = Self {
            key,
            data_indices,
            reversal,
        };
        plan.check_numeric(data)?;
        Ok((plan, mismatch))
    }

    fn check_numeric(&self, data: &ResponseTable) -> Result<(), ScoringError> {
        let used: BTreeSet<usize> = self
            .key
            .subscales()
            .iter()
            .flat_map(|row| row.scored().map(|(position, _)| self.data_indices[position]))
            .collect();

        for (row_index, record) in data.rows().iter().enumerate() {
            for index in &used {
                if let Err(value) = record[*index].response() {
                    return Err(ScoringError::NonNumericResponse {
                        column: data.columns()[*index].clone(),
                        row: row_index + 1,
                        value: value.trim().to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Scores one subscale for every respondent. The table is only read, so
    /// an item shared by several subscales is reversed afresh for each.
    pub(crate) fn score(
        &self,
        data: &ResponseTable,
        subscale: &SubscaleRow,
        options: &ScoreOptions,
    ) -> Vec<Cell> {
        let selected: Vec<(usize, Polarity)> = subscale
            .scored()
            .map(|(position, polarity)| (self.data_indices[position], polarity))
            .collect();

        data.rows()
            .iter()
            .map(|record| {
                let values = selected
                    .iter()
                    .map(|(index, polarity)| {
                        let raw = record[*index].as_number()?;
                        Some(match (polarity, self.reversal) {
                            (Polarity::Reversed, Some(bounds)) => bounds.reverse(raw),
                            _ => raw,
                        })
                    })
                    .collect::<Option<Vec<f64>>>();
                Cell::from(values.and_then(|values| options.method.reduce(&values)))
            })
            .collect()
    }
}

impl SchemaMismatch {
    fn between(key: &ScaleKey, data_columns: &[&str]) -> Self {
        let in_data: HashSet<&str> = data_columns.iter().copied().collect();
        let in_key: HashSet<&str> = key.columns().iter().map(String::as_str).collect();

        Self {
            scale: key.scale().to_string(),
            key_columns: key.columns().len(),
            data_columns: data_columns.len(),
            missing_from_data: key
                .columns()
                .iter()
                .filter(|column| !in_data.contains(column.as_str()))
                .cloned()
                .collect(),
            unkeyed_in_data: data_columns
                .iter()
                .filter(|column| !in_key.contains(*column))
                .map(|column| column.to_string())
                .collect(),
        }
    }
}
