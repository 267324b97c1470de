use super::domain::{Polarity, ResponseBounds};
use std::collections::{HashMap, HashSet};

/// One subscale's polarity for every column of its scale key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscaleRow {
    pub name: String,
    pub polarities: Vec<Polarity>,
}

impl SubscaleRow {
    /// Column positions that contribute to this subscale, with their polarity.
    pub fn scored(&self) -> impl Iterator<Item = (usize, Polarity)> + '_ {
        self.polarities
            .iter()
            .enumerate()
            .filter(|(_, polarity)| polarity.is_scored())
            .map(|(index, polarity)| (index, *polarity))
    }

    pub fn has_reversed_items(&self) -> bool {
        self.polarities.contains(&Polarity::Reversed)
    }
}

/// Normalized scoring key for one scale: subscale rows over item columns,
/// plus the response bounds used for reversal when known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScaleKey {
    scale: String,
    columns: Vec<String>,
    subscales: Vec<SubscaleRow>,
    bounds: Option<ResponseBounds>,
}

impl ScaleKey {
    /// Assembles a key, rejecting shapes that would break column alignment.
    pub(crate) fn from_parts(
        scale: String,
        columns: Vec<String>,
        subscales: Vec<SubscaleRow>,
        bounds: Option<ResponseBounds>,
    ) -> Result<Self, String> {
        if columns.is_empty() {
            return Err("key has no item columns".to_string());
        }
        if subscales.is_empty() {
            return Err("key has no subscale rows".to_string());
        }

        let mut seen = HashSet::new();
        if let Some(duplicate) = columns.iter().find(|column| !seen.insert(column.as_str())) {
            return Err(format!("column '{duplicate}' appears more than once"));
        }

        let mut seen = HashSet::new();
        for row in &subscales {
            if !seen.insert(row.name.as_str()) {
                return Err(format!("subscale '{}' appears more than once", row.name));
            }
            if row.polarities.len() != columns.len() {
                return Err(format!(
                    "subscale '{}' has {} values for {} columns",
                    row.name,
                    row.polarities.len(),
                    columns.len()
                ));
            }
        }

        Ok(Self {
            scale,
            columns,
            subscales,
            bounds,
        })
    }

    pub fn scale(&self) -> &str {
        &self.scale
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn subscales(&self) -> &[SubscaleRow] {
        &self.subscales
    }

    pub fn subscale_names(&self) -> impl Iterator<Item = &str> {
        self.subscales.iter().map(|row| row.name.as_str())
    }

    pub fn subscale(&self, name: &str) -> Option<&SubscaleRow> {
        self.subscales.iter().find(|row| row.name == name)
    }

    pub fn bounds(&self) -> Option<ResponseBounds> {
        self.bounds
    }

    pub fn with_bounds(mut self, bounds: ResponseBounds) -> Self {
        self.bounds = Some(bounds);
        self
    }

    pub fn polarity(&self, subscale: &str, column: &str) -> Option<Polarity> {
        let index = self.columns.iter().position(|candidate| candidate == column)?;
        self.subscale(subscale).map(|row| row.polarities[index])
    }

    pub fn has_reversed_items(&self) -> bool {
        self.subscales.iter().any(SubscaleRow::has_reversed_items)
    }

    /// True when the key covers exactly the given columns, in any order.
    pub fn matches_columns(&self, data_columns: &[&str]) -> bool {
        if self.columns.len() != data_columns.len() {
            return false;
        }
        let expected: HashSet<&str> = self.columns.iter().map(String::as_str).collect();
        data_columns.iter().all(|column| expected.contains(column))
    }

    /// Reindexes the key onto `data_columns`. Columns the key does not know
    /// get `Excluded` in every row; key columns missing from the data drop out.
    pub fn realigned_to(&self, data_columns: &[&str]) -> Self {
        let positions: HashMap<&str, usize> = self
            .columns
            .iter()
            .enumerate()
            .map(|(index, column)| (column.as_str(), index))
            .collect();

        let subscales = self
            .subscales
            .iter()
            .map(|row| SubscaleRow {
                name: row.name.clone(),
                polarities: data_columns
                    .iter()
                    .map(|column| {
                        positions
                            .get(column)
                            .map_or(Polarity::Excluded, |index| row.polarities[*index])
                    })
                    .collect(),
            })
            .collect();

        Self {
            scale: self.scale.clone(),
            columns: data_columns.iter().map(|column| column.to_string()).collect(),
            subscales,
            bounds: self.bounds,
        }
    }
}
