use super::ErrorKind;
use std::collections::HashSet;
use std::fmt;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

/// Single value in a response table.
///
/// Cells read from a file are kept as `Text` holding the source field, so
/// columns the scorer never touches are written back unchanged. Numbers are
/// read out of the text only when a cell is scored.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Missing,
    Number(f64),
    Text(String),
}

impl Cell {
    /// Blank and `NA`/`NaN`/`N/A` cells are missing; finite numbers are
    /// numeric; everything else is kept as text.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if is_missing_marker(trimmed) {
            return Self::Missing;
        }

        match trimmed.parse::<f64>() {
            Ok(value) if value.is_finite() => Self::Number(value),
            _ => Self::Text(trimmed.to_string()),
        }
    }

    /// Field exactly as it appeared in the source; empty fields are missing.
    pub fn verbatim(raw: &str) -> Self {
        if raw.is_empty() {
            Self::Missing
        } else {
            Self::Text(raw.to_string())
        }
    }

    /// Reads the cell as a response: `Ok(None)` when missing, `Err` with the
    /// offending text when it holds something other than a number.
    pub fn response(&self) -> Result<Option<f64>, &str> {
        match self {
            Self::Missing => Ok(None),
            Self::Number(value) => Ok(Some(*value)),
            Self::Text(raw) => {
                let trimmed = raw.trim();
                if is_missing_marker(trimmed) {
                    return Ok(None);
                }
                match trimmed.parse::<f64>() {
                    Ok(value) if value.is_finite() => Ok(Some(value)),
                    _ => Err(raw.as_str()),
                }
            }
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        self.response().ok().flatten()
    }

    pub fn is_missing(&self) -> bool {
        matches!(self.response(), Ok(None))
    }
}

fn is_missing_marker(trimmed: &str) -> bool {
    trimmed.is_empty()
        || ["na", "nan", "n/a"]
            .iter()
            .any(|marker| trimmed.eq_ignore_ascii_case(marker))
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<Option<f64>> for Cell {
    fn from(value: Option<f64>) -> Self {
        value.map_or(Self::Missing, Self::Number)
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => Ok(()),
            Self::Number(value) => write!(f, "{value}"),
            Self::Text(text) => f.write_str(text),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TableError {
    #[error("response table {} could not be accessed: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid response table: {0}")]
    Csv(#[from] csv::Error),
    #[error("column '{column}' appears more than once")]
    DuplicateColumn { column: String },
    #[error("row {row} has {found} values, expected {expected}")]
    RowLength {
        row: usize,
        expected: usize,
        found: usize,
    },
}

impl TableError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TableError::Io { .. } => ErrorKind::Io,
            TableError::Csv(err) if err.is_io_error() => ErrorKind::Io,
            TableError::Csv(_)
            | TableError::DuplicateColumn { .. }
            | TableError::RowLength { .. } => ErrorKind::Data,
        }
    }
}

/// Respondent-by-column table of raw survey responses.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResponseTable {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl ResponseTable {
    pub fn new<I, S>(columns: I) -> Result<Self, TableError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        let mut seen = HashSet::new();
        if let Some(duplicate) = columns.iter().find(|column| !seen.insert(column.as_str())) {
            return Err(TableError::DuplicateColumn {
                column: duplicate.clone(),
            });
        }

        Ok(Self {
            columns,
            rows: Vec::new(),
        })
    }

    /// Builds a table column by column; every column must have the same
    /// number of values.
    pub fn from_columns<S>(columns: Vec<(S, Vec<Cell>)>) -> Result<Self, TableError>
    where
        S: Into<String>,
    {
        let mut table = Self::default();
        for (name, values) in columns {
            if table.columns.is_empty() {
                table.rows = vec![Vec::new(); values.len()];
            }
            table.push_column(name.into(), values)?;
        }
        Ok(table)
    }

    pub fn push_row(&mut self, row: Vec<Cell>) -> Result<(), TableError> {
        if row.len() != self.columns.len() {
            return Err(TableError::RowLength {
                row: self.rows.len() + 1,
                expected: self.columns.len(),
                found: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, TableError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::Headers)
            .from_reader(reader);
        let mut table = Self::new(csv_reader.headers()?.iter())?;

        for record in csv_reader.records() {
            let record = record?;
            table.push_row(record.iter().map(Cell::verbatim).collect())?;
        }

        Ok(table)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, TableError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| TableError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(file)
    }

    pub fn to_writer<W: Write>(&self, writer: W) -> Result<(), TableError> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        csv_writer.write_record(&self.columns)?;
        for row in &self.rows {
            csv_writer.write_record(row.iter().map(Cell::to_string))?;
        }
        csv_writer.flush().map_err(csv::Error::from)?;
        Ok(())
    }

    pub fn to_path<P: AsRef<Path>>(&self, path: P) -> Result<(), TableError> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|source| TableError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.to_writer(file)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    /// Number of respondents.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    pub fn column_values(&self, name: &str) -> Option<Vec<&Cell>> {
        let index = self.column_index(name)?;
        Some(self.rows.iter().map(|row| &row[index]).collect())
    }

    pub fn cell(&self, row: usize, column: &str) -> Option<&Cell> {
        let index = self.column_index(column)?;
        self.rows.get(row).map(|values| &values[index])
    }

    pub fn columns_with_prefix(&self, prefix: &str) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|column| column.starts_with(prefix))
            .map(String::as_str)
            .collect()
    }

    /// Replaces the column called `name`, or appends it when absent.
    pub fn set_column(&mut self, name: &str, values: Vec<Cell>) -> Result<(), TableError> {
        if values.len() != self.rows.len() {
            return Err(TableError::RowLength {
                row: values.len().min(self.rows.len()) + 1,
                expected: self.rows.len(),
                found: values.len(),
            });
        }

        match self.column_index(name) {
            Some(index) => {
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row[index] = value;
                }
            }
            None => {
                self.columns.push(name.to_string());
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row.push(value);
                }
            }
        }
        Ok(())
    }

    pub fn with_column(mut self, name: &str, values: Vec<Cell>) -> Result<Self, TableError> {
        self.set_column(name, values)?;
        Ok(self)
    }

    fn push_column(&mut self, name: String, values: Vec<Cell>) -> Result<(), TableError> {
        if self.column_index(&name).is_some() {
            return Err(TableError::DuplicateColumn { column: name });
        }
        self.set_column(&name, values)
    }
}
