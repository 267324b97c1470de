use super::artifact::{ScaleKey, SubscaleRow};
use super::domain::{Polarity, ResponseBounds};
use super::ordered::OrderedEntries;
use super::{validate_scale_name, KeyError};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

const MIN_FIELD: &str = "min_val";
const MAX_FIELD: &str = "max_val";
const INDEX_HEADER: &str = "subscale";
const CSV_SUFFIX: &str = "_key.csv";
const JSON_SUFFIX: &str = "_key.json";

/// Directory of persisted scale keys.
///
/// Each scale has a table form (`{scale}_key.csv`) and, when response
/// bounds are known, a record form (`{scale}_key.json`) that carries the
/// same table plus `min_val` and `max_val`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyStore {
    dir: PathBuf,
}

impl KeyStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn csv_path(&self, scale: &str) -> PathBuf {
        self.dir.join(format!("{scale}{CSV_SUFFIX}"))
    }

    pub fn json_path(&self, scale: &str) -> PathBuf {
        self.dir.join(format!("{scale}{JSON_SUFFIX}"))
    }

    pub fn exists(&self, scale: &str) -> bool {
        self.json_path(scale).is_file() || self.csv_path(scale).is_file()
    }

    /// Scale names that have at least one artifact, sorted.
    pub fn list(&self) -> Result<Vec<String>, KeyError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(KeyError::Io {
                    path: self.dir.clone(),
                    source,
                })
            }
        };

        let mut scales = BTreeSet::new();
        for entry in entries {
            let entry = entry.map_err(|source| KeyError::Io {
                path: self.dir.clone(),
                source,
            })?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            let scale = name
                .strip_suffix(JSON_SUFFIX)
                .or_else(|| name.strip_suffix(CSV_SUFFIX));
            if let Some(scale) = scale.filter(|scale| !scale.is_empty()) {
                scales.insert(scale.to_string());
            }
        }

        Ok(scales.into_iter().collect())
    }

    /// Writes both artifact forms, replacing existing files. Keys without
    /// bounds only have a table form.
    pub fn save(&self, key: &ScaleKey) -> Result<(), KeyError> {
        validate_scale_name(key.scale())?;
        fs::create_dir_all(&self.dir).map_err(|source| KeyError::Io {
            path: self.dir.clone(),
            source,
        })?;

        self.write_table(key)?;
        if key.bounds().is_some() {
            self.write_record(key)?;
        }
        Ok(())
    }

    /// Loads the record form when present, else the legacy table form with
    /// no bounds.
    pub fn load(&self, scale: &str) -> Result<ScaleKey, KeyError> {
        validate_scale_name(scale)?;

        let json_path = self.json_path(scale);
        if json_path.is_file() {
            debug!(scale, path = %json_path.display(), "loading scale key record");
            return read_record(scale, &json_path);
        }

        let csv_path = self.csv_path(scale);
        if csv_path.is_file() {
            debug!(scale, path = %csv_path.display(), "loading legacy scale key table");
            return read_table(scale, &csv_path);
        }

        Err(KeyError::NotFound {
            scale: scale.to_string(),
            dir: self.dir.clone(),
        })
    }

    fn write_table(&self, key: &ScaleKey) -> Result<(), KeyError> {
        let path = self.csv_path(key.scale());
        let csv_error = |source| KeyError::Csv {
            path: path.clone(),
            source,
        };

        let mut writer = csv::Writer::from_path(&path).map_err(csv_error)?;
        let header = std::iter::once(INDEX_HEADER).chain(key.columns().iter().map(String::as_str));
        writer.write_record(header).map_err(csv_error)?;
        for row in key.subscales() {
            let mut record = Vec::with_capacity(row.polarities.len() + 1);
            record.push(row.name.clone());
            record.extend(row.polarities.iter().map(Polarity::to_string));
            writer.write_record(&record).map_err(csv_error)?;
        }
        writer.flush().map_err(|source| KeyError::Io {
            path: path.clone(),
            source,
        })
    }

    fn write_record(&self, key: &ScaleKey) -> Result<(), KeyError> {
        let path = self.json_path(key.scale());
        let io_error = |source| KeyError::Io {
            path: path.clone(),
            source,
        };

        let file = File::create(&path).map_err(io_error)?;
        let mut writer = BufWriter::new(file);
        let mut serializer = serde_json::Serializer::with_formatter(&mut writer, SpacedFormatter);
        KeyRecord(key)
            .serialize(&mut serializer)
            .map_err(|source| KeyError::Json {
                path: path.clone(),
                source,
            })?;
        writer.flush().map_err(io_error)
    }
}

/// Single-line JSON with `", "` and `": "` separators, the layout earlier
/// releases of the tool wrote, so rebuilt keys stay byte-compatible.
struct SpacedFormatter;

impl serde_json::ser::Formatter for SpacedFormatter {
    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + Write,
    {
        writer.write_all(b": ")
    }

    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }
}

/// Serializes column -> {subscale -> polarity} in key order, then bounds.
struct KeyRecord<'a>(&'a ScaleKey);

impl Serialize for KeyRecord<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let key = self.0;
        let mut map = serializer.serialize_map(None)?;
        for (index, column) in key.columns().iter().enumerate() {
            map.serialize_entry(column, &ColumnRecord { key, index })?;
        }
        if let Some(bounds) = key.bounds() {
            map.serialize_entry(MIN_FIELD, &bounds.min())?;
            map.serialize_entry(MAX_FIELD, &bounds.max())?;
        }
        map.end()
    }
}

struct ColumnRecord<'a> {
    key: &'a ScaleKey,
    index: usize,
}

impl Serialize for ColumnRecord<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.key.subscales().len()))?;
        for row in self.key.subscales() {
            map.serialize_entry(&row.name, &row.polarities[self.index])?;
        }
        map.end()
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RecordEntry {
    Bound(f64),
    Column(OrderedEntries<i64>),
}

fn malformed(path: &Path, detail: impl Into<String>) -> KeyError {
    KeyError::Malformed {
        origin: path.display().to_string(),
        detail: detail.into(),
    }
}

fn polarity_at(
    path: &Path,
    value: i64,
    subscale: &str,
    column: &str,
) -> Result<Polarity, KeyError> {
    Polarity::from_value(value).ok_or_else(|| {
        malformed(
            path,
            format!("subscale '{subscale}' has polarity {value} for '{column}'"),
        )
    })
}

fn bound_value(path: &Path, field: &str, value: f64) -> Result<i32, KeyError> {
    if value.fract() != 0.0 || value < f64::from(i32::MIN) || value > f64::from(i32::MAX) {
        return Err(malformed(
            path,
            format!("{field} must be an integer, found {value}"),
        ));
    }
    Ok(value as i32)
}

fn read_record(scale: &str, path: &Path) -> Result<ScaleKey, KeyError> {
    let file = File::open(path).map_err(|source| KeyError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let record: OrderedEntries<RecordEntry> = serde_json::from_reader(BufReader::new(file))
        .map_err(|source| KeyError::Json {
            path: path.to_path_buf(),
            source,
        })?;

    let mut min = None;
    let mut max = None;
    let mut columns = Vec::new();
    let mut rows: Vec<SubscaleRow> = Vec::new();

    for (name, entry) in record.0 {
        match (name.as_str(), entry) {
            (MIN_FIELD, RecordEntry::Bound(value)) => {
                min = Some(bound_value(path, MIN_FIELD, value)?);
            }
            (MAX_FIELD, RecordEntry::Bound(value)) => {
                max = Some(bound_value(path, MAX_FIELD, value)?);
            }
            (field @ (MIN_FIELD | MAX_FIELD), RecordEntry::Column(_)) => {
                return Err(malformed(path, format!("{field} must be a number")));
            }
            (column, RecordEntry::Bound(_)) => {
                return Err(malformed(
                    path,
                    format!("column '{column}' must map subscales to polarities"),
                ));
            }
            (column, RecordEntry::Column(entries)) => {
                if rows.is_empty() && columns.is_empty() {
                    for (subscale, value) in &entries.0 {
                        rows.push(SubscaleRow {
                            name: subscale.clone(),
                            polarities: vec![polarity_at(path, *value, subscale, column)?],
                        });
                    }
                } else {
                    append_column(path, column, entries, &mut rows)?;
                }
                columns.push(column.to_string());
            }
        }
    }

    let bounds = match (min, max) {
        (Some(min), Some(max)) => Some(
            ResponseBounds::new(min, max).map_err(|err| malformed(path, err.to_string()))?,
        ),
        (None, None) => None,
        _ => {
            return Err(malformed(
                path,
                format!("{MIN_FIELD} and {MAX_FIELD} must be present together"),
            ))
        }
    };

    ScaleKey::from_parts(scale.to_string(), columns, rows, bounds)
        .map_err(|detail| malformed(path, detail))
}

fn append_column(
    path: &Path,
    column: &str,
    entries: OrderedEntries<i64>,
    rows: &mut [SubscaleRow],
) -> Result<(), KeyError> {
    if entries.0.len() != rows.len() {
        return Err(malformed(
            path,
            format!(
                "column '{column}' lists {} subscales, expected {}",
                entries.0.len(),
                rows.len()
            ),
        ));
    }

    let values: HashMap<String, i64> = entries.0.into_iter().collect();
    for row in rows.iter_mut() {
        let value = values.get(&row.name).copied().ok_or_else(|| {
            malformed(
                path,
                format!("column '{column}' has no entry for subscale '{}'", row.name),
            )
        })?;
        row.polarities.push(polarity_at(path, value, &row.name, column)?);
    }
    Ok(())
}

fn read_table(scale: &str, path: &Path) -> Result<ScaleKey, KeyError> {
    let csv_error = |source| KeyError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(csv_error)?;
    let columns: Vec<String> = reader
        .headers()
        .map_err(csv_error)?
        .iter()
        .skip(1)
        .map(str::to_string)
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(csv_error)?;
        let mut fields = record.iter();
        let name = fields.next().unwrap_or_default().to_string();
        let polarities = fields
            .zip(&columns)
            .map(|(field, column)| {
                let value = field.parse::<i64>().map_err(|_| {
                    malformed(
                        path,
                        format!("subscale '{name}' has value '{field}' for '{column}'"),
                    )
                })?;
                polarity_at(path, value, &name, column)
            })
            .collect::<Result<Vec<_>, _>>()?;
        rows.push(SubscaleRow { name, polarities });
    }

    ScaleKey::from_parts(scale.to_string(), columns, rows, None)
        .map_err(|detail| malformed(path, detail))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::survey::key::{build_key, SubscaleMap};
    use tempfile::tempdir;

    fn sample_key() -> ScaleKey {
        let map = SubscaleMap::from_json_str(r#"{"A": [1, "2R"], "B": [2, "3R"]}"#)
            .expect("map parses");
        build_key("T", &map, ResponseBounds::new(1, 5).expect("bounds")).expect("key builds")
    }

    #[test]
    fn save_writes_both_forms_in_key_order() {
        let dir = tempdir().expect("tempdir");
        let store = KeyStore::new(dir.path().join("keys"));
        store.save(&sample_key()).expect("save");

        let table = fs::read_to_string(store.csv_path("T")).expect("csv written");
        assert_eq!(table, "subscale,T_1,T_2,T_3\nA,1,-1,0\nB,0,1,-1\n");

        let record = fs::read_to_string(store.json_path("T")).expect("json written");
        assert_eq!(
            record,
            r#"{"T_1": {"A": 1, "B": 0}, "T_2": {"A": -1, "B": 1}, "T_3": {"A": 0, "B": -1}, "min_val": 1, "max_val": 5}"#
        );
    }

    #[test]
    fn load_round_trips_the_record_form() {
        let dir = tempdir().expect("tempdir");
        let store = KeyStore::new(dir.path());
        let key = sample_key();
        store.save(&key).expect("save");

        assert_eq!(store.load("T").expect("load"), key);
    }

    #[test]
    fn load_falls_back_to_legacy_table_without_bounds() {
        let dir = tempdir().expect("tempdir");
        let store = KeyStore::new(dir.path());
        fs::write(store.csv_path("old"), "subscale,old_1,old_2\nX,1,-1\n").expect("write");

        let key = store.load("old").expect("legacy key loads");
        assert_eq!(key.bounds(), None);
        assert_eq!(key.columns(), ["old_1", "old_2"]);
        assert_eq!(key.polarity("X", "old_2"), Some(Polarity::Reversed));
    }

    #[test]
    fn missing_scale_is_not_found() {
        let dir = tempdir().expect("tempdir");
        let store = KeyStore::new(dir.path());
        match store.load("absent") {
            Err(KeyError::NotFound { scale, .. }) => assert_eq!(scale, "absent"),
            other => panic!("expected not found, got {other:?}"),
        }
    }

    #[test]
    fn record_with_bad_polarity_or_half_bounds_is_malformed() {
        let dir = tempdir().expect("tempdir");
        let store = KeyStore::new(dir.path());

        fs::write(
            store.json_path("bad"),
            r#"{"bad_1":{"A":2},"min_val":1,"max_val":5}"#,
        )
        .expect("write");
        assert!(matches!(store.load("bad"), Err(KeyError::Malformed { .. })));

        fs::write(store.json_path("half"), r#"{"half_1":{"A":1},"min_val":1}"#).expect("write");
        assert!(matches!(store.load("half"), Err(KeyError::Malformed { .. })));

        fs::write(
            store.json_path("ragged"),
            r#"{"ragged_1":{"A":1,"B":0},"ragged_2":{"A":1},"min_val":1,"max_val":5}"#,
        )
        .expect("write");
        assert!(matches!(store.load("ragged"), Err(KeyError::Malformed { .. })));

        fs::write(
            store.json_path("frac"),
            r#"{"frac_1":{"A":1},"min_val":1.5,"max_val":5}"#,
        )
        .expect("write");
        assert!(matches!(store.load("frac"), Err(KeyError::Malformed { .. })));
    }

    #[test]
    fn record_without_bounds_loads_as_unbounded() {
        let dir = tempdir().expect("tempdir");
        let store = KeyStore::new(dir.path());
        fs::write(store.json_path("plain"), r#"{"plain_1":{"A":1,"B":-1}}"#).expect("write");

        let key = store.load("plain").expect("loads");
        assert_eq!(key.bounds(), None);
        assert_eq!(key.subscale_names().collect::<Vec<_>>(), ["A", "B"]);
    }

    #[test]
    fn list_reports_each_scale_once() {
        let dir = tempdir().expect("tempdir");
        let store = KeyStore::new(dir.path());
        assert!(store.list().expect("list").is_empty());

        store.save(&sample_key()).expect("save");
        fs::write(store.csv_path("legacy"), "subscale,legacy_1\nX,1\n").expect("write");
        fs::write(dir.path().join("notes.txt"), "ignored").expect("write");

        assert_eq!(store.list().expect("list"), ["T", "legacy"]);
        assert!(store.exists("legacy"));
        assert!(!store.exists("other"));
    }

    #[test]
    fn list_of_missing_directory_is_empty() {
        let dir = tempdir().expect("tempdir");
        let store = KeyStore::new(dir.path().join("never-created"));
        assert!(store.list().expect("list").is_empty());
    }
}
