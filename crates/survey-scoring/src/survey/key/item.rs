use super::domain::Polarity;
use super::ordered::OrderedEntries;
use super::KeyError;
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Suffix marking an item as reverse-coded in authoring maps, e.g. `"30R"`.
pub const REVERSAL_MARKER: char = 'R';

/// One survey item as written in an authoring map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ItemSpec {
    pub id: u32,
    pub reversed: bool,
}

impl ItemSpec {
    pub const fn normal(id: u32) -> Self {
        Self {
            id,
            reversed: false,
        }
    }

    pub const fn reversed(id: u32) -> Self {
        Self { id, reversed: true }
    }

    pub const fn polarity(self) -> Polarity {
        Polarity::for_item(self.reversed)
    }

    /// Parses `"6"` or `"30R"`. Anything other than a positive decimal
    /// identifier with an optional single marker is rejected.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        let (digits, reversed) = match trimmed.strip_suffix(REVERSAL_MARKER) {
            Some(prefix) => (prefix, true),
            None => (trimmed, false),
        };

        if digits.is_empty() || !digits.bytes().all(|byte| byte.is_ascii_digit()) {
            return None;
        }

        let id = digits.parse::<u32>().ok().filter(|id| *id > 0)?;
        Some(Self { id, reversed })
    }

    pub fn column_name(self, scale: &str) -> String {
        item_column(scale, self.id)
    }
}

impl fmt::Display for ItemSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.reversed {
            write!(f, "{}{}", self.id, REVERSAL_MARKER)
        } else {
            write!(f, "{}", self.id)
        }
    }
}

pub(crate) fn item_column(scale: &str, id: u32) -> String {
    format!("{scale}_{id}")
}

fn item_from_json(subscale: &str, value: &Value) -> Result<ItemSpec, KeyError> {
    let parsed = match value {
        Value::Number(number) => number
            .as_u64()
            .and_then(|id| u32::try_from(id).ok())
            .filter(|id| *id > 0)
            .map(ItemSpec::normal),
        Value::String(raw) => ItemSpec::parse(raw),
        _ => None,
    };

    parsed.ok_or_else(|| KeyError::InvalidItemSpec {
        subscale: subscale.to_string(),
        spec: value.to_string(),
    })
}

/// Subscale name to item list, kept in authoring order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscaleMap {
    entries: Vec<(String, Vec<ItemSpec>)>,
}

impl SubscaleMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_subscale<I>(mut self, name: impl Into<String>, items: I) -> Self
    where
        I: IntoIterator<Item = ItemSpec>,
    {
        self.push(name, items);
        self
    }

    pub fn push<I>(&mut self, name: impl Into<String>, items: I)
    where
        I: IntoIterator<Item = ItemSpec>,
    {
        self.entries.push((name.into(), items.into_iter().collect()));
    }

    /// Adds a subscale from textual specs such as `["6", "30R"]`.
    pub fn parse_subscale(mut self, name: &str, specs: &[&str]) -> Result<Self, KeyError> {
        let items = specs
            .iter()
            .map(|raw| {
                ItemSpec::parse(raw).ok_or_else(|| KeyError::InvalidItemSpec {
                    subscale: name.to_string(),
                    spec: (*raw).to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        self.push(name, items);
        Ok(self)
    }

    /// Reads a JSON object of subscale name to an array of item specs. Items
    /// may be bare numbers or strings with the reversal marker.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, KeyError> {
        let raw: OrderedEntries<Vec<Value>> =
            serde_json::from_reader(reader).map_err(KeyError::InvalidSubscaleMap)?;
        Self::from_raw(raw)
    }

    pub fn from_json_str(json: &str) -> Result<Self, KeyError> {
        let raw: OrderedEntries<Vec<Value>> =
            serde_json::from_str(json).map_err(KeyError::InvalidSubscaleMap)?;
        Self::from_raw(raw)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, KeyError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| KeyError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(BufReader::new(file))
    }

    fn from_raw(raw: OrderedEntries<Vec<Value>>) -> Result<Self, KeyError> {
        let mut map = Self::new();
        for (name, values) in raw.0 {
            let items = values
                .iter()
                .map(|value| item_from_json(&name, value))
                .collect::<Result<Vec<_>, _>>()?;
            map.push(name, items);
        }
        Ok(map)
    }

    pub fn entries(&self) -> &[(String, Vec<ItemSpec>)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn validate(&self) -> Result<(), KeyError> {
        if self.entries.is_empty() {
            return Err(KeyError::EmptySubscaleMap);
        }

        let mut seen = HashSet::new();
        for (name, items) in &self.entries {
            if name.trim().is_empty() {
                return Err(KeyError::EmptySubscaleName);
            }
            if !seen.insert(name.as_str()) {
                return Err(KeyError::DuplicateSubscale {
                    subscale: name.clone(),
                });
            }
            if items.is_empty() {
                return Err(KeyError::EmptyItemList {
                    subscale: name.clone(),
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_plain_and_reversed_ids() {
        assert_eq!(ItemSpec::parse("6"), Some(ItemSpec::normal(6)));
        assert_eq!(ItemSpec::parse("30R"), Some(ItemSpec::reversed(30)));
        assert_eq!(ItemSpec::parse("  12R "), Some(ItemSpec::reversed(12)));
        assert_eq!(ItemSpec::parse("06"), Some(ItemSpec::normal(6)));
    }

    #[test]
    fn parse_rejects_malformed_specs() {
        for raw in ["", "R", "xR", "3RR", "0", "0R", "-4", "2.5", "r3", "4r", "30 R"] {
            assert_eq!(ItemSpec::parse(raw), None, "{raw:?} should be rejected");
        }
    }

    #[test]
    fn display_restores_authoring_form() {
        assert_eq!(ItemSpec::reversed(30).to_string(), "30R");
        assert_eq!(ItemSpec::normal(6).to_string(), "6");
        assert_eq!(ItemSpec::reversed(2).column_name("hexaco"), "hexaco_2");
    }

    #[test]
    fn json_map_preserves_subscale_order_and_mixed_item_forms() {
        let map = SubscaleMap::from_json_str(r#"{"Zeal": [3, "1R"], "Apathy": ["2"]}"#)
            .expect("map parses");
        let names: Vec<&str> = map.entries().iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, ["Zeal", "Apathy"]);
        assert_eq!(
            map.entries()[0].1,
            vec![ItemSpec::normal(3), ItemSpec::reversed(1)]
        );
    }

    #[test]
    fn json_map_reports_offending_subscale() {
        let error = SubscaleMap::from_json_str(r#"{"A": [1], "B": ["xR"]}"#)
            .expect_err("bad spec rejected");
        match error {
            KeyError::InvalidItemSpec { subscale, spec } => {
                assert_eq!(subscale, "B");
                assert_eq!(spec, "\"xR\"");
            }
            other => panic!("expected invalid item spec, got {other:?}"),
        }

        assert!(matches!(
            SubscaleMap::from_json_str(r#"{"A": [1.5]}"#),
            Err(KeyError::InvalidItemSpec { .. })
        ));
        assert!(matches!(
            SubscaleMap::from_json_str(r#"["A"]"#),
            Err(KeyError::InvalidSubscaleMap(_))
        ));
    }

    #[test]
    fn validate_flags_structural_problems() {
        assert!(matches!(
            SubscaleMap::new().validate(),
            Err(KeyError::EmptySubscaleMap)
        ));
        assert!(matches!(
            SubscaleMap::new()
                .with_subscale("A", [ItemSpec::normal(1)])
                .with_subscale("B", Vec::new())
                .validate(),
            Err(KeyError::EmptyItemList { subscale }) if subscale == "B"
        ));
        assert!(matches!(
            SubscaleMap::new()
                .with_subscale("  ", [ItemSpec::normal(1)])
                .validate(),
            Err(KeyError::EmptySubscaleName)
        ));
        assert!(matches!(
            SubscaleMap::new()
                .with_subscale("A", [ItemSpec::normal(1)])
                .with_subscale("A", [ItemSpec::normal(2)])
                .validate(),
            Err(KeyError::DuplicateSubscale { subscale }) if subscale == "A"
        ));
    }
}
