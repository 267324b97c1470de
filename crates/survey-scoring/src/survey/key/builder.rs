use super::artifact::{ScaleKey, SubscaleRow};
use super::domain::{Polarity, ResponseBounds};
use super::item::{item_column, SubscaleMap};
use super::store::KeyStore;
use super::KeyError;
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, info, warn};

/// Builds the normalized key for `scale` without touching storage.
///
/// Columns are every distinct item id referenced anywhere in the map, sorted
/// ascending. Rows follow the map's authoring order. When one subscale lists
/// the same id twice the later entry wins.
pub fn build_key(
    scale: &str,
    subscales: &SubscaleMap,
    bounds: ResponseBounds,
) -> Result<ScaleKey, KeyError> {
    super::validate_scale_name(scale)?;
    subscales.validate()?;

    let ids: BTreeSet<u32> = subscales
        .entries()
        .iter()
        .flat_map(|(_, items)| items.iter().map(|item| item.id))
        .collect();
    let positions: HashMap<u32, usize> = ids
        .iter()
        .enumerate()
        .map(|(index, id)| (*id, index))
        .collect();
    let columns: Vec<String> = ids.iter().map(|id| item_column(scale, *id)).collect();

    let mut rows = Vec::with_capacity(subscales.len());
    for (name, items) in subscales.entries() {
        let mut polarities = vec![Polarity::Excluded; columns.len()];
        for item in items {
            let slot = &mut polarities[positions[&item.id]];
            let polarity = item.polarity();
            if slot.is_scored() {
                if *slot == polarity {
                    debug!(scale, subscale = %name, item = item.id, "item listed twice");
                } else {
                    warn!(
                        scale,
                        subscale = %name,
                        item = item.id,
                        kept = %polarity,
                        "item listed with conflicting polarity; keeping the later entry"
                    );
                }
            }
            *slot = polarity;
        }
        rows.push(SubscaleRow {
            name: name.clone(),
            polarities,
        });
    }

    debug!(
        scale,
        columns = columns.len(),
        subscales = rows.len(),
        "built scale key"
    );

    ScaleKey::from_parts(scale.to_string(), columns, rows, Some(bounds)).map_err(|detail| {
        KeyError::Malformed {
            origin: scale.to_string(),
            detail,
        }
    })
}

/// Builds the key for `scale` and persists it to `store` in both the legacy
/// table form and the bounded JSON form, replacing any earlier artifacts.
pub fn create_key(
    store: &KeyStore,
    scale: &str,
    subscales: &SubscaleMap,
    bounds: ResponseBounds,
) -> Result<ScaleKey, KeyError> {
    let key = build_key(scale, subscales, bounds)?;
    store.save(&key)?;
    info!(
        scale,
        dir = %store.dir().display(),
        subscales = key.subscales().len(),
        items = key.columns().len(),
        "scale key written"
    );
    Ok(key)
}
