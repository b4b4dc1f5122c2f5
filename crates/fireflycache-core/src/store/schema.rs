//! On-disk layout of the store and its migrations.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::error::{Error, Result};
use crate::models::{Asset, Budget, LocationHint, OtherAccount, Settings};

/// Current layout version.
/// v2 added `updated_at` to every cached row, v5 made settings a singleton.
pub const SCHEMA_VERSION: u32 = 5;

/// In-memory tables, keyed by normalized remote id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tables {
    pub settings: Option<Settings>,
    pub assets: BTreeMap<i64, Asset>,
    pub budgets: BTreeMap<i64, Budget>,
    pub others: BTreeMap<i64, OtherAccount>,
    pub locations: Vec<LocationHint>,
}

/// Serialized form: rows as arrays, tagged with the layout version.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct StoreDocument {
    pub schema_version: u32,
    #[serde(default)]
    pub settings: Option<Settings>,
    #[serde(default)]
    pub assets: Vec<Asset>,
    #[serde(default)]
    pub budgets: Vec<Budget>,
    #[serde(default)]
    pub others: Vec<OtherAccount>,
    #[serde(default)]
    pub locations: Vec<LocationHint>,
}

impl From<&Tables> for StoreDocument {
    fn from(tables: &Tables) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            settings: tables.settings.clone(),
            assets: tables.assets.values().cloned().collect(),
            budgets: tables.budgets.values().cloned().collect(),
            others: tables.others.values().cloned().collect(),
            locations: tables.locations.clone(),
        }
    }
}

impl From<StoreDocument> for Tables {
    fn from(doc: StoreDocument) -> Self {
        Self {
            settings: doc.settings,
            assets: doc.assets.into_iter().map(|r| (r.id, r)).collect(),
            budgets: doc.budgets.into_iter().map(|r| (r.id, r)).collect(),
            others: doc.others.into_iter().map(|r| (r.id, r)).collect(),
            locations: doc.locations,
        }
    }
}

/// Parse a stored document, upgrading older layouts.
/// Returns the tables and whether a migration ran.
pub(crate) fn decode(raw: &str, now: DateTime<Utc>) -> Result<(Tables, bool)> {
    let mut value: Value = serde_json::from_str(raw)?;
    let raw_version = value
        .get("schema_version")
        .and_then(Value::as_u64)
        .unwrap_or(1);
    let found = u32::try_from(raw_version)
        .ok()
        .filter(|version| *version <= SCHEMA_VERSION)
        .ok_or(Error::SchemaTooNew {
            found: raw_version,
            supported: SCHEMA_VERSION,
        })?;

    let migrated = found < SCHEMA_VERSION;
    if migrated {
        migrate(&mut value, found, now)?;
        info!(from = found, to = SCHEMA_VERSION, "Migrated store layout");
    }

    let doc: StoreDocument = serde_json::from_value(value)?;
    Ok((doc.into(), migrated))
}

pub(crate) fn encode(tables: &Tables) -> Result<String> {
    Ok(serde_json::to_string_pretty(&StoreDocument::from(tables))?)
}

fn migrate(value: &mut Value, from: u32, now: DateTime<Utc>) -> Result<()> {
    let doc = value
        .as_object_mut()
        .ok_or_else(|| Error::Storage("store document is not an object".to_string()))?;

    if from < 2 {
        let stamp = Value::String(now.to_rfc3339());
        for table in ["assets", "budgets", "others"] {
            if let Some(Value::Array(rows)) = doc.get_mut(table) {
                for row in rows.iter_mut().filter_map(Value::as_object_mut) {
                    row.entry("updated_at").or_insert_with(|| stamp.clone());
                }
            }
        }
    }

    if from < 5 {
        if let Some(Value::Array(rows)) = doc.get("settings") {
            let first = rows.first().cloned().unwrap_or(Value::Null);
            doc.insert("settings".to_string(), first);
        }
    }

    doc.insert("schema_version".to_string(), Value::from(SCHEMA_VERSION));
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_round_trip_current_layout() {
        let now = Utc::now();
        let mut tables = Tables::default();
        tables.assets.insert(1, Asset::new(1, "Checking", now));
        tables.settings = Some(Settings::new("https://ff.example", "t"));

        let (decoded, migrated) = decode(&encode(&tables).unwrap(), now).unwrap();
        assert!(!migrated);
        assert_eq!(decoded, tables);
    }

    #[test]
    fn test_v1_rows_get_stamped() {
        let now = Utc::now();
        let raw = json!({
            "assets": [{"id": 1, "name": "Checking"}],
            "others": [{"id": 9, "name": "Bakery", "type": "expense"}],
        })
        .to_string();

        let (tables, migrated) = decode(&raw, now).unwrap();
        assert!(migrated);
        assert_eq!(tables.assets[&1].updated_at.timestamp(), now.timestamp());
        assert_eq!(tables.others[&9].account_type, "expense");
        assert_eq!(tables.others[&9].preferred_asset, None);
    }

    #[test]
    fn test_v4_settings_list_becomes_singleton() {
        let raw = json!({
            "schema_version": 4,
            "settings": [{"url": "https://a", "token": "x"}, {"url": "https://b", "token": "y"}],
        })
        .to_string();

        let (tables, _) = decode(&raw, Utc::now()).unwrap();
        assert_eq!(tables.settings, Some(Settings::new("https://a", "x")));
    }

    #[test]
    fn test_newer_layout_is_rejected() {
        let raw = json!({"schema_version": SCHEMA_VERSION + 1}).to_string();
        match decode(&raw, Utc::now()) {
            Err(Error::SchemaTooNew { found, supported }) => {
                assert_eq!(found, u64::from(SCHEMA_VERSION) + 1);
                assert_eq!(supported, SCHEMA_VERSION);
            }
            other => panic!("unexpected {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_version_beyond_u32_is_rejected() {
        let raw = json!({"schema_version": 4_294_967_297u64}).to_string();
        match decode(&raw, Utc::now()) {
            Err(Error::SchemaTooNew { found, .. }) => assert_eq!(found, 4_294_967_297),
            other => panic!("unexpected {:?}", other.map(|_| ())),
        }
    }
}
