use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::schema::Tables;
use crate::models::{Asset, Budget, OtherAccount};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TableKind {
    Settings,
    Asset,
    Budget,
    Other,
    Location,
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Settings => "Settings",
            Self::Asset => "Asset",
            Self::Budget => "Budget",
            Self::Other => "Other",
            Self::Location => "Location",
        };
        f.write_str(name)
    }
}

/// A row of an id-keyed table.
pub trait Record: Clone + Send + Sync + 'static {
    const TABLE: TableKind;

    fn id(&self) -> i64;

    fn updated_at(&self) -> DateTime<Utc>;

    fn rows(tables: &Tables) -> &BTreeMap<i64, Self>;

    fn rows_mut(tables: &mut Tables) -> &mut BTreeMap<i64, Self>;

    /// Drop rows of other tables owned by the removed ids.
    /// Returns the tables touched.
    fn cascade(_tables: &mut Tables, _removed: &[i64]) -> Vec<TableKind> {
        Vec::new()
    }
}

impl Record for Asset {
    const TABLE: TableKind = TableKind::Asset;

    fn id(&self) -> i64 {
        self.id
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn rows(tables: &Tables) -> &BTreeMap<i64, Self> {
        &tables.assets
    }

    fn rows_mut(tables: &mut Tables) -> &mut BTreeMap<i64, Self> {
        &mut tables.assets
    }
}

impl Record for Budget {
    const TABLE: TableKind = TableKind::Budget;

    fn id(&self) -> i64 {
        self.id
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn rows(tables: &Tables) -> &BTreeMap<i64, Self> {
        &tables.budgets
    }

    fn rows_mut(tables: &mut Tables) -> &mut BTreeMap<i64, Self> {
        &mut tables.budgets
    }
}

impl Record for OtherAccount {
    const TABLE: TableKind = TableKind::Other;

    fn id(&self) -> i64 {
        self.id
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn rows(tables: &Tables) -> &BTreeMap<i64, Self> {
        &tables.others
    }

    fn rows_mut(tables: &mut Tables) -> &mut BTreeMap<i64, Self> {
        &mut tables.others
    }

    fn cascade(tables: &mut Tables, removed: &[i64]) -> Vec<TableKind> {
        let before = tables.locations.len();
        tables
            .locations
            .retain(|hint| !removed.contains(&hint.other_id));
        if tables.locations.len() != before {
            vec![TableKind::Location]
        } else {
            Vec::new()
        }
    }
}
