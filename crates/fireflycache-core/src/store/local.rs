use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use super::notify::{ChangeNotifier, ChangeSet, SubscriptionId};
use super::record::{Record, TableKind};
use super::schema::{self, Tables};
use crate::error::Result;
use crate::geo::{self, Coordinates};
use crate::models::{LocationHint, NearbyAccount, Settings};
use crate::utils::locks;

/// Bounding box precision for the nearby pre-filter (1/1000 degree).
const NEARBY_GRID: f64 = 1000.0;

/// Transactional JSON-backed store.
///
/// Readers get an `Arc` snapshot of the committed tables. Writers serialize
/// on `writer`, mutate a private copy and publish it only once persisted.
pub struct Store {
    path: Option<PathBuf>,
    state: RwLock<Arc<Tables>>,
    writer: Mutex<()>,
    notifier: ChangeNotifier,
}

impl Store {
    /// Open (or create) the store at `path`, migrating older layouts.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let tables = if path.exists() {
            let raw = std::fs::read_to_string(&path)?;
            let (tables, migrated) = schema::decode(&raw, Utc::now())?;
            if migrated {
                persist(&path, &tables)?;
            }
            tables
        } else {
            Tables::default()
        };

        info!(path = %path.display(), "Opened store");
        Ok(Self::from_parts(Some(path), tables))
    }

    /// A store that is never written to disk.
    pub fn in_memory() -> Self {
        Self::from_parts(None, Tables::default())
    }

    fn from_parts(path: Option<PathBuf>, tables: Tables) -> Self {
        Self {
            path,
            state: RwLock::new(Arc::new(tables)),
            writer: Mutex::new(()),
            notifier: ChangeNotifier::new(),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Committed tables as of now.
    pub fn snapshot(&self) -> Arc<Tables> {
        Arc::clone(&locks::read(&self.state))
    }

    /// Run `f` as one atomic write.
    ///
    /// The closure sees and mutates a private copy. If it returns `Ok` the
    /// copy is persisted and published, then subscribers are notified; if
    /// it returns `Err` (or persisting fails) nothing becomes visible.
    pub fn write<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut WriteTxn<'_>) -> Result<T>,
    {
        let guard = locks::lock(&self.writer);
        let mut txn = WriteTxn {
            tables: (*self.snapshot()).clone(),
            changed: BTreeSet::new(),
            _guard: guard,
        };

        let value = f(&mut txn)?;

        let WriteTxn {
            tables,
            changed,
            _guard,
        } = txn;
        if changed.is_empty() {
            return Ok(value);
        }

        if let Some(ref path) = self.path {
            persist(path, &tables)?;
        }
        *locks::write(&self.state) = Arc::new(tables);
        drop(_guard);

        let changes = ChangeSet::new(changed);
        debug!(tables = ?changes, "Committed write");
        self.notifier.notify(&changes);
        Ok(value)
    }

    pub fn settings(&self) -> Settings {
        self.snapshot().settings.clone().unwrap_or_default()
    }

    pub fn save_settings(&self, settings: Settings) -> Result<()> {
        self.write(|txn| {
            txn.set_settings(settings);
            Ok(())
        })
    }

    pub fn get<R: Record>(&self, id: i64) -> Option<R> {
        R::rows(&self.snapshot()).get(&id).cloned()
    }

    pub fn all<R: Record>(&self) -> Vec<R> {
        R::rows(&self.snapshot()).values().cloned().collect()
    }

    pub fn query<R, P>(&self, predicate: P) -> Vec<R>
    where
        R: Record,
        P: Fn(&R) -> bool,
    {
        R::rows(&self.snapshot())
            .values()
            .filter(|row| predicate(row))
            .cloned()
            .collect()
    }

    pub fn upsert<R: Record>(&self, record: R) -> Result<()> {
        self.write(|txn| {
            txn.upsert(record);
            Ok(())
        })
    }

    /// Delete every row matching `predicate` in its own write.
    pub fn purge<R, P>(&self, predicate: P) -> Result<usize>
    where
        R: Record,
        P: Fn(&R) -> bool,
    {
        self.write(|txn| Ok(txn.purge(predicate)))
    }

    /// Delete rows of `R` matching `scope` whose `updated_at` is older than
    /// the stale cutoff relative to `now`.
    pub fn purge_stale<R, P>(&self, now: DateTime<Utc>, scope: P) -> Result<usize>
    where
        R: Record,
        P: Fn(&R) -> bool,
    {
        let removed = self.purge(|row: &R| scope(row) && super::is_stale(row.updated_at(), now))?;
        if removed > 0 {
            debug!(table = %R::TABLE, removed = removed, "Purged stale rows");
        }
        Ok(removed)
    }

    /// Hints pinned to an Other account.
    pub fn locations_for(&self, other_id: i64) -> Vec<LocationHint> {
        self.snapshot()
            .locations
            .iter()
            .filter(|hint| hint.other_id == other_id)
            .copied()
            .collect()
    }

    /// Accounts with a location hint in the same 0.001° cell as `at`,
    /// closest first.
    ///
    /// The cell test is a cheap pre-filter, not a radius: it under-selects
    /// near cell edges and distorts near the poles and the antimeridian.
    pub fn nearby(&self, at: Coordinates) -> Vec<NearbyAccount> {
        let lat_min = (at.latitude * NEARBY_GRID).floor() / NEARBY_GRID;
        let lat_max = (at.latitude * NEARBY_GRID).ceil() / NEARBY_GRID;
        let lon_min = (at.longitude * NEARBY_GRID).floor() / NEARBY_GRID;
        let lon_max = (at.longitude * NEARBY_GRID).ceil() / NEARBY_GRID;

        let tables = self.snapshot();
        let mut nearby: Vec<NearbyAccount> = tables
            .locations
            .iter()
            .filter(|hint| {
                hint.latitude > lat_min
                    && hint.latitude < lat_max
                    && hint.longitude > lon_min
                    && hint.longitude < lon_max
            })
            .filter_map(|hint| {
                tables.others.get(&hint.other_id).map(|account| NearbyAccount {
                    account: account.clone(),
                    distance_meters: geo::distance(at, hint.coordinates()),
                })
            })
            .collect();

        nearby.sort_by(|a, b| {
            a.distance_meters
                .partial_cmp(&b.distance_meters)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        nearby
    }

    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&ChangeSet) + Send + Sync + 'static,
    {
        self.notifier.subscribe(callback)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.notifier.unsubscribe(id)
    }

    /// End the session. Every commit is already on disk; this waits for an
    /// in-progress write and releases the handle.
    pub fn close(self) {
        let _guard = locks::lock(&self.writer);
        if let Some(ref path) = self.path {
            info!(path = %path.display(), "Closed store");
        }
    }
}

/// Write temp file then rename so a crash never leaves a torn document.
fn persist(path: &Path, tables: &Tables) -> Result<()> {
    let contents = schema::encode(tables)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, contents)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

/// Mutable view handed to `Store::write`.
pub struct WriteTxn<'a> {
    tables: Tables,
    changed: BTreeSet<TableKind>,
    _guard: MutexGuard<'a, ()>,
}

impl WriteTxn<'_> {
    pub fn get<R: Record>(&self, id: i64) -> Option<&R> {
        R::rows(&self.tables).get(&id)
    }

    /// Insert or replace by id.
    pub fn upsert<R: Record>(&mut self, record: R) {
        R::rows_mut(&mut self.tables).insert(record.id(), record);
        self.changed.insert(R::TABLE);
    }

    pub fn purge<R, P>(&mut self, predicate: P) -> usize
    where
        R: Record,
        P: Fn(&R) -> bool,
    {
        let removed: Vec<i64> = R::rows(&self.tables)
            .values()
            .filter(|row| predicate(row))
            .map(|row| row.id())
            .collect();
        if removed.is_empty() {
            return 0;
        }

        let rows = R::rows_mut(&mut self.tables);
        for id in &removed {
            rows.remove(id);
        }
        self.changed.insert(R::TABLE);
        self.changed.extend(R::cascade(&mut self.tables, &removed));
        removed.len()
    }

    pub fn insert_location(&mut self, hint: LocationHint) {
        self.tables.locations.push(hint);
        self.changed.insert(TableKind::Location);
    }

    pub fn set_settings(&mut self, settings: Settings) {
        self.tables.settings = Some(settings);
        self.changed.insert(TableKind::Settings);
    }
}
