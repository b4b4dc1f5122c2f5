//! Change notification for committed writes.
//!
//! The presentation layer subscribes when a screen mounts and unsubscribes
//! on teardown. Callbacks run after the write is visible to readers and
//! outside every store lock, so a callback may read the store freely.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use super::TableKind;
use crate::utils::locks;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

/// Tables touched by one committed write.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    tables: BTreeSet<TableKind>,
}

impl ChangeSet {
    pub fn new(tables: impl IntoIterator<Item = TableKind>) -> Self {
        Self {
            tables: tables.into_iter().collect(),
        }
    }

    pub fn contains(&self, table: TableKind) -> bool {
        self.tables.contains(&table)
    }

    pub fn tables(&self) -> impl Iterator<Item = TableKind> + '_ {
        self.tables.iter().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

type Callback = Arc<dyn Fn(&ChangeSet) + Send + Sync>;

#[derive(Default)]
pub struct ChangeNotifier {
    next_id: AtomicU64,
    subscribers: Mutex<BTreeMap<SubscriptionId, Callback>>,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&ChangeSet) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        locks::lock(&self.subscribers).insert(id, Arc::new(callback));
        id
    }

    /// Returns false if the subscription was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        locks::lock(&self.subscribers).remove(&id).is_some()
    }

    pub fn subscriber_count(&self) -> usize {
        locks::lock(&self.subscribers).len()
    }

    pub fn notify(&self, changes: &ChangeSet) {
        if changes.is_empty() {
            return;
        }
        let callbacks: Vec<Callback> = locks::lock(&self.subscribers).values().cloned().collect();
        for callback in callbacks {
            callback(changes);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;

    #[test]
    fn test_subscribe_and_unsubscribe() {
        let notifier = ChangeNotifier::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&hits);
        let id = notifier.subscribe(move |changes| {
            assert!(changes.contains(TableKind::Asset));
            counter.fetch_add(1, Ordering::SeqCst);
        });

        notifier.notify(&ChangeSet::new([TableKind::Asset]));
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        assert!(notifier.unsubscribe(id));
        assert!(!notifier.unsubscribe(id));
        notifier.notify(&ChangeSet::new([TableKind::Asset]));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_empty_change_set_is_not_delivered() {
        let notifier = ChangeNotifier::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        notifier.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        notifier.notify(&ChangeSet::default());
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_callback_may_unsubscribe_itself() {
        let notifier = Arc::new(ChangeNotifier::new());
        let slot = Arc::new(Mutex::new(None));
        let inner_notifier = Arc::clone(&notifier);
        let inner_slot = Arc::clone(&slot);
        let id = notifier.subscribe(move |_| {
            if let Some(id) = inner_slot.lock().unwrap().take() {
                inner_notifier.unsubscribe(id);
            }
        });
        *slot.lock().unwrap() = Some(id);

        notifier.notify(&ChangeSet::new([TableKind::Budget]));
        assert_eq!(notifier.subscriber_count(), 0);
    }
}
