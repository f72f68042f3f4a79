use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tally_common::types::Platform;
use tokio::sync::watch;
use uuid::Uuid;

/// Live state of one running backfill.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BackfillProgress {
    pub integration_id: Uuid,
    pub platform: Platform,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub started_at: DateTime<Utc>,
    pub pages_fetched: u64,
    pub records_fetched: u64,
}

type ProgressMap = BTreeMap<Uuid, BackfillProgress>;

/// Registry of in-progress backfills, owned by the scheduler.
///
/// Entries exist only while their [`ProgressHandle`] is alive.
#[derive(Clone)]
pub struct BackfillTracker {
    state: Arc<watch::Sender<ProgressMap>>,
}

impl Default for BackfillTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl BackfillTracker {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(ProgressMap::new());
        Self { state: Arc::new(tx) }
    }

    pub fn start(
        &self,
        integration_id: Uuid,
        platform: Platform,
        from: NaiveDate,
        to: NaiveDate,
    ) -> ProgressHandle {
        let entry = BackfillProgress {
            integration_id,
            platform,
            from,
            to,
            started_at: Utc::now(),
            pages_fetched: 0,
            records_fetched: 0,
        };
        self.state.send_modify(|map| {
            map.insert(integration_id, entry);
        });
        tracing::info!(%integration_id, %platform, %from, %to, "backfill started");

        ProgressHandle {
            inner: Some((self.state.clone(), integration_id)),
        }
    }

    /// Snapshot of every running backfill, ordered by integration id.
    pub fn list(&self) -> Vec<BackfillProgress> {
        self.state.borrow().values().cloned().collect()
    }

    pub fn get(&self, integration_id: Uuid) -> Option<BackfillProgress> {
        self.state.borrow().get(&integration_id).cloned()
    }

    /// Receiver that is notified on every progress change.
    pub fn subscribe(&self) -> watch::Receiver<BTreeMap<Uuid, BackfillProgress>> {
        self.state.subscribe()
    }
}

/// Reporting side of a tracked backfill. Dropping it removes the entry.
pub struct ProgressHandle {
    inner: Option<(Arc<watch::Sender<ProgressMap>>, Uuid)>,
}

impl ProgressHandle {
    /// A handle that reports nowhere, for incremental syncs.
    pub fn disabled() -> Self {
        Self { inner: None }
    }

    pub fn record_page(&self, records: usize) {
        if let Some((state, id)) = &self.inner {
            state.send_modify(|map| {
                if let Some(entry) = map.get_mut(id) {
                    entry.pages_fetched += 1;
                    entry.records_fetched += records as u64;
                }
            });
        }
    }
}

impl Drop for ProgressHandle {
    fn drop(&mut self) {
        if let Some((state, id)) = self.inner.take() {
            state.send_modify(|map| {
                map.remove(&id);
            });
            tracing::debug!(integration_id = %id, "backfill tracking ended");
        }
    }
}
