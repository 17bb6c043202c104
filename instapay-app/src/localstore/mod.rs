use std::str::FromStr;

use async_trait::async_trait;
use instapay_core::primitives::HistoryEntry;
use tracing::{instrument, warn};

use crate::error::InstapayError;

pub mod file;
pub mod memory;

/// Key the history snapshot is stored under.
pub const HISTORY_KEY: &str = "upi-payment-history";

/// A key/value medium holding whole snapshots, shaped like browser local storage.
#[async_trait(?Send)]
pub trait SnapshotStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, InstapayError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), InstapayError>;

    async fn remove(&self, key: &str) -> Result<(), InstapayError>;
}

/// What [`PaymentHistoryStore::record`] does when the snapshot write is rejected.
///
/// The in-memory history keeps the new entry under every policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PersistPolicy {
    /// return the storage error to the caller
    #[default]
    Surface,
    /// retry the write, then return the last error
    Retry { attempts: u8 },
    /// log and carry on
    Accept,
}

impl FromStr for PersistPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "surface" => Ok(Self::Surface),
            "retry" => Ok(Self::Retry { attempts: 2 }),
            "accept" => Ok(Self::Accept),
            other => Err(format!("unknown persist policy: {other}")),
        }
    }
}

/// Most-recent-first log of issued payment requests, deduplicated by id.
pub struct PaymentHistoryStore<S: SnapshotStorage> {
    storage: S,
    entries: Vec<HistoryEntry>,
    policy: PersistPolicy,
}

impl<S: SnapshotStorage> PaymentHistoryStore<S> {
    /// Reads the persisted snapshot. Missing, unreadable or malformed data yields an empty
    /// history; a malformed snapshot is discarded.
    #[instrument(level = "debug", skip_all)]
    pub async fn load(storage: S, policy: PersistPolicy) -> Self {
        let entries = match storage.get(HISTORY_KEY).await {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<HistoryEntry>>(&raw) {
                Ok(entries) => dedup_by_id(entries),
                Err(e) => {
                    warn!("discarding malformed history snapshot: {}", e);
                    if let Err(e) = storage.remove(HISTORY_KEY).await {
                        warn!("could not discard history snapshot: {}", e);
                    }
                    vec![]
                }
            },
            Ok(None) => vec![],
            Err(e) => {
                warn!("history snapshot unreadable: {}", e);
                vec![]
            }
        };

        Self {
            storage,
            entries,
            policy,
        }
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn policy(&self) -> PersistPolicy {
        self.policy
    }

    /// Prepends `entry` and persists the whole sequence as one snapshot.
    #[instrument(level = "debug", skip(self), fields(id = %entry.id))]
    pub async fn record(&mut self, entry: HistoryEntry) -> Result<(), InstapayError> {
        self.entries.retain(|e| e.id != entry.id);
        self.entries.insert(0, entry);
        self.persist().await
    }

    /// Empties the history and removes the snapshot key altogether.
    #[instrument(level = "debug", skip(self))]
    pub async fn clear(&mut self) -> Result<(), InstapayError> {
        self.entries.clear();
        self.storage.remove(HISTORY_KEY).await
    }

    async fn persist(&self) -> Result<(), InstapayError> {
        let snapshot = serde_json::to_string(&self.entries)?;

        let attempts = match self.policy {
            PersistPolicy::Retry { attempts } => 1 + u32::from(attempts),
            PersistPolicy::Surface | PersistPolicy::Accept => 1,
        };

        let mut last_error = None;
        for attempt in 1..=attempts {
            match self.storage.set(HISTORY_KEY, &snapshot).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    warn!("history write attempt {} failed: {}", attempt, e);
                    last_error = Some(e);
                }
            }
        }

        match (self.policy, last_error) {
            (PersistPolicy::Accept, Some(_)) | (_, None) => Ok(()),
            (_, Some(e)) => Err(match e {
                InstapayError::StorageUnavailable(_) => e,
                other => InstapayError::StorageUnavailable(other.to_string()),
            }),
        }
    }
}

fn dedup_by_id(entries: Vec<HistoryEntry>) -> Vec<HistoryEntry> {
    let mut seen = std::collections::HashSet::new();
    entries
        .into_iter()
        .filter(|e| seen.insert(e.id.clone()))
        .collect()
}
