use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::cleaning::{clean, Cleaned, CleaningStage};
use super::loader::{RecordSource, SourceKey};
use super::model::TransactionDataset;

// ---------------------------------------------------------------------------
// LoadOutcome – what a key resolves to
// ---------------------------------------------------------------------------

/// Why a key produced no clean rows.
#[derive(Debug, Clone, PartialEq)]
pub enum EmptyReason {
    /// The source could not be read; the message is shown once.
    SourceUnavailable(String),
    /// The source was read but cleaning left nothing.
    Cleaning(CleaningStage),
}

impl fmt::Display for EmptyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmptyReason::SourceUnavailable(msg) => write!(f, "source unavailable: {msg}"),
            EmptyReason::Cleaning(stage) => write!(f, "no valid data: {stage}"),
        }
    }
}

/// A memoized, immutable load result.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    Ready(TransactionDataset),
    Empty(EmptyReason),
}

impl LoadOutcome {
    pub fn dataset(&self) -> Option<&TransactionDataset> {
        match self {
            LoadOutcome::Ready(ds) => Some(ds),
            LoadOutcome::Empty(_) => None,
        }
    }
}

// ---------------------------------------------------------------------------
// DatasetStore – fetch + clean, once per key
// ---------------------------------------------------------------------------

/// Key → result map with compute-if-absent semantics.
///
/// Entries live for the whole process; a miss adds a new entry and never
/// touches existing ones. Source failures are cached like any other result,
/// so each is reported once per key.
pub struct DatasetStore {
    source: Box<dyn RecordSource>,
    cache: HashMap<SourceKey, Arc<LoadOutcome>>,
}

impl DatasetStore {
    pub fn new(source: Box<dyn RecordSource>) -> Self {
        DatasetStore {
            source,
            cache: HashMap::new(),
        }
    }

    pub fn get_or_load(&mut self, key: &SourceKey) -> Arc<LoadOutcome> {
        if let Some(hit) = self.cache.get(key) {
            return Arc::clone(hit);
        }
        let outcome = Arc::new(self.load(key));
        self.cache.insert(key.clone(), Arc::clone(&outcome));
        outcome
    }

    fn load(&self, key: &SourceKey) -> LoadOutcome {
        let raw = match self.source.fetch(key) {
            Ok(raw) => raw,
            Err(e) => {
                log::warn!("{} for key {key}: {e}", self.source.describe());
                return LoadOutcome::Empty(EmptyReason::SourceUnavailable(e.to_string()));
            }
        };
        match clean(&raw) {
            Cleaned::Records(ds) => {
                log::info!(
                    "Loaded {} clean transactions out of {} rows for key {key}",
                    ds.len(),
                    raw.len()
                );
                LoadOutcome::Ready(ds)
            }
            Cleaned::Empty(stage) => {
                log::info!("No clean transactions for key {key}: {stage}");
                LoadOutcome::Empty(EmptyReason::Cleaning(stage))
            }
        }
    }

    pub fn is_cached(&self, key: &SourceKey) -> bool {
        self.cache.contains_key(key)
    }

    /// Drop every memoized result.
    pub fn clear(&mut self) {
        self.cache.clear();
    }

    /// Switch to another source; results of the old one are discarded.
    pub fn replace_source(&mut self, source: Box<dyn RecordSource>) {
        self.source = source;
        self.clear();
    }

    pub fn describe_source(&self) -> String {
        self.source.describe()
    }
}
