//! Rolling weather history.
//!
//! Samples are appended newest-first behind an anti-spam gate, then the
//! collection is pruned to the retention window and capped. Queries filter
//! by elapsed time with inclusive boundaries.
//!
//! The tracker keeps a generation counter that is bumped on every change so
//! a rendered view of the active period can tell it is out of date.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use tracing::{debug, warn};

use nimbus_store::Store;
use nimbus_types::{Condition, HistoryEntry, Period, WeatherSample};

use crate::error::Result;

/// Minimum spacing between two entries with the same classification.
pub const DEFAULT_MIN_INTERVAL: Duration = Duration::minutes(5);
/// Entries older than this are pruned.
pub const DEFAULT_RETENTION: Duration = Duration::days(30);
/// Maximum number of retained entries.
pub const DEFAULT_MAX_ENTRIES: usize = 30;

/// Thresholds governing what is recorded and for how long.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistoryPolicy {
    pub min_interval: Duration,
    pub retention: Duration,
    pub max_entries: usize,
}

impl Default for HistoryPolicy {
    fn default() -> Self {
        Self {
            min_interval: DEFAULT_MIN_INTERVAL,
            retention: DEFAULT_RETENTION,
            max_entries: DEFAULT_MAX_ENTRIES,
        }
    }
}

impl HistoryPolicy {
    /// Whether `sample` should be recorded given the most recent entry.
    ///
    /// Recorded when there is no previous entry, enough time has passed, or
    /// the classification (condition or rounded temperature) changed.
    pub fn should_record(
        &self,
        last: Option<&HistoryEntry>,
        sample: &WeatherSample,
        now: OffsetDateTime,
    ) -> bool {
        let Some(last) = last else {
            return true;
        };
        now - last.timestamp >= self.min_interval
            || last.condition != sample.condition
            || last.sample().rounded_temperature() != sample.rounded_temperature()
    }

    /// Whether an entry is still inside the retention window.
    pub fn retains(&self, entry: &HistoryEntry, now: OffsetDateTime) -> bool {
        now - entry.timestamp <= self.retention
    }

    /// Sort newest first, drop expired entries and cap the collection.
    pub fn prune(&self, entries: &mut Vec<HistoryEntry>, now: OffsetDateTime) {
        sort_newest_first(entries);
        entries.retain(|e| self.retains(e, now));
        entries.truncate(self.max_entries);
    }
}

/// Result of [`HistoryTracker::record_sample`].
#[derive(Debug, Clone, PartialEq)]
pub enum RecordOutcome {
    /// A new entry was stored.
    Recorded(HistoryEntry),
    /// The anti-spam gate rejected the sample.
    Skipped,
}

impl RecordOutcome {
    pub fn is_recorded(&self) -> bool {
        matches!(self, RecordOutcome::Recorded(_))
    }
}

/// Records and queries the persisted weather history.
#[derive(Debug, Default)]
pub struct HistoryTracker {
    policy: HistoryPolicy,
    generation: AtomicU64,
}

impl HistoryTracker {
    pub fn new(policy: HistoryPolicy) -> Self {
        Self {
            policy,
            generation: AtomicU64::new(0),
        }
    }

    pub fn policy(&self) -> &HistoryPolicy {
        &self.policy
    }

    /// Current view generation. Changes whenever the stored history changes.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Record a sample if it passes the anti-spam gate.
    pub fn record_sample(
        &self,
        store: &Store,
        sample: &WeatherSample,
        now: OffsetDateTime,
    ) -> Result<RecordOutcome> {
        let mut entries = load(store);

        if !self.policy.should_record(entries.first(), sample, now) {
            debug!(
                "Skipping history sample {:.1}°C {} (gate)",
                sample.temperature, sample.condition
            );
            return Ok(RecordOutcome::Skipped);
        }

        let entry = HistoryEntry::new(sample);
        let position = entries.partition_point(|e| e.timestamp > entry.timestamp);
        entries.insert(position, entry.clone());
        self.policy.prune(&mut entries, now);
        store.write_history(&entries)?;

        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        debug!(
            "Recorded history entry {} ({} retained, generation {})",
            entry.id,
            entries.len(),
            generation
        );
        Ok(RecordOutcome::Recorded(entry))
    }

    /// Entries within `period` of `now`, newest first.
    pub fn query_history(
        &self,
        store: &Store,
        period: Period,
        now: OffsetDateTime,
    ) -> Vec<HistoryEntry> {
        filter_entries(load(store), period, now, &self.policy)
    }

    /// Remove expired entries from the store. Returns how many were dropped.
    pub fn prune_store(&self, store: &Store, now: OffsetDateTime) -> Result<usize> {
        let mut entries = load(store);
        let before = entries.len();
        self.policy.prune(&mut entries, now);
        let removed = before - entries.len();
        if removed > 0 {
            store.write_history(&entries)?;
            self.generation.fetch_add(1, Ordering::AcqRel);
        }
        Ok(removed)
    }
}

/// Stored entries, newest first. A read failure yields an empty history.
fn load(store: &Store) -> Vec<HistoryEntry> {
    let mut entries = store.read_history().unwrap_or_else(|e| {
        warn!("Failed to read weather history, treating as empty: {}", e);
        Vec::new()
    });
    sort_newest_first(&mut entries);
    entries
}

/// Order entries by timestamp, newest first. Equal timestamps keep their order.
pub fn sort_newest_first(entries: &mut [HistoryEntry]) {
    entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
}

/// Filter entries to `period` (inclusive) and the retention window, newest first.
pub fn filter_entries(
    entries: Vec<HistoryEntry>,
    period: Period,
    now: OffsetDateTime,
    policy: &HistoryPolicy,
) -> Vec<HistoryEntry> {
    let mut kept: Vec<HistoryEntry> = entries
        .into_iter()
        .filter(|e| period.contains(e.timestamp, now) && policy.retains(e, now))
        .collect();
    sort_newest_first(&mut kept);
    kept
}

/// Count of entries with a given condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionCount {
    pub condition: Condition,
    pub count: usize,
}

/// Aggregates over a set of history entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistorySummary {
    pub count: usize,
    pub min_temperature: Option<f64>,
    pub max_temperature: Option<f64>,
    pub mean_temperature: Option<f64>,
    /// Non-zero counts, in classification order.
    pub conditions: Vec<ConditionCount>,
    /// Most frequent condition; ties go to the one seen most recently.
    pub dominant: Option<Condition>,
}

/// Summarize entries (expected newest first).
pub fn summarize(entries: &[HistoryEntry]) -> HistorySummary {
    let count = entries.len();
    let mut min: Option<f64> = None;
    let mut max: Option<f64> = None;
    let mut sum = 0.0;
    // (count, index of the most recent occurrence)
    let mut tally: Vec<(usize, usize)> = vec![(0, usize::MAX); Condition::ALL.len()];

    for (idx, entry) in entries.iter().enumerate() {
        min = Some(min.map_or(entry.temperature, |m| m.min(entry.temperature)));
        max = Some(max.map_or(entry.temperature, |m| m.max(entry.temperature)));
        sum += entry.temperature;

        let slot = condition_index(entry.condition);
        tally[slot].0 += 1;
        tally[slot].1 = tally[slot].1.min(idx);
    }

    let conditions = Condition::ALL
        .iter()
        .zip(&tally)
        .filter(|(_, (n, _))| *n > 0)
        .map(|(condition, (n, _))| ConditionCount {
            condition: *condition,
            count: *n,
        })
        .collect();

    let dominant = Condition::ALL
        .iter()
        .zip(&tally)
        .filter(|(_, (n, _))| *n > 0)
        .max_by(|(_, (a, a_idx)), (_, (b, b_idx))| a.cmp(b).then(b_idx.cmp(a_idx)))
        .map(|(condition, _)| *condition);

    HistorySummary {
        count,
        min_temperature: min,
        max_temperature: max,
        mean_temperature: (count > 0).then(|| sum / count as f64),
        conditions,
        dominant,
    }
}

fn condition_index(condition: Condition) -> usize {
    Condition::ALL
        .iter()
        .position(|c| *c == condition)
        .unwrap_or_default()
}
