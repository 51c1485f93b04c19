//! Storage seam for match records.
//!
//! The store is the arbiter for optimistic concurrency: a batch is only
//! appended when its version is exactly one past the latest stored version.
//! It also keeps each match's pending background jobs, and hands a due job
//! out exactly once.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, RwLock};

use super::queue::{Job, JobKind, JobSlots, sort_jobs};
use super::snapshot::Snapshot;
use super::{EventBatch, MatchMeta};
use crate::ids::{MatchId, Seat, Version};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    NotFound(MatchId),
    Duplicate(MatchId),
    VersionConflict { attempted: Version, latest: Version },
    Poisoned,
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::NotFound(id) => write!(f, "match {} not found", id),
            StoreError::Duplicate(id) => write!(f, "match {} already exists", id),
            StoreError::VersionConflict { attempted, latest } => write!(
                f,
                "cannot append version {} on top of version {}",
                attempted, latest
            ),
            StoreError::Poisoned => f.write_str("match store lock poisoned"),
        }
    }
}

impl std::error::Error for StoreError {}

pub trait MatchStore: Send + Sync {
    fn insert_match(&self, meta: MatchMeta) -> Result<(), StoreError>;
    fn load_meta(&self, match_id: &MatchId) -> Result<MatchMeta, StoreError>;
    fn save_meta(&self, meta: &MatchMeta) -> Result<(), StoreError>;
    /// 0 before the opening batch.
    fn latest_version(&self, match_id: &MatchId) -> Result<Version, StoreError>;
    fn append_batch(&self, batch: EventBatch) -> Result<(), StoreError>;
    /// Batches with a version strictly greater than `since`, oldest first.
    fn batches_since(&self, match_id: &MatchId, since: Version)
    -> Result<Vec<EventBatch>, StoreError>;
    /// Keeps whichever snapshot has the higher version.
    fn put_snapshot(&self, snapshot: Snapshot) -> Result<(), StoreError>;
    fn latest_snapshot(&self, match_id: &MatchId) -> Result<Option<Snapshot>, StoreError>;
    fn record_heartbeat(&self, match_id: &MatchId, seat: Seat, at: u64) -> Result<(), StoreError>;
    fn last_heartbeat(&self, match_id: &MatchId, seat: Seat) -> Result<Option<u64>, StoreError>;
    fn match_ids(&self) -> Result<Vec<MatchId>, StoreError>;

    /// Returns false when a pending job within `dedupe_window_ms` absorbed it.
    fn schedule_job(
        &self,
        match_id: &MatchId,
        kind: JobKind,
        due_at: u64,
        dedupe_window_ms: u64,
    ) -> Result<bool, StoreError>;
    /// Schedule only when nothing of `kind` is pending for the match.
    fn ensure_job(&self, match_id: &MatchId, kind: JobKind, due_at: u64) -> Result<bool, StoreError>;
    fn pending_job(&self, match_id: &MatchId, kind: JobKind) -> Result<Option<u64>, StoreError>;
    /// Remove and return every job due at `now`, earliest first.
    fn claim_due_jobs(&self, now: u64) -> Result<Vec<Job>, StoreError>;
    fn cancel_jobs(&self, match_id: &MatchId) -> Result<(), StoreError>;
    fn next_job_due(&self) -> Result<Option<u64>, StoreError>;
}

#[derive(Debug)]
struct MatchRecord {
    meta: MatchMeta,
    batches: Vec<EventBatch>,
    snapshot: Option<Snapshot>,
    heartbeats: [Option<u64>; 2],
    jobs: JobSlots,
}

/// Process-local store. Each match sits behind its own lock.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    matches: RwLock<HashMap<MatchId, Arc<Mutex<MatchRecord>>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, match_id: &MatchId) -> Result<Arc<Mutex<MatchRecord>>, StoreError> {
        let matches = self.matches.read().map_err(|_| StoreError::Poisoned)?;
        matches
            .get(match_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(match_id.clone()))
    }

    fn records(&self) -> Result<Vec<(MatchId, Arc<Mutex<MatchRecord>>)>, StoreError> {
        let matches = self.matches.read().map_err(|_| StoreError::Poisoned)?;
        Ok(matches
            .iter()
            .map(|(id, record)| (id.clone(), Arc::clone(record)))
            .collect())
    }

    fn with_record<T>(
        &self,
        match_id: &MatchId,
        f: impl FnOnce(&mut MatchRecord) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let record = self.record(match_id)?;
        let mut guard = record.lock().map_err(|_| StoreError::Poisoned)?;
        f(&mut guard)
    }
}

impl MatchStore for InMemoryStore {
    fn insert_match(&self, meta: MatchMeta) -> Result<(), StoreError> {
        let mut matches = self.matches.write().map_err(|_| StoreError::Poisoned)?;
        if matches.contains_key(&meta.match_id) {
            return Err(StoreError::Duplicate(meta.match_id));
        }
        let id = meta.match_id.clone();
        matches.insert(
            id,
            Arc::new(Mutex::new(MatchRecord {
                meta,
                batches: Vec::new(),
                snapshot: None,
                heartbeats: [None, None],
                jobs: JobSlots::default(),
            })),
        );
        Ok(())
    }

    fn load_meta(&self, match_id: &MatchId) -> Result<MatchMeta, StoreError> {
        self.with_record(match_id, |r| Ok(r.meta.clone()))
    }

    fn save_meta(&self, meta: &MatchMeta) -> Result<(), StoreError> {
        self.with_record(&meta.match_id, |r| {
            r.meta = meta.clone();
            Ok(())
        })
    }

    fn latest_version(&self, match_id: &MatchId) -> Result<Version, StoreError> {
        self.with_record(match_id, |r| Ok(r.batches.last().map_or(0, |b| b.version)))
    }

    fn append_batch(&self, batch: EventBatch) -> Result<(), StoreError> {
        let match_id = batch.match_id.clone();
        self.with_record(&match_id, |r| {
            let latest = r.batches.last().map_or(0, |b| b.version);
            if batch.version != latest + 1 {
                return Err(StoreError::VersionConflict {
                    attempted: batch.version,
                    latest,
                });
            }
            r.batches.push(batch);
            Ok(())
        })
    }

    fn batches_since(
        &self,
        match_id: &MatchId,
        since: Version,
    ) -> Result<Vec<EventBatch>, StoreError> {
        self.with_record(match_id, |r| {
            Ok(r.batches
                .iter()
                .filter(|b| b.version > since)
                .cloned()
                .collect())
        })
    }

    fn put_snapshot(&self, snapshot: Snapshot) -> Result<(), StoreError> {
        let match_id = snapshot.match_id.clone();
        self.with_record(&match_id, |r| {
            let newer = r
                .snapshot
                .as_ref()
                .is_none_or(|current| current.version < snapshot.version);
            if newer {
                r.snapshot = Some(snapshot);
            }
            Ok(())
        })
    }

    fn latest_snapshot(&self, match_id: &MatchId) -> Result<Option<Snapshot>, StoreError> {
        self.with_record(match_id, |r| Ok(r.snapshot.clone()))
    }

    fn record_heartbeat(&self, match_id: &MatchId, seat: Seat, at: u64) -> Result<(), StoreError> {
        self.with_record(match_id, |r| {
            r.heartbeats[seat.index()] = Some(at);
            Ok(())
        })
    }

    fn last_heartbeat(&self, match_id: &MatchId, seat: Seat) -> Result<Option<u64>, StoreError> {
        self.with_record(match_id, |r| Ok(r.heartbeats[seat.index()]))
    }

    fn match_ids(&self) -> Result<Vec<MatchId>, StoreError> {
        let matches = self.matches.read().map_err(|_| StoreError::Poisoned)?;
        let mut ids: Vec<MatchId> = matches.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }

    fn schedule_job(
        &self,
        match_id: &MatchId,
        kind: JobKind,
        due_at: u64,
        dedupe_window_ms: u64,
    ) -> Result<bool, StoreError> {
        self.with_record(match_id, |r| Ok(r.jobs.schedule(kind, due_at, dedupe_window_ms)))
    }

    fn ensure_job(&self, match_id: &MatchId, kind: JobKind, due_at: u64) -> Result<bool, StoreError> {
        self.with_record(match_id, |r| Ok(r.jobs.ensure(kind, due_at)))
    }

    fn pending_job(&self, match_id: &MatchId, kind: JobKind) -> Result<Option<u64>, StoreError> {
        self.with_record(match_id, |r| Ok(r.jobs.pending(kind)))
    }

    fn claim_due_jobs(&self, now: u64) -> Result<Vec<Job>, StoreError> {
        let mut due = Vec::new();
        for (id, record) in self.records()? {
            let mut guard = record.lock().map_err(|_| StoreError::Poisoned)?;
            due.extend(guard.jobs.take_due(&id, now));
        }
        sort_jobs(&mut due);
        Ok(due)
    }

    fn cancel_jobs(&self, match_id: &MatchId) -> Result<(), StoreError> {
        self.with_record(match_id, |r| {
            r.jobs.clear();
            Ok(())
        })
    }

    fn next_job_due(&self) -> Result<Option<u64>, StoreError> {
        let mut next: Option<u64> = None;
        for (_, record) in self.records()? {
            let guard = record.lock().map_err(|_| StoreError::Poisoned)?;
            if let Some(due) = guard.jobs.next_due() {
                next = Some(next.map_or(due, |n| n.min(due)));
            }
        }
        Ok(next)
    }
}
