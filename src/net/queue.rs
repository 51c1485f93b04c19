//! Match-scoped delayed jobs.
//!
//! At most one job per (match, kind) is pending. Scheduling again within the
//! dedupe window of the pending job is dropped; outside it the pending job is
//! moved. The slots live in the match's store record, so pending work is
//! still there when a new orchestrator opens the same store.

use serde::{Deserialize, Serialize};

use crate::ids::MatchId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    AiStep,
    PresenceCheck,
}

impl JobKind {
    pub const ALL: [JobKind; 2] = [JobKind::AiStep, JobKind::PresenceCheck];
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub match_id: MatchId,
    pub kind: JobKind,
    pub due_at: u64,
}

/// Pending jobs of one match, one slot per kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSlots {
    ai_step: Option<u64>,
    presence_check: Option<u64>,
}

impl JobSlots {
    fn slot(&mut self, kind: JobKind) -> &mut Option<u64> {
        match kind {
            JobKind::AiStep => &mut self.ai_step,
            JobKind::PresenceCheck => &mut self.presence_check,
        }
    }

    pub fn pending(&self, kind: JobKind) -> Option<u64> {
        match kind {
            JobKind::AiStep => self.ai_step,
            JobKind::PresenceCheck => self.presence_check,
        }
    }

    /// Returns false when the request was absorbed by the pending job.
    pub fn schedule(&mut self, kind: JobKind, due_at: u64, dedupe_window_ms: u64) -> bool {
        let slot = self.slot(kind);
        if let Some(existing) = *slot
            && existing.abs_diff(due_at) < dedupe_window_ms
        {
            return false;
        }
        *slot = Some(due_at);
        true
    }

    /// Schedule only if nothing of this kind is pending.
    pub fn ensure(&mut self, kind: JobKind, due_at: u64) -> bool {
        let slot = self.slot(kind);
        if slot.is_some() {
            return false;
        }
        *slot = Some(due_at);
        true
    }

    /// Empty and return every slot due at `now`.
    pub fn take_due(&mut self, match_id: &MatchId, now: u64) -> Vec<Job> {
        JobKind::ALL
            .into_iter()
            .filter_map(|kind| {
                let slot = self.slot(kind);
                let due_at = (*slot).filter(|due| *due <= now)?;
                *slot = None;
                Some(Job {
                    match_id: match_id.clone(),
                    kind,
                    due_at,
                })
            })
            .collect()
    }

    pub fn clear(&mut self) {
        *self = JobSlots::default();
    }

    pub fn next_due(&self) -> Option<u64> {
        JobKind::ALL.into_iter().filter_map(|k| self.pending(k)).min()
    }
}

/// Earliest first; ties by match, then kind.
pub fn sort_jobs(jobs: &mut [Job]) {
    jobs.sort_by(|a, b| (a.due_at, &a.match_id, a.kind).cmp(&(b.due_at, &b.match_id, b.kind)));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schedules_within_window_are_absorbed() {
        let mut slots = JobSlots::default();
        assert!(slots.schedule(JobKind::AiStep, 1_000, 250));
        assert!(!slots.schedule(JobKind::AiStep, 1_100, 250));
        assert_eq!(slots.pending(JobKind::AiStep), Some(1_000));
        assert!(slots.schedule(JobKind::AiStep, 2_000, 250));
        assert_eq!(slots.pending(JobKind::AiStep), Some(2_000));
        assert_eq!(slots.pending(JobKind::PresenceCheck), None);
    }

    #[test]
    fn ensure_never_moves_a_pending_job() {
        let mut slots = JobSlots::default();
        assert!(slots.ensure(JobKind::AiStep, 5_000));
        assert!(!slots.ensure(JobKind::AiStep, 9_000));
        assert_eq!(slots.pending(JobKind::AiStep), Some(5_000));
    }

    #[test]
    fn taking_removes_only_due_jobs() {
        let id = MatchId::new("a");
        let mut slots = JobSlots::default();
        slots.schedule(JobKind::AiStep, 20, 0);
        slots.schedule(JobKind::PresenceCheck, 500, 0);

        let due = slots.take_due(&id, 100);
        assert_eq!(
            due,
            vec![Job {
                match_id: id.clone(),
                kind: JobKind::AiStep,
                due_at: 20
            }]
        );
        assert!(slots.take_due(&id, 100).is_empty());
        assert_eq!(slots.next_due(), Some(500));
        slots.clear();
        assert_eq!(slots.next_due(), None);
    }

    #[test]
    fn jobs_sort_by_due_time_then_match() {
        let job = |id: &str, kind, due_at| Job {
            match_id: MatchId::new(id),
            kind,
            due_at,
        };
        let mut jobs = vec![
            job("b", JobKind::AiStep, 50),
            job("a", JobKind::PresenceCheck, 50),
            job("a", JobKind::AiStep, 50),
            job("c", JobKind::AiStep, 10),
        ];
        sort_jobs(&mut jobs);
        let order: Vec<(&str, JobKind)> = jobs.iter().map(|j| (j.match_id.as_str(), j.kind)).collect();
        assert_eq!(
            order,
            vec![
                ("c", JobKind::AiStep),
                ("a", JobKind::AiStep),
                ("a", JobKind::PresenceCheck),
                ("b", JobKind::AiStep),
            ]
        );
    }
}
