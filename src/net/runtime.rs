//! The match orchestrator.
//!
//! Wraps the engine in an append-only event log with versioned snapshots.
//! Every accepted command becomes one [`EventBatch`] at `latest + 1`; the
//! store refuses any other version, so two racing submissions built on the
//! same state produce exactly one batch. The engine itself runs outside the
//! store lock.
//!
//! Background work (AI steps, presence checks) is queued in the store, never
//! in the orchestrator, so a fresh orchestrator over the same store picks up
//! where the last one stopped. A rejected command is an answer, not an error:
//! it comes back as [`Submission::Rejected`] with nothing appended.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, info, warn};

use super::normalize::{NormalizeError, normalize};
use super::queue::{Job, JobKind};
use super::snapshot::{Snapshot, state_hash};
use super::store::{MatchStore, StoreError};
use super::{AI_IDENTITY, AI_SEAT, EventBatch, MatchMeta, MatchMode, MatchStatus, Submission};
use crate::ai::{choose_command, fallback_command};
use crate::cards::CardCatalog;
use crate::cards::source::{CachedCatalog, CardSource, CatalogError};
use crate::clock::Clock;
use crate::command::{Command, WireCommand, parse_command};
use crate::config::OrchestratorConfig;
use crate::engine::{Outcome, Transition, apply_with_auto_advance, start_duel};
use crate::events::GameEvent;
use crate::game_state::GameState;
use crate::ids::{DefinitionId, MatchId, PlayerIdentity, Seat, Version};
use crate::seed::{derive_match_seed, first_player};
use crate::view::{PlayerView, player_view, spectator_view};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrchestratorError {
    NotFound(MatchId),
    /// The caller's concurrency token is stale; resync and retry.
    VersionMismatch {
        expected: Version,
        latest: Version,
    },
    NotParticipant,
    WrongSeat {
        claimed: Seat,
        actual: Seat,
    },
    SeatTaken,
    MatchNotActive(MatchStatus),
    Malformed(NormalizeError),
    Store(StoreError),
    Catalog(CatalogError),
    InvalidDeck(String),
    Encoding(String),
    /// Replaying the log did not reproduce a stored batch.
    ReplayDiverged {
        version: Version,
    },
    SnapshotMismatch {
        version: Version,
    },
}

impl fmt::Display for OrchestratorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrchestratorError::NotFound(id) => write!(f, "match {} not found", id),
            OrchestratorError::VersionMismatch { expected, latest } => write!(
                f,
                "expected version {} but the match is at version {}",
                expected, latest
            ),
            OrchestratorError::NotParticipant => f.write_str("caller is not in this match"),
            OrchestratorError::WrongSeat { claimed, actual } => {
                write!(f, "caller sits in the {} seat, not {}", actual, claimed)
            }
            OrchestratorError::SeatTaken => f.write_str("seat already taken"),
            OrchestratorError::MatchNotActive(status) => write!(f, "match is {}", status),
            OrchestratorError::Malformed(err) => write!(f, "malformed command: {}", err),
            OrchestratorError::Store(err) => write!(f, "{}", err),
            OrchestratorError::Catalog(err) => write!(f, "{}", err),
            OrchestratorError::InvalidDeck(msg) => write!(f, "invalid deck: {}", msg),
            OrchestratorError::Encoding(msg) => write!(f, "snapshot encoding failed: {}", msg),
            OrchestratorError::ReplayDiverged { version } => {
                write!(f, "replay diverged at version {}", version)
            }
            OrchestratorError::SnapshotMismatch { version } => {
                write!(f, "snapshot at version {} does not match the log", version)
            }
        }
    }
}

impl std::error::Error for OrchestratorError {}

impl From<StoreError> for OrchestratorError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => OrchestratorError::NotFound(id),
            other => OrchestratorError::Store(other),
        }
    }
}

impl From<CatalogError> for OrchestratorError {
    fn from(err: CatalogError) -> Self {
        OrchestratorError::Catalog(err)
    }
}

impl From<NormalizeError> for OrchestratorError {
    fn from(err: NormalizeError) -> Self {
        OrchestratorError::Malformed(err)
    }
}

impl From<serde_json::Error> for OrchestratorError {
    fn from(err: serde_json::Error) -> Self {
        OrchestratorError::Encoding(err.to_string())
    }
}

/// AI actions taken on one turn of one match.
#[derive(Debug, Clone, Copy)]
struct AiBudget {
    turn: u32,
    spent: u32,
}

pub struct Orchestrator {
    config: OrchestratorConfig,
    store: Arc<dyn MatchStore>,
    catalog: CachedCatalog,
    clock: Arc<dyn Clock>,
    ai_budgets: Mutex<HashMap<MatchId, AiBudget>>,
    next_match: AtomicU64,
}

impl Orchestrator {
    pub fn new(
        config: OrchestratorConfig,
        store: Arc<dyn MatchStore>,
        cards: Box<dyn CardSource>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let catalog = CachedCatalog::new(cards, Arc::clone(&clock), config.catalog_ttl_ms);
        Self {
            config,
            store,
            catalog,
            clock,
            ai_budgets: Mutex::new(HashMap::new()),
            next_match: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn pending_job(&self, match_id: &MatchId, kind: JobKind) -> Result<Option<u64>, OrchestratorError> {
        Ok(self.store.pending_job(match_id, kind)?)
    }

    /// Earliest due time across every match's pending jobs.
    pub fn next_job_due(&self) -> Result<Option<u64>, OrchestratorError> {
        Ok(self.store.next_job_due()?)
    }

    pub fn catalog(&self) -> Result<Arc<CardCatalog>, OrchestratorError> {
        Ok(self.catalog.catalog()?)
    }

    pub fn meta(&self, match_id: &MatchId) -> Result<MatchMeta, OrchestratorError> {
        Ok(self.store.load_meta(match_id)?)
    }

    /// Open a match in `waiting`. With `ai_opponent` the AI takes the away
    /// seat with a copy of the host's deck and the match starts at once.
    pub fn create_match(
        &self,
        host: PlayerIdentity,
        deck: Vec<DefinitionId>,
        mode: MatchMode,
        ai_opponent: bool,
    ) -> Result<MatchId, OrchestratorError> {
        self.validate_deck(&deck)?;
        let mut meta = MatchMeta {
            match_id: self.mint_match_id(),
            host,
            away: None,
            host_deck: deck,
            away_deck: Vec::new(),
            mode,
            ai_opponent,
            status: MatchStatus::Waiting,
            seed: None,
            first_player: None,
            created_at: self.clock.now_ms(),
        };
        // Ids minted by an earlier orchestrator over the same store are skipped.
        while let Err(err) = self.store.insert_match(meta.clone()) {
            match err {
                StoreError::Duplicate(_) => meta.match_id = self.mint_match_id(),
                other => return Err(other.into()),
            }
        }
        let match_id = meta.match_id.clone();
        info!(match_id = %match_id, host = %meta.host, ?mode, ai_opponent, "match created");

        if ai_opponent {
            let away_deck = meta.host_deck.clone();
            self.start_match(meta, PlayerIdentity::new(AI_IDENTITY), away_deck)?;
        }
        Ok(match_id)
    }

    /// Take the away seat and start the match. Returns the opening batch.
    pub fn join_match(
        &self,
        match_id: &MatchId,
        away: PlayerIdentity,
        deck: Vec<DefinitionId>,
    ) -> Result<EventBatch, OrchestratorError> {
        let meta = self.store.load_meta(match_id)?;
        if meta.status != MatchStatus::Waiting {
            return Err(OrchestratorError::MatchNotActive(meta.status));
        }
        if meta.host == away {
            return Err(OrchestratorError::SeatTaken);
        }
        self.validate_deck(&deck)?;
        self.start_match(meta, away, deck)
    }

    /// Host-only, and only before anyone joined.
    pub fn cancel_match(
        &self,
        match_id: &MatchId,
        caller: &PlayerIdentity,
    ) -> Result<(), OrchestratorError> {
        let mut meta = self.store.load_meta(match_id)?;
        if &meta.host != caller {
            return Err(OrchestratorError::NotParticipant);
        }
        if meta.status != MatchStatus::Waiting {
            return Err(OrchestratorError::MatchNotActive(meta.status));
        }
        meta.status = MatchStatus::Canceled;
        self.store.save_meta(&meta)?;
        info!(match_id = %match_id, "match canceled");
        Ok(())
    }

    /// Run a client command. `expected_version`, when given, must equal the
    /// latest stored version; a mismatch is reported and nothing changes.
    /// Commands the rules refuse come back as [`Submission::Rejected`].
    pub fn submit_action(
        &self,
        match_id: &MatchId,
        caller: &PlayerIdentity,
        seat: Seat,
        raw: &str,
        expected_version: Option<Version>,
    ) -> Result<Submission, OrchestratorError> {
        let meta = self.load_active(match_id)?;
        authorize(&meta, caller, seat)?;
        let (state, version) = self.current_state(&meta)?;
        self.reprime_ai(&meta, &state);
        if let Some(expected) = expected_version
            && expected != version
        {
            debug!(match_id = %match_id, expected, latest = version, "stale submission");
            return Err(OrchestratorError::VersionMismatch {
                expected,
                latest: version,
            });
        }
        let command = parse_command(raw).map_err(NormalizeError::Parse)?;
        self.commit(&meta, state, version, seat, command)
    }

    pub fn heartbeat(
        &self,
        match_id: &MatchId,
        caller: &PlayerIdentity,
        seat: Seat,
    ) -> Result<(), OrchestratorError> {
        let meta = self.load_active(match_id)?;
        authorize(&meta, caller, seat)?;
        self.store
            .record_heartbeat(match_id, seat, self.clock.now_ms())?;
        if meta.ai_opponent {
            match self.current_state(&meta) {
                Ok((state, _)) => self.reprime_ai(&meta, &state),
                Err(err) => warn!(match_id = %match_id, error = %err, "cannot check the AI loop"),
            }
        }
        Ok(())
    }

    pub fn get_player_view(
        &self,
        match_id: &MatchId,
        caller: &PlayerIdentity,
        seat: Seat,
    ) -> Result<PlayerView, OrchestratorError> {
        let meta = self.store.load_meta(match_id)?;
        authorize(&meta, caller, seat)?;
        let (state, _) = self.current_state(&meta)?;
        let catalog = self.catalog.catalog()?;
        Ok(player_view(&state, &catalog, seat))
    }

    /// No authentication; both hands hidden.
    pub fn get_spectator_view(&self, match_id: &MatchId) -> Result<PlayerView, OrchestratorError> {
        let meta = self.store.load_meta(match_id)?;
        let (state, _) = self.current_state(&meta)?;
        let catalog = self.catalog.catalog()?;
        Ok(spectator_view(&state, &catalog))
    }

    /// Up to one page of batches after `since_version`, redacted for the
    /// caller's seat. Unknown or absent callers get the spectator redaction.
    pub fn get_recent_events(
        &self,
        match_id: &MatchId,
        caller: Option<&PlayerIdentity>,
        since_version: Version,
    ) -> Result<Vec<EventBatch>, OrchestratorError> {
        let meta = self.store.load_meta(match_id)?;
        let viewer = caller.and_then(|c| meta.seat_of(c));
        Ok(self
            .store
            .batches_since(match_id, since_version)?
            .iter()
            .take(self.config.recent_events_page)
            .map(|b| b.redacted_for(viewer))
            .collect())
    }

    pub fn get_latest_snapshot_version(&self, match_id: &MatchId) -> Result<Version, OrchestratorError> {
        Ok(self
            .store
            .latest_snapshot(match_id)?
            .map_or(0, |s| s.version))
    }

    /// Claim and run every due job. Failures are logged and swallowed; a
    /// failed AI step leaves no successor, and the next human action on the
    /// match queues one again. Returns how many jobs ran.
    pub fn run_due_jobs(&self) -> usize {
        let due: Vec<Job> = match self.store.claim_due_jobs(self.clock.now_ms()) {
            Ok(due) => due,
            Err(err) => {
                warn!(error = %err, "cannot claim due jobs");
                return 0;
            }
        };
        for job in &due {
            let result = match job.kind {
                JobKind::AiStep => self.run_ai_step(&job.match_id).map(|_| ()),
                JobKind::PresenceCheck => self.run_presence_check(&job.match_id),
            };
            if let Err(err) = result {
                warn!(match_id = %job.match_id, kind = ?job.kind, error = %err, "background job failed");
            }
        }
        due.len()
    }

    /// Queue whatever an active match is missing: a presence check, and an AI
    /// step when the AI holds the decision. Run once after opening a store
    /// whose jobs may have been lost. A match that cannot be read is logged
    /// and skipped. Returns how many jobs were added.
    pub fn resume_jobs(&self) -> Result<usize, OrchestratorError> {
        let now = self.clock.now_ms();
        let mut added = 0;
        for match_id in self.store.match_ids()? {
            match self.resume_match(&match_id, now) {
                Ok(count) => added += count,
                Err(err) => warn!(match_id = %match_id, error = %err, "cannot resume match jobs"),
            }
        }
        info!(added, "background jobs resumed");
        Ok(added)
    }

    /// Replay the whole log from the seeded initial state and check it
    /// against the cached snapshot.
    pub fn rebuild_state(&self, match_id: &MatchId) -> Result<GameState, OrchestratorError> {
        let meta = self.store.load_meta(match_id)?;
        let batches = self.store.batches_since(match_id, 0)?;
        let catalog = self.catalog.catalog()?;
        let state = self.replay(&meta, None, &batches, &catalog)?;
        let version = batches.last().map_or(0, |b| b.version);
        if let Some(snapshot) = self.store.latest_snapshot(match_id)?
            && snapshot.version == version
            && snapshot.state_hash != state_hash(&state)?
        {
            warn!(match_id = %match_id, version, "snapshot does not match replayed log");
            return Err(OrchestratorError::SnapshotMismatch { version });
        }
        info!(match_id = %match_id, version, "state rebuilt from log");
        Ok(state)
    }

    /// One AI command, if the AI holds the decision. Re-checks status and
    /// turn ownership first, so a stale job is a silent no-op.
    pub fn run_ai_step(&self, match_id: &MatchId) -> Result<Option<EventBatch>, OrchestratorError> {
        let meta = self.store.load_meta(match_id)?;
        if meta.status != MatchStatus::Active || !meta.ai_opponent {
            return Ok(None);
        }
        let (state, version) = self.current_state(&meta)?;
        if state.decision_seat() != Some(AI_SEAT) {
            return Ok(None);
        }
        let catalog = self.catalog.catalog()?;
        let view = player_view(&state, &catalog, AI_SEAT);
        let spent = self.spend_ai_action(match_id, state.turn_number);
        let command = if spent > self.config.ai_max_actions_per_turn {
            debug!(match_id = %match_id, spent, "AI action budget exhausted");
            fallback_command(&view, AI_SEAT)
        } else {
            choose_command(&view, AI_SEAT)
        };
        let Some(command) = command else {
            return Ok(None);
        };
        debug!(match_id = %match_id, command = command.type_name(), "AI step");
        match self.commit(&meta, state, version, AI_SEAT, command)? {
            Submission::Accepted(batch) => Ok(Some(batch)),
            Submission::Rejected { reason, .. } => {
                warn!(match_id = %match_id, %reason, "AI command refused, AI loop paused");
                Ok(None)
            }
        }
    }

    /// Surrender any human seat whose heartbeat is older than the timeout.
    /// The next check is queued first, so a failure here does not end the
    /// checks; ending the match cancels it.
    pub fn run_presence_check(&self, match_id: &MatchId) -> Result<(), OrchestratorError> {
        let meta = self.store.load_meta(match_id)?;
        if meta.status != MatchStatus::Active {
            return Ok(());
        }
        let now = self.clock.now_ms();
        self.store.schedule_job(
            match_id,
            JobKind::PresenceCheck,
            now + self.config.presence_check_interval_ms,
            self.config.ai_dedupe_window_ms,
        )?;
        for seat in Seat::ALL {
            if meta.is_ai_seat(seat) {
                continue;
            }
            let last = self
                .store
                .last_heartbeat(match_id, seat)?
                .unwrap_or(meta.created_at);
            let idle = now.saturating_sub(last);
            if idle > self.config.heartbeat_timeout_ms {
                warn!(match_id = %match_id, %seat, idle_ms = idle, "seat timed out, surrendering");
                let (state, version) = self.current_state(&meta)?;
                self.commit(&meta, state, version, seat, Command::Surrender)?;
                return Ok(());
            }
        }
        Ok(())
    }

    fn validate_deck(&self, deck: &[DefinitionId]) -> Result<(), OrchestratorError> {
        if deck.is_empty() {
            return Err(OrchestratorError::InvalidDeck("deck is empty".to_string()));
        }
        let catalog = self.catalog.catalog()?;
        if let Some(unknown) = deck.iter().find(|id| !catalog.contains(id)) {
            return Err(OrchestratorError::InvalidDeck(format!(
                "unknown card {}",
                unknown
            )));
        }
        Ok(())
    }

    fn resume_match(&self, match_id: &MatchId, now: u64) -> Result<usize, OrchestratorError> {
        let meta = self.store.load_meta(match_id)?;
        if meta.status != MatchStatus::Active {
            return Ok(0);
        }
        let mut added = 0;
        let presence_due = now + self.config.presence_check_interval_ms;
        if self.store.ensure_job(match_id, JobKind::PresenceCheck, presence_due)? {
            added += 1;
        }
        let (state, _) = self.current_state(&meta)?;
        if self.ai_holds_decision(&meta, &state)
            && self
                .store
                .ensure_job(match_id, JobKind::AiStep, now + self.ai_delay(&state))?
        {
            added += 1;
        }
        Ok(added)
    }

    fn mint_match_id(&self) -> MatchId {
        let serial = self.next_match.fetch_add(1, Ordering::SeqCst) + 1;
        MatchId::new(format!("m{}", serial))
    }

    fn load_active(&self, match_id: &MatchId) -> Result<MatchMeta, OrchestratorError> {
        let meta = self.store.load_meta(match_id)?;
        if meta.status != MatchStatus::Active {
            return Err(OrchestratorError::MatchNotActive(meta.status));
        }
        Ok(meta)
    }

    fn start_match(
        &self,
        mut meta: MatchMeta,
        away: PlayerIdentity,
        away_deck: Vec<DefinitionId>,
    ) -> Result<EventBatch, OrchestratorError> {
        let seed = derive_match_seed(
            &meta.match_id,
            &meta.host,
            &away,
            &meta.host_deck,
            &away_deck,
        );
        let first = first_player(seed);
        meta.away = Some(away);
        meta.away_deck = away_deck;
        meta.seed = Some(seed);
        meta.first_player = Some(first);
        meta.status = MatchStatus::Active;

        let (state, events) = self.initial_state(&meta)?;
        let now = self.clock.now_ms();
        let batch = EventBatch {
            match_id: meta.match_id.clone(),
            version: 1,
            events,
            command: None,
            seat: None,
            created_at: now,
        };
        // Two joins racing on the same match meet here; only one appends.
        self.store.append_batch(batch.clone())?;
        self.store.save_meta(&meta)?;
        self.save_snapshot(&meta.match_id, 1, state.clone())?;
        for seat in Seat::ALL {
            if !meta.is_ai_seat(seat) {
                self.store.record_heartbeat(&meta.match_id, seat, now)?;
            }
        }
        self.store.schedule_job(
            &meta.match_id,
            JobKind::PresenceCheck,
            now + self.config.presence_check_interval_ms,
            self.config.ai_dedupe_window_ms,
        )?;
        self.schedule_ai(&meta, &state, now);
        info!(match_id = %meta.match_id, seed, first_player = %first, "match started");
        Ok(batch)
    }

    fn initial_state(
        &self,
        meta: &MatchMeta,
    ) -> Result<(GameState, Vec<GameEvent>), OrchestratorError> {
        let (Some(seed), Some(first)) = (meta.seed, meta.first_player) else {
            return Err(OrchestratorError::MatchNotActive(meta.status));
        };
        let mut state = GameState::new(
            self.config.duel.clone(),
            seed,
            first,
            &meta.host_deck,
            &meta.away_deck,
        );
        let events = start_duel(&mut state);
        Ok((state, events))
    }

    /// The state at the latest version: the snapshot, plus a replay of any
    /// batches appended after it.
    fn current_state(&self, meta: &MatchMeta) -> Result<(GameState, Version), OrchestratorError> {
        let match_id = &meta.match_id;
        let latest = self.store.latest_version(match_id)?;
        let snapshot = self.store.latest_snapshot(match_id)?;
        if let Some(snapshot) = &snapshot
            && snapshot.version == latest
        {
            return Ok((snapshot.state.clone(), latest));
        }
        let since = snapshot.as_ref().map_or(0, |s| s.version);
        let tail = self.store.batches_since(match_id, since)?;
        let catalog = self.catalog.catalog()?;
        let state = self.replay(meta, snapshot.map(|s| s.state), &tail, &catalog)?;
        let version = tail.last().map_or(since, |b| b.version);
        Ok((state, version))
    }

    fn replay(
        &self,
        meta: &MatchMeta,
        start: Option<GameState>,
        batches: &[EventBatch],
        catalog: &CardCatalog,
    ) -> Result<GameState, OrchestratorError> {
        let mut state = start;
        for batch in batches {
            let diverged = OrchestratorError::ReplayDiverged {
                version: batch.version,
            };
            let next = match (state.as_ref(), batch.command.as_ref(), batch.seat) {
                (None, None, _) if batch.version == 1 => {
                    let (initial, events) = self.initial_state(meta)?;
                    if events != batch.events {
                        return Err(diverged);
                    }
                    initial
                }
                (Some(current), Some(WireCommand::Known(command)), Some(seat)) => {
                    let transition = apply_with_auto_advance(current, seat, command, catalog);
                    if !transition.is_applied() || transition.events() != batch.events.as_slice() {
                        return Err(diverged);
                    }
                    transition.state
                }
                _ => return Err(diverged),
            };
            state = Some(next);
        }
        state.ok_or(OrchestratorError::MatchNotActive(meta.status))
    }

    /// Normalize, run the engine, append. The append fails if anything else
    /// was appended since `base`.
    fn commit(
        &self,
        meta: &MatchMeta,
        state: GameState,
        base: Version,
        seat: Seat,
        command: Command,
    ) -> Result<Submission, OrchestratorError> {
        let match_id = &meta.match_id;
        let catalog = self.catalog.catalog()?;
        let command = normalize(command, &player_view(&state, &catalog, seat), seat)?;
        let Transition { state, outcome } =
            apply_with_auto_advance(&state, seat, &command, &catalog);
        let events = match outcome {
            Outcome::Applied(events) => events,
            Outcome::Rejected(reason) => {
                debug!(match_id = %match_id, %seat, command = command.type_name(), %reason, "command rejected");
                return Ok(Submission::Rejected {
                    reason,
                    version: base,
                });
            }
        };

        let now = self.clock.now_ms();
        let batch = EventBatch {
            match_id: match_id.clone(),
            version: base + 1,
            events,
            command: Some(WireCommand::Known(command)),
            seat: Some(seat),
            created_at: now,
        };
        self.store
            .append_batch(batch.clone())
            .map_err(|err| match err {
                StoreError::VersionConflict { latest, .. } => OrchestratorError::VersionMismatch {
                    expected: base,
                    latest,
                },
                other => other.into(),
            })?;
        self.save_snapshot(match_id, batch.version, state.clone())?;
        info!(
            match_id = %match_id,
            version = batch.version,
            %seat,
            command = batch.command.as_ref().map_or("NONE", |c| c.type_name()),
            events = batch.events.len(),
            "batch accepted"
        );

        if state.game_over {
            let mut ended = self.store.load_meta(match_id)?;
            ended.status = MatchStatus::Ended;
            self.store.save_meta(&ended)?;
            self.store.cancel_jobs(match_id)?;
            self.ai_budgets
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(match_id);
            info!(match_id = %match_id, winner = ?state.winner, reason = ?state.win_reason, "match ended");
        } else {
            self.schedule_ai(meta, &state, now);
        }
        Ok(Submission::Accepted(batch))
    }

    fn save_snapshot(
        &self,
        match_id: &MatchId,
        version: Version,
        state: GameState,
    ) -> Result<(), OrchestratorError> {
        let snapshot = Snapshot::capture(match_id.clone(), version, state)?;
        self.store.put_snapshot(snapshot)?;
        Ok(())
    }

    fn ai_holds_decision(&self, meta: &MatchMeta, state: &GameState) -> bool {
        meta.ai_opponent && !state.game_over && state.decision_seat() == Some(AI_SEAT)
    }

    /// Chain passes are paced faster than ordinary moves.
    fn ai_delay(&self, state: &GameState) -> u64 {
        if state.chain_active() {
            self.config.ai_chain_delay_ms
        } else {
            self.config.ai_step_delay_ms
        }
    }

    fn schedule_ai(&self, meta: &MatchMeta, state: &GameState, now: u64) {
        if !self.ai_holds_decision(meta, state) {
            return;
        }
        let delay = self.ai_delay(state);
        match self.store.schedule_job(
            &meta.match_id,
            JobKind::AiStep,
            now + delay,
            self.config.ai_dedupe_window_ms,
        ) {
            Ok(true) => debug!(match_id = %meta.match_id, due_in_ms = delay, "AI step scheduled"),
            Ok(false) => {}
            Err(err) => warn!(match_id = %meta.match_id, error = %err, "cannot schedule AI step"),
        }
    }

    /// Queue an AI step if the AI holds the decision and none is pending.
    /// A swallowed AI failure leaves the queue empty; this refills it.
    fn reprime_ai(&self, meta: &MatchMeta, state: &GameState) {
        if !self.ai_holds_decision(meta, state) {
            return;
        }
        let due = self.clock.now_ms() + self.ai_delay(state);
        match self.store.ensure_job(&meta.match_id, JobKind::AiStep, due) {
            Ok(true) => debug!(match_id = %meta.match_id, due, "AI loop re-primed"),
            Ok(false) => {}
            Err(err) => warn!(match_id = %meta.match_id, error = %err, "cannot re-prime AI loop"),
        }
    }

    /// Count one AI action against the current turn; returns the new total.
    fn spend_ai_action(&self, match_id: &MatchId, turn: u32) -> u32 {
        let mut budgets = self
            .ai_budgets
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let budget = budgets
            .entry(match_id.clone())
            .or_insert(AiBudget { turn, spent: 0 });
        if budget.turn != turn {
            *budget = AiBudget { turn, spent: 0 };
        }
        budget.spent += 1;
        budget.spent
    }
}

fn authorize(meta: &MatchMeta, caller: &PlayerIdentity, seat: Seat) -> Result<(), OrchestratorError> {
    match meta.seat_of(caller) {
        None => Err(OrchestratorError::NotParticipant),
        Some(actual) if actual != seat => Err(OrchestratorError::WrongSeat {
            claimed: seat,
            actual,
        }),
        Some(_) => Ok(()),
    }
}
