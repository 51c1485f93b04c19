//! Tunable rule constants and orchestration pacing.
//!
//! Both structs deserialize with `#[serde(default)]`, so a partial JSON
//! document only overrides the fields it names.

use serde::{Deserialize, Serialize};

/// Rule constants for a single duel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DuelConfig {
    pub starting_life: i32,
    pub starting_hand: usize,
    /// Monster slots per seat.
    pub board_capacity: usize,
    /// Spell/trap slots per seat (the field-spell slot is separate).
    pub backrow_capacity: usize,
    /// Monsters at or above this level need a tribute.
    pub tribute_level: u8,
    /// Vice counters at which a face-up monster breaks down.
    pub vice_threshold: u32,
    /// Breakdowns a seat must cause to win.
    pub breakdown_threshold: u32,
}

impl Default for DuelConfig {
    fn default() -> Self {
        Self {
            starting_life: 8000,
            starting_hand: 5,
            board_capacity: 5,
            backrow_capacity: 5,
            tribute_level: 7,
            vice_threshold: 3,
            breakdown_threshold: 3,
        }
    }
}

/// Pacing, budgets and timeouts for the match orchestrator. All durations in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OrchestratorConfig {
    pub ai_step_delay_ms: u64,
    pub ai_chain_delay_ms: u64,
    /// Scheduling the same match's AI step again inside this window is a no-op.
    pub ai_dedupe_window_ms: u64,
    pub ai_max_actions_per_turn: u32,
    pub heartbeat_timeout_ms: u64,
    pub presence_check_interval_ms: u64,
    pub catalog_ttl_ms: u64,
    pub recent_events_page: usize,
    pub duel: DuelConfig,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            ai_step_delay_ms: 1500,
            ai_chain_delay_ms: 500,
            ai_dedupe_window_ms: 250,
            ai_max_actions_per_turn: 40,
            heartbeat_timeout_ms: 60_000,
            presence_check_interval_ms: 15_000,
            catalog_ttl_ms: 60_000,
            recent_events_page: 50,
            duel: DuelConfig::default(),
        }
    }
}
