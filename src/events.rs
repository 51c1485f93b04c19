//! Externally observable effects of an accepted command.
//!
//! The append log stores these; the state snapshot is derived from them.

use serde::{Deserialize, Serialize};

use crate::cards::{ModifierExpiry, Restriction};
use crate::game_state::{Phase, Position, WinReason};
use crate::ids::{InstanceId, Seat};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DestroyCause {
    Battle,
    Effect,
    Breakdown,
    Tribute,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DamageSource {
    Battle,
    Effect,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameEvent {
    #[serde(rename_all = "camelCase")]
    DuelStarted { first_player: Seat, seed: u64 },
    /// `card_id` is `None` once redacted for a viewer who may not see it.
    #[serde(rename_all = "camelCase")]
    CardDrawn {
        seat: Seat,
        card_id: Option<InstanceId>,
    },
    #[serde(rename_all = "camelCase")]
    TurnStarted { seat: Seat, turn_number: u32 },
    PhaseChanged { seat: Seat, from: Phase, to: Phase },
    #[serde(rename_all = "camelCase")]
    MonsterSummoned {
        seat: Seat,
        card_id: InstanceId,
        tributes: Vec<InstanceId>,
    },
    #[serde(rename_all = "camelCase")]
    MonsterSet {
        seat: Seat,
        card_id: Option<InstanceId>,
        tributes: Vec<InstanceId>,
    },
    #[serde(rename_all = "camelCase")]
    FlipSummoned { seat: Seat, card_id: InstanceId },
    #[serde(rename_all = "camelCase")]
    PositionChanged {
        seat: Seat,
        card_id: InstanceId,
        position: Position,
    },
    #[serde(rename_all = "camelCase")]
    SpellTrapSet {
        seat: Seat,
        card_id: Option<InstanceId>,
    },
    /// `link` is the 1-based chain position of the new link.
    #[serde(rename_all = "camelCase")]
    ChainLinkAdded {
        seat: Seat,
        card_id: InstanceId,
        effect_index: usize,
        link: usize,
        targets: Vec<InstanceId>,
    },
    PriorityPassed { seat: Seat },
    #[serde(rename_all = "camelCase")]
    ChainLinkResolved {
        seat: Seat,
        card_id: InstanceId,
        effect_index: usize,
        link: usize,
    },
    ChainResolved,
    #[serde(rename_all = "camelCase")]
    AttackDeclared {
        seat: Seat,
        attacker: InstanceId,
        target: Option<InstanceId>,
    },
    #[serde(rename_all = "camelCase")]
    CardFlipped { owner: Seat, card_id: InstanceId },
    #[serde(rename_all = "camelCase")]
    CardDestroyed {
        owner: Seat,
        card_id: InstanceId,
        cause: DestroyCause,
    },
    #[serde(rename_all = "camelCase")]
    CardBanished { owner: Seat, card_id: InstanceId },
    #[serde(rename_all = "camelCase")]
    CardReturnedToHand { owner: Seat, card_id: InstanceId },
    #[serde(rename_all = "camelCase")]
    CardDiscarded { owner: Seat, card_id: InstanceId },
    #[serde(rename_all = "camelCase")]
    CardSentToGraveyard { owner: Seat, card_id: InstanceId },
    DamageDealt {
        seat: Seat,
        amount: i32,
        source: DamageSource,
    },
    LifeGained { seat: Seat, amount: i32 },
    #[serde(rename_all = "camelCase")]
    ModifierApplied {
        card_id: InstanceId,
        attack: i32,
        defense: i32,
        expiry: ModifierExpiry,
    },
    #[serde(rename_all = "camelCase")]
    ModifierExpired { card_id: InstanceId },
    #[serde(rename_all = "camelCase")]
    ViceCountersAdded {
        card_id: InstanceId,
        amount: u32,
        total: u32,
    },
    /// A monster of `owner` broke down; `credited` gains a breakdown.
    #[serde(rename_all = "camelCase")]
    Breakdown {
        owner: Seat,
        card_id: InstanceId,
        credited: Seat,
        total: u32,
    },
    #[serde(rename_all = "camelCase")]
    RestrictionApplied {
        seat: Seat,
        restriction: Restriction,
        expires_on_turn: u32,
    },
    #[serde(rename_all = "camelCase")]
    TributeDiscountGranted { seat: Seat, expires_on_turn: u32 },
    CoinTossed { seat: Seat, heads: bool },
    GameEnded { winner: Seat, reason: WinReason },
}

impl GameEvent {
    /// Copy of the event as `viewer` may see it. `None` is a spectator.
    ///
    /// Drawn cards and face-down sets are hidden from everyone but their owner.
    pub fn redacted_for(&self, viewer: Option<Seat>) -> GameEvent {
        let hidden = |seat: &Seat| viewer != Some(*seat);
        match self {
            GameEvent::CardDrawn { seat, .. } if hidden(seat) => GameEvent::CardDrawn {
                seat: *seat,
                card_id: None,
            },
            GameEvent::MonsterSet { seat, tributes, .. } if hidden(seat) => {
                GameEvent::MonsterSet {
                    seat: *seat,
                    card_id: None,
                    tributes: tributes.clone(),
                }
            }
            GameEvent::SpellTrapSet { seat, .. } if hidden(seat) => GameEvent::SpellTrapSet {
                seat: *seat,
                card_id: None,
            },
            other => other.clone(),
        }
    }

    pub fn is_game_end(&self) -> bool {
        matches!(self, GameEvent::GameEnded { .. })
    }
}

pub fn redact_all(events: &[GameEvent], viewer: Option<Seat>) -> Vec<GameEvent> {
    events.iter().map(|e| e.redacted_for(viewer)).collect()
}
