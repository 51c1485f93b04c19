//! Rule families used by the engine.
//!
//! Every rule function takes a scratch copy of the state, validates before it
//! mutates, and reports a [`RejectReason`] instead of failing. The engine
//! throws the scratch copy away on rejection.

pub mod chain;
pub mod combat;
pub mod effects;
pub mod state_based;
pub mod summon;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::cards::CardCatalog;
use crate::game_state::{GameState, Phase};
use crate::ids::{InstanceId, Seat};

/// Why a command was not applied. Rejections are values, never errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum RejectReason {
    GameOver,
    NotYourTurn,
    NotPriorityHolder,
    ChainActive,
    NoChain,
    WrongPhase { phase: Phase },
    CardNotFound { card_id: InstanceId },
    NotInHand { card_id: InstanceId },
    NotOnBoard { card_id: InstanceId },
    NotInBackrow { card_id: InstanceId },
    NotAMonster { card_id: InstanceId },
    NotASpell { card_id: InstanceId },
    NotATrap { card_id: InstanceId },
    AlreadyNormalSummoned,
    BoardFull,
    BackrowFull,
    TributeMismatch { required: usize, supplied: usize },
    InvalidTribute { card_id: InstanceId },
    FaceDown { card_id: InstanceId },
    NotFaceDown { card_id: InstanceId },
    SummonedThisTurn { card_id: InstanceId },
    PositionAlreadyChanged { card_id: InstanceId },
    NotInAttackPosition { card_id: InstanceId },
    AlreadyAttacked { card_id: InstanceId },
    AttackRestricted,
    SpellsRestricted,
    DirectAttackBlocked,
    InvalidTarget { card_id: Option<InstanceId> },
    NoSuchEffect { card_id: InstanceId, effect_index: usize },
    EffectAlreadyUsed { card_id: InstanceId },
    NotQuickSpeed { card_id: InstanceId },
    SetThisTurn { card_id: InstanceId },
    AlreadyActive { card_id: InstanceId },
    /// CHAIN_RESPONSE without `pass` must name a card.
    MissingCard,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::GameOver => write!(f, "game is over"),
            RejectReason::NotYourTurn => write!(f, "not your turn"),
            RejectReason::NotPriorityHolder => write!(f, "you do not hold priority"),
            RejectReason::ChainActive => write!(f, "a chain is unresolved"),
            RejectReason::NoChain => write!(f, "no chain to respond to"),
            RejectReason::WrongPhase { phase } => write!(f, "not allowed in {:?} phase", phase),
            RejectReason::CardNotFound { card_id } => write!(f, "unknown card {}", card_id),
            RejectReason::NotInHand { card_id } => write!(f, "{} is not in your hand", card_id),
            RejectReason::NotOnBoard { card_id } => write!(f, "{} is not on your board", card_id),
            RejectReason::NotInBackrow { card_id } => {
                write!(f, "{} is not in your spell/trap zone", card_id)
            }
            RejectReason::NotAMonster { card_id } => write!(f, "{} is not a monster", card_id),
            RejectReason::NotASpell { card_id } => write!(f, "{} is not a spell", card_id),
            RejectReason::NotATrap { card_id } => write!(f, "{} is not a trap", card_id),
            RejectReason::AlreadyNormalSummoned => write!(f, "already normal summoned this turn"),
            RejectReason::BoardFull => write!(f, "no free monster slot"),
            RejectReason::BackrowFull => write!(f, "no free spell/trap slot"),
            RejectReason::TributeMismatch { required, supplied } => write!(
                f,
                "summon needs {} tribute(s), {} supplied",
                required, supplied
            ),
            RejectReason::InvalidTribute { card_id } => {
                write!(f, "{} cannot be tributed", card_id)
            }
            RejectReason::FaceDown { card_id } => write!(f, "{} is face-down", card_id),
            RejectReason::NotFaceDown { card_id } => write!(f, "{} is not face-down", card_id),
            RejectReason::SummonedThisTurn { card_id } => {
                write!(f, "{} was summoned this turn", card_id)
            }
            RejectReason::PositionAlreadyChanged { card_id } => {
                write!(f, "{} already changed position this turn", card_id)
            }
            RejectReason::NotInAttackPosition { card_id } => {
                write!(f, "{} is not in attack position", card_id)
            }
            RejectReason::AlreadyAttacked { card_id } => {
                write!(f, "{} already attacked this turn", card_id)
            }
            RejectReason::AttackRestricted => write!(f, "you cannot attack this turn"),
            RejectReason::SpellsRestricted => write!(f, "you cannot activate spells this turn"),
            RejectReason::DirectAttackBlocked => {
                write!(f, "direct attack needs an empty opposing board")
            }
            RejectReason::InvalidTarget { card_id: Some(id) } => {
                write!(f, "{} is not a legal target", id)
            }
            RejectReason::InvalidTarget { card_id: None } => write!(f, "a target is required"),
            RejectReason::NoSuchEffect {
                card_id,
                effect_index,
            } => write!(f, "{} has no effect {}", card_id, effect_index),
            RejectReason::EffectAlreadyUsed { card_id } => {
                write!(f, "{} already used its effect this turn", card_id)
            }
            RejectReason::NotQuickSpeed { card_id } => {
                write!(f, "{} cannot be activated as a chain response", card_id)
            }
            RejectReason::SetThisTurn { card_id } => write!(f, "{} was set this turn", card_id),
            RejectReason::AlreadyActive { card_id } => {
                write!(f, "{} is already face-up", card_id)
            }
            RejectReason::MissingCard => write!(f, "chain response names no card"),
        }
    }
}

pub type RuleResult = Result<(), RejectReason>;

/// Who is acting, and the catalog their cards resolve through.
#[derive(Debug, Clone, Copy)]
pub struct RulesContext<'a> {
    pub catalog: &'a CardCatalog,
    pub actor: Seat,
}

impl<'a> RulesContext<'a> {
    pub fn new(catalog: &'a CardCatalog, actor: Seat) -> Self {
        Self { catalog, actor }
    }

    pub fn opponent(&self) -> Seat {
        self.actor.other()
    }
}

/// Turn player, empty chain, live game.
pub(crate) fn require_open_turn(state: &GameState, seat: Seat) -> RuleResult {
    if state.game_over {
        return Err(RejectReason::GameOver);
    }
    if state.current_turn_player != seat {
        return Err(RejectReason::NotYourTurn);
    }
    if state.chain_active() {
        return Err(RejectReason::ChainActive);
    }
    Ok(())
}

/// [`require_open_turn`] plus a main phase.
pub(crate) fn require_main_phase(state: &GameState, seat: Seat) -> RuleResult {
    require_open_turn(state, seat)?;
    if !state.current_phase.is_main() {
        return Err(RejectReason::WrongPhase {
            phase: state.current_phase,
        });
    }
    Ok(())
}
