pub mod ai;
pub mod cards;
pub mod clock;
pub mod command;
pub mod config;
pub mod decision;
pub mod engine;
pub mod events;
pub mod game_state;
pub mod ids;
pub mod net;
pub mod rules;
pub mod seed;
pub mod turn;
pub mod view;
pub mod zone;

#[cfg(test)]
mod tests;

pub use ai::choose_command;
pub use cards::{CardCatalog, CardDefinition, CardDefinitionBuilder, CardKind};
pub use clock::{Clock, ManualClock, SystemClock};
pub use command::{Command, CommandParseError, WireCommand, parse_command};
pub use config::{DuelConfig, OrchestratorConfig};
pub use decision::{ValidActions, derive_valid_actions, is_legal};
pub use engine::{Outcome, RejectReason, Transition, apply_with_auto_advance, evolve, start_duel};
pub use events::GameEvent;
pub use game_state::{GameState, Phase, Position, WinReason};
pub use ids::{DefinitionId, InstanceId, MatchId, PlayerIdentity, Seat, Version};
pub use net::{EventBatch, MatchMeta, MatchMode, MatchStatus, Orchestrator, OrchestratorError, Submission};
pub use view::{PlayerView, player_view, spectator_view};
pub use zone::Zone;
