//! Match orchestration around the engine: the event log, snapshots, the job
//! queue for AI pacing and presence, and the legacy-command normalizer.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::command::WireCommand;
use crate::engine::RejectReason;
use crate::events::{GameEvent, redact_all};
use crate::ids::{DefinitionId, MatchId, PlayerIdentity, Seat, Version};

pub mod normalize;
pub mod queue;
pub mod runtime;
pub mod snapshot;
pub mod store;

pub use normalize::{NormalizeError, normalize};
pub use queue::{Job, JobKind, JobSlots};
pub use runtime::{Orchestrator, OrchestratorError};
pub use snapshot::Snapshot;
pub use store::{InMemoryStore, MatchStore, StoreError};

/// Identity recorded for the scripted opponent.
pub const AI_IDENTITY: &str = "ai-opponent";

/// The scripted opponent always sits in the away seat.
pub const AI_SEAT: Seat = Seat::Away;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Waiting,
    Active,
    Ended,
    Canceled,
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MatchStatus::Waiting => "waiting",
            MatchStatus::Active => "active",
            MatchStatus::Ended => "ended",
            MatchStatus::Canceled => "canceled",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    Pvp,
    Story,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchMeta {
    pub match_id: MatchId,
    pub host: PlayerIdentity,
    pub away: Option<PlayerIdentity>,
    pub host_deck: Vec<DefinitionId>,
    pub away_deck: Vec<DefinitionId>,
    pub mode: MatchMode,
    pub ai_opponent: bool,
    pub status: MatchStatus,
    /// Set when the match starts.
    pub seed: Option<u64>,
    pub first_player: Option<Seat>,
    pub created_at: u64,
}

impl MatchMeta {
    pub fn seat_of(&self, identity: &PlayerIdentity) -> Option<Seat> {
        if &self.host == identity {
            Some(Seat::Host)
        } else if self.away.as_ref() == Some(identity) {
            Some(Seat::Away)
        } else {
            None
        }
    }

    pub fn identity(&self, seat: Seat) -> Option<&PlayerIdentity> {
        match seat {
            Seat::Host => Some(&self.host),
            Seat::Away => self.away.as_ref(),
        }
    }

    pub fn is_ai_seat(&self, seat: Seat) -> bool {
        self.ai_opponent && seat == AI_SEAT
    }
}

/// One accepted command and everything it caused, as stored in the log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventBatch {
    pub match_id: MatchId,
    pub version: Version,
    pub events: Vec<GameEvent>,
    /// `None` for the opening batch.
    pub command: Option<WireCommand>,
    pub seat: Option<Seat>,
    pub created_at: u64,
}

/// What became of a well-formed, authorized command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    Accepted(EventBatch),
    /// The engine refused the command. Nothing was appended and the match
    /// is still at `version`.
    Rejected {
        reason: RejectReason,
        version: Version,
    },
}

impl Submission {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Submission::Accepted(_))
    }

    pub fn batch(&self) -> Option<&EventBatch> {
        match self {
            Submission::Accepted(batch) => Some(batch),
            Submission::Rejected { .. } => None,
        }
    }

    pub fn into_batch(self) -> Option<EventBatch> {
        match self {
            Submission::Accepted(batch) => Some(batch),
            Submission::Rejected { .. } => None,
        }
    }

    pub fn rejection(&self) -> Option<&RejectReason> {
        match self {
            Submission::Accepted(_) => None,
            Submission::Rejected { reason, .. } => Some(reason),
        }
    }

    /// The match version after the submission.
    pub fn version(&self) -> Version {
        match self {
            Submission::Accepted(batch) => batch.version,
            Submission::Rejected { version, .. } => *version,
        }
    }

    /// Empty for a rejected command.
    pub fn events(&self) -> &[GameEvent] {
        self.batch().map_or(&[], |b| b.events.as_slice())
    }
}

impl EventBatch {
    /// Copy of the batch as `viewer` may see it. The acting seat sees its own
    /// command in full; everyone else gets set commands with the card hidden.
    pub fn redacted_for(&self, viewer: Option<Seat>) -> EventBatch {
        let command = match (&self.command, viewer == self.seat) {
            (Some(WireCommand::Known(command)), false) => {
                Some(WireCommand::Known(command.redacted()))
            }
            (other, _) => other.clone(),
        };
        EventBatch {
            match_id: self.match_id.clone(),
            version: self.version,
            events: redact_all(&self.events, viewer),
            command,
            seat: self.seat,
            created_at: self.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Command;
    use crate::ids::InstanceId;

    #[test]
    fn set_command_is_hidden_from_the_other_seat() {
        let card = InstanceId::mint(4);
        let batch = EventBatch {
            match_id: MatchId::new("m1"),
            version: 3,
            events: vec![GameEvent::SpellTrapSet {
                seat: Seat::Host,
                card_id: Some(card.clone()),
            }],
            command: Some(WireCommand::Known(Command::SetSpellTrap {
                card_id: card.clone(),
            })),
            seat: Some(Seat::Host),
            created_at: 0,
        };

        assert_eq!(batch.redacted_for(Some(Seat::Host)), batch);

        let other = batch.redacted_for(Some(Seat::Away));
        assert_eq!(
            other.command,
            Some(WireCommand::Known(Command::SetSpellTrap {
                card_id: InstanceId::from_raw("")
            }))
        );
        assert_eq!(
            other.events,
            vec![GameEvent::SpellTrapSet {
                seat: Seat::Host,
                card_id: None
            }]
        );
        assert_eq!(batch.redacted_for(None).command, other.command);
    }

    #[test]
    fn seats_resolve_from_identity() {
        let meta = MatchMeta {
            match_id: MatchId::new("m1"),
            host: PlayerIdentity::new("ada"),
            away: Some(PlayerIdentity::new("bo")),
            host_deck: Vec::new(),
            away_deck: Vec::new(),
            mode: MatchMode::Pvp,
            ai_opponent: false,
            status: MatchStatus::Active,
            seed: None,
            first_player: None,
            created_at: 0,
        };
        assert_eq!(meta.seat_of(&PlayerIdentity::new("ada")), Some(Seat::Host));
        assert_eq!(meta.seat_of(&PlayerIdentity::new("bo")), Some(Seat::Away));
        assert_eq!(meta.seat_of(&PlayerIdentity::new("eve")), None);
        assert!(!meta.is_ai_seat(Seat::Away));
    }
}
