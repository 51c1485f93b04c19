//! Resolves card references that use a printed-card id instead of an
//! instance id.
//!
//! Older clients address cards by definition id. A reference that already
//! names a visible instance is kept as is. Otherwise it is looked up by
//! definition among the cards the seat can see: hand references take the
//! first copy in hand, every other reference must match exactly one copy.
//! A reference that matches nothing is passed through for the engine to
//! reject.

use std::collections::BTreeSet;
use std::fmt;

use crate::command::{Command, CommandParseError, parse_command};
use crate::ids::{DefinitionId, InstanceId, Seat};
use crate::view::{PlayerView, SeatView};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizeError {
    Parse(CommandParseError),
    Ambiguous {
        field: &'static str,
        reference: String,
        count: usize,
    },
}

impl fmt::Display for NormalizeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NormalizeError::Parse(err) => write!(f, "{}", err),
            NormalizeError::Ambiguous {
                field,
                reference,
                count,
            } => write!(
                f,
                "{} {:?} matches {} cards; use an instance id",
                field, reference, count
            ),
        }
    }
}

impl std::error::Error for NormalizeError {}

impl From<CommandParseError> for NormalizeError {
    fn from(err: CommandParseError) -> Self {
        NormalizeError::Parse(err)
    }
}

/// A card the seat can see, with its printed id when known.
type Visible<'a> = (&'a InstanceId, Option<&'a DefinitionId>);

fn hand_cards(seat: &SeatView) -> Vec<Visible<'_>> {
    seat.hand
        .iter()
        .map(|c| (&c.card_id, c.definition.as_ref().map(|d| &d.id)))
        .collect()
}

fn board_cards(seat: &SeatView) -> Vec<Visible<'_>> {
    seat.board
        .iter()
        .map(|c| (&c.card_id, c.definition.as_ref().map(|d| &d.id)))
        .collect()
}

fn backrow_cards(seat: &SeatView) -> Vec<Visible<'_>> {
    seat.backrow
        .iter()
        .chain(seat.field_spell.iter())
        .map(|c| (&c.card_id, c.definition.as_ref().map(|d| &d.id)))
        .collect()
}

fn pile_cards(seat: &SeatView) -> Vec<Visible<'_>> {
    seat.graveyard
        .iter()
        .chain(seat.banished.iter())
        .map(|c| (&c.card_id, c.definition.as_ref().map(|d| &d.id)))
        .collect()
}

struct Resolver<'a> {
    known: BTreeSet<&'a InstanceId>,
    hand: Vec<Visible<'a>>,
    own_field: Vec<Visible<'a>>,
    own_board: Vec<Visible<'a>>,
    opponent_board: Vec<Visible<'a>>,
    everything: Vec<Visible<'a>>,
}

impl<'a> Resolver<'a> {
    fn new(view: &'a PlayerView, seat: Seat) -> Self {
        let me = view.seat(seat);
        let them = view.seat(seat.other());
        let hand = hand_cards(me);
        let own_board = board_cards(me);
        let own_field = [hand.clone(), own_board.clone(), backrow_cards(me)].concat();
        let opponent_board = board_cards(them);
        let everything = [
            own_field.clone(),
            pile_cards(me),
            hand_cards(them),
            opponent_board.clone(),
            backrow_cards(them),
            pile_cards(them),
        ]
        .concat();
        let known = everything.iter().map(|(id, _)| *id).collect();
        Self {
            known,
            hand,
            own_field,
            own_board,
            opponent_board,
            everything,
        }
    }

    fn matches(surface: &[Visible<'a>], reference: &InstanceId) -> Vec<&'a InstanceId> {
        surface
            .iter()
            .filter(|(_, def)| def.is_some_and(|d| d.as_str() == reference.as_str()))
            .map(|(id, _)| *id)
            .collect()
    }

    /// First copy wins.
    fn first(&self, reference: InstanceId) -> InstanceId {
        if self.known.contains(&reference) {
            return reference;
        }
        Self::matches(&self.hand, &reference)
            .first()
            .map(|id| (*id).clone())
            .unwrap_or(reference)
    }

    /// Exactly one copy, or an ambiguity error.
    fn unique(
        &self,
        surface: &[Visible<'a>],
        field: &'static str,
        reference: InstanceId,
    ) -> Result<InstanceId, NormalizeError> {
        if self.known.contains(&reference) {
            return Ok(reference);
        }
        match Self::matches(surface, &reference).as_slice() {
            [] => Ok(reference),
            [one] => Ok((*one).clone()),
            many => Err(NormalizeError::Ambiguous {
                field,
                reference: reference.0,
                count: many.len(),
            }),
        }
    }

    fn unique_all(
        &self,
        surface: &[Visible<'a>],
        field: &'static str,
        references: Vec<InstanceId>,
    ) -> Result<Vec<InstanceId>, NormalizeError> {
        references
            .into_iter()
            .map(|r| self.unique(surface, field, r))
            .collect()
    }
}

/// Rewrite every card reference in `command` to an instance id, using only
/// what `view` shows to `seat`.
pub fn normalize(command: Command, view: &PlayerView, seat: Seat) -> Result<Command, NormalizeError> {
    let r = Resolver::new(view, seat);
    let command = match command {
        Command::Summon {
            card_id,
            tribute_card_ids,
        } => Command::Summon {
            card_id: r.first(card_id),
            tribute_card_ids: r.unique_all(&r.own_board, "tributeCardIds", tribute_card_ids)?,
        },
        Command::SetMonster {
            card_id,
            tribute_card_ids,
        } => Command::SetMonster {
            card_id: r.first(card_id),
            tribute_card_ids: r.unique_all(&r.own_board, "tributeCardIds", tribute_card_ids)?,
        },
        Command::SetSpellTrap { card_id } => Command::SetSpellTrap {
            card_id: r.first(card_id),
        },
        Command::FlipSummon { card_id } => Command::FlipSummon {
            card_id: r.unique(&r.own_board, "cardId", card_id)?,
        },
        Command::ChangePosition { card_id } => Command::ChangePosition {
            card_id: r.unique(&r.own_board, "cardId", card_id)?,
        },
        Command::ActivateSpell {
            card_id,
            effect_index,
            targets,
        } => Command::ActivateSpell {
            card_id: r.unique(&r.own_field, "cardId", card_id)?,
            effect_index,
            targets: r.unique_all(&r.everything, "targets", targets)?,
        },
        Command::ActivateTrap {
            card_id,
            effect_index,
            targets,
        } => Command::ActivateTrap {
            card_id: r.unique(&r.own_field, "cardId", card_id)?,
            effect_index,
            targets: r.unique_all(&r.everything, "targets", targets)?,
        },
        Command::ActivateEffect {
            card_id,
            effect_index,
            targets,
        } => Command::ActivateEffect {
            card_id: r.unique(&r.own_field, "cardId", card_id)?,
            effect_index,
            targets: r.unique_all(&r.everything, "targets", targets)?,
        },
        Command::ChainResponse {
            pass,
            card_id,
            effect_index,
            targets,
        } => Command::ChainResponse {
            pass,
            card_id: card_id
                .map(|id| r.unique(&r.own_field, "cardId", id))
                .transpose()?,
            effect_index,
            targets: r.unique_all(&r.everything, "targets", targets)?,
        },
        Command::DeclareAttack {
            attacker_card_id,
            target_card_id,
        } => Command::DeclareAttack {
            attacker_card_id: r.unique(&r.own_board, "attackerCardId", attacker_card_id)?,
            target_card_id: target_card_id
                .map(|id| r.unique(&r.opponent_board, "targetCardId", id))
                .transpose()?,
        },
        other @ (Command::AdvancePhase | Command::EndTurn | Command::Surrender) => other,
    };
    Ok(command.canonicalize())
}

/// Strict parse followed by [`normalize`].
pub fn normalize_wire(raw: &str, view: &PlayerView, seat: Seat) -> Result<Command, NormalizeError> {
    normalize(parse_command(raw)?, view, seat)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::starter::starter_catalog;
    use crate::config::DuelConfig;
    use crate::game_state::{BoardCard, GameState, Phase, Position};
    use crate::view::player_view;

    fn state_with(hand: &[(u32, &str)], board: &[(u32, &str)]) -> GameState {
        let mut state = GameState::empty(DuelConfig::default(), 1, Seat::Host);
        state.turn_number = 2;
        state.current_phase = Phase::Main;
        for (serial, def) in hand {
            let id = InstanceId::mint(*serial);
            state
                .instance_to_definition
                .insert(id.clone(), DefinitionId::new(*def));
            state.player_mut(Seat::Host).hand.push(id);
        }
        for (serial, def) in board {
            let id = InstanceId::mint(*serial);
            state
                .instance_to_definition
                .insert(id.clone(), DefinitionId::new(*def));
            state.player_mut(Seat::Host).board.push(BoardCard::new(
                id,
                DefinitionId::new(*def),
                Position::Attack,
                true,
                1,
            ));
        }
        state
    }

    #[test]
    fn instance_ids_pass_through() {
        let catalog = starter_catalog();
        let state = state_with(&[(1, "hall-monitor")], &[]);
        let view = player_view(&state, &catalog, Seat::Host);
        let command = Command::Summon {
            card_id: InstanceId::mint(1),
            tribute_card_ids: Vec::new(),
        };
        assert_eq!(normalize(command.clone(), &view, Seat::Host), Ok(command));
    }

    #[test]
    fn hand_references_take_the_first_copy() {
        let catalog = starter_catalog();
        let state = state_with(&[(5, "pop-quiz"), (2, "pop-quiz")], &[]);
        let view = player_view(&state, &catalog, Seat::Host);
        let legacy = Command::SetSpellTrap {
            card_id: InstanceId::from_raw("pop-quiz"),
        };
        for _ in 0..3 {
            assert_eq!(
                normalize(legacy.clone(), &view, Seat::Host),
                Ok(Command::SetSpellTrap {
                    card_id: InstanceId::mint(5)
                })
            );
        }
    }

    #[test]
    fn board_references_must_be_unique() {
        let catalog = starter_catalog();
        let state = state_with(&[], &[(3, "hall-monitor"), (4, "hall-monitor")]);
        let view = player_view(&state, &catalog, Seat::Host);
        let result = normalize(
            Command::ChangePosition {
                card_id: InstanceId::from_raw("hall-monitor"),
            },
            &view,
            Seat::Host,
        );
        assert_eq!(
            result,
            Err(NormalizeError::Ambiguous {
                field: "cardId",
                reference: "hall-monitor".to_string(),
                count: 2
            })
        );
    }

    #[test]
    fn unknown_references_are_left_for_the_engine() {
        let catalog = starter_catalog();
        let state = state_with(&[], &[]);
        let view = player_view(&state, &catalog, Seat::Host);
        let command = Command::FlipSummon {
            card_id: InstanceId::from_raw("no-such-card"),
        };
        assert_eq!(normalize(command.clone(), &view, Seat::Host), Ok(command));
    }

    #[test]
    fn wire_parse_errors_surface() {
        let catalog = starter_catalog();
        let state = state_with(&[], &[]);
        let view = player_view(&state, &catalog, Seat::Host);
        assert!(matches!(
            normalize_wire("{not json", &view, Seat::Host),
            Err(NormalizeError::Parse(CommandParseError::Malformed(_)))
        ));
    }
}
