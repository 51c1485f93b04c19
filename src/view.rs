//! Seat-scoped and spectator projections of the canonical state.
//!
//! A view carries everything a client (or the AI, or the valid-action
//! deriver) may know: its own hand, both boards with the other side's
//! face-down identities withheld, and the public turn bookkeeping.

use serde::{Deserialize, Serialize};

use crate::cards::{CardCatalog, CardDefinition};
use crate::config::DuelConfig;
use crate::game_state::{
    BoardCard, ChainLink, CoinTossRecord, CostModifier, GameState, Phase, Position, SpellTrapCard,
    TurnRestriction, WinReason,
};
use crate::ids::{InstanceId, Seat};

/// A card reference with its printed definition, or `None` when hidden.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardFace {
    pub card_id: InstanceId,
    pub definition: Option<CardDefinition>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardCardView {
    pub card_id: InstanceId,
    pub definition: Option<CardDefinition>,
    pub position: Position,
    pub face_up: bool,
    pub turn_summoned: u32,
    pub vice_counters: u32,
    pub attacked_this_turn: bool,
    pub position_changed_this_turn: bool,
    pub effects_used_this_turn: Vec<usize>,
    /// Effective values; hidden with the definition.
    pub attack: Option<i32>,
    pub defense: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpellTrapView {
    pub card_id: InstanceId,
    pub definition: Option<CardDefinition>,
    pub face_up: bool,
    pub turn_set: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatView {
    pub seat: Seat,
    pub life: i32,
    pub breakdowns_caused: u32,
    pub hand_count: usize,
    /// Empty unless the viewer owns this seat.
    pub hand: Vec<CardFace>,
    pub board: Vec<BoardCardView>,
    pub backrow: Vec<SpellTrapView>,
    pub field_spell: Option<SpellTrapView>,
    pub deck_count: usize,
    pub graveyard: Vec<CardFace>,
    pub banished: Vec<CardFace>,
    pub normal_summoned_this_turn: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerView {
    /// `None` for a spectator.
    pub my_seat: Option<Seat>,
    pub config: DuelConfig,
    pub turn_number: u32,
    pub current_phase: Phase,
    pub current_turn_player: Seat,
    pub current_priority_player: Option<Seat>,
    pub first_player: Seat,
    pub chain: Vec<ChainLink>,
    pub seats: [SeatView; 2],
    pub turn_restrictions: Vec<TurnRestriction>,
    pub cost_modifiers: Vec<CostModifier>,
    pub last_coin_toss: Option<CoinTossRecord>,
    pub game_over: bool,
    pub winner: Option<Seat>,
    pub win_reason: Option<WinReason>,
}

impl PlayerView {
    pub fn seat(&self, seat: Seat) -> &SeatView {
        &self.seats[seat.index()]
    }

    /// Mirrors [`GameState::decision_seat`].
    pub fn decision_seat(&self) -> Option<Seat> {
        if self.game_over {
            None
        } else if !self.chain.is_empty() {
            self.current_priority_player
        } else {
            Some(self.current_turn_player)
        }
    }

    pub fn chain_active(&self) -> bool {
        !self.chain.is_empty()
    }
}

/// View for the owner of `seat`.
pub fn player_view(state: &GameState, catalog: &CardCatalog, seat: Seat) -> PlayerView {
    project(state, catalog, Some(seat))
}

/// Unauthenticated view: both hands and all face-down cards hidden.
pub fn spectator_view(state: &GameState, catalog: &CardCatalog) -> PlayerView {
    project(state, catalog, None)
}

fn project(state: &GameState, catalog: &CardCatalog, viewer: Option<Seat>) -> PlayerView {
    PlayerView {
        my_seat: viewer,
        config: state.config.clone(),
        turn_number: state.turn_number,
        current_phase: state.current_phase,
        current_turn_player: state.current_turn_player,
        current_priority_player: state.current_priority_player,
        first_player: state.first_player,
        chain: state.current_chain.clone(),
        seats: [
            seat_view(state, catalog, Seat::Host, viewer),
            seat_view(state, catalog, Seat::Away, viewer),
        ],
        turn_restrictions: state.turn_restrictions.clone(),
        cost_modifiers: state.cost_modifiers.clone(),
        last_coin_toss: state.last_coin_toss.clone(),
        game_over: state.game_over,
        winner: state.winner,
        win_reason: state.win_reason,
    }
}

fn seat_view(
    state: &GameState,
    catalog: &CardCatalog,
    seat: Seat,
    viewer: Option<Seat>,
) -> SeatView {
    let player = state.player(seat);
    let owner_view = viewer == Some(seat);
    let face = |id: &InstanceId| CardFace {
        card_id: id.clone(),
        definition: state.definition(catalog, id).cloned(),
    };

    SeatView {
        seat,
        life: player.life,
        breakdowns_caused: player.breakdowns_caused,
        hand_count: player.hand.len(),
        hand: if owner_view {
            player.hand.iter().map(face).collect()
        } else {
            Vec::new()
        },
        board: player
            .board
            .iter()
            .map(|c| board_card_view(state, catalog, c, owner_view || c.face_up))
            .collect(),
        backrow: player
            .backrow
            .iter()
            .map(|c| spell_trap_view(catalog, c, owner_view || c.face_up))
            .collect(),
        field_spell: player
            .field_spell
            .as_ref()
            .map(|c| spell_trap_view(catalog, c, owner_view || c.face_up)),
        deck_count: player.deck.len(),
        graveyard: player.graveyard.iter().map(face).collect(),
        banished: player.banished.iter().map(face).collect(),
        normal_summoned_this_turn: player.normal_summoned_this_turn,
    }
}

fn board_card_view(
    state: &GameState,
    catalog: &CardCatalog,
    card: &BoardCard,
    visible: bool,
) -> BoardCardView {
    BoardCardView {
        card_id: card.card_id.clone(),
        definition: visible
            .then(|| catalog.get(&card.definition_id).cloned())
            .flatten(),
        position: card.position,
        face_up: card.face_up,
        turn_summoned: card.turn_summoned,
        vice_counters: card.vice_counters,
        attacked_this_turn: card.attacked_this_turn,
        position_changed_this_turn: card.position_changed_this_turn,
        effects_used_this_turn: card.effects_used_this_turn.clone(),
        attack: visible.then(|| state.effective_attack(catalog, card)),
        defense: visible.then(|| state.effective_defense(catalog, card)),
    }
}

fn spell_trap_view(catalog: &CardCatalog, card: &SpellTrapCard, visible: bool) -> SpellTrapView {
    SpellTrapView {
        card_id: card.card_id.clone(),
        definition: visible
            .then(|| catalog.get(&card.definition_id).cloned())
            .flatten(),
        face_up: card.face_up,
        turn_set: card.turn_set,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::starter::{starter_catalog, starter_deck};
    use crate::engine::start_duel;

    fn started() -> GameState {
        let deck = starter_deck();
        let mut state = GameState::new(DuelConfig::default(), 21, Seat::Host, &deck, &deck);
        start_duel(&mut state);
        state
    }

    #[test]
    fn opponent_hand_is_a_count_only() {
        let catalog = starter_catalog();
        let state = started();
        let view = player_view(&state, &catalog, Seat::Host);
        assert_eq!(view.seat(Seat::Host).hand.len(), 5);
        assert!(view.seat(Seat::Host).hand.iter().all(|c| c.definition.is_some()));
        assert!(view.seat(Seat::Away).hand.is_empty());
        assert_eq!(view.seat(Seat::Away).hand_count, 5);
    }

    #[test]
    fn face_down_cards_hide_identity_from_others() {
        let catalog = starter_catalog();
        let mut state = started();
        let id = state.player(Seat::Host).hand[0].clone();
        state.player_mut(Seat::Host).hand.remove(0);
        let def = state.definition_id(&id).cloned().unwrap();
        state.player_mut(Seat::Host).backrow.push(SpellTrapCard {
            card_id: id.clone(),
            definition_id: def,
            face_up: false,
            turn_set: 1,
        });

        let own = player_view(&state, &catalog, Seat::Host);
        assert!(own.seat(Seat::Host).backrow[0].definition.is_some());

        let other = player_view(&state, &catalog, Seat::Away);
        assert_eq!(other.seat(Seat::Host).backrow[0].card_id, id);
        assert!(other.seat(Seat::Host).backrow[0].definition.is_none());

        let spectator = spectator_view(&state, &catalog);
        assert!(spectator.seat(Seat::Host).backrow[0].definition.is_none());
        assert!(spectator.seat(Seat::Host).hand.is_empty());
        assert!(spectator.seat(Seat::Away).hand.is_empty());
        assert_eq!(spectator.my_seat, None);
    }
}
