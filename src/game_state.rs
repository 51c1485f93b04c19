//! Canonical per-match state.
//!
//! `GameState` is the single source of truth for a duel. Every card a seat
//! owns lives in exactly one of that seat's zones; cards are moved between
//! zone vectors, never copied.

use std::collections::BTreeMap;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::cards::{CardCatalog, CardDefinition, Restriction};
use crate::config::DuelConfig;
use crate::ids::{DefinitionId, InstanceId, Seat};
use crate::seed::sub_seed;
use crate::zone::Zone;

pub use crate::cards::ModifierExpiry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Draw,
    Standby,
    Main,
    Combat,
    Main2,
    BreakdownCheck,
    End,
}

impl Phase {
    /// Next phase within the same turn, or None after `End`.
    pub fn next(self) -> Option<Phase> {
        match self {
            Phase::Draw => Some(Phase::Standby),
            Phase::Standby => Some(Phase::Main),
            Phase::Main => Some(Phase::Combat),
            Phase::Combat => Some(Phase::Main2),
            Phase::Main2 => Some(Phase::BreakdownCheck),
            Phase::BreakdownCheck => Some(Phase::End),
            Phase::End => None,
        }
    }

    /// Phases that carry no decision and are advanced by the consumer.
    pub fn is_auto(self) -> bool {
        matches!(
            self,
            Phase::Draw | Phase::Standby | Phase::BreakdownCheck | Phase::End
        )
    }

    pub fn is_main(self) -> bool {
        matches!(self, Phase::Main | Phase::Main2)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Position {
    Attack,
    Defense,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WinReason {
    LpZero,
    DeckOut,
    Surrender,
    Breakdown,
}

/// A monster instance on the board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardCard {
    pub card_id: InstanceId,
    pub definition_id: DefinitionId,
    pub position: Position,
    pub face_up: bool,
    pub turn_summoned: u32,
    pub vice_counters: u32,
    pub attacked_this_turn: bool,
    pub position_changed_this_turn: bool,
    /// Effect indices already used this turn (monster effects are once per turn).
    pub effects_used_this_turn: Vec<usize>,
}

impl BoardCard {
    pub fn new(
        card_id: InstanceId,
        definition_id: DefinitionId,
        position: Position,
        face_up: bool,
        turn_summoned: u32,
    ) -> Self {
        Self {
            card_id,
            definition_id,
            position,
            face_up,
            turn_summoned,
            vice_counters: 0,
            attacked_this_turn: false,
            position_changed_this_turn: false,
            effects_used_this_turn: Vec::new(),
        }
    }
}

/// A spell or trap instance in the backrow or the field slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpellTrapCard {
    pub card_id: InstanceId,
    pub definition_id: DefinitionId,
    pub face_up: bool,
    pub turn_set: u32,
}

/// One activation waiting on the chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainLink {
    pub card_id: InstanceId,
    pub effect_index: usize,
    pub activating_player: Seat,
    pub targets: Vec<InstanceId>,
}

/// Stat change attached to a board instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Modifier {
    pub card_id: InstanceId,
    pub attack: i32,
    pub defense: i32,
    pub expiry: ModifierExpiry,
    pub applied_turn: u32,
}

impl Modifier {
    /// Whether the modifier lapses in the end phase of `turn`.
    pub fn expires_at_end_of(&self, turn: u32) -> bool {
        match self.expiry {
            ModifierExpiry::EndOfTurn => self.applied_turn <= turn,
            ModifierExpiry::EndOfNextTurn => self.applied_turn < turn,
            ModifierExpiry::Permanent => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostModifierKind {
    TributeDiscount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostModifier {
    pub seat: Seat,
    pub kind: CostModifierKind,
    pub expires_on_turn: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnRestriction {
    pub seat: Seat,
    pub restriction: Restriction,
    pub expires_on_turn: u32,
}

/// Outcome of the most recent coin-toss effect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoinTossRecord {
    pub seat: Seat,
    pub heads: bool,
    pub turn: u32,
}

/// Everything one seat owns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerState {
    pub seat: Seat,
    pub life: i32,
    pub breakdowns_caused: u32,
    pub hand: Vec<InstanceId>,
    pub board: Vec<BoardCard>,
    pub backrow: Vec<SpellTrapCard>,
    pub field_spell: Option<SpellTrapCard>,
    /// Index 0 is the top of the deck.
    pub deck: Vec<InstanceId>,
    pub graveyard: Vec<InstanceId>,
    pub banished: Vec<InstanceId>,
    pub normal_summoned_this_turn: bool,
}

impl PlayerState {
    pub fn new(seat: Seat, life: i32) -> Self {
        Self {
            seat,
            life,
            breakdowns_caused: 0,
            hand: Vec::new(),
            board: Vec::new(),
            backrow: Vec::new(),
            field_spell: None,
            deck: Vec::new(),
            graveyard: Vec::new(),
            banished: Vec::new(),
            normal_summoned_this_turn: false,
        }
    }

    pub fn board_card(&self, id: &InstanceId) -> Option<&BoardCard> {
        self.board.iter().find(|c| &c.card_id == id)
    }

    pub fn board_card_mut(&mut self, id: &InstanceId) -> Option<&mut BoardCard> {
        self.board.iter_mut().find(|c| &c.card_id == id)
    }

    pub fn backrow_card(&self, id: &InstanceId) -> Option<&SpellTrapCard> {
        self.backrow.iter().find(|c| &c.card_id == id)
    }

    pub fn hand_contains(&self, id: &InstanceId) -> bool {
        self.hand.contains(id)
    }

    pub fn remove_from_hand(&mut self, id: &InstanceId) -> bool {
        match self.hand.iter().position(|c| c == id) {
            Some(index) => {
                self.hand.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn remove_from_board(&mut self, id: &InstanceId) -> Option<BoardCard> {
        let index = self.board.iter().position(|c| &c.card_id == id)?;
        Some(self.board.remove(index))
    }

    pub fn remove_from_backrow(&mut self, id: &InstanceId) -> Option<SpellTrapCard> {
        if let Some(index) = self.backrow.iter().position(|c| &c.card_id == id) {
            return Some(self.backrow.remove(index));
        }
        if self
            .field_spell
            .as_ref()
            .is_some_and(|c| &c.card_id == id)
        {
            return self.field_spell.take();
        }
        None
    }

    /// Zone currently holding the instance, if this seat owns it.
    pub fn zone_of(&self, id: &InstanceId) -> Option<Zone> {
        if self.hand.contains(id) {
            Some(Zone::Hand)
        } else if self.board.iter().any(|c| &c.card_id == id) {
            Some(Zone::Board)
        } else if self.backrow.iter().any(|c| &c.card_id == id) {
            Some(Zone::Backrow)
        } else if self.field_spell.as_ref().is_some_and(|c| &c.card_id == id) {
            Some(Zone::FieldSpell)
        } else if self.deck.contains(id) {
            Some(Zone::Deck)
        } else if self.graveyard.contains(id) {
            Some(Zone::Graveyard)
        } else if self.banished.contains(id) {
            Some(Zone::Banished)
        } else {
            None
        }
    }

    pub fn face_up_monsters(&self) -> impl Iterator<Item = &BoardCard> {
        self.board.iter().filter(|c| c.face_up)
    }

    fn clear_zones(&mut self) {
        self.hand.clear();
        self.board.clear();
        self.backrow.clear();
        self.field_spell = None;
        self.deck.clear();
        self.graveyard.clear();
        self.banished.clear();
    }
}

/// The canonical duel state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    pub config: DuelConfig,
    pub players: [PlayerState; 2],
    pub instance_to_definition: BTreeMap<InstanceId, DefinitionId>,
    pub first_player: Seat,
    pub current_turn_player: Seat,
    pub turn_number: u32,
    pub current_phase: Phase,
    pub current_chain: Vec<ChainLink>,
    pub current_priority_player: Option<Seat>,
    /// Passes in a row since the last chain link was added or resolved.
    pub consecutive_passes: u8,
    pub modifiers: Vec<Modifier>,
    pub cost_modifiers: Vec<CostModifier>,
    pub turn_restrictions: Vec<TurnRestriction>,
    pub seed: u64,
    pub rng_cursor: u64,
    pub last_coin_toss: Option<CoinTossRecord>,
    pub game_over: bool,
    pub winner: Option<Seat>,
    pub win_reason: Option<WinReason>,
}

impl GameState {
    /// Build a duel with shuffled decks and empty hands, positioned at the
    /// first player's draw phase of turn 1.
    pub fn new(
        config: DuelConfig,
        seed: u64,
        first_player: Seat,
        host_deck: &[DefinitionId],
        away_deck: &[DefinitionId],
    ) -> Self {
        let mut state = Self::empty(config, seed, first_player);
        let mut serial = 1u32;
        for (seat, deck) in [(Seat::Host, host_deck), (Seat::Away, away_deck)] {
            // Shuffle before minting so serials carry no deck-list position.
            let mut order = deck.to_vec();
            let mut rng = StdRng::seed_from_u64(sub_seed(seed, seat_label(seat)));
            order.shuffle(&mut rng);
            let mut instances = Vec::with_capacity(order.len());
            for definition in order {
                let id = InstanceId::mint(serial);
                serial += 1;
                state.instance_to_definition.insert(id.clone(), definition);
                instances.push(id);
            }
            state.player_mut(seat).deck = instances;
        }
        state
    }

    /// A state with no cards at all. Useful for building positions by hand.
    pub fn empty(config: DuelConfig, seed: u64, first_player: Seat) -> Self {
        let life = config.starting_life;
        Self {
            config,
            players: [
                PlayerState::new(Seat::Host, life),
                PlayerState::new(Seat::Away, life),
            ],
            instance_to_definition: BTreeMap::new(),
            first_player,
            current_turn_player: first_player,
            turn_number: 1,
            current_phase: Phase::Draw,
            current_chain: Vec::new(),
            current_priority_player: None,
            consecutive_passes: 0,
            modifiers: Vec::new(),
            cost_modifiers: Vec::new(),
            turn_restrictions: Vec::new(),
            seed,
            rng_cursor: 0,
            last_coin_toss: None,
            game_over: false,
            winner: None,
            win_reason: None,
        }
    }

    pub fn player(&self, seat: Seat) -> &PlayerState {
        &self.players[seat.index()]
    }

    pub fn player_mut(&mut self, seat: Seat) -> &mut PlayerState {
        &mut self.players[seat.index()]
    }

    pub fn definition_id(&self, id: &InstanceId) -> Option<&DefinitionId> {
        self.instance_to_definition.get(id)
    }

    pub fn definition<'a>(
        &self,
        catalog: &'a CardCatalog,
        id: &InstanceId,
    ) -> Option<&'a CardDefinition> {
        self.definition_id(id).and_then(|def| catalog.get(def))
    }

    /// Seat and zone of an instance.
    pub fn locate(&self, id: &InstanceId) -> Option<(Seat, Zone)> {
        Seat::ALL
            .into_iter()
            .find_map(|seat| self.player(seat).zone_of(id).map(|zone| (seat, zone)))
    }

    pub fn board_card(&self, id: &InstanceId) -> Option<(Seat, &BoardCard)> {
        Seat::ALL
            .into_iter()
            .find_map(|seat| self.player(seat).board_card(id).map(|c| (seat, c)))
    }

    pub fn board_card_mut(&mut self, id: &InstanceId) -> Option<&mut BoardCard> {
        let seat = self.board_card(id)?.0;
        self.player_mut(seat).board_card_mut(id)
    }

    /// Backrow or field-slot card.
    pub fn spell_trap_card(&self, id: &InstanceId) -> Option<(Seat, &SpellTrapCard)> {
        Seat::ALL.into_iter().find_map(|seat| {
            let player = self.player(seat);
            player
                .backrow_card(id)
                .or(player.field_spell.as_ref().filter(|c| &c.card_id == id))
                .map(|c| (seat, c))
        })
    }

    pub fn chain_active(&self) -> bool {
        !self.current_chain.is_empty()
    }

    /// The seat whose input the duel is waiting on, if any.
    pub fn decision_seat(&self) -> Option<Seat> {
        if self.game_over {
            None
        } else if self.chain_active() {
            self.current_priority_player
        } else {
            Some(self.current_turn_player)
        }
    }

    pub fn effective_attack(&self, catalog: &CardCatalog, card: &BoardCard) -> i32 {
        let base = catalog
            .get(&card.definition_id)
            .map(|d| d.base_attack())
            .unwrap_or(0);
        let boosts: i32 = self
            .modifiers
            .iter()
            .filter(|m| m.card_id == card.card_id)
            .map(|m| m.attack)
            .sum();
        let field = match self.board_card(&card.card_id) {
            Some((seat, _)) if card.face_up => self.field_bonus(catalog, seat),
            _ => 0,
        };
        (base + boosts + field).max(0)
    }

    pub fn effective_defense(&self, catalog: &CardCatalog, card: &BoardCard) -> i32 {
        let base = catalog
            .get(&card.definition_id)
            .map(|d| d.base_defense())
            .unwrap_or(0);
        let boosts: i32 = self
            .modifiers
            .iter()
            .filter(|m| m.card_id == card.card_id)
            .map(|m| m.defense)
            .sum();
        (base + boosts).max(0)
    }

    fn field_bonus(&self, catalog: &CardCatalog, seat: Seat) -> i32 {
        self.player(seat)
            .field_spell
            .as_ref()
            .filter(|c| c.face_up)
            .and_then(|c| catalog.get(&c.definition_id))
            .map(|d| d.field_attack_bonus())
            .unwrap_or(0)
    }

    pub fn has_restriction(&self, seat: Seat, restriction: Restriction) -> bool {
        self.turn_restrictions
            .iter()
            .any(|r| r.seat == seat && r.restriction == restriction)
    }

    pub fn has_tribute_discount(&self, seat: Seat) -> bool {
        self.cost_modifiers
            .iter()
            .any(|m| m.seat == seat && m.kind == CostModifierKind::TributeDiscount)
    }

    /// Drop every modifier attached to an instance that left the board.
    pub fn forget_modifiers(&mut self, id: &InstanceId) {
        self.modifiers.retain(|m| &m.card_id != id);
    }

    /// Next value of the reproducible random stream, in `0..bound`.
    pub fn next_random(&mut self, bound: u64) -> u64 {
        let value = crate::seed::random_at(self.seed, self.rng_cursor, bound);
        self.rng_cursor += 1;
        value
    }

    /// End the duel. Sets the result fields together and clears every zone.
    pub fn finish(&mut self, winner: Seat, reason: WinReason) {
        self.game_over = true;
        self.winner = Some(winner);
        self.win_reason = Some(reason);
        self.current_chain.clear();
        self.current_priority_player = None;
        self.consecutive_passes = 0;
        self.modifiers.clear();
        for player in &mut self.players {
            player.clear_zones();
        }
    }

    /// Checks the result-field invariant: live, or ended with winner and reason.
    pub fn result_is_consistent(&self) -> bool {
        if self.game_over {
            self.winner.is_some() && self.win_reason.is_some()
        } else {
            self.winner.is_none() && self.win_reason.is_none()
        }
    }
}

pub(crate) fn seat_label(seat: Seat) -> &'static str {
    match seat {
        Seat::Host => "deck/host",
        Seat::Away => "deck/away",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deck(ids: &[&str]) -> Vec<DefinitionId> {
        ids.iter().map(|s| DefinitionId::new(*s)).collect()
    }

    #[test]
    fn phase_cycle_is_fixed() {
        let mut phase = Phase::Draw;
        let mut seen = vec![phase];
        while let Some(next) = phase.next() {
            seen.push(next);
            phase = next;
        }
        assert_eq!(
            seen,
            vec![
                Phase::Draw,
                Phase::Standby,
                Phase::Main,
                Phase::Combat,
                Phase::Main2,
                Phase::BreakdownCheck,
                Phase::End
            ]
        );
        assert_eq!(
            seen.iter().filter(|p| p.is_auto()).count(),
            4,
            "draw, standby, breakdown_check and end are auto phases"
        );
    }

    #[test]
    fn new_state_mints_unique_instances_per_copy() {
        let state = GameState::new(
            DuelConfig::default(),
            7,
            Seat::Host,
            &deck(&["a", "a", "b"]),
            &deck(&["a"]),
        );
        assert_eq!(state.instance_to_definition.len(), 4);
        assert_eq!(state.player(Seat::Host).deck.len(), 3);
        assert_eq!(state.player(Seat::Away).deck.len(), 1);
        for id in state.player(Seat::Host).deck.iter() {
            assert!(state.definition_id(id).is_some());
        }
    }

    #[test]
    fn same_seed_same_shuffle() {
        let cards = deck(&["a", "b", "c", "d", "e", "f", "g", "h"]);
        let a = GameState::new(DuelConfig::default(), 99, Seat::Host, &cards, &cards);
        let b = GameState::new(DuelConfig::default(), 99, Seat::Host, &cards, &cards);
        assert_eq!(a.player(Seat::Host).deck, b.player(Seat::Host).deck);
    }

    #[test]
    fn finish_sets_result_fields_and_clears_zones() {
        let mut state = GameState::new(
            DuelConfig::default(),
            1,
            Seat::Host,
            &deck(&["a", "b"]),
            &deck(&["c"]),
        );
        assert!(state.result_is_consistent());
        state.finish(Seat::Away, WinReason::Surrender);
        assert!(state.game_over);
        assert!(state.result_is_consistent());
        assert!(state.player(Seat::Host).deck.is_empty());
    }

    #[test]
    fn end_of_next_turn_outlives_one_end_phase() {
        let modifier = Modifier {
            card_id: InstanceId::mint(1),
            attack: 100,
            defense: 0,
            expiry: ModifierExpiry::EndOfNextTurn,
            applied_turn: 3,
        };
        assert!(!modifier.expires_at_end_of(3));
        assert!(modifier.expires_at_end_of(4));
    }
}
