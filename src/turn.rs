//! Turn structure: phase progression, the draw, and end-of-turn expiry.
//!
//! The engine only moves the phase pointer on ADVANCE_PHASE and END_TURN;
//! the auto phases (draw, standby, breakdown_check, end) are stepped through
//! by [`crate::engine::auto_advance`] with the same functions.

use crate::events::GameEvent;
use crate::game_state::{GameState, Phase, WinReason};
use crate::ids::Seat;
use crate::rules::state_based::{end_game, run_breakdown_check};

/// Move the top card of `seat`'s deck to hand.
///
/// Returns false, after ending the duel with `deck_out`, when the deck is empty.
pub fn draw_card(state: &mut GameState, seat: Seat, events: &mut Vec<GameEvent>) -> bool {
    if state.player(seat).deck.is_empty() {
        end_game(state, seat.other(), WinReason::DeckOut, events);
        return false;
    }
    let player = state.player_mut(seat);
    let card = player.deck.remove(0);
    player.hand.push(card.clone());
    events.push(GameEvent::CardDrawn {
        seat,
        card_id: Some(card),
    });
    true
}

/// Draw `count` cards, stopping at the first failed draw.
pub fn draw_cards(
    state: &mut GameState,
    seat: Seat,
    count: usize,
    events: &mut Vec<GameEvent>,
) -> bool {
    for _ in 0..count {
        if !draw_card(state, seat, events) {
            return false;
        }
    }
    true
}

/// Whether entering `draw` on the current turn draws a card.
pub fn draws_this_turn(state: &GameState) -> bool {
    !(state.turn_number == 1 && state.current_turn_player == state.first_player)
}

/// Advance to the next phase, wrapping to the other seat's draw after `end`.
pub fn advance_phase(state: &mut GameState, events: &mut Vec<GameEvent>) {
    if state.game_over {
        return;
    }
    match state.current_phase.next() {
        Some(next) => enter_phase(state, next, events),
        None => start_next_turn(state, events),
    }
}

/// Run the rest of the current turn, side effects included.
pub fn end_turn(state: &mut GameState, events: &mut Vec<GameEvent>) {
    let turn = state.turn_number;
    while !state.game_over && state.turn_number == turn {
        advance_phase(state, events);
    }
}

fn enter_phase(state: &mut GameState, phase: Phase, events: &mut Vec<GameEvent>) {
    let from = state.current_phase;
    state.current_phase = phase;
    events.push(GameEvent::PhaseChanged {
        seat: state.current_turn_player,
        from,
        to: phase,
    });
    match phase {
        Phase::Draw => {
            if draws_this_turn(state) {
                let seat = state.current_turn_player;
                draw_card(state, seat, events);
            }
        }
        Phase::BreakdownCheck => run_breakdown_check(state, events),
        Phase::End => expire_end_of_turn(state, events),
        Phase::Standby | Phase::Main | Phase::Combat | Phase::Main2 => {}
    }
}

fn start_next_turn(state: &mut GameState, events: &mut Vec<GameEvent>) {
    for player in &mut state.players {
        player.normal_summoned_this_turn = false;
        for card in &mut player.board {
            card.attacked_this_turn = false;
            card.position_changed_this_turn = false;
            card.effects_used_this_turn.clear();
        }
    }
    state.turn_number += 1;
    state.current_turn_player = state.current_turn_player.other();
    state.consecutive_passes = 0;
    events.push(GameEvent::TurnStarted {
        seat: state.current_turn_player,
        turn_number: state.turn_number,
    });
    enter_phase(state, Phase::Draw, events);
}

/// Drop modifiers, cost modifiers and restrictions that lapse this turn.
pub fn expire_end_of_turn(state: &mut GameState, events: &mut Vec<GameEvent>) {
    let turn = state.turn_number;
    let (expired, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut state.modifiers)
        .into_iter()
        .partition(|m| m.expires_at_end_of(turn));
    state.modifiers = kept;
    for modifier in expired {
        events.push(GameEvent::ModifierExpired {
            card_id: modifier.card_id,
        });
    }
    state.cost_modifiers.retain(|m| m.expires_on_turn > turn);
    state.turn_restrictions.retain(|r| r.expires_on_turn > turn);
}
