//! Win checks and the breakdown sweep.
//!
//! Win conditions are checked after every applied command; the breakdown
//! sweep runs when a turn enters `breakdown_check`.

use crate::events::{DestroyCause, GameEvent};
use crate::game_state::{GameState, WinReason};
use crate::ids::{InstanceId, Seat};

use super::effects::destroy_monster;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateBasedAction {
    /// A seat's life reached zero or less.
    LifeDepleted(Seat),
    /// A seat caused enough breakdowns to win.
    BreakdownVictory(Seat),
}

/// End the duel and record the result event.
pub fn end_game(state: &mut GameState, winner: Seat, reason: WinReason, events: &mut Vec<GameEvent>) {
    if state.game_over {
        return;
    }
    state.finish(winner, reason);
    events.push(GameEvent::GameEnded { winner, reason });
}

pub fn check_state_based_actions(state: &GameState) -> Vec<StateBasedAction> {
    if state.game_over {
        return Vec::new();
    }
    let mut actions = Vec::new();
    for seat in Seat::ALL {
        if state.player(seat).life <= 0 {
            actions.push(StateBasedAction::LifeDepleted(seat));
        }
    }
    for seat in Seat::ALL {
        if state.player(seat).breakdowns_caused >= state.config.breakdown_threshold {
            actions.push(StateBasedAction::BreakdownVictory(seat));
        }
    }
    actions
}

/// Apply the first decisive action, if any. Returns true if the duel ended.
///
/// When both seats are out of life at once the seat that is not taking the
/// turn wins.
pub fn apply_state_based_actions(state: &mut GameState, events: &mut Vec<GameEvent>) -> bool {
    let actions = check_state_based_actions(state);
    let depleted: Vec<Seat> = actions
        .iter()
        .filter_map(|a| match a {
            StateBasedAction::LifeDepleted(seat) => Some(*seat),
            _ => None,
        })
        .collect();

    match depleted.as_slice() {
        [] => {}
        [loser] => {
            end_game(state, loser.other(), WinReason::LpZero, events);
            return true;
        }
        _ => {
            let winner = state.current_turn_player.other();
            end_game(state, winner, WinReason::LpZero, events);
            return true;
        }
    }

    let victor = actions.iter().find_map(|a| match a {
        StateBasedAction::BreakdownVictory(seat) => Some(*seat),
        _ => None,
    });
    if let Some(winner) = victor {
        end_game(state, winner, WinReason::Breakdown, events);
        return true;
    }
    false
}

/// Face-up monsters at or over the vice threshold, turn player's side first.
pub fn breakdown_candidates(state: &GameState) -> Vec<(Seat, InstanceId)> {
    let order = [state.current_turn_player, state.current_turn_player.other()];
    let threshold = state.config.vice_threshold;
    order
        .into_iter()
        .flat_map(|seat| {
            state
                .player(seat)
                .face_up_monsters()
                .filter(move |c| c.vice_counters >= threshold)
                .map(move |c| (seat, c.card_id.clone()))
        })
        .collect()
}

/// Destroy every broken-down monster and credit its controller's opponent.
pub fn run_breakdown_check(state: &mut GameState, events: &mut Vec<GameEvent>) {
    for (owner, card_id) in breakdown_candidates(state) {
        if !destroy_monster(state, &card_id, DestroyCause::Breakdown, events) {
            continue;
        }
        let credited = owner.other();
        let player = state.player_mut(credited);
        player.breakdowns_caused += 1;
        let total = player.breakdowns_caused;
        events.push(GameEvent::Breakdown {
            owner,
            card_id,
            credited,
            total,
        });
    }
    apply_state_based_actions(state, events);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DuelConfig;
    use crate::game_state::{BoardCard, Position};
    use crate::ids::DefinitionId;

    fn place(state: &mut GameState, seat: Seat, raw: &str, vice: u32, face_up: bool) {
        let id = InstanceId::from_raw(raw);
        let def = DefinitionId::new("hall-monitor");
        state
            .instance_to_definition
            .insert(id.clone(), def.clone());
        let mut card = BoardCard::new(id, def, Position::Attack, face_up, 1);
        card.vice_counters = vice;
        state.player_mut(seat).board.push(card);
    }

    #[test]
    fn life_depletion_ends_game_for_the_other_seat() {
        let mut state = GameState::empty(DuelConfig::default(), 1, Seat::Host);
        state.player_mut(Seat::Away).life = 0;
        let mut events = Vec::new();
        assert!(apply_state_based_actions(&mut state, &mut events));
        assert_eq!(state.winner, Some(Seat::Host));
        assert_eq!(state.win_reason, Some(WinReason::LpZero));
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn breakdown_destroys_and_credits_opponent() {
        let mut state = GameState::empty(DuelConfig::default(), 1, Seat::Host);
        place(&mut state, Seat::Away, "hall-monitor#1", 3, true);
        place(&mut state, Seat::Away, "hall-monitor#2", 2, true);
        // Face-down monsters never break down.
        place(&mut state, Seat::Away, "hall-monitor#3", 5, false);

        let mut events = Vec::new();
        run_breakdown_check(&mut state, &mut events);

        assert_eq!(state.player(Seat::Away).board.len(), 2);
        assert_eq!(state.player(Seat::Host).breakdowns_caused, 1);
        assert!(events.iter().any(|e| matches!(
            e,
            GameEvent::Breakdown { credited: Seat::Host, total: 1, .. }
        )));
        assert!(!state.game_over);
    }

    #[test]
    fn third_breakdown_wins() {
        let mut state = GameState::empty(DuelConfig::default(), 1, Seat::Host);
        state.player_mut(Seat::Host).breakdowns_caused = 2;
        place(&mut state, Seat::Away, "hall-monitor#1", 4, true);

        let mut events = Vec::new();
        run_breakdown_check(&mut state, &mut events);

        assert!(state.game_over);
        assert_eq!(state.winner, Some(Seat::Host));
        assert_eq!(state.win_reason, Some(WinReason::Breakdown));
    }
}
