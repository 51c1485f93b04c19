//! The pure transition function.
//!
//! [`evolve`] never fails: an illegal command comes back as
//! [`Outcome::Rejected`] with the state untouched, and the orchestrator treats
//! "no events" as a rejection.

use tracing::debug;

use crate::cards::CardCatalog;
use crate::command::Command;
use crate::events::GameEvent;
use crate::game_state::{GameState, WinReason};
use crate::ids::Seat;
use crate::rules::chain::{self, ActivationKind};
use crate::rules::state_based::{apply_state_based_actions, end_game};
use crate::rules::{RuleResult, RulesContext, combat, summon};
use crate::turn;

pub use crate::rules::RejectReason;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Applied(Vec<GameEvent>),
    Rejected(RejectReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub state: GameState,
    pub outcome: Outcome,
}

impl Transition {
    /// Events of an applied command; empty for a rejection.
    pub fn events(&self) -> &[GameEvent] {
        match &self.outcome {
            Outcome::Applied(events) => events,
            Outcome::Rejected(_) => &[],
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self.outcome, Outcome::Applied(_))
    }

    pub fn rejection(&self) -> Option<&RejectReason> {
        match &self.outcome {
            Outcome::Rejected(reason) => Some(reason),
            Outcome::Applied(_) => None,
        }
    }
}

/// Apply `command` from `seat` to a copy of `state`.
pub fn evolve(
    state: &GameState,
    seat: Seat,
    command: &Command,
    catalog: &CardCatalog,
) -> Transition {
    let mut next = state.clone();
    let mut events = Vec::new();
    let ctx = RulesContext::new(catalog, seat);

    match dispatch(&mut next, &ctx, command, &mut events) {
        Ok(()) => {
            apply_state_based_actions(&mut next, &mut events);
            Transition {
                state: next,
                outcome: Outcome::Applied(events),
            }
        }
        Err(reason) => {
            debug!(
                seat = %seat,
                command = command.type_name(),
                reason = %reason,
                "command rejected"
            );
            Transition {
                state: state.clone(),
                outcome: Outcome::Rejected(reason),
            }
        }
    }
}

fn dispatch(
    state: &mut GameState,
    ctx: &RulesContext<'_>,
    command: &Command,
    events: &mut Vec<GameEvent>,
) -> RuleResult {
    match command {
        Command::Surrender => {
            if state.game_over {
                return Err(RejectReason::GameOver);
            }
            end_game(state, ctx.opponent(), WinReason::Surrender, events);
            Ok(())
        }
        Command::Summon {
            card_id,
            tribute_card_ids,
        } => summon::normal_summon(state, ctx, card_id, tribute_card_ids, true, events),
        Command::SetMonster {
            card_id,
            tribute_card_ids,
        } => summon::normal_summon(state, ctx, card_id, tribute_card_ids, false, events),
        Command::FlipSummon { card_id } => summon::flip_summon(state, ctx, card_id, events),
        Command::ChangePosition { card_id } => {
            summon::change_position(state, ctx, card_id, events)
        }
        Command::SetSpellTrap { card_id } => summon::set_spell_trap(state, ctx, card_id, events),
        Command::ActivateSpell {
            card_id,
            effect_index,
            targets,
        } => chain::activate(
            state,
            ctx,
            ActivationKind::Spell,
            card_id,
            *effect_index,
            targets,
            events,
        ),
        Command::ActivateTrap {
            card_id,
            effect_index,
            targets,
        } => chain::activate(
            state,
            ctx,
            ActivationKind::Trap,
            card_id,
            *effect_index,
            targets,
            events,
        ),
        Command::ActivateEffect {
            card_id,
            effect_index,
            targets,
        } => chain::activate(
            state,
            ctx,
            ActivationKind::Effect,
            card_id,
            *effect_index,
            targets,
            events,
        ),
        Command::DeclareAttack {
            attacker_card_id,
            target_card_id,
        } => combat::declare_attack(
            state,
            ctx,
            attacker_card_id,
            target_card_id
                .as_ref()
                .filter(|t| t.as_str() != crate::command::DIRECT_ATTACK),
            events,
        ),
        Command::AdvancePhase => {
            crate::rules::require_open_turn(state, ctx.actor)?;
            turn::advance_phase(state, events);
            Ok(())
        }
        Command::EndTurn => {
            crate::rules::require_open_turn(state, ctx.actor)?;
            turn::end_turn(state, events);
            Ok(())
        }
        Command::ChainResponse {
            pass,
            card_id,
            effect_index,
            targets,
        } => chain::respond(
            state,
            ctx,
            *pass,
            card_id.as_ref(),
            *effect_index,
            targets,
            events,
        ),
    }
}

/// Step through auto phases until a decision is due.
pub fn auto_advance(state: &mut GameState) -> Vec<GameEvent> {
    let mut events = Vec::new();
    while !state.game_over && !state.chain_active() && state.current_phase.is_auto() {
        turn::advance_phase(state, &mut events);
    }
    events
}

/// [`evolve`] followed by [`auto_advance`]; the shared path for live
/// submissions and log replay.
pub fn apply_with_auto_advance(
    state: &GameState,
    seat: Seat,
    command: &Command,
    catalog: &CardCatalog,
) -> Transition {
    let mut transition = evolve(state, seat, command, catalog);
    if let Outcome::Applied(events) = &mut transition.outcome {
        events.extend(auto_advance(&mut transition.state));
    }
    transition
}

/// Opening draws for both seats, then advance to the first player's main phase.
pub fn start_duel(state: &mut GameState) -> Vec<GameEvent> {
    let mut events = vec![GameEvent::DuelStarted {
        first_player: state.first_player,
        seed: state.seed,
    }];
    let hand = state.config.starting_hand;
    for seat in [state.first_player, state.first_player.other()] {
        if !turn::draw_cards(state, seat, hand, &mut events) {
            return events;
        }
    }
    events.extend(auto_advance(state));
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::starter::{starter_catalog, starter_deck};
    use crate::config::DuelConfig;
    use crate::game_state::Phase;

    fn started() -> GameState {
        let deck = starter_deck();
        let mut state = GameState::new(DuelConfig::default(), 11, Seat::Host, &deck, &deck);
        start_duel(&mut state);
        state
    }

    #[test]
    fn start_duel_deals_hands_and_reaches_main() {
        let state = started();
        assert_eq!(state.player(Seat::Host).hand.len(), 5);
        assert_eq!(state.player(Seat::Away).hand.len(), 5);
        assert_eq!(state.current_phase, Phase::Main);
        assert_eq!(state.turn_number, 1);
    }

    #[test]
    fn rejection_returns_unchanged_state() {
        let catalog = starter_catalog();
        let state = started();
        let transition = evolve(&state, Seat::Away, &Command::AdvancePhase, &catalog);
        assert_eq!(transition.rejection(), Some(&RejectReason::NotYourTurn));
        assert!(transition.events().is_empty());
        assert_eq!(transition.state, state);
    }

    #[test]
    fn surrender_works_out_of_turn() {
        let catalog = starter_catalog();
        let state = started();
        let transition = evolve(&state, Seat::Away, &Command::Surrender, &catalog);
        assert!(transition.is_applied());
        assert_eq!(transition.state.winner, Some(Seat::Host));
        assert_eq!(transition.state.win_reason, Some(WinReason::Surrender));
        assert!(transition.state.player(Seat::Host).hand.is_empty());
    }

    #[test]
    fn end_turn_with_auto_advance_lands_in_opponent_main() {
        let catalog = starter_catalog();
        let state = started();
        let transition = apply_with_auto_advance(&state, Seat::Host, &Command::EndTurn, &catalog);
        let next = transition.state;
        assert_eq!(next.current_turn_player, Seat::Away);
        assert_eq!(next.turn_number, 2);
        assert_eq!(next.current_phase, Phase::Main);
        assert_eq!(next.player(Seat::Away).hand.len(), 6);
    }
}
