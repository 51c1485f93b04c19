//! Deterministic opponent policy.
//!
//! One command per step, chosen from the seat's own view and the derived
//! legal set. Ties always break on instance-id order.

use crate::cards::Restriction;
use crate::command::Command;
use crate::decision::{AttackOption, SummonOption, ValidActions, derive_valid_actions};
use crate::game_state::{Phase, Position};
use crate::ids::{InstanceId, Seat};
use crate::view::{BoardCardView, PlayerView};

/// The next command for `seat`, or `None` when it has nothing to decide.
///
/// In combat the policy attacks directly whenever the rules allow it. A
/// direct attack needs an empty opposing board, so a board holding only
/// face-down monsters still gets attacked, lowest serial first.
pub fn choose_command(view: &PlayerView, seat: Seat) -> Option<Command> {
    if view.decision_seat() != Some(seat) {
        return None;
    }
    if view.chain_active() {
        return Some(Command::pass());
    }
    if view.current_phase.is_auto() {
        return Some(Command::AdvancePhase);
    }
    let actions = derive_valid_actions(view, seat);
    let command = match view.current_phase {
        Phase::Combat => combat_step(view, seat, &actions),
        phase if phase.is_main() => main_step(view, seat, &actions),
        _ => None,
    };
    Some(command.unwrap_or(Command::EndTurn))
}

/// What the policy does once its per-turn budget is spent.
pub fn fallback_command(view: &PlayerView, seat: Seat) -> Option<Command> {
    match view.decision_seat() {
        Some(s) if s == seat && view.chain_active() => Some(Command::pass()),
        Some(s) if s == seat => Some(Command::EndTurn),
        _ => None,
    }
}

fn attack_of(card: &BoardCardView) -> i32 {
    card.attack.unwrap_or(0)
}

fn main_step(view: &PlayerView, seat: Seat, actions: &ValidActions) -> Option<Command> {
    if let Some(command) = best_summon(view, seat, &actions.can_summon) {
        return Some(command);
    }

    let me = view.seat(seat);
    let from_hand = |id: &InstanceId| me.hand.iter().any(|c| &c.card_id == id);
    if let Some(option) = actions
        .can_activate_spell
        .iter()
        .filter(|o| from_hand(&o.card_id))
        .min_by(|a, b| (&a.card_id, a.effect_index).cmp(&(&b.card_id, b.effect_index)))
    {
        return Some(Command::ActivateSpell {
            card_id: option.card_id.clone(),
            effect_index: option.effect_index,
            targets: option.targets.iter().take(1).cloned().collect(),
        });
    }

    if let Some(card_id) = actions.can_set_spell_trap.iter().min() {
        return Some(Command::SetSpellTrap {
            card_id: card_id.clone(),
        });
    }

    if view.current_phase == Phase::Main && has_eligible_attacker(view, seat) {
        return Some(Command::AdvancePhase);
    }
    None
}

fn has_eligible_attacker(view: &PlayerView, seat: Seat) -> bool {
    let restricted = view
        .turn_restrictions
        .iter()
        .any(|r| r.seat == seat && r.restriction == Restriction::CannotAttack);
    !restricted
        && view
            .seat(seat)
            .board
            .iter()
            .any(|c| c.face_up && c.position == Position::Attack && !c.attacked_this_turn)
}

/// Highest-attack summonable monster, tributing the weakest candidate.
fn best_summon(view: &PlayerView, seat: Seat, options: &[SummonOption]) -> Option<Command> {
    let me = view.seat(seat);
    let attack_in_hand = |id: &InstanceId| {
        me.hand
            .iter()
            .find(|c| &c.card_id == id)
            .and_then(|c| c.definition.as_ref())
            .map(|d| d.base_attack())
            .unwrap_or(0)
    };
    let option = options.iter().max_by(|a, b| {
        attack_in_hand(&a.card_id)
            .cmp(&attack_in_hand(&b.card_id))
            // Prefer the lower id on equal attack.
            .then_with(|| b.card_id.cmp(&a.card_id))
    })?;

    let mut tributes = Vec::new();
    if option.tributes_required > 0 {
        let weakest = option
            .tribute_candidates
            .iter()
            .filter_map(|id| me.board.iter().find(|c| &c.card_id == id))
            .min_by(|a, b| attack_of(a).cmp(&attack_of(b)).then_with(|| a.card_id.cmp(&b.card_id)))?;
        tributes.push(weakest.card_id.clone());
    }
    Some(Command::Summon {
        card_id: option.card_id.clone(),
        tribute_card_ids: tributes,
    })
}

fn combat_step(view: &PlayerView, seat: Seat, actions: &ValidActions) -> Option<Command> {
    let option: &AttackOption = actions.can_attack.iter().min_by(|a, b| a.attacker.cmp(&b.attacker))?;
    if option.direct {
        return Some(Command::DeclareAttack {
            attacker_card_id: option.attacker.clone(),
            target_card_id: None,
        });
    }

    let them = view.seat(seat.other());
    let defenders = option
        .targets
        .iter()
        .filter_map(|id| them.board.iter().find(|c| &c.card_id == id));
    let face_up_target = defenders
        .clone()
        .filter(|c| c.face_up)
        .min_by(|a, b| attack_of(a).cmp(&attack_of(b)).then_with(|| a.card_id.cmp(&b.card_id)));
    let target = face_up_target
        .or_else(|| defenders.min_by(|a, b| a.card_id.cmp(&b.card_id)))?;
    Some(Command::DeclareAttack {
        attacker_card_id: option.attacker.clone(),
        target_card_id: Some(target.card_id.clone()),
    })
}
