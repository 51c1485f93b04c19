//! Valid-action deriver.
//!
//! Recomputes the legal commands for a seat from its filtered [`PlayerView`]
//! alone, without touching the engine. Clients use it for hints, the AI
//! picks from it, and [`is_legal`] lets callers pre-check a command.

use serde::{Deserialize, Serialize};

use crate::cards::{CardDefinition, EffectSpeed, Restriction, SpellType, TargetRule};
use crate::command::Command;
use crate::game_state::{CostModifierKind, Phase, Position};
use crate::ids::{InstanceId, Seat};
use crate::view::{PlayerView, SeatView};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummonOption {
    pub card_id: InstanceId,
    pub tributes_required: usize,
    pub tribute_candidates: Vec<InstanceId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivationOption {
    pub card_id: InstanceId,
    pub effect_index: usize,
    pub needs_target: bool,
    /// Legal targets when `needs_target`; empty otherwise.
    pub targets: Vec<InstanceId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttackOption {
    pub attacker: InstanceId,
    pub targets: Vec<InstanceId>,
    pub direct: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidActions {
    pub can_summon: Vec<SummonOption>,
    pub can_set_monster: Vec<SummonOption>,
    pub can_set_spell_trap: Vec<InstanceId>,
    pub can_activate_spell: Vec<ActivationOption>,
    pub can_activate_trap: Vec<ActivationOption>,
    pub can_activate_effect: Vec<ActivationOption>,
    pub can_attack: Vec<AttackOption>,
    pub can_flip_summon: Vec<InstanceId>,
    pub can_change_position: Vec<InstanceId>,
    pub can_advance_phase: bool,
    pub can_end_turn: bool,
    /// Pass is available (a chain is open and the seat holds priority).
    pub can_chain_respond: bool,
    /// Surrender does not wait for a decision point.
    pub can_surrender: bool,
}

impl ValidActions {
    /// True when nothing but surrender is on offer.
    pub fn is_empty(&self) -> bool {
        *self
            == ValidActions {
                can_surrender: self.can_surrender,
                ..ValidActions::default()
            }
    }
}

fn has_restriction(view: &PlayerView, seat: Seat, restriction: Restriction) -> bool {
    view.turn_restrictions
        .iter()
        .any(|r| r.seat == seat && r.restriction == restriction)
}

fn has_tribute_discount(view: &PlayerView, seat: Seat) -> bool {
    view.cost_modifiers
        .iter()
        .any(|m| m.seat == seat && m.kind == CostModifierKind::TributeDiscount)
}

/// Mirrors the engine's target rules over what the view shows.
fn target_candidates(
    view: &PlayerView,
    seat: Seat,
    rule: TargetRule,
    source: &InstanceId,
) -> Vec<InstanceId> {
    let me = view.seat(seat);
    let them = view.seat(seat.other());
    let board_ids = |s: &SeatView| s.board.iter().map(|c| c.card_id.clone()).collect::<Vec<_>>();
    let backrow_ids = |s: &SeatView| {
        s.backrow
            .iter()
            .chain(s.field_spell.iter())
            .map(|c| c.card_id.clone())
            .collect::<Vec<_>>()
    };
    let mut ids = match rule {
        TargetRule::None => Vec::new(),
        TargetRule::OpponentMonster => board_ids(them),
        TargetRule::OwnMonster => board_ids(me),
        TargetRule::AnyMonster => [board_ids(me), board_ids(them)].concat(),
        TargetRule::AnyBackrow => [backrow_ids(me), backrow_ids(them)]
            .concat()
            .into_iter()
            .filter(|id| id != source)
            .collect(),
    };
    ids.sort();
    ids
}

/// One option per effect index that could be activated, skipping targeted
/// effects with nothing to target.
fn activation_options(
    view: &PlayerView,
    seat: Seat,
    card_id: &InstanceId,
    definition: &CardDefinition,
    allowed: impl Fn(usize) -> bool,
) -> Vec<ActivationOption> {
    if definition.effects.is_empty() {
        return if allowed(0) {
            vec![ActivationOption {
                card_id: card_id.clone(),
                effect_index: 0,
                needs_target: false,
                targets: Vec::new(),
            }]
        } else {
            Vec::new()
        };
    }
    definition
        .effects
        .iter()
        .enumerate()
        .filter(|(index, _)| allowed(*index))
        .filter_map(|(index, effect)| {
            let needs_target = effect.target.requires_target();
            let targets = target_candidates(view, seat, effect.target, card_id);
            if needs_target && targets.is_empty() {
                return None;
            }
            Some(ActivationOption {
                card_id: card_id.clone(),
                effect_index: index,
                needs_target,
                targets,
            })
        })
        .collect()
}

/// Legal actions for `seat`. Empty (apart from surrender) when the game is
/// over or `seat` is not at a decision point.
pub fn derive_valid_actions(view: &PlayerView, seat: Seat) -> ValidActions {
    let mut actions = ValidActions {
        can_surrender: !view.game_over,
        ..ValidActions::default()
    };
    if view.decision_seat() != Some(seat) {
        return actions;
    }
    let response = view.chain_active();
    let phase = view.current_phase;
    if !response {
        actions.can_advance_phase = true;
        actions.can_end_turn = true;
        if phase.is_auto() {
            return actions;
        }
    } else {
        actions.can_chain_respond = true;
    }
    let main = phase.is_main() && !response;
    let me = view.seat(seat);
    let turn = view.turn_number;
    let config = &view.config;

    if main {
        derive_summons(view, seat, &mut actions);
        if me.backrow.len() < config.backrow_capacity {
            actions.can_set_spell_trap = me
                .hand
                .iter()
                .filter(|c| c.definition.as_ref().is_some_and(|d| !d.is_monster()))
                .map(|c| c.card_id.clone())
                .collect();
        }
        for card in &me.board {
            if card.turn_summoned >= turn {
                continue;
            }
            if !card.face_up {
                actions.can_flip_summon.push(card.card_id.clone());
            } else if !card.position_changed_this_turn {
                actions.can_change_position.push(card.card_id.clone());
            }
        }
    }

    derive_spells(view, seat, response, &mut actions);

    for card in me.backrow.iter().filter(|c| !c.face_up && c.turn_set < turn) {
        if let Some(definition) = card.definition.as_ref().filter(|d| d.is_trap()) {
            actions
                .can_activate_trap
                .extend(activation_options(view, seat, &card.card_id, definition, |_| true));
        }
    }

    for card in me.board.iter().filter(|c| c.face_up) {
        let Some(definition) = card.definition.as_ref().filter(|d| d.is_monster()) else {
            continue;
        };
        let allowed = |index: usize| {
            let Some(effect) = definition.effect(index) else {
                return false;
            };
            if card.effects_used_this_turn.contains(&index) {
                return false;
            }
            effect.speed == EffectSpeed::Quick || main
        };
        actions
            .can_activate_effect
            .extend(activation_options(view, seat, &card.card_id, definition, allowed));
    }

    if phase == Phase::Combat
        && !response
        && !has_restriction(view, seat, Restriction::CannotAttack)
    {
        let them = view.seat(seat.other());
        let mut targets: Vec<InstanceId> = them.board.iter().map(|c| c.card_id.clone()).collect();
        targets.sort();
        for card in &me.board {
            if card.face_up && card.position == Position::Attack && !card.attacked_this_turn {
                actions.can_attack.push(AttackOption {
                    attacker: card.card_id.clone(),
                    targets: targets.clone(),
                    direct: them.board.is_empty(),
                });
            }
        }
    }
    actions
}

fn derive_summons(view: &PlayerView, seat: Seat, actions: &mut ValidActions) {
    let me = view.seat(seat);
    if me.normal_summoned_this_turn {
        return;
    }
    let candidates: Vec<InstanceId> = me
        .board
        .iter()
        .filter(|c| c.face_up)
        .map(|c| c.card_id.clone())
        .collect();
    for card in &me.hand {
        let Some(level) = card.definition.as_ref().and_then(|d| d.level()) else {
            continue;
        };
        let required = if level < view.config.tribute_level || has_tribute_discount(view, seat) {
            0
        } else {
            1
        };
        if candidates.len() < required || me.board.len() - required >= view.config.board_capacity
        {
            continue;
        }
        let option = SummonOption {
            card_id: card.card_id.clone(),
            tributes_required: required,
            tribute_candidates: if required > 0 {
                candidates.clone()
            } else {
                Vec::new()
            },
        };
        actions.can_summon.push(option.clone());
        actions.can_set_monster.push(option);
    }
}

fn derive_spells(view: &PlayerView, seat: Seat, response: bool, actions: &mut ValidActions) {
    if has_restriction(view, seat, Restriction::CannotActivateSpells) {
        return;
    }
    let me = view.seat(seat);
    let phase = view.current_phase;
    let own_turn = view.current_turn_player == seat;
    let backrow_free = me.backrow.len() < view.config.backrow_capacity;

    let from_hand = me.hand.iter().map(|c| (&c.card_id, c.definition.as_ref(), true));
    let from_set = me
        .backrow
        .iter()
        .chain(me.field_spell.iter())
        .filter(|c| !c.face_up)
        .map(|c| (&c.card_id, c.definition.as_ref(), false));

    for (card_id, definition, in_hand) in from_hand.chain(from_set) {
        let Some(definition) = definition else {
            continue;
        };
        let Some(spell_type) = definition.spell_type() else {
            continue;
        };
        let timing_ok = match spell_type {
            SpellType::QuickPlay => !in_hand || own_turn,
            SpellType::Normal | SpellType::Continuous | SpellType::Field => {
                !response && phase.is_main()
            }
        };
        let slot_ok = !in_hand || spell_type == SpellType::Field || backrow_free;
        if timing_ok && slot_ok {
            actions
                .can_activate_spell
                .extend(activation_options(view, seat, card_id, definition, |_| true));
        }
    }
}

fn option_accepts(option: &ActivationOption, effect_index: usize, targets: &[InstanceId]) -> bool {
    if option.effect_index != effect_index {
        return false;
    }
    if option.needs_target {
        matches!(targets, [t] if option.targets.contains(t))
    } else {
        targets.is_empty()
    }
}

fn summon_accepts(options: &[SummonOption], card_id: &InstanceId, tributes: &[InstanceId]) -> bool {
    options.iter().any(|o| {
        &o.card_id == card_id
            && tributes.len() == o.tributes_required
            && tributes.iter().enumerate().all(|(i, t)| {
                o.tribute_candidates.contains(t) && !tributes[..i].contains(t)
            })
    })
}

fn activation_accepts(
    options: &[ActivationOption],
    card_id: &InstanceId,
    effect_index: usize,
    targets: &[InstanceId],
) -> bool {
    options
        .iter()
        .any(|o| &o.card_id == card_id && option_accepts(o, effect_index, targets))
}

/// Whether `command` from `seat` is within the derived legal set.
pub fn is_legal(view: &PlayerView, seat: Seat, command: &Command) -> bool {
    let actions = derive_valid_actions(view, seat);
    match command {
        Command::Surrender => actions.can_surrender,
        Command::AdvancePhase => actions.can_advance_phase,
        Command::EndTurn => actions.can_end_turn,
        Command::Summon {
            card_id,
            tribute_card_ids,
        } => summon_accepts(&actions.can_summon, card_id, tribute_card_ids),
        Command::SetMonster {
            card_id,
            tribute_card_ids,
        } => summon_accepts(&actions.can_set_monster, card_id, tribute_card_ids),
        Command::FlipSummon { card_id } => actions.can_flip_summon.contains(card_id),
        Command::ChangePosition { card_id } => actions.can_change_position.contains(card_id),
        Command::SetSpellTrap { card_id } => actions.can_set_spell_trap.contains(card_id),
        Command::ActivateSpell {
            card_id,
            effect_index,
            targets,
        } => activation_accepts(&actions.can_activate_spell, card_id, *effect_index, targets),
        Command::ActivateTrap {
            card_id,
            effect_index,
            targets,
        } => activation_accepts(&actions.can_activate_trap, card_id, *effect_index, targets),
        Command::ActivateEffect {
            card_id,
            effect_index,
            targets,
        } => activation_accepts(&actions.can_activate_effect, card_id, *effect_index, targets),
        Command::DeclareAttack {
            attacker_card_id,
            target_card_id,
        } => actions.can_attack.iter().any(|o| {
            &o.attacker == attacker_card_id
                && match target_card_id
                    .as_ref()
                    .filter(|t| t.as_str() != crate::command::DIRECT_ATTACK)
                {
                    None => o.direct,
                    Some(target) => o.targets.contains(target),
                }
        }),
        Command::ChainResponse {
            pass,
            card_id,
            effect_index,
            targets,
        } => {
            if *pass {
                return actions.can_chain_respond;
            }
            let Some(card_id) = card_id else {
                return false;
            };
            actions.can_chain_respond
                && [
                    &actions.can_activate_spell,
                    &actions.can_activate_trap,
                    &actions.can_activate_effect,
                ]
                .into_iter()
                .any(|options| activation_accepts(options, card_id, *effect_index, targets))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::starter::{starter_catalog, starter_deck};
    use crate::config::DuelConfig;
    use crate::engine::start_duel;
    use crate::game_state::GameState;
    use crate::view::player_view;

    fn started() -> GameState {
        let deck = starter_deck();
        let mut state = GameState::new(DuelConfig::default(), 4, Seat::Host, &deck, &deck);
        start_duel(&mut state);
        state
    }

    #[test]
    fn non_decision_seat_gets_only_surrender() {
        let catalog = starter_catalog();
        let state = started();
        let view = player_view(&state, &catalog, Seat::Away);
        let actions = derive_valid_actions(&view, Seat::Away);
        assert!(actions.is_empty());
        assert!(actions.can_surrender);
        assert!(!is_legal(&view, Seat::Away, &Command::EndTurn));
        assert!(is_legal(&view, Seat::Away, &Command::Surrender));
    }

    #[test]
    fn main_phase_offers_phase_moves() {
        let catalog = starter_catalog();
        let state = started();
        let view = player_view(&state, &catalog, Seat::Host);
        let actions = derive_valid_actions(&view, Seat::Host);
        assert!(actions.can_advance_phase);
        assert!(actions.can_end_turn);
        assert!(!actions.can_chain_respond);
        assert!(actions.can_attack.is_empty());
    }

    #[test]
    fn finished_game_offers_nothing() {
        let catalog = starter_catalog();
        let mut state = started();
        state.finish(Seat::Host, crate::game_state::WinReason::Surrender);
        let view = player_view(&state, &catalog, Seat::Host);
        let actions = derive_valid_actions(&view, Seat::Host);
        assert_eq!(actions, ValidActions::default());
    }
}
