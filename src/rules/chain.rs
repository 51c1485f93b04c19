//! Activations, priority and chain resolution.
//!
//! Activating pushes a link and hands priority to the other seat. Two passes
//! in a row resolve the whole chain, newest link first.

use crate::cards::{CardDefinition, EffectSpeed, Restriction, SpellType};
use crate::events::GameEvent;
use crate::game_state::{ChainLink, GameState, SpellTrapCard};
use crate::ids::{InstanceId, Seat};
use crate::zone::Zone;

use super::effects::{resolve_link, send_spell_trap_to_graveyard, validate_targets};
use super::{RejectReason, RuleResult, RulesContext};

/// Passes needed to resolve the chain: one from each seat.
const PASSES_TO_RESOLVE: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationKind {
    Spell,
    Trap,
    Effect,
}

impl ActivationKind {
    /// Kind implied by the card itself, for chain responses.
    pub fn of(definition: &CardDefinition) -> ActivationKind {
        if definition.is_spell() {
            ActivationKind::Spell
        } else if definition.is_trap() {
            ActivationKind::Trap
        } else {
            ActivationKind::Effect
        }
    }
}

/// Result of passing priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriorityResult {
    /// The other seat now holds priority.
    Continue,
    /// Both seats passed in succession; resolve the chain.
    ChainResolves,
}

/// Records a pass on the state's pass counter.
pub fn record_pass(state: &mut GameState) -> PriorityResult {
    state.consecutive_passes += 1;
    if state.consecutive_passes >= PASSES_TO_RESOLVE {
        PriorityResult::ChainResolves
    } else {
        PriorityResult::Continue
    }
}

/// Checks the activation window: a chain response by the priority holder, or
/// an opening activation by the turn player outside the auto phases.
/// Returns true for a response.
fn check_window(state: &GameState, actor: Seat) -> Result<bool, RejectReason> {
    if state.game_over {
        return Err(RejectReason::GameOver);
    }
    if state.chain_active() {
        if state.current_priority_player != Some(actor) {
            return Err(RejectReason::NotPriorityHolder);
        }
        return Ok(true);
    }
    if state.current_turn_player != actor {
        return Err(RejectReason::NotYourTurn);
    }
    if state.current_phase.is_auto() {
        return Err(RejectReason::WrongPhase {
            phase: state.current_phase,
        });
    }
    Ok(false)
}

fn check_effect_index(
    definition: &CardDefinition,
    card_id: &InstanceId,
    effect_index: usize,
) -> RuleResult {
    let in_range = if definition.effects.is_empty() {
        effect_index == 0
    } else {
        effect_index < definition.effects.len()
    };
    if in_range {
        Ok(())
    } else {
        Err(RejectReason::NoSuchEffect {
            card_id: card_id.clone(),
            effect_index,
        })
    }
}

fn require_main(state: &GameState) -> RuleResult {
    if state.current_phase.is_main() {
        Ok(())
    } else {
        Err(RejectReason::WrongPhase {
            phase: state.current_phase,
        })
    }
}

/// Checks a spell activation. Returns the zone it is activated from.
fn check_spell(
    state: &GameState,
    ctx: &RulesContext<'_>,
    definition: &CardDefinition,
    card_id: &InstanceId,
    response: bool,
) -> Result<Zone, RejectReason> {
    let actor = ctx.actor;
    let Some(spell_type) = definition.spell_type() else {
        return Err(RejectReason::NotASpell {
            card_id: card_id.clone(),
        });
    };
    if state.has_restriction(actor, Restriction::CannotActivateSpells) {
        return Err(RejectReason::SpellsRestricted);
    }
    let zone = match state.player(actor).zone_of(card_id) {
        Some(zone @ Zone::Hand) => zone,
        Some(zone @ (Zone::Backrow | Zone::FieldSpell)) => {
            if state
                .spell_trap_card(card_id)
                .is_some_and(|(_, c)| c.face_up)
            {
                return Err(RejectReason::AlreadyActive {
                    card_id: card_id.clone(),
                });
            }
            zone
        }
        _ => {
            return Err(RejectReason::NotInHand {
                card_id: card_id.clone(),
            });
        }
    };

    match spell_type {
        SpellType::QuickPlay => {
            if zone == Zone::Hand && state.current_turn_player != actor {
                return Err(RejectReason::NotYourTurn);
            }
        }
        SpellType::Normal | SpellType::Continuous | SpellType::Field => {
            if response {
                return Err(RejectReason::NotQuickSpeed {
                    card_id: card_id.clone(),
                });
            }
            require_main(state)?;
        }
    }

    let needs_slot = zone == Zone::Hand && spell_type != SpellType::Field;
    if needs_slot && state.player(actor).backrow.len() >= state.config.backrow_capacity {
        return Err(RejectReason::BackrowFull);
    }
    Ok(zone)
}

fn check_trap(
    state: &GameState,
    ctx: &RulesContext<'_>,
    definition: &CardDefinition,
    card_id: &InstanceId,
) -> RuleResult {
    if !definition.is_trap() {
        return Err(RejectReason::NotATrap {
            card_id: card_id.clone(),
        });
    }
    let Some(card) = state.player(ctx.actor).backrow_card(card_id) else {
        return Err(RejectReason::NotInBackrow {
            card_id: card_id.clone(),
        });
    };
    if card.face_up {
        return Err(RejectReason::AlreadyActive {
            card_id: card_id.clone(),
        });
    }
    if card.turn_set >= state.turn_number {
        return Err(RejectReason::SetThisTurn {
            card_id: card_id.clone(),
        });
    }
    Ok(())
}

fn check_monster_effect(
    state: &GameState,
    ctx: &RulesContext<'_>,
    definition: &CardDefinition,
    card_id: &InstanceId,
    effect_index: usize,
    response: bool,
) -> RuleResult {
    if !definition.is_monster() {
        return Err(RejectReason::NotAMonster {
            card_id: card_id.clone(),
        });
    }
    let Some(card) = state.player(ctx.actor).board_card(card_id) else {
        return Err(RejectReason::NotOnBoard {
            card_id: card_id.clone(),
        });
    };
    if !card.face_up {
        return Err(RejectReason::FaceDown {
            card_id: card_id.clone(),
        });
    }
    let Some(effect) = definition.effect(effect_index) else {
        return Err(RejectReason::NoSuchEffect {
            card_id: card_id.clone(),
            effect_index,
        });
    };
    if card.effects_used_this_turn.contains(&effect_index) {
        return Err(RejectReason::EffectAlreadyUsed {
            card_id: card_id.clone(),
        });
    }
    if effect.speed == EffectSpeed::Ignition {
        if response {
            return Err(RejectReason::NotQuickSpeed {
                card_id: card_id.clone(),
            });
        }
        require_main(state)?;
    }
    Ok(())
}

/// Activate a spell, trap or monster effect and push it onto the chain.
pub fn activate(
    state: &mut GameState,
    ctx: &RulesContext<'_>,
    kind: ActivationKind,
    card_id: &InstanceId,
    effect_index: usize,
    targets: &[InstanceId],
    events: &mut Vec<GameEvent>,
) -> RuleResult {
    let actor = ctx.actor;
    let response = check_window(state, actor)?;
    let definition = state
        .definition(ctx.catalog, card_id)
        .ok_or_else(|| RejectReason::CardNotFound {
            card_id: card_id.clone(),
        })?;

    let spell_zone = match kind {
        ActivationKind::Spell => {
            let zone = check_spell(state, ctx, definition, card_id, response)?;
            check_effect_index(definition, card_id, effect_index)?;
            Some(zone)
        }
        ActivationKind::Trap => {
            check_trap(state, ctx, definition, card_id)?;
            check_effect_index(definition, card_id, effect_index)?;
            None
        }
        ActivationKind::Effect => {
            check_monster_effect(state, ctx, definition, card_id, effect_index, response)?;
            None
        }
    };
    validate_targets(
        state,
        definition.effect(effect_index),
        actor,
        card_id,
        targets,
    )?;

    match (kind, spell_zone) {
        (ActivationKind::Spell, Some(zone)) => {
            place_spell(state, definition.spell_type(), actor, card_id, zone, events)
        }
        (ActivationKind::Trap, _) => {
            if let Some(card) = state
                .player_mut(actor)
                .backrow
                .iter_mut()
                .find(|c| &c.card_id == card_id)
            {
                card.face_up = true;
            }
        }
        _ => {
            if let Some(card) = state.player_mut(actor).board_card_mut(card_id) {
                card.effects_used_this_turn.push(effect_index);
            }
        }
    }

    state.current_chain.push(ChainLink {
        card_id: card_id.clone(),
        effect_index,
        activating_player: actor,
        targets: targets.to_vec(),
    });
    state.current_priority_player = Some(actor.other());
    state.consecutive_passes = 0;
    events.push(GameEvent::ChainLinkAdded {
        seat: actor,
        card_id: card_id.clone(),
        effect_index,
        link: state.current_chain.len(),
        targets: targets.to_vec(),
    });
    Ok(())
}

/// Put an activated spell face-up where it resolves from.
fn place_spell(
    state: &mut GameState,
    spell_type: Option<SpellType>,
    actor: Seat,
    card_id: &InstanceId,
    zone: Zone,
    events: &mut Vec<GameEvent>,
) {
    let turn = state.turn_number;
    let definition_id = match state.definition_id(card_id) {
        Some(id) => id.clone(),
        None => return,
    };
    let is_field = spell_type == Some(SpellType::Field);
    let in_field_slot = zone == Zone::FieldSpell;

    if is_field && !in_field_slot {
        if let Some(old) = state.player(actor).field_spell.as_ref().map(|c| c.card_id.clone()) {
            send_spell_trap_to_graveyard(state, &old, events);
        }
        let player = state.player_mut(actor);
        if zone == Zone::Hand {
            player.remove_from_hand(card_id);
        } else {
            player.remove_from_backrow(card_id);
        }
        player.field_spell = Some(SpellTrapCard {
            card_id: card_id.clone(),
            definition_id,
            face_up: true,
            turn_set: turn,
        });
        return;
    }

    let player = state.player_mut(actor);
    if zone == Zone::Hand {
        player.remove_from_hand(card_id);
        player.backrow.push(SpellTrapCard {
            card_id: card_id.clone(),
            definition_id,
            face_up: true,
            turn_set: turn,
        });
    } else if let Some(card) = player.backrow.iter_mut().find(|c| &c.card_id == card_id) {
        card.face_up = true;
    } else if let Some(card) = player.field_spell.as_mut() {
        card.face_up = true;
    }
}

/// Pass priority. The second pass in a row resolves the chain.
pub fn pass_priority(
    state: &mut GameState,
    ctx: &RulesContext<'_>,
    events: &mut Vec<GameEvent>,
) -> RuleResult {
    if state.game_over {
        return Err(RejectReason::GameOver);
    }
    if !state.chain_active() {
        return Err(RejectReason::NoChain);
    }
    if state.current_priority_player != Some(ctx.actor) {
        return Err(RejectReason::NotPriorityHolder);
    }
    events.push(GameEvent::PriorityPassed { seat: ctx.actor });
    match record_pass(state) {
        PriorityResult::Continue => {
            state.current_priority_player = Some(ctx.actor.other());
        }
        PriorityResult::ChainResolves => resolve_chain(state, ctx, events),
    }
    Ok(())
}

/// Resolve every link, newest first.
pub fn resolve_chain(state: &mut GameState, ctx: &RulesContext<'_>, events: &mut Vec<GameEvent>) {
    while let Some(link) = state.current_chain.pop() {
        let position = state.current_chain.len() + 1;
        resolve_link(state, ctx.catalog, &link, events);
        events.push(GameEvent::ChainLinkResolved {
            seat: link.activating_player,
            card_id: link.card_id.clone(),
            effect_index: link.effect_index,
            link: position,
        });
        if state.game_over {
            return;
        }
    }
    state.current_priority_player = None;
    state.consecutive_passes = 0;
    events.push(GameEvent::ChainResolved);
}

/// CHAIN_RESPONSE: pass, or activate the named card on top of the chain.
pub fn respond(
    state: &mut GameState,
    ctx: &RulesContext<'_>,
    pass: bool,
    card_id: Option<&InstanceId>,
    effect_index: usize,
    targets: &[InstanceId],
    events: &mut Vec<GameEvent>,
) -> RuleResult {
    if pass {
        return pass_priority(state, ctx, events);
    }
    if !state.chain_active() {
        return Err(RejectReason::NoChain);
    }
    let card_id = card_id.ok_or(RejectReason::MissingCard)?;
    let kind = state
        .definition(ctx.catalog, card_id)
        .map(ActivationKind::of)
        .ok_or_else(|| RejectReason::CardNotFound {
            card_id: card_id.clone(),
        })?;
    activate(state, ctx, kind, card_id, effect_index, targets, events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::starter::starter_catalog;
    use crate::config::DuelConfig;
    use crate::game_state::Phase;
    use crate::ids::DefinitionId;

    fn hand_card(state: &mut GameState, seat: Seat, def: &str, serial: u32) -> InstanceId {
        let def = DefinitionId::new(def);
        let id = InstanceId::mint(serial);
        state.instance_to_definition.insert(id.clone(), def);
        state.player_mut(seat).hand.push(id.clone());
        id
    }

    fn set_card(state: &mut GameState, seat: Seat, def: &str, serial: u32, turn_set: u32) -> InstanceId {
        let def = DefinitionId::new(def);
        let id = InstanceId::mint(serial);
        state.instance_to_definition.insert(id.clone(), def.clone());
        state.player_mut(seat).backrow.push(SpellTrapCard {
            card_id: id.clone(),
            definition_id: def,
            face_up: false,
            turn_set,
        });
        id
    }

    fn main_phase_state() -> GameState {
        let mut state = GameState::empty(DuelConfig::default(), 3, Seat::Host);
        state.turn_number = 3;
        state.current_phase = Phase::Main;
        state
    }

    #[test]
    fn activation_hands_priority_to_opponent() {
        let catalog = starter_catalog();
        let mut state = main_phase_state();
        let quiz = hand_card(&mut state, Seat::Host, "pop-quiz", 1);
        let ctx = RulesContext::new(&catalog, Seat::Host);
        let mut events = Vec::new();

        activate(&mut state, &ctx, ActivationKind::Spell, &quiz, 0, &[], &mut events).unwrap();

        assert_eq!(state.current_chain.len(), 1);
        assert_eq!(state.current_priority_player, Some(Seat::Away));
        assert!(state.player(Seat::Host).hand.is_empty());
        assert_eq!(state.player(Seat::Host).backrow.len(), 1);
    }

    #[test]
    fn two_passes_resolve_and_clear_priority() {
        let catalog = starter_catalog();
        let mut state = main_phase_state();
        let quiz = hand_card(&mut state, Seat::Host, "pop-quiz", 1);
        let mut events = Vec::new();
        activate(
            &mut state,
            &RulesContext::new(&catalog, Seat::Host),
            ActivationKind::Spell,
            &quiz,
            0,
            &[],
            &mut events,
        )
        .unwrap();

        // The activator does not hold priority.
        assert_eq!(
            pass_priority(&mut state, &RulesContext::new(&catalog, Seat::Host), &mut events),
            Err(RejectReason::NotPriorityHolder)
        );
        pass_priority(&mut state, &RulesContext::new(&catalog, Seat::Away), &mut events).unwrap();
        assert!(state.chain_active());
        pass_priority(&mut state, &RulesContext::new(&catalog, Seat::Host), &mut events).unwrap();

        assert!(!state.chain_active());
        assert_eq!(state.current_priority_player, None);
        assert_eq!(state.player(Seat::Away).life, 7500);
        assert_eq!(state.player(Seat::Host).graveyard, vec![quiz]);
    }

    #[test]
    fn trap_set_this_turn_cannot_activate() {
        let catalog = starter_catalog();
        let mut state = main_phase_state();
        let trap = set_card(&mut state, Seat::Host, "fire-drill", 1, 3);
        let mut events = Vec::new();
        assert_eq!(
            activate(
                &mut state,
                &RulesContext::new(&catalog, Seat::Host),
                ActivationKind::Trap,
                &trap,
                0,
                &[],
                &mut events
            ),
            Err(RejectReason::SetThisTurn { card_id: trap })
        );
    }

    #[test]
    fn normal_spell_is_not_a_chain_response() {
        let catalog = starter_catalog();
        let mut state = main_phase_state();
        let quiz = hand_card(&mut state, Seat::Host, "pop-quiz", 1);
        let away_quiz = hand_card(&mut state, Seat::Away, "pop-quiz", 2);
        let mut events = Vec::new();
        activate(
            &mut state,
            &RulesContext::new(&catalog, Seat::Host),
            ActivationKind::Spell,
            &quiz,
            0,
            &[],
            &mut events,
        )
        .unwrap();
        let result = respond(
            &mut state,
            &RulesContext::new(&catalog, Seat::Away),
            false,
            Some(&away_quiz),
            0,
            &[],
            &mut events,
        );
        assert_eq!(result, Err(RejectReason::NotQuickSpeed { card_id: away_quiz }));
    }

    #[test]
    fn field_spell_replaces_existing_one() {
        let catalog = starter_catalog();
        let mut state = main_phase_state();
        let first = hand_card(&mut state, Seat::Host, "cafeteria", 1);
        let second = hand_card(&mut state, Seat::Host, "cafeteria", 2);
        let mut events = Vec::new();
        for card in [&first, &second] {
            activate(
                &mut state,
                &RulesContext::new(&catalog, Seat::Host),
                ActivationKind::Spell,
                card,
                0,
                &[],
                &mut events,
            )
            .unwrap();
            pass_priority(&mut state, &RulesContext::new(&catalog, Seat::Away), &mut events)
                .unwrap();
            pass_priority(&mut state, &RulesContext::new(&catalog, Seat::Host), &mut events)
                .unwrap();
        }
        let player = state.player(Seat::Host);
        assert_eq!(player.field_spell.as_ref().map(|c| &c.card_id), Some(&second));
        assert_eq!(player.graveyard, vec![first]);
        assert!(player.backrow.is_empty());
    }
}
