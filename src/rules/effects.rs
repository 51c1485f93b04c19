//! Effect resolution and the zone moves effects and battles share.

use crate::cards::{CardCatalog, CardEffect, EffectAction, SpellType, TargetRule, TrapType};
use crate::events::{DamageSource, DestroyCause, GameEvent};
use crate::game_state::{
    ChainLink, CoinTossRecord, CostModifier, CostModifierKind, GameState, Modifier,
    TurnRestriction,
};
use crate::ids::{InstanceId, Seat};
use crate::turn::draw_cards;

use super::{RejectReason, RuleResult};

/// Board monster to its owner's graveyard.
pub(crate) fn destroy_monster(
    state: &mut GameState,
    card_id: &InstanceId,
    cause: DestroyCause,
    events: &mut Vec<GameEvent>,
) -> bool {
    let Some((owner, _)) = state.board_card(card_id) else {
        return false;
    };
    let Some(card) = state.player_mut(owner).remove_from_board(card_id) else {
        return false;
    };
    state.forget_modifiers(card_id);
    state.player_mut(owner).graveyard.push(card.card_id.clone());
    events.push(GameEvent::CardDestroyed {
        owner,
        card_id: card.card_id,
        cause,
    });
    true
}

fn destroy_spell_trap(
    state: &mut GameState,
    card_id: &InstanceId,
    events: &mut Vec<GameEvent>,
) -> bool {
    let Some((owner, _)) = state.spell_trap_card(card_id) else {
        return false;
    };
    let Some(card) = state.player_mut(owner).remove_from_backrow(card_id) else {
        return false;
    };
    state.player_mut(owner).graveyard.push(card.card_id.clone());
    events.push(GameEvent::CardDestroyed {
        owner,
        card_id: card.card_id,
        cause: DestroyCause::Effect,
    });
    true
}

/// A resolved or replaced spell/trap leaving the field.
pub(crate) fn send_spell_trap_to_graveyard(
    state: &mut GameState,
    card_id: &InstanceId,
    events: &mut Vec<GameEvent>,
) -> bool {
    let Some((owner, _)) = state.spell_trap_card(card_id) else {
        return false;
    };
    let Some(card) = state.player_mut(owner).remove_from_backrow(card_id) else {
        return false;
    };
    state.player_mut(owner).graveyard.push(card.card_id.clone());
    events.push(GameEvent::CardSentToGraveyard {
        owner,
        card_id: card.card_id,
    });
    true
}

/// Take a card off the field, wherever it sits. Returns its owner.
fn lift_from_field(state: &mut GameState, card_id: &InstanceId) -> Option<Seat> {
    if let Some((owner, _)) = state.board_card(card_id) {
        state.player_mut(owner).remove_from_board(card_id)?;
        state.forget_modifiers(card_id);
        return Some(owner);
    }
    if let Some((owner, _)) = state.spell_trap_card(card_id) {
        state.player_mut(owner).remove_from_backrow(card_id)?;
        return Some(owner);
    }
    None
}

fn banish(state: &mut GameState, card_id: &InstanceId, events: &mut Vec<GameEvent>) {
    if let Some(owner) = lift_from_field(state, card_id) {
        state.player_mut(owner).banished.push(card_id.clone());
        events.push(GameEvent::CardBanished {
            owner,
            card_id: card_id.clone(),
        });
    }
}

fn return_to_hand(state: &mut GameState, card_id: &InstanceId, events: &mut Vec<GameEvent>) {
    if let Some(owner) = lift_from_field(state, card_id) {
        state.player_mut(owner).hand.push(card_id.clone());
        events.push(GameEvent::CardReturnedToHand {
            owner,
            card_id: card_id.clone(),
        });
    }
}

pub(crate) fn deal_damage(
    state: &mut GameState,
    seat: Seat,
    amount: i32,
    source: DamageSource,
    events: &mut Vec<GameEvent>,
) {
    if amount <= 0 {
        return;
    }
    state.player_mut(seat).life -= amount;
    events.push(GameEvent::DamageDealt {
        seat,
        amount,
        source,
    });
}

/// Whether `target` is currently a legal pick for `rule`, activated by `actor`.
pub fn is_legal_target(
    state: &GameState,
    rule: TargetRule,
    actor: Seat,
    source: &InstanceId,
    target: &InstanceId,
) -> bool {
    match rule {
        TargetRule::None => false,
        TargetRule::OpponentMonster => state.player(actor.other()).board_card(target).is_some(),
        TargetRule::OwnMonster => state.player(actor).board_card(target).is_some(),
        TargetRule::AnyMonster => state.board_card(target).is_some(),
        TargetRule::AnyBackrow => target != source && state.spell_trap_card(target).is_some(),
    }
}

/// An untargeted effect takes no targets; a targeted one takes exactly one legal target.
pub fn validate_targets(
    state: &GameState,
    effect: Option<&CardEffect>,
    actor: Seat,
    source: &InstanceId,
    targets: &[InstanceId],
) -> RuleResult {
    let rule = effect.map(|e| e.target).unwrap_or_default();
    if !rule.requires_target() {
        return match targets.first() {
            None => Ok(()),
            Some(extra) => Err(RejectReason::InvalidTarget {
                card_id: Some(extra.clone()),
            }),
        };
    }
    match targets {
        [target] if is_legal_target(state, rule, actor, source, target) => Ok(()),
        [target] => Err(RejectReason::InvalidTarget {
            card_id: Some(target.clone()),
        }),
        [] => Err(RejectReason::InvalidTarget { card_id: None }),
        [_, extra, ..] => Err(RejectReason::InvalidTarget {
            card_id: Some(extra.clone()),
        }),
    }
}

/// Resolve one chain link, then move a spent spell/trap to the graveyard.
pub fn resolve_link(
    state: &mut GameState,
    catalog: &CardCatalog,
    link: &ChainLink,
    events: &mut Vec<GameEvent>,
) {
    let Some(definition) = state.definition(catalog, &link.card_id).cloned() else {
        return;
    };
    if let Some(effect) = definition.effect(link.effect_index) {
        let actor = link.activating_player;
        // A target that left its zone makes the targeted actions fizzle.
        let target = link
            .targets
            .first()
            .filter(|t| is_legal_target(state, effect.target, actor, &link.card_id, t))
            .cloned();
        for action in &effect.actions {
            if state.game_over {
                return;
            }
            apply_action(state, link, effect.target, action, target.as_ref(), events);
        }
    }

    let lingers = matches!(
        definition.spell_type(),
        Some(SpellType::Continuous | SpellType::Field)
    ) || definition.trap_type() == Some(TrapType::Continuous);
    if (definition.is_spell() || definition.is_trap()) && !lingers && !state.game_over {
        send_spell_trap_to_graveyard(state, &link.card_id, events);
    }
}

fn apply_action(
    state: &mut GameState,
    link: &ChainLink,
    rule: TargetRule,
    action: &EffectAction,
    target: Option<&InstanceId>,
    events: &mut Vec<GameEvent>,
) {
    let actor = link.activating_player;
    let opponent = actor.other();
    match action {
        EffectAction::Damage { amount } => {
            deal_damage(state, opponent, *amount, DamageSource::Effect, events)
        }
        EffectAction::Heal { amount } => {
            if *amount > 0 {
                state.player_mut(actor).life += amount;
                events.push(GameEvent::LifeGained {
                    seat: actor,
                    amount: *amount,
                });
            }
        }
        EffectAction::Draw { count } => {
            draw_cards(state, actor, *count as usize, events);
        }
        EffectAction::DestroyTarget => {
            if let Some(target) = target
                && !destroy_monster(state, target, DestroyCause::Effect, events)
            {
                destroy_spell_trap(state, target, events);
            }
        }
        EffectAction::BanishTarget => {
            if let Some(target) = target {
                banish(state, target, events);
            }
        }
        EffectAction::ReturnTargetToHand => {
            if let Some(target) = target {
                return_to_hand(state, target, events);
            }
        }
        EffectAction::Boost {
            attack,
            defense,
            expiry,
        } => {
            let recipients: Vec<InstanceId> = if rule.requires_target() {
                target
                    .filter(|t| state.board_card(t).is_some())
                    .cloned()
                    .into_iter()
                    .collect()
            } else {
                state
                    .player(actor)
                    .face_up_monsters()
                    .map(|c| c.card_id.clone())
                    .collect()
            };
            for card_id in recipients {
                state.modifiers.push(Modifier {
                    card_id: card_id.clone(),
                    attack: *attack,
                    defense: *defense,
                    expiry: *expiry,
                    applied_turn: state.turn_number,
                });
                events.push(GameEvent::ModifierApplied {
                    card_id,
                    attack: *attack,
                    defense: *defense,
                    expiry: *expiry,
                });
            }
        }
        EffectAction::AddVice { amount } => {
            if let Some(target) = target
                && let Some(card) = state.board_card_mut(target)
            {
                card.vice_counters += amount;
                let total = card.vice_counters;
                events.push(GameEvent::ViceCountersAdded {
                    card_id: target.clone(),
                    amount: *amount,
                    total,
                });
            }
        }
        EffectAction::RestrictOpponent { restriction, turns } => {
            let expires_on_turn = state.turn_number + turns;
            state.turn_restrictions.push(TurnRestriction {
                seat: opponent,
                restriction: *restriction,
                expires_on_turn,
            });
            events.push(GameEvent::RestrictionApplied {
                seat: opponent,
                restriction: *restriction,
                expires_on_turn,
            });
        }
        EffectAction::TributeDiscount { turns } => {
            let expires_on_turn = state.turn_number + turns;
            state.cost_modifiers.push(CostModifier {
                seat: actor,
                kind: CostModifierKind::TributeDiscount,
                expires_on_turn,
            });
            events.push(GameEvent::TributeDiscountGranted {
                seat: actor,
                expires_on_turn,
            });
        }
        EffectAction::DiscardRandom { count } => {
            for _ in 0..*count {
                let hand_len = state.player(opponent).hand.len();
                if hand_len == 0 {
                    break;
                }
                let index = state.next_random(hand_len as u64) as usize;
                let player = state.player_mut(opponent);
                let card_id = player.hand.remove(index);
                player.graveyard.push(card_id.clone());
                events.push(GameEvent::CardDiscarded {
                    owner: opponent,
                    card_id,
                });
            }
        }
        EffectAction::CoinToss { amount } => {
            let heads = state.next_random(2) == 0;
            state.last_coin_toss = Some(CoinTossRecord {
                seat: actor,
                heads,
                turn: state.turn_number,
            });
            events.push(GameEvent::CoinTossed { seat: actor, heads });
            let victim = if heads { opponent } else { actor };
            deal_damage(state, victim, *amount, DamageSource::Effect, events);
        }
    }
}
