//! Normal summon, set, tribute, flip summon and position changes.

use crate::events::{DestroyCause, GameEvent};
use crate::game_state::{BoardCard, GameState, Position, SpellTrapCard};
use crate::ids::InstanceId;

use super::effects::destroy_monster;
use super::{RejectReason, RuleResult, RulesContext, require_main_phase};

/// Tributes a monster of `level` needs for `ctx.actor` right now.
pub fn tributes_required(state: &GameState, ctx: &RulesContext<'_>, level: u8) -> usize {
    if level < state.config.tribute_level || state.has_tribute_discount(ctx.actor) {
        0
    } else {
        1
    }
}

/// Checks a SUMMON or SET_MONSTER of a hand monster with the given tributes.
pub fn check_normal_summon(
    state: &GameState,
    ctx: &RulesContext<'_>,
    card_id: &InstanceId,
    tributes: &[InstanceId],
) -> RuleResult {
    require_main_phase(state, ctx.actor)?;
    let player = state.player(ctx.actor);
    if !player.hand_contains(card_id) {
        return Err(RejectReason::NotInHand {
            card_id: card_id.clone(),
        });
    }
    let level = state
        .definition(ctx.catalog, card_id)
        .and_then(|d| d.level())
        .ok_or_else(|| RejectReason::NotAMonster {
            card_id: card_id.clone(),
        })?;
    if player.normal_summoned_this_turn {
        return Err(RejectReason::AlreadyNormalSummoned);
    }

    let required = tributes_required(state, ctx, level);
    if tributes.len() != required {
        return Err(RejectReason::TributeMismatch {
            required,
            supplied: tributes.len(),
        });
    }
    for (i, tribute) in tributes.iter().enumerate() {
        let valid = player.board_card(tribute).is_some_and(|c| c.face_up)
            && !tributes[..i].contains(tribute);
        if !valid {
            return Err(RejectReason::InvalidTribute {
                card_id: tribute.clone(),
            });
        }
    }
    if player.board.len() - tributes.len() >= state.config.board_capacity {
        return Err(RejectReason::BoardFull);
    }
    Ok(())
}

/// SUMMON (face-up attack) or SET_MONSTER (face-down defense).
pub fn normal_summon(
    state: &mut GameState,
    ctx: &RulesContext<'_>,
    card_id: &InstanceId,
    tributes: &[InstanceId],
    face_up: bool,
    events: &mut Vec<GameEvent>,
) -> RuleResult {
    check_normal_summon(state, ctx, card_id, tributes)?;
    let definition_id = state
        .definition_id(card_id)
        .cloned()
        .ok_or_else(|| RejectReason::CardNotFound {
            card_id: card_id.clone(),
        })?;

    for tribute in tributes {
        destroy_monster(state, tribute, DestroyCause::Tribute, events);
    }
    let turn = state.turn_number;
    let position = if face_up {
        Position::Attack
    } else {
        Position::Defense
    };
    let player = state.player_mut(ctx.actor);
    player.remove_from_hand(card_id);
    player.board.push(BoardCard::new(
        card_id.clone(),
        definition_id,
        position,
        face_up,
        turn,
    ));
    player.normal_summoned_this_turn = true;

    events.push(if face_up {
        GameEvent::MonsterSummoned {
            seat: ctx.actor,
            card_id: card_id.clone(),
            tributes: tributes.to_vec(),
        }
    } else {
        GameEvent::MonsterSet {
            seat: ctx.actor,
            card_id: Some(card_id.clone()),
            tributes: tributes.to_vec(),
        }
    });
    Ok(())
}

pub fn check_flip_summon(
    state: &GameState,
    ctx: &RulesContext<'_>,
    card_id: &InstanceId,
) -> RuleResult {
    require_main_phase(state, ctx.actor)?;
    let card = state
        .player(ctx.actor)
        .board_card(card_id)
        .ok_or_else(|| RejectReason::NotOnBoard {
            card_id: card_id.clone(),
        })?;
    if card.face_up {
        return Err(RejectReason::NotFaceDown {
            card_id: card_id.clone(),
        });
    }
    if card.turn_summoned >= state.turn_number {
        return Err(RejectReason::SummonedThisTurn {
            card_id: card_id.clone(),
        });
    }
    Ok(())
}

/// Face-down defense to face-up attack. Does not use the normal summon.
pub fn flip_summon(
    state: &mut GameState,
    ctx: &RulesContext<'_>,
    card_id: &InstanceId,
    events: &mut Vec<GameEvent>,
) -> RuleResult {
    check_flip_summon(state, ctx, card_id)?;
    if let Some(card) = state.player_mut(ctx.actor).board_card_mut(card_id) {
        card.face_up = true;
        card.position = Position::Attack;
        card.position_changed_this_turn = true;
    }
    events.push(GameEvent::FlipSummoned {
        seat: ctx.actor,
        card_id: card_id.clone(),
    });
    Ok(())
}

pub fn check_change_position(
    state: &GameState,
    ctx: &RulesContext<'_>,
    card_id: &InstanceId,
) -> RuleResult {
    require_main_phase(state, ctx.actor)?;
    let card = state
        .player(ctx.actor)
        .board_card(card_id)
        .ok_or_else(|| RejectReason::NotOnBoard {
            card_id: card_id.clone(),
        })?;
    if !card.face_up {
        return Err(RejectReason::FaceDown {
            card_id: card_id.clone(),
        });
    }
    if card.turn_summoned >= state.turn_number {
        return Err(RejectReason::SummonedThisTurn {
            card_id: card_id.clone(),
        });
    }
    if card.position_changed_this_turn {
        return Err(RejectReason::PositionAlreadyChanged {
            card_id: card_id.clone(),
        });
    }
    Ok(())
}

pub fn change_position(
    state: &mut GameState,
    ctx: &RulesContext<'_>,
    card_id: &InstanceId,
    events: &mut Vec<GameEvent>,
) -> RuleResult {
    check_change_position(state, ctx, card_id)?;
    let Some(card) = state.player_mut(ctx.actor).board_card_mut(card_id) else {
        return Err(RejectReason::NotOnBoard {
            card_id: card_id.clone(),
        });
    };
    card.position = match card.position {
        Position::Attack => Position::Defense,
        Position::Defense => Position::Attack,
    };
    card.position_changed_this_turn = true;
    let position = card.position;
    events.push(GameEvent::PositionChanged {
        seat: ctx.actor,
        card_id: card_id.clone(),
        position,
    });
    Ok(())
}

pub fn check_set_spell_trap(
    state: &GameState,
    ctx: &RulesContext<'_>,
    card_id: &InstanceId,
) -> RuleResult {
    require_main_phase(state, ctx.actor)?;
    let player = state.player(ctx.actor);
    if !player.hand_contains(card_id) {
        return Err(RejectReason::NotInHand {
            card_id: card_id.clone(),
        });
    }
    let definition = state
        .definition(ctx.catalog, card_id)
        .ok_or_else(|| RejectReason::CardNotFound {
            card_id: card_id.clone(),
        })?;
    if definition.is_monster() {
        return Err(RejectReason::NotASpell {
            card_id: card_id.clone(),
        });
    }
    if player.backrow.len() >= state.config.backrow_capacity {
        return Err(RejectReason::BackrowFull);
    }
    Ok(())
}

/// Hand spell or trap to the backrow, face-down.
pub fn set_spell_trap(
    state: &mut GameState,
    ctx: &RulesContext<'_>,
    card_id: &InstanceId,
    events: &mut Vec<GameEvent>,
) -> RuleResult {
    check_set_spell_trap(state, ctx, card_id)?;
    let definition_id = state
        .definition_id(card_id)
        .cloned()
        .ok_or_else(|| RejectReason::CardNotFound {
            card_id: card_id.clone(),
        })?;
    let turn = state.turn_number;
    let player = state.player_mut(ctx.actor);
    player.remove_from_hand(card_id);
    player.backrow.push(SpellTrapCard {
        card_id: card_id.clone(),
        definition_id,
        face_up: false,
        turn_set: turn,
    });
    events.push(GameEvent::SpellTrapSet {
        seat: ctx.actor,
        card_id: Some(card_id.clone()),
    });
    Ok(())
}
