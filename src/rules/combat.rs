//! Attack declaration and battle damage.

use crate::cards::{CardCatalog, Restriction};
use crate::events::{DamageSource, DestroyCause, GameEvent};
use crate::game_state::{BoardCard, GameState, Phase, Position};
use crate::ids::{InstanceId, Seat};

use super::effects::{deal_damage, destroy_monster};
use super::{RejectReason, RuleResult, RulesContext, require_open_turn};

/// Errors that can occur when validating an attack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CombatError {
    NotInCombat,
    AttackerMissing,
    AttackerFaceDown,
    AttackerInDefense,
    AlreadyAttacked,
    Restricted,
    TargetMissing,
    DirectAttackBlocked,
}

impl std::fmt::Display for CombatError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CombatError::NotInCombat => write!(f, "attacks are declared in the combat phase"),
            CombatError::AttackerMissing => write!(f, "attacker is not on your board"),
            CombatError::AttackerFaceDown => write!(f, "attacker is face-down"),
            CombatError::AttackerInDefense => write!(f, "attacker is in defense position"),
            CombatError::AlreadyAttacked => write!(f, "attacker already attacked this turn"),
            CombatError::Restricted => write!(f, "attacks are restricted this turn"),
            CombatError::TargetMissing => write!(f, "target is not on the opposing board"),
            CombatError::DirectAttackBlocked => {
                write!(f, "direct attack needs an empty opposing board")
            }
        }
    }
}

impl std::error::Error for CombatError {}

impl CombatError {
    fn into_reject(self, state: &GameState, attacker: &InstanceId, target: Option<&InstanceId>) -> RejectReason {
        match self {
            CombatError::NotInCombat => RejectReason::WrongPhase {
                phase: state.current_phase,
            },
            CombatError::AttackerMissing => RejectReason::NotOnBoard {
                card_id: attacker.clone(),
            },
            CombatError::AttackerFaceDown => RejectReason::FaceDown {
                card_id: attacker.clone(),
            },
            CombatError::AttackerInDefense => RejectReason::NotInAttackPosition {
                card_id: attacker.clone(),
            },
            CombatError::AlreadyAttacked => RejectReason::AlreadyAttacked {
                card_id: attacker.clone(),
            },
            CombatError::Restricted => RejectReason::AttackRestricted,
            CombatError::TargetMissing => RejectReason::InvalidTarget {
                card_id: target.cloned(),
            },
            CombatError::DirectAttackBlocked => RejectReason::DirectAttackBlocked,
        }
    }
}

/// Whether `card` may be declared as an attacker by `seat` at all this phase.
pub fn can_attack(state: &GameState, seat: Seat, card: &BoardCard) -> Result<(), CombatError> {
    if state.current_phase != Phase::Combat {
        return Err(CombatError::NotInCombat);
    }
    if state.has_restriction(seat, Restriction::CannotAttack) {
        return Err(CombatError::Restricted);
    }
    if !card.face_up {
        return Err(CombatError::AttackerFaceDown);
    }
    if card.position != Position::Attack {
        return Err(CombatError::AttackerInDefense);
    }
    if card.attacked_this_turn {
        return Err(CombatError::AlreadyAttacked);
    }
    Ok(())
}

/// Direct attacks need an empty opposing board.
pub fn can_attack_directly(state: &GameState, seat: Seat) -> bool {
    state.player(seat.other()).board.is_empty()
}

pub fn check_attack(
    state: &GameState,
    seat: Seat,
    attacker: &InstanceId,
    target: Option<&InstanceId>,
) -> Result<(), CombatError> {
    let card = state
        .player(seat)
        .board_card(attacker)
        .ok_or(CombatError::AttackerMissing)?;
    can_attack(state, seat, card)?;
    match target {
        None if can_attack_directly(state, seat) => Ok(()),
        None => Err(CombatError::DirectAttackBlocked),
        Some(target) if state.player(seat.other()).board_card(target).is_some() => Ok(()),
        Some(_) => Err(CombatError::TargetMissing),
    }
}

/// Outcome of comparing attacker and defender.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BattleResult {
    pub attacker_destroyed: bool,
    pub defender_destroyed: bool,
    pub attacker_controller_damage: i32,
    pub defender_controller_damage: i32,
}

/// Pure battle arithmetic. Equal values destroy nothing and deal no damage.
pub fn calculate_battle(attack: i32, defender_value: i32, defender_position: Position) -> BattleResult {
    let mut result = BattleResult {
        attacker_destroyed: false,
        defender_destroyed: false,
        attacker_controller_damage: 0,
        defender_controller_damage: 0,
    };
    match defender_position {
        Position::Attack => {
            if attack > defender_value {
                result.defender_destroyed = true;
                result.defender_controller_damage = attack - defender_value;
            } else if attack < defender_value {
                result.attacker_destroyed = true;
                result.attacker_controller_damage = defender_value - attack;
            }
        }
        Position::Defense => {
            if attack > defender_value {
                result.defender_destroyed = true;
            } else if attack < defender_value {
                result.attacker_controller_damage = defender_value - attack;
            }
        }
    }
    result
}

/// DECLARE_ATTACK. `target` of `None` attacks life points directly.
pub fn declare_attack(
    state: &mut GameState,
    ctx: &RulesContext<'_>,
    attacker: &InstanceId,
    target: Option<&InstanceId>,
    events: &mut Vec<GameEvent>,
) -> RuleResult {
    require_open_turn(state, ctx.actor)?;
    check_attack(state, ctx.actor, attacker, target)
        .map_err(|e| e.into_reject(state, attacker, target))?;

    let seat = ctx.actor;
    let opponent = seat.other();
    if let Some(card) = state.player_mut(seat).board_card_mut(attacker) {
        card.attacked_this_turn = true;
    }
    events.push(GameEvent::AttackDeclared {
        seat,
        attacker: attacker.clone(),
        target: target.cloned(),
    });

    let attack = effective_attack_of(state, ctx.catalog, attacker);
    let Some(target) = target else {
        deal_damage(state, opponent, attack, DamageSource::Battle, events);
        return Ok(());
    };

    if let Some(defender) = state.player_mut(opponent).board_card_mut(target)
        && !defender.face_up
    {
        defender.face_up = true;
        events.push(GameEvent::CardFlipped {
            owner: opponent,
            card_id: target.clone(),
        });
    }
    let (defender_position, defender_value) = match state.player(opponent).board_card(target) {
        Some(defender) => {
            let value = match defender.position {
                Position::Attack => state.effective_attack(ctx.catalog, defender),
                Position::Defense => state.effective_defense(ctx.catalog, defender),
            };
            (defender.position, value)
        }
        None => return Ok(()),
    };

    let result = calculate_battle(attack, defender_value, defender_position);
    if result.defender_destroyed {
        destroy_monster(state, target, DestroyCause::Battle, events);
    }
    if result.attacker_destroyed {
        destroy_monster(state, attacker, DestroyCause::Battle, events);
    }
    deal_damage(
        state,
        opponent,
        result.defender_controller_damage,
        DamageSource::Battle,
        events,
    );
    deal_damage(
        state,
        seat,
        result.attacker_controller_damage,
        DamageSource::Battle,
        events,
    );
    Ok(())
}

fn effective_attack_of(state: &GameState, catalog: &CardCatalog, card_id: &InstanceId) -> i32 {
    state
        .board_card(card_id)
        .map(|(_, card)| state.effective_attack(catalog, card))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attack_position_battle_damages_loser() {
        let r = calculate_battle(1500, 1800, Position::Attack);
        assert!(r.attacker_destroyed);
        assert!(!r.defender_destroyed);
        assert_eq!(r.attacker_controller_damage, 300);
        assert_eq!(r.defender_controller_damage, 0);
    }

    #[test]
    fn defense_position_destroy_deals_no_damage() {
        let r = calculate_battle(1500, 1000, Position::Defense);
        assert!(r.defender_destroyed);
        assert_eq!(r.attacker_controller_damage, 0);
        assert_eq!(r.defender_controller_damage, 0);
    }

    #[test]
    fn attacking_a_wall_hurts_attacker() {
        let r = calculate_battle(1000, 1800, Position::Defense);
        assert!(!r.defender_destroyed);
        assert!(!r.attacker_destroyed);
        assert_eq!(r.attacker_controller_damage, 800);
    }

    #[test]
    fn equal_values_are_a_draw() {
        for position in [Position::Attack, Position::Defense] {
            let r = calculate_battle(1500, 1500, position);
            assert_eq!(
                r,
                BattleResult {
                    attacker_destroyed: false,
                    defender_destroyed: false,
                    attacker_controller_damage: 0,
                    defender_controller_damage: 0,
                }
            );
        }
    }
}
