//! Scripted duel scenarios.
//!
//! A [`DuelScript`] places cards by definition id, then plays a list of
//! actions through the engine. Actions also name cards by definition id and
//! are resolved to instance ids against the live state, so a test reads like
//! a play-by-play.
//!
//! ```ignore
//! let run = DuelScript::new()
//!     .board(Seat::Host, "hall-monitor")
//!     .board(Seat::Away, "lunch-lady")
//!     .phase(Phase::Combat)
//!     .action(Seat::Host, Action::Attack("hall-monitor", "lunch-lady"))
//!     .run()
//!     .unwrap();
//! ```

#![allow(dead_code)]

use crate::cards::CardCatalog;
use crate::cards::starter::starter_catalog;
use crate::command::Command;
use crate::config::DuelConfig;
use crate::engine::{Outcome, RejectReason, apply_with_auto_advance};
use crate::events::GameEvent;
use crate::game_state::{BoardCard, GameState, Phase, Position, SpellTrapCard};
use crate::ids::{DefinitionId, InstanceId, Seat};
use crate::zone::Zone;

/// One scripted move. Cards are named by definition id.
#[derive(Debug, Clone)]
pub enum Action {
    Summon(&'static str),
    /// Summon the first card, tributing the second from the own board.
    SummonTributing(&'static str, &'static str),
    SetMonster(&'static str),
    FlipSummon(&'static str),
    ChangePosition(&'static str),
    SetSpellTrap(&'static str),
    ActivateSpell(&'static str),
    /// Spell, target seat, target card.
    ActivateSpellOn(&'static str, Seat, &'static str),
    ActivateTrap(&'static str),
    ActivateTrapOn(&'static str, Seat, &'static str),
    ActivateEffect(&'static str),
    ActivateEffectOn(&'static str, Seat, &'static str),
    Attack(&'static str, &'static str),
    AttackDirect(&'static str),
    Pass,
    AdvancePhase,
    EndTurn,
    Surrender,
    /// An already-resolved command, for references the script cannot express.
    Raw(Command),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptError {
    CardNotFound { seat: Seat, name: &'static str },
}

#[derive(Debug, Clone, Copy)]
enum Placement {
    Hand,
    Board { face_up: bool, position: Position },
    Backrow { face_up: bool },
}

/// Builder for a hand-made position plus a sequence of actions.
pub struct DuelScript {
    config: DuelConfig,
    first_player: Seat,
    turn_number: u32,
    phase: Phase,
    deck_size: usize,
    cards: Vec<(Seat, Placement, &'static str)>,
    actions: Vec<(Seat, Action)>,
}

/// Everything a script produced.
pub struct ScriptRun {
    pub state: GameState,
    pub outcomes: Vec<Outcome>,
    pub catalog: CardCatalog,
}

impl ScriptRun {
    /// Events of every applied action, in order.
    pub fn events(&self) -> Vec<GameEvent> {
        self.outcomes
            .iter()
            .filter_map(|o| match o {
                Outcome::Applied(events) => Some(events.clone()),
                Outcome::Rejected(_) => None,
            })
            .flatten()
            .collect()
    }

    pub fn outcome(&self, step: usize) -> &Outcome {
        &self.outcomes[step]
    }

    pub fn rejection(&self, step: usize) -> Option<&RejectReason> {
        match &self.outcomes[step] {
            Outcome::Rejected(reason) => Some(reason),
            Outcome::Applied(_) => None,
        }
    }

    pub fn instances_of(&self, seat: Seat, name: &str) -> Vec<InstanceId> {
        instances_of(&self.state, seat, name)
    }

    pub fn board_has(&self, seat: Seat, name: &str) -> bool {
        self.state
            .player(seat)
            .board
            .iter()
            .any(|c| c.definition_id.as_str() == name)
    }

    pub fn graveyard_count(&self, seat: Seat, name: &str) -> usize {
        self.state
            .player(seat)
            .graveyard
            .iter()
            .filter(|id| self.state.definition_id(id).is_some_and(|d| d.as_str() == name))
            .count()
    }

    pub fn life(&self, seat: Seat) -> i32 {
        self.state.player(seat).life
    }
}

/// Every instance of `name` the seat controls, in hand, board, backrow order.
fn instances_of(state: &GameState, seat: Seat, name: &str) -> Vec<InstanceId> {
    let player = state.player(seat);
    player
        .hand
        .iter()
        .chain(player.board.iter().map(|c| &c.card_id))
        .chain(player.backrow.iter().map(|c| &c.card_id))
        .chain(player.field_spell.iter().map(|c| &c.card_id))
        .filter(|id| state.definition_id(id).is_some_and(|d| d.as_str() == name))
        .cloned()
        .collect()
}

impl DuelScript {
    /// Host's main phase 1 on turn 2, with small decks of filler monsters.
    pub fn new() -> Self {
        Self {
            config: DuelConfig::default(),
            first_player: Seat::Host,
            turn_number: 2,
            phase: Phase::Main,
            deck_size: 10,
            cards: Vec::new(),
            actions: Vec::new(),
        }
    }

    pub fn config(mut self, config: DuelConfig) -> Self {
        self.config = config;
        self
    }

    pub fn phase(mut self, phase: Phase) -> Self {
        self.phase = phase;
        self
    }

    pub fn deck_size(mut self, size: usize) -> Self {
        self.deck_size = size;
        self
    }

    pub fn hand(mut self, seat: Seat, name: &'static str) -> Self {
        self.cards.push((seat, Placement::Hand, name));
        self
    }

    /// Face-up attack position, summoned on an earlier turn.
    pub fn board(mut self, seat: Seat, name: &'static str) -> Self {
        self.cards.push((
            seat,
            Placement::Board {
                face_up: true,
                position: Position::Attack,
            },
            name,
        ));
        self
    }

    pub fn board_defense(mut self, seat: Seat, name: &'static str, face_up: bool) -> Self {
        self.cards.push((
            seat,
            Placement::Board {
                face_up,
                position: Position::Defense,
            },
            name,
        ));
        self
    }

    /// Set face-down on an earlier turn.
    pub fn set(mut self, seat: Seat, name: &'static str) -> Self {
        self.cards
            .push((seat, Placement::Backrow { face_up: false }, name));
        self
    }

    pub fn action(mut self, seat: Seat, action: Action) -> Self {
        self.actions.push((seat, action));
        self
    }

    pub fn actions(mut self, seat: Seat, actions: impl IntoIterator<Item = Action>) -> Self {
        self.actions.extend(actions.into_iter().map(|a| (seat, a)));
        self
    }

    /// The placed position before any action runs.
    pub fn build(&self) -> GameState {
        let mut state = GameState::empty(self.config.clone(), 7, self.first_player);
        state.turn_number = self.turn_number;
        state.current_turn_player = self.first_player;
        state.current_phase = self.phase;

        let mut serial = 0u32;
        let mut mint = |state: &mut GameState, name: &str| {
            serial += 1;
            let id = InstanceId::mint(serial);
            state
                .instance_to_definition
                .insert(id.clone(), DefinitionId::new(name));
            id
        };

        for (seat, placement, name) in &self.cards {
            let id = mint(&mut state, name);
            let definition = DefinitionId::new(*name);
            let player = state.player_mut(*seat);
            match placement {
                Placement::Hand => player.hand.push(id),
                Placement::Board { face_up, position } => player.board.push(BoardCard::new(
                    id, definition, *position, *face_up, 0,
                )),
                Placement::Backrow { face_up } => player.backrow.push(SpellTrapCard {
                    card_id: id,
                    definition_id: definition,
                    face_up: *face_up,
                    turn_set: 0,
                }),
            }
        }
        for seat in Seat::ALL {
            for _ in 0..self.deck_size {
                let id = mint(&mut state, "class-clown");
                state.player_mut(seat).deck.push(id);
            }
        }
        state
    }

    pub fn run(self) -> Result<ScriptRun, ScriptError> {
        let catalog = starter_catalog();
        let mut state = self.build();
        let mut outcomes = Vec::with_capacity(self.actions.len());
        for (seat, action) in self.actions {
            let command = resolve(&state, seat, action)?;
            let transition = apply_with_auto_advance(&state, seat, &command, &catalog);
            state = transition.state;
            outcomes.push(transition.outcome);
        }
        Ok(ScriptRun {
            state,
            outcomes,
            catalog,
        })
    }
}

fn find(state: &GameState, seat: Seat, name: &'static str) -> Result<InstanceId, ScriptError> {
    instances_of(state, seat, name)
        .into_iter()
        .next()
        .ok_or(ScriptError::CardNotFound { seat, name })
}

fn resolve(state: &GameState, seat: Seat, action: Action) -> Result<Command, ScriptError> {
    let activation = |card: &'static str, target: Option<(Seat, &'static str)>| {
        let card_id = find(state, seat, card)?;
        let targets = match target {
            Some((owner, name)) => vec![find(state, owner, name)?],
            None => Vec::new(),
        };
        Ok::<_, ScriptError>((card_id, targets))
    };
    let command = match action {
        Action::Summon(name) => Command::Summon {
            card_id: find(state, seat, name)?,
            tribute_card_ids: Vec::new(),
        },
        Action::SummonTributing(name, tribute) => Command::Summon {
            card_id: find(state, seat, name)?,
            tribute_card_ids: vec![find(state, seat, tribute)?],
        },
        Action::SetMonster(name) => Command::SetMonster {
            card_id: find(state, seat, name)?,
            tribute_card_ids: Vec::new(),
        },
        Action::FlipSummon(name) => Command::FlipSummon {
            card_id: find(state, seat, name)?,
        },
        Action::ChangePosition(name) => Command::ChangePosition {
            card_id: find(state, seat, name)?,
        },
        Action::SetSpellTrap(name) => Command::SetSpellTrap {
            card_id: find(state, seat, name)?,
        },
        Action::ActivateSpell(name) => {
            let (card_id, targets) = activation(name, None)?;
            Command::ActivateSpell {
                card_id,
                effect_index: 0,
                targets,
            }
        }
        Action::ActivateSpellOn(name, owner, target) => {
            let (card_id, targets) = activation(name, Some((owner, target)))?;
            Command::ActivateSpell {
                card_id,
                effect_index: 0,
                targets,
            }
        }
        Action::ActivateTrap(name) => {
            let (card_id, targets) = activation(name, None)?;
            Command::ActivateTrap {
                card_id,
                effect_index: 0,
                targets,
            }
        }
        Action::ActivateTrapOn(name, owner, target) => {
            let (card_id, targets) = activation(name, Some((owner, target)))?;
            Command::ActivateTrap {
                card_id,
                effect_index: 0,
                targets,
            }
        }
        Action::ActivateEffect(name) => {
            let (card_id, targets) = activation(name, None)?;
            Command::ActivateEffect {
                card_id,
                effect_index: 0,
                targets,
            }
        }
        Action::ActivateEffectOn(name, owner, target) => {
            let (card_id, targets) = activation(name, Some((owner, target)))?;
            Command::ActivateEffect {
                card_id,
                effect_index: 0,
                targets,
            }
        }
        Action::Attack(attacker, target) => Command::DeclareAttack {
            attacker_card_id: find(state, seat, attacker)?,
            target_card_id: Some(find(state, seat.other(), target)?),
        },
        Action::AttackDirect(attacker) => Command::DeclareAttack {
            attacker_card_id: find(state, seat, attacker)?,
            target_card_id: None,
        },
        Action::Pass => Command::pass(),
        Action::AdvancePhase => Command::AdvancePhase,
        Action::EndTurn => Command::EndTurn,
        Action::Surrender => Command::Surrender,
        Action::Raw(command) => command,
    };
    Ok(command)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::is_legal;
    use crate::engine::evolve;
    use crate::events::DestroyCause;
    use crate::game_state::WinReason;
    use crate::view::player_view;

    #[test]
    fn test_chain_resolves_newest_first() {
        let script = DuelScript::new()
            .board(Seat::Host, "hall-monitor")
            .hand(Seat::Host, "pop-quiz")
            .hand(Seat::Host, "sugar-rush")
            .set(Seat::Away, "fire-drill");
        let start = script.build();
        let quiz = instances_of(&start, Seat::Host, "pop-quiz")[0].clone();
        let drill = instances_of(&start, Seat::Away, "fire-drill")[0].clone();
        let rush = instances_of(&start, Seat::Host, "sugar-rush")[0].clone();

        let run = script
            .action(Seat::Host, Action::ActivateSpell("pop-quiz"))
            .action(Seat::Away, Action::ActivateTrap("fire-drill"))
            .action(Seat::Host, Action::ActivateSpellOn("sugar-rush", Seat::Host, "hall-monitor"))
            .action(Seat::Host, Action::AdvancePhase)
            .action(Seat::Away, Action::Pass)
            .action(Seat::Host, Action::Pass)
            .run()
            .unwrap();

        for step in 0..3 {
            assert!(run.rejection(step).is_none(), "step {step} rejected");
        }
        assert_eq!(run.rejection(3), Some(&RejectReason::ChainActive));

        let resolved: Vec<InstanceId> = run
            .events()
            .into_iter()
            .filter_map(|e| match e {
                GameEvent::ChainLinkResolved { card_id, .. } => Some(card_id),
                _ => None,
            })
            .collect();
        assert_eq!(resolved, vec![rush, drill, quiz]);
        assert!(run.state.current_chain.is_empty());
        assert_eq!(run.state.current_priority_player, None);
        assert_eq!(run.life(Seat::Away), 8000 - 500);
        assert_eq!(run.graveyard_count(Seat::Host, "pop-quiz"), 1);
        assert_eq!(run.graveyard_count(Seat::Away, "fire-drill"), 1);
    }

    #[test]
    fn test_phase_actions_resume_after_the_chain() {
        let run = DuelScript::new()
            .hand(Seat::Host, "pop-quiz")
            .action(Seat::Host, Action::ActivateSpell("pop-quiz"))
            .action(Seat::Away, Action::Pass)
            .action(Seat::Host, Action::Pass)
            .action(Seat::Host, Action::AdvancePhase)
            .run()
            .unwrap();
        assert!(run.rejection(3).is_none());
        assert_eq!(run.state.current_phase, Phase::Combat);
    }

    #[test]
    fn test_tribute_summon_without_tributes_is_rejected() {
        let run = DuelScript::new()
            .hand(Seat::Host, "varsity-captain")
            .action(Seat::Host, Action::Summon("varsity-captain"))
            .run()
            .unwrap();
        assert_eq!(
            run.rejection(0),
            Some(&RejectReason::TributeMismatch {
                required: 1,
                supplied: 0
            })
        );
        assert!(run.events().is_empty());
        assert_eq!(run.state.player(Seat::Host).hand.len(), 1);
    }

    #[test]
    fn test_tribute_summon_consumes_exactly_the_tribute() {
        let script = DuelScript::new()
            .board(Seat::Host, "hall-monitor")
            .board(Seat::Host, "class-clown")
            .hand(Seat::Host, "varsity-captain");
        let tribute = instances_of(&script.build(), Seat::Host, "hall-monitor")[0].clone();
        let run = script
            .action(Seat::Host, Action::SummonTributing("varsity-captain", "hall-monitor"))
            .run()
            .unwrap();

        assert!(run.rejection(0).is_none());
        assert!(run.board_has(Seat::Host, "varsity-captain"));
        assert!(run.board_has(Seat::Host, "class-clown"));
        assert!(!run.board_has(Seat::Host, "hall-monitor"));
        assert_eq!(run.state.player(Seat::Host).graveyard, vec![tribute.clone()]);
        assert!(run.events().contains(&GameEvent::CardDestroyed {
            owner: Seat::Host,
            card_id: tribute,
            cause: DestroyCause::Tribute,
        }));
    }

    #[test]
    fn test_attack_into_weaker_defense() {
        let run = DuelScript::new()
            .phase(Phase::Combat)
            .board(Seat::Host, "hall-monitor")
            .board_defense(Seat::Away, "hall-monitor", true)
            .action(Seat::Host, Action::Attack("hall-monitor", "hall-monitor"))
            .run()
            .unwrap();
        assert!(run.rejection(0).is_none());
        assert!(run.board_has(Seat::Host, "hall-monitor"));
        assert!(!run.board_has(Seat::Away, "hall-monitor"));
        assert_eq!(run.life(Seat::Host), 8000);
        assert_eq!(run.life(Seat::Away), 8000);
    }

    #[test]
    fn test_attack_into_stronger_attacker() {
        let run = DuelScript::new()
            .phase(Phase::Combat)
            .board(Seat::Host, "hall-monitor")
            .board(Seat::Away, "lunch-lady")
            .action(Seat::Host, Action::Attack("hall-monitor", "lunch-lady"))
            .run()
            .unwrap();
        assert!(!run.board_has(Seat::Host, "hall-monitor"));
        assert!(run.board_has(Seat::Away, "lunch-lady"));
        assert_eq!(run.life(Seat::Host), 8000 - 300);
        assert_eq!(run.life(Seat::Away), 8000);
    }

    #[test]
    fn test_surrender_out_of_turn() {
        let run = DuelScript::new()
            .action(Seat::Away, Action::Surrender)
            .action(Seat::Host, Action::EndTurn)
            .run()
            .unwrap();
        assert!(run.rejection(0).is_none());
        assert!(run.state.game_over);
        assert_eq!(run.state.winner, Some(Seat::Host));
        assert_eq!(run.state.win_reason, Some(WinReason::Surrender));
        assert_eq!(run.rejection(1), Some(&RejectReason::GameOver));
    }

    #[test]
    fn test_snapshot_round_trip_accepts_the_same_commands() {
        let run = DuelScript::new()
            .board(Seat::Host, "hall-monitor")
            .hand(Seat::Host, "lunch-lady")
            .hand(Seat::Host, "varsity-captain")
            .set(Seat::Away, "hall-pass")
            .action(Seat::Host, Action::Summon("lunch-lady"))
            .run()
            .unwrap();
        let text = serde_json::to_string(&run.state).unwrap();
        let restored: GameState = serde_json::from_str(&text).unwrap();
        assert_eq!(restored, run.state);

        let captain = instances_of(&run.state, Seat::Host, "varsity-captain")[0].clone();
        let monitor = instances_of(&run.state, Seat::Host, "hall-monitor")[0].clone();
        let attempts = [
            (Seat::Host, Command::AdvancePhase),
            (Seat::Away, Command::AdvancePhase),
            (
                Seat::Host,
                Command::Summon {
                    card_id: captain,
                    tribute_card_ids: vec![monitor.clone()],
                },
            ),
            (Seat::Host, Command::ChangePosition { card_id: monitor }),
            (Seat::Away, Command::Surrender),
        ];
        for (seat, command) in attempts {
            let live = evolve(&run.state, seat, &command, &run.catalog);
            let thawed = evolve(&restored, seat, &command, &run.catalog);
            assert_eq!(live, thawed, "{command:?}");
        }
    }

    /// Every command the deriver calls illegal must produce no events.
    #[test]
    fn test_derived_illegal_commands_produce_no_events() {
        let positions = [
            DuelScript::new()
                .board(Seat::Host, "hall-monitor")
                .board_defense(Seat::Host, "class-clown", false)
                .hand(Seat::Host, "varsity-captain")
                .hand(Seat::Host, "detention-slip")
                .hand(Seat::Host, "sugar-rush")
                .set(Seat::Host, "hall-pass")
                .board(Seat::Away, "lunch-lady")
                .set(Seat::Away, "fire-drill")
                .build(),
            DuelScript::new()
                .phase(Phase::Combat)
                .board(Seat::Host, "hall-monitor")
                .board(Seat::Host, "study-buddy")
                .board_defense(Seat::Away, "gossip-queen", false)
                .set(Seat::Away, "rumor-mill")
                .build(),
        ];
        let catalog = starter_catalog();
        for state in positions {
            for seat in Seat::ALL {
                let view = player_view(&state, &catalog, seat);
                for command in candidate_commands(&state) {
                    if !is_legal(&view, seat, &command) {
                        let transition = evolve(&state, seat, &command, &catalog);
                        assert!(
                            transition.events().is_empty(),
                            "{seat} {command:?} was derived illegal but applied"
                        );
                    }
                }
            }
        }
    }

    /// A broad sweep of commands over every card in the position.
    fn candidate_commands(state: &GameState) -> Vec<Command> {
        let ids: Vec<InstanceId> = state
            .instance_to_definition
            .keys()
            .filter(|id| {
                state
                    .locate(id)
                    .is_some_and(|(_, zone)| !matches!(zone, Zone::Deck | Zone::Graveyard))
            })
            .cloned()
            .collect();
        let mut commands = vec![
            Command::AdvancePhase,
            Command::EndTurn,
            Command::pass(),
            Command::Surrender,
        ];
        for id in &ids {
            commands.push(Command::Summon {
                card_id: id.clone(),
                tribute_card_ids: Vec::new(),
            });
            commands.push(Command::SetMonster {
                card_id: id.clone(),
                tribute_card_ids: Vec::new(),
            });
            commands.push(Command::FlipSummon {
                card_id: id.clone(),
            });
            commands.push(Command::ChangePosition {
                card_id: id.clone(),
            });
            commands.push(Command::SetSpellTrap {
                card_id: id.clone(),
            });
            commands.push(Command::DeclareAttack {
                attacker_card_id: id.clone(),
                target_card_id: None,
            });
            for tribute in &ids {
                commands.push(Command::Summon {
                    card_id: id.clone(),
                    tribute_card_ids: vec![tribute.clone()],
                });
                commands.push(Command::DeclareAttack {
                    attacker_card_id: id.clone(),
                    target_card_id: Some(tribute.clone()),
                });
            }
            let mut target_sets = vec![Vec::new()];
            target_sets.extend(ids.iter().map(|t| vec![t.clone()]));
            for targets in target_sets {
                commands.push(Command::ActivateSpell {
                    card_id: id.clone(),
                    effect_index: 0,
                    targets: targets.clone(),
                });
                commands.push(Command::ActivateTrap {
                    card_id: id.clone(),
                    effect_index: 0,
                    targets: targets.clone(),
                });
                commands.push(Command::ActivateEffect {
                    card_id: id.clone(),
                    effect_index: 0,
                    targets,
                });
            }
        }
        commands
    }
}
