//! Card definitions and the read-only catalog the engine looks them up in.
//!
//! Definitions are immutable and keyed by an opaque [`DefinitionId`]. The
//! engine never mutates them; per-copy state lives on board instances.

pub mod source;
pub mod starter;

pub use source::{CachedCatalog, CardSource, CatalogError, JsonFileSource, StaticSource};

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::ids::DefinitionId;

/// A printed card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardDefinition {
    pub id: DefinitionId,
    pub name: String,
    pub kind: CardKind,
    #[serde(default)]
    pub effects: Vec<CardEffect>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "cardType", rename_all = "snake_case")]
pub enum CardKind {
    Monster {
        level: u8,
        attack: i32,
        defense: i32,
    },
    Spell {
        #[serde(rename = "spellType")]
        spell_type: SpellType,
        /// Attack granted to the controller's face-up monsters while in the field slot.
        #[serde(default, rename = "fieldAttackBonus")]
        field_attack_bonus: i32,
    },
    Trap {
        #[serde(rename = "trapType")]
        trap_type: TrapType,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpellType {
    Normal,
    QuickPlay,
    Continuous,
    Field,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrapType {
    Normal,
    Continuous,
}

/// When a monster effect may be activated. Spells and traps take their speed from their type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectSpeed {
    /// Controller's main phase, empty chain.
    #[default]
    Ignition,
    /// Also usable as a chain response.
    Quick,
}

/// What an effect must target when activated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetRule {
    #[default]
    None,
    OpponentMonster,
    OwnMonster,
    AnyMonster,
    AnyBackrow,
}

impl TargetRule {
    pub fn requires_target(self) -> bool {
        !matches!(self, TargetRule::None)
    }
}

/// How long a stat modifier lasts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModifierExpiry {
    EndOfTurn,
    EndOfNextTurn,
    Permanent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Restriction {
    CannotAttack,
    CannotActivateSpells,
}

/// One step of an effect's resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum EffectAction {
    /// Damage to the activator's opponent.
    Damage { amount: i32 },
    /// Life to the activator.
    Heal { amount: i32 },
    Draw { count: u32 },
    DestroyTarget,
    BanishTarget,
    ReturnTargetToHand,
    /// Stat change on the target, or on all of the activator's face-up monsters when untargeted.
    Boost {
        attack: i32,
        defense: i32,
        expiry: ModifierExpiry,
    },
    AddVice { amount: u32 },
    RestrictOpponent {
        restriction: Restriction,
        turns: u32,
    },
    /// The activator's tribute summons need no tribute for `turns` turns.
    TributeDiscount { turns: u32 },
    DiscardRandom { count: u32 },
    /// Heads: `amount` damage to the opponent. Tails: `amount` damage to the activator.
    CoinToss { amount: i32 },
}

impl EffectAction {
    pub fn uses_target(&self) -> bool {
        matches!(
            self,
            EffectAction::DestroyTarget
                | EffectAction::BanishTarget
                | EffectAction::ReturnTargetToHand
                | EffectAction::AddVice { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardEffect {
    pub name: String,
    #[serde(default)]
    pub speed: EffectSpeed,
    #[serde(default)]
    pub target: TargetRule,
    pub actions: Vec<EffectAction>,
}

impl CardDefinition {
    pub fn is_monster(&self) -> bool {
        matches!(self.kind, CardKind::Monster { .. })
    }

    pub fn is_spell(&self) -> bool {
        matches!(self.kind, CardKind::Spell { .. })
    }

    pub fn is_trap(&self) -> bool {
        matches!(self.kind, CardKind::Trap { .. })
    }

    pub fn level(&self) -> Option<u8> {
        match self.kind {
            CardKind::Monster { level, .. } => Some(level),
            _ => None,
        }
    }

    pub fn base_attack(&self) -> i32 {
        match self.kind {
            CardKind::Monster { attack, .. } => attack,
            _ => 0,
        }
    }

    pub fn base_defense(&self) -> i32 {
        match self.kind {
            CardKind::Monster { defense, .. } => defense,
            _ => 0,
        }
    }

    pub fn spell_type(&self) -> Option<SpellType> {
        match self.kind {
            CardKind::Spell { spell_type, .. } => Some(spell_type),
            _ => None,
        }
    }

    pub fn trap_type(&self) -> Option<TrapType> {
        match self.kind {
            CardKind::Trap { trap_type } => Some(trap_type),
            _ => None,
        }
    }

    pub fn field_attack_bonus(&self) -> i32 {
        match self.kind {
            CardKind::Spell {
                spell_type: SpellType::Field,
                field_attack_bonus,
            } => field_attack_bonus,
            _ => 0,
        }
    }

    pub fn effect(&self, index: usize) -> Option<&CardEffect> {
        self.effects.get(index)
    }
}

/// Fluent builder for card definitions.
#[derive(Debug, Clone)]
pub struct CardDefinitionBuilder {
    id: DefinitionId,
    name: String,
    kind: CardKind,
    effects: Vec<CardEffect>,
}

impl CardDefinitionBuilder {
    pub fn monster(id: &str, name: &str, level: u8, attack: i32, defense: i32) -> Self {
        Self {
            id: DefinitionId::new(id),
            name: name.to_string(),
            kind: CardKind::Monster {
                level,
                attack,
                defense,
            },
            effects: Vec::new(),
        }
    }

    pub fn spell(id: &str, name: &str, spell_type: SpellType) -> Self {
        Self {
            id: DefinitionId::new(id),
            name: name.to_string(),
            kind: CardKind::Spell {
                spell_type,
                field_attack_bonus: 0,
            },
            effects: Vec::new(),
        }
    }

    pub fn trap(id: &str, name: &str, trap_type: TrapType) -> Self {
        Self {
            id: DefinitionId::new(id),
            name: name.to_string(),
            kind: CardKind::Trap { trap_type },
            effects: Vec::new(),
        }
    }

    /// Only meaningful for field spells.
    pub fn field_attack_bonus(mut self, bonus: i32) -> Self {
        if let CardKind::Spell {
            field_attack_bonus, ..
        } = &mut self.kind
        {
            *field_attack_bonus = bonus;
        }
        self
    }

    pub fn effect(
        mut self,
        name: &str,
        speed: EffectSpeed,
        target: TargetRule,
        actions: Vec<EffectAction>,
    ) -> Self {
        self.effects.push(CardEffect {
            name: name.to_string(),
            speed,
            target,
            actions,
        });
        self
    }

    pub fn build(self) -> CardDefinition {
        CardDefinition {
            id: self.id,
            name: self.name,
            kind: self.kind,
            effects: self.effects,
        }
    }
}

/// Immutable lookup table of card definitions.
#[derive(Debug, Clone, Default)]
pub struct CardCatalog {
    cards: HashMap<DefinitionId, CardDefinition>,
}

impl CardCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_cards(cards: impl IntoIterator<Item = CardDefinition>) -> Self {
        let mut catalog = Self::new();
        for card in cards {
            catalog.register(card);
        }
        catalog
    }

    /// Later registrations under the same id replace earlier ones.
    pub fn register(&mut self, card: CardDefinition) {
        self.cards.insert(card.id.clone(), card);
    }

    pub fn get(&self, id: &DefinitionId) -> Option<&CardDefinition> {
        self.cards.get(id)
    }

    pub fn contains(&self, id: &DefinitionId) -> bool {
        self.cards.contains_key(id)
    }

    pub fn all(&self) -> impl Iterator<Item = &CardDefinition> {
        self.cards.values()
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}
