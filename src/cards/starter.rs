//! Built-in starter set used by the CLI and by tests that need a full deck.

use super::{
    CardCatalog, CardDefinition, CardDefinitionBuilder, EffectAction, EffectSpeed,
    ModifierExpiry, Restriction, SpellType, TargetRule, TrapType,
};
use crate::ids::DefinitionId;

/// Hall Monitor - level 4, 1500/1000.
pub fn hall_monitor() -> CardDefinition {
    CardDefinitionBuilder::monster("hall-monitor", "Hall Monitor", 4, 1500, 1000).build()
}

/// Lunch Lady - level 4, 1800/1200.
pub fn lunch_lady() -> CardDefinition {
    CardDefinitionBuilder::monster("lunch-lady", "Lunch Lady", 4, 1800, 1200).build()
}

/// Class Clown - level 3, 1000/1800.
pub fn class_clown() -> CardDefinition {
    CardDefinitionBuilder::monster("class-clown", "Class Clown", 3, 1000, 1800).build()
}

/// Study Buddy - level 2, 800/2000. Quick: gain 500 life.
pub fn study_buddy() -> CardDefinition {
    CardDefinitionBuilder::monster("study-buddy", "Study Buddy", 2, 800, 2000)
        .effect(
            "Pep Talk",
            EffectSpeed::Quick,
            TargetRule::None,
            vec![EffectAction::Heal { amount: 500 }],
        )
        .build()
}

/// Gossip Queen - level 4, 1400/1100. Ignition: put 1 vice counter on an opponent's monster.
pub fn gossip_queen() -> CardDefinition {
    CardDefinitionBuilder::monster("gossip-queen", "Gossip Queen", 4, 1400, 1100)
        .effect(
            "Spread Rumors",
            EffectSpeed::Ignition,
            TargetRule::OpponentMonster,
            vec![EffectAction::AddVice { amount: 1 }],
        )
        .build()
}

/// Varsity Captain - level 7, 2500/2000.
pub fn varsity_captain() -> CardDefinition {
    CardDefinitionBuilder::monster("varsity-captain", "Varsity Captain", 7, 2500, 2000).build()
}

/// Principal Titan - level 8, 3000/2500.
pub fn principal_titan() -> CardDefinition {
    CardDefinitionBuilder::monster("principal-titan", "Principal Titan", 8, 3000, 2500).build()
}

/// Detention Slip - normal spell: destroy an opponent's monster.
pub fn detention_slip() -> CardDefinition {
    CardDefinitionBuilder::spell("detention-slip", "Detention Slip", SpellType::Normal)
        .effect(
            "Detain",
            EffectSpeed::Ignition,
            TargetRule::OpponentMonster,
            vec![EffectAction::DestroyTarget],
        )
        .build()
}

/// Sugar Rush - quick-play spell: one of your monsters gains 500 attack until end of turn.
pub fn sugar_rush() -> CardDefinition {
    CardDefinitionBuilder::spell("sugar-rush", "Sugar Rush", SpellType::QuickPlay)
        .effect(
            "Rush",
            EffectSpeed::Quick,
            TargetRule::OwnMonster,
            vec![EffectAction::Boost {
                attack: 500,
                defense: 0,
                expiry: ModifierExpiry::EndOfTurn,
            }],
        )
        .build()
}

/// Pop Quiz - normal spell: 500 damage.
pub fn pop_quiz() -> CardDefinition {
    CardDefinitionBuilder::spell("pop-quiz", "Pop Quiz", SpellType::Normal)
        .effect(
            "Surprise",
            EffectSpeed::Ignition,
            TargetRule::None,
            vec![EffectAction::Damage { amount: 500 }],
        )
        .build()
}

/// Snack Stash - normal spell: draw 2.
pub fn snack_stash() -> CardDefinition {
    CardDefinitionBuilder::spell("snack-stash", "Snack Stash", SpellType::Normal)
        .effect(
            "Snack",
            EffectSpeed::Ignition,
            TargetRule::None,
            vec![EffectAction::Draw { count: 2 }],
        )
        .build()
}

/// Lost Homework - normal spell: opponent discards 1 card at random.
pub fn lost_homework() -> CardDefinition {
    CardDefinitionBuilder::spell("lost-homework", "Lost Homework", SpellType::Normal)
        .effect(
            "Dog Ate It",
            EffectSpeed::Ignition,
            TargetRule::None,
            vec![EffectAction::DiscardRandom { count: 1 }],
        )
        .build()
}

/// Double Dare - normal spell: coin toss for 1000 damage.
pub fn double_dare() -> CardDefinition {
    CardDefinitionBuilder::spell("double-dare", "Double Dare", SpellType::Normal)
        .effect(
            "Flip",
            EffectSpeed::Ignition,
            TargetRule::None,
            vec![EffectAction::CoinToss { amount: 1000 }],
        )
        .build()
}

/// Senior Privilege - normal spell: tribute summons need no tribute this turn.
pub fn senior_privilege() -> CardDefinition {
    CardDefinitionBuilder::spell("senior-privilege", "Senior Privilege", SpellType::Normal)
        .effect(
            "Cut the Line",
            EffectSpeed::Ignition,
            TargetRule::None,
            vec![EffectAction::TributeDiscount { turns: 0 }],
        )
        .build()
}

/// Cafeteria - field spell: your monsters gain 200 attack.
pub fn cafeteria() -> CardDefinition {
    CardDefinitionBuilder::spell("cafeteria", "Cafeteria", SpellType::Field)
        .field_attack_bonus(200)
        .build()
}

/// Peer Pressure - continuous spell: put 1 vice counter on any monster.
pub fn peer_pressure() -> CardDefinition {
    CardDefinitionBuilder::spell("peer-pressure", "Peer Pressure", SpellType::Continuous)
        .effect(
            "Pressure",
            EffectSpeed::Ignition,
            TargetRule::AnyMonster,
            vec![EffectAction::AddVice { amount: 1 }],
        )
        .build()
}

/// Hall Pass - normal trap: return an opponent's monster to the hand.
pub fn hall_pass() -> CardDefinition {
    CardDefinitionBuilder::trap("hall-pass", "Hall Pass", TrapType::Normal)
        .effect(
            "Excused",
            EffectSpeed::Quick,
            TargetRule::OpponentMonster,
            vec![EffectAction::ReturnTargetToHand],
        )
        .build()
}

/// Fire Drill - normal trap: the opponent cannot attack until the end of their next turn.
pub fn fire_drill() -> CardDefinition {
    CardDefinitionBuilder::trap("fire-drill", "Fire Drill", TrapType::Normal)
        .effect(
            "Evacuate",
            EffectSpeed::Quick,
            TargetRule::None,
            vec![EffectAction::RestrictOpponent {
                restriction: Restriction::CannotAttack,
                turns: 1,
            }],
        )
        .build()
}

/// Rumor Mill - continuous trap: put 2 vice counters on an opponent's monster.
pub fn rumor_mill() -> CardDefinition {
    CardDefinitionBuilder::trap("rumor-mill", "Rumor Mill", TrapType::Continuous)
        .effect(
            "Whisper",
            EffectSpeed::Quick,
            TargetRule::OpponentMonster,
            vec![EffectAction::AddVice { amount: 2 }],
        )
        .build()
}

pub fn starter_cards() -> Vec<CardDefinition> {
    vec![
        hall_monitor(),
        lunch_lady(),
        class_clown(),
        study_buddy(),
        gossip_queen(),
        varsity_captain(),
        principal_titan(),
        detention_slip(),
        sugar_rush(),
        pop_quiz(),
        snack_stash(),
        lost_homework(),
        double_dare(),
        senior_privilege(),
        cafeteria(),
        peer_pressure(),
        hall_pass(),
        fire_drill(),
        rumor_mill(),
    ]
}

pub fn starter_catalog() -> CardCatalog {
    CardCatalog::from_cards(starter_cards())
}

/// A 40-card deck built from the starter set.
pub fn starter_deck() -> Vec<DefinitionId> {
    let counts: [(&str, usize); 19] = [
        ("hall-monitor", 3),
        ("lunch-lady", 3),
        ("class-clown", 3),
        ("study-buddy", 2),
        ("gossip-queen", 3),
        ("varsity-captain", 2),
        ("principal-titan", 1),
        ("detention-slip", 2),
        ("sugar-rush", 3),
        ("pop-quiz", 3),
        ("snack-stash", 2),
        ("lost-homework", 1),
        ("double-dare", 2),
        ("senior-privilege", 1),
        ("cafeteria", 1),
        ("peer-pressure", 2),
        ("hall-pass", 2),
        ("fire-drill", 2),
        ("rumor-mill", 2),
    ];
    counts
        .iter()
        .flat_map(|(id, n)| std::iter::repeat_n(DefinitionId::new(*id), *n))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starter_deck_resolves_in_catalog() {
        let catalog = starter_catalog();
        let deck = starter_deck();
        assert_eq!(deck.len(), 40);
        assert!(deck.iter().all(|id| catalog.contains(id)));
    }

    #[test]
    fn starter_catalog_has_unique_ids() {
        assert_eq!(starter_catalog().len(), starter_cards().len());
    }
}
