use std::collections::BTreeMap;

use albedo_engine::combat::damage::{awe, injury, thresholds, total_damage, wound_state_for};
use albedo_engine::{
    damage_resolve, Action, Armor, AttackResult, Character, CharacterRecord, DamageSource,
    RangeBand, Skill, Weapon, WoundState,
};

fn battle_armor() -> Armor {
    Armor {
        name: "Battle Armor, Full Dress".into(),
        deflection: 11,
        threshold: 5,
    }
}

fn weapon(skill: Skill, action: Action) -> Weapon {
    Weapon {
        name: "Test".into(),
        skill,
        action,
        ranges: BTreeMap::from([(RangeBand::Close, 5)]),
        base_damage: 4,
        pen_damage: Some(9),
        shotgun: false,
        explosion: None,
    }
}

fn defender(armor: Armor) -> Character {
    let record = CharacterRecord {
        name: "Raider".into(),
        ..CharacterRecord::default()
    };
    Character::new(record, weapon(Skill::Longarm, Action::Single), armor)
}

#[test]
fn scenario_one_die_penetrates() {
    let source = DamageSource {
        base_damage: 10,
        pen_damage: 5,
    };
    assert_eq!(total_damage(source, &battle_armor(), &[15, 3]), 30);
}

#[test]
fn no_dice_no_damage() {
    let source = DamageSource {
        base_damage: 10,
        pen_damage: 5,
    };
    assert_eq!(total_damage(source, &battle_armor(), &[]), 0);
}

#[test]
fn dice_equal_to_deflection_do_not_penetrate() {
    let source = DamageSource {
        base_damage: 0,
        pen_damage: 10,
    };
    assert_eq!(total_damage(source, &battle_armor(), &[11, 12]), 22);
}

#[test]
fn thresholds_scale_with_body_and_armor() {
    let mut d = defender(battle_armor());
    assert_eq!(thresholds(&d), [19, 29, 39, 59]);

    d.record.injury = 2;
    assert_eq!(thresholds(&d), [15, 25, 35, 55]);

    d.record.gifts.tough = true;
    assert_eq!(thresholds(&d)[0], 20);
    d.record.gifts.very_tough = true;
    assert_eq!(thresholds(&d)[0], 25);
}

#[test]
fn wound_state_breakpoints() {
    let d = defender(battle_armor());
    assert_eq!(wound_state_for(&d, 0), WoundState::Uninjured);
    assert_eq!(wound_state_for(&d, 18), WoundState::Uninjured);
    assert_eq!(wound_state_for(&d, 19), WoundState::Wounded);
    assert_eq!(wound_state_for(&d, 29), WoundState::Crippled);
    assert_eq!(wound_state_for(&d, 58), WoundState::Incapacitated);
    assert_eq!(wound_state_for(&d, 59), WoundState::Devastated);
    assert_eq!(wound_state_for(&d, 500), WoundState::Devastated);
}

#[test]
fn awe_adds_up() {
    let mut d = defender(battle_armor());
    assert_eq!(
        awe(&d, RangeBand::Long, AttackResult::Miss, WoundState::Uninjured),
        0
    );
    assert_eq!(
        awe(&d, RangeBand::Close, AttackResult::Hit, WoundState::Wounded),
        3
    );
    d.record.conditions.surprised = true;
    d.record.conditions.helpless = true;
    assert_eq!(
        awe(&d, RangeBand::Close, AttackResult::Crit, WoundState::Devastated),
        6
    );
}

#[test]
fn injury_by_wound_state() {
    let d = defender(battle_armor());
    assert_eq!(injury(&d, WoundState::Uninjured), 0);
    assert_eq!(injury(&d, WoundState::Wounded), 1);
    assert_eq!(injury(&d, WoundState::Crippled), 3);
    assert_eq!(injury(&d, WoundState::Incapacitated), 5);
    assert_eq!(injury(&d, WoundState::Devastated), 7);
}

#[test]
fn close_combat_penetrates_with_remaining_body() {
    let mut record = CharacterRecord {
        name: "Boxer".into(),
        injury: 2,
        ..CharacterRecord::default()
    };
    record.marks.insert(Skill::Brawl, 2);
    let boxer = Character::new(record.clone(), weapon(Skill::Brawl, Action::Melee), battle_armor());
    assert_eq!(
        DamageSource::from_attacker(&boxer),
        DamageSource {
            base_damage: 4,
            pen_damage: 5
        }
    );

    let gunner = Character::new(record, weapon(Skill::Pistol, Action::Semi), battle_armor());
    assert_eq!(DamageSource::from_attacker(&gunner).pen_damage, 9);
}

#[test]
fn full_damage_stage() {
    let d = defender(Armor {
        name: "Concealed Armor".into(),
        deflection: 11,
        threshold: 0,
    });
    let source = DamageSource {
        base_damage: 10,
        pen_damage: 5,
    };
    let r = damage_resolve(source, &d, RangeBand::Close, AttackResult::Hit, vec![15, 3]);
    assert_eq!(r.total_damage, 30);
    // Breakpoints 14/24/34/54.
    assert_eq!(r.new_status, WoundState::Crippled);
    assert_eq!(r.injury, 3);
    assert_eq!(r.awe, 4);
    assert_eq!(r.damage_roll, vec![15, 3]);
}
