use std::collections::BTreeMap;

use albedo_engine::{
    attack_setup, blast_dice, blast_targets, plan_blast, resolve_blast, Action, Armor, AttackResult,
    AttackRoll, CalcError, Character, CharacterRecord, Cover, ExplosionSetup, Position, RangeBand,
    Skill, Trajectory, Weapon, WoundState,
};

fn grenade() -> Weapon {
    Weapon {
        name: "Grenade".into(),
        skill: Skill::Throw,
        action: Action::Single,
        ranges: BTreeMap::from([(RangeBand::Close, 5), (RangeBand::Short, 15)]),
        base_damage: 0,
        pen_damage: Some(10),
        shotgun: false,
        explosion: Some(3),
    }
}

fn launcher() -> Weapon {
    Weapon {
        name: "GAKW".into(),
        skill: Skill::Heavy,
        action: Action::Semi,
        ranges: BTreeMap::from([(RangeBand::Close, 10), (RangeBand::Short, 30)]),
        base_damage: 0,
        pen_damage: Some(10),
        shotgun: false,
        explosion: Some(5),
    }
}

fn sidearm() -> Weapon {
    Weapon {
        name: "Pistol".into(),
        skill: Skill::Pistol,
        action: Action::Semi,
        ranges: BTreeMap::from([(RangeBand::Close, 5)]),
        base_damage: 8,
        pen_damage: Some(7),
        shotgun: false,
        explosion: None,
    }
}

fn at(name: &str, weapon: Weapon, x: f64, y: f64) -> Character {
    let mut record = CharacterRecord {
        name: name.into(),
        max_cover: Cover::None,
        position: Position::new(x, y),
        ..CharacterRecord::default()
    };
    record.marks.insert(weapon.skill, 3);
    let armor = Armor {
        name: "None".into(),
        deflection: 3,
        threshold: 0,
    };
    Character::new(record, weapon, armor)
}

fn close(a: Position, b: Position) -> bool {
    a.distance_to(b) < 1e-9
}

#[test]
fn scenario_blast_falloff() {
    let r = 10;
    assert_eq!(blast_dice(2.0, r), 6);
    assert_eq!(blast_dice(12.0, r), 4);
    assert_eq!(blast_dice(35.0, r), 2);
    assert_eq!(blast_dice(50.0, r), 0);

    let setup = ExplosionSetup {
        center: Position::new(0.0, 0.0),
        radius: r,
        base_damage: 0,
        pen_damage: 10,
    };
    let targets = blast_targets(
        &setup,
        [2.0, 12.0, 35.0, 50.0].map(|x| Position::new(x, 0.0)),
    );
    let found: Vec<(usize, u32)> = targets.iter().map(|t| (t.index, t.dice)).collect();
    assert_eq!(found, vec![(0, 6), (1, 4), (2, 2)]);
}

#[test]
fn centre_bonus_stops_at_half_radius() {
    assert_eq!(blast_dice(0.0, 4), 6);
    assert_eq!(blast_dice(1.9, 4), 6);
    assert_eq!(blast_dice(2.0, 4), 5);
    assert_eq!(blast_dice(3.9, 4), 5);
}

#[test]
fn zero_radius_hits_nobody() {
    assert_eq!(blast_dice(0.0, 0), 0);
}

#[test]
fn thrown_hit_lands_on_target() {
    let thrower = at("Thrower", grenade(), 0.0, 0.0);
    let target = at("Target", sidearm(), 10.0, 0.0);
    let setup = attack_setup(&thrower, &target, None);
    let plan = plan_blast(&thrower, &target, &setup, &AttackRoll::Dice(vec![7]), &[5], None)
        .expect("planned");

    assert_eq!(plan.trajectory, Trajectory::Thrown);
    assert_eq!(plan.result, AttackResult::Hit);
    assert!(close(plan.explosion.center, Position::new(10.0, 0.0)));
    assert_eq!(plan.explosion.radius, 3);
    assert_eq!(plan.explosion.pen_damage, 10);
    assert_eq!(plan.deviation, 0.0);
}

#[test]
fn thrown_miss_falls_short_by_margin() {
    let thrower = at("Thrower", grenade(), 0.0, 0.0);
    let target = at("Target", sidearm(), 10.0, 0.0);
    let setup = attack_setup(&thrower, &target, None);
    let plan = plan_blast(&thrower, &target, &setup, &AttackRoll::Dice(vec![3]), &[5], None)
        .expect("planned");

    assert_eq!(plan.result, AttackResult::Miss);
    assert!(close(plan.explosion.center, Position::new(7.0, 0.0)));
    assert!((plan.deviation - 3.0).abs() < 1e-9);
}

#[test]
fn automatic_miss_falls_short_by_range_die() {
    let thrower = at("Thrower", grenade(), 0.0, 0.0);
    let mut target = at("Target", sidearm(), 10.0, 0.0);
    target.record.conditions.hiding = true;
    target.record.max_cover = Cover::Total;
    let setup = attack_setup(&thrower, &target, None);
    let plan = plan_blast(&thrower, &target, &setup, &AttackRoll::Dice(vec![8]), &[], None)
        .expect("planned");

    assert_eq!(plan.result, AttackResult::Miss);
    // Short range d6.
    assert!(close(plan.explosion.center, Position::new(4.0, 0.0)));
}

#[test]
fn fixed_trajectory_miss_scatters_by_clock() {
    let gunner = at("Gunner", launcher(), 0.0, 0.0);
    let target = at("Target", sidearm(), 20.0, 0.0);
    let setup = attack_setup(&gunner, &target, None);
    assert_eq!(setup.range, RangeBand::Short);
    let miss = AttackRoll::Dice(vec![2]);

    // Margin 3, Short range doubles it.
    let long = plan_blast(&gunner, &target, &setup, &miss, &[4], Some(12)).expect("planned");
    assert_eq!(long.trajectory, Trajectory::Fixed);
    assert!(close(long.explosion.center, Position::new(26.0, 0.0)));

    let short = plan_blast(&gunner, &target, &setup, &miss, &[4], Some(6)).expect("planned");
    assert!(close(short.explosion.center, Position::new(14.0, 0.0)));
    assert!((short.deviation - 6.0).abs() < 1e-9);
}

#[test]
fn fixed_trajectory_miss_needs_a_clock_roll() {
    let gunner = at("Gunner", launcher(), 0.0, 0.0);
    let target = at("Target", sidearm(), 20.0, 0.0);
    let setup = attack_setup(&gunner, &target, None);
    let miss = AttackRoll::Dice(vec![2]);

    assert_eq!(
        plan_blast(&gunner, &target, &setup, &miss, &[4], None),
        Err(CalcError::MissingDeviation(None))
    );
    assert_eq!(
        plan_blast(&gunner, &target, &setup, &miss, &[4], Some(13)),
        Err(CalcError::MissingDeviation(Some(13)))
    );

    let hit = plan_blast(&gunner, &target, &setup, &AttackRoll::Dice(vec![6]), &[4], None)
        .expect("hit needs no clock");
    assert!(close(hit.explosion.center, Position::new(20.0, 0.0)));
}

#[test]
fn out_of_range_is_not_fired() {
    let gunner = at("Gunner", launcher(), 0.0, 0.0);
    let target = at("Target", sidearm(), 100.0, 0.0);
    let setup = attack_setup(&gunner, &target, None);
    assert!(matches!(
        plan_blast(&gunner, &target, &setup, &AttackRoll::Dice(vec![8]), &[], None),
        Err(CalcError::NotFired(_))
    ));
}

fn bystanders() -> Vec<Character> {
    [2.0, 12.0, 35.0, 50.0]
        .into_iter()
        .enumerate()
        .map(|(i, x)| at(&format!("Bystander {}", i), sidearm(), x, 0.0))
        .collect()
}

fn blast() -> ExplosionSetup {
    ExplosionSetup {
        center: Position::new(0.0, 0.0),
        radius: 10,
        base_damage: 0,
        pen_damage: 10,
    }
}

#[test]
fn blast_needs_rolls_for_everyone_inside() {
    let rolls = vec![vec![20; 6], vec![], vec![1, 1]];
    assert_eq!(
        resolve_blast(&blast(), &bystanders(), &rolls),
        Err(CalcError::MissingRolls {
            what: "blast damage roll",
            needed: 4,
            got: 0
        })
    );
}

#[test]
fn blast_resolves_each_character() {
    let rolls = vec![vec![20; 6], vec![2, 2, 2, 2], vec![1, 1], vec![]];
    let outcomes = resolve_blast(&blast(), &bystanders(), &rolls).expect("resolved");
    assert_eq!(outcomes.len(), 3);

    let centre = &outcomes[0];
    assert_eq!((centre.index, centre.dice), (0, 6));
    assert_eq!(centre.damage.total_damage, 80);
    assert_eq!(centre.damage.new_status, WoundState::Devastated);
    // Close + hit + devastated.
    assert_eq!(centre.damage.awe, 5);

    let edge = &outcomes[2];
    assert_eq!((edge.index, edge.dice), (2, 2));
    assert_eq!(edge.damage.total_damage, 1);
    assert_eq!(edge.damage.new_status, WoundState::Uninjured);
    assert_eq!(edge.damage.awe, 1);
}
