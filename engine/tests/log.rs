use albedo_engine::session::{AttackLog, ExplosionLog};
use albedo_engine::{AttackResult, AttackRoll, LogItem, RangeBand, WoundState};
use insta::assert_snapshot;

fn hit() -> AttackLog {
    AttackLog {
        attacker: "Donut Steele".into(),
        defender: "Raider".into(),
        weapon: "PAKW 4-12".into(),
        range: RangeBand::Close,
        attack_roll: AttackRoll::Dice(vec![6]),
        defense_roll: vec![2, 5, 4],
        result: AttackResult::Hit,
        damage_roll: vec![15],
        total_damage: 30,
        new_status: WoundState::Crippled,
        injury: 3,
        awe: 4,
    }
}

#[test]
fn hit_narration() {
    assert_snapshot!(
        LogItem::Attack(hit()).to_string(),
        @"Donut Steele attacked Raider with PAKW 4-12, at Close range, rolling [6]=6 against [2, 5, 4]=5. The result was a Hit. The damage was [15]=30, and Raider is Crippled, taking 3 injuries and 4 awe."
    );
}

#[test]
fn glancing_hit_narration() {
    let item = AttackLog {
        damage_roll: vec![3],
        total_damage: 11,
        new_status: WoundState::Uninjured,
        injury: 0,
        awe: 2,
        ..hit()
    };
    assert_snapshot!(
        item.to_string(),
        @"Donut Steele attacked Raider with PAKW 4-12, at Close range, rolling [6]=6 against [2, 5, 4]=5. The result was a Hit. The damage was [3]=11, and Raider took 0 injuries and 2 awe."
    );
}

#[test]
fn miss_narration() {
    let item = AttackLog {
        attack_roll: AttackRoll::Dice(vec![3]),
        defense_roll: vec![5],
        result: AttackResult::Miss,
        damage_roll: vec![],
        total_damage: 0,
        new_status: WoundState::Uninjured,
        injury: 0,
        awe: 1,
        ..hit()
    };
    assert_snapshot!(
        item.to_string(),
        @"Donut Steele attacked Raider with PAKW 4-12, at Close range, rolling [3]=3 against [5]=5. The result was a Miss. Raider took 1 awe from being attacked."
    );
}

#[test]
fn rote_without_defense_narration() {
    let item = AttackLog {
        attack_roll: AttackRoll::Flat(6),
        defense_roll: vec![],
        range: RangeBand::Short,
        ..hit()
    };
    assert_snapshot!(
        item.to_string(),
        @"Donut Steele attacked Raider with PAKW 4-12, at Short range, with a rote of 6 unopposed. The result was a Hit. The damage was [15]=30, and Raider is Crippled, taking 3 injuries and 4 awe."
    );
}

#[test]
fn explosion_narration() {
    let item = LogItem::Explosion(ExplosionLog {
        defender: "Raider".into(),
        damage_roll: vec![12, 4],
        total_damage: 22,
        new_status: WoundState::Wounded,
        injury: 1,
        awe: 3,
    });
    assert_snapshot!(
        item.to_string(),
        @"Raider was caught in an explosion. The damage was [12, 4]=22, and Raider is Wounded, taking 1 injuries and 3 awe."
    );
}

#[test]
fn log_items_are_tagged_by_type() {
    let json = serde_json::to_value(LogItem::Attack(hit())).expect("json");
    assert_eq!(json["type"], "attack");
    assert_eq!(json["newStatus"], "Crippled");
    assert_eq!(json["range"], "C");
}
