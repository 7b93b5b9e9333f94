use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::records::{Armor, Character};
use crate::types::{AttackResult, RangeBand, WoundState};

/// Flat damage and per-penetrating-die bonus of whatever dealt the damage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DamageSource {
    pub base_damage: u32,
    pub pen_damage: u32,
}

impl DamageSource {
    /// Close-combat weapons penetrate with the wielder's remaining body
    /// instead of the weapon's own penetration value.
    pub fn from_attacker(attacker: &Character) -> Self {
        let pen_damage = if attacker.weapon.skill.is_close_combat() {
            attacker.record.remaining_body()
        } else {
            attacker.weapon.pen_damage.unwrap_or(0)
        };
        Self {
            base_damage: attacker.weapon.base_damage,
            pen_damage,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DamageResolution {
    pub damage_roll: Vec<u32>,
    pub total_damage: u32,
    pub new_status: WoundState,
    pub awe: u32,
    pub injury: u32,
}

/// Base damage plus the best die, plus penetration for every die that
/// beats the armor's deflection. No dice means no damage.
pub fn total_damage(source: DamageSource, armor: &Armor, damage_roll: &[u32]) -> u32 {
    let Some(best) = damage_roll.iter().copied().max() else {
        return 0;
    };
    let penetrating = damage_roll.iter().filter(|&&r| r > armor.deflection).count() as u32;
    source.base_damage + best + penetrating * source.pen_damage
}

/// Damage at which the defender becomes Wounded, Crippled, Incapacitated
/// and Devastated respectively.
pub fn thresholds(defender: &Character) -> [u32; 4] {
    let gifts = defender.record.gifts;
    let toughness = if gifts.very_tough {
        10
    } else if gifts.tough {
        5
    } else {
        0
    };
    let t1 = defender.armor.threshold + 2 * defender.record.remaining_body() + toughness;
    [t1, t1 + 10, t1 + 20, t1 + 40]
}

pub fn wound_state_for(defender: &Character, total_damage: u32) -> WoundState {
    thresholds(defender)
        .iter()
        .position(|&breakpoint| total_damage < breakpoint)
        .and_then(WoundState::from_ordinal)
        .unwrap_or(WoundState::Devastated)
}

pub fn awe(
    defender: &Character,
    range: RangeBand,
    result: AttackResult,
    new_status: WoundState,
) -> u32 {
    let conditions = defender.record.conditions;
    let mut total = 0;
    if conditions.surprised || conditions.helpless {
        total += 1;
    }
    if range == RangeBand::Close {
        total += 1;
    }
    if result.lands() {
        total += 1;
    }
    total + (new_status.ordinal() as u32).min(3)
}

pub fn injury(defender: &Character, new_status: WoundState) -> u32 {
    match new_status {
        WoundState::Uninjured => 0,
        WoundState::Wounded => 1,
        WoundState::Crippled => 3,
        WoundState::Incapacitated => 5,
        WoundState::Devastated => defender.record.body,
    }
}

pub fn damage_resolve(
    source: DamageSource,
    defender: &Character,
    range: RangeBand,
    result: AttackResult,
    damage_roll: Vec<u32>,
) -> DamageResolution {
    let total_damage = total_damage(source, &defender.armor, &damage_roll);
    let new_status = wound_state_for(defender, total_damage);
    let awe = awe(defender, range, result, new_status);
    let injury = injury(defender, new_status);
    debug!(
        defender = defender.name(),
        ?damage_roll,
        total_damage,
        ?new_status,
        awe,
        injury,
        "damage resolved"
    );
    DamageResolution {
        damage_roll,
        total_damage,
        new_status,
        awe,
        injury,
    }
}
