use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::records::{Character, Position, Weapon};
use crate::types::{Action, AttackMode, Cover, RangeBand, Skill};

/// Sides of a die in a pool.
pub type DieSize = u32;

/// Why an attack mode cannot be used at the attacker's marks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Unavailable {
    SkillTooLow,
    SkillTooHigh,
}

impl fmt::Display for Unavailable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Unavailable::SkillTooLow => "skill too low",
            Unavailable::SkillTooHigh => "skill too high",
        })
    }
}

/// What the attacker rolls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttackDice {
    /// Take this value without rolling.
    Flat(u32),
    Pool(Vec<DieSize>),
    /// The chosen mode is not allowed; the attack misses automatically.
    Unavailable(Unavailable),
}

/// What the defender rolls, or the outcome when no roll is needed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DefenseDice {
    Pool(Vec<DieSize>),
    Hit,
    Miss,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackSetup {
    pub distance: u32,
    pub range: RangeBand,
    pub attack_dice: AttackDice,
    pub defense_dice: DefenseDice,
}

/// Distance between two map positions, rounded up to whole units.
pub fn distance_between(a: Position, b: Position) -> u32 {
    let d = a.distance_to(b).ceil();
    if d.is_finite() && d > 0.0 {
        d.min(u32::MAX as f64) as u32
    } else {
        0
    }
}

/// First band whose maximum reaches `distance`; `Over` when none does.
pub fn range_band(weapon: &Weapon, distance: u32) -> RangeBand {
    RangeBand::WEAPON_BANDS
        .into_iter()
        .find(|band| {
            weapon
                .ranges
                .get(band)
                .is_some_and(|&max| max > 0 && distance <= max)
        })
        .unwrap_or(RangeBand::Over)
}

/// Die size granted by a number of marks: d4 at one mark, up to d12.
pub fn marks_to_dice(marks: u32) -> DieSize {
    if marks < 1 {
        return 0;
    }
    (2 * (1 + marks)).min(12)
}

pub fn attack_dice(attacker: &Character) -> AttackDice {
    let marks = attacker.weapon_marks();
    match attacker.record.mode {
        AttackMode::Rote => AttackDice::Flat(marks + 1),
        AttackMode::Roll if marks == 0 => AttackDice::Unavailable(Unavailable::SkillTooLow),
        AttackMode::Roll => AttackDice::Pool(vec![marks_to_dice(marks)]),
        AttackMode::Push if marks == 0 => AttackDice::Unavailable(Unavailable::SkillTooLow),
        AttackMode::Push => {
            let d = marks_to_dice(marks);
            AttackDice::Pool(vec![d, d])
        }
        AttackMode::Risk if marks >= 5 => AttackDice::Unavailable(Unavailable::SkillTooHigh),
        AttackMode::Risk => AttackDice::Pool(vec![marks_to_dice(marks + 1)]),
        AttackMode::Breeze if marks <= 2 => AttackDice::Unavailable(Unavailable::SkillTooLow),
        AttackMode::Breeze => {
            let d = marks_to_dice(marks / 2);
            AttackDice::Pool(vec![d, d])
        }
    }
}

/// Melee exchange: a melee weapon used at close range.
fn is_melee(attacker: &Character, range: RangeBand) -> bool {
    attacker.weapon.action == Action::Melee && range == RangeBand::Close
}

pub fn defense_dice(
    attacker: &Character,
    defender: &Character,
    range: RangeBand,
    attack: &AttackDice,
) -> DefenseDice {
    if matches!(attack, AttackDice::Unavailable(_)) || range == RangeBand::Over {
        return DefenseDice::Miss;
    }

    let melee = is_melee(attacker, range);
    let def = &defender.record;

    let mut cover = if def.conditions.hiding {
        def.max_cover
    } else if melee {
        if defender.weapon.skill == Skill::Melee {
            Cover::Quarter
        } else {
            Cover::None
        }
    } else {
        def.max_cover.min(defender.weapon.skill.max_cover())
    };

    let mut concealment = if melee {
        def.concealment
    } else {
        cover.max(def.concealment)
    };

    let mut range = range;
    if attacker.record.conditions.aiming
        && attacker.weapon.action != Action::Melee
        && concealment < Cover::Total
    {
        cover = cover.reduced();
        concealment = concealment.reduced();
        range = range.nearer();
    }

    let (Some(range_die), Some(cover_dice)) = (range.die(), cover.cover_dice()) else {
        debug!(?range, ?cover, "no defense roll possible, attack misses");
        return DefenseDice::Miss;
    };

    let mut pool = vec![range_die];
    pool.extend(cover_dice);
    pool.extend(concealment.concealment_dice());

    if let AttackDice::Flat(value) = attack {
        if pool.iter().all(|&d| d < *value) {
            debug!(value, ?pool, "rote beats every defense die");
            return DefenseDice::Hit;
        }
    }
    DefenseDice::Pool(pool)
}

/// Range, attacker pool and defender pool for one attack. `distance`
/// overrides the map distance when given.
pub fn attack_setup(
    attacker: &Character,
    defender: &Character,
    distance: Option<u32>,
) -> AttackSetup {
    let distance = distance.unwrap_or_else(|| {
        distance_between(attacker.record.position, defender.record.position)
    });
    let range = range_band(&attacker.weapon, distance);
    let attack_dice = attack_dice(attacker);
    let defense_dice = defense_dice(attacker, defender, range, &attack_dice);
    debug!(
        attacker = attacker.name(),
        defender = defender.name(),
        distance,
        ?range,
        ?attack_dice,
        ?defense_dice,
        "attack setup"
    );
    AttackSetup {
        distance,
        range,
        attack_dice,
        defense_dice,
    }
}
