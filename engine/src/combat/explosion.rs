//! Area weapons. An explosive attack does not resolve against a single
//! defender: the to-hit rolls only decide where the blast lands, then every
//! character near the blast takes damage dice by distance.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::{debug, trace};

use super::damage::{damage_resolve, DamageResolution, DamageSource};
use super::resolve::{attack_result, AttackRoll};
use super::setup::{AttackDice, AttackSetup, DefenseDice};
use super::{collect_rolls, DAMAGE_DIE};
use crate::coerce;
use crate::error::CalcError;
use crate::records::{Character, Position};
use crate::types::{AttackResult, RangeBand, Skill};

/// Blast dice at the centre before distance falloff.
const BLAST_DICE: i64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Trajectory {
    /// Lobbed by hand; limited by how far it can be thrown.
    Thrown,
    /// Fired on a fixed trajectory; misses scatter around the target.
    Fixed,
}

impl Trajectory {
    pub fn of(skill: Skill) -> Self {
        if skill == Skill::Throw {
            Trajectory::Thrown
        } else {
            Trajectory::Fixed
        }
    }
}

/// Where a blast is centred and what it deals. Callers may adjust this on
/// the map before resolving the blast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExplosionSetup {
    #[serde(
        serialize_with = "center_as_pair",
        deserialize_with = "center_from_any"
    )]
    pub center: Position,
    #[serde(deserialize_with = "coerce::u32_lenient")]
    pub radius: u32,
    #[serde(default, deserialize_with = "coerce::u32_lenient")]
    pub base_damage: u32,
    #[serde(deserialize_with = "coerce::u32_lenient")]
    pub pen_damage: u32,
}

impl Default for ExplosionSetup {
    fn default() -> Self {
        Self {
            center: Position::new(0.0, 0.0),
            radius: 0,
            base_damage: 0,
            pen_damage: 10,
        }
    }
}

impl ExplosionSetup {
    pub fn source(&self) -> DamageSource {
        DamageSource {
            base_damage: self.base_damage,
            pen_damage: self.pen_damage,
        }
    }
}

fn center_as_pair<S: Serializer>(p: &Position, s: S) -> Result<S::Ok, S::Error> {
    [p.x, p.y].serialize(s)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CenterRepr {
    Pair([f64; 2]),
    Point(Position),
}

fn center_from_any<'de, D: Deserializer<'de>>(d: D) -> Result<Position, D::Error> {
    Ok(match CenterRepr::deserialize(d)? {
        CenterRepr::Pair([x, y]) => Position::new(x, y),
        CenterRepr::Point(p) => p,
    })
}

/// Where an explosive attack landed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlastPlan {
    pub trajectory: Trajectory,
    pub result: AttackResult,
    pub target: Position,
    /// Distance between the intended point and where the blast landed.
    pub deviation: f64,
    pub explosion: ExplosionSetup,
}

/// Miss margin used to scale deviation.
fn miss_margin(
    result: AttackResult,
    range: RangeBand,
    defense: &DefenseDice,
    attack: &AttackRoll,
    defense_roll: &[u32],
) -> u32 {
    if result.lands() {
        return 0;
    }
    match defense {
        DefenseDice::Pool(_) => {
            let def = defense_roll.iter().copied().max().unwrap_or(0);
            (def + 1).saturating_sub(attack.best()).max(1)
        }
        DefenseDice::Miss | DefenseDice::Hit => range.die().unwrap_or(12),
    }
}

/// Move `from` towards `to` by `distance`; stays put when the points meet.
fn step_towards(from: Position, to: Position, distance: f64) -> Position {
    let span = from.distance_to(to);
    if span <= f64::EPSILON {
        return from;
    }
    let k = distance / span;
    Position::new(from.x + (to.x - from.x) * k, from.y + (to.y - from.y) * k)
}

/// Decide where the blast lands from the to-hit rolls. `deviation_roll` is a
/// d12 clock direction relative to the line of fire (12 is straight on) and
/// is only needed when a fixed-trajectory shot misses.
pub fn plan_blast(
    attacker: &Character,
    defender: &Character,
    setup: &AttackSetup,
    attack_roll: &AttackRoll,
    defense_roll: &[u32],
    deviation_roll: Option<u32>,
) -> Result<BlastPlan, CalcError> {
    if setup.range == RangeBand::Over {
        return Err(CalcError::NotFired("target out of range"));
    }
    if let AttackDice::Unavailable(_) = setup.attack_dice {
        return Err(CalcError::NotFired("attack mode unavailable"));
    }

    let weapon = &attacker.weapon;
    let trajectory = Trajectory::of(weapon.skill);
    let result = attack_result(
        attack_roll,
        &setup.defense_dice,
        defense_roll,
        weapon.action,
        attacker.record.gifts.semi_auto_expert,
    );
    let margin = miss_margin(
        result,
        setup.range,
        &setup.defense_dice,
        attack_roll,
        defense_roll,
    );

    let from = attacker.record.position;
    let target = defender.record.position;
    let span = from.distance_to(target);

    let center = match trajectory {
        Trajectory::Thrown => {
            let max_throw = weapon.max_range().unwrap_or(0) as f64;
            let reach = span.min(max_throw);
            let landing = (reach - margin as f64).max(0.0);
            step_towards(from, target, landing)
        }
        Trajectory::Fixed if margin == 0 => target,
        Trajectory::Fixed => {
            let clock = match deviation_roll {
                Some(r @ 1..=12) => r,
                other => return Err(CalcError::MissingDeviation(other)),
            };
            let heading = if span <= f64::EPSILON {
                0.0
            } else {
                (target.y - from.y).atan2(target.x - from.x)
            };
            let angle = heading + (clock as f64 * 30.0).to_radians();
            let scatter = (margin * (setup.range.ordinal() as u32 + 1)) as f64;
            Position::new(
                target.x + angle.cos() * scatter,
                target.y + angle.sin() * scatter,
            )
        }
    };

    let deviation = center.distance_to(target);
    debug!(?trajectory, ?result, margin, deviation, "blast placed");
    Ok(BlastPlan {
        trajectory,
        result,
        target,
        deviation,
        explosion: ExplosionSetup {
            center,
            radius: weapon.explosion.unwrap_or(0),
            base_damage: weapon.base_damage,
            pen_damage: weapon.pen_damage.unwrap_or(0),
        },
    })
}

/// Damage dice for a character `distance` from the centre of a blast of
/// `radius`; zero when out of the blast.
pub fn blast_dice(distance: f64, radius: u32) -> u32 {
    if radius == 0 || !distance.is_finite() {
        return 0;
    }
    let radius = radius as f64;
    let ratio = (distance / radius).floor() as i64;
    let mut dice = BLAST_DICE - ratio;
    if ratio == 0 && distance * 2.0 < radius {
        dice += 1;
    }
    dice.max(0) as u32
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlastTarget {
    pub index: usize,
    pub distance: f64,
    pub dice: u32,
}

impl BlastTarget {
    /// Inside the radius counts as close range for awe.
    pub fn range(&self, radius: u32) -> RangeBand {
        if self.distance < radius as f64 {
            RangeBand::Close
        } else {
            RangeBand::Short
        }
    }
}

/// Everyone the blast reaches, in list order.
pub fn blast_targets<I>(setup: &ExplosionSetup, positions: I) -> Vec<BlastTarget>
where
    I: IntoIterator<Item = Position>,
{
    positions
        .into_iter()
        .enumerate()
        .filter_map(|(index, p)| {
            let distance = setup.center.distance_to(p);
            let dice = blast_dice(distance, setup.radius);
            trace!(index, distance, dice, "blast falloff");
            (dice > 0).then_some(BlastTarget {
                index,
                distance,
                dice,
            })
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlastOutcome {
    pub index: usize,
    pub dice: u32,
    pub damage: DamageResolution,
}

/// Run the damage stage once per character in the blast. `rolls[i]` holds
/// the d20 damage rolls for character `i`.
pub fn resolve_blast(
    setup: &ExplosionSetup,
    characters: &[Character],
    rolls: &[Vec<u32>],
) -> Result<Vec<BlastOutcome>, CalcError> {
    let source = setup.source();
    blast_targets(setup, characters.iter().map(|c| c.record.position))
        .into_iter()
        .map(|target| {
            let dice = vec![DAMAGE_DIE; target.dice as usize];
            let own = rolls.get(target.index).map(Vec::as_slice).unwrap_or(&[]);
            let damage_roll = collect_rolls("blast damage roll", &dice, own)?;
            let damage = damage_resolve(
                source,
                &characters[target.index],
                target.range(setup.radius),
                AttackResult::Hit,
                damage_roll,
            );
            Ok(BlastOutcome {
                index: target.index,
                dice: target.dice,
                damage,
            })
        })
        .collect()
}
