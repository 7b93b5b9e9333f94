use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::coerce;
use crate::error::{ListKind, LookupError, ValidationError};
use crate::types::{Action, AttackMode, Cover, Marker, Ordinal, RangeBand, Skill, WoundState};

/// Marks above this add nothing to the dice pool.
pub const MAX_MARKS: u32 = 8;

fn is_false(b: &bool) -> bool {
    !*b
}

fn require_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::new("name", "must not be empty"));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Weapon {
    pub name: String,
    pub skill: Skill,
    pub action: Action,
    /// Maximum distance per configured band. Absent bands are unreachable.
    #[serde(default, deserialize_with = "coerce::sparse_map_lenient")]
    pub ranges: BTreeMap<RangeBand, u32>,
    #[serde(deserialize_with = "coerce::u32_lenient")]
    pub base_damage: u32,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "coerce::opt_u32_lenient"
    )]
    pub pen_damage: Option<u32>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub shotgun: bool,
    /// Blast radius; a positive radius makes this an area weapon.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "coerce::opt_u32_lenient"
    )]
    pub explosion: Option<u32>,
}

impl Weapon {
    pub fn is_explosive(&self) -> bool {
        self.explosion.is_some_and(|r| r > 0)
    }

    /// Longest configured reach, if any band is configured.
    pub fn max_range(&self) -> Option<u32> {
        self.ranges.values().copied().max()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_name(&self.name)?;
        if self.ranges.contains_key(&RangeBand::Over) {
            return Err(ValidationError::new(
                "ranges",
                "`Over` is not a configurable band",
            ));
        }
        let mut last: Option<(RangeBand, u32)> = None;
        for (&band, &max) in &self.ranges {
            if let Some((prev_band, prev)) = last {
                if max <= prev {
                    return Err(ValidationError::new(
                        format!("ranges.{}", band.name()),
                        format!(
                            "{} must be greater than {} ({})",
                            max,
                            prev_band.name(),
                            prev
                        ),
                    ));
                }
            }
            last = Some((band, max));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Armor {
    pub name: String,
    /// A damage die must roll above this to add penetration damage.
    #[serde(deserialize_with = "coerce::u32_lenient")]
    pub deflection: u32,
    /// Added to every wound breakpoint.
    #[serde(deserialize_with = "coerce::u32_lenient")]
    pub threshold: u32,
}

impl Armor {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_name(&self.name)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Conditions {
    pub surprised: bool,
    pub helpless: bool,
    pub hiding: bool,
    pub aiming: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PassiveGifts {
    pub tough: bool,
    pub very_tough: bool,
    pub strong: bool,
    pub very_strong: bool,
    pub semi_auto_expert: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ActiveGifts {
    pub sniper_expert: bool,
    pub sniper_master: bool,
    pub martial_arts: bool,
    pub melee_expert: bool,
}

/// Battle-map coordinate in map units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Default for Position {
    fn default() -> Self {
        Self { x: 1.0, y: 1.0 }
    }
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(self, other: Position) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    /// Round each axis to the nearest multiple of `step`.
    pub fn snapped(self, step: f64) -> Position {
        if step <= 0.0 || !step.is_finite() {
            return self;
        }
        Position {
            x: (self.x / step).round() * step,
            y: (self.y / step).round() * step,
        }
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// A character as stored in the document: equipment is referenced by index
/// into the document's weapon and armor lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterRecord {
    pub name: String,
    #[serde(deserialize_with = "coerce::u32_lenient")]
    pub body: u32,
    #[serde(default, deserialize_with = "coerce::u32_lenient")]
    pub injury: u32,
    #[serde(deserialize_with = "coerce::usize_lenient")]
    pub weapon: usize,
    #[serde(deserialize_with = "coerce::usize_lenient")]
    pub armor: usize,
    #[serde(default, deserialize_with = "coerce::sparse_map_lenient")]
    pub marks: BTreeMap<Skill, u32>,
    #[serde(default)]
    pub mode: AttackMode,
    #[serde(default)]
    pub wound_state: WoundState,
    #[serde(default = "default_max_cover")]
    pub max_cover: Cover,
    #[serde(default)]
    pub concealment: Cover,
    #[serde(deserialize_with = "coerce::u32_lenient")]
    pub morale: u32,
    #[serde(default, deserialize_with = "coerce::u32_lenient")]
    pub awe: u32,
    #[serde(default)]
    pub conditions: Conditions,
    #[serde(default)]
    pub gifts: PassiveGifts,
    #[serde(default)]
    pub active_gifts: ActiveGifts,
    #[serde(default)]
    pub position: Position,
    #[serde(default)]
    pub marker: Marker,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

fn default_max_cover() -> Cover {
    Cover::Half
}

impl Default for CharacterRecord {
    fn default() -> Self {
        Self {
            name: "Donut Steele".to_string(),
            body: 7,
            injury: 0,
            weapon: 0,
            armor: 0,
            marks: Skill::ALL.iter().map(|&s| (s, 0)).collect(),
            mode: AttackMode::Roll,
            wound_state: WoundState::Uninjured,
            max_cover: default_max_cover(),
            concealment: Cover::None,
            morale: 5,
            awe: 0,
            conditions: Conditions::default(),
            gifts: PassiveGifts::default(),
            active_gifts: ActiveGifts::default(),
            position: Position::default(),
            marker: Marker::Circle,
            color: None,
        }
    }
}

impl CharacterRecord {
    pub fn marks(&self, skill: Skill) -> u32 {
        self.marks.get(&skill).copied().unwrap_or(0)
    }

    /// Body left after accumulated injury.
    pub fn remaining_body(&self) -> u32 {
        self.body.saturating_sub(self.injury)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_name(&self.name)?;
        if self.injury > self.body {
            return Err(ValidationError::new(
                "injury",
                format!("{} exceeds body {}", self.injury, self.body),
            ));
        }
        if self.awe > self.morale {
            return Err(ValidationError::new(
                "awe",
                format!("{} exceeds morale {}", self.awe, self.morale),
            ));
        }
        if !self.position.is_finite() {
            return Err(ValidationError::new("position", "must be finite"));
        }
        Ok(())
    }
}

/// A character with its equipment dereferenced. This is what the rules read.
#[derive(Debug, Clone, PartialEq)]
pub struct Character {
    pub record: CharacterRecord,
    pub weapon: Weapon,
    pub armor: Armor,
}

impl Character {
    pub fn new(record: CharacterRecord, weapon: Weapon, armor: Armor) -> Self {
        Self {
            record,
            weapon,
            armor,
        }
    }

    /// Validate a record and look its equipment up by index.
    pub fn resolve(
        record: &CharacterRecord,
        weapons: &[Weapon],
        armor: &[Armor],
    ) -> Result<Self, LookupError> {
        record.validate()?;
        let weapon = weapons.get(record.weapon).ok_or(LookupError::OutOfRange {
            list: ListKind::Weapon,
            index: record.weapon,
            len: weapons.len(),
        })?;
        weapon
            .validate()
            .map_err(|e| e.within(format!("weapon[{}]", record.weapon)))?;
        let worn = armor.get(record.armor).ok_or(LookupError::OutOfRange {
            list: ListKind::Armor,
            index: record.armor,
            len: armor.len(),
        })?;
        worn.validate()
            .map_err(|e| e.within(format!("armor[{}]", record.armor)))?;
        Ok(Self::new(record.clone(), weapon.clone(), worn.clone()))
    }

    pub fn name(&self) -> &str {
        &self.record.name
    }

    /// Marks in the equipped weapon's skill, clamped for dice purposes.
    pub fn weapon_marks(&self) -> u32 {
        self.record.marks(self.weapon.skill).min(MAX_MARKS)
    }
}
