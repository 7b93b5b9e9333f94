//! Closed rule enums. Every one of them is totally ordered by its ordinal and
//! carries its display name, so comparisons and labels never drift apart.

use std::fmt;
use std::marker::PhantomData;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Shared surface of the ordinal enums, used by the lenient deserializer.
pub trait Ordinal: Sized + Copy + 'static {
    const KIND: &'static str;
    const ALL: &'static [Self];

    fn ordinal(self) -> usize;
    fn label(self) -> &'static str;
    fn name(self) -> &'static str;
    fn from_label(s: &str) -> Option<Self>;

    fn from_ordinal(n: usize) -> Option<Self> {
        Self::ALL.get(n).copied()
    }
}

macro_rules! ordinal_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident as $kind:literal {
            $( $variant:ident => $label:literal, $display:literal $(, $alias:literal)* ;)+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl Ordinal for $name {
            const KIND: &'static str = $kind;
            const ALL: &'static [Self] = &[$($name::$variant),+];

            fn ordinal(self) -> usize {
                self as usize
            }

            fn label(self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }

            fn name(self) -> &'static str {
                match self {
                    $($name::$variant => $display),+
                }
            }

            #[allow(unreachable_patterns)]
            fn from_label(s: &str) -> Option<Self> {
                match s {
                    $($label | $display $(| $alias)* => Some($name::$variant),)+
                    _ => None,
                }
            }
        }

        impl $name {
            pub fn ordinal(self) -> usize {
                <Self as Ordinal>::ordinal(self)
            }

            pub fn name(self) -> &'static str {
                <Self as Ordinal>::name(self)
            }

            pub fn from_ordinal(n: usize) -> Option<Self> {
                <Self as Ordinal>::from_ordinal(n)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.name())
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.label())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                deserializer.deserialize_any(OrdinalVisitor::<$name>(PhantomData))
            }
        }
    };
}

/// Accepts a label, display name or alias, an integer ordinal, or an
/// ordinal written as a string (`"2"`).
struct OrdinalVisitor<T>(PhantomData<T>);

impl<'de, T: Ordinal> Visitor<'de> for OrdinalVisitor<T> {
    type Value = T;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "a {} name or ordinal", T::KIND)
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<T, E> {
        let v = v.trim();
        if let Some(found) = T::from_label(v) {
            return Ok(found);
        }
        match v.parse::<usize>() {
            Ok(n) => self.visit_u64(n as u64),
            Err(_) => Err(E::custom(format!("unknown {} `{}`", T::KIND, v))),
        }
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<T, E> {
        usize::try_from(v)
            .ok()
            .and_then(T::from_ordinal)
            .ok_or_else(|| E::custom(format!("{} ordinal {} out of range", T::KIND, v)))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<T, E> {
        match u64::try_from(v) {
            Ok(v) => self.visit_u64(v),
            Err(_) => Err(E::custom(format!("{} ordinal {} is negative", T::KIND, v))),
        }
    }
}

ordinal_enum! {
    /// Range band between attacker and target. `Over` is the sentinel for
    /// "beyond every configured band" and is never a weapon range key.
    pub enum RangeBand as "range band" {
        Close => "C", "Close";
        Short => "S", "Short";
        Medium => "M", "Medium";
        Long => "L", "Long";
        Extreme => "X", "Extreme";
        Over => "Over", "Out of range";
    }
}

impl RangeBand {
    /// Bands a weapon may configure, in walk order.
    pub const WEAPON_BANDS: [RangeBand; 5] = [
        RangeBand::Close,
        RangeBand::Short,
        RangeBand::Medium,
        RangeBand::Long,
        RangeBand::Extreme,
    ];

    /// Die the defender rolls for this band; `None` for `Over`.
    pub fn die(self) -> Option<u32> {
        match self {
            RangeBand::Close => Some(4),
            RangeBand::Short => Some(6),
            RangeBand::Medium => Some(8),
            RangeBand::Long => Some(10),
            RangeBand::Extreme => Some(12),
            RangeBand::Over => None,
        }
    }

    /// One band nearer, saturating at Close.
    pub fn nearer(self) -> RangeBand {
        RangeBand::from_ordinal(self.ordinal().saturating_sub(1)).unwrap_or(RangeBand::Close)
    }
}

ordinal_enum! {
    pub enum Cover as "cover" {
        None => "None", "None";
        Quarter => "Quarter", "Quarter";
        Half => "Half", "Half";
        ThreeQuarter => "ThreeQuarter", "Three-quarter", "ThreeQuarters";
        Total => "Total", "Total";
    }
}

impl Cover {
    /// One step less obstruction, saturating at None.
    pub fn reduced(self) -> Cover {
        Cover::from_ordinal(self.ordinal().saturating_sub(1)).unwrap_or(Cover::None)
    }

    /// Defense dice granted as cover. `None` means nothing can get through.
    pub fn cover_dice(self) -> Option<Vec<u32>> {
        match self {
            Cover::None => Some(vec![]),
            Cover::Quarter => Some(vec![8]),
            Cover::Half => Some(vec![10]),
            Cover::ThreeQuarter => Some(vec![12]),
            Cover::Total => None,
        }
    }

    /// Defense dice granted as concealment; total concealment is two d12.
    pub fn concealment_dice(self) -> Vec<u32> {
        match self {
            Cover::Total => vec![12, 12],
            other => other.cover_dice().unwrap_or_default(),
        }
    }
}

ordinal_enum! {
    pub enum WoundState as "wound state" {
        Uninjured => "Uninjured", "Uninjured", "None";
        Wounded => "Wounded", "Wounded";
        Crippled => "Crippled", "Crippled";
        Incapacitated => "Incapacitated", "Incapacitated";
        Devastated => "Devastated", "Devastated";
    }
}

impl Default for WoundState {
    fn default() -> Self {
        WoundState::Uninjured
    }
}

impl Default for Cover {
    fn default() -> Self {
        Cover::None
    }
}

ordinal_enum! {
    pub enum Skill as "skill" {
        Brawl => "Brawl", "Brawl";
        Melee => "Melee", "Melee";
        Throw => "Throw", "Throw";
        Longarm => "Longarm", "Longarm";
        Pistol => "Pistol", "Pistol";
        Heavy => "Heavy", "Heavy";
    }
}

impl Skill {
    /// Best cover a defender armed with this skill can use while fighting.
    pub fn max_cover(self) -> Cover {
        match self {
            Skill::Brawl | Skill::Melee => Cover::None,
            Skill::Pistol => Cover::ThreeQuarter,
            Skill::Throw | Skill::Longarm | Skill::Heavy => Cover::Half,
        }
    }

    /// Close-combat skills draw penetration damage from the wielder's body.
    pub fn is_close_combat(self) -> bool {
        matches!(self, Skill::Brawl | Skill::Melee)
    }
}

ordinal_enum! {
    pub enum Action as "action" {
        Melee => "Melee", "Melee";
        Single => "Single", "Single";
        Semi => "Semi", "Semi";
        Full => "Full", "Full";
    }
}

impl Action {
    pub fn is_automatic(self) -> bool {
        matches!(self, Action::Semi | Action::Full)
    }
}

ordinal_enum! {
    /// Risk/reward posture the attacker picks for a single attack.
    pub enum AttackMode as "attack mode" {
        Rote => "Rote", "Rote";
        Roll => "Roll", "Roll";
        Push => "Push", "Push";
        Risk => "Risk", "Risk";
        Breeze => "Breeze", "Breeze";
    }
}

impl Default for AttackMode {
    fn default() -> Self {
        AttackMode::Roll
    }
}

ordinal_enum! {
    pub enum AttackResult as "attack result" {
        Miss => "Miss", "Miss";
        Tie => "Tie", "Tie";
        Hit => "Hit", "Hit";
        Crit => "Crit", "Crit";
    }
}

impl AttackResult {
    pub fn lands(self) -> bool {
        matches!(self, AttackResult::Hit | AttackResult::Crit)
    }
}

ordinal_enum! {
    /// Map marker shape. Display only.
    pub enum Marker as "marker" {
        Circle => "Circle", "Circle";
        Square => "Square", "Square";
        Triangle => "Triangle", "Triangle";
        Cross => "Cross", "Cross";
        Star => "Star", "Star";
    }
}

impl Default for Marker {
    fn default() -> Self {
        Marker::Circle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_follow_ordinals() {
        assert_eq!(WoundState::from_ordinal(2), Some(WoundState::Crippled));
        assert_eq!(WoundState::Crippled.name(), "Crippled");
        assert_eq!(RangeBand::Medium.to_string(), "Medium");
        assert_eq!(RangeBand::Over.ordinal(), 5);
        assert!(Cover::Half < Cover::ThreeQuarter);
    }

    #[test]
    fn lenient_forms_deserialize() {
        let c: Cover = serde_json::from_str("\"Half\"").unwrap();
        assert_eq!(c, Cover::Half);
        let c: Cover = serde_json::from_str("\"2\"").unwrap();
        assert_eq!(c, Cover::Half);
        let c: Cover = serde_json::from_str("2").unwrap();
        assert_eq!(c, Cover::Half);
        let w: WoundState = serde_json::from_str("\"None\"").unwrap();
        assert_eq!(w, WoundState::Uninjured);
        assert!(serde_json::from_str::<Cover>("7").is_err());
        assert!(serde_json::from_str::<Skill>("\"Bow\"").is_err());
    }

    #[test]
    fn range_serializes_as_key() {
        assert_eq!(serde_json::to_string(&RangeBand::Long).unwrap(), "\"L\"");
        let r: RangeBand = serde_json::from_str("\"Long\"").unwrap();
        assert_eq!(r, RangeBand::Long);
    }

    #[test]
    fn steps_saturate() {
        assert_eq!(RangeBand::Close.nearer(), RangeBand::Close);
        assert_eq!(RangeBand::Long.nearer(), RangeBand::Medium);
        assert_eq!(Cover::None.reduced(), Cover::None);
        assert_eq!(Cover::Total.reduced(), Cover::ThreeQuarter);
    }
}
