pub mod coerce;
pub mod combat;
pub mod content;
pub mod error;
pub mod records;
pub mod session;
pub mod types;
pub mod wounds;

pub use combat::damage::{damage_resolve, DamageResolution, DamageSource};
pub use combat::explosion::{
    blast_dice, blast_targets, plan_blast, resolve_blast, BlastOutcome, BlastPlan, BlastTarget,
    ExplosionSetup, Trajectory,
};
pub use combat::resolve::{attack_resolve, attack_result, AttackResolution, AttackRoll};
pub use combat::setup::{
    attack_dice, attack_setup, defense_dice, marks_to_dice, range_band, AttackDice, AttackSetup,
    DefenseDice, DieSize, Unavailable,
};
pub use error::{CalcError, DocumentError, ListKind, LookupError, ValidationError};
pub use records::{Armor, Character, CharacterRecord, Position, Weapon};
pub use session::{calculate, Calcs, CombatValues, Document, LogItem, Step};
pub use types::{
    Action, AttackMode, AttackResult, Cover, Marker, Ordinal, RangeBand, Skill, WoundState,
};
pub use wounds::{apply_damage, apply_result};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Seeded dice for the "roll for me" helpers. The rules themselves never
/// roll; they only read values someone already rolled.
pub struct Dice {
    rng: ChaCha8Rng,
}

impl Dice {
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: ChaCha8Rng::from_entropy(),
        }
    }

    /// One die of `sides`; a zero-sided die rolls 0.
    pub fn roll(&mut self, sides: DieSize) -> u32 {
        if sides == 0 {
            return 0;
        }
        self.rng.gen_range(1..=sides)
    }

    pub fn roll_pool(&mut self, dice: &[DieSize]) -> Vec<u32> {
        dice.iter().map(|&sides| self.roll(sides)).collect()
    }
}
