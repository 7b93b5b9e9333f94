//! The combat pipeline: setup → resolve → damage, or setup → explosion.
//! Every stage is a pure function of its inputs; each takes the previous
//! stage's output as an argument, so they cannot be run out of order.

pub mod damage;
pub mod explosion;
pub mod resolve;
pub mod setup;

use crate::error::CalcError;
use setup::DieSize;

/// Damage is always rolled on d20s.
pub const DAMAGE_DIE: DieSize = 20;

/// Match entered roll values to the dice they belong to. Extra values are
/// ignored; a zero is a slot nobody has filled in yet.
pub fn collect_rolls(
    what: &'static str,
    dice: &[DieSize],
    rolls: &[u32],
) -> Result<Vec<u32>, CalcError> {
    let taken: Vec<u32> = rolls.iter().copied().take(dice.len()).collect();
    let filled = taken.iter().filter(|&&r| r > 0).count();
    if filled < dice.len() {
        return Err(CalcError::MissingRolls {
            what,
            needed: dice.len(),
            got: filled,
        });
    }
    if let Some((&value, &sides)) = taken.iter().zip(dice).find(|(v, s)| **v > **s) {
        return Err(CalcError::RollOutOfRange { what, value, sides });
    }
    Ok(taken)
}
