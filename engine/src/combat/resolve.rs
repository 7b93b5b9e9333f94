use serde::{Deserialize, Serialize};
use tracing::debug;

use super::setup::{AttackDice, AttackSetup, DefenseDice};
use crate::records::Character;
use crate::types::{Action, AttackResult, RangeBand};

/// The attacker's side of the to-hit comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttackRoll {
    /// Rote value, no dice involved.
    Flat(u32),
    Dice(Vec<u32>),
}

impl AttackRoll {
    /// Value compared against the defense.
    pub fn best(&self) -> u32 {
        match self {
            AttackRoll::Flat(v) => *v,
            AttackRoll::Dice(rolls) => rolls.iter().copied().max().unwrap_or(0),
        }
    }

    /// Empty roll matching a pool that needs no dice from the attacker.
    pub fn for_dice(dice: &AttackDice, rolls: Vec<u32>) -> AttackRoll {
        match dice {
            AttackDice::Flat(v) => AttackRoll::Flat(*v),
            AttackDice::Pool(_) => AttackRoll::Dice(rolls),
            AttackDice::Unavailable(_) => AttackRoll::Dice(vec![]),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackResolution {
    pub attack_roll: AttackRoll,
    pub defense_roll: Vec<u32>,
    pub result: AttackResult,
    pub damage_dice_count: u32,
}

/// Compare the attacker's best value against the defender's best die.
/// Ties go to the defender unless a semi-auto expert fires an automatic.
pub fn attack_result(
    attack: &AttackRoll,
    defense: &DefenseDice,
    defense_roll: &[u32],
    action: Action,
    semi_auto_expert: bool,
) -> AttackResult {
    match defense {
        DefenseDice::Hit => return AttackResult::Hit,
        DefenseDice::Miss => return AttackResult::Miss,
        DefenseDice::Pool(_) => {}
    }

    let atk = attack.best();
    let def = defense_roll.iter().copied().max().unwrap_or(0);

    if atk < def {
        AttackResult::Miss
    } else if atk == def {
        if semi_auto_expert && action.is_automatic() {
            AttackResult::Hit
        } else {
            AttackResult::Tie
        }
    } else {
        match attack {
            AttackRoll::Dice(rolls) if rolls.iter().filter(|&&r| r > def).count() >= 2 => {
                AttackResult::Crit
            }
            _ => AttackResult::Hit,
        }
    }
}

/// Number of d20 the attacker rolls for damage.
pub fn damage_dice_count(
    attacker: &Character,
    defender: &Character,
    result: AttackResult,
    range: RangeBand,
) -> u32 {
    if matches!(result, AttackResult::Miss | AttackResult::Tie) {
        return 0;
    }
    // Shotgun spread falls off with distance: Close = 4 dice, Extreme = 0.
    let mut total = if attacker.weapon.shotgun {
        4u32.saturating_sub(range.ordinal() as u32)
    } else {
        1 + (defender.record.wound_state.ordinal() as u32).min(3)
    };
    if result == AttackResult::Crit {
        total += 1;
    }
    if defender.record.conditions.helpless {
        total += 1;
    }
    if attacker.weapon.action != Action::Melee {
        let gifts = attacker.record.active_gifts;
        if gifts.sniper_master {
            total += 3;
        } else if gifts.sniper_expert {
            total += 1;
        }
    }
    total
}

/// Turn the to-hit rolls into a result and a damage dice count.
pub fn attack_resolve(
    attacker: &Character,
    defender: &Character,
    setup: &AttackSetup,
    attack_roll: AttackRoll,
    defense_roll: Vec<u32>,
) -> AttackResolution {
    let result = attack_result(
        &attack_roll,
        &setup.defense_dice,
        &defense_roll,
        attacker.weapon.action,
        attacker.record.gifts.semi_auto_expert,
    );
    let damage_dice_count = damage_dice_count(attacker, defender, result, setup.range);
    debug!(
        atk = attack_roll.best(),
        ?defense_roll,
        ?result,
        damage_dice_count,
        "attack resolved"
    );
    AttackResolution {
        attack_roll,
        defense_roll,
        result,
        damage_dice_count,
    }
}
