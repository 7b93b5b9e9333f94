use tracing::info;

use crate::combat::damage::DamageResolution;
use crate::records::CharacterRecord;
use crate::types::WoundState;

/// Merge a combat result onto a character. Wound state only ever worsens,
/// injury is capped at body and awe at morale. The input is left untouched.
pub fn apply_result(
    defender: &CharacterRecord,
    new_status: WoundState,
    injury: u32,
    awe: u32,
) -> CharacterRecord {
    let mut next = defender.clone();
    next.wound_state = defender.wound_state.max(new_status);
    next.injury = defender.injury.saturating_add(injury).min(defender.body);
    next.awe = defender.awe.saturating_add(awe).min(defender.morale);

    if next.wound_state != defender.wound_state {
        info!(
            "[STATE][{}] {} → {}",
            defender.name, defender.wound_state, next.wound_state
        );
    }
    info!(
        "[WOUND][{}] injury {} → {} (body {}), awe {} → {} (morale {})",
        defender.name,
        defender.injury,
        next.injury,
        defender.body,
        defender.awe,
        next.awe,
        defender.morale
    );
    next
}

pub fn apply_damage(defender: &CharacterRecord, damage: &DamageResolution) -> CharacterRecord {
    apply_result(defender, damage.new_status, damage.injury, damage.awe)
}

