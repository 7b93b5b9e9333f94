//! The calculator session: the document a table keeps between attacks, and
//! the staged driver that runs the combat pipeline over it.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::coerce;
use crate::combat::damage::{damage_resolve, DamageResolution, DamageSource};
use crate::combat::explosion::{
    blast_targets, plan_blast, resolve_blast, BlastOutcome, BlastPlan, ExplosionSetup, Trajectory,
};
use crate::combat::resolve::{attack_resolve, AttackResolution, AttackRoll};
use crate::combat::setup::{attack_setup, AttackDice, AttackSetup, DefenseDice};
use crate::combat::{collect_rolls, DAMAGE_DIE};
use crate::content;
use crate::error::{CalcError, DocumentError, ListKind, LookupError, ValidationError};
use crate::records::{Armor, Character, CharacterRecord, Weapon};
use crate::types::{AttackResult, RangeBand, WoundState};
use crate::wounds::apply_damage;
use crate::Dice;

/// How far a calculation got. When a stage is blocked, this names the
/// stage waiting for input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Step {
    Setup,
    ToHit,
    AttackResolve,
    DamageResolve,
    Explosion,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupInput {
    #[serde(default, deserialize_with = "coerce::opt_usize_lenient")]
    pub attacker: Option<usize>,
    #[serde(default, deserialize_with = "coerce::opt_usize_lenient")]
    pub defender: Option<usize>,
    /// Overrides the map distance when set.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "coerce::opt_u32_lenient"
    )]
    pub distance: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToHitInput {
    #[serde(default, deserialize_with = "coerce::rolls_lenient")]
    pub attack_roll: Vec<u32>,
    #[serde(default, deserialize_with = "coerce::rolls_lenient")]
    pub defense_roll: Vec<u32>,
    /// d12 clock direction for a fixed-trajectory explosive that misses.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "coerce::opt_u32_lenient"
    )]
    pub deviation_roll: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveInput {
    #[serde(default, deserialize_with = "coerce::rolls_lenient")]
    pub damage_roll: Vec<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplosionResolveInput {
    /// d20 damage rolls per character index.
    #[serde(default)]
    pub rolls: Vec<Vec<u32>>,
}

/// Everything one attack calculation reads.
#[derive(Debug, Clone, Copy)]
pub struct CombatValues<'a> {
    pub characters: &'a [CharacterRecord],
    pub weapons: &'a [Weapon],
    pub armor: &'a [Armor],
    pub setup: &'a SetupInput,
    pub to_hit: &'a ToHitInput,
    pub resolve: &'a ResolveInput,
}

/// Output of [`calculate`]: every stage that ran, plus what stopped the next.
#[derive(Debug, Clone, PartialEq)]
pub struct Calcs {
    pub step: Step,
    pub error: Option<CalcError>,
    pub attacker: Option<Character>,
    pub defender: Option<Character>,
    pub setup: Option<AttackSetup>,
    pub resolution: Option<AttackResolution>,
    pub damage: Option<DamageResolution>,
    pub blast: Option<BlastPlan>,
}

impl Calcs {
    fn blocked(step: Step, error: CalcError) -> Self {
        Self {
            step,
            error: Some(error),
            attacker: None,
            defender: None,
            setup: None,
            resolution: None,
            damage: None,
            blast: None,
        }
    }

    fn stop(mut self, step: Step, error: CalcError) -> Self {
        debug!(?step, %error, "calculation blocked");
        self.step = step;
        self.error = Some(error);
        self
    }

    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }
}

fn lookup_character(
    values: &CombatValues<'_>,
    selected: Option<usize>,
    role: &'static str,
) -> Result<Character, CalcError> {
    let index = selected.ok_or(CalcError::NoSelection(role))?;
    let record = values.characters.get(index).ok_or(LookupError::OutOfRange {
        list: ListKind::Character,
        index,
        len: values.characters.len(),
    })?;
    Character::resolve(record, values.weapons, values.armor)
        .map_err(|e| match e {
            LookupError::Invalid(v) => LookupError::Invalid(v.within(format!("character[{}]", index))),
            other => other,
        })
        .map_err(CalcError::from)
}

fn to_hit_rolls(
    input: &ToHitInput,
    setup: &AttackSetup,
) -> Result<(AttackRoll, Vec<u32>), CalcError> {
    let DefenseDice::Pool(defense_dice) = &setup.defense_dice else {
        // Outcome already fixed, nothing to roll.
        return Ok((AttackRoll::for_dice(&setup.attack_dice, vec![]), vec![]));
    };
    let attack_roll = match &setup.attack_dice {
        AttackDice::Pool(dice) => {
            AttackRoll::Dice(collect_rolls("attack roll", dice, &input.attack_roll)?)
        }
        other => AttackRoll::for_dice(other, vec![]),
    };
    let defense_roll = collect_rolls("defense roll", defense_dice, &input.defense_roll)?;
    Ok((attack_roll, defense_roll))
}

/// Run as much of the pipeline as the current inputs allow. Never fails:
/// malformed records and missing rolls both come back as `Calcs::error`.
pub fn calculate(values: &CombatValues<'_>) -> Calcs {
    let attacker = match lookup_character(values, values.setup.attacker, "attacker") {
        Ok(c) => c,
        Err(e) => return Calcs::blocked(Step::Setup, e),
    };
    let defender = match lookup_character(values, values.setup.defender, "defender") {
        Ok(c) => c,
        Err(e) => return Calcs::blocked(Step::Setup, e),
    };

    let setup = attack_setup(&attacker, &defender, values.setup.distance);
    let mut calcs = Calcs {
        step: Step::Setup,
        error: None,
        attacker: Some(attacker.clone()),
        defender: Some(defender.clone()),
        setup: Some(setup.clone()),
        resolution: None,
        damage: None,
        blast: None,
    };

    let (attack_roll, defense_roll) = match to_hit_rolls(values.to_hit, &setup) {
        Ok(rolls) => rolls,
        Err(e) => return calcs.stop(Step::ToHit, e),
    };

    if attacker.weapon.is_explosive() {
        return match plan_blast(
            &attacker,
            &defender,
            &setup,
            &attack_roll,
            &defense_roll,
            values.to_hit.deviation_roll,
        ) {
            Ok(plan) => {
                calcs.step = Step::Explosion;
                calcs.blast = Some(plan);
                calcs
            }
            Err(e) => calcs.stop(Step::ToHit, e),
        };
    }

    let resolution = attack_resolve(&attacker, &defender, &setup, attack_roll, defense_roll);
    let dice = vec![DAMAGE_DIE; resolution.damage_dice_count as usize];
    calcs.step = Step::AttackResolve;
    calcs.resolution = Some(resolution.clone());

    let damage_roll = match collect_rolls("damage roll", &dice, &values.resolve.damage_roll) {
        Ok(rolls) => rolls,
        Err(e) => return calcs.stop(Step::AttackResolve, e),
    };

    calcs.step = Step::DamageResolve;
    calcs.damage = Some(damage_resolve(
        DamageSource::from_attacker(&attacker),
        &defender,
        setup.range,
        resolution.result,
        damage_roll,
    ));
    calcs
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttackLog {
    pub attacker: String,
    pub defender: String,
    pub weapon: String,
    pub range: RangeBand,
    pub attack_roll: AttackRoll,
    pub defense_roll: Vec<u32>,
    pub result: AttackResult,
    pub damage_roll: Vec<u32>,
    pub total_damage: u32,
    pub new_status: WoundState,
    pub injury: u32,
    pub awe: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExplosionLog {
    pub defender: String,
    pub damage_roll: Vec<u32>,
    pub total_damage: u32,
    pub new_status: WoundState,
    pub injury: u32,
    pub awe: u32,
}

/// One completed resolution in the combat log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LogItem {
    Attack(AttackLog),
    Explosion(ExplosionLog),
}

fn fmt_rolls(rolls: &[u32]) -> String {
    let joined = rolls
        .iter()
        .map(|r| r.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    format!("[{}]", joined)
}

fn fmt_best(rolls: &[u32]) -> String {
    format!(
        "{}={}",
        fmt_rolls(rolls),
        rolls.iter().copied().max().unwrap_or(0)
    )
}

fn fmt_consequence(
    f: &mut fmt::Formatter<'_>,
    defender: &str,
    new_status: WoundState,
    injury: u32,
    awe: u32,
) -> fmt::Result {
    if new_status == WoundState::Uninjured {
        write!(f, "{} took", defender)?;
    } else {
        write!(f, "{} is {}, taking", defender, new_status)?;
    }
    write!(f, " {} injuries and {} awe.", injury, awe)
}

impl fmt::Display for AttackLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} attacked {} with {}, at {} range, ",
            self.attacker, self.defender, self.weapon, self.range
        )?;
        match &self.attack_roll {
            AttackRoll::Flat(v) => write!(f, "with a rote of {}", v)?,
            AttackRoll::Dice(rolls) => write!(f, "rolling {}", fmt_best(rolls))?,
        }
        if self.defense_roll.is_empty() {
            f.write_str(" unopposed.")?;
        } else {
            write!(f, " against {}.", fmt_best(&self.defense_roll))?;
        }
        write!(f, " The result was a {}.", self.result)?;
        if !self.damage_roll.is_empty() {
            write!(
                f,
                " The damage was {}={}, and ",
                fmt_rolls(&self.damage_roll),
                self.total_damage
            )?;
            fmt_consequence(f, &self.defender, self.new_status, self.injury, self.awe)?;
        } else if self.awe > 0 {
            write!(
                f,
                " {} took {} awe from being attacked.",
                self.defender, self.awe
            )?;
        }
        Ok(())
    }
}

impl fmt::Display for ExplosionLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} was caught in an explosion. The damage was {}={}, and ",
            self.defender,
            fmt_rolls(&self.damage_roll),
            self.total_damage
        )?;
        fmt_consequence(f, &self.defender, self.new_status, self.injury, self.awe)
    }
}

impl fmt::Display for LogItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogItem::Attack(item) => fmt::Display::fmt(item, f),
            LogItem::Explosion(item) => fmt::Display::fmt(item, f),
        }
    }
}

impl LogItem {
    /// Log entry for a fully resolved single-target attack.
    pub fn from_calcs(calcs: &Calcs) -> Result<LogItem, CalcError> {
        let (Some(attacker), Some(defender), Some(setup), Some(resolution), Some(damage)) = (
            &calcs.attacker,
            &calcs.defender,
            &calcs.setup,
            &calcs.resolution,
            &calcs.damage,
        ) else {
            return Err(CalcError::Incomplete(calcs.step));
        };
        Ok(LogItem::Attack(AttackLog {
            attacker: attacker.name().to_string(),
            defender: defender.name().to_string(),
            weapon: attacker.weapon.name.clone(),
            range: setup.range,
            attack_roll: resolution.attack_roll.clone(),
            defense_roll: resolution.defense_roll.clone(),
            result: resolution.result,
            damage_roll: damage.damage_roll.clone(),
            total_damage: damage.total_damage,
            new_status: damage.new_status,
            injury: damage.injury,
            awe: damage.awe,
        }))
    }

    pub fn from_blast(defender: &Character, damage: &DamageResolution) -> LogItem {
        LogItem::Explosion(ExplosionLog {
            defender: defender.name().to_string(),
            damage_roll: damage.damage_roll.clone(),
            total_damage: damage.total_damage,
            new_status: damage.new_status,
            injury: damage.injury,
            awe: damage.awe,
        })
    }
}

/// Roll every slot of `pool` that is blank or does not fit its die.
fn fill_rolls(dice: &mut Dice, pool: &[u32], rolls: &mut Vec<u32>) {
    rolls.resize(rolls.len().max(pool.len()), 0);
    for (slot, &sides) in rolls.iter_mut().zip(pool) {
        if *slot == 0 || *slot > sides {
            *slot = dice.roll(sides);
        }
    }
}

/// A list plus the entry currently selected for editing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListSelect<T> {
    pub list: Vec<T>,
    #[serde(default, deserialize_with = "coerce::usize_lenient")]
    pub idx: usize,
}

impl<T> ListSelect<T> {
    pub fn new(list: Vec<T>) -> Self {
        Self { list, idx: 0 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MapSettings {
    pub width: f64,
    pub height: f64,
    pub grid_cell_size: f64,
    pub snap: f64,
    pub pixels_per_unit: f64,
}

impl Default for MapSettings {
    fn default() -> Self {
        Self {
            width: 25.0,
            height: 25.0,
            grid_cell_size: 1.0,
            snap: 1.0,
            pixels_per_unit: 20.0,
        }
    }
}

/// The persisted calculator state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub character: ListSelect<CharacterRecord>,
    pub weapon: ListSelect<Weapon>,
    pub armor: ListSelect<Armor>,
    #[serde(default)]
    pub setup: SetupInput,
    #[serde(default)]
    pub to_hit: ToHitInput,
    #[serde(default)]
    pub resolve: ResolveInput,
    #[serde(default)]
    pub map: MapSettings,
    #[serde(default)]
    pub explosion_setup: ExplosionSetup,
    #[serde(default)]
    pub explosion_resolve: ExplosionResolveInput,
    #[serde(default)]
    pub log: Vec<LogItem>,
}

impl Document {
    /// A fresh document with the built-in weapons, armor and character.
    pub fn with_defaults() -> Result<Self, DocumentError> {
        Ok(Self {
            character: ListSelect::new(vec![content::default_character()?]),
            weapon: ListSelect::new(content::default_weapons()?),
            armor: ListSelect::new(content::default_armor()?),
            setup: SetupInput::default(),
            to_hit: ToHitInput::default(),
            resolve: ResolveInput::default(),
            map: MapSettings::default(),
            explosion_setup: ExplosionSetup::default(),
            explosion_resolve: ExplosionResolveInput::default(),
            log: Vec::new(),
        })
    }

    pub fn from_json_str(text: &str) -> Result<Self, DocumentError> {
        let doc: Document = serde_json::from_str(text)?;
        doc.validate()?;
        Ok(doc)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self, DocumentError> {
        let doc: Document = serde_yaml::from_str(text)?;
        doc.validate()?;
        Ok(doc)
    }

    pub fn to_json_pretty(&self) -> Result<String, DocumentError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn to_yaml(&self) -> Result<String, DocumentError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Check every record. Index references are checked lazily, when a
    /// character is actually picked for a calculation.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (i, c) in self.character.list.iter().enumerate() {
            c.validate().map_err(|e| e.within(format!("character[{}]", i)))?;
        }
        for (i, w) in self.weapon.list.iter().enumerate() {
            w.validate().map_err(|e| e.within(format!("weapon[{}]", i)))?;
        }
        for (i, a) in self.armor.list.iter().enumerate() {
            a.validate().map_err(|e| e.within(format!("armor[{}]", i)))?;
        }
        let blast = &self.explosion_setup;
        if !blast.center.is_finite() {
            return Err(ValidationError::new("explosionSetup.center", "must be finite"));
        }
        let map = &self.map;
        for (field, value) in [
            ("width", map.width),
            ("height", map.height),
            ("gridCellSize", map.grid_cell_size),
            ("snap", map.snap),
            ("pixelsPerUnit", map.pixels_per_unit),
        ] {
            if !value.is_finite() {
                return Err(ValidationError::new(
                    format!("map.{}", field),
                    "must be finite",
                ));
            }
        }
        Ok(())
    }

    pub fn combat_values(&self) -> CombatValues<'_> {
        CombatValues {
            characters: &self.character.list,
            weapons: &self.weapon.list,
            armor: &self.armor.list,
            setup: &self.setup,
            to_hit: &self.to_hit,
            resolve: &self.resolve,
        }
    }

    pub fn calculate(&self) -> Calcs {
        calculate(&self.combat_values())
    }

    /// Zero the to-hit and damage rolls so the next attack starts clean.
    pub fn reset_dice(&mut self) {
        self.to_hit = ToHitInput::default();
        self.resolve = ResolveInput::default();
    }

    /// Write a completed attack onto the defender, log it and clear the dice.
    pub fn apply_attack(&mut self, calcs: &Calcs) -> Result<LogItem, DocumentError> {
        if calcs.step != Step::DamageResolve || !calcs.is_complete() {
            return Err(CalcError::Incomplete(calcs.step).into());
        }
        let item = LogItem::from_calcs(calcs)?;
        let (Some(index), Some(damage)) = (self.setup.defender, &calcs.damage) else {
            return Err(CalcError::NoSelection("defender").into());
        };
        let len = self.character.list.len();
        let record = self
            .character
            .list
            .get_mut(index)
            .ok_or(CalcError::Lookup(LookupError::OutOfRange {
                list: ListKind::Character,
                index,
                len,
            }))?;
        *record = apply_damage(record, damage);
        info!("[LOG] {}", item);
        self.log.push(item.clone());
        self.reset_dice();
        Ok(item)
    }

    /// Take the blast placement from a finished explosive calculation so it
    /// can be adjusted and resolved.
    pub fn adopt_blast(&mut self, calcs: &Calcs) -> Result<(), DocumentError> {
        match (&calcs.blast, calcs.step) {
            (Some(plan), Step::Explosion) => {
                self.explosion_setup = plan.explosion.clone();
                Ok(())
            }
            _ => Err(CalcError::Incomplete(calcs.step).into()),
        }
    }

    fn resolved_characters(&self) -> Result<Vec<Character>, CalcError> {
        let values = self.combat_values();
        (0..self.character.list.len())
            .map(|i| lookup_character(&values, Some(i), "character"))
            .collect()
    }

    pub fn resolve_explosion(&self) -> Result<Vec<BlastOutcome>, CalcError> {
        let characters = self.resolved_characters()?;
        resolve_blast(
            &self.explosion_setup,
            &characters,
            &self.explosion_resolve.rolls,
        )
    }

    /// Apply every blast outcome, log one entry per character hit and clear
    /// the blast rolls.
    pub fn apply_explosion(&mut self) -> Result<Vec<LogItem>, DocumentError> {
        let characters = self.resolved_characters()?;
        let outcomes = resolve_blast(
            &self.explosion_setup,
            &characters,
            &self.explosion_resolve.rolls,
        )?;
        let mut items = Vec::with_capacity(outcomes.len());
        for outcome in outcomes {
            let item = LogItem::from_blast(&characters[outcome.index], &outcome.damage);
            let record = &mut self.character.list[outcome.index];
            *record = apply_damage(record, &outcome.damage);
            info!("[LOG] {}", item);
            items.push(item);
        }
        self.log.extend(items.iter().cloned());
        self.explosion_resolve = ExplosionResolveInput::default();
        self.reset_dice();
        Ok(items)
    }

    pub fn delete_log_item(&mut self, index: usize) -> Result<LogItem, DocumentError> {
        if index >= self.log.len() {
            return Err(DocumentError::NoSuchLogEntry(index));
        }
        Ok(self.log.remove(index))
    }

    /// Roll whatever dice the current stage is still waiting on and return
    /// the stage reached afterwards. Rolls already entered are kept.
    pub fn roll_for_me(&mut self, dice: &mut Dice) -> Step {
        let calcs = self.calculate();
        let (Some(attacker), Some(setup)) = (&calcs.attacker, &calcs.setup) else {
            return calcs.step;
        };
        match calcs.step {
            Step::ToHit => {
                if let AttackDice::Pool(pool) = &setup.attack_dice {
                    fill_rolls(dice, pool, &mut self.to_hit.attack_roll);
                }
                if let DefenseDice::Pool(pool) = &setup.defense_dice {
                    fill_rolls(dice, pool, &mut self.to_hit.defense_roll);
                }
                let fixed = Trajectory::of(attacker.weapon.skill) == Trajectory::Fixed;
                if attacker.weapon.is_explosive()
                    && fixed
                    && !matches!(self.to_hit.deviation_roll, Some(1..=12))
                {
                    self.to_hit.deviation_roll = Some(dice.roll(12));
                }
            }
            Step::AttackResolve => {
                let count = calcs
                    .resolution
                    .as_ref()
                    .map_or(0, |r| r.damage_dice_count as usize);
                fill_rolls(dice, &vec![DAMAGE_DIE; count], &mut self.resolve.damage_roll);
            }
            _ => {}
        }
        let step = self.calculate().step;
        debug!(?step, "rolled for the current stage");
        step
    }

    /// Roll damage for everyone the current blast reaches.
    pub fn roll_blast(&mut self, dice: &mut Dice) {
        let positions = self.character.list.iter().map(|c| c.position);
        let targets = blast_targets(&self.explosion_setup, positions);
        let rolls = &mut self.explosion_resolve.rolls;
        if rolls.len() < self.character.list.len() {
            rolls.resize(self.character.list.len(), Vec::new());
        }
        for target in targets {
            let pool = vec![DAMAGE_DIE; target.dice as usize];
            fill_rolls(dice, &pool, &mut rolls[target.index]);
        }
    }

    /// Snap every character to the map grid.
    pub fn snap_positions(&mut self) {
        let step = self.map.snap;
        for c in &mut self.character.list {
            c.position = c.position.snapped(step);
        }
    }
}
