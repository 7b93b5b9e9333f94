use albedo_engine::{AttackResult, Dice, Document, Step, WoundState};
use anyhow::{bail, Context};
use clap::Parser;
use encoding_rs::Encoding;
use std::{
    fs,
    path::{Path, PathBuf},
};

#[derive(Parser)]
#[command(name = "albedo-odds")]
#[command(about = "Monte Carlo sim: repeated attacks until the defender goes down")]
struct Args {
    /// Document with attacker and defender selected (defaults to two copies
    /// of the built-in character)
    #[arg(long)]
    file: Option<PathBuf>,

    /// Number of trials
    #[arg(long, default_value_t = 1000)]
    trials: u32,

    /// Safety cap on attacks per trial
    #[arg(long, default_value_t = 20)]
    max_rounds: u32,

    /// Attacker weapon by name (overrides the document)
    #[arg(long)]
    weapon: Option<String>,

    /// Attacker marks in the weapon's skill (overrides the document)
    #[arg(long)]
    marks: Option<u32>,

    /// Fixed distance instead of map positions
    #[arg(long)]
    distance: Option<u32>,

    /// RNG base seed (trial i uses seed+i)
    #[arg(long, default_value_t = 12345)]
    seed: u64,
}

fn read_text_auto(path: &Path) -> anyhow::Result<String> {
    let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    if let Some((enc, bom_len)) = Encoding::for_bom(&bytes) {
        let (cow, _, _) = enc.decode(&bytes[bom_len..]);
        Ok(cow.into_owned())
    } else {
        String::from_utf8(bytes).with_context(|| format!("{} is not UTF-8", path.display()))
    }
}

fn load_document(path: &Path) -> anyhow::Result<Document> {
    let text = read_text_auto(path)?;
    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml" | "yml")
    );
    let doc = if is_yaml {
        Document::from_yaml_str(&text)
    } else {
        Document::from_json_str(&text)
    };
    doc.with_context(|| format!("loading {}", path.display()))
}

fn default_duel() -> anyhow::Result<Document> {
    let mut doc = Document::with_defaults()?;
    let mut defender = doc.character.list[0].clone();
    defender.name = "Defender".to_string();
    defender.position.x += 3.0;
    doc.character.list.push(defender);
    doc.setup.attacker = Some(0);
    doc.setup.defender = Some(1);
    Ok(doc)
}

fn find_weapon_in(name: &str, doc: &Document) -> Option<usize> {
    doc.weapon
        .list
        .iter()
        .position(|w| w.name.eq_ignore_ascii_case(name))
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut base = match args.file.as_ref() {
        Some(path) => load_document(path)?,
        None => {
            let mut doc = default_duel()?;
            // The built-in character has no training; give them a pistol.
            doc.character.list[0].weapon = find_weapon_in("PAKW 4-12", &doc).unwrap_or(0);
            doc
        }
    };
    let (Some(att), Some(def)) = (base.setup.attacker, base.setup.defender) else {
        bail!("document must select an attacker and a defender");
    };
    if att >= base.character.list.len() || def >= base.character.list.len() {
        bail!("attacker or defender index is out of range");
    }

    if let Some(ref name) = args.weapon {
        let Some(idx) = find_weapon_in(name, &base) else {
            bail!("no weapon named `{}` in the document", name);
        };
        base.character.list[att].weapon = idx;
    }
    let weapon = base
        .weapon
        .list
        .get(base.character.list[att].weapon)
        .cloned()
        .context("attacker weapon index is out of range")?;
    if weapon.is_explosive() {
        bail!("`{}` is explosive; odds cover single-target attacks only", weapon.name);
    }
    match args.marks {
        Some(marks) => {
            base.character.list[att].marks.insert(weapon.skill, marks);
        }
        None if args.file.is_none() => {
            base.character.list[att].marks.insert(weapon.skill, 3);
        }
        None => {}
    }
    if args.distance.is_some() {
        base.setup.distance = args.distance;
    }
    base.reset_dice();

    // Stats
    let mut wins = 0u32;
    let mut hit_count = 0u32;
    let mut crit_count = 0u32;
    let mut miss_count = 0u32;
    let mut dmg_total_on_hits = 0u64;
    let mut rounds_vec: Vec<u32> = Vec::with_capacity(args.trials as usize);

    for i in 0..args.trials {
        let mut doc = base.clone();
        let mut rounds = 0u32;
        let trial_seed = args.seed.wrapping_add(i as u64);
        let mut dice = Dice::from_seed(trial_seed);

        while rounds < args.max_rounds
            && doc.character.list[def].wound_state < WoundState::Incapacitated
        {
            rounds += 1;
            doc.roll_for_me(&mut dice);
            doc.roll_for_me(&mut dice);
            let calcs = doc.calculate();
            if calcs.step != Step::DamageResolve || !calcs.is_complete() {
                let why = calcs.error.as_ref().map(|e| e.to_string()).unwrap_or_default();
                bail!("calculation stuck at {:?}: {}", calcs.step, why);
            }
            if let (Some(res), Some(dmg)) = (&calcs.resolution, &calcs.damage) {
                match res.result {
                    AttackResult::Crit => {
                        crit_count += 1;
                        hit_count += 1;
                        dmg_total_on_hits += dmg.total_damage as u64;
                    }
                    AttackResult::Hit => {
                        hit_count += 1;
                        dmg_total_on_hits += dmg.total_damage as u64;
                    }
                    AttackResult::Miss | AttackResult::Tie => miss_count += 1,
                }
            }
            doc.apply_attack(&calcs)?;
            doc.log.clear();
        }

        if doc.character.list[def].wound_state >= WoundState::Incapacitated {
            wins += 1;
            rounds_vec.push(rounds);
        }
    }

    rounds_vec.sort_unstable();
    let trials_f = args.trials.max(1) as f64;
    let win_rate = wins as f64 / trials_f;
    let hit_rate = if hit_count + miss_count == 0 {
        0.0
    } else {
        hit_count as f64 / (hit_count + miss_count) as f64
    };
    let crit_rate = if hit_count == 0 {
        0.0
    } else {
        crit_count as f64 / hit_count as f64
    };
    let avg_dmg_per_hit = if hit_count == 0 {
        0.0
    } else {
        dmg_total_on_hits as f64 / hit_count as f64
    };
    let avg_rounds = if rounds_vec.is_empty() {
        0.0
    } else {
        (rounds_vec.iter().map(|&r| r as u64).sum::<u64>() as f64) / (wins.max(1)) as f64
    };
    let median_rounds = if rounds_vec.is_empty() {
        0
    } else {
        let m = rounds_vec.len() / 2;
        if rounds_vec.len() % 2 == 1 {
            rounds_vec[m]
        } else {
            (rounds_vec[m - 1] + rounds_vec[m]) / 2
        }
    };

    let attacker = &base.character.list[att];
    let defender = &base.character.list[def];
    println!("albedo-odds results");
    println!("-------------------");
    println!("trials:             {}", args.trials);
    println!(
        "attacker:           {} ({}, {} marks, {})",
        attacker.name,
        weapon.name,
        attacker.marks(weapon.skill),
        attacker.mode
    );
    println!("defender:           {}", defender.name);
    println!();
    println!("takedown rate:      {:.1}%", win_rate * 100.0);
    println!("hit rate:           {:.1}%", hit_rate * 100.0);
    println!("crit rate:          {:.1}%", crit_rate * 100.0);
    println!("avg dmg per hit:    {:.2}", avg_dmg_per_hit);
    println!("avg attacks (wins): {:.2}", avg_rounds);
    println!("median attacks:     {}", median_rounds);

    Ok(())
}
