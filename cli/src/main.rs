use albedo_engine::combat::damage::thresholds;
use albedo_engine::{blast_targets, AttackDice, Calcs, DefenseDice, Dice, Document, Step};
use anyhow::{bail, Context};
use clap::{ArgAction, Parser, Subcommand};
use encoding_rs::Encoding;
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::Level;

#[derive(Subcommand)]
enum Cmd {
    /// Print a fresh document with the built-in weapons, armor and character
    Defaults {
        /// Emit YAML instead of JSON
        #[arg(long, default_value_t = false)]
        yaml: bool,
    },
    /// Roll dice of the given sizes, e.g. `roll 8 10 10`
    Roll {
        /// Die sizes
        #[arg(required = true)]
        dice: Vec<u32>,
        /// RNG seed for determinism
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Run the combat calculation over a document and report every stage
    Calc {
        /// Document file (.json, .yaml or .yml)
        file: PathBuf,
    },
    /// Fill in the rolls the current stage is waiting on
    AutoRoll {
        file: PathBuf,
        /// RNG seed for determinism
        #[arg(long)]
        seed: Option<u64>,
        /// Roll blast damage for the adopted explosion instead
        #[arg(long, default_value_t = false)]
        blast: bool,
    },
    /// Apply a finished attack to the defender and log it
    Apply { file: PathBuf },
    /// Show, adopt or apply the explosion of an explosive attack
    Blast {
        file: PathBuf,
        /// Take the blast placement from the current calculation
        #[arg(long, default_value_t = false)]
        adopt: bool,
        /// Apply blast damage to everyone caught in it
        #[arg(long, default_value_t = false)]
        apply: bool,
    },
    /// Print the combat log
    Log {
        file: PathBuf,
        /// Remove the entry at this position
        #[arg(long)]
        delete: Option<usize>,
    },
    /// Snap every character position to the map grid
    Snap { file: PathBuf },
}

#[derive(Parser)]
#[command(name = "albedo")]
#[command(about = "Albedo combat calculator")]
struct Cli {
    /// More log output on stderr (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    cmd: Cmd,
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
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

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml" | "yml")
    )
}

fn load_document(path: &Path) -> anyhow::Result<Document> {
    let text = read_text_auto(path)?;
    let doc = if is_yaml(path) {
        Document::from_yaml_str(&text)
    } else {
        Document::from_json_str(&text)
    };
    doc.with_context(|| format!("loading {}", path.display()))
}

fn save_document(path: &Path, doc: &Document) -> anyhow::Result<()> {
    let text = if is_yaml(path) {
        doc.to_yaml()?
    } else {
        doc.to_json_pretty()?
    };
    fs::write(path, text).with_context(|| format!("writing {}", path.display()))
}

fn dice_for(seed: Option<u64>) -> Dice {
    match seed {
        Some(seed) => Dice::from_seed(seed),
        None => Dice::from_entropy(),
    }
}

fn pool_text(dice: &[u32]) -> String {
    if dice.is_empty() {
        return "none".to_string();
    }
    dice.iter()
        .map(|d| format!("d{}", d))
        .collect::<Vec<_>>()
        .join(" ")
}

fn attack_dice_text(dice: &AttackDice) -> String {
    match dice {
        AttackDice::Flat(v) => format!("rote {}", v),
        AttackDice::Pool(pool) => pool_text(pool),
        AttackDice::Unavailable(why) => format!("unavailable ({})", why),
    }
}

fn defense_dice_text(dice: &DefenseDice) -> String {
    match dice {
        DefenseDice::Pool(pool) => pool_text(pool),
        DefenseDice::Hit => "none (automatic hit)".to_string(),
        DefenseDice::Miss => "none (automatic miss)".to_string(),
    }
}

fn print_calcs(calcs: &Calcs) {
    if let (Some(a), Some(d)) = (&calcs.attacker, &calcs.defender) {
        println!("attacker:      {} ({})", a.name(), a.weapon.name);
        println!("defender:      {} ({})", d.name(), d.armor.name);
        let t = thresholds(d);
        println!(
            "thresholds:    W {} / C {} / I {} / D {}",
            t[0], t[1], t[2], t[3]
        );
    }
    if let Some(setup) = &calcs.setup {
        println!("distance:      {}", setup.distance);
        println!("range:         {}", setup.range);
        println!("attack dice:   {}", attack_dice_text(&setup.attack_dice));
        println!("defense dice:  {}", defense_dice_text(&setup.defense_dice));
    }
    if let Some(r) = &calcs.resolution {
        println!("result:        {}", r.result);
        println!("damage dice:   {}", r.damage_dice_count);
    }
    if let Some(d) = &calcs.damage {
        println!("total damage:  {}", d.total_damage);
        println!("new status:    {}", d.new_status);
        println!("injury:        {}", d.injury);
        println!("awe:           {}", d.awe);
    }
    if let Some(plan) = &calcs.blast {
        let c = plan.explosion.center;
        println!("result:        {}", plan.result);
        println!("blast centre:  ({:.1}, {:.1})", c.x, c.y);
        println!("blast radius:  {}", plan.explosion.radius);
        println!("deviation:     {:.1}", plan.deviation);
    }
    println!("step:          {:?}", calcs.step);
    if let Some(e) = &calcs.error {
        println!("waiting on:    {}", e);
    }
}

fn print_blast(doc: &Document) {
    let setup = &doc.explosion_setup;
    println!(
        "blast at ({:.1}, {:.1}) radius {}",
        setup.center.x, setup.center.y, setup.radius
    );
    let positions = doc.character.list.iter().map(|c| c.position);
    for target in blast_targets(setup, positions) {
        let name = &doc.character.list[target.index].name;
        println!(
            "  [{}] {:<20} distance {:>6.1}  {}d20",
            target.index, name, target.distance, target.dice
        );
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.cmd {
        Cmd::Defaults { yaml } => {
            let doc = Document::with_defaults()?;
            if yaml {
                print!("{}", doc.to_yaml()?);
            } else {
                println!("{}", doc.to_json_pretty()?);
            }
        }
        Cmd::Roll { dice, seed } => {
            let mut rng = dice_for(seed);
            let rolls = rng.roll_pool(&dice);
            let best = rolls.iter().copied().max().unwrap_or(0);
            println!("{:?} best={}", rolls, best);
        }
        Cmd::Calc { file } => {
            let doc = load_document(&file)?;
            print_calcs(&doc.calculate());
        }
        Cmd::AutoRoll { file, seed, blast } => {
            let mut doc = load_document(&file)?;
            let mut dice = dice_for(seed);
            if blast {
                doc.roll_blast(&mut dice);
                save_document(&file, &doc)?;
                print_blast(&doc);
            } else {
                doc.roll_for_me(&mut dice);
                save_document(&file, &doc)?;
                print_calcs(&doc.calculate());
            }
        }
        Cmd::Apply { file } => {
            let mut doc = load_document(&file)?;
            let calcs = doc.calculate();
            match calcs.step {
                Step::DamageResolve if calcs.is_complete() => {}
                Step::Explosion => bail!("explosive attack: use `albedo blast --adopt` instead"),
                step => {
                    let why = calcs
                        .error
                        .as_ref()
                        .map(|e| e.to_string())
                        .unwrap_or_else(|| "incomplete".to_string());
                    bail!("attack is not finished (stopped at {:?}: {})", step, why);
                }
            }
            let item = doc.apply_attack(&calcs)?;
            save_document(&file, &doc)?;
            println!("{}", item);
        }
        Cmd::Blast { file, adopt, apply } => {
            let mut doc = load_document(&file)?;
            if adopt {
                let calcs = doc.calculate();
                doc.adopt_blast(&calcs)
                    .context("current calculation has no blast to adopt")?;
            }
            if apply {
                let items = doc.apply_explosion().context("resolving blast")?;
                for item in &items {
                    println!("{}", item);
                }
            } else {
                print_blast(&doc);
            }
            if adopt || apply {
                save_document(&file, &doc)?;
            }
        }
        Cmd::Log { file, delete } => {
            let mut doc = load_document(&file)?;
            if let Some(index) = delete {
                doc.delete_log_item(index)?;
                save_document(&file, &doc)?;
            }
            if doc.log.is_empty() {
                println!("(log is empty)");
            }
            for (i, item) in doc.log.iter().enumerate() {
                println!("{:>3}. {}", i, item);
            }
        }
        Cmd::Snap { file } => {
            let mut doc = load_document(&file)?;
            doc.snap_positions();
            save_document(&file, &doc)?;
            for c in &doc.character.list {
                println!("{:<20} ({}, {})", c.name, c.position.x, c.position.y);
            }
        }
    }
    Ok(())
}
