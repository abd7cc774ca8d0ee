use crate::config::{Catalog, parse_config_id};
use crate::logging::init_logging;
use crate::session::{SessionManager, StepReport};
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use kitchen_core::AppInfo;
use kitchen_core::belief::Trait;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "kitchen-trust",
    author,
    version,
    about = "Belief-augmented AI partner for a two-player cooperative kitchen"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the configurations a session can be reset into
    Catalog {
        /// Catalog YAML; the built-in catalog when omitted
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Load and validate a catalog file
    Validate {
        #[arg(long)]
        config: PathBuf,
    },
    /// Drive one session with a scripted key sequence
    Play(PlayArgs),
}

#[derive(Args, Debug)]
pub struct PlayArgs {
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Configuration id; defaults to the catalog's default configuration
    #[arg(long)]
    pub config_id: Option<String>,
    /// Layout half of the id, used together with --model
    #[arg(long)]
    pub layout: Option<String>,
    #[arg(long)]
    pub model: Option<String>,
    /// Comma-separated key names, e.g. ArrowUp,ArrowLeft
    #[arg(long, value_delimiter = ',')]
    pub keys: Vec<String>,
    #[arg(long)]
    pub seed: Option<u64>,
    /// Print one JSON object per step instead of a table
    #[arg(long)]
    pub json: bool,
}

pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Catalog { config } => list(config),
        Command::Validate { config } => validate(config),
        Command::Play(args) => play(args),
    }
}

fn list(config: Option<PathBuf>) -> Result<()> {
    let catalog = Catalog::load(config.as_deref()).context("loading catalog")?;
    println!(
        "{} {} ({})",
        AppInfo::name(),
        AppInfo::version(),
        AppInfo::codename()
    );
    println!(
        "{:<18} {:<11} {:<16} {:<10} {:>7}",
        "config", "layout", "policy", "belief", "cadence"
    );
    for (id, spec) in &catalog.configurations {
        let belief = spec
            .belief
            .as_ref()
            .map(|profile| format!("h{}", profile.context))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<18} {:<11} {:<16} {:<10} {:>7}",
            id,
            spec.layout,
            spec.policy.as_deref().unwrap_or("-"),
            belief,
            spec.reset_cadence
        );
    }
    Ok(())
}

fn validate(config: PathBuf) -> Result<()> {
    let catalog = Catalog::from_path(&config)
        .with_context(|| format!("validating {}", config.display()))?;
    println!(
        "catalog OK: {} configurations, {} models, {} estimators",
        catalog.configurations.len(),
        catalog.models.len(),
        catalog.estimators.len()
    );
    Ok(())
}

fn play(args: PlayArgs) -> Result<()> {
    let mut catalog = Catalog::load(args.config.as_deref()).context("loading catalog")?;
    if let Some(seed) = args.seed {
        catalog.seed = seed;
    }
    let _guard = init_logging(&catalog.logging)?;

    let config_id = match (&args.config_id, &args.layout, &args.model) {
        (None, None, None) => catalog.default_config.clone(),
        (config_id, layout, model) => {
            parse_config_id(layout.as_deref(), model.as_deref(), config_id.as_deref())?
        }
    };

    let manager = SessionManager::new(catalog);
    let session = manager.new_session();
    let start = session
        .reset(&config_id)
        .with_context(|| format!("resetting into '{config_id}'"))?;

    if !args.json {
        println!(
            "session {} on {} (seed {})",
            start.session_id,
            start.config_id,
            manager.catalog().seed
        );
    }

    let mut last: Option<StepReport> = None;
    for key in &args.keys {
        let report = session.step(key, None)?;
        if args.json {
            println!("{}", serde_json::to_string(&report)?);
        } else {
            print_step(key, &report);
        }
        last = Some(report);
    }

    if !args.json {
        let snapshot = match last {
            Some(report) => report.snapshot,
            None => start,
        };
        println!(
            "steps {} | steps left {} | total reward {:.1} | dishes served {}",
            snapshot.cur_step,
            snapshot.steps_left,
            snapshot.cumulative_reward,
            snapshot.dishes_served
        );
    }
    Ok(())
}

fn print_step(key: &str, report: &StepReport) {
    let snapshot = &report.snapshot;
    let robot = snapshot
        .robot_last_action
        .as_ref()
        .filter(|_| report.advanced)
        .map(|record| record.arrow)
        .unwrap_or("-");
    let belief = Trait::ALL
        .iter()
        .map(|&which| format!("{}={:.3}", which.label(), snapshot.belief.mean(which)))
        .collect::<Vec<_>>()
        .join(" ");
    println!(
        "step {:>3} | key {:<10} | robot {:<10} | reward {:>7.1} | total {:>7.1} | {}",
        snapshot.cur_step, key, robot, report.reward, snapshot.cumulative_reward, belief
    );
}
