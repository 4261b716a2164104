//! teamsim: collaboration-workspace simulator for RL agents.
//!
//! Subcommands:
//!
//! - `tasks`    -- List the task catalog
//! - `actions`  -- Print the action schema as JSON
//! - `run`      -- Roll out a policy and report success rate and reward

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing_subscriber::EnvFilter;

use teamsim::agent::{Policy, RandomPolicy, RuleBasedPolicy, TaskPolicy};
use teamsim::config::SimConfig;
use teamsim::env::{Environment, TaskType};
use teamsim::trajectory::{RolloutCollector, RolloutReport};

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

/// teamsim: episodic collaboration-workspace simulator
#[derive(Parser)]
#[command(name = "teamsim", version, about)]
struct Cli {
    /// Path to a JSON configuration file (uses defaults if not provided).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
enum PolicyChoice {
    /// Deterministic, goal-directed play.
    Task,
    /// Mentions, unread channels and periodic check-ins.
    Rule,
    /// Uniformly random valid actions.
    Random,
}

#[derive(Subcommand)]
enum Commands {
    /// List the available tasks.
    Tasks,

    /// Print the action schema as JSON.
    Actions,

    /// Roll out a policy and print a report.
    Run {
        #[arg(long, value_enum, default_value = "task")]
        policy: PolicyChoice,

        /// Pin every episode to one task (e.g. `meeting_joiner`).
        #[arg(long, value_parser = parse_task)]
        task: Option<TaskType>,

        /// Number of episodes (defaults to `rollout.episodes` from the config).
        #[arg(long)]
        episodes: Option<usize>,

        /// Seed for task selection and the policy RNG.
        #[arg(long)]
        seed: Option<u64>,

        /// Write the collected trajectories here as JSON.
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn parse_task(s: &str) -> Result<TaskType, String> {
    TaskType::from_str_loose(s).ok_or_else(|| {
        let known: Vec<&str> = TaskType::ALL.iter().map(|t| t.as_str()).collect();
        format!("unknown task '{s}' (expected one of: {})", known.join(", "))
    })
}

// ---------------------------------------------------------------------------
// Entrypoint
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    // Initialise tracing (reads RUST_LOG env var, defaults to info).
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => SimConfig::load(path)?,
        None => SimConfig::default(),
    };

    match cli.command {
        Commands::Tasks => cmd_tasks(&config),
        Commands::Actions => cmd_actions(&config),
        Commands::Run {
            policy,
            task,
            episodes,
            seed,
            output,
        } => cmd_run(config, policy, task, episodes, seed, output.as_deref()),
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

fn cmd_tasks(config: &SimConfig) -> Result<()> {
    let env = Environment::new(config.env.clone());
    println!("Tasks:");
    for task in env.tasks() {
        println!("  {}", task.task_type);
        println!("    {} -- {}", task.name, task.description);
        println!("    reward: {}  max steps: {}", task.reward, task.max_steps);
    }
    Ok(())
}

fn cmd_actions(config: &SimConfig) -> Result<()> {
    let env = Environment::new(config.env.clone());
    let json = serde_json::to_string_pretty(&env.available_actions())?;
    println!("{json}");
    Ok(())
}

fn cmd_run(
    mut config: SimConfig,
    choice: PolicyChoice,
    task: Option<TaskType>,
    episodes: Option<usize>,
    seed: Option<u64>,
    output: Option<&Path>,
) -> Result<()> {
    if seed.is_some() {
        config.env.seed = seed;
    }
    let episodes = episodes.unwrap_or(config.rollout.episodes);
    tracing::info!(policy = ?choice, episodes, task = ?task, "Running rollouts");

    let mut env = Environment::new(config.env.clone());
    let mut policy = create_policy(choice, seed, config.rollout.check_in_interval);
    let collector = RolloutCollector::from_settings(&config.rollout).with_task(task);

    let trajectories = collector.collect(&mut env, policy.as_mut(), episodes)?;
    let report = RolloutReport::from_trajectories(policy.name(), &trajectories);
    print!("{report}");

    if let Some(output) = output {
        if let Some(parent) = output.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(&trajectories)?;
        std::fs::write(output, json)
            .with_context(|| format!("Failed to write {}", output.display()))?;
        tracing::info!(path = %output.display(), count = trajectories.len(), "Saved trajectories");
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Policy construction
// ---------------------------------------------------------------------------

fn create_policy(
    choice: PolicyChoice,
    seed: Option<u64>,
    check_in_interval: usize,
) -> Box<dyn Policy> {
    let rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    match choice {
        PolicyChoice::Task => Box::new(TaskPolicy::new()),
        PolicyChoice::Rule => Box::new(RuleBasedPolicy::new(rng, check_in_interval)),
        PolicyChoice::Random => Box::new(RandomPolicy::new(rng)),
    }
}
