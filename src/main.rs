//! Starboard - household chore and reward engine
//!
//! CLI entry point with global panic handler.

use std::io::Write;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use starboard::cli::audit::AuditOptions;
use starboard::cli::catalog::{RewardSpec, TaskSpec};
use starboard::cli::{
    format_output, AuditCommand, CatalogCommand, ChildCommand, CommandOutput, CustomCommand,
    DecideCommand, OutputOptions, QueueCommand, RedeemCommand, SubmitCommand,
};
use starboard::config::{starboard_home, Config};
use starboard::core::{Decision, StarType};
use starboard::engine::RewardEngine;
use starboard::error::exit_codes;
use starboard::notify::JournalNotifier;
use starboard::storage::FileHouseholdStore;
use starboard::workflow::CustomRewardDraft;

/// Environment variable holding the log filter.
const LOG_ENV: &str = "STARBOARD_LOG";

// =============================================================================
// CLI Definition
// =============================================================================

/// Starboard - household chore and reward engine
#[derive(Parser)]
#[command(name = "starboard")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output as JSON
    #[arg(long, short, global = true)]
    json: bool,

    /// Suppress output
    #[arg(long, short, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// [Parent] Manage child profiles
    Child {
        #[command(subcommand)]
        action: ChildAction,
    },

    /// [Parent] Add a task to the catalog
    Task {
        #[command(subcommand)]
        action: TaskAction,
    },

    /// [Parent] Add a reward to the catalog
    Reward {
        #[command(subcommand)]
        action: RewardAction,
    },

    /// [Child] Submit a task completion
    Submit {
        /// Child submitting the task
        child_id: String,
        /// Task that was completed
        task_id: String,
    },

    /// [Child] Request a catalog reward
    Redeem {
        /// Child spending stars
        child_id: String,
        /// Reward requested
        reward_id: String,
    },

    /// [Child/Parent] Request or price a custom reward
    Custom {
        #[command(subcommand)]
        action: CustomAction,
    },

    /// [Parent] List items waiting for approval
    Queue {
        /// Family to list
        family_id: String,
    },

    /// [Parent] Approve or reject a pending item
    Decide {
        #[command(subcommand)]
        target: DecideTarget,
    },

    /// [Parent] Show a child's history and reconcile balances
    Audit {
        /// Child to audit
        child_id: String,
        /// Show only the most recent records of each kind
        #[arg(long, short)]
        limit: Option<usize>,
    },
}

#[derive(Subcommand)]
enum ChildAction {
    /// Register a child
    Add {
        id: String,
        #[arg(long)]
        family: String,
        #[arg(long)]
        name: String,
        /// Trust level (1-5)
        #[arg(long, default_value = "1")]
        trust: u8,
    },
    /// Show balances and streaks
    Show { id: String },
}

#[derive(Subcommand)]
enum TaskAction {
    /// Add or replace a task
    Add {
        id: String,
        #[arg(long)]
        family: String,
        #[arg(long)]
        title: String,
        /// Stars awarded per completion
        #[arg(long)]
        stars: u32,
        #[arg(long, value_enum, default_value = "growth")]
        star_type: StarTypeArg,
        /// Child allowed to submit the task (repeatable)
        #[arg(long = "assign")]
        assigned: Vec<String>,
        /// Category selecting a trust override
        #[arg(long)]
        category: Option<String>,
        /// Save the task as inactive
        #[arg(long)]
        inactive: bool,
    },
}

#[derive(Subcommand)]
enum RewardAction {
    /// Add or replace a reward
    Add {
        id: String,
        #[arg(long)]
        family: String,
        #[arg(long)]
        title: String,
        /// Stars the reward costs
        #[arg(long)]
        cost: u32,
        #[arg(long, value_enum, default_value = "fun")]
        star_type: StarTypeArg,
        /// Redeem without parent approval
        #[arg(long)]
        no_approval: bool,
        /// Save the reward as inactive
        #[arg(long)]
        inactive: bool,
    },
}

#[derive(Subcommand)]
enum CustomAction {
    /// Ask for a reward outside the catalog
    Request {
        child_id: String,
        /// What the child wants
        name: String,
        #[arg(long)]
        link: Option<String>,
        #[arg(long)]
        image: Option<String>,
        #[arg(long, value_enum)]
        star_type: Option<StarTypeArg>,
    },
    /// Set the star price of a pending request
    Price { id: String, stars: u32 },
}

#[derive(Subcommand)]
enum DecideTarget {
    /// Decide a pending task completion
    Completion {
        id: String,
        #[arg(value_enum)]
        decision: DecisionArg,
    },
    /// Decide a pending reward redemption
    Redemption {
        id: String,
        #[arg(value_enum)]
        decision: DecisionArg,
    },
    /// Decide a priced custom reward request
    Custom {
        id: String,
        #[arg(value_enum)]
        decision: DecisionArg,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum DecisionArg {
    Approve,
    Reject,
}

impl From<DecisionArg> for Decision {
    fn from(arg: DecisionArg) -> Self {
        match arg {
            DecisionArg::Approve => Decision::Approve,
            DecisionArg::Reject => Decision::Reject,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum StarTypeArg {
    Growth,
    Fun,
}

impl From<StarTypeArg> for StarType {
    fn from(arg: StarTypeArg) -> Self {
        match arg {
            StarTypeArg::Growth => StarType::Growth,
            StarTypeArg::Fun => StarType::Fun,
        }
    }
}

// =============================================================================
// Main Entry Point
// =============================================================================

fn main() -> ExitCode {
    setup_panic_handler();
    setup_logging();

    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("starboard error: {}", e);
            ExitCode::from(exit_codes::ERROR as u8)
        }
    }
}

fn setup_panic_handler() {
    std::panic::set_hook(Box::new(|info| {
        eprintln!("starboard panic: {}", info);

        if let Some(home) = starboard_home() {
            let crash_log = home.join("crash.log");
            if let Ok(mut file) = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&crash_log)
            {
                let timestamp = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
                let _ = writeln!(file, "[{}] {}", timestamp, info);
            }
        }

        std::process::exit(exit_codes::CRASH);
    }));
}

/// Log to stderr, filtered by `STARBOARD_LOG` (default `warn`).
fn setup_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

type CliEngine = RewardEngine<FileHouseholdStore, Option<JournalNotifier>>;

fn open_engine() -> Result<CliEngine, Box<dyn std::error::Error>> {
    let config = Config::load();
    let store = FileHouseholdStore::from_config(&config)?;
    let journal = config
        .journal
        .enabled
        .then(|| JournalNotifier::in_dir(store.data_dir()));
    Ok(RewardEngine::new(store, config)?.with_notifier(journal))
}

fn emit<O: CommandOutput>(output: &O, options: &OutputOptions) -> ExitCode {
    let formatted = format_output(output, options);
    if !formatted.is_empty() {
        print!("{}", formatted);
    }
    ExitCode::from(output.exit_code() as u8)
}

fn run() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let options = OutputOptions {
        json: cli.json,
        quiet: cli.quiet,
    };
    let engine = open_engine()?;

    let code = match cli.command {
        Commands::Child { action } => {
            let cmd = ChildCommand::new(&engine);
            match action {
                ChildAction::Add {
                    id,
                    family,
                    name,
                    trust,
                } => emit(&cmd.add(&id, &family, &name, trust), &options),
                ChildAction::Show { id } => emit(&cmd.show(&id), &options),
            }
        }
        Commands::Task {
            action:
                TaskAction::Add {
                    id,
                    family,
                    title,
                    stars,
                    star_type,
                    assigned,
                    category,
                    inactive,
                },
        } => {
            let spec = TaskSpec {
                id,
                family_id: family,
                title,
                star_value: stars,
                star_type: star_type.into(),
                assigned_child_ids: assigned,
                category,
                inactive,
            };
            emit(&CatalogCommand::new(&engine).add_task(&spec), &options)
        }
        Commands::Reward {
            action:
                RewardAction::Add {
                    id,
                    family,
                    title,
                    cost,
                    star_type,
                    no_approval,
                    inactive,
                },
        } => {
            let spec = RewardSpec {
                id,
                family_id: family,
                title,
                star_cost: cost,
                star_type: star_type.into(),
                requires_approval: !no_approval,
                inactive,
            };
            emit(&CatalogCommand::new(&engine).add_reward(&spec), &options)
        }
        Commands::Submit { child_id, task_id } => emit(
            &SubmitCommand::new(&engine).run(&child_id, &task_id),
            &options,
        ),
        Commands::Redeem {
            child_id,
            reward_id,
        } => emit(
            &RedeemCommand::new(&engine).run(&child_id, &reward_id),
            &options,
        ),
        Commands::Custom { action } => {
            let cmd = CustomCommand::new(&engine);
            match action {
                CustomAction::Request {
                    child_id,
                    name,
                    link,
                    image,
                    star_type,
                } => {
                    let draft = CustomRewardDraft {
                        reward_name: name,
                        link,
                        image_ref: image,
                        star_type: star_type.map(StarType::from),
                    };
                    emit(&cmd.request(&child_id, &draft), &options)
                }
                CustomAction::Price { id, stars } => emit(&cmd.price(&id, stars), &options),
            }
        }
        Commands::Queue { family_id } => {
            emit(&QueueCommand::new(&engine).run(&family_id), &options)
        }
        Commands::Decide { target } => {
            let cmd = DecideCommand::new(&engine);
            let output = match target {
                DecideTarget::Completion { id, decision } => cmd.completion(&id, decision.into()),
                DecideTarget::Redemption { id, decision } => cmd.redemption(&id, decision.into()),
                DecideTarget::Custom { id, decision } => cmd.custom(&id, decision.into()),
            };
            emit(&output, &options)
        }
        Commands::Audit { child_id, limit } => emit(
            &AuditCommand::new(&engine).run(&child_id, &AuditOptions { limit }),
            &options,
        ),
    };

    Ok(code)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(exit_codes::SUCCESS, 0);
        assert_eq!(exit_codes::ERROR, 1);
        assert_eq!(exit_codes::REFUSED, 2);
        assert_eq!(exit_codes::CRASH, 3);
    }

    #[test]
    fn test_cli_parse_submit() {
        let cli = Cli::parse_from(["starboard", "submit", "kid-1", "dishes", "--json"]);
        assert!(cli.json);
        match cli.command {
            Commands::Submit { child_id, task_id } => {
                assert_eq!(child_id, "kid-1");
                assert_eq!(task_id, "dishes");
            }
            _ => panic!("Expected Submit command"),
        }
    }

    #[test]
    fn test_cli_parse_decide() {
        let cli = Cli::parse_from(["starboard", "decide", "redemption", "rdm_1", "reject"]);
        match cli.command {
            Commands::Decide {
                target: DecideTarget::Redemption { id, decision },
            } => {
                assert_eq!(id, "rdm_1");
                assert_eq!(Decision::from(decision), Decision::Reject);
            }
            _ => panic!("Expected Decide redemption"),
        }
    }

    #[test]
    fn test_cli_parse_task_add() {
        let cli = Cli::parse_from([
            "starboard",
            "task",
            "add",
            "dishes",
            "--family",
            "fam",
            "--title",
            "Dishes",
            "--stars",
            "10",
            "--star-type",
            "fun",
            "--assign",
            "kid-1",
            "--assign",
            "kid-2",
        ]);
        match cli.command {
            Commands::Task {
                action:
                    TaskAction::Add {
                        stars,
                        star_type,
                        assigned,
                        inactive,
                        ..
                    },
            } => {
                assert_eq!(stars, 10);
                assert_eq!(StarType::from(star_type), StarType::Fun);
                assert_eq!(assigned, vec!["kid-1", "kid-2"]);
                assert!(!inactive);
            }
            _ => panic!("Expected Task add"),
        }
    }

    #[test]
    fn test_cli_parse_custom_request() {
        let cli = Cli::parse_from([
            "starboard", "custom", "request", "kid-1", "Lego set", "--link", "https://x", "-q",
        ]);
        assert!(cli.quiet);
        match cli.command {
            Commands::Custom {
                action:
                    CustomAction::Request {
                        name,
                        link,
                        star_type,
                        ..
                    },
            } => {
                assert_eq!(name, "Lego set");
                assert_eq!(link.as_deref(), Some("https://x"));
                assert!(star_type.is_none());
            }
            _ => panic!("Expected Custom request"),
        }
    }

    #[test]
    fn test_cli_parse_audit_limit() {
        let cli = Cli::parse_from(["starboard", "audit", "kid-1", "--limit", "5"]);
        match cli.command {
            Commands::Audit { child_id, limit } => {
                assert_eq!(child_id, "kid-1");
                assert_eq!(limit, Some(5));
            }
            _ => panic!("Expected Audit command"),
        }
    }

    #[test]
    fn test_reward_requires_approval_by_default() {
        let cli = Cli::parse_from([
            "starboard", "reward", "add", "movie", "--family", "fam", "--title", "Movie",
            "--cost", "20",
        ]);
        match cli.command {
            Commands::Reward {
                action: RewardAction::Add { no_approval, .. },
            } => assert!(!no_approval),
            _ => panic!("Expected Reward add"),
        }
    }
}
