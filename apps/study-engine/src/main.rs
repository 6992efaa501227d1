use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use serde_json::json;
use study_engine::{CardRef, CardType, Engine, EngineConfig, Rating, SystemClock};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "study-engine", about = "Spaced-repetition scheduling engine", version)]
struct Cli {
    /// Project the cards belong to
    #[arg(long, global = true, default_value = "default")]
    project: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Due, new and total counts for sections
    Due {
        /// Comma-separated section ids
        #[arg(long, value_delimiter = ',', required = true)]
        sections: Vec<String>,
    },

    /// Pick the next card to study
    Next {
        /// Comma-separated section ids
        #[arg(long, value_delimiter = ',', required = true)]
        sections: Vec<String>,
        /// New cards allowed per study day
        #[arg(long, default_value = "20")]
        new_cap: u32,
        /// Only consider one card type (mcq, passage, flashcard)
        #[arg(long)]
        card_type: Option<CardType>,
    },

    /// Projected intervals for each rating
    Preview {
        card_id: String,
    },

    /// Rate a card
    Review {
        card_id: String,
        /// Section the card belongs to
        #[arg(long)]
        section: String,
        #[arg(long, value_enum)]
        rating: RatingArg,
        #[arg(long, default_value = "mcq")]
        card_type: CardType,
        /// Time spent answering
        #[arg(long, default_value = "0")]
        elapsed_ms: u64,
    },

    /// Undo the most recent review
    Undo,

    /// Hide a card until unsuspended
    Suspend {
        card_id: String,
    },

    /// Hide a card until the next study day
    Bury {
        card_id: String,
    },

    /// Show section scores, or record an answer with --section and --correct
    Score {
        #[arg(long)]
        section: Option<String>,
        #[arg(long, requires = "section")]
        correct: Option<bool>,
    },

    /// Delete a section's cards and zero its score
    Reset {
        section: String,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum RatingArg {
    Again,
    Hard,
    Good,
    Easy,
}

impl From<RatingArg> for Rating {
    fn from(arg: RatingArg) -> Self {
        match arg {
            RatingArg::Again => Rating::Again,
            RatingArg::Hard => Rating::Hard,
            RatingArg::Good => Rating::Good,
            RatingArg::Easy => Rating::Easy,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = EngineConfig::from_env()?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Some(dir) = config.db_path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("creating data directory {}", dir.display()))?;
    }

    let engine = Engine::open(config, SystemClock).await?;
    let result = run(&engine, &cli.project, cli.command).await;
    engine.shutdown().await?;
    result
}

async fn run(engine: &Engine, project: &str, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Due { sections } => print(&engine.count_due(project, &sections).await?),
        Command::Next {
            sections,
            new_cap,
            card_type,
        } => {
            let card_id = engine.pick_next(project, &sections, new_cap, card_type).await?;
            print(&json!({ "card_id": card_id }))
        }
        Command::Preview { card_id } => print(&engine.preview(&card_id).await?),
        Command::Review {
            card_id,
            section,
            rating,
            card_type,
            elapsed_ms,
        } => {
            let card = CardRef {
                card_id,
                section_id: section,
                card_type,
            };
            print(&engine.review(project, card, rating.into(), elapsed_ms).await?)
        }
        Command::Undo => {
            let card_id = engine.undo().await?;
            print(&json!({ "card_id": card_id }))
        }
        Command::Suspend { card_id } => {
            engine.suspend(&card_id).await?;
            print(&json!({ "suspended": card_id }))
        }
        Command::Bury { card_id } => {
            engine.bury(&card_id).await?;
            print(&json!({ "buried": card_id }))
        }
        Command::Score { section, correct } => match (section, correct) {
            (Some(section), Some(correct)) => {
                print(&engine.update_score(project, &section, correct).await?)
            }
            (Some(section), None) => {
                let scores = engine.scores(project).await?;
                print(&scores.iter().find(|s| s.section_id == section))
            }
            (None, _) => print(&engine.scores(project).await?),
        },
        Command::Reset { section } => {
            let deleted = engine.reset_section(project, &section).await?;
            print(&json!({ "section": section, "deleted": deleted }))
        }
    }
}

fn print<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
