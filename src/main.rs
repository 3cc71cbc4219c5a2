//! Practicum - administrative command line
//!
//! Thin entry point over the service layer for a single administrator:
//! roster statistics and reconciliation, ledger entries, the assistant's
//! knowledge corpus, and asking the assistant directly.

use anyhow::Context;
use clap::{Parser, Subcommand};
use practicum_core::{
    AppConfig, AuthoritativeIds, DashboardComposer, DocumentStore, Fields, GeminiClient,
    GroundedResponder, KnowledgeCorpus, KnowledgeDocument, LibsqlStore, NewLogEntry,
    PracticeLedger, RosterEngine, StudentStats, TextGenerator,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn, Level};
use tracing_subscriber::{self, EnvFilter};

#[derive(Parser)]
#[command(name = "practicum")]
#[command(about = "Field-practice ledger, roster tools and policy assistant", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Set log level (overrides the configured level)
    #[arg(short, long)]
    log_level: Option<String>,

    /// Configuration file (default: <config_dir>/practicum/config.toml)
    #[arg(long, env = "PRACTICUM_CONFIG")]
    config: Option<PathBuf>,

    /// Database path (overrides the configured path)
    #[arg(long)]
    db_path: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// List schools by id
    Schools,

    /// Practice statistics for every student
    Stats {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Delete stored students missing from an authoritative id list (JSON array)
    Reconcile {
        /// File containing a JSON array of student ids
        ids_file: PathBuf,
    },

    /// Student record maintenance
    Student {
        #[command(subcommand)]
        action: StudentCommands,
    },

    /// Show the dashboard a student would see
    Dashboard { student_id: String },

    /// Practice log entries
    Log {
        #[command(subcommand)]
        action: LogCommands,
    },

    /// Microteaching evaluations
    Eval {
        #[command(subcommand)]
        action: EvalCommands,
    },

    /// The assistant's knowledge corpus
    Kb {
        #[command(subcommand)]
        action: KbCommands,
    },

    /// Ask the assistant a question
    Ask { question: Vec<String> },

    /// Import provenance
    History {
        #[command(subcommand)]
        action: HistoryCommands,
    },
}

#[derive(Subcommand)]
enum StudentCommands {
    /// Merge a JSON object of fields into a student record
    Update { id: String, fields: String },
    /// Delete a student record
    Delete { id: String },
}

#[derive(Subcommand)]
enum LogCommands {
    /// Add a log entry
    Add {
        student_id: String,
        /// Date of the activity (YYYY-MM-DD or RFC 3339)
        #[arg(long)]
        date: String,
        #[arg(long)]
        activity: String,
        #[arg(long)]
        hours: f64,
    },
    /// List a student's log entries, newest first
    List { student_id: String },
    /// Total logged hours of a student
    Total { student_id: String },
}

#[derive(Subcommand)]
enum EvalCommands {
    /// Add an evaluation from a JSON object
    Add { student_id: String, payload: String },
    /// List a student's evaluations, newest first
    List { student_id: String },
}

#[derive(Subcommand)]
enum KbCommands {
    /// List uploaded documents
    List,
    /// Upload a text file as a document
    Add {
        file: PathBuf,
        /// Document id (default: random)
        #[arg(long)]
        id: Option<String>,
    },
    /// Remove documents by id
    Remove { id: String },
    /// Print the text the assistant is currently grounded in
    Resolve,
}

#[derive(Subcommand)]
enum HistoryCommands {
    /// Show the latest import
    Show,
    /// Record an import of the given file
    Save { file_name: String },
}

fn parse_fields(raw: &str) -> anyhow::Result<Fields> {
    match serde_json::from_str::<serde_json::Value>(raw).context("invalid JSON")? {
        serde_json::Value::Object(fields) => Ok(fields),
        other => anyhow::bail!("expected a JSON object, got {}", other),
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_stats_table(rows: &[StudentStats]) {
    println!(
        "{:<10} {:<28} {:<28} {:>7} {:>6}  {}",
        "ID", "Name", "School", "Hours", "Goal", "Status"
    );
    for row in rows {
        println!(
            "{:<10} {:<28} {:<28} {:>7.1} {:>6.1}  {}",
            row.id, row.name, row.school_name, row.total_hours, row.goal_hours, row.status
        );
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(db_path) = cli.db_path {
        config.database.path = Some(db_path);
        config.database.url = None;
    }

    // Initialize tracing
    let level = match cli.log_level.as_deref().unwrap_or(&config.log_level) {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let level = level.as_str().to_lowercase();
    let filter = EnvFilter::new(format!("practicum={},practicum_core={}", level, level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr) // Write logs to stderr, not stdout
        .init();

    debug!("Practicum v{} starting...", env!("CARGO_PKG_VERSION"));

    let store: Arc<dyn DocumentStore> = Arc::new(LibsqlStore::new(config.connection_mode()).await?);
    let ledger = Arc::new(PracticeLedger::new(store.clone()));

    match cli.command {
        Commands::Schools => {
            let engine = RosterEngine::new(store, ledger);
            print_json(&engine.list_schools().await?)
        }
        Commands::Stats { json } => {
            let engine = RosterEngine::new(store, ledger);
            let rows = engine.aggregate_students().await?;
            if json {
                print_json(&rows)
            } else {
                print_stats_table(&rows);
                Ok(())
            }
        }
        Commands::Reconcile { ids_file } => {
            let raw = std::fs::read_to_string(&ids_file)
                .with_context(|| format!("reading {}", ids_file.display()))?;
            let ids = AuthoritativeIds::from_value(&serde_json::from_str(&raw)?)?;
            let engine = RosterEngine::new(store, ledger);
            let deleted = engine.reconcile_roster(&ids).await?;
            println!("Removed {} students", deleted.len());
            for label in deleted {
                println!("  {}", label);
            }
            Ok(())
        }
        Commands::Student { action } => {
            let engine = RosterEngine::new(store, ledger);
            match action {
                StudentCommands::Update { id, fields } => {
                    engine.update_student(&id, parse_fields(&fields)?).await?;
                }
                StudentCommands::Delete { id } => engine.delete_student(&id).await?,
            }
            Ok(())
        }
        Commands::Dashboard { student_id } => {
            let composer = DashboardComposer::new(store);
            print_json(&composer.compose_dashboard(&student_id).await?)
        }
        Commands::Log { action } => match action {
            LogCommands::Add {
                student_id,
                date,
                activity,
                hours,
            } => {
                let id = ledger
                    .add_log_entry(&student_id, NewLogEntry::new(date, activity, hours))
                    .await?;
                println!("{}", id);
                Ok(())
            }
            LogCommands::List { student_id } => {
                print_json(&ledger.list_log_entries(&student_id).await?)
            }
            LogCommands::Total { student_id } => {
                println!("{}", ledger.student_total_hours(&student_id).await?);
                Ok(())
            }
        },
        Commands::Eval { action } => match action {
            EvalCommands::Add {
                student_id,
                payload,
            } => {
                let id = ledger
                    .add_evaluation(&student_id, parse_fields(&payload)?)
                    .await?;
                println!("{}", id);
                Ok(())
            }
            EvalCommands::List { student_id } => {
                print_json(&ledger.list_evaluations(&student_id).await?)
            }
        },
        Commands::Kb { action } => {
            let corpus = KnowledgeCorpus::new(store);
            match action {
                KbCommands::List => print_json(&corpus.list_documents().await?),
                KbCommands::Add { file, id } => {
                    let content = std::fs::read_to_string(&file)
                        .with_context(|| format!("reading {}", file.display()))?;
                    let filename = file
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_default();
                    let id = id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
                    corpus
                        .add_document(KnowledgeDocument::new(id.clone(), filename, content))
                        .await?;
                    println!("{}", id);
                    Ok(())
                }
                KbCommands::Remove { id } => {
                    if !corpus.remove_document(&id).await? {
                        warn!("No document with id {}", id);
                    }
                    Ok(())
                }
                KbCommands::Resolve => {
                    println!("{}", corpus.resolve_grounding_text().await);
                    Ok(())
                }
            }
        }
        Commands::Ask { question } => {
            let corpus = Arc::new(KnowledgeCorpus::new(store));
            let generator = match config.llm_config() {
                Some(llm) => Some(Arc::new(GeminiClient::new(llm)?) as Arc<dyn TextGenerator>),
                None => None,
            };
            let responder = GroundedResponder::new(corpus, generator);
            println!("{}", responder.answer(&question.join(" ")).await);
            Ok(())
        }
        Commands::History { action } => {
            let engine = RosterEngine::new(store, ledger);
            match action {
                HistoryCommands::Show => print_json(&engine.get_import_history().await?),
                HistoryCommands::Save { file_name } => {
                    engine.save_import_history(&file_name).await?;
                    Ok(())
                }
            }
        }
    }
}
