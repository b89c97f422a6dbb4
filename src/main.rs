mod accounts;
mod cards;
mod db;
mod error;
mod models;
mod review;
mod study;
mod transfer;
mod tui;

use clap::{ArgAction, Parser, Subcommand};
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::PathBuf;
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

use db::Database;
use error::Error;
use models::{
    success_rate, CardDraft, CardQuery, CardSort, JsonOutput, ReviewOutcome, SessionHandle, User,
};
use review::ReviewEngine;
use tui::widgets::{one_line, truncate};

const DEFAULT_DB_NAME: &str = "flashcards.db";
const DB_ENV: &str = "FLASHCARDS_DB";
const USER_ENV: &str = "FLASHCARDS_USER";

#[derive(Parser)]
#[command(name = "flashcards")]
#[command(about = "Personal flashcards with topic filters, study sessions and progress tracking")]
#[command(version)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Act as this user (defaults to $FLASHCARDS_USER)
    #[arg(long, short, global = true)]
    user: Option<String>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(long, short, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database
    Init,

    /// Manage users
    #[command(subcommand)]
    User(UserCommands),

    /// Manage flashcards
    #[command(subcommand)]
    Card(CardCommands),

    /// List your topics
    Topics,

    /// Study interactively, one card at a time
    Study {
        /// Only study cards in this topic
        #[arg(long, short)]
        topic: Option<String>,

        /// Skip cards already marked known
        #[arg(long)]
        only_unknown: bool,
    },

    /// Start or end a scripted study session
    #[command(subcommand)]
    Session(SessionCommands),

    /// Record a review outcome for a card
    Mark {
        /// Card ID
        id: i64,

        /// Review outcome: known/review
        #[arg(long, short)]
        outcome: String,

        /// Session handle to tally against
        #[arg(long, short)]
        session: Option<i64>,
    },

    /// Show the dashboard summary
    Dashboard,

    /// Show detailed statistics
    Stats,

    /// Export your cards as CSV
    Export {
        /// Write to this file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Import cards from a CSV file
    Import {
        /// CSV file to read
        file: PathBuf,
    },

    /// Launch interactive terminal UI
    Tui,
}

#[derive(Subcommand)]
enum UserCommands {
    /// Register a new user
    Register {
        /// Username
        name: String,
    },

    /// List users
    List,

    /// Delete a user and all of their cards and sessions
    Delete {
        /// Username
        name: String,
    },
}

#[derive(Subcommand)]
enum CardCommands {
    /// Add a new card
    Add {
        /// Question side
        front: String,

        /// Answer side
        back: String,

        /// Topic label
        #[arg(long, short)]
        topic: String,
    },

    /// List cards
    List {
        /// Case-insensitive text search over front, back and topic
        #[arg(long, short)]
        search: Option<String>,

        /// Filter by exact topic
        #[arg(long, short)]
        topic: Option<String>,

        /// Sort order: newest/oldest/topic/-topic
        #[arg(long)]
        sort: Option<String>,
    },

    /// Show card details
    Show {
        /// Card ID
        id: i64,
    },

    /// Edit a card
    Edit {
        /// Card ID
        id: i64,

        #[arg(long, short)]
        front: Option<String>,

        #[arg(long, short)]
        back: Option<String>,

        #[arg(long, short)]
        topic: Option<String>,
    },

    /// Delete a card
    Delete {
        /// Card ID
        id: i64,
    },
}

#[derive(Subcommand)]
enum SessionCommands {
    /// Select a study set and open a session
    Start {
        /// Only study cards in this topic
        #[arg(long, short)]
        topic: Option<String>,

        /// Skip cards already marked known
        #[arg(long)]
        only_unknown: bool,
    },

    /// End a session
    End {
        /// Session handle
        handle: i64,
    },
}

fn get_db_path() -> PathBuf {
    if let Ok(path) = std::env::var(DB_ENV) {
        return PathBuf::from(path);
    }

    let config_dir = dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("flashcards");

    std::fs::create_dir_all(&config_dir).ok();
    config_dir.join(DEFAULT_DB_NAME)
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let json = cli.json;
    if let Err(e) = run(cli) {
        report(&*e, json);
        std::process::exit(1);
    }
}

fn report(err: &(dyn std::error::Error + 'static), json: bool) {
    let message = match err.downcast_ref::<Error>() {
        Some(e) if e.is_internal() => {
            error!(error = ?e, "operation failed");
            e.to_string()
        }
        Some(Error::UnknownUser(name)) => format!(
            "unknown user '{}'; create it with `flashcards user register {}`",
            name, name
        ),
        _ => err.to_string(),
    };

    if json {
        if let Ok(out) = serde_json::to_string(&JsonOutput::<()>::err(message.as_str())) {
            println!("{}", out);
            return;
        }
    }
    eprintln!("Error: {}", message);
}

fn emit<T: Serialize>(data: T) -> serde_json::Result<()> {
    println!("{}", serde_json::to_string(&JsonOutput::ok(data))?);
    Ok(())
}

fn acting_user(db: &Database, flag: Option<&str>) -> Result<User, Box<dyn std::error::Error>> {
    let name = match flag {
        Some(name) => name.to_string(),
        None => std::env::var(USER_ENV).map_err(|_| {
            format!(
                "no user selected; pass --user <name> or set {} (create one with `flashcards user register <name>`)",
                USER_ENV
            )
        })?,
    };
    Ok(accounts::resolve(db, &name)?)
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let db_path = get_db_path();
    let db = Database::open(&db_path).map_err(Error::from)?;
    db.init().map_err(Error::from)?;

    let user_flag = cli.user.as_deref();

    match cli.command {
        Commands::Init => {
            if cli.json {
                emit(serde_json::json!({ "path": db_path }))?;
            } else {
                println!("Database initialized at: {}", db_path.display());
            }
        }

        Commands::User(UserCommands::Register { name }) => {
            let user = accounts::register(&db, &name)?;
            if cli.json {
                emit(&user)?;
            } else {
                println!("Registered user '{}' with ID: {}", user.username, user.id);
            }
        }

        Commands::User(UserCommands::List) => {
            let users = accounts::list(&db)?;
            if cli.json {
                emit(&users)?;
            } else if users.is_empty() {
                println!("No users found.");
            } else {
                println!("{:<5} {:<30} CREATED", "ID", "USERNAME");
                println!("{}", "-".repeat(60));
                for user in users {
                    println!("{:<5} {:<30} {}", user.id, truncate(&user.username, 28), user.created_at);
                }
            }
        }

        Commands::User(UserCommands::Delete { name }) => {
            accounts::remove(&db, &name)?;
            if cli.json {
                emit(())?;
            } else {
                println!("User '{}' deleted.", name);
            }
        }

        Commands::Card(card_cmd) => {
            let user = acting_user(&db, user_flag)?;
            run_card(&db, &user, card_cmd, cli.json)?;
        }

        Commands::Topics => {
            let user = acting_user(&db, user_flag)?;
            let topics = cards::topics(&db, &user)?;
            if cli.json {
                emit(&topics)?;
            } else if topics.is_empty() {
                println!("No topics found.");
            } else {
                for topic in topics {
                    println!("{}", topic);
                }
            }
        }

        Commands::Study {
            topic,
            only_unknown,
        } => {
            let user = acting_user(&db, user_flag)?;
            let engine = ReviewEngine::new(&db);
            let pass = engine.start_study(&user, topic.as_deref().unwrap_or(""), only_unknown)?;

            if pass.cards.is_empty() {
                if cli.json {
                    emit(&pass)?;
                } else {
                    println!("No cards to study.");
                }
                return Ok(());
            }

            let stdin = io::stdin();
            let summary = if cli.json {
                study::run_study(&engine, &user, pass, stdin.lock(), io::stderr())?
            } else {
                study::run_study(&engine, &user, pass, stdin.lock(), io::stdout())?
            };
            if cli.json {
                emit(&summary)?;
            }
        }

        Commands::Session(SessionCommands::Start {
            topic,
            only_unknown,
        }) => {
            let user = acting_user(&db, user_flag)?;
            let engine = ReviewEngine::new(&db);
            let pass = engine.start_study(&user, topic.as_deref().unwrap_or(""), only_unknown)?;

            if cli.json {
                emit(&pass)?;
            } else if let Some(handle) = pass.session {
                println!("Session {} started with {} cards.", handle, pass.cards.len());
                println!();
                println!("{:<5} {:<20} FRONT", "ID", "TOPIC");
                println!("{}", "-".repeat(70));
                for card in &pass.cards {
                    println!(
                        "{:<5} {:<20} {}",
                        card.id,
                        truncate(&card.topic, 18),
                        truncate(&one_line(&card.front), 44)
                    );
                }
                println!();
                println!("Record outcomes with:");
                println!(
                    "  flashcards mark <card-id> --outcome <known|review> --session {}",
                    handle
                );
                println!("Finish with:");
                println!("  flashcards session end {}", handle);
            } else {
                println!("No cards to study.");
            }
        }

        Commands::Session(SessionCommands::End { handle }) => {
            let user = acting_user(&db, user_flag)?;
            let engine = ReviewEngine::new(&db);
            let handle = SessionHandle::from_raw(handle);

            // Resolving first keeps foreign handles indistinguishable from missing ones
            engine.session(&user, handle)?;
            engine.end_session(&user, &mut Some(handle))?;
            let session = engine.session(&user, handle)?;

            if cli.json {
                emit(&session)?;
            } else {
                println!(
                    "Session {} ended: {} studied, {} known, {} min.",
                    session.id,
                    session.cards_studied,
                    session.cards_known,
                    session.duration_minutes()
                );
            }
        }

        Commands::Mark {
            id,
            outcome,
            session,
        } => {
            let user = acting_user(&db, user_flag)?;
            let outcome = ReviewOutcome::from_str(&outcome).ok_or_else(|| {
                Error::validation("outcome", format!("'{}' is not one of: known, review", outcome))
            })?;

            let engine = ReviewEngine::new(&db);
            let handle = session.map(SessionHandle::from_raw);
            let result = engine.record_outcome(&user, id, outcome, handle)?;

            if let (Some(h), None) = (handle, &result.session) {
                warn!(session_id = h.id(), "session is not active; review was not tallied");
            }

            if cli.json {
                emit(&result)?;
            } else {
                println!(
                    "Card {} marked {} (reviewed {} times, {}% success).",
                    result.card.id,
                    outcome.as_str(),
                    result.card.times_reviewed,
                    result.card.success_rate()
                );
                if let Some(s) = &result.session {
                    println!(
                        "Session {}: {} studied, {} known.",
                        s.id, s.cards_studied, s.cards_known
                    );
                } else if let Some(h) = handle {
                    println!("Session {} is not active; not tallied.", h);
                }
            }
        }

        Commands::Dashboard => {
            let user = acting_user(&db, user_flag)?;
            let dash = cards::dashboard(&db, &user)?;
            if cli.json {
                emit(&dash)?;
            } else {
                println!("=== {}'s Flashcards ===", user.username);
                println!("Total cards: {}", dash.total_cards);
                println!("Known: {}", dash.known_cards);
                println!("To review: {}", dash.review_cards);

                if !dash.top_topics.is_empty() {
                    println!();
                    println!("--- Top Topics ---");
                    for t in &dash.top_topics {
                        println!("{:<30} {}", truncate(&t.topic, 28), t.count);
                    }
                }

                if !dash.recent_sessions.is_empty() {
                    println!();
                    println!("--- Recent Sessions ---");
                    for s in &dash.recent_sessions {
                        println!("{} ({} studied, {} known)", s, s.cards_studied, s.cards_known);
                    }
                }
            }
        }

        Commands::Stats => {
            let user = acting_user(&db, user_flag)?;
            let stats = cards::statistics(&db, &user)?;
            if cli.json {
                emit(&stats)?;
            } else {
                println!("=== Study Statistics ===");
                println!("Total cards: {}", stats.total_cards);
                println!("Known: {}", stats.known_cards);
                println!("To review: {}", stats.review_cards);
                println!("Total reviews: {}", stats.total_reviews);

                if !stats.topics.is_empty() {
                    println!();
                    println!("{:<30} {:>6} {:>6} {:>6}", "TOPIC", "CARDS", "KNOWN", "%");
                    println!("{}", "-".repeat(51));
                    for t in &stats.topics {
                        println!(
                            "{:<30} {:>6} {:>6} {:>5}%",
                            truncate(&t.topic, 28),
                            t.total,
                            t.known,
                            success_rate(t.known, t.total)
                        );
                    }
                }

                if !stats.recent_sessions.is_empty() {
                    println!();
                    println!("--- Recent Sessions ---");
                    for s in &stats.recent_sessions {
                        println!(
                            "{} ({} studied, {} known, {} min)",
                            s,
                            s.cards_studied,
                            s.cards_known,
                            s.duration_minutes()
                        );
                    }
                }
            }
        }

        Commands::Export { output } => {
            let user = acting_user(&db, user_flag)?;
            match output {
                Some(path) => {
                    let rows = transfer::export_cards(&db, &user, File::create(&path)?)?;
                    if cli.json {
                        emit(serde_json::json!({ "rows": rows, "path": path }))?;
                    } else {
                        println!("Exported {} cards to {}", rows, path.display());
                    }
                }
                None if cli.json => {
                    let mut buf = Vec::new();
                    let rows = transfer::export_cards(&db, &user, &mut buf)?;
                    emit(serde_json::json!({
                        "rows": rows,
                        "csv": String::from_utf8_lossy(&buf)
                    }))?;
                }
                None => {
                    transfer::export_cards(&db, &user, io::stdout().lock())?;
                }
            }
        }

        Commands::Import { file } => {
            let user = acting_user(&db, user_flag)?;
            let reader = BufReader::new(File::open(&file)?);
            let report = transfer::import_cards(&db, &user, reader)?;
            if cli.json {
                emit(&report)?;
            } else {
                println!("Imported {} cards from {}", report.created, file.display());
            }
        }

        Commands::Tui => {
            let user = acting_user(&db, user_flag)?;
            tui::run(db, user)?;
        }
    }

    Ok(())
}

fn run_card(
    db: &Database,
    user: &User,
    cmd: CardCommands,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    match cmd {
        CardCommands::Add { front, back, topic } => {
            let card = cards::create(db, user, &CardDraft::new(&front, &back, &topic))?;
            if json {
                emit(&card)?;
            } else {
                println!("Added card {} ({})", card.id, card);
            }
        }

        CardCommands::List {
            search,
            topic,
            sort,
        } => {
            let sort = match sort {
                Some(s) => CardSort::from_str(&s).ok_or_else(|| {
                    Error::validation(
                        "sort",
                        format!("'{}' is not one of: newest, oldest, topic, -topic", s),
                    )
                })?,
                None => CardSort::default(),
            };
            let query = CardQuery {
                search,
                topic,
                sort,
            };

            let list = cards::list(db, user, &query)?;
            if json {
                emit(&list)?;
            } else if list.is_empty() {
                println!("No cards found.");
            } else {
                println!(
                    "{:<5} {:<20} {:<40} {:>7} {:>6}",
                    "ID", "TOPIC", "FRONT", "REVIEWS", "KNOWN"
                );
                println!("{}", "-".repeat(82));
                for card in list {
                    println!(
                        "{:<5} {:<20} {:<40} {:>7} {:>6}",
                        card.id,
                        truncate(&card.topic, 18),
                        truncate(&one_line(&card.front), 38),
                        card.times_reviewed,
                        if card.is_known { "yes" } else { "-" }
                    );
                }
            }
        }

        CardCommands::Show { id } => {
            let card = cards::get(db, user, id)?;
            if json {
                emit(&card)?;
            } else {
                println!("Card {}", card.id);
                println!("Topic: {}", card.topic);
                println!();
                println!("Front:");
                println!("{}", card.front);
                println!();
                println!("Back:");
                println!("{}", card.back);
                println!();
                println!("--- Progress ---");
                println!(
                    "Status: {}",
                    if card.is_known { "known" } else { "needs review" }
                );
                println!(
                    "Reviews: {} ({}% success rate)",
                    card.times_reviewed,
                    card.success_rate()
                );
                if let Some(last) = &card.last_reviewed {
                    println!("Last reviewed: {}", last);
                }
                println!("Created: {}", card.created_at);
            }
        }

        CardCommands::Edit {
            id,
            front,
            back,
            topic,
        } => {
            let current = cards::get(db, user, id)?;
            let draft = CardDraft::new(
                front.as_deref().unwrap_or(&current.front),
                back.as_deref().unwrap_or(&current.back),
                topic.as_deref().unwrap_or(&current.topic),
            );
            let card = cards::update(db, user, id, &draft)?;
            if json {
                emit(&card)?;
            } else {
                println!("Updated card {} ({})", card.id, card);
            }
        }

        CardCommands::Delete { id } => {
            cards::delete(db, user, id)?;
            if json {
                emit(())?;
            } else {
                println!("Card {} deleted.", id);
            }
        }
    }

    Ok(())
}
