//! PMOKaraoke : gestion de la file d'une soirée karaoké en ligne de commande

use anyhow::Context;
use clap::{Parser, Subcommand};
use pmoconfig::Config;
use pmokaraoke::{
    EntryDraft, EntryId, KaraokeConfigExt, QueueSnapshot, Scheduler, SqliteStore,
};
use tracing::{Level, debug};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pmokaraoke")]
#[command(about = "Fair song queue for karaoke nights")]
#[command(version)]
struct Cli {
    /// Configuration directory (defaults to $PMOKARAOKE_CONFIG or .pmokaraoke)
    #[arg(long, global = true)]
    config_dir: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a song request to the queue
    Request {
        /// Singer name
        singer: String,

        /// Song title
        title: String,

        /// Submitting device or session (defaults to the singer name)
        #[arg(long)]
        requester_id: Option<String>,

        #[arg(long)]
        artist: Option<String>,

        /// Media reference (path, URL...)
        #[arg(long)]
        media: Option<String>,

        /// Duration in seconds
        #[arg(long)]
        duration: Option<u32>,
    },

    /// Show the queue in order
    List {
        /// Print the queue as JSON
        #[arg(long)]
        json: bool,
    },

    /// Mark an entry as currently playing
    Play { id: i64 },

    /// Clear the currently playing entry
    Stop,

    /// Move to the next entry in the queue
    Next,

    /// Remove an entry from the queue
    Remove { id: i64 },

    /// Re-run the queue sort without adding a request
    Resort,

    /// Set the priority decrement applied to bumped entries
    Regression { value: f64 },
}

fn init_logging(config: &Config) -> anyhow::Result<()> {
    if !config.get_log_enable_console()? {
        return Ok(());
    }

    let raw_level = config.get_log_min_level()?;
    let level = raw_level.parse::<Level>().unwrap_or_else(|_| {
        eprintln!("Unknown log level '{}', using INFO", raw_level);
        Level::INFO
    });

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(level.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}

fn print_queue(snapshot: &QueueSnapshot) {
    if snapshot.entries.is_empty() {
        println!("Queue is empty");
        return;
    }

    for entry in &snapshot.entries {
        let marker = if snapshot.current == Some(entry.id) { ">" } else { " " };
        let artist = entry
            .metadata
            .artist
            .as_deref()
            .map(|artist| format!(" ({})", artist))
            .unwrap_or_default();
        println!(
            "{} {:>3}. #{:<4} {:<20} {}{}  [priority {:.2}, bumped {}]",
            marker,
            entry.position,
            entry.id,
            entry.requester_name,
            entry.metadata.title,
            artist,
            entry.priority,
            entry.regression_count
        );
    }
    println!(
        "{} entries, {} played, regression {}",
        snapshot.entries.len(),
        snapshot.played,
        snapshot.regression_value
    );
}

async fn run(cli: Cli, config: &Config) -> anyhow::Result<()> {
    let db_path = config.queue_db_path()?;
    debug!(path = %db_path.display(), "Opening queue");
    let store = SqliteStore::open(&db_path)
        .with_context(|| format!("cannot open queue at {}", db_path.display()))?;
    let scheduler = Scheduler::with_options(store, config.scheduler_options()?);

    match cli.command {
        Commands::Request {
            singer,
            title,
            requester_id,
            artist,
            media,
            duration,
        } => {
            let requester_id = requester_id.unwrap_or_else(|| singer.clone());
            let mut draft = EntryDraft::new(singer, requester_id, title);
            if let Some(artist) = artist {
                draft = draft.with_artist(artist);
            }
            if let Some(media) = media {
                draft = draft.with_media(media);
            }
            if let Some(duration) = duration {
                draft = draft.with_duration_secs(duration);
            }

            let outcome = scheduler.insert(draft).await?;
            println!(
                "Queued #{} at position {} (priority {:.2})",
                outcome.id, outcome.final_position, outcome.priority
            );
            if !outcome.report.regressed.is_empty() {
                println!("{} entries bumped back", outcome.report.regressed.len());
            }
        }
        Commands::List { json } => {
            let snapshot = scheduler.snapshot().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&snapshot)?);
            } else {
                print_queue(&snapshot);
            }
        }
        Commands::Play { id } => {
            scheduler.set_current(Some(EntryId(id))).await?;
            println!("Now playing #{}", id);
        }
        Commands::Stop => {
            scheduler.set_current(None).await?;
            println!("Playback stopped");
        }
        Commands::Next => match scheduler.advance().await? {
            Some(entry) => println!(
                "Now playing #{}: {} - {}",
                entry.id, entry.requester_name, entry.metadata.title
            ),
            None => println!("End of queue"),
        },
        Commands::Remove { id } => {
            if scheduler.remove(EntryId(id)).await? {
                println!("Removed #{}", id);
            } else {
                println!("No entry #{}", id);
            }
        }
        Commands::Resort => {
            let report = scheduler.resort().await?;
            println!(
                "{} entries moved, {} bumped back",
                report.moved.len(),
                report.regressed.len()
            );
        }
        Commands::Regression { value } => {
            scheduler.set_regression_value(value).await?;
            println!("Regression value set to {}", value);
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result: anyhow::Result<()> = async {
        let config = Config::load_config(cli.config_dir.as_deref().unwrap_or(""))?;
        init_logging(&config)?;
        run(cli, &config).await
    }
    .await;

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
