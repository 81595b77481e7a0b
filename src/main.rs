use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

mod config;
mod db;
mod error;
mod etl;
mod fetch;
mod models;
mod report;

use config::{BatchLimit, Config};
use db::{CharacterStore, CombinedStore, VideoStore};
use error::Result;
use fetch::{HpApiClient, YoutubeClient};

#[derive(Parser)]
#[command(name = "hp-tube", version, about = "Harry Potter characters vs. YouTube statistics")]
struct Cli {
    /// Config file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log progress to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct LimitArg {
    /// Rows to persist in this run (1-25)
    #[arg(long, allow_negative_numbers = true)]
    limit: Option<i64>,
}

impl LimitArg {
    // An explicit --limit must be in range; the config value is clamped.
    fn resolve(&self, config: &Config) -> Result<BatchLimit> {
        match self.limit {
            Some(value) => BatchLimit::strict(value),
            None => Ok(config.batch_limit()),
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ReportKind {
    /// Mentions and total views per character
    Popularity,
    /// Video titles containing each character's name
    Appearances,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch characters from the character API into the character store
    FetchCharacters {
        #[arg(long)]
        db: Option<String>,
        #[command(flatten)]
        limit: LimitArg,
    },
    /// Fetch the next page of videos for one or more channels
    FetchVideos {
        /// Channel id (UC...); repeatable, defaults to the configured channels
        #[arg(long)]
        channel: Vec<String>,
        #[arg(long)]
        db: Option<String>,
        /// YouTube Data API key
        #[arg(long, env = "YOUTUBE_API_KEY", hide_env_values = true)]
        key: Option<String>,
        #[command(flatten)]
        limit: LimitArg,
    },
    /// Copy new videos from the video store into the combined store
    ImportVideos {
        #[arg(long)]
        source: Option<String>,
        #[arg(long)]
        target: Option<String>,
        #[command(flatten)]
        limit: LimitArg,
    },
    /// Copy new characters from the character store into the combined store
    ImportCharacters {
        #[arg(long)]
        source: Option<String>,
        #[arg(long)]
        target: Option<String>,
        #[command(flatten)]
        limit: LimitArg,
    },
    /// Record characters mentioned in video titles
    LinkMentions {
        #[arg(long)]
        db: Option<String>,
        #[command(flatten)]
        limit: LimitArg,
    },
    /// Import videos and characters, then link mentions
    Merge {
        #[arg(long)]
        videos: Option<String>,
        #[arg(long)]
        characters: Option<String>,
        /// Leave characters out of this pass
        #[arg(long)]
        videos_only: bool,
        #[arg(long)]
        target: Option<String>,
        #[command(flatten)]
        limit: LimitArg,
    },
    /// Print an aggregate report from the combined store
    Report {
        #[arg(value_enum)]
        kind: ReportKind,
        #[arg(long)]
        db: Option<String>,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Print row counts of the combined store
    Status {
        #[arg(long)]
        db: Option<String>,
    },
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        tracing::Level::INFO
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    run(cli.command, &config).await
}

async fn run(command: Command, config: &Config) -> Result<()> {
    match command {
        Command::FetchCharacters { db, limit } => {
            let limit = limit.resolve(config)?;
            let store = CharacterStore::open(db.as_deref().unwrap_or(&config.character_db)).await?;
            let source = HpApiClient::new(&config.character_api_url)?;

            let summary = etl::gather_characters(&source, &store, limit).await?;
            println!(
                "Added {} new characters ({} already stored, {} in catalog).",
                summary.inserted, summary.skipped, summary.fetched
            );
            if summary.inserted == limit.get() {
                println!("Run again to add up to {} more.", limit.get());
            }
        }

        Command::FetchVideos {
            channel,
            db,
            key,
            limit,
        } => {
            let limit = limit.resolve(config)?;
            let channels = if channel.is_empty() {
                config.channels.clone()
            } else {
                channel
            };
            if channels.is_empty() {
                return Err(
                    anyhow::anyhow!("pass --channel or list channels in the config file").into(),
                );
            }
            let key = match key {
                Some(key) => key,
                None => config.require_youtube_key()?.to_string(),
            };

            let store = VideoStore::open(db.as_deref().unwrap_or(&config.video_db)).await?;
            let source = YoutubeClient::new(key)?;

            for channel_id in &channels {
                let summary = etl::gather_videos(&source, &store, channel_id, limit).await?;
                println!(
                    "{}: {} ids returned, inserted {}, skipped (duplicates) {}.",
                    channel_id, summary.fetched, summary.inserted, summary.skipped
                );
                match summary.next_page_token {
                    Some(_) => println!("Saved the next page token; the next run will continue."),
                    None => println!("No next page token; the next run starts from the newest videos."),
                }
            }
            println!("Video store now holds {} videos.", store.video_count().await?);
        }

        Command::ImportVideos {
            source,
            target,
            limit,
        } => {
            let limit = limit.resolve(config)?;
            let source = VideoStore::open(source.as_deref().unwrap_or(&config.video_db)).await?;
            let target = CombinedStore::open(target.as_deref().unwrap_or(&config.combined_db)).await?;

            let summary = etl::import_videos(&source, &target, limit).await?;
            if summary.inserted == 0 && summary.skipped == 0 {
                println!("No new videos to import.");
            } else {
                println!(
                    "Imported {} videos ({} skipped).",
                    summary.inserted, summary.skipped
                );
            }
        }

        Command::ImportCharacters {
            source,
            target,
            limit,
        } => {
            let limit = limit.resolve(config)?;
            let source =
                CharacterStore::open(source.as_deref().unwrap_or(&config.character_db)).await?;
            let target = CombinedStore::open(target.as_deref().unwrap_or(&config.combined_db)).await?;

            let summary = etl::import_characters(&source, &target, limit).await?;
            println!(
                "Imported {} characters ({} skipped).",
                summary.inserted, summary.skipped
            );
        }

        Command::LinkMentions { db, limit } => {
            let limit = limit.resolve(config)?;
            let store = CombinedStore::open(db.as_deref().unwrap_or(&config.combined_db)).await?;

            let summary = etl::link_mentions(&store, limit).await?;
            println!("Added {} new character mentions.", summary.added);
        }

        Command::Merge {
            videos,
            characters,
            videos_only,
            target,
            limit,
        } => {
            let limit = limit.resolve(config)?;
            let video_store = VideoStore::open(videos.as_deref().unwrap_or(&config.video_db)).await?;
            let character_store = if videos_only {
                None
            } else {
                Some(
                    CharacterStore::open(characters.as_deref().unwrap_or(&config.character_db))
                        .await?,
                )
            };
            let target = CombinedStore::open(target.as_deref().unwrap_or(&config.combined_db)).await?;

            let summary =
                etl::merge(&video_store, character_store.as_ref(), &target, limit).await?;
            println!(
                "Imported {} videos ({} skipped).",
                summary.videos.inserted, summary.videos.skipped
            );
            if let Some(characters) = summary.characters {
                println!(
                    "Imported {} characters ({} skipped).",
                    characters.inserted, characters.skipped
                );
            }
            println!("Added {} new character mentions.", summary.mentions.added);
        }

        Command::Report { kind, db, json } => {
            let store = CombinedStore::open(db.as_deref().unwrap_or(&config.combined_db)).await?;
            match kind {
                ReportKind::Popularity => {
                    let rows = report::character_popularity(&store).await?;
                    if json {
                        println!("{}", serde_json::to_string_pretty(&rows)?);
                    } else {
                        print!("{}", report::render_popularity(&rows));
                    }
                }
                ReportKind::Appearances => {
                    let rows = report::title_appearance_counts(&store).await?;
                    if json {
                        println!("{}", serde_json::to_string_pretty(&rows)?);
                    } else {
                        print!("{}", report::render_appearances(&rows));
                    }
                }
            }
        }

        Command::Status { db } => {
            let store = CombinedStore::open(db.as_deref().unwrap_or(&config.combined_db)).await?;
            let counts = store.table_counts().await?;
            print!("{}", report::render_counts(&counts));
        }
    }

    Ok(())
}
