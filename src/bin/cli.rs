// Hardcover Mirror - Local cache and search for Hardcover libraries
// Copyright (C) 2025 Henning Berge
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.


use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use hardcover_core::api::mutations::StatusChange;
use hardcover_core::api::HardcoverClient;
use hardcover_core::download::CoverDownloader;
use hardcover_core::logging::{init_logging, LogFormat};
use hardcover_core::search::{self, views, BreadcrumbContext};
use hardcover_core::storage::{Database, ReadingStatus};
use hardcover_core::sync;
use hardcover_core::{Config, HardcoverError};
use serde_json::{json, Value};
use std::process::ExitCode;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "hardcover-cli")]
#[command(about = "Hardcover library mirror for launcher workflows", long_about = None)]
struct Cli {
    /// Multi-line log output on stderr
    #[arg(long, global = true)]
    pretty_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Drop and rebuild the local mirror
    Build {
        /// Skip cover downloads
        #[arg(long)]
        no_covers: bool,
    },
    /// Search the local library
    Library {
        #[arg(default_value = "")]
        query: String,
        #[arg(long, env = "breadCrumb")]
        breadcrumb: Option<String>,
        #[arg(long, env = "current_listID")]
        shelf_id: Option<String>,
        #[arg(long, env = "newStatus")]
        status_id: Option<String>,
        #[arg(long, env = "newRating")]
        rating: Option<String>,
        /// Maximum number of rows
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Search the whole Hardcover catalog
    Search {
        #[arg(default_value = "")]
        query: String,
    },
    /// Rating histogram
    Ratings,
    /// Shelves, flagging the ones holding the current book
    Shelves {
        #[arg(long, env = "current_bookID")]
        book_id: Option<String>,
    },
    /// Status histogram
    Statuses,
    /// Rate a book (0 clears the rating)
    SetRating {
        rating: f64,
        #[arg(long, env = "current_bookID")]
        book_id: String,
    },
    /// Change the reading status (name such as `Read`, or id 1-4)
    SetStatus {
        status: String,
        #[arg(long, env = "current_bookID")]
        book_id: String,
        #[arg(long, env = "current_user_bookID")]
        user_book_id: Option<String>,
    },
    /// Add a book to a shelf or remove it
    ToggleShelf {
        #[arg(value_enum)]
        action: ShelfAction,
        #[arg(long, env = "current_bookID")]
        book_id: String,
        #[arg(long, env = "current_listID")]
        shelf_id: String,
    },
    /// Delete a book from the library
    RemoveBook {
        #[arg(long, env = "current_user_bookID")]
        user_book_id: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ShelfAction {
    #[value(name = "addList")]
    Add,
    #[value(name = "removeList")]
    Remove,
}

/// Parse a numeric context variable
fn parse_id(name: &str, raw: &str) -> Result<i64, HardcoverError> {
    raw.trim()
        .parse()
        .map_err(|_| HardcoverError::invalid_context(name, raw))
}

fn parse_status(raw: &str) -> Result<ReadingStatus, HardcoverError> {
    ReadingStatus::from_label(raw.trim())
        .or_else(|| {
            raw.trim()
                .parse::<i64>()
                .ok()
                .and_then(ReadingStatus::from_id)
                .filter(|s| *s != ReadingStatus::Unset)
        })
        .ok_or_else(|| HardcoverError::invalid_input(format!("Unknown reading status {:?}", raw)))
}

fn client(config: &Config) -> Result<HardcoverClient, HardcoverError> {
    HardcoverClient::new(config.require_token()?)
}

/// Open the store, rebuilding it first when it is missing or outdated
async fn open_store(config: &Config) -> anyhow::Result<Database> {
    config.ensure_dirs()?;

    let client = match config.api_token.as_deref() {
        Some(_) => Some(client(config)?),
        None => None,
    };
    let covers = CoverDownloader::new(config.covers_dir())?;

    Ok(sync::open_mirror(config, client.as_ref(), Some(&covers)).await?)
}

async fn run(command: Commands, config: &Config) -> anyhow::Result<Value> {
    let value = match command {
        Commands::Build { no_covers } => {
            config.ensure_dirs()?;
            let client = client(config)?;
            let db = Database::new(&config.database_path())
                .await
                .context("Failed to open the library store")?;
            let covers = if no_covers {
                None
            } else {
                Some(CoverDownloader::new(config.covers_dir())?)
            };

            let report = sync::rebuild(&db, &client, config, covers.as_ref()).await?;
            db.close().await?;
            serde_json::to_value(report)?
        }

        Commands::Library {
            query,
            breadcrumb,
            shelf_id,
            status_id,
            rating,
            limit,
        } => {
            let db = open_store(config).await?;
            let context = BreadcrumbContext {
                marker: breadcrumb,
                shelf_id,
                status_id,
                rating,
            };

            let outcome =
                search::search_library(db.pool(), &query, context.resolve(), limit).await?;
            serde_json::to_value(outcome)?
        }

        Commands::Search { query } => {
            let db = open_store(config).await?;
            let client = client(config)?;
            let covers = CoverDownloader::new(config.covers_dir())?;

            let results =
                search::search_catalog(&client, db.pool(), config, &query, Some(&covers)).await?;
            serde_json::to_value(results)?
        }

        Commands::Ratings => {
            let db = open_store(config).await?;
            serde_json::to_value(views::rating_counts(db.pool()).await?)?
        }

        Commands::Statuses => {
            let db = open_store(config).await?;
            serde_json::to_value(views::status_counts(db.pool()).await?)?
        }

        Commands::Shelves { book_id } => {
            let db = open_store(config).await?;
            // A malformed book id only loses the on-shelf flags
            let current = book_id.as_deref().and_then(|raw| match parse_id("current_bookID", raw) {
                Ok(id) => Some(id),
                Err(e) => {
                    warn!("{}", e);
                    None
                }
            });
            serde_json::to_value(views::list_shelves(db.pool(), current).await?)?
        }

        Commands::SetRating { rating, book_id } => {
            let book_id = parse_id("current_bookID", &book_id)?;
            let outcome = client(config)?
                .set_rating(book_id, Some(rating).filter(|r| *r > 0.0))
                .await?;
            serde_json::to_value(outcome)?
        }

        Commands::SetStatus {
            status,
            book_id,
            user_book_id,
        } => {
            let status = parse_status(&status)?;
            let book_id = parse_id("current_bookID", &book_id)?;
            let user_book_id = match user_book_id.as_deref().filter(|raw| !raw.trim().is_empty()) {
                Some(raw) => Some(parse_id("current_user_bookID", raw)?),
                None => {
                    let db = open_store(config).await?;
                    views::entry_id_for_book(db.pool(), book_id).await?
                }
            };

            let change = StatusChange::for_book(book_id, user_book_id);
            serde_json::to_value(client(config)?.set_status(change, status).await?)?
        }

        Commands::ToggleShelf {
            action,
            book_id,
            shelf_id,
        } => {
            let book_id = parse_id("current_bookID", &book_id)?;
            let shelf_id = parse_id("current_listID", &shelf_id)?;
            let client = client(config)?;

            let outcome = match action {
                ShelfAction::Add => client.add_to_shelf(book_id, shelf_id).await?,
                ShelfAction::Remove => {
                    let db = open_store(config).await?;
                    let membership = views::find_membership(db.pool(), book_id, shelf_id).await?;
                    info!("Removing book {} from {}", book_id, membership.name);
                    client.remove_from_shelf(membership.list_book_id).await?
                }
            };
            serde_json::to_value(outcome)?
        }

        Commands::RemoveBook { user_book_id } => {
            let user_book_id = parse_id("current_user_bookID", &user_book_id)?;
            serde_json::to_value(client(config)?.delete_user_book(user_book_id).await?)?
        }
    };

    Ok(value)
}

fn error_payload(e: &anyhow::Error) -> Value {
    let message = match e.downcast_ref::<HardcoverError>() {
        Some(err) => err.user_message(),
        None => format!("{:#}", e),
    };
    json!({ "error": message })
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(if cli.pretty_logs {
        LogFormat::Pretty
    } else {
        LogFormat::Compact
    });

    let config = Config::from_env();

    match run(cli.command, &config).await {
        Ok(value) => {
            println!("{}", value);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{:#}", e);
            println!("{}", error_payload(&e));
            ExitCode::FAILURE
        }
    }
}
