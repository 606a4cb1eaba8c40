use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use fieldsense::api::{router, AppState};
use fieldsense_core::db;
use fieldsense_parser::BoundaryDocument;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Fieldsense monitoring CLI and API server", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the Fieldsense API server
    Serve(ServeArgs),
    /// Run database migrations
    Migrate,
    /// Extract boundary coordinates from a KML or KMZ file
    Boundary(BoundaryArgs),
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Address to listen on
    #[arg(long, default_value = "0.0.0.0:3000")]
    bind: String,
}

#[derive(Args, Debug)]
struct BoundaryArgs {
    /// Path to the .kml or .kmz file
    file: PathBuf,
    /// Placemark id to extract when the file contains several
    #[arg(long)]
    placemark: Option<String>,
    /// List the placemarks in the file instead of extracting
    #[arg(long)]
    list: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve(args) => {
            let pool = connect_pool().await?;
            db::run_migrations(&pool).await?;

            let app = router(AppState { pool });
            let listener = TcpListener::bind(&args.bind)
                .await
                .with_context(|| format!("failed to bind {}", args.bind))?;
            info!("listening on {}", listener.local_addr()?);
            axum::serve(listener, app.into_make_service()).await?;
            Ok(())
        }
        Command::Migrate => {
            let pool = connect_pool().await?;
            db::run_migrations(&pool).await?;
            info!("Database migrations applied");
            Ok(())
        }
        Command::Boundary(args) => extract_boundary(args),
    }
}

async fn connect_pool() -> Result<db::DbPool> {
    dotenvy::dotenv().ok();
    let database_url = std::env::var("DATABASE_URL")
        .or_else(|_| std::env::var("FIELDSENSE_DATABASE_URL"))
        .unwrap_or_else(|_| "sqlite://fieldsense.db".to_string());
    db::connect(&database_url).await
}

fn extract_boundary(args: BoundaryArgs) -> Result<()> {
    let filename = args
        .file
        .file_name()
        .and_then(|name| name.to_str())
        .with_context(|| format!("invalid file path {}", args.file.display()))?
        .to_string();
    let bytes = std::fs::read(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;

    let document = BoundaryDocument::from_file(&filename, &bytes)?;

    if args.list {
        for placemark in document.placemarks() {
            println!("{placemark}");
        }
        return Ok(());
    }

    let series = match args.placemark {
        Some(id) => document.select(&id)?,
        None => match document.default_series() {
            Some(series) => series,
            None => {
                let ids: Vec<&str> = document
                    .placemarks()
                    .iter()
                    .map(|p| p.id.as_str())
                    .collect();
                bail!(
                    "file contains several placemarks; pick one with --placemark <id> (one of: {})",
                    ids.join(", ")
                );
            }
        },
    };

    println!("latitudes: {}", series.latitudes);
    println!("longitudes: {}", series.longitudes);
    Ok(())
}
