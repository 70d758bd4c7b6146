use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

use devcamper_client::{GeocoderConfig, MapQuestGeocoder};
use devcamper_core::Geocoder;
use devcamper_core::models::{BootcampInput, CourseInput};
use devcamper_core::traits::resolve;
use devcamper_db::{Database, DatabaseConfig};

#[derive(Parser)]
#[command(name = "devcamper", version, about = "DevCamper database tooling")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending database migrations
    Migrate,

    /// Load or wipe sample data
    Seed {
        #[command(subcommand)]
        action: SeedAction,
    },
}

#[derive(Subcommand)]
enum SeedAction {
    /// Create the bootcamps (and nested courses) listed in a JSON file
    Import {
        /// JSON array of bootcamps
        #[arg(short, long, env = "SEED_FILE", default_value = "data/bootcamps.json")]
        file: PathBuf,
    },

    /// Delete every course and bootcamp
    Destroy,
}

/// One entry of a seed file: bootcamp fields plus its courses.
#[derive(Debug, Deserialize)]
struct SeedBootcamp {
    #[serde(flatten)]
    bootcamp: BootcampInput,
    #[serde(default)]
    courses: Vec<CourseInput>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("devcamper=info".parse()?))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let db = Database::connect(&DatabaseConfig::from_env()?)
        .await
        .context("Failed to connect to database")?;

    match cli.command {
        Commands::Migrate => {
            db.migrate().await?;
            tracing::info!("Migrations applied");
        }
        Commands::Seed { action } => {
            db.migrate().await?;
            match action {
                SeedAction::Import { file } => {
                    let geocoder = MapQuestGeocoder::from_config(&GeocoderConfig::from_env()?)?;
                    cmd_import(&db, &geocoder, &file).await?;
                }
                SeedAction::Destroy => cmd_destroy(&db).await?,
            }
        }
    }

    Ok(())
}

fn load_seed(path: &Path) -> Result<Vec<SeedBootcamp>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read seed file {}", path.display()))?;
    parse_seed(&raw).with_context(|| format!("Invalid seed file {}", path.display()))
}

fn parse_seed(raw: &str) -> Result<Vec<SeedBootcamp>> {
    Ok(serde_json::from_str(raw)?)
}

async fn cmd_import(db: &Database, geocoder: &dyn Geocoder, file: &Path) -> Result<()> {
    let entries = load_seed(file)?;
    let bootcamps = db.bootcamp_repo();
    let courses = db.course_repo();
    let mut course_count = 0;

    for entry in &entries {
        let new = entry.bootcamp.clone().into_new()?;
        let location = resolve(geocoder, &new.address, "address")
            .await
            .with_context(|| format!("Failed to geocode bootcamp '{}'", new.name))?;
        let bootcamp = bootcamps.create(&new, &location).await?;

        for course in &entry.courses {
            let course = course.clone().into_new(bootcamp.id)?;
            courses.create(&course).await?;
            course_count += 1;
        }
    }

    tracing::info!(
        bootcamps = entries.len(),
        courses = course_count,
        "Data imported"
    );
    Ok(())
}

async fn cmd_destroy(db: &Database) -> Result<()> {
    let courses = db.course_repo().delete_all().await?;
    let bootcamps = db.bootcamp_repo().delete_all().await?;
    tracing::info!(bootcamps, courses, "Data destroyed");
    Ok(())
}
