//! Command-line edge for the organization directory.
//!
//! # Responsibility
//! - Resolve configuration from arguments, environment and `.env`.
//! - Initialize logging, open the store, run one command and print its JSON
//!   envelope to stdout.
//!
//! Exit status is non-zero when the envelope reports an error.

mod response;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use log::info;
use orgdir_core::{
    default_log_level, import_seed, init_logging, open_db, Connection, GeoSearchParams,
    LoggingConfig, LookupService, SeedData, SeedOutcome, SqliteDirectoryRepository,
};
use response::{from_lookup, Envelope};
use serde_json::json;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "orgdir", version, about = "Organization directory lookups")]
struct Cli {
    /// SQLite database file.
    #[arg(long, env = "ORGDIR_DB_PATH", default_value = "orgdir.db")]
    db_path: PathBuf,

    /// trace|debug|info|warn|error
    #[arg(long, env = "ORGDIR_LOG_LEVEL")]
    log_level: Option<String>,

    /// Directory for rotated log files; defaults to `./logs`.
    #[arg(long, env = "ORGDIR_LOG_DIR")]
    log_dir: Option<PathBuf>,

    /// Log file basename.
    #[arg(long, env = "SERVICE_NAME", default_value = "orgdir")]
    service_name: String,

    /// Mirror log records to stderr.
    #[arg(long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    #[command(flatten)]
    Lookup(LookupCommand),
    /// Load a JSON seed file into an empty database.
    Seed { file: PathBuf },
}

#[derive(Subcommand, Debug)]
enum LookupCommand {
    /// Organizations in a building.
    ByBuilding { building_id: i64 },
    /// Organizations declaring an activity.
    ByActivity { activity_id: i64 },
    /// Organizations declaring an activity or one of its descendants.
    ByActivityTree { activity_id: i64 },
    /// Organizations inside a radius or rectangle.
    ByLocation(LocationArgs),
    /// Organizations whose name contains a fragment.
    ByName { fragment: String },
    /// One organization by id.
    ById { organization_id: i64 },
}

#[derive(Args, Debug)]
struct LocationArgs {
    /// radius|rectangle
    #[arg(long)]
    search_type: String,
    #[arg(long, allow_hyphen_values = true)]
    lat: Option<f64>,
    #[arg(long, allow_hyphen_values = true)]
    lon: Option<f64>,
    #[arg(long, allow_hyphen_values = true)]
    radius_km: Option<f64>,
    #[arg(long, allow_hyphen_values = true)]
    min_lat: Option<f64>,
    #[arg(long, allow_hyphen_values = true)]
    max_lat: Option<f64>,
    #[arg(long, allow_hyphen_values = true)]
    min_lon: Option<f64>,
    #[arg(long, allow_hyphen_values = true)]
    max_lon: Option<f64>,
}

impl From<LocationArgs> for GeoSearchParams {
    fn from(value: LocationArgs) -> Self {
        Self {
            search_type: value.search_type,
            lat: value.lat,
            lon: value.lon,
            radius_km: value.radius_km,
            min_lat: value.min_lat,
            max_lat: value.max_lat,
            min_lon: value.min_lon,
            max_lon: value.max_lon,
        }
    }
}

fn main() -> Result<ExitCode> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    init_logging(&logging_config(&cli)?)
        .map_err(anyhow::Error::msg)
        .context("failed to initialize logging")?;

    let envelope = run(cli)?;
    println!("{}", serde_json::to_string_pretty(&envelope)?);

    Ok(if envelope.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn logging_config(cli: &Cli) -> Result<LoggingConfig> {
    let log_dir = match &cli.log_dir {
        Some(dir) if dir.is_absolute() => dir.clone(),
        Some(dir) => std::env::current_dir()?.join(dir),
        None => std::env::current_dir()?.join("logs"),
    };
    let level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| default_log_level().to_string());

    Ok(LoggingConfig {
        level,
        log_dir,
        service_name: cli.service_name.clone(),
        duplicate_to_stderr: cli.verbose,
    })
}

fn run(cli: Cli) -> Result<Envelope> {
    let mut conn = open_db(&cli.db_path)
        .with_context(|| format!("failed to open database `{}`", cli.db_path.display()))?;

    match cli.command {
        Command::Seed { file } => {
            let data = SeedData::from_json_file(&file)
                .with_context(|| format!("failed to read seed file `{}`", file.display()))?;
            let outcome = import_seed(&mut conn, &data)?;
            info!("event=cli_seed module=cli status=ok outcome={outcome:?}");
            Ok(seed_envelope(outcome))
        }
        Command::Lookup(command) => run_lookup(&conn, command),
    }
}

fn run_lookup(conn: &Connection, command: LookupCommand) -> Result<Envelope> {
    let service = LookupService::new(SqliteDirectoryRepository::try_new(conn)?);
    let envelope = match command {
        LookupCommand::ByBuilding { building_id } => {
            from_lookup(service.by_building(building_id))?
        }
        LookupCommand::ByActivity { activity_id } => {
            from_lookup(service.by_activity(activity_id))?
        }
        LookupCommand::ByActivityTree { activity_id } => {
            from_lookup(service.by_activity_tree(activity_id))?
        }
        LookupCommand::ByLocation(args) => from_lookup(service.by_location(&args.into()))?,
        LookupCommand::ByName { fragment } => from_lookup(service.by_name(&fragment))?,
        LookupCommand::ById { organization_id } => {
            from_lookup(service.by_id(organization_id))?
        }
    };
    Ok(envelope)
}

fn seed_envelope(outcome: SeedOutcome) -> Envelope {
    match outcome {
        SeedOutcome::Skipped => Envelope::success(
            "database already contains data; seed skipped",
            json!({ "imported": false }),
        ),
        SeedOutcome::Imported {
            buildings,
            activities,
            organizations,
        } => Envelope::success(
            "seed data imported",
            json!({
                "imported": true,
                "buildings": buildings,
                "activities": activities,
                "organizations": organizations,
            }),
        ),
    }
}
