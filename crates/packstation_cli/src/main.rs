//! Command-line adapter over `packstation_core`.
//!
//! # Responsibility
//! - Map subcommands onto the read and write services.
//! - Print stations as JSON and failures with their status code.
//!
//! # Invariants
//! - Every store access goes through the core services.
//! - Station ids from the command line follow the core identifier syntax.
//! - Exit code is 0 on success, 1 on a station error, 2 on setup errors.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use log::{error, info};
use packstation_core::{
    format_version_token, parse_station_id, validate_new_station, validate_station_changes,
    CoreConfig, NewAddress, NewPackageSlot, NewStation, ReadService, SearchCriteria,
    SqliteStationRepository, StationChanges, StationError, WriteService,
};
use rusqlite::Connection;
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "packstation")]
#[command(about = "Manage parcel-locker stations.")]
struct CommandLine {
    /// TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Store file; overrides the configured database
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check core linkage
    Ping,
    /// Show one station
    Get {
        id: String,
        /// Include package slots
        #[arg(long)]
        slots: bool,
        /// Quoted version token; prints nothing when still current
        #[arg(long)]
        if_none_match: Option<String>,
    },
    /// Search stations with key=value criteria
    Find { criteria: Vec<String> },
    /// Create a station
    Create {
        #[arg(long)]
        nummer: String,
        #[arg(long)]
        strasse: String,
        #[arg(long)]
        hausnummer: String,
        #[arg(long)]
        plz: String,
        #[arg(long, default_value = "")]
        stadt: String,
        /// Construction date as YYYY-MM-DD
        #[arg(long)]
        baudatum: Option<NaiveDate>,
        #[arg(long)]
        ausstattung: Vec<String>,
        /// Package slot as NUMMER:KG
        #[arg(long = "paket")]
        pakete: Vec<String>,
    },
    /// Create the Karlsruhe sample station
    CreateSample,
    /// Change number, construction date or equipment
    Update {
        id: String,
        /// Quoted version token, e.g. '"0"'
        #[arg(long)]
        version: Option<String>,
        #[arg(long)]
        nummer: Option<String>,
        #[arg(long)]
        baudatum: Option<NaiveDate>,
        #[arg(long)]
        ausstattung: Option<Vec<String>>,
    },
    /// Delete a station with its address and slots
    Delete { id: String },
}

#[derive(Debug)]
enum Failure {
    Setup(String),
    Station(StationError),
}

impl From<StationError> for Failure {
    fn from(value: StationError) -> Self {
        Self::Station(value)
    }
}

fn main() -> ExitCode {
    let cli = CommandLine::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(message) => {
            eprintln!("error: {message}");
            return ExitCode::from(2);
        }
    };
    if let Err(message) = config.init_logging() {
        eprintln!("error: {message}");
        return ExitCode::from(2);
    }

    let conn = match config.open_database() {
        Ok(conn) => conn,
        Err(err) => {
            eprintln!("error: cannot open store: {err}");
            return ExitCode::from(2);
        }
    };

    match run(cli.command, &conn) {
        Ok(()) => ExitCode::SUCCESS,
        Err(Failure::Setup(message)) => {
            eprintln!("error: {message}");
            ExitCode::from(2)
        }
        Err(Failure::Station(err)) => {
            error!("event=cli_command module=cli status=error error={err}");
            eprintln!("error {}: {err}", err.kind().status_code());
            ExitCode::from(1)
        }
    }
}

fn load_config(cli: &CommandLine) -> Result<CoreConfig, String> {
    let mut config = match &cli.config {
        Some(path) => CoreConfig::load(path).map_err(|err| err.to_string())?,
        None => CoreConfig::default(),
    };
    if let Some(path) = &cli.db {
        config.database.path = Some(path.clone());
        config.database.in_memory = false;
    }
    Ok(config)
}

fn run(command: Commands, conn: &Connection) -> Result<(), Failure> {
    let repo = SqliteStationRepository::try_new(conn)
        .map_err(|err| Failure::Setup(err.to_string()))?;
    let reader = ReadService::new(repo);
    let writer = WriteService::new(repo);

    match command {
        Commands::Ping => {
            println!("packstation_core ping={}", packstation_core::ping());
            println!("packstation_core version={}", packstation_core::core_version());
        }
        Commands::Get {
            id,
            slots,
            if_none_match,
        } => {
            let station = reader.find_by_raw_id(&id, slots)?;
            if if_none_match.is_some_and(|token| station.matches_version_token(&token)) {
                info!("event=cli_get module=cli status=not_modified id={}", station.id);
                return Ok(());
            }
            println!("etag: {}", station.version_token());
            print_json(&station)?;
        }
        Commands::Find { criteria } => {
            let criteria = parse_criteria(&criteria)?;
            let stations = reader.find(Some(&criteria))?;
            print_json(&stations)?;
        }
        Commands::Create {
            nummer,
            strasse,
            hausnummer,
            plz,
            stadt,
            baudatum,
            ausstattung,
            pakete,
        } => {
            let mut station =
                NewStation::new(nummer, NewAddress::new(strasse, hausnummer, plz, stadt));
            station.construction_date = baudatum;
            if !ausstattung.is_empty() {
                station.equipment = Some(ausstattung);
            }
            for slot in &pakete {
                station.slots.push(parse_slot(slot)?);
            }
            create(&writer, &station)?;
        }
        Commands::CreateSample => {
            let mut station = NewStation::new(
                "565",
                NewAddress::new("Moltkestr.", "54", "76133", "Karlsruhe"),
            );
            station.construction_date = NaiveDate::from_ymd_opt(2022, 1, 31);
            station
                .slots
                .push(NewPackageSlot::new("239087423504", 5.0));
            create(&writer, &station)?;
        }
        Commands::Update {
            id,
            version,
            nummer,
            baudatum,
            ausstattung,
        } => {
            let changes = StationChanges {
                number: nummer,
                construction_date: baudatum,
                equipment: ausstattung,
            };
            if let Err(errors) = validate_station_changes(&changes) {
                return Err(Failure::Setup(errors.to_string()));
            }
            let version = writer.update(parse_station_id(&id), &changes, version.as_deref())?;
            println!("etag: {}", format_version_token(version));
        }
        Commands::Delete { id } => {
            let removed = delete(&writer, &id)?;
            println!("deleted={removed}");
        }
    }
    Ok(())
}

fn create(
    writer: &WriteService<SqliteStationRepository<'_>>,
    station: &NewStation,
) -> Result<(), Failure> {
    if let Err(errors) = validate_new_station(station) {
        return Err(Failure::Setup(errors.to_string()));
    }
    let id = writer.create(station)?;
    println!("id={id}");
    Ok(())
}

/// Malformed ids name no station, so nothing is removed.
fn delete(
    writer: &WriteService<SqliteStationRepository<'_>>,
    raw_id: &str,
) -> Result<bool, StationError> {
    match parse_station_id(raw_id) {
        Some(id) => writer.delete(id),
        None => {
            info!("event=cli_delete module=cli status=rejected raw_id={raw_id:?}");
            Ok(false)
        }
    }
}

fn parse_criteria(pairs: &[String]) -> Result<SearchCriteria, Failure> {
    pairs
        .iter()
        .map(|pair| {
            pair.split_once('=')
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .ok_or_else(|| Failure::Setup(format!("criterion `{pair}` is not key=value")))
        })
        .collect()
}

fn parse_slot(raw: &str) -> Result<NewPackageSlot, Failure> {
    let (number, weight) = raw
        .split_once(':')
        .ok_or_else(|| Failure::Setup(format!("slot `{raw}` is not NUMMER:KG")))?;
    let weight = weight
        .parse::<f64>()
        .map_err(|err| Failure::Setup(format!("slot `{raw}` has invalid weight: {err}")))?;
    Ok(NewPackageSlot::new(number, weight))
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Failure> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|err| Failure::Setup(format!("cannot render JSON: {err}")))?;
    println!("{rendered}");
    Ok(())
}
