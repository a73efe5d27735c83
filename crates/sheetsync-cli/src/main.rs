//! sheetsync CLI - events calendar and fiscal map synchronisation
//!
//! Regenerates calendar sheets from the intake and map sheets, promotes
//! requests into the fiscal map and recolors its FY/quarter hierarchy.

mod config;
mod logging;
mod snapshot;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use sheetsync_core::fiscal::{FiscalCalendar, FiscalPeriod};
use sheetsync_core::SheetGateway;
use sheetsync_engine::{
    combined_calendar, intake_calendar, map_calendar, Colorizer, Promoter, WriteReport,
};
use sheetsync_smartsheet::SmartsheetClient;
use tracing::{error, info, warn};

use crate::config::{Config, DEFAULT_CONFIG_FILE};

#[derive(Parser)]
#[command(name = "sheetsync")]
#[command(author, version, about = "Smartsheet calendar and fiscal map sync", long_about = None)]
struct Cli {
    /// Verbose output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Configuration file
    #[arg(
        short,
        long,
        value_name = "FILE",
        env = "SHEETSYNC_CONFIG",
        default_value = DEFAULT_CONFIG_FILE,
        global = true
    )]
    config: PathBuf,

    /// Work on a JSON snapshot of sheets instead of the remote service
    #[arg(long, value_name = "FILE", global = true)]
    snapshot: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rewrite the intake calendar from the intake sheet
    Intake,

    /// Rewrite the map calendar from confirmed map rows
    Map,

    /// Rewrite the combined calendar from the map and intake sheets
    Combined,

    /// Move pending requests into the fiscal map
    Promote {
        /// Log what would be moved without changing any sheet
        #[arg(long)]
        simulate: bool,
    },

    /// Recolor the fiscal map hierarchy
    Colorize,

    /// Run the intake and map calendars, continuing past failures
    All,

    /// Print the fiscal period of each date
    Fiscal {
        /// Dates as YYYY-MM-DD
        #[arg(value_name = "DATE", required = true)]
        dates: Vec<NaiveDate>,
    },

    /// Print the fiscal quarter table
    Quarters,
}

fn main() -> Result<ExitCode> {
    let Cli {
        verbose,
        config: config_path,
        snapshot: snapshot_path,
        command,
    } = Cli::parse();

    let config = Config::load(&config_path)?;
    logging::init(verbose, &config.logging)?;

    match command {
        Commands::Fiscal { dates } => {
            let calendar = config.fiscal.calendar()?;
            for date in dates {
                println!("{date}  {}", calendar.classify(date));
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Quarters => {
            print_quarters(&config.fiscal.calendar()?);
            Ok(ExitCode::SUCCESS)
        }
        command => match snapshot_path {
            Some(path) => {
                let mut gateway = snapshot::load(&path)?;
                let code = run(&command, &config, &mut gateway)?;
                snapshot::save(&gateway, &path)?;
                info!(path = %path.display(), "snapshot saved");
                Ok(code)
            }
            None => {
                let mut client = SmartsheetClient::new(config.smartsheet.client_config()?)?;
                run(&command, &config, &mut client)
            }
        },
    }
}

/// Run a sheet command against `gateway`
fn run(command: &Commands, config: &Config, gateway: &mut dyn SheetGateway) -> Result<ExitCode> {
    match command {
        Commands::Intake => {
            run_intake(config, gateway)?;
        }
        Commands::Map => {
            run_map(config, gateway)?;
        }
        Commands::Combined => {
            let sheets = config.combined_calendar()?;
            let report = combined_calendar(
                gateway,
                sheets.map_source,
                sheets.intake_source,
                sheets.destination,
                &config.rules.map,
                &config.rules.intake,
            )
            .context("combined calendar failed")?;
            log_report("combined", report);
        }
        Commands::Promote { simulate } => {
            let sheets = config.request_to_map()?;
            let promoter = Promoter::new(config.rules.promote.clone())
                .with_calendar(config.fiscal.calendar()?)
                .with_colors(config.rules.colors.clone())
                .simulate(*simulate);
            let report = promoter
                .promote(gateway, sheets.source, sheets.destination)
                .context("promotion failed")?;
            info!(
                promoted = report.promoted,
                failed = report.failed,
                groups_created = report.groups_created,
                "promotion finished"
            );
            if report.failed > 0 {
                warn!(failed = report.failed, "some rows were not promoted");
            }
            if report.colorize_failed {
                warn!("map hierarchy was not recolored");
            }
            if report.failed > 0 || report.colorize_failed {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::Colorize => {
            let sheets = config.request_to_map()?;
            let updated = Colorizer::new(config.rules.colors.clone())
                .colorize(gateway, sheets.destination)
                .context("colorizing failed")?;
            info!(updated, "colorized rows");
        }
        Commands::All => {
            let results = [
                ("intake", run_intake(config, gateway)),
                ("map", run_map(config, gateway)),
            ];
            let mut failed = 0;
            for (task, result) in results {
                if let Err(err) = result {
                    error!(task, "{err:#}");
                    failed += 1;
                }
            }
            if failed > 0 {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::Fiscal { .. } | Commands::Quarters => {}
    }
    Ok(ExitCode::SUCCESS)
}

fn run_intake(config: &Config, gateway: &mut dyn SheetGateway) -> Result<()> {
    let report = intake_calendar(gateway, config.intake_calendar()?, &config.rules.intake)
        .context("intake calendar failed")?;
    log_report("intake", report);
    Ok(())
}

fn run_map(config: &Config, gateway: &mut dyn SheetGateway) -> Result<()> {
    let report = map_calendar(gateway, config.map_calendar()?, &config.rules.map)
        .context("map calendar failed")?;
    log_report("map", report);
    Ok(())
}

fn log_report(calendar: &str, report: WriteReport) {
    info!(
        calendar,
        cleared = report.cleared,
        written = report.written,
        dropped = report.dropped,
        "calendar updated"
    );
}

fn print_quarters(calendar: &FiscalCalendar) {
    for fy in calendar.years() {
        for (i, range) in fy.quarters.iter().enumerate() {
            let period = FiscalPeriod::new(fy.year, i as u8 + 1);
            println!(
                "{period}  {}  {}  {:>3} days",
                range.start,
                range.end,
                range.duration_days()
            );
        }
    }
}
