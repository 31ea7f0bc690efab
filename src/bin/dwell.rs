//! Dwell CLI - Command-line interface for Card Dwell
//!
//! Commands:
//! - report: Build the card movement report from an action log (and export CSV)
//! - members: List board members as the assignee selector shows them
//! - filter: Show, apply or reset the saved filter for a board
//! - config: Print the effective configuration

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use card_dwell::filter::{FilterPanel, FilterSettings};
use card_dwell::formatter::COLUMNS;
use card_dwell::host::ExportTarget;
use card_dwell::{
    ActivityFilter, ActivityReporter, Clock, FixedClock, LocalHost, Report, ReportConfig,
    ReportError, SystemClock, DWELL_VERSION, PRODUCER_NAME,
};

/// Dwell - how long cards spend in each list
#[derive(Parser)]
#[command(name = "dwell")]
#[command(version = DWELL_VERSION)]
#[command(about = "Reconstruct card movements and list dwell times from a board action log", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the report for a date range and export it as CSV
    Report {
        /// Action log JSON file (use - for stdin)
        #[arg(short, long)]
        actions: PathBuf,

        /// Start date (YYYY-MM-DD or RFC 3339); with --saved-filter defaults to the saved date
        #[arg(long, default_value = "")]
        since: String,

        /// End date, exclusive (YYYY-MM-DD or RFC 3339)
        #[arg(long)]
        before: String,

        /// Board identifier
        #[arg(long, default_value = "local")]
        board: String,

        /// Only include moves made by this member id
        #[arg(long, conflicts_with = "saved_filter")]
        member: Option<String>,

        /// Apply the filter saved for this board
        #[arg(long)]
        saved_filter: bool,

        /// Preference store file
        #[arg(long)]
        prefs: Option<PathBuf>,

        /// Override "now" for open intervals (RFC 3339)
        #[arg(long)]
        now: Option<String>,

        /// Directory to write the CSV export into
        #[arg(long, conflicts_with = "no_export")]
        out_dir: Option<PathBuf>,

        /// Do not write the CSV export
        #[arg(long)]
        no_export: bool,

        /// What to print on stdout
        #[arg(long, default_value = "table")]
        format: OutputFormat,

        /// TOML configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// List board members sorted by name
    Members {
        /// Members JSON file
        #[arg(short, long)]
        members: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage the saved filter for a board
    Filter {
        #[command(subcommand)]
        action: FilterAction,
    },

    /// Print the effective configuration as TOML
    Config {
        /// TOML configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum FilterAction {
    /// Print the saved filter
    Show {
        #[arg(long)]
        prefs: PathBuf,
        #[arg(long, default_value = "local")]
        board: String,
    },
    /// Save a filter
    Apply {
        #[arg(long)]
        prefs: PathBuf,
        #[arg(long, default_value = "local")]
        board: String,
        /// Date to pre-fill
        #[arg(long)]
        date: Option<String>,
        /// Member id to filter by
        #[arg(long)]
        member: Option<String>,
    },
    /// Remove the saved filter
    Reset {
        #[arg(long)]
        prefs: PathBuf,
        #[arg(long, default_value = "local")]
        board: String,
    },
}

#[derive(Clone, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Aligned text table
    Table,
    /// Records and summary as pretty JSON
    Json,
    /// The CSV export itself
    Csv,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8, quiet: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if quiet {
        builder.filter_level(log::LevelFilter::Error);
    } else if verbose > 0 {
        let level = match verbose {
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        };
        builder.filter_level(level);
    }
    builder.init();
}

fn run(cli: Cli) -> Result<(), DwellCliError> {
    match cli.command {
        Commands::Report {
            actions,
            since,
            before,
            board,
            member,
            saved_filter,
            prefs,
            now,
            out_dir,
            no_export,
            format,
            config,
        } => {
            let config = load_config(config.as_deref())?;
            let host = build_host(&actions, &board, prefs, out_dir, no_export, &format)?;
            let request = ReportRequest {
                since,
                before,
                member,
                saved_filter,
                format,
            };

            match now {
                Some(now) => {
                    let instant = chrono::DateTime::parse_from_rfc3339(&now)
                        .map_err(|e| DwellCliError::Usage(format!("--now {}: {}", now, e)))?
                        .with_timezone(&chrono::Utc);
                    let reporter =
                        ActivityReporter::with_clock(host, FixedClock(instant), config);
                    cmd_report(&reporter, &request)
                }
                None => {
                    let reporter = ActivityReporter::with_clock(host, SystemClock, config);
                    cmd_report(&reporter, &request)
                }
            }
        }

        Commands::Members { members, json } => cmd_members(&members, json),

        Commands::Filter { action } => cmd_filter(action),

        Commands::Config { config } => {
            let config = load_config(config.as_deref())?;
            print!("{}", config.to_toml_string()?);
            Ok(())
        }
    }
}

struct ReportRequest {
    since: String,
    before: String,
    member: Option<String>,
    saved_filter: bool,
    format: OutputFormat,
}

fn load_config(path: Option<&Path>) -> Result<ReportConfig, DwellCliError> {
    match path {
        Some(path) => Ok(ReportConfig::load(path)?),
        None => Ok(ReportConfig::default()),
    }
}

fn build_host(
    actions: &Path,
    board: &str,
    prefs: Option<PathBuf>,
    out_dir: Option<PathBuf>,
    no_export: bool,
    format: &OutputFormat,
) -> Result<LocalHost, DwellCliError> {
    let mut host = LocalHost::new(board);

    host = if actions.to_string_lossy() == "-" {
        if atty::is(atty::Stream::Stdin) {
            log::warn!("reading the action log from an interactive terminal; end input with Ctrl-D");
        }
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        host.with_action_log_text(buffer)
    } else {
        host.with_actions(actions)
    };

    if let Some(prefs) = prefs {
        host = host.with_preferences(prefs);
    }

    let target = match (out_dir, no_export) {
        (_, true) => ExportTarget::Discard,
        (Some(dir), false) => ExportTarget::Directory(dir),
        (None, false) if *format == OutputFormat::Csv => ExportTarget::Stdout,
        (None, false) => ExportTarget::Directory(PathBuf::from(".")),
    };
    Ok(host.with_export_target(target))
}

fn cmd_report<C: Clock>(
    reporter: &ActivityReporter<LocalHost, C>,
    request: &ReportRequest,
) -> Result<(), DwellCliError> {
    let report = if request.saved_filter {
        reporter.run_saved_view(&request.since, &request.before)?
    } else {
        let filter = ActivityFilter {
            member_id: request.member.clone(),
        };
        reporter.run(&request.since, &request.before, &filter)?
    };

    match request.format {
        OutputFormat::Table => print_table(&report),
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Csv => {
            if let Some(bytes) = csv_for_stdout(&report, reporter.host().export_target()) {
                let mut stdout = io::stdout();
                stdout.write_all(bytes)?;
                stdout.flush()?;
            }
        }
    }

    Ok(())
}

/// CSV still to print for `--format csv`; `None` when the host already wrote it to stdout
fn csv_for_stdout<'a>(report: &'a Report, target: &ExportTarget) -> Option<&'a [u8]> {
    match target {
        ExportTarget::Stdout => None,
        ExportTarget::Directory(_) | ExportTarget::Discard => Some(&report.export.bytes),
    }
}

fn print_table(report: &Report) {
    let rows: Vec<[&str; 6]> = report
        .rows
        .iter()
        .map(|r| {
            [
                r.card_name.as_str(),
                r.moved_by.as_str(),
                r.from_list.as_str(),
                r.to_list.as_str(),
                r.time_in_list.as_str(),
                r.action_date.as_str(),
            ]
        })
        .collect();

    let mut widths = COLUMNS.map(|c| c.chars().count());
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let render = |cells: &[&str; 6]| {
        cells
            .iter()
            .zip(widths)
            .map(|(cell, width)| format!("{:<width$}", cell, width = width))
            .collect::<Vec<_>>()
            .join("  ")
    };

    println!("{}", render(&COLUMNS));
    for row in &rows {
        println!("{}", render(row));
    }
    println!();
    println!(
        "{} records, {} cards, {} open intervals, {} actions skipped",
        report.summary.records,
        report.summary.cards,
        report.summary.open_intervals,
        report.summary.skipped_actions
    );
}

fn print_json(report: &Report) -> Result<(), DwellCliError> {
    let output = serde_json::json!({
        "producer": { "name": PRODUCER_NAME, "version": DWELL_VERSION },
        "run_id": report.run_id,
        "generated_at": report.generated_at.to_rfc3339(),
        "summary": report.summary,
        "records": report.records,
        "rows": report.rows,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn cmd_members(path: &Path, json: bool) -> Result<(), DwellCliError> {
    let host = LocalHost::new("local").with_members(path);
    let members = FilterPanel::open(&host)?
        .member_options()
        .map_err(DwellCliError::MembersFailed)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&members)?);
    } else {
        for member in &members {
            println!("{}\t{}", member.id, member.full_name);
        }
    }
    Ok(())
}

fn cmd_filter(action: FilterAction) -> Result<(), DwellCliError> {
    match action {
        FilterAction::Show { prefs, board } => {
            let host = LocalHost::new(board).with_preferences(prefs);
            match FilterPanel::open(&host)?.restore()? {
                Some(settings) => println!("{}", serde_json::to_string_pretty(&settings)?),
                None => println!("No saved filter"),
            }
            Ok(())
        }
        FilterAction::Apply {
            prefs,
            board,
            date,
            member,
        } => {
            let host = LocalHost::new(board).with_preferences(prefs);
            FilterPanel::open(&host)?
                .apply(&FilterSettings { date, member })
                .map_err(DwellCliError::SaveFailed)
        }
        FilterAction::Reset { prefs, board } => {
            let host = LocalHost::new(board).with_preferences(prefs);
            FilterPanel::open(&host)?
                .reset()
                .map_err(DwellCliError::ResetFailed)
        }
    }
}

// Error types

#[derive(Debug)]
enum DwellCliError {
    Io(io::Error),
    Report(ReportError),
    Json(serde_json::Error),
    MembersFailed(ReportError),
    SaveFailed(ReportError),
    ResetFailed(ReportError),
    Usage(String),
}

impl From<io::Error> for DwellCliError {
    fn from(e: io::Error) -> Self {
        DwellCliError::Io(e)
    }
}

impl From<ReportError> for DwellCliError {
    fn from(e: ReportError) -> Self {
        DwellCliError::Report(e)
    }
}

impl From<serde_json::Error> for DwellCliError {
    fn from(e: serde_json::Error) -> Self {
        DwellCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    detail: Option<String>,
    hint: Option<String>,
}

impl From<DwellCliError> for CliError {
    fn from(e: DwellCliError) -> Self {
        match e {
            DwellCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                detail: None,
                hint: Some("Check file paths and permissions".to_string()),
            },
            DwellCliError::Report(e) => {
                let (code, hint) = match &e {
                    ReportError::MalformedResponse(_) => (
                        "MALFORMED_RESPONSE",
                        Some("Expected an action array or an object with an `actions` array"),
                    ),
                    ReportError::NoMatchingRecords => ("NO_RECORDS", Some("Try a wider date range")),
                    ReportError::Fetch(_) => ("FETCH_ERROR", Some("Check the action log file")),
                    ReportError::Storage(_) => ("STORAGE_ERROR", Some("Check the preference file")),
                    ReportError::Export(_) => ("EXPORT_ERROR", Some("Check --out-dir")),
                    ReportError::InvalidWindow(_) => {
                        ("INVALID_WINDOW", Some("Pass --since and --before as YYYY-MM-DD"))
                    }
                    ReportError::InvalidTimezone(_) => {
                        ("INVALID_TIMEZONE", Some("Use an IANA name such as Europe/Berlin"))
                    }
                    ReportError::Config(_) => ("CONFIG_ERROR", Some("Run 'dwell config' to see defaults")),
                    ReportError::JsonError(_) => ("JSON_ERROR", Some("Check JSON syntax")),
                };
                CliError {
                    code: code.to_string(),
                    message: e.user_message().to_string(),
                    detail: Some(e.to_string()),
                    hint: hint.map(str::to_string),
                }
            }
            DwellCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                detail: None,
                hint: Some("Check JSON syntax".to_string()),
            },
            DwellCliError::MembersFailed(e) => CliError {
                code: "MEMBERS_FAILED".to_string(),
                message: card_dwell::filter::MEMBERS_FAILED_MESSAGE.to_string(),
                detail: Some(e.to_string()),
                hint: Some("Check the members file".to_string()),
            },
            DwellCliError::SaveFailed(e) => CliError {
                code: "SAVE_FAILED".to_string(),
                message: card_dwell::filter::SAVE_FAILED_MESSAGE.to_string(),
                detail: Some(e.to_string()),
                hint: None,
            },
            DwellCliError::ResetFailed(e) => CliError {
                code: "RESET_FAILED".to_string(),
                message: card_dwell::filter::RESET_FAILED_MESSAGE.to_string(),
                detail: Some(e.to_string()),
                hint: None,
            },
            DwellCliError::Usage(msg) => CliError {
                code: "USAGE_ERROR".to_string(),
                message: msg,
                detail: None,
                hint: Some("Run 'dwell --help'".to_string()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use card_dwell::build_report;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn report() -> Report {
        let log = json!([{
            "id": "a1",
            "date": "2024-01-15T14:00:00Z",
            "data": {
                "card": { "id": "c1", "name": "A" },
                "listAfter": { "name": "Doing" }
            },
            "memberCreator": { "id": "m1", "fullName": "Ada Park" }
        }]);
        let now = chrono::Utc.with_ymd_and_hms(2024, 1, 15, 15, 0, 0).unwrap();
        build_report(&log, &ActivityFilter::default(), now, &ReportConfig::default()).unwrap()
    }

    #[test]
    fn test_csv_printed_when_export_goes_elsewhere() {
        let report = report();
        for target in [ExportTarget::Discard, ExportTarget::Directory(PathBuf::from("out"))] {
            assert_eq!(
                csv_for_stdout(&report, &target),
                Some(report.export.bytes.as_slice())
            );
        }
    }

    #[test]
    fn test_csv_not_printed_twice() {
        assert_eq!(csv_for_stdout(&report(), &ExportTarget::Stdout), None);
    }

    #[test]
    fn test_csv_format_with_no_export_still_parses() {
        let cli = Cli::try_parse_from([
            "dwell", "report", "--actions", "a.json", "--since", "2024-01-01",
            "--before", "2024-02-01", "--format", "csv", "--no-export",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Report { no_export: true, format: OutputFormat::Csv, .. }
        ));
    }

    #[test]
    fn test_since_may_come_from_saved_filter() {
        let cli = Cli::try_parse_from([
            "dwell", "report", "--actions", "a.json", "--before", "2024-02-01",
            "--saved-filter", "--prefs", "prefs.json",
        ])
        .unwrap();
        match cli.command {
            Commands::Report { since, saved_filter, .. } => {
                assert_eq!(since, "");
                assert!(saved_filter);
            }
            _ => panic!("expected the report command"),
        }
    }
}
