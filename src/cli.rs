//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use log::{info, warn};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::query_file::load_query;
use crate::domain::breakout::{ScanContext, ThresholdsConfig, Tier};
use crate::domain::config_validation::{validate_breakout_config, validate_scan_config};
use crate::domain::error::ScreenerError;
use crate::domain::indicator::BuiltinRegistry;
use crate::domain::query::QueryState;
use crate::domain::query_validation::{QueryIssue, validate_query};
use crate::domain::universe::{
    ScanReport, SymbolBreakout, SymbolEvaluation, resolve_symbols, scan_breakouts, scan_query,
};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;

pub const DEFAULT_TIMEFRAME: &str = "1d";

#[derive(Parser, Debug)]
#[command(name = "samscreen", about = "Technical-analysis stock screener")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Evaluate a query across the universe
    Scan {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        query: PathBuf,
        /// Evaluate as of this date (YYYY-MM-DD) instead of the latest bar
        #[arg(long)]
        as_of: Option<NaiveDate>,
    },
    /// Classify consolidation breakouts across the universe
    Breakout {
        #[arg(short, long)]
        config: PathBuf,
        /// swing or positional; overrides [breakout] context
        #[arg(long)]
        context: Option<ScanContext>,
        #[arg(long)]
        timeframe: Option<String>,
        /// Also print per-criterion scores and near misses
        #[arg(long)]
        diagnose: bool,
    },
    /// Validate a query file
    Validate {
        #[arg(short, long)]
        query: PathBuf,
    },
    /// List symbols available in the data directory
    ListSymbols {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long, default_value = DEFAULT_TIMEFRAME)]
        timeframe: String,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Scan {
            config,
            query,
            as_of,
        } => run_scan(&config, &query, as_of),
        Command::Breakout {
            config,
            context,
            timeframe,
            diagnose,
        } => run_breakout(&config, context, timeframe.as_deref(), diagnose),
        Command::Validate { query } => run_validate(&query),
        Command::ListSymbols { config, timeframe } => run_list_symbols(&config, &timeframe),
    }
}

/// Logger at `Info`, with `filters` (RUST_LOG syntax) layered on top.
pub fn logger(filters: Option<&str>) -> env_logger::Builder {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(log::LevelFilter::Info);
    if let Some(spec) = filters {
        builder.parse_filters(spec);
    }
    builder
}

fn fail(err: ScreenerError) -> ExitCode {
    eprintln!("error: {err}");
    (&err).into()
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(fail)
}

/// CSV adapter rooted at `[data] dir`.
pub fn data_adapter(config: &FileConfigAdapter, config_path: &Path) -> Result<CsvAdapter, ScreenerError> {
    let dir = config
        .data_dir(config_path)
        .ok_or_else(|| ScreenerError::ConfigMissing {
            section: "data".into(),
            key: "dir".into(),
        })?;
    Ok(CsvAdapter::new(dir))
}

/// Sizes the global rayon pool from `[scan] threads` when set.
pub fn configure_threads(config: &dyn ConfigPort) {
    let threads = config.get_int("scan", "threads", 0);
    if threads < 1 {
        return;
    }
    if let Err(e) = rayon::ThreadPoolBuilder::new()
        .num_threads(threads as usize)
        .build_global()
    {
        warn!("could not size thread pool: {e}");
    }
}

/// Timeframe used to list symbols for a query scan: first `[scan] timeframes`
/// entry, else the query's first timeframe.
pub fn listing_timeframe(config: &dyn ConfigPort, query: &QueryState) -> String {
    config
        .get_list("scan", "timeframes")
        .into_iter()
        .next()
        .or_else(|| query.timeframes().into_iter().next())
        .unwrap_or_else(|| DEFAULT_TIMEFRAME.to_string())
}

pub fn breakout_timeframe(config: &dyn ConfigPort, cli_override: Option<&str>) -> String {
    cli_override
        .map(str::to_string)
        .or_else(|| config.get_string("breakout", "timeframe"))
        .filter(|tf| !tf.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_TIMEFRAME.to_string())
}

fn run_scan(config_path: &Path, query_path: &Path, as_of: Option<NaiveDate>) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    if let Err(e) = validate_scan_config(&config) {
        return fail(e);
    }

    let query = match load_query(query_path) {
        Ok(q) => q,
        Err(e) => return fail(e),
    };
    for issue in validate_query(&query, &BuiltinRegistry) {
        eprintln!("warning: {issue}");
    }

    let data = match data_adapter(&config, config_path) {
        Ok(d) => d,
        Err(e) => return fail(e),
    };
    let symbols = match resolve_symbols(&config, &data, &listing_timeframe(&config, &query)) {
        Ok(s) => s,
        Err(e) => return fail(e),
    };
    configure_threads(&config);

    match run_scan_pipeline(&data, &query, &symbols, as_of) {
        Ok(report) => {
            print_scan_report(&query, &report);
            ExitCode::SUCCESS
        }
        Err(e) => fail(e),
    }
}

/// Scans `symbols`; fails only when every symbol was skipped.
pub fn run_scan_pipeline<D>(
    data_port: &D,
    query: &QueryState,
    symbols: &[String],
    as_of: Option<NaiveDate>,
) -> Result<ScanReport<SymbolEvaluation>, ScreenerError>
where
    D: DataPort + Sync + ?Sized,
{
    if symbols.is_empty() {
        return Err(ScreenerError::NoData {
            symbol: "all".into(),
            timeframe: query.timeframes().join(","),
        });
    }
    info!("scanning {} symbols with '{}'", symbols.len(), query.name);
    let report = scan_query(data_port, &BuiltinRegistry, query, symbols, as_of);
    if report.results.is_empty() {
        return Err(ScreenerError::NoData {
            symbol: "all".into(),
            timeframe: query.timeframes().join(","),
        });
    }
    Ok(report)
}

fn print_scan_report(query: &QueryState, report: &ScanReport<SymbolEvaluation>) {
    let matched: Vec<_> = report.results.iter().filter(|r| r.result.matched).collect();
    for eval in &matched {
        println!("{}", eval.symbol);
        for group in &eval.result.groups {
            let hits = group.conditions.iter().filter(|c| c.matched).count();
            println!(
                "  {} [{}] {} ({}/{} conditions, {} bars)",
                group.group_id,
                group.timeframe,
                if group.matched { "match" } else { "no match" },
                hits,
                group.conditions.len(),
                group.bars
            );
        }
    }
    eprintln!(
        "{}: {} of {} symbols matched ({} skipped)",
        if query.name.is_empty() { "query" } else { query.name.as_str() },
        matched.len(),
        report.results.len(),
        report.skipped.len()
    );
}

fn run_breakout(
    config_path: &Path,
    context: Option<ScanContext>,
    timeframe: Option<&str>,
    diagnose: bool,
) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let (context, thresholds) = match validate_breakout_config(&config, context) {
        Ok(v) => v,
        Err(e) => return fail(e),
    };
    let timeframe = breakout_timeframe(&config, timeframe);

    let data = match data_adapter(&config, config_path) {
        Ok(d) => d,
        Err(e) => return fail(e),
    };
    let symbols = match resolve_symbols(&config, &data, &timeframe) {
        Ok(s) => s,
        Err(e) => return fail(e),
    };
    configure_threads(&config);

    eprintln!("Classifying {} symbols ({context}, {timeframe})", symbols.len());
    match run_breakout_pipeline(&data, &thresholds, &timeframe, &symbols, diagnose) {
        Ok(report) => {
            print_breakout_report(&report, diagnose);
            ExitCode::SUCCESS
        }
        Err(e) => fail(e),
    }
}

pub fn run_breakout_pipeline<D>(
    data_port: &D,
    thresholds: &ThresholdsConfig,
    timeframe: &str,
    symbols: &[String],
    diagnose: bool,
) -> Result<ScanReport<SymbolBreakout>, ScreenerError>
where
    D: DataPort + Sync + ?Sized,
{
    let report = scan_breakouts(data_port, thresholds, timeframe, symbols, diagnose);
    if report.results.is_empty() {
        return Err(ScreenerError::NoData {
            symbol: "all".into(),
            timeframe: timeframe.to_string(),
        });
    }
    Ok(report)
}

fn print_breakout_report(report: &ScanReport<SymbolBreakout>, diagnose: bool) {
    let mut counts = [0usize; 3];
    for entry in &report.results {
        let tier = &entry.tier;
        match tier.tier {
            Tier::Tier1 => counts[0] += 1,
            Tier::Tier2A => counts[1] += 1,
            Tier::Tier2B => counts[2] += 1,
            Tier::NoMatch => {}
        }

        if tier.is_match() {
            if let Some(window) = &tier.window {
                println!(
                    "{:<8} {:<8} {}..{} ({} bars) high {:.2} range {:.2}% dist {:.2}% vol x{:.2}",
                    entry.symbol,
                    tier.tier.to_string(),
                    window.start_date,
                    window.end_date,
                    window.days(),
                    window.high,
                    window.range_pct,
                    tier.distance_pct.unwrap_or(f64::NAN),
                    tier.volume_ratio.unwrap_or(f64::NAN)
                );
            }
        } else if diagnose {
            let reason = tier.reason.map(|r| r.to_string()).unwrap_or_default();
            println!("{:<8} {:<8} {}", entry.symbol, tier.tier.to_string(), reason);
        }

        if let Some(diag) = entry.diagnostic.as_ref().filter(|_| diagnose) {
            if diag.insufficient_history {
                continue;
            }
            println!(
                "         score {:.0}%{}",
                diag.score * 100.0,
                if diag.near_miss { " near miss" } else { "" }
            );
            if let Some(best) = &diag.best {
                for check in best.checks.iter().filter(|c| !c.passed) {
                    println!(
                        "           {} {:.2} (required {} {:.2})",
                        check.criterion,
                        check.actual,
                        if check.criterion.is_ceiling() { "<=" } else { ">=" },
                        check.required
                    );
                }
            }
        }
    }
    eprintln!(
        "tier 1: {}, tier 2A: {}, tier 2B: {} of {} symbols ({} skipped)",
        counts[0],
        counts[1],
        counts[2],
        report.results.len(),
        report.skipped.len()
    );
}

fn run_validate(query_path: &Path) -> ExitCode {
    eprintln!("Validating query: {}", query_path.display());
    let query = match load_query(query_path) {
        Ok(q) => q,
        Err(e) => return fail(e),
    };

    let issues = validate_query(&query, &BuiltinRegistry);
    for (i, group) in query.groups.iter().enumerate() {
        let connector = if i == 0 {
            String::new()
        } else {
            format!("{:?} ", group.connector).to_uppercase()
        };
        eprintln!(
            "  {}group {} [{}] {:?} with {} conditions",
            connector,
            group.id,
            group.timeframe,
            group.logic,
            group.conditions.len()
        );
    }

    if issues.is_empty() {
        eprintln!("\nQuery is valid.");
        return ExitCode::SUCCESS;
    }
    for issue in &issues {
        eprintln!("  error: {issue}");
    }
    fail(query_invalid(&issues))
}

pub fn query_invalid(issues: &[QueryIssue]) -> ScreenerError {
    ScreenerError::QueryInvalid {
        reason: format!("{} problem(s) found", issues.len()),
    }
}

fn run_list_symbols(config_path: &Path, timeframe: &str) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let data = match data_adapter(&config, config_path) {
        Ok(d) => d,
        Err(e) => return fail(e),
    };

    let symbols = match data.list_symbols(timeframe) {
        Ok(s) => s,
        Err(e) => return fail(e),
    };
    if symbols.is_empty() {
        eprintln!("No symbols found for timeframe {}", timeframe);
    } else {
        for symbol in &symbols {
            println!("{}", symbol);
        }
        eprintln!("{} symbols found", symbols.len());
    }
    ExitCode::SUCCESS
}
