//! Universe resolution and per-symbol fan-out.
//!
//! Symbols come from the `[scan] symbols` list or, when that is absent, from
//! whatever the data source holds. Each symbol is evaluated independently on
//! the rayon pool; a symbol whose data cannot be loaded is logged and skipped
//! so one bad file never halts the batch.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use log::{debug, warn};
use rayon::prelude::*;

use crate::domain::breakout::{
    DiagnosticResult, ThresholdsConfig, TierResult, classify_with_thresholds,
    diagnose_with_thresholds,
};
use crate::domain::error::ScreenerError;
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::query::QueryState;
use crate::domain::query_eval::{EvalResult, evaluate_query, evaluate_query_as_of};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::indicator_port::IndicatorRegistry;

#[derive(Debug, Clone, thiserror::Error)]
pub enum UniverseError {
    #[error("empty token in symbol list")]
    EmptyToken,

    #[error("duplicate symbol: {0}")]
    DuplicateSymbol(String),
}

/// Comma-separated symbols, trimmed and upper-cased. Empty tokens and
/// repeats are rejected.
pub fn parse_symbols(input: &str) -> Result<Vec<String>, UniverseError> {
    let mut symbols = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(UniverseError::EmptyToken);
        }
        let symbol = trimmed.to_uppercase();
        if !seen.insert(symbol.clone()) {
            return Err(UniverseError::DuplicateSymbol(symbol));
        }
        symbols.push(symbol);
    }

    Ok(symbols)
}

/// `[scan] symbols` when configured, otherwise every symbol the data source
/// lists for `timeframe`.
pub fn resolve_symbols(
    config: &dyn ConfigPort,
    data_port: &dyn DataPort,
    timeframe: &str,
) -> Result<Vec<String>, ScreenerError> {
    if let Some(raw) = config
        .get_string("scan", "symbols")
        .filter(|raw| !raw.trim().is_empty())
    {
        return parse_symbols(&raw).map_err(|e| ScreenerError::ConfigInvalid {
            section: "scan".to_string(),
            key: "symbols".to_string(),
            reason: e.to_string(),
        });
    }
    let mut symbols = data_port.list_symbols(timeframe)?;
    symbols.sort();
    symbols.dedup();
    Ok(symbols)
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedSymbol {
    pub symbol: String,
    pub reason: String,
}

/// Per-symbol outcomes, sorted by symbol.
#[derive(Debug, Clone)]
pub struct ScanReport<T> {
    pub results: Vec<T>,
    pub skipped: Vec<SkippedSymbol>,
}

impl<T> ScanReport<T> {
    fn from_outcomes(outcomes: Vec<Result<T, SkippedSymbol>>, symbol_of: impl Fn(&T) -> &str) -> Self {
        let mut results = Vec::new();
        let mut skipped = Vec::new();
        for outcome in outcomes {
            match outcome {
                Ok(r) => results.push(r),
                Err(s) => skipped.push(s),
            }
        }
        results.sort_by(|a, b| symbol_of(a).cmp(symbol_of(b)));
        skipped.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        Self { results, skipped }
    }
}

#[derive(Debug, Clone)]
pub struct SymbolEvaluation {
    pub symbol: String,
    pub result: EvalResult,
}

/// Evaluate `query` for every symbol. Timeframes with no data leave their
/// groups unmatched; any other load failure skips the symbol.
pub fn scan_query<D, R>(
    data_port: &D,
    registry: &R,
    query: &QueryState,
    symbols: &[String],
    as_of: Option<NaiveDate>,
) -> ScanReport<SymbolEvaluation>
where
    D: DataPort + Sync + ?Sized,
    R: IndicatorRegistry + Sync + ?Sized,
{
    let timeframes = query.timeframes();
    let outcomes: Vec<_> = symbols
        .par_iter()
        .map(|symbol| -> Result<SymbolEvaluation, SkippedSymbol> {
            let bars = load_timeframes(data_port, symbol, &timeframes)?;
            let result = match as_of {
                Some(date) => evaluate_query_as_of(query, &bars, registry, date),
                None => evaluate_query(query, &bars, registry),
            };
            debug!("{symbol}: matched={}", result.matched);
            Ok(SymbolEvaluation {
                symbol: symbol.clone(),
                result,
            })
        })
        .collect();
    ScanReport::from_outcomes(outcomes, |e| e.symbol.as_str())
}

fn load_timeframes<D>(
    data_port: &D,
    symbol: &str,
    timeframes: &[String],
) -> Result<HashMap<String, Vec<OhlcvBar>>, SkippedSymbol>
where
    D: DataPort + ?Sized,
{
    let mut bars = HashMap::new();
    for tf in timeframes {
        match data_port.fetch_ohlcv(symbol, tf) {
            Ok(series) => {
                bars.insert(tf.clone(), series);
            }
            Err(ScreenerError::NoData { .. }) => {
                debug!("{symbol}: no {tf} data");
            }
            Err(e) => return Err(skip(symbol, e)),
        }
    }
    if !timeframes.is_empty() && bars.is_empty() {
        return Err(skip(
            symbol,
            ScreenerError::NoData {
                symbol: symbol.to_string(),
                timeframe: timeframes.join(","),
            },
        ));
    }
    Ok(bars)
}

fn skip(symbol: &str, err: ScreenerError) -> SkippedSymbol {
    warn!("skipping {symbol}: {err}");
    SkippedSymbol {
        symbol: symbol.to_string(),
        reason: err.to_string(),
    }
}

#[derive(Debug, Clone)]
pub struct SymbolBreakout {
    pub symbol: String,
    pub tier: TierResult,
    pub diagnostic: Option<DiagnosticResult>,
}

/// Tier every symbol on one timeframe, optionally attaching the diagnostic
/// score.
pub fn scan_breakouts<D>(
    data_port: &D,
    thresholds: &ThresholdsConfig,
    timeframe: &str,
    symbols: &[String],
    diagnose: bool,
) -> ScanReport<SymbolBreakout>
where
    D: DataPort + Sync + ?Sized,
{
    let outcomes: Vec<_> = symbols
        .par_iter()
        .map(|symbol| -> Result<SymbolBreakout, SkippedSymbol> {
            let bars = data_port
                .fetch_ohlcv(symbol, timeframe)
                .map_err(|e| skip(symbol, e))?;
            let tier = classify_with_thresholds(&bars, thresholds);
            debug!("{symbol}: {}", tier.tier);
            let diagnostic = diagnose.then(|| diagnose_with_thresholds(&bars, thresholds));
            Ok(SymbolBreakout {
                symbol: symbol.clone(),
                tier,
                diagnostic,
            })
        })
        .collect();
    ScanReport::from_outcomes(outcomes, |b| b.symbol.as_str())
}
