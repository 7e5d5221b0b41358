#![allow(dead_code)]

use chrono::{Duration, NaiveDate};
use samscreen::domain::error::ScreenerError;
pub use samscreen::domain::ohlcv::OhlcvBar;
use samscreen::domain::query::{ConditionState, GroupState, IndicatorSpec, Logic, QueryState, RightOperand};
use samscreen::ports::data_port::DataPort;
use std::collections::HashMap;

/// In-memory bar source keyed by `(symbol, timeframe)`.
pub struct MockDataPort {
    pub data: HashMap<(String, String), Vec<OhlcvBar>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, symbol: &str, timeframe: &str, bars: Vec<OhlcvBar>) -> Self {
        self.data
            .insert((symbol.to_string(), timeframe.to_string()), bars);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_ohlcv(&self, symbol: &str, timeframe: &str) -> Result<Vec<OhlcvBar>, ScreenerError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(ScreenerError::Data {
                reason: reason.clone(),
            });
        }
        self.data
            .get(&(symbol.to_string(), timeframe.to_string()))
            .cloned()
            .ok_or_else(|| ScreenerError::NoData {
                symbol: symbol.to_string(),
                timeframe: timeframe.to_string(),
            })
    }

    fn list_symbols(&self, timeframe: &str) -> Result<Vec<String>, ScreenerError> {
        let mut symbols: Vec<String> = self
            .data
            .keys()
            .filter(|(_, tf)| tf == timeframe)
            .map(|(symbol, _)| symbol.clone())
            .collect();
        symbols.sort();
        Ok(symbols)
    }
}

pub fn start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
}

pub fn make_bar(day: usize, open: f64, high: f64, low: f64, close: f64, volume: f64) -> OhlcvBar {
    OhlcvBar {
        date: start_date() + Duration::days(day as i64),
        open,
        high,
        low,
        close,
        volume,
    }
}

/// Flat bars (`high == low == close`) from a list of closes, one per day.
pub fn bars_from_closes(closes: &[f64]) -> Vec<OhlcvBar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| make_bar(i, c, c, c, c, 1000.0))
        .collect()
}

/// 34 flat bars at 80, a 20-bar climb to ~100, a 15-bar box between 99.6
/// and 103, then one current bar.
pub fn consolidation_fixture(current_close: f64, current_volume: f64, window_volume: f64) -> Vec<OhlcvBar> {
    let mut bars = Vec::with_capacity(70);
    for i in 0..34 {
        bars.push(make_bar(i, 80.0, 80.5, 79.5, 80.0, 1000.0));
    }
    for k in 0..20 {
        let open = 81.0 + 0.9 * k as f64;
        let close = open + 0.9;
        bars.push(make_bar(34 + k, open, close, open, close, 1000.0));
    }
    for k in 0..15 {
        let (open, close) = if k % 2 == 0 { (101.0, 102.0) } else { (102.0, 101.0) };
        bars.push(make_bar(54 + k, open, 103.0, 99.6, close, window_volume));
    }
    bars.push(make_bar(
        69,
        102.0,
        current_close.max(102.0) + 0.5,
        current_close.min(102.0) - 0.5,
        current_close,
        current_volume,
    ));
    bars
}

pub fn close_above(value: f64) -> ConditionState {
    ConditionState::new(IndicatorSpec::new("close"), "greater_than", RightOperand::scalar(value))
}

pub fn single_group_query(name: &str, timeframe: &str, condition: ConditionState) -> QueryState {
    QueryState {
        name: name.to_string(),
        groups: vec![GroupState::new("g1", Logic::And, timeframe).with_condition(condition)],
        ..QueryState::default()
    }
}

pub fn symbols(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

pub fn write_bars_csv(dir: &std::path::Path, symbol: &str, timeframe: &str, bars: &[OhlcvBar]) {
    let mut out = String::from("date,open,high,low,close,volume\n");
    for b in bars {
        out.push_str(&format!(
            "{},{},{},{},{},{}\n",
            b.date, b.open, b.high, b.low, b.close, b.volume
        ));
    }
    std::fs::write(dir.join(format!("{symbol}_{timeframe}.csv")), out).unwrap();
}
