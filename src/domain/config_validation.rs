//! Configuration validation.
//!
//! Checked before any data is loaded so a bad config fails fast with the
//! offending section and key.

use crate::domain::breakout::{ScanContext, ThresholdsConfig};
use crate::domain::error::ScreenerError;
use crate::domain::universe::parse_symbols;
use crate::ports::config_port::ConfigPort;

pub fn validate_scan_config(config: &dyn ConfigPort) -> Result<(), ScreenerError> {
    validate_data_dir(config)?;
    validate_symbols(config)?;
    validate_timeframes(config)?;
    validate_threads(config)?;
    Ok(())
}

/// Checks `[breakout]` and returns the thresholds for the resolved context,
/// overrides applied. `context_override` wins over `[breakout] context`.
pub fn validate_breakout_config(
    config: &dyn ConfigPort,
    context_override: Option<ScanContext>,
) -> Result<(ScanContext, ThresholdsConfig), ScreenerError> {
    validate_data_dir(config)?;
    validate_symbols(config)?;
    validate_threads(config)?;

    let context = match context_override {
        Some(ctx) => ctx,
        None => match config.get_string("breakout", "context") {
            Some(raw) => raw.parse().map_err(|reason| invalid("breakout", "context", reason))?,
            None => ScanContext::default(),
        },
    };
    let thresholds = ThresholdsConfig::from_config(config, context);
    validate_thresholds(&thresholds, &format!("breakout.{}", context.id()))?;
    Ok((context, thresholds))
}

pub fn validate_thresholds(t: &ThresholdsConfig, section: &str) -> Result<(), ScreenerError> {
    if t.consolidation_min_days > t.consolidation_max_days {
        return Err(invalid(
            section,
            "consolidation_min_days",
            "consolidation_min_days must not exceed consolidation_max_days",
        ));
    }
    if t.min_history_bars < t.consolidation_max_days + 1 {
        return Err(invalid(
            section,
            "min_history_bars",
            "min_history_bars must cover the longest window plus the current bar",
        ));
    }
    let positive = [
        ("max_range_pct", t.max_range_pct),
        ("touch_tolerance_pct", t.touch_tolerance_pct),
        ("large_red_candle_pct", t.large_red_candle_pct),
        ("max_volume_contraction_ratio", t.max_volume_contraction_ratio),
        ("min_breakout_volume_ratio", t.min_breakout_volume_ratio),
        ("tier_2a_distance_pct", t.tier_2a_distance_pct),
        ("tier_2b_distance_pct", t.tier_2b_distance_pct),
    ];
    for (key, value) in positive {
        if value <= 0.0 {
            return Err(invalid(section, key, format!("{key} must be positive")));
        }
    }
    if !(0.0..=1.0).contains(&t.min_close_position) {
        return Err(invalid(
            section,
            "min_close_position",
            "min_close_position must be between 0 and 1",
        ));
    }
    if t.tier_2a_distance_pct > t.tier_2b_distance_pct {
        return Err(invalid(
            section,
            "tier_2a_distance_pct",
            "tier_2a_distance_pct must not exceed tier_2b_distance_pct",
        ));
    }
    if t.min_prior_move_pct_relaxed > t.min_prior_move_pct {
        return Err(invalid(
            section,
            "min_prior_move_pct_relaxed",
            "relaxed prior move must not be stricter than min_prior_move_pct",
        ));
    }
    if t.max_volume_contraction_ratio_relaxed < t.max_volume_contraction_ratio {
        return Err(invalid(
            section,
            "max_volume_contraction_ratio_relaxed",
            "relaxed contraction ratio must not be stricter than max_volume_contraction_ratio",
        ));
    }
    Ok(())
}

fn validate_data_dir(config: &dyn ConfigPort) -> Result<(), ScreenerError> {
    match config.get_string("data", "dir") {
        Some(dir) if !dir.trim().is_empty() => Ok(()),
        _ => Err(ScreenerError::ConfigMissing {
            section: "data".to_string(),
            key: "dir".to_string(),
        }),
    }
}

fn validate_symbols(config: &dyn ConfigPort) -> Result<(), ScreenerError> {
    if let Some(raw) = config.get_string("scan", "symbols") {
        if raw.trim().is_empty() {
            return Ok(());
        }
        parse_symbols(&raw).map_err(|e| invalid("scan", "symbols", e.to_string()))?;
    }
    Ok(())
}

fn validate_timeframes(config: &dyn ConfigPort) -> Result<(), ScreenerError> {
    let has_blank = config
        .get_string("scan", "timeframes")
        .is_some_and(|raw| raw.split(',').any(|tf| tf.trim().is_empty()));
    if has_blank {
        return Err(invalid("scan", "timeframes", "empty entry in timeframes list"));
    }
    Ok(())
}

fn validate_threads(config: &dyn ConfigPort) -> Result<(), ScreenerError> {
    if config.get_string("scan", "threads").is_some() && config.get_int("scan", "threads", 0) < 1 {
        return Err(invalid("scan", "threads", "threads must be a positive integer"));
    }
    Ok(())
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> ScreenerError {
    ScreenerError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}
