//! Domain error types.
//!
//! Evaluation itself never returns these: malformed conditions and data gaps
//! resolve to "no match". Errors only come from the outer layers (config,
//! bar supply, query files).

/// Top-level error type for samscreen.
#[derive(Debug, thiserror::Error)]
pub enum ScreenerError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("query parse error in {file}: {reason}")]
    QueryParse { file: String, reason: String },

    #[error("invalid query: {reason}")]
    QueryInvalid { reason: String },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("no data for {symbol} ({timeframe})")]
    NoData { symbol: String, timeframe: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&ScreenerError> for std::process::ExitCode {
    fn from(err: &ScreenerError) -> Self {
        let code: u8 = match err {
            ScreenerError::Io(_) => 1,
            ScreenerError::ConfigParse { .. }
            | ScreenerError::ConfigMissing { .. }
            | ScreenerError::ConfigInvalid { .. } => 2,
            ScreenerError::Data { .. } => 3,
            ScreenerError::QueryParse { .. } | ScreenerError::QueryInvalid { .. } => 4,
            ScreenerError::NoData { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
