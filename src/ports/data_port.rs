//! Bar supply port trait.

use crate::domain::error::ScreenerError;
use crate::domain::ohlcv::OhlcvBar;

pub trait DataPort {
    /// Bars for one symbol on one timeframe, ascending by date.
    fn fetch_ohlcv(&self, symbol: &str, timeframe: &str) -> Result<Vec<OhlcvBar>, ScreenerError>;

    fn list_symbols(&self, timeframe: &str) -> Result<Vec<String>, ScreenerError>;
}
