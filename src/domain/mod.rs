//! Core domain types and logic.

pub mod breakout;
pub mod config_validation;
pub mod error;
pub mod indicator;
pub mod ohlcv;
pub mod operator;
pub mod query;
pub mod query_eval;
pub mod query_validation;
pub mod universe;
