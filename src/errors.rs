//! Errors used throughout the search engine.
//!
//! Each subsystem owns one enum so callers can match on the failure mode that
//! concerns them:
//! - `ConfigError` for rejected configuration values (raised on assignment,
//!   never deferred to search time).
//! - `CacheError` for cache/table construction with an unusable size.
//! - `TableFormatError` for a persisted table that cannot be loaded. A single
//!   bad entry fails the whole load.
//! - `PositionError` for failures reported by a position model.
//! - `SearchError` as the umbrella returned by the search driver.

use thiserror::Error;

/// Rejected configuration value.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A numeric field received a value outside its allowed range.
    #[error("{field} must be positive, got {value}")]
    OutOfRange { field: &'static str, value: i64 },

    /// Option text that could not be interpreted.
    #[error("invalid value '{value}' for {name}")]
    InvalidValue { name: String, value: String },

    /// Option name not recognised by the receiver.
    #[error("unknown option '{0}'")]
    UnknownOption(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Cache sizing failures, raised at construction.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    #[error("cache capacity must be at least one entry")]
    ZeroCapacity,

    #[error("memory budget of {budget_bytes} bytes cannot hold one entry of {entry_bytes} bytes")]
    BudgetTooSmall { budget_bytes: u64, entry_bytes: usize },
}

pub type CacheResult<T> = Result<T, CacheError>;

/// Failures while reading or writing a persisted transposition table.
#[derive(Error, Debug)]
pub enum TableFormatError {
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("entry {entry} is missing attribute '{attribute}'")]
    MissingAttribute { entry: usize, attribute: &'static str },

    #[error("entry {entry} has invalid {attribute} '{value}': {reason}")]
    InvalidAttribute {
        entry: usize,
        attribute: &'static str,
        value: String,
        reason: String,
    },

    #[error(transparent)]
    Cache(#[from] CacheError),
}

pub type TableFormatResult<T> = Result<T, TableFormatError>;

/// Failures raised by a position model while the search drives it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PositionError {
    #[error("illegal move '{0}'")]
    IllegalMove(String),

    #[error("no move to undo")]
    NothingToUndo,

    #[error("inconsistent position: {0}")]
    Inconsistent(String),
}

pub type PositionResult<T> = Result<T, PositionError>;

/// Umbrella error returned by the search driver and engine layer.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SearchError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error("position model failed: {0}")]
    Position(#[from] PositionError),
}

pub type SearchResult<T> = Result<T, SearchError>;
