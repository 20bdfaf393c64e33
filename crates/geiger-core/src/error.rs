//! Error types for the fallible edges of the core
//!
//! The measurement pipeline itself never fails; only settings persistence
//! and hardware bring-up report errors.

use thiserror_no_std::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsError {
    #[error("settings could not be encoded")]
    Encode,
    #[error("stored settings are corrupt")]
    Decode,
    #[error("unsupported settings format version {0}")]
    UnsupportedVersion(u8),
    #[error("settings storage failed: {0}")]
    Storage(&'static str),
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterError {
    #[error("pulse counter configuration rejected: {0}")]
    Config(&'static str),
}
