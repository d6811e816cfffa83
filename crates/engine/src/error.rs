//! The module contains the errors the engine can throw.
//!
//! - [`EngineError`] for malformed values and broken ledger invariants.
//! - [`SplitError`] for expense forms that must not reach the backend.
//!
//! [`SplitError`] messages are meant to be shown to the user as they are.
use thiserror::Error;

use crate::{MoneyCents, Percent};

/// Engine custom errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Invalid percentage: {0}")]
    InvalidPercent(String),
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Invalid split: {0}")]
    InvalidSplit(String),
    #[error("Invalid group: {0}")]
    InvalidGroup(String),
}

/// Validation failures of the split form, checked in declaration order.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SplitError {
    #[error("Please select at least one user to split with")]
    NoMembers,
    #[error("Please enter an expense title")]
    EmptyTitle,
    #[error("Please enter a valid total amount")]
    InvalidTotal,
    #[error("Please select who paid this expense")]
    NoPayer,
    #[error("Percentages must add up to 100%. Current total: {0}%")]
    PercentageSum(Percent),
    #[error("Manual amounts must add up to {expected}. Current total: {actual}")]
    ManualSum {
        expected: MoneyCents,
        actual: MoneyCents,
    },
    #[error("Amount for {0} must be between 0 and the total amount")]
    ShareOutOfRange(String),
    #[error("Amounts are too large")]
    AmountTooLarge,
}
