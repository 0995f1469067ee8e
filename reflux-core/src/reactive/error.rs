//! Error Types
//!
//! Every failure in the reactive system is reported synchronously to the
//! caller that triggered it: a `set`, a `get`, or a notification fan-out.
//! Nothing is retried or recovered internally.

use thiserror::Error;

use super::traits::Capabilities;

/// Errors raised by reactive values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReactiveError {
    /// A value without a setter received a `set`.
    #[error("value is not settable")]
    Unsettable,

    /// A value without a getter received a `get`.
    #[error("value is not gettable")]
    Ungettable,

    /// A computed value was built on top of something that already opens
    /// dependency-tracking frames.
    #[error("cannot make a computed value out of a depender ({capabilities:?}), switch them around")]
    InvalidRole {
        /// Capabilities of the rejected source.
        capabilities: Capabilities,
    },

    /// A fallible evaluator or subscriber reported a failure.
    #[error("evaluation failed: {0}")]
    Evaluation(String),
}

impl ReactiveError {
    /// Build a [`ReactiveError::Evaluation`] from anything displayable.
    pub fn evaluation(message: impl std::fmt::Display) -> Self {
        Self::Evaluation(message.to_string())
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ReactiveError>;
