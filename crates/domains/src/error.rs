//! # AppError
//!
//! Centralized error handling for the forum core.
//! Every public action converts failures into one of these variants; nothing
//! else crosses the caller-facing boundary.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// The primary error type for all domain operations.
#[derive(Error, Debug)]
pub enum AppError {
    /// No session present.
    #[error("you must be logged in")]
    Unauthorized,

    /// Session present but lacking role, ownership, or moderation rights.
    #[error("{0}")]
    Forbidden(String),

    /// Malformed input against the declared rules; carries the first
    /// violated rule's message.
    #[error("{0}")]
    Validation(String),

    /// Referenced entity missing, or present but not owned by the caller
    /// where ownership is required (the two are deliberately
    /// indistinguishable for notifications).
    #[error("{0} not found with ID {1}")]
    NotFound(String, String),

    /// Fixed-window quota exhausted; `reset_at` tells the caller when the
    /// window reopens.
    #[error("too many requests, try again later")]
    RateLimited { reset_at: DateTime<Utc> },

    /// Resource already exists (e.g. duplicate reaction under a concurrent
    /// double-toggle).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Infrastructure failure. Logged with full detail server-side and
    /// surfaced to callers as a generic message.
    #[error("internal service error")]
    Internal(String),
}

impl AppError {
    pub fn not_found(entity: &str, id: impl ToString) -> Self {
        AppError::NotFound(entity.to_string(), id.to_string())
    }

    pub fn internal(err: impl std::fmt::Display) -> Self {
        AppError::Internal(err.to_string())
    }
}

/// A specialized Result type for forum logic.
pub type Result<T> = std::result::Result<T, AppError>;
