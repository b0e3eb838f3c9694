//! # AppError
//!
//! Centralized error handling for the Quill ecosystem.
//! Maps domain-specific failures to actionable error types.

use thiserror::Error;

/// The primary error type for all quill-core operations.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found (e.g., User, Post)
    #[error("{0} not found with ID {1}")]
    NotFound(String, String),

    /// Validation failure (e.g., weak password, invalid file type)
    #[error("validation error: {0}")]
    ValidationError(String),

    /// Security/Auth failure (e.g., missing or expired token)
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Infrastructure failure (e.g., DB down, disk full)
    #[error("internal service error: {0}")]
    Internal(String),

    /// Resource already exists (e.g., duplicate email)
    #[error("conflict: {0}")]
    Conflict(String),
}

/// A specialized Result type for Quill logic.
pub type Result<T> = std::result::Result<T, AppError>;
