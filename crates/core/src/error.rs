// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for fitsync-core operations.

use thiserror::Error;

/// All possible errors that can occur in fitsync-core operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid action id: {0}")]
    InvalidActionId(String),

    #[error("invalid collection: '{0}'\n  hint: valid collections are: workouts, exercises, progress, profile")]
    InvalidCollection(String),

    #[error("invalid conflict strategy: '{0}'\n  hint: valid strategies are: local, server, merge")]
    InvalidStrategy(String),

    #[error("invalid action kind: '{0}'\n  hint: valid kinds are: create_workout, update_workout, create_exercise, update_progress, update_profile")]
    InvalidActionKind(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized Result type for fitsync-core operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
