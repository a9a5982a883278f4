/*
 * SPDX-FileCopyrightText: 2020 Stalwart Labs Ltd <hello@stalw.art>
 *
 * SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-SEL
 */

//! Error types for the backup scheduler

use thiserror::Error;

/// Result type for scheduler operations
pub type Result<T> = std::result::Result<T, SchedulerError>;

/// Scheduler errors
#[derive(Error, Debug)]
pub enum SchedulerError {
    /// Missing or invalid environment variable, cap sum exceeded
    #[error("Configuration error: {0}")]
    Config(String),

    /// Project identifier could not be resolved to a project number
    #[error("Cannot resolve project '{0}' to a project number")]
    ProjectNotFound(String),

    /// Secret retrieval or token signing failed
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Listing or creating failed; aborts the invocation
    #[error("{method} {url} failed: {reason}")]
    Transport {
        method: &'static str,
        url: String,
        reason: String,
    },

    /// Deleting a backup failed; the invocation carries on
    #[error("DELETE {url} failed: {reason}")]
    Delete { url: String, reason: String },

    /// A backup name did not match `<volume>_<label>_<timestamp>`
    #[error("Invalid backup name '{name}': {reason}")]
    Parse { name: String, reason: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Token signing error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("Base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),
}

impl SchedulerError {
    pub fn config<T: Into<String>>(msg: T) -> Self {
        Self::Config(msg.into())
    }

    pub fn auth<T: Into<String>>(msg: T) -> Self {
        Self::Auth(msg.into())
    }

    pub fn transport<U: Into<String>, R: ToString>(method: &'static str, url: U, reason: R) -> Self {
        Self::Transport {
            method,
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    pub fn parse<N: Into<String>, R: Into<String>>(name: N, reason: R) -> Self {
        Self::Parse {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Whether the error must stop the current invocation.
    ///
    /// Failed deletions and unparseable backup names are recovered where
    /// they happen; everything else aborts.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Delete { .. } | Self::Parse { .. })
    }

    /// Whether the error happened while authenticating the invocation
    pub fn is_auth(&self) -> bool {
        matches!(
            self,
            Self::ProjectNotFound(_) | Self::Auth(_) | Self::Jwt(_) | Self::Base64(_)
        )
    }
}
