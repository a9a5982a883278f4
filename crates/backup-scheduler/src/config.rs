/*
 * SPDX-FileCopyrightText: 2020 Stalwart Labs Ltd <hello@stalw.art>
 *
 * SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-SEL
 */

//! Configuration for the backup scheduler, read from environment variables

use crate::{
    api::DEFAULT_API_URL,
    error::{Result, SchedulerError},
    label::RetentionCaps,
    token::SecretCoordinate,
};
use serde::{Deserialize, Serialize};
use tracing::info;

pub const ENV_PROJECT_NUMBER: &str = "PROJECT_NUMBER";
pub const ENV_VOLUMES: &str = "VOLUMES";
pub const ENV_DAILY: &str = "DAILY_SNAPSHOTS_TO_KEEP";
pub const ENV_WEEKLY: &str = "WEEKLY_SNAPSHOTS_TO_KEEP";
pub const ENV_MONTHLY: &str = "MONTHLY_SNAPSHOTS_TO_KEEP";
pub const ENV_YEARLY: &str = "YEARLY_SNAPSHOTS_TO_KEEP";
pub const ENV_API_URL: &str = "CVS_API_URL";
pub const ENV_SECRET_PROJECT: &str = "SECRET_PROJECT";
pub const ENV_SECRET_NAME: &str = "SECRET_NAME";
pub const ENV_DRY_RUN: &str = "DRY_RUN";

pub const DEFAULT_SECRET_PROJECT: &str = "cv-solution-architect-lab";
pub const DEFAULT_SECRET_NAME: &str = "cvs-backup-scheduler";

/// Volumes to back up.
///
/// A volume is selected when its id occurs anywhere in the configured
/// string, so ids may be separated by commas, spaces or anything else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeSelector(String);

impl VolumeSelector {
    pub fn new(volumes: impl Into<String>) -> Self {
        Self(volumes.into())
    }

    pub fn matches(&self, volume_id: &str) -> bool {
        !volume_id.is_empty() && self.0.contains(volume_id)
    }
}

/// Main configuration of an invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Project number, or a project id to resolve
    pub project: String,
    pub volumes: VolumeSelector,
    pub caps: RetentionCaps,
    pub api_url: String,
    pub secret: SecretCoordinate,
    /// Plan rotations without deleting or creating backups
    pub dry_run: bool,
}

impl SchedulerConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through `lookup`, which returns a variable's value
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| -> Result<String> {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .ok_or_else(|| {
                    SchedulerError::config(format!(
                        "The required environment variable {} is missing",
                        key
                    ))
                })
        };

        let project = required(ENV_PROJECT_NUMBER)?.trim().to_string();
        let volumes = VolumeSelector::new(required(ENV_VOLUMES)?);

        let cap = |key: &str| -> Result<u32> {
            let value = required(key)?;
            value.trim().parse::<u32>().map_err(|e| {
                SchedulerError::config(format!("Invalid {} '{}': {}", key, value, e))
            })
        };
        let caps = RetentionCaps {
            daily: cap(ENV_DAILY)?,
            weekly: cap(ENV_WEEKLY)?,
            monthly: cap(ENV_MONTHLY)?,
            yearly: cap(ENV_YEARLY)?,
        };
        caps.validate()?;

        let optional = |key: &str, default: &str| -> String {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let dry_run = match lookup(ENV_DRY_RUN) {
            Some(value) if !value.trim().is_empty() => value.trim().parse::<bool>().map_err(|e| {
                SchedulerError::config(format!("Invalid {} '{}': {}", ENV_DRY_RUN, value, e))
            })?,
            _ => false,
        };

        let config = Self {
            project,
            volumes,
            caps,
            api_url: optional(ENV_API_URL, DEFAULT_API_URL),
            secret: SecretCoordinate::latest(
                optional(ENV_SECRET_PROJECT, DEFAULT_SECRET_PROJECT),
                optional(ENV_SECRET_NAME, DEFAULT_SECRET_NAME),
            ),
            dry_run,
        };

        info!(
            "Loaded configuration: daily={} weekly={} monthly={} yearly={} dry_run={}",
            caps.daily, caps.weekly, caps.monthly, caps.yearly, config.dry_run
        );
        Ok(config)
    }
}
