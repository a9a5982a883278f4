/*
 * SPDX-FileCopyrightText: 2020 Stalwart Labs Ltd <hello@stalw.art>
 *
 * SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-SEL
 */

//! Backup labels and the date-based label selection

use crate::error::{Result, SchedulerError};
use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum number of backups the service retains per volume
pub const MAX_RETAINED_BACKUPS: u32 = 32;

/// Retention tier embedded in a backup name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackupLabel {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl BackupLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackupLabel::Daily => "daily",
            BackupLabel::Weekly => "weekly",
            BackupLabel::Monthly => "monthly",
            BackupLabel::Yearly => "yearly",
        }
    }
}

impl fmt::Display for BackupLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Number of backups to keep for each label
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionCaps {
    pub daily: u32,
    pub weekly: u32,
    pub monthly: u32,
    pub yearly: u32,
}

/// The label chosen for an invocation together with its cap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveLabel {
    pub label: BackupLabel,
    pub cap: u32,
}

impl RetentionCaps {
    pub fn cap(&self, label: BackupLabel) -> u32 {
        match label {
            BackupLabel::Daily => self.daily,
            BackupLabel::Weekly => self.weekly,
            BackupLabel::Monthly => self.monthly,
            BackupLabel::Yearly => self.yearly,
        }
    }

    pub fn total(&self) -> u64 {
        [self.daily, self.weekly, self.monthly, self.yearly]
            .iter()
            .map(|cap| u64::from(*cap))
            .sum()
    }

    /// Reject cap sets the service cannot hold
    pub fn validate(&self) -> Result<()> {
        if self.total() > u64::from(MAX_RETAINED_BACKUPS) {
            return Err(SchedulerError::config(format!(
                "The maximum number of backups is {}, but the snapshots to keep add up to {}",
                MAX_RETAINED_BACKUPS,
                self.total()
            )));
        }
        Ok(())
    }

    /// Pick the label that applies on `date`.
    ///
    /// Yearly beats monthly beats weekly beats daily; a tier with a zero cap
    /// is never selected. Returns `None` when no tier applies.
    pub fn select(&self, date: NaiveDate) -> Option<ActiveLabel> {
        let label = if self.yearly > 0 && date.month() == 1 && date.day() == 1 {
            BackupLabel::Yearly
        } else if self.monthly > 0 && date.day() == 1 {
            BackupLabel::Monthly
        } else if self.weekly > 0 && date.weekday() == Weekday::Sun {
            BackupLabel::Weekly
        } else if self.daily > 0 {
            BackupLabel::Daily
        } else {
            return None;
        };

        Some(ActiveLabel {
            label,
            cap: self.cap(label),
        })
    }
}
