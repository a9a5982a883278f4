/*
 * SPDX-FileCopyrightText: 2020 Stalwart Labs Ltd <hello@stalw.art>
 *
 * SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-SEL
 */

//! Backup name encoding.
//!
//! Scheduled backups are named `<volume-name>_<label>_<MM-DD-YYYY-HH-MM-SS>`.
//! Volume names may contain underscores themselves, so the label and the
//! timestamp are always taken from the end of the name.

use crate::{
    error::{Result, SchedulerError},
    label::BackupLabel,
};
use chrono::NaiveDateTime;

/// Separates the volume name, label and timestamp
pub const SEGMENT_DELIMITER: char = '_';

/// Separates the six timestamp components
pub const TIMESTAMP_DELIMITER: char = '-';

/// `chrono` format of the timestamp segment
pub const TIMESTAMP_FORMAT: &str = "%m-%d-%Y-%H-%M-%S";

/// Raw segments of a backup name, borrowed from the name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NameSegments<'a> {
    pub volume: &'a str,
    pub label: &'a str,
    pub timestamp: &'a str,
}

impl<'a> NameSegments<'a> {
    /// Split a name into its last two underscore segments and the rest.
    ///
    /// Returns `None` when the name has fewer than two underscores. A name
    /// starting with an underscore yields an empty volume segment.
    pub fn split(name: &'a str) -> Option<Self> {
        let mut parts = name.rsplitn(3, SEGMENT_DELIMITER);
        let timestamp = parts.next()?;
        let label = parts.next()?;
        let volume = parts.next()?;

        Some(Self {
            volume,
            label,
            timestamp,
        })
    }

    /// The timestamp segment has the six dash-separated components of
    /// `MM-DD-YYYY-HH-MM-SS`
    pub fn has_timestamp_shape(&self) -> bool {
        self.timestamp.matches(TIMESTAMP_DELIMITER).count() == 5
    }

    pub fn parse_timestamp(&self) -> Option<NaiveDateTime> {
        NaiveDateTime::parse_from_str(self.timestamp, TIMESTAMP_FORMAT).ok()
    }
}

/// A fully decoded scheduled backup name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupName {
    pub volume: String,
    pub label: String,
    pub created_at: NaiveDateTime,
}

impl BackupName {
    /// Build the name of a new backup taken at `at`
    pub fn format(volume_name: &str, label: BackupLabel, at: NaiveDateTime) -> String {
        format!(
            "{}{}{}{}{}",
            volume_name,
            SEGMENT_DELIMITER,
            label,
            SEGMENT_DELIMITER,
            at.format(TIMESTAMP_FORMAT)
        )
    }

    /// Decode a backup name, rejecting anything not produced by [`BackupName::format`]
    /// or a compatible tool.
    pub fn parse(name: &str) -> Result<Self> {
        let segments = NameSegments::split(name)
            .ok_or_else(|| SchedulerError::parse(name, "missing label and timestamp segments"))?;

        if !segments.has_timestamp_shape() {
            return Err(SchedulerError::parse(
                name,
                format!("timestamp '{}' is not MM-DD-YYYY-HH-MM-SS", segments.timestamp),
            ));
        }

        let created_at = segments.parse_timestamp().ok_or_else(|| {
            SchedulerError::parse(
                name,
                format!("timestamp '{}' is not a valid date and time", segments.timestamp),
            )
        })?;

        Ok(Self {
            volume: segments.volume.to_string(),
            label: segments.label.to_string(),
            created_at,
        })
    }
}
