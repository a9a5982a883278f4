/*
 * SPDX-FileCopyrightText: 2020 Stalwart Labs Ltd <hello@stalw.art>
 *
 * SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-SEL
 */

//! Outcome of an invocation, per volume

use crate::label::ActiveLabel;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// What happened to one selected volume
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum VolumeStatus {
    /// Storage class does not support backups
    Unsupported { storage_class: String },
    /// Dry run: nothing was deleted or created
    Planned { would_evict: Option<String> },
    /// A new backup was requested
    BackedUp {
        created: String,
        evicted: Option<String>,
        delete_error: Option<String>,
    },
    /// A fatal error stopped the invocation at this volume
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeReport {
    pub volume_id: String,
    pub volume_name: String,
    /// Backups carrying the active label before rotation
    pub matching_backups: usize,
    #[serde(flatten)]
    pub status: VolumeStatus,
}

/// Summary of one scheduler invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationReport {
    pub started_at: NaiveDateTime,
    /// `None` when no label applies on this date
    pub active: Option<ActiveLabel>,
    pub dry_run: bool,
    pub volumes: Vec<VolumeReport>,
    /// Error that stopped volume processing early
    pub aborted: Option<String>,
}

impl InvocationReport {
    pub fn new(started_at: NaiveDateTime, active: Option<ActiveLabel>, dry_run: bool) -> Self {
        Self {
            started_at,
            active,
            dry_run,
            volumes: Vec::new(),
            aborted: None,
        }
    }

    pub fn record(&mut self, volume: VolumeReport) {
        self.volumes.push(volume);
    }

    pub fn backups_created(&self) -> usize {
        self.volumes
            .iter()
            .filter(|v| matches!(v.status, VolumeStatus::BackedUp { .. }))
            .count()
    }

    pub fn backups_evicted(&self) -> usize {
        self.volumes
            .iter()
            .filter(|v| matches!(v.status, VolumeStatus::BackedUp { evicted: Some(_), .. }))
            .count()
    }

    pub fn delete_failures(&self) -> usize {
        self.volumes
            .iter()
            .filter(|v| matches!(v.status, VolumeStatus::BackedUp { delete_error: Some(_), .. }))
            .count()
    }

    pub fn is_complete(&self) -> bool {
        self.aborted.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::label::BackupLabel;
    use chrono::NaiveDate;

    fn report() -> InvocationReport {
        let started_at = NaiveDate::from_ymd_opt(2024, 5, 14)
            .unwrap()
            .and_hms_opt(2, 0, 0)
            .unwrap();
        InvocationReport::new(
            started_at,
            Some(ActiveLabel { label: BackupLabel::Daily, cap: 3 }),
            false,
        )
    }

    fn volume(id: &str, status: VolumeStatus) -> VolumeReport {
        VolumeReport {
            volume_id: id.to_string(),
            volume_name: format!("name-{}", id),
            matching_backups: 3,
            status,
        }
    }

    #[test]
    fn test_counters() {
        let mut report = report();
        report.record(volume(
            "a",
            VolumeStatus::BackedUp {
                created: "name-a_daily_05-14-2024-02-00-00".into(),
                evicted: Some("old".into()),
                delete_error: None,
            },
        ));
        report.record(volume(
            "b",
            VolumeStatus::BackedUp {
                created: "name-b_daily_05-14-2024-02-00-00".into(),
                evicted: None,
                delete_error: Some("status 500".into()),
            },
        ));
        report.record(volume("c", VolumeStatus::Unsupported { storage_class: "hardware".into() }));

        assert_eq!(report.backups_created(), 2);
        assert_eq!(report.backups_evicted(), 1);
        assert_eq!(report.delete_failures(), 1);
        assert!(report.is_complete());
    }

    #[test]
    fn test_serialize_status_inline() {
        let value = serde_json::to_value(volume(
            "c",
            VolumeStatus::Unsupported { storage_class: "hardware".into() },
        ))
        .unwrap();
        assert_eq!(value["status"], "unsupported");
        assert_eq!(value["storage_class"], "hardware");
        assert_eq!(value["volume_id"], "c");
    }
}
