/*
 * SPDX-FileCopyrightText: 2020 Stalwart Labs Ltd <hello@stalw.art>
 *
 * SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-SEL
 */

//! Retention policy: decides which backup, if any, to evict before a new
//! backup with the active label is created.

use crate::{
    api::Backup,
    label::BackupLabel,
    naming::{BackupName, NameSegments},
};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Oldest backup carrying the active label
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvictionCandidate {
    pub backup_id: String,
    pub name: String,
    pub created_at: NaiveDateTime,
}

/// Outcome of scanning a volume's backups for one label
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotationPlan {
    pub label: BackupLabel,
    pub cap: u32,
    /// Backups whose name carries the label and a parseable timestamp
    pub matching: usize,
    pub oldest: Option<EvictionCandidate>,
    /// Names that looked like scheduled backups but whose timestamp did not parse
    pub skipped: Vec<String>,
}

impl RotationPlan {
    /// The backup to delete before creating a new one
    pub fn eviction(&self) -> Option<&EvictionCandidate> {
        if self.matching >= self.cap as usize {
            self.oldest.as_ref()
        } else {
            None
        }
    }

    pub fn evict_id(&self) -> Option<&str> {
        self.eviction().map(|candidate| candidate.backup_id.as_str())
    }
}

/// Scan `backups` for names carrying `label` and find the oldest one.
///
/// A backup counts only when the second-to-last name segment equals the
/// label exactly and the last segment is a `MM-DD-YYYY-HH-MM-SS` timestamp.
/// When at least `cap` backups count, the oldest is returned for eviction.
/// Ties on the timestamp keep the first backup listed.
pub fn plan_rotation(backups: &[Backup], label: BackupLabel, cap: u32) -> RotationPlan {
    let mut matching = 0;
    let mut oldest: Option<EvictionCandidate> = None;
    let mut skipped = Vec::new();

    for backup in backups {
        let Some(segments) = NameSegments::split(&backup.name) else {
            continue;
        };
        if segments.label != label.as_str() || !segments.has_timestamp_shape() {
            continue;
        }

        let created_at = match BackupName::parse(&backup.name) {
            Ok(name) => name.created_at,
            Err(err) => {
                warn!(backup_id = %backup.backup_id, "Skipping backup from rotation: {}", err);
                skipped.push(backup.name.clone());
                continue;
            }
        };

        matching += 1;
        if oldest.as_ref().map_or(true, |o| created_at < o.created_at) {
            oldest = Some(EvictionCandidate {
                backup_id: backup.backup_id.clone(),
                name: backup.name.clone(),
                created_at,
            });
        }
    }

    debug!("Currently there are {} existing {} backups", matching, label);
    debug!("Maximum {} {} backups should be kept", cap, label);

    RotationPlan {
        label,
        cap,
        matching,
        oldest,
        skipped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backup(id: &str, name: &str) -> Backup {
        Backup {
            backup_id: id.to_string(),
            name: name.to_string(),
        }
    }

    #[test]
    fn test_no_matching_backups() {
        let plan = plan_rotation(&[], BackupLabel::Daily, 3);
        assert_eq!(plan.matching, 0);
        assert_eq!(plan.evict_id(), None);
    }

    #[test]
    fn test_below_cap_keeps_everything() {
        let backups = vec![
            backup("b1", "vol_daily_01-01-2024-00-00-00"),
            backup("b2", "vol_daily_01-02-2024-00-00-00"),
        ];
        let plan = plan_rotation(&backups, BackupLabel::Daily, 3);
        assert_eq!(plan.matching, 2);
        assert_eq!(plan.oldest.as_ref().map(|o| o.backup_id.as_str()), Some("b1"));
        assert_eq!(plan.evict_id(), None);
    }

    #[test]
    fn test_at_cap_evicts_oldest() {
        // Listed out of order on purpose
        let backups = vec![
            backup("t2", "vol_daily_03-02-2024-10-00-00"),
            backup("t3", "vol_daily_03-03-2024-10-00-00"),
            backup("t1", "vol_daily_03-01-2024-10-00-00"),
        ];
        let plan = plan_rotation(&backups, BackupLabel::Daily, 3);
        assert_eq!(plan.matching, 3);
        assert_eq!(plan.evict_id(), Some("t1"));
    }

    #[test]
    fn test_oldest_compares_dates_not_strings() {
        // Lexically "12-31-2023" sorts after "01-01-2024"
        let backups = vec![
            backup("new", "vol_weekly_01-01-2024-00-00-00"),
            backup("old", "vol_weekly_12-31-2023-00-00-00"),
        ];
        let plan = plan_rotation(&backups, BackupLabel::Weekly, 2);
        assert_eq!(plan.evict_id(), Some("old"));
    }

    #[test]
    fn test_other_labels_are_ignored() {
        let backups = vec![
            backup("d1", "vol_daily_01-01-2020-00-00-00"),
            backup("w1", "vol_weekly_01-01-2024-00-00-00"),
            backup("m1", "vol_monthly_01-01-2019-00-00-00"),
            backup("x1", "vol_Weekly_01-01-2018-00-00-00"),
        ];
        let plan = plan_rotation(&backups, BackupLabel::Weekly, 1);
        assert_eq!(plan.matching, 1);
        assert_eq!(plan.evict_id(), Some("w1"));
    }

    #[test]
    fn test_manual_backups_are_ignored() {
        let backups = vec![
            backup("m", "before-upgrade"),
            backup("n", "vol_daily_snapshot"),
            backup("o", "vol_daily_01-01-2024"),
            backup("p", "daily_01-01-2020-00-00-00"),
            backup("d", "vol_daily_06-01-2024-00-00-00"),
        ];
        let plan = plan_rotation(&backups, BackupLabel::Daily, 1);
        assert_eq!(plan.matching, 1);
        assert!(plan.skipped.is_empty());
        assert_eq!(plan.evict_id(), Some("d"));
    }

    #[test]
    fn test_unparseable_timestamp_is_skipped() {
        let backups = vec![
            backup("bad", "vol_daily_99-99-9999-99-99-99"),
            backup("good", "vol_daily_06-01-2024-00-00-00"),
        ];
        let plan = plan_rotation(&backups, BackupLabel::Daily, 2);
        assert_eq!(plan.matching, 1);
        assert_eq!(plan.skipped, vec!["vol_daily_99-99-9999-99-99-99".to_string()]);
        assert_eq!(plan.evict_id(), None);
    }

    #[test]
    fn test_volume_names_with_underscores() {
        let backups = vec![
            backup("a", "my_daily_vol_daily_02-01-2024-00-00-00"),
            backup("b", "my_daily_vol_daily_01-01-2024-00-00-00"),
        ];
        let plan = plan_rotation(&backups, BackupLabel::Daily, 2);
        assert_eq!(plan.matching, 2);
        assert_eq!(plan.evict_id(), Some("b"));
    }

    #[test]
    fn test_timestamp_tie_keeps_first_listed() {
        let backups = vec![
            backup("first", "a_yearly_01-01-2023-00-00-00"),
            backup("second", "b_yearly_01-01-2023-00-00-00"),
        ];
        let plan = plan_rotation(&backups, BackupLabel::Yearly, 2);
        assert_eq!(plan.evict_id(), Some("first"));
    }

    #[test]
    fn test_above_cap_still_evicts_one() {
        let backups: Vec<Backup> = (1..=5)
            .map(|d| backup(&format!("b{}", d), &format!("v_daily_01-0{}-2024-00-00-00", d)))
            .collect();
        let plan = plan_rotation(&backups, BackupLabel::Daily, 3);
        assert_eq!(plan.matching, 5);
        assert_eq!(plan.evict_id(), Some("b1"));
    }
}
