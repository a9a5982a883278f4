/*
 * SPDX-FileCopyrightText: 2020 Stalwart Labs Ltd <hello@stalw.art>
 *
 * SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-SEL
 */

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use cvs_backup_scheduler::{
    config::{
        SchedulerConfig, ENV_API_URL, ENV_DAILY, ENV_DRY_RUN, ENV_MONTHLY, ENV_PROJECT_NUMBER,
        ENV_VOLUMES, ENV_WEEKLY, ENV_YEARLY,
    },
    BearerToken, BackupScheduler, ProjectNumber, ProjectResolver, Result, TokenProvider,
};
use serde_json::{json, Value};
use std::{collections::HashMap, sync::Arc};

pub const PROJECT: &str = "123456789";
pub const TOKEN: &str = "test-token";

#[derive(Debug)]
pub struct FixedResolver(pub Option<&'static str>);

#[async_trait]
impl ProjectResolver for FixedResolver {
    async fn lookup(&self, _project_id: &str) -> Option<ProjectNumber> {
        self.0.map(ProjectNumber::new)
    }
}

#[derive(Debug)]
pub struct FixedToken;

#[async_trait]
impl TokenProvider for FixedToken {
    async fn get_token(&self) -> Result<BearerToken> {
        Ok(BearerToken::new(TOKEN))
    }
}

/// Retention caps as (daily, weekly, monthly, yearly)
pub fn config(api_url: &str, volumes: &str, caps: (u32, u32, u32, u32), dry_run: bool) -> SchedulerConfig {
    let vars: HashMap<&str, String> = HashMap::from([
        (ENV_PROJECT_NUMBER, PROJECT.to_string()),
        (ENV_VOLUMES, volumes.to_string()),
        (ENV_DAILY, caps.0.to_string()),
        (ENV_WEEKLY, caps.1.to_string()),
        (ENV_MONTHLY, caps.2.to_string()),
        (ENV_YEARLY, caps.3.to_string()),
        (ENV_API_URL, api_url.to_string()),
        (ENV_DRY_RUN, dry_run.to_string()),
    ]);
    SchedulerConfig::from_lookup(|key| vars.get(key).cloned()).unwrap()
}

pub fn scheduler(config: SchedulerConfig) -> BackupScheduler {
    BackupScheduler::new(config, Arc::new(FixedResolver(None)), Arc::new(FixedToken))
}

pub fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(h, 0, 0)
        .unwrap()
}

pub fn volume(id: &str, name: &str, storage_class: &str) -> Value {
    json!({
        "volumeId": id,
        "name": name,
        "region": "us-central1",
        "storageClass": storage_class,
        "quotaInBytes": 1099511627776u64
    })
}

pub fn backup(id: &str, name: &str) -> Value {
    json!({ "backupId": id, "name": name, "lifeCycleState": "available" })
}

pub fn volumes_path() -> String {
    format!("/v2/projects/{}/locations/-/Volumes", PROJECT)
}

pub fn backups_path(volume_id: &str) -> String {
    format!(
        "/v2/projects/{}/locations/us-central1/Volumes/{}/Backups",
        PROJECT, volume_id
    )
}
