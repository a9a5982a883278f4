/*
 * SPDX-FileCopyrightText: 2020 Stalwart Labs Ltd <hello@stalw.art>
 *
 * SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-SEL
 */

//! Function entry point

use crate::{
    config::SchedulerConfig,
    credentials::{AccessTokenSource, MetadataServerCredentials},
    error::Result,
    identity::ResourceManagerResolver,
    report::InvocationReport,
    scheduler::BackupScheduler,
    token::SecretManagerTokenProvider,
};
use chrono::Local;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Returned when the invocation ran to the volume stage
pub const SUCCESS: &str = "True";

/// Returned when configuration, authentication or the volume listing failed
pub const FAILURE: &str = "False";

/// Scheduled entry point. The event payload and context are not used.
pub async fn cvs_backup_scheduler(event: &Value, context: &Value) -> &'static str {
    debug!(event = %event, context = %context, "Invocation received");
    handle(SchedulerConfig::from_env()).await
}

/// Run an invocation with the production collaborators
pub async fn handle(config: Result<SchedulerConfig>) -> &'static str {
    info!("--- START ---");

    let result = match config {
        Ok(config) => {
            let credentials: Arc<dyn AccessTokenSource> = Arc::new(MetadataServerCredentials::new());
            let resolver = Arc::new(ResourceManagerResolver::new(credentials.clone()));
            let tokens = Arc::new(SecretManagerTokenProvider::new(
                config.secret.clone(),
                credentials,
            ));

            BackupScheduler::new(config, resolver, tokens)
                .run(Local::now().naive_local())
                .await
        }
        Err(err) => Err(err),
    };

    let verdict = verdict(&result);
    info!("--- END ---");
    verdict
}

/// Map an invocation result to the string returned to the platform
pub fn verdict(result: &Result<InvocationReport>) -> &'static str {
    match result {
        Ok(report) => {
            if let Some(reason) = &report.aborted {
                warn!("Invocation stopped before all volumes were processed: {}", reason);
            }
            SUCCESS
        }
        Err(err) => {
            error!("{}", err);
            FAILURE
        }
    }
}
