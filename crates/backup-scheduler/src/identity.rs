/*
 * SPDX-FileCopyrightText: 2020 Stalwart Labs Ltd <hello@stalw.art>
 *
 * SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-SEL
 */

//! Project identifier resolution.
//!
//! The volume API only accepts numeric project numbers. A project id such as
//! `my-project` is looked up once per invocation through Cloud Resource
//! Manager, which needs `resourcemanager.projects.get` on the project.

use crate::{
    credentials::AccessTokenSource,
    error::{Result, SchedulerError},
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::{fmt, sync::Arc};
use tracing::{debug, warn};

/// Cloud Resource Manager v1 endpoint
pub const RESOURCE_MANAGER_URL: &str = "https://cloudresourcemanager.googleapis.com";

/// Numeric project number
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectNumber(String);

impl ProjectNumber {
    pub fn new(number: impl Into<String>) -> Self {
        Self(number.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProjectNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How a configured project identifier has to be treated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectIdentifier<'a> {
    Number(&'a str),
    Id(&'a str),
}

impl<'a> ProjectIdentifier<'a> {
    pub fn classify(identifier: &'a str) -> Result<Self> {
        let identifier = identifier.trim();

        if !identifier.is_empty() && identifier.bytes().all(|b| b.is_ascii_digit()) {
            return Ok(Self::Number(identifier));
        }

        let mut chars = identifier.chars();
        let leading_letter = chars.next().is_some_and(|c| c.is_ascii_alphabetic());
        let rest: Vec<char> = chars.collect();
        if leading_letter
            && !rest.is_empty()
            && rest.iter().all(|c| c.is_ascii_alphanumeric() || *c == '-')
        {
            return Ok(Self::Id(identifier));
        }

        Err(SchedulerError::config(format!(
            "PROJECT_NUMBER '{}' is neither a project number nor a project id",
            identifier
        )))
    }
}

/// Directory lookup from project id to project number
#[async_trait]
pub trait ProjectResolver: Send + Sync + fmt::Debug {
    /// Returns `None` when the project does not exist or is not visible
    async fn lookup(&self, project_id: &str) -> Option<ProjectNumber>;
}

/// Resolve a configured identifier, calling `resolver` only for project ids
pub async fn resolve_project(identifier: &str, resolver: &dyn ProjectResolver) -> Result<ProjectNumber> {
    match ProjectIdentifier::classify(identifier)? {
        ProjectIdentifier::Number(number) => Ok(ProjectNumber::new(number)),
        ProjectIdentifier::Id(project_id) => {
            debug!("Resolving project id {} to a project number", project_id);
            resolver
                .lookup(project_id)
                .await
                .ok_or_else(|| SchedulerError::ProjectNotFound(project_id.to_string()))
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProjectResource {
    project_number: String,
}

/// [`ProjectResolver`] backed by Cloud Resource Manager
#[derive(Debug, Clone)]
pub struct ResourceManagerResolver {
    client: reqwest::Client,
    base_url: String,
    credentials: Arc<dyn AccessTokenSource>,
}

impl ResourceManagerResolver {
    pub fn new(credentials: Arc<dyn AccessTokenSource>) -> Self {
        Self::with_base_url(RESOURCE_MANAGER_URL, credentials)
    }

    pub fn with_base_url(base_url: impl Into<String>, credentials: Arc<dyn AccessTokenSource>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials,
        }
    }

    async fn fetch(&self, project_id: &str) -> Result<ProjectNumber> {
        let token = self.credentials.access_token().await?;
        let url = format!("{}/v1/projects/{}", self.base_url, project_id);

        let response = self.client.get(&url).bearer_auth(token).send().await?;
        if !response.status().is_success() {
            return Err(SchedulerError::auth(format!(
                "GET {} answered {}",
                url,
                response.status()
            )));
        }

        let project = response.json::<ProjectResource>().await?;
        Ok(ProjectNumber::new(project.project_number))
    }
}

#[async_trait]
impl ProjectResolver for ResourceManagerResolver {
    async fn lookup(&self, project_id: &str) -> Option<ProjectNumber> {
        match self.fetch(project_id).await {
            Ok(number) => Some(number),
            Err(err) => {
                warn!(
                    "Cannot resolve project id {}, missing 'resourcemanager.projects.get' permission? {}",
                    project_id, err
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Default)]
    struct CountingResolver {
        calls: AtomicUsize,
        answer: Option<&'static str>,
    }

    #[async_trait]
    impl ProjectResolver for CountingResolver {
        async fn lookup(&self, _project_id: &str) -> Option<ProjectNumber> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.answer.map(ProjectNumber::new)
        }
    }

    #[test]
    fn test_classify() {
        assert_eq!(
            ProjectIdentifier::classify("123456789").unwrap(),
            ProjectIdentifier::Number("123456789")
        );
        assert_eq!(
            ProjectIdentifier::classify("my-project-42").unwrap(),
            ProjectIdentifier::Id("my-project-42")
        );
        assert!(ProjectIdentifier::classify("").is_err());
        assert!(ProjectIdentifier::classify("p").is_err());
        assert!(ProjectIdentifier::classify("12abc").is_err());
        assert!(ProjectIdentifier::classify("my_project").is_err());
    }

    #[tokio::test]
    async fn test_numeric_skips_lookup() {
        let resolver = CountingResolver::default();
        let number = resolve_project("987654321", &resolver).await.unwrap();
        assert_eq!(number.as_str(), "987654321");
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_project_id_is_resolved() {
        let resolver = CountingResolver {
            answer: Some("555"),
            ..Default::default()
        };
        let number = resolve_project("cvs-prod", &resolver).await.unwrap();
        assert_eq!(number, ProjectNumber::new("555"));
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unresolvable_project() {
        let resolver = CountingResolver::default();
        let err = resolve_project("cvs-prod", &resolver).await.unwrap_err();
        assert!(matches!(err, SchedulerError::ProjectNotFound(ref id) if id == "cvs-prod"));
        assert!(err.is_auth());
    }
}
