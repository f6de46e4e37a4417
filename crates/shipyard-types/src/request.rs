//! Deploy API request and response bodies.
//!
//! Field names on the wire (`gitURL`, `projectSlug`) match what existing
//! dashboard clients already send and read.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use validator::{Validate, ValidationError};

use crate::endpoint::HostingEndpoint;
use crate::ids::{check_project_id, ProjectId};

/// Body of `POST /project`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate, TS)]
#[ts(export, export_to = "bindings/")]
pub struct DeploymentRequest {
    /// Repository the build worker clones.
    #[serde(rename = "gitURL")]
    #[validate(custom(function = "validate_git_url"))]
    pub git_url: String,

    /// Caller-chosen project id. Empty means "generate one".
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    #[validate(custom(function = "validate_slug"))]
    pub slug: Option<String>,
}

impl DeploymentRequest {
    /// Build a request for `git_url` without a preferred slug.
    pub fn new(git_url: impl Into<String>) -> Self {
        Self {
            git_url: git_url.into(),
            slug: None,
        }
    }

    /// Attach a preferred slug.
    #[must_use]
    pub fn with_slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = Some(slug.into());
        self
    }

    /// The preferred slug, treating blank strings as absent.
    pub fn preferred_slug(&self) -> Option<&str> {
        self.slug
            .as_deref()
            .map(str::trim)
            .filter(|slug| !slug.is_empty())
    }

    /// The repository URL with surrounding whitespace removed.
    pub fn repository_url(&self) -> &str {
        self.git_url.trim()
    }
}

/// Status reported for an accepted deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "lowercase")]
pub enum DeploymentStatus {
    /// The build task was submitted to the orchestrator.
    Queued,
}

/// Project tracking data returned to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct QueuedProject {
    /// The allocated project id; also the log channel suffix.
    #[serde(rename = "projectSlug")]
    pub project_slug: String,
    /// Public URL the site will be served from.
    pub url: String,
}

/// Body of a successful `POST /project` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct DeploymentResponse {
    /// Always [`DeploymentStatus::Queued`] on success.
    pub status: DeploymentStatus,
    /// Tracking handle for the deployment.
    pub data: QueuedProject,
}

impl DeploymentResponse {
    /// Response for a deployment queued under `id`.
    pub fn queued(id: &ProjectId, url: &HostingEndpoint) -> Self {
        Self {
            status: DeploymentStatus::Queued,
            data: QueuedProject {
                project_slug: id.to_string(),
                url: url.to_string(),
            },
        }
    }
}

fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    ValidationError::new(code).with_message(Cow::Borrowed(message))
}

/// Validator hook for [`DeploymentRequest::git_url`].
fn validate_git_url(url: &str) -> Result<(), ValidationError> {
    check_git_url(url).map_err(|message| invalid("git_url", message))
}

/// Validator hook for [`DeploymentRequest::slug`].
fn validate_slug(slug: &str) -> Result<(), ValidationError> {
    let slug = slug.trim();
    if slug.is_empty() {
        return Ok(());
    }
    check_project_id(slug).map_err(|message| invalid("slug", message))
}

/// Check that `url` looks like something `git clone` can fetch.
///
/// Accepts `http(s)://`, `git://` and `ssh://` URLs with a host and a
/// path, and the scp-like `user@host:path` form.
pub fn check_git_url(url: &str) -> Result<(), &'static str> {
    let url = url.trim();
    if url.is_empty() {
        return Err("repository URL must not be empty");
    }
    if url.chars().any(char::is_whitespace) {
        return Err("repository URL must not contain whitespace");
    }

    if let Some((scheme, rest)) = url.split_once("://") {
        if !matches!(scheme, "http" | "https" | "git" | "ssh") {
            return Err("repository URL scheme must be http, https, git or ssh");
        }
        let (authority, path) = rest
            .split_once('/')
            .ok_or("repository URL has no repository path")?;
        let host = authority.rsplit_once('@').map_or(authority, |(_, host)| host);
        let host = host.split(':').next().unwrap_or_default();
        if host.is_empty() {
            return Err("repository URL has no host");
        }
        if path.trim_matches('/').is_empty() {
            return Err("repository URL has no repository path");
        }
        return Ok(());
    }

    let (user_host, path) = url
        .split_once(':')
        .ok_or("repository reference is not a URL")?;
    let host = user_host
        .split_once('@')
        .map(|(_, host)| host)
        .ok_or("repository reference is not a URL")?;
    if host.is_empty() || host.contains('/') {
        return Err("repository reference has no host");
    }
    if path.trim_matches('/').is_empty() {
        return Err("repository reference has no repository path");
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parses_wire_field_names() {
        let req: DeploymentRequest =
            serde_json::from_str(r#"{"gitURL":"https://example.com/r.git","slug":"my-site"}"#)
                .unwrap();
        assert_eq!(req.git_url, "https://example.com/r.git");
        assert_eq!(req.preferred_slug(), Some("my-site"));
        assert!(req.validate().is_ok());
    }

    #[test]
    fn slug_is_optional_and_blank_means_absent() {
        let req: DeploymentRequest =
            serde_json::from_str(r#"{"gitURL":"https://example.com/r.git"}"#).unwrap();
        assert_eq!(req.preferred_slug(), None);

        let blank = DeploymentRequest::new("https://example.com/r.git").with_slug("  ");
        assert_eq!(blank.preferred_slug(), None);
        assert!(blank.validate().is_ok());
    }

    #[test]
    fn absent_slug_is_omitted_from_json_and_optional_in_bindings() {
        let req = DeploymentRequest::new("https://example.com/r.git");
        assert_eq!(
            serde_json::to_string(&req).unwrap(),
            r#"{"gitURL":"https://example.com/r.git"}"#
        );
        assert!(DeploymentRequest::decl().contains("slug?: string"));
    }

    #[test]
    fn rejects_invalid_slug() {
        let req = DeploymentRequest::new("https://example.com/r.git").with_slug("Bad_Slug");
        let errors = req.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("slug"));
    }

    #[test]
    fn git_url_forms() {
        for ok in [
            "https://github.com/org/repo.git",
            "http://example.com/r",
            "ssh://git@github.com:22/org/repo.git",
            "git://host.example/repo",
            "git@github.com:org/repo.git",
        ] {
            assert!(check_git_url(ok).is_ok(), "{ok} should be accepted");
        }
        for bad in [
            "",
            "   ",
            "not a url",
            "ftp://example.com/r",
            "https://",
            "https://example.com",
            "https://example.com/",
            "github.com:org/repo",
            "git@:org/repo",
        ] {
            assert!(check_git_url(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn empty_git_url_fails_validation() {
        let req = DeploymentRequest::new("");
        let errors = req.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("git_url"));
    }

    #[test]
    fn queued_response_shape() {
        let id = ProjectId::parse("calm-eager-otter").unwrap();
        let url = HostingEndpoint::for_project(&id, "localhost:8000");
        let json = serde_json::to_value(DeploymentResponse::queued(&id, &url)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "status": "queued",
                "data": {
                    "projectSlug": "calm-eager-otter",
                    "url": "http://calm-eager-otter.localhost:8000"
                }
            })
        );
    }
}
