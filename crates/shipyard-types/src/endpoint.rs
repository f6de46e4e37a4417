//! Public hosting endpoints.

use serde::Serialize;
use ts_rs::TS;

use crate::ids::ProjectId;

/// Regions whose website endpoint is `s3-website-<region>`. Every newer
/// region uses `s3-website.<region>`.
const DASH_WEBSITE_REGIONS: &[&str] = &[
    "us-east-1",
    "us-west-1",
    "us-west-2",
    "eu-west-1",
    "ap-southeast-1",
    "ap-southeast-2",
    "ap-northeast-1",
    "sa-east-1",
    "us-gov-west-1",
];

/// Publicly reachable URL of a project's static site.
///
/// Derived deterministically from the project id and the public host
/// suffix, e.g. `http://calm-eager-otter.s3-website-us-east-1.amazonaws.com`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct HostingEndpoint(String);

impl HostingEndpoint {
    /// Build the endpoint for `id` under `public_host`.
    pub fn for_project(id: &ProjectId, public_host: &str) -> Self {
        Self(format!("http://{id}.{public_host}"))
    }

    /// Default public host of the S3 website endpoint in `region`.
    pub fn s3_website_host(region: &str) -> String {
        let separator = if DASH_WEBSITE_REGIONS.contains(&region) {
            '-'
        } else {
            '.'
        };
        format!("s3-website{separator}{region}.amazonaws.com")
    }

    /// Borrow the URL.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for HostingEndpoint {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<HostingEndpoint> for String {
    fn from(endpoint: HostingEndpoint) -> Self {
        endpoint.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_uses_subdomain_of_public_host() {
        let id = ProjectId::parse("calm-eager-otter").unwrap();
        let url = HostingEndpoint::for_project(&id, "localhost:8000");
        assert_eq!(url.as_str(), "http://calm-eager-otter.localhost:8000");
    }

    #[test]
    fn s3_website_host_embeds_region() {
        let host = HostingEndpoint::s3_website_host("eu-west-1");
        let id = ProjectId::parse("site-1").unwrap();
        assert_eq!(
            HostingEndpoint::for_project(&id, &host).to_string(),
            "http://site-1.s3-website-eu-west-1.amazonaws.com"
        );
    }

    #[test]
    fn newer_regions_use_a_dot_before_the_region() {
        assert_eq!(
            HostingEndpoint::s3_website_host("eu-central-1"),
            "s3-website.eu-central-1.amazonaws.com"
        );
        assert_eq!(
            HostingEndpoint::s3_website_host("us-east-2"),
            "s3-website.us-east-2.amazonaws.com"
        );
        assert_eq!(
            HostingEndpoint::s3_website_host("ap-south-1"),
            "s3-website.ap-south-1.amazonaws.com"
        );
    }

    #[test]
    fn legacy_regions_keep_the_dash() {
        assert_eq!(
            HostingEndpoint::s3_website_host("us-east-1"),
            "s3-website-us-east-1.amazonaws.com"
        );
        assert_eq!(
            HostingEndpoint::s3_website_host("us-gov-west-1"),
            "s3-website-us-gov-west-1.amazonaws.com"
        );
    }
}
