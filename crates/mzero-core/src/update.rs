use async_trait::async_trait;
use log::{debug, info};
use semver::Version;
use thiserror::Error;

use crate::auto_update::{self, ApplyResult, AutoUpdateError};
use crate::manifest::UpdateManifest;

/// Where installed copies poll for the combined manifest.
pub const DEFAULT_UPDATE_ENDPOINT: &str =
    "https://github.com/metadatazero/metadatazero/releases/latest/download/latest.json";

/// A newer release that has a build for the running platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppUpdate {
    pub current_version: String,
    pub latest_version: String,
    pub pub_date: String,
    pub platform_id: String,
    pub download_url: String,
    pub signature: String,
}

#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("failed to check for app update: {0}")]
    Request(#[source] reqwest::Error),
    #[error("app update check failed with HTTP {status}{body_snippet}")]
    HttpStatus {
        status: reqwest::StatusCode,
        body_snippet: String,
    },
    #[error("failed to parse update manifest: {0}")]
    Parse(#[source] reqwest::Error),
    #[error("no published builds for this platform")]
    UnsupportedPlatform,
    #[error("update manifest for {version} has no entry for {platform_id}")]
    PlatformNotListed {
        version: String,
        platform_id: String,
    },
    #[error("update manifest entry for {platform_id} has an empty signature")]
    MissingSignature { platform_id: String },
}

/// The two network-bound steps of an update cycle.
#[async_trait]
pub trait UpdateSource: Send + Sync {
    async fn check(&self) -> Result<Option<AppUpdate>, UpdateError>;
    async fn download_and_install(&self, update: &AppUpdate) -> Result<ApplyResult, AutoUpdateError>;
}

/// Polls a combined manifest over HTTP and installs through
/// [`auto_update::download_and_apply`].
pub struct ManifestUpdater {
    client: reqwest::Client,
    endpoint: String,
    current_version: String,
}

impl ManifestUpdater {
    #[must_use]
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>, current_version: &str) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            current_version: current_version.to_string(),
        }
    }
}

#[async_trait]
impl UpdateSource for ManifestUpdater {
    async fn check(&self) -> Result<Option<AppUpdate>, UpdateError> {
        let platform_id =
            mzero_platform::current_platform_id().ok_or(UpdateError::UnsupportedPlatform)?;
        let manifest = fetch_manifest(&self.client, &self.endpoint).await?;
        select_update(&manifest, &self.current_version, platform_id)
    }

    async fn download_and_install(&self, update: &AppUpdate) -> Result<ApplyResult, AutoUpdateError> {
        auto_update::download_and_apply(&self.client, update).await
    }
}

/// Fetch and parse the combined manifest at `endpoint`.
///
/// # Errors
/// Returns an error when the request fails, the server answers with a
/// non-success status, or the body is not a manifest.
pub async fn fetch_manifest(
    client: &reqwest::Client,
    endpoint: &str,
) -> Result<UpdateManifest, UpdateError> {
    debug!("Fetching update manifest from {endpoint}");
    let response = client
        .get(endpoint)
        .send()
        .await
        .map_err(UpdateError::Request)?;

    if !response.status().is_success() {
        let status = response.status();
        let body_snippet = response
            .text()
            .await
            .ok()
            .map(|body| response_snippet(&body, 160))
            .unwrap_or_default();
        return Err(UpdateError::HttpStatus {
            status,
            body_snippet,
        });
    }

    response.json().await.map_err(UpdateError::Parse)
}

/// Decide whether `manifest` offers something newer than `current_version`
/// for `platform_id`.
///
/// # Errors
/// Returns an error when a newer release exists but has no usable entry for
/// the platform.
pub fn select_update(
    manifest: &UpdateManifest,
    current_version: &str,
    platform_id: &str,
) -> Result<Option<AppUpdate>, UpdateError> {
    let latest = manifest.bare_version();
    let current = current_version.strip_prefix('v').unwrap_or(current_version);

    if !is_newer_version(latest, current) {
        debug!("No update: latest {latest}, running {current}");
        return Ok(None);
    }

    let entry = manifest
        .platform(platform_id)
        .ok_or_else(|| UpdateError::PlatformNotListed {
            version: manifest.version.clone(),
            platform_id: platform_id.to_string(),
        })?;

    if entry.signature.trim().is_empty() {
        return Err(UpdateError::MissingSignature {
            platform_id: platform_id.to_string(),
        });
    }

    info!("Update available: {current} -> {latest} ({platform_id})");
    Ok(Some(AppUpdate {
        current_version: current.to_string(),
        latest_version: latest.to_string(),
        pub_date: manifest.pub_date.clone(),
        platform_id: platform_id.to_string(),
        download_url: entry.url.clone(),
        signature: entry.signature.clone(),
    }))
}

fn response_snippet(body: &str, max_chars: usize) -> String {
    let snippet: String = body.chars().take(max_chars).collect();
    if snippet.is_empty() {
        String::new()
    } else {
        format!(": {snippet}")
    }
}

#[must_use]
pub fn is_newer_version(latest: &str, current: &str) -> bool {
    match (parse_semver(latest), parse_semver(current)) {
        (Some(latest), Some(current)) => latest > current,
        _ => latest != current,
    }
}

fn parse_semver(version: &str) -> Option<Version> {
    let version = version.strip_prefix('v').unwrap_or(version);
    if let Ok(parsed) = Version::parse(version) {
        return Some(parsed);
    }

    let (core, suffix) = split_semver_core_and_suffix(version);
    let mut parts = core.split('.');
    let major = parts.next()?.parse::<u64>().ok()?;
    let minor = parts.next().and_then(|part| part.parse::<u64>().ok());
    let patch = parts.next().and_then(|part| part.parse::<u64>().ok());

    if parts.next().is_some() {
        return None;
    }

    let normalized = match (minor, patch) {
        (None, None) => format!("{major}.0.0{suffix}"),
        (Some(minor), None) => format!("{major}.{minor}.0{suffix}"),
        (Some(minor), Some(patch)) => format!("{major}.{minor}.{patch}{suffix}"),
        (None, Some(_)) => return None,
    };

    Version::parse(&normalized).ok()
}

fn split_semver_core_and_suffix(version: &str) -> (&str, &str) {
    let suffix_idx = version.find(['-', '+']).unwrap_or(version.len());
    (&version[..suffix_idx], &version[suffix_idx..])
}
