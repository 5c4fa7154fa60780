use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Update-manifest platform keys published by the release pipeline.
pub const PLATFORM_IDS: [&str; 4] = [
    "darwin-x86_64",
    "darwin-aarch64",
    "linux-x86_64",
    "windows-x86_64",
];

/// One downloadable build for a platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformEntry {
    pub signature: String,
    pub url: String,
}

/// The `latest.json` document, both as a single-platform fragment written by
/// one build job and as the combined manifest clients poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateManifest {
    pub version: String,
    pub pub_date: String,
    #[serde(default)]
    pub platforms: BTreeMap<String, PlatformEntry>,
}

impl UpdateManifest {
    /// An empty manifest for `version` (with or without a leading `v`)
    /// stamped with `at`.
    #[must_use]
    pub fn new(version: &str, at: DateTime<Utc>) -> Self {
        Self {
            version: tag_version(version),
            pub_date: format_pub_date(at),
            platforms: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn fragment(
        version: &str,
        at: DateTime<Utc>,
        platform_id: impl Into<String>,
        entry: PlatformEntry,
    ) -> Self {
        let mut manifest = Self::new(version, at);
        manifest.platforms.insert(platform_id.into(), entry);
        manifest
    }

    /// Version without the `v` tag prefix.
    #[must_use]
    pub fn bare_version(&self) -> &str {
        self.version.strip_prefix('v').unwrap_or(&self.version)
    }

    #[must_use]
    pub fn platform(&self, platform_id: &str) -> Option<&PlatformEntry> {
        self.platforms.get(platform_id)
    }

    /// Pretty JSON with two-space indentation.
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    pub fn to_pretty_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

fn tag_version(version: &str) -> String {
    if version.starts_with('v') {
        version.to_string()
    } else {
        format!("v{version}")
    }
}

/// ISO-8601 UTC timestamp with millisecond precision, e.g.
/// `2025-01-31T12:00:00.000Z`.
#[must_use]
pub fn format_pub_date(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}
