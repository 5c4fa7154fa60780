use std::path::Path;

use chrono::{TimeZone, Utc};
use mzero_core::UpdateManifest;
use mzero_release::{
    CombinedManifest, Platform, ReleaseConfig, ReleaseError, combine_manifests,
    generate_manifest, rename_artifacts,
};

fn project(version: &str) -> (tempfile::TempDir, ReleaseConfig) {
    let root = tempfile::tempdir().expect("tempdir should be created");
    std::fs::write(
        root.path().join("release.json"),
        format!(r#"{{ "version": "{version}" }}"#),
    )
    .expect("release config should be written");
    let config = ReleaseConfig::load(root.path()).expect("release config should load");
    (root, config)
}

fn fixed_now() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 9, 1, 12, 0, 0)
        .single()
        .expect("timestamp should be valid")
}

fn write_fragment(artifacts: &Path, dir: &str, body: &str) {
    let path = artifacts.join(dir).join("latest.json");
    std::fs::create_dir_all(path.parent().expect("fragment has a parent"))
        .expect("fragment dir should be created");
    std::fs::write(path, body).expect("fragment should be written");
}

fn fragment(platform_id: &str, signature: &str) -> String {
    format!(
        r#"{{
  "version": "v1.2.3",
  "pub_date": "2025-08-31T10:00:00.000Z",
  "platforms": {{
    "{platform_id}": {{ "signature": "{signature}", "url": "https://example.com/{platform_id}" }}
  }}
}}"#
    )
}

#[test]
fn disjoint_fragments_combine_to_their_union() {
    let (_root, config) = project("1.2.3");
    let artifacts = config.artifacts_dir();
    write_fragment(&artifacts, "latest-json-macos-x86_64", &fragment("darwin-x86_64", "sig-mac-x64"));
    write_fragment(&artifacts, "latest-json-macos-aarch64", &fragment("darwin-aarch64", "sig-mac-arm"));
    write_fragment(&artifacts, "latest-json-linux", &fragment("linux-x86_64", "sig-linux"));
    write_fragment(&artifacts, "latest-json-windows", &fragment("windows-x86_64", "sig-win"));

    let report = combine_manifests(&config, fixed_now()).expect("combine should succeed");

    let written: CombinedManifest = serde_json::from_str(
        &std::fs::read_to_string(artifacts.join("latest.json")).expect("output should exist"),
    )
    .expect("output should be valid JSON");
    assert_eq!(written, report.manifest);
    assert_eq!(written.version, "v1.2.3");
    assert_eq!(written.pub_date, "2025-09-01T12:00:00.000Z");
    assert_eq!(
        written.platforms.keys().map(String::as_str).collect::<Vec<_>>(),
        ["darwin-aarch64", "darwin-x86_64", "linux-x86_64", "windows-x86_64"]
    );
    assert_eq!(written.platforms["linux-x86_64"]["signature"], "sig-linux");
    assert_eq!(
        written.platforms["windows-x86_64"]["url"],
        "https://example.com/windows-x86_64"
    );
}

#[test]
fn fragments_with_partial_headers_merge_and_keep_extra_fields() {
    let (_root, config) = project("1.2.3");
    let artifacts = config.artifacts_dir();
    write_fragment(
        &artifacts,
        "latest-json-linux",
        r#"{ "version": "v1.2.3", "platforms": { "linux-x86_64": { "signature": "sig-linux", "url": "https://example.com/linux" } } }"#,
    );
    write_fragment(
        &artifacts,
        "latest-json-windows",
        r#"{ "platforms": { "windows-x86_64": { "signature": "sig-win", "url": "https://example.com/win", "format": "nsis" } } }"#,
    );

    let report = combine_manifests(&config, fixed_now()).expect("combine should succeed");

    assert_eq!(report.merged.len(), 2);
    assert_eq!(
        report.manifest.platforms.keys().map(String::as_str).collect::<Vec<_>>(),
        ["linux-x86_64", "windows-x86_64"]
    );
    let written: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(artifacts.join("latest.json")).expect("output should exist"),
    )
    .expect("output should be valid JSON");
    assert_eq!(
        written["platforms"]["windows-x86_64"],
        serde_json::json!({
            "signature": "sig-win",
            "url": "https://example.com/win",
            "format": "nsis"
        })
    );
    assert_eq!(written["platforms"]["linux-x86_64"]["signature"], "sig-linux");
}

#[test]
fn absent_and_malformed_fragments_are_skipped() {
    let (_root, config) = project("1.2.3");
    let artifacts = config.artifacts_dir();
    write_fragment(&artifacts, "latest-json-linux", &fragment("linux-x86_64", "sig-linux"));
    write_fragment(&artifacts, "latest-json-windows", r#"{ "version": "#);

    let report = combine_manifests(&config, fixed_now()).expect("combine should succeed");

    assert_eq!(report.merged.len(), 1);
    assert_eq!(
        report.manifest.platforms.keys().collect::<Vec<_>>(),
        ["linux-x86_64"]
    );
}

#[test]
fn empty_union_fails_without_writing() {
    let (_root, config) = project("1.2.3");
    let artifacts = config.artifacts_dir();
    std::fs::create_dir_all(&artifacts).expect("artifacts dir should be created");

    let result = combine_manifests(&config, fixed_now());

    assert!(matches!(result, Err(ReleaseError::EmptyUnion)));
    assert!(!artifacts.join("latest.json").exists());
}

#[test]
fn darwin_rename_maps_bundler_names_and_tolerates_missing_files() {
    let (root, config) = project("1.2.3");
    let dmg_dir = root
        .path()
        .join("target/aarch64-apple-darwin/release/bundle/dmg");
    std::fs::create_dir_all(&dmg_dir).expect("dmg dir should be created");
    std::fs::write(dmg_dir.join("MetadataZero_1.2.3_aarch64.dmg"), b"dmg")
        .expect("dmg should be written");

    let report = rename_artifacts(&config, Platform::Darwin, "aarch64-apple-darwin")
        .expect("missing files should not fail the batch");

    assert_eq!(report.renamed.len(), 1);
    assert_eq!(report.missing.len(), 2);
    assert!(dmg_dir.join("MetadataZero-1.2.3-mac-arm64.dmg").is_file());
    assert!(!dmg_dir.join("MetadataZero_1.2.3_aarch64.dmg").exists());
}

#[test]
fn linux_generate_without_signature_writes_nothing() {
    let (root, config) = project("1.2.3");

    let output = generate_manifest(&config, Platform::Linux, "default", fixed_now())
        .expect("absent signature is not an error");

    assert!(output.is_none());
    assert!(!root.path().join("target").exists());
}

#[test]
fn windows_generate_writes_single_platform_fragment() {
    let (root, config) = project("1.2.3");
    let nsis = root.path().join("target/release/bundle/nsis");
    std::fs::create_dir_all(&nsis).expect("nsis dir should be created");
    std::fs::write(nsis.join("MetadataZero-1.2.3-win-x64.exe.sig"), "c2lnbmF0dXJl\n")
        .expect("signature should be written");

    let output = generate_manifest(&config, Platform::Windows, "default", fixed_now())
        .expect("generate should succeed")
        .expect("fragment should be written");

    assert_eq!(output, nsis.join("latest.json"));
    let manifest: UpdateManifest = serde_json::from_str(
        &std::fs::read_to_string(&output).expect("fragment should be readable"),
    )
    .expect("fragment should be valid JSON");
    assert_eq!(manifest.version, "v1.2.3");
    assert_eq!(manifest.platforms.len(), 1);
    let entry = &manifest.platforms["windows-x86_64"];
    assert_eq!(entry.signature, "c2lnbmF0dXJl");
    assert_eq!(
        entry.url,
        "https://github.com/metadatazero/metadatazero/releases/download/v1.2.3/MetadataZero-1.2.3-win-x64.exe"
    );
}
