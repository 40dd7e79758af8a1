// Trace Native Host - Manifest Installer
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// Generates the native messaging host manifest and makes it discoverable:
//   Windows:     HKCU\Software\Google\Chrome\NativeMessagingHosts\<name> -> manifest
//   Linux/macOS: manifest copied into the per-user NativeMessagingHosts dir
// Install-time only. The message loop never touches this module.

use crate::paths;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Host name the extension connects to
pub const DEFAULT_HOST_NAME: &str = "benilda.key.system.diagnostics.trace.native.messaging.host";

/// Extension allowed to launch the host
pub const DEFAULT_ORIGIN: &str = "chrome-extension://gigdeohcjhmkmfnpfefcjfmajlinajcb/";

pub const DESCRIPTION: &str = "Native messaging host for the system-diagnostics-trace browser extension.";

const ORIGIN_SCHEME: &str = "chrome-extension://";
const REGISTRY_KEY_ROOT: &str = r"HKCU\Software\Google\Chrome\NativeMessagingHosts";

/// Native messaging manifest, as the browser reads it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub name: String,
    pub description: String,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub allowed_origins: Vec<String>,
}

impl Manifest {
    pub fn new(name: &str, host_path: &Path, allowed_origins: Vec<String>) -> Result<Self> {
        validate_name(name)?;
        if allowed_origins.is_empty() {
            bail!("At least one allowed origin is required");
        }
        for origin in &allowed_origins {
            validate_origin(origin)?;
        }
        Ok(Self {
            name: name.to_string(),
            description: DESCRIPTION.to_string(),
            path: host_path.to_string_lossy().to_string(),
            kind: "stdio".to_string(),
            allowed_origins,
        })
    }

    /// Write pretty JSON to `path`
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {:?}", parent))?;
            }
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write manifest {:?}", path))?;
        log::info!("Manifest written to {:?}", path);
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest {:?}", path))?;
        serde_json::from_str(&content).with_context(|| format!("Invalid manifest {:?}", path))
    }
}

/// Host names: lowercase alphanumerics, '_' and '.', no leading/trailing or doubled dots
pub fn validate_name(name: &str) -> Result<()> {
    let chars_ok = name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '.');
    if name.is_empty() || !chars_ok || name.starts_with('.') || name.ends_with('.') || name.contains("..") {
        bail!("Invalid native messaging host name: {:?}", name);
    }
    Ok(())
}

/// Origins take the form chrome-extension://<id>/
pub fn validate_origin(origin: &str) -> Result<()> {
    let id = origin
        .strip_prefix(ORIGIN_SCHEME)
        .and_then(|rest| rest.strip_suffix('/'))
        .unwrap_or("");
    if id.is_empty() || id.contains('/') {
        bail!("Invalid extension origin {:?}, expected {}<id>/", origin, ORIGIN_SCHEME);
    }
    Ok(())
}

/// Registry key whose default value points at the manifest
pub fn registry_key(name: &str) -> String {
    format!(r"{}\{}", REGISTRY_KEY_ROOT, name)
}

/// Generate the manifest for this executable and write it to `output`
pub fn generate(name: &str, origins: Vec<String>, output: &Path) -> Result<Manifest> {
    let manifest = Manifest::new(name, paths::exe_path(), origins)?;
    manifest.save(output)?;
    Ok(manifest)
}

/// Make an existing manifest discoverable by the browser.
/// Returns a description of where it was registered.
pub fn register(name: &str, manifest_path: &Path) -> Result<String> {
    if !manifest_path.is_file() {
        bail!("Manifest {:?} not found; generate it first", manifest_path);
    }
    if cfg!(target_os = "windows") {
        register_in_registry(name, manifest_path)
    } else {
        let dir = paths::browser_hosts_dir()
            .context("Cannot determine home directory for browser host registration")?;
        let target = register_in_dir(name, manifest_path, &dir)?;
        Ok(format!("{}", target.display()))
    }
}

/// Copy the manifest into `dir` as `<name>.json`
pub fn register_in_dir(name: &str, manifest_path: &Path, dir: &Path) -> Result<PathBuf> {
    validate_name(name)?;
    let manifest = Manifest::load(manifest_path)?;
    if manifest.name != name {
        bail!("Manifest name {:?} does not match host name {:?}", manifest.name, name);
    }
    let target = dir.join(format!("{}.json", name));
    manifest.save(&target)?;
    Ok(target)
}

fn register_in_registry(name: &str, manifest_path: &Path) -> Result<String> {
    validate_name(name)?;
    let key = registry_key(name);
    let manifest = manifest_path.to_string_lossy().to_string();
    let output = Command::new("reg")
        .args(["add", key.as_str(), "/ve", "/t", "REG_SZ", "/d", manifest.as_str(), "/f"])
        .output()
        .context("Failed to run reg.exe")?;
    if !output.status.success() {
        bail!(
            "reg add {} failed: {}",
            key,
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    log::info!("Registry key {} -> {}", key, manifest);
    Ok(key)
}

/// Generate then register
pub fn install(name: &str, origins: Vec<String>, output: &Path) -> Result<String> {
    generate(name, origins, output)?;
    register(name, output)
}

// ============================================================================
// TESTS
// ============================================================================
