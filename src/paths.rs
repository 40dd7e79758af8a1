// Trace Native Host - Path Resolution
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// Executable-relative locations for the config file and manifest, plus the
// per-user browser directories where native messaging manifests are found.
// The browser launches the host with an arbitrary working directory, so
// nothing here is relative to the current directory.

use crate::config::CONFIG_FILE_NAME;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

static EXE_PATH_CACHE: OnceLock<PathBuf> = OnceLock::new();

/// Host executable path, canonicalized when possible.
///
/// Resolution order:
///   1. current_exe(), canonicalized
///   2. current_exe() as reported
///   3. argv[0]
pub fn exe_path() -> &'static Path {
    EXE_PATH_CACHE.get_or_init(|| {
        if let Ok(exe) = std::env::current_exe() {
            return exe.canonicalize().unwrap_or(exe);
        }
        std::env::args_os()
            .next()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(env!("CARGO_PKG_NAME")))
    })
}

/// Directory holding the host executable
pub fn exe_dir() -> &'static Path {
    exe_path().parent().unwrap_or_else(|| Path::new("."))
}

/// AppSettings.json beside the executable
pub fn default_config_path() -> PathBuf {
    exe_dir().join(CONFIG_FILE_NAME)
}

/// Executable path with a .json extension
pub fn default_manifest_path() -> PathBuf {
    exe_path().with_extension("json")
}

/// User home directory from HOME, then USERPROFILE
pub fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .filter(|h| !h.is_empty())
        .map(PathBuf::from)
}

/// Per-user Chrome NativeMessagingHosts directory under `home`.
/// Windows discovers hosts through the registry instead, so None there.
pub fn browser_hosts_dir_in(home: &Path) -> Option<PathBuf> {
    if cfg!(target_os = "windows") {
        None
    } else if cfg!(target_os = "macos") {
        Some(home.join("Library/Application Support/Google/Chrome/NativeMessagingHosts"))
    } else {
        Some(home.join(".config/google-chrome/NativeMessagingHosts"))
    }
}

/// `browser_hosts_dir_in` for the current user
pub fn browser_hosts_dir() -> Option<PathBuf> {
    home_dir().and_then(|home| browser_hosts_dir_in(&home))
}

// ============================================================================
// TESTS
// ============================================================================
