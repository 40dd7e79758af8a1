// Trace Native Host - Library Root
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// All modules exported here for use by the binary and tests.

pub mod level;
pub mod message;
pub mod codec;
pub mod policy;
pub mod sink;
pub mod session;

// ============================================================================
// HOST PLUMBING - configuration, paths, browser registration
// ============================================================================

/// Layered JSON file + environment settings loader
pub mod config;

/// Executable-relative and browser directory paths
pub mod paths;

/// Native messaging manifest generation and registration
pub mod manifest;
