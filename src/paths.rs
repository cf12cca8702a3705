//! Centralized path definitions for config files and project files.
//!
//! This module is the single source of truth for leaf filenames and
//! path-building functions. No other module should hard-code these strings.

use std::path::{Path, PathBuf};

// ── Application identity ─────────────────────────────────────────

pub const APP_ID: &str = "org.godot-mcp.bridge";

// ── Leaf filenames ───────────────────────────────────────────────

pub const SETTINGS_FILE: &str = "settings.json";
pub const PORT_FILE: &str = ".godot-mcp-port";
pub const PROJECT_FILE: &str = "project.godot";

// ── Config-dir functions (take app_config_dir) ───────────────────

pub fn settings_path(app_config_dir: &Path) -> PathBuf {
    app_config_dir.join(SETTINGS_FILE)
}

/// Written on server start so local tools can discover the bound port.
pub fn port_file_path(app_config_dir: &Path) -> PathBuf {
    app_config_dir.join(PORT_FILE)
}

// ── Project-dir functions ────────────────────────────────────────

pub fn project_file(project_dir: &Path) -> PathBuf {
    project_dir.join(PROJECT_FILE)
}

// ── Platform config dir ──────────────────────────────────────────

/// Resolve the platform config directory for this application:
/// `<config_dir>/org.godot-mcp.bridge`.
pub fn config_dir() -> PathBuf {
    let base = if cfg!(target_os = "windows") {
        std::env::var("APPDATA")
            .map_or_else(|_| PathBuf::from("C:\\Users\\Default\\AppData\\Roaming"), PathBuf::from)
    } else if cfg!(target_os = "macos") {
        home_dir().join("Library/Application Support")
    } else {
        std::env::var("XDG_CONFIG_HOME").map_or_else(|_| home_dir().join(".config"), PathBuf::from)
    };
    base.join(APP_ID)
}

fn home_dir() -> PathBuf {
    std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map_or_else(|_| PathBuf::from("."), PathBuf::from)
}
