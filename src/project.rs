use std::collections::HashMap;
use std::ffi::OsString;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

use parking_lot::Mutex;
use serde::Serialize;
use thiserror::Error;

use crate::value::{Mapping, NativeValue};

// ── Error type ──────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid project: {0}")]
    InvalidProject(String),
}

// ── Atomic JSON I/O ─────────────────────────────────────────────────

/// Per-file mutex map to serialize concurrent writes to the same path.
static FILE_LOCKS: LazyLock<Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

/// Atomically write bytes to a file using write-to-temp-then-rename.
///
/// The per-file lock keeps concurrent callers from racing on the `.tmp`
/// sibling; the rename means readers never observe a half-written file.
pub fn atomic_write(path: &Path, data: &[u8]) -> Result<(), ProjectError> {
    let lock = FILE_LOCKS
        .lock()
        .entry(path.to_path_buf())
        .or_insert_with(|| Arc::new(Mutex::new(())))
        .clone();
    let _guard = lock.lock();

    let file_name = path.file_name().unwrap_or_default();
    let mut tmp_name = OsString::from(file_name);
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(&tmp_name);

    let mut file = fs::File::create(&tmp_path)?;
    file.write_all(data)?;
    file.sync_all()?;
    drop(file);

    fs::rename(&tmp_path, path)?;
    Ok(())
}

pub(crate) fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), ProjectError> {
    let json = serde_json::to_string_pretty(value)?;
    atomic_write(path, json.as_bytes())
}

pub(crate) fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ProjectError> {
    let data = fs::read_to_string(path)?;
    let value = serde_json::from_str(&data)?;
    Ok(value)
}

// ── project.godot ───────────────────────────────────────────────────

/// Check that `dir` looks like a project directory.
pub fn ensure_project_dir(dir: &Path) -> Result<(), ProjectError> {
    if !dir.is_dir() {
        return Err(ProjectError::InvalidProject(format!(
            "{} is not a directory",
            dir.display()
        )));
    }
    Ok(())
}

/// Read `project.godot` under `dir`. A missing file yields no settings.
pub fn load_project_settings(dir: &Path) -> Result<Mapping, ProjectError> {
    let path = crate::paths::project_file(dir);
    if !path.exists() {
        return Ok(Mapping::new());
    }
    Ok(parse_project_settings(&fs::read_to_string(path)?))
}

/// Parse the INI-style `project.godot` format into `section/key` entries.
/// Keys above the first section header are kept bare.
pub fn parse_project_settings(text: &str) -> Mapping {
    let mut settings = Mapping::new();
    let mut section = String::new();
    for line in text.lines().map(str::trim) {
        if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
            continue;
        }
        if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            section = name.trim().to_string();
            continue;
        }
        let Some((key, raw)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        let full_key = if section.is_empty() {
            key.to_string()
        } else {
            format!("{section}/{key}")
        };
        settings.insert(full_key, parse_setting_value(raw.trim()));
    }
    settings
}

fn parse_setting_value(raw: &str) -> NativeValue {
    if let Some(inner) = raw.strip_prefix('"').and_then(|r| r.strip_suffix('"')) {
        return NativeValue::from(inner.replace("\\\"", "\""));
    }
    match raw {
        "true" => return NativeValue::Bool(true),
        "false" => return NativeValue::Bool(false),
        "null" => return NativeValue::Nil,
        _ => {}
    }
    if let Ok(i) = raw.parse::<i64>() {
        return NativeValue::Int(i);
    }
    if let Ok(f) = raw.parse::<f64>() {
        return NativeValue::Float(f);
    }
    NativeValue::from(raw)
}

// ── Directory walking ───────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkEntry {
    /// Path relative to the walk root, `/`-separated.
    pub relative: String,
    pub is_dir: bool,
    pub size: u64,
}

/// Recursive listing of `dir`, sorted by relative path. Hidden entries
/// (leading `.`, e.g. the editor cache) are skipped along with their contents.
pub fn walk_dir(dir: &Path) -> Result<Vec<WalkEntry>, ProjectError> {
    let mut entries = Vec::new();
    walk_into(dir, "", &mut entries)?;
    entries.sort_by(|a, b| a.relative.cmp(&b.relative));
    Ok(entries)
}

fn walk_into(dir: &Path, prefix: &str, out: &mut Vec<WalkEntry>) -> Result<(), ProjectError> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with('.') {
            continue;
        }
        let relative = if prefix.is_empty() {
            name
        } else {
            format!("{prefix}/{name}")
        };
        let meta = entry.metadata()?;
        if meta.is_dir() {
            out.push(WalkEntry {
                relative: relative.clone(),
                is_dir: true,
                size: 0,
            });
            walk_into(&entry.path(), &relative, out)?;
        } else {
            out.push(WalkEntry {
                relative,
                is_dir: false,
                size: meta.len(),
            });
        }
    }
    Ok(())
}
