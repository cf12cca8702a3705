//! Shared validation helpers for registry command handlers.
//!
//! Everything here fails with `InvalidArgument` so handlers produce
//! consistent messages for malformed input.

use crate::command::Arguments;
use crate::error::CommandError;
use crate::host::path::is_valid_node_name;
use crate::host::{Host, NodePath, ResPath};

/// Every name in `required` must be present in `args`.
pub fn require_fields(args: &Arguments, required: &[&str]) -> Result<(), CommandError> {
    match required.iter().find(|field| !args.contains(field)) {
        Some(field) => Err(CommandError::invalid_argument(format!(
            "Missing required argument '{field}'"
        ))),
        None => Ok(()),
    }
}

/// Trimmed `value`, rejecting blank input.
pub fn non_empty<'a>(value: &'a str, field: &str) -> Result<&'a str, CommandError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CommandError::invalid_argument(format!(
            "'{field}' must not be empty"
        )));
    }
    Ok(trimmed)
}

/// Treat blank optional strings as absent.
pub fn optional(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

pub fn node_path(raw: &str, field: &str) -> Result<NodePath, CommandError> {
    NodePath::parse(non_empty(raw, field)?)
        .map_err(|e| CommandError::invalid_argument(format!("Invalid '{field}': {e}")))
}

pub fn res_path(raw: &str, field: &str) -> Result<ResPath, CommandError> {
    ResPath::parse(non_empty(raw, field)?)
        .map_err(|e| CommandError::invalid_argument(format!("Invalid '{field}': {e}")))
}

/// Like [`res_path`], but the project root itself is not a file.
pub fn res_file_path(raw: &str, field: &str) -> Result<ResPath, CommandError> {
    let path = res_path(raw, field)?;
    if path.is_root() {
        return Err(CommandError::invalid_argument(format!(
            "'{field}' must name a file, not the project root"
        )));
    }
    Ok(path)
}

pub fn existing_file(host: &dyn Host, path: &ResPath) -> Result<(), CommandError> {
    if host.file_exists(path) {
        Ok(())
    } else {
        Err(CommandError::invalid_argument(format!("File not found: {path}")))
    }
}

pub fn existing_dir(host: &dyn Host, path: &ResPath) -> Result<(), CommandError> {
    if host.dir_exists(path) {
        Ok(())
    } else {
        Err(CommandError::invalid_argument(format!(
            "Directory not found: {path}"
        )))
    }
}

pub fn absent_file(host: &dyn Host, path: &ResPath) -> Result<(), CommandError> {
    if host.file_exists(path) || host.dir_exists(path) {
        Err(CommandError::invalid_argument(format!(
            "{path} already exists"
        )))
    } else {
        Ok(())
    }
}

/// A class or script identifier: `[A-Za-z_][A-Za-z0-9_]*`.
pub fn identifier<'a>(raw: &'a str, field: &str) -> Result<&'a str, CommandError> {
    let value = non_empty(raw, field)?;
    let mut chars = value.chars();
    let valid = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(value)
    } else {
        Err(CommandError::invalid_argument(format!(
            "'{field}' is not a valid identifier: {value}"
        )))
    }
}

pub fn node_name<'a>(raw: &'a str, field: &str) -> Result<&'a str, CommandError> {
    let value = non_empty(raw, field)?;
    if is_valid_node_name(value) {
        Ok(value)
    } else {
        Err(CommandError::invalid_argument(format!(
            "'{field}' is not a valid node name: {value}"
        )))
    }
}
