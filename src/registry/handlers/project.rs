use std::collections::BTreeMap;

use serde_json::json;

use crate::command::Arguments;
use crate::error::CommandError;
use crate::host::{FileEntry, FileKind, Host, ResPath};
use crate::registry::params::ListProjectFilesParams;
use crate::registry::validation;
use crate::registry::{CommandFamily, CommandHandler};
use crate::value::NativeValue;

/// Resource groups reported by `list_project_resources`, by extension.
const RESOURCE_GROUPS: &[(&str, &[&str])] = &[
    ("scenes", &["tscn", "scn"]),
    ("scripts", &["gd", "cs"]),
    ("resources", &["tres", "res"]),
    ("images", &["png", "jpg", "jpeg", "svg", "webp"]),
    ("audio", &["wav", "ogg", "mp3"]),
];

enum ProjectRequest {
    Info,
    ListFiles { dir: ResPath },
    Structure,
    Settings,
    Resources,
}

impl ProjectRequest {
    fn parse(command_type: &str, args: &Arguments, host: &dyn Host) -> Result<Self, CommandError> {
        match command_type {
            "get_project_info" => Ok(Self::Info),
            "list_project_files" => {
                let p: ListProjectFilesParams = args.parse()?;
                let dir = match validation::optional(p.path.as_deref()) {
                    Some(raw) => validation::res_path(raw, "path")?,
                    None => ResPath::root(),
                };
                validation::existing_dir(host, &dir)?;
                Ok(Self::ListFiles { dir })
            }
            "get_project_structure" => Ok(Self::Structure),
            "get_project_settings" => Ok(Self::Settings),
            "list_project_resources" => Ok(Self::Resources),
            other => Err(CommandError::unknown_command(other)),
        }
    }
}

pub struct ProjectHandler;

impl CommandHandler for ProjectHandler {
    fn family(&self) -> CommandFamily {
        CommandFamily::Project
    }

    fn validate(
        &self,
        command_type: &str,
        args: &Arguments,
        host: &dyn Host,
    ) -> Result<(), CommandError> {
        ProjectRequest::parse(command_type, args, host).map(drop)
    }

    fn execute(
        &self,
        command_type: &str,
        args: &Arguments,
        host: &mut dyn Host,
    ) -> Result<NativeValue, CommandError> {
        match ProjectRequest::parse(command_type, args, &*host)? {
            ProjectRequest::Info => project_info(host),
            ProjectRequest::ListFiles { dir } => list_files(host, &dir),
            ProjectRequest::Structure => project_structure(host),
            ProjectRequest::Settings => project_settings(host),
            ProjectRequest::Resources => project_resources(host),
        }
    }
}

fn project_info(host: &dyn Host) -> Result<NativeValue, CommandError> {
    let settings = host.project_settings()?;
    let setting = |key: &str| settings.get(key).cloned().unwrap_or_default();
    let current = host.current_scene().and_then(|s| s.path);
    Ok(json!({
        "name": host.project_name(),
        "root": ResPath::root(),
        "main_scene": setting("application/run/main_scene"),
        "config_version": setting("config_version"),
        "engine_features": setting("application/config/features"),
        "current_scene": current,
    })
    .into())
}

fn list_files(host: &dyn Host, dir: &ResPath) -> Result<NativeValue, CommandError> {
    let files = host.list_files(dir)?;
    Ok(json!({
        "path": dir,
        "count": files.len(),
        "files": files,
    })
    .into())
}

fn project_structure(host: &dyn Host) -> Result<NativeValue, CommandError> {
    let entries = host.list_files(&ResPath::root())?;
    let mut directories: Vec<&ResPath> = Vec::new();
    let mut by_extension: BTreeMap<String, usize> = BTreeMap::new();
    let mut file_count = 0usize;
    for entry in &entries {
        match entry.kind {
            FileKind::Dir => directories.push(&entry.path),
            FileKind::File => {
                file_count += 1;
                let ext = entry
                    .path
                    .extension()
                    .unwrap_or_else(|| "(none)".to_string());
                *by_extension.entry(ext).or_default() += 1;
            }
        }
    }
    Ok(json!({
        "root": ResPath::root(),
        "directory_count": directories.len(),
        "file_count": file_count,
        "directories": directories,
        "by_extension": by_extension,
    })
    .into())
}

fn project_settings(host: &dyn Host) -> Result<NativeValue, CommandError> {
    let settings = host.project_settings()?;
    Ok(json!({
        "count": settings.len(),
        "settings": settings,
    })
    .into())
}

fn resource_group(ext: &str) -> Option<&'static str> {
    RESOURCE_GROUPS
        .iter()
        .find(|(_, exts)| exts.contains(&ext))
        .map(|(group, _)| *group)
}

fn project_resources(host: &dyn Host) -> Result<NativeValue, CommandError> {
    let entries = host.list_files(&ResPath::root())?;
    let mut groups: BTreeMap<&str, Vec<&FileEntry>> = RESOURCE_GROUPS
        .iter()
        .map(|(group, _)| (*group, Vec::new()))
        .collect();
    for entry in entries.iter().filter(|e| e.kind == FileKind::File) {
        let Some(group) = entry.path.extension().as_deref().and_then(resource_group) else {
            continue;
        };
        groups.entry(group).or_default().push(entry);
    }
    let total: usize = groups.values().map(Vec::len).sum();
    let listed: BTreeMap<&str, Vec<&ResPath>> = groups
        .iter()
        .map(|(group, files)| (*group, files.iter().map(|f| &f.path).collect()))
        .collect();
    Ok(json!({
        "total": total,
        "resources": listed,
    })
    .into())
}
