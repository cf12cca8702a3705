use serde_json::json;

use crate::command::Arguments;
use crate::error::CommandError;
use crate::host::{Host, ResPath};
use crate::registry::params::{CreateScriptParams, EditScriptParams, ScriptPathParams};
use crate::registry::validation;
use crate::registry::{CommandFamily, CommandHandler};
use crate::value::NativeValue;

const SCRIPT_EXTENSION: &str = "gd";
const DEFAULT_BASE: &str = "Node";

enum ScriptRequest {
    Create {
        path: ResPath,
        class_name: Option<String>,
        extends: String,
    },
    Edit {
        path: ResPath,
        content: String,
    },
    Get {
        path: ResPath,
    },
}

fn script_path(raw: &str) -> Result<ResPath, CommandError> {
    let path = validation::res_file_path(raw, "path")?;
    if path.extension().as_deref() != Some(SCRIPT_EXTENSION) {
        return Err(CommandError::invalid_argument(format!(
            "Script path must end in .{SCRIPT_EXTENSION}: {path}"
        )));
    }
    Ok(path)
}

impl ScriptRequest {
    fn parse(command_type: &str, args: &Arguments, host: &dyn Host) -> Result<Self, CommandError> {
        match command_type {
            "create_script" => {
                let p: CreateScriptParams = args.parse()?;
                let path = script_path(&p.path)?;
                validation::absent_file(host, &path)?;
                let class_name = validation::optional(p.class_name.as_deref())
                    .map(|raw| validation::identifier(raw, "class_name").map(str::to_string))
                    .transpose()?;
                let extends = match validation::optional(p.extends_type.as_deref()) {
                    Some(raw) => validation::identifier(raw, "extends_type")?.to_string(),
                    None => DEFAULT_BASE.to_string(),
                };
                Ok(Self::Create {
                    path,
                    class_name,
                    extends,
                })
            }
            "edit_script" => {
                let p: EditScriptParams = args.parse()?;
                let path = validation::res_file_path(&p.path, "path")?;
                validation::existing_file(host, &path)?;
                Ok(Self::Edit {
                    path,
                    content: p.content,
                })
            }
            "get_script" => {
                let p: ScriptPathParams = args.parse()?;
                let path = validation::res_file_path(&p.path, "path")?;
                validation::existing_file(host, &path)?;
                Ok(Self::Get { path })
            }
            other => Err(CommandError::unknown_command(other)),
        }
    }
}

/// Starter body for a new script.
fn script_template(extends: &str, class_name: Option<&str>) -> String {
    let mut source = format!("extends {extends}\n");
    if let Some(name) = class_name {
        source.push_str(&format!("class_name {name}\n"));
    }
    source.push_str("\n\nfunc _ready() -> void:\n\tpass\n");
    source
}

pub struct ScriptHandler;

impl CommandHandler for ScriptHandler {
    fn family(&self) -> CommandFamily {
        CommandFamily::Script
    }

    fn validate(
        &self,
        command_type: &str,
        args: &Arguments,
        host: &dyn Host,
    ) -> Result<(), CommandError> {
        ScriptRequest::parse(command_type, args, host).map(drop)
    }

    fn execute(
        &self,
        command_type: &str,
        args: &Arguments,
        host: &mut dyn Host,
    ) -> Result<NativeValue, CommandError> {
        match ScriptRequest::parse(command_type, args, &*host)? {
            ScriptRequest::Create {
                path,
                class_name,
                extends,
            } => {
                let source = script_template(&extends, class_name.as_deref());
                let size = host.write_file(&path, &source)?;
                Ok(json!({
                    "path": path,
                    "class_name": class_name,
                    "extends": extends,
                    "size": size,
                })
                .into())
            }
            ScriptRequest::Edit { path, content } => {
                let size = host.write_file(&path, &content)?;
                Ok(json!({ "path": path, "size": size }).into())
            }
            ScriptRequest::Get { path } => {
                let content = host.read_file(&path)?;
                Ok(json!({ "path": path, "content": content }).into())
            }
        }
    }
}
