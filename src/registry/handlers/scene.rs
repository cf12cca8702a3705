use serde::Serialize;
use serde_json::json;

use super::payload;
use crate::command::Arguments;
use crate::error::CommandError;
use crate::host::{Host, HostError, NodePath, ResPath, SceneInfo};
use crate::registry::params::{CreateSceneParams, OpenSceneParams, SaveSceneParams};
use crate::registry::validation;
use crate::registry::{CommandFamily, CommandHandler};
use crate::value::NativeValue;

enum SceneRequest {
    Save { path: Option<ResPath> },
    Open { path: ResPath },
    Current,
    Structure,
    Create { path: ResPath, root_type: String },
}

impl SceneRequest {
    fn parse(command_type: &str, args: &Arguments, host: &dyn Host) -> Result<Self, CommandError> {
        match command_type {
            "save_scene" => {
                let p: SaveSceneParams = args.parse()?;
                let path = validation::optional(p.path.as_deref())
                    .map(|raw| validation::res_file_path(raw, "path"))
                    .transpose()?;
                Ok(Self::Save { path })
            }
            "open_scene" => {
                let p: OpenSceneParams = args.parse()?;
                let path = validation::res_file_path(&p.path, "path")?;
                validation::existing_file(host, &path)?;
                Ok(Self::Open { path })
            }
            "get_current_scene" => Ok(Self::Current),
            "get_scene_structure" => Ok(Self::Structure),
            "create_scene" => {
                let p: CreateSceneParams = args.parse()?;
                let path = validation::res_file_path(&p.path, "path")?;
                validation::absent_file(host, &path)?;
                let root_type = validation::identifier(&p.root_type, "root_type")?.to_string();
                Ok(Self::Create { path, root_type })
            }
            other => Err(CommandError::unknown_command(other)),
        }
    }
}

pub struct SceneHandler;

impl CommandHandler for SceneHandler {
    fn family(&self) -> CommandFamily {
        CommandFamily::Scene
    }

    fn validate(
        &self,
        command_type: &str,
        args: &Arguments,
        host: &dyn Host,
    ) -> Result<(), CommandError> {
        SceneRequest::parse(command_type, args, host).map(drop)
    }

    fn execute(
        &self,
        command_type: &str,
        args: &Arguments,
        host: &mut dyn Host,
    ) -> Result<NativeValue, CommandError> {
        match SceneRequest::parse(command_type, args, &*host)? {
            SceneRequest::Save { path } => {
                let saved = host.save_scene(path.as_ref())?;
                Ok(json!({ "path": saved, "saved": true }).into())
            }
            SceneRequest::Open { path } => {
                let info = host.load_scene(&path)?;
                scene_payload(Some(&info))
            }
            SceneRequest::Current => scene_payload(host.current_scene().as_ref()),
            SceneRequest::Structure => scene_structure(host),
            SceneRequest::Create { path, root_type } => {
                host.new_scene(&path, &root_type)?;
                host.save_scene(None)?;
                scene_payload(host.current_scene().as_ref())
            }
        }
    }
}

#[derive(Serialize)]
struct OpenScenePayload<'a> {
    open: bool,
    #[serde(flatten)]
    info: &'a SceneInfo,
}

fn scene_payload(info: Option<&SceneInfo>) -> Result<NativeValue, CommandError> {
    match info {
        Some(info) => payload(&OpenScenePayload { open: true, info }),
        None => Ok(json!({ "open": false }).into()),
    }
}

#[derive(Serialize)]
struct TreeNode {
    name: String,
    #[serde(rename = "type")]
    class: String,
    path: NodePath,
    children: Vec<TreeNode>,
}

fn build_tree(host: &dyn Host, path: &NodePath) -> Result<TreeNode, HostError> {
    let info = host.node(path)?;
    let children = info
        .children
        .iter()
        .map(|child| build_tree(host, &path.join(child)))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(TreeNode {
        name: info.name,
        class: info.class,
        path: info.path,
        children,
    })
}

fn scene_structure(host: &dyn Host) -> Result<NativeValue, CommandError> {
    let scene = host.current_scene().ok_or(HostError::NoScene)?;
    let tree = build_tree(host, &NodePath::root())?;
    payload(&json!({
        "path": scene.path,
        "node_count": scene.node_count,
        "root": tree,
    }))
}
