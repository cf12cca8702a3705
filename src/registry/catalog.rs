use indexmap::IndexMap;
use schemars::schema_for;
use serde::Serialize;
use serde_json::Value;

use super::params::{
    CreateNodeParams, CreateSceneParams, CreateScriptParams, DeleteNodeParams, EditScriptParams,
    FilePathParams, ListNodesParams, ListProjectFilesParams, NodePathParams, OpenSceneParams,
    SaveSceneParams, ScriptPathParams, UpdateNodePropertyParams, WriteFileParams,
};
use super::CommandFamily;

/// A catalog entry: name, description and the JSON schema of its arguments.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    #[serde(skip)]
    pub family: CommandFamily,
    #[serde(rename = "inputSchema")]
    pub input_shape: Value,
}

impl ToolDescriptor {
    /// Names listed under the schema's `required`.
    pub fn required(&self) -> Vec<&str> {
        self.input_shape
            .get("required")
            .and_then(Value::as_array)
            .map(|fields| fields.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    pub fn property_schema(&self, field: &str) -> Option<&Value> {
        self.input_shape.get("properties").and_then(|p| p.get(field))
    }
}

pub(super) fn empty_object_schema() -> Value {
    serde_json::json!({ "type": "object", "properties": {} })
}

/// Schema generated from a parameter struct, trimmed to what clients need.
pub(super) fn schema_value<T: schemars::JsonSchema>() -> Value {
    let root = schema_for!(T);
    let mut schema = serde_json::to_value(root).unwrap_or_else(|_| empty_object_schema());
    if let Some(obj) = schema.as_object_mut() {
        obj.remove("$schema");
        obj.remove("title");
        if obj
            .get("definitions")
            .and_then(Value::as_object)
            .is_some_and(serde_json::Map::is_empty)
        {
            obj.remove("definitions");
        }
        obj.entry("properties")
            .or_insert_with(|| Value::Object(serde_json::Map::new()));
    }
    schema
}

fn entry(
    name: &'static str,
    description: &'static str,
    family: CommandFamily,
    input_shape: Value,
) -> ToolDescriptor {
    ToolDescriptor {
        name,
        description,
        family,
        input_shape,
    }
}

// ── define_tools! macro ─────────────────────────────────────────

/// Single source of truth for the tool table. Tools with arguments name their
/// parameter struct in parentheses; the input schema is derived from it so
/// the catalog and the handlers' deserialization cannot drift.
macro_rules! define_tools {
    (
        $( [ $family:expr ] $name:literal $( ( $params:ty ) )? : $desc:literal ; )*
    ) => {
        fn tool_table() -> Vec<ToolDescriptor> {
            vec![
                $( entry($name, $desc, $family, define_tools!(@schema $( $params )?)), )*
            ]
        }
    };

    (@schema $params:ty) => { schema_value::<$params>() };
    (@schema) => { empty_object_schema() };
}

define_tools! {
    // ── Project (5) ─────────────────────────────────────────────
    [CommandFamily::Project] "get_project_info": "Get information about the current project.";
    [CommandFamily::Project] "list_project_files"(ListProjectFilesParams): "List files in the project.";
    [CommandFamily::Project] "get_project_structure": "Get the project directory structure.";
    [CommandFamily::Project] "get_project_settings": "Get project settings.";
    [CommandFamily::Project] "list_project_resources": "List resources in the project.";

    // ── Scene (5) ───────────────────────────────────────────────
    [CommandFamily::Scene] "save_scene"(SaveSceneParams): "Save the current scene.";
    [CommandFamily::Scene] "open_scene"(OpenSceneParams): "Open a scene.";
    [CommandFamily::Scene] "get_current_scene": "Get information about the current scene.";
    [CommandFamily::Scene] "get_scene_structure": "Get the structure of the current scene.";
    [CommandFamily::Scene] "create_scene"(CreateSceneParams): "Create a new scene.";

    // ── Node (5) ────────────────────────────────────────────────
    [CommandFamily::Node] "create_node"(CreateNodeParams): "Create a new node in the scene.";
    [CommandFamily::Node] "delete_node"(DeleteNodeParams): "Delete a node from the scene.";
    [CommandFamily::Node] "update_node_property"(UpdateNodePropertyParams): "Update a property of a node.";
    [CommandFamily::Node] "get_node_properties"(NodePathParams): "Get properties of a node.";
    [CommandFamily::Node] "list_nodes"(ListNodesParams): "List nodes in the scene.";

    // ── Script (3) ──────────────────────────────────────────────
    [CommandFamily::Script] "create_script"(CreateScriptParams): "Create a new script.";
    [CommandFamily::Script] "edit_script"(EditScriptParams): "Edit an existing script.";
    [CommandFamily::Script] "get_script"(ScriptPathParams): "Get the content of a script.";

    // ── Editor (1) ──────────────────────────────────────────────
    [CommandFamily::Editor] "get_editor_state": "Get the current state of the editor.";

    // ── File (2) ────────────────────────────────────────────────
    [CommandFamily::File] "read_file"(FilePathParams): "Read the contents of a file.";
    [CommandFamily::File] "write_file"(WriteFileParams): "Write content to a file.";
}

// ── Catalog ─────────────────────────────────────────────────────

/// Immutable tool catalog, built once at startup. Listing follows table
/// order, which groups tools by family.
#[derive(Debug, Clone)]
pub struct Catalog {
    tools: IndexMap<&'static str, ToolDescriptor>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}

impl Catalog {
    pub fn new() -> Self {
        Self {
            tools: tool_table()
                .into_iter()
                .map(|tool| (tool.name, tool))
                .collect(),
        }
    }

    pub fn list(&self) -> impl Iterator<Item = &ToolDescriptor> {
        self.tools.values()
    }

    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.tools.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn family(&self, family: CommandFamily) -> impl Iterator<Item = &ToolDescriptor> {
        self.list().filter(move |tool| tool.family == family)
    }

    /// Required argument names of `name`; empty for unknown tools.
    pub fn required_fields(&self, name: &str) -> Vec<&str> {
        self.get(name).map(ToolDescriptor::required).unwrap_or_default()
    }

    /// JSON array of `{name, description, inputSchema}`.
    pub fn to_json(&self) -> Value {
        Value::Array(
            self.list()
                .map(|tool| serde_json::to_value(tool).unwrap_or(Value::Null))
                .collect(),
        )
    }
}
