//! Typed arguments of each tool. Doc comments become the field descriptions
//! in the published input schemas.
//!
//! Optional string fields treat an empty string as absent, since a wire
//! `null` arrives as `""` under the default null policy.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::value::NativeValue;

// ── Project params ──────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ListProjectFilesParams {
    /// Path to list files from (optional)
    #[serde(default)]
    pub path: Option<String>,
}

// ── Scene params ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SaveSceneParams {
    /// Path to save the scene (optional)
    #[serde(default)]
    pub path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct OpenSceneParams {
    /// Path to the scene
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CreateSceneParams {
    /// Path to save the new scene
    pub path: String,
    /// Type of the root node
    pub root_type: String,
}

// ── Node params ─────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CreateNodeParams {
    /// Type of node to create
    #[serde(rename = "type")]
    pub node_type: String,
    /// Path to the parent node
    #[serde(default)]
    pub parent_path: Option<String>,
    /// Name for the new node
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DeleteNodeParams {
    /// Path to the node to delete
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct UpdateNodePropertyParams {
    /// Path to the node
    pub path: String,
    /// Property name
    pub property: String,
    /// New value for the property
    pub value: NativeValue,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct NodePathParams {
    /// Path to the node
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ListNodesParams {
    /// Path to the parent node (optional)
    #[serde(default)]
    pub path: Option<String>,
}

// ── Script params ───────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CreateScriptParams {
    /// Path to save the script
    pub path: String,
    /// Class name for the script (optional)
    #[serde(default)]
    pub class_name: Option<String>,
    /// Base class to extend (default: Node)
    #[serde(default)]
    pub extends_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct EditScriptParams {
    /// Path to the script
    pub path: String,
    /// New content for the script
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ScriptPathParams {
    /// Path to the script
    pub path: String,
}

// ── File params ─────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FilePathParams {
    /// Path to the file
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WriteFileParams {
    /// Path to the file
    pub path: String,
    /// Content to write
    pub content: String,
}
