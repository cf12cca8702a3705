//! The host application's primitive operations.
//!
//! Handlers never touch the object graph directly; they go through [`Host`].
//! Every method is synchronous and must only be called from the host's
//! mutation thread.

pub mod classdb;
pub mod headless;
pub mod path;
pub mod scene;

use serde::Serialize;
use thiserror::Error;

use crate::error::CommandError;
use crate::value::{Mapping, NativeValue};

pub use headless::HeadlessHost;
pub use path::{NodePath, PathError, ResPath};

#[derive(Debug, Error)]
pub enum HostError {
    #[error("No scene is currently open")]
    NoScene,
    #[error("Node not found: {0}")]
    NodeNotFound(NodePath),
    #[error("Unknown class: {0}")]
    UnknownClass(String),
    #[error("Node {path} has no property '{property}'")]
    UnknownProperty { path: NodePath, property: String },
    #[error("Property '{property}' expects {expected}, got {actual}")]
    TypeMismatch {
        property: String,
        expected: &'static str,
        actual: &'static str,
    },
    #[error("{0}")]
    InvalidOperation(String),
    #[error("File not found: {0}")]
    FileNotFound(ResPath),
    #[error("I/O error on {path}: {source}")]
    Io {
        path: ResPath,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid scene file {path}: {message}")]
    InvalidScene { path: ResPath, message: String },
}

impl From<HostError> for CommandError {
    fn from(e: HostError) -> Self {
        CommandError::host_failed(e.to_string())
    }
}

// ── Snapshots returned by the host ──────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeInfo {
    pub path: NodePath,
    pub name: String,
    #[serde(rename = "type")]
    pub class: String,
    pub properties: Mapping,
    pub children: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SceneInfo {
    pub path: Option<ResPath>,
    pub root_name: String,
    pub root_type: String,
    pub node_count: usize,
    pub dirty: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EditorState {
    pub project_name: String,
    pub current_scene: Option<SceneInfo>,
    pub ticks: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    File,
    Dir,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileEntry {
    pub path: ResPath,
    pub kind: FileKind,
    pub size: u64,
}

// ── Host trait ──────────────────────────────────────────────────

pub trait Host: Send {
    fn project_name(&self) -> String;

    /// `project.godot` settings keyed `section/key`.
    fn project_settings(&self) -> Result<Mapping, HostError>;

    /// Recursive listing under `dir`, sorted by path.
    fn list_files(&self, dir: &ResPath) -> Result<Vec<FileEntry>, HostError>;

    fn file_exists(&self, path: &ResPath) -> bool;

    fn dir_exists(&self, path: &ResPath) -> bool;

    fn read_file(&self, path: &ResPath) -> Result<String, HostError>;

    /// Create or replace a file, creating parent directories. Returns the
    /// number of bytes written.
    fn write_file(&mut self, path: &ResPath, content: &str) -> Result<u64, HostError>;

    fn class_exists(&self, class: &str) -> bool;

    /// Add a new `class` node under `parent`. The requested name is made
    /// unique among the parent's children; the final path is returned.
    fn instantiate(
        &mut self,
        parent: &NodePath,
        class: &str,
        name: &str,
    ) -> Result<NodePath, HostError>;

    fn free_node(&mut self, path: &NodePath) -> Result<(), HostError>;

    fn node(&self, path: &NodePath) -> Result<NodeInfo, HostError>;

    /// Assign a property and return its previous value.
    fn set_property(
        &mut self,
        path: &NodePath,
        property: &str,
        value: NativeValue,
    ) -> Result<NativeValue, HostError>;

    fn current_scene(&self) -> Option<SceneInfo>;

    /// Replace the edited scene with a fresh one rooted at a `root_class`
    /// node. The scene is not written until saved.
    fn new_scene(&mut self, path: &ResPath, root_class: &str) -> Result<SceneInfo, HostError>;

    fn load_scene(&mut self, path: &ResPath) -> Result<SceneInfo, HostError>;

    /// Save the edited scene to `path`, or to its own path when `None`.
    fn save_scene(&mut self, path: Option<&ResPath>) -> Result<ResPath, HostError>;

    fn editor_state(&self) -> EditorState;

    /// Called once per host-loop tick, before the command queue is drained.
    fn tick(&mut self) {}
}
