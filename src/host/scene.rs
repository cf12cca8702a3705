//! In-memory scene tree and its on-disk JSON form.

use serde::{Deserialize, Serialize};

use super::classdb;
use super::path::NodePath;
use crate::value::Mapping;

/// Scene file format version.
pub const SCENE_FORMAT: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneNode {
    pub name: String,
    #[serde(rename = "type")]
    pub class: String,
    #[serde(default)]
    pub properties: Mapping,
    #[serde(default)]
    pub children: Vec<SceneNode>,
}

impl SceneNode {
    /// New node carrying its class defaults.
    pub fn new(name: impl Into<String>, class: impl Into<String>) -> Self {
        let class = class.into();
        Self {
            name: name.into(),
            properties: classdb::default_properties(&class),
            class,
            children: Vec::new(),
        }
    }

    pub fn child(&self, name: &str) -> Option<&SceneNode> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn child_mut(&mut self, name: &str) -> Option<&mut SceneNode> {
        self.children.iter_mut().find(|c| c.name == name)
    }

    /// Resolve `path` with `self` as the scene root.
    pub fn find(&self, path: &NodePath) -> Option<&SceneNode> {
        path.segments()
            .try_fold(self, |node, segment| node.child(segment))
    }

    pub fn find_mut(&mut self, path: &NodePath) -> Option<&mut SceneNode> {
        path.segments()
            .try_fold(self, |node, segment| node.child_mut(segment))
    }

    /// Detach the child called `name`.
    pub fn remove_child(&mut self, name: &str) -> Option<SceneNode> {
        let idx = self.children.iter().position(|c| c.name == name)?;
        Some(self.children.remove(idx))
    }

    /// `base`, or `base2`, `base3`, ... whichever is free among the children.
    pub fn unique_child_name(&self, base: &str) -> String {
        if self.child(base).is_none() {
            return base.to_string();
        }
        (2..)
            .map(|n| format!("{base}{n}"))
            .find(|candidate| self.child(candidate).is_none())
            .unwrap_or_else(|| base.to_string())
    }

    /// Number of nodes in this subtree, including `self`.
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(SceneNode::count).sum::<usize>()
    }
}

/// JSON envelope written to scene files.
#[derive(Debug, Serialize, Deserialize)]
pub struct SceneFile {
    pub format: u32,
    pub root: SceneNode,
}

impl SceneFile {
    pub fn new(root: SceneNode) -> Self {
        Self {
            format: SCENE_FORMAT,
            root,
        }
    }
}
