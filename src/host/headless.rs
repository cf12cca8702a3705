//! A host without an editor: scene tree in memory, project files on disk.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::path::{is_valid_node_name, NodePath, ResPath};
use super::scene::{SceneFile, SceneNode, SCENE_FORMAT};
use super::{classdb, EditorState, FileEntry, FileKind, Host, HostError, NodeInfo, SceneInfo};
use crate::project::{self, ProjectError};
use crate::value::{Mapping, NativeValue};

#[derive(Debug)]
struct OpenScene {
    path: Option<ResPath>,
    root: SceneNode,
    dirty: bool,
}

impl OpenScene {
    fn info(&self) -> SceneInfo {
        SceneInfo {
            path: self.path.clone(),
            root_name: self.root.name.clone(),
            root_type: self.root.class.clone(),
            node_count: self.root.count(),
            dirty: self.dirty,
        }
    }
}

#[derive(Debug)]
pub struct HeadlessHost {
    root: PathBuf,
    scene: Option<OpenScene>,
    ticks: u64,
}

impl HeadlessHost {
    /// Host over an existing project directory.
    pub fn open(project_dir: impl Into<PathBuf>) -> Result<Self, ProjectError> {
        let root = project_dir.into();
        project::ensure_project_dir(&root)?;
        Ok(Self::new(root))
    }

    pub fn new(project_dir: impl Into<PathBuf>) -> Self {
        Self {
            root: project_dir.into(),
            scene: None,
            ticks: 0,
        }
    }

    pub fn project_dir(&self) -> &Path {
        &self.root
    }

    fn scene(&self) -> Result<&OpenScene, HostError> {
        self.scene.as_ref().ok_or(HostError::NoScene)
    }

    fn scene_mut(&mut self) -> Result<&mut OpenScene, HostError> {
        self.scene.as_mut().ok_or(HostError::NoScene)
    }

    fn fs_path(&self, path: &ResPath) -> PathBuf {
        path.to_fs(&self.root)
    }
}

fn project_err(path: &ResPath, e: ProjectError) -> HostError {
    match e {
        ProjectError::Io(source) => HostError::Io {
            path: path.clone(),
            source,
        },
        other => HostError::InvalidOperation(other.to_string()),
    }
}

fn io_err(path: &ResPath) -> impl FnOnce(std::io::Error) -> HostError + '_ {
    move |source| HostError::Io {
        path: path.clone(),
        source,
    }
}

/// Fit `value` to the type of the property's current value. Integers widen
/// to floats; maps must carry the same keys; a `Nil` property takes anything.
fn coerce_property(
    property: &str,
    current: &NativeValue,
    value: NativeValue,
) -> Result<NativeValue, HostError> {
    let mismatch = |actual: &NativeValue| HostError::TypeMismatch {
        property: property.to_string(),
        expected: current.type_name(),
        actual: actual.type_name(),
    };
    match (current, value) {
        (NativeValue::Nil, v) => Ok(v),
        (NativeValue::Float(_), NativeValue::Int(i)) => {
            #[allow(clippy::cast_precision_loss)]
            let widened = i as f64;
            Ok(NativeValue::Float(widened))
        }
        (NativeValue::Map(fields), NativeValue::Map(incoming)) => {
            if incoming.len() != fields.len() || incoming.keys().any(|k| !fields.contains_key(k)) {
                return Err(mismatch(&NativeValue::Map(incoming)));
            }
            let mut out = Mapping::new();
            for (key, cur) in fields {
                let v = incoming.get(key).cloned().unwrap_or_default();
                out.insert(key.clone(), coerce_property(property, cur, v)?);
            }
            Ok(NativeValue::Map(out))
        }
        (cur, v) if std::mem::discriminant(cur) == std::mem::discriminant(&v) => Ok(v),
        (_, v) => Err(mismatch(&v)),
    }
}

impl Host for HeadlessHost {
    fn project_name(&self) -> String {
        self.project_settings()
            .ok()
            .and_then(|s| {
                s.get("application/config/name")
                    .and_then(NativeValue::as_str)
                    .map(str::to_string)
            })
            .filter(|name| !name.is_empty())
            .or_else(|| {
                self.root
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
            })
            .unwrap_or_else(|| "Untitled".to_string())
    }

    fn project_settings(&self) -> Result<Mapping, HostError> {
        let file = ResPath::root().join(crate::paths::PROJECT_FILE);
        project::load_project_settings(&self.root).map_err(|e| project_err(&file, e))
    }

    fn list_files(&self, dir: &ResPath) -> Result<Vec<FileEntry>, HostError> {
        if !self.dir_exists(dir) {
            return Err(HostError::FileNotFound(dir.clone()));
        }
        let entries = project::walk_dir(&self.fs_path(dir)).map_err(|e| project_err(dir, e))?;
        Ok(entries
            .into_iter()
            .map(|e| FileEntry {
                path: dir.join(&e.relative),
                kind: if e.is_dir { FileKind::Dir } else { FileKind::File },
                size: e.size,
            })
            .collect())
    }

    fn file_exists(&self, path: &ResPath) -> bool {
        self.fs_path(path).is_file()
    }

    fn dir_exists(&self, path: &ResPath) -> bool {
        self.fs_path(path).is_dir()
    }

    fn read_file(&self, path: &ResPath) -> Result<String, HostError> {
        if !self.file_exists(path) {
            return Err(HostError::FileNotFound(path.clone()));
        }
        fs::read_to_string(self.fs_path(path)).map_err(io_err(path))
    }

    fn write_file(&mut self, path: &ResPath, content: &str) -> Result<u64, HostError> {
        if path.is_root() || self.dir_exists(path) {
            return Err(HostError::InvalidOperation(format!(
                "Cannot write to {path}: it is a directory"
            )));
        }
        let target = self.fs_path(path);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(io_err(path))?;
        }
        project::atomic_write(&target, content.as_bytes()).map_err(|e| project_err(path, e))?;
        debug!(%path, bytes = content.len(), "wrote file");
        Ok(content.len() as u64)
    }

    fn class_exists(&self, class: &str) -> bool {
        classdb::class_exists(class)
    }

    fn instantiate(
        &mut self,
        parent: &NodePath,
        class: &str,
        name: &str,
    ) -> Result<NodePath, HostError> {
        if !classdb::class_exists(class) {
            return Err(HostError::UnknownClass(class.to_string()));
        }
        if !is_valid_node_name(name) {
            return Err(HostError::InvalidOperation(format!(
                "Invalid node name '{name}'"
            )));
        }
        let scene = self.scene_mut()?;
        let parent_node = scene
            .root
            .find_mut(parent)
            .ok_or_else(|| HostError::NodeNotFound(parent.clone()))?;
        let unique = parent_node.unique_child_name(name);
        parent_node.children.push(SceneNode::new(unique.clone(), class));
        scene.dirty = true;
        Ok(parent.join(&unique))
    }

    fn free_node(&mut self, path: &NodePath) -> Result<(), HostError> {
        let Some(parent) = path.parent() else {
            return Err(HostError::InvalidOperation(
                "Cannot delete the scene root".to_string(),
            ));
        };
        let scene = self.scene_mut()?;
        scene
            .root
            .find_mut(&parent)
            .and_then(|p| p.remove_child(path.name()))
            .ok_or_else(|| HostError::NodeNotFound(path.clone()))?;
        scene.dirty = true;
        Ok(())
    }

    fn node(&self, path: &NodePath) -> Result<NodeInfo, HostError> {
        let node = self
            .scene()?
            .root
            .find(path)
            .ok_or_else(|| HostError::NodeNotFound(path.clone()))?;
        Ok(NodeInfo {
            path: path.clone(),
            name: node.name.clone(),
            class: node.class.clone(),
            properties: node.properties.clone(),
            children: node.children.iter().map(|c| c.name.clone()).collect(),
        })
    }

    fn set_property(
        &mut self,
        path: &NodePath,
        property: &str,
        value: NativeValue,
    ) -> Result<NativeValue, HostError> {
        let scene = self.scene_mut()?;
        let node = scene
            .root
            .find_mut(path)
            .ok_or_else(|| HostError::NodeNotFound(path.clone()))?;
        let current = node
            .properties
            .get(property)
            .ok_or_else(|| HostError::UnknownProperty {
                path: path.clone(),
                property: property.to_string(),
            })?;
        let coerced = coerce_property(property, current, value)?;
        let previous = node
            .properties
            .insert(property.to_string(), coerced)
            .unwrap_or_default();
        scene.dirty = true;
        Ok(previous)
    }

    fn current_scene(&self) -> Option<SceneInfo> {
        self.scene.as_ref().map(OpenScene::info)
    }

    fn new_scene(&mut self, path: &ResPath, root_class: &str) -> Result<SceneInfo, HostError> {
        if !classdb::class_exists(root_class) {
            return Err(HostError::UnknownClass(root_class.to_string()));
        }
        let stem = path.stem();
        let root_name = if is_valid_node_name(stem) { stem } else { root_class };
        let scene = OpenScene {
            path: Some(path.clone()),
            root: SceneNode::new(root_name, root_class),
            dirty: true,
        };
        let info = scene.info();
        self.scene = Some(scene);
        Ok(info)
    }

    fn load_scene(&mut self, path: &ResPath) -> Result<SceneInfo, HostError> {
        if !self.file_exists(path) {
            return Err(HostError::FileNotFound(path.clone()));
        }
        let file: SceneFile =
            project::read_json(&self.fs_path(path)).map_err(|e| match e {
                ProjectError::Io(source) => HostError::Io {
                    path: path.clone(),
                    source,
                },
                other => HostError::InvalidScene {
                    path: path.clone(),
                    message: other.to_string(),
                },
            })?;
        if file.format > SCENE_FORMAT {
            return Err(HostError::InvalidScene {
                path: path.clone(),
                message: format!(
                    "format {} is newer than supported format {SCENE_FORMAT}",
                    file.format
                ),
            });
        }
        let scene = OpenScene {
            path: Some(path.clone()),
            root: file.root,
            dirty: false,
        };
        let info = scene.info();
        self.scene = Some(scene);
        Ok(info)
    }

    fn save_scene(&mut self, path: Option<&ResPath>) -> Result<ResPath, HostError> {
        let scene = self.scene()?;
        let target = path
            .or(scene.path.as_ref())
            .cloned()
            .ok_or_else(|| {
                HostError::InvalidOperation("The scene has no path; pass one to save it".to_string())
            })?;
        let file = SceneFile::new(scene.root.clone());
        let fs_target = self.fs_path(&target);
        if let Some(parent) = fs_target.parent() {
            fs::create_dir_all(parent).map_err(io_err(&target))?;
        }
        project::write_json(&fs_target, &file).map_err(|e| project_err(&target, e))?;

        let scene = self.scene_mut()?;
        scene.path = Some(target.clone());
        scene.dirty = false;
        debug!(path = %target, "saved scene");
        Ok(target)
    }

    fn editor_state(&self) -> EditorState {
        EditorState {
            project_name: self.project_name(),
            current_scene: self.current_scene(),
            ticks: self.ticks,
        }
    }

    fn tick(&mut self) {
        self.ticks += 1;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn host_with_scene() -> (tempfile::TempDir, HeadlessHost) {
        let dir = tempfile::tempdir().unwrap();
        let mut host = HeadlessHost::open(dir.path()).unwrap();
        host.new_scene(&ResPath::parse("res://main.tscn").unwrap(), "Node2D")
            .unwrap();
        (dir, host)
    }

    #[test]
    fn instantiate_makes_names_unique() {
        let (_dir, mut host) = host_with_scene();
        let root = NodePath::root();
        let first = host.instantiate(&root, "Sprite2D", "Sprite").unwrap();
        let second = host.instantiate(&root, "Sprite2D", "Sprite").unwrap();
        assert_eq!(first.as_str(), "/root/Sprite");
        assert_eq!(second.as_str(), "/root/Sprite2");
        assert_eq!(host.current_scene().unwrap().node_count, 3);
    }

    #[test]
    fn instantiate_rejects_unknown_class_and_parent() {
        let (_dir, mut host) = host_with_scene();
        assert!(matches!(
            host.instantiate(&NodePath::root(), "Dragon", "D"),
            Err(HostError::UnknownClass(_))
        ));
        let missing = NodePath::parse("/root/Nowhere").unwrap();
        assert!(matches!(
            host.instantiate(&missing, "Node", "N"),
            Err(HostError::NodeNotFound(_))
        ));
    }

    #[test]
    fn no_scene_means_no_nodes() {
        let dir = tempfile::tempdir().unwrap();
        let host = HeadlessHost::new(dir.path());
        assert!(matches!(host.node(&NodePath::root()), Err(HostError::NoScene)));
        assert!(host.current_scene().is_none());
    }

    #[test]
    fn set_property_checks_types() {
        let (_dir, mut host) = host_with_scene();
        let root = NodePath::root();

        let previous = host
            .set_property(&root, "rotation", NativeValue::Int(2))
            .unwrap();
        assert_eq!(previous, NativeValue::Float(0.0));
        assert_eq!(host.node(&root).unwrap().properties["rotation"], NativeValue::Float(2.0));

        let mut pos = Mapping::new();
        pos.insert("x".into(), NativeValue::Int(10));
        pos.insert("y".into(), NativeValue::Float(2.5));
        host.set_property(&root, "position", NativeValue::Map(pos)).unwrap();

        assert!(matches!(
            host.set_property(&root, "visible", NativeValue::from("yes")),
            Err(HostError::TypeMismatch { .. })
        ));
        assert!(matches!(
            host.set_property(&root, "mass", NativeValue::Int(1)),
            Err(HostError::UnknownProperty { .. })
        ));
    }

    #[test]
    fn free_node_refuses_root() {
        let (_dir, mut host) = host_with_scene();
        assert!(matches!(
            host.free_node(&NodePath::root()),
            Err(HostError::InvalidOperation(_))
        ));
        let child = host.instantiate(&NodePath::root(), "Node", "Child").unwrap();
        host.free_node(&child).unwrap();
        assert!(matches!(host.node(&child), Err(HostError::NodeNotFound(_))));
    }

    #[test]
    fn save_and_load_round_trip() {
        let (dir, mut host) = host_with_scene();
        host.instantiate(&NodePath::root(), "Camera2D", "Camera").unwrap();
        let saved = host.save_scene(None).unwrap();
        assert_eq!(saved.as_str(), "res://main.tscn");
        assert!(dir.path().join("main.tscn").is_file());
        assert!(!host.current_scene().unwrap().dirty);

        let mut other = HeadlessHost::open(dir.path()).unwrap();
        let info = other.load_scene(&saved).unwrap();
        assert_eq!(info.root_name, "main");
        assert_eq!(info.root_type, "Node2D");
        assert_eq!(info.node_count, 2);
    }

    #[test]
    fn files_are_confined_and_listed() {
        let dir = tempfile::tempdir().unwrap();
        let mut host = HeadlessHost::open(dir.path()).unwrap();
        let path = ResPath::parse("res://data/notes.txt").unwrap();
        assert_eq!(host.write_file(&path, "hello").unwrap(), 5);
        assert_eq!(host.read_file(&path).unwrap(), "hello");

        let listed = host.list_files(&ResPath::root()).unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].path.as_str(), "res://data");
        assert_eq!(listed[0].kind, FileKind::Dir);
        assert_eq!(listed[1].path.as_str(), "res://data/notes.txt");

        assert!(matches!(
            host.read_file(&ResPath::parse("missing.txt").unwrap()),
            Err(HostError::FileNotFound(_))
        ));
        assert!(matches!(
            host.write_file(&ResPath::parse("data").unwrap(), "x"),
            Err(HostError::InvalidOperation(_))
        ));
    }

    #[test]
    fn project_name_comes_from_settings() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("project.godot"),
            "[application]\nconfig/name=\"Space Game\"\n",
        )
        .unwrap();
        let host = HeadlessHost::open(dir.path()).unwrap();
        assert_eq!(host.project_name(), "Space Game");
    }

    #[test]
    fn tick_counts() {
        let dir = tempfile::tempdir().unwrap();
        let mut host = HeadlessHost::new(dir.path());
        host.tick();
        host.tick();
        assert_eq!(host.editor_state().ticks, 2);
    }
}
