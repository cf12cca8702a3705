//! Validated node and resource paths.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::error::CommandError;

/// Path of the edited scene's root node.
pub const SCENE_ROOT: &str = "/root";

/// Scheme prefix of project-relative resource paths.
pub const RES_SCHEME: &str = "res://";

/// Characters a node name may not contain.
const RESERVED_NAME_CHARS: &[char] = &['.', ':', '@', '%', '"', '\\'];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("path is empty")]
    Empty,
    #[error("node path '{0}' is outside the scene root {SCENE_ROOT}")]
    OutsideSceneRoot(String),
    #[error("node path '{path}' has an invalid segment '{segment}'")]
    InvalidSegment { path: String, segment: String },
    #[error("resource path '{0}' escapes the project directory")]
    EscapesProject(String),
    #[error("resource path '{0}' uses an unsupported scheme")]
    UnsupportedScheme(String),
}

impl From<PathError> for CommandError {
    fn from(e: PathError) -> Self {
        CommandError::invalid_argument(e.to_string())
    }
}

// ── NodePath ────────────────────────────────────────────────────

/// Absolute path of a node in the edited scene, always rooted at `/root`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodePath(String);

impl NodePath {
    pub fn root() -> Self {
        Self(SCENE_ROOT.to_string())
    }

    /// Parse user input. Relative input (`Player/Sprite`) resolves under the
    /// scene root.
    pub fn parse(raw: &str) -> Result<Self, PathError> {
        let trimmed = raw.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            return Err(PathError::Empty);
        }
        let relative = if trimmed == SCENE_ROOT {
            ""
        } else if let Some(rest) = trimmed.strip_prefix("/root/") {
            rest
        } else if trimmed.starts_with('/') {
            return Err(PathError::OutsideSceneRoot(trimmed.to_string()));
        } else {
            trimmed
        };

        let mut path = Self::root();
        for segment in relative.split('/').filter(|s| !s.is_empty()) {
            if !is_valid_node_name(segment) {
                return Err(PathError::InvalidSegment {
                    path: raw.trim().to_string(),
                    segment: segment.to_string(),
                });
            }
            path = path.join(segment);
        }
        Ok(path)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0 == SCENE_ROOT
    }

    /// Segments below the scene root.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0
            .strip_prefix(SCENE_ROOT)
            .unwrap_or_default()
            .split('/')
            .filter(|s| !s.is_empty())
    }

    pub fn parent(&self) -> Option<NodePath> {
        if self.is_root() {
            return None;
        }
        self.0
            .rfind('/')
            .map(|idx| Self(self.0.get(..idx).unwrap_or(SCENE_ROOT).to_string()))
    }

    /// Last segment; `root` for the scene root itself.
    pub fn name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or_default()
    }

    pub fn join(&self, name: &str) -> NodePath {
        Self(format!("{}/{name}", self.0))
    }
}

/// Whether `name` can name a node.
pub fn is_valid_node_name(name: &str) -> bool {
    !name.is_empty()
        && name.trim() == name
        && !name.contains('/')
        && !name.contains(RESERVED_NAME_CHARS)
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for NodePath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

// ── ResPath ─────────────────────────────────────────────────────

/// Project-relative resource path (`res://...`), normalised and confined to
/// the project directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResPath(String);

impl ResPath {
    pub fn root() -> Self {
        Self(RES_SCHEME.to_string())
    }

    pub fn parse(raw: &str) -> Result<Self, PathError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(PathError::Empty);
        }
        let relative = match trimmed.strip_prefix(RES_SCHEME) {
            Some(rest) => rest,
            None if trimmed.contains("://") => {
                return Err(PathError::UnsupportedScheme(trimmed.to_string()))
            }
            None => trimmed,
        };

        let mut parts: Vec<&str> = Vec::new();
        for segment in relative.split(['/', '\\']) {
            match segment {
                "" | "." => {}
                ".." => {
                    if parts.pop().is_none() {
                        return Err(PathError::EscapesProject(trimmed.to_string()));
                    }
                }
                other => parts.push(other),
            }
        }
        Ok(Self(format!("{RES_SCHEME}{}", parts.join("/"))))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Portion after `res://`; empty for the project root.
    pub fn relative(&self) -> &str {
        self.0.strip_prefix(RES_SCHEME).unwrap_or_default()
    }

    pub fn is_root(&self) -> bool {
        self.relative().is_empty()
    }

    pub fn file_name(&self) -> &str {
        self.relative().rsplit('/').next().unwrap_or_default()
    }

    /// File name without its extension.
    pub fn stem(&self) -> &str {
        let name = self.file_name();
        match name.rfind('.') {
            Some(idx) if idx > 0 => name.get(..idx).unwrap_or(name),
            _ => name,
        }
    }

    /// Lowercased extension, if any.
    pub fn extension(&self) -> Option<String> {
        let name = self.file_name();
        name.rfind('.')
            .filter(|idx| *idx > 0)
            .and_then(|idx| name.get(idx + 1..))
            .filter(|ext| !ext.is_empty())
            .map(str::to_ascii_lowercase)
    }

    pub fn parent(&self) -> Option<ResPath> {
        if self.is_root() {
            return None;
        }
        let rel = self.relative();
        Some(match rel.rfind('/') {
            Some(idx) => Self(format!("{RES_SCHEME}{}", rel.get(..idx).unwrap_or_default())),
            None => Self::root(),
        })
    }

    pub fn join(&self, name: &str) -> ResPath {
        if self.is_root() {
            Self(format!("{RES_SCHEME}{name}"))
        } else {
            Self(format!("{}/{name}", self.0))
        }
    }

    /// Location of this resource under a project directory on disk.
    pub fn to_fs(&self, project_root: &Path) -> PathBuf {
        self.relative()
            .split('/')
            .filter(|s| !s.is_empty())
            .fold(project_root.to_path_buf(), |acc, seg| acc.join(seg))
    }
}

impl fmt::Display for ResPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for ResPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn node_paths_resolve_under_root() {
        assert_eq!(NodePath::parse("/root").unwrap(), NodePath::root());
        assert_eq!(NodePath::parse("/root/").unwrap(), NodePath::root());
        assert_eq!(NodePath::parse("Player/Sprite").unwrap().as_str(), "/root/Player/Sprite");
        assert_eq!(NodePath::parse("/root/Player").unwrap().as_str(), "/root/Player");
    }

    #[test]
    fn node_paths_reject_bad_input() {
        assert_eq!(NodePath::parse("  "), Err(PathError::Empty));
        assert!(matches!(
            NodePath::parse("/scene/Player"),
            Err(PathError::OutsideSceneRoot(_))
        ));
        assert!(matches!(
            NodePath::parse("/root/../etc"),
            Err(PathError::InvalidSegment { .. })
        ));
        assert!(matches!(
            NodePath::parse("/rootling"),
            Err(PathError::OutsideSceneRoot(_))
        ));
    }

    #[test]
    fn node_path_navigation() {
        let path = NodePath::parse("/root/Player/Sprite").unwrap();
        assert_eq!(path.name(), "Sprite");
        assert_eq!(path.parent().unwrap().as_str(), "/root/Player");
        assert_eq!(path.segments().collect::<Vec<_>>(), vec!["Player", "Sprite"]);
        assert!(NodePath::root().parent().is_none());
        assert_eq!(NodePath::root().segments().count(), 0);
    }

    #[test]
    fn res_paths_normalise() {
        assert_eq!(ResPath::parse("scenes/main.tscn").unwrap().as_str(), "res://scenes/main.tscn");
        assert_eq!(ResPath::parse("res://a/./b/../c.gd").unwrap().as_str(), "res://a/c.gd");
        assert!(ResPath::parse("res://").unwrap().is_root());
    }

    #[test]
    fn res_paths_stay_inside_project() {
        assert!(matches!(
            ResPath::parse("res://../secret"),
            Err(PathError::EscapesProject(_))
        ));
        assert!(matches!(
            ResPath::parse("user://save.dat"),
            Err(PathError::UnsupportedScheme(_))
        ));
    }

    #[test]
    fn res_path_parts() {
        let path = ResPath::parse("res://scripts/Player.GD").unwrap();
        assert_eq!(path.file_name(), "Player.GD");
        assert_eq!(path.stem(), "Player");
        assert_eq!(path.extension().as_deref(), Some("gd"));
        assert_eq!(path.parent().unwrap().as_str(), "res://scripts");
        assert_eq!(ResPath::parse("a.txt").unwrap().parent().unwrap(), ResPath::root());
        assert_eq!(
            path.to_fs(Path::new("/proj")),
            PathBuf::from("/proj/scripts/Player.GD")
        );
    }
}
