//! Built-in class database for the headless host.
//!
//! Each class lists only the properties it introduces; instances receive the
//! defaults of the whole inheritance chain.

use indexmap::IndexMap;

use crate::value::{Mapping, NativeValue};

#[derive(Debug, Clone, Copy)]
pub enum PropertyDefault {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(&'static str),
    Vector2(f64, f64),
    Vector3(f64, f64, f64),
    Color(f64, f64, f64, f64),
}

impl PropertyDefault {
    pub fn to_native(self) -> NativeValue {
        match self {
            Self::Bool(b) => NativeValue::Bool(b),
            Self::Int(i) => NativeValue::Int(i),
            Self::Float(f) => NativeValue::Float(f),
            Self::Str(s) => NativeValue::from(s),
            Self::Vector2(x, y) => components(&[("x", x), ("y", y)]),
            Self::Vector3(x, y, z) => components(&[("x", x), ("y", y), ("z", z)]),
            Self::Color(r, g, b, a) => components(&[("r", r), ("g", g), ("b", b), ("a", a)]),
        }
    }
}

fn components(fields: &[(&str, f64)]) -> NativeValue {
    NativeValue::Map(
        fields
            .iter()
            .map(|(k, v)| ((*k).to_string(), NativeValue::Float(*v)))
            .collect(),
    )
}

#[derive(Debug)]
pub struct ClassDef {
    pub name: &'static str,
    pub parent: Option<&'static str>,
    pub properties: &'static [(&'static str, PropertyDefault)],
}

use PropertyDefault::{Bool, Color, Float, Int, Str, Vector2, Vector3};

static CLASSES: &[ClassDef] = &[
    ClassDef {
        name: "Node",
        parent: None,
        properties: &[("process_mode", Int(0)), ("editor_description", Str(""))],
    },
    ClassDef {
        name: "CanvasItem",
        parent: Some("Node"),
        properties: &[
            ("visible", Bool(true)),
            ("modulate", Color(1.0, 1.0, 1.0, 1.0)),
            ("z_index", Int(0)),
        ],
    },
    ClassDef {
        name: "Node2D",
        parent: Some("CanvasItem"),
        properties: &[
            ("position", Vector2(0.0, 0.0)),
            ("rotation", Float(0.0)),
            ("scale", Vector2(1.0, 1.0)),
        ],
    },
    ClassDef {
        name: "Node3D",
        parent: Some("Node"),
        properties: &[
            ("position", Vector3(0.0, 0.0, 0.0)),
            ("rotation", Vector3(0.0, 0.0, 0.0)),
            ("scale", Vector3(1.0, 1.0, 1.0)),
            ("visible", Bool(true)),
        ],
    },
    ClassDef {
        name: "Sprite2D",
        parent: Some("Node2D"),
        properties: &[
            ("texture", Str("")),
            ("centered", Bool(true)),
            ("flip_h", Bool(false)),
            ("flip_v", Bool(false)),
        ],
    },
    ClassDef {
        name: "Camera2D",
        parent: Some("Node2D"),
        properties: &[("zoom", Vector2(1.0, 1.0)), ("enabled", Bool(true))],
    },
    ClassDef {
        name: "CharacterBody2D",
        parent: Some("Node2D"),
        properties: &[("velocity", Vector2(0.0, 0.0)), ("floor_max_angle", Float(0.785_398))],
    },
    ClassDef {
        name: "Area2D",
        parent: Some("Node2D"),
        properties: &[("monitoring", Bool(true)), ("monitorable", Bool(true))],
    },
    ClassDef {
        name: "CollisionShape2D",
        parent: Some("Node2D"),
        properties: &[("shape", Str("")), ("disabled", Bool(false))],
    },
    ClassDef {
        name: "Control",
        parent: Some("CanvasItem"),
        properties: &[
            ("position", Vector2(0.0, 0.0)),
            ("size", Vector2(0.0, 0.0)),
            ("tooltip_text", Str("")),
        ],
    },
    ClassDef {
        name: "Label",
        parent: Some("Control"),
        properties: &[("text", Str("")), ("autowrap_mode", Int(0))],
    },
    ClassDef {
        name: "Button",
        parent: Some("Control"),
        properties: &[("text", Str("")), ("disabled", Bool(false)), ("flat", Bool(false))],
    },
    ClassDef {
        name: "Timer",
        parent: Some("Node"),
        properties: &[
            ("wait_time", Float(1.0)),
            ("one_shot", Bool(false)),
            ("autostart", Bool(false)),
        ],
    },
    ClassDef {
        name: "AudioStreamPlayer",
        parent: Some("Node"),
        properties: &[
            ("stream", Str("")),
            ("volume_db", Float(0.0)),
            ("autoplay", Bool(false)),
        ],
    },
];

pub fn lookup(name: &str) -> Option<&'static ClassDef> {
    CLASSES.iter().find(|c| c.name == name)
}

pub fn class_exists(name: &str) -> bool {
    lookup(name).is_some()
}

pub fn class_names() -> impl Iterator<Item = &'static str> {
    CLASSES.iter().map(|c| c.name)
}

/// Inheritance chain from `name` up to `Node`. Empty for unknown classes.
pub fn ancestry(name: &str) -> Vec<&'static ClassDef> {
    let mut chain = Vec::new();
    let mut current = lookup(name);
    while let Some(class) = current {
        chain.push(class);
        current = class.parent.and_then(lookup);
    }
    chain
}

pub fn is_a(class: &str, base: &str) -> bool {
    ancestry(class).iter().any(|c| c.name == base)
}

/// Defaults for every property an instance of `name` carries, base class
/// properties first.
pub fn default_properties(name: &str) -> Mapping {
    let mut props: Mapping = IndexMap::new();
    for class in ancestry(name).iter().rev() {
        for (key, default) in class.properties {
            props.insert((*key).to_string(), default.to_native());
        }
    }
    props
}
