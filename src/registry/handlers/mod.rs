//! Command handlers, one per family. Each parses the command type and its
//! arguments into a typed request, validates it against the host, then runs
//! it through the host primitives.

pub mod editor;
pub mod file;
pub mod node;
pub mod project;
pub mod scene;
pub mod script;

use std::sync::Arc;

use serde::Serialize;

use super::{CommandFamily, CommandHandler};
use crate::error::CommandError;
use crate::value::NativeValue;

pub fn handler_for(family: CommandFamily) -> Arc<dyn CommandHandler> {
    match family {
        CommandFamily::Project => Arc::new(project::ProjectHandler),
        CommandFamily::Scene => Arc::new(scene::SceneHandler),
        CommandFamily::Node => Arc::new(node::NodeHandler),
        CommandFamily::Script => Arc::new(script::ScriptHandler),
        CommandFamily::Editor => Arc::new(editor::EditorHandler),
        CommandFamily::File => Arc::new(file::FileHandler),
    }
}

/// Encode a serializable snapshot as a result payload.
pub(crate) fn payload<T: Serialize>(value: &T) -> Result<NativeValue, CommandError> {
    serde_json::to_value(value)
        .map(NativeValue::from)
        .map_err(|e| CommandError::host_failed(format!("Could not encode result: {e}")))
}
