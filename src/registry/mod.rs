//! Handler registry: command families, the handler trait, and dispatch.

pub mod catalog;
pub mod handlers;
pub mod params;
pub mod validation;

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::command::{Arguments, Command, CommandResult};
use crate::error::CommandError;
use crate::host::Host;
use crate::value::NativeValue;

pub use catalog::{Catalog, ToolDescriptor};

// ── Command families ────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommandFamily {
    Project,
    Scene,
    Node,
    Script,
    Editor,
    File,
}

impl CommandFamily {
    pub fn slug(&self) -> &'static str {
        match self {
            Self::Project => "project",
            Self::Scene => "scene",
            Self::Node => "node",
            Self::Script => "script",
            Self::Editor => "editor",
            Self::File => "file",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Project => "Project metadata, settings and file listings",
            Self::Scene => "Open, create, save and inspect scenes",
            Self::Node => "Create, delete and edit nodes in the current scene",
            Self::Script => "Create, edit and read GDScript files",
            Self::Editor => "Editor state",
            Self::File => "Read and write project files",
        }
    }

    pub fn all() -> &'static [CommandFamily] {
        &[
            Self::Project,
            Self::Scene,
            Self::Node,
            Self::Script,
            Self::Editor,
            Self::File,
        ]
    }
}

// ── Handler capability ──────────────────────────────────────────

/// One handler per family. Both methods run on the host mutation thread;
/// `execute` is only reached after `validate` succeeded for the same input.
pub trait CommandHandler: Send + Sync {
    fn family(&self) -> CommandFamily;

    fn validate(
        &self,
        command_type: &str,
        args: &Arguments,
        host: &dyn Host,
    ) -> Result<(), CommandError>;

    fn execute(
        &self,
        command_type: &str,
        args: &Arguments,
        host: &mut dyn Host,
    ) -> Result<NativeValue, CommandError>;
}

// ── Registry ────────────────────────────────────────────────────

/// Command type → handler bindings. Populated once at startup and read-only
/// afterwards.
pub struct HandlerRegistry {
    catalog: Arc<Catalog>,
    bindings: HashMap<String, Arc<dyn CommandHandler>>,
}

impl HandlerRegistry {
    /// Bind every catalog entry to the handler of its family.
    pub fn new(catalog: Arc<Catalog>) -> Self {
        let family_handlers: HashMap<CommandFamily, Arc<dyn CommandHandler>> = CommandFamily::all()
            .iter()
            .map(|family| (*family, handlers::handler_for(*family)))
            .collect();
        let bindings = catalog
            .list()
            .filter_map(|tool| {
                family_handlers
                    .get(&tool.family)
                    .map(|handler| (tool.name.to_string(), Arc::clone(handler)))
            })
            .collect();
        Self { catalog, bindings }
    }

    /// Replace (or add) the handler behind one command type.
    pub fn bind(&mut self, command_type: impl Into<String>, handler: Arc<dyn CommandHandler>) {
        self.bindings.insert(command_type.into(), handler);
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn is_bound(&self, command_type: &str) -> bool {
        self.bindings.contains_key(command_type)
    }

    /// Run one command to completion. Never panics on bad input; every
    /// failure is folded into the returned result.
    pub fn dispatch(&self, command: Command, host: &mut dyn Host) -> CommandResult {
        let Command {
            command_type,
            correlation_id,
            arguments,
            ..
        } = command;
        let outcome = self.run(&command_type, &arguments, host);
        if let Err(e) = &outcome {
            debug!(command = %command_type, correlation = %correlation_id, error = %e, "command failed");
        }
        CommandResult {
            correlation_id,
            outcome,
        }
    }

    fn run(
        &self,
        command_type: &str,
        args: &Arguments,
        host: &mut dyn Host,
    ) -> Result<NativeValue, CommandError> {
        let handler = self
            .bindings
            .get(command_type)
            .ok_or_else(|| CommandError::unknown_command(command_type))?;
        validation::require_fields(args, &self.catalog.required_fields(command_type))?;
        handler.validate(command_type, args, &*host)?;
        handler.execute(command_type, args, host)
    }
}
