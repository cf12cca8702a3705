use serde_json::json;

use crate::command::Arguments;
use crate::error::CommandError;
use crate::host::Host;
use crate::registry::{CommandFamily, CommandHandler};
use crate::value::NativeValue;

pub struct EditorHandler;

impl CommandHandler for EditorHandler {
    fn family(&self) -> CommandFamily {
        CommandFamily::Editor
    }

    fn validate(
        &self,
        command_type: &str,
        _args: &Arguments,
        _host: &dyn Host,
    ) -> Result<(), CommandError> {
        match command_type {
            "get_editor_state" => Ok(()),
            other => Err(CommandError::unknown_command(other)),
        }
    }

    fn execute(
        &self,
        command_type: &str,
        args: &Arguments,
        host: &mut dyn Host,
    ) -> Result<NativeValue, CommandError> {
        self.validate(command_type, args, &*host)?;
        let state = host.editor_state();
        let scene = state.current_scene.as_ref();
        Ok(json!({
            "project_name": state.project_name,
            "current_scene": scene.and_then(|s| s.path.as_ref()),
            "scene_open": scene.is_some(),
            "dirty": scene.is_some_and(|s| s.dirty),
            "ticks": state.ticks,
        })
        .into())
    }
}
