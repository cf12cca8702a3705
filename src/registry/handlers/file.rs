use serde_json::json;

use crate::command::Arguments;
use crate::error::CommandError;
use crate::host::{Host, ResPath};
use crate::registry::params::{FilePathParams, WriteFileParams};
use crate::registry::validation;
use crate::registry::{CommandFamily, CommandHandler};
use crate::value::NativeValue;

enum FileRequest {
    Read { path: ResPath },
    Write { path: ResPath, content: String },
}

impl FileRequest {
    fn parse(command_type: &str, args: &Arguments, host: &dyn Host) -> Result<Self, CommandError> {
        match command_type {
            "read_file" => {
                let p: FilePathParams = args.parse()?;
                let path = validation::res_file_path(&p.path, "path")?;
                validation::existing_file(host, &path)?;
                Ok(Self::Read { path })
            }
            "write_file" => {
                let p: WriteFileParams = args.parse()?;
                let path = validation::res_file_path(&p.path, "path")?;
                Ok(Self::Write {
                    path,
                    content: p.content,
                })
            }
            other => Err(CommandError::unknown_command(other)),
        }
    }
}

/// Plain file access, confined to the project directory by [`ResPath`].
pub struct FileHandler;

impl CommandHandler for FileHandler {
    fn family(&self) -> CommandFamily {
        CommandFamily::File
    }

    fn validate(
        &self,
        command_type: &str,
        args: &Arguments,
        host: &dyn Host,
    ) -> Result<(), CommandError> {
        FileRequest::parse(command_type, args, host).map(drop)
    }

    fn execute(
        &self,
        command_type: &str,
        args: &Arguments,
        host: &mut dyn Host,
    ) -> Result<NativeValue, CommandError> {
        match FileRequest::parse(command_type, args, &*host)? {
            FileRequest::Read { path } => {
                let content = host.read_file(&path)?;
                Ok(json!({
                    "path": path,
                    "size": content.len(),
                    "content": content,
                })
                .into())
            }
            FileRequest::Write { path, content } => {
                let size = host.write_file(&path, &content)?;
                Ok(json!({ "path": path, "size": size }).into())
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use std::fs;

    use super::*;
    use crate::error::ErrorKind;
    use crate::registry::handlers::test_support::{args, err_kind, ok_map, project, run};

    #[test]
    fn write_creates_parents_then_read_returns_content() {
        let (dir, mut host) = project();
        let written = ok_map(run(
            &FileHandler,
            "write_file",
            &args(&[("path", "res://data/levels.json".into()), ("content", "[1,2]".into())]),
            &mut host,
        ));
        assert_eq!(written["size"], NativeValue::Int(5));
        assert!(dir.path().join("data/levels.json").is_file());

        let read = ok_map(run(
            &FileHandler,
            "read_file",
            &args(&[("path", "data/levels.json".into())]),
            &mut host,
        ));
        assert_eq!(read["content"], NativeValue::from("[1,2]"));
        assert_eq!(read["path"], NativeValue::from("res://data/levels.json"));
    }

    #[test]
    fn read_missing_file_is_invalid() {
        let (_dir, mut host) = project();
        let result = run(
            &FileHandler,
            "read_file",
            &args(&[("path", "nope.txt".into())]),
            &mut host,
        );
        assert_eq!(err_kind(result), ErrorKind::InvalidArgument);
    }

    #[test]
    fn paths_cannot_escape_the_project() {
        let (dir, mut host) = project();
        let result = run(
            &FileHandler,
            "write_file",
            &args(&[("path", "res://../outside.txt".into()), ("content", "x".into())]),
            &mut host,
        );
        assert_eq!(err_kind(result), ErrorKind::InvalidArgument);
        assert!(!dir.path().parent().unwrap().join("outside.txt").exists());
    }

    #[test]
    fn writing_over_a_directory_fails_on_host() {
        let (dir, mut host) = project();
        fs::create_dir_all(dir.path().join("assets")).unwrap();
        let result = run(
            &FileHandler,
            "write_file",
            &args(&[("path", "assets".into()), ("content", "x".into())]),
            &mut host,
        );
        assert_eq!(err_kind(result), ErrorKind::HostOperationFailed);
    }
}
