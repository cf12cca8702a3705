use std::fmt;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

/// Failure categories surfaced to automation clients.
///
/// The dispatch bridge only ever manufactures `Timeout`, `HostUnavailable` and
/// `SessionClosed`. Everything else originates in the registry or a handler,
/// on the host thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    UnknownCommand,
    InvalidArgument,
    HostOperationFailed,
    Timeout,
    HostUnavailable,
    SessionClosed,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UnknownCommand => "UnknownCommand",
            Self::InvalidArgument => "InvalidArgument",
            Self::HostOperationFailed => "HostOperationFailed",
            Self::Timeout => "Timeout",
            Self::HostUnavailable => "HostUnavailable",
            Self::SessionClosed => "SessionClosed",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured failure carried inside a `CommandResult`. Serialises as
/// `{ "kind": "...", "message": "..." }` so clients can match on the kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("{kind}: {message}")]
pub struct CommandError {
    pub kind: ErrorKind,
    pub message: String,
}

impl CommandError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn unknown_command(command_type: &str) -> Self {
        Self::new(
            ErrorKind::UnknownCommand,
            format!("Unknown command: {command_type}"),
        )
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidArgument, message)
    }

    pub fn host_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::HostOperationFailed, message)
    }

    pub fn timeout(deadline: Duration) -> Self {
        Self::new(
            ErrorKind::Timeout,
            format!(
                "No result within {} ms; the command may still execute",
                deadline.as_millis()
            ),
        )
    }

    pub fn host_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::HostUnavailable, message)
    }

    pub fn session_closed(session: impl fmt::Display) -> Self {
        Self::new(
            ErrorKind::SessionClosed,
            format!("Session {session} is closed"),
        )
    }
}

impl From<std::io::Error> for CommandError {
    fn from(e: std::io::Error) -> Self {
        CommandError::host_failed(format!("I/O error: {e}"))
    }
}

impl From<crate::project::ProjectError> for CommandError {
    fn from(e: crate::project::ProjectError) -> Self {
        match e {
            crate::project::ProjectError::InvalidProject(msg) => {
                CommandError::invalid_argument(msg)
            }
            other => CommandError::host_failed(other.to_string()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_kind() {
        let err = CommandError::invalid_argument("missing required argument 'type'");
        assert_eq!(
            err.to_string(),
            "InvalidArgument: missing required argument 'type'"
        );
    }

    #[test]
    fn serializes_kind_and_message() {
        let err = CommandError::unknown_command("fly_to_moon");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["kind"], "UnknownCommand");
        assert_eq!(json["message"], "Unknown command: fly_to_moon");
    }

    #[test]
    fn io_errors_are_host_failures() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = CommandError::from(io);
        assert_eq!(err.kind, ErrorKind::HostOperationFailed);
    }
}
