pub mod api;
pub mod bridge;
pub mod command;
pub mod error;
pub mod host;
pub mod paths;
pub mod project;
pub mod registry;
pub mod runtime;
pub mod session;
pub mod settings;
pub mod state;
pub mod tools;
pub mod value;
