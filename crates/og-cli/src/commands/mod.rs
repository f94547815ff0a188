//! CLI command implementations

mod config;
mod status;
mod submit;
mod wait;

pub use config::{config_check, config_init, config_show, resolve_config_path};
pub use status::status_command;
pub use submit::submit_command;
pub use wait::{wait_command, WaitOutcome};
