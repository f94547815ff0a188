//! og-core: Core abstractions and configuration for otpgate
//!
//! This crate provides the shared types, error taxonomy, collaborator traits
//! and configuration structures used by the orchestrator daemon and the CLI.

pub mod api;
pub mod config;
pub mod error;
pub mod time;
pub mod traits;
pub mod types;

pub use error::{LoginError, OgError};
pub use types::{AccountId, LoginPhase, OtpEntry, SessionBlob};
