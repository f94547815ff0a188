//! og-cli: Command-line interface for otpgate
//!
//! Provides the `otpgate` CLI for delivering login codes to a running
//! orchestrator and inspecting account readiness.

pub mod client;
pub mod commands;
pub mod output;
