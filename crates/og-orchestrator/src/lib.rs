//! og-orchestrator: multi-account OTP login orchestrator
//!
//! Drives one login task per configured account: restore a cached session,
//! validate it, and otherwise request a code, wait for the OTP callback to
//! deliver it, sign in and persist the new session to the remote store.
//! Also hosts the callback HTTP server that feeds the OTP inbox and exposes
//! readiness to dependent services.

pub mod bridge;
pub mod cache;
pub mod inbox;
pub mod login;
pub mod orchestrator;
pub mod readiness;
pub mod server;
pub mod store;

pub use inbox::OtpInbox;
pub use orchestrator::{AuthOrchestrator, LoginSummary, RunningOrchestrator};
pub use readiness::{ReadinessBoard, ReadinessError};
