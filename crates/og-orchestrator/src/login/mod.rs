//! Per-account login
//!
//! [`AccountLoginState`] is the state machine; [`LoginTask`] drives it against
//! a session client, the session store and the OTP inbox.

mod state;
mod task;

pub use state::{is_allowed, AccountLoginState};
pub use task::LoginTask;
