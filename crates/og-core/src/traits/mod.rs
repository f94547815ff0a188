//! Core trait definitions

mod client;
mod store;

pub use client::SessionClient;
pub use store::SessionStore;
