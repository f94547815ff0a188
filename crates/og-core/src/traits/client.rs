//! Session client trait

use async_trait::async_trait;

use crate::error::ClientError;

/// Connect/authorize/sign-in capability of the messaging platform.
///
/// Implementations own the session content. The orchestrator only asks
/// yes/no questions and reacts to the distinguishable error kinds in
/// [`ClientError`]. An implementation reads the account's local session cache
/// on [`connect`](SessionClient::connect) and writes it after a successful
/// [`sign_in`](SessionClient::sign_in).
#[async_trait]
pub trait SessionClient: Send {
    /// Open the connection to the service
    async fn connect(&mut self) -> Result<(), ClientError>;

    /// Whether the currently loaded session is authorized
    async fn is_authorized(&mut self) -> Result<bool, ClientError>;

    /// Ask the service to send a login code to `phone`
    async fn request_code(&mut self, phone: &str) -> Result<(), ClientError>;

    /// Complete the login with the delivered code
    async fn sign_in(&mut self, phone: &str, code: &str) -> Result<(), ClientError>;
}
