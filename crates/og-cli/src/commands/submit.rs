//! Submit command implementation

use anyhow::Result;

use crate::client::{CallbackClient, CallbackError};
use crate::output::{print_error, print_success};

/// Deliver a login code to the running orchestrator
pub async fn submit_command(
    client: &CallbackClient,
    account: Option<&str>,
    code: &str,
) -> Result<()> {
    let code = code.trim();
    if code.is_empty() {
        print_error("OTP is required");
        anyhow::bail!("empty code");
    }

    match client.submit(account, code).await {
        Ok(response) => {
            print_success(&format!(
                "{} for account '{}'",
                response.message, response.account_id
            ));
            Ok(())
        }
        Err(e) => {
            print_error(&format!("Failed to submit code: {}", e));
            if matches!(e, CallbackError::Unreachable { .. }) {
                print_error("Is the orchestrator running? Check --url or OTPGATE_URL");
            }
            Err(e.into())
        }
    }
}
