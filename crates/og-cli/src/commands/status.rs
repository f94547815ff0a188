//! Status command implementation

use anyhow::Result;

use crate::client::CallbackClient;
use crate::output::{format_readiness, print_error};

/// Show per-account login phases
pub async fn status_command(client: &CallbackClient, json: bool) -> Result<()> {
    let report = match client.readiness().await {
        Ok(r) => r,
        Err(e) => {
            print_error(&format!("Failed to get readiness: {}", e));
            print_error("Is the orchestrator running? Check --url or OTPGATE_URL");
            return Err(e.into());
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", format_readiness(&report));
    }

    Ok(())
}
