use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

use brokerbridge_market_data::{Authenticator, GatewayError};

/// Runs a configured shell command and takes the last non-empty line of its stdout
/// as the new access token.
///
/// Login flows differ per broker (TOTP, OAuth redirect, headless browser) and live
/// outside this process; the command is the seam.
pub struct CommandAuthenticator {
    broker: &'static str,
    command: Option<String>,
    timeout: Duration,
}

impl CommandAuthenticator {
    pub fn new(broker: &'static str, command: Option<String>, timeout: Duration) -> Self {
        Self {
            broker,
            command,
            timeout,
        }
    }
}

#[async_trait]
impl Authenticator for CommandAuthenticator {
    async fn fetch_access_token(&self) -> Result<String, GatewayError> {
        let command = self.command.as_deref().ok_or_else(|| {
            GatewayError::auth(
                self.broker,
                format!(
                    "No login command configured (BB_{}_LOGIN_CMD)",
                    self.broker.to_ascii_uppercase()
                ),
            )
        })?;

        debug!("Running login command for {}", self.broker);
        let child = Command::new("sh")
            .arg("-c")
            .arg(command)
            .env("BB_BROKER", self.broker)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| GatewayError::auth(self.broker, format!("Failed to spawn login: {e}")))?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| {
                GatewayError::auth(
                    self.broker,
                    format!("Login command timed out after {:?}", self.timeout),
                )
            })?
            .map_err(|e| GatewayError::auth(self.broker, format!("Login command failed: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!("Login command for {} exited with {}", self.broker, output.status);
            return Err(GatewayError::auth(
                self.broker,
                format!(
                    "Login command exited with {}: {}",
                    output.status,
                    stderr.trim()
                ),
            ));
        }

        String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::trim)
            .rfind(|line| !line.is_empty())
            .map(str::to_string)
            .ok_or_else(|| GatewayError::auth(self.broker, "Login command printed no token"))
    }
}
