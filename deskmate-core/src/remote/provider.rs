//! Provider subprocesses.
//!
//! A provider is any executable named `deskmate-provider-<name>` on the PATH
//! that speaks the JSON protocol in [`super::protocol`]. Providers own their
//! credentials; deskmate only passes calendar parameters.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::io::AsyncWriteExt;
use tokio::process::Command as TokioCommand;
use tokio::time::timeout;
use tracing::debug;

use crate::error::{DeskmateError, DeskmateResult};
use crate::remote::protocol::{Command, ProviderCommand, Request, Response};

const PROVIDER_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Provider(String);

impl Provider {
    pub fn from_name(name: &str) -> Self {
        Provider(name.to_string())
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    pub fn binary_name(&self) -> String {
        format!("deskmate-provider-{}", self.0)
    }

    fn binary_path(&self) -> DeskmateResult<PathBuf> {
        which::which(self.binary_name())
            .map_err(|_| DeskmateError::ProviderNotInstalled(self.binary_name()))
    }

    /// Whether the provider binary can be found.
    pub fn is_installed(&self) -> bool {
        self.binary_path().is_ok()
    }

    /// Send a typed command and decode its typed response.
    pub async fn call<C: ProviderCommand>(&self, cmd: C) -> DeskmateResult<C::Response> {
        timeout(PROVIDER_TIMEOUT, self.call_raw(C::command(), cmd))
            .await
            .map_err(|_| DeskmateError::ProviderTimeout(PROVIDER_TIMEOUT.as_secs()))?
    }

    async fn call_raw<P: Serialize, R: DeserializeOwned>(
        &self,
        command: Command,
        params: P,
    ) -> DeskmateResult<R> {
        let params =
            serde_json::to_value(params).map_err(|e| DeskmateError::Serialization(e.to_string()))?;
        let request_json = serde_json::to_string(&Request { command, params })
            .map_err(|e| DeskmateError::Serialization(e.to_string()))?;

        let binary_path = self.binary_path()?;
        debug!("Calling {} with {:?}", binary_path.display(), command);

        let mut child = TokioCommand::new(&binary_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                DeskmateError::Provider(format!("Failed to spawn {}: {}", binary_path.display(), e))
            })?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| DeskmateError::Provider("Provider stdin unavailable".into()))?;
        stdin
            .write_all(format!("{request_json}\n").as_bytes())
            .await?;
        drop(stdin);

        let output = child.wait_with_output().await?;

        if !output.status.success() {
            return Err(DeskmateError::Provider(format!(
                "Provider exited with status: {}",
                output.status.code().unwrap_or(-1)
            )));
        }

        let response_str = String::from_utf8_lossy(&output.stdout);
        if response_str.trim().is_empty() {
            return Err(DeskmateError::Provider("Provider returned no response".into()));
        }

        let response: Response<R> = serde_json::from_str(response_str.trim())
            .map_err(|e| DeskmateError::Provider(format!("Failed to parse response: {}", e)))?;

        match response {
            Response::Success { data } => Ok(data),
            Response::Error { error } => Err(DeskmateError::Provider(error)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::protocol::DeleteEvent;

    #[test]
    fn test_binary_name() {
        assert_eq!(Provider::from_name("google").binary_name(), "deskmate-provider-google");
    }

    #[tokio::test]
    async fn test_missing_provider_is_reported() {
        let provider = Provider::from_name("definitely-not-installed-anywhere");
        assert!(!provider.is_installed());

        let err = provider
            .call(DeleteEvent {
                calendar_id: "primary".into(),
                event_id: "x".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DeskmateError::ProviderNotInstalled(_)));
    }
}
