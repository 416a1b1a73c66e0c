use std::{net::Ipv4Addr, process::Stdio, time::Duration};

use common::error::{AppError, Res};
use thiserror::Error;
use tokio::{process::Command, time::timeout};

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("failed to spawn `{0}`: {1}")]
    Spawn(String, std::io::Error),

    #[error("`{0}` timed out after {1:?}")]
    Timeout(String, Duration),

    #[error("`{0}` exited with {1}: {2}")]
    CommandFailed(String, std::process::ExitStatus, String),
}

/// Thin wrapper around the `wg` control utility.
///
/// Invocations are argument lists only, never shell strings, and every
/// parameter placed on the command line is validated by the caller or here.
/// A hung gateway command is cut off by the configured timeout so it cannot
/// pin request-handling workers.
pub struct WgCli {
    program: String,
    interface: String,
    timeout: Duration,
}

/// Kernel interface names are at most 15 bytes; restricting them to
/// alphanumerics and hyphens keeps the value inert on a command line.
pub fn is_valid_interface_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 15
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}

impl WgCli {
    pub fn new(program: &str, interface: &str, timeout: Duration) -> Res<Self> {
        if !is_valid_interface_name(interface) {
            return Err(AppError::Internal(format!(
                "Invalid WireGuard interface name: {:?}",
                interface
            )));
        }
        Ok(WgCli {
            program: program.to_string(),
            interface: interface.to_string(),
            timeout,
        })
    }

    /// Removes the peer entry for a public key. Removing a peer the gateway
    /// does not know exits cleanly, which is exactly the tolerance the
    /// remove-then-add sequence relies on.
    pub async fn remove_peer(&self, public_key: &str) -> Result<(), GatewayError> {
        self.run(&["set", &self.interface, "peer", public_key, "remove"])
            .await
    }

    /// Adds (or replaces) the peer entry for a public key with a
    /// single-address allow list.
    pub async fn add_peer(
        &self,
        public_key: &str,
        client_ip: Ipv4Addr,
    ) -> Result<(), GatewayError> {
        let allowed_ips = format!("{}/32", client_ip);
        self.run(&[
            "set",
            &self.interface,
            "peer",
            public_key,
            "allowed-ips",
            &allowed_ips,
        ])
        .await
    }

    async fn run(&self, args: &[&str]) -> Result<(), GatewayError> {
        let label = format!("{} {}", self.program, args.join(" "));

        let invocation = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let output = match timeout(self.timeout, invocation).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => return Err(GatewayError::Spawn(label, e)),
            Err(_) => return Err(GatewayError::Timeout(label, self.timeout)),
        };

        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            Err(GatewayError::CommandFailed(label, output.status, stderr))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interface_names_are_restricted() {
        assert!(is_valid_interface_name("wg0"));
        assert!(is_valid_interface_name("cloaknet-wg"));
        assert!(!is_valid_interface_name(""));
        assert!(!is_valid_interface_name("wg0; rm -rf /"));
        assert!(!is_valid_interface_name("wg 0"));
        assert!(!is_valid_interface_name("interface-name-too-long"));
    }

    #[test]
    fn constructor_rejects_bad_interface() {
        assert!(WgCli::new("wg", "wg0", Duration::from_secs(5)).is_ok());
        assert!(WgCli::new("wg", "$(reboot)", Duration::from_secs(5)).is_err());
    }
}
