//! Port forwarding over an `ssh` child process for directory endpoints
//! that are only reachable through a jump host. Authentication is key
//! based; the process must be able to log in without a prompt.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use log::{debug, warn};
use tokio::net::{TcpListener, TcpStream};
use tokio::process::{Child, Command};
use tokio::time::sleep;

use crate::directory::DirectoryError;

const READY_PROBE_INTERVAL: Duration = Duration::from_millis(200);

/// How to reach the jump host.
#[derive(Debug, Clone)]
pub struct TunnelSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub key_file: Option<PathBuf>,
}

/// A live `ssh -L` forward. The child process is killed on drop, taking
/// the forward down with it.
pub struct SshTunnel {
    child: Child,
    local_port: u16,
}

impl SshTunnel {
    /// Forward an ephemeral local port to `remote_host:remote_port` through
    /// the jump host, waiting until the forward accepts connections.
    pub async fn open(
        settings: &TunnelSettings,
        remote_host: &str,
        remote_port: u16,
        timeout: Duration,
    ) -> Result<Self, DirectoryError> {
        let local_port = ephemeral_port().await?;
        let mut command = Command::new("ssh");
        command
            .arg("-N")
            .arg("-o")
            .arg("BatchMode=yes")
            .arg("-o")
            .arg("ExitOnForwardFailure=yes")
            .arg("-L")
            .arg(format!("127.0.0.1:{local_port}:{remote_host}:{remote_port}"))
            .arg("-p")
            .arg(settings.port.to_string())
            .arg(format!("{}@{}", settings.user, settings.host));
        if let Some(key_file) = &settings.key_file {
            command.arg("-i").arg(key_file);
        }
        debug!(
            "forwarding 127.0.0.1:{local_port} to {remote_host}:{remote_port} via {}",
            settings.host
        );
        let child = command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|err| DirectoryError::Tunnel(format!("spawning ssh failed: {err}")))?;

        let mut tunnel = Self { child, local_port };
        tunnel.wait_ready(timeout).await?;
        Ok(tunnel)
    }

    /// Local endpoint of the forward.
    pub fn local_port(&self) -> u16 {
        self.local_port
    }

    async fn wait_ready(&mut self, timeout: Duration) -> Result<(), DirectoryError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if let Some(status) = self
                .child
                .try_wait()
                .map_err(|err| DirectoryError::Tunnel(err.to_string()))?
            {
                return Err(DirectoryError::Tunnel(format!(
                    "ssh exited during setup: {status}"
                )));
            }
            if TcpStream::connect(("127.0.0.1", self.local_port)).await.is_ok() {
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(DirectoryError::Tunnel(
                    "forward did not come up in time".to_string(),
                ));
            }
            sleep(READY_PROBE_INTERVAL).await;
        }
    }
}

impl Drop for SshTunnel {
    fn drop(&mut self) {
        if let Err(err) = self.child.start_kill() {
            warn!("stopping ssh tunnel failed: {err}");
        }
    }
}

/// Pick a currently free local port. The listener is dropped before ssh
/// binds the port, so a race is possible but harmless: setup fails and
/// the run aborts with a tunnel error.
async fn ephemeral_port() -> Result<u16, DirectoryError> {
    let listener = TcpListener::bind(("127.0.0.1", 0))
        .await
        .map_err(|err| DirectoryError::Tunnel(err.to_string()))?;
    let port = listener
        .local_addr()
        .map_err(|err| DirectoryError::Tunnel(err.to_string()))?
        .port();
    Ok(port)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ephemeral_ports_are_nonzero() {
        let port = ephemeral_port().await.unwrap();
        assert_ne!(0, port);
    }
}
