use std::time::Duration;

use crate::{Endpoint, SshCredentials};

pub const DEFAULT_LOCAL_PORT: u16 = 3141;
pub const DEFAULT_SSH_PORT: u16 = 22;
pub const DEFAULT_LOCAL_DIAL_TIMEOUT: Duration = Duration::from_secs(60);

/// Everything a tunnel needs to run. Built once at startup.
#[derive(Debug, Clone)]
pub struct TunnelSettings {
    /// Forward target, always on loopback.
    pub local: Endpoint,
    /// Relay SSH server.
    pub server: Endpoint,
    /// Listener requested on the relay.
    pub remote: Endpoint,
    pub credentials: SshCredentials,
    pub local_dial_timeout: Duration,
}

impl TunnelSettings {
    /// The relay host is used both for the SSH dial and as the listen host.
    pub fn new(
        local_port: u16,
        remote_host: impl Into<String>,
        remote_port: u16,
        credentials: SshCredentials,
    ) -> Self {
        let remote_host: String = remote_host.into();

        Self {
            local: Endpoint::loopback(local_port),
            server: Endpoint::new(remote_host.as_str(), DEFAULT_SSH_PORT),
            remote: Endpoint::new(remote_host, remote_port),
            credentials,
            local_dial_timeout: DEFAULT_LOCAL_DIAL_TIMEOUT,
        }
    }

    pub fn with_ssh_port(mut self, ssh_port: u16) -> Self {
        self.server = Endpoint::new(self.server.host(), ssh_port);
        self
    }

    pub fn with_local_dial_timeout(mut self, timeout: Duration) -> Self {
        self.local_dial_timeout = timeout;
        self
    }
}
