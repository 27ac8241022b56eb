use std::time::Duration;

use thiserror::Error;

use crate::Endpoint;

const LIBSSH2_ERROR_SOCKET_DISCONNECT: i32 = -13;
const LIBSSH2_ERROR_CHANNEL_CLOSED: i32 = -26;

#[derive(Debug, Error)]
pub enum SshSessionError {
    #[error("SSH session is not active")]
    SshSessionIsNotActive,
    #[error("I/O error: {0}")]
    StdIoStreamError(#[from] std::io::Error),
    #[error("SSH error: {0}")]
    SshError(#[from] async_ssh2_lite::Error),
    #[error("Authentication failed for user '{0}'")]
    SshAuthenticationError(String),
    #[error("Host key rejected: {0}")]
    HostKeyRejected(String),
    #[error("Timeout")]
    Timeout,
}

impl SshSessionError {
    /// True when the relay side simply went away (the listener or the whole
    /// session reached end of stream) rather than failing.
    pub fn is_end_of_stream(&self) -> bool {
        match self {
            SshSessionError::StdIoStreamError(err) => is_end_of_stream_io(err),
            SshSessionError::SshError(async_ssh2_lite::Error::Io(err)) => is_end_of_stream_io(err),
            SshSessionError::SshError(async_ssh2_lite::Error::Ssh2(err)) => {
                is_end_of_stream_ssh2(err)
            }
            _ => false,
        }
    }
}

fn is_end_of_stream_io(err: &std::io::Error) -> bool {
    err.kind() == std::io::ErrorKind::UnexpectedEof
}

fn is_end_of_stream_ssh2(err: &ssh2::Error) -> bool {
    match err.code() {
        ssh2::ErrorCode::Session(code) => {
            code == LIBSSH2_ERROR_SOCKET_DISCONNECT || code == LIBSSH2_ERROR_CHANNEL_CLOSED
        }
        _ => false,
    }
}

/// Failures that stop the tunnel.
#[derive(Debug, Error)]
pub enum TunnelError {
    #[error("Server dial error {server}: {source}")]
    Dial {
        server: Endpoint,
        #[source]
        source: SshSessionError,
    },
    #[error("Listen on the remote server {remote} failed: {source}")]
    Listen {
        remote: Endpoint,
        #[source]
        source: SshSessionError,
    },
    #[error("Receive error from connection: {0}")]
    Accept(#[source] SshSessionError),
}

/// Failures scoped to a single forwarded connection.
#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("Error to connect to local endpoint {local}: {source}")]
    LocalDial {
        local: Endpoint,
        #[source]
        source: std::io::Error,
    },
    #[error("Timeout connecting to local endpoint {local} after {timeout:?}")]
    LocalDialTimeout { local: Endpoint, timeout: Duration },
    #[error("Copy error: {0}")]
    Copy(#[from] std::io::Error),
}
