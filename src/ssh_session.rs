use std::{net::SocketAddr, time::Duration};

use async_ssh2_lite::{AsyncListener, AsyncSession, SessionConfiguration, TokioTcpStream};
use futures::Future;
use tracing::{debug, info};

use crate::{
    AcceptedStream, Endpoint, RelayListener, RelaySession, RelayTransport, SshAsyncSession,
    SshChannelStream, SshCredentials, SshSessionError,
};

pub const DEFAULT_SSH_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Relay transport backed by libssh2.
pub struct SshRelayTransport {
    connect_timeout: Duration,
}

impl SshRelayTransport {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

impl Default for SshRelayTransport {
    fn default() -> Self {
        Self::new(DEFAULT_SSH_CONNECT_TIMEOUT)
    }
}

#[async_trait::async_trait]
impl RelayTransport for SshRelayTransport {
    type Session = SshRelaySession;

    async fn dial(
        &self,
        server: &Endpoint,
        credentials: &SshCredentials,
    ) -> Result<SshRelaySession, SshSessionError> {
        let session = execute_with_timeout(
            init_ssh_session(server, credentials),
            self.connect_timeout,
        )
        .await?;

        Ok(SshRelaySession { ssh_session: session })
    }
}

async fn init_ssh_session(
    server: &Endpoint,
    credentials: &SshCredentials,
) -> Result<SshAsyncSession, SshSessionError> {
    let addr = resolve(server).await?;

    let mut session_configuration = SessionConfiguration::new();
    session_configuration.set_compress(true);

    let mut session =
        AsyncSession::<TokioTcpStream>::connect(addr, Some(session_configuration)).await?;

    session.handshake().await?;
    debug!("SSH handshake with {} completed", server);

    credentials
        .get_host_key_policy()
        .verify(session.host_key_hash(ssh2::HashType::Sha256))?;

    session
        .userauth_password(credentials.get_user_name(), credentials.get_password())
        .await?;

    if !session.authenticated() {
        return Err(SshSessionError::SshAuthenticationError(
            credentials.get_user_name().to_string(),
        ));
    }

    Ok(session)
}

async fn resolve(server: &Endpoint) -> Result<SocketAddr, SshSessionError> {
    let mut addresses = tokio::net::lookup_host((server.host(), server.port())).await?;

    match addresses.next() {
        Some(addr) => Ok(addr),
        None => Err(SshSessionError::StdIoStreamError(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("Can not resolve {}", server),
        ))),
    }
}

async fn execute_with_timeout<TResult>(
    future: impl Future<Output = Result<TResult, SshSessionError>>,
    timeout: Duration,
) -> Result<TResult, SshSessionError> {
    match tokio::time::timeout(timeout, future).await {
        Ok(result) => result,
        Err(_) => Err(SshSessionError::Timeout),
    }
}

pub struct SshRelaySession {
    ssh_session: SshAsyncSession,
}

#[async_trait::async_trait]
impl RelaySession for SshRelaySession {
    type Listener = SshRelayListener;

    async fn listen(&self, remote: &Endpoint) -> Result<SshRelayListener, SshSessionError> {
        let (listener, bound_port) = self
            .ssh_session
            .channel_forward_listen(remote.port(), Some(remote.host()), None)
            .await?;

        info!(
            "Relay is listening on {}:{} (requested {})",
            remote.host(),
            bound_port,
            remote
        );

        Ok(SshRelayListener {
            listener: Some(listener),
            listen_endpoint: Endpoint::new(remote.host(), bound_port),
        })
    }

    async fn disconnect(&self, reason: &str) {
        let _ = self.ssh_session.disconnect(None, reason, None).await;
    }
}

pub struct SshRelayListener {
    listener: Option<AsyncListener<TokioTcpStream>>,
    listen_endpoint: Endpoint,
}

#[async_trait::async_trait]
impl RelayListener for SshRelayListener {
    type Stream = SshChannelStream;

    async fn accept(&mut self) -> Result<AcceptedStream<SshChannelStream>, SshSessionError> {
        let listener = match self.listener.as_mut() {
            Some(listener) => listener,
            None => return Err(SshSessionError::SshSessionIsNotActive),
        };

        let channel = listener.accept().await?;

        Ok(AcceptedStream {
            stream: SshChannelStream::new(channel),
            peer: format!("relay {}", self.listen_endpoint),
        })
    }

    async fn close(&mut self) {
        // Dropping the listener asks libssh2 to cancel the tcpip-forward, but
        // on a non-blocking session that request can hit EAGAIN and never be
        // sent. The session disconnect that follows releases the remote port.
        if self.listener.take().is_some() {
            debug!("Remote listener {} closed", self.listen_endpoint);
        }
    }
}
