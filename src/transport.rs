use tokio::io::{AsyncRead, AsyncWrite};

use crate::{Endpoint, SshCredentials, SshSessionError};

/// Stream handed out by a relay listener together with a printable origin.
pub struct AcceptedStream<TStream> {
    pub stream: TStream,
    pub peer: String,
}

/// Opens sessions to the relay.
#[async_trait::async_trait]
pub trait RelayTransport: Send + Sync + 'static {
    type Session: RelaySession;

    async fn dial(
        &self,
        server: &Endpoint,
        credentials: &SshCredentials,
    ) -> Result<Self::Session, SshSessionError>;
}

/// An established session able to ask the relay to listen on its behalf.
#[async_trait::async_trait]
pub trait RelaySession: Send + Sync {
    type Listener: RelayListener;

    async fn listen(&self, remote: &Endpoint) -> Result<Self::Listener, SshSessionError>;

    async fn disconnect(&self, reason: &str);
}

#[async_trait::async_trait]
pub trait RelayListener: Send {
    type Stream: AsyncRead + AsyncWrite + Send + Unpin + 'static;

    async fn accept(&mut self) -> Result<AcceptedStream<Self::Stream>, SshSessionError>;

    /// Releases the remote listener. Calling it more than once is a no-op.
    async fn close(&mut self);
}
