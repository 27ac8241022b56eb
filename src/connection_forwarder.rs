use std::{sync::Arc, time::Duration};

use tokio::{
    io::{AsyncRead, AsyncWrite, AsyncWriteExt},
    net::TcpStream,
};
use tracing::{debug, error};

use crate::{ActiveConnections, Endpoint, ForwardError};

/// Opens the TCP connection to the forward target.
#[async_trait::async_trait]
pub trait LocalConnector: Send + Sync + 'static {
    async fn connect(&self, local: &Endpoint) -> std::io::Result<TcpStream>;
}

/// Plain `TcpStream::connect`.
pub struct TcpConnector;

#[async_trait::async_trait]
impl LocalConnector for TcpConnector {
    async fn connect(&self, local: &Endpoint) -> std::io::Result<TcpStream> {
        TcpStream::connect((local.host(), local.port())).await
    }
}

/// Handles one stream accepted by the relay: dials the local target and
/// bridges the two. Runs detached from the accept loop, so errors end here.
pub struct ConnectionForwarder {
    local: Arc<Endpoint>,
    dial_timeout: Duration,
    connector: Arc<dyn LocalConnector>,
    active: Arc<ActiveConnections>,
}

impl ConnectionForwarder {
    pub fn new(
        local: Arc<Endpoint>,
        dial_timeout: Duration,
        connector: Arc<dyn LocalConnector>,
        active: Arc<ActiveConnections>,
    ) -> Self {
        Self {
            local,
            dial_timeout,
            connector,
            active,
        }
    }

    pub async fn forward<TRemote>(self, mut remote_stream: TRemote)
    where
        TRemote: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    {
        let local_stream = match self.dial_local().await {
            Ok(local_stream) => local_stream,
            Err(err) => {
                error!("{}", err);
                let _ = remote_stream.shutdown().await;
                return;
            }
        };

        debug!("Connected to local endpoint {}", self.local);

        if let Err(err) = local_stream.set_nodelay(true) {
            debug!("Can not set TCP_NODELAY on {}: {}", self.local, err);
        }

        crate::bridge::start(&self.active, remote_stream, local_stream);
    }

    async fn dial_local(&self) -> Result<TcpStream, ForwardError> {
        let connect = self.connector.connect(&self.local);

        match tokio::time::timeout(self.dial_timeout, connect).await {
            Ok(Ok(stream)) => Ok(stream),
            Ok(Err(source)) => Err(ForwardError::LocalDial {
                local: self.local.as_ref().clone(),
                source,
            }),
            Err(_) => Err(ForwardError::LocalDialTimeout {
                local: self.local.as_ref().clone(),
                timeout: self.dial_timeout,
            }),
        }
    }
}
