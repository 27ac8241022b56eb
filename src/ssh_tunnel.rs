use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use rust_extensions::date_time::DateTimeAsMicroseconds;
use tracing::{error, info, info_span, Instrument};

use crate::{
    ActiveConnections, ConnectionForwarder, Endpoint, LocalConnector, RelayListener,
    RelaySession, RelayTransport, TcpConnector, TunnelError, TunnelSettings,
};

/// Owns one relay session and the remote listener requested over it, and
/// hands every accepted stream to a detached [`ConnectionForwarder`].
pub struct SshTunnel<TTransport: RelayTransport> {
    settings: TunnelSettings,
    local: Arc<Endpoint>,
    transport: TTransport,
    connector: Arc<dyn LocalConnector>,
    active: Arc<ActiveConnections>,
    next_connection_id: AtomicU64,
    pub id: i64,
}

impl<TTransport: RelayTransport> SshTunnel<TTransport> {
    pub fn new(settings: TunnelSettings, transport: TTransport) -> Self {
        Self {
            local: Arc::new(settings.local.clone()),
            settings,
            transport,
            connector: Arc::new(TcpConnector),
            active: Arc::new(ActiveConnections::new()),
            next_connection_id: AtomicU64::new(1),
            id: DateTimeAsMicroseconds::now().unix_microseconds,
        }
    }

    pub fn with_local_connector(mut self, connector: Arc<dyn LocalConnector>) -> Self {
        self.connector = connector;
        self
    }

    pub fn get_settings(&self) -> &TunnelSettings {
        &self.settings
    }

    /// Connections whose bridge has not finished yet.
    pub fn active_connections(&self) -> usize {
        self.active.get()
    }

    /// Runs until the relay closes the listener (`Ok`) or something fatal
    /// happens. Before returning, the session is disconnected, which also
    /// ends every connection that is still being bridged over it.
    pub async fn start(&self) -> Result<(), TunnelError> {
        self.run()
            .instrument(info_span!("tunnel", tunnel_id = self.id))
            .await
    }

    async fn run(&self) -> Result<(), TunnelError> {
        info!("Start the ssh tunnel service...");

        let server = &self.settings.server;
        let remote = &self.settings.remote;

        let session = match self
            .transport
            .dial(server, &self.settings.credentials)
            .await
        {
            Ok(session) => session,
            Err(source) => {
                error!("Server dial error: {}", source);
                return Err(TunnelError::Dial {
                    server: server.clone(),
                    source,
                });
            }
        };

        info!(
            "Connected to {} as {}",
            server,
            self.settings.credentials.get_user_name()
        );

        let mut listener = match session.listen(remote).await {
            Ok(listener) => listener,
            Err(source) => {
                error!("Listen on the remote server {} failed, {}", remote, source);
                session.disconnect("Remote listen rejected").await;
                return Err(TunnelError::Listen {
                    remote: remote.clone(),
                    source,
                });
            }
        };

        info!("Forwarding {} -> {}", remote, self.local);

        let result = self.accept_loop(&mut listener).await;

        // The disconnect is what reliably releases the remote port: libssh2
        // may not get the forward cancel out on a non-blocking session.
        listener.close().await;
        session.disconnect("Tunnel stopped").await;

        info!(
            "Tunnel stopped. Connections ending with the session: {}",
            self.active.get()
        );

        result
    }

    async fn accept_loop(&self, listener: &mut impl RelayListener) -> Result<(), TunnelError> {
        loop {
            let accepted = match listener.accept().await {
                Ok(accepted) => accepted,
                Err(err) if err.is_end_of_stream() => {
                    info!("Remote listener closed by the relay");
                    return Ok(());
                }
                Err(err) => {
                    error!("Receive error from connection, {}", err);
                    return Err(TunnelError::Accept(err));
                }
            };

            let connection_id = self.next_connection_id.fetch_add(1, Ordering::Relaxed);

            info!(
                connection_id,
                "Receive a connection from {}, forward req to {}", accepted.peer, self.local
            );

            let forwarder = ConnectionForwarder::new(
                self.local.clone(),
                self.settings.local_dial_timeout,
                self.connector.clone(),
                self.active.clone(),
            );

            tokio::spawn(
                forwarder
                    .forward(accepted.stream)
                    .instrument(info_span!("connection", connection_id)),
            );
        }
    }
}
