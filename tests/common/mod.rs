#![allow(dead_code)]

use std::{
    collections::VecDeque,
    net::SocketAddr,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use ssh_reverse_tunnel::{
    AcceptedStream, Endpoint, LocalConnector, RelayListener, RelaySession, RelayTransport,
    SshCredentials, SshSessionError, SshTunnel, TunnelSettings,
};
use tokio::{
    net::{TcpListener, TcpStream},
    sync::Notify,
};

pub const WAIT: Duration = Duration::from_secs(5);

/// Counters and controls shared between a test and its loopback relay.
#[derive(Default)]
pub struct RelayState {
    pub dials: AtomicUsize,
    pub listens: AtomicUsize,
    pub closes: AtomicUsize,
    pub disconnects: AtomicUsize,
    bound: Mutex<Option<SocketAddr>>,
    events: Mutex<Vec<&'static str>>,
    channels: Mutex<Vec<std::net::TcpStream>>,
    shutdown: AtomicBool,
    shutdown_notify: Notify,
}

impl RelayState {
    /// Makes the next accept report a clean end of stream.
    pub fn shutdown_listener(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
        self.shutdown_notify.notify_waiters();
    }

    /// Order in which the listener was closed and the session disconnected.
    pub fn events(&self) -> Vec<&'static str> {
        self.events.lock().unwrap().clone()
    }

    async fn wait_shutdown(&self) {
        loop {
            let notified = self.shutdown_notify.notified();
            if self.shutdown.load(Ordering::SeqCst) {
                return;
            }
            notified.await;
        }
    }

    pub async fn relay_addr(&self) -> SocketAddr {
        tokio::time::timeout(WAIT, async {
            loop {
                if let Some(addr) = *self.bound.lock().unwrap() {
                    return addr;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("relay listener was never bound")
    }
}

/// Relay transport that "listens" on a plain local TCP socket. Clients
/// connecting to it play the role of users of the relay's public port.
pub struct LoopbackTransport {
    pub state: Arc<RelayState>,
    fail_dial: bool,
    fail_listen: bool,
    accept_errors: Mutex<VecDeque<SshSessionError>>,
}

impl LoopbackTransport {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RelayState::default()),
            fail_dial: false,
            fail_listen: false,
            accept_errors: Mutex::new(VecDeque::new()),
        }
    }

    pub fn failing_dial(mut self) -> Self {
        self.fail_dial = true;
        self
    }

    pub fn failing_listen(mut self) -> Self {
        self.fail_listen = true;
        self
    }

    pub fn with_accept_error(self, err: SshSessionError) -> Self {
        self.accept_errors.lock().unwrap().push_back(err);
        self
    }
}

#[async_trait::async_trait]
impl RelayTransport for LoopbackTransport {
    type Session = LoopbackSession;

    async fn dial(
        &self,
        _server: &Endpoint,
        credentials: &SshCredentials,
    ) -> Result<LoopbackSession, SshSessionError> {
        self.state.dials.fetch_add(1, Ordering::SeqCst);

        if self.fail_dial {
            return Err(SshSessionError::SshAuthenticationError(
                credentials.get_user_name().to_string(),
            ));
        }

        let accept_errors = std::mem::take(&mut *self.accept_errors.lock().unwrap());

        Ok(LoopbackSession {
            state: self.state.clone(),
            fail_listen: self.fail_listen,
            accept_errors: Mutex::new(accept_errors),
        })
    }
}

pub struct LoopbackSession {
    state: Arc<RelayState>,
    fail_listen: bool,
    accept_errors: Mutex<VecDeque<SshSessionError>>,
}

#[async_trait::async_trait]
impl RelaySession for LoopbackSession {
    type Listener = LoopbackListener;

    async fn listen(&self, remote: &Endpoint) -> Result<LoopbackListener, SshSessionError> {
        self.state.listens.fetch_add(1, Ordering::SeqCst);

        if self.fail_listen {
            return Err(SshSessionError::StdIoStreamError(std::io::Error::new(
                std::io::ErrorKind::AddrInUse,
                "tcpip-forward denied",
            )));
        }

        let listener = TcpListener::bind(remote.to_string()).await?;
        *self.state.bound.lock().unwrap() = Some(listener.local_addr()?);

        let accept_errors = std::mem::take(&mut *self.accept_errors.lock().unwrap());

        Ok(LoopbackListener {
            listener: Some(listener),
            state: self.state.clone(),
            accept_errors,
        })
    }

    /// Like an SSH disconnect, this ends every channel opened over the session.
    async fn disconnect(&self, _reason: &str) {
        self.state.disconnects.fetch_add(1, Ordering::SeqCst);
        self.state.events.lock().unwrap().push("disconnect");

        for channel in self.state.channels.lock().unwrap().drain(..) {
            let _ = channel.shutdown(std::net::Shutdown::Both);
        }
    }
}

pub struct LoopbackListener {
    listener: Option<TcpListener>,
    state: Arc<RelayState>,
    accept_errors: VecDeque<SshSessionError>,
}

#[async_trait::async_trait]
impl RelayListener for LoopbackListener {
    type Stream = TcpStream;

    async fn accept(&mut self) -> Result<AcceptedStream<TcpStream>, SshSessionError> {
        if let Some(err) = self.accept_errors.pop_front() {
            return Err(err);
        }

        let listener = match self.listener.as_ref() {
            Some(listener) => listener,
            None => return Err(SshSessionError::SshSessionIsNotActive),
        };

        tokio::select! {
            accepted = listener.accept() => {
                let (stream, peer) = accepted?;
                let stream = stream.into_std()?;
                self.state.channels.lock().unwrap().push(stream.try_clone()?);
                let stream = TcpStream::from_std(stream)?;
                Ok(AcceptedStream { stream, peer: peer.to_string() })
            }
            _ = self.state.wait_shutdown() => Err(SshSessionError::StdIoStreamError(
                std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "EOF"),
            )),
        }
    }

    async fn close(&mut self) {
        if self.listener.take().is_some() {
            self.state.closes.fetch_add(1, Ordering::SeqCst);
            self.state.events.lock().unwrap().push("close");
        }
    }
}

pub fn settings(local_port: u16) -> TunnelSettings {
    TunnelSettings::new(
        local_port,
        "127.0.0.1",
        0,
        SshCredentials::new("tester", "secret"),
    )
    .with_local_dial_timeout(Duration::from_secs(2))
}

pub fn spawn_tunnel(
    tunnel: &Arc<SshTunnel<LoopbackTransport>>,
) -> tokio::task::JoinHandle<Result<(), ssh_reverse_tunnel::TunnelError>> {
    let tunnel = tunnel.clone();
    tokio::spawn(async move { tunnel.start().await })
}

/// The first local dial never completes, later ones connect normally.
#[derive(Default)]
pub struct FirstDialHangs {
    pub calls: AtomicUsize,
}

#[async_trait::async_trait]
impl LocalConnector for FirstDialHangs {
    async fn connect(&self, local: &Endpoint) -> std::io::Result<TcpStream> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            return std::future::pending().await;
        }

        TcpStream::connect((local.host(), local.port())).await
    }
}

/// Local service that echoes every byte back.
pub async fn start_echo_server() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let (mut reader, mut writer) = socket.into_split();
                let _ = tokio::io::copy(&mut reader, &mut writer).await;
            });
        }
    });

    port
}

/// A port nothing listens on.
pub async fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

pub async fn wait_until(check: impl Fn() -> bool) {
    tokio::time::timeout(WAIT, async {
        while !check() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition was not reached in time");
}
