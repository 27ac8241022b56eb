use std::{
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    net::TcpStream,
    sync::Notify,
};
use tracing::{debug, trace, Instrument};

use crate::ForwardError;

const BUFFER_SIZE: usize = 64 * 1024;
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Number of connections currently being bridged.
#[derive(Debug, Default)]
pub struct ActiveConnections {
    count: AtomicUsize,
}

impl ActiveConnections {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    fn enter(self: &Arc<Self>) -> ActiveConnectionGuard {
        self.count.fetch_add(1, Ordering::SeqCst);
        ActiveConnectionGuard {
            active: self.clone(),
        }
    }
}

struct ActiveConnectionGuard {
    active: Arc<ActiveConnections>,
}

impl Drop for ActiveConnectionGuard {
    fn drop(&mut self) {
        self.active.count.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Shared by both directions of one connection. Whichever direction ends
/// first closes it, which stops the other one.
struct BridgeState {
    closed: AtomicBool,
    notify: Notify,
    _guard: ActiveConnectionGuard,
}

impl BridgeState {
    fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.notify.notify_waiters();
        }
    }

    async fn wait_closed(&self) {
        loop {
            let notified = self.notify.notified();
            if self.closed.load(Ordering::SeqCst) {
                return;
            }
            notified.await;
        }
    }
}

/// Bridges `remote_stream` and `local_stream` on two detached tasks.
pub fn start<TRemote>(
    active: &Arc<ActiveConnections>,
    remote_stream: TRemote,
    local_stream: TcpStream,
) where
    TRemote: AsyncRead + AsyncWrite + Send + Unpin + 'static,
{
    let state = Arc::new(BridgeState {
        closed: AtomicBool::new(false),
        notify: Notify::new(),
        _guard: active.enter(),
    });

    let (remote_reader, remote_writer) = tokio::io::split(remote_stream);
    let (local_reader, local_writer) = local_stream.into_split();

    let span = tracing::Span::current();

    tokio::spawn(
        pump(state.clone(), "local->remote", local_reader, remote_writer)
            .instrument(span.clone()),
    );
    tokio::spawn(pump(state, "remote->local", remote_reader, local_writer).instrument(span));
}

async fn pump(
    state: Arc<BridgeState>,
    direction: &'static str,
    mut reader: impl AsyncRead + Unpin,
    mut writer: impl AsyncWrite + Unpin,
) {
    let result = tokio::select! {
        result = copy(&mut reader, &mut writer) => Some(result),
        _ = state.wait_closed() => None,
    };

    match result {
        Some(Ok(size)) => debug!("{} finished after {} bytes", direction, size),
        Some(Err(err)) => debug!("{} io copy error: {}", direction, err),
        None => trace!("{} stopped by the other direction", direction),
    }

    state.close();

    let _ = tokio::time::timeout(SHUTDOWN_TIMEOUT, writer.shutdown()).await;
}

async fn copy(
    reader: &mut (impl AsyncRead + Unpin),
    writer: &mut (impl AsyncWrite + Unpin),
) -> Result<u64, ForwardError> {
    let mut buf = vec![0u8; BUFFER_SIZE];
    let mut total = 0u64;

    loop {
        let size = reader.read(&mut buf).await?;

        if size == 0 {
            return Ok(total);
        }

        writer.write_all(&buf[..size]).await?;
        total += size as u64;
    }
}
