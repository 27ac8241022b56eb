use std::{
    pin::Pin,
    task::{Context, Poll},
};

use futures::io::{AsyncRead as FuturesAsyncRead, AsyncWrite as FuturesAsyncWrite};
use tokio::io::ReadBuf;

use crate::SshAsyncChannel;

/// Exposes a forwarded SSH channel through tokio's io traits so it can be
/// bridged the same way as a `TcpStream`.
pub struct SshChannelStream {
    channel: SshAsyncChannel,
}

impl SshChannelStream {
    pub fn new(channel: SshAsyncChannel) -> Self {
        Self { channel }
    }
}

impl tokio::io::AsyncRead for SshChannelStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        let unfilled = buf.initialize_unfilled();

        match FuturesAsyncRead::poll_read(Pin::new(&mut self.channel), cx, unfilled) {
            Poll::Ready(Ok(size)) => {
                buf.advance(size);
                Poll::Ready(Ok(()))
            }
            Poll::Ready(Err(err)) => Poll::Ready(Err(err)),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl tokio::io::AsyncWrite for SshChannelStream {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        FuturesAsyncWrite::poll_write(Pin::new(&mut self.channel), cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        FuturesAsyncWrite::poll_flush(Pin::new(&mut self.channel), cx)
    }

    fn poll_shutdown(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.channel).poll_close(cx)
    }
}
