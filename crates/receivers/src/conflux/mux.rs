//! Connection-level protocol demultiplexer
//!
//! Inspects the first bytes of every accepted connection and classifies it:
//! a preface whose `content-type` header is one of the RPC content types
//! routes to the RPC server, everything else (including prefaces that never
//! complete) defaults to the REST path.
//!
//! Classification consumes bytes from the socket, so the chosen server gets
//! a [`PrefacedStream`] that replays them before handing over the rest of
//! the connection. On the RPC route the preface itself is stripped: it is
//! part of the handshake, not of the frame stream.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::{Buf, Bytes, BytesMut};
use conflux_telemetry::wire::{RPC_CONTENT_TYPE, RPC_CONTENT_TYPE_PROTO};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;

/// Upper bound on the preface header block read during classification.
pub(crate) const MAX_PREFACE_LEN: usize = 4096;

/// Where a classified connection is routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Route {
    Rpc,
    Rest,
}

/// A stream that replays bytes consumed during classification before
/// yielding the rest of the underlying connection.
pub(crate) struct PrefacedStream {
    prefix: Bytes,
    inner: TcpStream,
}

impl PrefacedStream {
    pub(crate) fn new(prefix: Bytes, inner: TcpStream) -> Self {
        Self { prefix, inner }
    }
}

impl AsyncRead for PrefacedStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        if !self.prefix.is_empty() {
            let n = self.prefix.len().min(buf.remaining());
            buf.put_slice(&self.prefix[..n]);
            self.prefix.advance(n);
            return Poll::Ready(Ok(()));
        }
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

impl AsyncWrite for PrefacedStream {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.inner).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}

/// Classify an accepted connection.
///
/// Reads until the preface header block ends (or the size cap / EOF is hit)
/// and picks the route from the `content-type` header.
pub(crate) async fn classify(mut stream: TcpStream) -> io::Result<(Route, PrefacedStream)> {
    use tokio::io::AsyncReadExt;

    let mut buf = BytesMut::with_capacity(1024);
    let head_end = loop {
        if let Some(pos) = find_header_end(&buf) {
            break Some(pos);
        }
        if buf.len() >= MAX_PREFACE_LEN {
            break None;
        }
        if stream.read_buf(&mut buf).await? == 0 {
            break None;
        }
    };

    let Some(head_end) = head_end else {
        // No complete preface; let the REST server produce the error reply.
        return Ok((Route::Rest, PrefacedStream::new(buf.freeze(), stream)));
    };

    if is_rpc_preface(&buf[..head_end]) {
        let mut replay = buf.freeze();
        replay.advance(head_end);
        Ok((Route::Rpc, PrefacedStream::new(replay, stream)))
    } else {
        Ok((Route::Rest, PrefacedStream::new(buf.freeze(), stream)))
    }
}

/// Find the end of the header block (the byte after the blank line).
fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n").map(|p| p + 4)
}

/// True when the preface carries an RPC content-type header.
fn is_rpc_preface(head: &[u8]) -> bool {
    let Ok(head) = std::str::from_utf8(head) else {
        return false;
    };

    // Skip the request line; header names are case-insensitive.
    for line in head.split("\r\n").skip(1) {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        if name.trim().eq_ignore_ascii_case("content-type") {
            let value = value.split(';').next().unwrap_or("").trim();
            return value == RPC_CONTENT_TYPE || value == RPC_CONTENT_TYPE_PROTO;
        }
    }
    false
}

#[cfg(test)]
#[path = "mux_test.rs"]
mod tests;
