//! In-memory stand-in for the robot's serial link.
//!
//! A [`VirtualStream`] plays the firmware's side of the wire: it serves
//! queued reply bytes and records every byte written to it. Clones share
//! the same buffers, so a test can hand one clone to a [`crate::Client`]
//! and inspect the traffic through another.

use std::collections::VecDeque;
use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll, Waker};

use sparki_proto::ETB;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

/// A shared-handle virtual byte stream.
#[derive(Debug, Clone, Default)]
pub struct VirtualStream {
    /// State shared by all clones.
    shared: Arc<Mutex<Shared>>,
}

/// Buffers and switches behind a [`VirtualStream`].
#[derive(Debug, Default)]
struct Shared {
    /// Bytes written by the host.
    written: Vec<u8>,
    /// Bytes waiting to be read by the host.
    incoming: VecDeque<u8>,
    /// Bytes consumed by the host so far.
    bytes_read: usize,
    /// Block reads once `incoming` is drained instead of reporting EOF.
    stall: bool,
    /// Reject every write with `BrokenPipe`.
    fail_writes: bool,
    /// Reject shutdown.
    fail_close: bool,
    /// Shutdown completed.
    closed: bool,
    /// Reader parked on an empty stalled stream.
    read_waker: Option<Waker>,
}

impl VirtualStream {
    /// Creates a stream that reports EOF once its queued bytes run out.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes reads wait forever (or until more bytes are pushed) once the
    /// queue is drained, like firmware that never answers.
    #[must_use]
    pub fn stalled(self) -> Self {
        self.lock().stall = true;
        self
    }

    /// Queues bytes for the host to read.
    pub fn push_incoming(&self, bytes: &[u8]) {
        let mut shared = self.lock();
        shared.incoming.extend(bytes);
        if let Some(waker) = shared.read_waker.take() {
            waker.wake();
        }
    }

    /// Everything the host has written.
    pub fn written(&self) -> Vec<u8> {
        self.lock().written.clone()
    }

    /// The written bytes split into frame payloads (terminators removed).
    /// A trailing unterminated payload is included as-is.
    pub fn frames(&self) -> Vec<Vec<u8>> {
        let shared = self.lock();
        let mut frames: Vec<Vec<u8>> = shared
            .written
            .split(|&b| b == ETB)
            .map(<[u8]>::to_vec)
            .collect();
        // `split` yields an empty tail after the final terminator.
        if frames.last().is_some_and(Vec::is_empty) {
            frames.pop();
        }
        frames
    }

    /// Forgets the bytes written so far.
    pub fn clear_written(&self) {
        self.lock().written.clear();
    }

    /// Number of bytes the host has read.
    pub fn bytes_read(&self) -> usize {
        self.lock().bytes_read
    }

    /// Restarts the read counter.
    pub fn reset_bytes_read(&self) {
        self.lock().bytes_read = 0;
    }

    /// Whether the host shut the stream down.
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Makes every later write fail.
    pub fn fail_writes(&self) {
        self.lock().fail_writes = true;
    }

    /// Makes shutdown fail.
    pub fn fail_close(&self) {
        self.lock().fail_close = true;
    }

    /// Number of live handles, including this one.
    pub fn handle_count(&self) -> usize {
        Arc::strong_count(&self.shared)
    }

    /// Locks the shared state, ignoring poisoning from a panicked test.
    fn lock(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl AsyncRead for VirtualStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let mut shared = self.lock();
        if shared.incoming.is_empty() {
            if shared.stall {
                shared.read_waker = Some(cx.waker().clone());
                return Poll::Pending;
            }
            return Poll::Ready(Ok(()));
        }

        let n = buf.remaining().min(shared.incoming.len());
        let chunk: Vec<u8> = shared.incoming.drain(..n).collect();
        buf.put_slice(&chunk);
        shared.bytes_read += n;
        Poll::Ready(Ok(()))
    }
}

impl AsyncWrite for VirtualStream {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        data: &[u8],
    ) -> Poll<io::Result<usize>> {
        let mut shared = self.lock();
        if shared.fail_writes {
            return Poll::Ready(Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "virtual link write failure",
            )));
        }
        shared.written.extend_from_slice(data);
        Poll::Ready(Ok(data.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let mut shared = self.lock();
        if shared.fail_close {
            return Poll::Ready(Err(io::Error::other("virtual link close failure")));
        }
        shared.closed = true;
        Poll::Ready(Ok(()))
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    use super::*;

    #[tokio::test]
    async fn clones_share_traffic() {
        let stream = VirtualStream::new();
        let mut host = stream.clone();
        stream.push_incoming(b"ab");

        host.write_all(b"x\x17yz\x17").await.unwrap();
        assert_eq!(host.read_u8().await.unwrap(), b'a');

        assert_eq!(stream.frames(), vec![b"x".to_vec(), b"yz".to_vec()]);
        assert_eq!(stream.bytes_read(), 1);
        assert_eq!(stream.handle_count(), 2);
    }

    #[tokio::test]
    async fn drained_stream_reports_eof() {
        let mut stream = VirtualStream::new();
        let err = stream.read_u8().await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[tokio::test]
    async fn stalled_stream_wakes_on_push() {
        let stream = VirtualStream::new().stalled();
        let mut reader = stream.clone();
        let pending = tokio::spawn(async move { reader.read_u8().await });

        tokio::task::yield_now().await;
        stream.push_incoming(&[7]);

        assert_eq!(pending.await.unwrap().unwrap(), 7);
    }

    #[tokio::test]
    async fn unterminated_tail_is_a_frame() {
        let mut stream = VirtualStream::new();
        stream.write_all(b"1\x1723").await.unwrap();
        assert_eq!(stream.frames(), vec![b"1".to_vec(), b"23".to_vec()]);
    }

    #[tokio::test]
    async fn shutdown_is_recorded() {
        let mut stream = VirtualStream::new();
        stream.shutdown().await.unwrap();
        assert!(stream.is_closed());

        let mut failing = VirtualStream::new();
        failing.fail_close();
        assert!(failing.shutdown().await.is_err());
        assert!(!failing.is_closed());
    }
}
