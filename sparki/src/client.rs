//! Connection state machine and handshake for a single robot.
//!
//! A [`Client`] owns the byte stream once connected. Commands are strictly
//! serialized: every command ends with a synchronous frame whose
//! acknowledgment is consumed before the call returns.

use std::fmt;
use std::io;
use std::time::Duration;

use sparki_proto::{Command, Opcode};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::{Error, Result};

/// How long [`Client::connect`] waits for the firmware to answer.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// A duplex byte stream the robot can be driven over.
///
/// Implemented for every `AsyncRead + AsyncWrite + Unpin + Send` type.
/// [`crate::serial::open`] provides the serial-port implementation and
/// [`crate::VirtualStream`] an in-memory one for tests.
pub trait Transport: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> Transport for T {}

/// Connection lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[non_exhaustive]
pub enum ConnectionState {
    /// No transport attached.
    #[default]
    Disconnected,
    /// Handshake in progress.
    Connecting,
    /// Handshake completed; commands may be sent.
    Connected,
}

/// Driver for one robot.
///
/// Calls take `&mut self`, so the client is the only writer of its state.
/// Callers sharing a client across tasks must serialize access themselves.
pub struct Client {
    /// Current lifecycle state.
    state: ConnectionState,
    /// The link to the robot, present only while connected.
    stream: Option<Box<dyn Transport>>,
    /// Upper bound on the handshake's receive cycle.
    handshake_timeout: Duration,
    /// Text the firmware answered the handshake with, if any.
    firmware_name: Option<String>,
    /// Firmware protocol version. Not reported by current firmware.
    protocol_version: Option<String>,
}

impl Client {
    /// Creates a disconnected client with the default handshake timeout.
    pub fn new() -> Self {
        Self::with_handshake_timeout(DEFAULT_HANDSHAKE_TIMEOUT)
    }

    /// Creates a disconnected client with a custom handshake timeout.
    pub const fn with_handshake_timeout(timeout: Duration) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            stream: None,
            handshake_timeout: timeout,
            firmware_name: None,
            protocol_version: None,
        }
    }

    /// Current lifecycle state.
    pub const fn state(&self) -> ConnectionState {
        self.state
    }

    /// Whether the handshake has completed.
    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// Handshake timeout in effect.
    pub const fn handshake_timeout(&self) -> Duration {
        self.handshake_timeout
    }

    /// Changes the handshake timeout for later connects.
    pub fn set_handshake_timeout(&mut self, timeout: Duration) {
        self.handshake_timeout = timeout;
    }

    /// Firmware identity reported during the handshake.
    pub fn firmware_name(&self) -> Option<&str> {
        self.firmware_name.as_deref()
    }

    /// Firmware protocol version, when the firmware reports one.
    pub fn protocol_version(&self) -> Option<&str> {
        self.protocol_version.as_deref()
    }

    /// Connects over `stream`.
    ///
    /// Sends the init frame, then waits for one reply from the firmware on
    /// a background task, bounded by the handshake timeout. On timeout the
    /// task is cancelled and the stream dropped. Any failure leaves the
    /// client [`ConnectionState::Disconnected`], and so does dropping the
    /// returned future before it completes.
    ///
    /// Fails with [`Error::AlreadyConnected`] without touching `stream` if
    /// the client is already connected.
    pub async fn connect(&mut self, stream: impl Transport + 'static) -> Result<()> {
        if self.is_connected() {
            return Err(Error::AlreadyConnected);
        }

        let attempt = Attempt::begin(&mut self.state);
        info!("connecting");
        match handshake(Box::new(stream), self.handshake_timeout).await {
            Ok((stream, reply)) => {
                self.firmware_name = String::from_utf8(reply).ok().filter(|s| !s.is_empty());
                self.stream = Some(stream);
                attempt.complete();
                info!(firmware = self.firmware_name.as_deref(), "connected");
                Ok(())
            }
            Err(e) => {
                drop(attempt);
                self.stream = None;
                warn!(error = %e, "handshake failed");
                Err(e)
            }
        }
    }

    /// Stops the robot and closes the link.
    ///
    /// The halt sequence (stop, RGB LED off, status LED off, clear and
    /// update the display) is sent whenever a transport is attached,
    /// whatever the recorded state. Every step is attempted; the client is
    /// marked disconnected before the link is shut down. Returns the first
    /// halt failure, else any close failure.
    pub async fn disconnect(&mut self) -> Result<()> {
        if self.stream.is_none() {
            debug!("disconnect without a transport");
            self.state = ConnectionState::Disconnected;
            return Ok(());
        }

        let halted = self.halt().await;

        self.state = ConnectionState::Disconnected;
        self.firmware_name = None;
        self.protocol_version = None;
        let closed = match self.stream.take() {
            Some(mut stream) => stream.shutdown().await,
            None => Ok(()),
        };
        info!("disconnected");

        halted?;
        closed?;
        Ok(())
    }

    /// Sends the halt sequence, attempting every step.
    async fn halt(&mut self) -> Result<()> {
        let steps = [
            self.stop().await,
            self.set_rgb_led(0, 0, 0).await,
            self.set_status_led(0).await,
            self.lcd_clear(true).await,
        ];

        let mut first = None;
        for step in steps {
            if let Err(e) = step {
                warn!(error = %e, "halt step failed");
                first.get_or_insert(e);
            }
        }
        first.map_or(Ok(()), Err)
    }

    /// Sends an arbitrary command, waiting for its acknowledgment.
    ///
    /// Every operation in the command set goes through here; advanced
    /// callers can use it for opcodes without a dedicated method. Commands
    /// with a NaN or infinite argument are rejected before any I/O.
    pub async fn execute(&mut self, cmd: &Command) -> Result<()> {
        let stream = self.stream.as_mut().ok_or(Error::NotConnected)?;
        if let Some(&arg) = cmd.args().iter().find(|arg| !arg.is_finite()) {
            return Err(Error::InvalidArgument {
                opcode: cmd.opcode(),
                arg,
            });
        }
        debug!(opcode = %cmd.opcode(), frames = cmd.frame_count(), "command");
        sparki_proto::send(stream, cmd)
            .await
            .map_err(|source| Error::Command {
                opcode: cmd.opcode(),
                source,
            })
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("state", &self.state)
            .field("attached", &self.stream.is_some())
            .field("handshake_timeout", &self.handshake_timeout)
            .field("firmware_name", &self.firmware_name)
            .finish_non_exhaustive()
    }
}

/// Resets the firmware, sends the init frame, and runs one receive
/// cycle raced against the handshake timeout.
async fn handshake(
    mut stream: Box<dyn Transport>,
    timeout: Duration,
) -> Result<(Box<dyn Transport>, Vec<u8>)> {
    reset(stream.as_mut())?;
    sparki_proto::transmit(&mut stream, &[Opcode::Init.as_byte()])
        .await
        .map_err(|source| Error::Command {
            opcode: Opcode::Init,
            source,
        })?;

    let mut task = AbortOnDrop(tokio::spawn(async move {
        let reply = sparki_proto::receive(&mut stream).await;
        (stream, reply)
    }));

    match tokio::time::timeout(timeout, &mut task.0).await {
        Ok(Ok((stream, Ok(reply)))) => Ok((stream, reply)),
        Ok(Ok((_, Err(e)))) => Err(Error::Io(e)),
        Ok(Err(join)) => Err(Error::Io(io::Error::other(join))),
        Err(_) => Err(Error::HandshakeTimeout(timeout)),
    }
}

/// Aborts the task when dropped, whether the handshake timed out or the
/// caller abandoned `connect`. A no-op once the task has finished.
struct AbortOnDrop<T>(JoinHandle<T>);

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// A connect in progress. Holds the client's state at `Connecting` and
/// puts it back to `Disconnected` when dropped before [`Attempt::complete`].
struct Attempt<'a> {
    state: &'a mut ConnectionState,
}

impl<'a> Attempt<'a> {
    fn begin(state: &'a mut ConnectionState) -> Self {
        *state = ConnectionState::Connecting;
        Self { state }
    }

    fn complete(self) {
        *self.state = ConnectionState::Connected;
    }
}

impl Drop for Attempt<'_> {
    fn drop(&mut self) {
        if *self.state == ConnectionState::Connecting {
            *self.state = ConnectionState::Disconnected;
        }
    }
}

/// Firmware-level reset. The myro firmware has none yet, so this only
/// marks where one belongs in the handshake.
#[allow(clippy::unnecessary_wraps)]
fn reset(_stream: &mut dyn Transport) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use sparki_proto::ETB;
    use tokio::time::Instant;

    use super::*;
    use crate::VirtualStream;

    /// A stream that answers the handshake with `reply` and then acks
    /// `acks` synchronous frames.
    fn board(reply: &[u8], acks: usize) -> VirtualStream {
        let stream = VirtualStream::new();
        stream.push_incoming(reply);
        stream.push_incoming(&[ETB, 0x00]);
        stream.push_incoming(&vec![0x00; acks]);
        stream
    }

    #[tokio::test]
    async fn connect_sends_init_and_reads_reply() {
        let stream = board(b"Sparki", 0);
        let mut client = Client::new();

        client.connect(stream.clone()).await.unwrap();

        assert_eq!(client.state(), ConnectionState::Connected);
        assert_eq!(client.firmware_name(), Some("Sparki"));
        assert_eq!(stream.frames(), vec![vec![Opcode::Init.as_byte()]]);
        assert_eq!(stream.bytes_read(), 8);
    }

    #[tokio::test]
    async fn empty_reply_leaves_name_unset() {
        let mut client = Client::new();
        client.connect(board(b"", 0)).await.unwrap();
        assert!(client.is_connected());
        assert_eq!(client.firmware_name(), None);
        assert_eq!(client.protocol_version(), None);
    }

    #[tokio::test]
    async fn second_connect_is_rejected_without_io() {
        let mut client = Client::new();
        client.connect(board(b"", 0)).await.unwrap();

        let second = VirtualStream::new();
        let err = client.connect(second.clone()).await.unwrap_err();

        assert!(matches!(err, Error::AlreadyConnected));
        assert!(second.written().is_empty());
        assert_eq!(second.bytes_read(), 0);
        assert!(client.is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_handshake_times_out() {
        let timeout = Duration::from_millis(750);
        let stream = VirtualStream::new().stalled();
        let mut client = Client::with_handshake_timeout(timeout);

        let started = Instant::now();
        let err = client.connect(stream.clone()).await.unwrap_err();

        assert!(matches!(err, Error::HandshakeTimeout(d) if d == timeout));
        assert!(started.elapsed() >= timeout);
        assert_eq!(client.state(), ConnectionState::Disconnected);
        assert_eq!(stream.frames(), vec![vec![Opcode::Init.as_byte()]]);
    }

    #[tokio::test(start_paused = true)]
    async fn timed_out_task_is_cancelled() {
        let stream = VirtualStream::new().stalled();
        let mut client = Client::with_handshake_timeout(Duration::from_secs(1));
        client.connect(stream.clone()).await.unwrap_err();

        // Let the runtime drop the aborted task.
        for _ in 0..8 {
            if stream.handle_count() == 1 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(stream.handle_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn abandoned_connect_cancels_task_and_disconnects() {
        let stream = VirtualStream::new().stalled();
        let mut client = Client::with_handshake_timeout(Duration::from_secs(5));

        let outer =
            tokio::time::timeout(Duration::from_secs(1), client.connect(stream.clone())).await;
        assert!(outer.is_err());

        for _ in 0..8 {
            if stream.handle_count() == 1 {
                break;
            }
            tokio::task::yield_now().await;
        }
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(stream.handle_count(), 1);
        assert_eq!(client.state(), ConnectionState::Disconnected);
        assert_eq!(stream.frames(), vec![vec![Opcode::Init.as_byte()]]);

        // The client is free to try again.
        client.connect(board(b"", 0)).await.unwrap();
        assert!(client.is_connected());
    }

    #[tokio::test]
    async fn handshake_read_error_is_reported() {
        let stream = VirtualStream::new();
        stream.push_incoming(b"partial");
        let mut client = Client::new();

        let err = client.connect(stream).await.unwrap_err();

        assert!(matches!(err, Error::Io(ref e) if e.kind() == io::ErrorKind::UnexpectedEof));
        assert_eq!(client.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn init_write_failure_is_reported() {
        let stream = VirtualStream::new();
        stream.fail_writes();
        let mut client = Client::new();

        let err = client.connect(stream).await.unwrap_err();

        assert!(matches!(
            err,
            Error::Command {
                opcode: Opcode::Init,
                ..
            }
        ));
        assert_eq!(client.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn reconnect_after_disconnect() {
        let mut client = Client::new();
        client.connect(board(b"", 5)).await.unwrap();
        client.disconnect().await.unwrap();
        client.connect(board(b"", 0)).await.unwrap();
        assert!(client.is_connected());
    }

    #[tokio::test]
    async fn commands_need_a_transport() {
        let mut client = Client::new();
        assert!(matches!(client.stop().await, Err(Error::NotConnected)));
    }

    #[tokio::test]
    async fn disconnect_sends_halt_sequence_then_closes() {
        let stream = board(b"", 5);
        let mut client = Client::new();
        client.connect(stream.clone()).await.unwrap();
        stream.clear_written();

        client.disconnect().await.unwrap();

        assert_eq!(
            stream.frames(),
            vec![
                vec![Opcode::Stop.as_byte()],
                vec![Opcode::SetRgbLed.as_byte()],
                b"0".to_vec(),
                b"0".to_vec(),
                b"0".to_vec(),
                vec![Opcode::SetStatusLed.as_byte()],
                b"0".to_vec(),
                vec![Opcode::LcdClear.as_byte()],
                vec![Opcode::LcdUpdate.as_byte()],
            ]
        );
        assert!(stream.is_closed());
        assert_eq!(client.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn disconnect_attempts_every_step_after_failure() {
        // Only one ack queued: the first step succeeds, the rest hit EOF.
        let stream = board(b"", 1);
        let mut client = Client::new();
        client.connect(stream.clone()).await.unwrap();
        stream.clear_written();

        let err = client.disconnect().await.unwrap_err();

        assert!(matches!(
            err,
            Error::Command {
                opcode: Opcode::SetRgbLed,
                ..
            }
        ));
        // The display clear fails, so its trailing update is never sent.
        assert_eq!(
            stream.frames(),
            vec![
                vec![Opcode::Stop.as_byte()],
                vec![Opcode::SetRgbLed.as_byte()],
                b"0".to_vec(),
                b"0".to_vec(),
                b"0".to_vec(),
                vec![Opcode::SetStatusLed.as_byte()],
                b"0".to_vec(),
                vec![Opcode::LcdClear.as_byte()],
            ]
        );
        assert!(stream.is_closed());
        assert_eq!(client.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn close_failure_still_disconnects() {
        let stream = board(b"", 5);
        let mut client = Client::new();
        client.connect(stream.clone()).await.unwrap();
        stream.fail_close();

        let err = client.disconnect().await.unwrap_err();

        assert!(matches!(err, Error::Io(_)));
        assert_eq!(client.state(), ConnectionState::Disconnected);
        assert!(matches!(client.stop().await, Err(Error::NotConnected)));
    }

    #[tokio::test]
    async fn disconnect_without_transport_is_a_no_op() {
        let mut client = Client::new();
        client.disconnect().await.unwrap();
        assert_eq!(client.state(), ConnectionState::Disconnected);
    }
}
