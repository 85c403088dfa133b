//! Frame transport over any async byte stream.
//!
//! Each frame is: `[payload][ETB]`. A synchronous send is followed by one
//! acknowledgment byte from the firmware, whose value is not interpreted.

use std::io;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, trace};

use crate::{Command, ETB};

/// Writes `payload` as one terminated frame without waiting for an ack.
pub async fn transmit<W>(w: &mut W, payload: &[u8]) -> io::Result<()>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut frame = Vec::with_capacity(payload.len() + 1);
    frame.extend_from_slice(payload);
    frame.push(ETB);
    trace!(?frame, "tx");
    w.write_all(&frame).await?;
    w.flush().await
}

/// Reads the single acknowledgment byte that follows a synchronous frame.
pub async fn read_ack<R: AsyncRead + Unpin + ?Sized>(r: &mut R) -> io::Result<u8> {
    let ack = r.read_u8().await?;
    trace!(ack, "ack");
    Ok(ack)
}

/// Writes `payload` as one frame, then consumes the acknowledgment.
pub async fn transmit_sync<S>(s: &mut S, payload: &[u8]) -> io::Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin + ?Sized,
{
    transmit(s, payload).await?;
    read_ack(s).await?;
    Ok(())
}

/// Sends a whole command: every frame but the last fire-and-forget, the
/// last one synchronously.
///
/// A command of `k` frames writes exactly `k` frames and reads exactly one
/// byte. The first error aborts the command.
pub async fn send<S>(s: &mut S, cmd: &Command) -> io::Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin + ?Sized,
{
    let frames = cmd.frames();
    let Some((last, rest)) = frames.split_last() else {
        return Ok(());
    };
    for frame in rest {
        transmit(s, frame).await?;
    }
    transmit_sync(s, last).await
}

/// Runs one receive cycle: reads bytes up to the terminator, then the
/// trailing acknowledgment. Returns the payload.
pub async fn receive<R: AsyncRead + Unpin + ?Sized>(r: &mut R) -> io::Result<Vec<u8>> {
    let mut payload = Vec::new();
    loop {
        let byte = r.read_u8().await?;
        if byte == ETB {
            break;
        }
        payload.push(byte);
    }
    debug!(
        bytes = payload.len(),
        data = %String::from_utf8_lossy(&payload),
        "rx"
    );
    read_ack(r).await?;
    Ok(payload)
}
