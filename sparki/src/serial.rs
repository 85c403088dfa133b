//! Serial-port transport.
//!
//! [`serialport`] is blocking, so the port is driven by two OS threads
//! that shuttle bytes between it and one end of a [`tokio::io::duplex`]
//! pipe. The other end is the returned [`SerialLink`]. Shutting the link
//! down (or dropping it) stops both threads and closes the port. If the
//! port fails or reaches end of file, the link reads end of file and both
//! threads stop.

use std::io::{self, Read, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream, ReadHalf, WriteHalf};
use tokio::runtime::Handle;
use tracing::{debug, warn};

/// Baud rate of the myro firmware's serial console.
pub const DEFAULT_BAUD_RATE: u32 = 57_600;

/// Async end of a bridged serial port.
pub type SerialLink = DuplexStream;

/// How long a port read blocks before re-checking for shutdown.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Buffer size of the in-process pipe and of each port transfer.
const CHUNK: usize = 256;

/// Opens `path` at `baud_rate` and returns an async link to it.
///
/// Must be called from within a tokio runtime.
pub fn open(path: &str, baud_rate: u32) -> io::Result<SerialLink> {
    let handle = Handle::try_current().map_err(io::Error::other)?;
    let port = serialport::new(path, baud_rate)
        .timeout(POLL_INTERVAL)
        .open()?;
    let rx_port = port.try_clone()?;
    debug!(path, baud_rate, "serial port opened");

    let (link, _pumps) = bridge(path, rx_port, port, &handle)?;
    Ok(link)
}

/// Starts the reader and writer threads between a port and a new link.
fn bridge<R, W>(
    name: &str,
    rx_port: R,
    tx_port: W,
    handle: &Handle,
) -> io::Result<(SerialLink, [thread::JoinHandle<()>; 2])>
where
    R: Read + Send + 'static,
    W: Write + Send + 'static,
{
    let (link, bridge) = tokio::io::duplex(CHUNK);
    let (bridge_rx, bridge_tx) = tokio::io::split(bridge);
    let closed = Arc::new(AtomicBool::new(false));

    let reader = {
        let (closed, handle) = (Arc::clone(&closed), handle.clone());
        thread::Builder::new()
            .name(format!("sparki-rx {name}"))
            .spawn(move || pump_port_to_link(rx_port, bridge_tx, &handle, &closed))?
    };
    let writer = {
        let handle = handle.clone();
        thread::Builder::new()
            .name(format!("sparki-tx {name}"))
            .spawn(move || pump_link_to_port(bridge_rx, tx_port, &handle, &closed))?
    };
    Ok((link, [reader, writer]))
}

/// Copies port input onto the link until the port fails or `closed` is set.
/// Always ends the link's input so pending reads see end of file.
fn pump_port_to_link(
    mut port: impl Read,
    mut bridge_tx: WriteHalf<DuplexStream>,
    handle: &Handle,
    closed: &AtomicBool,
) {
    let mut buf = [0u8; CHUNK];
    while !closed.load(Ordering::Acquire) {
        match port.read(&mut buf) {
            Ok(0) => {
                debug!("serial port reached end of file");
                break;
            }
            Ok(n) => {
                if handle.block_on(bridge_tx.write_all(&buf[..n])).is_err() {
                    break;
                }
            }
            Err(e) if e.kind() == io::ErrorKind::TimedOut => {}
            Err(e) => {
                warn!(error = %e, "serial read failed");
                break;
            }
        }
    }
    closed.store(true, Ordering::Release);
    let _ = handle.block_on(bridge_tx.shutdown());
    debug!("serial reader stopped");
}

/// Copies link output onto the port until the link closes, the port
/// fails, or the reader has stopped.
fn pump_link_to_port(
    mut bridge_rx: ReadHalf<DuplexStream>,
    mut port: impl Write,
    handle: &Handle,
    closed: &AtomicBool,
) {
    let mut buf = [0u8; CHUNK];
    loop {
        match handle.block_on(bridge_rx.read(&mut buf)) {
            Ok(0) | Err(_) => break,
            Ok(_) if closed.load(Ordering::Acquire) => break,
            Ok(n) => {
                let written = port.write_all(&buf[..n]).and_then(|()| port.flush());
                if let Err(e) = written {
                    warn!(error = %e, "serial write failed");
                    break;
                }
            }
        }
    }
    closed.store(true, Ordering::Release);
    debug!("serial writer stopped");
}
