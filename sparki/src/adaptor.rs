//! Host-facing facade: opens the link and adapts generic device calls.

use std::fmt;
use std::io;
use std::time::Duration;

use sparki_proto::{Arg, Opcode};

use crate::serial::{self, DEFAULT_BAUD_RATE};
use crate::{Client, Error, Result, Transport};

/// Opens a transport for a port name and baud rate.
pub type PortOpener = Box<dyn Fn(&str, u32) -> io::Result<Box<dyn Transport>> + Send + Sync>;

/// Connection to one robot, addressed by serial port or by a ready stream.
///
/// ```no_run
/// # async fn demo() -> sparki::Result<()> {
/// let mut robot = sparki::Adaptor::new("/dev/ttyACM0");
/// robot.connect().await?;
/// robot.digital_write("13", 1).await?;
/// robot.finalize().await
/// # }
/// ```
pub struct Adaptor {
    /// Display name.
    name: String,
    /// Port path, or a label when a stream was supplied.
    port: String,
    /// Baud rate used by the opener.
    baud_rate: u32,
    /// Stream supplied up front; consumed by the first connect.
    conn: Option<Box<dyn Transport>>,
    /// Opens `port` when no stream was supplied.
    opener: PortOpener,
    /// The protocol driver.
    client: Client,
}

impl Adaptor {
    /// Creates an adaptor that opens `port` as a serial device on connect.
    pub fn new(port: impl Into<String>) -> Self {
        Self {
            name: "Sparki".to_owned(),
            port: port.into(),
            baud_rate: DEFAULT_BAUD_RATE,
            conn: None,
            opener: Box::new(open_serial),
            client: Client::new(),
        }
    }

    /// Creates an adaptor over an already-open stream. `label` is only
    /// reported by [`Adaptor::port`].
    pub fn with_stream(label: impl Into<String>, stream: impl Transport + 'static) -> Self {
        let mut adaptor = Self::new(label);
        adaptor.conn = Some(Box::new(stream));
        adaptor
    }

    /// Sets the baud rate used when opening the port.
    #[must_use]
    pub const fn baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    /// Sets the handshake timeout.
    #[must_use]
    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.client.set_handshake_timeout(timeout);
        self
    }

    /// Replaces the function that opens the port.
    #[must_use]
    pub fn port_opener(
        mut self,
        opener: impl Fn(&str, u32) -> io::Result<Box<dyn Transport>> + Send + Sync + 'static,
    ) -> Self {
        self.opener = Box::new(opener);
        self
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Renames the adaptor.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Port path or stream label.
    pub fn port(&self) -> &str {
        &self.port
    }

    /// The underlying driver.
    pub const fn client(&self) -> &Client {
        &self.client
    }

    /// The underlying driver, for the full command set.
    pub const fn client_mut(&mut self) -> &mut Client {
        &mut self.client
    }

    /// Opens the port if needed and runs the handshake.
    pub async fn connect(&mut self) -> Result<()> {
        if self.client.is_connected() {
            return Err(Error::AlreadyConnected);
        }
        let conn = match self.conn.take() {
            Some(conn) => conn,
            None => (self.opener)(&self.port, self.baud_rate)?,
        };
        self.client.connect(conn).await
    }

    /// Halts the robot and closes the link.
    pub async fn disconnect(&mut self) -> Result<()> {
        self.client.disconnect().await
    }

    /// Tears the adaptor down; same as [`Adaptor::disconnect`].
    pub async fn finalize(&mut self) -> Result<()> {
        self.disconnect().await
    }

    /// Writes `level` to `pin`, given as a decimal string.
    pub async fn digital_write(&mut self, pin: &str, level: u8) -> Result<()> {
        let pin_no = pin.parse::<i32>().map_err(|source| Error::InvalidPin {
            pin: pin.to_owned(),
            source,
        })?;
        self.client.digital_write(pin_no, i32::from(level)).await
    }

    /// Drives the wheels at `left` and `right` percent power for `secs`
    /// seconds. Percentages are sent as tenths, truncated (5.5 → 55).
    /// A NaN or infinite percentage is rejected before any I/O.
    #[allow(clippy::cast_possible_truncation)]
    pub async fn move_wheels(&mut self, left: f32, right: f32, secs: f32) -> Result<()> {
        if let Some(power) = [left, right].into_iter().find(|p| !p.is_finite()) {
            return Err(Error::InvalidArgument {
                opcode: Opcode::Motors,
                arg: Arg::Float(power),
            });
        }
        let (left, right) = ((left * 10.0) as i32, (right * 10.0) as i32);
        self.client.move_wheels(left, right, secs).await
    }
}

/// Default opener: a serial device at the given baud rate.
fn open_serial(port: &str, baud_rate: u32) -> io::Result<Box<dyn Transport>> {
    let link = serial::open(port, baud_rate)?;
    Ok(Box::new(link))
}

impl fmt::Debug for Adaptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Adaptor")
            .field("name", &self.name)
            .field("port", &self.port)
            .field("baud_rate", &self.baud_rate)
            .field("client", &self.client)
            .finish_non_exhaustive()
    }
}
