//! Async driver for the Sparki wheeled robot.
//!
//! `sparki` speaks the myro command protocol of the sparki-learning
//! firmware over any duplex byte stream, normally a 57600 baud serial
//! link. Commands are framed by [`sparki_proto`] and strictly serialized:
//! each one returns only after the firmware acknowledges it.
//!
//! # Quick start
//!
//! ```no_run
//! use sparki::Client;
//!
//! # async fn demo() -> sparki::Result<()> {
//! let link = sparki::serial::open("/dev/ttyACM0", sparki::serial::DEFAULT_BAUD_RATE)?;
//! let mut robot = Client::new();
//! robot.connect(link).await?;
//!
//! robot.set_rgb_led(0, 100, 0).await?;
//! robot.move_forward(10.0).await?;
//!
//! // Stops the motors and clears the LEDs and display before closing.
//! robot.disconnect().await
//! # }
//! ```

mod adaptor;
mod client;
mod commands;
mod error;
pub mod serial;
mod virtual_stream;

pub use adaptor::{Adaptor, PortOpener};
pub use client::{Client, ConnectionState, DEFAULT_HANDSHAKE_TIMEOUT, Transport};
pub use error::{Error, Result};
pub use sparki_proto::{Arg, Command, Opcode};
pub use virtual_stream::VirtualStream;
