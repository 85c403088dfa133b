//! Error types for sparki operations.

use std::num::ParseIntError;
use std::time::Duration;

use sparki_proto::{Arg, Opcode};

/// Alias for `Result<T, sparki::Error>`.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by the sparki driver.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// `connect` was called on a client that is already connected.
    #[error("client is already connected")]
    AlreadyConnected,

    /// A command was issued before a transport was attached.
    #[error("client is not connected")]
    NotConnected,

    /// The firmware never answered the handshake.
    #[error(
        "handshake timed out after {0:?}; is the sparki-learning firmware flashed on the robot?"
    )]
    HandshakeTimeout(Duration),

    /// The transport failed while a command was on the wire.
    #[error("{opcode}: {source}")]
    Command {
        /// Opcode of the command that was being sent.
        opcode: Opcode,
        /// The underlying read or write failure.
        #[source]
        source: std::io::Error,
    },

    /// A command argument has no decimal form (a NaN or infinite float).
    #[error("{opcode}: argument {arg:?} is not a finite number")]
    InvalidArgument {
        /// Opcode of the rejected command.
        opcode: Opcode,
        /// The offending argument.
        arg: Arg,
    },

    /// A pin identifier was not a decimal integer.
    #[error("invalid pin {pin:?}")]
    InvalidPin {
        /// The identifier as given by the caller.
        pin: String,
        /// Why it did not parse.
        #[source]
        source: ParseIntError,
    },

    /// An I/O error from the handshake, port setup, or closing the link.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
