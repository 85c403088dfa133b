//! Wire protocol for the Sparki robot's myro command firmware.
//!
//! Every command is an [`Opcode`] byte followed by zero or more decimal
//! ASCII argument tokens. Each opcode or token travels in its own frame,
//! terminated by [`ETB`]. The last frame of a command is sent
//! synchronously: the firmware answers it with a single acknowledgment
//! byte, so at most one command is ever in flight.

mod codec;
mod command;
mod opcode;
mod token;

pub use codec::{read_ack, receive, send, transmit, transmit_sync};
pub use command::Command;
pub use opcode::{ETB, Opcode, SYNC};
pub use token::Arg;
