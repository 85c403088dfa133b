//! A command: one opcode plus its argument tokens.

use crate::{Arg, Opcode};

/// A robot command ready to be framed.
///
/// Built per call and never persisted:
///
/// ```
/// use sparki_proto::{Command, Opcode};
///
/// let cmd = Command::new(Opcode::SetRgbLed).arg(10_u32).arg(20_u32).arg(30_u32);
/// assert_eq!(cmd.frame_count(), 4);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    /// Operation selector.
    opcode: Opcode,
    /// Arguments in wire order.
    args: Vec<Arg>,
}

impl Command {
    /// Creates a command with no arguments.
    pub const fn new(opcode: Opcode) -> Self {
        Self {
            opcode,
            args: Vec::new(),
        }
    }

    /// Appends an argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<Arg>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// The operation selector.
    pub const fn opcode(&self) -> Opcode {
        self.opcode
    }

    /// The arguments, in wire order.
    pub fn args(&self) -> &[Arg] {
        &self.args
    }

    /// Number of frames this command occupies on the wire.
    pub fn frame_count(&self) -> usize {
        1 + self.args.len()
    }

    /// Frame payloads in wire order: the opcode byte, then each argument.
    pub fn frames(&self) -> Vec<Vec<u8>> {
        std::iter::once(vec![self.opcode.as_byte()])
            .chain(self.args.iter().map(Arg::encode))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_follow_argument_order() {
        let cmd = Command::new(Opcode::Motors)
            .arg(55_i32)
            .arg(-30_i32)
            .arg(2.5_f32);
        assert_eq!(
            cmd.frames(),
            vec![vec![0x41], b"55".to_vec(), b"-30".to_vec(), b"2.5".to_vec()]
        );
    }

    #[test]
    fn bare_opcode_is_one_frame() {
        let cmd = Command::new(Opcode::Stop);
        assert_eq!(cmd.frame_count(), 1);
        assert_eq!(cmd.frames(), vec![vec![Opcode::Stop.as_byte()]]);
    }
}
