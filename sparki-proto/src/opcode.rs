//! Command opcodes understood by the myro firmware.

use std::fmt;

/// Frame terminator ("end of transmission block").
pub const ETB: u8 = 0x17;

/// Synchronous idle byte. Declared by the firmware, never sent by this crate.
pub const SYNC: u8 = 0x16;

/// First byte of every command, identifying the robot operation.
///
/// The firmware's catalogue assigns `0x65` to both "enable gamepad" and
/// "read accelerometer". Only [`Opcode::Gamepad`] is mapped here; there is
/// no accelerometer variant until the firmware documents which one owns
/// the byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
#[non_exhaustive]
pub enum Opcode {
    /// Clear the LCD buffer.
    LcdClear = 0x30,
    /// Draw a single pixel.
    LcdDrawPixel = 0x33,
    /// Draw a string at a position.
    LcdDrawString = 0x35,
    /// Print text at the cursor.
    LcdPrint = 0x36,
    /// Print text followed by a newline.
    LcdPrintLn = 0x37,
    /// Read back a pixel.
    LcdReadPixel = 0x38,
    /// Push the LCD buffer to the screen.
    LcdUpdate = 0x39,
    /// Differential drive: left speed, right speed, duration.
    Motors = 0x41,
    /// Drive backward a distance in centimetres.
    BackwardCm = 0x42,
    /// Drive forward a distance in centimetres.
    ForwardCm = 0x43,
    /// Ultrasonic range finder.
    Ping = 0x44,
    /// Receive an infrared code.
    ReceiveIr = 0x45,
    /// Send an infrared code.
    SendIr = 0x46,
    /// Position the head servo.
    Servo = 0x47,
    /// Set firmware debug verbosity.
    SetDebugLevel = 0x48,
    /// Set the RGB LED colour.
    SetRgbLed = 0x49,
    /// Set the status LED brightness.
    SetStatusLed = 0x4A,
    /// Stop all motors.
    Stop = 0x4B,
    /// Turn in place by an angle.
    TurnBy = 0x4C,
    /// Read the robot's stored name.
    GetName = 0x4F,
    /// Store a new robot name.
    SetName = 0x50,
    /// Read a byte of EEPROM.
    ReadEeprom = 0x51,
    /// Write a byte of EEPROM.
    WriteEeprom = 0x52,
    /// Set the LCD drawing colour.
    LcdSetColor = 0x54,
    /// Do nothing; still acknowledged.
    Noop = 0x5A,
    /// Deliberately invalid command, used to exercise firmware error paths.
    BadCommand = 0x5B,
    /// Sound the buzzer.
    Beep = 0x62,
    /// Read the compass heading.
    Compass = 0x63,
    /// Enable the gamepad input device. Shares `0x65` with the
    /// accelerometer read in the firmware catalogue.
    Gamepad = 0x65,
    /// Read the light sensors.
    GetLight = 0x6B,
    /// Read the line sensors.
    GetLine = 0x6D,
    /// Read the magnetometer.
    GetMag = 0x6F,
    /// Close the gripper.
    GripperClose = 0x76,
    /// Open the gripper.
    GripperOpen = 0x78,
    /// Stop the gripper.
    GripperStop = 0x79,
    /// Connection initialisation, sent once during the handshake.
    Init = 0x7A,
}

impl Opcode {
    /// Returns the wire byte for this opcode.
    pub const fn as_byte(self) -> u8 {
        self as u8
    }

    /// Looks up the opcode for a wire byte.
    pub const fn from_byte(byte: u8) -> Option<Self> {
        Some(match byte {
            0x30 => Self::LcdClear,
            0x33 => Self::LcdDrawPixel,
            0x35 => Self::LcdDrawString,
            0x36 => Self::LcdPrint,
            0x37 => Self::LcdPrintLn,
            0x38 => Self::LcdReadPixel,
            0x39 => Self::LcdUpdate,
            0x41 => Self::Motors,
            0x42 => Self::BackwardCm,
            0x43 => Self::ForwardCm,
            0x44 => Self::Ping,
            0x45 => Self::ReceiveIr,
            0x46 => Self::SendIr,
            0x47 => Self::Servo,
            0x48 => Self::SetDebugLevel,
            0x49 => Self::SetRgbLed,
            0x4A => Self::SetStatusLed,
            0x4B => Self::Stop,
            0x4C => Self::TurnBy,
            0x4F => Self::GetName,
            0x50 => Self::SetName,
            0x51 => Self::ReadEeprom,
            0x52 => Self::WriteEeprom,
            0x54 => Self::LcdSetColor,
            0x5A => Self::Noop,
            0x5B => Self::BadCommand,
            0x62 => Self::Beep,
            0x63 => Self::Compass,
            0x65 => Self::Gamepad,
            0x6B => Self::GetLight,
            0x6D => Self::GetLine,
            0x6F => Self::GetMag,
            0x76 => Self::GripperClose,
            0x78 => Self::GripperOpen,
            0x79 => Self::GripperStop,
            0x7A => Self::Init,
            _ => return None,
        })
    }
}

impl From<Opcode> for u8 {
    fn from(op: Opcode) -> Self {
        op.as_byte()
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?} (0x{:02X})", self.as_byte())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_lookup_is_inverse_of_as_byte() {
        for byte in 0..=u8::MAX {
            if let Some(op) = Opcode::from_byte(byte) {
                assert_eq!(op.as_byte(), byte);
            }
        }
    }

    #[test]
    fn terminators_are_not_opcodes() {
        assert!(Opcode::from_byte(ETB).is_none());
        assert!(Opcode::from_byte(SYNC).is_none());
    }

    #[test]
    fn shared_gamepad_byte_maps_to_gamepad() {
        assert_eq!(Opcode::from_byte(0x65), Some(Opcode::Gamepad));
    }

    #[test]
    fn display_includes_hex() {
        assert_eq!(Opcode::SetRgbLed.to_string(), "SetRgbLed (0x49)");
    }
}
