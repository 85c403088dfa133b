//! The robot's command set.
//!
//! Each method builds one [`Command`] and sends it through
//! [`Client::execute`], so it returns only after the firmware has
//! acknowledged the command's last frame.

use sparki_proto::{Command, Opcode};
use tracing::trace;

use crate::{Client, Result};

impl Client {
    /// Clears the display buffer, then pushes it to the screen if `update`.
    pub async fn lcd_clear(&mut self, update: bool) -> Result<()> {
        self.execute(&Command::new(Opcode::LcdClear)).await?;
        if update {
            self.lcd_update().await?;
        }
        Ok(())
    }

    /// Pushes the display buffer to the screen.
    pub async fn lcd_update(&mut self) -> Result<()> {
        self.execute(&Command::new(Opcode::LcdUpdate)).await
    }

    /// Sets one pixel in the display buffer.
    pub async fn draw_pixel(&mut self, x: u32, y: u32) -> Result<()> {
        self.execute(&Command::new(Opcode::LcdDrawPixel).arg(x).arg(y)).await
    }

    /// Sets the RGB LED colour.
    pub async fn set_rgb_led(&mut self, red: u32, green: u32, blue: u32) -> Result<()> {
        self.execute(
            &Command::new(Opcode::SetRgbLed)
                .arg(red)
                .arg(green)
                .arg(blue),
        )
        .await
    }

    /// Sets the status LED brightness as a percentage (0 to 100).
    pub async fn set_status_led(&mut self, brightness: u32) -> Result<()> {
        self.execute(&Command::new(Opcode::SetStatusLed).arg(brightness)).await
    }

    /// Writes a digital level to a pin.
    ///
    /// The robot exposes no general-purpose pins: any pin drives the status
    /// LED fully on when `level > 0` and off otherwise.
    pub async fn digital_write(&mut self, pin: i32, level: i32) -> Result<()> {
        trace!(pin, level, "digital write mapped to status LED");
        self.set_status_led(if level > 0 { 100 } else { 0 }).await
    }

    /// Drives backward `cm` centimetres.
    pub async fn move_backward(&mut self, cm: f32) -> Result<()> {
        self.execute(&Command::new(Opcode::BackwardCm).arg(cm)).await
    }

    /// Drives forward `cm` centimetres.
    pub async fn move_forward(&mut self, cm: f32) -> Result<()> {
        self.execute(&Command::new(Opcode::ForwardCm).arg(cm)).await
    }

    /// Drives each wheel at its own speed for `secs` seconds.
    ///
    /// Speeds are wire-level values, ten times the power percentage. A
    /// negative `secs` starts the motors and returns without stopping them.
    pub async fn move_wheels(&mut self, left: i32, right: i32, secs: f32) -> Result<()> {
        self.execute(
            &Command::new(Opcode::Motors)
                .arg(left)
                .arg(right)
                .arg(secs),
        )
        .await
    }

    /// Stops both motors.
    pub async fn stop(&mut self) -> Result<()> {
        self.execute(&Command::new(Opcode::Stop)).await
    }

    /// Enables the gamepad input device.
    pub async fn enable_gamepad(&mut self) -> Result<()> {
        self.execute(&Command::new(Opcode::Gamepad)).await
    }

    /// Sends a no-op, useful as a liveness check.
    pub async fn noop(&mut self) -> Result<()> {
        self.execute(&Command::new(Opcode::Noop)).await
    }

    /// Sends the firmware's reserved invalid command.
    pub async fn send_bad_command(&mut self) -> Result<()> {
        self.execute(&Command::new(Opcode::BadCommand)).await
    }
}
