//! Subcommands: one robot operation per invocation.

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Subcommand;
use sparki::Adaptor;
use tracing::info;

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Toggle the status LED until interrupted or `--count` toggles.
    Blink {
        /// Nominal pin; every pin maps to the status LED.
        #[arg(long, default_value = "13")]
        pin: String,
        /// Seconds between toggles.
        #[arg(long, default_value_t = 3.0)]
        interval: f64,
        /// Stop after this many toggles.
        #[arg(long)]
        count: Option<u32>,
    },

    /// Set the RGB LED colour.
    Rgb {
        red: u32,
        green: u32,
        blue: u32,
    },

    /// Set the status LED brightness (0-100).
    StatusLed {
        #[arg(value_parser = clap::value_parser!(u32).range(0..=100))]
        brightness: u32,
    },

    /// Drive forward a distance in centimetres.
    Forward {
        #[arg(value_parser = finite)]
        cm: f32,
    },

    /// Drive backward a distance in centimetres.
    Backward {
        #[arg(value_parser = finite)]
        cm: f32,
    },

    /// Drive each wheel at a power percentage for a number of seconds.
    ///
    /// A negative duration keeps the motors running after the command.
    #[command(allow_negative_numbers = true)]
    Move {
        #[arg(value_parser = finite)]
        left: f32,
        #[arg(value_parser = finite)]
        right: f32,
        #[arg(value_parser = finite)]
        secs: f32,
    },

    /// Stop the motors.
    Stop,

    /// Clear the display.
    Clear {
        /// Leave the screen showing the old buffer.
        #[arg(long)]
        no_update: bool,
    },

    /// Draw one pixel and refresh the display.
    Pixel { x: u32, y: u32 },

    /// Enable the gamepad input device.
    Gamepad,

    /// Send a no-op to check the link.
    Noop,
}

impl Command {
    pub(crate) async fn run(self, robot: &mut Adaptor) -> Result<()> {
        match self {
            Self::Blink {
                pin,
                interval,
                count,
            } => blink(robot, &pin, interval, count).await,
            Self::Rgb { red, green, blue } => {
                Ok(robot.client_mut().set_rgb_led(red, green, blue).await?)
            }
            Self::StatusLed { brightness } => {
                Ok(robot.client_mut().set_status_led(brightness).await?)
            }
            Self::Forward { cm } => Ok(robot.client_mut().move_forward(cm).await?),
            Self::Backward { cm } => Ok(robot.client_mut().move_backward(cm).await?),
            Self::Move { left, right, secs } => Ok(robot.move_wheels(left, right, secs).await?),
            Self::Stop => Ok(robot.client_mut().stop().await?),
            Self::Clear { no_update } => Ok(robot.client_mut().lcd_clear(!no_update).await?),
            Self::Pixel { x, y } => {
                let client = robot.client_mut();
                client.draw_pixel(x, y).await?;
                Ok(client.lcd_update().await?)
            }
            Self::Gamepad => Ok(robot.client_mut().enable_gamepad().await?),
            Self::Noop => Ok(robot.client_mut().noop().await?),
        }
    }
}

/// Parses a number the firmware can read: NaN and infinities are refused.
fn finite(s: &str) -> std::result::Result<f32, String> {
    match s.parse::<f32>() {
        Ok(v) if v.is_finite() => Ok(v),
        Ok(_) => Err(format!("{s} is not a finite number")),
        Err(e) => Err(e.to_string()),
    }
}

/// Toggles `pin` every `interval` seconds; Ctrl-C ends the loop cleanly.
async fn blink(robot: &mut Adaptor, pin: &str, interval: f64, count: Option<u32>) -> Result<()> {
    let interval = Duration::try_from_secs_f64(interval)
        .with_context(|| format!("invalid blink interval {interval}"))?;
    let mut ticker = tokio::time::interval(interval);
    let mut level = 0u8;
    let mut toggles = 0u32;

    loop {
        if count.is_some_and(|n| toggles >= n) {
            return Ok(());
        }
        tokio::select! {
            _ = ticker.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                return Ok(());
            }
        }
        level ^= 1;
        robot.digital_write(pin, level).await?;
        toggles += 1;
    }
}
