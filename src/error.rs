//! Unified error types for the washer control plane.
//!
//! Every fallible hardware touch point returns a [`DriverError`]; the
//! configuration layer returns [`ConfigError`].  Both funnel into the
//! top-level [`Error`] so the boot path can report them uniformly.
//! All variants are `Copy` so they can be logged and counted from any
//! task without allocation.

use core::fmt;

use crate::drivers::hw_init::HwInitError;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A collaborator driver rejected a command.
    Driver(DriverError),
    /// Configuration is invalid or could not be parsed.
    Config(ConfigError),
    /// One-shot peripheral initialisation failed.
    Peripherals(HwInitError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Driver(e) => write!(f, "driver: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Peripherals(e) => write!(f, "peripherals: {e}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<HwInitError> for Error {
    fn from(e: HwInitError) -> Self {
        Self::Peripherals(e)
    }
}

// ---------------------------------------------------------------------------
// Driver errors
// ---------------------------------------------------------------------------

/// Failure reported by a motor, pump, LED, sound or wake driver.
///
/// The `i32` payload carries the ESP-IDF error code where the failing call
/// produced one (`0` on the host simulation).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverError {
    /// Motor controller did not accept a velocity command.
    MotorRejected(i32),
    /// LEDC duty write failed.
    PwmWriteFailed(i32),
    /// GPIO level write failed.
    GpioWriteFailed(i32),
    /// Sound engine could not queue the effect.
    SoundUnavailable,
    /// Wake coprocessor / deep-sleep request failed.
    SleepRejected(i32),
    /// Channel or pin number outside the board map.
    InvalidChannel(u8),
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MotorRejected(rc) => write!(f, "motor rejected command (rc={rc})"),
            Self::PwmWriteFailed(rc) => write!(f, "PWM write failed (rc={rc})"),
            Self::GpioWriteFailed(rc) => write!(f, "GPIO write failed (rc={rc})"),
            Self::SoundUnavailable => write!(f, "sound engine unavailable"),
            Self::SleepRejected(rc) => write!(f, "deep-sleep request rejected (rc={rc})"),
            Self::InvalidChannel(ch) => write!(f, "invalid channel {ch}"),
        }
    }
}

impl std::error::Error for DriverError {}

impl From<DriverError> for Error {
    fn from(e: DriverError) -> Self {
        Self::Driver(e)
    }
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// JSON could not be parsed into a [`WasherConfig`](crate::config::WasherConfig).
    Malformed,
    /// A field holds a value outside its accepted range.
    OutOfRange(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed => write!(f, "malformed config document"),
            Self::OutOfRange(field) => write!(f, "field '{field}' out of range"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

pub type Result<T> = core::result::Result<T, Error>;
