//! Port traits: the hexagonal boundary between the control plane and the
//! collaborators it drives.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ Manager / Executor / Motion (domain)
//! ```
//!
//! Every port is shared between tasks through an `Arc`, so methods take
//! `&self` and implementations synchronise internally.  Hardware-facing
//! methods return [`DriverError`]; what the caller does with a failure is
//! decided per path (the executor logs and drops, motor zeroing retries).

use crate::error::DriverError;

// ───────────────────────────────────────────────────────────────
// Motor port (domain → drum motor controller)
// ───────────────────────────────────────────────────────────────

/// Drum motor.  Velocity is in turns per second; negative is reverse.
pub trait MotorPort: Send + Sync {
    fn set_velocity(&self, turns_per_second: f32) -> Result<(), DriverError>;
}

/// `rpm → turns/s`.
pub fn rpm_to_tps(rpm: i32) -> f32 {
    rpm as f32 / 60.0
}

// ───────────────────────────────────────────────────────────────
// Output port (domain → pumps and LEDs)
// ───────────────────────────────────────────────────────────────

/// PWM channel, addressed by role rather than LEDC number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PwmChannel {
    Circulation,
    Drain,
    DrumLed,
    Fill,
}

/// Digital output, addressed by role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigitalPin {
    PowerLed,
    StartLed,
}

pub trait OutputPort: Send + Sync {
    /// Set a 12-bit duty (0..=4095); larger values are clamped.
    fn set_pwm(&self, channel: PwmChannel, duty: u16) -> Result<(), DriverError>;

    fn write_digital(&self, pin: DigitalPin, high: bool) -> Result<(), DriverError>;
}

// ───────────────────────────────────────────────────────────────
// Sound port
// ───────────────────────────────────────────────────────────────

/// Fire-and-forget sound cue trigger.
pub trait SoundPort: Send + Sync {
    fn play_effect(&self, effect_id: u8) -> Result<(), DriverError>;
}

// ───────────────────────────────────────────────────────────────
// Input / sensor ports (hardware → producers)
// ───────────────────────────────────────────────────────────────

/// Raw input levels, already normalised to "pressed" / "open".
pub trait InputPort: Send + Sync {
    fn power_pressed(&self) -> bool;
    fn start_pressed(&self) -> bool;
    fn door_open(&self) -> bool;
}

/// Vibration read-out.  `Some(magnitude_g)` when an imbalance is detected.
pub trait SensorPort: Send + Sync {
    fn imbalance(&self) -> Option<f32>;
}

// ───────────────────────────────────────────────────────────────
// Low-power wake port
// ───────────────────────────────────────────────────────────────

/// Buttons armed on the wake coprocessor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonMask(pub u8);

impl ButtonMask {
    pub const POWER: Self = Self(0x1);
    pub const START: Self = Self(0x2);
    pub const POWER_AND_START: Self = Self(0x3);

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

pub trait WakePort: Send + Sync {
    /// Choose which buttons the coprocessor watches.
    fn set_button_mask(&self, mask: ButtonMask) -> Result<(), DriverError>;

    /// Arm the coprocessor and enter deep sleep.  On hardware this does not
    /// return; wake-up reboots and re-delivers a power press.
    fn enter_deep_sleep(&self) -> Result<(), DriverError>;
}

// ───────────────────────────────────────────────────────────────
// UI port
// ───────────────────────────────────────────────────────────────

/// Menu controller hooks the manager calls before applying its own
/// start/stop semantics.
pub trait UiPort: Send + Sync {
    /// Returns `true` when the press was consumed by menu navigation.
    fn handle_start_press(&self) -> bool;
    fn handle_start_long_press(&self);
    fn handle_dial_delta(&self, delta: i32);
    fn show_logo(&self);
    fn reset(&self);
}
