//! Control-plane configuration parameters
//!
//! All tunable timings for the washer tasks, the motion activity and the
//! power sequences.  Defaults match the production board; a JSON override
//! can be applied at boot via [`WasherConfig::from_json`].

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Slots in both the event and the command queue.
pub const QUEUE_DEPTH: usize = 32;

/// Upper bound on one motion sleep chunk; keeps cancellation latency bounded.
pub const MAX_MOTION_CHUNK_MS: u32 = 50;

/// Full-scale duty for the 12-bit LEDC channels.
pub const PWM_MAX: i32 = 4095;

/// Core control-plane configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WasherConfig {
    // --- Queues ---
    /// Producer-side wait before an event is dropped (ms)
    pub event_send_timeout_ms: u32,
    /// Manager-side wait before a command is dropped (ms)
    pub command_send_timeout_ms: u32,

    // --- Timing ---
    /// Period of the cycle tick (ms)
    pub tick_interval_ms: u32,
    /// I/O scanner poll period (ms)
    pub io_scan_interval_ms: u32,
    /// Consecutive equal door samples before a change is accepted
    pub door_debounce_samples: u8,
    /// Hold time before the start button reports a long press (ms)
    pub long_press_ms: u32,
    /// Vibration sampler period (ms)
    pub sensor_interval_ms: u32,
    /// Whether the vibration sampler task is spawned
    pub sensor_enabled: bool,
    /// Whether the serial console (dial and input injection) task is spawned
    pub console_enabled: bool,

    // --- Motion ---
    /// Bounded sleep chunk inside the motion activity (ms)
    pub motion_chunk_ms: u32,
    /// Fill valve on-time for a fill section (ms)
    pub fill_duration_ms: u32,
    /// Motor rest before a direction reversal (ms)
    pub reverse_pause_ms: u32,
    /// Attempts to command zero velocity on stop before escalating
    pub motor_stop_retries: u8,

    // --- Power sequences ---
    /// Pause between the power cue and the drum-light ramp (ms)
    pub power_sequence_delay_ms: u32,
    /// Drum-light duty increment per ramp step
    pub drum_ramp_step: u16,
    /// Delay between ramp steps (ms)
    pub drum_ramp_step_delay_ms: u32,
    /// Drum-light duty at the top of the ramp (0-4095)
    pub drum_light_max: u16,
}

impl Default for WasherConfig {
    fn default() -> Self {
        Self {
            // Queues
            event_send_timeout_ms: 20,
            command_send_timeout_ms: 50,

            // Timing
            tick_interval_ms: 1000, // 1 Hz
            io_scan_interval_ms: 50,
            door_debounce_samples: 10,
            long_press_ms: 2000,
            sensor_interval_ms: 500,
            sensor_enabled: true,
            console_enabled: true,

            // Motion
            motion_chunk_ms: MAX_MOTION_CHUNK_MS,
            fill_duration_ms: 10_000,
            reverse_pause_ms: 150,
            motor_stop_retries: 3,

            // Power sequences
            power_sequence_delay_ms: 1000,
            drum_ramp_step: 64,
            drum_ramp_step_delay_ms: 2,
            drum_light_max: 3072,
        }
    }
}

impl WasherConfig {
    /// Parse a JSON override and validate it.  Missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let cfg: Self = serde_json::from_str(json).map_err(|_| ConfigError::Malformed)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject values that would stall a task or exceed hardware limits.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::OutOfRange("tick_interval_ms"));
        }
        if self.io_scan_interval_ms == 0 {
            return Err(ConfigError::OutOfRange("io_scan_interval_ms"));
        }
        if self.sensor_interval_ms == 0 {
            return Err(ConfigError::OutOfRange("sensor_interval_ms"));
        }
        if self.motion_chunk_ms == 0 || self.motion_chunk_ms > MAX_MOTION_CHUNK_MS {
            return Err(ConfigError::OutOfRange("motion_chunk_ms"));
        }
        if self.door_debounce_samples == 0 {
            return Err(ConfigError::OutOfRange("door_debounce_samples"));
        }
        if self.motor_stop_retries == 0 {
            return Err(ConfigError::OutOfRange("motor_stop_retries"));
        }
        if self.drum_ramp_step == 0 {
            return Err(ConfigError::OutOfRange("drum_ramp_step"));
        }
        if i32::from(self.drum_light_max) > PWM_MAX {
            return Err(ConfigError::OutOfRange("drum_light_max"));
        }
        Ok(())
    }
}
