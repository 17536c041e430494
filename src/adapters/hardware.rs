//! Hardware adapter: bridges the board's GPIO and LEDC channels to the
//! domain port traits.
//!
//! Implements [`OutputPort`] (pumps, drum light, button LEDs) and
//! [`InputPort`] (buttons, door switch) on top of `drivers::hw_init`.
//! On non-espidf targets the same calls land in the in-memory pin map, so
//! this adapter runs unchanged in simulation and tests.

use crate::app::ports::{DigitalPin, InputPort, OutputPort, PwmChannel};
use crate::config::PWM_MAX;
use crate::drivers::hw_init;
use crate::error::DriverError;
use crate::pins;

/// Stateless handle onto the board I/O.  Safe to share between tasks:
/// each LEDC channel and output pin has exactly one writer.
#[derive(Debug, Clone, Copy, Default)]
pub struct HardwareAdapter;

impl HardwareAdapter {
    pub fn new() -> Self {
        Self
    }
}

fn ledc_channel(channel: PwmChannel) -> u8 {
    match channel {
        PwmChannel::Circulation => pins::LEDC_CH_CIRCULATION,
        PwmChannel::Drain => pins::LEDC_CH_DRAIN,
        PwmChannel::DrumLed => pins::LEDC_CH_DRUM_LED,
        PwmChannel::Fill => pins::LEDC_CH_FILL,
    }
}

fn output_gpio(pin: DigitalPin) -> i32 {
    match pin {
        DigitalPin::PowerLed => pins::POWER_LED_GPIO,
        DigitalPin::StartLed => pins::START_STOP_LED_GPIO,
    }
}

// ── OutputPort implementation ─────────────────────────────────

impl OutputPort for HardwareAdapter {
    fn set_pwm(&self, channel: PwmChannel, duty: u16) -> Result<(), DriverError> {
        hw_init::ledc_set(ledc_channel(channel), duty.min(PWM_MAX as u16))
    }

    fn write_digital(&self, pin: DigitalPin, high: bool) -> Result<(), DriverError> {
        hw_init::gpio_write(output_gpio(pin), high)
    }
}

// ── InputPort implementation ──────────────────────────────────

impl InputPort for HardwareAdapter {
    fn power_pressed(&self) -> bool {
        !hw_init::gpio_read(pins::POWER_BUTTON_GPIO)
    }

    fn start_pressed(&self) -> bool {
        !hw_init::gpio_read(pins::START_BUTTON_GPIO)
    }

    fn door_open(&self) -> bool {
        hw_init::gpio_read(pins::DOOR_SENSOR_GPIO)
    }
}
