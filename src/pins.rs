//! GPIO / peripheral pin assignments for the washer main board.
//!
//! Single source of truth: every driver references this module rather than
//! hard-coding pin numbers.

// ---------------------------------------------------------------------------
// Water path (LEDC PWM, 12-bit)
// ---------------------------------------------------------------------------

/// Circulation pump MOSFET gate.
pub const CIRCULATION_PUMP_GPIO: i32 = 15;
/// Drain pump MOSFET gate.
pub const DRAIN_PUMP_GPIO: i32 = 27;
/// Fill valve / pump MOSFET gate.
pub const FILL_PUMP_GPIO: i32 = 12;

// ---------------------------------------------------------------------------
// Lighting
// ---------------------------------------------------------------------------

/// Drum illumination LED strip (PWM-dimmed).
pub const DRUM_LED_GPIO: i32 = 13;
/// Start/stop button ring LED. Digital output, HIGH = lit.
pub const START_STOP_LED_GPIO: i32 = 14;
/// Power button LED. Digital output, HIGH = lit.
pub const POWER_LED_GPIO: i32 = 26;

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// Power button, active-low with internal pull-up.  Also the deep-sleep
/// wake source watched by the low-power coprocessor.
pub const POWER_BUTTON_GPIO: i32 = 33;
/// Start/stop button, active-low with internal pull-up.
pub const START_BUTTON_GPIO: i32 = 32;
/// Door reed switch. HIGH = door open.
pub const DOOR_SENSOR_GPIO: i32 = 34;

// ---------------------------------------------------------------------------
// LEDC configuration
// ---------------------------------------------------------------------------

/// Shared PWM frequency for pumps and drum LED.
pub const LEDC_FREQUENCY_HZ: u32 = 19_500;

/// LEDC channel assignments.
pub const LEDC_CH_CIRCULATION: u8 = 0;
pub const LEDC_CH_DRAIN: u8 = 1;
pub const LEDC_CH_DRUM_LED: u8 = 2;
pub const LEDC_CH_FILL: u8 = 3;

/// Number of LEDC channels in use.
pub const LEDC_CHANNELS: usize = 4;
