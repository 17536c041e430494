//! One-shot peripheral initialization and raw pin access.
//!
//! Configures GPIO directions and the LEDC timer/channels using raw
//! ESP-IDF sys calls.  Called once from `main()` before any task starts.
//!
//! On the host every access goes to an in-memory pin map instead, so the
//! adapters above this layer run unchanged in simulation and tests.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

use crate::error::DriverError;
#[cfg(target_os = "espidf")]
use crate::pins;

// ── Error type ────────────────────────────────────────────────

/// Errors during one-shot peripheral initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    GpioConfigFailed(i32),
    LedcTimerFailed(i32),
    LedcChannelFailed(i32),
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::GpioConfigFailed(rc)  => write!(f, "GPIO config failed (rc={})", rc),
            Self::LedcTimerFailed(rc)   => write!(f, "LEDC timer config failed (rc={})", rc),
            Self::LedcChannelFailed(rc) => write!(f, "LEDC channel config failed (rc={})", rc),
        }
    }
}

impl std::error::Error for HwInitError {}

#[cfg(target_os = "espidf")]
use log::info;

#[cfg(target_os = "espidf")]
pub fn init_peripherals() -> Result<(), HwInitError> {
    // SAFETY: Called once from main() before any task is spawned.
    unsafe {
        init_gpio_inputs()?;
        init_gpio_outputs()?;
        init_ledc()?;
    }
    info!("hw_init: all peripherals configured");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_peripherals() -> Result<(), HwInitError> {
    sim::reset();
    log::info!("hw_init(sim): peripheral init skipped");
    Ok(())
}

// ── GPIO Inputs ───────────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe fn init_gpio_inputs() -> Result<(), HwInitError> {
    let buttons = (1u64 << pins::POWER_BUTTON_GPIO) | (1u64 << pins::START_BUTTON_GPIO);
    let btn_cfg = gpio_config_t {
        pin_bit_mask: buttons,
        mode: gpio_mode_t_GPIO_MODE_INPUT,
        pull_up_en: gpio_pullup_t_GPIO_PULLUP_ENABLE,
        pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
        intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
    };
    let ret = unsafe { gpio_config(&btn_cfg) };
    if ret != ESP_OK { return Err(HwInitError::GpioConfigFailed(ret)); }

    // GPIO34 is input-only without internal pulls; the reed switch has an
    // external resistor.
    let door_cfg = gpio_config_t {
        pin_bit_mask: 1u64 << pins::DOOR_SENSOR_GPIO,
        mode: gpio_mode_t_GPIO_MODE_INPUT,
        pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
        pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
        intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
    };
    let ret = unsafe { gpio_config(&door_cfg) };
    if ret != ESP_OK { return Err(HwInitError::GpioConfigFailed(ret)); }

    info!("hw_init: GPIO inputs configured");
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn gpio_read(pin: i32) -> bool {
    // SAFETY: read-only register access on an already-configured input pin.
    (unsafe { gpio_get_level(pin) }) != 0
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_read(pin: i32) -> bool {
    sim::level(pin)
}

// ── GPIO Outputs ──────────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe fn init_gpio_outputs() -> Result<(), HwInitError> {
    for &pin in &[pins::POWER_LED_GPIO, pins::START_STOP_LED_GPIO] {
        let cfg = gpio_config_t {
            pin_bit_mask: 1u64 << pin,
            mode: gpio_mode_t_GPIO_MODE_OUTPUT,
            pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
            pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
            intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
        };
        let ret = unsafe { gpio_config(&cfg) };
        if ret != ESP_OK { return Err(HwInitError::GpioConfigFailed(ret)); }
        unsafe { gpio_set_level(pin, 0) };
    }

    info!("hw_init: GPIO outputs configured");
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn gpio_write(pin: i32, high: bool) -> Result<(), DriverError> {
    // SAFETY: pin was configured as an output in init_gpio_outputs();
    // only the actuator executor drives these pins.
    let ret = unsafe { gpio_set_level(pin, u32::from(high)) };
    if ret != ESP_OK {
        return Err(DriverError::GpioWriteFailed(ret));
    }
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_write(pin: i32, high: bool) -> Result<(), DriverError> {
    sim::set_level(pin, high)
}

// ── LEDC PWM ─────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe fn init_ledc() -> Result<(), HwInitError> {
    // Timer 0: pumps + drum LED (19.5 kHz, 12-bit)
    let timer0 = ledc_timer_config_t {
        speed_mode: ledc_mode_t_LEDC_LOW_SPEED_MODE,
        timer_num: ledc_timer_t_LEDC_TIMER_0,
        duty_resolution: ledc_timer_bit_t_LEDC_TIMER_12_BIT,
        freq_hz: pins::LEDC_FREQUENCY_HZ,
        clk_cfg: soc_periph_ledc_clk_src_legacy_t_LEDC_AUTO_CLK,
        ..Default::default()
    };
    let ret = unsafe { ledc_timer_config(&timer0) };
    if ret != ESP_OK { return Err(HwInitError::LedcTimerFailed(ret)); }

    let channels = [
        (pins::CIRCULATION_PUMP_GPIO, pins::LEDC_CH_CIRCULATION),
        (pins::DRAIN_PUMP_GPIO, pins::LEDC_CH_DRAIN),
        (pins::DRUM_LED_GPIO, pins::LEDC_CH_DRUM_LED),
        (pins::FILL_PUMP_GPIO, pins::LEDC_CH_FILL),
    ];
    for (gpio, channel) in channels {
        let ret = unsafe { ledc_channel_config(&ledc_channel_config_t {
            speed_mode: ledc_mode_t_LEDC_LOW_SPEED_MODE,
            channel: u32::from(channel),
            timer_sel: ledc_timer_t_LEDC_TIMER_0,
            gpio_num: gpio,
            duty: 0,
            hpoint: 0,
            ..Default::default()
        }) };
        if ret != ESP_OK { return Err(HwInitError::LedcChannelFailed(ret)); }
    }

    info!("hw_init: LEDC configured (circ=CH0, drain=CH1, drum=CH2, fill=CH3)");
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn ledc_set(channel: u8, duty: u16) -> Result<(), DriverError> {
    if usize::from(channel) >= pins::LEDC_CHANNELS {
        return Err(DriverError::InvalidChannel(channel));
    }
    // SAFETY: channels were configured in init_ledc(); duty and update
    // registers are per-channel.
    unsafe {
        let ret = ledc_set_duty(ledc_mode_t_LEDC_LOW_SPEED_MODE, u32::from(channel), u32::from(duty));
        if ret != ESP_OK {
            return Err(DriverError::PwmWriteFailed(ret));
        }
        let ret = ledc_update_duty(ledc_mode_t_LEDC_LOW_SPEED_MODE, u32::from(channel));
        if ret != ESP_OK {
            return Err(DriverError::PwmWriteFailed(ret));
        }
    }
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn ledc_set(channel: u8, duty: u16) -> Result<(), DriverError> {
    sim::set_duty(channel, duty)
}

// ── Host pin map ──────────────────────────────────────────────

/// In-memory pin map standing in for the GPIO matrix and LEDC on the host.
#[cfg(not(target_os = "espidf"))]
pub mod sim {
    use core::sync::atomic::{AtomicBool, AtomicU16, Ordering};

    use crate::error::DriverError;
    use crate::pins;

    const GPIO_COUNT: usize = 49;

    static LEVELS: [AtomicBool; GPIO_COUNT] = [const { AtomicBool::new(false) }; GPIO_COUNT];
    static DUTIES: [AtomicU16; pins::LEDC_CHANNELS] = [const { AtomicU16::new(0) }; pins::LEDC_CHANNELS];

    fn slot(pin: i32) -> Option<&'static AtomicBool> {
        usize::try_from(pin).ok().and_then(|p| LEVELS.get(p))
    }

    /// Idle levels: buttons released (pulled high), door closed, outputs low.
    pub fn reset() {
        for l in &LEVELS {
            l.store(false, Ordering::SeqCst);
        }
        for d in &DUTIES {
            d.store(0, Ordering::SeqCst);
        }
        set_input(pins::POWER_BUTTON_GPIO, true);
        set_input(pins::START_BUTTON_GPIO, true);
    }

    pub fn level(pin: i32) -> bool {
        slot(pin).is_some_and(|l| l.load(Ordering::SeqCst))
    }

    pub fn set_level(pin: i32, high: bool) -> Result<(), DriverError> {
        let l = slot(pin).ok_or(DriverError::GpioWriteFailed(-1))?;
        l.store(high, Ordering::SeqCst);
        Ok(())
    }

    /// Drive an input pin from a test or simulation harness.
    pub fn set_input(pin: i32, high: bool) {
        if let Some(l) = slot(pin) {
            l.store(high, Ordering::SeqCst);
        }
    }

    pub fn duty(channel: u8) -> u16 {
        DUTIES.get(usize::from(channel)).map_or(0, |d| d.load(Ordering::SeqCst))
    }

    pub fn set_duty(channel: u8, duty: u16) -> Result<(), DriverError> {
        let d = DUTIES
            .get(usize::from(channel))
            .ok_or(DriverError::InvalidChannel(channel))?;
        d.store(duty, Ordering::SeqCst);
        Ok(())
    }
}
