//! Low-power wake adapter.
//!
//! Keeps the set of buttons armed as wake sources and puts the chip into
//! deep sleep at the end of the power-off sequence.  The power button is
//! always armed; the start button only while the machine is on.  A wake
//! reboots the firmware, and `main` re-delivers the power press.

use core::sync::atomic::{AtomicU32, AtomicU8, Ordering};

use log::info;

use crate::app::ports::{ButtonMask, WakePort};
use crate::error::DriverError;
use crate::pins;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[derive(Debug)]
pub struct PowerAdapter {
    mask: AtomicU8,
    sleep_requests: AtomicU32,
}

impl Default for PowerAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl PowerAdapter {
    pub fn new() -> Self {
        Self {
            mask: AtomicU8::new(ButtonMask::POWER.0),
            sleep_requests: AtomicU32::new(0),
        }
    }

    pub fn button_mask(&self) -> ButtonMask {
        ButtonMask(self.mask.load(Ordering::SeqCst))
    }

    /// Deep-sleep entries requested so far (only observable off-target).
    pub fn sleep_requests(&self) -> u32 {
        self.sleep_requests.load(Ordering::SeqCst)
    }

    fn wake_pins(&self) -> u64 {
        let mask = self.button_mask();
        let mut pins_mask = 1u64 << pins::POWER_BUTTON_GPIO;
        if mask.contains(ButtonMask::START) {
            pins_mask |= 1u64 << pins::START_BUTTON_GPIO;
        }
        pins_mask
    }

    /// Whether this boot was caused by a wake button.
    #[cfg(target_os = "espidf")]
    pub fn woke_from_button() -> bool {
        // SAFETY: read-only query of the RTC wake cause register.
        let cause = unsafe { esp_sleep_get_wakeup_cause() };
        cause == esp_sleep_source_t_ESP_SLEEP_WAKEUP_EXT1
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn woke_from_button() -> bool {
        false
    }
}

impl WakePort for PowerAdapter {
    fn set_button_mask(&self, mask: ButtonMask) -> Result<(), DriverError> {
        // Power stays armed so the machine can always be switched back on.
        let bits = mask.0 | ButtonMask::POWER.0;
        self.mask.store(bits, Ordering::SeqCst);
        info!("power: wake mask=0b{:02b}", bits);
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    #[allow(unreachable_code)]
    fn enter_deep_sleep(&self) -> Result<(), DriverError> {
        // Only the power button may wake a switched-off machine.
        self.set_button_mask(ButtonMask::POWER)?;
        self.sleep_requests.fetch_add(1, Ordering::SeqCst);
        // SAFETY: the wake pins are RTC-capable inputs with external pulls;
        // deep sleep never returns, the chip reboots on wake.
        unsafe {
            let ret = esp_sleep_enable_ext1_wakeup(
                self.wake_pins(),
                esp_sleep_ext1_wakeup_mode_t_ESP_EXT1_WAKEUP_ALL_LOW,
            );
            if ret != ESP_OK {
                return Err(DriverError::SleepRejected(ret));
            }
            info!("power: entering deep sleep");
            esp_deep_sleep_start();
        }
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn enter_deep_sleep(&self) -> Result<(), DriverError> {
        self.set_button_mask(ButtonMask::POWER)?;
        self.sleep_requests.fetch_add(1, Ordering::SeqCst);
        info!("power(sim): deep sleep requested, wake pins=0x{:x}", self.wake_pins());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn power_button_always_armed() {
        let power = PowerAdapter::new();
        power.set_button_mask(ButtonMask::START).unwrap();
        assert_eq!(power.button_mask(), ButtonMask::POWER_AND_START);
        assert_eq!(
            power.wake_pins(),
            (1u64 << pins::POWER_BUTTON_GPIO) | (1u64 << pins::START_BUTTON_GPIO)
        );
    }

    #[test]
    fn sleep_disarms_start() {
        let power = PowerAdapter::new();
        power.set_button_mask(ButtonMask::POWER_AND_START).unwrap();
        power.enter_deep_sleep().unwrap();
        assert_eq!(power.button_mask(), ButtonMask::POWER);
        assert_eq!(power.sleep_requests(), 1);
    }
}
