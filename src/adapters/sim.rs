//! Stand-ins for the collaborators that live outside the control plane:
//! the drum motor controller, the sound engine and the vibration sensor.
//!
//! Each honours its port contract and logs what the real peripheral would
//! have done.  The motor stand-in also reports the commanded speed back
//! into the state store as the measured speed.

use core::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use log::{debug, info};

use crate::app::ports::{MotorPort, SensorPort, SoundPort};
use crate::error::DriverError;
use crate::events::SoundEffect;
use crate::state::MachineStateStore;

// ── Motor ─────────────────────────────────────────────────────

pub struct SimMotor {
    store: Arc<MachineStateStore>,
    /// Last commanded velocity, as `f32` bits.
    velocity_bits: AtomicU32,
}

impl SimMotor {
    pub fn new(store: Arc<MachineStateStore>) -> Self {
        Self {
            store,
            velocity_bits: AtomicU32::new(0f32.to_bits()),
        }
    }

    /// Last commanded velocity in turns per second.
    pub fn velocity(&self) -> f32 {
        f32::from_bits(self.velocity_bits.load(Ordering::Relaxed))
    }
}

impl MotorPort for SimMotor {
    fn set_velocity(&self, turns_per_second: f32) -> Result<(), DriverError> {
        if !turns_per_second.is_finite() {
            return Err(DriverError::MotorRejected(0));
        }
        let previous = self.velocity_bits.swap(turns_per_second.to_bits(), Ordering::Relaxed);
        if previous != turns_per_second.to_bits() {
            debug!("motor: {:.2} turns/s", turns_per_second);
        }
        self.store.set_current_rpm((turns_per_second * 60.0).abs());
        Ok(())
    }
}

// ── Sound ─────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct SimSound {
    played: AtomicU32,
}

impl SimSound {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn played(&self) -> u32 {
        self.played.load(Ordering::Relaxed)
    }
}

impl SoundPort for SimSound {
    fn play_effect(&self, effect_id: u8) -> Result<(), DriverError> {
        let effect = SoundEffect::from_id(i32::from(effect_id)).ok_or(DriverError::SoundUnavailable)?;
        self.played.fetch_add(1, Ordering::Relaxed);
        info!("sound: {:?}", effect);
        Ok(())
    }
}

// ── Vibration sensor ──────────────────────────────────────────

/// Reports an imbalance once per injected reading.
#[derive(Debug, Default)]
pub struct SimVibration {
    /// Pending magnitude in milli-g; zero means nothing pending.
    pending_milli_g: AtomicU32,
}

impl SimVibration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inject(&self, magnitude_g: f32) {
        let milli = (magnitude_g.max(0.0) * 1000.0) as u32;
        self.pending_milli_g.store(milli, Ordering::Relaxed);
    }
}

impl SensorPort for SimVibration {
    fn imbalance(&self) -> Option<f32> {
        match self.pending_milli_g.swap(0, Ordering::Relaxed) {
            0 => None,
            milli => Some(milli as f32 / 1000.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn motor_mirrors_speed() {
        let store = Arc::new(MachineStateStore::new());
        let motor = SimMotor::new(store.clone());
        motor.set_velocity(-1.0).unwrap();
        assert!((motor.velocity() + 1.0).abs() < f32::EPSILON);
        assert!((store.current_rpm() - 60.0).abs() < 1e-3);
        assert!(motor.set_velocity(f32::NAN).is_err());
    }

    #[test]
    fn unknown_sound_is_rejected() {
        let sound = SimSound::new();
        assert!(sound.play_effect(SoundEffect::CycleEnd as u8).is_ok());
        assert_eq!(sound.play_effect(200), Err(DriverError::SoundUnavailable));
        assert_eq!(sound.played(), 1);
    }

    #[test]
    fn injected_imbalance_reported_once() {
        let sensor = SimVibration::new();
        assert_eq!(sensor.imbalance(), None);
        sensor.inject(1.25);
        assert_eq!(sensor.imbalance(), Some(1.25));
        assert_eq!(sensor.imbalance(), None);
    }
}
