//! Actuator executor: the command sink.
//!
//! Dequeues one [`Command`] at a time and performs exactly one side effect:
//! an LED level, a pump or drum-light duty, a sound cue, or the logo flag
//! mirrored into the state store.  Driver failures are logged and
//! dropped; the manager never learns about them.

use std::sync::Arc;

use log::{debug, warn};

use crate::config::PWM_MAX;
use crate::events::{Command, CommandKind, CommandQueue};
use crate::error::DriverError;
use crate::state::MachineStateStore;

use super::ports::{DigitalPin, OutputPort, PwmChannel, SoundPort};

pub struct ActuatorExecutor {
    outputs: Arc<dyn OutputPort>,
    sound: Arc<dyn SoundPort>,
    store: Arc<MachineStateStore>,
    executed: u32,
    failed: u32,
}

impl ActuatorExecutor {
    pub fn new(
        outputs: Arc<dyn OutputPort>,
        sound: Arc<dyn SoundPort>,
        store: Arc<MachineStateStore>,
    ) -> Self {
        Self {
            outputs,
            sound,
            store,
            executed: 0,
            failed: 0,
        }
    }

    /// Apply one command.
    pub fn handle(&mut self, cmd: Command) {
        self.executed = self.executed.wrapping_add(1);
        if let Err(e) = self.apply(cmd) {
            self.failed = self.failed.wrapping_add(1);
            warn!("executor: {:?}({}) failed: {}", cmd.kind, cmd.arg0, e);
        }
    }

    fn apply(&self, cmd: Command) -> Result<(), DriverError> {
        let on = cmd.arg0 != 0;
        match cmd.kind {
            CommandKind::SetPowerLed => {
                self.outputs.write_digital(DigitalPin::PowerLed, on)?;
                self.store.set_power_led(on);
            }
            CommandKind::SetStartLed => {
                self.outputs.write_digital(DigitalPin::StartLed, on)?;
                self.store.set_start_led(on);
            }
            CommandKind::SetDrumLed => self.outputs.set_pwm(PwmChannel::DrumLed, duty(cmd.arg0))?,
            CommandKind::PlaySound => {
                let id = u8::try_from(cmd.arg0).map_err(|_| DriverError::SoundUnavailable)?;
                self.sound.play_effect(id)?;
            }
            CommandKind::SetLogoEnable => self.store.set_logo_enabled(on),
            CommandKind::SetCircPumpPwm => {
                self.outputs.set_pwm(PwmChannel::Circulation, duty(cmd.arg0))?;
            }
            CommandKind::SetFillPumpPwm => self.outputs.set_pwm(PwmChannel::Fill, duty(cmd.arg0))?,
            CommandKind::SetDrainPumpPwm => self.outputs.set_pwm(PwmChannel::Drain, duty(cmd.arg0))?,
        }
        debug!("executor: {:?}({})", cmd.kind, cmd.arg0);
        Ok(())
    }

    /// Commands handled so far.
    pub fn executed(&self) -> u32 {
        self.executed
    }

    /// Commands whose driver call failed.
    pub fn failed(&self) -> u32 {
        self.failed
    }

    /// Consume `queue` forever.
    pub fn run(mut self, queue: &CommandQueue) {
        loop {
            let cmd = queue.receive();
            self.handle(cmd);
        }
    }
}

fn duty(raw: i32) -> u16 {
    raw.clamp(0, PWM_MAX) as u16
}
