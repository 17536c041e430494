//! System manager: the cycle state machine.
//!
//! Single consumer of the event queue, sole writer of the cycle-level
//! fields of the state store (power, running, stage, ETA) and sole owner of
//! the motion activity.  States are implicit in the store (`is_powered`,
//! `is_running`) and in the presence of a plan:
//!
//! ```text
//!            PowerButton                    StartButton (door closed)
//!   ┌─────┐ ───────────▶ ┌──────────────┐ ──────────────▶ ┌─────────┐
//!   │ Off │              │ On · idle    │                 │ Running │
//!   └─────┘ ◀─────────── └──────────────┘ ◀────────────── └─────────┘
//!            PowerButton     ▲              StartButton / door open
//!                            └──── last section done (Complete) ──┘
//! ```
//!
//! The manager never drives LEDs or sound itself: it enqueues commands for
//! the actuator executor.  The only direct hardware contact is the motor
//! and pump zeroing performed by the motion supervisor on stop.

use core::time::Duration;
use std::sync::Arc;

use log::{error, info, warn};

use crate::config::WasherConfig;
use crate::error::DriverError;
use crate::events::{Command, CommandKind, CommandQueue, Event, EventKind, EventQueue, SoundEffect};
use crate::motion::{MotionClock, MotionSupervisor};
use crate::plan::{self, WashPlan};
use crate::state::MachineStateStore;

use super::ports::{ButtonMask, UiPort, WakePort};

const COMPLETE_LABEL: &str = "Complete";

/// Collaborators the manager talks to, besides its motion supervisor.
#[derive(Clone)]
pub struct ManagerPorts {
    pub store: Arc<MachineStateStore>,
    pub commands: Arc<CommandQueue>,
    pub ui: Arc<dyn UiPort>,
    pub wake: Arc<dyn WakePort>,
}

pub struct SystemManager<C> {
    store: Arc<MachineStateStore>,
    commands: Arc<CommandQueue>,
    ui: Arc<dyn UiPort>,
    wake: Arc<dyn WakePort>,
    motion: MotionSupervisor<C>,
    config: WasherConfig,
    plan: WashPlan,
    stage: usize,
    safety_faults: u32,
}

impl<C> SystemManager<C>
where
    C: MotionClock + Clone + Send + 'static,
{
    pub fn new(ports: ManagerPorts, motion: MotionSupervisor<C>, config: WasherConfig) -> Self {
        Self {
            store: ports.store,
            commands: ports.commands,
            ui: ports.ui,
            wake: ports.wake,
            motion,
            config,
            plan: WashPlan::new(),
            stage: 0,
            safety_faults: 0,
        }
    }

    // ── Event dispatch ────────────────────────────────────────

    pub fn handle_event(&mut self, event: Event) {
        match event.kind {
            EventKind::PowerButton => {
                if self.store.is_powered() {
                    self.power_off();
                } else {
                    self.power_on();
                }
            }
            EventKind::StartButton => {
                if self.ui.handle_start_press() {
                    return;
                }
                if self.store.is_running() {
                    self.pause();
                } else {
                    self.start();
                }
            }
            EventKind::StartLongPress => self.ui.handle_start_long_press(),
            EventKind::DoorState => {
                let open = event.value != 0;
                self.store.set_door_open(open);
                info!("Door {}", if open { "open" } else { "closed" });
                if open && self.store.is_running() {
                    self.pause();
                }
            }
            EventKind::TimerTick => self.tick(),
            EventKind::SensorSample => {
                warn!("Imbalance detected, magnitude={} mg", event.value);
            }
            EventKind::DialDelta => self.ui.handle_dial_delta(event.value),
        }
    }

    /// Consume `events` forever.
    pub fn run(mut self, events: &EventQueue) {
        info!("System manager started");
        loop {
            let event = events.receive();
            self.handle_event(event);
        }
    }

    // ── Queries ───────────────────────────────────────────────

    /// Motor-zeroing failures that exhausted every retry.
    pub fn safety_faults(&self) -> u32 {
        self.safety_faults
    }

    pub fn stage_index(&self) -> usize {
        self.stage
    }

    pub fn plan(&self) -> &WashPlan {
        &self.plan
    }

    pub fn motion_active(&self) -> bool {
        self.motion.is_active()
    }

    // ── Power sequences ───────────────────────────────────────

    fn power_on(&mut self) {
        let store = Arc::clone(&self.store);
        store.set_powered(true);
        store.set_running(false);
        store.set_eta(0);
        store.reset_elapsed();
        store.set_logo_enabled(true);
        self.ui.show_logo();
        store.set_drum_light(false);

        self.send(CommandKind::SetPowerLed, 1);
        self.send(CommandKind::SetDrumLed, 0);
        self.send(CommandKind::SetStartLed, 0);
        self.send(CommandKind::SetLogoEnable, 1);
        self.play(SoundEffect::On);

        self.pause_ms(self.config.power_sequence_delay_ms);
        self.ramp_drum_light(true);

        store.set_drum_light(true);
        self.send(CommandKind::SetLogoEnable, 0);
        store.set_logo_enabled(false);
        self.ui.reset();
        info!("Power on sequence complete");

        if let Err(e) = self.wake.set_button_mask(ButtonMask::POWER_AND_START) {
            warn!("Failed to arm start button on wake source: {}", e);
        }
    }

    fn power_off(&mut self) {
        self.stop_motion();
        self.plan = WashPlan::new();
        self.stage = 0;

        let store = Arc::clone(&self.store);
        store.reset_cycle();
        store.set_powered(false);
        store.set_logo_enabled(true);
        self.ui.show_logo();

        self.send(CommandKind::SetStartLed, 0);
        self.send(CommandKind::SetLogoEnable, 1);
        self.play(SoundEffect::Off);

        self.pause_ms(self.config.power_sequence_delay_ms);
        self.ramp_drum_light(false);

        store.set_drum_light(false);
        self.send(CommandKind::SetPowerLed, 0);
        self.send(CommandKind::SetLogoEnable, 0);
        info!("Power off sequence complete");

        if let Err(e) = self.wake.set_button_mask(ButtonMask::POWER) {
            warn!("Failed to disarm start button on wake source: {}", e);
        }
        info!("Entering deep sleep, wake source watching power button");
        if let Err(e) = self.wake.enter_deep_sleep() {
            error!("Deep sleep request failed: {}", e);
        }
    }

    fn ramp_drum_light(&self, up: bool) {
        let max = i32::from(self.config.drum_light_max);
        let step = i32::from(self.config.drum_ramp_step.max(1));
        let mut level = if up { 0 } else { max };
        while (0..=max).contains(&level) {
            self.send(CommandKind::SetDrumLed, level);
            self.pause_ms(self.config.drum_ramp_step_delay_ms);
            level += if up { step } else { -step };
        }
    }

    // ── Cycle control ─────────────────────────────────────────

    fn start(&mut self) {
        if !self.store.is_powered() {
            warn!("Ignoring start request while powered off");
            return;
        }
        if self.store.is_running() {
            return;
        }
        if self.store.door_open() {
            warn!("Door is open, refusing to start");
            self.play(SoundEffect::Error);
            return;
        }
        if !self.rebuild_plan() {
            error!("Failed to build wash plan; aborting start");
            return;
        }

        self.store.set_running(true);
        self.send(CommandKind::SetStartLed, 1);
        self.play(SoundEffect::CycleStart);
        self.launch_stage();
        info!("Cycle started ({} sections, eta {} s)", self.plan.len(), self.plan.total_seconds());
    }

    fn pause(&mut self) {
        if !self.store.is_running() {
            return;
        }
        self.store.set_running(false);
        self.send(CommandKind::SetStartLed, 0);
        self.play(SoundEffect::Stop);
        self.stop_motion();
        info!("Cycle paused at section {}", self.stage);
    }

    fn complete(&mut self) {
        let len = self.plan.len();
        self.store.set_running(false);
        self.store.set_eta(0);
        self.store.set_eta_available(false);
        self.store.publish_stage(len, len, COMPLETE_LABEL);
        self.send(CommandKind::SetStartLed, 0);
        self.play(SoundEffect::CycleEnd);
        self.stop_motion();
        info!("Cycle complete");
    }

    /// Build a fresh plan from the current selection.  Leaves every field
    /// untouched when the plan comes out empty.
    fn rebuild_plan(&mut self) -> bool {
        let store = &self.store;
        let fresh = plan::build(
            store.program_id(),
            store.load_size(),
            store.prewash(),
            store.extra_rinse_count(),
        );
        if fresh.is_empty() {
            return false;
        }

        self.plan = fresh;
        self.stage = 0;
        store.reset_elapsed();
        store.set_eta_available(true);
        store.set_eta(self.plan.eta_from(0));
        self.publish_stage();
        true
    }

    fn tick(&mut self) {
        if !self.store.is_powered() || !self.store.is_running() {
            return;
        }
        let Some(section) = self.plan.get_mut(self.stage) else {
            return;
        };

        if section.remaining_seconds > 0 {
            section.remaining_seconds -= 1;
            self.store.increment_elapsed();
        }
        let finished = section.remaining_seconds <= 0;
        self.store.set_eta(self.plan.eta_from(self.stage));

        if finished {
            self.stage += 1;
            self.publish_stage();
            if self.stage >= self.plan.len() {
                self.complete();
            } else {
                self.launch_stage();
            }
        }
    }

    fn publish_stage(&self) {
        let label = self.plan.get(self.stage).map_or("", |s| s.label.as_str());
        self.store.publish_stage(self.stage, self.plan.len(), label);
    }

    // ── Motion ────────────────────────────────────────────────

    fn launch_stage(&mut self) {
        let Some(section) = self.plan.get(self.stage) else {
            return;
        };
        info!(
            "Section {}/{}: {} ({} s)",
            self.stage + 1,
            self.plan.len(),
            section.label,
            section.remaining_seconds
        );
        let params = section.params;
        if let Err(e) = self.motion.start(self.stage, params) {
            self.escalate(e);
        }
    }

    fn stop_motion(&mut self) {
        if let Err(e) = self.motion.stop() {
            self.escalate(e);
        }
    }

    fn escalate(&mut self, e: DriverError) {
        self.safety_faults = self.safety_faults.wrapping_add(1);
        error!(
            "Motor did not accept zero velocity after {} attempts: {} (faults={})",
            self.config.motor_stop_retries, e, self.safety_faults
        );
        self.commands.post(Command::sound(SoundEffect::Error), self.command_timeout());
    }

    // ── Command helpers ───────────────────────────────────────

    fn command_timeout(&self) -> Duration {
        Duration::from_millis(u64::from(self.config.command_send_timeout_ms))
    }

    fn send(&self, kind: CommandKind, arg0: i32) {
        self.commands.post(Command::new(kind, arg0), self.command_timeout());
    }

    fn play(&self, effect: SoundEffect) {
        if !self.store.muted() {
            self.commands.post(Command::sound(effect), self.command_timeout());
        }
    }

    fn pause_ms(&self, ms: u32) {
        if ms > 0 {
            std::thread::sleep(Duration::from_millis(u64::from(ms)));
        }
    }
}
