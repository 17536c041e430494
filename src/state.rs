//! Machine state store.
//!
//! One explicitly constructed instance, shared by `Arc`, holds the motor,
//! program and system state of the washer.  Every accessor takes the single
//! store mutex for the duration of its read-modify-write; observers are
//! invoked after the lock is released with a snapshot taken inside the same
//! critical section as the mutation.
//!
//! ```text
//!   Manager ─┐                      ┌─▶ observer 0 (log sink)
//!   Motion  ─┼─▶ Mutex<Inner> ──────┼─▶ observer 1
//!   UI      ─┘   (state + handles)  └─▶ …  (max 4, outside lock)
//! ```
//!
//! Observers run on the mutating task and must not block.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use heapless::{String, Vec};
use serde::Serialize;

use crate::programs::{self, ProgramProfile};

pub const MAX_OBSERVERS: usize = 4;
pub const STAGE_LABEL_LEN: usize = 32;

pub type StageLabel = String<STAGE_LABEL_LEN>;

// ── State aggregates ──────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MotorState {
    pub target_rpm: i32,
    pub current_rpm: f32,
    /// `true` = counter-clockwise.
    pub direction_ccw: bool,
    pub pwm_value: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProgramState {
    pub program_id: u8,
    pub current_stage: usize,
    pub is_running: bool,
    pub is_powered: bool,
    pub eta_seconds: i32,
    pub elapsed_seconds: u32,
    pub eta_available: bool,
    pub prewash_enabled: bool,
    pub extra_rinse_count: u8,
    pub total_stages: usize,
    pub stage_label: StageLabel,
    pub temp_idx: u8,
    pub spin_idx: u8,
    pub soil_idx: u8,
    pub load_size: u8,
}

impl Default for ProgramState {
    fn default() -> Self {
        let profile = &programs::PROGRAMS[0];
        Self {
            program_id: 0,
            current_stage: 0,
            is_running: false,
            is_powered: false,
            eta_seconds: 0,
            elapsed_seconds: 0,
            eta_available: false,
            prewash_enabled: false,
            extra_rinse_count: 0,
            total_stages: 0,
            stage_label: StageLabel::new(),
            temp_idx: profile.temp.default,
            spin_idx: profile.spin.default,
            soil_idx: profile.soil.default,
            load_size: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SystemState {
    pub door_open: bool,
    pub drain_on: bool,
    pub fill_on: bool,
    pub drum_light_on: bool,
    pub muted: bool,
    pub power_led_on: bool,
    pub start_stop_led_on: bool,
    pub logo_enabled: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MachineState {
    pub motor: MotorState,
    pub program: ProgramState,
    pub system: SystemState,
}

/// Payload handed to observers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObservableState {
    pub powered: bool,
    pub running: bool,
    pub door_open: bool,
    pub stage: usize,
    pub total_stages: usize,
    pub stage_label: StageLabel,
    pub eta_seconds: i32,
    pub eta_available: bool,
    pub target_rpm: i32,
    pub current_rpm: f32,
    pub direction_ccw: bool,
}

impl From<&MachineState> for ObservableState {
    fn from(s: &MachineState) -> Self {
        Self {
            powered: s.program.is_powered,
            running: s.program.is_running,
            door_open: s.system.door_open,
            stage: s.program.current_stage,
            total_stages: s.program.total_stages,
            stage_label: s.program.stage_label.clone(),
            eta_seconds: s.program.eta_seconds,
            eta_available: s.program.eta_available,
            target_rpm: s.motor.target_rpm,
            current_rpm: s.motor.current_rpm,
            direction_ccw: s.motor.direction_ccw,
        }
    }
}

// ── Observers ─────────────────────────────────────────────────

/// Subscriber notified after a state mutation.  Must not block.
pub trait StateObserver: Send + Sync {
    fn on_state_changed(&self, state: &ObservableState);
}

type ObserverHandle = Arc<dyn StateObserver>;

fn stage_label_from(text: &str) -> StageLabel {
    let mut label = StageLabel::new();
    for c in text.chars() {
        if label.push(c).is_err() {
            break;
        }
    }
    label
}

// ── Store ─────────────────────────────────────────────────────

struct Inner {
    state: MachineState,
    observers: Vec<ObserverHandle, MAX_OBSERVERS>,
}

pub struct MachineStateStore {
    inner: Mutex<Inner>,
}

impl Default for MachineStateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MachineStateStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: MachineState::default(),
                observers: Vec::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A panicking observer never holds the lock, so the data is intact.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply `f` under the lock.  When `f` reports a change, observers are
    /// notified with a snapshot taken before the lock was released.
    fn mutate<R>(&self, f: impl FnOnce(&mut MachineState) -> (R, bool)) -> R {
        let (result, pending) = {
            let mut inner = self.lock();
            let (result, changed) = f(&mut inner.state);
            let pending = changed.then(|| {
                (ObservableState::from(&inner.state), inner.observers.clone())
            });
            (result, pending)
        };
        if let Some((snapshot, observers)) = pending {
            for observer in &observers {
                observer.on_state_changed(&snapshot);
            }
        }
        result
    }

    fn set_and_notify(&self, f: impl FnOnce(&mut MachineState)) {
        self.mutate(|s| {
            f(s);
            ((), true)
        });
    }

    fn set_quiet(&self, f: impl FnOnce(&mut MachineState)) {
        f(&mut self.lock().state);
    }

    fn read<R>(&self, f: impl FnOnce(&MachineState) -> R) -> R {
        f(&self.lock().state)
    }

    // ── Observer registration ─────────────────────────────────

    /// Register `observer`.  Duplicate registration is a successful no-op;
    /// returns `false` only when the table is full.
    pub fn register_observer(&self, observer: ObserverHandle) -> bool {
        let mut inner = self.lock();
        if inner.observers.iter().any(|o| Arc::ptr_eq(o, &observer)) {
            return true;
        }
        inner.observers.push(observer).is_ok()
    }

    /// Remove `observer`; returns whether it was registered.
    pub fn unregister_observer(&self, observer: &ObserverHandle) -> bool {
        let mut inner = self.lock();
        match inner.observers.iter().position(|o| Arc::ptr_eq(o, observer)) {
            Some(idx) => {
                inner.observers.remove(idx);
                true
            }
            None => false,
        }
    }

    pub fn observer_count(&self) -> usize {
        self.lock().observers.len()
    }

    // ── Snapshots ─────────────────────────────────────────────

    /// Consistent point-in-time copy of the whole aggregate.
    pub fn snapshot(&self) -> MachineState {
        self.read(Clone::clone)
    }

    pub fn observable(&self) -> ObservableState {
        self.read(|s| ObservableState::from(s))
    }

    // ── Program state ─────────────────────────────────────────

    pub fn set_powered(&self, powered: bool) {
        self.set_and_notify(|s| {
            s.program.is_powered = powered;
            if !powered {
                s.program.is_running = false;
            }
        });
    }

    pub fn is_powered(&self) -> bool {
        self.read(|s| s.program.is_powered)
    }

    /// Set the running flag.  Refused (returns `false`) when asked to run an
    /// unpowered machine.
    pub fn set_running(&self, running: bool) -> bool {
        self.mutate(|s| {
            if running && !s.program.is_powered {
                return (false, false);
            }
            s.program.is_running = running;
            (true, true)
        })
    }

    pub fn is_running(&self) -> bool {
        self.read(|s| s.program.is_running)
    }

    /// Select a program.  Resets the option indices to the new program's
    /// defaults in the same transaction.  Unknown ids are ignored; returns
    /// whether the selection changed.
    pub fn set_program_id(&self, program_id: u8) -> bool {
        let Some(profile) = programs::program(program_id) else {
            return false;
        };
        self.mutate(|s| {
            if s.program.program_id == program_id {
                return (false, false);
            }
            s.program.program_id = program_id;
            s.program.temp_idx = profile.temp.default;
            s.program.spin_idx = profile.spin.default;
            s.program.soil_idx = profile.soil.default;
            (true, true)
        })
    }

    pub fn program_id(&self) -> u8 {
        self.read(|s| s.program.program_id)
    }

    pub fn current_stage(&self) -> usize {
        self.read(|s| s.program.current_stage)
    }

    pub fn total_stages(&self) -> usize {
        self.read(|s| s.program.total_stages)
    }

    pub fn set_stage_label(&self, label: &str) {
        self.set_and_notify(|s| s.program.stage_label = stage_label_from(label));
    }

    pub fn stage_label(&self) -> StageLabel {
        self.read(|s| s.program.stage_label.clone())
    }

    /// Publish stage index, plan length and label as one update.
    pub fn publish_stage(&self, stage: usize, total: usize, label: &str) {
        self.set_and_notify(|s| {
            s.program.current_stage = stage;
            s.program.total_stages = total;
            s.program.stage_label = stage_label_from(label);
        });
    }

    pub fn set_eta(&self, seconds: i32) {
        self.set_and_notify(|s| s.program.eta_seconds = seconds);
    }

    pub fn eta(&self) -> i32 {
        self.read(|s| s.program.eta_seconds)
    }

    pub fn set_eta_available(&self, available: bool) {
        self.set_and_notify(|s| s.program.eta_available = available);
    }

    pub fn eta_available(&self) -> bool {
        self.read(|s| s.program.eta_available)
    }

    pub fn reset_elapsed(&self) {
        self.set_and_notify(|s| s.program.elapsed_seconds = 0);
    }

    pub fn increment_elapsed(&self) {
        self.set_quiet(|s| s.program.elapsed_seconds = s.program.elapsed_seconds.saturating_add(1));
    }

    pub fn elapsed(&self) -> u32 {
        self.read(|s| s.program.elapsed_seconds)
    }

    /// Clear every cycle-progress field in one update.
    pub fn reset_cycle(&self) {
        self.set_and_notify(|s| {
            s.program.is_running = false;
            s.program.eta_seconds = 0;
            s.program.elapsed_seconds = 0;
            s.program.current_stage = 0;
            s.program.total_stages = 0;
            s.program.stage_label.clear();
            s.program.eta_available = false;
        });
    }

    pub fn set_prewash(&self, enabled: bool) {
        self.set_and_notify(|s| s.program.prewash_enabled = enabled);
    }

    pub fn prewash(&self) -> bool {
        self.read(|s| s.program.prewash_enabled)
    }

    /// Extra rinses beyond the base two; stored value clamps to 3.
    pub fn set_extra_rinse_count(&self, count: u8) {
        self.set_and_notify(|s| s.program.extra_rinse_count = count.min(3));
    }

    pub fn extra_rinse_count(&self) -> u8 {
        self.read(|s| s.program.extra_rinse_count)
    }

    pub fn set_temp_idx(&self, idx: u8) {
        self.set_quiet(|s| s.program.temp_idx = current_profile(s).temp.clamp(idx));
    }

    pub fn temp_idx(&self) -> u8 {
        self.read(|s| s.program.temp_idx)
    }

    pub fn set_spin_idx(&self, idx: u8) {
        self.set_quiet(|s| s.program.spin_idx = current_profile(s).spin.clamp(idx));
    }

    pub fn spin_idx(&self) -> u8 {
        self.read(|s| s.program.spin_idx)
    }

    pub fn set_soil_idx(&self, idx: u8) {
        self.set_quiet(|s| s.program.soil_idx = current_profile(s).soil.clamp(idx));
    }

    pub fn soil_idx(&self) -> u8 {
        self.read(|s| s.program.soil_idx)
    }

    pub fn set_load_size(&self, size: u8) {
        self.set_quiet(|s| s.program.load_size = size.min(2));
    }

    pub fn load_size(&self) -> u8 {
        self.read(|s| s.program.load_size)
    }

    // ── Motor state ───────────────────────────────────────────

    pub fn set_target_rpm(&self, rpm: i32) {
        self.set_and_notify(|s| s.motor.target_rpm = rpm);
    }

    pub fn target_rpm(&self) -> i32 {
        self.read(|s| s.motor.target_rpm)
    }

    pub fn set_current_rpm(&self, rpm: f32) {
        self.set_and_notify(|s| s.motor.current_rpm = rpm);
    }

    pub fn current_rpm(&self) -> f32 {
        self.read(|s| s.motor.current_rpm)
    }

    pub fn set_direction_ccw(&self, ccw: bool) {
        self.set_and_notify(|s| s.motor.direction_ccw = ccw);
    }

    pub fn direction_ccw(&self) -> bool {
        self.read(|s| s.motor.direction_ccw)
    }

    pub fn set_pwm_value(&self, pwm: i32) {
        self.set_quiet(|s| s.motor.pwm_value = pwm);
    }

    pub fn pwm_value(&self) -> i32 {
        self.read(|s| s.motor.pwm_value)
    }

    // ── System state ──────────────────────────────────────────

    pub fn set_door_open(&self, open: bool) {
        self.set_and_notify(|s| s.system.door_open = open);
    }

    pub fn door_open(&self) -> bool {
        self.read(|s| s.system.door_open)
    }

    pub fn set_drain_on(&self, on: bool) {
        self.set_and_notify(|s| s.system.drain_on = on);
    }

    pub fn set_fill_on(&self, on: bool) {
        self.set_and_notify(|s| s.system.fill_on = on);
    }

    pub fn set_drum_light(&self, on: bool) {
        self.set_and_notify(|s| s.system.drum_light_on = on);
    }

    pub fn set_muted(&self, muted: bool) {
        self.set_and_notify(|s| s.system.muted = muted);
    }

    pub fn muted(&self) -> bool {
        self.read(|s| s.system.muted)
    }

    pub fn set_power_led(&self, on: bool) {
        self.set_and_notify(|s| s.system.power_led_on = on);
    }

    pub fn set_start_led(&self, on: bool) {
        self.set_and_notify(|s| s.system.start_stop_led_on = on);
    }

    pub fn set_logo_enabled(&self, enabled: bool) {
        self.set_and_notify(|s| s.system.logo_enabled = enabled);
    }

    pub fn system(&self) -> SystemState {
        self.read(|s| s.system)
    }
}

fn current_profile(s: &MachineState) -> &'static ProgramProfile {
    &programs::PROGRAMS[usize::from(s.program.program_id).min(programs::NUM_PROGRAMS - 1)]
}
