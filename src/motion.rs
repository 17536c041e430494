//! Motion execution primitive.
//!
//! Drives the physical behaviour of the active wash section (fill, drain,
//! tumble, spin) as one long-running async activity on its own thread.
//! The activity never cleans up after itself and has no stop flag: the
//! [`MotionSupervisor`] cancels it by dropping its future, joins the
//! thread, and then re-idles the motor and every pump.
//!
//! ```text
//!  Manager ──start(params)──▶ MotionSupervisor ──spawn──▶ wm_motion thread
//!                                    │                     block_on(or(
//!                                    │                       run_section(..),
//!                                    └──stop: signal ──────▶ cancel.wait()))
//!                                         join, zero motor/pumps
//! ```
//!
//! Every wait is split into chunks of at most `motion_chunk_ms`, so a
//! cancel takes effect within one chunk.

use core::future::Future;
use core::time::Duration;
use std::sync::Arc;
use std::thread::JoinHandle;

use async_io_mini::Timer;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use futures_lite::future;
use log::{debug, error, info, warn};

use crate::app::ports::{rpm_to_tps, MotorPort, OutputPort, PwmChannel};
use crate::config::{WasherConfig, PWM_MAX};
use crate::drivers::task_pin::{self, Core, TaskSpec};
use crate::error::DriverError;
use crate::plan::WashParams;
use crate::state::MachineStateStore;

const MOTION_TASK: TaskSpec = TaskSpec::new(Core::App, 4, 8, "wm_motion\0");

/// Idle period of a running spin between cancellation checks (ms).
const SPIN_IDLE_MS: u32 = 1000;

// ── Clock ─────────────────────────────────────────────────────

/// Source of the sleeps the motion activity awaits.
pub trait MotionClock {
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()>;
}

/// Production clock backed by the `async-io-mini` timer reactor.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReactorClock;

impl MotionClock for ReactorClock {
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> {
        async move {
            Timer::after(duration).await;
        }
    }
}

// ── Ports and timing ──────────────────────────────────────────

/// Collaborators the activity drives directly.
#[derive(Clone)]
pub struct MotionPorts {
    pub motor: Arc<dyn MotorPort>,
    pub outputs: Arc<dyn OutputPort>,
    pub store: Arc<MachineStateStore>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotionTiming {
    pub chunk_ms: u32,
    pub fill_ms: u32,
    pub reverse_pause_ms: u32,
}

impl From<&WasherConfig> for MotionTiming {
    fn from(c: &WasherConfig) -> Self {
        Self {
            chunk_ms: c.motion_chunk_ms.max(1),
            fill_ms: c.fill_duration_ms,
            reverse_pause_ms: c.reverse_pause_ms,
        }
    }
}

// ── Activity ──────────────────────────────────────────────────

/// Per-activity state.  Created fresh for every section start.
struct MotionContext<'a, C> {
    params: WashParams,
    ports: &'a MotionPorts,
    clock: &'a C,
    timing: MotionTiming,
    direction_ccw: bool,
}

impl<C: MotionClock> MotionContext<'_, C> {
    async fn wait_ms(&self, ms: u32) {
        let mut remaining = ms;
        while remaining > 0 {
            let step = remaining.min(self.timing.chunk_ms);
            self.clock.sleep(Duration::from_millis(u64::from(step))).await;
            remaining -= step;
        }
    }

    fn drive(&self, rpm: i32) {
        let tps = rpm_to_tps(rpm);
        let velocity = if self.direction_ccw { -tps } else { tps };
        if let Err(e) = self.ports.motor.set_velocity(velocity) {
            warn!("motion: motor command {} rpm failed: {}", rpm, e);
        }
        self.ports.store.set_target_rpm(rpm);
        self.ports.store.set_direction_ccw(self.direction_ccw);
    }

    fn pump(&self, channel: PwmChannel, duty: i32) {
        let duty = duty.clamp(0, PWM_MAX) as u16;
        if let Err(e) = self.ports.outputs.set_pwm(channel, duty) {
            warn!("motion: {:?} pump duty {} failed: {}", channel, duty, e);
        }
    }

    async fn fill(&self) {
        self.pump(PwmChannel::Fill, PWM_MAX);
        self.ports.store.set_fill_on(true);
        self.wait_ms(self.timing.fill_ms).await;
        self.pump(PwmChannel::Fill, 0);
        self.ports.store.set_fill_on(false);
    }

    async fn spin(&self) {
        self.drive(self.params.spin_rpm);
        loop {
            self.wait_ms(SPIN_IDLE_MS).await;
        }
    }

    fn reverse(&mut self) {
        self.direction_ccw = !self.direction_ccw;
    }

    async fn tumble_pass(&mut self) {
        let p = self.params;

        if p.alternate_direction {
            self.drive(0);
            self.wait_ms(self.timing.reverse_pause_ms).await;
            self.reverse();
        }
        self.drive(p.tumble_rpm);

        if p.pump_on_steps > 0 {
            for _ in 0..p.pump_on_steps {
                self.pump(PwmChannel::Circulation, p.circulation_pump_pwm);
                self.wait_ms(p.pump_on_step_ms).await;
                self.pump(PwmChannel::Circulation, 0);
                self.wait_ms(p.pump_on_step_ms).await;
                if p.alternate_direction {
                    self.reverse();
                    self.drive(p.tumble_rpm);
                }
            }
        } else {
            let (lead, on, tail) =
                pump_window(p.tumble_duration_ms, p.pump_on_start_frac, p.pump_on_end_frac);

            self.wait_ms(lead).await;
            if on > 0 {
                self.pump(PwmChannel::Circulation, p.circulation_pump_pwm);
                self.wait_ms(on).await;
                self.pump(PwmChannel::Circulation, 0);
            }
            self.wait_ms(tail).await;
        }

        self.drive(0);
        self.wait_ms(p.stop_duration_ms).await;
        // Guarantees a cancellation point even for all-zero timings.
        future::yield_now().await;
    }

    async fn tumble(&mut self) {
        loop {
            self.tumble_pass().await;
        }
    }
}

fn pump_offset(tumble_ms: u32, frac: f32) -> u32 {
    // f32 rounding can land past `tumble_ms` for large durations.
    ((tumble_ms as f32 * frac.clamp(0.0, 1.0)) as u32).min(tumble_ms)
}

/// Split a tumble into (before pump, pump on, after pump) milliseconds.
fn pump_window(tumble_ms: u32, start_frac: f32, end_frac: f32) -> (u32, u32, u32) {
    let start = pump_offset(tumble_ms, start_frac);
    let end = pump_offset(tumble_ms, end_frac).max(start);
    (start, end - start, tumble_ms.saturating_sub(end))
}

/// Run one section's motion.  Only returns by being dropped.
pub async fn run_section<C: MotionClock>(
    params: WashParams,
    ports: &MotionPorts,
    clock: &C,
    timing: MotionTiming,
) {
    let mut ctx = MotionContext {
        params,
        ports,
        clock,
        timing,
        direction_ccw: false,
    };

    if params.fill_water {
        ctx.fill().await;
    }
    if params.drain_water {
        ctx.pump(PwmChannel::Drain, PWM_MAX);
        ports.store.set_drain_on(true);
    }
    if params.spin_rpm > 0 {
        ctx.spin().await;
    }
    ctx.tumble().await;
}

// ── Supervisor ────────────────────────────────────────────────

type CancelSignal = Signal<CriticalSectionRawMutex, ()>;

struct MotionHandle {
    section: usize,
    cancel: Arc<CancelSignal>,
    thread: JoinHandle<()>,
}

/// Owns the single motion activity.  Only the manager holds one.
pub struct MotionSupervisor<C> {
    ports: MotionPorts,
    clock: C,
    timing: MotionTiming,
    stop_retries: u8,
    active: Option<MotionHandle>,
}

impl<C> MotionSupervisor<C>
where
    C: MotionClock + Clone + Send + 'static,
{
    pub fn new(ports: MotionPorts, clock: C, config: &WasherConfig) -> Self {
        Self {
            ports,
            clock,
            timing: MotionTiming::from(config),
            stop_retries: config.motor_stop_retries.max(1),
            active: None,
        }
    }

    /// Replace any running activity with one for `section`.
    ///
    /// The previous activity is torn down and the actuators re-idled first;
    /// a failure to zero the motor is returned after the new activity has
    /// been started.
    pub fn start(&mut self, section: usize, params: WashParams) -> Result<(), DriverError> {
        let idled = self.stop();

        let cancel = Arc::new(CancelSignal::new());
        let ports = self.ports.clone();
        let clock = self.clock.clone();
        let timing = self.timing;
        let task_cancel = Arc::clone(&cancel);

        let spawned = task_pin::spawn_on_core(MOTION_TASK, move || {
            future::block_on(future::or(
                run_section(params, &ports, &clock, timing),
                task_cancel.wait(),
            ));
        });

        match spawned {
            Ok(thread) => {
                info!("motion: section {} started", section);
                self.active = Some(MotionHandle { section, cancel, thread });
            }
            Err(e) => error!("motion: failed to spawn activity for section {}: {}", section, e),
        }
        idled
    }

    /// Cancel the activity (if any), wait for it to unwind, then command
    /// zero velocity and switch every pump off.
    pub fn stop(&mut self) -> Result<(), DriverError> {
        if let Some(handle) = self.active.take() {
            handle.cancel.signal(());
            if handle.thread.join().is_err() {
                error!("motion: activity for section {} panicked", handle.section);
            }
            debug!("motion: section {} cancelled", handle.section);
        }
        self.idle_actuators()
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn active_section(&self) -> Option<usize> {
        self.active.as_ref().map(|h| h.section)
    }

    fn idle_actuators(&self) -> Result<(), DriverError> {
        let mut result = Ok(());
        for attempt in 1..=self.stop_retries {
            match self.ports.motor.set_velocity(0.0) {
                Ok(()) => {
                    result = Ok(());
                    break;
                }
                Err(e) => {
                    warn!("motion: zero-velocity attempt {}/{} failed: {}", attempt, self.stop_retries, e);
                    result = Err(e);
                }
            }
        }

        for channel in [PwmChannel::Circulation, PwmChannel::Fill, PwmChannel::Drain] {
            if let Err(e) = self.ports.outputs.set_pwm(channel, 0) {
                warn!("motion: failed to idle {:?} pump: {}", channel, e);
            }
        }

        let store = &self.ports.store;
        store.set_target_rpm(0);
        store.set_fill_on(false);
        store.set_drain_on(false);
        result
    }
}

impl<C> Drop for MotionSupervisor<C> {
    fn drop(&mut self) {
        if let Some(handle) = self.active.take() {
            handle.cancel.signal(());
            let _ = handle.thread.join();
        }
    }
}
