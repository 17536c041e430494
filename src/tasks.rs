//! Producer tasks and control-plane wiring.
//!
//! ```text
//!  Core 0 (PRO)                          Core 1 (APP)
//!  ┌──────────────┐                      ┌───────────────┐  Command  ┌──────────┐
//!  │ wm_io  (4)   │──┐                   │ wm_mgr (6)    │─────────▶│ wm_act(5)│
//!  │ wm_sensor(3) │──┤                   │ SystemManager │          │ Executor │
//!  │ wm_tick (2)  │──┼──▶ EventQueue ───▶│   └▶ wm_motion│          └──────────┘
//!  │ wm_console(1)│──┘     (32 slots)    └───────────────┘
//!  └──────────────┘
//! ```
//!
//! Producers post with a short timeout and drop on overflow; the manager
//! and executor block on their queues between units of work.

use core::time::Duration;
use std::io::BufRead;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;

use anyhow::{Context, Result};
use heapless::Vec;
use log::{debug, info, warn};

use crate::adapters::time::Uptime;
use crate::app::executor::ActuatorExecutor;
use crate::app::manager::{ManagerPorts, SystemManager};
use crate::app::ports::{InputPort, MotorPort, OutputPort, SensorPort, SoundPort, WakePort};
use crate::config::WasherConfig;
use crate::drivers::button::{ButtonDriver, ButtonEvent, DoorDebouncer};
use crate::drivers::task_pin::{self, Core, TaskSpec};
use crate::events::{CommandQueue, Event, EventKind, EventQueue};
use crate::motion::{MotionPorts, MotionSupervisor, ReactorClock};
use crate::state::MachineStateStore;
use crate::ui::UiController;

const MANAGER_TASK: TaskSpec = TaskSpec::new(Core::App, 6, 8, "wm_mgr\0");
const EXECUTOR_TASK: TaskSpec = TaskSpec::new(Core::App, 5, 6, "wm_act\0");
const IO_TASK: TaskSpec = TaskSpec::new(Core::Pro, 4, 4, "wm_io\0");
const SENSOR_TASK: TaskSpec = TaskSpec::new(Core::Pro, 3, 4, "wm_sensor\0");
const TICK_TASK: TaskSpec = TaskSpec::new(Core::Pro, 2, 3, "wm_tick\0");
const CONSOLE_TASK: TaskSpec = TaskSpec::new(Core::Pro, 1, 4, "wm_console\0");

/// Longest console line accepted; longer lines are discarded whole.
pub const MAX_CONSOLE_LINE: usize = 127;

fn ms(value: u32) -> Duration {
    Duration::from_millis(u64::from(value))
}

// ── I/O scanner ───────────────────────────────────────────────

/// Turns sampled button and door levels into events.
pub struct InputScanner {
    inputs: Arc<dyn InputPort>,
    power: ButtonDriver,
    start: ButtonDriver,
    door: DoorDebouncer,
}

impl InputScanner {
    /// Seeds the door debouncer with the current level.
    pub fn new(inputs: Arc<dyn InputPort>, config: &WasherConfig) -> Self {
        let door_open = inputs.door_open();
        Self {
            inputs,
            power: ButtonDriver::new(),
            start: ButtonDriver::with_long_press(config.long_press_ms),
            door: DoorDebouncer::settled(config.door_debounce_samples, door_open),
        }
    }

    /// Door level at start-up, posted once so the manager's view is seeded.
    pub fn initial_door_event(&self) -> Event {
        Event::new(EventKind::DoorState, i32::from(self.door.is_open()))
    }

    /// One scan pass.
    pub fn scan(&mut self, now_ms: u32) -> Vec<Event, 3> {
        let mut out = Vec::new();

        if self.power.sample(self.inputs.power_pressed(), now_ms) == Some(ButtonEvent::Press) {
            let _ = out.push(Event::bare(EventKind::PowerButton));
        }
        match self.start.sample(self.inputs.start_pressed(), now_ms) {
            Some(ButtonEvent::Press) => {
                let _ = out.push(Event::bare(EventKind::StartButton));
            }
            Some(ButtonEvent::LongPress) => {
                let _ = out.push(Event::bare(EventKind::StartLongPress));
            }
            None => {}
        }
        if let Some(open) = self.door.sample(self.inputs.door_open()) {
            let _ = out.push(Event::new(EventKind::DoorState, i32::from(open)));
        }
        out
    }
}

fn run_io_scanner(mut scanner: InputScanner, events: &EventQueue, config: &WasherConfig) {
    let clock = Uptime::new();
    let period = ms(config.io_scan_interval_ms);
    let timeout = ms(config.event_send_timeout_ms);

    events.post(scanner.initial_door_event(), timeout);
    loop {
        for event in scanner.scan(clock.uptime_ms()) {
            debug!("io: {:?}", event);
            events.post(event, timeout);
        }
        std::thread::sleep(period);
    }
}

// ── Tick ──────────────────────────────────────────────────────

/// Fixed-cadence deadlines that do not drift with loop latency.
pub struct TickSchedule {
    period: Duration,
    next: Instant,
}

impl TickSchedule {
    pub fn new(period: Duration, now: Instant) -> Self {
        Self { period, next: now + period }
    }

    /// Time left until the next deadline, then advance it by one period.
    pub fn advance(&mut self, now: Instant) -> Duration {
        let wait = self.next.saturating_duration_since(now);
        self.next += self.period;
        wait
    }
}

fn run_tick(events: &EventQueue, config: &WasherConfig) {
    let timeout = ms(config.event_send_timeout_ms);
    let mut schedule = TickSchedule::new(ms(config.tick_interval_ms), Instant::now());
    loop {
        std::thread::sleep(schedule.advance(Instant::now()));
        events.post(Event::bare(EventKind::TimerTick), timeout);
    }
}

// ── Sensor ────────────────────────────────────────────────────

/// One vibration reading as an event, magnitude in milli-g.
pub fn sample_sensor(sensor: &dyn SensorPort) -> Option<Event> {
    sensor
        .imbalance()
        .map(|g| Event::new(EventKind::SensorSample, (g * 1000.0) as i32))
}

fn run_sensor(sensor: &dyn SensorPort, events: &EventQueue, config: &WasherConfig) {
    let timeout = ms(config.event_send_timeout_ms);
    let period = ms(config.sensor_interval_ms);
    loop {
        if let Some(event) = sample_sensor(sensor) {
            events.post(event, timeout);
        }
        std::thread::sleep(period);
    }
}

// ── Console ───────────────────────────────────────────────────

/// A line from the serial console.
///
/// `$D<n>` turns the dial by `n` detents; `$I<pin>,<val>` drives a simulated
/// input pin (`val` non-zero is high).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleCommand {
    Dial(i32),
    Input { pin: i32, high: bool },
}

pub fn parse_console_line(line: &str) -> Option<ConsoleCommand> {
    let line = line.trim();
    if line.len() > MAX_CONSOLE_LINE {
        return None;
    }
    if let Some(rest) = line.strip_prefix("$D") {
        let delta: i32 = rest.trim().parse().ok()?;
        return (delta != 0).then_some(ConsoleCommand::Dial(delta));
    }
    if let Some(rest) = line.strip_prefix("$I") {
        let (pin, val) = rest.split_once(',')?;
        let pin: i32 = pin.trim().parse().ok()?;
        let val: i32 = val.trim().parse().ok()?;
        return Some(ConsoleCommand::Input { pin, high: val != 0 });
    }
    None
}

#[cfg(not(target_os = "espidf"))]
fn drive_input(pin: i32, high: bool) {
    crate::drivers::hw_init::sim::set_input(pin, high);
    info!("console: GPIO {} = {}", pin, u8::from(high));
}

#[cfg(target_os = "espidf")]
fn drive_input(pin: i32, _high: bool) {
    warn!("console: GPIO {} is wired to real hardware, input ignored", pin);
}

/// Read console lines until the input closes.
fn run_console(input: impl BufRead, events: &EventQueue, config: &WasherConfig) {
    let timeout = ms(config.event_send_timeout_ms);
    for line in input.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!("console: read failed ({}), closing", e);
                return;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        match parse_console_line(&line) {
            Some(ConsoleCommand::Dial(delta)) => {
                debug!("console: dial {}", delta);
                events.post(Event::new(EventKind::DialDelta, delta), timeout);
            }
            Some(ConsoleCommand::Input { pin, high }) => drive_input(pin, high),
            None => warn!("console: unrecognised line '{}'", line.trim()),
        }
    }
    info!("console: input closed");
}

// ── Control plane ─────────────────────────────────────────────

/// Concrete collaborators injected at start-up.
pub struct Collaborators {
    pub motor: Arc<dyn MotorPort>,
    pub outputs: Arc<dyn OutputPort>,
    pub inputs: Arc<dyn InputPort>,
    pub sound: Arc<dyn SoundPort>,
    /// `None` leaves the sensor task out.
    pub sensor: Option<Arc<dyn SensorPort>>,
    pub wake: Arc<dyn WakePort>,
}

/// Every control-plane task, running.
pub struct ControlPlane {
    store: Arc<MachineStateStore>,
    events: Arc<EventQueue>,
    commands: Arc<CommandQueue>,
    ui: Arc<UiController>,
    config: WasherConfig,
    tasks: std::vec::Vec<JoinHandle<()>>,
}

impl ControlPlane {
    /// Create the queues and spawn manager, executor and producers.
    pub fn start(
        store: Arc<MachineStateStore>,
        config: WasherConfig,
        hw: Collaborators,
    ) -> Result<Self> {
        config.validate().context("invalid washer config")?;

        let events = Arc::new(EventQueue::new("events"));
        let commands = Arc::new(CommandQueue::new("commands"));
        let ui = Arc::new(UiController::new(Arc::clone(&store)));
        let mut tasks = std::vec::Vec::new();

        // Consumers first, so nothing produced is lost to an empty room.
        let motion = MotionSupervisor::new(
            MotionPorts {
                motor: hw.motor,
                outputs: Arc::clone(&hw.outputs),
                store: Arc::clone(&store),
            },
            ReactorClock,
            &config,
        );
        let manager = SystemManager::new(
            ManagerPorts {
                store: Arc::clone(&store),
                commands: Arc::clone(&commands),
                ui: ui.clone(),
                wake: hw.wake,
            },
            motion,
            config.clone(),
        );
        let q = Arc::clone(&events);
        tasks.push(
            task_pin::spawn_on_core(MANAGER_TASK, move || manager.run(&q))
                .context("spawn manager")?,
        );

        let executor = ActuatorExecutor::new(Arc::clone(&hw.outputs), hw.sound, Arc::clone(&store));
        let q = Arc::clone(&commands);
        tasks.push(
            task_pin::spawn_on_core(EXECUTOR_TASK, move || executor.run(&q))
                .context("spawn executor")?,
        );

        let scanner = InputScanner::new(hw.inputs, &config);
        let (q, cfg) = (Arc::clone(&events), config.clone());
        tasks.push(
            task_pin::spawn_on_core(IO_TASK, move || run_io_scanner(scanner, &q, &cfg))
                .context("spawn io scanner")?,
        );

        if let Some(sensor) = hw.sensor.filter(|_| config.sensor_enabled) {
            let (q, cfg) = (Arc::clone(&events), config.clone());
            tasks.push(
                task_pin::spawn_on_core(SENSOR_TASK, move || run_sensor(sensor.as_ref(), &q, &cfg))
                    .context("spawn sensor")?,
            );
        }

        let (q, cfg) = (Arc::clone(&events), config.clone());
        tasks.push(
            task_pin::spawn_on_core(TICK_TASK, move || run_tick(&q, &cfg))
                .context("spawn tick")?,
        );

        if config.console_enabled {
            let (q, cfg) = (Arc::clone(&events), config.clone());
            tasks.push(
                task_pin::spawn_on_core(CONSOLE_TASK, move || {
                    run_console(std::io::stdin().lock(), &q, &cfg)
                })
                .context("spawn console")?,
            );
        }

        info!("Control plane tasks created ({})", tasks.len());
        Ok(Self {
            store,
            events,
            commands,
            ui,
            config,
            tasks,
        })
    }

    pub fn store(&self) -> &Arc<MachineStateStore> {
        &self.store
    }

    pub fn ui(&self) -> &Arc<UiController> {
        &self.ui
    }

    /// Inject an event from outside the producers (dial, wake re-delivery).
    pub fn post_event(&self, event: Event) -> bool {
        self.events.post(event, ms(self.config.event_send_timeout_ms))
    }

    pub fn dropped_events(&self) -> u32 {
        self.events.dropped()
    }

    pub fn dropped_commands(&self) -> u32 {
        self.commands.dropped()
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Block until every task ends.  The console ends when its input
    /// closes; every other task only ends by panicking.
    pub fn join(self) -> Result<()> {
        for task in self.tasks {
            let name = task.thread().name().unwrap_or("?").to_owned();
            task.join()
                .map_err(|_| anyhow::anyhow!("task '{}' panicked", name))?;
        }
        Ok(())
    }
}
