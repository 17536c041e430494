//! washctl firmware, main entry point.
//!
//! Hexagonal architecture: board adapters on the outside, the control
//! plane (manager, executor, motion, producers) on the inside.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  HardwareAdapter      PowerAdapter   SimMotor/SimSound         │
//! │  (Output+Input)       (Wake)         (Motor, Sound, Sensor)    │
//! │  LogStateObserver     Uptime                                   │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │ ControlPlane: SystemManager · ActuatorExecutor ·       │    │
//! │  │               MotionSupervisor · producers             │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use std::sync::Arc;

use anyhow::Result;
use log::{error, info, warn};

use washctl::adapters::hardware::HardwareAdapter;
use washctl::adapters::log_sink::LogStateObserver;
use washctl::adapters::power::PowerAdapter;
use washctl::adapters::sim::{SimMotor, SimSound, SimVibration};
use washctl::config::WasherConfig;
use washctl::drivers::hw_init;
use washctl::error::Error;
use washctl::events::{Event, EventKind};
use washctl::state::MachineStateStore;
use washctl::tasks::{Collaborators, ControlPlane};

/// Optional JSON override baked in at build time.
const CONFIG_OVERRIDE: Option<&str> = option_env!("WASHCTL_CONFIG_JSON");

fn load_config() -> Result<WasherConfig, Error> {
    match CONFIG_OVERRIDE {
        Some(json) => Ok(WasherConfig::from_json(json)?),
        None => Ok(WasherConfig::default()),
    }
}

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("washctl v{}", env!("CARGO_PKG_VERSION"));

    // ── 2. Peripherals ────────────────────────────────────────
    if let Err(e) = hw_init::init_peripherals().map_err(Error::from) {
        // Peripheral init failure is fatal; the task watchdog resets us.
        error!("{}, halting", e);
        #[allow(clippy::empty_loop)]
        loop {}
    }

    // ── 3. Configuration ──────────────────────────────────────
    let config = load_config().unwrap_or_else(|e| {
        warn!("Config override rejected ({}), using defaults", e);
        WasherConfig::default()
    });

    // ── 4. State store + observers ────────────────────────────
    let store = Arc::new(MachineStateStore::new());
    if !store.register_observer(Arc::new(LogStateObserver::new())) {
        warn!("Observer table full, state log disabled");
    }

    // ── 5. Control plane ──────────────────────────────────────
    let board = Arc::new(HardwareAdapter::new());
    let collaborators = Collaborators {
        motor: Arc::new(SimMotor::new(Arc::clone(&store))),
        outputs: board.clone(),
        inputs: board,
        sound: Arc::new(SimSound::new()),
        sensor: Some(Arc::new(SimVibration::new())),
        wake: Arc::new(PowerAdapter::new()),
    };
    let plane = ControlPlane::start(Arc::clone(&store), config, collaborators)?;

    // ── 6. Wake re-delivery ───────────────────────────────────
    if PowerAdapter::woke_from_button() {
        info!("Woken by power button, powering on");
        plane.post_event(Event::bare(EventKind::PowerButton));
    }

    info!("System ready ({} tasks)", plane.task_count());
    plane.join()
}
