//! End-to-end: every task spawned, inputs driven through the host pin map.
//!
//! The pin map is process-wide, so this file holds a single test.

use std::sync::Arc;
use std::time::{Duration, Instant};

use washctl::adapters::hardware::HardwareAdapter;
use washctl::adapters::sim::{SimMotor, SimSound};
use washctl::config::WasherConfig;
use washctl::drivers::hw_init::sim;
use washctl::events::{Event, EventKind};
use washctl::pins;
use washctl::state::MachineStateStore;
use washctl::tasks::{Collaborators, ControlPlane};

use crate::mock_hw::{MockBoard, fast_config};

fn wait_for(what: &str, mut cond: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !cond() {
        assert!(Instant::now() < deadline, "timed out waiting for {}", what);
        std::thread::sleep(Duration::from_millis(10));
    }
}

fn press_and_release(pin: i32, config: &WasherConfig) {
    let hold = Duration::from_millis(u64::from(config.io_scan_interval_ms) * 3);
    sim::set_input(pin, false);
    std::thread::sleep(hold);
    sim::set_input(pin, true);
}

#[test]
fn buttons_drive_the_whole_plane() {
    sim::reset();
    let config = WasherConfig {
        io_scan_interval_ms: 10,
        tick_interval_ms: 20,
        sensor_enabled: false,
        console_enabled: false,
        command_send_timeout_ms: 50,
        ..fast_config()
    };
    let store = Arc::new(MachineStateStore::new());
    let board = Arc::new(HardwareAdapter::new());
    let wake = MockBoard::new();
    let plane = ControlPlane::start(
        Arc::clone(&store),
        config.clone(),
        Collaborators {
            motor: Arc::new(SimMotor::new(Arc::clone(&store))),
            outputs: board.clone(),
            inputs: board,
            sound: Arc::new(SimSound::new()),
            sensor: None,
            wake: wake.clone(),
        },
    )
    .expect("control plane starts");
    assert_eq!(plane.task_count(), 4);

    // Power on: the executor lights the power LED pin.
    press_and_release(pins::POWER_BUTTON_GPIO, &config);
    wait_for("power LED", || sim::level(pins::POWER_LED_GPIO));
    assert!(store.is_powered());

    // Start: the start LED comes on and ticks accumulate.
    press_and_release(pins::START_BUTTON_GPIO, &config);
    wait_for("start LED", || sim::level(pins::START_STOP_LED_GPIO));
    assert!(store.is_running());
    wait_for("ticks", || store.elapsed() >= 2);

    // Door open pauses the cycle once the debouncer settles.
    sim::set_input(pins::DOOR_SENSOR_GPIO, true);
    wait_for("pause on door open", || !store.is_running());
    wait_for("start LED off", || !sim::level(pins::START_STOP_LED_GPIO));
    assert!(store.door_open());

    // Injected power press: off, then deep sleep requested.
    assert!(plane.post_event(Event::bare(EventKind::PowerButton)));
    wait_for("deep sleep", || wake.deep_sleeps() == 1);
    wait_for("power LED off", || !sim::level(pins::POWER_LED_GPIO));
    assert!(!store.is_powered());
    assert_eq!(plane.dropped_events(), 0);
}
