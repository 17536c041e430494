//! Mock board for integration tests.
//!
//! Records every motor, output, sound and wake call so tests can assert on
//! the full history without touching GPIO/LEDC registers.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_lite::future;

use washctl::app::manager::{ManagerPorts, SystemManager};
use washctl::app::ports::{
    ButtonMask, DigitalPin, MotorPort, OutputPort, PwmChannel, SoundPort, WakePort,
};
use washctl::config::WasherConfig;
use washctl::error::DriverError;
use washctl::events::{Command, CommandQueue, SoundEffect};
use washctl::motion::{MotionClock, MotionPorts, MotionSupervisor};
use washctl::state::MachineStateStore;
use washctl::ui::UiController;

// ── Call record ───────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum BoardCall {
    Velocity(f32),
    Pwm(PwmChannel, u16),
    Digital(DigitalPin, bool),
    Sound(u8),
    WakeMask(ButtonMask),
    DeepSleep,
}

// ── MockBoard ─────────────────────────────────────────────────

#[derive(Default)]
pub struct MockBoard {
    calls: Mutex<Vec<BoardCall>>,
    motor_fails: AtomicBool,
}

#[allow(dead_code)]
impl MockBoard {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make every velocity command fail from now on.
    pub fn fail_motor(&self) {
        self.motor_fails.store(true, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<BoardCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn deep_sleeps(&self) -> usize {
        self.calls().iter().filter(|c| **c == BoardCall::DeepSleep).count()
    }

    pub fn last_wake_mask(&self) -> Option<ButtonMask> {
        self.calls().iter().rev().find_map(|c| match c {
            BoardCall::WakeMask(m) => Some(*m),
            _ => None,
        })
    }

    fn record(&self, call: BoardCall) {
        self.calls.lock().unwrap().push(call);
    }
}

impl MotorPort for MockBoard {
    fn set_velocity(&self, turns_per_second: f32) -> Result<(), DriverError> {
        if self.motor_fails.load(Ordering::SeqCst) {
            return Err(DriverError::MotorRejected(-1));
        }
        self.record(BoardCall::Velocity(turns_per_second));
        Ok(())
    }
}

impl OutputPort for MockBoard {
    fn set_pwm(&self, channel: PwmChannel, duty: u16) -> Result<(), DriverError> {
        self.record(BoardCall::Pwm(channel, duty));
        Ok(())
    }

    fn write_digital(&self, pin: DigitalPin, high: bool) -> Result<(), DriverError> {
        self.record(BoardCall::Digital(pin, high));
        Ok(())
    }
}

impl SoundPort for MockBoard {
    fn play_effect(&self, effect_id: u8) -> Result<(), DriverError> {
        self.record(BoardCall::Sound(effect_id));
        Ok(())
    }
}

impl WakePort for MockBoard {
    fn set_button_mask(&self, mask: ButtonMask) -> Result<(), DriverError> {
        self.record(BoardCall::WakeMask(mask));
        Ok(())
    }

    fn enter_deep_sleep(&self) -> Result<(), DriverError> {
        self.record(BoardCall::DeepSleep);
        Ok(())
    }
}

// ── ParkedClock ───────────────────────────────────────────────

/// Sleeps never complete, so a motion activity parks after its first
/// actuator writes until it is cancelled.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParkedClock;

impl MotionClock for ParkedClock {
    fn sleep(&self, _duration: Duration) -> impl Future<Output = ()> {
        future::pending()
    }
}

// ── Manager rig ───────────────────────────────────────────────

/// Config with the power sequences collapsed so tests run instantly and
/// the drum-light ramp fits in the command queue.
pub fn fast_config() -> WasherConfig {
    WasherConfig {
        power_sequence_delay_ms: 0,
        drum_ramp_step: 4096,
        drum_ramp_step_delay_ms: 0,
        command_send_timeout_ms: 0,
        ..WasherConfig::default()
    }
}

pub struct Rig {
    pub manager: SystemManager<ParkedClock>,
    pub store: Arc<MachineStateStore>,
    pub commands: Arc<CommandQueue>,
    pub ui: Arc<UiController>,
    pub board: Arc<MockBoard>,
}

#[allow(dead_code)]
impl Rig {
    pub fn new() -> Self {
        Self::with_board(MockBoard::new())
    }

    pub fn with_board(board: Arc<MockBoard>) -> Self {
        let config = fast_config();
        let store = Arc::new(MachineStateStore::new());
        let commands = Arc::new(CommandQueue::new("commands"));
        let ui = Arc::new(UiController::new(Arc::clone(&store)));
        let motion = MotionSupervisor::new(
            MotionPorts {
                motor: board.clone(),
                outputs: board.clone(),
                store: Arc::clone(&store),
            },
            ParkedClock,
            &config,
        );
        let manager = SystemManager::new(
            ManagerPorts {
                store: Arc::clone(&store),
                commands: Arc::clone(&commands),
                ui: ui.clone(),
                wake: board.clone(),
            },
            motion,
            config,
        );
        Self {
            manager,
            store,
            commands,
            ui,
            board,
        }
    }

    /// Pull every queued command.
    pub fn drain(&self) -> Vec<Command> {
        std::iter::from_fn(|| self.commands.try_receive()).collect()
    }

    /// Sound cues among `cmds`, in order.
    pub fn sounds(cmds: &[Command]) -> Vec<SoundEffect> {
        cmds.iter().filter_map(Command::sound_effect).collect()
    }
}
