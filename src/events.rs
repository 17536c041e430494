//! Typed message channels between producers and consumers.
//!
//! Events are produced by:
//! - the I/O scanner (button edges, door transitions)
//! - the 1 Hz tick task
//! - the vibration sampler
//! - the wake path at boot (re-delivered power press)
//!
//! and consumed only by the system manager.  Commands are produced only by
//! the system manager and consumed by the actuator executor.
//!
//! ```text
//! ┌─────────────┐  Event   ┌──────────────┐  Command  ┌──────────────┐
//! │ I/O scanner │────────▶│              │─────────▶│              │
//! │ Tick task   │────────▶│   Manager    │          │   Executor   │
//! │ Sensor task │────────▶│ (1 consumer) │          │ (1 consumer) │
//! └─────────────┘          └──────────────┘           └──────────────┘
//! ```
//!
//! Both queues are bounded.  A producer that finds its queue full waits at
//! most its send timeout, then drops the item and bumps the queue's drop
//! counter.  Producers never block indefinitely.

use core::sync::atomic::{AtomicU32, Ordering};
use core::time::Duration;

use async_io_mini::Timer;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, TrySendError};
use futures_lite::future;
use log::warn;

use crate::config::QUEUE_DEPTH;

// ── Events ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum EventKind {
    /// Power button released.
    PowerButton    = 0,
    /// Start/pause button released after a short hold.
    StartButton    = 1,
    /// Door sensor changed; value 1 = open, 0 = closed.
    DoorState      = 2,
    /// Cycle tick (1 Hz).
    TimerTick      = 3,
    /// Imbalance observation; value in milli-g.
    SensorSample   = 4,
    /// Start button held past the long-press threshold.
    StartLongPress = 5,
    /// Rotary dial moved; value is the signed detent count.
    DialDelta      = 6,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    pub kind: EventKind,
    pub value: i32,
}

impl Event {
    pub const fn new(kind: EventKind, value: i32) -> Self {
        Self { kind, value }
    }

    /// Event that carries no payload.
    pub const fn bare(kind: EventKind) -> Self {
        Self { kind, value: 0 }
    }
}

// ── Commands ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CommandKind {
    SetPowerLed     = 0,
    SetDrumLed      = 1,
    SetStartLed     = 2,
    PlaySound       = 3,
    SetLogoEnable   = 4,
    SetCircPumpPwm  = 5,
    SetFillPumpPwm  = 6,
    SetDrainPumpPwm = 7,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Command {
    pub kind: CommandKind,
    pub arg0: i32,
    pub arg1: i32,
}

impl Command {
    pub const fn new(kind: CommandKind, arg0: i32) -> Self {
        Self { kind, arg0, arg1: 0 }
    }

    pub const fn sound(effect: SoundEffect) -> Self {
        Self::new(CommandKind::PlaySound, effect as i32)
    }

    /// The effect carried by a `PlaySound` command, if any.
    pub fn sound_effect(&self) -> Option<SoundEffect> {
        match self.kind {
            CommandKind::PlaySound => SoundEffect::from_id(self.arg0),
            _ => None,
        }
    }
}

/// Cue identifiers understood by the sound engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SoundEffect {
    Startup     = 0,
    ButtonPress = 1,
    CycleStart  = 2,
    CycleEnd    = 3,
    Error       = 4,
    DoorOpen    = 5,
    WaterFill   = 6,
    On          = 7,
    Off         = 8,
    Select      = 9,
    Stop        = 10,
}

impl SoundEffect {
    pub fn from_id(id: i32) -> Option<Self> {
        Some(match id {
            0 => Self::Startup,
            1 => Self::ButtonPress,
            2 => Self::CycleStart,
            3 => Self::CycleEnd,
            4 => Self::Error,
            5 => Self::DoorOpen,
            6 => Self::WaterFill,
            7 => Self::On,
            8 => Self::Off,
            9 => Self::Select,
            10 => Self::Stop,
            _ => return None,
        })
    }
}

// ── Bounded queue ─────────────────────────────────────────────

/// Bounded MPMC queue with drop-on-timeout backpressure.
pub struct BoundedQueue<T, const N: usize> {
    name: &'static str,
    channel: Channel<CriticalSectionRawMutex, T, N>,
    dropped: AtomicU32,
}

pub type EventQueue = BoundedQueue<Event, QUEUE_DEPTH>;
pub type CommandQueue = BoundedQueue<Command, QUEUE_DEPTH>;

impl<T, const N: usize> BoundedQueue<T, N> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            channel: Channel::new(),
            dropped: AtomicU32::new(0),
        }
    }

    /// Enqueue `item`, waiting at most `timeout` for a free slot.
    ///
    /// Returns `false` when the item was dropped.
    pub fn post(&self, item: T, timeout: Duration) -> bool {
        let item = match self.channel.try_send(item) {
            Ok(()) => return true,
            Err(TrySendError::Full(item)) => item,
        };

        let delivered = if timeout.is_zero() {
            false
        } else {
            future::block_on(future::or(
                async {
                    self.channel.send(item).await;
                    true
                },
                async {
                    Timer::after(timeout).await;
                    false
                },
            ))
        };

        if !delivered {
            let total = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
            warn!("{}: queue full, item dropped (total dropped={})", self.name, total);
        }
        delivered
    }

    /// Block until an item is available.
    pub fn receive(&self) -> T {
        future::block_on(self.channel.receive())
    }

    pub fn try_receive(&self) -> Option<T> {
        self.channel.try_receive().ok()
    }

    /// Number of items dropped because the queue stayed full.
    pub fn dropped(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.channel.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channel.is_empty()
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}
