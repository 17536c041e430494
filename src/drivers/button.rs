//! Sampled button and door debouncers.
//!
//! ## Hardware
//!
//! Power and start buttons are momentary switches; the door sensor is a
//! reed contact.  All three are read as levels by the I/O scanner once
//! per scan period, and the state machines below turn the level stream
//! into gestures.
//!
//! ## Gesture detection
//!
//! | Gesture     | Condition                                 | Event       |
//! |-------------|-------------------------------------------|-------------|
//! | Press       | Released before the long-press threshold  | `Press`     |
//! | Long press  | Held past the threshold (if enabled)      | `LongPress` |
//!
//! A long press fires while the button is still held; the release that
//! follows it is swallowed.

/// Button events emitted after gesture classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonEvent {
    Press,
    LongPress,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GestureState {
    Idle,
    Pressed { since_ms: u32 },
    LongHeld,
}

pub struct ButtonDriver {
    long_press_ms: Option<u32>,
    state: GestureState,
}

impl ButtonDriver {
    /// Button that only reports `Press`.
    pub fn new() -> Self {
        Self {
            long_press_ms: None,
            state: GestureState::Idle,
        }
    }

    /// Button that reports `LongPress` once held for `threshold_ms`.
    pub fn with_long_press(threshold_ms: u32) -> Self {
        Self {
            long_press_ms: Some(threshold_ms),
            state: GestureState::Idle,
        }
    }

    /// Feed one level sample.  `now_ms` is monotonic milliseconds.
    pub fn sample(&mut self, pressed: bool, now_ms: u32) -> Option<ButtonEvent> {
        match (self.state, pressed) {
            (GestureState::Idle, true) => {
                self.state = GestureState::Pressed { since_ms: now_ms };
                None
            }
            (GestureState::Idle, false) => None,
            (GestureState::Pressed { .. }, false) => {
                self.state = GestureState::Idle;
                Some(ButtonEvent::Press)
            }
            (GestureState::Pressed { since_ms }, true) => match self.long_press_ms {
                Some(threshold) if now_ms.wrapping_sub(since_ms) >= threshold => {
                    self.state = GestureState::LongHeld;
                    Some(ButtonEvent::LongPress)
                }
                _ => None,
            },
            (GestureState::LongHeld, false) => {
                self.state = GestureState::Idle;
                None
            }
            (GestureState::LongHeld, true) => None,
        }
    }

    pub fn is_held(&self) -> bool {
        self.state != GestureState::Idle
    }
}

impl Default for ButtonDriver {
    fn default() -> Self {
        Self::new()
    }
}

// ── Door ──────────────────────────────────────────────────────

/// Accepts a door level only after `required` consecutive equal samples.
pub struct DoorDebouncer {
    required: u8,
    stable_open: bool,
    candidate_open: bool,
    count: u8,
}

impl DoorDebouncer {
    pub fn new(required: u8) -> Self {
        Self {
            required: required.max(1),
            stable_open: false,
            candidate_open: false,
            count: 0,
        }
    }

    /// Debouncer that already considers the door `open` (boot level).
    pub fn settled(required: u8, open: bool) -> Self {
        Self {
            stable_open: open,
            candidate_open: open,
            ..Self::new(required)
        }
    }

    /// Feed one level sample; returns the new state when it changes.
    pub fn sample(&mut self, open: bool) -> Option<bool> {
        if open == self.stable_open {
            self.count = 0;
            return None;
        }
        if open == self.candidate_open {
            self.count = self.count.saturating_add(1);
        } else {
            self.candidate_open = open;
            self.count = 1;
        }
        if self.count >= self.required {
            self.stable_open = open;
            self.count = 0;
            return Some(open);
        }
        None
    }

    pub fn is_open(&self) -> bool {
        self.stable_open
    }
}
