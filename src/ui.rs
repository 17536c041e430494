//! Menu controller.
//!
//! Intercepts start presses, long presses and dial movement before the
//! system manager applies its own start/stop semantics.  Navigation state
//! lives here; option values live in the state store.
//!
//! ```text
//!   Logo ──(power-on reset)──▶ Default ◀──long press──▶ WashSettings
//!                                 ▲                       │  ▲
//!                                 └──────── Back ─────────┘  │ Back
//!                                                MachineSettings
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use heapless::String;

use crate::app::ports::UiPort;
use crate::programs::{self, NUM_PROGRAMS};
use crate::state::MachineStateStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Menu {
    Logo,
    #[default]
    Default,
    WashSettings,
    MachineSettings,
}

/// Rows of the wash-settings menu, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WashOption {
    Temperature = 0,
    Spin,
    Soil,
    Prewash,
    ExtraRinse,
    MachineSettings,
    Back,
}

impl WashOption {
    pub const COUNT: usize = 7;
    const ALL: [Self; Self::COUNT] = [
        Self::Temperature,
        Self::Spin,
        Self::Soil,
        Self::Prewash,
        Self::ExtraRinse,
        Self::MachineSettings,
        Self::Back,
    ];

    pub fn from_index(idx: usize) -> Option<Self> {
        Self::ALL.get(idx).copied()
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Temperature => "Temperature",
            Self::Spin => "Spin",
            Self::Soil => "Soil",
            Self::Prewash => "Prewash",
            Self::ExtraRinse => "Extra Rinse",
            Self::MachineSettings => "Machine Settings",
            Self::Back => "Back",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MachineOption {
    About = 0,
    Display,
    Advanced,
    Back,
}

impl MachineOption {
    pub const COUNT: usize = 4;
    const ALL: [Self; Self::COUNT] = [Self::About, Self::Display, Self::Advanced, Self::Back];

    pub fn from_index(idx: usize) -> Option<Self> {
        Self::ALL.get(idx).copied()
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::About => "About",
            Self::Display => "Display",
            Self::Advanced => "Advanced",
            Self::Back => "Back",
        }
    }
}

/// What the display renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UiRenderState {
    pub menu: Menu,
    pub wash_cursor: usize,
    pub machine_cursor: usize,
    pub editing: bool,
}

pub struct UiController {
    store: Arc<MachineStateStore>,
    state: Mutex<UiRenderState>,
}

impl UiController {
    pub fn new(store: Arc<MachineStateStore>) -> Self {
        Self {
            store,
            state: Mutex::new(UiRenderState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, UiRenderState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn render_state(&self) -> UiRenderState {
        *self.lock()
    }

    /// Value column for a wash-settings row.
    pub fn option_value(&self, option: WashOption) -> String<16> {
        let text = match option {
            WashOption::Temperature => programs::label(&programs::TEMPERATURE_LABELS, self.store.temp_idx()),
            WashOption::Spin => programs::label(&programs::SPIN_LABELS, self.store.spin_idx()),
            WashOption::Soil => programs::label(&programs::SOIL_LABELS, self.store.soil_idx()),
            WashOption::Prewash => {
                if self.store.prewash() { "On" } else { "Off" }
            }
            WashOption::ExtraRinse => {
                let mut out = String::new();
                let _ = core::fmt::write(&mut out, format_args!("{}", self.store.extra_rinse_count()));
                return out;
            }
            WashOption::MachineSettings | WashOption::Back => "",
        };
        let mut out = String::new();
        for c in text.chars() {
            if out.push(c).is_err() {
                break;
            }
        }
        out
    }

    fn adjust_option(&self, cursor: usize, step: i8) {
        let store = &self.store;
        match WashOption::from_index(cursor) {
            Some(WashOption::Temperature) => store.set_temp_idx(store.temp_idx().saturating_add_signed(step)),
            Some(WashOption::Spin) => store.set_spin_idx(store.spin_idx().saturating_add_signed(step)),
            Some(WashOption::Soil) => store.set_soil_idx(store.soil_idx().saturating_add_signed(step)),
            Some(WashOption::Prewash) => store.set_prewash(!store.prewash()),
            Some(WashOption::ExtraRinse) => {
                let next = store.extra_rinse_count().saturating_add_signed(step).min(3);
                store.set_extra_rinse_count(next);
            }
            Some(WashOption::MachineSettings | WashOption::Back) | None => {}
        }
    }
}

fn step_cursor(cursor: usize, step: i8, count: usize) -> usize {
    let moved = if step > 0 { cursor.saturating_add(1) } else { cursor.saturating_sub(1) };
    moved.min(count - 1)
}

impl UiPort for UiController {
    fn handle_start_press(&self) -> bool {
        let mut ui = self.lock();
        match ui.menu {
            Menu::WashSettings => {
                if ui.editing {
                    ui.editing = false;
                } else {
                    match WashOption::from_index(ui.wash_cursor) {
                        Some(WashOption::MachineSettings) => {
                            ui.menu = Menu::MachineSettings;
                            ui.machine_cursor = 0;
                        }
                        Some(WashOption::Back) => ui.menu = Menu::Default,
                        _ => ui.editing = true,
                    }
                }
                true
            }
            Menu::MachineSettings => {
                ui.editing = false;
                if MachineOption::from_index(ui.machine_cursor) == Some(MachineOption::Back) {
                    ui.menu = Menu::WashSettings;
                }
                true
            }
            Menu::Logo | Menu::Default => false,
        }
    }

    fn handle_start_long_press(&self) {
        let mut ui = self.lock();
        match ui.menu {
            Menu::Default => ui.menu = Menu::WashSettings,
            Menu::WashSettings => ui.menu = Menu::Default,
            Menu::Logo | Menu::MachineSettings => return,
        }
        ui.editing = false;
    }

    fn handle_dial_delta(&self, delta: i32) {
        if delta == 0 {
            return;
        }
        let step: i8 = if delta > 0 { 1 } else { -1 };
        let mut ui = self.lock();
        match ui.menu {
            Menu::Logo => {}
            Menu::Default => {
                let max = NUM_PROGRAMS as i32 - 1;
                let next = i32::from(self.store.program_id()).saturating_add(delta).clamp(0, max);
                drop(ui);
                self.store.set_program_id(next as u8);
            }
            Menu::WashSettings => {
                if ui.editing {
                    let cursor = ui.wash_cursor;
                    drop(ui);
                    self.adjust_option(cursor, step);
                } else {
                    ui.wash_cursor = step_cursor(ui.wash_cursor, step, WashOption::COUNT);
                }
            }
            Menu::MachineSettings => {
                ui.machine_cursor = step_cursor(ui.machine_cursor, step, MachineOption::COUNT);
            }
        }
    }

    fn show_logo(&self) {
        let mut ui = self.lock();
        ui.menu = Menu::Logo;
        ui.editing = false;
    }

    fn reset(&self) {
        *self.lock() = UiRenderState::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::programs::COTTON_NORMAL;

    fn controller() -> (UiController, Arc<MachineStateStore>) {
        let store = Arc::new(MachineStateStore::new());
        (UiController::new(store.clone()), store)
    }

    fn wash_settings_at(ui: &UiController, row: WashOption) {
        ui.handle_start_long_press();
        for _ in 0..row as usize {
            ui.handle_dial_delta(1);
        }
        assert_eq!(ui.render_state().wash_cursor, row as usize);
    }

    #[test]
    fn default_menu_does_not_consume_start() {
        let (ui, _) = controller();
        assert!(!ui.handle_start_press());
        ui.show_logo();
        assert!(!ui.handle_start_press());
    }

    #[test]
    fn dial_selects_program_with_clamping() {
        let (ui, store) = controller();
        ui.handle_dial_delta(i32::from(COTTON_NORMAL));
        assert_eq!(store.program_id(), COTTON_NORMAL);
        ui.handle_dial_delta(100);
        assert_eq!(usize::from(store.program_id()), NUM_PROGRAMS - 1);
        ui.handle_dial_delta(-100);
        assert_eq!(store.program_id(), 0);
    }

    #[test]
    fn logo_ignores_dial_and_long_press() {
        let (ui, store) = controller();
        ui.show_logo();
        ui.handle_dial_delta(3);
        ui.handle_start_long_press();
        assert_eq!(store.program_id(), 0);
        assert_eq!(ui.render_state().menu, Menu::Logo);
    }

    #[test]
    fn long_press_toggles_wash_settings() {
        let (ui, _) = controller();
        ui.handle_start_long_press();
        assert_eq!(ui.render_state().menu, Menu::WashSettings);
        ui.handle_start_long_press();
        assert_eq!(ui.render_state().menu, Menu::Default);
    }

    #[test]
    fn editing_extra_rinse_clamps() {
        let (ui, store) = controller();
        wash_settings_at(&ui, WashOption::ExtraRinse);
        assert!(ui.handle_start_press());
        assert!(ui.render_state().editing);
        for _ in 0..6 {
            ui.handle_dial_delta(1);
        }
        assert_eq!(store.extra_rinse_count(), 3);
        assert_eq!(ui.option_value(WashOption::ExtraRinse).as_str(), "3");
        ui.handle_dial_delta(-1);
        assert_eq!(store.extra_rinse_count(), 2);
        assert!(ui.handle_start_press());
        assert!(!ui.render_state().editing);
    }

    #[test]
    fn editing_spin_stays_in_program_range() {
        let (ui, store) = controller();
        store.set_program_id(COTTON_NORMAL);
        wash_settings_at(&ui, WashOption::Spin);
        ui.handle_start_press();
        for _ in 0..10 {
            ui.handle_dial_delta(-1);
        }
        let range = programs::PROGRAMS[usize::from(COTTON_NORMAL)].spin;
        assert_eq!(store.spin_idx(), range.min);
        assert_eq!(ui.option_value(WashOption::Spin).as_str(), programs::SPIN_LABELS[usize::from(range.min)]);
    }

    #[test]
    fn prewash_toggles() {
        let (ui, store) = controller();
        wash_settings_at(&ui, WashOption::Prewash);
        ui.handle_start_press();
        ui.handle_dial_delta(1);
        assert!(store.prewash());
        assert_eq!(ui.option_value(WashOption::Prewash).as_str(), "On");
    }

    #[test]
    fn machine_settings_round_trip() {
        let (ui, _) = controller();
        wash_settings_at(&ui, WashOption::MachineSettings);
        assert!(ui.handle_start_press());
        assert_eq!(ui.render_state().menu, Menu::MachineSettings);
        for _ in 0..10 {
            ui.handle_dial_delta(1);
        }
        assert_eq!(ui.render_state().machine_cursor, MachineOption::COUNT - 1);
        assert!(ui.handle_start_press());
        assert_eq!(ui.render_state().menu, Menu::WashSettings);
    }

    #[test]
    fn back_row_returns_to_default() {
        let (ui, _) = controller();
        wash_settings_at(&ui, WashOption::Back);
        assert!(ui.handle_start_press());
        assert_eq!(ui.render_state().menu, Menu::Default);
    }

    #[test]
    fn reset_clears_navigation() {
        let (ui, _) = controller();
        wash_settings_at(&ui, WashOption::Soil);
        ui.handle_start_press();
        ui.reset();
        assert_eq!(ui.render_state(), UiRenderState::default());
    }
}
