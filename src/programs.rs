//! Static wash-program tables.
//!
//! Each program declares nominal tumble/stop times and the default, minimum
//! and maximum index for the three user-adjustable options.  A second table
//! lists, per program and load size, the motion styles that colour the
//! parameters of the washing sections.

pub const NUM_PROGRAMS: usize = 14;
pub const NUM_LOAD_SIZES: usize = 3;
pub const MAX_ACTIONS: usize = 4;

/// Program id of Cotton/Normal, the power-on default selection.
pub const COTTON_NORMAL: u8 = 5;

/// Motion style tag attached to a washing section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WashAction {
    Tumbling,
    Rolling,
    Filtration,
    Swinging,
    Stepping,
    Scrubbing,
}

/// Default / min / max for one adjustable option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptionRange {
    pub default: u8,
    pub min: u8,
    pub max: u8,
}

impl OptionRange {
    const fn new(default: u8, min: u8, max: u8) -> Self {
        Self { default, min, max }
    }

    pub fn clamp(&self, idx: u8) -> u8 {
        idx.clamp(self.min, self.max)
    }

    pub fn contains(&self, idx: u8) -> bool {
        (self.min..=self.max).contains(&idx)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgramProfile {
    pub name: &'static str,
    /// Nominal tumbling time in minutes.
    pub tumble_min: u16,
    /// Nominal stop/soak time in minutes.
    pub stop_min: u16,
    pub temp: OptionRange,
    pub spin: OptionRange,
    pub soil: OptionRange,
}

const fn profile(
    name: &'static str,
    tumble_min: u16,
    stop_min: u16,
    temp: (u8, u8, u8),
    spin: (u8, u8, u8),
    soil: (u8, u8, u8),
) -> ProgramProfile {
    ProgramProfile {
        name,
        tumble_min,
        stop_min,
        temp: OptionRange::new(temp.0, temp.1, temp.2),
        spin: OptionRange::new(spin.0, spin.1, spin.2),
        soil: OptionRange::new(soil.0, soil.1, soil.2),
    }
}

pub static PROGRAMS: [ProgramProfile; NUM_PROGRAMS] = [
    profile("Allergiene",     110, 11, (0, 0, 0), (4, 1, 5), (0, 0, 0)),
    profile("Sanitary",        96, 10, (5, 5, 5), (4, 1, 5), (2, 1, 3)),
    profile("Bright Whites",   66,  7, (4, 1, 4), (4, 1, 5), (2, 1, 3)),
    profile("Bulky/Large",     57,  6, (2, 1, 4), (3, 1, 3), (2, 1, 3)),
    profile("Heavy Duty",      89,  9, (3, 1, 4), (5, 1, 5), (3, 1, 3)),
    profile("Cotton/Normal",   63,  6, (3, 1, 5), (4, 2, 5), (2, 1, 3)),
    profile("Jumbo Wash",      57,  6, (3, 1, 4), (4, 1, 4), (2, 1, 3)),
    profile("Towels",          57,  6, (3, 1, 4), (5, 1, 5), (2, 1, 3)),
    profile("Perm. Press",     43,  4, (3, 1, 4), (3, 2, 4), (2, 1, 3)),
    profile("Hand Wash/Wool",  50,  5, (3, 1, 3), (2, 1, 2), (2, 1, 2)),
    profile("Delicates",       42,  4, (2, 1, 3), (3, 1, 3), (2, 1, 3)),
    profile("Speed Wash",      16,  2, (4, 1, 4), (5, 1, 5), (1, 1, 3)),
    profile("Small Load",      45,  4, (3, 3, 3), (4, 4, 4), (2, 2, 2)),
    profile("Tub Clean",       89,  9, (0, 0, 0), (0, 0, 0), (0, 0, 0)),
];

/// Profile for `id`, or `None` when the id is outside the table.
pub fn program(id: u8) -> Option<&'static ProgramProfile> {
    PROGRAMS.get(usize::from(id))
}

pub fn is_valid_program(id: u8) -> bool {
    usize::from(id) < NUM_PROGRAMS
}

// ── Action profiles ───────────────────────────────────────────

use WashAction::{Filtration, Rolling, Scrubbing, Stepping, Swinging, Tumbling};

type LoadActions = &'static [WashAction];

const HEAVY_MIX: [LoadActions; NUM_LOAD_SIZES] = [
    &[Rolling, Tumbling],
    &[Rolling, Filtration],
    &[Rolling, Filtration, Stepping],
];
const EVERYDAY_MIX: [LoadActions; NUM_LOAD_SIZES] = [
    &[Tumbling, Swinging],
    &[Tumbling, Rolling],
    &[Rolling, Filtration],
];
const GENTLE_MIX: [LoadActions; NUM_LOAD_SIZES] = [
    &[Swinging, Stepping],
    &[Tumbling, Swinging],
    &[Rolling, Filtration],
];
const QUICK_MIX: [LoadActions; NUM_LOAD_SIZES] = [
    &[Tumbling, Scrubbing],
    &[Tumbling, Rolling],
    &[Rolling, Filtration],
];

/// Motion styles per program (outer) and load size (inner: small, medium, large).
pub static PROGRAM_ACTIONS: [[LoadActions; NUM_LOAD_SIZES]; NUM_PROGRAMS] = [
    // Allergiene
    [
        &[Tumbling, Filtration, Scrubbing],
        &[Rolling, Filtration, Scrubbing],
        &[Rolling, Filtration, Stepping],
    ],
    // Sanitary
    [
        &[Tumbling, Filtration, Scrubbing],
        &[Tumbling, Rolling, Filtration],
        &[Rolling, Filtration, Stepping],
    ],
    // Bright Whites
    [
        &[Tumbling, Swinging, Scrubbing],
        &[Tumbling, Rolling, Filtration],
        &[Rolling, Filtration, Stepping],
    ],
    HEAVY_MIX, // Bulky/Large
    // Heavy Duty
    [
        &[Tumbling, Scrubbing, Filtration],
        &[Tumbling, Rolling, Scrubbing],
        &[Rolling, Filtration, Scrubbing],
    ],
    EVERYDAY_MIX, // Cotton/Normal
    HEAVY_MIX,    // Jumbo Wash
    // Towels
    [
        &[Tumbling, Scrubbing],
        &[Tumbling, Rolling, Filtration],
        &[Rolling, Filtration, Scrubbing],
    ],
    EVERYDAY_MIX, // Perm. Press
    GENTLE_MIX,   // Hand Wash/Wool
    GENTLE_MIX,   // Delicates
    QUICK_MIX,    // Speed Wash
    QUICK_MIX,    // Small Load
    // Tub Clean
    [
        &[Filtration, Scrubbing],
        &[Filtration, Scrubbing],
        &[Filtration, Scrubbing],
    ],
];

/// Action list for a program and load size.  Invalid ids yield an empty
/// slice; load sizes above the largest clamp to it.
pub fn actions_for(program_id: u8, load_size: u8) -> &'static [WashAction] {
    let load = usize::from(load_size).min(NUM_LOAD_SIZES - 1);
    PROGRAM_ACTIONS
        .get(usize::from(program_id))
        .map_or(&[], |loads| loads[load])
}

// ── Option labels ─────────────────────────────────────────────

pub const TEMPERATURE_LABELS: [&str; 6] = ["-", "TAP COLD", "COLD", "WARM", "HOT", "EXTRA HOT"];
pub const SPIN_LABELS: [&str; 6] = ["-", "NO SPIN", "LOW", "MEDIUM", "HIGH", "EXTRA HIGH"];
pub const SOIL_LABELS: [&str; 4] = ["-", "LIGHT", "NORMAL", "HEAVY"];

/// Label lookup that falls back to `"-"` outside the table.
pub fn label(table: &[&'static str], idx: u8) -> &'static str {
    table.get(usize::from(idx)).copied().unwrap_or("-")
}
