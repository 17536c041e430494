//! Wash plan builder.
//!
//! Expands a program, load size and the user options into the ordered list
//! of timed sections one cycle will run:
//!
//! ```text
//!  Detecting ─▶ Saturation ─▶ [Pre-wash] ─▶ Main wash ─▶ Interim spin
//!      ─▶ Rinse 1 ─▶ Interim spin ─▶ … ─▶ Rinse N ─▶ Final spin
//! ```
//!
//! The builder is a pure function of its inputs.  The plan has a fixed
//! capacity; sections that do not fit, or whose duration is not positive,
//! are skipped silently.

use core::fmt::Write as _;

use heapless::{String, Vec};

use crate::config::PWM_MAX;
use crate::programs::{self, MAX_ACTIONS, WashAction};

pub const MAX_WASH_SECTIONS: usize = 16;
pub const SECTION_LABEL_LEN: usize = 24;
pub const BASE_RINSES: u8 = 2;
pub const MAX_TOTAL_RINSES: u8 = 5;

const DETECTING_SECONDS: i32 = 90;
const INTERIM_SPIN_SECONDS: i32 = 90;
const RINSE_SECONDS: i32 = 240;
const FINAL_SPIN_SECONDS: i32 = 360;

const ROLLING_RPM: i32 = 35;
const SCRUB_RPM_BOOST: i32 = 10;
const STEP_COUNT: u32 = 4;
const STEP_MS: u32 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WashSectionKind {
    Detecting,
    Saturation,
    Prewash,
    MainWash,
    InterimSpin,
    Rinse,
    FinalSpin,
}

/// Motion directive for one section.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WashParams {
    pub fill_water: bool,
    pub drain_water: bool,
    pub tumble_rpm: i32,
    pub tumble_duration_ms: u32,
    pub stop_duration_ms: u32,
    /// Fraction of the tumble at which the circulation pump switches on.
    pub pump_on_start_frac: f32,
    /// Fraction of the tumble at which it switches off again.
    pub pump_on_end_frac: f32,
    pub alternate_direction: bool,
    pub circulation_pump_pwm: i32,
    /// Stepped pump mode when non-zero: on/off pulses per tumble.
    pub pump_on_steps: u32,
    pub pump_on_step_ms: u32,
    /// Continuous spin speed; overrides tumbling when positive.
    pub spin_rpm: i32,
}

impl Default for WashParams {
    fn default() -> Self {
        Self {
            fill_water: false,
            drain_water: false,
            tumble_rpm: 60,
            tumble_duration_ms: 10_000,
            stop_duration_ms: 2_000,
            pump_on_start_frac: 0.0,
            pump_on_end_frac: 1.0,
            alternate_direction: true,
            circulation_pump_pwm: PWM_MAX,
            pump_on_steps: 0,
            pump_on_step_ms: 0,
            spin_rpm: 0,
        }
    }
}

pub type ActionList = Vec<WashAction, MAX_ACTIONS>;
pub type SectionLabel = String<SECTION_LABEL_LEN>;

#[derive(Debug, Clone, PartialEq)]
pub struct WashSection {
    pub kind: WashSectionKind,
    pub remaining_seconds: i32,
    pub label: SectionLabel,
    pub params: WashParams,
    pub actions: ActionList,
}

/// Base parameters for a section kind, before action colouring.
pub fn defaults_for_section(kind: WashSectionKind) -> WashParams {
    let base = WashParams::default();
    match kind {
        WashSectionKind::Detecting => WashParams {
            tumble_rpm: 40,
            tumble_duration_ms: 2_000,
            stop_duration_ms: 1_000,
            circulation_pump_pwm: 0,
            ..base
        },
        WashSectionKind::Saturation => WashParams {
            fill_water: true,
            tumble_rpm: 50,
            tumble_duration_ms: 15_000,
            ..base
        },
        WashSectionKind::Prewash | WashSectionKind::MainWash => WashParams {
            tumble_rpm: 60,
            pump_on_start_frac: 0.2,
            pump_on_end_frac: 0.8,
            ..base
        },
        WashSectionKind::InterimSpin => WashParams {
            drain_water: true,
            spin_rpm: 400,
            ..base
        },
        WashSectionKind::Rinse => WashParams {
            fill_water: true,
            tumble_rpm: 55,
            ..base
        },
        WashSectionKind::FinalSpin => WashParams {
            drain_water: true,
            spin_rpm: 1000,
            ..base
        },
    }
}

/// Colour `params` with the motion styles in `actions`, applied in order.
pub fn apply_actions(mut params: WashParams, actions: &[WashAction]) -> WashParams {
    for action in actions {
        match action {
            WashAction::Tumbling => {}
            WashAction::Rolling => params.tumble_rpm = ROLLING_RPM,
            WashAction::Filtration => {
                params.pump_on_start_frac = 0.0;
                params.pump_on_end_frac = 1.0;
            }
            WashAction::Swinging => params.tumble_duration_ms /= 2,
            WashAction::Stepping => {
                params.pump_on_steps = STEP_COUNT;
                params.pump_on_step_ms = STEP_MS;
            }
            WashAction::Scrubbing => params.tumble_rpm += SCRUB_RPM_BOOST,
        }
    }
    params
}

/// Rinse sections a cycle runs for `extra_rinses` requested on top of the base.
pub fn total_rinses(extra_rinses: u8) -> u8 {
    BASE_RINSES.saturating_add(extra_rinses).min(MAX_TOTAL_RINSES)
}

fn label_from(text: &str) -> SectionLabel {
    let mut label = SectionLabel::new();
    for c in text.chars() {
        if label.push(c).is_err() {
            break;
        }
    }
    label
}

// ── Plan ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WashPlan {
    sections: Vec<WashSection, MAX_WASH_SECTIONS>,
}

impl WashPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn sections(&self) -> &[WashSection] {
        &self.sections
    }

    pub fn get(&self, index: usize) -> Option<&WashSection> {
        self.sections.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut WashSection> {
        self.sections.get_mut(index)
    }

    /// Append a section.  Skipped when `seconds <= 0` or the plan is full;
    /// returns whether the section was added.
    pub fn append(
        &mut self,
        kind: WashSectionKind,
        label: &str,
        seconds: i32,
        params: WashParams,
        actions: &[WashAction],
    ) -> bool {
        if seconds <= 0 || self.sections.is_full() {
            return false;
        }
        let mut list = ActionList::new();
        for &a in actions.iter().take(MAX_ACTIONS) {
            // Capacity checked by `take`.
            let _ = list.push(a);
        }
        let section = WashSection {
            kind,
            remaining_seconds: seconds,
            label: label_from(label),
            params,
            actions: list,
        };
        self.sections.push(section).is_ok()
    }

    /// Seconds left from section `index` to the end of the plan.
    pub fn eta_from(&self, index: usize) -> i32 {
        self.sections
            .iter()
            .skip(index)
            .map(|s| s.remaining_seconds.max(0))
            .sum()
    }

    pub fn total_seconds(&self) -> i32 {
        self.eta_from(0)
    }

    pub fn count_kind(&self, kind: WashSectionKind) -> usize {
        self.sections.iter().filter(|s| s.kind == kind).count()
    }
}

// ── Builder ───────────────────────────────────────────────────

/// Build the plan for one cycle.  An unknown program id yields an empty plan.
pub fn build(program_id: u8, load_size: u8, prewash_enabled: bool, extra_rinses: u8) -> WashPlan {
    let mut plan = WashPlan::new();
    let Some(profile) = programs::program(program_id) else {
        return plan;
    };
    let actions = programs::actions_for(program_id, load_size);

    let main_wash_seconds = (i32::from(profile.tumble_min) * 60).clamp(300, 3600);
    let saturation_seconds = (i32::from(profile.stop_min) * 60).clamp(120, 900);
    let rinses = total_rinses(extra_rinses);

    let coloured = |kind| apply_actions(defaults_for_section(kind), actions);

    plan.append(
        WashSectionKind::Detecting,
        "Detecting",
        DETECTING_SECONDS,
        defaults_for_section(WashSectionKind::Detecting),
        &[],
    );
    plan.append(
        WashSectionKind::Saturation,
        "Saturation",
        saturation_seconds,
        coloured(WashSectionKind::Saturation),
        actions,
    );

    if prewash_enabled {
        let prewash_seconds = (main_wash_seconds / 3).clamp(180, 900);
        plan.append(
            WashSectionKind::Prewash,
            "Pre-wash",
            prewash_seconds,
            coloured(WashSectionKind::Prewash),
            actions,
        );
    }

    plan.append(
        WashSectionKind::MainWash,
        "Main wash",
        main_wash_seconds,
        coloured(WashSectionKind::MainWash),
        actions,
    );
    plan.append(
        WashSectionKind::InterimSpin,
        "Interim spin",
        INTERIM_SPIN_SECONDS,
        defaults_for_section(WashSectionKind::InterimSpin),
        &[],
    );

    for rinse in 0..rinses {
        let mut label = SectionLabel::new();
        let _ = write!(label, "Rinse {}", rinse + 1);
        plan.append(
            WashSectionKind::Rinse,
            &label,
            RINSE_SECONDS,
            coloured(WashSectionKind::Rinse),
            actions,
        );
        if rinse + 1 < rinses {
            plan.append(
                WashSectionKind::InterimSpin,
                "Interim spin",
                INTERIM_SPIN_SECONDS / 2,
                defaults_for_section(WashSectionKind::InterimSpin),
                &[],
            );
        }
    }

    plan.append(
        WashSectionKind::FinalSpin,
        "Final spin",
        FINAL_SPIN_SECONDS,
        defaults_for_section(WashSectionKind::FinalSpin),
        &[],
    );

    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::programs::COTTON_NORMAL;

    fn kinds(plan: &WashPlan) -> std::vec::Vec<WashSectionKind> {
        plan.sections().iter().map(|s| s.kind).collect()
    }

    #[test]
    fn cotton_normal_default_layout() {
        use WashSectionKind::*;
        let plan = build(COTTON_NORMAL, 0, false, 0);
        assert_eq!(
            kinds(&plan),
            [Detecting, Saturation, MainWash, InterimSpin, Rinse, InterimSpin, Rinse, FinalSpin]
        );
        let labels: std::vec::Vec<&str> = plan.sections().iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels[4], "Rinse 1");
        assert_eq!(labels[6], "Rinse 2");
    }

    #[test]
    fn cotton_normal_durations() {
        let plan = build(COTTON_NORMAL, 0, false, 0);
        let secs: std::vec::Vec<i32> = plan.sections().iter().map(|s| s.remaining_seconds).collect();
        // 63 min tumble clamps to 3600 s; 6 min stop gives 360 s saturation.
        assert_eq!(secs, [90, 360, 3600, 90, 240, 45, 240, 360]);
        assert_eq!(plan.total_seconds(), 5025);
    }

    #[test]
    fn prewash_is_a_third_of_main_wash_clamped() {
        // Speed Wash: 16 min -> 960 s main, prewash 320 s.
        let plan = build(11, 1, true, 0);
        let pre = plan.sections().iter().find(|s| s.kind == WashSectionKind::Prewash).unwrap();
        assert_eq!(pre.remaining_seconds, 320);
        assert_eq!(pre.label.as_str(), "Pre-wash");

        // Allergiene: main clamps to 3600, prewash clamps to 900.
        let plan = build(0, 0, true, 0);
        let pre = plan.sections().iter().find(|s| s.kind == WashSectionKind::Prewash).unwrap();
        assert_eq!(pre.remaining_seconds, 900);
    }

    #[test]
    fn saturation_clamped_to_minimum() {
        // Speed Wash: 2 min stop -> 120 s floor.
        let plan = build(11, 0, false, 0);
        assert_eq!(plan.sections()[1].remaining_seconds, 120);
    }

    #[test]
    fn max_rinses_fit_in_capacity() {
        let plan = build(COTTON_NORMAL, 2, true, 3);
        assert_eq!(plan.count_kind(WashSectionKind::Rinse), 5);
        assert_eq!(plan.len(), 15);
        assert_eq!(plan.sections().last().map(|s| s.kind), Some(WashSectionKind::FinalSpin));
    }

    #[test]
    fn invalid_program_builds_empty_plan() {
        let plan = build(14, 0, false, 0);
        assert!(plan.is_empty());
        assert_eq!(plan.eta_from(0), 0);
    }

    #[test]
    fn append_skips_non_positive_and_overflow() {
        let mut plan = WashPlan::new();
        assert!(!plan.append(WashSectionKind::Rinse, "x", 0, WashParams::default(), &[]));
        for _ in 0..MAX_WASH_SECTIONS {
            assert!(plan.append(WashSectionKind::Rinse, "x", 1, WashParams::default(), &[]));
        }
        assert!(!plan.append(WashSectionKind::FinalSpin, "y", 10, WashParams::default(), &[]));
        assert_eq!(plan.len(), MAX_WASH_SECTIONS);
    }

    #[test]
    fn long_labels_truncate() {
        let mut plan = WashPlan::new();
        plan.append(
            WashSectionKind::Rinse,
            "A very long label that will not fit",
            1,
            WashParams::default(),
            &[],
        );
        assert_eq!(plan.sections()[0].label.len(), SECTION_LABEL_LEN);
    }

    #[test]
    fn eta_from_sums_tail() {
        let plan = build(COTTON_NORMAL, 0, false, 0);
        assert_eq!(plan.eta_from(7), 360);
        assert_eq!(plan.eta_from(6), 600);
        assert_eq!(plan.eta_from(plan.len()), 0);
    }

    #[test]
    fn spins_and_detecting_carry_no_actions() {
        let plan = build(0, 2, true, 1);
        for s in plan.sections() {
            let expect_actions = matches!(
                s.kind,
                WashSectionKind::Saturation
                    | WashSectionKind::Prewash
                    | WashSectionKind::MainWash
                    | WashSectionKind::Rinse
            );
            assert_eq!(!s.actions.is_empty(), expect_actions, "{:?}", s.kind);
        }
    }

    #[test]
    fn spin_sections_drain_and_spin() {
        let p = defaults_for_section(WashSectionKind::FinalSpin);
        assert!(p.drain_water && !p.fill_water);
        assert_eq!(p.spin_rpm, 1000);
        assert_eq!(defaults_for_section(WashSectionKind::InterimSpin).spin_rpm, 400);
    }

    #[test]
    fn action_colouring() {
        let base = defaults_for_section(WashSectionKind::MainWash);

        let rolled = apply_actions(base, &[WashAction::Rolling, WashAction::Scrubbing]);
        assert_eq!(rolled.tumble_rpm, ROLLING_RPM + SCRUB_RPM_BOOST);

        let stepped = apply_actions(base, &[WashAction::Stepping]);
        assert_eq!((stepped.pump_on_steps, stepped.pump_on_step_ms), (STEP_COUNT, STEP_MS));

        let filtered = apply_actions(base, &[WashAction::Filtration]);
        assert_eq!((filtered.pump_on_start_frac, filtered.pump_on_end_frac), (0.0, 1.0));

        let swung = apply_actions(base, &[WashAction::Swinging]);
        assert_eq!(swung.tumble_duration_ms, base.tumble_duration_ms / 2);

        assert_eq!(apply_actions(base, &[WashAction::Tumbling]), base);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use crate::programs::{NUM_LOAD_SIZES, NUM_PROGRAMS};
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn rinse_count_clamps(extra in 0u8..=255) {
            let plan = build(5, 0, false, extra);
            let expected = usize::from((2 + u16::from(extra)).min(5) as u8);
            prop_assert_eq!(plan.count_kind(WashSectionKind::Rinse), expected);
        }

        #[test]
        fn plan_is_non_empty_and_deterministic(
            program in 0u8..NUM_PROGRAMS as u8,
            load in 0u8..NUM_LOAD_SIZES as u8,
            prewash in any::<bool>(),
            extra in 0u8..=255,
        ) {
            let a = build(program, load, prewash, extra);
            let b = build(program, load, prewash, extra);
            prop_assert!(!a.is_empty());
            prop_assert!(a.len() <= MAX_WASH_SECTIONS);
            prop_assert_eq!(a.total_seconds(), b.total_seconds());
            prop_assert_eq!(a, b);
        }

        #[test]
        fn eta_from_is_non_increasing_in_index(
            program in 0u8..NUM_PROGRAMS as u8,
            prewash in any::<bool>(),
            extra in 0u8..4,
        ) {
            let plan = build(program, 0, prewash, extra);
            for i in 0..plan.len() {
                prop_assert!(plan.eta_from(i + 1) <= plan.eta_from(i));
            }
        }
    }
}
