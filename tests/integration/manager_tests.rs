//! System manager against the mock board: power sequences, cycle control,
//! tick bookkeeping and motor-stop escalation.

use washctl::app::ports::ButtonMask;
use washctl::events::{Command, CommandKind, Event, EventKind, SoundEffect};
use washctl::plan;
use washctl::programs::COTTON_NORMAL;
use washctl::ui::Menu;

use crate::mock_hw::{BoardCall, MockBoard, Rig};

fn press(rig: &mut Rig, kind: EventKind) {
    rig.manager.handle_event(Event::bare(kind));
}

fn door(rig: &mut Rig, open: bool) {
    rig.manager
        .handle_event(Event::new(EventKind::DoorState, i32::from(open)));
}

fn tick(rig: &mut Rig) {
    press(rig, EventKind::TimerTick);
}

fn kinds(cmds: &[Command]) -> Vec<(CommandKind, i32)> {
    cmds.iter().map(|c| (c.kind, c.arg0)).collect()
}

/// Powered, idle, cotton selected, command queue empty.
fn powered_rig() -> Rig {
    let mut rig = Rig::new();
    rig.store.set_program_id(COTTON_NORMAL);
    press(&mut rig, EventKind::PowerButton);
    rig.drain();
    rig
}

// ── Power sequences ───────────────────────────────────────────

#[test]
fn power_on_sequence() {
    let mut rig = Rig::new();
    press(&mut rig, EventKind::PowerButton);

    assert!(rig.store.is_powered());
    assert!(!rig.store.is_running());
    assert_eq!(
        kinds(&rig.drain()),
        [
            (CommandKind::SetPowerLed, 1),
            (CommandKind::SetDrumLed, 0),
            (CommandKind::SetStartLed, 0),
            (CommandKind::SetLogoEnable, 1),
            (CommandKind::PlaySound, SoundEffect::On as i32),
            (CommandKind::SetDrumLed, 0),
            (CommandKind::SetLogoEnable, 0),
        ]
    );
    assert_eq!(rig.board.last_wake_mask(), Some(ButtonMask::POWER_AND_START));
    assert_eq!(rig.ui.render_state().menu, Menu::Default);
    assert!(rig.store.system().drum_light_on);
}

#[test]
fn power_off_sequence_ends_in_deep_sleep() {
    let mut rig = powered_rig();
    press(&mut rig, EventKind::PowerButton);

    assert!(!rig.store.is_powered());
    let cmds = rig.drain();
    assert_eq!(Rig::sounds(&cmds), [SoundEffect::Off]);
    assert_eq!(
        kinds(&cmds).last(),
        Some(&(CommandKind::SetLogoEnable, 0)),
        "logo is the last thing switched off"
    );
    assert!(kinds(&cmds).contains(&(CommandKind::SetPowerLed, 0)));
    assert!(kinds(&cmds).contains(&(CommandKind::SetDrumLed, 3072)));
    assert_eq!(rig.board.last_wake_mask(), Some(ButtonMask::POWER));
    assert_eq!(rig.board.deep_sleeps(), 1);
    assert_eq!(rig.ui.render_state().menu, Menu::Logo);
}

#[test]
fn power_off_while_running_stops_motion_and_clears_cycle() {
    let mut rig = powered_rig();
    press(&mut rig, EventKind::StartButton);
    assert!(rig.manager.motion_active());

    press(&mut rig, EventKind::PowerButton);
    assert!(!rig.store.is_running());
    assert!(!rig.manager.motion_active());
    assert!(rig.manager.plan().is_empty());
    assert_eq!(rig.store.total_stages(), 0);
    assert_eq!(rig.store.eta(), 0);
    assert_eq!(rig.store.elapsed(), 0);
    assert!(rig.store.stage_label().is_empty());
    assert!(!rig.store.eta_available());
    assert_eq!(rig.board.calls().last(), Some(&BoardCall::DeepSleep));
    assert!(rig.board.calls().contains(&BoardCall::Velocity(0.0)));
}

#[test]
fn two_queued_power_presses_toggle_twice() {
    let mut rig = Rig::new();
    press(&mut rig, EventKind::PowerButton);
    press(&mut rig, EventKind::PowerButton);
    assert!(!rig.store.is_powered());
    assert_eq!(rig.board.deep_sleeps(), 1);
}

// ── Cycle control ─────────────────────────────────────────────

#[test]
fn start_is_ignored_while_powered_off() {
    let mut rig = Rig::new();
    press(&mut rig, EventKind::StartButton);
    assert!(!rig.store.is_running());
    assert!(rig.drain().is_empty());
    assert!(rig.manager.plan().is_empty());
}

#[test]
fn start_with_door_open_is_refused_with_error_cue() {
    let mut rig = powered_rig();
    door(&mut rig, true);
    press(&mut rig, EventKind::StartButton);

    assert!(!rig.store.is_running());
    assert!(!rig.manager.motion_active());
    let cmds = rig.drain();
    assert_eq!(Rig::sounds(&cmds), [SoundEffect::Error]);
    assert!(!kinds(&cmds).contains(&(CommandKind::SetStartLed, 1)));
}

#[test]
fn start_builds_plan_and_launches_first_section() {
    let mut rig = powered_rig();
    press(&mut rig, EventKind::StartButton);

    let expected = plan::build(COTTON_NORMAL, 0, false, 0);
    assert!(rig.store.is_running());
    assert_eq!(rig.manager.plan(), &expected);
    assert_eq!(rig.manager.stage_index(), 0);
    assert_eq!(rig.store.total_stages(), expected.len());
    assert_eq!(rig.store.stage_label().as_str(), "Detecting");
    assert!(rig.store.eta_available());
    assert_eq!(rig.store.eta(), expected.total_seconds());
    assert!(rig.manager.motion_active());

    let cmds = rig.drain();
    assert_eq!(
        kinds(&cmds),
        [
            (CommandKind::SetStartLed, 1),
            (CommandKind::PlaySound, SoundEffect::CycleStart as i32),
        ]
    );
}

#[test]
fn pause_then_start_rebuilds_from_first_section() {
    let mut rig = powered_rig();
    press(&mut rig, EventKind::StartButton);
    for _ in 0..120 {
        tick(&mut rig);
    }
    assert_eq!(rig.manager.stage_index(), 1);

    press(&mut rig, EventKind::StartButton);
    assert!(!rig.store.is_running());
    assert!(!rig.manager.motion_active());

    press(&mut rig, EventKind::StartButton);
    assert!(rig.store.is_running());
    assert_eq!(rig.manager.stage_index(), 0);
    assert_eq!(rig.store.eta(), rig.manager.plan().total_seconds());
    assert_eq!(rig.store.elapsed(), 0);

    let sounds = Rig::sounds(&rig.drain());
    assert_eq!(
        sounds,
        [SoundEffect::CycleStart, SoundEffect::Stop, SoundEffect::CycleStart]
    );
}

#[test]
fn opening_the_door_pauses_a_running_cycle() {
    let mut rig = powered_rig();
    press(&mut rig, EventKind::StartButton);
    rig.drain();

    door(&mut rig, true);
    assert!(rig.store.door_open());
    assert!(!rig.store.is_running());
    assert!(!rig.manager.motion_active());
    assert_eq!(Rig::sounds(&rig.drain()), [SoundEffect::Stop]);
}

#[test]
fn ticks_are_ignored_while_idle() {
    let mut rig = powered_rig();
    tick(&mut rig);
    assert_eq!(rig.store.elapsed(), 0);
    assert!(rig.drain().is_empty());
}

#[test]
fn eta_never_increases_while_running() {
    let mut rig = powered_rig();
    press(&mut rig, EventKind::StartButton);

    let initial = rig.store.eta();
    let mut last = initial;
    for _ in 0..300 {
        tick(&mut rig);
        let eta = rig.store.eta();
        assert!(eta <= last, "eta went from {} to {}", last, eta);
        last = eta;
    }
    assert_eq!(rig.store.elapsed(), 300);
    assert_eq!(last, initial - 300);
}

#[test]
fn full_cycle_completes_once() {
    let mut rig = powered_rig();
    press(&mut rig, EventKind::StartButton);
    let total = rig.manager.plan().total_seconds();

    let mut cmds = Vec::new();
    let mut ticks = 0;
    while rig.store.is_running() {
        tick(&mut rig);
        ticks += 1;
        cmds.extend(rig.drain());
        assert!(ticks <= total, "cycle overran its plan");
    }
    // Trailing ticks after completion change nothing.
    tick(&mut rig);
    cmds.extend(rig.drain());

    let len = rig.manager.plan().len();
    assert_eq!(ticks, total);
    assert_eq!(rig.store.elapsed(), total as u32);
    assert_eq!(rig.store.current_stage(), len);
    assert_eq!(rig.store.total_stages(), len);
    assert_eq!(rig.store.stage_label().as_str(), "Complete");
    assert_eq!(rig.store.eta(), 0);
    assert!(!rig.store.eta_available());
    assert!(!rig.manager.motion_active());
    let ends = Rig::sounds(&cmds)
        .into_iter()
        .filter(|s| *s == SoundEffect::CycleEnd)
        .count();
    assert_eq!(ends, 1);
}

#[test]
fn muted_store_suppresses_cues() {
    let mut rig = Rig::new();
    rig.store.set_muted(true);
    press(&mut rig, EventKind::PowerButton);
    press(&mut rig, EventKind::StartButton);
    assert!(Rig::sounds(&rig.drain()).is_empty());
}

// ── Escalation ────────────────────────────────────────────────

#[test]
fn unresponsive_motor_escalates_even_when_muted() {
    let board = MockBoard::new();
    board.fail_motor();
    let mut rig = Rig::with_board(board);
    rig.store.set_program_id(COTTON_NORMAL);
    rig.store.set_muted(true);
    press(&mut rig, EventKind::PowerButton);
    rig.drain();

    press(&mut rig, EventKind::StartButton);
    assert_eq!(rig.manager.safety_faults(), 1);
    assert_eq!(Rig::sounds(&rig.drain()), [SoundEffect::Error]);

    press(&mut rig, EventKind::StartButton);
    assert_eq!(rig.manager.safety_faults(), 2);
}

// ── UI and sensor ─────────────────────────────────────────────

#[test]
fn menu_consumes_start_presses() {
    let mut rig = powered_rig();
    press(&mut rig, EventKind::StartLongPress);
    assert_eq!(rig.ui.render_state().menu, Menu::WashSettings);

    press(&mut rig, EventKind::StartButton);
    assert!(rig.ui.render_state().editing);
    assert!(!rig.store.is_running());
    assert!(rig.drain().is_empty());
}

#[test]
fn dial_in_default_menu_selects_program() {
    let mut rig = Rig::new();
    rig.manager
        .handle_event(Event::new(EventKind::DialDelta, i32::from(COTTON_NORMAL)));
    assert_eq!(rig.store.program_id(), COTTON_NORMAL);
}

#[test]
fn sensor_samples_do_not_change_state() {
    let mut rig = powered_rig();
    let before = rig.store.snapshot();

    rig.manager
        .handle_event(Event::new(EventKind::SensorSample, 1800));
    assert_eq!(rig.store.snapshot(), before);
    assert!(rig.drain().is_empty());
}
