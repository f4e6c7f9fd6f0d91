//! Property tests: for any sequence of commands and clock jumps, the
//! capacity bound, the anchor/queue equivalences and the ledger uniqueness
//! constraints hold after every step.

use std::collections::HashSet;

use chrono::Duration as SimDuration;
use hotel_core::{Config, Core};
use hotel_protocol::{AcMode, DetailType, FanSpeed};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    PowerOn(u32, f64),
    PowerOff(u32),
    ChangeTemp(u32, f64),
    ChangeSpeed(u32, FanSpeed),
    ChangeMode(u32, AcMode),
    Advance(i64),
}

fn fan_speed() -> impl Strategy<Value = FanSpeed> {
    prop_oneof![Just(FanSpeed::Low), Just(FanSpeed::Medium), Just(FanSpeed::High)]
}

fn ac_mode() -> impl Strategy<Value = AcMode> {
    prop_oneof![Just(AcMode::Cooling), Just(AcMode::Heating)]
}

fn op() -> impl Strategy<Value = Op> {
    let room = 1u32..=5;
    prop_oneof![
        (room.clone(), 20.0f64..36.0).prop_map(|(r, t)| Op::PowerOn(r, t)),
        room.clone().prop_map(Op::PowerOff),
        // occasionally outside the band on purpose; those must be refused
        (room.clone(), 15.0f64..31.0).prop_map(|(r, t)| Op::ChangeTemp(r, t)),
        (room.clone(), fan_speed()).prop_map(|(r, s)| Op::ChangeSpeed(r, s)),
        (room.clone(), ac_mode()).prop_map(|(r, m)| Op::ChangeMode(r, m)),
        (5i64..400).prop_map(Op::Advance),
    ]
}

fn check_invariants(core: &Core) {
    let status = core.schedule_status();
    assert!(status.serving.len() <= status.capacity, "serving set exceeds capacity");

    for id in 1..=5u32 {
        let snap = core.room_snapshot(id).unwrap();
        let in_serving = status.serving.iter().any(|e| e.room_id == id);
        let in_waiting = status.waiting.iter().any(|e| e.room_id == id);

        // triple equivalence between anchors and serving membership
        assert_eq!(snap.serving_start_time.is_some(), snap.billing_start_temp.is_some());
        assert_eq!(snap.serving_start_time.is_some(), in_serving);
        assert_eq!(snap.waiting_start_time.is_some(), in_waiting);

        // at most one of serving / waiting / paused
        assert!(!(in_serving && in_waiting));
        if snap.cooling_paused {
            assert!(!in_serving && !in_waiting);
            assert!(snap.pause_start_temp.is_some());
        }

        if !snap.ac_on {
            assert!(snap.serving_start_time.is_none());
            assert!(snap.waiting_start_time.is_none());
            assert!(snap.billing_start_temp.is_none());
            assert!(!snap.cooling_paused);
        }
    }

    let mut seen = HashSet::new();
    for d in core.bill_details() {
        assert!(d.cost >= 0.0);
        if d.detail_type == DetailType::Ac {
            assert!(d.start_time < d.end_time, "AC interval must have positive span");
            assert_eq!(d.rate, 1.0);
            assert!(seen.insert((d.room_id, d.start_time)), "duplicate AC settlement key");
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn scheduler_invariants_hold_under_any_command_sequence(
        ops in proptest::collection::vec(op(), 1..50)
    ) {
        let core = Core::new(Config::default());
        core.clock().pause();
        for id in 1..=5 {
            core.configure_room(id, 32.0, 100.0).unwrap();
        }

        for step in ops {
            let _ = match step {
                Op::PowerOn(r, t) => core.power_on(r, Some(t)).map(|_| ()),
                Op::PowerOff(r) => core.power_off(r).map(|_| ()),
                Op::ChangeTemp(r, t) => core.change_temp(r, t).map(|_| ()),
                Op::ChangeSpeed(r, s) => core.change_speed(r, s).map(|_| ()),
                Op::ChangeMode(r, m) => core.change_mode(r, m).map(|_| ()),
                Op::Advance(secs) => {
                    core.clock().advance(SimDuration::seconds(secs));
                    core.advance_all();
                    Ok(())
                }
            };
            check_invariants(&core);
        }
    }

    #[test]
    fn repeated_ticks_without_elapsed_time_are_idempotent(
        ops in proptest::collection::vec(op(), 1..20)
    ) {
        let core = Core::new(Config::default());
        core.clock().pause();
        for id in 1..=5 {
            core.configure_room(id, 32.0, 100.0).unwrap();
        }
        for step in ops {
            let _ = match step {
                Op::PowerOn(r, t) => core.power_on(r, Some(t)).map(|_| ()),
                Op::PowerOff(r) => core.power_off(r).map(|_| ()),
                Op::ChangeTemp(r, t) => core.change_temp(r, t).map(|_| ()),
                Op::ChangeSpeed(r, s) => core.change_speed(r, s).map(|_| ()),
                Op::ChangeMode(r, m) => core.change_mode(r, m).map(|_| ()),
                Op::Advance(secs) => {
                    core.clock().advance(SimDuration::seconds(secs));
                    core.advance_all();
                    Ok(())
                }
            };
        }

        core.advance_all();
        let rooms_before: Vec<String> = (1..=5)
            .map(|id| serde_json::to_string(&core.room_snapshot(id).unwrap()).unwrap())
            .collect();
        let bills_before = core.bill_details().len();

        core.advance_all();
        core.advance_all();

        let rooms_after: Vec<String> = (1..=5)
            .map(|id| serde_json::to_string(&core.room_snapshot(id).unwrap()).unwrap())
            .collect();
        prop_assert_eq!(rooms_before, rooms_after);
        prop_assert_eq!(core.bill_details().len(), bills_before);
    }
}
