//! Scripted acceptance run: five rooms, three AC units, 25 simulated
//! minutes of guest activity. The clock is paused and driven by one-minute
//! jumps, so the replay finishes instantly regardless of the acceleration
//! factor.

use chrono::Duration as SimDuration;
use hotel_protocol::FanSpeed;
use tracing::{info, warn};

use crate::core::Core;
use crate::logging;

#[derive(Debug, Clone, Copy)]
enum Action {
    Start,
    Stop,
    Temp(f64),
    Speed(FanSpeed),
}

struct Step {
    minute: i64,
    room: u32,
    action: Action,
}

fn step(minute: i64, room: u32, action: Action) -> Step {
    Step { minute, room, action }
}

/// (room_id, ambient °C, daily rate)
const ROOM_SEEDS: [(u32, f64, f64); 5] = [
    (1, 32.0, 100.0),
    (2, 28.0, 125.0),
    (3, 30.0, 150.0),
    (4, 29.0, 200.0),
    (5, 35.0, 100.0),
];

fn timeline() -> Vec<Step> {
    use Action::*;
    vec![
        step(0, 1, Start),
        step(1, 1, Temp(18.0)),
        step(5, 1, Speed(FanSpeed::High)),
        step(9, 1, Temp(22.0)),
        step(14, 1, Stop),
        step(18, 1, Start),
        step(24, 1, Stop),
        step(1, 2, Start),
        step(3, 2, Temp(19.0)),
        step(6, 2, Stop),
        step(7, 2, Start),
        step(11, 2, Temp(22.0)),
        step(16, 2, Stop),
        step(19, 2, Start),
        step(25, 2, Stop),
        step(2, 3, Start),
        step(14, 3, Temp(24.0)),
        step(14, 3, Speed(FanSpeed::Low)),
        step(17, 3, Speed(FanSpeed::High)),
        step(22, 3, Stop),
        step(3, 4, Start),
        step(7, 4, Speed(FanSpeed::High)),
        step(9, 4, Temp(18.0)),
        step(9, 4, Speed(FanSpeed::High)),
        step(18, 4, Temp(20.0)),
        step(18, 4, Speed(FanSpeed::Medium)),
        step(25, 4, Stop),
        step(1, 5, Start),
        step(4, 5, Temp(22.0)),
        step(12, 5, Speed(FanSpeed::Low)),
        step(15, 5, Temp(20.0)),
        step(15, 5, Speed(FanSpeed::High)),
        step(20, 5, Temp(25.0)),
        step(23, 5, Stop),
    ]
}

pub async fn run(core: &Core) -> anyhow::Result<()> {
    for (id, ambient, rate) in ROOM_SEEDS {
        core.configure_room(id, ambient, rate)?;
    }
    core.clock().pause();

    let steps = timeline();
    let last_minute = steps.iter().map(|s| s.minute).max().unwrap_or(0);
    info!(minutes = last_minute, rooms = ROOM_SEEDS.len(), "replaying acceptance timeline");

    for minute in 0..=last_minute {
        if minute > 0 {
            core.clock().advance(SimDuration::minutes(1));
        }
        core.advance_all();
        for s in steps.iter().filter(|s| s.minute == minute) {
            let result = match s.action {
                Action::Start => core.power_on(s.room, None),
                Action::Stop => core.power_off(s.room),
                Action::Temp(t) => core.change_temp(s.room, t),
                Action::Speed(fan) => core.change_speed(s.room, fan),
            };
            match result {
                Ok(msg) => info!(minute, room = s.room, %msg, "step applied"),
                Err(e) => warn!(minute, room = s.room, error = %e, "step refused"),
            }
        }
        for d in core.drain_settlement_log() {
            logging::csv::log_settlement(&d).await;
        }
    }

    let summary = core.usage_summary();
    info!(
        sessions = summary.total_sessions,
        minutes = format_args!("{:.1}", summary.total_duration_minutes),
        cost = format_args!("{:.2}", summary.total_cost),
        "scenario complete"
    );
    for s in &summary.by_fan_speed {
        info!(
            fan = %s.fan_speed,
            minutes = format_args!("{:.1}", s.duration_minutes),
            cost = format_args!("{:.2}", s.cost),
            "usage by fan speed"
        );
    }

    let details = core.bill_details();
    logging::csv::export_bill_details("logs/bill_details.csv", &details).await?;
    info!(records = details.len(), "ledger exported to logs/bill_details.csv");
    Ok(())
}
