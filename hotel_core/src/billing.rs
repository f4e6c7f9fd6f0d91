//! Interval settlement. A closed service interval becomes exactly one
//! immutable `BillDetail`; the `(room_id, AC, start_time)` uniqueness key is
//! the double-settle guard. The settler is a pure function of room state and
//! end time; it shares nothing with the scheduler but the lock.

use chrono::{DateTime, Utc};
use hotel_protocol::{AC_RATE, AcMode, BILLABLE_EPSILON, BillDetail, DetailType, FanSpeed, RoomStatus};
use std::fmt;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::clock::sim_minutes_between;
use crate::errors::{CoreError, CoreResult};
use crate::registry::Room;

/// Why an interval closed. Logged with every settlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettleReason {
    PowerOff,
    Preempted,
    Rotated,
    SetpointReached,
    SpeedChange,
    ModeChange,
}

impl fmt::Display for SettleReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SettleReason::PowerOff => "power_off",
            SettleReason::Preempted => "preempted",
            SettleReason::Rotated => "rotated",
            SettleReason::SetpointReached => "setpoint_reached",
            SettleReason::SpeedChange => "speed_change",
            SettleReason::ModeChange => "mode_change",
        };
        write!(f, "{s}")
    }
}

/// Append-only bill ledger. In-memory authoritative copy of what the storage
/// collaborator would persist.
#[derive(Debug, Default)]
pub struct BillLedger {
    details: Vec<BillDetail>,
}

impl BillLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all(&self) -> &[BillDetail] {
        &self.details
    }

    pub fn snapshot(&self) -> Vec<BillDetail> {
        self.details.clone()
    }

    pub fn for_room(&self, room_id: u32) -> Vec<BillDetail> {
        self.details.iter().filter(|d| d.room_id == room_id).cloned().collect()
    }

    pub fn find_ac(&self, room_id: u32, start_time: DateTime<Utc>) -> Option<&BillDetail> {
        self.details.iter().find(|d| {
            d.detail_type == DetailType::Ac && d.room_id == room_id && d.start_time == start_time
        })
    }

    /// Settled AC cost for one room.
    pub fn ac_fee(&self, room_id: u32) -> f64 {
        self.details
            .iter()
            .filter(|d| d.room_id == room_id && d.detail_type == DetailType::Ac)
            .map(|d| d.cost)
            .sum()
    }

    /// Accumulated flat fees for one room.
    pub fn room_fee(&self, room_id: u32) -> f64 {
        self.details
            .iter()
            .filter(|d| d.room_id == room_id && d.detail_type == DetailType::RoomFee)
            .map(|d| d.cost)
            .sum()
    }

    /// Usage report grouped by fan speed, AC details only.
    pub fn usage_summary(&self) -> UsageSummary {
        let mut by_speed: Vec<SpeedUsage> = [FanSpeed::Low, FanSpeed::Medium, FanSpeed::High]
            .into_iter()
            .map(|fan_speed| SpeedUsage { fan_speed, duration_minutes: 0.0, cost: 0.0 })
            .collect();
        let mut sessions = 0usize;
        for d in self.details.iter().filter(|d| d.detail_type == DetailType::Ac) {
            sessions += 1;
            let slot = by_speed
                .iter_mut()
                .find(|s| s.fan_speed == d.fan_speed)
                .expect("all speeds present");
            slot.duration_minutes += d.duration_minutes;
            slot.cost += d.cost;
        }
        UsageSummary {
            total_sessions: sessions,
            total_duration_minutes: by_speed.iter().map(|s| s.duration_minutes).sum(),
            total_cost: by_speed.iter().map(|s| s.cost).sum(),
            by_fan_speed: by_speed,
        }
    }

    fn push(&mut self, detail: BillDetail) {
        self.details.push(detail);
    }

    /// Flat per-PowerOn fee. `start = end = now`; no uniqueness key beyond
    /// the natural one-per-PowerOn emission.
    pub fn push_room_fee(&mut self, room: &Room, now: DateTime<Utc>, rate: f64) -> BillDetail {
        let detail = BillDetail {
            id: Uuid::new_v4(),
            room_id: room.id,
            customer_id: occupant(room),
            ac_mode: room.ac_mode,
            fan_speed: room.fan_speed,
            start_time: now,
            end_time: now,
            duration_minutes: 0.0,
            rate,
            cost: rate,
            detail_type: DetailType::RoomFee,
        };
        info!(room = room.id, cost = rate, "room fee charged");
        self.push(detail.clone());
        detail
    }
}

#[derive(Debug, Clone)]
pub struct SpeedUsage {
    pub fan_speed: FanSpeed,
    pub duration_minutes: f64,
    pub cost: f64,
}

#[derive(Debug, Clone)]
pub struct UsageSummary {
    pub total_sessions: usize,
    pub total_duration_minutes: f64,
    pub total_cost: f64,
    pub by_fan_speed: Vec<SpeedUsage>,
}

/// Temperature delta delivered so far in the open interval, if any.
/// Clipped at zero: drifting the wrong way is never billed.
pub fn accrued(room: &Room) -> f64 {
    match room.open_interval() {
        Some((_, start_temp)) => temp_delta(room.ac_mode, start_temp, room.current_temp) * AC_RATE,
        None => 0.0,
    }
}

fn temp_delta(mode: AcMode, start_temp: f64, end_temp: f64) -> f64 {
    match mode {
        AcMode::Cooling => (start_temp - end_temp).max(0.0),
        AcMode::Heating => (end_temp - start_temp).max(0.0),
    }
}

fn occupant(room: &Room) -> Option<u32> {
    if room.status == RoomStatus::Occupied { room.customer_id } else { None }
}

/// Close the room's open interval at `end_time`.
///
/// No-op without an open interval. Clears the billing anchors on every
/// non-error path: the interval is closed whether or not it was billable.
/// A duplicate `(room_id, AC, start_time)` keeps the existing record.
pub fn settle(
    ledger: &mut BillLedger,
    room: &mut Room,
    end_time: DateTime<Utc>,
    reason: SettleReason,
) -> CoreResult<Option<BillDetail>> {
    let (start_time, start_temp) = match (room.serving_start_time, room.billing_start_temp) {
        (None, None) => return Ok(None),
        (Some(start), Some(temp)) => (start, temp),
        _ => {
            return Err(CoreError::Internal(format!(
                "room {} has serving_start_time={:?} but billing_start_temp={:?}",
                room.id, room.serving_start_time, room.billing_start_temp
            )));
        }
    };

    room.serving_start_time = None;
    room.billing_start_temp = None;

    let delta = temp_delta(room.ac_mode, start_temp, room.current_temp);
    if delta < BILLABLE_EPSILON {
        debug!(room = room.id, reason = %reason, "interval closed with no billable delta");
        return Ok(None);
    }

    if let Some(existing) = ledger.find_ac(room.id, start_time) {
        let conflict = CoreError::Conflict(format!(
            "room {} already settled for interval starting {start_time}",
            room.id
        ));
        warn!(%conflict, "keeping existing record");
        return Ok(Some(existing.clone()));
    }

    let detail = BillDetail {
        id: Uuid::new_v4(),
        room_id: room.id,
        customer_id: occupant(room),
        ac_mode: room.ac_mode,
        fan_speed: room.fan_speed,
        start_time,
        end_time,
        duration_minutes: sim_minutes_between(start_time, end_time),
        rate: AC_RATE,
        cost: delta * AC_RATE,
        detail_type: DetailType::Ac,
    };
    info!(
        room = room.id,
        reason = %reason,
        fan = %detail.fan_speed,
        cost = format_args!("{:.3}", detail.cost),
        minutes = format_args!("{:.2}", detail.duration_minutes),
        "interval settled"
    );
    ledger.push(detail.clone());
    Ok(Some(detail))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as SimDuration;

    fn serving_room(start_temp: f64, current: f64, start: DateTime<Utc>) -> Room {
        let mut room = Room::new(1, 32.0, 100.0);
        room.ac_on = true;
        room.serving_start_time = Some(start);
        room.billing_start_temp = Some(start_temp);
        room.current_temp = current;
        room
    }

    #[test]
    fn settle_without_open_interval_is_noop() {
        let mut ledger = BillLedger::new();
        let mut room = Room::new(1, 32.0, 100.0);
        let out = settle(&mut ledger, &mut room, Utc::now(), SettleReason::PowerOff).unwrap();
        assert!(out.is_none());
        assert!(ledger.all().is_empty());
    }

    #[test]
    fn settle_writes_temperature_driven_cost() {
        let start = Utc::now();
        let end = start + SimDuration::minutes(5);
        let mut ledger = BillLedger::new();
        let mut room = serving_room(30.0, 25.0, start);

        let detail = settle(&mut ledger, &mut room, end, SettleReason::SetpointReached)
            .unwrap()
            .unwrap();
        assert!((detail.cost - 5.0).abs() < 1e-9);
        assert!((detail.duration_minutes - 5.0).abs() < 1e-9);
        assert_eq!(detail.rate, AC_RATE);
        assert!(room.serving_start_time.is_none());
        assert!(room.billing_start_temp.is_none());
    }

    #[test]
    fn tiny_delta_closes_without_writing() {
        let start = Utc::now();
        let mut ledger = BillLedger::new();
        let mut room = serving_room(30.0, 30.0, start);
        let out = settle(&mut ledger, &mut room, start, SettleReason::SpeedChange).unwrap();
        assert!(out.is_none());
        assert!(ledger.all().is_empty());
        // anchors cleared anyway: the interval is closed
        assert!(room.open_interval().is_none());
    }

    #[test]
    fn duplicate_settlement_keeps_existing_record() {
        let start = Utc::now();
        let end = start + SimDuration::minutes(2);
        let mut ledger = BillLedger::new();
        let mut room = serving_room(30.0, 28.0, start);
        let first = settle(&mut ledger, &mut room, end, SettleReason::Preempted).unwrap().unwrap();

        // reopen the same interval (a would-be double settle)
        room.serving_start_time = Some(start);
        room.billing_start_temp = Some(30.0);
        room.current_temp = 27.0;
        let second = settle(&mut ledger, &mut room, end, SettleReason::PowerOff).unwrap().unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(ledger.all().len(), 1);
    }

    #[test]
    fn half_open_anchor_state_is_loud() {
        let mut ledger = BillLedger::new();
        let mut room = Room::new(1, 32.0, 100.0);
        room.serving_start_time = Some(Utc::now());
        let err = settle(&mut ledger, &mut room, Utc::now(), SettleReason::PowerOff).unwrap_err();
        assert!(matches!(err, CoreError::Internal(_)));
    }

    #[test]
    fn usage_summary_groups_by_fan_speed() {
        let start = Utc::now();
        let mut ledger = BillLedger::new();
        let mut room = serving_room(30.0, 27.0, start);
        settle(&mut ledger, &mut room, start + SimDuration::minutes(3), SettleReason::Rotated)
            .unwrap();
        room.serving_start_time = Some(start + SimDuration::minutes(10));
        room.billing_start_temp = Some(28.0);
        room.current_temp = 26.0;
        room.fan_speed = FanSpeed::High;
        settle(&mut ledger, &mut room, start + SimDuration::minutes(12), SettleReason::PowerOff)
            .unwrap();

        let summary = ledger.usage_summary();
        assert_eq!(summary.total_sessions, 2);
        assert!((summary.total_cost - 5.0).abs() < 1e-9);
        let high = summary.by_fan_speed.iter().find(|s| s.fan_speed == FanSpeed::High).unwrap();
        assert!((high.cost - 2.0).abs() < 1e-9);
    }
}
