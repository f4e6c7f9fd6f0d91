//! Queue bookkeeping: the request records and the victim/promotion picks.
//! Plain sorted scans over small Vecs; capacity is single digits and the
//! room population a few dozen at most.

use chrono::{DateTime, Utc};
use hotel_protocol::{AcMode, FanSpeed};
use serde::Serialize;

/// One room's presence in the serving set or waiting queue. Exactly one of
/// `serving_time` / `waiting_time` is set.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceRequest {
    pub room_id: u32,
    pub fan_speed: FanSpeed,
    pub mode: AcMode,
    pub target_temp: f64,
    pub serving_time: Option<DateTime<Utc>>,
    pub waiting_time: Option<DateTime<Utc>>,
}

impl ServiceRequest {
    pub fn priority(&self) -> u8 {
        self.fan_speed.priority()
    }
}

pub fn min_serving_priority(serving: &[ServiceRequest]) -> Option<u8> {
    serving.iter().map(|r| r.priority()).min()
}

/// Preemption victim: among serving members at `min_priority`, the one
/// serving longest (earliest serving_time; first index on exact ties).
pub fn preemption_victim(serving: &[ServiceRequest], min_priority: u8) -> Option<usize> {
    serving
        .iter()
        .enumerate()
        .filter(|(_, r)| r.priority() == min_priority)
        .min_by_key(|(_, r)| r.serving_time)
        .map(|(i, _)| i)
}

/// Rotation victim for a waiter of priority `prio`: among serving members
/// with priority <= prio, the one serving longest. Higher-priority
/// incumbents are untouchable.
pub fn rotation_victim(serving: &[ServiceRequest], prio: u8) -> Option<usize> {
    serving
        .iter()
        .enumerate()
        .filter(|(_, r)| r.priority() <= prio)
        .min_by_key(|(_, r)| r.serving_time)
        .map(|(i, _)| i)
}

/// Capacity eviction: lowest priority first, longest serving breaks ties.
pub fn eviction_victim(serving: &[ServiceRequest]) -> Option<usize> {
    let min = min_serving_priority(serving)?;
    preemption_victim(serving, min)
}

/// Promotion pick: highest priority, earliest waiting_time breaks ties.
pub fn promotion_pick(waiting: &[ServiceRequest]) -> Option<usize> {
    waiting
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| {
            b.priority()
                .cmp(&a.priority())
                .then(a.waiting_time.cmp(&b.waiting_time))
        })
        .map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as SimDuration;

    fn serving(room_id: u32, fan_speed: FanSpeed, started_secs_ago: i64) -> ServiceRequest {
        let now = Utc::now();
        ServiceRequest {
            room_id,
            fan_speed,
            mode: AcMode::Cooling,
            target_temp: 25.0,
            serving_time: Some(now - SimDuration::seconds(started_secs_ago)),
            waiting_time: None,
        }
    }

    fn waiting(room_id: u32, fan_speed: FanSpeed, waited_secs: i64) -> ServiceRequest {
        let now = Utc::now();
        ServiceRequest {
            room_id,
            fan_speed,
            mode: AcMode::Cooling,
            target_temp: 25.0,
            serving_time: None,
            waiting_time: Some(now - SimDuration::seconds(waited_secs)),
        }
    }

    #[test]
    fn preemption_picks_longest_serving_among_lowest() {
        let set = vec![
            serving(1, FanSpeed::Medium, 30),
            serving(2, FanSpeed::Medium, 90),
            serving(3, FanSpeed::High, 300),
        ];
        let min = min_serving_priority(&set).unwrap();
        assert_eq!(min, FanSpeed::Medium.priority());
        // room 2 served longer than room 1; room 3 is above the minimum
        assert_eq!(preemption_victim(&set, min), Some(1));
    }

    #[test]
    fn rotation_never_touches_higher_priority() {
        let set = vec![serving(1, FanSpeed::High, 500), serving(2, FanSpeed::High, 400)];
        assert_eq!(rotation_victim(&set, FanSpeed::Medium.priority()), None);
        assert_eq!(rotation_victim(&set, FanSpeed::High.priority()), Some(0));
    }

    #[test]
    fn promotion_prefers_priority_then_age() {
        let q = vec![
            waiting(1, FanSpeed::Medium, 600),
            waiting(2, FanSpeed::High, 10),
            waiting(3, FanSpeed::High, 60),
        ];
        // HIGH beats the older MEDIUM; among HIGH the longer waiter wins
        assert_eq!(promotion_pick(&q), Some(2));
    }
}
