//! Authoritative per-room state. Every mutation happens under the scheduler
//! lock; observers get copies through the snapshot views.

use chrono::{DateTime, Utc};
use hotel_protocol::{AcMode, FanSpeed, REACH_EPSILON, RoomStatus};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::config::Config;
use crate::errors::{CoreError, CoreResult};

#[derive(Debug, Clone, Serialize)]
pub struct Room {
    pub id: u32,
    pub status: RoomStatus,
    /// Ambient temperature the room relaxes toward when unserved.
    pub default_temp: f64,
    /// Simulated live temperature. Only the thermal advance writes this.
    pub current_temp: f64,
    pub target_temp: Option<f64>,
    pub ac_on: bool,
    pub ac_mode: AcMode,
    pub fan_speed: FanSpeed,
    pub daily_rate: f64,
    pub customer_id: Option<u32>,
    pub customer_name: Option<String>,
    /// Times this room has entered the serving set.
    pub schedule_count: u32,
    pub ac_session_start: Option<DateTime<Utc>>,
    /// Non-null iff the room is in the serving set (with `billing_start_temp`).
    pub serving_start_time: Option<DateTime<Utc>>,
    pub billing_start_temp: Option<f64>,
    /// Non-null iff the room is in the waiting queue.
    pub waiting_start_time: Option<DateTime<Utc>>,
    pub last_temp_update: Option<DateTime<Utc>>,
    pub cooling_paused: bool,
    pub pause_start_temp: Option<f64>,
}

impl Room {
    pub fn new(id: u32, default_temp: f64, daily_rate: f64) -> Self {
        Self {
            id,
            status: RoomStatus::Available,
            default_temp,
            current_temp: default_temp,
            target_temp: None,
            ac_on: false,
            ac_mode: AcMode::Cooling,
            fan_speed: FanSpeed::Medium,
            daily_rate,
            customer_id: None,
            customer_name: None,
            schedule_count: 0,
            ac_session_start: None,
            serving_start_time: None,
            billing_start_temp: None,
            waiting_start_time: None,
            last_temp_update: None,
            cooling_paused: false,
            pause_start_temp: None,
        }
    }

    /// Directional "nothing left to do" check: a cooling room at or below its
    /// setpoint (heating: at or above) parks instead of taking a slot.
    pub fn setpoint_met(&self) -> bool {
        let Some(target) = self.target_temp else { return false };
        match self.ac_mode {
            AcMode::Cooling => self.current_temp <= target + REACH_EPSILON,
            AcMode::Heating => self.current_temp >= target - REACH_EPSILON,
        }
    }

    /// The open billing interval, if any.
    pub fn open_interval(&self) -> Option<(DateTime<Utc>, f64)> {
        match (self.serving_start_time, self.billing_start_temp) {
            (Some(start), Some(temp)) => Some((start, temp)),
            _ => None,
        }
    }

    /// Explicit-field reset applied by PowerOff. `target_reset` is the
    /// current mode's default setpoint.
    pub fn reset_on_power_off(&mut self, target_reset: f64) {
        self.ac_on = false;
        self.ac_session_start = None;
        self.serving_start_time = None;
        self.billing_start_temp = None;
        self.waiting_start_time = None;
        self.cooling_paused = false;
        self.pause_start_temp = None;
        self.target_temp = Some(target_reset);
        self.fan_speed = FanSpeed::Medium;
        self.current_temp = self.default_temp;
    }
}

#[derive(Debug)]
pub struct RoomRegistry {
    rooms: BTreeMap<u32, Room>,
}

impl RoomRegistry {
    /// Seed `room_count` rooms (ids starting at 1) at the configured ambient
    /// temperature and fallback daily rate.
    pub fn seed(cfg: &Config) -> Self {
        let rooms = (1..=cfg.room_count)
            .map(|id| (id, Room::new(id, cfg.default_temp, cfg.room_rate)))
            .collect();
        Self { rooms }
    }

    pub fn get(&self, id: u32) -> CoreResult<&Room> {
        self.rooms.get(&id).ok_or(CoreError::NotFound(id))
    }

    pub fn get_mut(&mut self, id: u32) -> CoreResult<&mut Room> {
        self.rooms.get_mut(&id).ok_or(CoreError::NotFound(id))
    }

    pub fn ids(&self) -> Vec<u32> {
        self.rooms.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Room> {
        self.rooms.values()
    }

    // ------- occupancy contract (driven by the external check-in flow) ------

    pub fn check_in(&mut self, room_id: u32, customer_id: u32, name: &str) -> CoreResult<()> {
        let room = self.get_mut(room_id)?;
        if room.status != RoomStatus::Available {
            return Err(CoreError::Precondition(format!("room {room_id} is not available")));
        }
        room.status = RoomStatus::Occupied;
        room.customer_id = Some(customer_id);
        room.customer_name = Some(name.to_string());
        Ok(())
    }

    /// Clear the occupancy stamp. `Core::check_out` forces the AC off and
    /// settles the open interval before calling this.
    pub fn check_out(&mut self, room_id: u32) -> CoreResult<()> {
        let room = self.get_mut(room_id)?;
        if room.status != RoomStatus::Occupied {
            return Err(CoreError::Precondition(format!("room {room_id} has no occupant")));
        }
        room.status = RoomStatus::Available;
        room.customer_id = None;
        room.customer_name = None;
        Ok(())
    }

    pub fn set_maintenance(&mut self, room_id: u32, on: bool) -> CoreResult<()> {
        let room = self.get_mut(room_id)?;
        match (on, room.status) {
            (true, RoomStatus::Available) => {
                room.status = RoomStatus::Maintenance;
                Ok(())
            }
            (false, RoomStatus::Maintenance) => {
                room.status = RoomStatus::Available;
                Ok(())
            }
            _ => Err(CoreError::Precondition(format!(
                "room {room_id} cannot change maintenance state while {:?}",
                room.status
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_on_power_off_restores_defaults() {
        let mut room = Room::new(1, 30.0, 100.0);
        room.ac_on = true;
        room.fan_speed = FanSpeed::High;
        room.current_temp = 26.0;
        room.serving_start_time = Some(Utc::now());
        room.billing_start_temp = Some(30.0);
        room.cooling_paused = true;
        room.pause_start_temp = Some(26.0);

        room.reset_on_power_off(25.0);

        assert!(!room.ac_on);
        assert!(room.serving_start_time.is_none());
        assert!(room.billing_start_temp.is_none());
        assert!(room.waiting_start_time.is_none());
        assert!(!room.cooling_paused);
        assert_eq!(room.fan_speed, FanSpeed::Medium);
        assert_eq!(room.target_temp, Some(25.0));
        assert_eq!(room.current_temp, 30.0);
    }

    #[test]
    fn setpoint_met_is_directional() {
        let mut room = Room::new(1, 30.0, 100.0);
        room.target_temp = Some(25.0);
        room.current_temp = 24.0;
        assert!(room.setpoint_met()); // cooling, already below target

        room.current_temp = 26.0;
        assert!(!room.setpoint_met());

        room.ac_mode = AcMode::Heating;
        assert!(room.setpoint_met()); // heating, already above target
    }

    #[test]
    fn checkout_clears_the_occupancy_stamp() {
        let cfg = Config::default();
        let mut reg = RoomRegistry::seed(&cfg);
        reg.check_in(1, 7, "guest").unwrap();
        assert_eq!(reg.get(1).unwrap().status, RoomStatus::Occupied);
        reg.check_out(1).unwrap();
        let room = reg.get(1).unwrap();
        assert_eq!(room.status, RoomStatus::Available);
        assert!(room.customer_id.is_none());
        assert!(room.customer_name.is_none());
        assert!(matches!(reg.check_out(1), Err(CoreError::Precondition(_))));
    }
}
