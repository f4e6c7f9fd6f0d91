//! Serving-set / waiting-queue discipline and the user commands.
//!
//! Every command takes the scheduler lock, mutates, then runs a scheduling
//! pass (rotation + capacity enforcement). Every departure from the serving
//! set settles the open billing interval; every entry opens a new one. No
//! interval survives a parameter change.

// src/scheduler/mod.rs
pub mod queue;

use hotel_protocol::{AcMode, FanSpeed};
use tracing::info;

use crate::billing::SettleReason;
use crate::clock::sim_seconds_between;
use crate::core::{Core, CoreState};
use crate::errors::{CoreError, CoreResult};
use chrono::{DateTime, Utc};
use queue::ServiceRequest;

impl Core {
    // ------------------------------ commands -------------------------------

    pub fn power_on(&self, room_id: u32, current_temp: Option<f64>) -> CoreResult<String> {
        let now = self.clock.now();
        let mut guard = self.lock_state();
        let st = &mut *guard;
        if st.rooms.get(room_id)?.ac_on {
            return Err(CoreError::AlreadyInState(format!("room {room_id} AC is already on")));
        }
        self.advance_and_admit(st, now)?;
        {
            let room = st.rooms.get_mut(room_id)?;
            if let Some(t) = current_temp {
                room.current_temp = t;
            }
            room.ac_on = true;
            room.ac_session_start = Some(now);
            room.last_temp_update = Some(now);
            if room.target_temp.is_none() {
                room.target_temp = Some(self.cfg.mode_default(room.ac_mode));
            }
        }
        if self.cfg.cycle_daily_fee {
            let CoreState { rooms, ledger, pending_log, .. } = st;
            let room = rooms.get(room_id)?;
            let rate = if room.daily_rate > 0.0 { room.daily_rate } else { self.cfg.room_rate };
            let detail = ledger.push_room_fee(room, now, rate);
            pending_log.push(detail);
        }
        info!(room = room_id, "power on");
        self.admit(st, room_id, now)?;
        self.schedule_pass(st, now)?;
        Ok(format!("room {room_id} AC powered on"))
    }

    pub fn power_off(&self, room_id: u32) -> CoreResult<String> {
        let now = self.clock.now();
        let mut guard = self.lock_state();
        let st = &mut *guard;
        {
            let room = st.rooms.get(room_id)?;
            if !room.ac_on {
                return Err(CoreError::Precondition(format!("room {room_id} AC is not on")));
            }
        }
        self.advance_and_admit(st, now)?;
        self.force_power_off(st, room_id, now)?;
        info!(room = room_id, "power off");
        Ok(format!("room {room_id} AC powered off"))
    }

    /// Shut the AC down unconditionally: settle the open interval, drop the
    /// room from both queues, reset it, refill the freed slot. Shared by
    /// PowerOff and the checkout/maintenance hooks, which must not leave a
    /// released room holding capacity.
    pub(crate) fn force_power_off(
        &self,
        st: &mut CoreState,
        room_id: u32,
        now: DateTime<Utc>,
    ) -> CoreResult<()> {
        self.close_interval(st, room_id, now, SettleReason::PowerOff)?;
        st.serving.retain(|r| r.room_id != room_id);
        st.waiting.retain(|r| r.room_id != room_id);
        let target_reset = {
            let room = st.rooms.get(room_id)?;
            self.cfg.mode_default(room.ac_mode)
        };
        {
            let room = st.rooms.get_mut(room_id)?;
            room.reset_on_power_off(target_reset);
            room.last_temp_update = Some(now);
        }
        self.schedule_pass(st, now)
    }

    pub fn change_temp(&self, room_id: u32, target: f64) -> CoreResult<String> {
        let now = self.clock.now();
        let mut guard = self.lock_state();
        let st = &mut *guard;
        {
            let room = st.rooms.get(room_id)?;
            if !room.ac_on {
                return Err(CoreError::Precondition(format!("room {room_id} AC is not on")));
            }
            let (min, max) = self.cfg.mode_band(room.ac_mode);
            if !(min..=max).contains(&target) {
                return Err(CoreError::Precondition(format!(
                    "target {target}°C outside {} band [{min}, {max}]",
                    room.ac_mode
                )));
            }
        }
        self.advance_and_admit(st, now)?;
        {
            let room = st.rooms.get_mut(room_id)?;
            room.target_temp = Some(target);
        }
        for req in st.serving.iter_mut().chain(st.waiting.iter_mut()) {
            if req.room_id == room_id {
                req.target_temp = target;
            }
        }
        if st.rooms.get(room_id)?.cooling_paused {
            let room = st.rooms.get_mut(room_id)?;
            room.cooling_paused = false;
            room.pause_start_temp = None;
            info!(room = room_id, target, "setpoint changed; waking paused room");
            self.admit(st, room_id, now)?;
        }
        self.schedule_pass(st, now)?;
        Ok(format!("room {room_id} target set to {target}°C"))
    }

    pub fn change_speed(&self, room_id: u32, speed: FanSpeed) -> CoreResult<String> {
        let now = self.clock.now();
        let mut guard = self.lock_state();
        let st = &mut *guard;
        {
            let room = st.rooms.get(room_id)?;
            if !room.ac_on {
                return Err(CoreError::Precondition(format!("room {room_id} AC is not on")));
            }
            if room.fan_speed == speed {
                return Err(CoreError::AlreadyInState(format!(
                    "room {room_id} fan speed is already {speed}"
                )));
            }
        }
        self.advance_and_admit(st, now)?;
        if let Some(idx) = st.serving.iter().position(|r| r.room_id == room_id) {
            // settle at the old speed, then re-admit as a fresh request
            st.serving.remove(idx);
            self.close_interval(st, room_id, now, SettleReason::SpeedChange)?;
            st.rooms.get_mut(room_id)?.fan_speed = speed;
            self.admit(st, room_id, now)?;
        } else if let Some(idx) = st.waiting.iter().position(|r| r.room_id == room_id) {
            st.waiting.remove(idx);
            let room = st.rooms.get_mut(room_id)?;
            room.fan_speed = speed;
            room.waiting_start_time = None;
            self.admit(st, room_id, now)?;
        } else {
            // paused: the new speed applies when the room rewakes
            st.rooms.get_mut(room_id)?.fan_speed = speed;
        }
        info!(room = room_id, fan = %speed, "fan speed changed");
        self.schedule_pass(st, now)?;
        Ok(format!("room {room_id} fan speed set to {speed}"))
    }

    pub fn change_mode(&self, room_id: u32, mode: AcMode) -> CoreResult<String> {
        let now = self.clock.now();
        let mut guard = self.lock_state();
        let st = &mut *guard;
        {
            let room = st.rooms.get(room_id)?;
            if !room.ac_on {
                return Err(CoreError::Precondition(format!("room {room_id} AC is not on")));
            }
            if room.ac_mode == mode {
                return Err(CoreError::AlreadyInState(format!(
                    "room {room_id} is already in {mode} mode"
                )));
            }
        }
        self.advance_and_admit(st, now)?;
        if let Some(idx) = st.serving.iter().position(|r| r.room_id == room_id) {
            st.serving.remove(idx);
            self.close_interval(st, room_id, now, SettleReason::ModeChange)?;
        } else if let Some(idx) = st.waiting.iter().position(|r| r.room_id == room_id) {
            st.waiting.remove(idx);
        }
        {
            let room = st.rooms.get_mut(room_id)?;
            room.ac_mode = mode;
            room.target_temp = Some(self.cfg.mode_default(mode));
            room.waiting_start_time = None;
            if room.cooling_paused {
                room.cooling_paused = false;
                room.pause_start_temp = None;
            }
        }
        info!(room = room_id, mode = %mode, "mode changed");
        self.admit(st, room_id, now)?;
        self.schedule_pass(st, now)?;
        Ok(format!("room {room_id} switched to {mode}"))
    }

    // ------------------------- queue transitions ---------------------------

    /// Admission of a (re-)requesting room: a setpoint-met room parks as
    /// paused; otherwise it takes a free slot, preempts the weakest serving
    /// member, or joins the waiting queue.
    pub(crate) fn admit(
        &self,
        st: &mut CoreState,
        room_id: u32,
        now: DateTime<Utc>,
    ) -> CoreResult<()> {
        let req = {
            let room = st.rooms.get_mut(room_id)?;
            if room.setpoint_met() {
                room.cooling_paused = true;
                room.pause_start_temp = Some(room.current_temp);
                info!(
                    room = room_id,
                    temp = room.current_temp,
                    "setpoint already met; parked without a slot"
                );
                return Ok(());
            }
            ServiceRequest {
                room_id,
                fan_speed: room.fan_speed,
                mode: room.ac_mode,
                target_temp: room.target_temp.unwrap_or(self.cfg.mode_default(room.ac_mode)),
                serving_time: None,
                waiting_time: None,
            }
        };
        if st.serving.len() < self.cfg.ac_capacity {
            return self.start_serving(st, req, now);
        }
        if let Some(min_prio) = queue::min_serving_priority(&st.serving) {
            if req.priority() > min_prio {
                if let Some(idx) = queue::preemption_victim(&st.serving, min_prio) {
                    let victim = st.serving[idx].room_id;
                    self.demote_to_waiting(st, idx, now, SettleReason::Preempted)?;
                    info!(room = room_id, evicted = victim, "priority preemption");
                    return self.start_serving(st, req, now);
                }
            }
        }
        self.enqueue_waiting(st, req, now)
    }

    fn start_serving(
        &self,
        st: &mut CoreState,
        mut req: ServiceRequest,
        now: DateTime<Utc>,
    ) -> CoreResult<()> {
        let room = st.rooms.get_mut(req.room_id)?;
        req.serving_time = Some(now);
        req.waiting_time = None;
        room.serving_start_time = Some(now);
        room.billing_start_temp = Some(room.current_temp);
        room.waiting_start_time = None;
        room.schedule_count += 1;
        info!(room = req.room_id, fan = %req.fan_speed, "serving slot granted");
        st.serving.push(req);
        Ok(())
    }

    fn enqueue_waiting(
        &self,
        st: &mut CoreState,
        mut req: ServiceRequest,
        now: DateTime<Utc>,
    ) -> CoreResult<()> {
        let room = st.rooms.get_mut(req.room_id)?;
        req.serving_time = None;
        req.waiting_time = Some(now);
        room.waiting_start_time = Some(now);
        info!(room = req.room_id, fan = %req.fan_speed, "queued for service");
        st.waiting.push(req);
        Ok(())
    }

    /// Evict a serving member: settle its interval and move it to waiting
    /// with a fresh waiting_time.
    fn demote_to_waiting(
        &self,
        st: &mut CoreState,
        serving_idx: usize,
        now: DateTime<Utc>,
        reason: SettleReason,
    ) -> CoreResult<()> {
        let mut req = st.serving.remove(serving_idx);
        self.close_interval(st, req.room_id, now, reason)?;
        req.serving_time = None;
        req.waiting_time = Some(now);
        st.rooms.get_mut(req.room_id)?.waiting_start_time = Some(now);
        info!(room = req.room_id, reason = %reason, "moved to waiting queue");
        st.waiting.push(req);
        Ok(())
    }

    /// Settle the room's open interval (if any) and queue the record for the
    /// CSV appender.
    pub(crate) fn close_interval(
        &self,
        st: &mut CoreState,
        room_id: u32,
        now: DateTime<Utc>,
        reason: SettleReason,
    ) -> CoreResult<()> {
        let CoreState { rooms, ledger, pending_log, .. } = st;
        let room = rooms.get_mut(room_id)?;
        if let Some(detail) = crate::billing::settle(ledger, room, now, reason)? {
            pending_log.push(detail);
        }
        Ok(())
    }

    // -------------------------- scheduling pass ----------------------------

    /// Rotation then capacity enforcement. Runs after every transition and
    /// on the periodic thermal trigger.
    pub(crate) fn schedule_pass(&self, st: &mut CoreState, now: DateTime<Utc>) -> CoreResult<()> {
        self.rotate_expired(st, now)?;
        self.enforce_capacity(st, now)
    }

    /// Time-slice rotation: a waiter aged past the slice swaps with the
    /// longest-serving incumbent of equal-or-lower priority.
    fn rotate_expired(&self, st: &mut CoreState, now: DateTime<Utc>) -> CoreResult<()> {
        let slice = self.cfg.time_slice_secs as f64;
        let mut expired: Vec<(u8, DateTime<Utc>, u32)> = st
            .waiting
            .iter()
            .filter_map(|r| r.waiting_time.map(|w| (r.priority(), w, r.room_id)))
            .filter(|(_, waited_since, _)| sim_seconds_between(*waited_since, now) >= slice)
            .collect();
        expired.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));

        for (prio, _, waiter) in expired {
            if !st.waiting.iter().any(|r| r.room_id == waiter) {
                continue; // promoted by an earlier swap
            }
            let Some(victim_idx) = queue::rotation_victim(&st.serving, prio) else {
                continue; // only higher-priority incumbents are serving
            };
            let victim = st.serving[victim_idx].room_id;
            self.demote_to_waiting(st, victim_idx, now, SettleReason::Rotated)?;
            let waiter_idx = st
                .waiting
                .iter()
                .position(|r| r.room_id == waiter)
                .expect("waiter still queued");
            let req = st.waiting.remove(waiter_idx);
            self.start_serving(st, req, now)?;
            info!(rotated_in = waiter, rotated_out = victim, "time-slice rotation");
        }
        Ok(())
    }

    fn enforce_capacity(&self, st: &mut CoreState, now: DateTime<Utc>) -> CoreResult<()> {
        while st.serving.len() > self.cfg.ac_capacity {
            let idx = queue::eviction_victim(&st.serving)
                .ok_or_else(|| CoreError::Internal("serving set empty while over capacity".into()))?;
            self.demote_to_waiting(st, idx, now, SettleReason::Preempted)?;
        }
        while st.serving.len() < self.cfg.ac_capacity {
            let Some(idx) = queue::promotion_pick(&st.waiting) else { break };
            let req = st.waiting.remove(idx);
            let promoted = req.room_id;
            self.start_serving(st, req, now)?;
            info!(room = promoted, "promoted from waiting queue");
        }
        Ok(())
    }
}
