//! Temperature evolution under the simulated clock. The only writer of
//! `current_temp`. Serviced rooms move toward their setpoint at the fan
//! speed's rate; everything else drifts back toward ambient.
//!
//! Advancing is two-phase: every room is first brought to `now` (settling
//! and pausing rooms that reached their setpoint on the way), and only then
//! are rewarmed rooms re-admitted and the scheduling pass run. Queue
//! transitions therefore always settle against fresh temperatures.

use chrono::{DateTime, Utc};
use hotel_protocol::{AcMode, REACH_EPSILON, REWARM_RATE, WAKE_DRIFT};
use tracing::{error, info, warn};

use crate::billing::SettleReason;
use crate::clock::sim_minutes_between;
use crate::core::{Core, CoreState};
use crate::errors::{CoreError, CoreResult};

impl Core {
    /// Advance every room to the current simulated time, re-admit rooms that
    /// rewarmed past the wake threshold, then run a scheduling pass (this is
    /// what drives time-slice rotation between commands). Billing conflicts
    /// are swallowed; anything else is loud.
    pub fn advance_all(&self) {
        let now = self.clock.now();
        let mut guard = self.lock_state();
        let st = &mut *guard;
        if let Err(e) = self.advance_and_admit(st, now) {
            error!(error = %e, "thermal advance failed");
        }
        if let Err(e) = self.schedule_pass(st, now) {
            error!(error = %e, "scheduling pass failed");
        }
    }

    /// Bring all rooms to `now`, then admit the ones that woke.
    pub(crate) fn advance_and_admit(
        &self,
        st: &mut CoreState,
        now: DateTime<Utc>,
    ) -> CoreResult<()> {
        for room_id in self.advance_rooms_state(st, now)? {
            self.admit(st, room_id, now)?;
        }
        Ok(())
    }

    /// Phase one: pure thermal advance for every room. Returns the rooms
    /// whose rewarm crossed the wake threshold; admission is the caller's
    /// job, so settlements never see a half-advanced registry.
    pub(crate) fn advance_rooms_state(
        &self,
        st: &mut CoreState,
        now: DateTime<Utc>,
    ) -> CoreResult<Vec<u32>> {
        let mut woken = Vec::new();
        for room_id in st.rooms.ids() {
            match self.advance_room_state(st, room_id, now) {
                Ok(true) => woken.push(room_id),
                Ok(false) => {}
                Err(CoreError::Conflict(msg)) => {
                    warn!(room = room_id, %msg, "conflict during advance")
                }
                Err(e) => return Err(e),
            }
        }
        Ok(woken)
    }

    /// Advance one room. Returns `true` when the room rewarmed past the wake
    /// threshold and wants re-admission.
    pub(crate) fn advance_room_state(
        &self,
        st: &mut CoreState,
        room_id: u32,
        now: DateTime<Utc>,
    ) -> CoreResult<bool> {
        let in_serving = st.serving.iter().any(|r| r.room_id == room_id);
        let room = st.rooms.get_mut(room_id)?;

        let Some(last) = room.last_temp_update else {
            room.last_temp_update = Some(now);
            return Ok(false);
        };
        let delta_min = sim_minutes_between(last, now);
        if delta_min <= 0.0 {
            return Ok(false); // zero elapsed: strict no-op
        }

        if !room.ac_on {
            room.current_temp =
                drift_toward(room.current_temp, room.default_temp, REWARM_RATE * delta_min);
            room.last_temp_update = Some(now);
            return Ok(false);
        }

        if in_serving && !room.cooling_paused {
            let rate = room.fan_speed.degrees_per_minute();
            let target = room.target_temp.unwrap_or(room.default_temp);
            room.current_temp = match room.ac_mode {
                AcMode::Cooling => (room.current_temp - rate * delta_min).max(target),
                AcMode::Heating => (room.current_temp + rate * delta_min).min(target),
            };
            room.last_temp_update = Some(now);
            if (room.current_temp - target).abs() < REACH_EPSILON {
                room.current_temp = target;
                self.handle_temp_reached(st, room_id, now)?;
            }
            return Ok(false);
        }

        // ac_on but unserved: paused or waiting rooms rewarm toward ambient
        room.current_temp =
            drift_toward(room.current_temp, room.default_temp, REWARM_RATE * delta_min);
        room.last_temp_update = Some(now);

        if room.cooling_paused {
            let Some(pause_temp) = room.pause_start_temp else {
                return Err(CoreError::Internal(format!(
                    "room {room_id} is paused without a pause_start_temp"
                )));
            };
            if (room.current_temp - pause_temp).abs() >= WAKE_DRIFT {
                // conditional flip under the lock: only a paused room wakes
                room.cooling_paused = false;
                room.pause_start_temp = None;
                info!(
                    room = room_id,
                    temp = format_args!("{:.2}", room.current_temp),
                    "rewarmed past threshold; requesting service"
                );
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Setpoint reached: settle the interval, free the slot, pause. The
    /// freed slot is filled by the scheduling pass that follows the advance.
    fn handle_temp_reached(
        &self,
        st: &mut CoreState,
        room_id: u32,
        now: DateTime<Utc>,
    ) -> CoreResult<()> {
        let Some(idx) = st.serving.iter().position(|r| r.room_id == room_id) else {
            return Ok(()); // already removed by a concurrent transition
        };
        st.serving.remove(idx);
        self.close_interval(st, room_id, now, SettleReason::SetpointReached)?;
        let room = st.rooms.get_mut(room_id)?;
        room.cooling_paused = true;
        room.pause_start_temp = Some(room.current_temp);
        info!(
            room = room_id,
            temp = format_args!("{:.2}", room.current_temp),
            "setpoint reached; service paused"
        );
        Ok(())
    }
}

/// Move `current` toward `ambient` by at most `amount`, never overshooting.
fn drift_toward(current: f64, ambient: f64, amount: f64) -> f64 {
    if current < ambient {
        (current + amount).min(ambient)
    } else {
        (current - amount).max(ambient)
    }
}
