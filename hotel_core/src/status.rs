//! Read-only views for observers: the per-room `RequestState` snapshot and
//! the queue overview. Querying advances the thermal model first, so views
//! are never staler than the instant they were taken.

use hotel_protocol::{QueueState, RequestState, ScheduleStatus, ServingEntry, WaitingEntry};

use crate::billing;
use crate::clock::sim_seconds_between;
use crate::core::Core;
use crate::errors::CoreResult;

impl Core {
    pub fn request_state(&self, room_id: u32) -> CoreResult<RequestState> {
        let now = self.clock.now();
        let mut guard = self.lock_state();
        let st = &mut *guard;
        // every AC-on room advances on a query, not just the one asked about
        self.advance_and_admit(st, now)?;
        self.schedule_pass(st, now)?;

        let serving = st.serving.iter().find(|r| r.room_id == room_id);
        let waiting = st.waiting.iter().find(|r| r.room_id == room_id);
        let room = st.rooms.get(room_id)?;

        let queue_state = if serving.is_some() {
            QueueState::Serving
        } else if waiting.is_some() {
            QueueState::Waiting
        } else if room.cooling_paused {
            QueueState::Paused
        } else {
            QueueState::Idle
        };

        let serving_seconds = serving
            .and_then(|r| r.serving_time)
            .map(|t| sim_seconds_between(t, now))
            .unwrap_or(0.0);
        let waiting_seconds = waiting
            .and_then(|r| r.waiting_time)
            .map(|t| sim_seconds_between(t, now))
            .unwrap_or(0.0);

        let room_fee = st.ledger.room_fee(room_id);
        // settled intervals plus whatever the open interval has accrued
        let ac_fee = st.ledger.ac_fee(room_id) + billing::accrued(room);

        Ok(RequestState {
            room_id,
            ac_on: room.ac_on,
            current_temp: room.current_temp,
            target_temp: room.target_temp,
            ac_mode: room.ac_mode,
            fan_speed: room.fan_speed,
            queue_state,
            serving_seconds,
            waiting_seconds,
            room_fee,
            ac_fee,
            total_cost: room_fee + ac_fee,
            schedule_count: room.schedule_count,
            customer_id: room.customer_id,
        })
    }

    pub fn schedule_status(&self) -> ScheduleStatus {
        self.advance_all();
        let now = self.clock.now();
        let st = self.lock_state();
        ScheduleStatus {
            capacity: self.cfg.ac_capacity,
            time_slice: self.cfg.time_slice_secs,
            serving: st
                .serving
                .iter()
                .filter_map(|r| {
                    r.serving_time.map(|t| ServingEntry {
                        room_id: r.room_id,
                        fan_speed: r.fan_speed,
                        serving_time: t,
                        serving_seconds: sim_seconds_between(t, now),
                    })
                })
                .collect(),
            waiting: st
                .waiting
                .iter()
                .filter_map(|r| {
                    r.waiting_time.map(|t| WaitingEntry {
                        room_id: r.room_id,
                        fan_speed: r.fan_speed,
                        waiting_time: t,
                        waiting_seconds: sim_seconds_between(t, now),
                    })
                })
                .collect(),
        }
    }
}
