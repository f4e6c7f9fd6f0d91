//! The `Core` value: one SimClock plus the mutex-guarded scheduler state.
//! Command handlers, the thermal advance and the status views all live in
//! their own modules as `impl Core` blocks; everything serializes on the one
//! lock held here.

use hotel_protocol::{BillDetail, RoomStatus};
use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;

use crate::billing::{BillLedger, UsageSummary};
use crate::clock::SimClock;
use crate::config::Config;
use crate::errors::{CoreError, CoreResult};
use crate::registry::{Room, RoomRegistry};
use crate::scheduler::queue::ServiceRequest;

pub(crate) struct CoreState {
    pub rooms: RoomRegistry,
    /// Rooms holding a unit of AC capacity; length never exceeds capacity.
    pub serving: Vec<ServiceRequest>,
    pub waiting: Vec<ServiceRequest>,
    pub ledger: BillLedger,
    /// Settlements not yet flushed to the CSV appender task.
    pub pending_log: Vec<BillDetail>,
}

pub struct Core {
    pub(crate) clock: Arc<SimClock>,
    pub(crate) cfg: Config,
    state: Mutex<CoreState>,
}

impl Core {
    pub fn new(cfg: Config) -> Self {
        let clock = Arc::new(SimClock::new(cfg.time_factor));
        Self::with_clock(cfg, clock)
    }

    pub fn with_clock(cfg: Config, clock: Arc<SimClock>) -> Self {
        let state = CoreState {
            rooms: RoomRegistry::seed(&cfg),
            serving: Vec::new(),
            waiting: Vec::new(),
            ledger: BillLedger::new(),
            pending_log: Vec::new(),
        };
        Self { clock, cfg, state: Mutex::new(state) }
    }

    pub fn clock(&self) -> &SimClock {
        &self.clock
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    pub(crate) fn lock_state(&self) -> MutexGuard<'_, CoreState> {
        self.state.lock()
    }

    /// Re-seed one room's ambient temperature and daily rate (admin/test
    /// hook). Refused while the AC runs.
    pub fn configure_room(&self, room_id: u32, default_temp: f64, daily_rate: f64) -> CoreResult<()> {
        let mut st = self.lock_state();
        let room = st.rooms.get_mut(room_id)?;
        if room.ac_on {
            return Err(CoreError::Precondition(format!(
                "room {room_id} must be powered off to reconfigure"
            )));
        }
        room.default_temp = default_temp;
        room.current_temp = default_temp;
        room.daily_rate = daily_rate;
        room.last_temp_update = None;
        Ok(())
    }

    // ---------------- occupancy contract (external check-in flow) ----------

    pub fn check_in(&self, room_id: u32, customer_id: u32, name: &str) -> CoreResult<()> {
        self.lock_state().rooms.check_in(room_id, customer_id, name)
    }

    /// Release an occupied room. A still-running AC is forced off first, so
    /// the open interval settles against the departing guest before their
    /// stamp is cleared.
    pub fn check_out(&self, room_id: u32) -> CoreResult<()> {
        let now = self.clock.now();
        let mut guard = self.lock_state();
        let st = &mut *guard;
        {
            let room = st.rooms.get(room_id)?;
            if room.status != RoomStatus::Occupied {
                return Err(CoreError::Precondition(format!("room {room_id} has no occupant")));
            }
        }
        self.advance_and_admit(st, now)?;
        if st.rooms.get(room_id)?.ac_on {
            self.force_power_off(st, room_id, now)?;
        }
        st.rooms.check_out(room_id)
    }

    /// Take a room offline (or bring it back). Entering maintenance forces
    /// the AC off so the room cannot keep a capacity slot or accrue billing
    /// while out of service.
    pub fn set_maintenance(&self, room_id: u32, on: bool) -> CoreResult<()> {
        let now = self.clock.now();
        let mut guard = self.lock_state();
        let st = &mut *guard;
        if on {
            {
                let room = st.rooms.get(room_id)?;
                if room.status != RoomStatus::Available {
                    return Err(CoreError::Precondition(format!(
                        "room {room_id} cannot change maintenance state while {:?}",
                        room.status
                    )));
                }
            }
            self.advance_and_admit(st, now)?;
            if st.rooms.get(room_id)?.ac_on {
                self.force_power_off(st, room_id, now)?;
            }
        }
        st.rooms.set_maintenance(room_id, on)
    }

    // ---------------------------- snapshots --------------------------------

    pub fn room_snapshot(&self, room_id: u32) -> CoreResult<Room> {
        self.lock_state().rooms.get(room_id).cloned()
    }

    /// Copy of the whole ledger.
    pub fn bill_details(&self) -> Vec<BillDetail> {
        self.lock_state().ledger.snapshot()
    }

    /// Accumulated detail records for one room.
    pub fn room_details(&self, room_id: u32) -> CoreResult<Vec<BillDetail>> {
        let st = self.lock_state();
        st.rooms.get(room_id)?;
        Ok(st.ledger.for_room(room_id))
    }

    pub fn usage_summary(&self) -> UsageSummary {
        self.lock_state().ledger.usage_summary()
    }

    /// Hand settlements to the CSV appender; called by the background task.
    pub fn drain_settlement_log(&self) -> Vec<BillDetail> {
        std::mem::take(&mut self.lock_state().pending_log)
    }
}
