// lib.rs — Shared vocabulary for the hotel climate-control core

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

// =============================== Common =====================================

pub type Timestamp = DateTime<Utc>;

/// Snap band around the setpoint, in °C.
pub const REACH_EPSILON: f64 = 0.01;
/// Smallest temperature delta worth a bill line, in °C.
pub const BILLABLE_EPSILON: f64 = 0.001;
/// Drift back toward ambient for unserved rooms, °C per sim-minute.
pub const REWARM_RATE: f64 = 0.5;
/// How far a paused room must rewarm before it rejoins the queue, °C.
pub const WAKE_DRIFT: f64 = 1.0;
/// Flat billing rate per °C of delivered temperature change.
pub const AC_RATE: f64 = 1.0;

// =============================== Enums ======================================

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unrecognized {kind}: {value}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoomStatus {
    Available,
    Occupied,
    Maintenance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AcMode {
    Cooling,
    Heating,
}

impl fmt::Display for AcMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AcMode::Cooling => write!(f, "COOLING"),
            AcMode::Heating => write!(f, "HEATING"),
        }
    }
}

impl FromStr for AcMode {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "COOLING" => Ok(AcMode::Cooling),
            "HEATING" => Ok(AcMode::Heating),
            _ => Err(ParseEnumError { kind: "mode", value: s.to_string() }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FanSpeed {
    Low,
    Medium,
    High,
}

impl FanSpeed {
    /// Queue priority: HIGH(3) > MEDIUM(2) > LOW(1).
    pub fn priority(self) -> u8 {
        match self {
            FanSpeed::High => 3,
            FanSpeed::Medium => 2,
            FanSpeed::Low => 1,
        }
    }

    /// Cooling/heating rate while actively serviced, °C per sim-minute.
    pub fn degrees_per_minute(self) -> f64 {
        match self {
            FanSpeed::High => 1.0,
            FanSpeed::Medium => 0.5,
            FanSpeed::Low => 1.0 / 3.0,
        }
    }
}

impl fmt::Display for FanSpeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FanSpeed::Low => write!(f, "LOW"),
            FanSpeed::Medium => write!(f, "MEDIUM"),
            FanSpeed::High => write!(f, "HIGH"),
        }
    }
}

impl FromStr for FanSpeed {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "LOW" => Ok(FanSpeed::Low),
            "MEDIUM" => Ok(FanSpeed::Medium),
            "HIGH" => Ok(FanSpeed::High),
            _ => Err(ParseEnumError { kind: "fan speed", value: s.to_string() }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueueState {
    Serving,
    Waiting,
    Paused,
    Idle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DetailType {
    Ac,
    RoomFee,
    PowerOffCycle,
}

impl fmt::Display for DetailType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetailType::Ac => write!(f, "AC"),
            DetailType::RoomFee => write!(f, "ROOM_FEE"),
            DetailType::PowerOffCycle => write!(f, "POWER_OFF_CYCLE"),
        }
    }
}

// ============================ Billing records ===============================

/// One settled service interval (or flat fee). Append-only; never mutated
/// after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillDetail {
    pub id: Uuid,
    pub room_id: u32,
    pub customer_id: Option<u32>,
    pub ac_mode: AcMode,
    pub fan_speed: FanSpeed,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    /// Reporting only; cost is temperature-driven.
    pub duration_minutes: f64,
    pub rate: f64,
    pub cost: f64,
    pub detail_type: DetailType,
}

// ============================== Read views ==================================

/// Per-room snapshot served to observers. Field names are a stable contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestState {
    pub room_id: u32,
    pub ac_on: bool,
    pub current_temp: f64,
    pub target_temp: Option<f64>,
    pub ac_mode: AcMode,
    pub fan_speed: FanSpeed,
    pub queue_state: QueueState,
    pub serving_seconds: f64,
    pub waiting_seconds: f64,
    pub room_fee: f64,
    pub ac_fee: f64,
    pub total_cost: f64,
    pub schedule_count: u32,
    pub customer_id: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServingEntry {
    pub room_id: u32,
    pub fan_speed: FanSpeed,
    pub serving_time: Timestamp,
    pub serving_seconds: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaitingEntry {
    pub room_id: u32,
    pub fan_speed: FanSpeed,
    pub waiting_time: Timestamp,
    pub waiting_seconds: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleStatus {
    pub capacity: usize,
    /// Rotation threshold in simulated seconds.
    pub time_slice: u64,
    pub serving: Vec<ServingEntry>,
    pub waiting: Vec<WaitingEntry>,
}
