//Command line interface
// runtime configuration (capacity, bands, rates)
use clap::Parser;
use hotel_protocol::AcMode;

#[derive(Debug, Clone)]
pub struct Config {
    /// Number of physical AC units (capacity C).
    pub ac_capacity: usize,
    pub room_count: u32,
    /// Fallback ambient/setpoint temperature.
    pub default_temp: f64,
    /// Rotation threshold in simulated seconds.
    pub time_slice_secs: u64,
    /// SimClock speed: 1 real second = this many simulated seconds.
    pub time_factor: f64,
    pub cooling_min: f64,
    pub cooling_max: f64,
    pub cooling_default: f64,
    pub heating_min: f64,
    pub heating_max: f64,
    pub heating_default: f64,
    /// Emit a ROOM_FEE detail on every PowerOn.
    pub cycle_daily_fee: bool,
    /// Fallback daily rate for rooms without one.
    pub room_rate: f64,
}

impl Config {
    pub fn mode_band(&self, mode: AcMode) -> (f64, f64) {
        match mode {
            AcMode::Cooling => (self.cooling_min, self.cooling_max),
            AcMode::Heating => (self.heating_min, self.heating_max),
        }
    }

    pub fn mode_default(&self, mode: AcMode) -> f64 {
        match mode {
            AcMode::Cooling => self.cooling_default,
            AcMode::Heating => self.heating_default,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ac_capacity: 3,
            room_count: 5,
            default_temp: 25.0,
            time_slice_secs: 120,
            time_factor: 6.0,
            cooling_min: 18.0,
            cooling_max: 28.0,
            cooling_default: 25.0,
            heating_min: 18.0,
            heating_max: 25.0,
            heating_default: 23.0,
            cycle_daily_fee: true,
            room_rate: 100.0,
        }
    }
}

#[derive(Parser, Debug, Clone)]
pub struct Cli {
    #[arg(long, env = "HOTEL_AC_TOTAL_COUNT", default_value_t = 3)]
    pub ac_total_count: usize,
    #[arg(long, env = "HOTEL_ROOM_COUNT", default_value_t = 5)]
    pub room_count: u32,
    #[arg(long, env = "HOTEL_DEFAULT_TEMP", default_value_t = 25.0)]
    pub default_temp: f64,
    #[arg(long, env = "HOTEL_TIME_SLICE", default_value_t = 120)]
    pub time_slice: u64,
    #[arg(long, env = "TIME_ACCELERATION_FACTOR", default_value_t = 6.0)]
    pub time_factor: f64,
    #[arg(long, env = "COOLING_MIN_TEMP", default_value_t = 18.0)]
    pub cooling_min_temp: f64,
    #[arg(long, env = "COOLING_MAX_TEMP", default_value_t = 28.0)]
    pub cooling_max_temp: f64,
    #[arg(long, env = "COOLING_DEFAULT_TARGET", default_value_t = 25.0)]
    pub cooling_default_target: f64,
    #[arg(long, env = "HEATING_MIN_TEMP", default_value_t = 18.0)]
    pub heating_min_temp: f64,
    #[arg(long, env = "HEATING_MAX_TEMP", default_value_t = 25.0)]
    pub heating_max_temp: f64,
    #[arg(long, env = "HEATING_DEFAULT_TARGET", default_value_t = 23.0)]
    pub heating_default_target: f64,
    #[arg(long, env = "ENABLE_AC_CYCLE_DAILY_FEE", default_value_t = true, action = clap::ArgAction::Set)]
    pub cycle_daily_fee: bool,
    #[arg(long, env = "BILLING_ROOM_RATE", default_value_t = 100.0)]
    pub room_rate: f64,
    /// Replay the five-room acceptance timeline, export the ledger, exit.
    #[arg(long)]
    pub scenario: bool,
}

impl Cli {
    pub fn parse_cli() -> Self {
        <Cli as Parser>::parse()
    }

    pub fn build_config(&self) -> Config {
        Config {
            ac_capacity: self.ac_total_count,
            room_count: self.room_count,
            default_temp: self.default_temp,
            time_slice_secs: self.time_slice,
            time_factor: self.time_factor,
            cooling_min: self.cooling_min_temp,
            cooling_max: self.cooling_max_temp,
            cooling_default: self.cooling_default_target,
            heating_min: self.heating_min_temp,
            heating_max: self.heating_max_temp,
            heating_default: self.heating_default_target,
            cycle_daily_fee: self.cycle_daily_fee,
            room_rate: self.room_rate,
        }
    }
}
