//! Monitor configuration and display geometry
//!
//! Everything tunable about the controller lives in [`MonitorConfig`]. The
//! defaults describe the reference board: two 100 kΩ NTC thermistors on
//! 10 kΩ series resistors and a hall-effect turbine flow sensor.

use serde::{Deserialize, Serialize};

/// Panel width in pixels. Also the capacity of the power history.
pub const DISPLAY_WIDTH_PX: u32 = 128;

/// Panel height in pixels.
pub const DISPLAY_HEIGHT_PX: u32 = 64;

/// Rows reserved at the top of the panel for the two text lines.
pub const TEXT_AREA_HEIGHT_PX: u32 = 16;

/// Usable vertical pixels for the power graph (`K` in the bar height formula).
pub const GRAPH_HEIGHT_PX: u32 = DISPLAY_HEIGHT_PX - TEXT_AREA_HEIGHT_PX;

/// Number of history columns shown on the device.
pub const HISTORY_CAPACITY: usize = DISPLAY_WIDTH_PX as usize;

/// Full-scale reading of the 10-bit ADC domain.
pub const ADC_MAX: u16 = 1023;

/// Beta-model parameters of an NTC thermistor.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct ThermistorConfig {
    /// Resistance at the nominal temperature (R0)
    pub nominal_ohms: f32,
    /// Temperature at which `nominal_ohms` is specified (usually 25 °C)
    pub nominal_celsius: f32,
    /// Beta coefficient of the thermistor material
    pub beta: f32,
}

impl Default for ThermistorConfig {
    fn default() -> Self {
        Self {
            nominal_ohms: 100_000.0,
            nominal_celsius: 25.0,
            beta: 3950.0,
        }
    }
}

/// Calibration of a pulse-output turbine flow sensor.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct FlowSensorConfig {
    /// Nominal full-scale capacity in l/min
    pub capacity_lpm: f32,
    /// Pulse frequency (Hz) per l/min of flow
    pub k_factor: f32,
    /// Correction factor for each tenth of the capacity range
    pub m_factor: [f32; 10],
}

impl Default for FlowSensorConfig {
    fn default() -> Self {
        Self {
            capacity_lpm: 60.0,
            k_factor: 4.5,
            m_factor: [1.2, 1.1, 1.05, 1.0, 1.0, 1.0, 1.0, 0.95, 0.9, 0.8],
        }
    }
}

/// Thresholds for raising warnings.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct WarningConfig {
    /// Outlet temperature at or above which the exchanger is overheating (°C)
    pub max_outlet_c: f32,
    /// Flow below this rate counts as stopped (l/min)
    pub min_flow_lpm: f32,
    /// A stopped flow is only reported once the outlet is at least this hot (°C)
    pub flow_check_outlet_c: f32,
}

impl Default for WarningConfig {
    fn default() -> Self {
        Self {
            max_outlet_c: 85.0,
            min_flow_lpm: 0.5,
            flow_check_outlet_c: 40.0,
        }
    }
}

/// Periods of the control loop activities, in milliseconds.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct TimingConfig {
    /// How often pulses are converted into a flow rate
    pub flow_period_ms: u64,
    /// How often the display is redrawn
    pub display_period_ms: u64,
    /// Base period between history samples, multiplied by the history scale
    pub history_period_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            flow_period_ms: 1000,
            display_period_ms: 500,
            history_period_ms: 5000,
        }
    }
}

/// Complete monitor configuration.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct MonitorConfig {
    pub thermistor: ThermistorConfig,
    /// Series resistor of the inlet (cold side) divider
    pub inlet_series_ohms: f32,
    /// Series resistor of the outlet (hot side) divider
    pub outlet_series_ohms: f32,
    pub flow: FlowSensorConfig,
    pub warning: WarningConfig,
    pub timing: TimingConfig,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            thermistor: ThermistorConfig::default(),
            inlet_series_ohms: 10_000.0,
            outlet_series_ohms: 10_000.0,
            flow: FlowSensorConfig::default(),
            warning: WarningConfig::default(),
            timing: TimingConfig::default(),
        }
    }
}
