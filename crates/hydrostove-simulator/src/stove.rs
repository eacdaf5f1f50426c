//! Synthetic wood stove with a water jacket
//!
//! A lumped model: the fire heats the jacket water, the pump carries heat away
//! to the return line. The outputs are what the board would see: raw 10-bit
//! ADC readings of both thermistor dividers and flow sensor pulses.

use hydrostove_core::MonitorConfig;
use hydrostove_core::config::{ADC_MAX, ThermistorConfig};

/// Specific heat of water in J/(kg·K)
const SPECIFIC_HEAT: f64 = 4186.0;

/// Water in the stove jacket, kg
const JACKET_MASS_KG: f64 = 25.0;

/// Peak output of the fire, W
const PEAK_FIRE_W: f64 = 14_000.0;

/// Extra output while the heat spike key is active, W
const SPIKE_W: f64 = 40_000.0;

/// Length of a heat spike in simulated seconds
const SPIKE_SECS: f64 = 120.0;

/// Pump flow when running, l/min
const PUMP_LPM: f64 = 8.0;

/// The pump thermostat starts at this outlet temperature
const PUMP_ON_C: f64 = 35.0;

const KELVIN_OFFSET: f64 = 273.15;

pub struct Stove {
    elapsed_secs: f64,
    jacket_c: f64,
    spike_left_secs: f64,
    pump_blocked: bool,
    outlet_disconnected: bool,
    /// Fractional pulse left over from the previous step
    pulse_residue: f64,
}

impl Stove {
    pub fn new() -> Self {
        Self {
            elapsed_secs: 0.0,
            jacket_c: 20.0,
            spike_left_secs: 0.0,
            pump_blocked: false,
            outlet_disconnected: false,
            pulse_residue: 0.0,
        }
    }

    /// Return water temperature, slowly following the house load.
    pub fn inlet_c(&self) -> f64 {
        let warmup = (self.jacket_c - 20.0).max(0.0) * 0.45;
        20.0 + warmup + 1.5 * (self.elapsed_secs / 400.0).sin()
    }

    pub fn outlet_c(&self) -> f64 {
        self.jacket_c
    }

    pub fn flow_lpm(&self) -> f64 {
        if self.pump_blocked || self.jacket_c < PUMP_ON_C {
            0.0
        } else {
            PUMP_LPM
        }
    }

    /// Fire output over a burn: ramp up, burn with wobble, die down.
    fn fire_w(&self) -> f64 {
        let t = self.elapsed_secs;
        let base = if t < 1200.0 {
            PEAK_FIRE_W * t / 1200.0
        } else if t < 5400.0 {
            PEAK_FIRE_W * (0.85 + 0.15 * (t / 300.0).sin())
        } else {
            PEAK_FIRE_W * (-(t - 5400.0) / 1800.0).exp()
        };
        let spike = if self.spike_left_secs > 0.0 { SPIKE_W } else { 0.0 };
        base + spike
    }

    /// Advance the model by `dt_secs`. Returns the flow sensor pulses emitted.
    pub fn step(&mut self, dt_secs: f64, k_factor: f32) -> u32 {
        let flow_kgps = self.flow_lpm() / 60.0;
        let carried_w = SPECIFIC_HEAT * flow_kgps * (self.jacket_c - self.inlet_c());
        // Jacket losses to the room keep a blocked stove from heating forever
        let losses_w = 25.0 * (self.jacket_c - 20.0);
        let net_w = self.fire_w() - carried_w - losses_w;
        self.jacket_c += net_w * dt_secs / (JACKET_MASS_KG * SPECIFIC_HEAT);

        self.elapsed_secs += dt_secs;
        self.spike_left_secs = (self.spike_left_secs - dt_secs).max(0.0);

        let pulses = self.flow_lpm() * f64::from(k_factor) * dt_secs + self.pulse_residue;
        let whole = pulses.floor();
        self.pulse_residue = pulses - whole;
        whole as u32
    }

    pub fn heat_spike(&mut self) {
        self.spike_left_secs = SPIKE_SECS;
    }

    /// Stop or restart the pump. Returns whether it is now blocked.
    pub fn toggle_pump(&mut self) -> bool {
        self.pump_blocked = !self.pump_blocked;
        self.pump_blocked
    }

    /// Pull or reconnect the outlet thermistor. Returns whether it is now pulled.
    pub fn toggle_outlet_sensor(&mut self) -> bool {
        self.outlet_disconnected = !self.outlet_disconnected;
        self.outlet_disconnected
    }

    /// Raw ADC values of the inlet and outlet dividers.
    pub fn adc(&self, config: &MonitorConfig) -> (u16, u16) {
        let inlet = to_adc(self.inlet_c(), &config.thermistor, config.inlet_series_ohms);
        let outlet = if self.outlet_disconnected {
            // Open thermistor: divider pulled to ground
            0
        } else {
            to_adc(self.outlet_c(), &config.thermistor, config.outlet_series_ohms)
        };
        (inlet, outlet)
    }
}

/// Inverse of the beta model: the reading a divider produces at `celsius`.
pub fn to_adc(celsius: f64, thermistor: &ThermistorConfig, series_ohms: f32) -> u16 {
    let t0 = f64::from(thermistor.nominal_celsius) + KELVIN_OFFSET;
    let t = celsius + KELVIN_OFFSET;
    let resistance =
        f64::from(thermistor.nominal_ohms) * (f64::from(thermistor.beta) * (1.0 / t - 1.0 / t0)).exp();
    let ratio = resistance / (resistance + f64::from(series_ohms));
    let adc = (f64::from(ADC_MAX) * ratio).round();
    adc.clamp(1.0, f64::from(ADC_MAX - 1)) as u16
}

#[cfg(test)]
mod tests {
    use super::*;
    use hydrostove_core::Thermistor;

    #[test]
    fn test_to_adc_inverts_conversion() {
        let config = MonitorConfig::default();
        let thermistor = Thermistor::new(config.thermistor);
        for celsius in [25.0, 40.0, 60.0, 85.0] {
            let adc = to_adc(celsius, &config.thermistor, config.inlet_series_ohms);
            let back = thermistor.celsius(adc, config.inlet_series_ohms).unwrap();
            // One ADC step is well under a degree in this range
            assert!((f64::from(back) - celsius).abs() < 1.0, "{celsius} -> {adc} -> {back}");
        }
    }

    #[test]
    fn test_cold_stove_has_no_flow() {
        let mut stove = Stove::new();
        assert_eq!(stove.step(1.0, 4.5), 0);
    }

    #[test]
    fn test_fire_heats_jacket_and_starts_pump() {
        let mut stove = Stove::new();
        let mut pulses = 0;
        for _ in 0..1800 {
            pulses += stove.step(1.0, 4.5);
        }
        assert!(stove.outlet_c() > PUMP_ON_C);
        assert!(stove.outlet_c() > stove.inlet_c());
        assert!(pulses > 0);
    }

    #[test]
    fn test_pulled_sensor_reads_zero() {
        let mut stove = Stove::new();
        stove.toggle_outlet_sensor();
        let (_, outlet) = stove.adc(&MonitorConfig::default());
        assert_eq!(outlet, 0);
    }
}
