//! Snapshot of the physical state of the water loop

use crate::power::{thermal_power, to_sample};

/// One set of measurements: inlet and outlet temperature plus flow rate.
///
/// A temperature is `None` when its sensor produced an invalid reading.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Reading {
    /// Inlet (return, cold side) temperature in °C
    pub inlet: Option<f32>,
    /// Outlet (flow, hot side) temperature in °C
    pub outlet: Option<f32>,
    /// Water flow in litres per second
    pub flow_lps: f32,
}

impl Reading {
    pub const fn new(inlet: Option<f32>, outlet: Option<f32>, flow_lps: f32) -> Self {
        Self {
            inlet,
            outlet,
            flow_lps,
        }
    }

    /// Reading with both temperatures valid.
    pub const fn valid(inlet: f32, outlet: f32, flow_lps: f32) -> Self {
        Self::new(Some(inlet), Some(outlet), flow_lps)
    }

    /// Temperature rise across the exchanger, if both sensors are valid.
    pub fn delta_t(&self) -> Option<f32> {
        Some(self.outlet? - self.inlet?)
    }

    /// Thermal power in whole watts. Zero when a temperature is invalid.
    pub fn power_watts(&self) -> i32 {
        match (self.inlet, self.outlet) {
            (Some(inlet), Some(outlet)) => to_sample(thermal_power(self.flow_lps, inlet, outlet)),
            _ => 0,
        }
    }

    /// Flow rate in litres per hour, as shown on the display.
    pub fn flow_lph(&self) -> f32 {
        self.flow_lps * 3600.0
    }

    pub fn has_sensor_fault(&self) -> bool {
        self.inlet.is_none() || self.outlet.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::power::SPECIFIC_HEAT_WATER;

    #[test]
    fn test_power_of_valid_reading() {
        let reading = Reading::valid(20.0, 21.0, 1.0);
        assert_eq!(reading.power_watts(), SPECIFIC_HEAT_WATER as i32);
    }

    #[test]
    fn test_invalid_temperature_gives_zero_power() {
        let reading = Reading::new(Some(20.0), None, 1.0);
        assert_eq!(reading.power_watts(), 0);
        assert!(reading.has_sensor_fault());
        assert_eq!(reading.delta_t(), None);
    }

    #[test]
    fn test_flow_in_litres_per_hour() {
        let reading = Reading::valid(20.0, 60.0, 0.25);
        assert_eq!(reading.flow_lph(), 900.0);
    }
}
