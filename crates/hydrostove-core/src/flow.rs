//! Pulse-counting flow meter
//!
//! A turbine sensor emits one pulse per fixed volume of water. The pulse
//! handler only increments a [`PulseCounter`]; the control loop periodically
//! takes the count and converts it into a flow rate with [`FlowMeter::tick`].

use core::cell::Cell;

use critical_section::Mutex;
use log::debug;

use crate::config::FlowSensorConfig;

/// Pulse counter shared between the pulse handler and the control loop.
///
/// Meant to live in a `static`. `count` is the only call allowed from
/// interrupt context.
pub struct PulseCounter {
    pulses: Mutex<Cell<u32>>,
}

impl Default for PulseCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl PulseCounter {
    pub const fn new() -> Self {
        Self {
            pulses: Mutex::new(Cell::new(0)),
        }
    }

    /// Register one pulse.
    #[inline]
    pub fn count(&self) {
        critical_section::with(|cs| {
            let pulses = self.pulses.borrow(cs);
            pulses.set(pulses.get().wrapping_add(1));
        });
    }

    /// Read the pulses seen since the last call and start over from zero.
    pub fn take_and_reset(&self) -> u32 {
        critical_section::with(|cs| self.pulses.borrow(cs).replace(0))
    }

    /// Peek at the current count without resetting it.
    pub fn pending(&self) -> u32 {
        critical_section::with(|cs| self.pulses.borrow(cs).get())
    }
}

/// Converts pulse counts into a calibrated flow rate and total volume.
#[derive(Debug, Clone)]
pub struct FlowMeter {
    sensor: FlowSensorConfig,
    flow_lpm: f32,
    total_litres: f32,
}

impl FlowMeter {
    pub const fn new(sensor: FlowSensorConfig) -> Self {
        Self {
            sensor,
            flow_lpm: 0.0,
            total_litres: 0.0,
        }
    }

    /// Process the pulses of one measurement period.
    ///
    /// Returns the new flow rate in l/min. A zero-length period is ignored and
    /// the previous rate is returned.
    pub fn tick(&mut self, pulses: u32, elapsed_ms: u64) -> f32 {
        if elapsed_ms == 0 {
            return self.flow_lpm;
        }

        let seconds = elapsed_ms as f32 / 1000.0;
        let frequency = pulses as f32 / seconds;

        // Calibration is piecewise, one factor per tenth of the capacity
        let full_scale_hz = self.sensor.capacity_lpm * self.sensor.k_factor;
        let decile = if full_scale_hz > 0.0 {
            ((10.0 * frequency / full_scale_hz) as usize).min(9)
        } else {
            0
        };
        let correction = self.sensor.m_factor[decile];

        self.flow_lpm = if self.sensor.k_factor > 0.0 {
            frequency * correction / self.sensor.k_factor
        } else {
            0.0
        };
        self.total_litres += self.flow_lpm / 60.0 * seconds;

        debug!(
            "FLOW: {} pulses in {} ms -> {} l/min, {} l total",
            pulses, elapsed_ms, self.flow_lpm, self.total_litres
        );

        self.flow_lpm
    }

    /// Most recent flow rate in litres per minute.
    pub fn flow_lpm(&self) -> f32 {
        self.flow_lpm
    }

    /// Most recent flow rate in litres per second.
    pub fn flow_lps(&self) -> f32 {
        self.flow_lpm / 60.0
    }

    /// Volume measured since start-up in litres.
    pub fn total_litres(&self) -> f32 {
        self.total_litres
    }

    /// Forget the current rate and accumulated volume.
    pub fn reset(&mut self) {
        self.flow_lpm = 0.0;
        self.total_litres = 0.0;
    }
}
