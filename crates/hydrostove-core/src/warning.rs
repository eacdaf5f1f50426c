//! Warning evaluation and the buzzer alarm
//!
//! Acute conditions (overheating, stopped flow while hot) switch the display to
//! the big warning and sound the buzzer until muted. A sensor fault only shows
//! the small icon.

use embedded_hal::digital::OutputPin;
use log::{info, warn};

use crate::config::WarningConfig;
use crate::reading::Reading;

/// Conditions currently raised by a reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WarningFlags {
    /// Outlet at or above the configured maximum
    pub overheat: bool,
    /// Flow stopped while the stove is hot
    pub no_flow: bool,
    /// At least one thermistor gave an invalid reading
    pub sensor_fault: bool,
}

impl WarningFlags {
    /// Conditions that need immediate attention (big warning and buzzer).
    pub fn is_acute(&self) -> bool {
        self.overheat || self.no_flow
    }

    pub fn any(&self) -> bool {
        self.is_acute() || self.sensor_fault
    }
}

/// Result of evaluating one reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WarningStatus {
    pub flags: WarningFlags,
    /// The reading moved from a calm state into an acute one
    pub newly_acute: bool,
}

/// Turns readings into warning flags and tracks transitions.
#[derive(Debug, Clone)]
pub struct WarningMonitor {
    config: WarningConfig,
    flags: WarningFlags,
}

impl WarningMonitor {
    pub const fn new(config: WarningConfig) -> Self {
        Self {
            config,
            flags: WarningFlags {
                overheat: false,
                no_flow: false,
                sensor_fault: false,
            },
        }
    }

    pub fn evaluate(&mut self, reading: &Reading) -> WarningStatus {
        let outlet = reading.outlet;
        let flow_lpm = reading.flow_lps * 60.0;

        let flags = WarningFlags {
            overheat: outlet.is_some_and(|t| t >= self.config.max_outlet_c),
            no_flow: outlet.is_some_and(|t| t >= self.config.flow_check_outlet_c)
                && flow_lpm < self.config.min_flow_lpm,
            sensor_fault: reading.has_sensor_fault(),
        };

        let newly_acute = flags.is_acute() && !self.flags.is_acute();
        if flags != self.flags {
            if flags.overheat && !self.flags.overheat {
                warn!("Outlet overheating: {:?} C", outlet);
            }
            if flags.no_flow && !self.flags.no_flow {
                warn!("No water flow ({} l/min) with outlet at {:?} C", flow_lpm, outlet);
            }
            if flags.sensor_fault && !self.flags.sensor_fault {
                warn!("Thermistor fault: in {:?} out {:?}", reading.inlet, reading.outlet);
            }
            if !flags.any() {
                info!("All warnings cleared");
            }
        }

        self.flags = flags;
        WarningStatus { flags, newly_acute }
    }

    /// Flags from the last evaluation.
    pub fn flags(&self) -> WarningFlags {
        self.flags
    }
}

/// Buzzer driven by the warning state.
///
/// The buzzer sounds while an acute warning is active and the alarm is not
/// muted. A new acute warning clears the mute.
pub struct Alarm<P> {
    pin: P,
    muted: bool,
    sounding: bool,
}

impl<P: OutputPin> Alarm<P> {
    pub fn new(pin: P) -> Self {
        let mut alarm = Self {
            pin,
            muted: false,
            sounding: false,
        };
        alarm.drive(false);
        alarm
    }

    /// Apply the latest warning status to the buzzer.
    pub fn update(&mut self, status: &WarningStatus) {
        if status.newly_acute && self.muted {
            info!("New warning, alarm unmuted");
            self.muted = false;
        }
        let sound = status.flags.is_acute() && !self.muted;
        if sound != self.sounding {
            self.drive(sound);
        }
    }

    /// Mute or unmute the buzzer. Returns whether it is now muted.
    pub fn toggle_mute(&mut self) -> bool {
        self.muted = !self.muted;
        info!("Alarm {}", if self.muted { "muted" } else { "unmuted" });
        if self.muted && self.sounding {
            self.drive(false);
        }
        self.muted
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn is_sounding(&self) -> bool {
        self.sounding
    }

    /// Give the pin back.
    pub fn release(self) -> P {
        self.pin
    }

    fn drive(&mut self, on: bool) {
        let result = if on {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        };
        match result {
            Ok(()) => self.sounding = on,
            Err(e) => warn!("Buzzer pin error: {:?}", e),
        }
    }
}
