//! NTC thermistor conversion
//!
//! The thermistor sits in a voltage divider with a fixed series resistor. The
//! ADC reading gives the divider ratio, from which the thermistor resistance
//! is recovered and fed to the beta approximation of the Steinhart–Hart
//! equation:
//!
//! ```text
//! 1/T = 1/T0 + (1/B) * ln(R/R0)
//! ```

use thiserror_no_std::Error;

use crate::config::{ADC_MAX, ThermistorConfig};

/// Offset between Kelvin and Celsius.
const KELVIN_OFFSET: f32 = 273.15;

/// Reasons a raw ADC value cannot be turned into a temperature.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// Full-scale reading: the divider ratio degenerates to a division by zero
    #[error("ADC saturated at {reading}, thermistor shorted or disconnected")]
    Saturated { reading: u16 },

    /// Zero reading: no signal on the channel
    #[error("ADC reads {reading}, no signal from thermistor divider")]
    NoSignal { reading: u16 },

    /// Value outside the 10-bit domain
    #[error("ADC reading {reading} exceeds the 10-bit range")]
    OutOfRange { reading: u16 },

    /// The math produced an infinite or NaN temperature
    #[error("Conversion of ADC reading {reading} is not finite")]
    NotFinite { reading: u16 },
}

/// Beta-model NTC thermistor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thermistor {
    config: ThermistorConfig,
}

impl Default for Thermistor {
    fn default() -> Self {
        Self::new(ThermistorConfig::default())
    }
}

impl Thermistor {
    pub const fn new(config: ThermistorConfig) -> Self {
        Self { config }
    }

    pub const fn config(&self) -> &ThermistorConfig {
        &self.config
    }

    /// Recover the thermistor resistance (Ω) from a 10-bit divider reading.
    pub fn resistance(&self, adc: u16, series_ohms: f32) -> Result<f32, SensorError> {
        match adc {
            0 => return Err(SensorError::NoSignal { reading: adc }),
            ADC_MAX => return Err(SensorError::Saturated { reading: adc }),
            a if a > ADC_MAX => return Err(SensorError::OutOfRange { reading: adc }),
            _ => {}
        }

        let ratio = f32::from(ADC_MAX) / f32::from(adc) - 1.0;
        Ok(series_ohms / ratio)
    }

    /// Convert a 10-bit divider reading to degrees Celsius.
    pub fn celsius(&self, adc: u16, series_ohms: f32) -> Result<f32, SensorError> {
        let resistance = self.resistance(adc, series_ohms)?;

        let mut steinhart = libm::logf(resistance / self.config.nominal_ohms);
        steinhart /= self.config.beta;
        steinhart += 1.0 / (self.config.nominal_celsius + KELVIN_OFFSET);
        let celsius = 1.0 / steinhart - KELVIN_OFFSET;

        if celsius.is_finite() {
            Ok(celsius)
        } else {
            Err(SensorError::NotFinite { reading: adc })
        }
    }
}

/// Convert a reading with the default thermistor of the board.
pub fn adc_to_celsius(adc: u16, series_ohms: f32) -> Result<f32, SensorError> {
    Thermistor::default().celsius(adc, series_ohms)
}
