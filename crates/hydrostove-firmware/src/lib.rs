//! ESP32-S3 firmware-specific modules for the HydroStove monitor
//!
//! This crate contains the code that only makes sense on the device: the
//! panel driver, the board pin map and build-time configuration overrides.
//! All measurement, history and rendering logic lives in `hydrostove_core`.

#![no_std]

pub mod settings;
pub mod ssd1306;
