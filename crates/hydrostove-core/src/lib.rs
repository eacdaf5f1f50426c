//! Hardware-independent core library for the HydroStove monitor
//!
//! This crate contains all platform-agnostic logic for the heat exchanger
//! controller: thermistor conversion, flow metering, the compressing power
//! history, warning evaluation, and rendering onto a monochrome display.
//!
//! It is `#![no_std]` without an allocator so it compiles on the ESP32-S3
//! firmware as well as on desktop hosts (for the simulator and tests).

#![no_std]

pub mod config;
pub mod controller;
pub mod display;
pub mod filter;
pub mod flow;
pub mod framebuffer;
pub mod history;
pub mod power;
pub mod reading;
pub mod thermistor;
pub mod warning;

pub use config::MonitorConfig;
pub use controller::{Controller, PollOutcome};
pub use display::Dashboard;
pub use flow::{FlowMeter, PulseCounter};
pub use framebuffer::MonoFrameBuffer;
pub use history::PowerHistory;
pub use reading::Reading;
pub use thermistor::{SensorError, Thermistor};
pub use warning::{Alarm, WarningFlags, WarningMonitor};
