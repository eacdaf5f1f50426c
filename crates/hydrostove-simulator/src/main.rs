//! Desktop simulator for the HydroStove heat exchanger monitor.
//!
//! Runs the core controller against a synthetic stove and renders the
//! dashboard in an SDL2 window via `embedded-graphics-simulator`. Simulated
//! time runs faster than real time so the history graph fills and compresses
//! within a few minutes.
//!
//! Usage: `hydrostove-simulator [config.toml]`
//!
//! # Key bindings
//!
//! | Key   | Action                               |
//! |-------|--------------------------------------|
//! | M     | Mute / unmute alarm (user button)    |
//! | F     | Block / release the pump             |
//! | H     | Heat spike (drives an overheat)      |
//! | S     | Pull / reconnect the outlet sensor   |
//! | Q/Esc | Quit                                 |

mod config;
mod stove;

use std::convert::Infallible;
use std::process::ExitCode;
use std::time::{Duration, Instant};

use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics_simulator::{
    BinaryColorTheme, OutputSettingsBuilder, SimulatorDisplay, SimulatorEvent, Window,
    sdl2::Keycode,
};
use embedded_hal::digital::{ErrorType, OutputPin};
use log::{error, info};

use hydrostove_core::config::{DISPLAY_HEIGHT_PX, DISPLAY_WIDTH_PX, HISTORY_CAPACITY};
use hydrostove_core::{Controller, PulseCounter};

use crate::stove::Stove;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Pixel scale factor for the simulator window.
const WINDOW_SCALE: u32 = 4;

/// Target frame duration (~30 FPS).
const FRAME_DURATION: Duration = Duration::from_millis(33);

/// Simulated seconds per real second.
const TIME_SCALE: u32 = 30;

/// Default configuration file looked up in the working directory.
const DEFAULT_CONFIG_PATH: &str = "hydrostove.toml";

/// Flow sensor pulses, filled by the stove model the way the pin handler does.
static FLOW_PULSES: PulseCounter = PulseCounter::new();

// ---------------------------------------------------------------------------
// Buzzer
// ---------------------------------------------------------------------------

/// Buzzer stand-in that logs when it switches.
struct LogBuzzer;

impl ErrorType for LogBuzzer {
    type Error = Infallible;
}

impl OutputPin for LogBuzzer {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        info!("Buzzer off");
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        info!("Buzzer ON");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() -> ExitCode {
    env_logger::init();
    info!("Starting HydroStove simulator");

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = match config::load(&path) {
        Ok(config) => config,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    info!(
        "Display: {}×{} (scale {}×), time ×{}",
        DISPLAY_WIDTH_PX, DISPLAY_HEIGHT_PX, WINDOW_SCALE, TIME_SCALE
    );
    info!("Keys: M=Mute  F=Pump  H=Heat spike  S=Outlet sensor  Q=Quit");

    let mut display = SimulatorDisplay::<BinaryColor>::new(Size::new(
        DISPLAY_WIDTH_PX,
        DISPLAY_HEIGHT_PX,
    ));
    let output_settings = OutputSettingsBuilder::new()
        .scale(WINDOW_SCALE)
        .theme(BinaryColorTheme::OledBlue)
        .build();
    let mut window = Window::new("HydroStove Simulator", &output_settings);

    let mut controller: Controller<LogBuzzer, HISTORY_CAPACITY> =
        Controller::new(config, LogBuzzer);
    let mut stove = Stove::new();
    let mut sim_ms: u64 = 0;
    let step_ms = FRAME_DURATION.as_millis() as u64 * u64::from(TIME_SCALE);

    // The SDL window is lazily initialized on the first `update()` call.
    // We must call `update()` once before `events()` or it will panic.
    let (adc_inlet, adc_outlet) = stove.adc(&config);
    controller.poll(sim_ms, adc_inlet, adc_outlet, &FLOW_PULSES);
    let _ = controller.draw(&mut display);
    window.update(&display);

    // -----------------------------------------------------------------------
    // Main loop
    // -----------------------------------------------------------------------
    'running: loop {
        let frame_start = Instant::now();

        // --- SDL events ---------------------------------------------------
        for event in window.events() {
            match event {
                SimulatorEvent::Quit => break 'running,

                SimulatorEvent::KeyDown { keycode, .. } => match keycode {
                    Keycode::Q | Keycode::Escape => break 'running,
                    Keycode::M => {
                        let muted = controller.toggle_mute();
                        info!("Button → alarm {}", if muted { "muted" } else { "armed" });
                    }
                    Keycode::F => {
                        let blocked = stove.toggle_pump();
                        info!("Pump {}", if blocked { "blocked" } else { "released" });
                    }
                    Keycode::H => {
                        stove.heat_spike();
                        info!("Heat spike");
                    }
                    Keycode::S => {
                        let pulled = stove.toggle_outlet_sensor();
                        info!(
                            "Outlet sensor {}",
                            if pulled { "pulled" } else { "reconnected" }
                        );
                    }
                    _ => {}
                },

                _ => {}
            }
        }

        // --- Stove model --------------------------------------------------
        let pulses = stove.step(step_ms as f64 / 1000.0, config.flow.k_factor);
        for _ in 0..pulses {
            FLOW_PULSES.count();
        }
        sim_ms += step_ms;

        // --- Control loop -------------------------------------------------
        let (adc_inlet, adc_outlet) = stove.adc(&config);
        let outcome = controller.poll(sim_ms, adc_inlet, adc_outlet, &FLOW_PULSES);

        if outcome.history_added {
            info!(
                "t={}s in {:?} out {:?} flow {:.1} l/min power {} W scale {}",
                sim_ms / 1000,
                outcome.reading.inlet,
                outcome.reading.outlet,
                controller.flow_meter().flow_lpm(),
                outcome.reading.power_watts(),
                controller.history().scale()
            );
        }

        // --- Render -------------------------------------------------------
        if outcome.redraw {
            let _ = controller.draw(&mut display);
        }

        window.update(&display);

        // --- Frame pacing -------------------------------------------------
        let elapsed = frame_start.elapsed();
        if elapsed < FRAME_DURATION {
            std::thread::sleep(FRAME_DURATION - elapsed);
        }
    }

    info!(
        "Simulator exiting after {} simulated s, {:.1} l pumped",
        sim_ms / 1000,
        controller.flow_meter().total_litres()
    );
    ExitCode::SUCCESS
}
