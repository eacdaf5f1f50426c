//! Build-time configuration overrides
//!
//! Values come from `HYDROSTOVE_*` variables in a `.env` file next to the
//! firmware crate, forwarded by `build.rs`. Example:
//!
//! ```text
//! HYDROSTOVE_MAX_OUTLET_C=90
//! HYDROSTOVE_OUTLET_SERIES_OHMS=4700
//! ```

use core::str::FromStr;

use hydrostove_core::MonitorConfig;
use log::{info, warn};

/// Monitor configuration with every override present at build time applied.
pub fn monitor_config() -> MonitorConfig {
    let mut config = MonitorConfig::default();

    apply(
        &mut config.thermistor.nominal_ohms,
        "HYDROSTOVE_THERMISTOR_OHMS",
        option_env!("HYDROSTOVE_THERMISTOR_OHMS"),
    );
    apply(
        &mut config.thermistor.beta,
        "HYDROSTOVE_THERMISTOR_BETA",
        option_env!("HYDROSTOVE_THERMISTOR_BETA"),
    );
    apply(
        &mut config.inlet_series_ohms,
        "HYDROSTOVE_INLET_SERIES_OHMS",
        option_env!("HYDROSTOVE_INLET_SERIES_OHMS"),
    );
    apply(
        &mut config.outlet_series_ohms,
        "HYDROSTOVE_OUTLET_SERIES_OHMS",
        option_env!("HYDROSTOVE_OUTLET_SERIES_OHMS"),
    );
    apply(
        &mut config.flow.k_factor,
        "HYDROSTOVE_FLOW_K_FACTOR",
        option_env!("HYDROSTOVE_FLOW_K_FACTOR"),
    );
    apply(
        &mut config.warning.max_outlet_c,
        "HYDROSTOVE_MAX_OUTLET_C",
        option_env!("HYDROSTOVE_MAX_OUTLET_C"),
    );
    apply(
        &mut config.warning.min_flow_lpm,
        "HYDROSTOVE_MIN_FLOW_LPM",
        option_env!("HYDROSTOVE_MIN_FLOW_LPM"),
    );
    apply(
        &mut config.timing.history_period_ms,
        "HYDROSTOVE_HISTORY_PERIOD_MS",
        option_env!("HYDROSTOVE_HISTORY_PERIOD_MS"),
    );

    config
}

fn apply<T>(target: &mut T, key: &str, raw: Option<&str>)
where
    T: FromStr + core::fmt::Display,
{
    let Some(raw) = raw else {
        return;
    };
    match raw.trim().parse::<T>() {
        Ok(value) => {
            info!("{} = {}", key, value);
            *target = value;
        }
        Err(_) => warn!("Ignoring {}={:?}, keeping {}", key, raw, target),
    }
}
