//! Instantaneous thermal power of the heat exchanger

/// Specific heat capacity of water in J/(kg·K).
pub const SPECIFIC_HEAT_WATER: f32 = 4186.0;

/// Thermal power in watts carried away by the water loop.
///
/// `flow_lps` is treated as kg/s (water density ≈ 1 kg/l). The result is
/// negative when the outlet is cooler than the inlet, which is a valid
/// reading (stove off, sensor noise).
pub fn thermal_power(flow_lps: f32, inlet_c: f32, outlet_c: f32) -> f32 {
    SPECIFIC_HEAT_WATER * flow_lps * (outlet_c - inlet_c)
}

/// Round a power value to a whole-watt history sample.
///
/// Saturates at the `i32` bounds; NaN maps to zero.
pub fn to_sample(watts: f32) -> i32 {
    libm::roundf(watts) as i32
}
