//! Control loop state of the monitor
//!
//! [`Controller`] owns everything the loop needs and is driven by the platform
//! with timestamps and raw ADC values. It never blocks and never reads a clock
//! itself, so the firmware, the simulator and the tests share the same logic.

use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::DrawTarget;
use embedded_hal::digital::OutputPin;
use log::{debug, info, warn};

use crate::config::MonitorConfig;
use crate::display::Dashboard;
use crate::filter::{DEFAULT_MEDIAN_WINDOW, MedianFilter};
use crate::flow::{FlowMeter, PulseCounter};
use crate::history::PowerHistory;
use crate::reading::Reading;
use crate::thermistor::Thermistor;
use crate::warning::{Alarm, WarningMonitor, WarningStatus};

/// What happened during one [`Controller::poll`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PollOutcome {
    /// The frame should be redrawn and flushed
    pub redraw: bool,
    /// A sample was appended to the power history
    pub history_added: bool,
    pub reading: Reading,
    pub warnings: WarningStatus,
}

/// Fires once every `period_ms`, measured from the last time it fired.
#[derive(Debug, Clone, Copy)]
struct Pacer {
    last_ms: Option<u64>,
}

impl Pacer {
    const fn new() -> Self {
        Self { last_ms: None }
    }

    /// Elapsed time if the period is over. The first call only starts the clock.
    fn due(&mut self, now_ms: u64, period_ms: u64) -> Option<u64> {
        let Some(last) = self.last_ms else {
            self.last_ms = Some(now_ms);
            return None;
        };
        let elapsed = now_ms.saturating_sub(last);
        if elapsed >= period_ms {
            self.last_ms = Some(now_ms);
            Some(elapsed)
        } else {
            None
        }
    }

    fn started(&self) -> bool {
        self.last_ms.is_some()
    }
}

#[derive(Debug, Clone, Copy)]
enum Channel {
    Inlet,
    Outlet,
}

/// The heat exchanger monitor.
///
/// `P` drives the buzzer, `N` is the number of graph columns.
pub struct Controller<P, const N: usize> {
    config: MonitorConfig,
    inlet_filter: MedianFilter<DEFAULT_MEDIAN_WINDOW>,
    outlet_filter: MedianFilter<DEFAULT_MEDIAN_WINDOW>,
    thermistor: Thermistor,
    flow: FlowMeter,
    history: PowerHistory<N>,
    dashboard: Dashboard,
    monitor: WarningMonitor,
    alarm: Alarm<P>,
    reading: Reading,
    warnings: WarningStatus,
    flow_pacer: Pacer,
    history_pacer: Pacer,
    display_pacer: Pacer,
    /// The visible view changed outside the display period
    view_changed: bool,
}

impl<P: OutputPin, const N: usize> Controller<P, N> {
    pub fn new(config: MonitorConfig, buzzer: P) -> Self {
        info!(
            "Monitor: {} ohm B{} thermistors, {} pulses/s per l/min, {} ms per column",
            config.thermistor.nominal_ohms,
            config.thermistor.beta,
            config.flow.k_factor,
            config.timing.history_period_ms
        );
        Self {
            config,
            inlet_filter: MedianFilter::new(),
            outlet_filter: MedianFilter::new(),
            thermistor: Thermistor::new(config.thermistor),
            flow: FlowMeter::new(config.flow),
            history: PowerHistory::new(),
            dashboard: Dashboard::new(),
            monitor: WarningMonitor::new(config.warning),
            alarm: Alarm::new(buzzer),
            reading: Reading::default(),
            warnings: WarningStatus::default(),
            flow_pacer: Pacer::new(),
            history_pacer: Pacer::new(),
            display_pacer: Pacer::new(),
            view_changed: false,
        }
    }

    /// Run one iteration of the control loop.
    ///
    /// `adc_inlet` and `adc_outlet` are raw 10-bit readings, `pulses` is the
    /// counter fed by the flow sensor handler.
    pub fn poll(
        &mut self,
        now_ms: u64,
        adc_inlet: u16,
        adc_outlet: u16,
        pulses: &PulseCounter,
    ) -> PollOutcome {
        let inlet = self.temperature(Channel::Inlet, adc_inlet);
        let outlet = self.temperature(Channel::Outlet, adc_outlet);

        let timing = self.config.timing;
        if !self.flow_pacer.started() {
            // Pulses from before the first poll have no known duration
            pulses.take_and_reset();
        }
        if let Some(elapsed) = self.flow_pacer.due(now_ms, timing.flow_period_ms) {
            self.flow.tick(pulses.take_and_reset(), elapsed);
        }

        self.reading = Reading::new(inlet, outlet, self.flow.flow_lps());
        self.warnings = self.monitor.evaluate(&self.reading);
        self.alarm.update(&self.warnings);

        self.dashboard.set_reading(self.reading);
        self.dashboard.set_warning(self.warnings.flags.any());
        self.refresh_big_warning();

        let period = self.history.sample_period_ms(timing.history_period_ms);
        let history_added = self.history_pacer.due(now_ms, period).is_some();
        if history_added {
            let before = self.history.scale();
            let scale = self.history.add(self.reading);
            debug!(
                "Power {} W stored, {} of {} columns",
                self.reading.power_watts(),
                self.history.len(),
                N
            );
            if scale != before {
                info!(
                    "Graph now spans {} ms per column",
                    self.history.sample_period_ms(timing.history_period_ms)
                );
            }
        }

        let first_frame = !self.display_pacer.started();
        let display_due = self
            .display_pacer
            .due(now_ms, timing.display_period_ms)
            .is_some();
        let redraw = first_frame || display_due || self.view_changed;
        self.view_changed = false;

        PollOutcome {
            redraw,
            history_added,
            reading: self.reading,
            warnings: self.warnings,
        }
    }

    /// Mute or unmute the buzzer (user button). Returns whether it is now muted.
    pub fn toggle_mute(&mut self) -> bool {
        let muted = self.alarm.toggle_mute();
        self.refresh_big_warning();
        muted
    }

    /// Render the current frame.
    pub fn draw<D>(&self, target: &mut D) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = BinaryColor>,
    {
        self.dashboard.draw(&self.history, target)
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn history(&self) -> &PowerHistory<N> {
        &self.history
    }

    /// Reading built by the last poll.
    pub fn reading(&self) -> &Reading {
        &self.reading
    }

    pub fn warnings(&self) -> &WarningStatus {
        &self.warnings
    }

    pub fn flow_meter(&self) -> &FlowMeter {
        &self.flow
    }

    pub fn dashboard(&self) -> &Dashboard {
        &self.dashboard
    }

    pub fn alarm(&self) -> &Alarm<P> {
        &self.alarm
    }

    /// Filter and convert one thermistor channel. Invalid readings become `None`.
    fn temperature(&mut self, channel: Channel, raw: u16) -> Option<f32> {
        let (filter, series_ohms, previous) = match channel {
            Channel::Inlet => (
                &mut self.inlet_filter,
                self.config.inlet_series_ohms,
                self.reading.inlet,
            ),
            Channel::Outlet => (
                &mut self.outlet_filter,
                self.config.outlet_series_ohms,
                self.reading.outlet,
            ),
        };
        let filtered = filter.run(raw);

        match self.thermistor.celsius(filtered, series_ohms) {
            Ok(celsius) => {
                debug!("{:?}: {} C ({})", channel, celsius, filtered);
                Some(celsius)
            }
            Err(e) => {
                if previous.is_some() {
                    warn!("{:?} sensor: {}", channel, e);
                } else {
                    debug!("{:?} sensor: {}", channel, e);
                }
                None
            }
        }
    }

    /// The big warning shows while an acute warning is active and not muted.
    fn refresh_big_warning(&mut self) {
        let big = self.warnings.flags.is_acute() && !self.alarm.is_muted();
        if big != self.dashboard.big_warning() {
            self.dashboard.show_big_warning(big);
            self.view_changed = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framebuffer::MonoFrameBuffer;
    use core::convert::Infallible;
    use embedded_hal::digital::ErrorType;

    /// About 32 °C with the default 100 kΩ thermistor on 10 kΩ
    const ADC_COOL: u16 = 900;
    /// About 60 °C
    const ADC_WARM: u16 = 730;
    /// About 88 °C, above the overheat threshold
    const ADC_HOT: u16 = 512;
    /// About 19 °C
    const ADC_COLD: u16 = 950;

    #[derive(Default)]
    struct Buzzer {
        high: bool,
    }

    impl ErrorType for Buzzer {
        type Error = Infallible;
    }

    impl OutputPin for Buzzer {
        fn set_low(&mut self) -> Result<(), Self::Error> {
            self.high = false;
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Self::Error> {
            self.high = true;
            Ok(())
        }
    }

    fn controller<const N: usize>() -> Controller<Buzzer, N> {
        Controller::new(MonitorConfig::default(), Buzzer::default())
    }

    #[test]
    fn test_first_poll_redraws_without_history() {
        let mut ctrl = controller::<8>();
        let pulses = PulseCounter::new();
        let outcome = ctrl.poll(0, ADC_COLD, ADC_COLD, &pulses);
        assert!(outcome.redraw);
        assert!(!outcome.history_added);
        assert!(ctrl.history().is_empty());
    }

    #[test]
    fn test_display_pacing() {
        let mut ctrl = controller::<8>();
        let pulses = PulseCounter::new();
        let redraws: [bool; 5] =
            [0, 100, 499, 500, 600].map(|t| ctrl.poll(t, ADC_COLD, ADC_COLD, &pulses).redraw);
        assert_eq!(redraws, [true, false, false, true, false]);
    }

    #[test]
    fn test_history_period_stretches_with_scale() {
        let mut ctrl = controller::<4>();
        let pulses = PulseCounter::new();
        let mut lengths = [0usize; 8];
        // One poll per second, history base period 5 s
        for t in 0..=35u64 {
            ctrl.poll(t * 1000, ADC_COOL, ADC_WARM, &pulses);
            if t % 5 == 0 {
                lengths[(t / 5) as usize] = ctrl.history().len();
            }
        }
        // Full at 20 s, compressed at 25 s, then one column per 10 s
        assert_eq!(lengths, [0, 1, 2, 3, 4, 3, 3, 4]);
        assert_eq!(ctrl.history().scale(), 2);
    }

    #[test]
    fn test_flow_from_pulses() {
        let mut ctrl = controller::<8>();
        let pulses = PulseCounter::new();
        // Stale pulses before start-up are discarded
        pulses.count();
        ctrl.poll(0, ADC_COOL, ADC_WARM, &pulses);
        assert_eq!(pulses.pending(), 0);

        for _ in 0..45 {
            pulses.count();
        }
        let outcome = ctrl.poll(1000, ADC_COOL, ADC_WARM, &pulses);
        assert!((ctrl.flow_meter().flow_lpm() - 11.0).abs() < 1e-3);
        assert!(outcome.reading.power_watts() > 0);
        assert!(!outcome.warnings.flags.no_flow);
    }

    #[test]
    fn test_sensor_fault_reads_as_none() {
        let mut ctrl = controller::<8>();
        let pulses = PulseCounter::new();
        let outcome = ctrl.poll(0, 0, ADC_WARM, &pulses);
        assert_eq!(outcome.reading.inlet, None);
        assert!(outcome.reading.outlet.is_some());
        assert_eq!(outcome.reading.power_watts(), 0);
        assert!(outcome.warnings.flags.sensor_fault);
        assert!(ctrl.dashboard().warning());
    }

    #[test]
    fn test_median_rejects_single_spike() {
        let mut ctrl = controller::<8>();
        let pulses = PulseCounter::new();
        ctrl.poll(0, ADC_COOL, ADC_COLD, &pulses);
        ctrl.poll(100, ADC_COOL, ADC_COLD, &pulses);
        let outcome = ctrl.poll(200, ADC_COOL, ADC_HOT, &pulses);
        assert!(!outcome.warnings.flags.overheat);
    }

    #[test]
    fn test_acute_warning_redraws_and_mutes() {
        let mut ctrl = controller::<8>();
        let pulses = PulseCounter::new();
        ctrl.poll(0, ADC_COLD, ADC_COLD, &pulses);
        ctrl.poll(100, ADC_COLD, ADC_HOT, &pulses);

        // Second hot sample wins the median
        let outcome = ctrl.poll(200, ADC_COLD, ADC_HOT, &pulses);
        assert!(outcome.warnings.flags.overheat);
        assert!(outcome.redraw);
        assert!(ctrl.dashboard().big_warning());
        assert!(ctrl.alarm().is_sounding());

        assert!(ctrl.toggle_mute());
        assert!(!ctrl.alarm().is_sounding());
        assert!(!ctrl.dashboard().big_warning());
        // Leaving the big warning is visible right away
        assert!(ctrl.poll(300, ADC_COLD, ADC_HOT, &pulses).redraw);
        assert!(!ctrl.poll(400, ADC_COLD, ADC_HOT, &pulses).redraw);
    }

    #[test]
    fn test_draw_renders_history() {
        let mut ctrl = controller::<8>();
        let pulses = PulseCounter::new();
        ctrl.poll(0, ADC_COOL, ADC_WARM, &pulses);
        // 45 Hz over the whole first history period
        for _ in 0..225 {
            pulses.count();
        }
        ctrl.poll(5000, ADC_COOL, ADC_WARM, &pulses);
        assert_eq!(ctrl.history().len(), 1);

        let mut fb = MonoFrameBuffer::new();
        ctrl.draw(&mut fb).unwrap();
        // Only sample is the maximum: full-height bar in column 0
        assert!(fb.pixel(0, 63));
        assert!(fb.pixel(0, 16));
    }
}
