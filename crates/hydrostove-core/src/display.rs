//! Dashboard rendering for the 128×64 monochrome panel
//!
//! Layout:
//! - rows 0..16: two lines of text (temperatures, then flow and power)
//! - rows 16..64: power history graph, one column per stored sample
//! - top-right corner: 8×8 warning icon while any warning is active
//!
//! When the big warning is shown it replaces the whole view.

use core::fmt::Write;

use embedded_graphics::image::{Image, ImageRaw};
use embedded_graphics::mono_font::{MonoTextStyle, ascii::FONT_5X8};
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{Line, PrimitiveStyle};
use embedded_graphics::text::{Alignment, Baseline, Text, TextStyleBuilder};
use heapless::String;

use crate::config::{DISPLAY_HEIGHT_PX, DISPLAY_WIDTH_PX, GRAPH_HEIGHT_PX, TEXT_AREA_HEIGHT_PX};
use crate::history::PowerHistory;
use crate::reading::Reading;

/// Height of one `FONT_5X8` text row in pixels
const TEXT_ROW_HEIGHT_PX: i32 = 8;

/// Maximum characters of one text row
const MAX_LINE_LENGTH: usize = 32;

/// Side length of the small warning icon in pixels
const ICON_SIZE_PX: u32 = 8;

/// Side length of the big warning triangle in pixels
const BIG_ICON_SIZE_PX: u32 = 32;

/// Top edge of the big warning triangle
const BIG_ICON_TOP_PX: i32 = 2;

/// Small warning triangle, 1 bit per pixel, rows top to bottom, MSB left.
#[rustfmt::skip]
const WARNING_ICON: [u8; 8] = [
    0x18, 0x18, 0x3C, 0x24, 0x66, 0x7E, 0xE7, 0xFF,
];

/// Full warning triangle with a cut-out exclamation mark, 4 bytes per row.
#[rustfmt::skip]
const BIG_WARNING_ICON: [u8; 128] = [
    0x00, 0x01, 0x80, 0x00, 0x00, 0x01, 0x80, 0x00,
    0x00, 0x03, 0xC0, 0x00, 0x00, 0x03, 0xC0, 0x00,
    0x00, 0x07, 0xE0, 0x00, 0x00, 0x07, 0xE0, 0x00,
    0x00, 0x0F, 0xF0, 0x00, 0x00, 0x0F, 0xF0, 0x00,
    0x00, 0x1F, 0xF8, 0x00, 0x00, 0x1F, 0xF8, 0x00,
    0x00, 0x3F, 0xFC, 0x00, 0x00, 0x3C, 0x3C, 0x00,
    0x00, 0x7C, 0x3E, 0x00, 0x00, 0x7C, 0x3E, 0x00,
    0x00, 0xFC, 0x3F, 0x00, 0x00, 0xFC, 0x3F, 0x00,
    0x01, 0xFC, 0x3F, 0x80, 0x01, 0xFC, 0x3F, 0x80,
    0x03, 0xFC, 0x3F, 0xC0, 0x03, 0xFC, 0x3F, 0xC0,
    0x07, 0xFC, 0x3F, 0xE0, 0x07, 0xFC, 0x3F, 0xE0,
    0x0F, 0xFC, 0x3F, 0xF0, 0x0F, 0xFF, 0xFF, 0xF0,
    0x1F, 0xFF, 0xFF, 0xF8, 0x1F, 0xFC, 0x3F, 0xF8,
    0x3F, 0xFC, 0x3F, 0xFC, 0x3F, 0xFC, 0x3F, 0xFC,
    0x7F, 0xFF, 0xFF, 0xFE, 0x7F, 0xFF, 0xFF, 0xFE,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
];

/// Height in pixels of the bar for `sample` on a graph `k` pixels tall.
///
/// Bars are scaled against the history's high-water mark `max_value`.
/// Negative samples and a non-positive `max_value` give an empty bar.
pub fn bar_height(sample: i32, max_value: i32, k: u32) -> u32 {
    if max_value <= 0 || sample <= 0 {
        return 0;
    }
    let h = i64::from(sample) * i64::from(k) / i64::from(max_value);
    h.clamp(0, i64::from(k)) as u32
}

/// Read-side view of the monitor state.
#[derive(Debug, Clone, Default)]
pub struct Dashboard {
    warning: bool,
    big_warning: bool,
    /// Live reading for the text rows, otherwise the history's current one
    reading: Option<Reading>,
}

impl Dashboard {
    pub const fn new() -> Self {
        Self {
            warning: false,
            big_warning: false,
            reading: None,
        }
    }

    /// Show or hide the small warning icon.
    pub fn set_warning(&mut self, on: bool) {
        self.warning = on;
    }

    pub fn warning(&self) -> bool {
        self.warning
    }

    /// Replace the normal view with the full-screen warning, or restore it.
    pub fn show_big_warning(&mut self, on: bool) {
        self.big_warning = on;
    }

    pub fn big_warning(&self) -> bool {
        self.big_warning
    }

    /// Update the reading shown in the text rows.
    pub fn set_reading(&mut self, reading: Reading) {
        self.reading = Some(reading);
    }

    /// Clear the target and draw the whole frame.
    pub fn draw<const N: usize, D>(
        &self,
        history: &PowerHistory<N>,
        target: &mut D,
    ) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = BinaryColor>,
    {
        target.clear(BinaryColor::Off)?;

        if self.big_warning {
            return self.draw_big_warning(target);
        }

        let reading = self.reading.or_else(|| history.current().copied());
        self.draw_text(reading.as_ref(), history.latest(), target)?;
        self.draw_graph(history, target)?;

        if self.warning {
            let raw = ImageRaw::<BinaryColor>::new(&WARNING_ICON, ICON_SIZE_PX);
            let corner = Point::new((DISPLAY_WIDTH_PX - ICON_SIZE_PX) as i32, 0);
            Image::new(&raw, corner).draw(target)?;
        }

        Ok(())
    }

    fn draw_text<D>(
        &self,
        reading: Option<&Reading>,
        latest_power: Option<i32>,
        target: &mut D,
    ) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = BinaryColor>,
    {
        let style = MonoTextStyle::new(&FONT_5X8, BinaryColor::On);

        let first = temperature_line(reading);
        Text::with_baseline(&first, Point::zero(), style, Baseline::Top).draw(target)?;

        let second = flow_power_line(reading, latest_power);
        Text::with_baseline(
            &second,
            Point::new(0, TEXT_ROW_HEIGHT_PX),
            style,
            Baseline::Top,
        )
        .draw(target)?;

        Ok(())
    }

    fn draw_graph<const N: usize, D>(
        &self,
        history: &PowerHistory<N>,
        target: &mut D,
    ) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = BinaryColor>,
    {
        let baseline = DISPLAY_HEIGHT_PX as i32 - 1;
        let max_value = history.max_value();
        let style = PrimitiveStyle::with_stroke(BinaryColor::On, 1);

        for (x, &sample) in history
            .samples()
            .iter()
            .take(DISPLAY_WIDTH_PX as usize)
            .enumerate()
        {
            let h = bar_height(sample, max_value, GRAPH_HEIGHT_PX);
            if h == 0 {
                continue;
            }
            let x = x as i32;
            Line::new(Point::new(x, baseline), Point::new(x, baseline - h as i32 + 1))
                .into_styled(style)
                .draw(target)?;
        }

        Ok(())
    }

    fn draw_big_warning<D>(&self, target: &mut D) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = BinaryColor>,
    {
        let raw = ImageRaw::<BinaryColor>::new(&BIG_WARNING_ICON, BIG_ICON_SIZE_PX);
        let left = ((DISPLAY_WIDTH_PX - BIG_ICON_SIZE_PX) / 2) as i32;
        Image::new(&raw, Point::new(left, BIG_ICON_TOP_PX)).draw(target)?;

        let style = MonoTextStyle::new(&FONT_5X8, BinaryColor::On);
        let centered = TextStyleBuilder::new()
            .alignment(Alignment::Center)
            .baseline(Baseline::Top)
            .build();
        let center = (DISPLAY_WIDTH_PX / 2) as i32;
        let text_top = BIG_ICON_TOP_PX + BIG_ICON_SIZE_PX as i32 + 4;

        Text::with_text_style("WARNING", Point::new(center, text_top), style, centered)
            .draw(target)?;
        Text::with_text_style(
            "press button to mute",
            Point::new(center, text_top + TEXT_ROW_HEIGHT_PX + 4),
            style,
            centered,
        )
        .draw(target)?;

        Ok(())
    }
}

fn push_temperature(line: &mut String<MAX_LINE_LENGTH>, label: &str, celsius: Option<f32>) {
    let _ = match celsius {
        Some(c) => write!(line, "{label} {c:.1}C"),
        None => write!(line, "{label} --C"),
    };
}

/// First text row, e.g. `In 41.5C Out 63.0C`.
pub(crate) fn temperature_line(reading: Option<&Reading>) -> String<MAX_LINE_LENGTH> {
    let mut line = String::new();
    push_temperature(&mut line, "In", reading.and_then(|r| r.inlet));
    let _ = line.push(' ');
    push_temperature(&mut line, "Out", reading.and_then(|r| r.outlet));
    line
}

/// Second text row, e.g. `540l/h 13562W`.
pub(crate) fn flow_power_line(
    reading: Option<&Reading>,
    latest_power: Option<i32>,
) -> String<MAX_LINE_LENGTH> {
    let mut line = String::new();
    let _ = match reading {
        Some(r) => write!(line, "{:.0}l/h", r.flow_lph()),
        None => write!(line, "--l/h"),
    };
    let _ = match latest_power {
        Some(w) => write!(line, " {w}W"),
        None => write!(line, " --W"),
    };
    line
}

// Two text rows fill the text area
const _: () = assert!(TEXT_AREA_HEIGHT_PX as i32 == 2 * TEXT_ROW_HEIGHT_PX);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framebuffer::MonoFrameBuffer;
    use embedded_graphics::primitives::Rectangle;

    fn graph_area() -> Rectangle {
        Rectangle::new(
            Point::new(0, TEXT_AREA_HEIGHT_PX as i32),
            Size::new(DISPLAY_WIDTH_PX, GRAPH_HEIGHT_PX),
        )
    }

    fn column(x: i32) -> Rectangle {
        Rectangle::new(
            Point::new(x, TEXT_AREA_HEIGHT_PX as i32),
            Size::new(1, GRAPH_HEIGHT_PX),
        )
    }

    fn icon_area() -> Rectangle {
        Rectangle::new(
            Point::new((DISPLAY_WIDTH_PX - ICON_SIZE_PX) as i32, 0),
            Size::new(ICON_SIZE_PX, ICON_SIZE_PX),
        )
    }

    #[test]
    fn test_bar_height_scaling() {
        assert_eq!(bar_height(100, 100, 48), 48);
        assert_eq!(bar_height(50, 100, 48), 24);
        assert_eq!(bar_height(1, 100, 48), 0);
        assert_eq!(bar_height(i32::MAX, i32::MAX, 48), 48);
    }

    #[test]
    fn test_bar_height_guards() {
        assert_eq!(bar_height(100, 0, 48), 0);
        assert_eq!(bar_height(100, -5, 48), 0);
        assert_eq!(bar_height(-100, 100, 48), 0);
        // Never taller than the graph
        assert_eq!(bar_height(200, 100, 48), 48);
    }

    #[test]
    fn test_zero_max_draws_no_graph() {
        let mut history = PowerHistory::<128>::new();
        for watts in [0, -10, 0, -3000] {
            history.push_power(watts);
        }
        let mut fb = MonoFrameBuffer::new();
        Dashboard::new().draw(&history, &mut fb).unwrap();
        assert_eq!(fb.lit_pixels_in(&graph_area()), 0);
    }

    #[test]
    fn test_bars_scale_to_max() {
        let mut history = PowerHistory::<128>::new();
        history.push_power(100);
        history.push_power(50);
        history.push_power(-50);
        let mut fb = MonoFrameBuffer::new();
        Dashboard::new().draw(&history, &mut fb).unwrap();

        assert_eq!(fb.lit_pixels_in(&column(0)), 48);
        assert_eq!(fb.lit_pixels_in(&column(1)), 24);
        assert_eq!(fb.lit_pixels_in(&column(2)), 0);
        // Bars grow up from the bottom row
        assert!(fb.pixel(1, 63));
        assert!(fb.pixel(1, 40));
        assert!(!fb.pixel(1, 39));
    }

    #[test]
    fn test_warning_icon() {
        let history = PowerHistory::<128>::new();
        let mut dashboard = Dashboard::new();
        let mut fb = MonoFrameBuffer::new();

        dashboard.draw(&history, &mut fb).unwrap();
        assert_eq!(fb.lit_pixels_in(&icon_area()), 0);

        dashboard.set_warning(true);
        assert!(dashboard.warning());
        dashboard.draw(&history, &mut fb).unwrap();
        let expected: u32 = WARNING_ICON.iter().map(|b| b.count_ones()).sum();
        assert_eq!(fb.lit_pixels_in(&icon_area()), expected as usize);
    }

    #[test]
    fn test_big_warning_replaces_view() {
        let mut history = PowerHistory::<128>::new();
        history.push_power(1000);
        let mut dashboard = Dashboard::new();
        let mut fb = MonoFrameBuffer::new();

        dashboard.draw(&history, &mut fb).unwrap();
        assert!(fb.pixel(0, 63));

        dashboard.show_big_warning(true);
        assert!(dashboard.big_warning());
        dashboard.draw(&history, &mut fb).unwrap();
        assert!(!fb.pixel(0, 63));
        // Bottom row of the triangle is solid
        let bottom = BIG_ICON_TOP_PX + BIG_ICON_SIZE_PX as i32 - 1;
        assert!(fb.pixel(48, bottom));
        assert!(fb.pixel(79, bottom));
    }

    #[test]
    fn test_text_lines() {
        let reading = Reading::new(Some(41.46), None, 0.15);
        assert_eq!(temperature_line(Some(&reading)), "In 41.5C Out --C");
        assert_eq!(flow_power_line(Some(&reading), Some(0)), "540l/h 0W");
        assert_eq!(temperature_line(None), "In --C Out --C");
        assert_eq!(flow_power_line(None, None), "--l/h --W");
    }

    #[test]
    fn test_live_reading_overrides_history() {
        let mut history = PowerHistory::<128>::new();
        history.add(Reading::valid(20.0, 30.0, 0.1));
        let mut dashboard = Dashboard::new();
        dashboard.set_reading(Reading::valid(20.0, 30.0, 0.1));
        let mut fb = MonoFrameBuffer::new();
        dashboard.draw(&history, &mut fb).unwrap();
        // Text rows are populated
        let text_area = Rectangle::new(Point::zero(), Size::new(DISPLAY_WIDTH_PX, 16));
        assert!(fb.lit_pixels_in(&text_area) > 0);
    }
}
