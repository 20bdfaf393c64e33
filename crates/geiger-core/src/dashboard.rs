//! Main-screen renderer
//!
//! Draws the four readouts and the two history charts onto any RGB565
//! `DrawTarget`. The firmware hands it the ILI9342C panel, the simulator an
//! SDL window.

use embedded_graphics::mono_font::MonoTextStyle;
use embedded_graphics::mono_font::ascii::{FONT_6X10, FONT_10X20};
use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{PrimitiveStyle, Rectangle};
use embedded_graphics::text::{Alignment, Baseline, Text, TextStyleBuilder};
use log::error;

use crate::config::{DAILY_BUCKETS, HOURLY_BUCKETS};
use crate::display::{ChartId, DisplayLabels, DisplaySink};

pub const DISPLAY_WIDTH_PX: u32 = 320;
pub const DISPLAY_HEIGHT_PX: u32 = 240;

const COLOR_BACKGROUND: Rgb565 = Rgb565::new(18 >> 3, 23 >> 2, 24 >> 3);
const COLOR_CHART_BACKGROUND: Rgb565 = Rgb565::new(26 >> 3, 32 >> 2, 33 >> 3);
const COLOR_CAPTION: Rgb565 = Rgb565::new(150 >> 3, 160 >> 2, 165 >> 3);
const COLOR_VALUE: Rgb565 = Rgb565::WHITE;
const COLOR_BAR: Rgb565 = Rgb565::new(95 >> 3, 185 >> 2, 141 >> 3);

/// Height of the readout block at the top of the screen
const READOUT_HEIGHT_PX: u32 = 96;

/// Space between the two charts and around the readouts
const MARGIN_PX: u32 = 4;

const READOUT_CAPTIONS: [&str; 4] = ["Current uSv/h", "Average uSv/h", "Max uSv/h", "Dose mSv"];

/// Pixel height of a bar for `value` drawn against `0..=scale_max`.
pub fn bar_height(value: f32, scale_max: f32, max_px: u32) -> u32 {
    if !value.is_finite() || value <= 0.0 || scale_max <= 0.0 {
        return 0;
    }
    let fraction = (value / scale_max).min(1.0);
    libm::roundf(fraction * max_px as f32) as u32
}

/// Area a chart is drawn into.
pub fn chart_area(chart: ChartId) -> Rectangle {
    let charts_top = READOUT_HEIGHT_PX + MARGIN_PX;
    let height = (DISPLAY_HEIGHT_PX - charts_top - MARGIN_PX) / 2;
    let width = DISPLAY_WIDTH_PX - 2 * MARGIN_PX;
    let top = match chart {
        ChartId::Hourly => charts_top,
        ChartId::Daily => charts_top + height + MARGIN_PX,
    };
    Rectangle::new(
        Point::new(MARGIN_PX as i32, top as i32),
        Size::new(width, height - MARGIN_PX),
    )
}

/// [`DisplaySink`] that renders onto a draw target.
///
/// Drawing errors are logged and the frame is dropped.
pub struct Dashboard<D> {
    target: D,
}

impl<D> Dashboard<D>
where
    D: DrawTarget<Color = Rgb565>,
    D::Error: core::fmt::Debug,
{
    pub fn new(target: D) -> Self {
        Self { target }
    }

    /// Paint the background once before the first readings arrive.
    pub fn clear(&mut self) {
        if let Err(e) = self.target.clear(COLOR_BACKGROUND) {
            error!("Dashboard clear failed: {:?}", e);
        }
    }

    pub fn target(&self) -> &D {
        &self.target
    }

    pub fn target_mut(&mut self) -> &mut D {
        &mut self.target
    }

    pub fn into_target(self) -> D {
        self.target
    }

    fn draw_labels(&mut self, labels: &DisplayLabels) -> Result<(), D::Error> {
        let cell_width = DISPLAY_WIDTH_PX / 2;
        let cell_height = READOUT_HEIGHT_PX / 2;
        let caption_style = MonoTextStyle::new(&FONT_6X10, COLOR_CAPTION);
        let value_style = MonoTextStyle::new(&FONT_10X20, COLOR_VALUE);
        let centered = TextStyleBuilder::new()
            .alignment(Alignment::Center)
            .baseline(Baseline::Top)
            .build();

        let values = [
            &labels.current,
            &labels.average,
            &labels.maximum,
            &labels.cumulative,
        ];

        for (i, (caption, value)) in READOUT_CAPTIONS.iter().zip(values).enumerate() {
            let origin = Point::new(
                ((i as u32 % 2) * cell_width) as i32,
                ((i as u32 / 2) * cell_height) as i32,
            );
            let cell = Rectangle::new(origin, Size::new(cell_width, cell_height));
            cell.into_styled(PrimitiveStyle::with_fill(COLOR_BACKGROUND))
                .draw(&mut self.target)?;

            let center_x = origin.x + (cell_width / 2) as i32;
            Text::with_text_style(
                caption,
                Point::new(center_x, origin.y + MARGIN_PX as i32),
                caption_style,
                centered,
            )
            .draw(&mut self.target)?;
            Text::with_text_style(
                value.as_str(),
                Point::new(center_x, origin.y + 18),
                value_style,
                centered,
            )
            .draw(&mut self.target)?;
        }

        Ok(())
    }

    fn draw_chart(
        &mut self,
        chart: ChartId,
        values: &[f32],
        scale_max: f32,
        capacity: usize,
    ) -> Result<(), D::Error> {
        let area = chart_area(chart);
        area.into_styled(PrimitiveStyle::with_fill(COLOR_CHART_BACKGROUND))
            .draw(&mut self.target)?;

        let slot_width = area.size.width / capacity.max(1) as u32;
        let bar_width = slot_width.saturating_sub(1).max(1);
        let bottom = area.top_left.y + area.size.height as i32;

        for (i, value) in values.iter().enumerate().take(capacity) {
            let height = bar_height(*value, scale_max, area.size.height);
            if height == 0 {
                continue;
            }
            let x = area.top_left.x + (i as u32 * slot_width) as i32;
            Rectangle::new(
                Point::new(x, bottom - height as i32),
                Size::new(bar_width, height),
            )
            .into_styled(PrimitiveStyle::with_fill(COLOR_BAR))
            .draw(&mut self.target)?;
        }

        Ok(())
    }
}

impl<D> DisplaySink for Dashboard<D>
where
    D: DrawTarget<Color = Rgb565>,
    D::Error: core::fmt::Debug,
{
    fn show_labels(&mut self, labels: &DisplayLabels) {
        if let Err(e) = self.draw_labels(labels) {
            error!("Failed to draw readouts: {:?}", e);
        }
    }

    fn show_chart(&mut self, chart: ChartId, values: &[f32], scale_max: f32) {
        let capacity = match chart {
            ChartId::Hourly => HOURLY_BUCKETS,
            ChartId::Daily => DAILY_BUCKETS,
        };
        if let Err(e) = self.draw_chart(chart, values, scale_max, capacity) {
            error!("Failed to draw {:?} chart: {:?}", chart, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::Infallible;

    /// Framebuffer-backed target for checking what was drawn.
    struct Canvas {
        pixels: Vec<Rgb565>,
    }

    impl Canvas {
        fn new() -> Self {
            Self {
                pixels: vec![Rgb565::BLACK; (DISPLAY_WIDTH_PX * DISPLAY_HEIGHT_PX) as usize],
            }
        }

        fn pixel(&self, x: i32, y: i32) -> Rgb565 {
            self.pixels[(y as u32 * DISPLAY_WIDTH_PX + x as u32) as usize]
        }
    }

    impl OriginDimensions for Canvas {
        fn size(&self) -> Size {
            Size::new(DISPLAY_WIDTH_PX, DISPLAY_HEIGHT_PX)
        }
    }

    impl DrawTarget for Canvas {
        type Color = Rgb565;
        type Error = Infallible;

        fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
        where
            I: IntoIterator<Item = Pixel<Self::Color>>,
        {
            for Pixel(point, color) in pixels {
                if point.x >= 0
                    && point.y >= 0
                    && (point.x as u32) < DISPLAY_WIDTH_PX
                    && (point.y as u32) < DISPLAY_HEIGHT_PX
                {
                    self.pixels[(point.y as u32 * DISPLAY_WIDTH_PX + point.x as u32) as usize] =
                        color;
                }
            }
            Ok(())
        }
    }

    #[test]
    fn test_bar_height_scales_and_clips() {
        assert_eq!(bar_height(0.5, 1.0, 50), 25);
        assert_eq!(bar_height(3.0, 2.0, 50), 50);
        assert_eq!(bar_height(-1.0, 2.0, 50), 0);
        assert_eq!(bar_height(f32::NAN, 2.0, 50), 0);
        assert_eq!(bar_height(1.0, 0.0, 50), 0);
    }

    #[test]
    fn test_charts_do_not_overlap() {
        let hourly = chart_area(ChartId::Hourly);
        let daily = chart_area(ChartId::Daily);

        let hourly_bottom = hourly.top_left.y + hourly.size.height as i32;
        assert!(hourly_bottom <= daily.top_left.y);
        assert!(daily.top_left.y + daily.size.height as i32 <= DISPLAY_HEIGHT_PX as i32);
    }

    #[test]
    fn test_full_bar_reaches_chart_top() {
        let mut dashboard = Dashboard::new(Canvas::new());

        dashboard.show_chart(ChartId::Hourly, &[2.0], 2.0);

        let area = chart_area(ChartId::Hourly);
        let canvas = dashboard.into_target();
        assert_eq!(canvas.pixel(area.top_left.x, area.top_left.y), COLOR_BAR);
        // Second slot stays empty
        let slot = (area.size.width / 20) as i32;
        assert_eq!(
            canvas.pixel(area.top_left.x + slot + 1, area.top_left.y),
            COLOR_CHART_BACKGROUND
        );
    }

    #[test]
    fn test_labels_draw_text() {
        let mut dashboard = Dashboard::new(Canvas::new());
        dashboard.clear();

        dashboard.show_labels(&DisplayLabels::default());
        let caption_pixels = dashboard
            .target()
            .pixels
            .iter()
            .filter(|p| **p == COLOR_CAPTION)
            .count();

        assert!(caption_pixels > 0);
    }
}
