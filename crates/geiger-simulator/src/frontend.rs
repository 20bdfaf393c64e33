//! Where the simulator sends what the consumer publishes

use log::{debug, trace};

use geiger_core::AlarmOutput;
#[cfg(not(feature = "window"))]
use geiger_core::{ChartId, CycleReport, DisplayLabels, DisplaySink};
#[cfg(not(feature = "window"))]
use log::info;

/// Request coming back from the user interface.
#[cfg_attr(not(feature = "window"), allow(dead_code))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Quit,
    ResetDose,
    ToggleAlarm,
}

/// Stands in for the buzzer.
#[derive(Default)]
pub struct LogBuzzer {
    sounding: Option<u32>,
}

impl AlarmOutput for LogBuzzer {
    fn start_tone(&mut self, freq_hz: u32, duty_pct: u8) {
        debug!("Buzzer: {} Hz at {}%", freq_hz, duty_pct);
        self.sounding = Some(freq_hz);
    }

    fn stop_tone(&mut self) {
        if let Some(freq_hz) = self.sounding.take() {
            trace!("Buzzer: {} Hz off", freq_hz);
        }
    }
}

/// Headless sink: readouts at `debug!`, chart changes at `info!`.
#[cfg(not(feature = "window"))]
#[derive(Default)]
pub struct LogSink {
    last_labels: DisplayLabels,
    hourly_len: usize,
    daily_len: usize,
}

#[cfg(not(feature = "window"))]
impl DisplaySink for LogSink {
    fn show_labels(&mut self, labels: &DisplayLabels) {
        if *labels != self.last_labels {
            debug!(
                "Current {} uSv/h | Average {} | Max {} | Dose {} mSv",
                labels.current, labels.average, labels.maximum, labels.cumulative
            );
            self.last_labels = labels.clone();
        }
    }

    fn show_chart(&mut self, chart: ChartId, values: &[f32], scale_max: f32) {
        let seen = match chart {
            ChartId::Hourly => &mut self.hourly_len,
            ChartId::Daily => &mut self.daily_len,
        };
        if values.len() != *seen {
            info!(
                "{:?} chart: {} buckets, latest {:.3} uSv/h, scale 0..{:.0}",
                chart,
                values.len(),
                values.last().copied().unwrap_or_default(),
                scale_max
            );
            *seen = values.len();
        }
    }
}

/// Terminal-only frontend.
#[cfg(not(feature = "window"))]
#[derive(Default)]
pub struct LogFrontend {
    sink: LogSink,
}

#[cfg(not(feature = "window"))]
impl LogFrontend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn present(&mut self, report: &CycleReport) -> Option<Command> {
        report.publish(&mut self.sink);
        None
    }
}

#[cfg(feature = "window")]
pub use window::WindowFrontend;

#[cfg(feature = "window")]
mod window {
    use embedded_graphics::pixelcolor::Rgb565;
    use embedded_graphics::prelude::*;
    use embedded_graphics_simulator::{
        OutputSettingsBuilder, SimulatorDisplay, SimulatorEvent, Window, sdl2::Keycode,
    };

    use geiger_core::CycleReport;
    use geiger_core::dashboard::{DISPLAY_HEIGHT_PX, DISPLAY_WIDTH_PX, Dashboard};

    use super::Command;

    /// Pixel scale factor for the simulator window.
    const WINDOW_SCALE: u32 = 2;

    /// SDL2 window showing the device dashboard.
    ///
    /// Keys: R resets the dose, A toggles the alarm, Q quits.
    pub struct WindowFrontend {
        dashboard: Dashboard<SimulatorDisplay<Rgb565>>,
        window: Window,
    }

    impl WindowFrontend {
        pub fn new() -> Self {
            let display =
                SimulatorDisplay::<Rgb565>::new(Size::new(DISPLAY_WIDTH_PX, DISPLAY_HEIGHT_PX));
            let output_settings = OutputSettingsBuilder::new().scale(WINDOW_SCALE).build();
            let mut dashboard = Dashboard::new(display);
            dashboard.clear();

            let mut window = Window::new("Geiger Simulator", &output_settings);
            // The SDL window is created lazily on the first update and
            // `events()` panics before that.
            window.update(dashboard.target());

            Self { dashboard, window }
        }

        pub fn present(&mut self, report: &CycleReport) -> Option<Command> {
            report.publish(&mut self.dashboard);
            self.window.update(self.dashboard.target());

            let mut command = None;
            for event in self.window.events() {
                match event {
                    SimulatorEvent::Quit => return Some(Command::Quit),
                    SimulatorEvent::KeyDown { keycode, .. } => match keycode {
                        Keycode::Q | Keycode::Escape => return Some(Command::Quit),
                        Keycode::R => command = Some(Command::ResetDose),
                        Keycode::A => command = Some(Command::ToggleAlarm),
                        _ => {}
                    },
                    _ => {}
                }
            }
            command
        }
    }
}
