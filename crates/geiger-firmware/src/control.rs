//! Requests from the touch UI and the web dashboard to the consumer loop

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;

use geiger_core::SettingsChange;

pub const CONTROL_CHANNEL_CAPACITY: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlEvent {
    /// A setting was edited; the consumer applies and persists it
    Settings(SettingsChange),
    /// Clear dose statistics and charts
    ResetDose,
}

/// Global control channel
///
/// Screen event handlers and the HTTP dashboard send into it; the consumer
/// loop drains it once per cycle.
pub static CONTROL_CHANNEL: Channel<
    CriticalSectionRawMutex,
    ControlEvent,
    CONTROL_CHANNEL_CAPACITY,
> = Channel::new();
