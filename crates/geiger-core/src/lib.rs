//! Hardware-independent core library for geiger-rs
//!
//! This crate contains the platform-agnostic pulse acquisition and dose
//! statistics pipeline of the radiation monitor: the pulse counter trait,
//! per-second bucketing, rate estimation and smoothing, dose integration,
//! the two chart aggregators, the alarm evaluator, the gate that guards
//! state shared between the sampling and display contexts, and the
//! main-screen renderer.
//!
//! It is `#![no_std]` with `extern crate alloc` so it compiles on both
//! embedded targets (ESP32-S3) and desktop hosts (for the simulator and tests).

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod alarm;
pub mod bucketizer;
pub mod config;
pub mod counter;
pub mod dashboard;
pub mod display;
pub mod dose;
pub mod error;
pub mod gate;
pub mod history;
pub mod interval;
pub mod pipeline;
pub mod rate;
pub mod settings;
pub mod snapshot;

pub use alarm::{AlarmConfig, AlarmDecision, AlarmEvaluator, AlarmOutput};
pub use bucketizer::SecondBucketizer;
pub use counter::{PulseCounter, SimulatedCounter};
pub use dashboard::Dashboard;
pub use display::{ChartId, DisplayLabels, DisplaySink};
pub use dose::{DoseAccumulator, RunningStats};
pub use error::{CounterError, SettingsError};
pub use gate::SharedStateGate;
pub use history::SecondHistory;
pub use interval::IntervalAggregator;
pub use pipeline::{ChartSeries, Consumer, CycleReport, Producer, SharedGate, SharedState};
pub use rate::{RateEstimate, RateEstimator};
pub use settings::{MemorySettingsStore, MilliUnits, Settings, SettingsChange, SettingsStore};
pub use snapshot::DataSnapshot;
