//! ESP32-S3 hardware glue for geiger-rs
//!
//! Implements the `geiger-core` seams on the device: the PCNT pulse counter,
//! the buzzer, SD-card settings storage and WiFi bring-up. The binary in
//! `src/bin/main.rs` wires them to the producer (core 1) and consumer
//! (core 0) loops.

#![no_std]

pub mod buzzer;
pub mod control;
pub mod pcnt;
pub mod settings_store;
pub mod wifi;
