//! # Motionpad Library
//!
//! Sensor-to-wire pipeline for a handheld motion controller.
//!
//! Button edges, joystick deflection and fused IMU orientation are sampled by
//! independent tasks, handed over through bounded channels, and serialized by
//! a single aggregator into fixed-size packets on a serial link.

pub mod axis;
pub mod config;
pub mod error;
pub mod input;
pub mod orientation;
pub mod packet;
pub mod peripherals;
pub mod pipeline;
pub mod serial;
pub mod telemetry;
