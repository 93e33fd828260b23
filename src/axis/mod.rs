//! # Axis Module
//!
//! Analog joystick sampling.
//!
//! This module handles:
//! - Recentering and scaling 12-bit ADC readings
//! - Moving-average smoothing and deadzone classification
//! - Periodic per-axis sampler tasks feeding the movement channel

pub mod filter;
pub mod sampler;
