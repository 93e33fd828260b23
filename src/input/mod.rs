//! # Input Module
//!
//! Button handling, split between the interrupt-side capture handler and the
//! periodic classifier task.

pub mod capture;
pub mod classifier;
