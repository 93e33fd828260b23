//! # Packet Module
//!
//! Fixed-size controller packets sent over the serial link.
//!
//! This module handles:
//! - Value types flowing through the pipeline (buttons, actions, axis and orientation samples)
//! - 4-byte simple and 7-byte combined packet encoding
//! - Host-side stream decoding and resynchronization

pub mod protocol;
pub mod encoder;
pub mod decoder;
