//! # Orientation Module
//!
//! Inertial sampling and the fusion collaborator interface.

pub mod fusion;
pub mod sampler;
