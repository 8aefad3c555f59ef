//! Core overlay module
//!
//! This module contains:
//! - The overlay that owns a session and drives the compositor
//! - The host bridge port, init payload and call dispatch

pub mod host;
pub mod overlay;
