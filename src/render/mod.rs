//! Overlay rendering module
//!
//! This module contains:
//! - The layer compositor, using tiny-skia
//! - The magnifier inset
//! - Coalesced redraw scheduling

pub mod compositor;
pub mod magnifier;
pub mod scheduler;
