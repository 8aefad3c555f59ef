//! Captured bitmap handling
//!
//! This module consolidates:
//! - Source image decoding and the isolated sampling copy (image.rs)
//! - Color picking from the sampling copy (sampler.rs)

pub mod image;
pub mod sampler;
