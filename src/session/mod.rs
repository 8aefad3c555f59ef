//! Capture session management module
//!
//! This module contains:
//! - Session state and its transitions
//! - Input/output message types
//! - Keyboard shortcut mapping

pub mod messages;
pub mod shortcuts;
pub mod state;
