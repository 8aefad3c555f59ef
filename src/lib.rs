//! Interactive region capture overlay
//!
//! Shows a full-screen capture under a dark mask, lets the user drag out a region with a
//! live magnifier and color readout, and hands the region in native pixels to the host.

pub mod capture;
pub mod config;
pub mod core;
pub mod domain;
pub mod render;
pub mod screenshot;
pub mod session;

pub use crate::core::host::{HostFuture, HostPort, InitPayload, Spawner};
pub use crate::core::overlay::Overlay;
pub use crate::session::messages::{Event, Key, MouseButton};
pub use crate::session::state::SessionState;
