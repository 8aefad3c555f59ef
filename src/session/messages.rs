//! Input and output message types for an overlay session

use crate::domain::{CaptureRegion, DisplayPoint};

/// Pointer button, as reported by the windowing layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Primary,
    Secondary,
    Middle,
}

/// Keys the overlay reacts to; everything else arrives as `Other`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    Escape,
    Shift,
    Character(String),
    Other,
}

/// Events delivered to the overlay by the host window
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    PointerDown(MouseButton, DisplayPoint),
    PointerMove(DisplayPoint),
    PointerUp(MouseButton, DisplayPoint),
    /// Context-menu style secondary click
    SecondaryClick(DisplayPoint),
    KeyDown(Key),
    /// Host asked to abandon the capture
    Abort,
}

impl Event {
    pub fn pointer_down(x: f32, y: f32) -> Self {
        Event::PointerDown(MouseButton::Primary, DisplayPoint::new(x, y))
    }

    pub fn pointer_move(x: f32, y: f32) -> Self {
        Event::PointerMove(DisplayPoint::new(x, y))
    }

    pub fn pointer_up(x: f32, y: f32) -> Self {
        Event::PointerUp(MouseButton::Primary, DisplayPoint::new(x, y))
    }

    pub fn key(c: &str) -> Self {
        Event::KeyDown(Key::Character(c.to_string()))
    }
}

/// Calls the session wants made on the host
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    Commit(CaptureRegion),
    Cancel,
    CopyColor(String),
}

/// What a state transition asks of the overlay
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Effects {
    pub redraw: bool,
    pub outbound: Option<Outbound>,
}

impl Effects {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn redraw() -> Self {
        Self {
            redraw: true,
            outbound: None,
        }
    }

    pub fn outbound(call: Outbound) -> Self {
        Self {
            redraw: false,
            outbound: Some(call),
        }
    }

    pub fn with_redraw(mut self) -> Self {
        self.redraw = true;
        self
    }
}
