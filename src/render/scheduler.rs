//! Coalesced redraw scheduling
//!
//! Input handlers only mark the scene dirty. The first request in a frame asks the
//! scheduler for a frame callback; later requests in the same frame are absorbed, so a
//! burst of pointer moves produces exactly one compositor pass.

use std::cell::Cell;
use std::rc::Rc;

use crossbeam_channel::Sender;

/// Something that can arrange for the overlay's frame callback to run later
pub trait FrameScheduler {
    fn schedule_frame(&mut self);
}

/// Dirty flag in front of a [`FrameScheduler`]
pub struct RedrawQueue {
    scheduler: Box<dyn FrameScheduler>,
    pending: bool,
}

impl RedrawQueue {
    pub fn new(scheduler: Box<dyn FrameScheduler>) -> Self {
        Self {
            scheduler,
            pending: false,
        }
    }

    /// Mark the scene dirty; returns true if this request scheduled a new frame
    pub fn request(&mut self) -> bool {
        if self.pending {
            return false;
        }
        self.pending = true;
        self.scheduler.schedule_frame();
        true
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Consume the pending request at frame time
    pub fn take(&mut self) -> bool {
        std::mem::take(&mut self.pending)
    }
}

/// Frame tick sent to the render loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameTick;

/// Scheduler for a real frame loop: posts a tick the loop picks up on its next iteration
pub struct ChannelScheduler {
    tx: Sender<FrameTick>,
}

impl ChannelScheduler {
    pub fn new(tx: Sender<FrameTick>) -> Self {
        Self { tx }
    }
}

impl FrameScheduler for ChannelScheduler {
    fn schedule_frame(&mut self) {
        if self.tx.send(FrameTick).is_err() {
            log::warn!("Frame loop is gone, dropping redraw request");
        }
    }
}

/// Scheduler that only counts requests; the owner flushes frames by hand
#[derive(Clone, Default)]
pub struct ManualScheduler {
    requests: Rc<Cell<usize>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of frames requested so far
    pub fn requests(&self) -> usize {
        self.requests.get()
    }
}

impl FrameScheduler for ManualScheduler {
    fn schedule_frame(&mut self) {
        self.requests.set(self.requests.get() + 1);
    }
}
