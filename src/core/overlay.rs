//! One capture overlay: session, compositor, scheduler and host bridge wired together

use std::sync::Arc;
use std::time::Instant;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};

use crate::capture::image::SourceImage;
use crate::config::OverlayConfig;
use crate::core::host::{self, HostPort, HostReply, InitPayload, Spawner};
use crate::render::compositor::{Compositor, Frame};
use crate::render::scheduler::{FrameScheduler, FrameTick, RedrawQueue};
use crate::session::messages::{Effects, Event};
use crate::session::shortcuts::{self, KeyAction};
use crate::session::state::{Session, SessionState};

pub struct Overlay {
    session: Session,
    compositor: Compositor,
    redraw: RedrawQueue,
    port: Arc<dyn HostPort>,
    spawner: Spawner,
    reply_tx: Sender<HostReply>,
    replies: Receiver<HostReply>,
    initialized: bool,
    frames_rendered: usize,
    last_frame: Option<Frame>,
}

impl Overlay {
    pub fn new(
        viewport: (u32, u32),
        config: &OverlayConfig,
        port: Arc<dyn HostPort>,
        scheduler: Box<dyn FrameScheduler>,
        spawner: Spawner,
    ) -> Self {
        let (reply_tx, replies) = crossbeam_channel::unbounded();
        Self {
            session: Session::new(viewport, config),
            compositor: Compositor::new(config),
            redraw: RedrawQueue::new(scheduler),
            port,
            spawner,
            reply_tx,
            replies,
            initialized: false,
            frames_rendered: 0,
            last_frame: None,
        }
    }

    /// Handle the host's initialization event
    ///
    /// A missing or undecodable image is fatal: the host is asked to close the window and
    /// the session ends cancelled so the capture lock is released.
    pub fn initialize(&mut self, payload: serde_json::Value) -> anyhow::Result<()> {
        if self.initialized {
            anyhow::bail!("overlay received a second initialization event");
        }
        self.initialized = true;

        let result = InitPayload::image_data_url(payload)
            .and_then(|url| SourceImage::from_data_url(&url))
            .and_then(|(source, sampling)| self.session.load(source, sampling));

        match result {
            Ok(()) => {
                self.request_redraw();
                Ok(())
            }
            Err(err) => {
                let diagnostic = format!("Failed to load the screenshot: {:#}", err);
                log::error!("{}", diagnostic);
                self.port.request_close(&diagnostic);
                let effects = self.session.cancel();
                self.apply(effects);
                Err(err)
            }
        }
    }

    /// Feed one input event through the session
    pub fn handle(&mut self, event: Event, now: Instant) {
        let effects = match event {
            Event::PointerDown(button, p) => self.session.pointer_down(button, p),
            Event::PointerMove(p) => self.session.pointer_move(p),
            Event::PointerUp(button, p) => self.session.pointer_up(button, p),
            Event::SecondaryClick(_) => self.session.cancel(),
            Event::KeyDown(key) => match shortcuts::handle_key_event(self.session.state(), &key) {
                Some(KeyAction::Cancel) => self.session.cancel(),
                Some(KeyAction::ToggleColorFormat) => self.session.toggle_color_format(),
                Some(KeyAction::CopyColor) => self.session.copy_color(),
                None => Effects::none(),
            },
            Event::Abort => self.session.cancel(),
        };
        self.apply(effects);
        self.poll_host(now);
    }

    /// Apply host call outcomes that arrived since the last poll
    ///
    /// Hosts with asynchronous calls should run this whenever a call completes; frame
    /// callbacks run it too.
    pub fn poll_host(&mut self, now: Instant) {
        while let Ok(reply) = self.replies.try_recv() {
            match reply {
                HostReply::ColorCopied => {
                    let effects = self.session.color_copied(now);
                    self.apply(effects);
                }
                HostReply::ColorCopyFailed => log::warn!("Color was not copied"),
            }
        }
    }

    /// Frame callback: runs at most one compositor pass for all requests since the last
    pub fn on_frame(&mut self, now: Instant) -> Option<&Frame> {
        self.poll_host(now);
        let expired = self.session.expire_feedback(now);
        let requested = self.redraw.take();
        if !(requested || expired) {
            return None;
        }
        if !self.session.is_ready() || self.session.state().is_terminal() {
            return None;
        }
        let frame = self.compositor.render(&self.session)?;
        self.frames_rendered += 1;
        log::debug!(
            "Frame {} composited ({} labels)",
            self.frames_rendered,
            frame.labels.len()
        );
        self.last_frame = Some(frame);
        self.last_frame.as_ref()
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    pub fn frames_rendered(&self) -> usize {
        self.frames_rendered
    }

    pub fn last_frame(&self) -> Option<&Frame> {
        self.last_frame.as_ref()
    }

    pub fn redraw_pending(&self) -> bool {
        self.redraw.is_pending()
    }

    /// When the copy feedback should be cleared, if it is showing
    pub fn feedback_deadline(&self) -> Option<Instant> {
        self.session.copy_feedback_until()
    }

    fn request_redraw(&mut self) {
        if !self.session.state().is_terminal() {
            self.redraw.request();
        }
    }

    fn apply(&mut self, effects: Effects) {
        if effects.redraw {
            self.request_redraw();
        }
        if let Some(call) = effects.outbound {
            log::debug!("Host call: {:?}", call);
            (self.spawner)(host::dispatch(self.port.clone(), call, self.reply_tx.clone()));
        }
    }
}

/// Run every frame a channel-scheduled overlay has asked for
///
/// While copy feedback is showing, also waits for its deadline so it is cleared without
/// further input. Returns the number of frames composited.
pub fn run_pending_frames(overlay: &mut Overlay, ticks: &Receiver<FrameTick>) -> usize {
    let start = overlay.frames_rendered();
    loop {
        while ticks.try_recv().is_ok() {
            overlay.on_frame(Instant::now());
        }
        let Some(deadline) = overlay.feedback_deadline() else {
            break;
        };
        if let Err(RecvTimeoutError::Disconnected) = ticks.recv_deadline(deadline) {
            std::thread::sleep(deadline.saturating_duration_since(Instant::now()));
        }
        overlay.on_frame(Instant::now());
    }
    overlay.frames_rendered() - start
}
