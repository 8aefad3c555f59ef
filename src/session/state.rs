use std::time::{Duration, Instant};

use crate::capture::image::{SamplingBuffer, SourceImage};
use crate::capture::sampler::{self, ColorFormat, ColorSample};
use crate::config::OverlayConfig;
use crate::domain::{CoordinateMapper, DisplayPoint, DisplayRect, SelectionRect, SourceRect};
use crate::session::messages::{Effects, MouseButton, Outbound};

/// Selections narrower or shorter than this many display pixels never commit
pub const MIN_SELECTION_SIZE: f32 = 10.0;

/// Lifecycle of one capture session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    Idle,
    Dragging,
    Committed,
    Cancelled,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Committed | SessionState::Cancelled)
    }
}

/// Everything established by a successful initialization
#[derive(Debug)]
pub struct LoadedCapture {
    pub source: SourceImage,
    pub sampling: SamplingBuffer,
    pub mapper: CoordinateMapper,
}

impl LoadedCapture {
    /// Source pixels covered by a display rectangle, clipped to the bitmap
    pub fn source_rect(&self, rect: DisplayRect) -> Option<SourceRect> {
        let (nw, nh) = self.mapper.native_size();
        let bounds = SourceRect::new(0, 0, nw as i32, nh as i32);
        self.mapper.rect_to_source(rect).intersect(bounds)
    }
}

/// State of a single overlay session
///
/// Mutated only through the transition methods, each of which reports the redraw and
/// host call it needs as [`Effects`].
#[derive(Debug)]
pub struct Session {
    state: SessionState,
    display_size: (u32, u32),
    capture: Option<LoadedCapture>,
    selection: SelectionRect,
    pointer: Option<DisplayPoint>,
    color: Option<ColorSample>,
    color_format: ColorFormat,
    copy_feedback_until: Option<Instant>,
    copy_feedback_duration: Duration,
    min_selection_size: f32,
}

impl Session {
    pub fn new(display_size: (u32, u32), config: &OverlayConfig) -> Self {
        Self {
            state: SessionState::Idle,
            display_size,
            capture: None,
            selection: SelectionRect::default(),
            pointer: None,
            color: None,
            color_format: config.color_format,
            copy_feedback_until: None,
            copy_feedback_duration: Duration::from_millis(config.copy_feedback_ms),
            min_selection_size: config.min_selection_size.max(MIN_SELECTION_SIZE),
        }
    }

    /// Install the decoded image; moves the session to ready Idle
    pub fn load(&mut self, source: SourceImage, sampling: SamplingBuffer) -> anyhow::Result<()> {
        if self.state != SessionState::Idle || self.capture.is_some() {
            anyhow::bail!("session already initialized (state {:?})", self.state);
        }
        let mapper = CoordinateMapper::new((source.width(), source.height()), self.display_size)?;
        log::info!(
            "Capture ready: native {}x{}, display {}x{}",
            source.width(),
            source.height(),
            self.display_size.0,
            self.display_size.1
        );
        self.capture = Some(LoadedCapture {
            source,
            sampling,
            mapper,
        });
        Ok(())
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.capture.is_some()
    }

    pub fn capture(&self) -> Option<&LoadedCapture> {
        self.capture.as_ref()
    }

    pub fn display_size(&self) -> (u32, u32) {
        self.display_size
    }

    pub fn pointer(&self) -> Option<DisplayPoint> {
        self.pointer
    }

    pub fn color(&self) -> Option<&ColorSample> {
        self.color.as_ref()
    }

    pub fn color_format(&self) -> ColorFormat {
        self.color_format
    }

    pub fn copy_feedback(&self) -> bool {
        self.copy_feedback_until.is_some()
    }

    pub fn copy_feedback_until(&self) -> Option<Instant> {
        self.copy_feedback_until
    }

    /// Normalized selection while dragging
    pub fn selection(&self) -> Option<DisplayRect> {
        (self.state == SessionState::Dragging).then(|| self.selection.normalized())
    }

    pub fn pointer_down(&mut self, button: MouseButton, p: DisplayPoint) -> Effects {
        match button {
            MouseButton::Secondary => self.cancel(),
            MouseButton::Primary if self.state == SessionState::Idle && self.is_ready() => {
                self.state = SessionState::Dragging;
                self.selection = SelectionRect::at(p);
                self.pointer = Some(p);
                log::debug!("Selection started at ({:.1}, {:.1})", p.x, p.y);
                Effects::redraw()
            }
            _ => Effects::none(),
        }
    }

    pub fn pointer_move(&mut self, p: DisplayPoint) -> Effects {
        if self.state.is_terminal() {
            return Effects::none();
        }
        self.pointer = Some(p);
        if self.state == SessionState::Dragging {
            self.selection.update(p);
        }
        if let Some(capture) = &self.capture {
            // Keep the last sample when the pointer leaves the bitmap
            if let Some(sample) = sampler::sample(&capture.sampling, capture.mapper.to_source(p)) {
                self.color = Some(sample);
            }
        }
        Effects::redraw()
    }

    pub fn pointer_up(&mut self, button: MouseButton, p: DisplayPoint) -> Effects {
        if button != MouseButton::Primary || self.state != SessionState::Dragging {
            return Effects::none();
        }
        self.selection.update(p);
        let rect = self.selection.normalized();

        if rect.width < self.min_selection_size || rect.height < self.min_selection_size {
            log::info!(
                "Selection {:.0}x{:.0} below minimum, cancelling",
                rect.width,
                rect.height
            );
            return self.cancel();
        }

        let Some(capture) = &self.capture else {
            log::error!("Selection finished without a loaded capture");
            return self.cancel();
        };
        let Some(region) = capture.source_rect(rect) else {
            log::warn!("Selection maps to no source pixels, cancelling");
            return self.cancel();
        };

        self.state = SessionState::Committed;
        log::info!(
            "Selection committed: {}x{} at ({}, {})",
            region.width(),
            region.height(),
            region.left,
            region.top
        );
        Effects::outbound(Outbound::Commit(region.to_capture_region()))
    }

    /// Move to Cancelled; only the first call produces a host `cancel`
    pub fn cancel(&mut self) -> Effects {
        if self.state.is_terminal() {
            return Effects::none();
        }
        self.state = SessionState::Cancelled;
        log::info!("Capture cancelled");
        Effects::outbound(Outbound::Cancel)
    }

    pub fn toggle_color_format(&mut self) -> Effects {
        if self.state.is_terminal() {
            return Effects::none();
        }
        self.color_format = self.color_format.toggled();
        Effects::redraw()
    }

    /// Ask the host to copy the current color text in the selected format
    pub fn copy_color(&mut self) -> Effects {
        if self.state.is_terminal() {
            return Effects::none();
        }
        let Some(color) = &self.color else {
            return Effects::none();
        };
        Effects::outbound(Outbound::CopyColor(color.text(self.color_format).to_string()))
    }

    /// The host confirmed the copy; show the feedback until it expires
    pub fn color_copied(&mut self, now: Instant) -> Effects {
        if self.state.is_terminal() {
            return Effects::none();
        }
        self.copy_feedback_until = Some(now + self.copy_feedback_duration);
        Effects::redraw()
    }

    /// Drop expired copy feedback; true if the scene changed
    pub fn expire_feedback(&mut self, now: Instant) -> bool {
        match self.copy_feedback_until {
            Some(until) if now >= until => {
                self.copy_feedback_until = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn ready_session(native: (u32, u32), display: (u32, u32)) -> Session {
        let img = RgbaImage::from_fn(native.0, native.1, |x, y| {
            Rgba([(x % 256) as u8, (y % 256) as u8, 7, 255])
        });
        let (source, sampling) = SourceImage::from_rgba(img).unwrap();
        let mut session = Session::new(display, &OverlayConfig::default());
        session.load(source, sampling).unwrap();
        session
    }

    fn drag(session: &mut Session, from: (f32, f32), to: (f32, f32)) -> Effects {
        session.pointer_down(MouseButton::Primary, DisplayPoint::new(from.0, from.1));
        session.pointer_move(DisplayPoint::new(to.0, to.1));
        session.pointer_up(MouseButton::Primary, DisplayPoint::new(to.0, to.1))
    }

    #[test]
    fn test_hidpi_drag_commits_source_rect() {
        let mut session = ready_session((3000, 2000), (1500, 1000));
        let effects = drag(&mut session, (100.0, 100.0), (200.0, 150.0));
        assert_eq!(session.state(), SessionState::Committed);
        assert_eq!(
            effects.outbound,
            Some(Outbound::Commit(crate::domain::CaptureRegion {
                x: 200.0,
                y: 200.0,
                width: 200.0,
                height: 100.0
            }))
        );
    }

    #[test]
    fn test_small_drags_always_cancel() {
        for (dx, dy) in [(9.0, 50.0), (50.0, 9.0), (0.0, 0.0), (9.9, 9.9), (-9.0, 40.0)] {
            let mut session = ready_session((200, 200), (200, 200));
            let effects = drag(&mut session, (50.0, 50.0), (50.0 + dx, 50.0 + dy));
            assert_eq!(session.state(), SessionState::Cancelled, "drag {dx}x{dy}");
            assert_eq!(effects.outbound, Some(Outbound::Cancel));
        }
    }

    #[test]
    fn test_configured_minimum_cannot_go_below_ten() {
        let img = RgbaImage::new(100, 100);
        let (source, sampling) = SourceImage::from_rgba(img).unwrap();
        let config = OverlayConfig {
            min_selection_size: 4.0,
            ..Default::default()
        };
        let mut session = Session::new((100, 100), &config);
        session.load(source, sampling).unwrap();

        let effects = drag(&mut session, (10.0, 10.0), (15.0, 15.0));
        assert_eq!(session.state(), SessionState::Cancelled);
        assert_eq!(effects.outbound, Some(Outbound::Cancel));
    }

    #[test]
    fn test_larger_configured_minimum_is_honored() {
        let img = RgbaImage::new(100, 100);
        let (source, sampling) = SourceImage::from_rgba(img).unwrap();
        let config = OverlayConfig {
            min_selection_size: 30.0,
            ..Default::default()
        };
        let mut session = Session::new((100, 100), &config);
        session.load(source, sampling).unwrap();

        drag(&mut session, (10.0, 10.0), (30.0, 50.0));
        assert_eq!(session.state(), SessionState::Cancelled);
    }

    #[test]
    fn test_source_rect_is_clipped_to_bitmap() {
        let session = ready_session((100, 80), (100, 80));
        let capture = session.capture().unwrap();
        let rect = DisplayRect {
            x: 60.0,
            y: 50.0,
            width: 90.0,
            height: 90.0,
        };
        assert_eq!(capture.source_rect(rect), Some(SourceRect::new(60, 50, 100, 80)));
        let outside = DisplayRect {
            x: 120.0,
            y: 0.0,
            width: 20.0,
            height: 20.0,
        };
        assert_eq!(capture.source_rect(outside), None);
    }

    #[test]
    fn test_copy_confirmation_ignored_once_terminal() {
        let mut session = ready_session((50, 50), (50, 50));
        session.cancel();
        assert_eq!(session.color_copied(Instant::now()), Effects::none());
        assert!(!session.copy_feedback());
    }

    #[test]
    fn test_exactly_minimum_size_commits() {
        let mut session = ready_session((200, 200), (200, 200));
        drag(&mut session, (20.0, 20.0), (30.0, 30.0));
        assert_eq!(session.state(), SessionState::Committed);
    }

    #[test]
    fn test_cancel_only_once() {
        let mut session = ready_session((10, 10), (10, 10));
        assert_eq!(session.cancel().outbound, Some(Outbound::Cancel));
        assert_eq!(session.cancel(), Effects::none());
        assert_eq!(
            session.pointer_down(MouseButton::Secondary, DisplayPoint::new(1.0, 1.0)),
            Effects::none()
        );
    }

    #[test]
    fn test_cancel_after_commit_is_noop() {
        let mut session = ready_session((200, 200), (200, 200));
        drag(&mut session, (0.0, 0.0), (100.0, 100.0));
        assert_eq!(session.cancel(), Effects::none());
        assert_eq!(session.state(), SessionState::Committed);
    }

    #[test]
    fn test_pointer_down_before_load_is_ignored() {
        let mut session = Session::new((100, 100), &OverlayConfig::default());
        let effects = session.pointer_down(MouseButton::Primary, DisplayPoint::new(5.0, 5.0));
        assert_eq!(effects, Effects::none());
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn test_double_load_is_rejected() {
        let mut session = ready_session((4, 4), (4, 4));
        let (source, sampling) = SourceImage::from_rgba(RgbaImage::new(4, 4)).unwrap();
        assert!(session.load(source, sampling).is_err());
    }

    #[test]
    fn test_color_is_sampled_without_dragging() {
        let mut session = ready_session((400, 200), (200, 100));
        session.pointer_move(DisplayPoint::new(10.6, 20.2));
        let color = session.color().unwrap();
        // floor(10.6 * 2) = 21, floor(20.2 * 2) = 40
        assert_eq!((color.r, color.g, color.b), (21, 40, 7));
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn test_toggle_keeps_triple() {
        let mut session = ready_session((50, 50), (50, 50));
        session.pointer_move(DisplayPoint::new(3.0, 4.0));
        let before = session.color().cloned().unwrap();
        session.toggle_color_format();
        assert_eq!(session.color_format(), ColorFormat::Rgb);
        let after = session.color().cloned().unwrap();
        assert_eq!((before.r, before.g, before.b), (after.r, after.g, after.b));
    }

    #[test]
    fn test_copy_color_uses_current_format_and_expires() {
        let mut session = ready_session((50, 50), (50, 50));
        let now = Instant::now();
        assert_eq!(session.copy_color(), Effects::none());

        session.pointer_move(DisplayPoint::new(3.0, 4.0));
        session.toggle_color_format();
        let effects = session.copy_color();
        assert_eq!(
            effects.outbound,
            Some(Outbound::CopyColor("rgb(3, 4, 7)".to_string()))
        );
        // nothing is shown until the host confirms
        assert!(!session.copy_feedback());
        assert_eq!(session.color_copied(now), Effects::redraw());
        assert!(session.copy_feedback());
        assert!(!session.expire_feedback(now + Duration::from_millis(100)));
        assert!(session.expire_feedback(now + Duration::from_millis(300)));
        assert!(!session.copy_feedback());
    }

    #[test]
    fn test_selection_only_visible_while_dragging() {
        let mut session = ready_session((100, 100), (100, 100));
        assert_eq!(session.selection(), None);
        session.pointer_down(MouseButton::Primary, DisplayPoint::new(10.0, 10.0));
        session.pointer_move(DisplayPoint::new(40.0, 30.0));
        let rect = session.selection().unwrap();
        assert_eq!((rect.width, rect.height), (30.0, 20.0));
    }
}
