use super::compositor::FrameCompositor;
use super::error::CloakError;
use super::source::{Display, FrameSource};
use log::{debug, error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The cancellation key was pressed.
    Cancelled,
    /// The live source stopped delivering frames.
    FrameReadFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Running,
    Stopped(StopReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    FrameShown,
    ReadFailed,
    KeyPressed(char),
}

impl SessionState {
    pub fn new() -> Self {
        SessionState::Running
    }

    pub fn transition(&self, event: SessionEvent, cancel_key: char) -> SessionState {
        match (self, event) {
            (SessionState::Stopped(reason), _) => SessionState::Stopped(*reason),
            (SessionState::Running, SessionEvent::ReadFailed) => {
                SessionState::Stopped(StopReason::FrameReadFailed)
            }
            (SessionState::Running, SessionEvent::KeyPressed(key)) if key == cancel_key => {
                SessionState::Stopped(StopReason::Cancelled)
            }
            (SessionState::Running, _) => SessionState::Running,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, SessionState::Running)
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionReport {
    pub reason: StopReason,
    pub frames_composited: u64,
    /// Average fraction of each frame replaced by background.
    pub mean_coverage: f32,
}

impl SessionReport {
    /// Process exit status for a session that ended without an error.
    pub fn exit_code(&self) -> i32 {
        match self.reason {
            StopReason::Cancelled => 0,
            StopReason::FrameReadFailed => 1,
        }
    }
}

/// Live loop: read, composite, show, poll for the cancel key.
///
/// The session owns the source and the display; both are released when it is
/// dropped, whichever way `run` returns.
pub struct Session<S: FrameSource, D: Display> {
    source: S,
    display: D,
    compositor: FrameCompositor,
    state: SessionState,
    frame_counter: u64,
    coverage_sum: f64,
}

impl<S: FrameSource, D: Display> Session<S, D> {
    pub fn new(compositor: FrameCompositor, source: S, display: D) -> Self {
        Self {
            source,
            display,
            compositor,
            state: SessionState::new(),
            frame_counter: 0,
            coverage_sum: 0.0,
        }
    }

    pub fn current_state(&self) -> SessionState {
        self.state
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_counter
    }

    fn apply(&mut self, event: SessionEvent) {
        let cancel_key = self.compositor.config().cancel_key;
        let next = self.state.transition(event, cancel_key);
        if next != self.state {
            debug!("Session {:?} -> {:?} on {:?}", self.state, next, event);
        }
        self.state = next;
    }

    /// One RUNNING iteration. Returns the state after it.
    pub fn step(&mut self) -> Result<SessionState, CloakError> {
        if !self.state.is_running() {
            return Ok(self.state);
        }

        let frame = match self.source.read_frame()? {
            Some(frame) => frame,
            None => {
                error!("❌ {}", CloakError::FrameRead);
                self.apply(SessionEvent::ReadFailed);
                return Ok(self.state);
            }
        };

        let composite = self.compositor.composite(&frame)?;
        self.frame_counter += 1;
        self.coverage_sum += composite.coverage() as f64;

        let config = self.compositor.config();
        let wait = config.poll_interval();
        self.display.show(&config.window_title, &composite.output)?;
        self.apply(SessionEvent::FrameShown);

        if let Some(key) = self.display.poll_key(wait)? {
            self.apply(SessionEvent::KeyPressed(key));
        }

        Ok(self.state)
    }

    pub fn run(&mut self) -> Result<SessionReport, CloakError> {
        info!(
            "🎬 Session started, press {:?} to stop",
            self.compositor.config().cancel_key
        );

        let reason = loop {
            if let SessionState::Stopped(reason) = self.step()? {
                break reason;
            }
        };

        let report = SessionReport {
            reason,
            frames_composited: self.frame_counter,
            mean_coverage: if self.frame_counter == 0 {
                0.0
            } else {
                (self.coverage_sum / self.frame_counter as f64) as f32
            },
        };
        info!(
            "🛑 Session stopped ({:?}) after {} frames",
            report.reason, report.frames_composited
        );
        Ok(report)
    }
}

impl<S: FrameSource, D: Display> Drop for Session<S, D> {
    fn drop(&mut self) {
        info!("🗑️ Session: releasing camera and window");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cloak::config::CloakConfig;
    use crate::core::cloak::frame::Frame;
    use crate::core::cloak::source::{RecordingDisplay, ScriptedDevice, VideoDevice};

    const BLUE: [u8; 3] = [200, 43, 43];
    const GRAY: [u8; 3] = [128, 128, 128];

    fn compositor(width: u32, height: u32) -> FrameCompositor {
        FrameCompositor::new(CloakConfig::default(), Frame::filled(width, height, GRAY))
    }

    fn frames(n: usize, bgr: [u8; 3]) -> Vec<Option<Frame>> {
        (0..n).map(|_| Some(Frame::filled(8, 8, bgr))).collect()
    }

    #[test]
    fn test_running_transitions() {
        let s = SessionState::new();
        assert_eq!(s.transition(SessionEvent::FrameShown, ' '), SessionState::Running);
        assert_eq!(
            s.transition(SessionEvent::KeyPressed('q'), ' '),
            SessionState::Running
        );
        assert_eq!(
            s.transition(SessionEvent::KeyPressed(' '), ' '),
            SessionState::Stopped(StopReason::Cancelled)
        );
        assert_eq!(
            s.transition(SessionEvent::ReadFailed, ' '),
            SessionState::Stopped(StopReason::FrameReadFailed)
        );
    }

    #[test]
    fn test_stopped_is_terminal() {
        let stopped = SessionState::Stopped(StopReason::Cancelled);
        assert_eq!(stopped.transition(SessionEvent::FrameShown, ' '), stopped);
        assert_eq!(stopped.transition(SessionEvent::ReadFailed, ' '), stopped);
        assert!(!stopped.is_running());
    }

    #[test]
    fn test_read_failure_ends_session() {
        let device = ScriptedDevice::new(frames(3, GRAY));
        let display = RecordingDisplay::new(Vec::new());
        let log = display.log();

        let mut session = Session::new(compositor(8, 8), device.open(0).unwrap(), display);
        let report = session.run().unwrap();

        assert_eq!(report.reason, StopReason::FrameReadFailed);
        assert_eq!(report.frames_composited, 3);
        assert_eq!(report.exit_code(), 1);
        assert_eq!(log.shown_count(), 3);
        assert_eq!(device.reads(), 4);
    }

    #[test]
    fn test_cancel_key_ends_session() {
        let device = ScriptedDevice::new(frames(10, GRAY));
        let display = RecordingDisplay::new(vec![None, Some('q'), Some(' ')]);
        let log = display.log();

        let mut session = Session::new(compositor(8, 8), device.open(0).unwrap(), display);
        let report = session.run().unwrap();

        assert_eq!(report.reason, StopReason::Cancelled);
        assert_eq!(report.frames_composited, 3);
        assert_eq!(report.exit_code(), 0);
        assert_eq!(log.shown_count(), 3);
        assert_eq!(log.titles()[0], "Invisible Cloak");
    }

    #[test]
    fn test_configured_cancel_key() {
        let config = CloakConfig {
            cancel_key: 'q',
            ..Default::default()
        };
        let compositor = FrameCompositor::new(config, Frame::filled(8, 8, GRAY));
        let device = ScriptedDevice::new(frames(10, GRAY));
        let display = RecordingDisplay::new(vec![Some(' '), Some('q')]);

        let mut session = Session::new(compositor, device.open(0).unwrap(), display);
        let report = session.run().unwrap();
        assert_eq!(report.reason, StopReason::Cancelled);
        assert_eq!(report.frames_composited, 2);
    }

    #[test]
    fn test_resources_released_on_error_path() {
        let device = ScriptedDevice::new(vec![Some(Frame::filled(4, 4, GRAY))]);
        let display = RecordingDisplay::new(Vec::new());
        let log = display.log();

        {
            let mut session = Session::new(compositor(8, 8), device.open(0).unwrap(), display);
            let err = session.run().unwrap_err();
            assert!(matches!(err, CloakError::DimensionMismatch { .. }));
        }

        assert_eq!(device.released(), 1);
        assert!(log.is_closed());
        assert_eq!(log.shown_count(), 0);
    }

    #[test]
    fn test_step_after_stop_is_noop() {
        let device = ScriptedDevice::new(Vec::new());
        let display = RecordingDisplay::new(Vec::new());
        let mut session = Session::new(compositor(8, 8), device.open(0).unwrap(), display);
        assert_eq!(session.current_state(), SessionState::Running);

        assert_eq!(
            session.step().unwrap(),
            SessionState::Stopped(StopReason::FrameReadFailed)
        );
        assert_eq!(
            session.step().unwrap(),
            SessionState::Stopped(StopReason::FrameReadFailed)
        );
        assert_eq!(device.reads(), 1);
        assert_eq!(session.frame_count(), 0);
        assert!(!session.current_state().is_running());
    }

    #[test]
    fn test_report_coverage() {
        let mut reads = frames(1, BLUE);
        reads.extend(frames(1, GRAY));
        let device = ScriptedDevice::new(reads);
        let display = RecordingDisplay::new(Vec::new());

        let mut session = Session::new(compositor(8, 8), device.open(0).unwrap(), display);
        let report = session.run().unwrap();
        assert_eq!(report.frames_composited, 2);
        assert!((report.mean_coverage - 0.5).abs() < 1e-6);
    }
}
