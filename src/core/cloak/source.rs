//! Camera and window collaborators
//!
//! The cloak core only talks to these traits. Hardware backends live behind
//! the `opencv` feature; the scripted implementations here drive tests and
//! demos without a camera.

use super::error::CloakError;
use super::frame::Frame;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub trait FrameSource {
    /// Blocking read. `Ok(None)` means the device produced no frame this time.
    fn read_frame(&mut self) -> Result<Option<Frame>, CloakError>;
}

/// Opens frame sources. Dropping the returned source releases the device.
pub trait VideoDevice {
    type Source: FrameSource;

    fn open(&self, index: i32) -> Result<Self::Source, CloakError>;
}

/// Window output plus keyboard polling. Dropping it closes the window.
pub trait Display {
    fn show(&mut self, title: &str, frame: &Frame) -> Result<(), CloakError>;

    /// Waits at most `wait` for a key press.
    fn poll_key(&mut self, wait: Duration) -> Result<Option<char>, CloakError>;
}

#[derive(Debug, Default)]
struct DeviceCounters {
    opened: AtomicUsize,
    released: AtomicUsize,
    reads: AtomicUsize,
}

/// Device that replays a fixed script of reads shared by every source it opens.
#[derive(Clone)]
pub struct ScriptedDevice {
    script: Arc<Mutex<VecDeque<Option<Frame>>>>,
    counters: Arc<DeviceCounters>,
    fail_open: bool,
}

impl ScriptedDevice {
    pub fn new(reads: Vec<Option<Frame>>) -> Self {
        Self {
            script: Arc::new(Mutex::new(reads.into())),
            counters: Arc::new(DeviceCounters::default()),
            fail_open: false,
        }
    }

    /// Device whose `open` always fails.
    pub fn unavailable() -> Self {
        Self {
            fail_open: true,
            ..Self::new(Vec::new())
        }
    }

    pub fn push(&self, read: Option<Frame>) {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(read);
        }
    }

    pub fn opened(&self) -> usize {
        self.counters.opened.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.counters.released.load(Ordering::SeqCst)
    }

    pub fn reads(&self) -> usize {
        self.counters.reads.load(Ordering::SeqCst)
    }
}

impl VideoDevice for ScriptedDevice {
    type Source = ScriptedSource;

    fn open(&self, index: i32) -> Result<ScriptedSource, CloakError> {
        if self.fail_open {
            return Err(CloakError::Device(format!("camera {} unavailable", index)));
        }
        self.counters.opened.fetch_add(1, Ordering::SeqCst);
        Ok(ScriptedSource {
            script: Arc::clone(&self.script),
            counters: Arc::clone(&self.counters),
        })
    }
}

pub struct ScriptedSource {
    script: Arc<Mutex<VecDeque<Option<Frame>>>>,
    counters: Arc<DeviceCounters>,
}

impl FrameSource for ScriptedSource {
    fn read_frame(&mut self) -> Result<Option<Frame>, CloakError> {
        self.counters.reads.fetch_add(1, Ordering::SeqCst);
        let mut script = self
            .script
            .lock()
            .map_err(|_| CloakError::Device("script lock poisoned".to_string()))?;
        Ok(script.pop_front().flatten())
    }
}

impl Drop for ScriptedSource {
    fn drop(&mut self) {
        self.counters.released.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Debug, Default)]
struct DisplayState {
    shown: Vec<Frame>,
    titles: Vec<String>,
    closed: bool,
}

/// Display that keeps every frame it is shown and replays scripted key presses.
pub struct RecordingDisplay {
    keys: VecDeque<Option<char>>,
    state: Arc<Mutex<DisplayState>>,
}

/// Read side of a [`RecordingDisplay`] that outlives the display itself.
#[derive(Clone)]
pub struct DisplayLog {
    state: Arc<Mutex<DisplayState>>,
}

impl RecordingDisplay {
    pub fn new(keys: Vec<Option<char>>) -> Self {
        Self {
            keys: keys.into(),
            state: Arc::new(Mutex::new(DisplayState::default())),
        }
    }

    pub fn log(&self) -> DisplayLog {
        DisplayLog {
            state: Arc::clone(&self.state),
        }
    }
}

impl DisplayLog {
    pub fn shown(&self) -> Vec<Frame> {
        self.state.lock().map(|s| s.shown.clone()).unwrap_or_default()
    }

    pub fn shown_count(&self) -> usize {
        self.state.lock().map(|s| s.shown.len()).unwrap_or(0)
    }

    pub fn titles(&self) -> Vec<String> {
        self.state.lock().map(|s| s.titles.clone()).unwrap_or_default()
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().map(|s| s.closed).unwrap_or(false)
    }
}

impl Display for RecordingDisplay {
    fn show(&mut self, title: &str, frame: &Frame) -> Result<(), CloakError> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| CloakError::Display("display state poisoned".to_string()))?;
        state.shown.push(frame.clone());
        state.titles.push(title.to_string());
        Ok(())
    }

    fn poll_key(&mut self, _wait: Duration) -> Result<Option<char>, CloakError> {
        Ok(self.keys.pop_front().flatten())
    }
}

impl Drop for RecordingDisplay {
    fn drop(&mut self) {
        if let Ok(mut state) = self.state.lock() {
            state.closed = true;
        }
    }
}
