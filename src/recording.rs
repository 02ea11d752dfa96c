use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::types::Snapshot;

#[derive(Debug, Error)]
pub enum CaptureError {
    /// The user refused or cancelled the capture request.
    #[error("recording was declined")]
    Declined,
    #[error("capture device error: {0}")]
    Device(String),
    #[error("capture i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode snapshot: {0}")]
    Encode(#[from] serde_json::Error),
}

impl CaptureError {
    pub fn is_declined(&self) -> bool {
        matches!(self, CaptureError::Declined)
    }
}

pub trait RecordingHandle {
    fn record(&mut self, snapshot: &Snapshot) -> Result<(), CaptureError>;

    /// True once the capture was ended from outside the simulator.
    fn has_ended(&self) -> bool {
        false
    }

    fn stop(&mut self) -> Result<(), CaptureError>;
}

pub trait CaptureSource {
    fn acquire(&mut self) -> Result<Box<dyn RecordingHandle>, CaptureError>;
}

/// Every stop path goes through [`RecordingSession::release`].
pub struct RecordingSession {
    handle: Option<Box<dyn RecordingHandle>>,
    frames: u64,
}

impl RecordingSession {
    pub fn new(handle: Box<dyn RecordingHandle>) -> Self {
        Self {
            handle: Some(handle),
            frames: 0,
        }
    }

    pub fn is_active(&self) -> bool {
        self.handle.is_some()
    }

    pub fn has_ended(&self) -> bool {
        self.handle.as_ref().is_some_and(|handle| handle.has_ended())
    }

    /// Forwards a snapshot; a failing capture is released and reported as inactive.
    pub fn record(&mut self, snapshot: &Snapshot) -> bool {
        let Some(handle) = self.handle.as_mut() else {
            return false;
        };
        match handle.record(snapshot) {
            Ok(()) => {
                self.frames += 1;
                true
            }
            Err(err) => {
                warn!(
                    %err,
                    revision = snapshot.revision,
                    "recording write failed, releasing capture"
                );
                self.release();
                false
            }
        }
    }

    /// Idempotent: the handle is stopped at most once.
    pub fn release(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            match handle.stop() {
                Ok(()) => info!(frames = self.frames, "recording released"),
                Err(err) => warn!(%err, frames = self.frames, "recording stop reported an error"),
            }
        }
    }
}

impl Drop for RecordingSession {
    fn drop(&mut self) {
        self.release();
    }
}

// one JSON object per line; no path means declined
#[derive(Debug, Clone, Default)]
pub struct TraceCapture {
    path: Option<PathBuf>,
}

impl TraceCapture {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }
}

impl CaptureSource for TraceCapture {
    fn acquire(&mut self) -> Result<Box<dyn RecordingHandle>, CaptureError> {
        let Some(path) = self.path.clone() else {
            return Err(CaptureError::Declined);
        };
        let file = File::create(&path)?;
        debug!(path = %path.display(), "trace capture opened");
        Ok(Box::new(TraceRecording {
            writer: BufWriter::new(file),
            path,
        }))
    }
}

struct TraceRecording {
    writer: BufWriter<File>,
    path: PathBuf,
}

impl RecordingHandle for TraceRecording {
    fn record(&mut self, snapshot: &Snapshot) -> Result<(), CaptureError> {
        serde_json::to_writer(&mut self.writer, snapshot)?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), CaptureError> {
        self.writer.flush()?;
        debug!(path = %self.path.display(), "trace capture closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SimState;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct CountingHandle {
        stops: Rc<RefCell<u32>>,
        fail_writes: bool,
    }

    impl RecordingHandle for CountingHandle {
        fn record(&mut self, _snapshot: &Snapshot) -> Result<(), CaptureError> {
            if self.fail_writes {
                Err(CaptureError::Device("disk full".into()))
            } else {
                Ok(())
            }
        }

        fn stop(&mut self) -> Result<(), CaptureError> {
            *self.stops.borrow_mut() += 1;
            Ok(())
        }
    }

    fn snapshot() -> Snapshot {
        Snapshot {
            revision: 1,
            state: SimState::default(),
            is_recording: true,
        }
    }

    fn temp_trace_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("hydrolysis-sim-{}-{name}.jsonl", std::process::id()))
    }

    #[test]
    fn release_is_idempotent_and_runs_on_drop() {
        let stops = Rc::new(RefCell::new(0));
        let mut session = RecordingSession::new(Box::new(CountingHandle {
            stops: stops.clone(),
            fail_writes: false,
        }));
        assert!(session.record(&snapshot()));
        session.release();
        session.release();
        drop(session);
        assert_eq!(*stops.borrow(), 1);
    }

    #[test]
    fn failed_write_releases_session() {
        let stops = Rc::new(RefCell::new(0));
        let mut session = RecordingSession::new(Box::new(CountingHandle {
            stops: stops.clone(),
            fail_writes: true,
        }));
        assert!(!session.record(&snapshot()));
        assert!(!session.is_active());
        assert_eq!(*stops.borrow(), 1);
    }

    #[test]
    fn trace_capture_without_path_is_declined() {
        let mut capture = TraceCapture::new(None);
        let err = capture.acquire().err().unwrap();
        assert!(err.is_declined());
    }

    #[test]
    fn trace_capture_writes_json_lines() {
        let path = temp_trace_path("lines");
        let mut capture = TraceCapture::new(Some(path.clone()));
        let mut session = RecordingSession::new(capture.acquire().unwrap());
        session.record(&snapshot());
        session.record(&snapshot());
        session.release();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: Snapshot = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first, snapshot());
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn unwritable_path_is_a_technical_failure() {
        let path = std::env::temp_dir()
            .join("hydrolysis-sim-missing-dir")
            .join("nested")
            .join("trace.jsonl");
        let mut capture = TraceCapture::new(Some(path));
        let err = capture.acquire().err().unwrap();
        assert!(!err.is_declined());
        assert!(matches!(err, CaptureError::Io(_)));
    }
}
