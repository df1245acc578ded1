//! Scripted capture source for driving sessions in tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::capture::{CaptureSource, FrameStream};
use crate::domain::Frame;
use crate::error::CaptureError;

const IDLE_POLL: Duration = Duration::from_millis(10);

/// Yields a fixed script of frames and errors, then idles or ends.
pub struct ScriptedSource {
    label: String,
    script: VecDeque<Result<Frame, CaptureError>>,
    start_error: Option<CaptureError>,
    pacing: Duration,
    hold_open: bool,
    stubborn_for: Option<Duration>,
    running: Arc<AtomicBool>,
}

impl ScriptedSource {
    pub fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            script: VecDeque::new(),
            start_error: None,
            pacing: Duration::ZERO,
            hold_open: false,
            stubborn_for: None,
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn with_frames(mut self, frames: impl IntoIterator<Item = Frame>) -> Self {
        self.script.extend(frames.into_iter().map(Ok));
        self
    }

    pub fn with_error(mut self, error: CaptureError) -> Self {
        self.script.push_back(Err(error));
        self
    }

    /// Fail `frames()` itself, like a channel that cannot be opened.
    pub fn failing_start(mut self, error: CaptureError) -> Self {
        self.start_error = Some(error);
        self
    }

    /// Delay before each scripted item.
    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    /// Keep the stream open (idle) after the script until stopped.
    pub fn hold_open(mut self) -> Self {
        self.hold_open = true;
        self
    }

    /// After the script, block for `duration` without looking at the running flag.
    pub fn ignoring_stop_for(mut self, duration: Duration) -> Self {
        self.stubborn_for = Some(duration);
        self
    }
}

impl CaptureSource for ScriptedSource {
    fn frames(&mut self) -> Result<FrameStream<'_>, CaptureError> {
        if let Some(error) = self.start_error.take() {
            return Err(error);
        }
        Ok(Box::new(ScriptedIterator { source: self }))
    }

    fn interface_name(&self) -> &str {
        &self.label
    }

    fn set_running(&mut self, running: Arc<AtomicBool>) {
        self.running = running;
    }
}

struct ScriptedIterator<'a> {
    source: &'a mut ScriptedSource,
}

impl Iterator for ScriptedIterator<'_> {
    type Item = Result<Frame, CaptureError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.source.stubborn_for.is_none() && !self.source.running.load(Ordering::SeqCst)
            {
                return None;
            }
            if let Some(item) = self.source.script.pop_front() {
                if !self.source.pacing.is_zero() {
                    std::thread::sleep(self.source.pacing);
                }
                return Some(item);
            }
            if let Some(duration) = self.source.stubborn_for.take() {
                std::thread::sleep(duration);
                return None;
            }
            if !self.source.hold_open {
                return None;
            }
            std::thread::sleep(IDLE_POLL);
        }
    }
}
