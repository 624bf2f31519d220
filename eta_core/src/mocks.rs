//! Test and helper doubles for eta_core.

use std::sync::{Arc, Mutex};

use eta_traits::{BoxError, DeviceInfo, GazeHandler, GazeSample, GazeSource, StreamInfo, StreamOutlet};

use crate::error::EtaError;

/// Delivers a fixed list of samples synchronously inside `subscribe`, then
/// reports itself disconnected.
pub struct ReplaySource {
    samples: Vec<GazeSample>,
    replayed: bool,
}

impl ReplaySource {
    pub fn new(samples: Vec<GazeSample>) -> Self {
        Self {
            samples,
            replayed: false,
        }
    }
}

impl GazeSource for ReplaySource {
    fn info(&self) -> DeviceInfo {
        DeviceInfo {
            address: "replay://memory".into(),
            model: "replay".into(),
            name: "Replay Source".into(),
            serial: "REPLAY0000".into(),
        }
    }

    fn subscribe(&mut self, mut handler: GazeHandler) -> Result<(), BoxError> {
        for s in self.samples.drain(..) {
            handler(s);
        }
        self.replayed = true;
        Ok(())
    }

    fn unsubscribe(&mut self) {}

    fn is_connected(&self) -> bool {
        !self.replayed
    }
}

/// A source whose subscribe always fails.
pub struct UnavailableSource;

impl GazeSource for UnavailableSource {
    fn info(&self) -> DeviceInfo {
        DeviceInfo::default()
    }

    fn subscribe(&mut self, _handler: GazeHandler) -> Result<(), BoxError> {
        Err(Box::new(EtaError::Device("device unavailable".into())))
    }

    fn unsubscribe(&mut self) {}
}

/// Outlet that keeps every pushed frame for inspection.
#[derive(Clone)]
pub struct RecordingOutlet {
    info: StreamInfo,
    frames: Arc<Mutex<Vec<Vec<f64>>>>,
}

impl RecordingOutlet {
    pub fn new(info: StreamInfo) -> Self {
        Self {
            info,
            frames: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn frames(&self) -> Vec<Vec<f64>> {
        self.frames.lock().map(|f| f.clone()).unwrap_or_default()
    }
}

impl StreamOutlet for RecordingOutlet {
    fn info(&self) -> &StreamInfo {
        &self.info
    }

    fn push(&mut self, frame: &[f64]) -> Result<(), BoxError> {
        self.frames
            .lock()
            .map_err(|_| EtaError::State("recording outlet poisoned".into()))?
            .push(frame.to_vec());
        Ok(())
    }
}
