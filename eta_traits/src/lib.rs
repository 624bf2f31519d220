//! Seams between the gaze pipeline and the outside world.
//!
//! A `GazeSource` pushes `GazeSample`s into a single handler; a `StreamOutlet`
//! receives fixed-width numeric frames. Neither trait knows about filtering or
//! classification.
pub mod clock;
pub mod sample;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use sample::{DeviceInfo, EyeSample, GazeSample};

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Callback invoked by a producer for every gaze sample.
pub type GazeHandler = Box<dyn FnMut(GazeSample) + Send>;

/// A push-based producer of gaze samples (hardware tracker, mock, replay).
///
/// At most one handler is registered at a time; subscribing again replaces it.
pub trait GazeSource: Send {
    fn info(&self) -> DeviceInfo;
    fn subscribe(&mut self, handler: GazeHandler) -> Result<(), BoxError>;
    /// Stop delivering samples. Idempotent.
    fn unsubscribe(&mut self);

    /// False once the device has gone away and no more samples will arrive.
    fn is_connected(&self) -> bool {
        true
    }
}

/// Fixed description of an outbound stream; never changes during a session.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamInfo {
    pub name: String,
    pub kind: String,
    pub channel_count: usize,
    pub nominal_rate_hz: f64,
    pub source_id: String,
}

/// Outbound numeric channel (e.g. a lab streaming transport).
pub trait StreamOutlet: Send {
    fn info(&self) -> &StreamInfo;
    fn push(&mut self, frame: &[f64]) -> Result<(), BoxError>;
}
