//! Fixed-width numeric frames for the outbound stream.
//!
//! Layout (22 x f64): for the left eye then the right eye: gaze x, gaze y,
//! pupil, fixated (0/1), velocity, fixation timestamp, fixation elapsed,
//! filtered x, filtered y; followed by screen width, screen height, host
//! timestamp and the push clock.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam_channel as xch;
use eta_traits::{BoxError, StreamInfo, StreamOutlet};

use crate::config::ScreenSize;
use crate::error::EtaError;
use crate::record::{EnrichedGazeRecord, EyeRecord, to_pixel};

pub const CHANNEL_COUNT: usize = 22;
pub const STREAM_KIND: &str = "Gaze";
const EYE_CHANNELS: usize = 9;

pub type Frame = [f64; CHANNEL_COUNT];

pub fn stream_info(name: &str, rate_hz: u32, source_id: &str) -> StreamInfo {
    StreamInfo {
        name: name.to_string(),
        kind: STREAM_KIND.to_string(),
        channel_count: CHANNEL_COUNT,
        nominal_rate_hz: f64::from(rate_hz),
        source_id: source_id.to_string(),
    }
}

fn write_eye(out: &mut [f64], eye: &EyeRecord, missing: f64) {
    let [gx, gy] = eye.point().map_or([missing; 2], |(x, y)| [x, y]);
    let [fx, fy] = eye.filtered_gaze_point.unwrap_or([missing; 2]);
    out[0] = gx;
    out[1] = gy;
    out[2] = eye.pupil_diameter.unwrap_or(missing);
    out[3] = if eye.fixated { 1.0 } else { 0.0 };
    out[4] = eye.velocity;
    out[5] = eye.fixation_timestamp.unwrap_or(missing);
    out[6] = eye.fixation_elapsed;
    out[7] = fx;
    out[8] = fy;
}

/// Encode `record` into one frame. Missing values become 0 with `screen_nans`, NaN otherwise.
pub fn encode_frame(
    record: &EnrichedGazeRecord,
    screen: ScreenSize,
    screen_nans: bool,
    push_clock: f64,
) -> Frame {
    let missing = if screen_nans { 0.0 } else { f64::NAN };
    let mut f = [0.0; CHANNEL_COUNT];
    write_eye(&mut f[..EYE_CHANNELS], &record.left_eye, missing);
    write_eye(&mut f[EYE_CHANNELS..2 * EYE_CHANNELS], &record.right_eye, missing);
    let (w, h) = screen.as_f64();
    f[18] = w;
    f[19] = h;
    f[20] = record.timestamp;
    f[21] = push_clock;
    f
}

/// A decoded frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GazeFrame {
    pub left: EyeRecord,
    pub right: EyeRecord,
    pub screen_width: f64,
    pub screen_height: f64,
    pub timestamp: f64,
    pub push_clock: f64,
}

fn opt(v: f64) -> Option<f64> {
    v.is_finite().then_some(v)
}

fn opt2(x: f64, y: f64) -> Option<[f64; 2]> {
    (x.is_finite() && y.is_finite()).then_some([x, y])
}

fn read_eye(c: &[f64]) -> EyeRecord {
    EyeRecord {
        gaze_point: opt2(c[0], c[1]),
        pupil_diameter: opt(c[2]),
        fixated: c[3] != 0.0 && c[3].is_finite(),
        velocity: c[4],
        fixation_timestamp: opt(c[5]),
        fixation_elapsed: c[6],
        filtered_gaze_point: opt2(c[7], c[8]),
        pixel: None,
    }
}

impl GazeFrame {
    /// Decode a frame; extra trailing channels are ignored.
    pub fn decode(frame: &[f64]) -> Result<Self, EtaError> {
        if frame.len() < CHANNEL_COUNT {
            return Err(EtaError::Sample(format!(
                "frame has {} channels, expected {CHANNEL_COUNT}",
                frame.len()
            )));
        }
        Ok(Self {
            left: read_eye(&frame[..EYE_CHANNELS]),
            right: read_eye(&frame[EYE_CHANNELS..2 * EYE_CHANNELS]),
            screen_width: frame[18],
            screen_height: frame[19],
            timestamp: frame[20],
            push_clock: frame[21],
        })
    }

    /// Screen size carried by the frame, if it is a usable resolution.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn screen(&self) -> Option<ScreenSize> {
        let ok = |v: f64| v.is_finite() && v >= 1.0 && v <= f64::from(u32::MAX);
        (ok(self.screen_width) && ok(self.screen_height))
            .then(|| ScreenSize::new(self.screen_width as u32, self.screen_height as u32))
    }

    /// Rebuild a record with pixels derived from the frame's own screen size.
    pub fn into_record(self, screen_nans: bool) -> Result<EnrichedGazeRecord, EtaError> {
        let screen = self
            .screen()
            .ok_or_else(|| EtaError::Sample("frame carries no screen size".into()))?;
        if !self.timestamp.is_finite() {
            return Err(EtaError::Sample("frame timestamp is not finite".into()));
        }
        let mut left = self.left;
        let mut right = self.right;
        left.pixel = to_pixel(left.point(), screen, screen_nans);
        right.pixel = to_pixel(right.point(), screen, screen_nans);
        Ok(EnrichedGazeRecord {
            timestamp: self.timestamp,
            device_time_stamp: self.timestamp,
            left_eye: left,
            right_eye: right,
        })
    }
}

/// In-process outlet backed by a bounded crossbeam channel.
///
/// `push` never blocks: when the consumer lags the frame is dropped and counted.
pub struct ChannelOutlet {
    info: StreamInfo,
    tx: xch::Sender<Frame>,
    dropped: Arc<AtomicU64>,
}

/// Consumer side of a `ChannelOutlet`.
pub struct FrameReceiver {
    rx: xch::Receiver<Frame>,
    dropped: Arc<AtomicU64>,
}

impl ChannelOutlet {
    pub fn bounded(info: StreamInfo, capacity: usize) -> (Self, FrameReceiver) {
        let (tx, rx) = xch::bounded(capacity.max(1));
        let dropped = Arc::new(AtomicU64::new(0));
        (
            Self {
                info,
                tx,
                dropped: dropped.clone(),
            },
            FrameReceiver { rx, dropped },
        )
    }
}

impl StreamOutlet for ChannelOutlet {
    fn info(&self) -> &StreamInfo {
        &self.info
    }

    fn push(&mut self, frame: &[f64]) -> Result<(), BoxError> {
        let f: Frame = frame.try_into().map_err(|_| {
            EtaError::Sample(format!(
                "outlet expects {CHANNEL_COUNT} channels, got {}",
                frame.len()
            ))
        })?;
        match self.tx.try_send(f) {
            Ok(()) => Ok(()),
            Err(xch::TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(xch::TrySendError::Disconnected(_)) => {
                Err(Box::new(EtaError::State("stream consumer disconnected".into())))
            }
        }
    }
}

impl FrameReceiver {
    /// Everything currently queued; never waits.
    pub fn drain(&self) -> Vec<Frame> {
        self.rx.try_iter().collect()
    }

    pub fn latest(&self) -> Option<Frame> {
        self.rx.try_iter().last()
    }

    /// Frames discarded because the queue was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}
