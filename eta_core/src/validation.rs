//! Offline accuracy/precision analysis of a recorded session.
//!
//! Inputs are a gaze log (`{"screen_size", "data": [records]}`) and a target
//! schedule (`{"screen_size", "stay_duration", "data": [{timestamp,
//! grid_position, screen_position}]}`). Each target's dwell window
//! `[timestamp, timestamp + 2 s)` selects the gaze samples attributed to it.
//! All statistics are computed in the gaze log's pixel space; phases are
//! radians from the +x axis; spreads are population standard deviations.

use std::path::Path;

use serde::Serialize;
use serde_json::Value;

use crate::error::EtaError;
use crate::persist::read_json_lenient;

/// Length of the window after a target's onset whose samples belong to it.
pub const DWELL_WINDOW_S: f64 = 2.0;

/// One displayed stimulus.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ValidationTarget {
    /// Position in the schedule file; the group id of its statistics row.
    pub group: usize,
    pub timestamp: f64,
    pub grid_position: [i64; 2],
    /// Pixel position in the stimulus window.
    pub screen_position: [f64; 2],
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TargetSchedule {
    /// Stimulus window resolution; `None` when the file did not carry one.
    pub screen_size: Option<(f64, f64)>,
    pub stay_duration_ms: Option<f64>,
    pub targets: Vec<ValidationTarget>,
}

/// A gaze sample with both eyes present, in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GazePoint {
    pub timestamp: f64,
    pub left: (f64, f64),
    pub right: (f64, f64),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct GazeRecording {
    pub screen_size: (f64, f64),
    /// Usable samples, sorted by timestamp.
    pub samples: Vec<GazePoint>,
    /// Records dropped because a timestamp or an eye coordinate was missing.
    pub dropped: usize,
}

/// Statistics of one populated group.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AccuracyStatistic {
    pub group: usize,
    pub grid_position: [i64; 2],
    /// Target rescaled into the gaze log's pixel space.
    pub target_position: [f64; 2],
    /// Target position normalized by the gaze log's screen size.
    pub target_relative: [f64; 2],
    /// Target + (median magnitude, median phase).
    pub median_position: [f64; 2],
    pub mean_position: [f64; 2],
    pub median_magnitude: f64,
    pub median_phase: f64,
    /// Std-dev of per-sample distance to the target.
    pub spread_from_target: f64,
    /// Std-dev of per-sample distance to the median position.
    pub spread_from_median: f64,
    pub sample_count: usize,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ValidationReport {
    pub rows: Vec<AccuracyStatistic>,
    /// Input problems that reduced or emptied the result.
    pub issues: Vec<EtaError>,
    pub gaze_samples: usize,
    pub dropped_samples: usize,
    pub targets: usize,
    /// Per-target display time from the schedule, when recorded.
    pub stay_duration_ms: Option<f64>,
}

// ── Parsing ──────────────────────────────────────────────────────────────────

fn num(v: &Value) -> Option<f64> {
    v.as_f64().filter(|x| x.is_finite())
}

fn pair(v: &Value) -> Option<(f64, f64)> {
    match v.as_array()?.as_slice() {
        [a, b, ..] => Some((num(a)?, num(b)?)),
        _ => None,
    }
}

fn screen_of(doc: &Value) -> Option<(f64, f64)> {
    pair(&doc["screen_size"]).filter(|&(w, h)| w > 0.0 && h > 0.0)
}

fn records(doc: &Value) -> &[Value] {
    doc.get("data")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

fn input_issue(msg: impl Into<String>) -> EtaError {
    EtaError::AnalysisInput(msg.into())
}

impl GazeRecording {
    /// Parse a gaze log document. Records missing a timestamp or either eye's
    /// point are dropped (listwise deletion).
    pub fn from_json(doc: &Value) -> Result<Self, EtaError> {
        let (w, h) = screen_of(doc)
            .ok_or_else(|| input_issue("gaze log has no usable screen_size"))?;
        let data = records(doc);
        let mut samples = Vec::with_capacity(data.len());
        for r in data {
            let eye = |key: &str| pair(&r[key]["gaze_point"]).map(|(x, y)| (x * w, y * h));
            if let (Some(timestamp), Some(left), Some(right)) =
                (num(&r["timestamp"]), eye("left_eye"), eye("right_eye"))
            {
                samples.push(GazePoint {
                    timestamp,
                    left,
                    right,
                });
            }
        }
        samples.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
        Ok(Self {
            screen_size: (w, h),
            dropped: data.len() - samples.len(),
            samples,
        })
    }
}

impl TargetSchedule {
    /// Parse a target schedule document. Malformed targets are skipped but
    /// keep their position as group id.
    pub fn from_json(doc: &Value) -> Self {
        let targets = records(doc)
            .iter()
            .enumerate()
            .filter_map(|(group, r)| {
                let timestamp = num(&r["timestamp"])?;
                let (sx, sy) = pair(&r["screen_position"])?;
                let grid = r["grid_position"].as_array();
                let cell = |i: usize| grid.and_then(|g| g.get(i)).and_then(Value::as_i64).unwrap_or(-1);
                Some(ValidationTarget {
                    group,
                    timestamp,
                    grid_position: [cell(0), cell(1)],
                    screen_position: [sx, sy],
                })
            })
            .collect();
        Self {
            screen_size: screen_of(doc),
            stay_duration_ms: num(&doc["stay_duration"]),
            targets,
        }
    }
}

// ── Statistics helpers ───────────────────────────────────────────────────────

/// Median; the mean of the two middle values for even lengths. NaN when empty.
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut v = values.to_vec();
    v.sort_by(f64::total_cmp);
    let mid = v.len() / 2;
    if v.len() % 2 == 0 {
        (v[mid - 1] + v[mid]) / 2.0
    } else {
        v[mid]
    }
}

#[allow(clippy::cast_precision_loss)]
fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation (divides by n).
#[allow(clippy::cast_precision_loss)]
pub fn population_std(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let m = mean(values);
    (values.iter().map(|x| (x - m).powi(2)).sum::<f64>() / values.len() as f64).sqrt()
}

/// Offset of `p` from `reference` as (magnitude, phase).
#[inline]
pub fn polar(p: (f64, f64), reference: (f64, f64)) -> (f64, f64) {
    let dx = p.0 - reference.0;
    let dy = p.1 - reference.1;
    (dx.hypot(dy), dy.atan2(dx))
}

/// Point at (magnitude, phase) from `reference`.
#[inline]
pub fn cartesian(magnitude: f64, phase: f64, reference: (f64, f64)) -> (f64, f64) {
    (
        reference.0 + magnitude * phase.cos(),
        reference.1 + magnitude * phase.sin(),
    )
}

/// Both eyes' polar offsets from `reference`, averaged.
fn binocular_polar(s: &GazePoint, reference: (f64, f64)) -> (f64, f64) {
    let (ml, pl) = polar(s.left, reference);
    let (mr, pr) = polar(s.right, reference);
    ((ml + mr) / 2.0, (pl + pr) / 2.0)
}

// ── Analyzer ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValidationAnalyzer {
    dwell_window_s: f64,
}

impl Default for ValidationAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl ValidationAnalyzer {
    pub fn new() -> Self {
        Self {
            dwell_window_s: DWELL_WINDOW_S,
        }
    }

    pub fn dwell_window_s(&self) -> f64 {
        self.dwell_window_s
    }

    /// Analyze two files. Unreadable or unusable inputs give an empty table
    /// plus an entry in `issues`; this never fails.
    pub fn analyze_files(&self, gaze: &Path, targets: &Path) -> ValidationReport {
        let read = |p: &Path| {
            read_json_lenient(p).map_err(|e| input_issue(format!("{e}")))
        };
        match (read(gaze), read(targets)) {
            (Ok(g), Ok(t)) => self.analyze_json(&g, &t),
            (g, t) => ValidationReport {
                issues: [g.err(), t.err()].into_iter().flatten().collect(),
                ..ValidationReport::default()
            },
        }
    }

    /// Analyze already-parsed documents.
    pub fn analyze_json(&self, gaze: &Value, targets: &Value) -> ValidationReport {
        let schedule = TargetSchedule::from_json(targets);
        let recording = match GazeRecording::from_json(gaze) {
            Ok(r) => r,
            Err(e) => {
                return ValidationReport {
                    issues: vec![e],
                    targets: schedule.targets.len(),
                    stay_duration_ms: schedule.stay_duration_ms,
                    ..ValidationReport::default()
                };
            }
        };
        let mut issues = Vec::new();
        if recording.samples.is_empty() {
            issues.push(input_issue("gaze log has no usable samples"));
        }
        if schedule.targets.is_empty() {
            issues.push(input_issue("target schedule has no usable targets"));
        }
        if recording.dropped > 0 {
            tracing::debug!(dropped = recording.dropped, "gaze records with missing eye data dropped");
        }
        let rows = self.analyze(&recording, &schedule);
        tracing::info!(
            rows = rows.len(),
            targets = schedule.targets.len(),
            samples = recording.samples.len(),
            "validation analysis complete"
        );
        ValidationReport {
            rows,
            issues,
            gaze_samples: recording.samples.len(),
            dropped_samples: recording.dropped,
            targets: schedule.targets.len(),
            stay_duration_ms: schedule.stay_duration_ms,
        }
    }

    /// One row per target whose dwell window holds samples, in group order.
    pub fn analyze(&self, recording: &GazeRecording, schedule: &TargetSchedule) -> Vec<AccuracyStatistic> {
        if recording.samples.is_empty() || schedule.targets.is_empty() {
            return Vec::new();
        }
        let (gw, gh) = recording.screen_size;
        let (sx, sy) = schedule
            .screen_size
            .map_or((1.0, 1.0), |(tw, th)| (gw / tw, gh / th));

        let mut targets = schedule.targets.clone();
        targets.sort_by_key(|t| t.group);

        let samples = &recording.samples;
        targets
            .iter()
            .filter_map(|target| {
                let start = target.timestamp;
                let end = start + self.dwell_window_s;
                let lo = samples.partition_point(|s| s.timestamp < start);
                let hi = samples.partition_point(|s| s.timestamp < end);
                let group = &samples[lo..hi];
                if group.is_empty() {
                    return None;
                }
                let position = (target.screen_position[0] * sx, target.screen_position[1] * sy);
                Some(reduce_group(target, position, (gw, gh), group))
            })
            .collect()
    }
}

/// Two-pass reduction: offsets from the target give accuracy (median
/// position, spread from target); offsets from the median position give
/// precision free of the target bias.
fn reduce_group(
    target: &ValidationTarget,
    position: (f64, f64),
    screen: (f64, f64),
    group: &[GazePoint],
) -> AccuracyStatistic {
    let (magnitudes, phases): (Vec<f64>, Vec<f64>) =
        group.iter().map(|s| binocular_polar(s, position)).unzip();
    let median_magnitude = median(&magnitudes);
    let median_phase = median(&phases);
    let median_position = cartesian(median_magnitude, median_phase, position);

    let around_median: Vec<f64> = group
        .iter()
        .map(|s| binocular_polar(s, median_position).0)
        .collect();

    let xs: Vec<f64> = group.iter().map(|s| (s.left.0 + s.right.0) / 2.0).collect();
    let ys: Vec<f64> = group.iter().map(|s| (s.left.1 + s.right.1) / 2.0).collect();

    AccuracyStatistic {
        group: target.group,
        grid_position: target.grid_position,
        target_position: [position.0, position.1],
        target_relative: [position.0 / screen.0, position.1 / screen.1],
        median_position: [median_position.0, median_position.1],
        mean_position: [mean(&xs), mean(&ys)],
        median_magnitude,
        median_phase,
        spread_from_target: population_std(&magnitudes),
        spread_from_median: population_std(&around_median),
        sample_count: group.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::f64::consts::FRAC_PI_2;

    #[rstest]
    #[case(&[3.0, 1.0, 2.0], 2.0)]
    #[case(&[4.0, 1.0, 3.0, 2.0], 2.5)]
    #[case(&[7.0], 7.0)]
    fn median_cases(#[case] v: &[f64], #[case] expected: f64) {
        assert_eq!(median(v), expected);
    }

    #[test]
    fn population_std_divides_by_n() {
        assert!((population_std(&[1.0, 3.0]) - 1.0).abs() < 1e-12);
        assert!(median(&[]).is_nan());
    }

    #[test]
    fn polar_round_trips_through_cartesian() {
        let (m, p) = polar((10.0, 20.0), (10.0, 10.0));
        assert!((m - 10.0).abs() < 1e-12);
        assert!((p - FRAC_PI_2).abs() < 1e-12);
        let (x, y) = cartesian(m, p, (10.0, 10.0));
        assert!((x - 10.0).abs() < 1e-9 && (y - 20.0).abs() < 1e-9);
    }

    #[test]
    fn half_open_window_excludes_end() {
        let rec = GazeRecording {
            screen_size: (100.0, 100.0),
            samples: vec![
                GazePoint { timestamp: 0.0, left: (1.0, 1.0), right: (1.0, 1.0) },
                GazePoint { timestamp: 2.0, left: (9.0, 9.0), right: (9.0, 9.0) },
            ],
            dropped: 0,
        };
        let sched = TargetSchedule {
            screen_size: Some((100.0, 100.0)),
            stay_duration_ms: None,
            targets: vec![ValidationTarget {
                group: 0,
                timestamp: 0.0,
                grid_position: [0, 0],
                screen_position: [1.0, 1.0],
            }],
        };
        let rows = ValidationAnalyzer::new().analyze(&rec, &sched);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].sample_count, 1);
    }

    #[test]
    fn target_is_rescaled_into_gaze_space() {
        let gaze = serde_json::json!({
            "screen_size": [200, 100],
            "data": [{"timestamp": 0.5,
                      "left_eye": {"gaze_point": [0.5, 0.5]},
                      "right_eye": {"gaze_point": [0.5, 0.5]}}]
        });
        let targets = serde_json::json!({
            "screen_size": [100, 50],
            "data": [{"timestamp": 0.0, "grid_position": [1, 1], "screen_position": [50, 25]}]
        });
        let report = ValidationAnalyzer::new().analyze_json(&gaze, &targets);
        assert!(report.issues.is_empty());
        let r = report.rows[0];
        assert_eq!(r.target_position, [100.0, 50.0]);
        assert_eq!(r.target_relative, [0.5, 0.5]);
        assert_eq!(r.spread_from_target, 0.0);
    }
}
