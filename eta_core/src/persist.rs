//! Session artifacts on disk: atomic writes and lenient JSON reads.

use std::{fs, io::Write, path::Path};

use serde::{Deserialize, Serialize};

use crate::config::ScreenSize;
use crate::error::{EtaError, Report, Result};
use crate::record::EnrichedGazeRecord;

/// Write to `<path>.new`, fsync, then rename over `path`. On failure the
/// temp file is removed and `path` is left as it was.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let tmp = path.with_extension("new");
    let result = fs::File::create(&tmp).and_then(|mut f| {
        f.write_all(bytes)?;
        f.sync_all()?;
        drop(f);
        fs::rename(&tmp, path)
    });
    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}

fn persistence(what: &str, path: &Path, e: impl std::fmt::Display) -> Report {
    Report::new(EtaError::Persistence(format!("{what} {}: {e}", path.display())))
}

#[derive(Serialize)]
struct GazeLogOut<'a> {
    screen_size: [u32; 2],
    data: &'a [EnrichedGazeRecord],
}

/// A gaze log as read back from disk.
#[derive(Debug, Clone, Deserialize)]
pub struct GazeLog {
    pub screen_size: [f64; 2],
    pub data: Vec<EnrichedGazeRecord>,
}

/// Persist `records` as `{"screen_size": [w, h], "data": [...]}`.
pub fn save_gaze_log(path: &Path, screen: ScreenSize, records: &[EnrichedGazeRecord]) -> Result<()> {
    if let Some(dir) = path.parent()
        && !dir.as_os_str().is_empty()
    {
        fs::create_dir_all(dir).map_err(|e| persistence("create dir for", path, e))?;
    }
    let doc = GazeLogOut {
        screen_size: [screen.width, screen.height],
        data: records,
    };
    let bytes = serde_json::to_vec(&doc).map_err(|e| persistence("encode", path, e))?;
    write_atomic(path, &bytes).map_err(|e| persistence("write", path, e))
}

/// Strict read of a gaze log written by `save_gaze_log`.
pub fn load_gaze_log(path: &Path) -> Result<GazeLog> {
    let value = read_json_lenient(path)?;
    serde_json::from_value(value).map_err(|e| persistence("decode", path, e))
}

/// Read a JSON document, accepting the bare `NaN`/`Infinity` tokens some
/// recorders emit (they become `null`).
pub fn read_json_lenient(path: &Path) -> Result<serde_json::Value> {
    let text = fs::read_to_string(path).map_err(|e| persistence("read", path, e))?;
    serde_json::from_str(&replace_non_finite_tokens(&text))
        .map_err(|e| persistence("parse", path, e))
}

/// Replace `NaN`, `Infinity` and `-Infinity` outside string literals with `null`.
pub fn replace_non_finite_tokens(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_string = false;
    let mut escaped = false;
    let mut rest = text;
    while let Some(c) = rest.chars().next() {
        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            rest = &rest[c.len_utf8()..];
            continue;
        }
        if c == '"' {
            in_string = true;
        } else if let Some(tok) = ["-Infinity", "Infinity", "NaN"]
            .into_iter()
            .find(|t| rest.starts_with(t))
        {
            out.push_str("null");
            rest = &rest[tok.len()..];
            continue;
        }
        out.push(c);
        rest = &rest[c.len_utf8()..];
    }
    out
}

/// `gaze_data_<YYYYmmdd_HHMMSS>.json` for the local time now.
pub fn session_file_name() -> String {
    format!("gaze_data_{}.json", chrono::Local::now().format("%Y%m%d_%H%M%S"))
}
