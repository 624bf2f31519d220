//! Human-readable error descriptions and structured JSON error formatting.

use eta_core::error::{BuildError, EtaError};
use eta_mock::DeviceError;

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingSource => {
                "What happened: No gaze source was provided to the tracker.\nLikely causes: The tracker was not created or was not wired into the builder.\nHow to fix: Pass --use-mock (or set tracker.use_mock = true) until a device backend is available.".to_string()
            }
            BuildError::ZeroScreen => {
                "What happened: Screen resolution has zero area.\nLikely causes: [screen] width or height set to 0.\nHow to fix: Set screen.width and screen.height to the stimulus display resolution.".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid session configuration ({msg}).\nLikely causes: Out-of-range values in the TOML or on the command line.\nHow to fix: Edit the config file or flags, then rerun `eta self-check`."
            ),
        };
    }

    if let Some(ee) = err.downcast_ref::<EtaError>() {
        return match ee {
            EtaError::Config(msg) if msg.contains("no tracking device") => {
                "What happened: No tracking device is available.\nLikely causes: No hardware backend is built in and the mock tracker was not requested.\nHow to fix: Rerun with --use-mock or set tracker.use_mock = true in the config.".to_string()
            }
            EtaError::Config(msg) => format!(
                "What happened: Configuration error ({msg}).\nLikely causes: Missing file, TOML syntax error or out-of-range value.\nHow to fix: Fix the reported field and rerun `eta self-check`."
            ),
            EtaError::Device(msg) => format!(
                "What happened: The gaze source failed ({msg}).\nLikely causes: Device disconnected or could not start streaming.\nHow to fix: Reconnect the tracker or use --use-mock, then rerun."
            ),
            EtaError::Persistence(msg) => format!(
                "What happened: A session file could not be read or written ({msg}).\nLikely causes: Missing directory, no permission or full disk.\nHow to fix: Check the path and [output].data_dir, then rerun."
            ),
            other => format!(
                "What happened: {other}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    if let Some(de) = err.downcast_ref::<DeviceError>() {
        return format!(
            "What happened: The mock tracker could not start ({de}).\nLikely causes: Invalid [mock] or tracker.data_rate values.\nHow to fix: Check [mock] noise/nan_probability and tracker.data_rate in the config."
        );
    }

    // Generic fallback
    let msg = err.to_string();
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes: configuration 2, device 3, persistence 4, anything else 1.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if err.downcast_ref::<BuildError>().is_some() {
        return 2;
    }
    if err.downcast_ref::<DeviceError>().is_some() {
        return 3;
    }
    match err.downcast_ref::<EtaError>() {
        Some(EtaError::Config(_)) => 2,
        Some(EtaError::Device(_)) => 3,
        Some(EtaError::Persistence(_)) => 4,
        _ => 1,
    }
}

fn reason_name(err: &eyre::Report) -> &'static str {
    if err.downcast_ref::<BuildError>().is_some() {
        return "Config";
    }
    if err.downcast_ref::<DeviceError>().is_some() {
        return "Device";
    }
    match err.downcast_ref::<EtaError>() {
        Some(EtaError::Config(_)) => "Config",
        Some(EtaError::Device(_)) => "Device",
        Some(EtaError::Persistence(_)) => "Persistence",
        Some(EtaError::Sample(_)) => "Sample",
        Some(EtaError::AnalysisInput(_)) => "AnalysisInput",
        Some(EtaError::State(_)) => "State",
        None => "Error",
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;

    json!({
        "reason": reason_name(err),
        "exit_code": exit_code_for_error(err),
        "message": humanize(err),
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_error_kind() {
        let cfg = eyre::Report::new(EtaError::Config("x".into()));
        let dev = eyre::Report::new(EtaError::Device("x".into()));
        let io = eyre::Report::new(EtaError::Persistence("x".into()));
        let build = eyre::Report::new(BuildError::ZeroScreen);
        let other = eyre::eyre!("boom");
        assert_eq!(exit_code_for_error(&cfg), 2);
        assert_eq!(exit_code_for_error(&dev), 3);
        assert_eq!(exit_code_for_error(&io), 4);
        assert_eq!(exit_code_for_error(&build), 2);
        assert_eq!(exit_code_for_error(&other), 1);
    }

    #[test]
    fn json_error_names_reason() {
        let err = eyre::Report::new(EtaError::Config("no tracking device available".into()));
        let v: serde_json::Value = serde_json::from_str(&format_error_json(&err)).unwrap();
        assert_eq!(v["reason"], "Config");
        assert_eq!(v["exit_code"], 2);
        assert!(v["message"].as_str().unwrap().contains("--use-mock"));
    }
}
