#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: (&str, &str)| {
    // Arbitrary gaze/target documents never panic the analyzer; bad input
    // only shows up as issues on the report.
    let (gaze, targets) = data;
    let parse = |s: &str| {
        serde_json::from_str::<serde_json::Value>(&eta_core::persist::replace_non_finite_tokens(s))
            .unwrap_or(serde_json::Value::Null)
    };
    let report = eta_core::ValidationAnalyzer::new().analyze_json(&parse(gaze), &parse(targets));
    assert!(report.rows.len() <= report.targets);
});
