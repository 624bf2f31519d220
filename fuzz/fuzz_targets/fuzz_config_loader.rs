#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Parse errors and validation errors are both fine; panics are not.
    if let Ok(cfg) = eta_config::load_toml(data)
        && cfg.validate().is_ok()
    {
        // A validated config must map onto runtime types without panicking.
        let _ = eta_core::TrackerCfg::from(&cfg);
        let _ = eta_core::AggregatorCfg::from(&cfg);
    }
});
