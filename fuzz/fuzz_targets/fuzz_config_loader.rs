#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Parsing, validation and calibration merging must reject bad input
    // with an error, never a panic.
    let Ok(cfg) = lockguard_config::load_toml(data) else {
        return;
    };
    let _ = cfg.validate();
    if let Ok(merged) = lockguard_config::apply_calibration(data, 140.0, 400.0) {
        assert!(
            lockguard_config::load_toml(&merged).is_ok(),
            "a loadable config stays loadable after calibration: {merged}"
        );
    }
});
