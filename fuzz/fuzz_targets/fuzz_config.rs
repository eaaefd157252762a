//! Fuzz target: rig configuration
//!
//! Feeds arbitrary bytes to `IrrigationConfig::from_json` and, for every
//! config it accepts, opens a `LineRegistry` on the simulated bench:
//! - No panics under arbitrary input
//! - Accepted configs satisfy `validate()`
//! - A registry that opens leaves every line inactive
//!
//! cargo fuzz run fuzz_config

#![no_main]

use irrigator::adapters::sim::SimBench;
use irrigator::config::IrrigationConfig;
use irrigator::drivers::registry::LineRegistry;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(raw) = core::str::from_utf8(data) else {
        return;
    };
    let Ok(config) = IrrigationConfig::from_json(raw) else {
        return;
    };
    assert!(config.validate().is_ok(), "from_json accepted an invalid rig");

    let bench = SimBench::new();
    let Ok(registry) = LineRegistry::open(&mut bench.gpio(), &config) else {
        return;
    };
    assert_eq!(registry.plant_count(), config.plants.len());
    for gpio in bench.requests() {
        assert_eq!(
            bench.logical(&gpio, config.active_low),
            Some(irrigator::Level::Inactive),
            "{gpio} armed active"
        );
    }
});
