//! Fuzz target: snapshot restore
//!
//! Feeds arbitrary bytes to both engines' `restore` and asserts that a
//! refused blob never leaves an engine half-restored.
//!
//! cargo fuzz run fuzz_snapshot_decode

#![no_main]

use libfuzzer_sys::fuzz_target;
use plantcore::config::{EnsembleConfig, ForecastConfig};
use plantcore::decision::ActuatorDecisionEngine;
use plantcore::forecast::TrendForecastEngine;

fuzz_target!(|data: &[u8]| {
    let classifiers = ActuatorDecisionEngine::new(EnsembleConfig::default());
    if classifiers.restore(data).is_err() {
        assert!(!classifiers.is_trained(), "failed restore must not install models");
    }

    let forecaster = TrendForecastEngine::new(ForecastConfig::default());
    if forecaster.restore(data).is_err() {
        assert!(!forecaster.is_trained());
        assert_eq!(forecaster.history_depth(), 0);
    }
});
