//! Synthetic corpora for the host simulator and tests.
//!
//! Produces a labelled decision table whose ground truth is the agronomic
//! rule set (fan for heat or humidity, pump for dry soil, grow light for
//! darkness) with a small share of flipped labels, and a day-cycle sensor
//! history for the trend forecaster.  All generators are seeded.

use core::f32::consts::PI;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::decision::{Scenario, TrainingSample};
use crate::reading::{FeatureVector, PerActuator, ReadingRecord};

/// Share of labels flipped to simulate operator noise.
const LABEL_NOISE: f64 = 0.05;

/// Standard normal sample (Box–Muller).
pub fn gaussian(rng: &mut impl Rng) -> f32 {
    // 1 - U(0,1] keeps ln() finite.
    let u1 = 1.0 - rng.r#gen::<f32>();
    let u2 = rng.r#gen::<f32>();
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}

/// The labelling rule the decision table is generated from.
pub fn rule_labels(temperature: f32, humidity: f32, soil: f32, light: f32) -> PerActuator<bool> {
    PerActuator {
        pump: soil < 35.0,
        fan: temperature > 30.0 || humidity > 80.0,
        grow_light: light < 25.0,
    }
}

/// `n` labelled rows drawn from plausible indoor conditions.
pub fn training_table(n: usize, seed: u64) -> Vec<TrainingSample> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|_| {
            let temperature = if rng.gen_bool(0.10) {
                rng.gen_range(35.0..40.0)
            } else {
                (24.0 + 6.0 * gaussian(&mut rng)).clamp(10.0, 40.0)
            };
            let centre = if rng.gen_bool(0.5) { 45.0 } else { 70.0 };
            let humidity = (centre + 10.0 * gaussian(&mut rng)).clamp(20.0, 90.0);
            let soil = if rng.gen_bool(0.15) {
                rng.gen_range(0.0..30.0)
            } else {
                rng.gen_range(20.0..90.0)
            };
            let light = if rng.gen_bool(0.5) {
                rng.gen_range(40.0..100.0)
            } else {
                rng.gen_range(0.0..30.0)
            };

            let mut labels = rule_labels(temperature, humidity, soil, light);
            for flag in [&mut labels.pump, &mut labels.fan, &mut labels.grow_light] {
                if rng.gen_bool(LABEL_NOISE) {
                    *flag = !*flag;
                }
            }
            TrainingSample {
                features: [temperature, humidity, soil, light],
                labels,
            }
        })
        .collect()
}

/// Named reference situations with their expected actuator states.
pub fn reference_scenarios() -> Vec<Scenario> {
    let s = |name: &str, v: [f32; 4], pump: bool, fan: bool, grow_light: bool| Scenario {
        name: name.to_owned(),
        input: FeatureVector::complete(v, 0),
        expected: PerActuator {
            pump,
            fan,
            grow_light,
        },
    };
    vec![
        s("normal conditions", [24.0, 60.0, 55.0, 70.0], false, false, false),
        s("heat stress", [36.0, 40.0, 45.0, 85.0], false, true, false),
        s("drought", [28.0, 35.0, 20.0, 75.0], true, false, false),
        s("low light night", [22.0, 65.0, 50.0, 15.0], false, false, true),
        s("multiple stress", [34.0, 30.0, 18.0, 90.0], true, true, false),
        s("high humidity", [26.0, 85.0, 60.0, 50.0], false, true, false),
    ]
}

/// One reading per minute for `minutes`, starting at `start_ms`, following
/// daily temperature, humidity and light cycles with slowly drying soil
/// and a watering every six hours.
pub fn day_cycle_history(start_ms: u64, minutes: usize, seed: u64) -> Vec<ReadingRecord> {
    let mut rng = StdRng::seed_from_u64(seed);
    let span = minutes.max(1) as f32;
    let mut soil_offset = 0.0f32;
    (0..minutes)
        .map(|i| {
            let hour = (i as f32 / 60.0) % 24.0;
            let phase = 2.0 * PI * (hour - 6.0) / 24.0;
            let temperature = (24.0 + 6.0 * phase.sin() + gaussian(&mut rng)).clamp(15.0, 35.0);
            let humidity = (70.0 - 15.0 * phase.sin() + 3.0 * gaussian(&mut rng)).clamp(30.0, 90.0);

            if i > 0 && i % 360 == 0 {
                soil_offset += 20.0;
            }
            let soil = (80.0 - 40.0 * i as f32 / span + soil_offset).clamp(20.0, 90.0)
                + 2.0 * gaussian(&mut rng);
            let daylight = if (6.0..=18.0).contains(&hour) {
                70.0 + 20.0 * (PI * (hour - 6.0) / 12.0).sin()
            } else {
                10.0
            };
            let light = (daylight + 5.0 * gaussian(&mut rng)).clamp(0.0, 100.0);

            ReadingRecord::new(
                temperature,
                humidity,
                soil.clamp(0.0, 100.0),
                light,
                start_ms + i as u64 * 60_000,
            )
            .graded()
        })
        .collect()
}
