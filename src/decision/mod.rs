//! Actuator decision engine.
//!
//! One bagging classifier per actuator maps a complete feature vector to
//! ON/OFF plus a vote-share confidence.  The trained [`ActuatorModelSet`]
//! is immutable; retraining builds a fresh set off to the side and swaps
//! the `Arc` under a write lock, so concurrent readers see either the old
//! set or the new one in full.

pub mod forest;
pub mod tree;

use std::sync::Arc;

use log::{info, warn};
use parking_lot::{Mutex, RwLock};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::config::EnsembleConfig;
use crate::error::{Error, Result, SnapshotError};
use crate::reading::{Actuator, FeatureVector, Metric, PerActuator};
use crate::snapshot::{self, SnapshotKind};

pub use forest::{Decision, Forest};
use tree::{N_FEATURES, Row};

// ───────────────────────────────────────────────────────────────
// Training data and model set
// ───────────────────────────────────────────────────────────────

/// One labelled row of the training table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainingSample {
    pub features: [f32; N_FEATURES],
    pub labels: PerActuator<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActuatorModel {
    pub forest: Forest,
    /// Held-out accuracy in `[0, 1]`
    pub accuracy: f32,
}

/// Every trained classifier plus the names it was trained against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActuatorModelSet {
    pub feature_names: Vec<String>,
    pub target_names: Vec<String>,
    pub models: PerActuator<ActuatorModel>,
    pub trained_on: usize,
}

impl ActuatorModelSet {
    fn decide(&self, x: &Row) -> PerActuator<Decision> {
        self.models.map(|_, m| m.forest.predict(x))
    }

    fn names_match(&self) -> bool {
        self.feature_names.iter().map(String::as_str).eq(Metric::ALL.iter().map(|m| m.name()))
            && self
                .target_names
                .iter()
                .map(String::as_str)
                .eq(Actuator::ALL.iter().map(|a| a.name()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrainingReport {
    pub train_rows: usize,
    pub holdout_rows: usize,
    pub accuracy: PerActuator<f32>,
    pub importances: PerActuator<[f32; N_FEATURES]>,
}

// ───────────────────────────────────────────────────────────────
// Scenario evaluation
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct Scenario {
    pub name: String,
    pub input: FeatureVector,
    pub expected: PerActuator<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioOutcome {
    pub name: String,
    pub predicted: PerActuator<Decision>,
    pub correct: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioReport {
    pub outcomes: Vec<ScenarioOutcome>,
    /// Fraction of scenarios with every actuator correct
    pub accuracy: f32,
}

// ───────────────────────────────────────────────────────────────
// Engine
// ───────────────────────────────────────────────────────────────

pub struct ActuatorDecisionEngine {
    config: EnsembleConfig,
    models: RwLock<Option<Arc<ActuatorModelSet>>>,
    /// Held for the whole of a training run.
    training: Mutex<()>,
}

impl ActuatorDecisionEngine {
    pub fn new(config: EnsembleConfig) -> Self {
        Self {
            config,
            models: RwLock::new(None),
            training: Mutex::new(()),
        }
    }

    pub fn is_trained(&self) -> bool {
        self.models.read().is_some()
    }

    /// Current model set, if any.  The returned `Arc` stays valid across
    /// later swaps.
    pub fn model_set(&self) -> Option<Arc<ActuatorModelSet>> {
        self.models.read().clone()
    }

    fn require_model(&self) -> Result<Arc<ActuatorModelSet>> {
        self.model_set().ok_or(Error::Untrained)
    }

    /// Train one forest per actuator and atomically install the result.
    ///
    /// A failed or rejected run leaves the previous model set in place.
    pub fn train(&self, samples: &[TrainingSample]) -> Result<TrainingReport> {
        let _guard = self.training.try_lock().ok_or(Error::TrainingInProgress)?;

        let cfg = &self.config;
        let required = cfg.min_training_samples.max(1);
        if samples.len() < required {
            return Err(Error::InsufficientData {
                required,
                available: samples.len(),
            });
        }

        info!(
            "Training actuator classifiers: {} samples, {} trees",
            samples.len(),
            cfg.n_trees
        );
        let mut rng = StdRng::seed_from_u64(cfg.seed);
        let rows: Vec<Row> = samples.iter().map(|s| s.features).collect();
        let mut order: Vec<usize> = (0..samples.len()).collect();
        order.shuffle(&mut rng);

        let holdout_n = ((samples.len() as f32 * cfg.holdout_fraction).ceil() as usize)
            .min(samples.len().saturating_sub(1));
        let (holdout, train) = order.split_at(holdout_n);
        // Without a holdout the reported accuracy is in-sample.
        let scored = if holdout.is_empty() { train } else { holdout };

        let mut fit = |actuator: Actuator| {
            let labels: Vec<bool> = samples.iter().map(|s| *s.labels.get(actuator)).collect();
            let forest = Forest::fit(&rows, &labels, train, cfg, &mut rng);
            let hits = scored
                .iter()
                .filter(|&&i| forest.predict(&rows[i]).on == labels[i])
                .count();
            let accuracy = hits as f32 / scored.len() as f32;
            info!("{} model accuracy: {:.3}", actuator.name(), accuracy);
            log_importances(actuator, &forest.importances());
            ActuatorModel { forest, accuracy }
        };
        let models = PerActuator {
            pump: fit(Actuator::Pump),
            fan: fit(Actuator::Fan),
            grow_light: fit(Actuator::GrowLight),
        };

        let set = ActuatorModelSet {
            feature_names: Metric::ALL.iter().map(|m| m.name().to_owned()).collect(),
            target_names: Actuator::ALL.iter().map(|a| a.name().to_owned()).collect(),
            trained_on: train.len(),
            models,
        };
        let report = TrainingReport {
            train_rows: train.len(),
            holdout_rows: holdout.len(),
            accuracy: set.models.map(|_, m| m.accuracy),
            importances: set.models.map(|_, m| m.forest.importances()),
        };
        *self.models.write() = Some(Arc::new(set));
        info!("Actuator classifiers installed");
        Ok(report)
    }

    /// ON/OFF per actuator by majority vote.
    pub fn predict(&self, input: &FeatureVector) -> Result<PerActuator<bool>> {
        Ok(self.predict_with_confidence(input)?.map(|_, d| d.on))
    }

    /// Decision plus the fraction of trees agreeing with it.
    pub fn predict_with_confidence(&self, input: &FeatureVector) -> Result<PerActuator<Decision>> {
        let x = input.require_all()?;
        let set = self.require_model()?;
        Ok(set.decide(&x))
    }

    /// Row-wise [`predict_with_confidence`](Self::predict_with_confidence)
    /// against a single model-set handle.
    pub fn batch_predict(&self, inputs: &[FeatureVector]) -> Result<Vec<PerActuator<Decision>>> {
        let rows = inputs
            .iter()
            .map(FeatureVector::require_all)
            .collect::<Result<Vec<_>>>()?;
        let set = self.require_model()?;
        Ok(rows.iter().map(|x| set.decide(x)).collect())
    }

    pub fn evaluate_scenarios(&self, scenarios: &[Scenario]) -> Result<ScenarioReport> {
        let set = self.require_model()?;
        let mut outcomes = Vec::with_capacity(scenarios.len());
        for s in scenarios {
            let x = s.input.require_all()?;
            let predicted = set.decide(&x);
            let correct = Actuator::ALL
                .iter()
                .all(|&a| predicted.get(a).on == *s.expected.get(a));
            if correct {
                info!("scenario '{}': ok", s.name);
            } else {
                warn!("scenario '{}': mismatch, predicted {:?}", s.name, predicted.map(|_, d| d.on));
            }
            outcomes.push(ScenarioOutcome {
                name: s.name.clone(),
                predicted,
                correct,
            });
        }
        let accuracy = if outcomes.is_empty() {
            0.0
        } else {
            outcomes.iter().filter(|o| o.correct).count() as f32 / outcomes.len() as f32
        };
        Ok(ScenarioReport { outcomes, accuracy })
    }

    pub fn feature_importances(&self) -> Result<PerActuator<[f32; N_FEATURES]>> {
        Ok(self.require_model()?.models.map(|_, m| m.forest.importances()))
    }

    // ── Persistence ──────────────────────────────────────────

    pub fn snapshot(&self) -> Result<Vec<u8>> {
        let set = self.require_model()?;
        Ok(snapshot::encode(SnapshotKind::ActuatorEnsemble, &*set)?)
    }

    /// Replace the model set with one decoded from `blob`.
    pub fn restore(&self, blob: &[u8]) -> Result<()> {
        let _guard = self.training.try_lock().ok_or(Error::TrainingInProgress)?;
        let set: ActuatorModelSet = snapshot::decode(SnapshotKind::ActuatorEnsemble, blob)?;
        if !set.names_match() {
            warn!("Actuator snapshot feature/target names do not match this build");
            return Err(SnapshotError::NameMismatch.into());
        }
        *self.models.write() = Some(Arc::new(set));
        info!("Actuator classifiers restored from snapshot");
        Ok(())
    }
}

fn log_importances(actuator: Actuator, imp: &[f32; N_FEATURES]) {
    let mut ranked: Vec<(Metric, f32)> = Metric::ALL.iter().map(|&m| (m, imp[m.index()])).collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    for (m, v) in ranked {
        info!("  {} importance {}: {:.4}", actuator.name(), m.name(), v);
    }
}
