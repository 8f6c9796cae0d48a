//! Safety validator.
//!
//! Every command, manual or automatic, passes through
//! [`SafetyValidator::validate_command`] before it can reach the state
//! machine.  Checks run in a fixed order and stop at the first failure:
//!
//! 1. actuator name is one of `pump`, `fan`, `grow_light`
//! 2. action is `ON` or `OFF`
//! 3. duration is non-negative
//! 4. duration is within the actuator's cap (rejected or clamped per policy)
//! 5. fewer than `max_commands_per_minute` accepted commands for this
//!    actuator in the trailing window
//!
//! Only a command that passes all five is recorded in the rate window.
//! Interlocks are checked separately against the latest reading, and
//! advisory limits latch an alert bitmask that never blocks anything.

use core::fmt;

use heapless::Deque;
use log::{error, info, warn};
use serde::{Deserialize, Serialize};

use crate::config::{DurationCapPolicy, MAX_RATE_LOG, SafetyPolicy};
use crate::reading::{Actuator, FeatureVector, Metric, PerActuator};

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    On,
    Off,
}

impl Action {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "ON" => Some(Self::On),
            "OFF" => Some(Self::Off),
            _ => None,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::On => "ON",
            Self::Off => "OFF",
        }
    }
}

/// A command that passed every check and may be applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidatedCommand {
    pub actuator: Actuator,
    pub action: Action,
    /// Effective duration; `0` means until switched off
    pub duration_secs: u32,
    /// True if the requested duration was cut to the cap
    pub clamped: bool,
    pub issued_at_ms: u64,
}

// ---------------------------------------------------------------------------
// Rejections
// ---------------------------------------------------------------------------

/// Structured reason a command was dropped.
#[derive(Debug, Clone, PartialEq)]
pub enum SafetyRejection {
    UnknownActuator(String),
    InvalidAction(String),
    NegativeDuration(i64),
    DurationExceedsCap {
        actuator: Actuator,
        requested: i64,
        cap: u32,
    },
    RateLimited {
        actuator: Actuator,
        recent: usize,
        window_secs: u32,
    },
    Interlock {
        actuator: Actuator,
        temperature_c: f32,
        ceiling_c: f32,
    },
}

impl fmt::Display for SafetyRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownActuator(name) => write!(f, "unknown actuator '{name}'"),
            Self::InvalidAction(action) => write!(f, "invalid action '{action}'"),
            Self::NegativeDuration(d) => write!(f, "negative duration {d}s"),
            Self::DurationExceedsCap {
                actuator,
                requested,
                cap,
            } => write!(f, "{} duration {requested}s exceeds cap {cap}s", actuator.name()),
            Self::RateLimited {
                actuator,
                recent,
                window_secs,
            } => write!(
                f,
                "{} rate limited: {recent} commands in {window_secs}s",
                actuator.name()
            ),
            Self::Interlock {
                actuator,
                temperature_c,
                ceiling_c,
            } => write!(
                f,
                "{} interlock: {temperature_c:.1}\u{00b0}C above {ceiling_c:.1}\u{00b0}C",
                actuator.name()
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// Advisory alerts
// ---------------------------------------------------------------------------

/// Advisory conditions, accumulated in a bitmask so several can be active
/// and cleared independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SafetyAlert {
    HighTemperature = 0b0000_0001,
    HighHumidity = 0b0000_0010,
    Waterlogged = 0b0000_0100,
}

impl SafetyAlert {
    pub const ALL: [Self; 3] = [Self::HighTemperature, Self::HighHumidity, Self::Waterlogged];

    pub const fn mask(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for SafetyAlert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HighTemperature => write!(f, "high temperature"),
            Self::HighHumidity => write!(f, "high humidity"),
            Self::Waterlogged => write!(f, "soil waterlogged"),
        }
    }
}

// ---------------------------------------------------------------------------
// Validator
// ---------------------------------------------------------------------------

type RateLog = Deque<u64, MAX_RATE_LOG>;

pub struct SafetyValidator {
    policy: SafetyPolicy,
    /// Accepted-command timestamps (ms) per actuator, oldest first.
    windows: PerActuator<RateLog>,
    /// Latched advisory bitmask.
    alerts: u8,
}

impl SafetyValidator {
    pub fn new(policy: SafetyPolicy) -> Self {
        Self {
            policy,
            windows: PerActuator::from_fn(|_| Deque::new()),
            alerts: 0,
        }
    }

    pub fn policy(&self) -> &SafetyPolicy {
        &self.policy
    }

    /// Run the ordered checks and, on success, record the command in the
    /// actuator's rate window.
    pub fn validate_command(
        &mut self,
        actuator: &str,
        action: &str,
        duration_secs: i64,
        now_ms: u64,
    ) -> Result<ValidatedCommand, SafetyRejection> {
        let result = self.check(actuator, action, duration_secs, now_ms);
        if let Err(ref reason) = result {
            warn!("Command rejected: {reason}");
        }
        result
    }

    fn check(
        &mut self,
        actuator: &str,
        action: &str,
        duration_secs: i64,
        now_ms: u64,
    ) -> Result<ValidatedCommand, SafetyRejection> {
        let act = Actuator::from_name(actuator)
            .ok_or_else(|| SafetyRejection::UnknownActuator(actuator.to_owned()))?;
        let action = Action::from_name(action)
            .ok_or_else(|| SafetyRejection::InvalidAction(action.to_owned()))?;
        if duration_secs < 0 {
            return Err(SafetyRejection::NegativeDuration(duration_secs));
        }

        let cap = *self.policy.max_duration_secs.get(act);
        let (duration, clamped) = if duration_secs > i64::from(cap) {
            match self.policy.duration_cap {
                DurationCapPolicy::Reject => {
                    return Err(SafetyRejection::DurationExceedsCap {
                        actuator: act,
                        requested: duration_secs,
                        cap,
                    });
                }
                DurationCapPolicy::Clamp => {
                    warn!(
                        "{} duration {}s exceeds cap, capping at {}s",
                        act.name(),
                        duration_secs,
                        cap
                    );
                    (cap, true)
                }
            }
        } else {
            (duration_secs as u32, false)
        };

        let window_ms = u64::from(self.policy.rate_window_secs) * 1000;
        let max = self.policy.max_commands_per_minute as usize;
        let log = self.windows.get_mut(act);
        while log
            .front()
            .is_some_and(|&t| now_ms.saturating_sub(t) >= window_ms)
        {
            log.pop_front();
        }
        if log.len() >= max {
            return Err(SafetyRejection::RateLimited {
                actuator: act,
                recent: log.len(),
                window_secs: self.policy.rate_window_secs,
            });
        }
        // Only an unvalidated policy above MAX_RATE_LOG reaches a full log.
        if log.is_full() {
            log.pop_front();
        }
        let pushed = log.push_back(now_ms);
        debug_assert!(pushed.is_ok());

        Ok(ValidatedCommand {
            actuator: act,
            action,
            duration_secs: duration,
            clamped,
            issued_at_ms: now_ms,
        })
    }

    /// Commands currently counted against `actuator`'s window.
    pub fn recent_commands(&self, actuator: Actuator, now_ms: u64) -> usize {
        let window_ms = u64::from(self.policy.rate_window_secs) * 1000;
        self.windows
            .get(actuator)
            .iter()
            .filter(|&&t| now_ms.saturating_sub(t) < window_ms)
            .count()
    }

    /// Physical interlocks for switching `actuator` ON given `reading`.
    /// A missing temperature does not block.
    pub fn check_interlocks(
        &self,
        actuator: Actuator,
        reading: &FeatureVector,
    ) -> Result<(), SafetyRejection> {
        if actuator != Actuator::GrowLight {
            return Ok(());
        }
        match reading.get(Metric::Temperature) {
            Some(t) if t > self.policy.grow_light_max_temp_c => {
                warn!(
                    "Interlock: grow light blocked at {:.1}\u{00b0}C",
                    t
                );
                Err(SafetyRejection::Interlock {
                    actuator,
                    temperature_c: t,
                    ceiling_c: self.policy.grow_light_max_temp_c,
                })
            }
            _ => Ok(()),
        }
    }

    /// Re-evaluate advisory limits against `reading`; returns the updated
    /// bitmask.
    pub fn check_safety_limits(&mut self, reading: &FeatureVector) -> u8 {
        let over = |m: Metric, limit: f32| reading.get(m).is_some_and(|v| v > limit);

        // ── Temperature ───────────────────────────────────────────
        self.eval_alert(
            SafetyAlert::HighTemperature,
            over(Metric::Temperature, self.policy.alert_max_temp_c),
        );

        // ── Humidity ──────────────────────────────────────────────
        self.eval_alert(
            SafetyAlert::HighHumidity,
            over(Metric::Humidity, self.policy.alert_max_humidity),
        );

        // ── Soil ──────────────────────────────────────────────────
        self.eval_alert(
            SafetyAlert::Waterlogged,
            over(Metric::SoilMoisture, self.policy.alert_max_soil_moisture),
        );

        self.alerts
    }

    /// Current alert bitmask.
    pub fn alerts(&self) -> u8 {
        self.alerts
    }

    pub fn has_alert(&self, alert: SafetyAlert) -> bool {
        self.alerts & alert.mask() != 0
    }

    // ── Internal ──────────────────────────────────────────────────

    fn eval_alert(&mut self, alert: SafetyAlert, condition: bool) {
        if condition {
            if self.alerts & alert.mask() == 0 {
                error!("SAFETY ALERT SET: {alert}");
            }
            self.alerts |= alert.mask();
        } else {
            if self.alerts & alert.mask() != 0 {
                info!("SAFETY ALERT CLEARED: {alert}");
            }
            self.alerts &= !alert.mask();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator() -> SafetyValidator {
        SafetyValidator::new(SafetyPolicy::default())
    }

    #[test]
    fn check_order_short_circuits() {
        let mut v = validator();
        assert_eq!(
            v.validate_command("heater", "BOGUS", -1, 0),
            Err(SafetyRejection::UnknownActuator("heater".into()))
        );
        assert_eq!(
            v.validate_command("pump", "BOGUS", -1, 0),
            Err(SafetyRejection::InvalidAction("BOGUS".into()))
        );
        assert_eq!(
            v.validate_command("pump", "ON", -1, 0),
            Err(SafetyRejection::NegativeDuration(-1))
        );
        // Rejected commands do not count against the window.
        assert_eq!(v.recent_commands(Actuator::Pump, 0), 0);
    }

    #[test]
    fn duration_cap_clamps_by_default() {
        let mut v = validator();
        let cmd = v.validate_command("pump", "ON", 5000, 0).unwrap();
        assert_eq!(cmd.duration_secs, 1800);
        assert!(cmd.clamped);

        let cmd = v.validate_command("grow_light", "ON", 14400, 0).unwrap();
        assert_eq!(cmd.duration_secs, 14400);
        assert!(!cmd.clamped);
    }

    #[test]
    fn duration_cap_can_reject() {
        let mut policy = SafetyPolicy::default();
        policy.duration_cap = DurationCapPolicy::Reject;
        let mut v = SafetyValidator::new(policy);
        assert_eq!(
            v.validate_command("fan", "ON", 3601, 0),
            Err(SafetyRejection::DurationExceedsCap {
                actuator: Actuator::Fan,
                requested: 3601,
                cap: 3600
            })
        );
    }

    #[test]
    fn eleventh_command_in_window_is_rate_limited() {
        let mut v = validator();
        for i in 0..10u64 {
            assert!(v.validate_command("fan", "ON", 0, i * 1000).is_ok());
        }
        assert!(matches!(
            v.validate_command("fan", "OFF", 0, 10_000),
            Err(SafetyRejection::RateLimited { recent: 10, .. })
        ));
        // Other actuators have their own window.
        assert!(v.validate_command("pump", "ON", 0, 10_000).is_ok());
        // First entry (t=0) ages out at t=60s.
        assert!(v.validate_command("fan", "OFF", 0, 60_000).is_ok());
        assert!(v.validate_command("fan", "ON", 0, 60_500).is_err());
    }

    #[test]
    fn window_at_log_capacity() {
        let mut v = SafetyValidator::new(SafetyPolicy {
            max_commands_per_minute: MAX_RATE_LOG as u8,
            ..SafetyPolicy::default()
        });
        for i in 0..MAX_RATE_LOG as u64 {
            assert!(v.validate_command("pump", "OFF", 0, i * 100).is_ok());
        }
        assert!(v.validate_command("pump", "OFF", 0, 7_000).is_err());
        assert_eq!(v.recent_commands(Actuator::Pump, 7_000), MAX_RATE_LOG);

        // Unvalidated limit above capacity: the log keeps the newest entries.
        let mut loose = SafetyValidator::new(SafetyPolicy {
            max_commands_per_minute: 200,
            ..SafetyPolicy::default()
        });
        for i in 0..100u64 {
            assert!(loose.validate_command("fan", "ON", 0, i * 10).is_ok());
        }
        assert_eq!(loose.recent_commands(Actuator::Fan, 1_000), MAX_RATE_LOG);
    }

    #[test]
    fn grow_light_interlock() {
        let v = validator();
        let hot = FeatureVector::empty(0).with(Metric::Temperature, 41.0);
        let warm = FeatureVector::empty(0).with(Metric::Temperature, 40.0);
        assert!(matches!(
            v.check_interlocks(Actuator::GrowLight, &hot),
            Err(SafetyRejection::Interlock { .. })
        ));
        assert!(v.check_interlocks(Actuator::GrowLight, &warm).is_ok());
        assert!(v.check_interlocks(Actuator::Fan, &hot).is_ok());
        assert!(v.check_interlocks(Actuator::GrowLight, &FeatureVector::empty(0)).is_ok());
    }

    #[test]
    fn advisory_alerts_latch_and_clear() {
        let mut v = validator();
        let wet = FeatureVector::complete([46.0, 96.0, 50.0, 50.0], 0);
        let mask = v.check_safety_limits(&wet);
        assert_eq!(
            mask,
            SafetyAlert::HighTemperature.mask() | SafetyAlert::HighHumidity.mask()
        );
        assert!(!v.has_alert(SafetyAlert::Waterlogged));

        let calm = FeatureVector::complete([25.0, 60.0, 96.0, 50.0], 0);
        assert_eq!(v.check_safety_limits(&calm), SafetyAlert::Waterlogged.mask());
    }
}
