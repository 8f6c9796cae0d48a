//! Integration tests for the safety validator against configured
//! policies, and its interplay with the actuation state machine.

use super::mock_hw::MockHardware;

use plantcore::config::{DurationCapPolicy, SafetyPolicy};
use plantcore::fsm::ActuationStateMachine;
use plantcore::reading::{Actuator, FeatureVector, Metric, PerActuator};
use plantcore::safety::{Action, SafetyAlert, SafetyRejection, SafetyValidator};

const T0: u64 = 1_700_000_000_000;

#[test]
fn zero_duration_means_indefinite() {
    let mut v = SafetyValidator::new(SafetyPolicy::default());
    let cmd = v.validate_command("grow_light", "ON", 0, T0).unwrap();
    assert_eq!(cmd.duration_secs, 0);
    assert_eq!(cmd.action, Action::On);

    let sm = ActuationStateMachine::new();
    let mut hw = MockHardware::new();
    sm.activate(&mut hw, cmd.actuator, cmd.duration_secs, T0).unwrap();
    assert!(sm.check_duration_expired(&mut hw, T0 + 86_400_000).is_empty());
    let status = sm.get_status(Actuator::GrowLight, T0 + 5_000);
    assert_eq!(status.remaining_secs, -1);
    assert_eq!(status.elapsed_secs, 5);
}

#[test]
fn tighter_policy_is_honoured() {
    let policy = SafetyPolicy {
        max_duration_secs: PerActuator {
            pump: 60,
            fan: 60,
            grow_light: 60,
        },
        duration_cap: DurationCapPolicy::Reject,
        max_commands_per_minute: 2,
        ..SafetyPolicy::default()
    };
    let mut v = SafetyValidator::new(policy);
    assert!(matches!(
        v.validate_command("pump", "ON", 61, T0),
        Err(SafetyRejection::DurationExceedsCap { cap: 60, .. })
    ));
    // The rejected command does not count.
    assert!(v.validate_command("pump", "ON", 60, T0).is_ok());
    assert!(v.validate_command("pump", "OFF", 0, T0 + 1).is_ok());
    assert!(matches!(
        v.validate_command("pump", "ON", 10, T0 + 2),
        Err(SafetyRejection::RateLimited { recent: 2, .. })
    ));
    assert_eq!(v.recent_commands(Actuator::Pump, T0 + 2), 2);
    assert_eq!(v.recent_commands(Actuator::Pump, T0 + 60_000), 1);
}

#[test]
fn interlock_threshold_is_strict() {
    let v = SafetyValidator::new(SafetyPolicy::default());
    let at = |t: f32| FeatureVector::empty(T0).with(Metric::Temperature, t);
    assert!(v.check_interlocks(Actuator::GrowLight, &at(40.0)).is_ok());
    assert!(v.check_interlocks(Actuator::GrowLight, &at(40.5)).is_err());
    assert!(v.check_interlocks(Actuator::Fan, &at(60.0)).is_ok());
    assert!(v.check_interlocks(Actuator::GrowLight, &FeatureVector::empty(T0)).is_ok());
}

#[test]
fn several_alerts_can_be_active() {
    let mut v = SafetyValidator::new(SafetyPolicy::default());
    let muggy = FeatureVector::complete([46.0, 96.0, 50.0, 50.0], T0);
    let flags = v.check_safety_limits(&muggy);
    assert_eq!(
        flags,
        SafetyAlert::HighTemperature.mask() | SafetyAlert::HighHumidity.mask()
    );
    let soaked = FeatureVector::complete([25.0, 50.0, 97.0, 50.0], T0);
    assert_eq!(v.check_safety_limits(&soaked), SafetyAlert::Waterlogged.mask());
}
