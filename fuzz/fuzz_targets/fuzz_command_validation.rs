//! Fuzz target: `SafetyValidator::validate_command`
//!
//! Drives arbitrary actuator names, actions, durations and timestamps
//! through one validator and asserts every accepted command respects the
//! whitelist, the duration cap and the rate window.
//!
//! cargo fuzz run fuzz_command_validation

#![no_main]

use libfuzzer_sys::fuzz_target;
use plantcore::config::SafetyPolicy;
use plantcore::reading::Actuator;
use plantcore::safety::SafetyValidator;

fuzz_target!(|data: &[u8]| {
    let policy = SafetyPolicy::default();
    let mut validator = SafetyValidator::new(policy.clone());
    let mut now: u64 = 0;

    for chunk in data.chunks(12) {
        if chunk.len() < 12 {
            break;
        }
        let name = match chunk[0] % 4 {
            0 => "pump",
            1 => "fan",
            2 => "grow_light",
            _ => "heater",
        };
        let action = if chunk[1] & 1 == 0 { "ON" } else { "OFF" };
        let mut d = [0u8; 8];
        d.copy_from_slice(&chunk[2..10]);
        let duration = i64::from_le_bytes(d);
        now += u64::from(u16::from_le_bytes([chunk[10], chunk[11]]));

        if let Ok(cmd) = validator.validate_command(name, action, duration, now) {
            assert_eq!(cmd.actuator.name(), name);
            assert!(duration >= 0);
            assert!(cmd.duration_secs <= *policy.max_duration_secs.get(cmd.actuator));
            assert!(validator.recent_commands(cmd.actuator, now) <= 10);
        }
    }
    for a in Actuator::ALL {
        assert!(validator.recent_commands(a, now) <= 10);
    }
});
