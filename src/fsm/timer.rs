//! Per-actuator timer state and its status view.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimerState {
    #[default]
    Off,
    /// `duration_secs == 0` means on until switched off.
    On { started_at_ms: u64, duration_secs: u32 },
}

impl TimerState {
    pub fn is_on(&self) -> bool {
        matches!(self, Self::On { .. })
    }

    /// Strictly past the duration; indefinite timers never expire.
    pub fn expired(&self, now_ms: u64) -> bool {
        match *self {
            Self::On {
                started_at_ms,
                duration_secs,
            } if duration_secs > 0 => {
                now_ms.saturating_sub(started_at_ms) > u64::from(duration_secs) * 1000
            }
            _ => false,
        }
    }

    pub fn status(&self, now_ms: u64) -> ActuatorStatus {
        match *self {
            Self::Off => ActuatorStatus {
                on: false,
                elapsed_secs: 0,
                remaining_secs: 0,
            },
            Self::On {
                started_at_ms,
                duration_secs,
            } => {
                let elapsed = now_ms.saturating_sub(started_at_ms) / 1000;
                let remaining = if duration_secs == 0 {
                    -1
                } else {
                    i64::from(duration_secs).saturating_sub(elapsed as i64).max(0)
                };
                ActuatorStatus {
                    on: true,
                    elapsed_secs: elapsed,
                    remaining_secs: remaining,
                }
            }
        }
    }
}

/// Outbound status for one actuator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActuatorStatus {
    pub on: bool,
    pub elapsed_secs: u64,
    /// `-1` while on indefinitely
    pub remaining_secs: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expiry_is_strict() {
        let t = TimerState::On {
            started_at_ms: 1_000,
            duration_secs: 5,
        };
        assert!(!t.expired(6_000));
        assert!(t.expired(6_001));
    }

    #[test]
    fn indefinite_never_expires() {
        let t = TimerState::On {
            started_at_ms: 0,
            duration_secs: 0,
        };
        assert!(!t.expired(u64::MAX));
        assert_eq!(t.status(90_000).remaining_secs, -1);
        assert_eq!(t.status(90_000).elapsed_secs, 90);
    }

    #[test]
    fn status_counts_down() {
        let t = TimerState::On {
            started_at_ms: 0,
            duration_secs: 300,
        };
        let s = t.status(120_000);
        assert!(s.on);
        assert_eq!(s.remaining_secs, 180);
        assert_eq!(TimerState::Off.status(5).remaining_secs, 0);
    }
}
