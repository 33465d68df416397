#![no_std]
#![forbid(unsafe_code)]

use asi_core::{Gear, ParkFlag, Reading, PARK_SPEED_MARGIN};

/// What one evaluation found. The caller maps outcomes onto events; this
/// crate stays free of queue plumbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorOutcome {
    /// Flag updated from consistent fresh sources (Park or NotPark).
    Confirmed,
    /// Gear says Park but the vehicle is still moving. Flag forced NotPark.
    SpeedMismatch,
    /// Speed sample is NaN or infinite. Flag forced NotPark.
    SourceInvalid,
    /// At least one source is stale. Flag left at its prior value so a
    /// transient dropout cannot flip Park-gated admission either way.
    SourcesStale,
}

/// Fuses gear, speed, and freshness into the park flag consumed by
/// admission and the start-up test. Owns the last published flag.
pub struct ParkMonitor {
    flag: ParkFlag,
}

impl ParkMonitor {
    /// Starts NotPark: Park-gated actions stay rejected until the first
    /// confirmed standstill.
    pub fn new() -> Self {
        Self {
            flag: ParkFlag::NotPark,
        }
    }

    pub fn flag(&self) -> ParkFlag {
        self.flag
    }

    pub fn evaluate(&mut self, gear: Reading<Gear>, speed: Reading<f32>) -> MonitorOutcome {
        let (gear, speed) = match (gear, speed) {
            (Reading::Fresh(g), Reading::Fresh(s)) => (g, s),
            _ => return MonitorOutcome::SourcesStale,
        };

        if !speed.is_finite() {
            self.flag = ParkFlag::NotPark;
            return MonitorOutcome::SourceInvalid;
        }

        if gear != Gear::Park {
            self.flag = ParkFlag::NotPark;
            return MonitorOutcome::Confirmed;
        }

        if standing(speed) {
            self.flag = ParkFlag::Park;
            MonitorOutcome::Confirmed
        } else {
            self.flag = ParkFlag::NotPark;
            MonitorOutcome::SpeedMismatch
        }
    }
}

impl Default for ParkMonitor {
    fn default() -> Self {
        Self::new()
    }
}

/// Symmetric margin test without `abs` (core-only float surface).
pub fn standing(speed: f32) -> bool {
    speed >= -PARK_SPEED_MARGIN && speed <= PARK_SPEED_MARGIN
}
