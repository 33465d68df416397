//! Vehicle-status monitor task.
//!
//! Reads the gear and speed slots with freshness judged at read time,
//! runs the park fusion, publishes the fused flag and raises the
//! status-quality events the fusion reports.

use std::sync::Arc;

use asi_core::EventId;
use asi_hal::AsiClock;
use asi_status::{MonitorOutcome, ParkMonitor};
use log::debug;

use crate::itcom::Itcom;

pub struct StatusTask {
    itcom: Arc<Itcom>,
    clock: Arc<dyn AsiClock>,
    monitor: ParkMonitor,
}

impl StatusTask {
    pub fn new(itcom: Arc<Itcom>, clock: Arc<dyn AsiClock>) -> Self {
        Self {
            itcom,
            clock,
            monitor: ParkMonitor::new(),
        }
    }

    pub fn tick(&mut self) {
        let now = self.clock.now_ms();
        let gear = self.itcom.gear_reading(now);
        let speed = self.itcom.speed_reading(now);
        let outcome = self.monitor.evaluate(gear, speed);
        match outcome {
            MonitorOutcome::Confirmed => {}
            MonitorOutcome::SpeedMismatch => {
                debug!("park fusion: gear says Park, speed disagrees");
                self.itcom.raise_event(EventId::VehicleStatusMismatch, now);
            }
            MonitorOutcome::SourceInvalid => {
                self.itcom.raise_event(EventId::VehicleStatusInvalid, now);
            }
            MonitorOutcome::SourcesStale => {
                self.itcom.raise_event(EventId::VehicleStatusError, now);
            }
        }
        // Stale sources keep the prior flag; publishing it again is a no-op.
        self.itcom.set_park_flag(self.monitor.flag());
    }
}
