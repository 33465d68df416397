//! Edge I/O task.
//!
//! The only task that touches platform links: sweeps the vehicle bus into
//! the status slots, feeds integrity-checked requests into the admission
//! queue, and drains approvals and notifications back out. Everything it
//! moves goes through the mediator; it makes no admission decisions.

use std::sync::Arc;

use asi_core::EventId;
use asi_hal::{AsiClock, VamLink, VehicleBus};
use log::warn;

use crate::itcom::{Itcom, QueuePush};

/// Requests accepted from the link per tick. Bounds the time spent in one
/// pass when the requester floods.
const REQ_BATCH: usize = 4;

pub struct IoTask {
    itcom: Arc<Itcom>,
    clock: Arc<dyn AsiClock>,
    bus: Box<dyn VehicleBus>,
    vam: Box<dyn VamLink>,
}

impl IoTask {
    pub fn new(
        itcom: Arc<Itcom>,
        clock: Arc<dyn AsiClock>,
        bus: Box<dyn VehicleBus>,
        vam: Box<dyn VamLink>,
    ) -> Self {
        Self {
            itcom,
            clock,
            bus,
            vam,
        }
    }

    pub fn tick(&mut self) {
        let now = self.clock.now_ms();

        // 1. SENSOR SWEEP
        match self.bus.poll_gear() {
            Ok(gear) => self.itcom.set_vehicle_gear(gear, now),
            Err(nb::Error::WouldBlock) => {}
            Err(nb::Error::Other(e)) => warn!("gear poll failed: {}", e),
        }
        match self.bus.poll_speed() {
            Ok(speed) => self.itcom.set_vehicle_speed(speed, now),
            Err(nb::Error::WouldBlock) => {}
            Err(nb::Error::Other(e)) => warn!("speed poll failed: {}", e),
        }

        // 2. REQUEST FEED
        for _ in 0..REQ_BATCH {
            match self.vam.poll_request() {
                Ok(msg) => {
                    if self.itcom.push_request(msg) != QueuePush::Queued {
                        warn!("request queue full, losing 0x{:04X}", msg.msg_id);
                        self.itcom.raise_event(EventId::MessageLoss, now);
                    }
                }
                Err(nb::Error::WouldBlock) => break,
                Err(nb::Error::Other(e)) => {
                    warn!("request poll failed: {}", e);
                    break;
                }
            }
        }

        // 3. APPROVAL DRAIN
        while let Some(msg) = self.itcom.pop_approved() {
            if let Err(e) = self.vam.push_approved(&msg) {
                warn!("approved hand-off failed for 0x{:04X}: {}", msg.msg_id, e);
            }
        }

        // 4. NOTIFICATION DRAIN
        while let Some(note) = self.itcom.pop_notification() {
            if let Err(e) = self.vam.push_notification(&note) {
                warn!("notification hand-off failed: {}", e);
            }
        }
    }
}
