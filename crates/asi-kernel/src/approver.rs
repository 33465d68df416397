//! Action request approver.
//!
//! Pulls integrity-checked requests off the mediator one per tick and
//! walks them through the admission pipeline: catalog lookup, payload
//! range check, precondition check, then hand-off to the approved queue.
//! Every rejection raises a fault event and answers the requester with a
//! notification carrying the original message id and sequence number.

use std::sync::Arc;

use asi_core::{
    AsiState, EventId, Notification, NotifyChannel, NotifyKind, ParkFlag, PreCondition,
    ProcessMsg, ADMIT_ENQUEUE_WAIT_MS,
};
use asi_hal::AsiClock;
use log::{debug, warn};

use crate::catalog::{self, ActionEntry};
use crate::itcom::{Itcom, QueuePush};

/// Admission verdict for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Approved,
    /// Action id is not on the catalog.
    NotOnList,
    /// Payload outside the catalog's inclusive range.
    OutOfRange,
    /// Catalog requires Park and the fused flag does not hold.
    PrecondFailed,
    /// Approved queue stayed full past the enqueue wait.
    Congested,
}

/// `true` when `code` names a precondition the build knows.
pub fn precond_on_list(code: u8) -> bool {
    PreCondition::from_code(code).is_some()
}

/// Payload-vs-range check. 1-, 2- and 4-byte payloads compare as one
/// little-endian value; 8-byte payloads compare each byte against the
/// range on its own. Anything else fails closed.
pub fn range_check(entry: &ActionEntry, msg: &ProcessMsg) -> bool {
    match msg.len {
        1 | 2 | 4 => match msg.value_le() {
            Some(v) => v >= entry.lo && v <= entry.hi,
            None => false,
        },
        8 => msg
            .bytes()
            .iter()
            .all(|&b| u32::from(b) >= entry.lo && u32::from(b) <= entry.hi),
        _ => false,
    }
}

pub struct Approver {
    itcom: Arc<Itcom>,
    clock: Arc<dyn AsiClock>,
}

impl Approver {
    pub fn new(itcom: Arc<Itcom>, clock: Arc<dyn AsiClock>) -> Self {
        Self { itcom, clock }
    }

    /// One admission pass. Outside Normal-Operation the queue head stays
    /// where it is; `None` means nothing was processed.
    pub fn tick(&mut self) -> Option<Admission> {
        if self.itcom.asi_state() != AsiState::NormalOperation {
            return None;
        }
        let msg = self.itcom.pop_request()?;
        Some(self.admit(msg))
    }

    fn admit(&mut self, msg: ProcessMsg) -> Admission {
        // 1. CATALOG LOOKUP
        let Some(entry) = catalog::find(msg.msg_id) else {
            debug!("reject 0x{:04X}: not on action list", msg.msg_id);
            self.reject(&msg, EventId::ActionReqActionFault, NotifyKind::InvalidActionReq);
            return Admission::NotOnList;
        };

        // 2. RANGE CHECK
        if !range_check(entry, &msg) {
            debug!("reject 0x{:04X}: payload out of range", msg.msg_id);
            self.reject(&msg, EventId::ActionReqRangeFault, NotifyKind::InvalidActionReq);
            return Admission::OutOfRange;
        }

        // 3. PRECONDITION CHECK
        if entry.precond == PreCondition::Park && self.itcom.park_flag() != ParkFlag::Park {
            debug!("reject 0x{:04X}: park precondition not met", msg.msg_id);
            self.reject(&msg, EventId::ActionReqPrecondFault, NotifyKind::PreconditionFail);
            return Admission::PrecondFailed;
        }

        // 4. HAND-OFF
        match self
            .itcom
            .push_approved_wait(msg, ADMIT_ENQUEUE_WAIT_MS)
        {
            QueuePush::Queued => {
                debug!("approved 0x{:04X} seq={}", msg.msg_id, msg.seq);
                Admission::Approved
            }
            _ => {
                warn!("approved queue congested, shedding 0x{:04X}", msg.msg_id);
                self.itcom
                    .raise_event(EventId::ActionReqTimeout, self.clock.now_ms());
                Admission::Congested
            }
        }
    }

    fn reject(&mut self, msg: &ProcessMsg, event: EventId, kind: NotifyKind) {
        self.itcom.raise_event(event, self.clock.now_ms());
        let note = Notification::reply(msg.msg_id, msg.seq, kind, NotifyChannel::Vam);
        if self.itcom.push_notification(note) != QueuePush::Queued {
            warn!("notify queue full, rejection notice for 0x{:04X} lost", msg.msg_id);
        }
    }
}
