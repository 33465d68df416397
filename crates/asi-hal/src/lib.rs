#![no_std]
#![forbid(unsafe_code)]

use asi_core::{AsiError, AsiResult, Gear, Notification, ProcessMsg};
use asi_time::UtcStamp;

/// The two time sources of the interlock: a wrapping monotonic millisecond
/// counter for all scheduling/budget math and an optional-quality wall clock
/// for event snapshots only.
pub trait AsiClock: Send + Sync {
    /// Monotonic, non-decreasing, wraps at 2^32 ms (~49.7 days). Compare
    /// only through the wrap-safe helpers.
    fn now_ms(&self) -> u32;

    /// Current UTC date record; `valid` is false when the host cannot tell.
    fn utc_now(&self) -> UtcStamp;
}

/// Decoded vehicle-status feed. One poll returns at most one new sample per
/// signal; `WouldBlock` means no new frame arrived since the last poll.
pub trait VehicleBus: Send {
    fn poll_gear(&mut self) -> nb::Result<Gear, AsiError>;
    fn poll_speed(&mut self) -> nb::Result<f32, AsiError>;
}

/// Link to the vehicle-automation requester. Requests arriving here have
/// already passed transport integrity (CRC, rolling counter) upstream.
pub trait VamLink: Send {
    fn poll_request(&mut self) -> nb::Result<ProcessMsg, AsiError>;

    /// Rejection / broadcast notices back to the requester.
    fn push_notification(&mut self, note: &Notification) -> AsiResult<()>;

    /// Admitted request hand-off toward actuation. Retry policy (if any)
    /// belongs downstream.
    fn push_approved(&mut self, msg: &ProcessMsg) -> AsiResult<()>;
}

/// Persistent slots for cross-restart continuity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetainSlot {
    AsiState,
    InitFlag,
    EventCounters,
    SutResult,
    SutStamp,
}

impl RetainSlot {
    pub const ALL: [RetainSlot; 5] = [
        RetainSlot::AsiState,
        RetainSlot::InitFlag,
        RetainSlot::EventCounters,
        RetainSlot::SutResult,
        RetainSlot::SutStamp,
    ];

    pub fn name(self) -> &'static str {
        match self {
            RetainSlot::AsiState => "asi_state",
            RetainSlot::InitFlag => "init_flag",
            RetainSlot::EventCounters => "event_counters",
            RetainSlot::SutResult => "sut_result",
            RetainSlot::SutStamp => "sut_stamp",
        }
    }
}

/// Non-volatile key-value store behind the interlock's persisted records.
/// Writes must be atomic and flushed before returning.
pub trait Retention: Send {
    /// Copies the slot into `buf`, returning the record length. 0 = slot
    /// was never written.
    fn load(&mut self, slot: RetainSlot, buf: &mut [u8]) -> AsiResult<usize>;

    fn store(&mut self, slot: RetainSlot, data: &[u8]) -> AsiResult<()>;

    /// External reinitialization: drop every slot. The only sanctioned way
    /// out of a persisted Safe State.
    fn wipe(&mut self) -> AsiResult<()>;
}

/// Append-only sink for the fault manager's event log. Rotation policy is
/// the sink's concern; `append` after rotation must land in a fresh file.
pub trait EventSink: Send {
    fn append(&mut self, line: &str) -> AsiResult<()>;
}
