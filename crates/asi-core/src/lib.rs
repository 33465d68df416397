#![no_std]
#[cfg(feature = "std")]
extern crate std;

mod events;
mod msg;
mod state;

pub use events::{
    classify, decode_counters, encode_counters, EventClass, EventId, NotifyChannel, NotifyKind,
    Notification, Severity, COUNTER_RECORD_SIZE,
};
pub use msg::ProcessMsg;
pub use state::{
    AsiState, Flag, Gear, ParkFlag, PhaseResult, PreCondition, Reading, SutPhase, SutResults,
    TestVerdict, SUT_PHASE_COUNT,
};

// Vehicle is "standing" when |speed| is inside this margin (same unit as the
// speed source).
pub const PARK_SPEED_MARGIN: f32 = 0.20;

// A gear/speed sample older than this is reported Stale to readers.
pub const VEHICLE_STALE_MS: u32 = 200;

// Start-up test: per-phase wall-clock budget.
pub const SUT_PHASE_BUDGET_MS: u32 = 10;

// Start-up memory test block. Contract demands at least 5 words.
pub const MEM_TEST_WORDS: usize = 8;

// Queue capacities.
pub const INTEGRITY_QUEUE_CAP: usize = 32;
pub const APPROVED_QUEUE_CAP: usize = 32;
pub const NOTIFY_QUEUE_CAP: usize = 64;
pub const EVENT_QUEUE_CAP: usize = 16;

// Admission must not block: bounded wait for the approved-actions queue.
pub const ADMIT_ENQUEUE_WAIT_MS: u32 = 5;

// Fault manager pipeline: per-stage budget, counter checkpoint cadence and
// the bounded wait on the event queue per pass.
pub const FM_STAGE_BUDGET_MS: u32 = 5;
pub const FM_CHECKPOINT_MS: u32 = 1_000;
pub const FM_EVENT_WAIT_MS: u32 = 10;

// Task periods for the periodic workers.
pub const IO_PERIOD_MS: u64 = 5;
pub const ADMISSION_PERIOD_MS: u64 = 10;
pub const LIFECYCLE_PERIOD_MS: u64 = 10;
pub const MONITOR_PERIOD_MS: u64 = 20;
pub const FAULT_PERIOD_MS: u64 = 20;

// Event log rotation threshold.
pub const EVENT_LOG_MAX_BYTES: u64 = 64 * 1024;

pub type AsiResult<T> = Result<T, AsiError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AsiError {
    InvalidState,
    QueueTimeout,
    QueueFull,
    WireFormat,
    Retention,
    HalFault,
    SinkFault,
}

impl core::fmt::Display for AsiError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for AsiError {}
