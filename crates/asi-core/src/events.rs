use crate::{AsiError, AsiResult};

/// Error event taxonomy. Codes are external identifiers: stable, contiguous,
/// and persisted inside the occurrence-counter record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum EventId {
    MsgCrcFault = 0x0001,
    RollingCounterFault = 0x0002,
    TypeLengthFault = 0x0003,
    MsgTimeoutFault = 0x0004,
    AckLossFault = 0x0005,
    AckUnsuccessful = 0x0006,
    PrecondListFault = 0x0007,
    ActionListFault = 0x0008,
    VehicleStatusMismatch = 0x0009,
    VehicleStatusError = 0x000A,
    VehicleStatusInvalid = 0x000B,
    CalibReadbackFault = 0x000C,
    CalibTimeoutFault = 0x000D,
    StartupMemFault = 0x000E,
    LossOfComm = 0x000F,
    MessageLoss = 0x0010,
    SutTerminated = 0x0011,
    ActionReqRangeFault = 0x0012,
    ActionReqActionFault = 0x0013,
    ActionReqPrecondFault = 0x0014,
    InitComplete = 0x0015,
    ActionReqTimeout = 0x0016,
    EcuCriticalFail = 0x0017,
    EcuNonCriticalFail = 0x0018,
    TaskOverrun = 0x0019,
    StateTransitionFault = 0x001A,
}

impl EventId {
    pub const COUNT: usize = 26;

    pub fn code(self) -> u16 {
        self as u16
    }

    /// Dense index into the occurrence-counter record.
    pub fn index(self) -> usize {
        (self as u16 - 1) as usize
    }

    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            0x0001 => Some(EventId::MsgCrcFault),
            0x0002 => Some(EventId::RollingCounterFault),
            0x0003 => Some(EventId::TypeLengthFault),
            0x0004 => Some(EventId::MsgTimeoutFault),
            0x0005 => Some(EventId::AckLossFault),
            0x0006 => Some(EventId::AckUnsuccessful),
            0x0007 => Some(EventId::PrecondListFault),
            0x0008 => Some(EventId::ActionListFault),
            0x0009 => Some(EventId::VehicleStatusMismatch),
            0x000A => Some(EventId::VehicleStatusError),
            0x000B => Some(EventId::VehicleStatusInvalid),
            0x000C => Some(EventId::CalibReadbackFault),
            0x000D => Some(EventId::CalibTimeoutFault),
            0x000E => Some(EventId::StartupMemFault),
            0x000F => Some(EventId::LossOfComm),
            0x0010 => Some(EventId::MessageLoss),
            0x0011 => Some(EventId::SutTerminated),
            0x0012 => Some(EventId::ActionReqRangeFault),
            0x0013 => Some(EventId::ActionReqActionFault),
            0x0014 => Some(EventId::ActionReqPrecondFault),
            0x0015 => Some(EventId::InitComplete),
            0x0016 => Some(EventId::ActionReqTimeout),
            0x0017 => Some(EventId::EcuCriticalFail),
            0x0018 => Some(EventId::EcuNonCriticalFail),
            0x0019 => Some(EventId::TaskOverrun),
            0x001A => Some(EventId::StateTransitionFault),
            _ => None,
        }
    }
}

/// Event severity. Order matters: eviction compares with `<`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Minor,
    Normal,
    Critical,
}

/// Uncorrelated or correlated notice forwarded to the automation requester.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyKind {
    InvalidActionReq,
    PreconditionFail,
    SafeStateEntered,
    SutPassed,
    SutFailed,
    SutUnfinished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyChannel {
    Vam,
    Diag,
}

/// One queued notice. `msg_id`/`seq` are zero for broadcasts that do not
/// answer a specific request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Notification {
    pub msg_id: u16,
    pub seq: u16,
    pub kind: NotifyKind,
    pub channel: NotifyChannel,
}

impl Notification {
    pub fn broadcast(kind: NotifyKind, channel: NotifyChannel) -> Self {
        Self {
            msg_id: 0,
            seq: 0,
            kind,
            channel,
        }
    }

    /// Notice answering one specific request.
    pub fn reply(msg_id: u16, seq: u16, kind: NotifyKind, channel: NotifyChannel) -> Self {
        Self {
            msg_id,
            seq,
            kind,
            channel,
        }
    }
}

/// Fixed classification entry: severity plus the notice the fault manager
/// dispatches while processing the event (most events carry none; correlated
/// rejections are sent at the raising site, which still holds the request).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventClass {
    pub severity: Severity,
    pub notify: Option<(NotifyKind, NotifyChannel)>,
}

/// Classification table, indexed by event id.
///
/// Critical entries are the ones that must latch Safe State; Minor entries
/// are per-frame or per-request noise that must never evict protocol-level
/// faults from a full queue.
pub fn classify(id: EventId) -> EventClass {
    let (severity, notify) = match id {
        EventId::MsgCrcFault => (Severity::Minor, None),
        EventId::RollingCounterFault => (Severity::Normal, None),
        EventId::TypeLengthFault => (Severity::Minor, None),
        EventId::MsgTimeoutFault => (Severity::Minor, None),
        EventId::AckLossFault => (Severity::Normal, None),
        EventId::AckUnsuccessful => (Severity::Normal, None),
        EventId::PrecondListFault => (Severity::Normal, None),
        EventId::ActionListFault => (Severity::Normal, None),
        EventId::VehicleStatusMismatch => (Severity::Minor, None),
        EventId::VehicleStatusError => (Severity::Normal, None),
        EventId::VehicleStatusInvalid => (Severity::Normal, None),
        EventId::CalibReadbackFault => (Severity::Normal, None),
        EventId::CalibTimeoutFault => (Severity::Normal, None),
        EventId::StartupMemFault => (Severity::Critical, None),
        EventId::LossOfComm => (Severity::Critical, None),
        EventId::MessageLoss => (Severity::Normal, None),
        EventId::SutTerminated => (
            Severity::Normal,
            Some((NotifyKind::SutUnfinished, NotifyChannel::Vam)),
        ),
        EventId::ActionReqRangeFault => (Severity::Minor, None),
        EventId::ActionReqActionFault => (Severity::Minor, None),
        EventId::ActionReqPrecondFault => (Severity::Minor, None),
        EventId::InitComplete => (Severity::Minor, None),
        EventId::ActionReqTimeout => (Severity::Normal, None),
        EventId::EcuCriticalFail => (Severity::Critical, None),
        EventId::EcuNonCriticalFail => (Severity::Normal, None),
        EventId::TaskOverrun => (Severity::Normal, None),
        EventId::StateTransitionFault => (Severity::Critical, None),
    };
    EventClass { severity, notify }
}

pub const COUNTER_RECORD_SIZE: usize = EventId::COUNT * 4;

/// Serialize occurrence counters for the retention layer (big-endian words,
/// dense by `EventId::index`).
pub fn encode_counters(counters: &[u32; EventId::COUNT], buf: &mut [u8]) -> AsiResult<()> {
    if buf.len() < COUNTER_RECORD_SIZE {
        return Err(AsiError::WireFormat);
    }
    for (i, c) in counters.iter().enumerate() {
        buf[i * 4..i * 4 + 4].copy_from_slice(&c.to_be_bytes());
    }
    Ok(())
}

pub fn decode_counters(buf: &[u8]) -> AsiResult<[u32; EventId::COUNT]> {
    if buf.len() < COUNTER_RECORD_SIZE {
        return Err(AsiError::WireFormat);
    }
    let mut out = [0u32; EventId::COUNT];
    for (i, c) in out.iter_mut().enumerate() {
        let word: [u8; 4] = buf[i * 4..i * 4 + 4]
            .try_into()
            .map_err(|_| AsiError::WireFormat)?;
        *c = u32::from_be_bytes(word);
    }
    Ok(out)
}
