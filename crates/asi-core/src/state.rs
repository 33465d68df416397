use crate::{AsiError, AsiResult};

/// Interlock lifecycle state. Codes are persisted across restarts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AsiState {
    Initial = 0x00,
    StartupTest = 0x01,
    NormalOperation = 0x02,
    SafeState = 0x03,
}

impl AsiState {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0x00 => Some(AsiState::Initial),
            0x01 => Some(AsiState::StartupTest),
            0x02 => Some(AsiState::NormalOperation),
            0x03 => Some(AsiState::SafeState),
            _ => None,
        }
    }
}

/// PRNDL gear selector as reported by the vehicle bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Gear {
    Park = 0x00,
    Reverse = 0x01,
    Neutral = 0x02,
    Drive = 0x03,
    Low = 0x04,
}

impl Gear {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0x00 => Some(Gear::Park),
            0x01 => Some(Gear::Reverse),
            0x02 => Some(Gear::Neutral),
            0x03 => Some(Gear::Drive),
            0x04 => Some(Gear::Low),
            _ => None,
        }
    }
}

/// Two-level status used by the init-done and critical-fault slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flag {
    Inactive,
    Active,
}

impl Flag {
    pub fn code(self) -> u8 {
        match self {
            Flag::Inactive => 0x00,
            Flag::Active => 0x01,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0x00 => Some(Flag::Inactive),
            0x01 => Some(Flag::Active),
            _ => None,
        }
    }
}

/// Derived standstill condition consumed by admission and the start-up test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParkFlag {
    Park,
    NotPark,
}

/// A source sample with its freshness already judged.
/// Stale carries no value: consumers must not act on old data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reading<T> {
    Fresh(T),
    Stale,
}

/// Action precondition. Validity is constructor presence: a code that does
/// not decode is "not on the list".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PreCondition {
    None = 0x00,
    Park = 0x01,
}

impl PreCondition {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0x00 => Some(PreCondition::None),
            0x01 => Some(PreCondition::Park),
            _ => None,
        }
    }
}

/// Verdict of one self-test or sub-test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TestVerdict {
    NotReached = 0x00,
    Skipped = 0x01,
    Failed = 0x02,
    Passed = 0x03,
}

impl TestVerdict {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0x00 => Some(TestVerdict::NotReached),
            0x01 => Some(TestVerdict::Skipped),
            0x02 => Some(TestVerdict::Failed),
            0x03 => Some(TestVerdict::Passed),
            _ => None,
        }
    }
}

/// The three start-up test phases, in run order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SutPhase {
    ActionList,
    PrecondList,
    Memory,
}

pub const SUT_PHASE_COUNT: usize = 3;
const MAX_SUB_TESTS: usize = 3;

/// Result of one phase: up to three sub-verdicts plus the group verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseResult {
    pub sub: [TestVerdict; MAX_SUB_TESTS],
    pub sub_count: u8,
    pub complete: bool,
    pub verdict: TestVerdict,
}

impl PhaseResult {
    pub fn empty(sub_count: u8) -> Self {
        Self {
            sub: [TestVerdict::NotReached; MAX_SUB_TESTS],
            sub_count,
            complete: false,
            verdict: TestVerdict::NotReached,
        }
    }
}

/// Full start-up test matrix. Persisted across restarts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SutResults {
    pub phases: [PhaseResult; SUT_PHASE_COUNT],
    pub skipped: u8,
    pub complete: bool,
    pub verdict: TestVerdict,
}

impl SutResults {
    pub const SIZE: usize = SUT_PHASE_COUNT * 6 + 3;

    /// Phase A and B probe two synthetic requests each; phase C runs the
    /// three memory sub-tests.
    pub fn empty() -> Self {
        Self {
            phases: [
                PhaseResult::empty(2),
                PhaseResult::empty(2),
                PhaseResult::empty(3),
            ],
            skipped: 0,
            complete: false,
            verdict: TestVerdict::NotReached,
        }
    }

    pub fn phase(&self, phase: SutPhase) -> &PhaseResult {
        match phase {
            SutPhase::ActionList => &self.phases[0],
            SutPhase::PrecondList => &self.phases[1],
            SutPhase::Memory => &self.phases[2],
        }
    }

    pub fn phase_mut(&mut self, phase: SutPhase) -> &mut PhaseResult {
        match phase {
            SutPhase::ActionList => &mut self.phases[0],
            SutPhase::PrecondList => &mut self.phases[1],
            SutPhase::Memory => &mut self.phases[2],
        }
    }

    pub fn to_bytes(&self, buf: &mut [u8]) -> AsiResult<()> {
        if buf.len() < Self::SIZE {
            return Err(AsiError::WireFormat);
        }
        for (i, phase) in self.phases.iter().enumerate() {
            let base = i * 6;
            for (j, sub) in phase.sub.iter().enumerate() {
                buf[base + j] = sub.code();
            }
            buf[base + 3] = phase.sub_count;
            buf[base + 4] = phase.complete as u8;
            buf[base + 5] = phase.verdict.code();
        }
        let tail = SUT_PHASE_COUNT * 6;
        buf[tail] = self.skipped;
        buf[tail + 1] = self.complete as u8;
        buf[tail + 2] = self.verdict.code();
        Ok(())
    }

    pub fn from_bytes(buf: &[u8]) -> AsiResult<Self> {
        if buf.len() < Self::SIZE {
            return Err(AsiError::WireFormat);
        }
        let mut out = Self::empty();
        for (i, phase) in out.phases.iter_mut().enumerate() {
            let base = i * 6;
            for (j, sub) in phase.sub.iter_mut().enumerate() {
                *sub = TestVerdict::from_code(buf[base + j]).ok_or(AsiError::WireFormat)?;
            }
            phase.sub_count = buf[base + 3];
            phase.complete = buf[base + 4] != 0;
            phase.verdict = TestVerdict::from_code(buf[base + 5]).ok_or(AsiError::WireFormat)?;
        }
        let tail = SUT_PHASE_COUNT * 6;
        out.skipped = buf[tail];
        out.complete = buf[tail + 1] != 0;
        out.verdict = TestVerdict::from_code(buf[tail + 2]).ok_or(AsiError::WireFormat)?;
        Ok(out)
    }
}
