use asi_core::{AsiError, AsiResult};

/// Wall-clock date record (UTC). Only used for event snapshots; the
/// interlock never schedules against it. `valid` is false when the host has
/// no trustworthy wall clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UtcStamp {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub valid: bool,
}

impl UtcStamp {
    pub const SIZE: usize = 8;

    pub fn invalid() -> Self {
        Self {
            year: 0,
            month: 0,
            day: 0,
            hour: 0,
            minute: 0,
            second: 0,
            valid: false,
        }
    }

    pub fn to_bytes(&self, buf: &mut [u8]) -> AsiResult<()> {
        if buf.len() < Self::SIZE {
            return Err(AsiError::WireFormat);
        }
        buf[0..2].copy_from_slice(&self.year.to_be_bytes());
        buf[2] = self.month;
        buf[3] = self.day;
        buf[4] = self.hour;
        buf[5] = self.minute;
        buf[6] = self.second;
        buf[7] = self.valid as u8;
        Ok(())
    }

    pub fn from_bytes(buf: &[u8]) -> AsiResult<Self> {
        if buf.len() < Self::SIZE {
            return Err(AsiError::WireFormat);
        }
        Ok(Self {
            year: u16::from_be_bytes([buf[0], buf[1]]),
            month: buf[2],
            day: buf[3],
            hour: buf[4],
            minute: buf[5],
            second: buf[6],
            valid: buf[7] != 0,
        })
    }
}

impl core::fmt::Display for UtcStamp {
    /// ISO-like form for the event log. Invalid stamps end in '?' so a log
    /// reader never mistakes them for real time.
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}{}",
            self.year,
            self.month,
            self.day,
            self.hour,
            self.minute,
            self.second,
            if self.valid { "Z" } else { "?" }
        )
    }
}
