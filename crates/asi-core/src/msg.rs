use crate::{AsiError, AsiResult};

/// Decoded automation request as handed over by the transport layer.
/// Integrity (CRC, rolling counter) is already verified upstream; the
/// payload stays raw because its interpretation depends on `len`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessMsg {
    pub msg_id: u16,
    pub seq: u16,
    pub len: u8,
    pub payload: [u8; 8],
}

impl ProcessMsg {
    pub const SIZE: usize = 13;

    pub fn new(msg_id: u16, seq: u16, bytes: &[u8]) -> AsiResult<Self> {
        if !matches!(bytes.len(), 1 | 2 | 4 | 8) {
            return Err(AsiError::WireFormat);
        }
        let mut payload = [0u8; 8];
        payload[..bytes.len()].copy_from_slice(bytes);
        Ok(Self {
            msg_id,
            seq,
            len: bytes.len() as u8,
            payload,
        })
    }

    /// Payload slice of declared length.
    pub fn bytes(&self) -> &[u8] {
        let len = (self.len as usize).min(8);
        &self.payload[..len]
    }

    /// Little-endian value decode for the 1/2/4-byte forms. The 8-byte form
    /// is eight independent byte values and has no single decode.
    pub fn value_le(&self) -> Option<u32> {
        match self.len {
            1 => Some(self.payload[0] as u32),
            2 => Some(u16::from_le_bytes([self.payload[0], self.payload[1]]) as u32),
            4 => Some(u32::from_le_bytes([
                self.payload[0],
                self.payload[1],
                self.payload[2],
                self.payload[3],
            ])),
            _ => None,
        }
    }

    pub fn to_bytes(&self, buf: &mut [u8]) -> AsiResult<()> {
        if buf.len() < Self::SIZE {
            return Err(AsiError::WireFormat);
        }
        buf[0..2].copy_from_slice(&self.msg_id.to_le_bytes());
        buf[2..4].copy_from_slice(&self.seq.to_le_bytes());
        buf[4] = self.len;
        buf[5..13].copy_from_slice(&self.payload);
        Ok(())
    }

    pub fn from_bytes(buf: &[u8]) -> AsiResult<Self> {
        if buf.len() < Self::SIZE {
            return Err(AsiError::WireFormat);
        }
        let len = buf[4];
        if !matches!(len, 1 | 2 | 4 | 8) {
            return Err(AsiError::WireFormat);
        }
        let mut payload = [0u8; 8];
        payload.copy_from_slice(&buf[5..13]);
        Ok(Self {
            msg_id: u16::from_le_bytes([buf[0], buf[1]]),
            seq: u16::from_le_bytes([buf[2], buf[3]]),
            len,
            payload,
        })
    }
}
