#![no_std]
#![forbid(unsafe_code)]

use asi_core::TestVerdict;

pub const PATTERN_ALT_A: u32 = 0xAAAA_AAAA;
pub const PATTERN_ALT_5: u32 = 0x5555_5555;
pub const MARCH_ZERO: u32 = 0x0000_0000;
pub const MARCH_ONES: u32 = 0xFFFF_FFFF;

/// Known probe constant for the CRC word test, serialized big-endian.
pub const CRC_PROBE_WORD: u32 = 0xFA56_7812;

/// A test passes iff the mismatch count equals this exactly.
pub const MISMATCH_THRESHOLD: usize = 0;

/// Isolated single-word store. `black_box` pins the cell so the optimizer
/// cannot coalesce the ladder into one final write.
#[inline(never)]
fn write_word(cell: &mut u32, value: u32) {
    *core::hint::black_box(cell) = value;
}

/// Isolated single-word load; forces a real re-read after each store.
#[inline(never)]
fn read_word(cell: &u32) -> u32 {
    *core::hint::black_box(cell)
}

/// Write/read/compare `ladder` over every word, restoring original content
/// before moving on. Returns the mismatch count.
fn sweep(block: &mut [u32], ladder: &[u32]) -> usize {
    let mut mismatches = 0;
    for cell in block.iter_mut() {
        let saved = read_word(cell);
        for &value in ladder {
            write_word(cell, value);
            if read_word(cell) != value {
                mismatches += 1;
            }
        }
        write_word(cell, saved);
    }
    mismatches
}

fn verdict(mismatches: usize) -> TestVerdict {
    if mismatches == MISMATCH_THRESHOLD {
        TestVerdict::Passed
    } else {
        TestVerdict::Failed
    }
}

/// Alternating-bit test: AA.., 55.., AA.. per word.
pub fn pattern_test(block: &mut [u32]) -> TestVerdict {
    verdict(sweep(block, &[PATTERN_ALT_A, PATTERN_ALT_5, PATTERN_ALT_A]))
}

/// March ladder: 00.., FF.., 00.., FF.. per word.
pub fn march_test(block: &mut [u32]) -> TestVerdict {
    verdict(sweep(
        block,
        &[MARCH_ZERO, MARCH_ONES, MARCH_ZERO, MARCH_ONES],
    ))
}

/// CRC-16/CCITT-FALSE (poly 0x1021, init 0xFFFF, no reflect, no xorout).
pub fn crc16_ccitt(data: &[u8]) -> u16 {
    let mut crc: u16 = 0xFFFF;
    for &byte in data {
        crc ^= (byte as u16) << 8;
        for _ in 0..8 {
            if crc & 0x8000 != 0 {
                crc = (crc << 1) ^ 0x1021;
            } else {
                crc <<= 1;
            }
        }
    }
    crc
}

/// Word-integrity test through a CRC witness: write the probe constant,
/// read back, and require the read-back CRC to match the precomputed one.
pub fn crc_test(block: &mut [u32]) -> TestVerdict {
    let expected = crc16_ccitt(&CRC_PROBE_WORD.to_be_bytes());
    let mut mismatches = 0;
    for cell in block.iter_mut() {
        let saved = read_word(cell);
        write_word(cell, CRC_PROBE_WORD);
        let echoed = read_word(cell);
        if crc16_ccitt(&echoed.to_be_bytes()) != expected {
            mismatches += 1;
        }
        write_word(cell, saved);
    }
    verdict(mismatches)
}

/// Per-subtest verdicts for one battery run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemTestReport {
    pub pattern: TestVerdict,
    pub march: TestVerdict,
    pub crc: TestVerdict,
}

impl MemTestReport {
    pub fn verdict(&self) -> TestVerdict {
        if self.pattern == TestVerdict::Passed
            && self.march == TestVerdict::Passed
            && self.crc == TestVerdict::Passed
        {
            TestVerdict::Passed
        } else {
            TestVerdict::Failed
        }
    }
}

/// Pattern, march, CRC in order over the same block.
pub fn run_battery(block: &mut [u32]) -> MemTestReport {
    MemTestReport {
        pattern: pattern_test(block),
        march: march_test(block),
        crc: crc_test(block),
    }
}
