use asi_core::TestVerdict;
use asi_mem::{
    crc16_ccitt, crc_test, march_test, pattern_test, run_battery, MemTestReport, CRC_PROBE_WORD,
};

#[test]
fn test_battery_passes_on_healthy_ram() {
    let mut block = [0u32; 8];
    let report = run_battery(&mut block);
    assert_eq!(report.pattern, TestVerdict::Passed);
    assert_eq!(report.march, TestVerdict::Passed);
    assert_eq!(report.crc, TestVerdict::Passed);
    assert_eq!(report.verdict(), TestVerdict::Passed);
}

#[test]
fn test_block_content_restored() {
    // The battery is destructive per word but must put everything back
    let mut block = [0xDEAD_BEEFu32, 0x0123_4567, 0, u32::MAX, 42];
    let original = block;
    assert_eq!(pattern_test(&mut block), TestVerdict::Passed);
    assert_eq!(block, original);
    assert_eq!(march_test(&mut block), TestVerdict::Passed);
    assert_eq!(block, original);
    assert_eq!(crc_test(&mut block), TestVerdict::Passed);
    assert_eq!(block, original);
}

#[test]
fn test_minimum_block_size() {
    // Contract floor: five words
    let mut block = [0u32; 5];
    assert_eq!(run_battery(&mut block).verdict(), TestVerdict::Passed);
}

#[test]
fn test_crc_known_vectors() {
    // CRC-16/CCITT-FALSE check value
    assert_eq!(crc16_ccitt(b"123456789"), 0x29B1);
    assert_eq!(crc16_ccitt(&[]), 0xFFFF);
    // The probe constant hashes the same on every run
    assert_eq!(
        crc16_ccitt(&CRC_PROBE_WORD.to_be_bytes()),
        crc16_ccitt(&0xFA56_7812u32.to_be_bytes())
    );
}

#[test]
fn test_report_verdict_rolls_up() {
    let bad = MemTestReport {
        pattern: TestVerdict::Passed,
        march: TestVerdict::Failed,
        crc: TestVerdict::Passed,
    };
    assert_eq!(bad.verdict(), TestVerdict::Failed);

    let unfinished = MemTestReport {
        pattern: TestVerdict::Passed,
        march: TestVerdict::Passed,
        crc: TestVerdict::NotReached,
    };
    assert_eq!(unfinished.verdict(), TestVerdict::Failed);
}
