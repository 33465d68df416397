use asi_core::{
    classify, decode_counters, encode_counters, AsiError, AsiState, EventId, Gear, NotifyChannel,
    NotifyKind, PreCondition, ProcessMsg, Severity, SutPhase, SutResults, TestVerdict,
    COUNTER_RECORD_SIZE,
};

#[test]
fn test_process_msg_roundtrip() {
    let msg = ProcessMsg::new(0x0003, 0x1234, &[0x10, 0x20]).unwrap();
    let mut buf = [0u8; ProcessMsg::SIZE];
    msg.to_bytes(&mut buf).unwrap();

    // Header fields are little-endian on the wire
    assert_eq!(&buf[0..2], &[0x03, 0x00]);
    assert_eq!(&buf[2..4], &[0x34, 0x12]);
    assert_eq!(buf[4], 2);

    let back = ProcessMsg::from_bytes(&buf).unwrap();
    assert_eq!(back, msg);
}

#[test]
fn test_process_msg_rejects_odd_lengths() {
    assert_eq!(
        ProcessMsg::new(0x0001, 1, &[1, 2, 3]).unwrap_err(),
        AsiError::WireFormat
    );
    assert!(ProcessMsg::new(0x0001, 1, &[]).is_err());
    assert!(ProcessMsg::new(0x0001, 1, &[0; 9]).is_err());

    // Declared length must be one of the four legal forms
    let mut buf = [0u8; ProcessMsg::SIZE];
    ProcessMsg::new(0x0001, 1, &[7]).unwrap().to_bytes(&mut buf).unwrap();
    buf[4] = 3;
    assert!(ProcessMsg::from_bytes(&buf).is_err());
}

#[test]
fn test_value_le_decode() {
    let one = ProcessMsg::new(0, 0, &[0x42]).unwrap();
    assert_eq!(one.value_le(), Some(0x42));

    let two = ProcessMsg::new(0, 0, &[0x34, 0x12]).unwrap();
    assert_eq!(two.value_le(), Some(0x1234));

    let four = ProcessMsg::new(0, 0, &[0x78, 0x56, 0x34, 0x12]).unwrap();
    assert_eq!(four.value_le(), Some(0x1234_5678));

    // The 8-byte form has no single value
    let eight = ProcessMsg::new(0, 0, &[1, 2, 3, 4, 5, 6, 7, 8]).unwrap();
    assert_eq!(eight.value_le(), None);
    assert_eq!(eight.bytes(), &[1, 2, 3, 4, 5, 6, 7, 8]);
}

#[test]
fn test_state_codes_are_stable() {
    assert_eq!(AsiState::Initial.code(), 0x00);
    assert_eq!(AsiState::StartupTest.code(), 0x01);
    assert_eq!(AsiState::NormalOperation.code(), 0x02);
    assert_eq!(AsiState::SafeState.code(), 0x03);
    assert_eq!(AsiState::from_code(0x03), Some(AsiState::SafeState));
    assert_eq!(AsiState::from_code(0x04), None);

    assert_eq!(Gear::from_code(0x00), Some(Gear::Park));
    assert_eq!(Gear::from_code(0x04), Some(Gear::Low));
    assert_eq!(Gear::from_code(0x05), None);
}

#[test]
fn test_precond_validity_is_constructor_presence() {
    assert_eq!(PreCondition::from_code(0x00), Some(PreCondition::None));
    assert_eq!(PreCondition::from_code(0x01), Some(PreCondition::Park));
    assert_eq!(PreCondition::from_code(0xEE), None);
    assert_eq!(PreCondition::from_code(0xFF), None);
}

#[test]
fn test_event_codes_dense_and_stable() {
    assert_eq!(EventId::MsgCrcFault.code(), 0x0001);
    assert_eq!(EventId::SutTerminated.code(), 0x0011);
    assert_eq!(EventId::StateTransitionFault.code(), 0x001A);
    assert_eq!(EventId::COUNT, 26);

    // Every code decodes back and indexes densely from zero
    for code in 1..=EventId::COUNT as u16 {
        let id = EventId::from_code(code).expect("contiguous code");
        assert_eq!(id.code(), code);
        assert_eq!(id.index(), (code - 1) as usize);
    }
    assert_eq!(EventId::from_code(0), None);
    assert_eq!(EventId::from_code(0x001B), None);
}

#[test]
fn test_classification_critical_set() {
    let critical = [
        EventId::StartupMemFault,
        EventId::LossOfComm,
        EventId::EcuCriticalFail,
        EventId::StateTransitionFault,
    ];
    for code in 1..=EventId::COUNT as u16 {
        let id = EventId::from_code(code).unwrap();
        let sev = classify(id).severity;
        if critical.contains(&id) {
            assert_eq!(sev, Severity::Critical, "{:?}", id);
        } else {
            assert_ne!(sev, Severity::Critical, "{:?}", id);
        }
    }
}

#[test]
fn test_classification_notify_entries() {
    // The only table-dispatched notice is the unfinished-test broadcast;
    // correlated rejections are sent at the raising site.
    for code in 1..=EventId::COUNT as u16 {
        let id = EventId::from_code(code).unwrap();
        let notify = classify(id).notify;
        if id == EventId::SutTerminated {
            assert_eq!(notify, Some((NotifyKind::SutUnfinished, NotifyChannel::Vam)));
        } else {
            assert_eq!(notify, None, "{:?}", id);
        }
    }
}

#[test]
fn test_severity_order_for_eviction() {
    assert!(Severity::Minor < Severity::Normal);
    assert!(Severity::Normal < Severity::Critical);
}

#[test]
fn test_counter_record_roundtrip() {
    let mut counters = [0u32; EventId::COUNT];
    counters[EventId::MsgCrcFault.index()] = 7;
    counters[EventId::StateTransitionFault.index()] = 0xDEAD_BEEF;

    let mut buf = [0u8; COUNTER_RECORD_SIZE];
    encode_counters(&counters, &mut buf).unwrap();
    assert_eq!(decode_counters(&buf).unwrap(), counters);

    let mut short = [0u8; COUNTER_RECORD_SIZE - 1];
    assert!(encode_counters(&counters, &mut short).is_err());
    assert!(decode_counters(&short).is_err());
}

#[test]
fn test_sut_results_roundtrip() {
    let mut results = SutResults::empty();
    assert_eq!(results.phase(SutPhase::ActionList).sub_count, 2);
    assert_eq!(results.phase(SutPhase::PrecondList).sub_count, 2);
    assert_eq!(results.phase(SutPhase::Memory).sub_count, 3);

    {
        let a = results.phase_mut(SutPhase::ActionList);
        a.sub[0] = TestVerdict::Passed;
        a.sub[1] = TestVerdict::Passed;
        a.complete = true;
        a.verdict = TestVerdict::Passed;
    }
    {
        let b = results.phase_mut(SutPhase::PrecondList);
        b.verdict = TestVerdict::Skipped;
    }
    results.skipped = 1;
    results.verdict = TestVerdict::Failed;

    let mut buf = [0u8; SutResults::SIZE];
    results.to_bytes(&mut buf).unwrap();
    let back = SutResults::from_bytes(&buf).unwrap();
    assert_eq!(back, results);

    // Corrupt verdict byte must not decode
    buf[5] = 0x09;
    assert!(SutResults::from_bytes(&buf).is_err());
}
