use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use asi_core::{
    AsiState, EventId, Gear, NotifyChannel, NotifyKind, ParkFlag, PreCondition, ProcessMsg,
    Reading, APPROVED_QUEUE_CAP, EVENT_QUEUE_CAP,
};
use asi_hal::AsiClock;
use asi_kernel::{
    catalog, Admission, Approver, BoundedQueue, EventPush, Itcom, QueuePush, StatusTask,
};
use asi_time::UtcStamp;

// Mocks

struct TickClock {
    ms: AtomicU64,
}

impl TickClock {
    fn at(start_ms: u64) -> Self {
        Self {
            ms: AtomicU64::new(start_ms),
        }
    }

    fn advance(&self, ms: u64) {
        self.ms.fetch_add(ms, Ordering::SeqCst);
    }
}

impl AsiClock for TickClock {
    fn now_ms(&self) -> u32 {
        self.ms.load(Ordering::SeqCst) as u32
    }

    fn utc_now(&self) -> UtcStamp {
        UtcStamp {
            year: 2026,
            month: 1,
            day: 15,
            hour: 8,
            minute: 30,
            second: 0,
            valid: true,
        }
    }
}

fn req(id: u16, seq: u16, payload: &[u8]) -> ProcessMsg {
    ProcessMsg::new(id, seq, payload).unwrap()
}

/// Interlock already through its boot: Normal-Operation, vehicle parked.
fn normal_rig() -> (Arc<Itcom>, Arc<TickClock>, Approver) {
    let itcom = Arc::new(Itcom::new());
    let clock = Arc::new(TickClock::at(5_000));
    itcom.set_asi_state(AsiState::NormalOperation);
    itcom.set_park_flag(ParkFlag::Park);
    let approver = Approver::new(itcom.clone(), clock.clone());
    (itcom, clock, approver)
}

#[test]
fn test_catalog_shape() {
    assert_eq!(catalog::ACTION_CATALOG.len(), 12);

    let gated = catalog::find(0x0003).unwrap();
    assert_eq!(gated.precond, PreCondition::Park);
    assert_eq!((gated.lo, gated.hi), (0x00, 0x64));

    let wide = catalog::find(0x0009).unwrap();
    assert_eq!(wide.hi, 0xF_FFFF);

    assert!(catalog::find(0x07D0).is_some());
    assert!(catalog::find(0x0BAD).is_none());
    assert!(catalog::find(0xFFFF).is_none());

    // No duplicate ids, no inverted ranges
    for (i, a) in catalog::ACTION_CATALOG.iter().enumerate() {
        assert!(a.lo <= a.hi, "0x{:04X}", a.id);
        for b in &catalog::ACTION_CATALOG[i + 1..] {
            assert_ne!(a.id, b.id);
        }
    }
}

#[test]
fn test_valid_request_is_approved() {
    let (itcom, _clock, mut approver) = normal_rig();
    assert_eq!(itcom.push_request(req(0x0001, 1, &[0x50])), QueuePush::Queued);

    assert_eq!(approver.tick(), Some(Admission::Approved));

    let out = itcom.pop_approved().expect("approved queue has the request");
    assert_eq!(out.msg_id, 0x0001);
    assert_eq!(out.seq, 1);
    assert_eq!(itcom.event_backlog(), 0);
    assert!(itcom.pop_notification().is_none());
}

#[test]
fn test_unknown_action_rejected() {
    let (itcom, _clock, mut approver) = normal_rig();
    itcom.push_request(req(0x0BAD, 7, &[0x01]));

    assert_eq!(approver.tick(), Some(Admission::NotOnList));

    let ev = itcom.pop_event_wait(10).unwrap();
    assert_eq!(ev.id, EventId::ActionReqActionFault);

    let note = itcom.pop_notification().unwrap();
    assert_eq!(note.kind, NotifyKind::InvalidActionReq);
    assert_eq!(note.channel, NotifyChannel::Vam);
    assert_eq!((note.msg_id, note.seq), (0x0BAD, 7));

    assert!(itcom.pop_approved().is_none());
}

#[test]
fn test_out_of_range_rejected() {
    let (itcom, _clock, mut approver) = normal_rig();
    // 0x0000 takes 0..=4
    itcom.push_request(req(0x0000, 2, &[0x09]));

    assert_eq!(approver.tick(), Some(Admission::OutOfRange));
    assert_eq!(
        itcom.pop_event_wait(10).unwrap().id,
        EventId::ActionReqRangeFault
    );
    assert_eq!(
        itcom.pop_notification().unwrap().kind,
        NotifyKind::InvalidActionReq
    );
    assert!(itcom.pop_approved().is_none());
}

#[test]
fn test_park_gate_blocks_until_standstill() {
    let (itcom, _clock, mut approver) = normal_rig();
    itcom.set_park_flag(ParkFlag::NotPark);
    itcom.push_request(req(0x0003, 3, &[0x10]));

    assert_eq!(approver.tick(), Some(Admission::PrecondFailed));
    assert_eq!(
        itcom.pop_event_wait(10).unwrap().id,
        EventId::ActionReqPrecondFault
    );
    let note = itcom.pop_notification().unwrap();
    assert_eq!(note.kind, NotifyKind::PreconditionFail);
    assert_eq!((note.msg_id, note.seq), (0x0003, 3));

    // Same action goes through once the vehicle stands in Park
    itcom.set_park_flag(ParkFlag::Park);
    itcom.push_request(req(0x0003, 4, &[0x10]));
    assert_eq!(approver.tick(), Some(Admission::Approved));
    assert_eq!(itcom.pop_approved().unwrap().seq, 4);
}

#[test]
fn test_eight_byte_payload_checked_per_byte() {
    let (itcom, _clock, mut approver) = normal_rig();

    // 0x0000 range 0..=4: every byte inside
    itcom.push_request(req(0x0000, 1, &[0, 1, 2, 3, 4, 0, 1, 2]));
    assert_eq!(approver.tick(), Some(Admission::Approved));
    itcom.pop_approved().unwrap();

    // One byte out of range fails the whole request
    itcom.push_request(req(0x0000, 2, &[0, 1, 2, 3, 4, 0, 5, 2]));
    assert_eq!(approver.tick(), Some(Admission::OutOfRange));
}

#[test]
fn test_multibyte_values_decode_little_endian() {
    let (itcom, _clock, mut approver) = normal_rig();

    // 0x0001 takes 0x32..=0x64; LE u16 0x0050 is inside
    itcom.push_request(req(0x0001, 1, &[0x50, 0x00]));
    assert_eq!(approver.tick(), Some(Admission::Approved));
    itcom.pop_approved().unwrap();

    // 0x0100 decodes to 256, outside
    itcom.push_request(req(0x0001, 2, &[0x00, 0x01]));
    assert_eq!(approver.tick(), Some(Admission::OutOfRange));
    itcom.pop_event_wait(10).unwrap();

    // 0x0009 takes 0..=0xF_FFFF; 1_000_000 fits, 1_048_576 does not
    itcom.push_request(req(0x0009, 3, &1_000_000u32.to_le_bytes()));
    assert_eq!(approver.tick(), Some(Admission::Approved));
    itcom.pop_approved().unwrap();

    itcom.push_request(req(0x0009, 4, &1_048_576u32.to_le_bytes()));
    assert_eq!(approver.tick(), Some(Admission::OutOfRange));
}

#[test]
fn test_no_admission_outside_normal_operation() {
    let (itcom, _clock, mut approver) = normal_rig();
    itcom.set_asi_state(AsiState::StartupTest);
    itcom.push_request(req(0x0001, 1, &[0x50]));

    // Head stays queued, nothing processed
    assert_eq!(approver.tick(), None);
    assert_eq!(approver.tick(), None);
    assert_eq!(itcom.request_backlog(), 1);

    itcom.set_asi_state(AsiState::NormalOperation);
    assert_eq!(approver.tick(), Some(Admission::Approved));
    assert_eq!(itcom.request_backlog(), 0);
}

#[test]
fn test_congested_hand_off_sheds_and_raises_timeout() {
    let (itcom, _clock, mut approver) = normal_rig();
    let filler = req(0x0001, 99, &[0x50]);
    for _ in 0..APPROVED_QUEUE_CAP {
        assert_eq!(itcom.push_approved_wait(filler, 0), QueuePush::Queued);
    }

    itcom.push_request(req(0x0001, 1, &[0x50]));
    assert_eq!(approver.tick(), Some(Admission::Congested));

    assert_eq!(
        itcom.pop_event_wait(10).unwrap().id,
        EventId::ActionReqTimeout
    );
    // Shed, not re-queued; and no rejection notice for congestion
    assert_eq!(itcom.request_backlog(), 0);
    assert!(itcom.pop_notification().is_none());
}

#[test]
fn test_status_task_fuses_and_reports() {
    let itcom = Arc::new(Itcom::new());
    let clock = Arc::new(TickClock::at(10_000));
    let mut task = StatusTask::new(itcom.clone(), clock.clone());

    // Fresh parked standstill
    itcom.set_vehicle_gear(Gear::Park, clock.now_ms());
    itcom.set_vehicle_speed(0.05, clock.now_ms());
    task.tick();
    assert_eq!(itcom.park_flag(), ParkFlag::Park);
    assert_eq!(itcom.event_backlog(), 0);

    // Gear stuck in Park while the vehicle rolls
    itcom.set_vehicle_speed(4.0, clock.now_ms());
    task.tick();
    assert_eq!(itcom.park_flag(), ParkFlag::NotPark);
    assert_eq!(
        itcom.pop_event_wait(10).unwrap().id,
        EventId::VehicleStatusMismatch
    );

    // Undecodable speed
    itcom.set_vehicle_speed(f32::NAN, clock.now_ms());
    task.tick();
    assert_eq!(
        itcom.pop_event_wait(10).unwrap().id,
        EventId::VehicleStatusInvalid
    );

    // Feed dies: outcome degrades to stale, flag holds its last value
    clock.advance(500);
    task.tick();
    assert_eq!(
        itcom.pop_event_wait(10).unwrap().id,
        EventId::VehicleStatusError
    );
    assert_eq!(itcom.park_flag(), ParkFlag::NotPark);
}

#[test]
fn test_reading_freshness_boundary() {
    let itcom = Itcom::new();
    itcom.set_vehicle_gear(Gear::Park, 1_000);
    itcom.set_vehicle_speed(0.0, 1_000);

    // 200ms old is still fresh, 201ms is not
    assert_eq!(itcom.gear_reading(1_200), Reading::Fresh(Gear::Park));
    assert_eq!(itcom.gear_reading(1_201), Reading::Stale);
    assert_eq!(itcom.speed_reading(1_200), Reading::Fresh(0.0));
    assert_eq!(itcom.speed_reading(1_201), Reading::Stale);

    // Unwritten slots are stale from the start
    let blank = Itcom::new();
    assert_eq!(blank.gear_reading(0), Reading::Stale);
    assert_eq!(blank.speed_reading(0), Reading::Stale);
}

#[test]
fn test_event_queue_evicts_least_severe_only() {
    let itcom = Itcom::new();
    for _ in 0..EVENT_QUEUE_CAP {
        // Minor noise
        assert_eq!(itcom.raise_event(EventId::MsgCrcFault, 0), EventPush::Queued);
    }

    // Equal severity never evicts
    assert_eq!(
        itcom.raise_event(EventId::MsgTimeoutFault, 0),
        EventPush::Dropped
    );

    // Strictly greater severity takes the oldest least-severe slot
    assert_eq!(
        itcom.raise_event(EventId::RollingCounterFault, 1),
        EventPush::Queued
    );
    assert_eq!(itcom.event_backlog(), EVENT_QUEUE_CAP);

    let mut crc = 0;
    let mut rolling = 0;
    while let Some(ev) = itcom.pop_event_wait(1) {
        match ev.id {
            EventId::MsgCrcFault => crc += 1,
            EventId::RollingCounterFault => rolling += 1,
            other => panic!("unexpected {:?}", other),
        }
    }
    assert_eq!(crc, EVENT_QUEUE_CAP - 1);
    assert_eq!(rolling, 1);
}

#[test]
fn test_critical_event_displaces_normal() {
    let itcom = Itcom::new();
    for _ in 0..EVENT_QUEUE_CAP {
        itcom.raise_event(EventId::RollingCounterFault, 0);
    }
    assert_eq!(
        itcom.raise_event(EventId::EcuCriticalFail, 1),
        EventPush::Queued
    );
    assert_eq!(
        itcom.raise_event(EventId::VehicleStatusError, 2),
        EventPush::Dropped
    );
}

#[test]
fn test_bounded_queue_blocking_ends() {
    let q: Arc<BoundedQueue<u32>> = Arc::new(BoundedQueue::new(1));
    assert_eq!(q.try_push(1), QueuePush::Queued);
    assert_eq!(q.try_push(2), QueuePush::Full);
    assert_eq!(q.push_wait(2, 20), QueuePush::Timeout);

    assert_eq!(q.try_pop(), Some(1));
    assert_eq!(q.try_pop(), None);
    assert_eq!(q.pop_wait(20), None);

    // A consumer waiting on the far end unblocks the producer
    let q2 = q.clone();
    let handle = thread::spawn(move || {
        thread::sleep(Duration::from_millis(30));
        q2.try_push(7)
    });
    assert_eq!(q.pop_wait(1_000), Some(7));
    assert_eq!(handle.join().unwrap(), QueuePush::Queued);
}

#[test]
fn test_snapshot_is_raw_slot_content() {
    let itcom = Itcom::new();
    let snap = itcom.system_snapshot();
    assert_eq!(snap.gear, None);
    assert_eq!(snap.speed, None);
    assert_eq!(snap.state, AsiState::Initial);

    itcom.set_vehicle_gear(Gear::Drive, 100);
    itcom.set_vehicle_speed(13.9, 100);
    itcom.set_asi_state(AsiState::NormalOperation);
    let snap = itcom.system_snapshot();
    assert_eq!(snap.gear, Some(Gear::Drive));
    assert_eq!(snap.speed, Some(13.9));
    assert_eq!(snap.state, AsiState::NormalOperation);
}
