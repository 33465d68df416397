//! Inter-component mediator.
//!
//! Every cross-component handoff in the interlock goes through [`Itcom`]:
//! status slots written by one task and read by others, plus the four
//! bounded queues (integrity-checked requests, approved requests,
//! operator notifications, fault events). Components never hold
//! references to each other; they share an `Arc<Itcom>` and nothing else.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use asi_core::{
    classify, AsiState, EventId, Flag, Gear, Notification, ParkFlag, ProcessMsg, Reading,
    Severity, SutPhase, SutResults, PhaseResult, APPROVED_QUEUE_CAP, EVENT_QUEUE_CAP,
    INTEGRITY_QUEUE_CAP, NOTIFY_QUEUE_CAP, VEHICLE_STALE_MS,
};
use asi_time::{tick_elapsed, UtcStamp};

/// Outcome of a queue push.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueuePush {
    /// Item is in the queue.
    Queued,
    /// Queue stayed full past the caller's deadline.
    Timeout,
    /// Queue full and the caller did not want to wait.
    Full,
}

/// Outcome of raising a fault event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventPush {
    Queued,
    /// Queue full and nothing less severe to evict.
    Dropped,
}

/// A fault event waiting for the fault manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingEvent {
    pub id: EventId,
    pub severity: Severity,
    /// Monotonic tick at which the event was raised.
    pub raised_ms: u32,
}

/// Expected-vs-observed record for the state monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateMonitorRecord {
    pub expected: AsiState,
    pub observed: AsiState,
}

/// Consistent view of the status slots, taken under one lock hold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Snapshot {
    pub speed: Option<f32>,
    pub gear: Option<Gear>,
    pub state: AsiState,
}

/// A sensor sample plus the tick it arrived on.
#[derive(Debug, Clone, Copy)]
struct Sample<T> {
    value: T,
    stamp_ms: u32,
}

// Poisoning means a writer panicked mid-update. The slots are all plain
// copies, so the stored value is still the last complete write; carry on
// rather than wedge every other task.
fn guard<T>(lock: &Mutex<T>) -> MutexGuard<'_, T> {
    lock.lock().unwrap_or_else(|e| e.into_inner())
}

// [QUEUES] -----------------------------------------------------------------

/// Fixed-capacity FIFO with blocking and non-blocking ends.
pub struct BoundedQueue<T> {
    inner: Mutex<VecDeque<T>>,
    item: Condvar,
    space: Condvar,
    cap: usize,
}

impl<T> BoundedQueue<T> {
    pub fn new(cap: usize) -> Self {
        Self {
            inner: Mutex::new(VecDeque::with_capacity(cap)),
            item: Condvar::new(),
            space: Condvar::new(),
            cap,
        }
    }

    /// Push without waiting. `Full` leaves the item with the caller.
    pub fn try_push(&self, value: T) -> QueuePush {
        let mut q = guard(&self.inner);
        if q.len() >= self.cap {
            return QueuePush::Full;
        }
        q.push_back(value);
        self.item.notify_one();
        QueuePush::Queued
    }

    /// Push, waiting up to `timeout_ms` for space.
    pub fn push_wait(&self, value: T, timeout_ms: u32) -> QueuePush {
        let deadline = Instant::now() + Duration::from_millis(u64::from(timeout_ms));
        let mut q = guard(&self.inner);
        while q.len() >= self.cap {
            let now = Instant::now();
            if now >= deadline {
                return QueuePush::Timeout;
            }
            let (g, _) = self
                .space
                .wait_timeout(q, deadline - now)
                .unwrap_or_else(|e| e.into_inner());
            q = g;
        }
        q.push_back(value);
        self.item.notify_one();
        QueuePush::Queued
    }

    pub fn try_pop(&self) -> Option<T> {
        let mut q = guard(&self.inner);
        let item = q.pop_front();
        if item.is_some() {
            self.space.notify_one();
        }
        item
    }

    /// Pop, waiting up to `timeout_ms` for an item.
    pub fn pop_wait(&self, timeout_ms: u32) -> Option<T> {
        let deadline = Instant::now() + Duration::from_millis(u64::from(timeout_ms));
        let mut q = guard(&self.inner);
        while q.is_empty() {
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            let (g, _) = self
                .item
                .wait_timeout(q, deadline - now)
                .unwrap_or_else(|e| e.into_inner());
            q = g;
        }
        let item = q.pop_front();
        self.space.notify_one();
        item
    }

    pub fn len(&self) -> usize {
        guard(&self.inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Fault-event queue with severity-based eviction.
struct EventQueue {
    inner: Mutex<VecDeque<PendingEvent>>,
    item: Condvar,
    cap: usize,
}

impl EventQueue {
    fn new(cap: usize) -> Self {
        Self {
            inner: Mutex::new(VecDeque::with_capacity(cap)),
            item: Condvar::new(),
            cap,
        }
    }

    /// Admit `ev`, evicting the least-severe queued event if that event is
    /// strictly less severe than `ev`. Ties evict nothing.
    fn raise(&self, ev: PendingEvent) -> EventPush {
        let mut q = guard(&self.inner);
        if q.len() < self.cap {
            q.push_back(ev);
            self.item.notify_one();
            return EventPush::Queued;
        }
        // Full: find the oldest of the least-severe entries.
        let mut victim: Option<(usize, Severity)> = None;
        for (i, queued) in q.iter().enumerate() {
            match victim {
                Some((_, sev)) if queued.severity >= sev => {}
                _ => victim = Some((i, queued.severity)),
            }
        }
        match victim {
            Some((i, sev)) if ev.severity > sev => {
                let _ = q.remove(i);
                q.push_back(ev);
                self.item.notify_one();
                EventPush::Queued
            }
            _ => EventPush::Dropped,
        }
    }

    fn pop_wait(&self, timeout_ms: u32) -> Option<PendingEvent> {
        let deadline = Instant::now() + Duration::from_millis(u64::from(timeout_ms));
        let mut q = guard(&self.inner);
        while q.is_empty() {
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            let (g, _) = self
                .item
                .wait_timeout(q, deadline - now)
                .unwrap_or_else(|e| e.into_inner());
            q = g;
        }
        q.pop_front()
    }

    fn len(&self) -> usize {
        guard(&self.inner).len()
    }
}

// [STATUS SLOTS] -----------------------------------------------------------

struct Slots {
    asi_state: AsiState,
    init_flag: Flag,
    critical_fault: Flag,
    monitor: StateMonitorRecord,
    gear: Option<Sample<Gear>>,
    speed: Option<Sample<f32>>,
    park_flag: ParkFlag,
    sut_results: SutResults,
    sut_stamp: UtcStamp,
}

impl Slots {
    fn new() -> Self {
        Self {
            asi_state: AsiState::Initial,
            init_flag: Flag::Inactive,
            critical_fault: Flag::Inactive,
            monitor: StateMonitorRecord {
                expected: AsiState::Initial,
                observed: AsiState::Initial,
            },
            gear: None,
            speed: None,
            park_flag: ParkFlag::NotPark,
            sut_results: SutResults::empty(),
            sut_stamp: UtcStamp::invalid(),
        }
    }
}

/// The mediator itself. One instance per ECU, shared by every task.
pub struct Itcom {
    slots: Mutex<Slots>,
    integrity: BoundedQueue<ProcessMsg>,
    approved: BoundedQueue<ProcessMsg>,
    notify: BoundedQueue<Notification>,
    events: EventQueue,
}

impl Itcom {
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(Slots::new()),
            integrity: BoundedQueue::new(INTEGRITY_QUEUE_CAP),
            approved: BoundedQueue::new(APPROVED_QUEUE_CAP),
            notify: BoundedQueue::new(NOTIFY_QUEUE_CAP),
            events: EventQueue::new(EVENT_QUEUE_CAP),
        }
    }

    // [LIFECYCLE SLOTS] ----------------------------------------------------

    pub fn asi_state(&self) -> AsiState {
        guard(&self.slots).asi_state
    }

    pub fn set_asi_state(&self, state: AsiState) {
        guard(&self.slots).asi_state = state;
    }

    pub fn init_flag(&self) -> Flag {
        guard(&self.slots).init_flag
    }

    pub fn set_init_flag(&self, flag: Flag) {
        guard(&self.slots).init_flag = flag;
    }

    pub fn critical_fault(&self) -> Flag {
        guard(&self.slots).critical_fault
    }

    pub fn set_critical_fault(&self, flag: Flag) {
        guard(&self.slots).critical_fault = flag;
    }

    pub fn state_monitor(&self) -> StateMonitorRecord {
        guard(&self.slots).monitor
    }

    pub fn set_state_monitor(&self, record: StateMonitorRecord) {
        guard(&self.slots).monitor = record;
    }

    // [VEHICLE STATUS SLOTS] -----------------------------------------------

    pub fn set_vehicle_gear(&self, gear: Gear, now_ms: u32) {
        guard(&self.slots).gear = Some(Sample {
            value: gear,
            stamp_ms: now_ms,
        });
    }

    pub fn set_vehicle_speed(&self, speed: f32, now_ms: u32) {
        guard(&self.slots).speed = Some(Sample {
            value: speed,
            stamp_ms: now_ms,
        });
    }

    /// Gear slot with freshness judged against `now_ms`.
    pub fn gear_reading(&self, now_ms: u32) -> Reading<Gear> {
        match guard(&self.slots).gear {
            Some(s) if tick_elapsed(now_ms, s.stamp_ms) <= VEHICLE_STALE_MS => {
                Reading::Fresh(s.value)
            }
            _ => Reading::Stale,
        }
    }

    /// Speed slot with freshness judged against `now_ms`.
    pub fn speed_reading(&self, now_ms: u32) -> Reading<f32> {
        match guard(&self.slots).speed {
            Some(s) if tick_elapsed(now_ms, s.stamp_ms) <= VEHICLE_STALE_MS => {
                Reading::Fresh(s.value)
            }
            _ => Reading::Stale,
        }
    }

    pub fn park_flag(&self) -> ParkFlag {
        guard(&self.slots).park_flag
    }

    pub fn set_park_flag(&self, flag: ParkFlag) {
        guard(&self.slots).park_flag = flag;
    }

    // [START-UP TEST SLOTS] ------------------------------------------------

    pub fn sut_results(&self) -> SutResults {
        guard(&self.slots).sut_results
    }

    pub fn set_sut_results(&self, results: SutResults) {
        guard(&self.slots).sut_results = results;
    }

    /// Publish one phase row of the result matrix as soon as it is known.
    pub fn set_phase_results(&self, phase: SutPhase, result: PhaseResult) {
        *guard(&self.slots).sut_results.phase_mut(phase) = result;
    }

    pub fn sut_stamp(&self) -> UtcStamp {
        guard(&self.slots).sut_stamp
    }

    pub fn set_sut_stamp(&self, stamp: UtcStamp) {
        guard(&self.slots).sut_stamp = stamp;
    }

    /// One-lock-hold capture of the slots a fault record needs.
    pub fn system_snapshot(&self) -> Snapshot {
        let s = guard(&self.slots);
        Snapshot {
            speed: s.speed.as_ref().map(|v| v.value),
            gear: s.gear.as_ref().map(|v| v.value),
            state: s.asi_state,
        }
    }

    // [REQUEST PATH] -------------------------------------------------------

    /// Feed an integrity-checked request from the transport side.
    pub fn push_request(&self, msg: ProcessMsg) -> QueuePush {
        self.integrity.try_push(msg)
    }

    /// Hand the approver the next pending request, if any.
    pub fn pop_request(&self) -> Option<ProcessMsg> {
        self.integrity.try_pop()
    }

    pub fn request_backlog(&self) -> usize {
        self.integrity.len()
    }

    /// Queue an admitted request for actuation, waiting briefly for space.
    pub fn push_approved_wait(&self, msg: ProcessMsg, timeout_ms: u32) -> QueuePush {
        self.approved.push_wait(msg, timeout_ms)
    }

    pub fn pop_approved(&self) -> Option<ProcessMsg> {
        self.approved.try_pop()
    }

    // [NOTIFICATIONS] ------------------------------------------------------

    pub fn push_notification(&self, note: Notification) -> QueuePush {
        self.notify.try_push(note)
    }

    pub fn pop_notification(&self) -> Option<Notification> {
        self.notify.try_pop()
    }

    // [FAULT EVENTS] -------------------------------------------------------

    /// Record a fault event. Severity comes from the classification table;
    /// a full queue only admits the event by evicting something strictly
    /// less severe.
    pub fn raise_event(&self, id: EventId, now_ms: u32) -> EventPush {
        let ev = PendingEvent {
            id,
            severity: classify(id).severity,
            raised_ms: now_ms,
        };
        let outcome = self.events.raise(ev);
        if outcome == EventPush::Dropped {
            log::warn!("event queue full, dropping {:?}", id);
        }
        outcome
    }

    pub fn pop_event_wait(&self, timeout_ms: u32) -> Option<PendingEvent> {
        self.events.pop_wait(timeout_ms)
    }

    pub fn event_backlog(&self) -> usize {
        self.events.len()
    }
}

impl Default for Itcom {
    fn default() -> Self {
        Self::new()
    }
}
