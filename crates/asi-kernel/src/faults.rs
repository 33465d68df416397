//! Fault manager.
//!
//! Drains the event queue one event per pass and runs the three-stage
//! record pipeline: snapshot capture, log append, counter commit. Each
//! stage runs against its own budget; a blown budget raises an overrun
//! event but never aborts the record. Critical events flip the shared
//! critical-fault flag only after their record is safely captured.

use std::sync::Arc;

use asi_core::{
    classify, decode_counters, encode_counters, EventId, Flag, Gear, Notification, Severity,
    COUNTER_RECORD_SIZE, FM_CHECKPOINT_MS, FM_EVENT_WAIT_MS, FM_STAGE_BUDGET_MS,
};
use asi_hal::{AsiClock, EventSink, RetainSlot, Retention};
use asi_time::{Stopwatch, UtcStamp};
use log::{error, warn};

use crate::itcom::{Itcom, PendingEvent, QueuePush, Snapshot};

pub struct FaultManager {
    itcom: Arc<Itcom>,
    clock: Arc<dyn AsiClock>,
    retention: Box<dyn Retention>,
    sink: Box<dyn EventSink>,
    counters: [u32; EventId::COUNT],
    checkpoint: Stopwatch,
    dirty: bool,
}

impl FaultManager {
    /// Restore persisted occurrence counters and start the checkpoint
    /// clock. A missing or short counter record starts from zero.
    pub fn new(
        itcom: Arc<Itcom>,
        clock: Arc<dyn AsiClock>,
        mut retention: Box<dyn Retention>,
        sink: Box<dyn EventSink>,
    ) -> Self {
        let mut buf = [0u8; COUNTER_RECORD_SIZE];
        let counters = match retention.load(RetainSlot::EventCounters, &mut buf) {
            Ok(n) if n >= COUNTER_RECORD_SIZE => {
                decode_counters(&buf).unwrap_or([0u32; EventId::COUNT])
            }
            Ok(_) => [0u32; EventId::COUNT],
            Err(e) => {
                warn!("counter slot unreadable: {}", e);
                [0u32; EventId::COUNT]
            }
        };
        let checkpoint = Stopwatch::started_at(clock.now_ms());
        Self {
            itcom,
            clock,
            retention,
            sink,
            counters,
            checkpoint,
            dirty: false,
        }
    }

    pub fn count(&self, id: EventId) -> u32 {
        self.counters[id.index()]
    }

    /// One fault pass: at most one event processed, then checkpoint
    /// housekeeping.
    pub fn tick(&mut self) {
        if let Some(ev) = self.itcom.pop_event_wait(FM_EVENT_WAIT_MS) {
            self.process(ev);
        }
        self.maybe_checkpoint();
    }

    fn process(&mut self, ev: PendingEvent) {
        let class = classify(ev.id);
        let occurrence = self.counters[ev.id.index()].saturating_add(1);

        // STAGE 1: SNAPSHOT
        let watch = Stopwatch::started_at(self.clock.now_ms());
        let snap = self.itcom.system_snapshot();
        let stamp = self.clock.utc_now();
        let snap_late = watch.over_budget(self.clock.now_ms(), FM_STAGE_BUDGET_MS);

        // STAGE 2: LOG APPEND
        let watch = Stopwatch::started_at(self.clock.now_ms());
        let line = format_record(&stamp, &ev, class.severity, occurrence, &snap, snap_late);
        if let Err(e) = self.sink.append(&line) {
            error!("event log append failed: {}", e);
        }
        let append_late = watch.over_budget(self.clock.now_ms(), FM_STAGE_BUDGET_MS);

        // STAGE 3: COUNTER COMMIT
        let watch = Stopwatch::started_at(self.clock.now_ms());
        self.counters[ev.id.index()] = occurrence;
        self.dirty = true;
        let count_late = watch.over_budget(self.clock.now_ms(), FM_STAGE_BUDGET_MS);

        if snap_late || append_late || count_late {
            warn!("fault pipeline over budget on {:?}", ev.id);
            self.itcom
                .raise_event(EventId::TaskOverrun, self.clock.now_ms());
        }

        // Escalation strictly after the record is captured and logged.
        if class.severity == Severity::Critical {
            self.itcom.set_critical_fault(Flag::Active);
        }

        if let Some((kind, channel)) = class.notify {
            let note = Notification::broadcast(kind, channel);
            if self.itcom.push_notification(note) != QueuePush::Queued {
                warn!("notify queue full, {:?} notice lost", kind);
            }
        }
    }

    fn maybe_checkpoint(&mut self) {
        if !self.dirty {
            return;
        }
        if self.checkpoint.elapsed_ms(self.clock.now_ms()) < FM_CHECKPOINT_MS {
            return;
        }
        self.checkpoint_now();
    }

    /// Persist the occurrence counters. Also called once on shutdown so a
    /// clean stop never loses counts.
    pub fn checkpoint_now(&mut self) {
        let mut buf = [0u8; COUNTER_RECORD_SIZE];
        if encode_counters(&self.counters, &mut buf).is_err() {
            return;
        }
        match self.retention.store(RetainSlot::EventCounters, &buf) {
            Ok(()) => {
                self.dirty = false;
                self.checkpoint = Stopwatch::started_at(self.clock.now_ms());
            }
            Err(e) => error!("counter checkpoint failed: {}", e),
        }
    }
}

fn gear_letter(gear: Option<Gear>) -> &'static str {
    match gear {
        Some(Gear::Park) => "P",
        Some(Gear::Reverse) => "R",
        Some(Gear::Neutral) => "N",
        Some(Gear::Drive) => "D",
        Some(Gear::Low) => "L",
        None => "?",
    }
}

/// One log record. Layout is fixed; the trailing marker flags a record
/// whose snapshot stage blew its budget.
fn format_record(
    stamp: &UtcStamp,
    ev: &PendingEvent,
    severity: Severity,
    occurrence: u32,
    snap: &Snapshot,
    late: bool,
) -> String {
    let speed = match snap.speed {
        Some(v) => format!("{:.2}", v),
        None => String::from("?"),
    };
    format!(
        "{} evt=0x{:04X} {:?} sev={:?} n={} spd={} gear={} state={:?}{}",
        stamp,
        ev.id.code(),
        ev.id,
        severity,
        occurrence,
        speed,
        gear_letter(snap.gear),
        snap.state,
        if late { " TIMED-OUT" } else { "" }
    )
}
