//! Lifecycle state machine.
//!
//! Owns the ASI state slot: Initial, Startup-Test, Normal-Operation and
//! the latching Safe-State. Also owns the retention layer, so persisted
//! state, start-up test results and the init flag all pass through here.

use std::sync::Arc;

use asi_core::{
    AsiState, EventId, Flag, Notification, NotifyChannel, NotifyKind, Reading, SutResults,
};
use asi_hal::{AsiClock, RetainSlot, Retention};
use asi_time::UtcStamp;
use log::{error, info, warn};

use crate::itcom::{Itcom, QueuePush, StateMonitorRecord};
use crate::startup;

pub struct Lifecycle {
    itcom: Arc<Itcom>,
    clock: Arc<dyn AsiClock>,
    retention: Box<dyn Retention>,
    safe_entry_done: bool,
}

impl Lifecycle {
    /// Restore persisted lifecycle state and publish the boot state.
    ///
    /// A persisted Safe-State resumes directly (the latch survives power
    /// cycles); anything else boots through Initial. The init flag is
    /// preserved only if it was Active before.
    pub fn boot(itcom: Arc<Itcom>, clock: Arc<dyn AsiClock>, mut retention: Box<dyn Retention>) -> Self {
        let mut byte = [0u8; 1];
        let persisted = match retention.load(RetainSlot::AsiState, &mut byte) {
            Ok(n) if n >= 1 => AsiState::from_code(byte[0]),
            Ok(_) => None,
            Err(e) => {
                warn!("state slot unreadable: {}", e);
                None
            }
        };
        let start = match persisted {
            Some(AsiState::SafeState) => AsiState::SafeState,
            _ => AsiState::Initial,
        };

        let init = match retention.load(RetainSlot::InitFlag, &mut byte) {
            Ok(n) if n >= 1 => Flag::from_code(byte[0]).unwrap_or(Flag::Inactive),
            _ => Flag::Inactive,
        };

        if let Some(results) = load_sut_results(retention.as_mut()) {
            itcom.set_sut_results(results);
        }
        if let Some(stamp) = load_sut_stamp(retention.as_mut()) {
            itcom.set_sut_stamp(stamp);
        }

        itcom.set_asi_state(start);
        itcom.set_init_flag(init);
        itcom.set_state_monitor(StateMonitorRecord {
            expected: start,
            observed: start,
        });
        info!("lifecycle boot: state={:?} init={:?}", start, init);

        Self {
            itcom,
            clock,
            retention,
            safe_entry_done: false,
        }
    }

    /// Mark initialization finished. Called by the bootstrap once every
    /// component is constructed, before the periodic tasks start.
    pub fn complete_init(&mut self) {
        self.itcom.set_init_flag(Flag::Active);
        if let Err(e) = self
            .retention
            .store(RetainSlot::InitFlag, &[Flag::Active.code()])
        {
            error!("init flag retention failed: {}", e);
        }
        self.itcom
            .raise_event(EventId::InitComplete, self.clock.now_ms());
    }

    /// One lifecycle pass: state-monitor check, transition rules, entry
    /// actions, publication.
    pub fn tick(&mut self) {
        let current = self.itcom.asi_state();

        // 1. STATE MONITOR: the slot must still hold what we published.
        let record = self.itcom.state_monitor();
        if record.expected != current {
            warn!(
                "state slot mismatch: expected {:?}, observed {:?}",
                record.expected, current
            );
            self.itcom
                .raise_event(EventId::StateTransitionFault, self.clock.now_ms());
        }

        // 2. TRANSITION RULES
        let next = self.arbitrate(current);

        // 3. PUBLISH + PERSIST on change
        if next != current {
            info!("state {:?} -> {:?}", current, next);
            self.itcom.set_asi_state(next);
            if let Err(e) = self.retention.store(RetainSlot::AsiState, &[next.code()]) {
                error!("state retention failed: {}", e);
                self.itcom
                    .raise_event(EventId::EcuNonCriticalFail, self.clock.now_ms());
            }
        }

        // 4. ENTRY ACTION, idempotent per entry
        if next == AsiState::SafeState && !self.safe_entry_done {
            self.enter_safe_state();
        }

        self.itcom.set_state_monitor(StateMonitorRecord {
            expected: next,
            observed: next,
        });
    }

    /// The transition rules, in priority order. First match wins.
    fn arbitrate(&mut self, current: AsiState) -> AsiState {
        // Unconditional: critical fault or lost init always means Safe-State.
        if self.itcom.critical_fault() == Flag::Active
            || self.itcom.init_flag() == Flag::Inactive
        {
            return AsiState::SafeState;
        }
        match current {
            AsiState::Initial => AsiState::StartupTest,
            AsiState::StartupTest => {
                // Hold until both vehicle sources have reported at all.
                let now = self.clock.now_ms();
                let gear_fresh = matches!(self.itcom.gear_reading(now), Reading::Fresh(_));
                let speed_fresh = matches!(self.itcom.speed_reading(now), Reading::Fresh(_));
                if !gear_fresh || !speed_fresh {
                    return AsiState::StartupTest;
                }
                let results = startup::run(self.itcom.as_ref(), self.clock.as_ref());
                self.persist_sut(&results);
                AsiState::NormalOperation
            }
            AsiState::NormalOperation => AsiState::NormalOperation,
            AsiState::SafeState => AsiState::SafeState,
        }
    }

    /// Safe-State entry: notify the requester side, persist the latch.
    fn enter_safe_state(&mut self) {
        warn!(">>> entering safe state");
        let note = Notification::broadcast(NotifyKind::SafeStateEntered, NotifyChannel::Vam);
        if self.itcom.push_notification(note) != QueuePush::Queued {
            error!("notify queue full, safe-state notice lost");
        }
        if let Err(e) = self
            .retention
            .store(RetainSlot::AsiState, &[AsiState::SafeState.code()])
        {
            error!("safe-state retention failed: {}", e);
        }
        self.safe_entry_done = true;
    }

    fn persist_sut(&mut self, results: &SutResults) {
        let mut buf = [0u8; SutResults::SIZE];
        if results.to_bytes(&mut buf).is_ok() {
            if let Err(e) = self.retention.store(RetainSlot::SutResult, &buf) {
                error!("test result retention failed: {}", e);
            }
        }
        let stamp = self.itcom.sut_stamp();
        let mut sbuf = [0u8; UtcStamp::SIZE];
        if stamp.to_bytes(&mut sbuf).is_ok() {
            if let Err(e) = self.retention.store(RetainSlot::SutStamp, &sbuf) {
                error!("test stamp retention failed: {}", e);
            }
        }
    }
}

fn load_sut_results(retention: &mut dyn Retention) -> Option<SutResults> {
    let mut buf = [0u8; SutResults::SIZE];
    match retention.load(RetainSlot::SutResult, &mut buf) {
        Ok(n) if n >= SutResults::SIZE => SutResults::from_bytes(&buf).ok(),
        _ => None,
    }
}

fn load_sut_stamp(retention: &mut dyn Retention) -> Option<UtcStamp> {
    let mut buf = [0u8; UtcStamp::SIZE];
    match retention.load(RetainSlot::SutStamp, &mut buf) {
        Ok(n) if n >= UtcStamp::SIZE => UtcStamp::from_bytes(&buf).ok(),
        _ => None,
    }
}
