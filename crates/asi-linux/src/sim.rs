//! Scripted vehicle links for host runs.
//!
//! [`SimBus`] replays a gear/speed script against wall time; [`SimVam`]
//! releases canned automation requests at their due times and prints
//! everything the interlock sends back.

use std::collections::VecDeque;
use std::time::Instant;

use asi_core::{AsiError, AsiResult, Gear, Notification, ProcessMsg};
use asi_hal::{VamLink, VehicleBus};
use log::info;
use rand::Rng;

/// Bus frame cadence. One new sample per signal per frame.
const FRAME_MS: u64 = 20;

/// One stretch of the drive script: hold `gear`/`speed` until `until_ms`
/// of elapsed bus time.
#[derive(Debug, Clone, Copy)]
pub struct BusPhase {
    pub until_ms: u64,
    pub gear: Gear,
    pub speed: f32,
}

pub struct SimBus {
    start: Instant,
    phases: Vec<BusPhase>,
    silent_after_ms: Option<u64>,
    last_gear_ms: Option<u64>,
    last_speed_ms: Option<u64>,
    jitter: bool,
}

impl SimBus {
    pub fn new(phases: Vec<BusPhase>) -> Self {
        Self {
            start: Instant::now(),
            phases,
            silent_after_ms: None,
            last_gear_ms: None,
            last_speed_ms: None,
            jitter: true,
        }
    }

    /// Parked and standing for the whole run.
    pub fn parked(run_ms: u64) -> Self {
        Self::new(vec![BusPhase {
            until_ms: run_ms,
            gear: Gear::Park,
            speed: 0.0,
        }])
    }

    /// Park, pull away, cruise, come back to a stand and re-park.
    pub fn drive_cycle() -> Self {
        Self::new(vec![
            BusPhase {
                until_ms: 3_000,
                gear: Gear::Park,
                speed: 0.0,
            },
            BusPhase {
                until_ms: 4_000,
                gear: Gear::Drive,
                speed: 2.5,
            },
            BusPhase {
                until_ms: 9_000,
                gear: Gear::Drive,
                speed: 13.9,
            },
            BusPhase {
                until_ms: 10_000,
                gear: Gear::Drive,
                speed: 0.8,
            },
            BusPhase {
                until_ms: u64::MAX,
                gear: Gear::Park,
                speed: 0.0,
            },
        ])
    }

    /// Feed goes dead at `at_ms`; both signals stop arriving.
    pub fn with_silence_after(mut self, at_ms: u64) -> Self {
        self.silent_after_ms = Some(at_ms);
        self
    }

    pub fn without_jitter(mut self) -> Self {
        self.jitter = false;
        self
    }

    fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    fn phase_at(&self, t: u64) -> Option<&BusPhase> {
        if let Some(quiet) = self.silent_after_ms {
            if t >= quiet {
                return None;
            }
        }
        self.phases
            .iter()
            .find(|p| t < p.until_ms)
            .or(self.phases.last())
    }
}

impl VehicleBus for SimBus {
    fn poll_gear(&mut self) -> nb::Result<Gear, AsiError> {
        let t = self.elapsed_ms();
        let Some(phase) = self.phase_at(t).copied() else {
            return Err(nb::Error::WouldBlock);
        };
        let due = match self.last_gear_ms {
            None => true,
            Some(prev) => t.saturating_sub(prev) >= FRAME_MS,
        };
        if !due {
            return Err(nb::Error::WouldBlock);
        }
        self.last_gear_ms = Some(t);
        Ok(phase.gear)
    }

    fn poll_speed(&mut self) -> nb::Result<f32, AsiError> {
        let t = self.elapsed_ms();
        let Some(phase) = self.phase_at(t).copied() else {
            return Err(nb::Error::WouldBlock);
        };
        let due = match self.last_speed_ms {
            None => true,
            Some(prev) => t.saturating_sub(prev) >= FRAME_MS,
        };
        if !due {
            return Err(nb::Error::WouldBlock);
        }
        self.last_speed_ms = Some(t);
        // Sensor wobble, well inside the standstill margin.
        let wobble = if self.jitter {
            rand::thread_rng().gen_range(-0.02f32..0.02)
        } else {
            0.0
        };
        Ok(phase.speed + wobble)
    }
}

fn req(id: u16, seq: u16, payload: &[u8]) -> Option<ProcessMsg> {
    ProcessMsg::new(id, seq, payload).ok()
}

/// Scripted requester side.
pub struct SimVam {
    start: Instant,
    script: VecDeque<(u64, ProcessMsg)>,
}

impl SimVam {
    pub fn new(mut script: Vec<(u64, ProcessMsg)>) -> Self {
        script.sort_by_key(|(at, _)| *at);
        Self {
            start: Instant::now(),
            script: script.into(),
        }
    }

    /// No requests at all; the interlock just idles.
    pub fn quiet() -> Self {
        Self::new(Vec::new())
    }

    /// The demo mix: a valid setpoint, an unknown action, an out-of-range
    /// payload, and park-gated requests timed to land both parked and
    /// driving (against [`SimBus::drive_cycle`]).
    pub fn demo() -> Self {
        let entries = [
            (2_500, req(0x0001, 1, &[0x40])),
            (2_700, req(0x0003, 2, &[0x10])),
            (3_050, req(0x0BAD, 3, &[0x01])),
            (3_400, req(0x0000, 4, &[0x09])),
            (6_000, req(0x0003, 5, &[0x10])),
            (8_000, req(0x0009, 6, &[0x10, 0x27, 0x01, 0x00])),
            (9_500, req(0x0007, 7, &[0x01])),
            (11_500, req(0x000A, 8, &[0x7F])),
        ];
        Self::new(
            entries
                .into_iter()
                .filter_map(|(at, m)| m.map(|msg| (at, msg)))
                .collect(),
        )
    }
}

impl VamLink for SimVam {
    fn poll_request(&mut self) -> nb::Result<ProcessMsg, AsiError> {
        let t = self.start.elapsed().as_millis() as u64;
        let due = match self.script.front() {
            Some((due, _)) => *due,
            None => return Err(nb::Error::WouldBlock),
        };
        if due > t {
            return Err(nb::Error::WouldBlock);
        }
        match self.script.pop_front() {
            Some((_, msg)) => Ok(msg),
            None => Err(nb::Error::WouldBlock),
        }
    }

    fn push_notification(&mut self, note: &Notification) -> AsiResult<()> {
        info!(
            "[VAM] notice {:?} via {:?} ref=0x{:04X}/{}",
            note.kind, note.channel, note.msg_id, note.seq
        );
        Ok(())
    }

    fn push_approved(&mut self, msg: &ProcessMsg) -> AsiResult<()> {
        info!(
            "[VAM] actuating 0x{:04X} seq={} payload={:02X?}",
            msg.msg_id,
            msg.seq,
            msg.bytes()
        );
        Ok(())
    }
}
