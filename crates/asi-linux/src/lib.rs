//! Linux host platform: wall/monotonic clocks, file-backed retention and
//! the rotating event log. The simulated vehicle links live in [`sim`].

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

use asi_core::{AsiError, AsiResult};
use asi_hal::{AsiClock, EventSink, RetainSlot, Retention};
use asi_time::UtcStamp;
use chrono::{Datelike, Timelike, Utc};

pub mod sim;

// [CLOCK] ------------------------------------------------------------------

/// Host clock: monotonic milliseconds since process start (wrapping) plus
/// the system UTC clock for snapshots.
pub struct HostClock(Instant);

impl HostClock {
    pub fn new() -> Self {
        Self(Instant::now())
    }
}

impl Default for HostClock {
    fn default() -> Self {
        Self::new()
    }
}

impl AsiClock for HostClock {
    fn now_ms(&self) -> u32 {
        (self.0.elapsed().as_millis() & 0xFFFF_FFFF) as u32
    }

    fn utc_now(&self) -> UtcStamp {
        let now = Utc::now();
        UtcStamp {
            year: now.year() as u16,
            month: now.month() as u8,
            day: now.day() as u8,
            hour: now.hour() as u8,
            minute: now.minute() as u8,
            second: now.second() as u8,
            valid: true,
        }
    }
}

// [RETENTION] --------------------------------------------------------------

/// One file per slot under a data directory. Every store is tmp-write,
/// fsync, atomic rename, parent-dir sync, so a crash mid-store leaves the
/// previous record intact.
pub struct FileRetention {
    root: PathBuf,
}

impl FileRetention {
    pub fn new(root: &Path) -> anyhow::Result<Self> {
        fs::create_dir_all(root)?;
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    fn slot_path(&self, slot: RetainSlot) -> PathBuf {
        self.root.join(format!("{}.bin", slot.name()))
    }
}

impl Retention for FileRetention {
    fn load(&mut self, slot: RetainSlot, buf: &mut [u8]) -> AsiResult<usize> {
        let path = self.slot_path(slot);
        if !path.exists() {
            return Ok(0);
        }
        let data = fs::read(&path).map_err(|_| AsiError::Retention)?;
        if data.len() > buf.len() {
            return Err(AsiError::Retention);
        }
        buf[..data.len()].copy_from_slice(&data);
        Ok(data.len())
    }

    fn store(&mut self, slot: RetainSlot, data: &[u8]) -> AsiResult<()> {
        let path = self.slot_path(slot);
        let tmp_path = path.with_extension("tmp");

        // 1. Write .tmp
        {
            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&tmp_path)
                .map_err(|_| AsiError::Retention)?;
            file.write_all(data).map_err(|_| AsiError::Retention)?;

            // 2. FSYNC before the rename makes the record durable
            file.sync_all().map_err(|_| AsiError::Retention)?;
        }

        // 3. Rename (atomic)
        fs::rename(tmp_path, path).map_err(|_| AsiError::Retention)?;

        // 4. Sync parent dir
        if let Ok(f) = File::open(&self.root) {
            let _ = f.sync_all();
        }

        Ok(())
    }

    fn wipe(&mut self) -> AsiResult<()> {
        for slot in RetainSlot::ALL {
            let path = self.slot_path(slot);
            if path.exists() {
                fs::remove_file(path).map_err(|_| AsiError::Retention)?;
            }
        }
        Ok(())
    }
}

// [EVENT LOG] --------------------------------------------------------------

/// Rotated generations kept next to the live log (`events.log.1` is the
/// newest rotation).
const LOG_KEEP: usize = 3;

/// Append-only event log with size-based rotation.
pub struct RotatingEventLog {
    path: PathBuf,
    file: File,
    written: u64,
    max_bytes: u64,
}

impl RotatingEventLog {
    pub fn open(path: &Path, max_bytes: u64) -> anyhow::Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new().append(true).create(true).open(path)?;
        let written = file.metadata()?.len();
        Ok(Self {
            path: path.to_path_buf(),
            file,
            written,
            max_bytes,
        })
    }

    fn rotated_path(&self, generation: usize) -> PathBuf {
        let mut os = self.path.clone().into_os_string();
        os.push(format!(".{}", generation));
        PathBuf::from(os)
    }

    /// Shift generations up by one and reopen a fresh live file.
    fn rotate(&mut self) -> std::io::Result<()> {
        self.file.flush()?;
        let oldest = self.rotated_path(LOG_KEEP);
        if oldest.exists() {
            fs::remove_file(&oldest)?;
        }
        for generation in (1..LOG_KEEP).rev() {
            let from = self.rotated_path(generation);
            if from.exists() {
                fs::rename(&from, self.rotated_path(generation + 1))?;
            }
        }
        fs::rename(&self.path, self.rotated_path(1))?;
        self.file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.path)?;
        self.written = 0;
        Ok(())
    }
}

impl EventSink for RotatingEventLog {
    fn append(&mut self, line: &str) -> AsiResult<()> {
        let projected = self.written + line.len() as u64 + 1;
        if projected > self.max_bytes && self.written > 0 {
            self.rotate().map_err(|_| AsiError::SinkFault)?;
        }
        writeln!(self.file, "{}", line).map_err(|_| AsiError::SinkFault)?;
        self.file.flush().map_err(|_| AsiError::SinkFault)?;
        self.written += line.len() as u64 + 1;
        Ok(())
    }
}
