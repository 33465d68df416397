use clap::Parser;
use colored::Colorize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use asi_core::{
    AsiState, ADMISSION_PERIOD_MS, EVENT_LOG_MAX_BYTES, FAULT_PERIOD_MS, IO_PERIOD_MS,
    LIFECYCLE_PERIOD_MS, MONITOR_PERIOD_MS,
};
use asi_hal::{AsiClock, Retention};
use asi_kernel::{Approver, FaultManager, IoTask, Itcom, Lifecycle, StatusTask};
use asi_linux::sim::{SimBus, SimVam};
use asi_linux::{FileRetention, HostClock, RotatingEventLog};
use log::{info, warn};

#[derive(Parser)]
struct Cli {
    /// Directory for retained slots and the event log.
    #[arg(long, default_value = "./asi-data")]
    data_dir: PathBuf,
    /// Vehicle scenario: parked | drive | silent
    #[arg(long, default_value = "drive")]
    scenario: String,
    /// Stop after this many milliseconds (0 = run until Ctrl-C).
    #[arg(long, default_value_t = 15_000)]
    run_ms: u64,
    /// External reinitialization: wipe every retained slot first. The only
    /// way out of a persisted Safe State.
    #[arg(long)]
    reset: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    info!("{}", ">>> ASI ECU: AUTOMATOR SAFETY INTERLOCK <<<".bold());
    info!("Data dir: {}", cli.data_dir.display());

    let (bus, vam) = match cli.scenario.as_str() {
        "parked" => (SimBus::parked(u64::MAX), SimVam::quiet()),
        "drive" => (SimBus::drive_cycle(), SimVam::demo()),
        "silent" => (
            SimBus::drive_cycle().with_silence_after(5_000),
            SimVam::demo(),
        ),
        other => anyhow::bail!("unknown scenario '{}'", other),
    };

    let itcom = Arc::new(Itcom::new());
    let clock: Arc<dyn AsiClock> = Arc::new(HostClock::new());

    let mut boot_retention = FileRetention::new(&cli.data_dir)?;
    if cli.reset {
        warn!("{}", "external reinitialization: wiping retained slots".yellow());
        boot_retention
            .wipe()
            .map_err(|e| anyhow::anyhow!("slot wipe failed: {}", e))?;
    }
    let fault_retention = FileRetention::new(&cli.data_dir)?;
    let sink = RotatingEventLog::open(&cli.data_dir.join("events.log"), EVENT_LOG_MAX_BYTES)?;

    let mut lifecycle = Lifecycle::boot(itcom.clone(), clock.clone(), Box::new(boot_retention));
    let mut faults = FaultManager::new(
        itcom.clone(),
        clock.clone(),
        Box::new(fault_retention),
        Box::new(sink),
    );
    let mut status = StatusTask::new(itcom.clone(), clock.clone());
    let mut approver = Approver::new(itcom.clone(), clock.clone());
    let mut io = IoTask::new(itcom.clone(), clock.clone(), Box::new(bus), Box::new(vam));

    // Every component is constructed; declare init done before any task runs.
    lifecycle.complete_init();

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        warn!("Signal received. Stopping...");
        r.store(false, Ordering::SeqCst);
    })?;

    if cli.run_ms > 0 {
        let r = running.clone();
        let run_ms = cli.run_ms;
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(run_ms));
            r.store(false, Ordering::SeqCst);
        });
    }

    info!(
        "Interlock active ({} scenario). Press Ctrl-C to stop.",
        cli.scenario
    );

    let mut handles = Vec::new();
    {
        let r = running.clone();
        handles.push(thread::spawn(move || {
            while r.load(Ordering::SeqCst) {
                io.tick();
                thread::sleep(Duration::from_millis(IO_PERIOD_MS));
            }
        }));
    }
    {
        let r = running.clone();
        handles.push(thread::spawn(move || {
            while r.load(Ordering::SeqCst) {
                status.tick();
                thread::sleep(Duration::from_millis(MONITOR_PERIOD_MS));
            }
        }));
    }
    {
        let r = running.clone();
        handles.push(thread::spawn(move || {
            while r.load(Ordering::SeqCst) {
                approver.tick();
                thread::sleep(Duration::from_millis(ADMISSION_PERIOD_MS));
            }
        }));
    }
    {
        let r = running.clone();
        handles.push(thread::spawn(move || {
            while r.load(Ordering::SeqCst) {
                lifecycle.tick();
                thread::sleep(Duration::from_millis(LIFECYCLE_PERIOD_MS));
            }
        }));
    }
    {
        let r = running.clone();
        handles.push(thread::spawn(move || {
            while r.load(Ordering::SeqCst) {
                faults.tick();
                thread::sleep(Duration::from_millis(FAULT_PERIOD_MS));
            }
            // Clean stop keeps the occurrence counters.
            faults.checkpoint_now();
        }));
    }

    for handle in handles {
        let _ = handle.join();
    }

    let state = itcom.asi_state();
    let line = format!("final state: {:?}", state);
    if state == AsiState::SafeState {
        info!("{}", line.red().bold());
    } else {
        info!("{}", line.green());
    }
    Ok(())
}
