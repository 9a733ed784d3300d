//! Repeated execution of a target with memory sampling and output capture.
//!
//! Memory is read for the whole process, not for the target alone: anything
//! else allocating while a measurement runs shows up in the samples too.

use std::io::{self, Read, Write};
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use gag::BufferRedirect;
use parking_lot::{Mutex, ReentrantMutex};
use sysinfo::{Pid, System};

use crate::config::BenchConfig;
use crate::errors::{DefbenchError, Result};
use crate::types::CallOutcome;

const BYTES_PER_MIB: f64 = 1024.0 * 1024.0;

/// Held for the whole redirect -> execute -> restore sequence. Reentrant so a
/// measurement started from inside a target fails on the redirect instead of
/// deadlocking.
static CAPTURE_LOCK: ReentrantMutex<()> = parking_lot::const_reentrant_mutex(());

/// Source of whole-process memory readings.
pub trait MemoryProbe: Sync {
    /// Current resident memory of the process, in MiB.
    fn sample_mib(&self) -> Result<f64>;
}

/// Reads the resident set size of the current process through `sysinfo`.
pub struct SysinfoProbe {
    pid: Pid,
    system: Mutex<System>,
}

impl SysinfoProbe {
    pub fn new() -> Result<Self> {
        let pid = sysinfo::get_current_pid().map_err(|e| DefbenchError::MemoryProbe(e.to_string()))?;
        Ok(Self {
            pid,
            system: Mutex::new(System::new()),
        })
    }
}

impl MemoryProbe for SysinfoProbe {
    fn sample_mib(&self) -> Result<f64> {
        let mut system = self.system.lock();
        if !system.refresh_process(self.pid) {
            return Err(DefbenchError::MemoryProbe(format!(
                "process {} not found",
                self.pid
            )));
        }
        let bytes = system
            .process(self.pid)
            .map(|p| p.memory())
            .ok_or_else(|| DefbenchError::MemoryProbe(format!("process {} not found", self.pid)))?;
        Ok(bytes as f64 / BYTES_PER_MIB)
    }
}

/// Raw result of one sampler invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    /// Wall-clock time for all repeats combined.
    pub total_elapsed: Duration,
    /// Whole-process memory readings in MiB, baseline first.
    pub memory: Vec<f64>,
    pub stdout: String,
    pub stderr: String,
    pub started_at: DateTime<Utc>,
}

pub struct Sampler<P = SysinfoProbe> {
    probe: P,
    interval: Duration,
    capture_stderr: bool,
}

impl Sampler<SysinfoProbe> {
    /// Fails with `InvalidConfig` on settings that cannot drive a sampler,
    /// such as a zero sampling interval.
    pub fn from_config(config: &BenchConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::with_probe(SysinfoProbe::new()?, config.sample_interval())
            .capture_stderr(config.capture_stderr))
    }
}

impl<P: MemoryProbe> Sampler<P> {
    pub fn with_probe(probe: P, interval: Duration) -> Self {
        Self {
            probe,
            interval,
            capture_stderr: true,
        }
    }

    pub fn capture_stderr(mut self, enabled: bool) -> Self {
        self.capture_stderr = enabled;
        self
    }

    /// Invokes `target` `repeat` times in sequence on the calling thread.
    ///
    /// Stdout (and stderr, if enabled) is redirected for the duration and
    /// restored on every exit path. A failing repeat stops the run and the
    /// failure is returned as `TargetInvocation` with `label` as the name.
    pub fn measure<F>(&self, label: &str, mut target: F, repeat: usize) -> Result<Measurement>
    where
        F: FnMut() -> CallOutcome,
    {
        if repeat == 0 {
            return Err(DefbenchError::InvalidRepeatCount);
        }

        let _exclusive = CAPTURE_LOCK.lock();
        tracing::debug!(target_name = label, repeat, "starting measurement");

        let started_at = Utc::now();
        let baseline = self.probe.sample_mib()?;
        let capture = OutputCapture::start(self.capture_stderr)?;

        let (stop_tx, stop_rx) = mpsc::channel();
        let (run, background) = thread::scope(|scope| {
            let sampler = scope.spawn(|| sample_until_stopped(&self.probe, self.interval, stop_rx));
            let run = run_repeated(&mut target, repeat);
            let _ = stop_tx.send(());
            let background = sampler.join().unwrap_or_default();
            (run, background)
        });
        let BackgroundSamples { samples, skipped } = background;

        let total_elapsed = match run {
            Ok(elapsed) => elapsed,
            Err(message) => {
                drop(capture);
                warn_skipped(label, skipped);
                tracing::debug!(target_name = label, %message, "target failed");
                return Err(DefbenchError::TargetInvocation {
                    name: label.to_string(),
                    message,
                });
            }
        };
        let (stdout, stderr) = capture.finish()?;
        warn_skipped(label, skipped);

        let mut memory = Vec::with_capacity(samples.len() + 2);
        memory.push(baseline);
        memory.extend(samples);
        memory.push(self.probe.sample_mib()?);

        tracing::debug!(
            target_name = label,
            elapsed = ?total_elapsed,
            samples = memory.len(),
            "measurement finished"
        );

        Ok(Measurement {
            total_elapsed,
            memory,
            stdout,
            stderr,
            started_at,
        })
    }
}

fn run_repeated<F>(target: &mut F, repeat: usize) -> std::result::Result<Duration, String>
where
    F: FnMut() -> CallOutcome,
{
    let start = Instant::now();
    for _ in 0..repeat {
        match panic::catch_unwind(AssertUnwindSafe(&mut *target)) {
            Ok(outcome) => outcome?,
            Err(payload) => return Err(panic_message(payload.as_ref())),
        }
    }
    Ok(start.elapsed())
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {}", s)
    } else {
        "panicked".to_string()
    }
}

#[derive(Debug, Default)]
struct BackgroundSamples {
    samples: Vec<f64>,
    skipped: usize,
}

// Runs while the output streams are redirected, so failures are only counted
// here and reported by the caller once the streams are back.
fn sample_until_stopped<P: MemoryProbe>(
    probe: &P,
    interval: Duration,
    stop: Receiver<()>,
) -> BackgroundSamples {
    let mut background = BackgroundSamples::default();
    loop {
        match probe.sample_mib() {
            Ok(mib) => background.samples.push(mib),
            Err(_) => background.skipped += 1,
        }
        match stop.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) => continue,
            _ => break,
        }
    }
    background
}

fn warn_skipped(label: &str, skipped: usize) {
    if skipped > 0 {
        tracing::warn!(target_name = label, skipped, "skipped memory samples");
    }
}

/// Redirects stdout/stderr into buffers; dropping it restores both streams.
struct OutputCapture {
    stdout: BufferRedirect,
    stderr: Option<BufferRedirect>,
}

impl OutputCapture {
    fn start(capture_stderr: bool) -> Result<Self> {
        io::stdout().flush().map_err(DefbenchError::OutputCapture)?;
        let stdout = BufferRedirect::stdout().map_err(DefbenchError::OutputCapture)?;
        let stderr = if capture_stderr {
            Some(BufferRedirect::stderr().map_err(DefbenchError::OutputCapture)?)
        } else {
            None
        };
        Ok(Self { stdout, stderr })
    }

    /// Reads both buffers. Bytes that are not UTF-8 are replaced, never an
    /// error: a finished run is kept whatever the target printed.
    fn finish(mut self) -> Result<(String, String)> {
        io::stdout().flush().map_err(DefbenchError::OutputCapture)?;
        let stdout = read_lossy(&mut self.stdout)?;
        let stderr = match self.stderr.as_mut() {
            Some(buf) => read_lossy(buf)?,
            None => String::new(),
        };
        Ok((stdout, stderr))
    }
}

fn read_lossy(buf: &mut BufferRedirect) -> Result<String> {
    let mut bytes = Vec::new();
    buf.read_to_end(&mut bytes)
        .map_err(DefbenchError::OutputCapture)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

impl Drop for OutputCapture {
    fn drop(&mut self) {
        // Buffered text written by the target must land in the redirect,
        // not on the restored stream.
        let _ = io::stdout().flush();
    }
}
