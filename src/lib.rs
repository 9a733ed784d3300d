//! Quick in-process benchmarks: run a function repeatedly and record its
//! average time, peak process memory and any output it printed.
//!
//! ```no_run
//! fn for_loop() {
//!     for i in 0..5 {
//!         std::hint::black_box(i);
//!     }
//! }
//!
//! let f = defbench::run(for_loop, None, None)?;
//! let f_1000 = defbench::run(for_loop, Some(1000), None)?;
//! let named = defbench::run(|| for_loop(), Some(500), Some("for test"))?;
//! println!("{f}\n{f_1000}\n{named}");
//!
//! let fors = defbench::history::global().get_where(|r| r.name().starts_with("for"));
//! println!("{} runs, avg {}s", fors.len(), defbench::history::global().average_time());
//! # Ok::<(), defbench::DefbenchError>(())
//! ```

use std::fmt::Display;
use std::sync::Arc;

pub mod config;
pub mod display;
pub mod errors;
pub mod history;
pub mod named;
pub mod record;
pub mod sampler;
pub mod types;
pub mod workloads;

pub use config::BenchConfig;
pub use errors::DefbenchError;
pub use history::History;
pub use named::NamedTest;
pub use record::TestRun;
pub use sampler::{Measurement, MemoryProbe, Sampler};
pub use types::CallOutcome;

use errors::Result;
use types::{ENTRY_DEFAULT_REPEAT, consume, function_label, resolve_name, settle};

/// Runs `target` `repeat` times (default [`ENTRY_DEFAULT_REPEAT`]) with
/// default settings.
///
/// The return value is ignored beyond keeping it from being optimized away;
/// use [`try_run`] when an `Err` should fail the run. The record is named
/// `name`, else the function's own name, else `<function>` (closures have no
/// name of their own). It is added to [`history::global`] before being
/// returned.
pub fn run<F, R>(target: F, repeat: Option<usize>, name: Option<&str>) -> Result<Arc<TestRun>>
where
    F: FnMut() -> R,
{
    let repeat = repeat.unwrap_or(ENTRY_DEFAULT_REPEAT);
    run_with(&BenchConfig::default(), target, Some(repeat), name)
}

/// Like [`run`], with explicit sampling settings; `config.default_repeat`
/// applies when `repeat` is `None`.
pub fn run_with<F, R>(
    config: &BenchConfig,
    mut target: F,
    repeat: Option<usize>,
    name: Option<&str>,
) -> Result<Arc<TestRun>>
where
    F: FnMut() -> R,
{
    measure_and_record::<F, _>(config, || consume(target()), repeat, name)
}

/// Like [`run`], for targets returning `Result`: the first `Err` stops the
/// run and comes back as [`DefbenchError::TargetInvocation`].
pub fn try_run<F, T, E>(target: F, repeat: Option<usize>, name: Option<&str>) -> Result<Arc<TestRun>>
where
    F: FnMut() -> std::result::Result<T, E>,
    E: Display,
{
    let repeat = repeat.unwrap_or(ENTRY_DEFAULT_REPEAT);
    try_run_with(&BenchConfig::default(), target, Some(repeat), name)
}

pub fn try_run_with<F, T, E>(
    config: &BenchConfig,
    mut target: F,
    repeat: Option<usize>,
    name: Option<&str>,
) -> Result<Arc<TestRun>>
where
    F: FnMut() -> std::result::Result<T, E>,
    E: Display,
{
    measure_and_record::<F, _>(config, || settle(target()), repeat, name)
}

// `F` is the caller's callable, used only for naming; `call` wraps it.
fn measure_and_record<F, C>(
    config: &BenchConfig,
    call: C,
    repeat: Option<usize>,
    name: Option<&str>,
) -> Result<Arc<TestRun>>
where
    C: FnMut() -> CallOutcome,
{
    let name = resolve_name(name, None, function_label::<F>());
    let repeat = repeat.unwrap_or(config.default_repeat);
    let sampler = Sampler::from_config(config)?;
    let measurement = sampler.measure(&name, call, repeat)?;
    TestRun::record(std::any::type_name::<F>(), name, repeat, measurement)
}
