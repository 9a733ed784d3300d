use std::fmt::Display;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use crate::config::BenchConfig;
use crate::errors::{DefbenchError, Result};
use crate::history::History;
use crate::record::TestRun;
use crate::sampler::Sampler;
use crate::types::{CallOutcome, consume, function_label, resolve_name, settle};

/// A function bound to default benchmark settings, with its own history.
///
/// ```no_run
/// use defbench::NamedTest;
///
/// fn search_list() -> bool {
///     ["one", "two", "three"].contains(&"two")
/// }
///
/// let test = NamedTest::new(search_list).with_repeat(50);
/// let run = test.run(None, None)?;
/// assert_eq!(run.name(), "search_list");
/// assert_eq!(run.repeat(), 50);
/// # Ok::<(), defbench::DefbenchError>(())
/// ```
pub struct NamedTest<F> {
    target: Mutex<F>,
    function: &'static str,
    repeat: Option<usize>,
    name: Option<String>,
    config: BenchConfig,
    running: AtomicBool,
    history: History,
}

impl<F> NamedTest<F> {
    pub fn new(target: F) -> Self {
        Self {
            target: Mutex::new(target),
            function: std::any::type_name::<F>(),
            repeat: None,
            name: None,
            config: BenchConfig::default(),
            running: AtomicBool::new(false),
            history: History::new(),
        }
    }

    pub fn with_repeat(mut self, repeat: usize) -> Self {
        self.repeat = Some(repeat);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sampling settings; `default_repeat` becomes the last-resort repeat count.
    pub fn with_config(mut self, config: BenchConfig) -> Self {
        self.config = config;
        self
    }

    fn run_calls<C>(
        &self,
        repeat: Option<usize>,
        name: Option<&str>,
        mut call: C,
    ) -> Result<Arc<TestRun>>
    where
        C: FnMut(&mut F) -> CallOutcome,
    {
        let name = resolve_name(name, self.name.as_deref(), function_label::<F>());
        let repeat = repeat.or(self.repeat).unwrap_or(self.config.default_repeat);

        let _running = RunningGuard::acquire(&self.running, &name)?;
        let sampler = Sampler::from_config(&self.config)?;
        let measurement = {
            let mut target = self.target.lock();
            sampler.measure(&name, || call(&mut *target), repeat)?
        };

        let run = TestRun::record(self.function, name, repeat, measurement)?;
        self.history.add(Arc::clone(&run));
        Ok(run)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Runs produced by this test, oldest first.
    pub fn history(&self) -> &History {
        &self.history
    }

    /// The most recent run of this test.
    pub fn last(&self) -> Option<Arc<TestRun>> {
        self.history.last()
    }
}

impl<F, R> NamedTest<F>
where
    F: FnMut() -> R,
{
    /// Runs the target and records the result here and in the global history.
    ///
    /// `repeat` and `name` override the values given at construction. The
    /// target's return value is ignored. Fails with `AlreadyRunning` when
    /// called from inside this test's own target.
    pub fn run(&self, repeat: Option<usize>, name: Option<&str>) -> Result<Arc<TestRun>> {
        self.run_calls(repeat, name, |target| consume(target()))
    }
}

impl<F, T, E> NamedTest<F>
where
    F: FnMut() -> std::result::Result<T, E>,
    E: Display,
{
    /// Like [`NamedTest::run`], but an `Err` from the target stops the run
    /// with `TargetInvocation` and nothing is recorded.
    pub fn try_run(&self, repeat: Option<usize>, name: Option<&str>) -> Result<Arc<TestRun>> {
        self.run_calls(repeat, name, |target| settle(target()))
    }
}

/// Sets the running flag; clears it on drop, including on error paths.
struct RunningGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> RunningGuard<'a> {
    fn acquire(flag: &'a AtomicBool, name: &str) -> Result<Self> {
        if flag
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(DefbenchError::AlreadyRunning {
                name: name.to_string(),
            });
        }
        Ok(Self { flag })
    }
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}
