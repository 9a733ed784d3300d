use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::display::{format_significant, group_thousands};
use crate::errors::{DefbenchError, Result};
use crate::history;
use crate::sampler::Measurement;

/// Result of one benchmark measurement. Immutable once recorded.
#[derive(Debug, Clone, Serialize)]
pub struct TestRun {
    /// Type path of the benchmarked callable.
    function: String,
    name: String,
    repeat: usize,
    /// Memory readings (MiB) exactly as sampled.
    raw_memory: Vec<f64>,
    /// Readings relative to the baseline; `memory[0] == 0.0`.
    memory: Vec<f64>,
    /// Average seconds per invocation.
    time: f64,
    peak_memory: f64,
    stdout: String,
    stderr: String,
    started_at: DateTime<Utc>,
}

impl TestRun {
    /// Builds a record from a measurement and adds it to the global history.
    ///
    /// Fails with `InvalidRepeatCount` for a zero repeat and `EmptySamples`
    /// when the measurement holds no memory readings.
    pub fn record(
        function: &str,
        name: impl Into<String>,
        repeat: usize,
        measurement: Measurement,
    ) -> Result<Arc<Self>> {
        if repeat == 0 {
            return Err(DefbenchError::InvalidRepeatCount);
        }
        let memory = normalize(&measurement.memory)?;
        let peak_memory = memory.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        let run = Arc::new(Self {
            function: function.to_string(),
            name: name.into(),
            repeat,
            raw_memory: measurement.memory,
            memory,
            time: measurement.total_elapsed.as_secs_f64() / repeat as f64,
            peak_memory,
            stdout: measurement.stdout,
            stderr: measurement.stderr,
            started_at: measurement.started_at,
        });
        history::global().add(Arc::clone(&run));
        Ok(run)
    }

    pub fn function(&self) -> &str {
        &self.function
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn repeat(&self) -> usize {
        self.repeat
    }

    pub fn raw_memory(&self) -> &[f64] {
        &self.raw_memory
    }

    pub fn memory(&self) -> &[f64] {
        &self.memory
    }

    /// Average wall-clock seconds per invocation.
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Highest reading above the baseline, in MiB.
    pub fn peak_memory(&self) -> f64 {
        self.peak_memory
    }

    pub fn stdout(&self) -> &str {
        &self.stdout
    }

    pub fn stderr(&self) -> &str {
        &self.stderr
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Compact single-line form: `TestRun(name="x" time=0.0002124 mem=0.0)`.
    pub fn repr(&self) -> String {
        format!(
            "TestRun(name=\"{}\" time={} mem={})",
            self.name,
            format_significant(self.time, 4),
            format_significant(self.peak_memory, 4)
        )
    }
}

impl fmt::Display for TestRun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "<TestRun '{}'", self.name)?;
        writeln!(f, "  runs:     {}", group_thousands(self.repeat))?;
        writeln!(f, "  avg time: {}s", format_significant(self.time, 4))?;
        write!(f, "  avg mem:  {:.1}Mib>", self.peak_memory)
    }
}

/// Subtracts the first reading from every reading.
pub fn normalize(raw: &[f64]) -> Result<Vec<f64>> {
    let baseline = *raw.first().ok_or(DefbenchError::EmptySamples)?;
    Ok(raw.iter().map(|x| x - baseline).collect())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::time::Duration;

    pub(crate) fn measurement(total_secs: f64, samples: &[f64]) -> Measurement {
        Measurement {
            total_elapsed: Duration::from_secs_f64(total_secs),
            memory: samples.to_vec(),
            stdout: String::new(),
            stderr: String::new(),
            started_at: Utc::now(),
        }
    }

    pub(crate) fn make_run(name: &str, repeat: usize, total_secs: f64, samples: &[f64]) -> Arc<TestRun> {
        TestRun::record("tests::make_run", name, repeat, measurement(total_secs, samples)).unwrap()
    }

    #[test]
    fn normalizes_against_first_sample() {
        let raw = [52.25, 52.5, 60.0, 51.0];
        let normalized = normalize(&raw).unwrap();
        assert_eq!(normalized[0], 0.0);
        for (i, value) in normalized.iter().enumerate() {
            assert_eq!(*value, raw[i] - raw[0]);
        }
    }

    #[test]
    fn peak_is_max_of_normalized() {
        let run = make_run("record_peak", 1, 1.0, &[40.0, 41.5, 47.0, 39.0]);
        assert_eq!(run.peak_memory(), 7.0);
        assert_eq!(run.memory(), &[0.0, 1.5, 7.0, -1.0]);
        assert_eq!(run.raw_memory(), &[40.0, 41.5, 47.0, 39.0]);
    }

    #[test]
    fn peak_is_zero_when_memory_only_falls() {
        let run = make_run("record_falling", 1, 1.0, &[40.0, 39.0, 38.0]);
        assert_eq!(run.peak_memory(), 0.0);
    }

    #[test]
    fn empty_samples_is_an_error() {
        let err = TestRun::record("f", "record_empty", 1, measurement(1.0, &[])).unwrap_err();
        assert!(matches!(err, DefbenchError::EmptySamples));
        assert!(
            history::global()
                .get_where(|r| r.name() == "record_empty")
                .is_empty()
        );
    }

    #[test]
    fn zero_repeat_is_an_error() {
        let err = TestRun::record("f", "record_zero", 0, measurement(1.0, &[1.0])).unwrap_err();
        assert!(matches!(err, DefbenchError::InvalidRepeatCount));
    }

    #[test]
    fn time_is_total_divided_by_repeat() {
        let total = Duration::from_millis(1234);
        let m = Measurement {
            total_elapsed: total,
            ..measurement(0.0, &[1.0])
        };
        let run = TestRun::record("f", "record_time", 7, m).unwrap();
        assert_eq!(run.time(), total.as_secs_f64() / 7.0);
        assert_eq!(run.repeat(), 7);
        assert_eq!(run.function(), "f");
    }

    #[test]
    fn display_matches_reference_layout() {
        let run = make_run("search_list", 1000, 0.2124, &[30.0, 30.0]);
        assert_eq!(
            run.to_string(),
            "<TestRun 'search_list'\n  runs:     1,000\n  avg time: 0.0002124s\n  avg mem:  0.0Mib>"
        );
    }

    #[test]
    fn repr_is_single_line() {
        let run = make_run("record_repr", 2, 3.0, &[1.0, 2.5]);
        assert_eq!(run.repr(), "TestRun(name=\"record_repr\" time=1.5 mem=1.5)");
    }

    #[test]
    fn serializes_metrics() {
        let run = make_run("record_json", 4, 2.0, &[10.0, 11.0]);
        let value = serde_json::to_value(run.as_ref()).unwrap();
        assert_eq!(value["name"], "record_json");
        assert_eq!(value["repeat"], 4);
        assert_eq!(value["time"], 0.5);
        assert_eq!(value["peak_memory"], 1.0);
        assert_eq!(value["memory"], serde_json::json!([0.0, 1.0]));
    }
}
