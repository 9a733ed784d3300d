//! Append-only store of every [`TestRun`] produced in this process.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::record::TestRun;

static GLOBAL: History = History::new();

/// The process-wide history every constructed [`TestRun`] is added to.
pub fn global() -> &'static History {
    &GLOBAL
}

#[derive(Debug, Default)]
pub struct History {
    records: RwLock<Vec<Arc<TestRun>>>,
}

impl History {
    pub const fn new() -> Self {
        Self {
            records: parking_lot::const_rwlock(Vec::new()),
        }
    }

    /// Appends without validation or deduplication.
    pub fn add(&self, run: Arc<TestRun>) {
        self.records.write().push(run);
    }

    /// All records, in insertion order.
    pub fn get(&self) -> Vec<Arc<TestRun>> {
        self.records.read().clone()
    }

    /// Records matching `filter`, in insertion order, e.g.:
    ///
    /// ```
    /// # use defbench::history;
    /// let loops = history::global().get_where(|r| r.name().ends_with("_loop"));
    /// let slow = history::global().get_where(|r| r.time() > 10.0);
    /// # let _ = (loops, slow);
    /// ```
    pub fn get_where<P>(&self, filter: P) -> Vec<Arc<TestRun>>
    where
        P: Fn(&TestRun) -> bool,
    {
        // Filter a snapshot so predicates may query history themselves.
        self.get().into_iter().filter(|run| filter(run.as_ref())).collect()
    }

    /// Mean average time of all records; 0.0 when empty.
    pub fn average_time(&self) -> f64 {
        mean(self.get().iter().map(|r| r.time()))
    }

    pub fn average_time_where<P>(&self, filter: P) -> f64
    where
        P: Fn(&TestRun) -> bool,
    {
        mean(self.get_where(filter).iter().map(|r| r.time()))
    }

    /// Mean peak memory (MiB) of all records; 0.0 when empty.
    pub fn average_memory(&self) -> f64 {
        mean(self.get().iter().map(|r| r.peak_memory()))
    }

    pub fn average_memory_where<P>(&self, filter: P) -> f64
    where
        P: Fn(&TestRun) -> bool,
    {
        mean(self.get_where(filter).iter().map(|r| r.peak_memory()))
    }

    pub fn last(&self) -> Option<Arc<TestRun>> {
        self.records.read().last().cloned()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 { 0.0 } else { sum / count as f64 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::tests::make_run;

    #[test]
    fn empty_history() {
        let history = History::new();
        assert!(history.is_empty());
        assert!(history.get().is_empty());
        assert!(history.last().is_none());
        assert_eq!(history.average_time(), 0.0);
        assert_eq!(history.average_memory(), 0.0);
    }

    #[test]
    fn add_then_get_preserves_order() {
        let history = History::new();
        let a = make_run("hist_order_a", 1, 1.0, &[0.0, 1.0]);
        let b = make_run("hist_order_b", 1, 2.0, &[0.0, 3.0]);
        history.add(a.clone());
        history.add(b.clone());

        let all = history.get();
        assert_eq!(all.len(), 2);
        assert!(Arc::ptr_eq(&all[0], &a));
        assert!(Arc::ptr_eq(&all[1], &b));
        assert!(Arc::ptr_eq(&history.last().unwrap(), &b));
    }

    #[test]
    fn same_record_twice_is_kept_twice() {
        let history = History::new();
        let run = make_run("hist_dup", 1, 1.0, &[0.0]);
        history.add(run.clone());
        history.add(run.clone());
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn filtered_get_keeps_matching_in_order() {
        let history = History::new();
        for name in ["for_loop", "while_loop", "for_each", "map"] {
            history.add(make_run(name, 1, 1.0, &[0.0]));
        }
        let names: Vec<String> = history
            .get_where(|r| r.name().starts_with("for"))
            .iter()
            .map(|r| r.name().to_string())
            .collect();
        assert_eq!(names, ["for_loop", "for_each"]);
    }

    #[test]
    fn averages_over_filtered_records() {
        let history = History::new();
        history.add(make_run("avg_a", 2, 2.0, &[10.0, 12.0]));
        history.add(make_run("avg_b", 1, 3.0, &[5.0, 9.0, 6.0]));
        history.add(make_run("other", 1, 100.0, &[0.0, 50.0]));

        // times: 1.0, 3.0, 100.0; peaks: 2.0, 4.0, 50.0
        let is_avg = |r: &TestRun| r.name().starts_with("avg");
        assert!((history.average_time_where(is_avg) - 2.0).abs() < 1e-12);
        assert!((history.average_memory_where(is_avg) - 3.0).abs() < 1e-12);
        assert!((history.average_time() - 104.0 / 3.0).abs() < 1e-12);
        assert!((history.average_memory() - 56.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn averages_with_no_match_are_zero() {
        let history = History::new();
        history.add(make_run("avg_none", 1, 1.0, &[0.0, 1.0]));
        assert_eq!(history.average_time_where(|_| false), 0.0);
        assert_eq!(history.average_memory_where(|_| false), 0.0);
    }

    #[test]
    fn predicate_may_query_history() {
        let history = History::new();
        history.add(make_run("reentrant", 1, 1.0, &[0.0]));
        let found = history.get_where(|_| history.len() == 1);
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn constructed_records_reach_global_history() {
        let run = make_run("hist_global_marker", 1, 1.0, &[0.0]);
        let found = global().get_where(|r| r.name() == "hist_global_marker");
        assert!(found.iter().any(|r| Arc::ptr_eq(r, &run)));
    }
}
