//! Small demo workloads used by the `defbench` binary.

use std::collections::HashSet;
use std::hint::black_box;
use std::sync::Arc;

use clap::ValueEnum;

use crate::config::BenchConfig;
use crate::errors::Result;
use crate::record::TestRun;

const FILL_COUNT: usize = 20;
const PREFILLED_LEN: usize = 10_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Workload {
    SearchList,
    SearchSet,
    PopulateList,
    PopulateSet,
    RefillList,
    PrintStuff,
}

impl Workload {
    pub const ALL: [Workload; 6] = [
        Workload::SearchList,
        Workload::SearchSet,
        Workload::PopulateList,
        Workload::PopulateSet,
        Workload::RefillList,
        Workload::PrintStuff,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Workload::SearchList => "search_list",
            Workload::SearchSet => "search_set",
            Workload::PopulateList => "populate_list",
            Workload::PopulateSet => "populate_set",
            Workload::RefillList => "refill_list",
            Workload::PrintStuff => "print_stuff",
        }
    }

    /// Benchmarks this workload; `name` defaults to [`Workload::label`].
    pub fn run(
        self,
        config: &BenchConfig,
        repeat: Option<usize>,
        name: Option<&str>,
    ) -> Result<Arc<TestRun>> {
        let name = Some(name.unwrap_or(self.label()));
        match self {
            Workload::SearchList => crate::run_with(config, search_list, repeat, name),
            Workload::SearchSet => {
                let set: HashSet<String> = (0..FILL_COUNT).map(|i| i.to_string()).collect();
                crate::run_with(config, move || black_box(&set).contains("hello"), repeat, name)
            }
            Workload::PopulateList => {
                let mut list: Vec<String> = Vec::new();
                crate::run_with(
                    config,
                    move || list.extend((0..FILL_COUNT).map(|i| i.to_string())),
                    repeat,
                    name,
                )
            }
            Workload::PopulateSet => {
                let mut set: HashSet<String> = HashSet::new();
                crate::run_with(
                    config,
                    move || set.extend((0..FILL_COUNT).map(|i| i.to_string())),
                    repeat,
                    name,
                )
            }
            Workload::RefillList => {
                let mut filled = vec![0usize; PREFILLED_LEN];
                crate::run_with(
                    config,
                    move || {
                        for (i, slot) in filled.iter_mut().take(FILL_COUNT).enumerate() {
                            *slot = black_box(i);
                        }
                    },
                    repeat,
                    name,
                )
            }
            Workload::PrintStuff => crate::run_with(config, print_stuff, repeat, name),
        }
    }
}

pub fn search_list() -> bool {
    let list = ["one", "two", "three"];
    black_box(list).contains(&"two")
}

pub fn print_stuff() {
    println!("hello world");
}
