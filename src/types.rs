use std::fmt::Display;

use clap::ValueEnum;

/// Label used when a benchmark target has no usable name (closures, fn pointers).
pub const FALLBACK_NAME: &str = "<function>";

/// Repeat count a [`NamedTest`](crate::NamedTest) falls back to when neither
/// the call nor the construction supplies one.
pub const DEFAULT_REPEAT: usize = 10;

/// Repeat count [`run`](crate::run) falls back to. Independent of
/// [`DEFAULT_REPEAT`].
pub const ENTRY_DEFAULT_REPEAT: usize = 10;

/// Result of a single target call as seen by the sampler; `Err` carries the
/// failure text.
pub type CallOutcome = Result<(), String>;

/// Any return value counts as success. The value goes through `black_box` so
/// the work that produced it is not optimized away.
pub(crate) fn consume<T>(value: T) -> CallOutcome {
    std::hint::black_box(value);
    Ok(())
}

/// `Ok` values are consumed like [`consume`]; `Err` becomes the failure text.
pub(crate) fn settle<T, E: Display>(result: Result<T, E>) -> CallOutcome {
    match result {
        Ok(value) => consume(value),
        Err(err) => Err(err.to_string()),
    }
}

/// Declared name of a callable, taken from its type path.
///
/// Function items resolve to their last path segment (`app::search_list` ->
/// `search_list`). Closures and function pointers have no declared name.
pub fn function_label<F: ?Sized>() -> Option<&'static str> {
    declared_name(std::any::type_name::<F>())
}

pub(crate) fn declared_name(type_path: &'static str) -> Option<&'static str> {
    if type_path.contains("{{closure}}") || type_path.contains('(') {
        return None;
    }
    // Last `::` outside any `<...>` group, so `Wrapper<u8>::tick` -> `tick`.
    let bytes = type_path.as_bytes();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, &b) in bytes.iter().enumerate() {
        match b {
            b'<' => depth += 1,
            b'>' => depth = depth.saturating_sub(1),
            b':' if depth == 0 && bytes.get(i + 1) == Some(&b':') => start = i + 2,
            _ => {}
        }
    }
    let last = &type_path[start..];
    let last = last.split('<').next().unwrap_or(last).trim_start_matches('&');
    if last.is_empty() { None } else { Some(last) }
}

/// Picks the first available label in priority order.
pub fn resolve_name(explicit: Option<&str>, configured: Option<&str>, declared: Option<&str>) -> String {
    explicit
        .filter(|s| !s.is_empty())
        .or(configured.filter(|s| !s.is_empty()))
        .or(declared)
        .unwrap_or(FALLBACK_NAME)
        .to_string()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Default,
    Short,
}
