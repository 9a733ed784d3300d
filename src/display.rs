use chrono::SecondsFormat;
use owo_colors::{OwoColorize, Stream, Style};
use serde::Serialize;

use crate::history::History;
use crate::record::TestRun;

/// Group an integer with commas: `1000000` -> `"1,000,000"`.
pub fn group_thousands(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Format a float to `precision` significant digits.
///
/// Fixed-point output keeps at least one decimal (`1.0`, `0.0002124`);
/// values below 1e-4 or at/above 10^precision switch to exponent form
/// with a signed two-digit exponent (`2.5e-05`).
pub fn format_significant(value: f64, precision: usize) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    if value == 0.0 {
        return "0.0".to_string();
    }
    let precision = precision.max(1);

    // Round first so the exponent reflects any carry (9.99996 -> 10.00).
    let sci = format!("{:.*e}", precision - 1, value);
    let (mantissa, exp) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let exp: i32 = exp.parse().unwrap_or(0);

    if exp < -4 || exp >= precision as i32 {
        let sign = if exp < 0 { '-' } else { '+' };
        return format!("{}e{}{:02}", trim_fraction(mantissa, false), sign, exp.abs());
    }

    let decimals = (precision as i32 - 1 - exp).max(0) as usize;
    trim_fraction(&format!("{:.*}", decimals, value), true)
}

fn trim_fraction(s: &str, keep_one: bool) -> String {
    if !s.contains('.') {
        return if keep_one { format!("{}.0", s) } else { s.to_string() };
    }
    let trimmed = s.trim_end_matches('0');
    match trimmed.strip_suffix('.') {
        Some(int) if keep_one => format!("{}.0", int),
        Some(int) => int.to_string(),
        None => trimmed.to_string(),
    }
}

fn style_name() -> Style {
    Style::new().cyan().bold()
}

/// The `<TestRun ...>` block, colored when stdout supports it.
pub fn format_default(run: &TestRun) -> String {
    let name = format!("'{}'", run.name())
        .if_supports_color(Stream::Stdout, |s| s.style(style_name()))
        .to_string();
    let time = format!("{}s", format_significant(run.time(), 4))
        .if_supports_color(Stream::Stdout, |s| s.yellow())
        .to_string();
    let mem = format!("{:.1}Mib", run.peak_memory())
        .if_supports_color(Stream::Stdout, |s| s.green())
        .to_string();

    format!(
        "<TestRun {}\n  runs:     {}\n  avg time: {}\n  avg mem:  {}>",
        name,
        group_thousands(run.repeat()),
        time,
        mem
    )
}

/// One aligned line per run: name, runs, avg time, avg mem.
pub fn format_short(runs: &[impl AsRef<TestRun>]) -> String {
    let name_width = runs
        .iter()
        .map(|r| r.as_ref().name().chars().count())
        .max()
        .unwrap_or(0);

    let mut out = String::new();
    for run in runs {
        let run = run.as_ref();
        let padded = format!("{:<width$}", run.name(), width = name_width);
        out.push_str(
            &padded
                .if_supports_color(Stream::Stdout, |s| s.style(style_name()))
                .to_string(),
        );
        out.push_str(&format!(
            "  {:>9} runs  {:>11}s  {:>7.1}Mib\n",
            group_thousands(run.repeat()),
            format_significant(run.time(), 4),
            run.peak_memory()
        ));
    }
    out
}

#[derive(Serialize)]
struct JsonRun<'a> {
    name: &'a str,
    function: &'a str,
    repeat: usize,
    avg_time_secs: f64,
    peak_memory_mib: f64,
    memory_mib: &'a [f64],
    stdout: &'a str,
    stderr: &'a str,
    started_at: String,
}

/// Pretty JSON array of runs.
pub fn format_json(runs: &[impl AsRef<TestRun>]) -> String {
    let json_runs: Vec<JsonRun> = runs
        .iter()
        .map(|r| {
            let r = r.as_ref();
            JsonRun {
                name: r.name(),
                function: r.function(),
                repeat: r.repeat(),
                avg_time_secs: r.time(),
                peak_memory_mib: r.peak_memory(),
                memory_mib: r.memory(),
                stdout: r.stdout(),
                stderr: r.stderr(),
                started_at: r.started_at().to_rfc3339_opts(SecondsFormat::Millis, true),
            }
        })
        .collect();

    serde_json::to_string_pretty(&json_runs).unwrap_or_else(|_| "[]".to_string())
}

/// Record count with average time and memory across a history.
pub fn format_summary(history: &History) -> String {
    let label = "History:"
        .if_supports_color(Stream::Stdout, |s| s.dimmed())
        .to_string();
    format!(
        "{} {} runs, avg time {}s, avg mem {:.1}Mib",
        label,
        group_thousands(history.len()),
        format_significant(history.average_time(), 4),
        history.average_memory()
    )
}
