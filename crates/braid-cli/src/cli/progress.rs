//! Progress line formatting for the periodic stats printer.

use braid_core::Stat;
use std::time::Duration;

const MIB: f64 = 1_048_576.0;

/// One progress line: done / total MiB, percentage and mean rate since start.
pub fn format_progress(stat: &Stat, elapsed: Duration) -> String {
    let done_mib = stat.read_bytes as f64 / MIB;
    let total_mib = stat.total_bytes as f64 / MIB;
    let pct = stat.fraction() * 100.0;
    let secs = elapsed.as_secs_f64();
    let rate_mib = if secs > 0.0 { done_mib / secs } else { 0.0 };
    format!(
        "  {:.1} / {:.1} MiB ({:.1}%)  {:.2} MiB/s",
        done_mib, total_mib, pct, rate_mib
    )
}
