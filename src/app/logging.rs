//! Progress logging utilities.

use log::info;

/// Logs progress for a running batch job.
pub fn log_progress(
    start_time: std::time::Instant,
    completed_urls: i64,
    failed_urls: i64,
    total_urls: i64,
) {
    let elapsed_secs = start_time.elapsed().as_secs_f64();
    let processed = completed_urls + failed_urls;
    let rate = if elapsed_secs > 0.0 {
        processed as f64 / elapsed_secs
    } else {
        0.0
    };
    info!(
        "Progress: {processed}/{total_urls} URLs ({completed_urls} ok, {failed_urls} failed) in {elapsed_secs:.1}s (~{rate:.2} URLs/sec)"
    );
}
