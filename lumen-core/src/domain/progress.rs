//! Progress and ETA heuristics
//!
//! The remote service does not report progress, so it is estimated from
//! elapsed time and the number of status polls. The numbers only exist to
//! keep a progress bar moving smoothly; they have no authority over the
//! job status.

/// Upper bound while a job is still running. The last 5% is reserved for
/// the terminal transition.
pub const MAX_RUNNING_PROGRESS: u8 = 95;

/// Smallest countdown shown while a job is still running
pub const MIN_RUNNING_ETA_SECS: u64 = 5;

/// Seconds over which the estimate shifts from time-based to poll-based
const BLEND_WINDOW_SECS: f64 = 30.0;

/// Cap of each partial estimate
const PARTIAL_CAP: f64 = 90.0;

/// Percent credited per poll
const PERCENT_PER_ATTEMPT: f64 = 5.0;

/// Estimates completion percent of a running job
///
/// Blends a time-based estimate with a poll-count based one, weighting the
/// poll count more as time passes. Never exceeds [`MAX_RUNNING_PROGRESS`].
pub fn estimate_progress(elapsed_secs: u64, attempts: u32, estimated_total_secs: u64) -> u8 {
    let elapsed = elapsed_secs as f64;
    let total = estimated_total_secs.max(1) as f64;

    let time_based = (elapsed / total * 100.0).min(PARTIAL_CAP);
    let attempt_based = (f64::from(attempts) * PERCENT_PER_ATTEMPT).min(PARTIAL_CAP);
    let weight = (elapsed / BLEND_WINDOW_SECS).min(1.0);

    let combined = time_based * (1.0 - weight) + attempt_based * weight;
    (combined.round() as u8).min(MAX_RUNNING_PROGRESS)
}

/// Estimates seconds remaining for a running job
pub fn estimate_remaining_secs(elapsed_secs: u64, estimated_total_secs: u64) -> u64 {
    estimated_total_secs
        .saturating_sub(elapsed_secs)
        .max(MIN_RUNNING_ETA_SECS)
}
