//! Bounded retry schedules.
//!
//! Retry policy is a value, not a timer cascade: a schedule lists offsets
//! from its start time, and the helpers either run an action at every
//! offset or keep trying it until it reports done.

use std::future::Future;

use tokio::time::{Duration, Instant, sleep_until};

/// Offsets, measured from the start of the run, at which attempts fire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrySchedule {
    offsets: Vec<Duration>,
}

impl RetrySchedule {
    pub fn at_offsets(offsets: impl IntoIterator<Item = Duration>) -> Self {
        Self {
            offsets: offsets.into_iter().collect(),
        }
    }

    pub fn at_offsets_ms(offsets: impl IntoIterator<Item = u64>) -> Self {
        Self::at_offsets(offsets.into_iter().map(Duration::from_millis))
    }

    pub fn attempts(&self) -> usize {
        self.offsets.len()
    }

    pub fn offsets(&self) -> &[Duration] {
        &self.offsets
    }
}

/// Runs `op` at every offset of the schedule, unconditionally.
///
/// For idempotent re-assertion work such as re-applying settings to a video
/// the host may reset underneath us.
pub async fn run_at_offsets<F, Fut>(schedule: &RetrySchedule, mut op: F)
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = ()>,
{
    let start = Instant::now();
    for (attempt, offset) in schedule.offsets.iter().enumerate() {
        sleep_until(start + *offset).await;
        op(attempt).await;
    }
}

/// Runs `op` at each offset until it reports done. Returns whether any
/// attempt succeeded before the schedule ran out.
pub async fn retry_until<F, Fut>(schedule: &RetrySchedule, mut op: F) -> bool
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = bool>,
{
    let start = Instant::now();
    for (attempt, offset) in schedule.offsets.iter().enumerate() {
        sleep_until(start + *offset).await;
        if op(attempt).await {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn runs_every_offset() {
        let calls = Arc::new(AtomicUsize::new(0));
        let schedule = RetrySchedule::at_offsets_ms([0, 50, 150, 500]);
        let counted = Arc::clone(&calls);
        run_at_offsets(&schedule, move |_| {
            let counted = Arc::clone(&counted);
            async move {
                counted.fetch_add(1, Ordering::SeqCst);
            }
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn stops_after_success() {
        let calls = Arc::new(AtomicUsize::new(0));
        let schedule = RetrySchedule::at_offsets_ms([100, 300, 600, 1000]);
        let counted = Arc::clone(&calls);
        let done = retry_until(&schedule, move |attempt| {
            let counted = Arc::clone(&counted);
            async move {
                counted.fetch_add(1, Ordering::SeqCst);
                attempt == 1
            }
        })
        .await;
        assert!(done);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_schedule_reports_failure() {
        let schedule = RetrySchedule::at_offsets_ms([10, 20]);
        let done = retry_until(&schedule, |_| async { false }).await;
        assert!(!done);
    }
}
