//! Debounce, throttle, retry, and flood-control primitives.
//!
//! Timer discipline is the engine's primary concurrency-correctness
//! mechanism, so the primitives are first-class values here instead of
//! scattered sleeps. Everything measures time through `tokio::time` so a
//! paused test clock drives them deterministically.

mod debounce;
mod flood;
mod retry;
mod throttle;

pub use debounce::Debouncer;
pub use flood::FloodGate;
pub use retry::{RetrySchedule, retry_until, run_at_offsets};
pub use throttle::MinInterval;
