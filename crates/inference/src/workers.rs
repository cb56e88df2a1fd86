//! Optional dedicated rayon pool for trial loops.

use best_arm_core::{InferenceError, Result};
use tracing::warn;

/// Runs `op` on a fresh pool of `num_threads` workers, or on the global
/// rayon pool when `num_threads` is 0.
pub(crate) fn install<T, F>(num_threads: usize, op: F) -> Result<T>
where
    T: Send,
    F: FnOnce() -> Result<T> + Send,
{
    if num_threads == 0 {
        return op();
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build()
        .map_err(|e| {
            warn!(num_threads, error = %e, "failed to build thread pool");
            InferenceError::ThreadPool(e.to_string())
        })?;
    pool.install(op)
}
