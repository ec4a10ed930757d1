//! Bounded-concurrency fan-out used by every LLM batch stage.

use futures::stream::{self, StreamExt};
use std::future::Future;

/// Run `f` over `items` with at most `concurrency` futures in flight.
///
/// Each future returns its item alongside the result, so identity survives
/// the unordered completion; callers must never rely on output order. A
/// failure inside one future is that future's own business and never cancels
/// its siblings.
pub async fn parallel_map<T, R, F, Fut>(items: Vec<T>, concurrency: usize, f: F) -> Vec<(T, R)>
where
    F: Fn(T) -> Fut,
    Fut: Future<Output = (T, R)>,
{
    stream::iter(items)
        .map(f)
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await
}
