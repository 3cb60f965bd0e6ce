//! Interrupt handling for the command-line tool.

use std::future::Future;

use tokio_util::sync::CancellationToken;

use crate::output::print_warning;

/// Raise `stop` on the first interrupt and wait for a second one.
///
/// Returns `true` when a second interrupt arrived, in which case the caller
/// should exit without waiting for running segments. `next_interrupt`
/// resolves to `false` when no more interrupts can be received.
pub async fn forward_interrupts<F, Fut>(stop: CancellationToken, mut next_interrupt: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    if !next_interrupt().await {
        return false;
    }
    print_warning("Interrupted, finishing segments already running (press Ctrl-C again to exit)");
    stop.cancel();

    next_interrupt().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tokio::sync::Notify;

    #[tokio::test]
    async fn test_second_interrupt_returns() {
        let stop = CancellationToken::new();
        let signal = Arc::new(Notify::new());

        let handle = {
            let stop = stop.clone();
            let signal = Arc::clone(&signal);
            tokio::spawn(forward_interrupts(stop, move || {
                let signal = Arc::clone(&signal);
                async move {
                    signal.notified().await;
                    true
                }
            }))
        };

        signal.notify_one();
        stop.cancelled().await;
        assert!(!handle.is_finished());

        signal.notify_one();
        assert!(handle.await.unwrap());
    }

    #[tokio::test]
    async fn test_closed_signal_never_stops() {
        let stop = CancellationToken::new();
        let forced = forward_interrupts(stop.clone(), || async { false }).await;

        assert!(!forced);
        assert!(!stop.is_cancelled());
    }
}
