use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Guard for a periodic timer. Dropping it stops the timer.
#[derive(Debug)]
pub struct TimerGuard {
    token: CancellationToken,
}

impl TimerGuard {
    /// Token that stops the timer when cancelled.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Drop for TimerGuard {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Send `make()` to `tx` every `period`, first tick one period from now.
///
/// The timer stops when the guard is dropped or cancelled, when `parent` is
/// cancelled, or when the receiver is gone. A tick already queued in the
/// channel may still arrive after cancellation, so receivers must tolerate
/// stale ticks.
pub fn every<M, F>(
    period: Duration,
    tx: mpsc::Sender<M>,
    parent: &CancellationToken,
    make: F,
) -> TimerGuard
where
    M: Send + 'static,
    F: Fn() -> M + Send + 'static,
{
    let token = parent.child_token();
    let task_token = token.clone();

    tokio::spawn(async move {
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = task_token.cancelled() => break,
                _ = interval.tick() => {
                    if task_token.is_cancelled() || tx.send(make()).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    TimerGuard { token }
}
