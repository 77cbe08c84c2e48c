//! Common utilities

use futures_util::Future;
use std::{pin::Pin, task::Poll, time::Duration};
use tokio::{
    sync::watch,
    time::{Instant, Sleep},
};

pub mod list;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Running {
    Continue,
    Stop,
}

#[derive(Debug)]
pub(crate) struct IdleTimeout {
    delay: Pin<Box<Sleep>>,
    duration: Duration,
}

impl IdleTimeout {
    pub fn new(duration: Duration) -> Self {
        let delay = Box::pin(tokio::time::sleep(duration));
        Self { delay, duration }
    }

    pub fn reset(&mut self) {
        let now = Instant::now();
        let next = now + self.duration;
        self.delay.as_mut().reset(next);
    }
}

impl Future for IdleTimeout {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut std::task::Context<'_>) -> Poll<Self::Output> {
        self.delay.as_mut().poll(cx)
    }
}

/// Waits until the flag turns true or its sender is dropped
pub(crate) async fn wait_closed(mut closed: watch::Receiver<bool>) {
    while !*closed.borrow_and_update() {
        if closed.changed().await.is_err() {
            break;
        }
    }
}

/// Awaits `fut` for at most `timeout`; `None` when the timeout elapsed
pub(crate) async fn with_timeout<F: Future>(timeout: Duration, fut: F) -> Option<F::Output> {
    tokio::time::timeout(timeout, fut).await.ok()
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn idle_timeout_fires_after_duration() {
        let mut idle = IdleTimeout::new(Duration::from_millis(100));
        tokio::time::advance(Duration::from_millis(60)).await;
        idle.reset();
        tokio::time::advance(Duration::from_millis(60)).await;
        assert!(futures_util::poll!(Pin::new(&mut idle)).is_pending());
        tokio::time::advance(Duration::from_millis(50)).await;
        assert!(futures_util::poll!(Pin::new(&mut idle)).is_ready());
    }

    #[tokio::test]
    async fn wait_closed_returns_once_flag_set() {
        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(wait_closed(rx));
        tx.send_replace(true);
        handle.await.unwrap();

        let (tx, rx) = watch::channel(false);
        drop(tx);
        wait_closed(rx).await;
    }
}
