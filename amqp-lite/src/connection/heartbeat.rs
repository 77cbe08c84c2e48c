//! Implements an asynchronous heartbeat

use std::{task::Poll, time::Duration};

use futures_util::Stream;
use pin_project_lite::pin_project;

use tokio::time::Instant;
use tokio_stream::wrappers::IntervalStream;

use super::{HEARTBEAT_MARGIN, MAX_IDLE_TIMEOUT};

pin_project! {
    /// A wrapper over an `Option<IntervalStream>` which will never tick ready if the underlying
    /// `Interval` is `None`
    #[derive(Debug)]
    pub(crate) struct HeartBeat {
        #[pin]
        interval: Option<IntervalStream>
    }
}

impl HeartBeat {
    /// A [`HeartBeat`] that will never yield `Poll::Ready(_)`
    pub fn never() -> Self {
        Self { interval: None }
    }

    /// A [`HeartBeat`] that first ticks one `period` from now
    pub fn new(period: Duration) -> Self {
        let start = Instant::now() + period;
        let interval = Some(IntervalStream::new(tokio::time::interval_at(start, period)));
        Self { interval }
    }
}

impl Stream for HeartBeat {
    type Item = Instant;

    fn poll_next(
        self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Option<Self::Item>> {
        let this = self.project();
        match this.interval.as_pin_mut() {
            Some(stream) => stream.poll_next(cx),
            None => Poll::Pending,
        }
    }
}

/// How often an empty frame is sent for a peer that advertised
/// `remote_idle_time_out` milliseconds
pub(crate) fn heartbeat_period(remote_idle_time_out: u32) -> Duration {
    let margin = HEARTBEAT_MARGIN.as_millis() as u32;
    let millis = if remote_idle_time_out > margin {
        remote_idle_time_out - margin
    } else {
        remote_idle_time_out / 2
    };
    Duration::from_millis(millis.max(1) as u64).min(MAX_IDLE_TIMEOUT)
}

#[cfg(test)]
mod tests {
    use futures_util::StreamExt;

    use super::*;

    #[test]
    fn period_keeps_a_safety_margin() {
        assert_eq!(heartbeat_period(60_000), Duration::from_millis(57_000));
        assert_eq!(heartbeat_period(3_000), Duration::from_millis(1_500));
        assert_eq!(heartbeat_period(1), Duration::from_millis(1));
        assert_eq!(heartbeat_period(u32::MAX), MAX_IDLE_TIMEOUT);
    }

    #[tokio::test(start_paused = true)]
    async fn first_tick_after_one_period() {
        let mut heartbeat = HeartBeat::new(Duration::from_secs(10));
        let start = Instant::now();
        heartbeat.next().await;
        assert!(Instant::now() - start >= Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn never_does_not_tick() {
        let mut heartbeat = HeartBeat::never();
        let result = tokio::time::timeout(Duration::from_secs(3600), heartbeat.next()).await;
        assert!(result.is_err());
    }
}
