use std::time::Duration;

use anyhow::Result;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::{
    oracle::{MoodSource, MoodState},
    utils::clock::Clock,
};

/// Polls the mood source on a fixed beat and publishes changes into a watch
/// channel. Readers always see the latest value without waiting on a file.
pub struct MoodPoller {
    source: Box<dyn MoodSource>,
    state: watch::Sender<MoodState>,
    shutdown: CancellationToken,
    poll_interval: Duration,
    time_provider: Box<dyn Clock>,
}

impl MoodPoller {
    pub fn new(
        source: Box<dyn MoodSource>,
        state: watch::Sender<MoodState>,
        shutdown: CancellationToken,
        poll_interval: Duration,
        time_provider: Box<dyn Clock>,
    ) -> Self {
        Self {
            source,
            state,
            shutdown,
            poll_interval,
            time_provider,
        }
    }

    /// Executes the poller event loop.
    pub async fn run(mut self) -> Result<()> {
        let mut poll_point = self.time_provider.instant();
        loop {
            poll_point += self.poll_interval;

            let mood = self.source.current_mood().unwrap_or_default();
            let changed = self.state.send_if_modified(|current| {
                if *current == mood {
                    false
                } else {
                    *current = mood;
                    true
                }
            });
            if changed {
                debug!("Mood changed to {mood:?}");
            }

            tokio::select! {
                // Cancellation stops the event loop; the watch channel keeps
                // its last value for anyone still reading it.
                _ = self.shutdown.cancelled() => {
                    return Ok(())
                }
                _ = self.time_provider.sleep_until(poll_point) => ()
            }
        }
    }
}
