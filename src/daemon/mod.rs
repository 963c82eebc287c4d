use std::{net::SocketAddr, path::PathBuf, time::Duration};

use anyhow::Result;
use http::HttpBridge;
use poll::MoodPoller;
use rand::{rngs::StdRng, SeedableRng};
use service::AppService;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::error;

use crate::{
    economy::rules::RewardTable,
    oracle::{FileMoodSource, MoodSource, MoodState, MOOD_FILE_NAME},
    store::json_store::JsonDocumentStore,
    utils::clock::{Clock, DefaultClock},
};

pub mod args;
pub mod http;
pub mod poll;
pub mod service;
pub mod shutdown;

const MOOD_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Represents the starting point for the daemon
pub async fn start_daemon(
    dir: PathBuf,
    bind: SocketAddr,
    rewards: RewardTable,
    daily_reset: bool,
) -> Result<()> {
    std::env::set_current_dir("/")?;

    let shutdown_token = CancellationToken::new();
    let (mood_sender, mood_receiver) = watch::channel(MoodState::default());

    let poller = create_poller(
        FileMoodSource::new(dir.join(MOOD_FILE_NAME), Box::new(DefaultClock)),
        mood_sender,
        &shutdown_token,
        DefaultClock,
    );

    let store = JsonDocumentStore::new(dir)?;
    let (service, handle) = AppService::load(
        store,
        rewards,
        daily_reset,
        mood_receiver,
        shutdown_token.clone(),
        Box::new(DefaultClock),
        StdRng::from_entropy(),
    )
    .await;

    let bridge = HttpBridge::new(bind, handle, shutdown_token.clone());
    let bridge_shutdown = shutdown_token.clone();

    let (_, poll_result, service_result, bridge_result) = tokio::join!(
        shutdown::detect_shutdown(shutdown_token),
        poller.run(),
        service.run(),
        async {
            let result = bridge.run().await;
            // Nothing reaches the service without its transport; take the
            // rest of the daemon down with it
            bridge_shutdown.cancel();
            result
        },
    );

    if let Err(poll_result) = poll_result {
        error!("Mood poller got an error {:?}", poll_result);
    }

    if let Err(service_result) = service_result {
        error!("State service got an error {:?}", service_result);
    }

    bridge_result
}

fn create_poller(
    source: impl MoodSource + 'static,
    sender: watch::Sender<MoodState>,
    shutdown_token: &CancellationToken,
    clock: impl Clock,
) -> MoodPoller {
    MoodPoller::new(
        Box::new(source),
        sender,
        shutdown_token.clone(),
        MOOD_POLL_INTERVAL,
        Box::new(clock),
    )
}

#[cfg(test)]
mod daemon_tests {
    use std::time::Duration;

    use anyhow::Result;
    use rand::{rngs::StdRng, SeedableRng};
    use tempfile::tempdir;
    use tokio::sync::watch;
    use tokio_util::sync::CancellationToken;

    use crate::{
        daemon::{create_poller, service::AppService, shutdown},
        economy::rules::RewardTable,
        oracle::{FileMoodSource, MoodState, MOOD_FILE_NAME},
        store::{
            document::FocusKind,
            json_store::{DocumentStore, JsonDocumentStore},
        },
        utils::{clock::DefaultClock, logging::TEST_LOGGING},
    };

    /// Very simple smoke test wiring the poller and the service together the
    /// way the daemon does, without the HTTP listener.
    #[tokio::test]
    async fn smoke_test_daemon() -> Result<()> {
        *TEST_LOGGING;
        let dir = tempdir()?;
        std::fs::write(dir.path().join(MOOD_FILE_NAME), "excited")?;

        let shutdown_token = CancellationToken::new();
        let (mood_sender, mood_receiver) = watch::channel(MoodState::default());

        let poller = create_poller(
            FileMoodSource::new(dir.path().join(MOOD_FILE_NAME), Box::new(DefaultClock)),
            mood_sender,
            &shutdown_token,
            DefaultClock,
        );

        let store = JsonDocumentStore::new(dir.path().to_path_buf())?;
        let (service, handle) = AppService::load(
            store,
            RewardTable::default(),
            true,
            mood_receiver,
            shutdown_token.clone(),
            Box::new(DefaultClock),
            StdRng::seed_from_u64(5),
        )
        .await;

        let (_, poll_result, service_result, client_result) = tokio::join!(
            shutdown::detect_shutdown(shutdown_token.clone()),
            poller.run(),
            service.run(),
            async {
                handle.add_task("touch grass".into()).await?.unwrap();
                handle.log_focus(FocusKind::Session).await?;

                tokio::time::sleep(Duration::from_millis(1100)).await;
                assert_eq!(handle.character_state().await?, MoodState::Excited);

                shutdown_token.cancel();
                anyhow::Ok(())
            },
        );

        poll_result?;
        service_result?;
        client_result?;

        let document = JsonDocumentStore::new(dir.path().to_path_buf())?.load().await;
        assert_eq!(document.tasks.len(), 1);
        assert_eq!(document.focus_points.balance(), 10);
        assert_eq!(document.focus_tracking.len(), 1);

        Ok(())
    }
}
