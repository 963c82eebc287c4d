use tokio::select;
use tokio_util::sync::CancellationToken;

/// Turns ctrl-c into a cancellation of the whole daemon. Detached Windows
/// processes never see the signal, which is why `stop` kills by process
/// instead.
///
/// Also returns once some other part of the daemon cancels the token, so a
/// failed component can't leave the rest waiting forever.
pub async fn detect_shutdown(cancelation: CancellationToken) {
    select! {
        _ = tokio::signal::ctrl_c() => {
            cancelation.cancel();
        },
        _ = cancelation.cancelled() => {},
    };
}
