use anyhow::Result;
use touchgrass::{cli::run_cli, utils::runtime::single_thread_runtime};
use tracing::error;

fn main() -> Result<()> {
    // One thread is plenty for the cli, and `serve` keeps the daemon's
    // single-threaded model even when run in the foreground.
    single_thread_runtime()?.block_on(async {
        run_cli().await.inspect_err(|e| {
            error!("Error running cli {e:?}");
        })
    })?;
    Ok(())
}
