use std::{net::SocketAddr, path::PathBuf};

use clap::Parser;
use tracing::level_filters::LevelFilter;

use crate::{daemon::http::DEFAULT_BIND, economy::rules::DEFAULT_TASK_REWARD};

#[derive(Parser)]
pub struct DaemonArgs {
    /// Run in this process instead of detaching.
    #[arg(long)]
    pub force: bool,
    /// Where the document, mood file and logs live. Defaults to the platform
    /// state directory.
    #[arg(long)]
    pub dir: Option<PathBuf>,
    /// Address the local bridge listens on.
    #[arg(long, default_value = DEFAULT_BIND)]
    pub bind: SocketAddr,
    /// Points awarded for completing a task. 0 turns the task reward off.
    #[arg(long = "task-reward", default_value_t = DEFAULT_TASK_REWARD)]
    pub task_reward: u64,
    /// Keep yesterday's daily goal instead of clearing it on the first
    /// request of a new day.
    #[arg(long = "no-daily-reset")]
    pub no_daily_reset: bool,
    /// This option is for debugging purposes only.
    #[arg(long = "log-console")]
    pub log_console: bool,
    #[arg(long = "log-filter")]
    pub log: Option<LevelFilter>,
}
