pub mod process;
pub mod summary;

use std::{env, net::SocketAddr, path::PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use process::{daemon_binary_path, kill_running_daemons, respawn_daemon};
use summary::{process_summary_command, SummaryCommand};
use tracing::level_filters::LevelFilter;

use crate::{
    daemon::{http::DEFAULT_BIND, start_daemon},
    economy::rules::{RewardTable, DEFAULT_TASK_REWARD},
    store::{
        document::AppDocument,
        json_store::{DocumentStore, JsonDocumentStore},
    },
    utils::{
        dir::create_application_default_path,
        logging::{enable_logging, CLI_PREFIX},
    },
};

#[derive(Parser, Debug)]
#[command(name = "Touchgrass", version, long_about = None)]
#[command(about = "Companion cli for the touchgrass wellness daemon", long_about = None)]
struct Args {
    #[command(subcommand)]
    commands: Commands,
    #[arg(long, help = "Enable logging")]
    log: bool,
}

#[derive(Subcommand, Debug)]
#[command(version, about, long_about = None)]
enum Commands {
    #[command(about = "Starts a daemon for the application")]
    Init {
        #[arg(
            long,
            help = "Application directory. By default tries to save into $XDG_STATE_HOME or $HOME/.local/state"
        )]
        dir: Option<PathBuf>,
        #[arg(long, default_value = DEFAULT_BIND, help = "Address the daemon listens on")]
        bind: SocketAddr,
    },
    #[command(
        about = "Run a daemon directly in current console. Used for creating a daemon internally and for debugging"
    )]
    Serve {
        #[arg(
            long,
            help = "Application directory. By default tries to save into $XDG_STATE_HOME or $HOME/.local/state"
        )]
        dir: Option<PathBuf>,
        #[arg(long, default_value = DEFAULT_BIND, help = "Address the daemon listens on")]
        bind: SocketAddr,
        #[arg(long = "task-reward", default_value_t = DEFAULT_TASK_REWARD, help = "Points paid out for finishing a task")]
        task_reward: u64,
        #[arg(long = "no-daily-reset", help = "Keep the daily goal across midnight")]
        no_daily_reset: bool,
    },
    #[command(about = "Stop currently running daemon.")]
    Stop {},
    #[command(about = "Print a snapshot of today's points, tasks, meals, and garden")]
    Summary {
        #[command(flatten)]
        command: SummaryCommand,
    },
    #[command(
        about = "Restore the default document. The only way plantings are ever deleted. Stop the daemon first, or its next save brings the old state back"
    )]
    Reset {
        #[arg(
            long,
            help = "Application directory. By default tries to save into $XDG_STATE_HOME or $HOME/.local/state"
        )]
        dir: Option<PathBuf>,
        #[arg(long, help = "Required. Without it the command only explains itself")]
        confirm: bool,
    },
}

pub async fn run_cli() -> Result<()> {
    let args = Args::parse();

    let logging_level = if args.log {
        Some(LevelFilter::TRACE)
    } else {
        None
    };
    enable_logging(
        CLI_PREFIX,
        &create_application_default_path()?,
        logging_level,
        args.log,
    )?;

    match args.commands {
        Commands::Init { dir, bind } => {
            respawn_daemon(dir.as_deref(), bind)?;
            Ok(())
        }
        Commands::Stop {} => {
            let process_name = env::current_exe()?;
            kill_running_daemons(&process_name);
            kill_running_daemons(&daemon_binary_path()?);
            Ok(())
        }
        Commands::Serve {
            dir,
            bind,
            task_reward,
            no_daily_reset,
        } => {
            let dir = dir.map_or_else(create_application_default_path, Ok)?;
            start_daemon(dir, bind, RewardTable::new(task_reward), !no_daily_reset).await
        }
        Commands::Summary { command } => process_summary_command(command).await,
        Commands::Reset { dir, confirm } => {
            if !confirm {
                println!(
                    "This deletes every task, entry, and planting. Stop the daemon first, or its next save brings the old state back. Rerun with --confirm to proceed."
                );
                return Ok(());
            }
            let dir = dir.map_or_else(create_application_default_path, Ok)?;
            let store = JsonDocumentStore::new(dir)?;
            store.save(&AppDocument::default()).await?;
            println!("Document restored to its defaults");
            Ok(())
        }
    }
}
