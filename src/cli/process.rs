use std::{
    env,
    net::SocketAddr,
    path::{Path, PathBuf},
    process::Stdio,
};

use anyhow::Result;
use sysinfo::{get_current_pid, Signal, System};

/// Terminates every running process started from the `name` executable, then
/// waits on each so the document file is released before the caller touches it.
pub fn kill_running_daemons(name: &Path) {
    let system = System::new_all();
    let current_id = get_current_pid().unwrap();
    for process in system.processes().values() {
        if process.pid() == current_id || process.parent() == Some(current_id) {
            continue;
        }
        let started_from_name = process
            .exe()
            .filter(|v| v.exists())
            .is_some_and(|v| name == v);
        if !started_from_name {
            continue;
        }

        // kill_with is None on platforms without Term (Windows); fall back to
        // a hard kill there
        if process.kill_with(Signal::Term).is_none() {
            process.kill();
        }
        process.wait();
    }
}

/// The standalone daemon binary installs next to the cli binary.
pub fn daemon_binary_path() -> Result<PathBuf> {
    let mut path = env::current_exe()?;
    path.set_file_name("touchgrass-daemon");
    #[cfg(windows)]
    {
        path.set_extension("exe");
    }
    Ok(path)
}

/// Replaces any running daemon with a fresh one, spawned detached so it
/// outlives this cli invocation.
pub fn respawn_daemon(dir: Option<&Path>, bind: SocketAddr) -> Result<()> {
    // Re-exec ourselves with `serve` rather than looking up the daemon binary;
    // the cli is always present, the standalone binary may not be
    let process_name = env::current_exe().expect("Can't operate without an executable");
    kill_running_daemons(&process_name);
    kill_running_daemons(&daemon_binary_path()?);

    let mut command = std::process::Command::new(process_name);
    command.arg("serve");
    let bind = bind.to_string();
    command.args(["--bind", &bind]);
    if let Some(dir) = dir {
        command.arg("--dir");
        command.arg(dir);
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.process_group(0);
        command.stdin(Stdio::null());
        command.stdout(Stdio::null());
    }

    println!("Spawning");
    #[allow(clippy::zombie_processes)]
    let _ = command.spawn()?;
    println!("Success");
    Ok(())
}
