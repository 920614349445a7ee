//! Adapter process handles and process-group termination.
//!
//! Spawned adapters are placed in their own process group so the whole
//! subtree can be signalled at once. Termination must not rely on the
//! adapter's own exit path.

use tokio::process::Child;

/// A spawned debug adapter process.
///
/// `pid` is the process-group leader; it is 0 only if the child exited
/// before its pid could be observed.
#[derive(Debug)]
pub struct AdapterProcess {
    /// The child process handle.
    pub child: Child,
    /// Process-group leader pid.
    pub pid: u32,
}

impl AdapterProcess {
    /// Wrap a freshly spawned child.
    pub fn new(child: Child) -> Self {
        let pid = child.id().unwrap_or(0);
        Self { child, pid }
    }
}

/// Kill an adapter's entire process group with SIGKILL.
///
/// A missing process (already exited) is not an error. Falls back to
/// killing just the child when no group leader pid is known.
pub fn kill_process_group(process: &mut AdapterProcess) -> std::io::Result<()> {
    #[cfg(unix)]
    {
        if process.pid > 0 {
            let ret = unsafe { libc::killpg(process.pid as libc::pid_t, libc::SIGKILL) };
            if ret != 0 {
                let err = std::io::Error::last_os_error();
                // ESRCH: the group is already gone.
                if err.raw_os_error() == Some(libc::ESRCH) {
                    return Ok(());
                }
                return Err(err);
            }
            return Ok(());
        }
    }

    match process.child.start_kill() {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::InvalidInput => Ok(()), // already exited
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::process::Command;

    #[tokio::test]
    #[cfg(unix)]
    async fn kill_group_terminates_spawned_child() {
        let mut cmd = Command::new("sleep");
        cmd.arg("60");
        cmd.process_group(0);
        let child = cmd.spawn().unwrap();
        let mut process = AdapterProcess::new(child);
        assert!(process.pid > 0);

        kill_process_group(&mut process).unwrap();
        let status = process.child.wait().await.unwrap();
        assert!(!status.success());
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn kill_group_tolerates_already_exited() {
        let mut cmd = Command::new("true");
        cmd.process_group(0);
        let child = cmd.spawn().unwrap();
        let mut process = AdapterProcess::new(child);
        // Let it exit and be reaped so the pgid is gone.
        let _ = process.child.wait().await.unwrap();

        // Must not report an error for a vanished group.
        kill_process_group(&mut process).unwrap();
    }
}
