use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use tracing::trace;

pub fn send_group_signal(pgid: Pid, signal: Signal) -> nix::Result<()> {
    let result = signal::killpg(pgid, signal);
    trace!(
        "killpg pgid = {}, signal = {}, result = {:?}",
        pgid,
        signal,
        result
    );
    result
}

/// Kills whatever is left in the process group. `ESRCH` is expected when the
/// interpreter exited cleanly and took nothing with it.
pub fn kill_group(pgid: Pid) {
    let _ = send_group_signal(pgid, Signal::SIGKILL);
}
