use crate::child::{setup_child, ChildLimits};
use crate::script::ScriptFile;
use crate::signal;
use crate::{RunError, RunResult, ServerConfig};

use std::io;
use std::os::unix::process::ExitStatusExt;
use std::path::Path;
use std::process::{Output, Stdio};
use std::time::Instant;

use anyhow::Context;
use nix::unistd::Pid;
use scopeguard::guard;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::time;
use tracing::{debug, trace, warn};

/// Writes `code` to a fresh script file, runs the interpreter on it and maps
/// the exit status to a [`RunResult`].
///
/// The script file is gone by the time this returns, whatever the outcome.
#[tracing::instrument(
    level = "debug",
    skip(config, code),
    fields(nonce = tracing::field::Empty, len = code.len())
)]
pub async fn run(config: &ServerConfig, code: &str) -> Result<RunResult, RunError> {
    let nonce: u32 = rand::random();
    tracing::Span::current().record("nonce", nonce);

    let script = ScriptFile::create(config.temp_dir.as_deref(), &config.script_suffix, code)
        .context("failed to create script file")?;

    trace!(path = ?script.path());

    let executed = execute(config, script.path()).await;
    let removed = script.remove();

    if let (Err(_), Err(err)) = (&executed, &removed) {
        warn!(%err, "failed to remove script file");
    }

    let output = executed?;
    removed.context("failed to remove script file")?;

    let result = if output.status.success() {
        RunResult::output(String::from_utf8_lossy(&output.stdout))
    } else {
        debug!(
            code = ?output.status.code(),
            signal = ?output.status.signal(),
            "interpreter failed"
        );
        RunResult::error(String::from_utf8_lossy(&output.stderr))
    };

    Ok(result)
}

async fn execute(config: &ServerConfig, script: &Path) -> Result<Output, RunError> {
    let mut cmd = Command::new(&config.interpreter);
    cmd.arg(script)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    if let Some(ref workdir) = config.workdir {
        cmd.current_dir(workdir);
    }

    let limits = ChildLimits::from_config(config);
    unsafe {
        cmd.pre_exec(move || setup_child(&limits));
    }

    let t0 = Instant::now();

    let mut child = cmd.spawn().with_context(|| {
        format!(
            "failed to spawn interpreter: path = {}",
            config.interpreter.display()
        )
    })?;

    let pgid = child.id().map(|id| Pid::from_raw(id as i32));
    trace!(?pgid);

    // NOTE:
    // The guard also fires after a clean exit, when the leader is already reaped.
    // Background jobs the script started are still in the group and must not
    // outlive the request. If the group is empty, `killpg` fails with ESRCH.
    // The pgid cannot be handed to a new group before every member is gone and
    // pids wrap around, so hitting an unrelated group is not a practical concern.
    let _killer = guard(pgid, |pgid| {
        if let Some(pgid) = pgid {
            signal::kill_group(pgid);
        }
    });

    let stdout = child.stdout.take().context("interpreter stdout not captured")?;
    let stderr = child.stderr.take().context("interpreter stderr not captured")?;
    let limit = config.max_output_size as u64;

    let collect = async {
        tokio::try_join!(
            child.wait(),
            read_capped(stdout, limit),
            read_capped(stderr, limit)
        )
    };

    let timeout = config.timeout();
    let (status, stdout, stderr) = match time::timeout(timeout, collect).await {
        Ok(ret) => ret.context("failed to wait for interpreter")?,
        Err(_) => {
            debug!(?timeout, ?pgid, "interpreter timed out");
            return Err(RunError::Timeout);
        }
    };

    let real_duration = t0.elapsed();
    trace!(
        ?status,
        ?real_duration,
        stdout_len = stdout.len(),
        stderr_len = stderr.len()
    );

    Ok(Output {
        status,
        stdout,
        stderr,
    })
}

/// Keeps the first `limit` bytes and discards the rest, so that a chatty
/// script neither grows the buffer nor blocks on a full pipe.
async fn read_capped<R>(mut reader: R, limit: u64) -> io::Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    (&mut reader).take(limit).read_to_end(&mut buf).await?;

    let discarded = tokio::io::copy(&mut reader, &mut tokio::io::sink()).await?;
    if discarded > 0 {
        debug!(limit, discarded, "interpreter output truncated");
    }

    Ok(buf)
}
