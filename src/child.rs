use crate::ServerConfig;

use std::io;

use nix::unistd::{self, Pid};
use rlimit::Resource;

#[derive(Debug, Clone, Copy, Default)]
pub struct ChildLimits {
    pub rlimit_cpu: Option<u64>,
    pub rlimit_as: Option<u64>,
    pub rlimit_fsize: Option<u64>,
}

impl ChildLimits {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            rlimit_cpu: config.rlimit_cpu,
            rlimit_as: config.rlimit_as,
            rlimit_fsize: config.rlimit_fsize,
        }
    }
}

/// Runs in the forked child right before `execve`.
///
/// Only async-signal-safe calls are allowed here: no allocation, no locks.
pub fn setup_child(limits: &ChildLimits) -> io::Result<()> {
    // The interpreter leads its own process group so that a timeout can take
    // down everything it forked, not just the direct child.
    unistd::setpgid(Pid::from_raw(0), Pid::from_raw(0))?;

    set_hard_rlimit(limits)
}

fn set_hard_rlimit(limits: &ChildLimits) -> io::Result<()> {
    macro_rules! direct_set {
        ($res:expr, $field:ident) => {
            if let Some($field) = limits.$field {
                $res.set($field, $field)?;
            }
        };
    }

    direct_set!(Resource::CPU, rlimit_cpu);
    direct_set!(Resource::AS, rlimit_as);
    direct_set!(Resource::FSIZE, rlimit_fsize);

    Ok(())
}
