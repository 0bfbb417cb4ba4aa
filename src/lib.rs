#![deny(clippy::all)]

mod child;
mod error;
mod gate;
mod run;
mod script;
mod server;
mod signal;

pub use crate::error::RunError;
pub use crate::gate::{Admission, AdmissionGate};
pub use crate::run::run;
pub use crate::script::ScriptFile;
pub use crate::server::{router, serve, AppState};

use std::env;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use path_absolutize::Absolutize;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Parser)]
#[command(name = "loxrun", version, about = "Runs posted scripts through an external interpreter")]
pub struct ServerConfig {
    #[arg(long, env = "LOXRUN_BIND", value_name = "addr", default_value = "0.0.0.0:8080")]
    pub bind: SocketAddr,

    #[arg(long, env = "LOXRUN_INTERPRETER", value_name = "path", default_value = "../lox")]
    pub interpreter: PathBuf,

    #[arg(long, env = "LOXRUN_WORKDIR", value_name = "path")]
    pub workdir: Option<PathBuf>,

    #[arg(long, env = "LOXRUN_STATIC_DIR", value_name = "path", default_value = ".")]
    pub static_dir: PathBuf,

    #[arg(long, env = "LOXRUN_TEMP_DIR", value_name = "path")]
    pub temp_dir: Option<PathBuf>,

    #[arg(long, env = "LOXRUN_SCRIPT_SUFFIX", value_name = "suffix", default_value = ".lox")]
    pub script_suffix: String,

    #[arg(short = 't', long, env = "LOXRUN_TIMEOUT", value_name = "milliseconds", default_value_t = 10_000)]
    pub timeout: u64,

    #[arg(long, env = "LOXRUN_MAX_CONCURRENCY", value_name = "count", default_value_t = 8)]
    pub max_concurrency: usize,

    #[arg(long, env = "LOXRUN_MAX_BODY_SIZE", value_name = "bytes", default_value_t = 1024 * 1024)]
    pub max_body_size: usize,

    /// Bytes kept from each of stdout and stderr; the rest is discarded.
    #[arg(long, env = "LOXRUN_MAX_OUTPUT_SIZE", value_name = "bytes", default_value_t = 1024 * 1024)]
    pub max_output_size: usize,

    #[arg(long, env = "LOXRUN_RLIMIT_CPU", value_name = "seconds")]
    pub rlimit_cpu: Option<u64>,

    #[arg(long, env = "LOXRUN_RLIMIT_AS", value_name = "bytes")]
    pub rlimit_as: Option<u64>,

    #[arg(long, env = "LOXRUN_RLIMIT_FSIZE", value_name = "bytes")]
    pub rlimit_fsize: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 8080)),
            interpreter: "../lox".into(),
            workdir: None,
            static_dir: ".".into(),
            temp_dir: None,
            script_suffix: ".lox".into(),
            timeout: 10_000,
            max_concurrency: 8,
            max_body_size: 1024 * 1024,
            max_output_size: 1024 * 1024,
            rlimit_cpu: None,
            rlimit_as: None,
            rlimit_fsize: None,
        }
    }
}

impl ServerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout)
    }

    /// Pins every relative path to the working directory, so nothing later
    /// depends on the process cwd.
    ///
    /// A bare interpreter name such as `lox` is left alone and looked up in `PATH`.
    pub fn resolve(mut self) -> Result<Self> {
        let workdir = match self.workdir.take() {
            Some(dir) => dir.absolutize()?.into_owned(),
            None => env::current_dir()?,
        };

        if has_parent(&self.interpreter) {
            self.interpreter = self.interpreter.absolutize_from(&workdir)?.into_owned();
        }
        self.static_dir = self.static_dir.absolutize_from(&workdir)?.into_owned();
        self.temp_dir = Some(match self.temp_dir.take() {
            Some(dir) => dir.absolutize_from(&workdir)?.into_owned(),
            None => env::temp_dir(),
        });
        self.workdir = Some(workdir);

        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.timeout == 0 {
            anyhow::bail!("timeout must be positive");
        }

        if self.max_concurrency == 0 {
            anyhow::bail!("max concurrency must be positive");
        }

        if self.max_output_size == 0 {
            anyhow::bail!("max output size must be positive");
        }

        if self.script_suffix.is_empty() || self.script_suffix.contains('/') {
            anyhow::bail!(
                "script suffix must be a non-empty file extension: suffix = {:?}",
                self.script_suffix
            );
        }

        if has_parent(&self.interpreter) && !self.interpreter.is_file() {
            anyhow::bail!(
                "interpreter not found: path = {}",
                self.interpreter.display()
            );
        }

        let dirs = self
            .workdir
            .iter()
            .chain(self.temp_dir.iter())
            .chain(Some(&self.static_dir));

        for dir in dirs {
            if !dir.is_dir() {
                anyhow::bail!("directory not found: path = {}", dir.display());
            }
        }

        Ok(())
    }
}

fn has_parent(path: &Path) -> bool {
    path.parent().is_some_and(|p| !p.as_os_str().is_empty())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRequest {
    pub code: String,
}

/// Exactly one of `output` and `error` is set, chosen by `success`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunResult {
    pub success: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RunResult {
    pub fn output(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: Some(output.into()),
            error: None,
        }
    }

    pub fn error(error: impl Into<String>) -> Self {
        Self {
            success: false,
            output: None,
            error: Some(error.into()),
        }
    }
}
