#![allow(dead_code)]

use loxrun::ServerConfig;

use std::fs;
use std::path::Path;
use std::sync::Once;

fn setup_tracing() {
    use tracing_error::ErrorLayer;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::{fmt, EnvFilter};

    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_timer(fmt::time::ChronoLocal::rfc_3339())
        .with_test_writer()
        .finish()
        .with(ErrorLayer::default())
        .try_init();
}

pub fn init() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        dotenv::dotenv().ok();
        setup_tracing();
    });
}

/// `/bin/sh` plays the interpreter, so test scripts are shell code and `$0`
/// is the script path.
pub fn sh_config(temp_dir: &Path) -> ServerConfig {
    ServerConfig {
        interpreter: "/bin/sh".into(),
        temp_dir: Some(temp_dir.into()),
        timeout: 5000,
        ..Default::default()
    }
}

pub fn dir_entries(dir: &Path) -> Vec<String> {
    fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect()
}
