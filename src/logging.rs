use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter, e.g. `JOBLOG_LOG=debug`.
pub const LOG_ENV: &str = "JOBLOG_LOG";

pub fn log_path() -> PathBuf {
    if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "joblog") {
        proj_dirs.data_dir().join("joblog.log")
    } else {
        PathBuf::from("joblog.log")
    }
}

/// Sends `tracing` output to the log file; the terminal belongs to the
/// dashboard. Logging is optional, so any setup failure leaves it disabled.
pub fn init() {
    let path = log_path();
    if let Some(parent) = path.parent() {
        if std::fs::create_dir_all(parent).is_err() {
            return;
        }
    }
    let Ok(file) = OpenOptions::new().create(true).append(true).open(&path) else {
        return;
    };

    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init();
}
