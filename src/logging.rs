//! Dev logging for fbterm.
//!
//! Once the framebuffer is painted, stderr goes to a console nobody can read,
//! so diagnostics go to a file instead — and only when the user opts in:
//!
//! ```sh
//! FBTERM_LOG=1 fbterm /usr/share/fonts/TTF/DejaVuSansMono.ttf
//! FBTERM_LOG=fbterm=trace fbterm ...   # value doubles as an EnvFilter
//! ```
//!
//! Events are appended to `~/fbterm.log`. A panic hook records panics to the
//! file before the default handler runs, since their backtrace would
//! otherwise be lost under the framebuffer contents.

use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

/// Initialise file logging if `FBTERM_LOG` is set.
///
/// The returned guard must stay alive for the whole process; dropping it
/// flushes and closes the log file. Returns `None` (and stays silent) when
/// the variable is unset or empty.
pub fn init() -> Option<WorkerGuard> {
    let value = std::env::var("FBTERM_LOG").unwrap_or_default();
    if value.is_empty() {
        return None;
    }

    // "1" is the plain on-switch; any other value is an EnvFilter directive.
    let filter = if value == "1" {
        EnvFilter::new("info")
    } else {
        EnvFilter::try_new(&value).unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let log_path = log_file_path();
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .expect("fbterm: failed to open log file");

    let (non_blocking, guard) = tracing_appender::non_blocking(log_file);

    let subscriber = tracing_subscriber::registry().with(filter).with(
        tracing_subscriber::fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_timer(tracing_subscriber::fmt::time::SystemTime)
            .with_target(true),
    );

    tracing::subscriber::set_global_default(subscriber)
        .expect("fbterm: failed to set global tracing subscriber");

    install_panic_hook();

    tracing::info!("logging initialised, writing to {}", log_path.display());
    Some(guard)
}

/// `~/fbterm.log`, falling back to /tmp for odd `$HOME` configurations.
fn log_file_path() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
        .join("fbterm.log")
}

/// Record panics as ERROR events, then delegate to the previous hook so the
/// process still aborts with the standard output.
fn install_panic_hook() {
    let prev_hook = std::panic::take_hook();

    std::panic::set_hook(Box::new(move |info| {
        let location = info
            .location()
            .map(|l| format!("{}:{}", l.file(), l.line()))
            .unwrap_or_else(|| "<unknown>".to_string());

        let message = if let Some(s) = info.payload().downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "<non-string panic payload>".to_string()
        };

        tracing::error!(location = %location, "PANIC: {message}");

        prev_hook(info);
    }));
}
