use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Install a global subscriber for binaries and integration harnesses.
///
/// Filter defaults to `info` and is overridable via `CONVO_LOG`
/// (e.g. `CONVO_LOG=convo_core=debug`). Set `CONVO_LOG_FILE` to also append
/// all debug output to a file. Calling this twice is a no-op.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_env("CONVO_LOG").unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(fmt::layer().with_filter(filter));

    if let Ok(log_path) = std::env::var("CONVO_LOG_FILE") {
        match std::fs::OpenOptions::new().create(true).append(true).open(&log_path) {
            Ok(file) => {
                let file_layer = fmt::layer()
                    .with_writer(file)
                    .with_ansi(false)
                    .with_target(true)
                    .with_filter(tracing_subscriber::filter::LevelFilter::DEBUG);
                let _ = registry.with(file_layer).try_init();
                return;
            }
            Err(e) => eprintln!("failed to open log file {log_path}: {e}"),
        }
    }

    let _ = registry.try_init();
}
