use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Installs the stderr subscriber for the CLI.
///
/// Filter comes from `RUST_LOG` and defaults to `warn`, e.g.
/// `RUST_LOG=class_loader=trace class-loader find 'App\Kernel'` shows every
/// candidate path checked.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .try_init();
}
