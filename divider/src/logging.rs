//! Tracing setup for the `divider` and `eval` binaries.
//!
//! Tracing is diagnostics only: output goes to stderr and never changes the
//! allocation or the report printed on stdout. Round commits and mark
//! rejections log at `debug`, phase transitions and corrections at `info`,
//! and skipped corrections or replayed exclusions at `warn`.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Install a compact stderr subscriber.
///
/// `RUST_LOG` wins when set; otherwise `default_directive` (for example
/// `"warn"` or `"divider=info"`) selects what is shown.
///
/// # Example
/// ```bash
/// RUST_LOG=divider=debug cargo run -- run scenarios/staircase.toml
/// ```
pub fn init(default_directive: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact().with_target(false))
        .init();
}
