//! package-info: generate a `package_info.py` module from pyproject.toml
//! metadata and git state, and patch it into built wheels and sdists.

pub mod commands;
pub mod common;
pub mod errors;
pub mod generators;
pub mod plugin;
pub mod registry;
pub mod resolver;

pub use common::GlobalOpts;
pub use package_info_logger as logger;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable holding a tracing filter that overrides `-v`
pub const LOG_ENV: &str = "PACKAGE_INFO_LOG";

/// Install the tracing subscriber; call after the logger has its verbosity
pub fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(logger::verbosity_to_filter()));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_writer(std::io::stderr),
        )
        .try_init();
}
