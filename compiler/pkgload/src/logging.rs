//! Tracing setup for the command-line tool and tests.

use std::sync::Once;

use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

static INIT: Once = Once::new();

/// Install a global subscriber, once.
///
/// Directives come from `PKGLOAD_LOG`, falling back to `RUST_LOG`; with
/// neither set nothing is installed. `PKGLOAD_LOG_TREE` switches to an
/// indented span tree, which is easier to follow for nested imports.
///
/// ```bash
/// PKGLOAD_LOG=pkgload=debug pkgload check deps.json example.com/app
/// PKGLOAD_LOG=trace PKGLOAD_LOG_TREE=1 pkgload check deps.json example.com/app
/// ```
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = match std::env::var("PKGLOAD_LOG") {
            Ok(directives) => EnvFilter::new(directives),
            Err(_) if std::env::var_os("RUST_LOG").is_some() => EnvFilter::from_default_env(),
            Err(_) => return,
        };

        let installed = if std::env::var_os("PKGLOAD_LOG_TREE").is_some() {
            tracing_subscriber::registry()
                .with(
                    tracing_tree::HierarchicalLayer::new(2)
                        .with_targets(true)
                        .with_indent_lines(true),
                )
                .with(filter)
                .try_init()
        } else {
            tracing_subscriber::registry()
                .with(
                    fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_target(true)
                        .with_level(true),
                )
                .with(filter)
                .try_init()
        };
        if let Err(err) = installed {
            eprintln!("pkgload: tracing not installed: {err}");
        }
    });
}
