//! Subscriber bootstrap for binaries and demos. Library code only emits
//! `tracing` events and never installs a subscriber on its own.

use tracing::Level;

/// Install a `fmt` subscriber at `INFO`. Safe to call more than once.
pub fn init() {
    init_with_level(Level::INFO);
}

pub fn init_with_level(level: Level) {
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .try_init();
}
