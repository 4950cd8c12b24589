//! Structured logging init, mirroring the teacher stack's
//! `tracing` + `tracing-subscriber` pairing: one process-wide subscriber,
//! configured from `RUST_LOG` with a sane default.

use tracing_subscriber::EnvFilter;

pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
