//! Logging setup for the renderer and its applications

pub use log::{debug, error, info, trace, warn};

/// Initialize `env_logger`, defaulting to `info` when `RUST_LOG` is unset.
///
/// Calling this more than once is harmless; later calls are ignored.
pub fn init() {
    let env = env_logger::Env::default().default_filter_or("info");
    if env_logger::Builder::from_env(env).try_init().is_err() {
        log::trace!("Logger already initialized");
    }
}
