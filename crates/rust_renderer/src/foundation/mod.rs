//! Foundation module - Core utilities and types
//!
//! - Math aliases and alignment helpers
//! - Logging setup

pub mod logging;
pub mod math;
