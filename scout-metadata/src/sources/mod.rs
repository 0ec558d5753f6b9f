//! The metadata sources.

pub mod fixed;
pub mod http;
pub mod memory;
pub mod timeout;
