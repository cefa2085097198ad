//! Platform-specific primitives the rest of the crate builds on.

#[cfg(target_os = "linux")]
mod linux;

#[cfg(target_os = "linux")]
pub use linux::*;
