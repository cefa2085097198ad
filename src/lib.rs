//! # Frame ring shared memory
//!
//! A single-writer, multi-reader shared-memory ring buffer for fixed-size
//! image frames. Several independent processes on one host consume a live
//! feed produced by a single writer without copying through a kernel pipe:
//! a small ring of slots, each guarded by a process-shared reader/writer
//! lock, lives inside the mapped segment itself, alongside a master
//! condition variable that wakes blocked readers on publish or teardown.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use frame_ring_shm::{Handle, FrameRecord};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Producer
//! let writer = Handle::create("camera0", 640, 480, 3)?;
//! let pixels = vec![0u8; 640 * 480 * 3];
//! writer.publish(640, 480, 3, 0, &pixels)?;
//!
//! // Consumer
//! let reader = Handle::open("camera0")?;
//! let mut frame = FrameRecord::new();
//! reader.read(&mut frame, true)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Ownership and teardown
//!
//! Exactly one handle in a segment's lifetime is the owner (the process
//! that created it): only the owner may publish, and only the owner may
//! gracefully destroy. A non-owner handle must call [`Handle::close`]
//! instead, except when the owner has died — in which case the segment is
//! *poisoned* ([`Handle::is_poisoned`]) and any handle may call
//! [`Handle::destroy`] to clean it up.
//!
//! ## Non-goals
//!
//! Multiple writers, variable-size frames within one segment, cross-host
//! transport, persistence across reboots, and guaranteed delivery of every
//! published frame to every reader are all out of scope: a reader that
//! falls behind more than [`consts::RING_DEPTH`] publications skips forward
//! rather than blocking the writer.

#![warn(clippy::all)]

pub mod consts;
pub mod error;
pub mod frame;
pub mod lifecycle;
pub mod platform;
pub mod reader;
pub mod segment;
pub mod sync;
pub mod writer;

pub use error::{ShmError, ShmResult};
pub use frame::FrameRecord;
pub use lifecycle::{Handle, is_alive_by_name, is_alive_by_name_in, is_poisoned_by_name, is_poisoned_by_name_in};

/// Install a `tracing` subscriber reading its filter from `RUST_LOG`.
/// Call once at process start; safe to call more than once (later calls are
/// no-ops).
pub fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt};

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}
